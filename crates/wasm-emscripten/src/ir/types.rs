//! IR type definitions.
//!
//! These types represent a structured, SSA-form intermediate representation
//! of a WebAssembly module. Each Wasm instruction is translated to one or
//! more IR instructions, with explicit variable names (v0, v1, ...) instead
//! of an implicit stack.

use std::collections::HashMap;
use std::fmt;

/// Unique identifier for a variable in SSA form.
/// Variables are numbered sequentially: v0, v1, v2, ...
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(pub u32);

/// Generic index type with a phantom tag to distinguish different index spaces.
#[derive(Debug)]
pub struct Idx<TAG> {
    idx: usize,
    _marker: std::marker::PhantomData<TAG>,
}

// Implemented by hand: derives would require the tag type itself to be
// `Copy`/`Eq`, which the signature and import tags are not.
impl<TAG> Clone for Idx<TAG> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<TAG> Copy for Idx<TAG> {}

impl<TAG> PartialEq for Idx<TAG> {
    fn eq(&self, other: &Self) -> bool {
        self.idx == other.idx
    }
}

impl<TAG> Eq for Idx<TAG> {}

impl<TAG> std::hash::Hash for Idx<TAG> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.idx.hash(state);
    }
}

impl<TAG> Idx<TAG> {
    pub fn new(idx: usize) -> Self {
        Self {
            idx,
            _marker: std::marker::PhantomData,
        }
    }

    pub fn as_usize(&self) -> usize {
        self.idx
    }
}

impl<TAG> From<Idx<TAG>> for usize {
    fn from(idx: Idx<TAG>) -> Self {
        idx.idx
    }
}

/// Type index: indexes into `ModuleInfo::type_signatures`.
pub type TypeIdx = Idx<FuncSignature>;

/// Marker type for local function indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LocalFuncIdxTag;

/// Local function index: indexes into `ModuleInfo::ir_functions`.
/// Import count has already been subtracted.
pub type LocalFuncIdx = Idx<LocalFuncIdxTag>;

/// Imported function index: indexes into `ModuleInfo::func_imports`.
pub type ImportIdx = Idx<FuncImport>;

/// Marker type for global indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GlobalIdxTag;

/// Global index in the module's global index space (imports first).
/// Globals are carried through untouched, so only the index is kept.
pub type GlobalIdx = Idx<GlobalIdxTag>;

impl fmt::Display for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Unique identifier for a basic block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockId(pub u32);

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "block_{}", self.0)
    }
}

/// WebAssembly value types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WasmType {
    I32,
    I64,
    F32,
    F64,
}

impl fmt::Display for WasmType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WasmType::I32 => write!(f, "i32"),
            WasmType::I64 => write!(f, "i64"),
            WasmType::F32 => write!(f, "f32"),
            WasmType::F64 => write!(f, "f64"),
        }
    }
}

impl WasmType {
    /// Convert wasmparser::ValType to our WasmType.
    ///
    /// Reference and vector types have no place in the finalizer's IR.
    pub fn from_wasmparser(vt: wasmparser::ValType) -> anyhow::Result<Self> {
        use wasmparser::ValType;
        match vt {
            ValType::I32 => Ok(WasmType::I32),
            ValType::I64 => Ok(WasmType::I64),
            ValType::F32 => Ok(WasmType::F32),
            ValType::F64 => Ok(WasmType::F64),
            _ => anyhow::bail!("Unsupported value type: {:?}", vt),
        }
    }
}

/// IR representation of a complete function.
#[derive(Debug, Clone)]
pub struct IrFunction {
    /// Function name (from the name section, or `func_<index>`).
    pub name: String,

    /// Function parameters (variable ID + type)
    pub params: Vec<(VarId, WasmType)>,

    /// Local variables (variable ID + type)
    /// Note: params are also locals in Wasm, but we separate them for clarity
    pub locals: Vec<(VarId, WasmType)>,

    /// All basic blocks in the function
    pub blocks: Vec<IrBlock>,

    /// Entry block (where execution starts)
    ///
    /// INVARIANT: This is always `BlockId(0)`.
    pub entry_block: BlockId,

    /// Return type (None for void functions)
    pub return_type: Option<WasmType>,

    /// Index into the type registry.
    pub type_idx: TypeIdx,
}

impl IrFunction {
    /// The structural signature of this function.
    pub fn signature(&self) -> FuncSignature {
        FuncSignature {
            params: self.params.iter().map(|(_, ty)| *ty).collect(),
            return_type: self.return_type,
        }
    }

    /// First variable ID not yet used by any parameter, local or instruction.
    pub fn next_var_id(&self) -> VarId {
        let declared = self.params.iter().chain(&self.locals).map(|(v, _)| *v);
        let defined = self
            .blocks
            .iter()
            .flat_map(|b| b.instructions.iter())
            .filter_map(IrInstr::dest);
        declared
            .chain(defined)
            .max()
            .map_or(VarId(0), |v| VarId(v.0 + 1))
    }
}

/// A basic block: a sequence of instructions with a single entry and exit.
#[derive(Debug, Clone)]
pub struct IrBlock {
    /// Unique identifier for this block
    pub id: BlockId,

    /// Instructions in this block (no control flow within)
    pub instructions: Vec<IrInstr>,

    /// How control exits this block
    pub terminator: IrTerminator,
}

/// How an imported function is treated by the Emscripten passes.
///
/// Assigned once when the import is registered and copied onto every call
/// site, so passes never re-inspect import names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportClass {
    /// Ordinary host function.
    Plain,
    /// Inline-JavaScript intrinsic whose first operand is a code address.
    AsmConst,
    /// Signature-specific intrinsic import generated by the rewriter.
    AsmConstSig,
}

impl ImportClass {
    /// Whether the import belongs to the asm-const family.
    pub fn is_asm_const(self) -> bool {
        matches!(self, ImportClass::AsmConst | ImportClass::AsmConstSig)
    }
}

/// A single IR instruction (SSA form, each produces a new variable).
#[derive(Debug, Clone)]
pub enum IrInstr {
    /// Define a variable from a constant value
    Const { dest: VarId, value: IrValue },

    /// Binary operation (dest = lhs op rhs)
    BinOp {
        dest: VarId,
        op: BinOp,
        lhs: VarId,
        rhs: VarId,
    },

    /// Unary operation or conversion (dest = op(operand))
    UnOp {
        dest: VarId,
        op: UnOp,
        operand: VarId,
    },

    /// Load from linear memory (dest = mem[addr + offset])
    Load {
        dest: VarId,
        ty: WasmType,
        addr: VarId,
        offset: u32,
        width: MemoryAccessWidth,
        sign: Option<SignExtension>,
    },

    /// Store to linear memory (mem[addr + offset] = value)
    Store {
        ty: WasmType,
        addr: VarId,
        value: VarId,
        offset: u32,
        width: MemoryAccessWidth,
    },

    /// Read a global
    GlobalGet { dest: VarId, index: GlobalIdx },

    /// Write a global
    GlobalSet { index: GlobalIdx, value: VarId },

    /// Call direct function (local, not imported)
    Call {
        dest: Option<VarId>,    // None for void functions
        func_idx: LocalFuncIdx, // Local function index (imports are handled separately)
        args: Vec<VarId>,
    },

    /// Call imported function from host
    ///
    /// The target is named rather than indexed so that imports can be
    /// added and removed without renumbering call sites.
    CallImport {
        dest: Option<VarId>,
        module_name: String, // Import module name (e.g., "env")
        func_name: String,   // Import field name (e.g., "emscripten_asm_const")
        class: ImportClass,
        /// Operand and result types as passed at this call site.
        site_type: FuncSignature,
        args: Vec<VarId>,
    },

    /// Call indirect (via table 0)
    CallIndirect {
        dest: Option<VarId>,
        type_idx: TypeIdx,
        table_idx: VarId,
        args: Vec<VarId>,
    },

    /// Assign variable (for Wasm local.set / local.tee)
    /// Note: This is not pure SSA, but matches Wasm's local semantics
    Assign { dest: VarId, src: VarId },

    /// Select between two values (dest = condition != 0 ? val1 : val2)
    Select {
        dest: VarId,
        val1: VarId,
        val2: VarId,
        condition: VarId,
    },

    /// Current memory size in pages
    MemorySize { dest: VarId },

    /// Grow memory by delta pages (dest = memory.grow(delta))
    /// Returns previous page count on success, or -1 on failure.
    MemoryGrow { dest: VarId, delta: VarId },

    /// Bulk fill (memory.fill)
    MemoryFill { dst: VarId, value: VarId, len: VarId },

    /// Bulk copy (memory.copy)
    MemoryCopy { dst: VarId, src: VarId, len: VarId },
}

impl IrInstr {
    /// The variable this instruction defines, if any.
    pub fn dest(&self) -> Option<VarId> {
        match self {
            IrInstr::Const { dest, .. }
            | IrInstr::BinOp { dest, .. }
            | IrInstr::UnOp { dest, .. }
            | IrInstr::Load { dest, .. }
            | IrInstr::GlobalGet { dest, .. }
            | IrInstr::Assign { dest, .. }
            | IrInstr::Select { dest, .. }
            | IrInstr::MemorySize { dest }
            | IrInstr::MemoryGrow { dest, .. } => Some(*dest),
            IrInstr::Call { dest, .. }
            | IrInstr::CallImport { dest, .. }
            | IrInstr::CallIndirect { dest, .. } => *dest,
            IrInstr::Store { .. }
            | IrInstr::GlobalSet { .. }
            | IrInstr::MemoryFill { .. }
            | IrInstr::MemoryCopy { .. } => None,
        }
    }
}

/// Block terminator: how control flow exits a basic block.
#[derive(Debug, Clone)]
pub enum IrTerminator {
    /// Return from function
    Return { value: Option<VarId> },

    /// Unconditional jump
    Jump { target: BlockId },

    /// Two-way branch on `condition != 0`
    BranchIf {
        condition: VarId,
        if_true: BlockId,
        if_false: BlockId,
    },

    /// Indexed jump (br_table)
    BranchTable {
        index: VarId,
        targets: Vec<BlockId>,
        default: BlockId,
    },

    /// Unreachable (trap)
    Unreachable,
}

impl IrTerminator {
    /// Blocks control may continue in after this terminator.
    pub fn successors(&self) -> Vec<BlockId> {
        match self {
            IrTerminator::Return { .. } | IrTerminator::Unreachable => Vec::new(),
            IrTerminator::Jump { target } => vec![*target],
            IrTerminator::BranchIf {
                if_true, if_false, ..
            } => vec![*if_true, *if_false],
            IrTerminator::BranchTable {
                targets, default, ..
            } => targets.iter().chain(std::iter::once(default)).copied().collect(),
        }
    }
}

/// Constant value in the IR.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IrValue {
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
}

impl IrValue {
    /// Returns the WasmType of this constant value.
    pub fn wasm_type(&self) -> WasmType {
        match self {
            IrValue::I32(_) => WasmType::I32,
            IrValue::I64(_) => WasmType::I64,
            IrValue::F32(_) => WasmType::F32,
            IrValue::F64(_) => WasmType::F64,
        }
    }
}

impl fmt::Display for IrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IrValue::I32(v) => write!(f, "{}i32", v),
            IrValue::I64(v) => write!(f, "{}i64", v),
            IrValue::F32(v) => write!(f, "{}f32", v),
            IrValue::F64(v) => write!(f, "{}f64", v),
        }
    }
}

/// Binary operations, comparisons included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    // i32
    I32Add,
    I32Sub,
    I32Mul,
    I32DivS,
    I32DivU,
    I32RemS,
    I32RemU,
    I32And,
    I32Or,
    I32Xor,
    I32Shl,
    I32ShrS,
    I32ShrU,
    I32Rotl,
    I32Rotr,
    I32Eq,
    I32Ne,
    I32LtS,
    I32LtU,
    I32GtS,
    I32GtU,
    I32LeS,
    I32LeU,
    I32GeS,
    I32GeU,

    // i64
    I64Add,
    I64Sub,
    I64Mul,
    I64DivS,
    I64DivU,
    I64RemS,
    I64RemU,
    I64And,
    I64Or,
    I64Xor,
    I64Shl,
    I64ShrS,
    I64ShrU,
    I64Rotl,
    I64Rotr,
    I64Eq,
    I64Ne,
    I64LtS,
    I64LtU,
    I64GtS,
    I64GtU,
    I64LeS,
    I64LeU,
    I64GeS,
    I64GeU,

    // f32
    F32Add,
    F32Sub,
    F32Mul,
    F32Div,
    F32Min,
    F32Max,
    F32Copysign,
    F32Eq,
    F32Ne,
    F32Lt,
    F32Gt,
    F32Le,
    F32Ge,

    // f64
    F64Add,
    F64Sub,
    F64Mul,
    F64Div,
    F64Min,
    F64Max,
    F64Copysign,
    F64Eq,
    F64Ne,
    F64Lt,
    F64Gt,
    F64Le,
    F64Ge,
}

impl BinOp {
    /// Whether the operation is a comparison (always yields i32).
    pub fn is_comparison(&self) -> bool {
        use BinOp::*;
        matches!(
            self,
            I32Eq | I32Ne | I32LtS | I32LtU | I32GtS | I32GtU | I32LeS | I32LeU | I32GeS | I32GeU
                | I64Eq | I64Ne | I64LtS | I64LtU | I64GtS | I64GtU | I64LeS | I64LeU | I64GeS
                | I64GeU | F32Eq | F32Ne | F32Lt | F32Gt | F32Le | F32Ge | F64Eq | F64Ne
                | F64Lt | F64Gt | F64Le | F64Ge
        )
    }

    /// Returns the WasmType of the result produced by this operation.
    pub fn result_type(&self) -> WasmType {
        use BinOp::*;
        match self {
            I64Add | I64Sub | I64Mul | I64DivS | I64DivU | I64RemS | I64RemU | I64And | I64Or
            | I64Xor | I64Shl | I64ShrS | I64ShrU | I64Rotl | I64Rotr => WasmType::I64,
            F32Add | F32Sub | F32Mul | F32Div | F32Min | F32Max | F32Copysign => WasmType::F32,
            F64Add | F64Sub | F64Mul | F64Div | F64Min | F64Max | F64Copysign => WasmType::F64,
            // i32 arithmetic and every comparison
            _ => WasmType::I32,
        }
    }
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinOp::I32Add => "i32.add",
            BinOp::I32Sub => "i32.sub",
            BinOp::I32Mul => "i32.mul",
            BinOp::I64Add => "i64.add",
            BinOp::I64Sub => "i64.sub",
            BinOp::I64Mul => "i64.mul",
            BinOp::F32Add => "f32.add",
            BinOp::F32Sub => "f32.sub",
            BinOp::F32Mul => "f32.mul",
            BinOp::F64Add => "f64.add",
            BinOp::F64Sub => "f64.sub",
            BinOp::F64Mul => "f64.mul",
            _ => return fmt::Debug::fmt(self, f),
        };
        write!(f, "{}", s)
    }
}

/// Unary operations and conversions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    I32Eqz,
    I32Clz,
    I32Ctz,
    I32Popcnt,
    I32Extend8S,
    I32Extend16S,
    I64Eqz,
    I64Clz,
    I64Ctz,
    I64Popcnt,
    I64Extend8S,
    I64Extend16S,
    I64Extend32S,
    F32Abs,
    F32Neg,
    F32Ceil,
    F32Floor,
    F32Trunc,
    F32Nearest,
    F32Sqrt,
    F64Abs,
    F64Neg,
    F64Ceil,
    F64Floor,
    F64Trunc,
    F64Nearest,
    F64Sqrt,
    I32WrapI64,
    I64ExtendI32S,
    I64ExtendI32U,
    I32TruncF32S,
    I32TruncF32U,
    I32TruncF64S,
    I32TruncF64U,
    I64TruncF32S,
    I64TruncF32U,
    I64TruncF64S,
    I64TruncF64U,
    I32TruncSatF32S,
    I32TruncSatF32U,
    I32TruncSatF64S,
    I32TruncSatF64U,
    I64TruncSatF32S,
    I64TruncSatF32U,
    I64TruncSatF64S,
    I64TruncSatF64U,
    F32ConvertI32S,
    F32ConvertI32U,
    F32ConvertI64S,
    F32ConvertI64U,
    F64ConvertI32S,
    F64ConvertI32U,
    F64ConvertI64S,
    F64ConvertI64U,
    F32DemoteF64,
    F64PromoteF32,
    I32ReinterpretF32,
    I64ReinterpretF64,
    F32ReinterpretI32,
    F64ReinterpretI64,
}

/// Width of a memory access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryAccessWidth {
    /// The value type's own width.
    Full,
    I8,
    I16,
    I32,
}

/// How a narrow load widens to its value type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignExtension {
    Signed,
    Unsigned,
}

// ─── Module-level IR metadata ───────────────────────────────────────────────

/// A data segment to initialize memory.
#[derive(Debug, Clone)]
pub struct DataSegmentDef {
    /// Byte offset into memory.
    pub offset: u32,
    /// Raw bytes to write.
    pub data: Vec<u8>,
}

impl DataSegmentDef {
    /// Whether `address` falls inside this segment's bytes.
    pub fn contains(&self, address: u32) -> bool {
        let start = u64::from(self.offset);
        let end = start + self.data.len() as u64;
        (start..end).contains(&u64::from(address))
    }

    /// Read a NUL-terminated string starting at `address`.
    ///
    /// Reading stops at the first NUL byte or at the end of the segment.
    /// An address outside the segment yields an empty string.
    pub fn c_str_at(&self, address: u32) -> String {
        let start = address.wrapping_sub(self.offset) as usize;
        let bytes = self.data.get(start..).unwrap_or_default();
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        String::from_utf8_lossy(&bytes[..end]).into_owned()
    }
}

/// An exported function mapping.
#[derive(Debug, Clone)]
pub struct FuncExport {
    /// The exported name.
    pub name: String,
    /// Index into the local function index space (imports excluded).
    pub func_index: LocalFuncIdx,
}

/// Signature of a function.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FuncSignature {
    /// Parameter types.
    pub params: Vec<WasmType>,
    /// Return type (None for void).
    pub return_type: Option<WasmType>,
}

impl FuncSignature {
    /// Whether any parameter or the result is a 64-bit integer.
    pub fn has_i64(&self) -> bool {
        self.return_type == Some(WasmType::I64) || self.params.contains(&WasmType::I64)
    }
}

/// An element segment to initialize a table.
#[derive(Debug, Clone)]
pub struct ElementSegmentDef {
    /// Starting offset in the table.
    pub offset: usize,
    /// Function indices to place into the table starting at `offset`.
    /// These are in the local function index space (imports already subtracted).
    pub func_indices: Vec<LocalFuncIdx>,
}

/// An imported function.
#[derive(Debug, Clone)]
pub struct FuncImport {
    /// Import module name (e.g., "env").
    pub module_name: String,
    /// Import function name (e.g., "emscripten_asm_const_vi").
    pub func_name: String,
    /// Parameter types.
    pub params: Vec<WasmType>,
    /// Return type (None for void).
    pub return_type: Option<WasmType>,
    /// Classification assigned at registration.
    pub class: ImportClass,
}

/// This is the IR representation of a module's structure: functions, imports,
/// exports, the function-type registry, and the memory and table initializers.
#[derive(Debug, Clone, Default)]
pub struct ModuleInfo {
    /// Element segments for table initialization.
    pub element_segments: Vec<ElementSegmentDef>,
    /// Data segments for memory initialization.
    pub data_segments: Vec<DataSegmentDef>,
    /// Exported functions.
    pub func_exports: Vec<FuncExport>,
    /// Function-type registry (type section plus types added by passes).
    pub type_signatures: Vec<FuncSignature>,
    /// Imported functions.
    pub func_imports: Vec<FuncImport>,
    /// All IR functions in the module.
    pub ir_functions: Vec<IrFunction>,
}

impl ModuleInfo {
    /// Get the number of imported functions.
    pub fn num_imported_functions(&self) -> usize {
        self.func_imports.len()
    }

    // ─── Typed accessors ───────────────────────────────────────────────────

    /// Get an IR function by local function index.
    pub fn ir_function(&self, idx: LocalFuncIdx) -> Option<&IrFunction> {
        self.ir_functions.get(idx.as_usize())
    }

    /// Get a type signature by type index.
    pub fn type_signature(&self, idx: TypeIdx) -> Option<&FuncSignature> {
        self.type_signatures.get(idx.as_usize())
    }

    /// Get a function import by import index.
    pub fn func_import(&self, idx: ImportIdx) -> Option<&FuncImport> {
        self.func_imports.get(idx.as_usize())
    }

    /// Look up a local function by name.
    pub fn function_by_name(&self, name: &str) -> Option<(LocalFuncIdx, &IrFunction)> {
        self.ir_functions
            .iter()
            .enumerate()
            .find(|(_, f)| f.name == name)
            .map(|(i, f)| (LocalFuncIdx::new(i), f))
    }

    /// Look up a function import by field name.
    pub fn func_import_by_name(&self, func_name: &str) -> Option<&FuncImport> {
        self.func_imports.iter().find(|i| i.func_name == func_name)
    }

    // ─── Builder methods ───────────────────────────────────────────────────

    /// Push an IR function and return its local function index.
    pub fn push_ir_function(&mut self, f: IrFunction) -> LocalFuncIdx {
        let idx = LocalFuncIdx::new(self.ir_functions.len());
        self.ir_functions.push(f);
        idx
    }

    /// Push a type signature and return its type index.
    pub fn push_type_signature(&mut self, s: FuncSignature) -> TypeIdx {
        let idx = TypeIdx::new(self.type_signatures.len());
        self.type_signatures.push(s);
        idx
    }

    /// Return the index of a structurally equal registered type, adding it if absent.
    pub fn ensure_type_signature(&mut self, s: &FuncSignature) -> TypeIdx {
        match self.type_signatures.iter().position(|t| t == s) {
            Some(i) => TypeIdx::new(i),
            None => self.push_type_signature(s.clone()),
        }
    }

    /// Push a function import and return its import index.
    pub fn push_func_import(&mut self, i: FuncImport) -> ImportIdx {
        let idx = ImportIdx::new(self.func_imports.len());
        self.func_imports.push(i);
        idx
    }

    /// Remove every function import matching `pred`, returning how many were removed.
    pub fn remove_func_imports<F>(&mut self, pred: F) -> usize
    where
        F: Fn(&FuncImport) -> bool,
    {
        let before = self.func_imports.len();
        self.func_imports.retain(|i| !pred(i));
        before - self.func_imports.len()
    }

    /// Push a function export.
    pub fn push_func_export(&mut self, name: impl Into<String>, func_index: LocalFuncIdx) {
        self.func_exports.push(FuncExport {
            name: name.into(),
            func_index,
        });
    }

    // ─── Query methods ─────────────────────────────────────────────────────

    /// Map each data segment's base address to its index.
    ///
    /// When two segments share a base address the later one wins.
    pub fn segments_by_address(&self) -> HashMap<u32, usize> {
        self.data_segments
            .iter()
            .enumerate()
            .map(|(i, seg)| (seg.offset, i))
            .collect()
    }

    /// Names of the functions placed into the table, in element-segment order.
    pub fn table_entry_names(&self) -> Vec<String> {
        self.element_segments
            .iter()
            .flat_map(|seg| seg.func_indices.iter())
            .filter_map(|idx| self.ir_function(*idx))
            .map(|f| f.name.clone())
            .collect()
    }
}

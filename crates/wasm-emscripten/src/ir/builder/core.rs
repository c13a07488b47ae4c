//! Core IR builder state and control flow management.
//!
//! This module contains the `IrBuilder` state machine that translates Wasm bytecode
//! to SSA-form IR by simulating the Wasm evaluation stack.

use super::super::types::*;
use anyhow::{Context, Result};

/// Control flow frame for tracking nested blocks/loops/if.
#[derive(Debug, Clone)]
pub(super) struct ControlFrame {
    pub(super) kind: ControlKind,

    /// Loop header (backward branch target)
    pub(super) start_block: BlockId,

    /// Continuation after `end` (forward branch target)
    pub(super) end_block: BlockId,

    /// False arm of an `if`, until `else` or `end` claims it
    pub(super) else_block: Option<BlockId>,

    /// Variable every exit assigns the block result to
    pub(super) result_var: Option<VarId>,

    /// Value stack height when the frame was entered
    pub(super) height: usize,

    /// Set after `br`, `return` or `unreachable`: the rest of the frame is dead
    pub(super) unreachable: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum ControlKind {
    Block,
    Loop,
    If,
    Else,
}

/// An imported function as seen from a call site.
#[derive(Debug, Clone)]
pub struct ImportTarget {
    pub module_name: String,
    pub func_name: String,
    pub class: ImportClass,
}

/// Module-level context for function translation.
///
/// Contains information about the module's functions, types, and imports that
/// is needed during translation of individual functions.
#[derive(Debug, Clone)]
pub struct ModuleContext {
    /// Callee signatures per function index (imported functions first).
    pub func_signatures: Vec<FuncSignature>,

    /// Type section signatures, used to resolve `call_indirect` types.
    pub type_signatures: Vec<FuncSignature>,

    /// Import details for each imported function, indexed by function index.
    pub func_imports: Vec<ImportTarget>,

    /// Name of each local function.
    pub func_names: Vec<String>,
}

impl ModuleContext {
    /// Number of imported functions (these occupy indices 0..N-1 in the
    /// function index space, before local functions).
    pub fn num_imported_functions(&self) -> usize {
        self.func_imports.len()
    }
}

/// IR builder state.
pub struct IrBuilder {
    /// All blocks created so far
    pub(super) blocks: Vec<IrBlock>,

    /// Current block being built
    pub(super) current_block: BlockId,

    /// Next variable ID to allocate
    pub(super) next_var_id: u32,

    /// Next block ID to allocate
    pub(super) next_block_id: u32,

    /// Wasm value stack (SSA variables instead of actual values)
    pub(super) value_stack: Vec<VarId>,

    /// Control flow stack; the bottom frame is the function body
    pub(super) control_stack: Vec<ControlFrame>,

    /// Mapping from Wasm local index → VarId.
    /// Indices 0..param_count-1 are parameters; param_count.. are declared locals.
    pub(super) local_vars: Vec<VarId>,
}

impl IrBuilder {
    /// Create a new IR builder.
    ///
    /// INVARIANT: The first block created (via `new_block()`) will always be `BlockId(0)`,
    /// which serves as the entry block for the function.
    pub fn new() -> Self {
        Self {
            blocks: Vec::new(),
            current_block: BlockId(0),
            next_var_id: 0,
            next_block_id: 0,
            value_stack: Vec::new(),
            control_stack: Vec::new(),
            local_vars: Vec::new(),
        }
    }

    /// Allocate a new SSA variable.
    pub(super) fn new_var(&mut self) -> VarId {
        let id = VarId(self.next_var_id);
        self.next_var_id += 1;
        id
    }

    /// Allocate a new basic block.
    pub(super) fn new_block(&mut self) -> BlockId {
        let id = BlockId(self.next_block_id);
        self.next_block_id += 1;
        id
    }

    /// Emit an instruction to the current block.
    pub(super) fn emit(&mut self, instr: IrInstr) {
        if let Some(block) = self.blocks.iter_mut().find(|b| b.id == self.current_block) {
            block.instructions.push(instr);
        }
    }

    /// Set the terminator for the current block.
    pub(super) fn terminate(&mut self, term: IrTerminator) {
        if let Some(block) = self.blocks.iter_mut().find(|b| b.id == self.current_block) {
            block.terminator = term;
        }
    }

    /// Start a new block (create and switch to it).
    pub(super) fn start_block(&mut self, block_id: BlockId) {
        self.current_block = block_id;
        self.blocks.push(IrBlock {
            id: block_id,
            instructions: Vec::new(),
            terminator: IrTerminator::Unreachable,
        });
    }

    /// Pop the top of the value stack.
    ///
    /// Dead code after a branch may pop values the frame never pushed; those
    /// pops yield fresh, never-defined variables instead of failing.
    pub(super) fn pop(&mut self, what: &str) -> Result<VarId> {
        let (height, unreachable) = self
            .control_stack
            .last()
            .map_or((0, false), |f| (f.height, f.unreachable));
        if self.value_stack.len() > height {
            if let Some(var) = self.value_stack.pop() {
                return Ok(var);
            }
        }
        if unreachable {
            return Ok(self.new_var());
        }
        anyhow::bail!("Stack underflow for {}", what)
    }

    /// Pop `count` call arguments, returned in call order.
    pub(super) fn pop_args(&mut self, count: usize, what: &str) -> Result<Vec<VarId>> {
        let mut args = (0..count)
            .map(|_| self.pop(what))
            .collect::<Result<Vec<_>>>()?;
        args.reverse();
        Ok(args)
    }

    /// Push a control frame, allocating its result variable if it has one.
    pub(super) fn push_control(
        &mut self,
        kind: ControlKind,
        start_block: BlockId,
        end_block: BlockId,
        else_block: Option<BlockId>,
        result_type: Option<WasmType>,
    ) {
        let result_var = result_type.map(|_| self.new_var());
        self.control_stack.push(ControlFrame {
            kind,
            start_block,
            end_block,
            else_block,
            result_var,
            height: self.value_stack.len(),
            unreachable: false,
        });
    }

    /// Pop a control frame from the control stack.
    pub(super) fn pop_control(&mut self) -> Result<ControlFrame> {
        self.control_stack
            .pop()
            .ok_or_else(|| anyhow::anyhow!("Control stack underflow"))
    }

    /// The frame `depth` levels out from the innermost one.
    pub(super) fn frame_at(&self, depth: u32) -> Result<&ControlFrame> {
        self.control_stack
            .len()
            .checked_sub(depth as usize + 1)
            .map(|idx| &self.control_stack[idx])
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "Branch depth {} exceeds control stack depth {}",
                    depth,
                    self.control_stack.len()
                )
            })
    }

    /// Branch target for relative depth N.
    ///
    /// Loops branch back to their header, everything else forward to its end.
    pub(super) fn branch_target(&self, depth: u32) -> Result<BlockId> {
        let frame = self.frame_at(depth)?;
        Ok(match frame.kind {
            ControlKind::Loop => frame.start_block,
            _ => frame.end_block,
        })
    }

    /// Variable a branch to depth N must assign its carried value to, if any.
    ///
    /// Loop branches carry no values.
    pub(super) fn branch_result_var(&self, depth: u32) -> Result<Option<VarId>> {
        let frame = self.frame_at(depth)?;
        Ok(match frame.kind {
            ControlKind::Loop => None,
            _ => frame.result_var,
        })
    }

    /// Drop everything the current frame pushed and mark the rest of it dead.
    pub(super) fn mark_unreachable(&mut self) {
        if let Some(frame) = self.control_stack.last_mut() {
            self.value_stack.truncate(frame.height);
            frame.unreachable = true;
        }
    }

    /// Translate a function from Wasm bytecode to IR.
    pub fn translate_function(
        &mut self,
        name: String,
        signature: &FuncSignature,
        locals: &[WasmType],
        operators: &[wasmparser::Operator],
        module_ctx: &ModuleContext,
    ) -> Result<IrFunction> {
        // Reset per-function state so each function starts fresh
        self.blocks.clear();
        self.value_stack.clear();
        self.control_stack.clear();
        self.local_vars.clear();
        self.next_var_id = 0;
        self.next_block_id = 0;

        let param_vars: Vec<(VarId, WasmType)> = signature
            .params
            .iter()
            .map(|ty| (self.new_var(), *ty))
            .collect();
        let func_locals: Vec<(VarId, WasmType)> =
            locals.iter().map(|ty| (self.new_var(), *ty)).collect();

        self.local_vars = param_vars
            .iter()
            .chain(&func_locals)
            .map(|(v, _)| *v)
            .collect();

        // INVARIANT: This is the first call to new_block(), so entry == BlockId(0).
        let entry = self.new_block();
        self.start_block(entry);

        // Function-level frame: `br` to it returns, its `end` ends the body.
        let exit = self.new_block();
        self.push_control(
            ControlKind::Block,
            entry,
            exit,
            None,
            signature.return_type,
        );

        for op in operators {
            self.translate_operator(op, module_ctx)
                .with_context(|| format!("translating operator {:?}", op))?;
        }
        if !self.control_stack.is_empty() {
            anyhow::bail!("function body ends inside an open block");
        }

        Ok(IrFunction {
            name,
            params: param_vars,
            locals: func_locals,
            blocks: std::mem::take(&mut self.blocks),
            entry_block: entry,
            return_type: signature.return_type,
            type_idx: TypeIdx::new(0), // Set by build_ir_functions
        })
    }
}

impl Default for IrBuilder {
    fn default() -> Self {
        Self::new()
    }
}

//! WebAssembly module parser.
//!
//! This module wraps the `wasmparser` crate to extract the sections the
//! finalizer works on from `.wasm` binary files: types, function imports,
//! function bodies, element and data segments, function exports, and
//! function names.

use anyhow::{Context, Result};
use std::collections::HashMap;
use wasmparser::{ExternalKind, FuncType, KnownCustom, Name, Parser, Payload, TypeRef, ValType};

/// An active element segment to initialize a table.
#[derive(Debug, Clone)]
pub struct ElementSegment {
    /// Starting offset in the table (from the i32.const in the offset expression).
    pub offset: u32,
    /// Function indices to place into the table starting at `offset`.
    pub func_indices: Vec<u32>,
}

/// An active data segment to initialize memory.
#[derive(Debug, Clone)]
pub struct DataSegment {
    /// Byte offset into memory 0 (from the i32.const in the offset expression).
    pub offset: u32,
    /// Raw data bytes to copy into memory at initialization.
    pub data: Vec<u8>,
}

/// A function export from the Wasm module.
#[derive(Debug, Clone)]
pub struct ExportInfo {
    /// The exported name.
    pub name: String,
    /// Index into the function index space (imports first).
    pub index: u32,
}

/// A function import from the Wasm module.
#[derive(Debug, Clone)]
pub struct ImportInfo {
    /// The import module name (e.g., "env").
    pub module_name: String,
    /// The import field name (e.g., "emscripten_asm_const").
    pub name: String,
    /// Index into the type section.
    pub type_idx: u32,
}

/// Parsed WebAssembly module.
#[derive(Debug, Clone)]
pub struct ParsedModule {
    /// Type section: function signatures
    pub types: Vec<FuncType>,

    /// Functions (index into types + bytecode)
    pub functions: Vec<ParsedFunction>,

    /// Element segments for table initialization
    pub element_segments: Vec<ElementSegment>,

    /// Data segments for memory initialization
    pub data_segments: Vec<DataSegment>,

    /// Function exports
    pub exports: Vec<ExportInfo>,

    /// Function imports from the host environment
    pub imports: Vec<ImportInfo>,

    /// Function names from the `name` custom section, keyed by function index.
    pub function_names: HashMap<u32, String>,
}

impl ParsedModule {
    /// Number of imported functions (these occupy indices 0..N-1 in the
    /// function index space, before local functions).
    pub fn num_imported_functions(&self) -> u32 {
        self.imports.len() as u32
    }
}

/// A single function in the module.
#[derive(Debug, Clone)]
pub struct ParsedFunction {
    /// Index into the types section
    pub type_idx: u32,

    /// Local variable types (parameters are in the function type)
    pub locals: Vec<ValType>,

    /// Function body (Wasm bytecode)
    pub body: Vec<u8>,
}

/// Evaluate an `i32.const` offset expression.
fn eval_offset_expr(const_expr: wasmparser::ConstExpr) -> Result<u32> {
    let mut reader = const_expr.get_operators_reader();
    let op = reader.read().context("reading const expr operator")?;
    match op {
        wasmparser::Operator::I32Const { value } => Ok(value as u32),
        _ => anyhow::bail!("Unsupported offset expression operator: {:?}", op),
    }
}

/// Parse an active element segment, or return None for passive/declared segments.
fn parse_element_segment(element: wasmparser::Element) -> Result<Option<ElementSegment>> {
    match element.kind {
        wasmparser::ElementKind::Active {
            table_index,
            offset_expr,
        } => {
            // table_index is Option<u32>; None means table 0 (MVP default)
            let tidx = table_index.unwrap_or(0);
            if tidx != 0 {
                anyhow::bail!(
                    "Multi-table element segments not supported (table_index={})",
                    tidx
                );
            }

            let offset = eval_offset_expr(offset_expr)?;

            let mut func_indices = Vec::new();
            match element.items {
                wasmparser::ElementItems::Functions(funcs) => {
                    for func_idx in funcs {
                        let idx = func_idx.context("reading element func index")?;
                        func_indices.push(idx);
                    }
                }
                wasmparser::ElementItems::Expressions(..) => {
                    anyhow::bail!("Expression-based element segments not supported");
                }
            }

            Ok(Some(ElementSegment {
                offset,
                func_indices,
            }))
        }
        // Neither kind is copied into the table at start-up.
        wasmparser::ElementKind::Passive | wasmparser::ElementKind::Declared => Ok(None),
    }
}

/// Parse an active data segment, or return None for passive segments.
fn parse_data_segment(data: wasmparser::Data) -> Result<Option<DataSegment>> {
    match data.kind {
        wasmparser::DataKind::Active {
            memory_index: 0,
            offset_expr,
        } => {
            let offset = eval_offset_expr(offset_expr)?;
            Ok(Some(DataSegment {
                offset,
                data: data.data.to_vec(),
            }))
        }
        wasmparser::DataKind::Passive => Ok(None),
        wasmparser::DataKind::Active { memory_index, .. } => {
            anyhow::bail!(
                "Multi-memory data segments not supported (memory_index={})",
                memory_index
            );
        }
    }
}

/// Parse a function code section entry, extracting locals and bytecode.
fn parse_code_entry(body: wasmparser::FunctionBody, type_idx: u32) -> Result<ParsedFunction> {
    let mut locals = Vec::new();
    let locals_reader = body.get_locals_reader().context("getting locals reader")?;
    for local in locals_reader {
        let (count, val_type) = local.context("reading local")?;
        for _ in 0..count {
            locals.push(val_type);
        }
    }

    // Extract operators as raw bytes (parsed later in the IR builder)
    let operators_reader = body
        .get_operators_reader()
        .context("getting operators reader")?;
    let mut binary_reader = operators_reader.get_binary_reader();
    let remaining = binary_reader.bytes_remaining();
    let body_bytes = binary_reader
        .read_bytes(remaining)
        .context("reading body bytes")?;

    Ok(ParsedFunction {
        type_idx,
        locals,
        body: body_bytes.to_vec(),
    })
}

/// Collect function names from a `name` custom section.
fn parse_function_names(
    reader: wasmparser::NameSectionReader,
    names: &mut HashMap<u32, String>,
) -> Result<()> {
    for subsection in reader {
        if let Name::Function(map) = subsection.context("reading name subsection")? {
            for naming in map {
                let naming = naming.context("reading function name")?;
                names.insert(naming.index, naming.name.to_string());
            }
        }
    }
    Ok(())
}

/// Parse a WebAssembly binary into a structured module.
pub fn parse_wasm(wasm_bytes: &[u8]) -> Result<ParsedModule> {
    let parser = Parser::new(0);

    let mut types = Vec::new();
    let mut function_types: Vec<u32> = Vec::new(); // type index for each function
    let mut functions = Vec::new();
    let mut element_segments = Vec::new();
    let mut data_segments = Vec::new();
    let mut exports = Vec::new();
    let mut imports = Vec::new();
    let mut function_names = HashMap::new();

    for payload in parser.parse_all(wasm_bytes) {
        let payload = payload.context("parsing wasm payload")?;

        match payload {
            Payload::TypeSection(reader) => {
                for rec_group in reader {
                    let rec_group = rec_group.context("reading rec group")?;
                    for sub_type in rec_group.types() {
                        if let wasmparser::CompositeInnerType::Func(func_ty) =
                            &sub_type.composite_type.inner
                        {
                            types.push(func_ty.clone());
                        }
                    }
                }
            }

            Payload::ImportSection(reader) => {
                for import in reader {
                    let import = import.context("reading import")?;
                    // Only functions occupy the function index space; other
                    // import kinds are left to the host untouched.
                    if let TypeRef::Func(type_idx) = import.ty {
                        imports.push(ImportInfo {
                            module_name: import.module.to_string(),
                            name: import.name.to_string(),
                            type_idx,
                        });
                    }
                }
            }

            Payload::FunctionSection(reader) => {
                for func_type_idx in reader {
                    let func_type_idx = func_type_idx.context("reading function type index")?;
                    function_types.push(func_type_idx);
                }
            }

            Payload::CodeSectionEntry(body) => {
                let type_idx = *function_types
                    .get(functions.len())
                    .context("code entry without a matching function declaration")?;
                let parsed_func = parse_code_entry(body, type_idx)?;
                functions.push(parsed_func);
            }

            Payload::ElementSection(reader) => {
                for element in reader {
                    let element = element.context("reading element segment")?;
                    if let Some(segment) = parse_element_segment(element)? {
                        element_segments.push(segment);
                    }
                }
            }

            Payload::ExportSection(reader) => {
                for export in reader {
                    let export = export.context("reading export")?;
                    if export.kind == ExternalKind::Func {
                        exports.push(ExportInfo {
                            name: export.name.to_string(),
                            index: export.index,
                        });
                    }
                }
            }

            Payload::DataSection(reader) => {
                for data in reader {
                    let data = data.context("reading data segment")?;
                    if let Some(segment) = parse_data_segment(data)? {
                        data_segments.push(segment);
                    }
                }
            }

            Payload::CustomSection(reader) => {
                if let KnownCustom::Name(names) = reader.as_known() {
                    parse_function_names(names, &mut function_names)?;
                }
            }

            _ => {}
        }
    }

    Ok(ParsedModule {
        types,
        functions,
        element_segments,
        data_segments,
        exports,
        imports,
        function_names,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_minimal_module() {
        let wasm = wat::parse_str("(module)").unwrap();
        let module = parse_wasm(&wasm).unwrap();
        assert_eq!(module.types.len(), 0);
        assert_eq!(module.functions.len(), 0);
        assert!(module.function_names.is_empty());
    }

    #[test]
    fn parse_function_import() {
        let wat = r#"
            (module
                (import "env" "emscripten_asm_const_vi" (func (param i32 i32)))
                (import "env" "memory" (memory 1))
                (func (result i32)
                    i32.const 42
                )
            )
        "#;
        let wasm = wat::parse_str(wat).unwrap();
        let module = parse_wasm(&wasm).unwrap();

        // The memory import does not enter the function index space.
        assert_eq!(module.imports.len(), 1);
        assert_eq!(module.num_imported_functions(), 1);
        assert_eq!(module.imports[0].module_name, "env");
        assert_eq!(module.imports[0].name, "emscripten_asm_const_vi");
        assert_eq!(module.imports[0].type_idx, 0);
        assert_eq!(module.functions.len(), 1);
    }

    #[test]
    fn parse_data_segments() {
        let wat = r#"
            (module
                (memory 1)
                (data (i32.const 16) "Hello\00")
                (data (i32.const 1024) "world")
            )
        "#;
        let wasm = wat::parse_str(wat).unwrap();
        let module = parse_wasm(&wasm).unwrap();
        assert_eq!(module.data_segments.len(), 2);
        assert_eq!(module.data_segments[0].offset, 16);
        assert_eq!(module.data_segments[0].data, b"Hello\0");
        assert_eq!(module.data_segments[1].offset, 1024);
    }

    #[test]
    fn parse_element_segment() {
        let wat = r#"
            (module
                (table 4 funcref)
                (func $a)
                (func $b (param i32))
                (elem (i32.const 1) $b $a $b)
            )
        "#;
        let wasm = wat::parse_str(wat).unwrap();
        let module = parse_wasm(&wasm).unwrap();
        assert_eq!(module.element_segments.len(), 1);
        assert_eq!(module.element_segments[0].offset, 1);
        assert_eq!(module.element_segments[0].func_indices, vec![1, 0, 1]);
    }

    #[test]
    fn parse_function_exports_only() {
        let wat = r#"
            (module
                (memory 1)
                (func (result i32) i32.const 1)
                (export "first" (func 0))
                (export "memory" (memory 0))
            )
        "#;
        let wasm = wat::parse_str(wat).unwrap();
        let module = parse_wasm(&wasm).unwrap();
        assert_eq!(module.exports.len(), 1);
        assert_eq!(module.exports[0].name, "first");
        assert_eq!(module.exports[0].index, 0);
    }

    #[test]
    fn parse_name_section() {
        let wat = r#"
            (module
                (import "env" "abort" (func $abort))
                (func $main)
                (func)
            )
        "#;
        let wasm = wat::parse_str(wat).unwrap();
        let module = parse_wasm(&wasm).unwrap();
        assert_eq!(module.function_names.get(&0).map(String::as_str), Some("abort"));
        assert_eq!(module.function_names.get(&1).map(String::as_str), Some("main"));
        assert!(!module.function_names.contains_key(&2));
    }
}

//! # IR Builder
//!
//! Translates a `ParsedModule` (parsed WebAssembly) into a `ModuleInfo` (SSA IR).
//!
//! ## Pipeline overview
//!
//! ```text
//! ParsedModule
//!      │
//!      ├─[analysis]──────────────────────────────────────────────┐
//!      │  build_type_signatures()   ─► Vec<FuncSignature>        │
//!      │  build_module_context()    ─► ModuleContext             │
//!      │                                                         │
//!      └─[translate]─────────────────────────────────────────┐   │
//!         build_ir_functions()                               │   │
//!           └── for each local function:                     │   │
//!                 IrBuilder::translate_function()            │   │
//!                   └── for each Operator:                   │   │
//!                         translate_operator()               │   │
//!                ─► Vec<IrFunction>                          │   │
//!                                                            │   │
//! ◄───────────────────────────────[assembly]─────────────────┘───┘
//!   assemble_module_metadata()
//!     ├── build_data_segments()
//!     ├── build_element_segments()
//!     ├── build_function_exports()
//!     └── build_function_imports()
//!          ─► ModuleInfo  ──► Emscripten passes
//! ```
//!
//! Function bodies are lowered to basic blocks. Structured control flow
//! becomes `Jump`/`BranchIf`/`BranchTable` terminators, so call sites nested
//! in `block`, `loop` and `if` are visible to the passes like any other.

mod analysis;
mod assembly;
mod core;
mod translate;

use super::types::ModuleInfo;
use crate::config::EmscriptenConfig;
use crate::parser::ParsedModule;
use anyhow::Result;

/// Build complete module metadata from a parsed WebAssembly module.
///
/// Imports are classified against `config` here, once, and the class is
/// stamped on every call site that targets them.
pub fn build_module_info(parsed: &ParsedModule, config: &EmscriptenConfig) -> Result<ModuleInfo> {
    let type_sigs = analysis::build_type_signatures(parsed)?;
    let module_ctx = analysis::build_module_context(parsed, &type_sigs, config)?;

    let ir_functions = analysis::build_ir_functions(parsed, &type_sigs, &module_ctx)?;

    assembly::assemble_module_metadata(parsed, type_sigs, &module_ctx, ir_functions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{BlockId, ImportClass, IrInstr, IrTerminator, IrValue, VarId, WasmType};
    use crate::parser::parse_wasm;

    fn build(wat: &str) -> ModuleInfo {
        let wasm = wat::parse_str(wat).unwrap();
        let parsed = parse_wasm(&wasm).unwrap();
        build_module_info(&parsed, &EmscriptenConfig::default()).unwrap()
    }

    #[test]
    fn entry_block_is_always_block_zero() {
        let module = build(
            r#"
            (module
                (func (param i32 i32) (result i32)
                    local.get 0
                    local.get 1
                    i32.add))
            "#,
        );
        let func = &module.ir_functions[0];
        assert_eq!(func.entry_block, BlockId(0));
        assert_eq!(func.blocks[0].id, BlockId(0));
        assert_eq!(func.params.len(), 2);
        assert_eq!(func.return_type, Some(WasmType::I32));
        assert!(matches!(
            func.blocks[0].terminator,
            IrTerminator::Return {
                value: Some(VarId(3))
            }
        ));
    }

    #[test]
    fn unnamed_functions_get_index_names() {
        let module = build(
            r#"
            (module
                (import "env" "abort" (func $abort))
                (func $main)
                (func))
            "#,
        );
        assert_eq!(module.ir_functions[0].name, "main");
        assert_eq!(module.ir_functions[1].name, "func_1");
    }

    #[test]
    fn asm_const_call_is_classified() {
        let module = build(
            r#"
            (module
                (import "env" "emscripten_asm_const_ii" (func $asm (param i32 i32) (result i32)))
                (import "env" "puts" (func $puts (param i32)))
                (func (param i32) (result i32)
                    i32.const 8
                    call $puts
                    i32.const 16
                    local.get 0
                    call $asm))
            "#,
        );
        assert_eq!(module.func_imports[0].class, ImportClass::AsmConst);
        assert_eq!(module.func_imports[1].class, ImportClass::Plain);

        let instrs = &module.ir_functions[0].blocks[0].instructions;
        let classes: Vec<_> = instrs
            .iter()
            .filter_map(|i| match i {
                IrInstr::CallImport { class, .. } => Some(*class),
                _ => None,
            })
            .collect();
        assert_eq!(classes, vec![ImportClass::Plain, ImportClass::AsmConst]);

        match instrs.last() {
            Some(IrInstr::CallImport {
                args, site_type, ..
            }) => {
                assert_eq!(args.len(), 2);
                assert_eq!(site_type.params, vec![WasmType::I32, WasmType::I32]);
                assert_eq!(site_type.return_type, Some(WasmType::I32));
                let addr = instrs.iter().find_map(|i| match i {
                    IrInstr::Const { dest, value } if *dest == args[0] => Some(*value),
                    _ => None,
                });
                assert_eq!(addr, Some(IrValue::I32(16)));
            }
            other => panic!("expected asm const call, got {:?}", other),
        }
    }

    #[test]
    fn element_and_export_indices_are_local() {
        let module = build(
            r#"
            (module
                (import "env" "f" (func $imported))
                (table 3 funcref)
                (func $a)
                (func $b (param i32))
                (elem (i32.const 0) $imported $b $a)
                (export "b" (func $b))
                (export "reexported" (func $imported)))
            "#,
        );
        assert_eq!(module.table_entry_names(), vec!["b", "a"]);
        assert_eq!(module.func_exports.len(), 1);
        assert_eq!(module.func_exports[0].name, "b");
        assert_eq!(module.func_exports[0].func_index.as_usize(), 1);
    }

    #[test]
    fn calls_nested_in_control_flow_are_translated() {
        let module = build(
            r#"
            (module
                (import "env" "emscripten_asm_const_i" (func $asm (param i32) (result i32)))
                (global $g (mut i32) (i32.const 0))
                (func $f (param i32)
                    (if (local.get 0)
                        (then
                            (block
                                (drop (call $asm (global.get $g)))
                                (br_if 0 (local.get 0))
                                (global.set $g (i32.const 1)))))))
            "#,
        );
        let func = &module.ir_functions[0];
        assert!(func.blocks.len() > 1);
        let asm_calls: Vec<_> = func
            .blocks
            .iter()
            .flat_map(|b| &b.instructions)
            .filter(|i| {
                matches!(
                    i,
                    IrInstr::CallImport {
                        class: ImportClass::AsmConst,
                        ..
                    }
                )
            })
            .collect();
        assert_eq!(asm_calls.len(), 1);
        assert!(func
            .blocks
            .iter()
            .any(|b| matches!(b.terminator, IrTerminator::BranchIf { .. })));
    }

    #[test]
    fn multi_value_blocks_are_rejected() {
        let wasm = wat::parse_str(
            "(module (func (result i32) i32.const 1 (block (param i32) (result i32))))",
        )
        .unwrap();
        let parsed = parse_wasm(&wasm).unwrap();
        let err = build_module_info(&parsed, &EmscriptenConfig::default()).unwrap_err();
        assert!(format!("{:#}", err).contains("Multi-value blocks not supported"));
    }
}

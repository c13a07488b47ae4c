//! Indirect-call thunks.
//!
//! JavaScript reaches functions stored in the table through `dynCall_<sig>`
//! exports, one per distinct signature:
//!
//! ```text
//! dynCall_vii(fptr: i32, a0: i32, a1: i32) {
//!     call_indirect (type vii) fptr (a0, a1)
//! }
//! ```

use crate::config::EmscriptenConfig;
use crate::ir::{signature, FunctionBuilder, IrInstr, LocalFuncIdx, ModuleInfo, WasmType};
use anyhow::{anyhow, Result};
use std::collections::HashSet;
use tracing::{debug, info};

/// Generate one exported thunk per distinct signature among `table_entries`.
///
/// Every asm-const import is dropped first. Signatures that mention `i64`
/// cannot cross the JavaScript boundary and get no thunk. Thunks are created
/// in order of first appearance.
pub fn make_dyn_call_thunks(
    module: &mut ModuleInfo,
    table_entries: &[String],
    config: &EmscriptenConfig,
) -> Result<Vec<LocalFuncIdx>> {
    let removed = module.remove_func_imports(|import| import.class.is_asm_const());
    if removed > 0 {
        debug!(removed, "removed asm const imports");
    }

    let mut seen = HashSet::new();
    let mut thunks = Vec::new();
    for entry in table_entries {
        let (_, func) = module
            .function_by_name(entry)
            .ok_or_else(|| anyhow!("table entry {} is not a function in this module", entry))?;
        let func_sig = func.signature();
        let sig = signature::encode(&func_sig);
        let type_idx = module.ensure_type_signature(&func_sig);

        if func_sig.has_i64() {
            debug!(func = %entry, sig = %sig, "skipping i64 signature");
            continue;
        }
        if !seen.insert(sig.clone()) {
            continue;
        }

        let name = config.dyncall_name(&sig);
        let mut builder = FunctionBuilder::new(&name, func_sig.return_type);
        let fptr = builder.param(WasmType::I32);
        let args: Vec<_> = func_sig.params.iter().map(|ty| builder.param(*ty)).collect();
        let dest = func_sig.return_type.map(|_| builder.new_var());
        builder.emit(IrInstr::CallIndirect {
            dest,
            type_idx,
            table_idx: fptr,
            args,
        });

        let thunk_type = module.ensure_type_signature(&builder.signature());
        let idx = module.push_ir_function(builder.finish(dest, thunk_type));
        module.push_func_export(&name, idx);
        thunks.push(idx);
    }

    info!(thunks = thunks.len(), "generated dynCall thunks");
    Ok(thunks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{
        BlockId, FuncImport, ImportClass, IrBlock, IrFunction, IrTerminator, TypeIdx, VarId,
    };

    fn stub(name: &str, params: &[WasmType], return_type: Option<WasmType>) -> IrFunction {
        IrFunction {
            name: name.to_string(),
            params: params
                .iter()
                .enumerate()
                .map(|(i, ty)| (VarId(i as u32), *ty))
                .collect(),
            locals: vec![],
            blocks: vec![IrBlock {
                id: BlockId(0),
                instructions: vec![],
                terminator: IrTerminator::Unreachable,
            }],
            entry_block: BlockId(0),
            return_type,
            type_idx: TypeIdx::new(0),
        }
    }

    fn names(module: &ModuleInfo, thunks: &[LocalFuncIdx]) -> Vec<String> {
        thunks
            .iter()
            .map(|idx| module.ir_function(*idx).unwrap().name.clone())
            .collect()
    }

    #[test]
    fn one_thunk_per_signature_without_i64() {
        let mut module = ModuleInfo::default();
        module.push_ir_function(stub("f", &[WasmType::I32], Some(WasmType::I32)));
        module.push_ir_function(stub("g", &[WasmType::I32], Some(WasmType::I32)));
        module.push_ir_function(stub("h", &[], None));
        module.push_ir_function(stub("k", &[WasmType::I64], Some(WasmType::I32)));
        let entries: Vec<String> = ["f", "g", "h", "k"].iter().map(|s| s.to_string()).collect();

        let thunks =
            make_dyn_call_thunks(&mut module, &entries, &EmscriptenConfig::default()).unwrap();
        assert_eq!(names(&module, &thunks), vec!["dynCall_ii", "dynCall_v"]);

        let exported: Vec<&str> = module.func_exports.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(exported, vec!["dynCall_ii", "dynCall_v"]);
    }

    #[test]
    fn thunk_forwards_arguments_through_table() {
        let mut module = ModuleInfo::default();
        module.push_ir_function(stub(
            "cb",
            &[WasmType::F64, WasmType::I32],
            Some(WasmType::F32),
        ));
        let entries = vec!["cb".to_string()];
        let thunks =
            make_dyn_call_thunks(&mut module, &entries, &EmscriptenConfig::default()).unwrap();

        let thunk = module.ir_function(thunks[0]).unwrap();
        assert_eq!(thunk.name, "dynCall_fdi");
        assert_eq!(
            thunk.signature().params,
            vec![WasmType::I32, WasmType::F64, WasmType::I32]
        );
        assert_eq!(thunk.return_type, Some(WasmType::F32));

        match &thunk.blocks[0].instructions[..] {
            [IrInstr::CallIndirect {
                dest,
                type_idx,
                table_idx,
                args,
            }] => {
                assert_eq!(*table_idx, VarId(0));
                assert_eq!(args, &vec![VarId(1), VarId(2)]);
                assert_eq!(*dest, Some(VarId(3)));
                assert_eq!(
                    module.type_signature(*type_idx),
                    Some(&module.ir_functions[0].signature())
                );
            }
            other => panic!("unexpected thunk body {:?}", other),
        }
        assert!(matches!(
            thunk.blocks[0].terminator,
            IrTerminator::Return {
                value: Some(VarId(3))
            }
        ));
    }

    #[test]
    fn asm_const_imports_are_removed() {
        let mut module = ModuleInfo::default();
        for (name, class) in [
            ("emscripten_asm_const_vi", ImportClass::AsmConst),
            ("abort", ImportClass::Plain),
        ] {
            module.push_func_import(FuncImport {
                module_name: "env".to_string(),
                func_name: name.to_string(),
                params: vec![],
                return_type: None,
                class,
            });
        }
        let thunks = make_dyn_call_thunks(&mut module, &[], &EmscriptenConfig::default()).unwrap();
        assert!(thunks.is_empty());
        assert_eq!(module.func_imports.len(), 1);
        assert_eq!(module.func_imports[0].func_name, "abort");
    }

    #[test]
    fn unknown_table_entry_is_an_error() {
        let mut module = ModuleInfo::default();
        let entries = vec!["missing".to_string()];
        let err = make_dyn_call_thunks(&mut module, &entries, &EmscriptenConfig::default())
            .unwrap_err();
        assert!(err.to_string().contains("missing"));
    }
}

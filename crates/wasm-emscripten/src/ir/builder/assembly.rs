//! Metadata assembly - builds the final ModuleInfo from analyzed pieces.

use super::super::types::*;
use super::core::ModuleContext;
use crate::parser::ParsedModule;
use anyhow::Result;
use tracing::debug;

/// Assembles the module-level collections around the translated functions.
pub(super) fn assemble_module_metadata(
    parsed: &ParsedModule,
    type_signatures: Vec<FuncSignature>,
    module_ctx: &ModuleContext,
    ir_functions: Vec<IrFunction>,
) -> Result<ModuleInfo> {
    let num_imported_functions = module_ctx.num_imported_functions();

    Ok(ModuleInfo {
        element_segments: build_element_segments(parsed, num_imported_functions),
        data_segments: build_data_segments(parsed),
        func_exports: build_function_exports(parsed, num_imported_functions),
        func_imports: build_function_imports(module_ctx),
        type_signatures,
        ir_functions,
    })
}

/// Builds data segment definitions.
fn build_data_segments(parsed: &ParsedModule) -> Vec<DataSegmentDef> {
    parsed
        .data_segments
        .iter()
        .map(|ds| DataSegmentDef {
            offset: ds.offset,
            data: ds.data.clone(),
        })
        .collect()
}

/// Builds element segment (table initialization) definitions.
///
/// Table entries that refer to imported functions have no local body to
/// trampoline into and are dropped.
fn build_element_segments(
    parsed: &ParsedModule,
    num_imported_functions: usize,
) -> Vec<ElementSegmentDef> {
    parsed
        .element_segments
        .iter()
        .map(|es| ElementSegmentDef {
            offset: es.offset as usize,
            func_indices: es
                .func_indices
                .iter()
                .filter_map(|idx| {
                    let idx = *idx as usize;
                    if idx < num_imported_functions {
                        debug!(func_index = idx, "skipping imported function in table");
                        None
                    } else {
                        Some(LocalFuncIdx::new(idx - num_imported_functions))
                    }
                })
                .collect(),
        })
        .collect()
}

/// Builds exported function definitions.
///
/// Export indices use global numbering (imports + locals). We filter to local
/// functions and offset to local function index space.
fn build_function_exports(parsed: &ParsedModule, num_imported_functions: usize) -> Vec<FuncExport> {
    parsed
        .exports
        .iter()
        .filter(|e| (e.index as usize) >= num_imported_functions)
        .map(|e| FuncExport {
            name: e.name.clone(),
            func_index: LocalFuncIdx::new((e.index as usize) - num_imported_functions),
        })
        .collect()
}

/// Builds function import definitions, keeping the class assigned in the context.
fn build_function_imports(module_ctx: &ModuleContext) -> Vec<FuncImport> {
    module_ctx
        .func_imports
        .iter()
        .zip(&module_ctx.func_signatures)
        .map(|(target, sig)| FuncImport {
            module_name: target.module_name.clone(),
            func_name: target.func_name.clone(),
            params: sig.params.clone(),
            return_type: sig.return_type,
            class: target.class,
        })
        .collect()
}

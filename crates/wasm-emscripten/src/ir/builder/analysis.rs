//! Module analysis - extracts the type and call-target information that
//! function translation needs from a `ParsedModule`.

use super::super::types::*;
use super::core::{ImportTarget, IrBuilder, ModuleContext};
use crate::config::EmscriptenConfig;
use crate::parser::ParsedModule;
use anyhow::{Context, Result};
use wasmparser::FuncType;

/// Converts a wasmparser function type into a `FuncSignature`.
fn func_signature(ty: &FuncType) -> Result<FuncSignature> {
    if ty.results().len() > 1 {
        anyhow::bail!("Multi-value results not supported ({} results)", ty.results().len());
    }
    let params = ty
        .params()
        .iter()
        .map(|vt| WasmType::from_wasmparser(*vt))
        .collect::<Result<Vec<_>>>()?;
    let return_type = ty
        .results()
        .first()
        .map(|vt| WasmType::from_wasmparser(*vt))
        .transpose()?;
    Ok(FuncSignature {
        params,
        return_type,
    })
}

/// Builds the type registry from the type section.
pub(super) fn build_type_signatures(parsed: &ParsedModule) -> Result<Vec<FuncSignature>> {
    parsed
        .types
        .iter()
        .enumerate()
        .map(|(i, ty)| func_signature(ty).with_context(|| format!("in type {}", i)))
        .collect()
}

fn type_at(type_sigs: &[FuncSignature], type_idx: u32) -> Result<&FuncSignature> {
    type_sigs
        .get(type_idx as usize)
        .ok_or_else(|| anyhow::anyhow!("type index {} out of range", type_idx))
}

/// Builds the per-function-index call information shared by all function translations.
pub(super) fn build_module_context(
    parsed: &ParsedModule,
    type_sigs: &[FuncSignature],
    config: &EmscriptenConfig,
) -> Result<ModuleContext> {
    let mut func_signatures = Vec::with_capacity(parsed.imports.len() + parsed.functions.len());
    let mut func_imports = Vec::with_capacity(parsed.imports.len());

    for import in &parsed.imports {
        func_signatures.push(type_at(type_sigs, import.type_idx)?.clone());
        func_imports.push(ImportTarget {
            module_name: import.module_name.clone(),
            func_name: import.name.clone(),
            class: config.classify_import(&import.name),
        });
    }

    for func in &parsed.functions {
        func_signatures.push(type_at(type_sigs, func.type_idx)?.clone());
    }

    let num_imported = parsed.num_imported_functions();
    let func_names = (0..parsed.functions.len() as u32)
        .map(|local_idx| {
            parsed
                .function_names
                .get(&(local_idx + num_imported))
                .cloned()
                .unwrap_or_else(|| format!("func_{}", local_idx))
        })
        .collect();

    Ok(ModuleContext {
        func_signatures,
        type_signatures: type_sigs.to_vec(),
        func_imports,
        func_names,
    })
}

/// Parses Wasm operators from a function body.
pub(super) fn parse_function_operators(body: &[u8]) -> Result<Vec<wasmparser::Operator<'_>>> {
    let mut operators = Vec::new();
    let mut binary_reader = wasmparser::BinaryReader::new(body, 0);

    while !binary_reader.eof() {
        let op = binary_reader
            .read_operator()
            .context("failed to read operator")?;
        operators.push(op);
    }

    Ok(operators)
}

/// Translates all functions in the module to intermediate representation.
pub(super) fn build_ir_functions(
    parsed: &ParsedModule,
    type_sigs: &[FuncSignature],
    module_ctx: &ModuleContext,
) -> Result<Vec<IrFunction>> {
    let mut ir_builder = IrBuilder::new();
    let mut ir_functions = Vec::with_capacity(parsed.functions.len());

    for (func_idx, func) in parsed.functions.iter().enumerate() {
        let signature = type_at(type_sigs, func.type_idx)?;
        let locals = func
            .locals
            .iter()
            .map(|vt| WasmType::from_wasmparser(*vt))
            .collect::<Result<Vec<_>>>()?;
        let operators = parse_function_operators(&func.body)?;
        let name = module_ctx.func_names[func_idx].clone();

        let mut ir_func = ir_builder
            .translate_function(name, signature, &locals, &operators, module_ctx)
            .with_context(|| format!("failed to build IR for function {}", func_idx))?;
        ir_func.type_idx = TypeIdx::new(func.type_idx as usize);

        ir_functions.push(ir_func);
    }

    Ok(ir_functions)
}

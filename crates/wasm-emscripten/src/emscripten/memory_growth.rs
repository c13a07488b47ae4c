//! Exported memory growth entry point.
//!
//! The JavaScript side cannot execute `memory.grow` itself, so the module
//! exports a tiny function that does it on the caller's behalf.

use crate::config::EmscriptenConfig;
use crate::ir::{FunctionBuilder, IrInstr, LocalFuncIdx, ModuleInfo, WasmType};
use tracing::info;

/// Add `__growWasmMemory(delta: i32) -> i32` to the module and export it.
///
/// The function grows memory by `delta` pages and returns the previous size
/// in pages, or -1 on failure.
pub fn generate_memory_growth_function(
    module: &mut ModuleInfo,
    config: &EmscriptenConfig,
) -> LocalFuncIdx {
    let mut builder = FunctionBuilder::new(&config.grow_memory_export, Some(WasmType::I32));
    let delta = builder.param(WasmType::I32);
    let dest = builder.new_var();
    builder.emit(IrInstr::MemoryGrow { dest, delta });

    let type_idx = module.ensure_type_signature(&builder.signature());
    let func_idx = module.push_ir_function(builder.finish(Some(dest), type_idx));
    module.push_func_export(&config.grow_memory_export, func_idx);

    info!(name = %config.grow_memory_export, "added memory growth function");
    func_idx
}

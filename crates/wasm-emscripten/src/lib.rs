//! wasm-emscripten: post-link finalization of WebAssembly modules for the
//! Emscripten JavaScript runtime.
//!
//! The finalizer parses a linked module into an SSA IR, then:
//! 1. adds and exports a memory growth function,
//! 2. adds one exported `dynCall_<sig>` thunk per table signature,
//! 3. rewrites inline-JavaScript (asm-const) calls and emits the
//!    `;; METADATA:` record the loader reads.

pub mod config;
pub mod emscripten;
pub mod ir;
pub mod parser;

// Re-export key types for convenience
pub use anyhow::{Context, Result};
pub use config::EmscriptenConfig;
use ir::{build_module_info, ModuleInfo};
use parser::parse_wasm;
use tracing::info;

/// Configuration options for finalization
#[derive(Debug, Clone, Default)]
pub struct FinalizeOptions {
    /// Names of the intrinsic, the import namespace and the generated exports.
    pub config: EmscriptenConfig,
    /// Bytes of static data reserved above the data segments.
    pub static_bump: u32,
    /// Functions the loader must run before `main`, in order.
    pub initializers: Vec<String>,
}

/// Result of finalizing a module.
#[derive(Debug, Clone)]
pub struct Finalized {
    /// The rewritten module.
    pub module: ModuleInfo,
    /// The metadata record, newline included.
    pub metadata: String,
}

/// Finalize a WebAssembly module.
///
/// This is the main entry point. It takes raw WASM bytes and returns the
/// transformed module together with its metadata record.
///
/// # Example
/// ```no_run
/// use wasm_emscripten::{finalize, FinalizeOptions};
///
/// let wasm_bytes = std::fs::read("input.wasm").unwrap();
/// let options = FinalizeOptions {
///     static_bump: 1024,
///     ..Default::default()
/// };
/// let finalized = finalize(&wasm_bytes, &options).unwrap();
/// print!("{}", finalized.metadata);
/// ```
pub fn finalize(wasm_bytes: &[u8], options: &FinalizeOptions) -> Result<Finalized> {
    let parsed = parse_wasm(wasm_bytes).context("failed to parse WebAssembly module")?;

    let mut module = build_module_info(&parsed, &options.config)
        .context("failed to build module metadata")?;

    let metadata = finalize_module(&mut module, options)?;

    Ok(Finalized { module, metadata })
}

/// Run every Emscripten pass over an already-built module, returning the
/// metadata record.
pub fn finalize_module(module: &mut ModuleInfo, options: &FinalizeOptions) -> Result<String> {
    let config = &options.config;
    // Snapshot before any pass touches the module.
    let segments_by_address = module.segments_by_address();

    emscripten::generate_memory_growth_function(module, config);

    let table_entries = module.table_entry_names();
    emscripten::make_dyn_call_thunks(module, &table_entries, config)
        .context("failed to generate dynCall thunks")?;

    let mut out = Vec::new();
    let consts = emscripten::generate_emscripten_metadata(
        &mut out,
        module,
        &segments_by_address,
        options.static_bump,
        &options.initializers,
        config,
    )
    .context("failed to generate metadata")?;

    info!(
        functions = module.ir_functions.len(),
        imports = module.func_imports.len(),
        asm_consts = consts.len(),
        "finalized module"
    );
    String::from_utf8(out).context("metadata is not valid UTF-8")
}

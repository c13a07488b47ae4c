//! The `;; METADATA:` record handed to the JavaScript loader.
//!
//! ```text
//! ;; METADATA: { "asmConsts": {"0": ["code", ["v","vi"]]}, "staticBump": 1024, "initializers": ["a", "b"] }
//! ```
//!
//! The loader parses this line as-is, so spacing and separators are fixed.

use super::asm_const::{AsmConstWalker, AsmConsts};
use crate::config::EmscriptenConfig;
use crate::ir::ModuleInfo;
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::io::Write;

/// Rewrite the module's asm-const calls and write the metadata record to `out`.
///
/// `segments_by_address` must describe the module's data segments before
/// any pass removed or reordered them.
///
/// Run [`make_dyn_call_thunks`](super::make_dyn_call_thunks) first: it drops
/// the original asm-const imports. Without it, an original import whose name
/// matches a signature-specific one is taken over rather than duplicated.
pub fn generate_emscripten_metadata<W: Write>(
    out: &mut W,
    module: &mut ModuleInfo,
    segments_by_address: &HashMap<u32, usize>,
    static_bump: u32,
    initializers: &[String],
    config: &EmscriptenConfig,
) -> Result<AsmConsts> {
    let consts = AsmConstWalker::new(config, segments_by_address).walk_module(module)?;
    write_metadata(out, &consts, static_bump, initializers)
        .context("failed to write metadata record")?;
    Ok(consts)
}

/// Write the record for already-collected asm consts.
pub fn write_metadata<W: Write>(
    out: &mut W,
    consts: &AsmConsts,
    static_bump: u32,
    initializers: &[String],
) -> std::io::Result<()> {
    write!(out, ";; METADATA: {{ ")?;

    write!(out, "\"asmConsts\": {{")?;
    for (i, (id, code, sigs)) in consts.entries().enumerate() {
        if i > 0 {
            write!(out, ",")?;
        }
        write!(out, "\"{}\": [\"{}\", [", id, code)?;
        for (j, sig) in sigs.iter().enumerate() {
            if j > 0 {
                write!(out, ",")?;
            }
            write!(out, "\"{}\"", sig)?;
        }
        write!(out, "]]")?;
    }
    write!(out, "}}, ")?;

    write!(out, "\"staticBump\": {}, ", static_bump)?;

    write!(out, "\"initializers\": [")?;
    for (i, name) in initializers.iter().enumerate() {
        if i > 0 {
            write!(out, ", ")?;
        }
        write!(out, "\"{}\"", name)?;
    }
    writeln!(out, "] }}")
}

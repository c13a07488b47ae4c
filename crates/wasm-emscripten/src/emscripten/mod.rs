//! Post-link passes that prepare a module for the Emscripten JavaScript runtime.
//!
//! - [`generate_memory_growth_function`]: exports a `memory.grow` wrapper.
//! - [`make_dyn_call_thunks`]: exports `dynCall_<sig>` table trampolines.
//! - [`generate_emscripten_metadata`]: rewrites inline-JavaScript calls and
//!   writes the `;; METADATA:` record describing them.

mod asm_const;
mod dyncall;
mod escape;
mod memory_growth;
mod metadata;

pub use asm_const::{reduced_signature, AsmConstWalker, AsmConsts};
pub use dyncall::make_dyn_call_thunks;
pub use escape::escape;
pub use memory_growth::generate_memory_growth_function;
pub use metadata::{generate_emscripten_metadata, write_metadata};

//! Intermediate Representation (IR) the Emscripten passes operate on.
//!
//! This module defines an SSA-form IR of a WebAssembly module: functions made
//! of basic blocks, plus the module-level collections (imports, exports, data
//! and element segments, the function-type registry) that the passes query
//! and extend.

mod types;
pub use types::*;

mod builder;
pub use builder::build_module_info;

mod function_builder;
pub use function_builder::FunctionBuilder;

pub mod signature;

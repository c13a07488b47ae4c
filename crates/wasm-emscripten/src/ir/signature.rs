//! Compact signature strings.
//!
//! A signature is one character per type: the result first, then each
//! parameter in order. `v` stands for "no result", `i` for i32, `j` for i64,
//! `f` for f32 and `d` for f64. `vii` is therefore `fn(i32, i32)`.

use super::types::{FuncSignature, WasmType};

/// Signature character for a value type, or `v` for no value.
pub fn sig_char(ty: Option<WasmType>) -> char {
    match ty {
        None => 'v',
        Some(WasmType::I32) => 'i',
        Some(WasmType::I64) => 'j',
        Some(WasmType::F32) => 'f',
        Some(WasmType::F64) => 'd',
    }
}

/// Encode a function signature as a string.
pub fn encode(sig: &FuncSignature) -> String {
    std::iter::once(sig_char(sig.return_type))
        .chain(sig.params.iter().map(|ty| sig_char(Some(*ty))))
        .collect()
}

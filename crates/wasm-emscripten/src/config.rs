//! Fixed names shared by the Emscripten passes.
//!
//! The downstream loader matches these names byte for byte, so they are kept
//! together in one value that the passes borrow instead of being scattered
//! through the code as string literals.

use crate::ir::ImportClass;

/// Names used when rewriting and synthesizing module items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmscriptenConfig {
    /// Base name of the inline-JavaScript intrinsic import (`emscripten_asm_const`).
    pub asm_const_name: String,
    /// Import module that generated asm-const imports live under.
    pub env_module: String,
    /// Export name of the synthesized memory growth function.
    pub grow_memory_export: String,
    /// Prefix of every synthesized indirect-call thunk.
    pub dyncall_prefix: String,
}

impl Default for EmscriptenConfig {
    fn default() -> Self {
        Self {
            asm_const_name: "emscripten_asm_const".to_string(),
            env_module: "env".to_string(),
            grow_memory_export: "__growWasmMemory".to_string(),
            dyncall_prefix: "dynCall_".to_string(),
        }
    }
}

impl EmscriptenConfig {
    /// Classify an input import by name.
    ///
    /// Any import whose name mentions the intrinsic is an asm-const call
    /// target, including pre-suffixed variants such as `emscripten_asm_const_ii`.
    pub fn classify_import(&self, func_name: &str) -> ImportClass {
        if func_name.contains(self.asm_const_name.as_str()) {
            ImportClass::AsmConst
        } else {
            ImportClass::Plain
        }
    }

    /// Name of the generated import for a reduced asm-const signature.
    pub fn asm_const_import_name(&self, sig: &str) -> String {
        format!("{}_{}", self.asm_const_name, sig)
    }

    /// Name of the indirect-call thunk for a signature.
    pub fn dyncall_name(&self, sig: &str) -> String {
        format!("{}{}", self.dyncall_prefix, sig)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_names() {
        let config = EmscriptenConfig::default();
        assert_eq!(config.asm_const_import_name("vi"), "emscripten_asm_const_vi");
        assert_eq!(config.dyncall_name("iii"), "dynCall_iii");
        assert_eq!(config.grow_memory_export, "__growWasmMemory");
        assert_eq!(config.env_module, "env");
    }

    #[test]
    fn classify_by_marker() {
        let config = EmscriptenConfig::default();
        assert_eq!(
            config.classify_import("emscripten_asm_const"),
            ImportClass::AsmConst
        );
        assert_eq!(
            config.classify_import("emscripten_asm_const_iii"),
            ImportClass::AsmConst
        );
        assert_eq!(config.classify_import("abort"), ImportClass::Plain);
    }

    #[test]
    fn overridden_marker() {
        let config = EmscriptenConfig {
            asm_const_name: "js_code".to_string(),
            ..Default::default()
        };
        assert_eq!(config.classify_import("emscripten_asm_const"), ImportClass::Plain);
        assert_eq!(config.classify_import("js_code"), ImportClass::AsmConst);
        assert_eq!(config.asm_const_import_name("v"), "js_code_v");
    }
}

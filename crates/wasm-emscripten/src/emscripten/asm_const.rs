//! Asm-const call rewriting.
//!
//! Calls to the inline-JavaScript intrinsic pass the address of a
//! NUL-terminated JavaScript snippet as their first operand. The walker
//! recovers each snippet from the data segments, numbers distinct snippets
//! in first-seen order, and rewrites every call to pass that number to an
//! import specialized for the call's signature:
//!
//! ```text
//! v3 = i32.const 1024                     v3 = i32.const 1024
//! call env.emscripten_asm_const(v3, v0)   v5 = i32.const 0
//!                                         call env.emscripten_asm_const_vi(v5, v0)
//! ```
//!
//! The import name uses the *reduced* signature (the code-pointer slot
//! removed) while the import's type keeps the full call shape.

use super::escape::escape;
use crate::config::EmscriptenConfig;
use crate::ir::{
    signature, DataSegmentDef, FuncImport, FuncSignature, ImportClass, IrFunction, IrInstr,
    IrValue, ModuleInfo, VarId,
};
use anyhow::{bail, Context, Result};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, info};

/// Drop the code-pointer slot (index 1) from a full call signature.
///
/// Signatures shorter than two characters have no such slot and are
/// returned unchanged.
pub fn reduced_signature(full: &str) -> String {
    if full.len() < 2 {
        return full.to_string();
    }
    full.char_indices()
        .filter(|(i, _)| *i != 1)
        .map(|(_, c)| c)
        .collect()
}

/// Everything learned about asm-const snippets during one walk.
#[derive(Debug, Default, Clone)]
pub struct AsmConsts {
    /// Reduced signatures seen for each escaped snippet.
    sigs_for_code: BTreeMap<String, BTreeSet<String>>,
    /// Numeric ID of each escaped snippet, assigned in first-seen order.
    ids: BTreeMap<String, i32>,
    /// Reduced signatures that already have an import.
    all_sigs: BTreeSet<String>,
}

impl AsmConsts {
    /// The ID for `code`, assigning the next one if it is new.
    fn id_for_code(&mut self, code: &str) -> i32 {
        let next = self.ids.len() as i32;
        *self.ids.entry(code.to_string()).or_insert(next)
    }

    /// ID assigned to an escaped snippet, if it was seen.
    pub fn id(&self, code: &str) -> Option<i32> {
        self.ids.get(code).copied()
    }

    /// Reduced signatures recorded for an escaped snippet.
    pub fn sigs(&self, code: &str) -> Option<&BTreeSet<String>> {
        self.sigs_for_code.get(code)
    }

    /// Snippets with their ID and signatures, ordered by snippet text.
    pub fn entries(&self) -> impl Iterator<Item = (i32, &str, &BTreeSet<String>)> {
        self.sigs_for_code
            .iter()
            .map(|(code, sigs)| (self.ids[code], code.as_str(), sigs))
    }

    /// Number of distinct snippets.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Single-pass rewriter over every asm-const call site in a module.
pub struct AsmConstWalker<'a> {
    config: &'a EmscriptenConfig,
    segments_by_address: &'a HashMap<u32, usize>,
    consts: AsmConsts,
    /// Imports created during the walk, added to the module once it finishes.
    new_imports: Vec<FuncImport>,
}

impl<'a> AsmConstWalker<'a> {
    pub fn new(config: &'a EmscriptenConfig, segments_by_address: &'a HashMap<u32, usize>) -> Self {
        Self {
            config,
            segments_by_address,
            consts: AsmConsts::default(),
            new_imports: Vec::new(),
        }
    }

    /// Rewrite every asm-const call in `module` and register the imports they now target.
    pub fn walk_module(mut self, module: &mut ModuleInfo) -> Result<AsmConsts> {
        let segments = &module.data_segments;
        for func in module.ir_functions.iter_mut() {
            self.walk_function(func, segments)
                .with_context(|| format!("rewriting asm consts in function {}", func.name))?;
        }

        let added = self.new_imports.len();
        for import in self.new_imports {
            let sig = FuncSignature {
                params: import.params.clone(),
                return_type: import.return_type,
            };
            module.ensure_type_signature(&sig);
            // Without a prior thunk pass the original asm-const import may
            // already carry this name.
            match module
                .func_imports
                .iter_mut()
                .find(|existing| existing.func_name == import.func_name)
            {
                Some(existing) => *existing = import,
                None => {
                    module.push_func_import(import);
                }
            }
        }

        info!(
            codes = self.consts.len(),
            imports = added,
            "rewrote asm const calls"
        );
        Ok(self.consts)
    }

    fn walk_function(&mut self, func: &mut IrFunction, segments: &[DataSegmentDef]) -> Result<()> {
        let consts: HashMap<VarId, IrValue> = func
            .blocks
            .iter()
            .flat_map(|b| b.instructions.iter())
            .filter_map(|instr| match instr {
                IrInstr::Const { dest, value } => Some((*dest, *value)),
                _ => None,
            })
            .collect();
        let mut next_var = func.next_var_id();

        for block in &mut func.blocks {
            let mut i = 0;
            while i < block.instructions.len() {
                if let IrInstr::CallImport {
                    class: ImportClass::AsmConst,
                    ..
                } = block.instructions[i]
                {
                    let id_var = next_var;
                    next_var = VarId(next_var.0 + 1);
                    let id = self.visit_call(&mut block.instructions[i], &consts, segments, id_var)?;
                    block.instructions.insert(
                        i,
                        IrInstr::Const {
                            dest: id_var,
                            value: IrValue::I32(id),
                        },
                    );
                    i += 1;
                }
                i += 1;
            }
        }
        Ok(())
    }

    /// Rewrite one call in place so that it passes `id_var` and targets the
    /// signature-specific import. Returns the snippet's ID.
    fn visit_call(
        &mut self,
        call: &mut IrInstr,
        consts: &HashMap<VarId, IrValue>,
        segments: &[DataSegmentDef],
        id_var: VarId,
    ) -> Result<i32> {
        let IrInstr::CallImport {
            module_name,
            func_name,
            class,
            site_type,
            args,
            ..
        } = call
        else {
            bail!("asm const rewrite applied to a non-import call");
        };

        let Some(code_arg) = args.first_mut() else {
            bail!("call to {} has no code pointer operand", func_name);
        };
        let address = match consts.get(&*code_arg) {
            Some(IrValue::I32(address)) => *address as u32,
            Some(other) => bail!("code pointer of {} is a {} constant", func_name, other.wasm_type()),
            None => bail!("code pointer {} of {} is not a constant", code_arg, func_name),
        };

        let code = self.code_for_const_addr(address, segments);
        let id = self.consts.id_for_code(&code);
        let base_sig = signature::encode(site_type);
        let sig = reduced_signature(&base_sig);
        self.consts
            .sigs_for_code
            .entry(code)
            .or_default()
            .insert(sig.clone());

        let import_name = self.config.asm_const_import_name(&sig);
        debug!(address, id, sig = %sig, import = %import_name, "rewriting asm const call");

        *code_arg = id_var;
        *module_name = self.config.env_module.clone();
        *func_name = import_name.clone();
        *class = ImportClass::AsmConstSig;

        if self.consts.all_sigs.insert(sig) {
            self.new_imports.push(FuncImport {
                module_name: self.config.env_module.clone(),
                func_name: import_name,
                params: site_type.params.clone(),
                return_type: site_type.return_type,
                class: ImportClass::AsmConstSig,
            });
        }

        Ok(id)
    }

    /// Escaped snippet stored at `address`, or an empty string if no
    /// segment covers it.
    ///
    /// Snippets usually start a segment, so the base-address map is tried
    /// first. Otherwise the address may point into the middle of a merged
    /// string segment.
    fn code_for_const_addr(&self, address: u32, segments: &[DataSegmentDef]) -> String {
        let segment = self
            .segments_by_address
            .get(&address)
            .and_then(|idx| segments.get(*idx))
            .or_else(|| segments.iter().find(|seg| seg.contains(address)));
        match segment {
            Some(segment) => escape(&segment.c_str_at(address)),
            None => escape(""),
        }
    }
}

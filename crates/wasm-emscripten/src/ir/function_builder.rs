//! Construction of new IR functions.
//!
//! Passes that synthesize functions (thunks, wrappers) describe the body as
//! a straight-line sequence of instructions in a single entry block.

use super::types::*;

/// Builder for a single-block IR function.
pub struct FunctionBuilder {
    name: String,
    params: Vec<(VarId, WasmType)>,
    return_type: Option<WasmType>,
    instructions: Vec<IrInstr>,
    next_var_id: u32,
}

impl FunctionBuilder {
    /// Start a function with the given name and return type.
    pub fn new(name: impl Into<String>, return_type: Option<WasmType>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            return_type,
            instructions: Vec::new(),
            next_var_id: 0,
        }
    }

    /// Append a parameter and return the variable that holds it.
    ///
    /// Parameters must be declared before any instruction is emitted so
    /// that they occupy the lowest variable IDs.
    pub fn param(&mut self, ty: WasmType) -> VarId {
        debug_assert!(self.instructions.is_empty());
        let var = self.new_var();
        self.params.push((var, ty));
        var
    }

    /// Allocate a new SSA variable.
    pub fn new_var(&mut self) -> VarId {
        let id = VarId(self.next_var_id);
        self.next_var_id += 1;
        id
    }

    /// Emit an instruction to the body.
    pub fn emit(&mut self, instr: IrInstr) {
        self.instructions.push(instr);
    }

    /// The signature described so far.
    pub fn signature(&self) -> FuncSignature {
        FuncSignature {
            params: self.params.iter().map(|(_, ty)| *ty).collect(),
            return_type: self.return_type,
        }
    }

    /// Finish the function, returning `value` from its only block.
    pub fn finish(self, value: Option<VarId>, type_idx: TypeIdx) -> IrFunction {
        let entry = BlockId(0);
        IrFunction {
            name: self.name,
            params: self.params,
            locals: Vec::new(),
            blocks: vec![IrBlock {
                id: entry,
                instructions: self.instructions,
                terminator: IrTerminator::Return { value },
            }],
            entry_block: entry,
            return_type: self.return_type,
            type_idx,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_take_lowest_var_ids() {
        let mut b = FunctionBuilder::new("add", Some(WasmType::I32));
        let lhs = b.param(WasmType::I32);
        let rhs = b.param(WasmType::I32);
        let dest = b.new_var();
        b.emit(IrInstr::BinOp {
            dest,
            op: BinOp::I32Add,
            lhs,
            rhs,
        });
        assert_eq!((lhs, rhs, dest), (VarId(0), VarId(1), VarId(2)));

        let sig = b.signature();
        let func = b.finish(Some(dest), TypeIdx::new(3));
        assert_eq!(func.name, "add");
        assert_eq!(func.signature(), sig);
        assert_eq!(func.entry_block, BlockId(0));
        assert_eq!(func.blocks.len(), 1);
        assert_eq!(func.type_idx, TypeIdx::new(3));
        assert!(matches!(
            func.blocks[0].terminator,
            IrTerminator::Return {
                value: Some(VarId(2))
            }
        ));
    }
}

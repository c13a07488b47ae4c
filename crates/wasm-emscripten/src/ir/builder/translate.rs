//! Operator translation - converts WebAssembly bytecode to SSA IR instructions.
//!
//! Structured control flow is lowered to basic blocks: `block`/`if` get an
//! end block that forward branches jump to, `loop` gets a header that
//! backward branches jump to. A block result is a variable every exit of
//! the block assigns before jumping to its end.

use super::super::types::*;
use super::core::{ControlFrame, ControlKind, IrBuilder, ModuleContext};
use anyhow::{bail, Context, Result};
use wasmparser::{BlockType, Operator};

impl IrBuilder {
    /// Translate a single Wasm operator to IR instructions.
    pub(super) fn translate_operator(&mut self, op: &Operator, ctx: &ModuleContext) -> Result<()> {
        if let Some(bin) = binop(op) {
            return self.emit_binop(bin);
        }
        if let Some(un) = unop(op) {
            return self.emit_unop(un);
        }

        match op {
            // Constants
            Operator::I32Const { value } => self.emit_const(IrValue::I32(*value)),
            Operator::I64Const { value } => self.emit_const(IrValue::I64(*value)),
            Operator::F32Const { value } => {
                self.emit_const(IrValue::F32(f32::from_bits(value.bits())))
            }
            Operator::F64Const { value } => {
                self.emit_const(IrValue::F64(f64::from_bits(value.bits())))
            }

            // Local variable access
            Operator::LocalGet { local_index } => {
                let var = self.local_var(*local_index)?;
                self.value_stack.push(var);
            }

            Operator::LocalSet { local_index } => {
                let src = self.pop("local.set")?;
                let dest = self.local_var(*local_index)?;
                self.emit(IrInstr::Assign { dest, src });
            }

            Operator::LocalTee { local_index } => {
                let src = self.pop("local.tee")?;
                self.value_stack.push(src);
                let dest = self.local_var(*local_index)?;
                self.emit(IrInstr::Assign { dest, src });
            }

            // Globals
            Operator::GlobalGet { global_index } => {
                let dest = self.new_var();
                self.emit(IrInstr::GlobalGet {
                    dest,
                    index: GlobalIdx::new(*global_index as usize),
                });
                self.value_stack.push(dest);
            }

            Operator::GlobalSet { global_index } => {
                let value = self.pop("global.set")?;
                self.emit(IrInstr::GlobalSet {
                    index: GlobalIdx::new(*global_index as usize),
                    value,
                });
            }

            // Memory loads
            Operator::I32Load { memarg } => self.emit_load(WasmType::I32, memarg, None)?,
            Operator::I64Load { memarg } => self.emit_load(WasmType::I64, memarg, None)?,
            Operator::F32Load { memarg } => self.emit_load(WasmType::F32, memarg, None)?,
            Operator::F64Load { memarg } => self.emit_load(WasmType::F64, memarg, None)?,
            Operator::I32Load8S { memarg } => self.emit_load(
                WasmType::I32,
                memarg,
                Some((MemoryAccessWidth::I8, SignExtension::Signed)),
            )?,
            Operator::I32Load8U { memarg } => self.emit_load(
                WasmType::I32,
                memarg,
                Some((MemoryAccessWidth::I8, SignExtension::Unsigned)),
            )?,
            Operator::I32Load16S { memarg } => self.emit_load(
                WasmType::I32,
                memarg,
                Some((MemoryAccessWidth::I16, SignExtension::Signed)),
            )?,
            Operator::I32Load16U { memarg } => self.emit_load(
                WasmType::I32,
                memarg,
                Some((MemoryAccessWidth::I16, SignExtension::Unsigned)),
            )?,
            Operator::I64Load8S { memarg } => self.emit_load(
                WasmType::I64,
                memarg,
                Some((MemoryAccessWidth::I8, SignExtension::Signed)),
            )?,
            Operator::I64Load8U { memarg } => self.emit_load(
                WasmType::I64,
                memarg,
                Some((MemoryAccessWidth::I8, SignExtension::Unsigned)),
            )?,
            Operator::I64Load16S { memarg } => self.emit_load(
                WasmType::I64,
                memarg,
                Some((MemoryAccessWidth::I16, SignExtension::Signed)),
            )?,
            Operator::I64Load16U { memarg } => self.emit_load(
                WasmType::I64,
                memarg,
                Some((MemoryAccessWidth::I16, SignExtension::Unsigned)),
            )?,
            Operator::I64Load32S { memarg } => self.emit_load(
                WasmType::I64,
                memarg,
                Some((MemoryAccessWidth::I32, SignExtension::Signed)),
            )?,
            Operator::I64Load32U { memarg } => self.emit_load(
                WasmType::I64,
                memarg,
                Some((MemoryAccessWidth::I32, SignExtension::Unsigned)),
            )?,

            // Memory stores
            Operator::I32Store { memarg } => {
                self.emit_store(WasmType::I32, memarg, MemoryAccessWidth::Full)?
            }
            Operator::I64Store { memarg } => {
                self.emit_store(WasmType::I64, memarg, MemoryAccessWidth::Full)?
            }
            Operator::F32Store { memarg } => {
                self.emit_store(WasmType::F32, memarg, MemoryAccessWidth::Full)?
            }
            Operator::F64Store { memarg } => {
                self.emit_store(WasmType::F64, memarg, MemoryAccessWidth::Full)?
            }
            Operator::I32Store8 { memarg } => {
                self.emit_store(WasmType::I32, memarg, MemoryAccessWidth::I8)?
            }
            Operator::I32Store16 { memarg } => {
                self.emit_store(WasmType::I32, memarg, MemoryAccessWidth::I16)?
            }
            Operator::I64Store8 { memarg } => {
                self.emit_store(WasmType::I64, memarg, MemoryAccessWidth::I8)?
            }
            Operator::I64Store16 { memarg } => {
                self.emit_store(WasmType::I64, memarg, MemoryAccessWidth::I16)?
            }
            Operator::I64Store32 { memarg } => {
                self.emit_store(WasmType::I64, memarg, MemoryAccessWidth::I32)?
            }

            // Memory size, growth and bulk operations
            Operator::MemorySize { mem: 0 } => {
                let dest = self.new_var();
                self.emit(IrInstr::MemorySize { dest });
                self.value_stack.push(dest);
            }

            Operator::MemoryGrow { mem: 0 } => {
                let delta = self.pop("memory.grow")?;
                let dest = self.new_var();
                self.emit(IrInstr::MemoryGrow { dest, delta });
                self.value_stack.push(dest);
            }

            Operator::MemoryFill { mem: 0 } => {
                let len = self.pop("memory.fill")?;
                let value = self.pop("memory.fill")?;
                let dst = self.pop("memory.fill")?;
                self.emit(IrInstr::MemoryFill { dst, value, len });
            }

            Operator::MemoryCopy {
                dst_mem: 0,
                src_mem: 0,
            } => {
                let len = self.pop("memory.copy")?;
                let src = self.pop("memory.copy")?;
                let dst = self.pop("memory.copy")?;
                self.emit(IrInstr::MemoryCopy { dst, src, len });
            }

            Operator::Select | Operator::TypedSelect { .. } => {
                let condition = self.pop("select")?;
                let val2 = self.pop("select")?;
                let val1 = self.pop("select")?;
                let dest = self.new_var();
                self.emit(IrInstr::Select {
                    dest,
                    val1,
                    val2,
                    condition,
                });
                self.value_stack.push(dest);
            }

            Operator::Call { function_index } => {
                let func_idx = *function_index as usize;
                let callee = ctx
                    .func_signatures
                    .get(func_idx)
                    .ok_or_else(|| anyhow::anyhow!("Call to unknown function {}", func_idx))?;
                let args = self.pop_args(callee.params.len(), "call")?;
                let dest = callee.return_type.map(|_| self.new_var());

                if let Some(target) = ctx.func_imports.get(func_idx) {
                    self.emit(IrInstr::CallImport {
                        dest,
                        module_name: target.module_name.clone(),
                        func_name: target.func_name.clone(),
                        class: target.class,
                        site_type: callee.clone(),
                        args,
                    });
                } else {
                    let local_func_idx = func_idx - ctx.num_imported_functions();
                    self.emit(IrInstr::Call {
                        dest,
                        func_idx: LocalFuncIdx::new(local_func_idx),
                        args,
                    });
                }

                if let Some(d) = dest {
                    self.value_stack.push(d);
                }
            }

            Operator::CallIndirect {
                type_index,
                table_index,
            } => {
                if *table_index != 0 {
                    bail!("Multi-table not supported (table_index={})", table_index);
                }
                let callee = ctx
                    .type_signatures
                    .get(*type_index as usize)
                    .ok_or_else(|| anyhow::anyhow!("call_indirect to unknown type {}", type_index))?;
                let table_idx = self.pop("call_indirect")?;
                let args = self.pop_args(callee.params.len(), "call_indirect")?;
                let dest = callee.return_type.map(|_| self.new_var());
                self.emit(IrInstr::CallIndirect {
                    dest,
                    type_idx: TypeIdx::new(*type_index as usize),
                    table_idx,
                    args,
                });
                if let Some(d) = dest {
                    self.value_stack.push(d);
                }
            }

            Operator::Drop => {
                self.pop("drop")?;
            }

            Operator::Nop => {}

            // Control flow
            Operator::Block { blockty } => {
                let result_type = block_result(blockty)?;
                let end_block = self.new_block();
                let start_block = self.current_block;
                self.push_control(ControlKind::Block, start_block, end_block, None, result_type);
            }

            Operator::Loop { blockty } => {
                let result_type = block_result(blockty)?;
                let header = self.new_block();
                let end_block = self.new_block();
                self.terminate(IrTerminator::Jump { target: header });
                self.start_block(header);
                self.push_control(ControlKind::Loop, header, end_block, None, result_type);
            }

            Operator::If { blockty } => {
                let result_type = block_result(blockty)?;
                let condition = self.pop("if condition")?;
                let then_block = self.new_block();
                let else_block = self.new_block();
                let end_block = self.new_block();
                self.terminate(IrTerminator::BranchIf {
                    condition,
                    if_true: then_block,
                    if_false: else_block,
                });
                self.start_block(then_block);
                self.push_control(
                    ControlKind::If,
                    then_block,
                    end_block,
                    Some(else_block),
                    result_type,
                );
            }

            Operator::Else => {
                self.assign_frame_result()?;
                let frame = self.pop_control().context("else without matching if")?;
                if frame.kind != ControlKind::If {
                    bail!("else without matching if");
                }
                self.value_stack.truncate(frame.height);
                self.terminate(IrTerminator::Jump {
                    target: frame.end_block,
                });

                let else_block = frame.else_block.context("if frame without else block")?;
                self.start_block(else_block);
                self.control_stack.push(ControlFrame {
                    kind: ControlKind::Else,
                    start_block: else_block,
                    else_block: None,
                    unreachable: false,
                    ..frame
                });
            }

            Operator::End => {
                if self.control_stack.len() == 1 {
                    return self.end_function();
                }
                self.assign_frame_result()?;
                let frame = self.pop_control()?;
                self.value_stack.truncate(frame.height);
                self.terminate(IrTerminator::Jump {
                    target: frame.end_block,
                });

                // An `if` without `else` falls straight through on false.
                if let Some(else_block) = frame.else_block {
                    self.start_block(else_block);
                    self.terminate(IrTerminator::Jump {
                        target: frame.end_block,
                    });
                }

                self.start_block(frame.end_block);
                if let Some(result_var) = frame.result_var {
                    self.value_stack.push(result_var);
                }
            }

            Operator::Br { relative_depth } => {
                self.assign_branch_value(&[*relative_depth], true)?;
                let target = self.branch_target(*relative_depth)?;
                self.terminate(IrTerminator::Jump { target });
                self.start_dead_block();
            }

            Operator::BrIf { relative_depth } => {
                let condition = self.pop("br_if")?;
                self.assign_branch_value(&[*relative_depth], false)?;
                let target = self.branch_target(*relative_depth)?;
                let continue_block = self.new_block();
                self.terminate(IrTerminator::BranchIf {
                    condition,
                    if_true: target,
                    if_false: continue_block,
                });
                self.start_block(continue_block);
            }

            Operator::BrTable { targets } => {
                let index = self.pop("br_table")?;
                let mut depths = targets
                    .targets()
                    .collect::<std::result::Result<Vec<u32>, _>>()
                    .context("reading br_table targets")?;
                depths.push(targets.default());
                self.assign_branch_value(&depths, true)?;

                let mut blocks = depths
                    .iter()
                    .map(|depth| self.branch_target(*depth))
                    .collect::<Result<Vec<_>>>()?;
                let default = blocks.pop().context("br_table without default")?;
                self.terminate(IrTerminator::BranchTable {
                    index,
                    targets: blocks,
                    default,
                });
                self.start_dead_block();
            }

            Operator::Return => {
                let value = match self.function_result_var() {
                    Some(_) => Some(self.pop("return")?),
                    None => None,
                };
                self.terminate(IrTerminator::Return { value });
                self.start_dead_block();
            }

            Operator::Unreachable => {
                self.terminate(IrTerminator::Unreachable);
                self.start_dead_block();
            }

            _ => bail!("Unsupported operator: {:?}", op),
        }
        Ok(())
    }

    fn local_var(&self, local_index: u32) -> Result<VarId> {
        self.local_vars
            .get(local_index as usize)
            .copied()
            .ok_or_else(|| anyhow::anyhow!("local index {} out of range", local_index))
    }

    fn emit_const(&mut self, value: IrValue) {
        let dest = self.new_var();
        self.emit(IrInstr::Const { dest, value });
        self.value_stack.push(dest);
    }

    fn emit_binop(&mut self, op: BinOp) -> Result<()> {
        let rhs = self.pop("binary operation")?;
        let lhs = self.pop("binary operation")?;
        let dest = self.new_var();
        self.emit(IrInstr::BinOp { dest, op, lhs, rhs });
        self.value_stack.push(dest);
        Ok(())
    }

    fn emit_unop(&mut self, op: UnOp) -> Result<()> {
        let operand = self.pop("unary operation")?;
        let dest = self.new_var();
        self.emit(IrInstr::UnOp { dest, op, operand });
        self.value_stack.push(dest);
        Ok(())
    }

    /// Stack: [addr] -> [value]
    fn emit_load(
        &mut self,
        ty: WasmType,
        memarg: &wasmparser::MemArg,
        narrow: Option<(MemoryAccessWidth, SignExtension)>,
    ) -> Result<()> {
        if memarg.memory != 0 {
            bail!("Multi-memory not supported (memory={})", memarg.memory);
        }
        let addr = self.pop("load")?;
        let dest = self.new_var();
        let (width, sign) = match narrow {
            Some((width, sign)) => (width, Some(sign)),
            None => (MemoryAccessWidth::Full, None),
        };
        self.emit(IrInstr::Load {
            dest,
            ty,
            addr,
            offset: memarg.offset as u32,
            width,
            sign,
        });
        self.value_stack.push(dest);
        Ok(())
    }

    /// Stack: [addr, value] -> []
    fn emit_store(
        &mut self,
        ty: WasmType,
        memarg: &wasmparser::MemArg,
        width: MemoryAccessWidth,
    ) -> Result<()> {
        if memarg.memory != 0 {
            bail!("Multi-memory not supported (memory={})", memarg.memory);
        }
        let value = self.pop("store")?;
        let addr = self.pop("store")?;
        self.emit(IrInstr::Store {
            ty,
            addr,
            value,
            offset: memarg.offset as u32,
            width,
        });
        Ok(())
    }

    /// Result variable of the function-level frame.
    fn function_result_var(&self) -> Option<VarId> {
        self.control_stack.first().and_then(|f| f.result_var)
    }

    /// Assign the innermost frame's result from the top of the stack, unless
    /// the frame already ended in a branch.
    fn assign_frame_result(&mut self) -> Result<()> {
        let (result_var, unreachable) = match self.control_stack.last() {
            Some(frame) => (frame.result_var, frame.unreachable),
            None => return Ok(()),
        };
        if let (Some(dest), false) = (result_var, unreachable) {
            let src = self.pop("block result")?;
            self.emit(IrInstr::Assign { dest, src });
        }
        Ok(())
    }

    /// Hand the value a branch carries to each target's result variable.
    ///
    /// `consume` is false for `br_if`, whose value stays on the stack for
    /// the fallthrough path.
    fn assign_branch_value(&mut self, depths: &[u32], consume: bool) -> Result<()> {
        let mut dests = Vec::new();
        for depth in depths {
            if let Some(var) = self.branch_result_var(*depth)? {
                if !dests.contains(&var) {
                    dests.push(var);
                }
            }
        }
        if dests.is_empty() {
            return Ok(());
        }
        let src = self.pop("branch value")?;
        if !consume {
            self.value_stack.push(src);
        }
        for dest in dests {
            self.emit(IrInstr::Assign { dest, src });
        }
        Ok(())
    }

    /// Continue in a fresh block after a terminator so that trailing
    /// (dead) operators have somewhere to go.
    fn start_dead_block(&mut self) {
        self.mark_unreachable();
        let dead = self.new_block();
        self.start_block(dead);
    }

    /// The function body's final `end`.
    ///
    /// Falling off the end returns the top of the stack directly. The
    /// function frame's exit block only materializes when some branch
    /// targets it.
    fn end_function(&mut self) -> Result<()> {
        let reachable = self.control_stack.last().is_some_and(|f| !f.unreachable);
        if reachable {
            let value = match self.function_result_var() {
                Some(_) => Some(self.pop("function result")?),
                None => None,
            };
            self.terminate(IrTerminator::Return { value });
        }

        let frame = self.pop_control()?;
        let exit = frame.end_block;
        if self
            .blocks
            .iter()
            .any(|b| b.terminator.successors().contains(&exit))
        {
            self.start_block(exit);
            self.terminate(IrTerminator::Return {
                value: frame.result_var,
            });
        }
        Ok(())
    }
}

/// Result type of a structured block.
fn block_result(blockty: &BlockType) -> Result<Option<WasmType>> {
    match blockty {
        BlockType::Empty => Ok(None),
        BlockType::Type(vt) => WasmType::from_wasmparser(*vt).map(Some),
        BlockType::FuncType(_) => bail!("Multi-value blocks not supported"),
    }
}

/// Binary operator for a Wasm arithmetic or comparison instruction.
fn binop(op: &Operator) -> Option<BinOp> {
    Some(match op {
        Operator::I32Add => BinOp::I32Add,
        Operator::I32Sub => BinOp::I32Sub,
        Operator::I32Mul => BinOp::I32Mul,
        Operator::I32DivS => BinOp::I32DivS,
        Operator::I32DivU => BinOp::I32DivU,
        Operator::I32RemS => BinOp::I32RemS,
        Operator::I32RemU => BinOp::I32RemU,
        Operator::I32And => BinOp::I32And,
        Operator::I32Or => BinOp::I32Or,
        Operator::I32Xor => BinOp::I32Xor,
        Operator::I32Shl => BinOp::I32Shl,
        Operator::I32ShrS => BinOp::I32ShrS,
        Operator::I32ShrU => BinOp::I32ShrU,
        Operator::I32Rotl => BinOp::I32Rotl,
        Operator::I32Rotr => BinOp::I32Rotr,
        Operator::I32Eq => BinOp::I32Eq,
        Operator::I32Ne => BinOp::I32Ne,
        Operator::I32LtS => BinOp::I32LtS,
        Operator::I32LtU => BinOp::I32LtU,
        Operator::I32GtS => BinOp::I32GtS,
        Operator::I32GtU => BinOp::I32GtU,
        Operator::I32LeS => BinOp::I32LeS,
        Operator::I32LeU => BinOp::I32LeU,
        Operator::I32GeS => BinOp::I32GeS,
        Operator::I32GeU => BinOp::I32GeU,

        Operator::I64Add => BinOp::I64Add,
        Operator::I64Sub => BinOp::I64Sub,
        Operator::I64Mul => BinOp::I64Mul,
        Operator::I64DivS => BinOp::I64DivS,
        Operator::I64DivU => BinOp::I64DivU,
        Operator::I64RemS => BinOp::I64RemS,
        Operator::I64RemU => BinOp::I64RemU,
        Operator::I64And => BinOp::I64And,
        Operator::I64Or => BinOp::I64Or,
        Operator::I64Xor => BinOp::I64Xor,
        Operator::I64Shl => BinOp::I64Shl,
        Operator::I64ShrS => BinOp::I64ShrS,
        Operator::I64ShrU => BinOp::I64ShrU,
        Operator::I64Rotl => BinOp::I64Rotl,
        Operator::I64Rotr => BinOp::I64Rotr,
        Operator::I64Eq => BinOp::I64Eq,
        Operator::I64Ne => BinOp::I64Ne,
        Operator::I64LtS => BinOp::I64LtS,
        Operator::I64LtU => BinOp::I64LtU,
        Operator::I64GtS => BinOp::I64GtS,
        Operator::I64GtU => BinOp::I64GtU,
        Operator::I64LeS => BinOp::I64LeS,
        Operator::I64LeU => BinOp::I64LeU,
        Operator::I64GeS => BinOp::I64GeS,
        Operator::I64GeU => BinOp::I64GeU,

        Operator::F32Add => BinOp::F32Add,
        Operator::F32Sub => BinOp::F32Sub,
        Operator::F32Mul => BinOp::F32Mul,
        Operator::F32Div => BinOp::F32Div,
        Operator::F32Min => BinOp::F32Min,
        Operator::F32Max => BinOp::F32Max,
        Operator::F32Copysign => BinOp::F32Copysign,
        Operator::F32Eq => BinOp::F32Eq,
        Operator::F32Ne => BinOp::F32Ne,
        Operator::F32Lt => BinOp::F32Lt,
        Operator::F32Gt => BinOp::F32Gt,
        Operator::F32Le => BinOp::F32Le,
        Operator::F32Ge => BinOp::F32Ge,

        Operator::F64Add => BinOp::F64Add,
        Operator::F64Sub => BinOp::F64Sub,
        Operator::F64Mul => BinOp::F64Mul,
        Operator::F64Div => BinOp::F64Div,
        Operator::F64Min => BinOp::F64Min,
        Operator::F64Max => BinOp::F64Max,
        Operator::F64Copysign => BinOp::F64Copysign,
        Operator::F64Eq => BinOp::F64Eq,
        Operator::F64Ne => BinOp::F64Ne,
        Operator::F64Lt => BinOp::F64Lt,
        Operator::F64Gt => BinOp::F64Gt,
        Operator::F64Le => BinOp::F64Le,
        Operator::F64Ge => BinOp::F64Ge,

        _ => return None,
    })
}

/// Unary operator for a Wasm test, numeric or conversion instruction.
fn unop(op: &Operator) -> Option<UnOp> {
    Some(match op {
        Operator::I32Eqz => UnOp::I32Eqz,
        Operator::I32Clz => UnOp::I32Clz,
        Operator::I32Ctz => UnOp::I32Ctz,
        Operator::I32Popcnt => UnOp::I32Popcnt,
        Operator::I32Extend8S => UnOp::I32Extend8S,
        Operator::I32Extend16S => UnOp::I32Extend16S,
        Operator::I64Eqz => UnOp::I64Eqz,
        Operator::I64Clz => UnOp::I64Clz,
        Operator::I64Ctz => UnOp::I64Ctz,
        Operator::I64Popcnt => UnOp::I64Popcnt,
        Operator::I64Extend8S => UnOp::I64Extend8S,
        Operator::I64Extend16S => UnOp::I64Extend16S,
        Operator::I64Extend32S => UnOp::I64Extend32S,

        Operator::F32Abs => UnOp::F32Abs,
        Operator::F32Neg => UnOp::F32Neg,
        Operator::F32Ceil => UnOp::F32Ceil,
        Operator::F32Floor => UnOp::F32Floor,
        Operator::F32Trunc => UnOp::F32Trunc,
        Operator::F32Nearest => UnOp::F32Nearest,
        Operator::F32Sqrt => UnOp::F32Sqrt,
        Operator::F64Abs => UnOp::F64Abs,
        Operator::F64Neg => UnOp::F64Neg,
        Operator::F64Ceil => UnOp::F64Ceil,
        Operator::F64Floor => UnOp::F64Floor,
        Operator::F64Trunc => UnOp::F64Trunc,
        Operator::F64Nearest => UnOp::F64Nearest,
        Operator::F64Sqrt => UnOp::F64Sqrt,

        Operator::I32WrapI64 => UnOp::I32WrapI64,
        Operator::I64ExtendI32S => UnOp::I64ExtendI32S,
        Operator::I64ExtendI32U => UnOp::I64ExtendI32U,
        Operator::I32TruncF32S => UnOp::I32TruncF32S,
        Operator::I32TruncF32U => UnOp::I32TruncF32U,
        Operator::I32TruncF64S => UnOp::I32TruncF64S,
        Operator::I32TruncF64U => UnOp::I32TruncF64U,
        Operator::I64TruncF32S => UnOp::I64TruncF32S,
        Operator::I64TruncF32U => UnOp::I64TruncF32U,
        Operator::I64TruncF64S => UnOp::I64TruncF64S,
        Operator::I64TruncF64U => UnOp::I64TruncF64U,
        Operator::I32TruncSatF32S => UnOp::I32TruncSatF32S,
        Operator::I32TruncSatF32U => UnOp::I32TruncSatF32U,
        Operator::I32TruncSatF64S => UnOp::I32TruncSatF64S,
        Operator::I32TruncSatF64U => UnOp::I32TruncSatF64U,
        Operator::I64TruncSatF32S => UnOp::I64TruncSatF32S,
        Operator::I64TruncSatF32U => UnOp::I64TruncSatF32U,
        Operator::I64TruncSatF64S => UnOp::I64TruncSatF64S,
        Operator::I64TruncSatF64U => UnOp::I64TruncSatF64U,
        Operator::F32ConvertI32S => UnOp::F32ConvertI32S,
        Operator::F32ConvertI32U => UnOp::F32ConvertI32U,
        Operator::F32ConvertI64S => UnOp::F32ConvertI64S,
        Operator::F32ConvertI64U => UnOp::F32ConvertI64U,
        Operator::F64ConvertI32S => UnOp::F64ConvertI32S,
        Operator::F64ConvertI32U => UnOp::F64ConvertI32U,
        Operator::F64ConvertI64S => UnOp::F64ConvertI64S,
        Operator::F64ConvertI64U => UnOp::F64ConvertI64U,
        Operator::F32DemoteF64 => UnOp::F32DemoteF64,
        Operator::F64PromoteF32 => UnOp::F64PromoteF32,
        Operator::I32ReinterpretF32 => UnOp::I32ReinterpretF32,
        Operator::I64ReinterpretF64 => UnOp::I64ReinterpretF64,
        Operator::F32ReinterpretI32 => UnOp::F32ReinterpretI32,
        Operator::F64ReinterpretI64 => UnOp::F64ReinterpretI64,

        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx_with_import(class: ImportClass) -> ModuleContext {
        let sig = FuncSignature {
            params: vec![WasmType::I32, WasmType::I32],
            return_type: None,
        };
        ModuleContext {
            func_signatures: vec![sig.clone()],
            type_signatures: vec![sig],
            func_imports: vec![super::super::core::ImportTarget {
                module_name: "env".to_string(),
                func_name: "emscripten_asm_const_vi".to_string(),
                class,
            }],
            func_names: vec!["f".to_string()],
        }
    }

    fn void_sig() -> FuncSignature {
        FuncSignature {
            params: vec![],
            return_type: None,
        }
    }

    #[test]
    fn import_call_carries_site_type_and_class() {
        let ctx = ctx_with_import(ImportClass::AsmConst);
        let ops = vec![
            Operator::I32Const { value: 64 },
            Operator::I32Const { value: 7 },
            Operator::Call { function_index: 0 },
            Operator::End,
        ];
        let func = IrBuilder::new()
            .translate_function("f".to_string(), &void_sig(), &[], &ops, &ctx)
            .unwrap();
        match &func.blocks[0].instructions[2] {
            IrInstr::CallImport {
                dest,
                class,
                args,
                site_type,
                ..
            } => {
                assert!(dest.is_none());
                assert_eq!(*class, ImportClass::AsmConst);
                assert_eq!(args, &vec![VarId(0), VarId(1)]);
                assert_eq!(site_type.params.len(), 2);
            }
            other => panic!("expected CallImport, got {:?}", other),
        }
    }

    #[test]
    fn call_indirect_pops_table_index_last() {
        let ctx = ctx_with_import(ImportClass::Plain);
        let ops = vec![
            Operator::I32Const { value: 1 },
            Operator::I32Const { value: 2 },
            Operator::I32Const { value: 3 },
            Operator::CallIndirect {
                type_index: 0,
                table_index: 0,
            },
            Operator::End,
        ];
        let func = IrBuilder::new()
            .translate_function("f".to_string(), &void_sig(), &[], &ops, &ctx)
            .unwrap();
        match &func.blocks[0].instructions[3] {
            IrInstr::CallIndirect {
                table_idx, args, ..
            } => {
                assert_eq!(*table_idx, VarId(2));
                assert_eq!(args, &vec![VarId(0), VarId(1)]);
            }
            other => panic!("expected CallIndirect, got {:?}", other),
        }
    }

    #[test]
    fn return_starts_dead_block() {
        let ctx = ctx_with_import(ImportClass::Plain);
        let sig = FuncSignature {
            params: vec![],
            return_type: Some(WasmType::I32),
        };
        let ops = vec![
            Operator::I32Const { value: 1 },
            Operator::Return,
            Operator::I32Const { value: 2 },
            Operator::End,
        ];
        let func = IrBuilder::new()
            .translate_function("f".to_string(), &sig, &[], &ops, &ctx)
            .unwrap();
        // v0 is the function result; the trailing constant is dead.
        assert_eq!(func.blocks.len(), 2);
        assert!(matches!(
            func.blocks[0].terminator,
            IrTerminator::Return {
                value: Some(VarId(1))
            }
        ));
        assert!(matches!(
            func.blocks[1].terminator,
            IrTerminator::Unreachable
        ));
    }

    #[test]
    fn stack_underflow_is_an_error() {
        let ctx = ctx_with_import(ImportClass::Plain);
        let ops = vec![Operator::I32Add];
        let result =
            IrBuilder::new().translate_function("f".to_string(), &void_sig(), &[], &ops, &ctx);
        assert!(result.is_err());
    }

    fn i32_sig(params: usize) -> FuncSignature {
        FuncSignature {
            params: vec![WasmType::I32; params],
            return_type: Some(WasmType::I32),
        }
    }

    fn block_by_id(func: &IrFunction, id: u32) -> &IrBlock {
        func.blocks
            .iter()
            .find(|b| b.id == BlockId(id))
            .unwrap_or_else(|| panic!("no block {}", id))
    }

    fn memarg(offset: u64) -> wasmparser::MemArg {
        wasmparser::MemArg {
            align: 0,
            max_align: 2,
            offset,
            memory: 0,
        }
    }

    #[test]
    fn if_else_joins_through_result_variable() {
        let ctx = ctx_with_import(ImportClass::Plain);
        let ops = vec![
            Operator::LocalGet { local_index: 0 },
            Operator::If {
                blockty: BlockType::Type(wasmparser::ValType::I32),
            },
            Operator::I32Const { value: 1 },
            Operator::Else,
            Operator::I32Const { value: 2 },
            Operator::End,
            Operator::End,
        ];
        let func = IrBuilder::new()
            .translate_function("f".to_string(), &i32_sig(1), &[], &ops, &ctx)
            .unwrap();

        // v0 param, v1 function result, v2 if result
        assert!(matches!(
            func.blocks[0].terminator,
            IrTerminator::BranchIf {
                condition: VarId(0),
                if_true: BlockId(2),
                if_false: BlockId(3),
            }
        ));
        for arm in [2, 3] {
            let block = block_by_id(&func, arm);
            assert!(matches!(
                block.instructions.last(),
                Some(IrInstr::Assign {
                    dest: VarId(2),
                    ..
                })
            ));
            assert!(matches!(
                block.terminator,
                IrTerminator::Jump {
                    target: BlockId(4)
                }
            ));
        }
        assert!(matches!(
            block_by_id(&func, 4).terminator,
            IrTerminator::Return {
                value: Some(VarId(2))
            }
        ));
    }

    #[test]
    fn if_without_else_falls_through() {
        let ctx = ctx_with_import(ImportClass::Plain);
        let ops = vec![
            Operator::I32Const { value: 1 },
            Operator::If {
                blockty: BlockType::Empty,
            },
            Operator::Nop,
            Operator::End,
            Operator::End,
        ];
        let func = IrBuilder::new()
            .translate_function("f".to_string(), &void_sig(), &[], &ops, &ctx)
            .unwrap();
        assert!(matches!(
            block_by_id(&func, 3).terminator,
            IrTerminator::Jump {
                target: BlockId(4)
            }
        ));
    }

    #[test]
    fn br_carries_value_to_block_result() {
        let ctx = ctx_with_import(ImportClass::Plain);
        let ops = vec![
            Operator::Block {
                blockty: BlockType::Type(wasmparser::ValType::I32),
            },
            Operator::I32Const { value: 7 },
            Operator::Br { relative_depth: 0 },
            Operator::I32Const { value: 8 },
            Operator::End,
            Operator::End,
        ];
        let func = IrBuilder::new()
            .translate_function("f".to_string(), &i32_sig(0), &[], &ops, &ctx)
            .unwrap();

        // v0 function result, v1 block result, v2 the constant 7
        let entry = &func.blocks[0];
        assert!(matches!(
            entry.instructions.last(),
            Some(IrInstr::Assign {
                dest: VarId(1),
                src: VarId(2)
            })
        ));
        assert!(matches!(
            entry.terminator,
            IrTerminator::Jump {
                target: BlockId(2)
            }
        ));
        assert!(matches!(
            block_by_id(&func, 2).terminator,
            IrTerminator::Return {
                value: Some(VarId(1))
            }
        ));
    }

    #[test]
    fn br_if_in_loop_branches_to_header() {
        let ctx = ctx_with_import(ImportClass::Plain);
        let ops = vec![
            Operator::Loop {
                blockty: BlockType::Empty,
            },
            Operator::I32Const { value: 0 },
            Operator::BrIf { relative_depth: 0 },
            Operator::End,
            Operator::End,
        ];
        let func = IrBuilder::new()
            .translate_function("f".to_string(), &void_sig(), &[], &ops, &ctx)
            .unwrap();

        assert!(matches!(
            func.blocks[0].terminator,
            IrTerminator::Jump {
                target: BlockId(2)
            }
        ));
        assert!(matches!(
            block_by_id(&func, 2).terminator,
            IrTerminator::BranchIf {
                if_true: BlockId(2),
                if_false: BlockId(4),
                ..
            }
        ));
        assert!(matches!(
            block_by_id(&func, 4).terminator,
            IrTerminator::Jump {
                target: BlockId(3)
            }
        ));
    }

    #[test]
    fn br_to_function_frame_returns_through_exit_block() {
        let ctx = ctx_with_import(ImportClass::Plain);
        let ops = vec![
            Operator::I32Const { value: 5 },
            Operator::Br { relative_depth: 0 },
            Operator::End,
        ];
        let func = IrBuilder::new()
            .translate_function("f".to_string(), &i32_sig(0), &[], &ops, &ctx)
            .unwrap();

        assert_eq!(func.blocks.len(), 3);
        assert!(matches!(
            block_by_id(&func, 1).terminator,
            IrTerminator::Return {
                value: Some(VarId(0))
            }
        ));
    }

    #[test]
    fn dead_code_may_pop_past_frame() {
        let ctx = ctx_with_import(ImportClass::Plain);
        let ops = vec![
            Operator::Unreachable,
            Operator::I32Add,
            Operator::Drop,
            Operator::End,
        ];
        let func = IrBuilder::new()
            .translate_function("f".to_string(), &void_sig(), &[], &ops, &ctx)
            .unwrap();
        assert!(matches!(
            func.blocks[0].terminator,
            IrTerminator::Unreachable
        ));
    }

    #[test]
    fn globals_and_memory_accesses() {
        let ctx = ctx_with_import(ImportClass::Plain);
        let ops = vec![
            Operator::GlobalGet { global_index: 0 },
            Operator::I32Load { memarg: memarg(4) },
            Operator::GlobalSet { global_index: 1 },
            Operator::GlobalGet { global_index: 0 },
            Operator::I32Const { value: 9 },
            Operator::I32Store8 { memarg: memarg(0) },
            Operator::End,
        ];
        let func = IrBuilder::new()
            .translate_function("f".to_string(), &void_sig(), &[], &ops, &ctx)
            .unwrap();

        let instrs = &func.blocks[0].instructions;
        assert!(matches!(
            instrs[0],
            IrInstr::GlobalGet { dest: VarId(0), index } if index.as_usize() == 0
        ));
        assert!(matches!(
            instrs[1],
            IrInstr::Load {
                dest: VarId(1),
                ty: WasmType::I32,
                addr: VarId(0),
                offset: 4,
                width: MemoryAccessWidth::Full,
                sign: None,
            }
        ));
        assert!(matches!(
            instrs[2],
            IrInstr::GlobalSet { index, value: VarId(1) } if index.as_usize() == 1
        ));
        assert!(matches!(
            instrs[5],
            IrInstr::Store {
                addr: VarId(2),
                value: VarId(3),
                width: MemoryAccessWidth::I8,
                ..
            }
        ));
    }

    #[test]
    fn comparisons_feed_branches() {
        let ctx = ctx_with_import(ImportClass::Plain);
        let ops = vec![
            Operator::LocalGet { local_index: 0 },
            Operator::I32Eqz,
            Operator::If {
                blockty: BlockType::Empty,
            },
            Operator::End,
            Operator::LocalGet { local_index: 0 },
            Operator::End,
        ];
        let func = IrBuilder::new()
            .translate_function("f".to_string(), &i32_sig(1), &[], &ops, &ctx)
            .unwrap();
        assert!(matches!(
            func.blocks[0].instructions[0],
            IrInstr::UnOp {
                op: UnOp::I32Eqz,
                operand: VarId(0),
                ..
            }
        ));
    }

    #[test]
    fn unbalanced_else_is_an_error() {
        let ctx = ctx_with_import(ImportClass::Plain);
        let ops = vec![
            Operator::Block {
                blockty: BlockType::Empty,
            },
            Operator::Else,
            Operator::End,
            Operator::End,
        ];
        let result =
            IrBuilder::new().translate_function("f".to_string(), &void_sig(), &[], &ops, &ctx);
        assert!(result.is_err());
    }
}

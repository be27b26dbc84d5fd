//! `FunctionBuilder`: per-function IR construction state — the block
//! list, the SSA value counter, and the small helpers every lowering
//! routine uses to append instructions and wire up control flow.

use crate::ir::{BlockId, IrBlock, IrInst, IrTerminator, IrType, ValueId};

pub(crate) struct FunctionBuilder {
    blocks: Vec<IrBlock>,
    current: usize,
    next_value: u32,
    next_block: u32,
    value_types: Vec<IrType>,
}

impl FunctionBuilder {
    pub(crate) fn new() -> Self {
        let mut builder = FunctionBuilder {
            blocks: Vec::new(),
            current: 0,
            next_value: 0,
            next_block: 0,
            value_types: Vec::new(),
        };
        let entry = builder.new_block("entry");
        builder.switch_to(entry);
        builder
    }

    pub(crate) fn new_value(&mut self, ty: IrType) -> ValueId {
        let id = ValueId(self.next_value);
        self.next_value += 1;
        self.value_types.push(ty);
        id
    }

    pub(crate) fn new_block(&mut self, name: impl Into<std::rc::Rc<str>>) -> BlockId {
        let id = BlockId(self.next_block);
        self.next_block += 1;
        self.blocks.push(IrBlock::new(id, name));
        id
    }

    pub(crate) fn switch_to(&mut self, id: BlockId) {
        match self.blocks.iter().position(|b| b.id == id) {
            Some(index) => self.current = index,
            None => unreachable!("block id must exist: every BlockId is produced by this same builder"),
        }
    }

    pub(crate) fn current_block(&self) -> BlockId {
        self.blocks[self.current].id
    }

    /// True once the current block already has a terminator — any further
    /// statements in the same source block are dead code and must not be
    /// appended to it.
    pub(crate) fn current_is_terminated(&self) -> bool {
        self.blocks[self.current].terminator.is_some()
    }

    pub(crate) fn emit(&mut self, inst: IrInst) {
        if self.current_is_terminated() {
            return;
        }
        self.blocks[self.current].insts.push(inst);
    }

    pub(crate) fn set_terminator(&mut self, term: IrTerminator) {
        if self.current_is_terminated() {
            return;
        }
        self.blocks[self.current].terminator = Some(term);
    }

    pub(crate) fn finish(mut self) -> (Vec<IrBlock>, Vec<IrType>) {
        for block in self.blocks.iter_mut() {
            if block.terminator.is_none() {
                block.terminator = Some(IrTerminator::Ret(None));
            }
        }
        (self.blocks, self.value_types)
    }
}

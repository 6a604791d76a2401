//! Lowering of three-address code to a simplified register machine.
//!
//! The target has an unbounded supply of virtual registers (`r0`, `r1`, ...)
//! and a reserved return register `rv`. Every distinct TAC name receives
//! its own register on first encounter and keeps it for the whole pass:
//! there is no liveness analysis, no reuse and no spilling.
//!
//! Literal operands are materialized with `LI` into a register keyed by the
//! literal itself and array element addresses into a register keyed by the
//! `(array, index)` pair, so every register still belongs to exactly one
//! name.
use std::collections::HashMap;
use std::fmt;

use crate::ir::{BinaryOp, Instruction, Label, Location, Value, ELEMENT_WIDTH};

/// Register represents a virtual register or the reserved return register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Register {
    Virtual(usize),
    Return,
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Virtual(id) => write!(f, "r{id}"),
            Self::Return => write!(f, "rv"),
        }
    }
}

/// `RegisterAllocator` maps TAC names to virtual registers in order of first
/// encounter, registers are never freed.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RegisterAllocator {
    // Assignments in allocation order.
    assignments: Vec<(String, Register)>,
    index: HashMap<String, Register>,
}

impl RegisterAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the register of `name`, allocating the next free one on first
    /// encounter.
    pub fn allocate(&mut self, name: &str) -> Register {
        if let Some(register) = self.index.get(name) {
            return *register;
        }
        let register = Register::Virtual(self.assignments.len());
        self.index.insert(name.to_string(), register);
        self.assignments.push((name.to_string(), register));
        register
    }

    /// Returns the register of `name` if one was allocated.
    pub fn get(&self, name: &str) -> Option<Register> {
        self.index.get(name).copied()
    }

    /// Returns the name to register mapping in allocation order.
    pub fn assignments(&self) -> &[(String, Register)] {
        &self.assignments
    }

    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }
}

impl fmt::Display for RegisterAllocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, register) in &self.assignments {
            writeln!(f, "{name} -> {register}")?;
        }
        Ok(())
    }
}

/// Register machine instructions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AsmInstruction {
    // Load immediate.
    Li(Register, i32),
    // Register copy, destination first.
    Mov(Register, Register),
    // Three register arithmetic, destination first.
    Add(Register, Register, Register),
    Sub(Register, Register, Register),
    Mul(Register, Register, Register),
    Div(Register, Register, Register),
    // Multiply by an immediate.
    Muli(Register, Register, i32),
    // Set destination to 1 if lhs > rhs (resp. lhs < rhs), 0 otherwise.
    Sgt(Register, Register, Register),
    Slt(Register, Register, Register),
    // Set destination to 1 if the source is zero (resp. non zero).
    Seqz(Register, Register),
    Snez(Register, Register),
    // Compare a register to an immediate, sets the flags for `Jeq`/`Jne`.
    Cmp(Register, i32),
    Jeq(Label),
    Jne(Label),
    Jmp(Label),
    // Label marker, passed through from the TAC.
    Label(Label),
    Ret,
    // Reserve `bytes` of storage for an array.
    Alloc(String, i32),
    // Load from (resp. store to) the address held in the second register.
    Lw(Register, Register),
    Sw(Register, Register),
}

impl fmt::Display for AsmInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Li(dst, imm) => write!(f, "LI {dst}, {imm}"),
            Self::Mov(dst, src) => write!(f, "MOV {dst}, {src}"),
            Self::Add(dst, lhs, rhs) => write!(f, "ADD {dst}, {lhs}, {rhs}"),
            Self::Sub(dst, lhs, rhs) => write!(f, "SUB {dst}, {lhs}, {rhs}"),
            Self::Mul(dst, lhs, rhs) => write!(f, "MUL {dst}, {lhs}, {rhs}"),
            Self::Div(dst, lhs, rhs) => write!(f, "DIV {dst}, {lhs}, {rhs}"),
            Self::Muli(dst, src, imm) => write!(f, "MULI {dst}, {src}, {imm}"),
            Self::Sgt(dst, lhs, rhs) => write!(f, "SGT {dst}, {lhs}, {rhs}"),
            Self::Slt(dst, lhs, rhs) => write!(f, "SLT {dst}, {lhs}, {rhs}"),
            Self::Seqz(dst, src) => write!(f, "SEQZ {dst}, {src}"),
            Self::Snez(dst, src) => write!(f, "SNEZ {dst}, {src}"),
            Self::Cmp(reg, imm) => write!(f, "CMP {reg}, {imm}"),
            Self::Jeq(target) => write!(f, "JEQ {target}"),
            Self::Jne(target) => write!(f, "JNE {target}"),
            Self::Jmp(target) => write!(f, "JMP {target}"),
            Self::Label(label) => write!(f, "{label}:"),
            Self::Ret => write!(f, "RET"),
            Self::Alloc(name, bytes) => write!(f, "ALLOC {name}, {bytes}"),
            Self::Lw(dst, addr) => write!(f, "LW {dst}, 0({addr})"),
            Self::Sw(src, addr) => write!(f, "SW {src}, 0({addr})"),
        }
    }
}

/// `AssemblyCodeGenerator` lowers a TAC sequence in a single forward pass,
/// one TAC instruction at a time.
pub struct AssemblyCodeGenerator<'a> {
    // TAC being lowered.
    tac: &'a [Instruction],
    allocator: RegisterAllocator,
    asm: Vec<AsmInstruction>,
}

impl<'a> AssemblyCodeGenerator<'a> {
    pub fn new(tac: &'a [Instruction]) -> Self {
        Self {
            tac,
            allocator: RegisterAllocator::new(),
            asm: vec![],
        }
    }

    /// Lower the whole TAC sequence, running it again starts from a clean
    /// allocator so the output is identical.
    pub fn gen(&mut self) {
        self.allocator = RegisterAllocator::new();
        self.asm.clear();
        for inst in self.tac {
            self.lower(inst);
        }
    }

    /// Returns the generated instructions.
    pub fn instructions(&self) -> &[AsmInstruction] {
        &self.asm
    }

    /// Returns the register allocation map.
    pub const fn registers(&self) -> &RegisterAllocator {
        &self.allocator
    }

    /// Consume the generator returning the instructions and the allocation
    /// map.
    pub fn finish(self) -> (Vec<AsmInstruction>, RegisterAllocator) {
        (self.asm, self.allocator)
    }

    fn lower(&mut self, inst: &Instruction) {
        match inst {
            Instruction::Assign(dst, Value::ConstantLiteral(imm)) => {
                let dst = self.location(dst);
                self.emit(AsmInstruction::Li(dst, *imm));
            }
            Instruction::Assign(dst, Value::StorageLocation(src)) => {
                let src = self.location(src);
                let dst = self.location(dst);
                self.emit(AsmInstruction::Mov(dst, src));
            }
            Instruction::BinOp(dst, op, lhs, rhs) => {
                let lhs = self.operand(lhs);
                let rhs = self.operand(rhs);
                let dst = self.location(dst);
                self.binary(*op, dst, lhs, rhs);
            }
            Instruction::Label(label) => self.emit(AsmInstruction::Label(*label)),
            Instruction::Jump(target) => self.emit(AsmInstruction::Jmp(*target)),
            Instruction::Branch(cond, target) => {
                let cond = self.operand(cond);
                self.emit(AsmInstruction::Cmp(cond, 0));
                self.emit(AsmInstruction::Jne(*target));
            }
            Instruction::BranchIfFalse(cond, target) => {
                let cond = self.operand(cond);
                self.emit(AsmInstruction::Cmp(cond, 0));
                self.emit(AsmInstruction::Jeq(*target));
            }
            Instruction::Return(Value::ConstantLiteral(imm)) => {
                self.emit(AsmInstruction::Li(Register::Return, *imm));
                self.emit(AsmInstruction::Ret);
            }
            Instruction::Return(Value::StorageLocation(src)) => {
                let src = self.location(src);
                self.emit(AsmInstruction::Mov(Register::Return, src));
                self.emit(AsmInstruction::Ret);
            }
            Instruction::ArrayDecl(name, size) => {
                self.allocator.allocate(name);
                self.emit(AsmInstruction::Alloc(name.clone(), size.bytes()));
            }
            Instruction::ArrayLoad(dst, name, index) => {
                let addr = self.element_address(name, index);
                let dst = self.location(dst);
                self.emit(AsmInstruction::Lw(dst, addr));
            }
            Instruction::ArrayStore(name, index, value) => {
                let value = self.operand(value);
                let addr = self.element_address(name, index);
                self.emit(AsmInstruction::Sw(value, addr));
            }
        }
    }

    // Emit the compare-and-set or arithmetic sequence of a binary operation.
    fn binary(&mut self, op: BinaryOp, dst: Register, lhs: Register, rhs: Register) {
        match op {
            BinaryOp::Add => self.emit(AsmInstruction::Add(dst, lhs, rhs)),
            BinaryOp::Sub => self.emit(AsmInstruction::Sub(dst, lhs, rhs)),
            BinaryOp::Mul => self.emit(AsmInstruction::Mul(dst, lhs, rhs)),
            BinaryOp::Div => self.emit(AsmInstruction::Div(dst, lhs, rhs)),
            BinaryOp::Gt => self.emit(AsmInstruction::Sgt(dst, lhs, rhs)),
            BinaryOp::Lt => self.emit(AsmInstruction::Slt(dst, lhs, rhs)),
            // lhs >= rhs is !(lhs < rhs).
            BinaryOp::Gte => {
                self.emit(AsmInstruction::Slt(dst, lhs, rhs));
                self.emit(AsmInstruction::Seqz(dst, dst));
            }
            // lhs <= rhs is !(lhs > rhs).
            BinaryOp::Lte => {
                self.emit(AsmInstruction::Sgt(dst, lhs, rhs));
                self.emit(AsmInstruction::Seqz(dst, dst));
            }
            BinaryOp::Eq => {
                self.emit(AsmInstruction::Sub(dst, lhs, rhs));
                self.emit(AsmInstruction::Seqz(dst, dst));
            }
            BinaryOp::Neq => {
                self.emit(AsmInstruction::Sub(dst, lhs, rhs));
                self.emit(AsmInstruction::Snez(dst, dst));
            }
        }
    }

    // Compute `base + index * ELEMENT_WIDTH` into the address register of the
    // element.
    fn element_address(&mut self, name: &str, index: &Value) -> Register {
        let base = self.allocator.allocate(name);
        let index_reg = self.operand(index);
        let addr = self.allocator.allocate(&format!("&{name}[{index}]"));
        self.emit(AsmInstruction::Muli(addr, index_reg, ELEMENT_WIDTH));
        self.emit(AsmInstruction::Add(addr, base, addr));
        addr
    }

    // Register holding a value, literals are loaded with an immediate first.
    fn operand(&mut self, value: &Value) -> Register {
        match value {
            Value::StorageLocation(location) => self.location(location),
            Value::ConstantLiteral(imm) => {
                let register = self.allocator.allocate(&format!("#{imm}"));
                self.emit(AsmInstruction::Li(register, *imm));
                register
            }
        }
    }

    fn location(&mut self, location: &Location) -> Register {
        self.allocator.allocate(&location.to_string())
    }

    fn emit(&mut self, inst: AsmInstruction) {
        self.asm.push(inst)
    }
}

/// Lower `tac` with a fresh generator.
pub fn lower(tac: &[Instruction]) -> Vec<AsmInstruction> {
    let mut generator = AssemblyCodeGenerator::new(tac);
    generator.gen();
    generator.finish().0
}

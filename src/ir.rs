//! The tacc intermediate representation is a linear three-address code used
//! as the hand-off between the parser and the assembly code generator.
//!
//! Every instruction has at most one operator and assigns to at most one
//! destination. Temporaries (`t0`, `t1`, ...) are defined exactly once and
//! labels (`L0`, `L1`, ...) name positions in the instruction stream. Both
//! are minted by the `IntermediateCodeGenerator` in strictly increasing
//! order; the log it builds is append-only.
use std::fmt;

/// Compiler generated, single assignment storage location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Temp(usize);

impl Temp {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for Temp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// Labels are used to designate branch targets in control flow operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Label(usize);

impl Label {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

/// A storage location is either a temporary or a named program variable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Location {
    Temp(Temp),
    Named(String),
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Temp(temp) => write!(f, "{temp}"),
            Self::Named(name) => write!(f, "{name}"),
        }
    }
}

/// Every value in the intermediate representation is either a storage
/// location or a literal value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    StorageLocation(Location),
    ConstantLiteral(i32),
}

impl Value {
    /// Shorthand for a named storage location.
    pub fn named(name: &str) -> Self {
        Self::StorageLocation(Location::Named(name.to_string()))
    }

    /// Returns the temporary this value reads, if any.
    pub fn temp(&self) -> Option<Temp> {
        match self {
            Self::StorageLocation(Location::Temp(temp)) => Some(*temp),
            _ => None,
        }
    }
}

impl From<Temp> for Value {
    fn from(temp: Temp) -> Self {
        Self::StorageLocation(Location::Temp(temp))
    }
}

impl From<Location> for Value {
    fn from(location: Location) -> Self {
        Self::StorageLocation(location)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StorageLocation(location) => write!(f, "{location}"),
            Self::ConstantLiteral(lit) => write!(f, "{lit}"),
        }
    }
}

/// Width in bytes of an `int` array element.
pub const ELEMENT_WIDTH: i32 = 4;

/// Element count of an array declaration, only sizes whose storage fits in
/// an `i32` byte count can be built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArraySize {
    count: u32,
    bytes: i32,
}

impl ArraySize {
    /// Returns `None` for empty arrays or when `count * ELEMENT_WIDTH`
    /// overflows an `i32`.
    pub fn new(count: u32) -> Option<Self> {
        if count == 0 {
            return None;
        }
        let bytes = i32::try_from(count).ok()?.checked_mul(ELEMENT_WIDTH)?;
        Some(Self { count, bytes })
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    /// Storage size in bytes.
    pub fn bytes(&self) -> i32 {
        self.bytes
    }
}

impl fmt::Display for ArraySize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.count)
    }
}

/// Binary operators, arithmetic and comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Gt,
    Lt,
    Eq,
    Neq,
    Gte,
    Lte,
}

impl BinaryOp {
    /// Evaluates the operator on known operands with wrapping `i32`
    /// semantics, returns `None` for a division by zero.
    pub fn evaluate(&self, lhs: i32, rhs: i32) -> Option<i32> {
        let value = match self {
            Self::Add => lhs.wrapping_add(rhs),
            Self::Sub => lhs.wrapping_sub(rhs),
            Self::Mul => lhs.wrapping_mul(rhs),
            Self::Div if rhs == 0 => return None,
            Self::Div => lhs.wrapping_div(rhs),
            Self::Gt => i32::from(lhs > rhs),
            Self::Lt => i32::from(lhs < rhs),
            Self::Eq => i32::from(lhs == rhs),
            Self::Neq => i32::from(lhs != rhs),
            Self::Gte => i32::from(lhs >= rhs),
            Self::Lte => i32::from(lhs <= rhs),
        };
        Some(value)
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Add => write!(f, "+"),
            Self::Sub => write!(f, "-"),
            Self::Mul => write!(f, "*"),
            Self::Div => write!(f, "/"),
            Self::Gt => write!(f, ">"),
            Self::Lt => write!(f, "<"),
            Self::Eq => write!(f, "=="),
            Self::Neq => write!(f, "!="),
            Self::Gte => write!(f, ">="),
            Self::Lte => write!(f, "<="),
        }
    }
}

/// OPCode is a type wrapper around all opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OPCode {
    Assign,
    BinOp,
    // Label pseudo instruction.
    Label,
    // Unconditional jumps.
    Jump,
    // Conditional branches.
    Branch,
    BranchIfFalse,
    Return,
    // Array pseudo instructions.
    ArrayDecl,
    ArrayLoad,
    ArrayStore,
}

/// Instructions in the intermediate representation are in three-address form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    // Copy a value into a storage location.
    Assign(Location, Value),
    // Arithmetic and comparison operations wrap the storage location, the
    // operator and the left and right handside operands.
    BinOp(Location, BinaryOp, Value, Value),
    // Label pseudo instruction, acts as a data marker when generating code.
    Label(Label),
    // Direct jump to label.
    Jump(Label),
    // Jump to label when the condition is non zero.
    Branch(Value, Label),
    // Jump to label when the condition is zero.
    BranchIfFalse(Value, Label),
    // Return statements.
    Return(Value),
    // Array declaration with its element count.
    ArrayDecl(String, ArraySize),
    // `dst = array[index]`.
    ArrayLoad(Location, String, Value),
    // `array[index] = value`.
    ArrayStore(String, Value, Value),
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Assign(dst, value) => write!(f, "{dst} = {value}"),
            Self::BinOp(dst, op, lhs, rhs) => write!(f, "{dst} = {lhs} {op} {rhs}"),
            Self::Label(label) => write!(f, "{label}:"),
            Self::Jump(target) => write!(f, "goto {target}"),
            Self::Branch(cond, target) => write!(f, "if {cond} goto {target}"),
            Self::BranchIfFalse(cond, target) => write!(f, "ifFalse {cond} goto {target}"),
            Self::Return(value) => write!(f, "return {value}"),
            Self::ArrayDecl(name, size) => write!(f, "array {name}[{size}]"),
            Self::ArrayLoad(dst, name, index) => write!(f, "{dst} = {name}[{index}]"),
            Self::ArrayStore(name, index, value) => write!(f, "{name}[{index}] = {value}"),
        }
    }
}

impl Instruction {
    /// Returns the instruction opcode as `OPCode`.
    pub fn opcode(&self) -> OPCode {
        match self {
            Self::Assign(..) => OPCode::Assign,
            Self::BinOp(..) => OPCode::BinOp,
            Self::Label(..) => OPCode::Label,
            Self::Jump(..) => OPCode::Jump,
            Self::Branch(..) => OPCode::Branch,
            Self::BranchIfFalse(..) => OPCode::BranchIfFalse,
            Self::Return(..) => OPCode::Return,
            Self::ArrayDecl(..) => OPCode::ArrayDecl,
            Self::ArrayLoad(..) => OPCode::ArrayLoad,
            Self::ArrayStore(..) => OPCode::ArrayStore,
        }
    }

    /// Returns the assignment destination of an IR instruction.
    pub fn destination(&self) -> Option<&Location> {
        match self {
            Self::Assign(dst, ..) | Self::BinOp(dst, ..) | Self::ArrayLoad(dst, ..) => Some(dst),
            _ => None,
        }
    }

    /// Returns the value operands of an IR instruction, our IR is in
    /// three-address form so the operands will at most be two. The return
    /// value convention will be left to right.
    pub fn operands(&self) -> (Option<&Value>, Option<&Value>) {
        match self {
            Self::Assign(_, value) => (Some(value), None),
            Self::BinOp(_, _, lhs, rhs) => (Some(lhs), Some(rhs)),
            Self::Branch(cond, _) | Self::BranchIfFalse(cond, _) => (Some(cond), None),
            Self::Return(value) => (Some(value), None),
            Self::ArrayLoad(_, _, index) => (Some(index), None),
            Self::ArrayStore(_, index, value) => (Some(index), Some(value)),
            Self::Label(..) | Self::Jump(..) | Self::ArrayDecl(..) => (None, None),
        }
    }
}

/// `LocationLabelCounter` is a tuple of temporary and label counters used
/// to generate monotonically increasing indices for temporaries and labels.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
struct LocationLabelCounter(usize, usize);

impl LocationLabelCounter {
    fn next_location(&mut self) -> usize {
        let next = self.0;
        self.0 += 1;
        next
    }

    fn next_label(&mut self) -> usize {
        let next = self.1;
        self.1 += 1;
        next
    }
}

/// `IntermediateCodeGenerator` owns the instruction log of one compilation
/// along with its temporary and label counters, a fresh instance is used per
/// compilation so counters never leak between programs.
#[derive(Default, Debug, Clone)]
pub struct IntermediateCodeGenerator {
    code: Vec<Instruction>,
    llc: LocationLabelCounter,
}

impl IntermediateCodeGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint a fresh temporary.
    pub fn new_temp(&mut self) -> Temp {
        Temp(self.llc.next_location())
    }

    /// Mint a fresh label.
    pub fn new_label(&mut self) -> Label {
        Label(self.llc.next_label())
    }

    /// Append an instruction to the log.
    pub fn emit(&mut self, inst: Instruction) {
        self.code.push(inst)
    }

    /// Returns a non-mutable view of the instruction log.
    pub fn code(&self) -> &[Instruction] {
        &self.code
    }

    /// Consumes the generator, returning the instruction log.
    pub fn into_code(self) -> Vec<Instruction> {
        self.code
    }
}

impl fmt::Display for IntermediateCodeGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for inst in &self.code {
            writeln!(f, "{inst}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temporaries_and_labels_are_monotonic() {
        let mut icg = IntermediateCodeGenerator::new();
        let temps = (0..4).map(|_| icg.new_temp()).collect::<Vec<_>>();
        let labels = (0..3).map(|_| icg.new_label()).collect::<Vec<_>>();
        assert_eq!(
            temps.iter().map(|t| t.to_string()).collect::<Vec<_>>(),
            vec!["t0", "t1", "t2", "t3"]
        );
        assert_eq!(
            labels.iter().map(|l| l.to_string()).collect::<Vec<_>>(),
            vec!["L0", "L1", "L2"]
        );
    }

    #[test]
    fn fresh_generators_do_not_share_counters() {
        let mut first = IntermediateCodeGenerator::new();
        first.new_temp();
        first.new_label();
        let mut second = IntermediateCodeGenerator::new();
        assert_eq!(second.new_temp().index(), 0);
        assert_eq!(second.new_label().index(), 0);
    }

    #[test]
    fn can_display_instructions() {
        let mut icg = IntermediateCodeGenerator::new();
        let t0 = icg.new_temp();
        let t1 = icg.new_temp();
        let l0 = icg.new_label();
        icg.emit(Instruction::Assign(
            Location::Temp(t0),
            Value::ConstantLiteral(5),
        ));
        icg.emit(Instruction::BinOp(
            Location::Temp(t1),
            BinaryOp::Gte,
            Value::named("x"),
            t0.into(),
        ));
        icg.emit(Instruction::Label(l0));
        icg.emit(Instruction::Branch(t1.into(), l0));
        icg.emit(Instruction::BranchIfFalse(t1.into(), l0));
        icg.emit(Instruction::Jump(l0));
        icg.emit(Instruction::ArrayDecl(
            "a".to_string(),
            ArraySize::new(5).unwrap(),
        ));
        icg.emit(Instruction::ArrayStore("a".to_string(), t0.into(), t1.into()));
        icg.emit(Instruction::ArrayLoad(
            Location::Named("x".to_string()),
            "a".to_string(),
            t0.into(),
        ));
        icg.emit(Instruction::Return(Value::named("x")));
        assert_eq!(
            icg.to_string(),
            "t0 = 5
t1 = x >= t0
L0:
if t1 goto L0
ifFalse t1 goto L0
goto L0
array a[5]
a[t0] = t1
x = a[t0]
return x
"
        );
    }

    #[test]
    fn can_evaluate_known_operands() {
        assert_eq!(BinaryOp::Add.evaluate(i32::MAX, 1), Some(i32::MIN));
        assert_eq!(BinaryOp::Div.evaluate(7, 2), Some(3));
        assert_eq!(BinaryOp::Div.evaluate(i32::MIN, -1), Some(i32::MIN));
        assert_eq!(BinaryOp::Div.evaluate(1, 0), None);
        assert_eq!(BinaryOp::Gte.evaluate(3, 3), Some(1));
        assert_eq!(BinaryOp::Neq.evaluate(3, 3), Some(0));
    }

    #[test]
    fn array_sizes_must_fit_their_byte_count() {
        assert_eq!(ArraySize::new(5).map(|size| size.bytes()), Some(20));
        assert_eq!(ArraySize::new(0), None);
        let largest = (i32::MAX / ELEMENT_WIDTH) as u32;
        assert_eq!(
            ArraySize::new(largest).map(|size| size.bytes()),
            Some(i32::MAX - 3)
        );
        assert_eq!(ArraySize::new(largest + 1), None);
        assert_eq!(ArraySize::new(u32::MAX), None);
    }

    #[test]
    fn reports_destinations_and_operands() {
        let inst = Instruction::ArrayStore(
            "a".to_string(),
            Value::ConstantLiteral(1),
            Value::named("x"),
        );
        assert_eq!(inst.opcode(), OPCode::ArrayStore);
        assert_eq!(inst.destination(), None);
        assert_eq!(
            inst.operands(),
            (Some(&Value::ConstantLiteral(1)), Some(&Value::named("x")))
        );
    }
}

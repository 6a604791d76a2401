use tacc::codegen::{lower, AsmInstruction};
use tacc::ir::{Instruction, OPCode};
use tacc::parser::{ParseError, SyntaxError};
use tacc::scanner::ScanError;
use tacc::sema::SemanticError;
use tacc::{compile, CompileError};

// Macro to generate end to end test cases comparing both listings.
macro_rules! test_pipeline {
    ($name:ident, $source:expr, $tac:expr, $asm:expr) => {
        #[test]
        fn $name() {
            let compilation = compile($source).expect("expected test case to compile");
            let tac = $tac.strip_prefix("\n").unwrap_or($tac);
            let asm = $asm.strip_prefix("\n").unwrap_or($asm);
            assert_eq!(compilation.tac_listing(), tac);
            assert_eq!(compilation.asm_listing(), asm);
        }
    };
}

fn diagnostic(source: &str) -> String {
    compile(source)
        .expect_err("expected test case to fail")
        .to_string()
}

test_pipeline!(
    can_compile_declaration_then_assignment,
    "int x; x = 5;",
    r#"
t0 = 5
x = t0
"#,
    r#"
LI r0, 5
MOV r1, r0
"#
);

test_pipeline!(
    can_compile_while_loop,
    "int x = 0; while (x < 5) { x = x + 1; }",
    r#"
t0 = 0
x = t0
L0:
t1 = 5
t2 = x < t1
ifFalse t2 goto L1
t3 = 1
t4 = x + t3
x = t4
goto L0
L1:
"#,
    r#"
LI r0, 0
MOV r1, r0
L0:
LI r2, 5
SLT r3, r1, r2
CMP r3, 0
JEQ L1
LI r4, 1
ADD r5, r1, r4
MOV r1, r5
JMP L0
L1:
"#
);

test_pipeline!(
    can_compile_if_without_else,
    "int x;\nif (5 > 3) {\n  x = 20;\n}\n",
    r#"
t0 = 5
t1 = 3
t2 = t0 > t1
if t2 goto L0
goto L1
L0:
t3 = 20
x = t3
L1:
"#,
    r#"
LI r0, 5
LI r1, 3
SGT r2, r0, r1
CMP r2, 0
JNE L0
JMP L1
L0:
LI r3, 20
MOV r4, r3
L1:
"#
);

test_pipeline!(
    can_compile_arrays,
    "int a[4]; int i = 1; a[i] = 7; i = a[i] + a[0];",
    r#"
array a[4]
t0 = 1
i = t0
t1 = 7
a[i] = t1
t2 = a[i]
t3 = 0
t4 = a[t3]
t5 = t2 + t4
i = t5
"#,
    r#"
ALLOC a, 16
LI r1, 1
MOV r2, r1
LI r3, 7
MULI r4, r2, 4
ADD r4, r0, r4
SW r3, 0(r4)
MULI r4, r2, 4
ADD r4, r0, r4
LW r5, 0(r4)
LI r6, 0
MULI r7, r6, 4
ADD r7, r0, r7
LW r8, 0(r7)
ADD r9, r5, r8
MOV r2, r9
"#
);

test_pipeline!(
    can_compile_return,
    "int x = 3; return x * 2;",
    r#"
t0 = 3
x = t0
t1 = 2
t2 = x * t1
return t2
"#,
    r#"
LI r0, 3
MOV r1, r0
LI r2, 2
MUL r3, r1, r2
MOV rv, r3
RET
"#
);

#[test]
fn if_without_else_has_no_end_label() {
    let compilation = compile("int x; if (5 > 3) { x = 20; }").unwrap();
    let labels = compilation
        .tac()
        .iter()
        .filter(|inst| inst.opcode() == OPCode::Label)
        .count();
    let jumps = compilation
        .tac()
        .iter()
        .filter(|inst| inst.opcode() == OPCode::Jump)
        .count();
    assert_eq!(labels, 2);
    // The only unconditional jump skips the then branch.
    assert_eq!(jumps, 1);
}

#[test]
fn relowering_is_deterministic() {
    let source = "int a[2]; int s = 0; for (int i = 0; i < 2; i = i + 1) { a[i] = i; s = s + a[i]; } \
                  if (s >= 1) { return s; } else { return 0 - 1; }";
    let compilation = compile(source).unwrap();
    let first = lower(compilation.tac());
    let second = lower(compilation.tac());
    assert_eq!(first, second);
    assert_eq!(first, compilation.asm());
    assert_eq!(compile(source).unwrap().registers(), compilation.registers());
}

#[test]
fn lowering_drops_no_instruction() {
    let compilation = compile(
        "int a[3]; int x = 1; \
         for (x = 0; x != 3; x = x + 1) { a[x] = x * 2 - 1; } \
         while (x > 0) { x = x - a[x - 1] / 2; } \
         if (x <= 0) { x = 1; } else { x = 2; } \
         if (x == 1) { return a[0]; }",
    )
    .unwrap();
    assert!(compilation.asm().len() >= compilation.tac().len());

    let tac_labels = compilation
        .tac()
        .iter()
        .filter_map(|inst| match inst {
            Instruction::Label(label) => Some(*label),
            _ => None,
        })
        .collect::<Vec<_>>();
    let asm_labels = compilation
        .asm()
        .iter()
        .filter_map(|inst| match inst {
            AsmInstruction::Label(label) => Some(*label),
            _ => None,
        })
        .collect::<Vec<_>>();
    assert_eq!(tac_labels, asm_labels);

    let returns = compilation
        .asm()
        .iter()
        .filter(|inst| **inst == AsmInstruction::Ret)
        .count();
    assert_eq!(returns, 1);
}

#[test]
fn every_name_gets_a_distinct_register() {
    let compilation = compile("int x = 1; int y = x + 2; { int x = y; y = x; }").unwrap();
    let registers = compilation.registers().assignments();
    for (i, (name, register)) in registers.iter().enumerate() {
        for (other, other_register) in &registers[i + 1..] {
            assert_ne!(name, other);
            assert_ne!(register, other_register);
        }
    }
    assert!(compilation.registers().get("x.1").is_some());
}

#[test]
fn rejects_division_by_literal_zero() {
    let err = compile("int x = 1;\nx = x / 0;").unwrap_err();
    assert_eq!(
        err,
        CompileError::Parse(ParseError::Semantic(SemanticError::DivisionByZero {
            lexeme: "0".to_string(),
            line: 2
        }))
    );
    assert_eq!(
        err.to_string(),
        "semantic error: division by constant zero '0' at line 2"
    );
}

#[test]
fn reports_one_diagnostic_per_error_kind() {
    assert_eq!(
        diagnostic("int x;\nx = 3 $ 4;"),
        "lexical error: unexpected character '$' at line 2"
    );
    assert_eq!(
        diagnostic("/* open"),
        "lexical error: unterminated comment starting at line 1"
    );
    assert_eq!(
        diagnostic("int x = 2147483648;"),
        "lexical error: integer literal '2147483648' out of range at line 1"
    );
    assert_eq!(
        diagnostic("int x;\nx = ;"),
        "syntax error: expected an expression, found ';' at line 2"
    );
    assert_eq!(
        diagnostic("int x;\nint x;"),
        "semantic error: variable 'x' is already declared at line 2"
    );
    assert_eq!(
        diagnostic("int x;\nx = y;"),
        "semantic error: variable 'y' is not declared at line 2"
    );
    assert_eq!(
        diagnostic("int x;\nx[1] = 2;"),
        "semantic error: variable 'x' is not an array at line 2"
    );
    assert_eq!(
        diagnostic("int a[2];\nreturn a;"),
        "semantic error: array 'a' used as a scalar at line 2"
    );
    assert_eq!(
        diagnostic("int a[0];"),
        "semantic error: invalid size '0' for array 'a' at line 1"
    );
    assert_eq!(
        diagnostic("int a[1000000000];"),
        "semantic error: invalid size '1000000000' for array 'a' at line 1"
    );
    assert_eq!(
        diagnostic("int c = 1;\nif (c) int y;\ny = 2;"),
        "semantic error: variable 'y' is not declared at line 3"
    );
}

#[test]
fn largest_array_allocation_is_exact() {
    let compilation = compile("int a[536870911];").unwrap();
    assert_eq!(compilation.asm_listing(), "ALLOC a, 2147483644\n");
}

#[test]
fn for_body_declaration_does_not_capture_the_update() {
    let compilation = compile("int i; for (i = 0; i < 3; i = i + 1) int i;").unwrap();
    assert!(compilation.tac_listing().contains("t4 = i + t3\ni = t4\ngoto L0\n"));
    assert!(compilation.registers().get("i.2").is_none());
}

#[test]
fn errors_keep_their_stage() {
    assert!(matches!(
        compile("@"),
        Err(CompileError::Scan(ScanError::UnexpectedCharacter { .. }))
    ));
    assert!(matches!(
        compile("int;"),
        Err(CompileError::Parse(ParseError::Syntax(SyntaxError { line: 1, .. })))
    ));
}

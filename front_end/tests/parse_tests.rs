use pretty_assertions::assert_eq;

use super::*;

#[test]
fn prints_canonical_form() {
    let program = parsed(
        r#"
        header H { bit<8> f; }
        struct S { H h; }
        control C(inout S hdr) {
            bit<8> x = 8w1;
            apply { if (hdr.h.f == x) { hdr.h.f = x + 1; } }
        }
        "#,
    );

    assert_eq!(
        program.to_string(),
        r#"header H {
    bit<8> f;
}

struct S {
    H h;
}

control C(inout S hdr) {
    bit<8> x = 8w1;
    apply {
        if (hdr.h.f == x) {
            hdr.h.f = x + 1;
        }
    }
}
"#
    );
}

#[test]
fn binary_precedence() {
    let program = parsed(
        r#"
        control C(inout bit<8> a, in bit<8> b, in bit<8> c) {
            apply {
                a = a + b * c;
                a = a - b - c;
                a = a == b && b != c ? a : b << 1 | c;
            }
        }
        "#,
    );

    let Decl::Control(control) = &program.decls[0] else {
        panic!("expected a control");
    };
    let printed: Vec<String> = control.body.iter().map(|s| s.to_string()).collect();
    assert_eq!(
        printed,
        vec![
            "a = a + (b * c);",
            "a = (a - b) - c;",
            "a = ((a == b) && (b != c)) ? a : ((b << 1) | c);",
        ]
    );
}

#[test]
fn printed_programs_parse_back() {
    let code = r#"
        header H { bit<8> f; bit<16> g; }
        struct S { H h; H[2] stk; }
        extern void log_it(in bit<8> v);
        bit<8> twice(in bit<8> v) { return v + v; }
        parser P(inout S hdr) {
            bit<8> tmp;
            state start {
                tmp = hdr.h.f;
                transition select (tmp, hdr.h.g[3:0]) {
                    (1, 2): next;
                    default: accept;
                }
            }
            state next { hdr.stk.push_front(1); transition accept; }
        }
        control C(inout S hdr) {
            action a(bit<8> p) { hdr.h.f = p; }
            action b() { exit; }
            table t {
                key = { hdr.h.f : exact; hdr.h.g : ternary; }
                actions = { a; b; }
                default_action = b();
            }
            apply {
                switch (t.apply().action_run) {
                    a:
                    b: { log_it(hdr.stk[0].f); }
                    default: { hdr.h.setInvalid(); }
                }
                if (!hdr.h.isValid()) { return; } else if (t.apply().hit) { hdr.h.g = 16w0x800; }
                { bit<8> y = ~hdr.h.f; hdr.h.f = -y; }
            }
        }
    "#;

    let program = parsed(code);
    let reparsed = parsed(&program.to_string());
    assert_eq!(program, reparsed);
    assert_eq!(program.to_string(), reparsed.to_string());
}

#[test]
fn distinguishes_declarations_from_statements() {
    let program = parsed(
        r#"
        header H { bit<8> f; }
        control C(inout H h) {
            apply {
                H copy;
                H[2] pair;
                copy = h;
                h.setValid();
            }
        }
        "#,
    );

    let Decl::Control(control) = &program.decls[1] else {
        panic!("expected a control");
    };
    assert!(matches!(control.body[0], Stmt::Decl(_)));
    assert!(matches!(control.body[1], Stmt::Decl(_)));
    assert!(matches!(control.body[2], Stmt::Assign { .. }));
    assert!(matches!(control.body[3], Stmt::Call(_)));
}

#[test]
fn sized_and_hex_literals() {
    let program = parsed("control C(inout bit<16> x) { apply { x = 16w0x0800; x = 0x10; } }");
    let Decl::Control(control) = &program.decls[0] else {
        panic!("expected a control");
    };
    assert_eq!(control.body[0].to_string(), "x = 16w2048;");
    assert_eq!(control.body[1].to_string(), "x = 16;");
}

#[test]
fn reports_parse_errors() {
    let err = parse("control C() { apply { x = ; } }").unwrap_err();
    assert!(err.0.contains("line 0"), "{err}");

    assert!(parse("control C() { apply { x = 1 } }").is_err());
    assert!(parse("control C() { apply { x + 1; } }").is_err());
    assert!(parse("control C() { apply { x = $; } }").is_err());
    assert!(parse("control C() { apply {").is_err());
}

#[test]
fn program_serializes_to_json() {
    let program = parsed("control C(inout bit<8> x) { apply { x = 1; } }");
    let json = serde_json::to_string(&program).unwrap();
    let back: Program = serde_json::from_str(&json).unwrap();
    assert_eq!(program, back);
}

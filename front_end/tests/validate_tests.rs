use super::*;

// true if some message contains `needle`.
fn mentions(errors: &[String], needle: &str) -> bool {
    errors.iter().any(|e| e.contains(needle))
}

#[test]
fn accepts_well_formed_program() {
    let errors = validation_errors(
        r#"
        header H { bit<8> f; }
        struct S { H h; H[4] stk; }
        extern void count(in bit<8> v);
        parser P(inout S hdr) {
            bit<8> tmp;
            state start { tmp = hdr.h.f; transition select (tmp) { 1: accept; default: reject; } }
        }
        control C(inout S hdr) {
            bit<8> v = 0;
            action set(bit<8> p) { hdr.h.f = p; v = p; }
            table t { key = { hdr.h.f : exact; } actions = { set; } default_action = set(1); }
            apply {
                switch (t.apply().action_run) { set: { count(v); } }
                if (hdr.stk[2].isValid()) { hdr.stk.pop_front(1); }
            }
        }
        "#,
    );
    assert_eq!(errors, Vec::<String>::new());
}

#[test]
fn rejects_undeclared_and_out_of_scope_variables() {
    let errors = validation_errors(
        r#"
        control C(inout bit<8> x) {
            apply {
                x = y;
                if (x == 1) { bit<8> z = 1; }
                x = z;
            }
        }
        "#,
    );
    assert!(mentions(&errors, "undefined variable: y"), "{errors:?}");
    assert!(mentions(&errors, "undefined variable: z"), "{errors:?}");
}

#[test]
fn rejects_use_before_declaration() {
    let errors = validation_errors(
        "control C(inout bit<8> x) { apply { x = y; bit<8> y = 1; } }",
    );
    assert!(mentions(&errors, "undefined variable: y"), "{errors:?}");
}

#[test]
fn rejects_shadowing() {
    let errors = validation_errors(
        r#"
        control C(inout bit<8> x) {
            action a(bit<8> x) { }
            apply { }
        }
        "#,
    );
    assert!(mentions(&errors, "x is declared more than once"), "{errors:?}");

    let errors = validation_errors(
        "control C(inout bit<8> x) { apply { if (x == 1) { bit<8> t; } else { bit<8> t; } } }",
    );
    assert!(mentions(&errors, "t is declared more than once"), "{errors:?}");
}

#[test]
fn rejects_bad_types_and_fields() {
    let errors = validation_errors(
        r#"
        header H { bit<8> f; Missing m; }
        "#,
    );
    assert!(mentions(&errors, "unknown type: Missing"), "{errors:?}");

    let errors = validation_errors(
        r#"
        header H { bit<8> f; }
        control C(inout H h) { apply { h.g = 1; } }
        "#,
    );
    assert!(mentions(&errors, "H has no field g"), "{errors:?}");
}

#[test]
fn rejects_bad_tables_and_switches() {
    let errors = validation_errors(
        r#"
        control C(inout bit<8> x) {
            action a() { }
            table t { actions = { a; b; } default_action = c(); }
            apply {
                switch (x) { a: { } }
            }
        }
        "#,
    );
    assert!(mentions(&errors, "undeclared action b"), "{errors:?}");
    assert!(mentions(&errors, "default action c"), "{errors:?}");
    assert!(mentions(&errors, "cannot switch on x"), "{errors:?}");
}

#[test]
fn rejects_bad_calls() {
    let errors = validation_errors(
        r#"
        extern void put(out bit<8> v);
        control C(inout bit<8> x) {
            apply {
                put(x + 1);
                missing(x);
                put(x, x);
            }
        }
        "#,
    );
    assert!(mentions(&errors, "cannot assign to x + 1"), "{errors:?}");
    assert!(mentions(&errors, "call to undeclared missing"), "{errors:?}");
    assert!(mentions(&errors, "put expects 1 arguments but got 2"), "{errors:?}");
}

#[test]
fn rejects_bad_transitions() {
    let errors = validation_errors(
        r#"
        parser P(inout bit<8> x) {
            state first { transition nowhere; }
        }
        "#,
    );
    assert!(mentions(&errors, "no start state"), "{errors:?}");
    assert!(mentions(&errors, "undeclared state nowhere"), "{errors:?}");
}

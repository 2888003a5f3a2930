use pretty_assertions::assert_eq;

use super::super::local_copy_prop::*;
use super::*;

fn run_on_file(test_name: &str) {
    run_test(test_name, local_copy_prop, "copyprop");
}

// Check if the input program optimizes to the expected output program
fn optimizes_to(input: &str, expected: &str) {
    optimizes_to_with(LocalCopyProp::default(), input, expected);
}

fn optimizes_to_with(pass: LocalCopyProp, input: &str, expected: &str) {
    let input = input.parse::<Program>().unwrap().validate().unwrap();
    let expected = canonical(expected);

    let actual = pass.run(input).unwrap().0;

    assert_eq!(actual.to_string(), expected);
}

fn unchanged(input: &str) {
    optimizes_to(input, input);
}

// SECTION: propagation

#[test]
fn copies_chain_through_locals() {
    optimizes_to(
        r#"
        control C(inout bit<8> y) {
            apply {
                bit<8> x = y;
                x = x + 1;
                y = x;
            }
        }
        "#,
        r#"
        control C(inout bit<8> y) {
            apply {
                y = y + 1;
            }
        }
        "#,
    );
}

#[test]
fn branch_merge_forgets_disagreeing_values() {
    optimizes_to(
        r#"
        control C(inout bit<8> c, in bool cond) {
            apply {
                bit<8> a = 5;
                bit<8> b = a;
                if (cond) {
                    b = 7;
                }
                c = b;
            }
        }
        "#,
        r#"
        control C(inout bit<8> c, in bool cond) {
            apply {
                bit<8> b = 5;
                if (cond) {
                    b = 7;
                }
                c = b;
            }
        }
        "#,
    );
}

#[test]
fn branch_merge_keeps_agreeing_values() {
    optimizes_to(
        r#"
        control C(inout bit<8> c, in bool cond) {
            apply {
                bit<8> b;
                if (cond) {
                    b = 7;
                } else {
                    b = 7;
                }
                c = b;
            }
        }
        "#,
        r#"
        control C(inout bit<8> c, in bool cond) {
            apply {
                c = 7;
            }
        }
        "#,
    );
}

#[test]
fn self_referential_value_is_not_recorded() {
    unchanged(
        r#"
        control C(inout bit<8> y) {
            apply {
                y = y + 1;
                y = y + 1;
            }
        }
        "#,
    );
}

#[test]
fn writes_through_dynamic_index_invalidate_the_whole_stack() {
    unchanged(
        r#"
        header H { bit<8> f; }
        struct S { H[4] stk; }
        control C(inout S hdr, in bit<2> i, out bit<8> o) {
            apply {
                hdr.stk[0].f = 1;
                hdr.stk[i].f = 2;
                o = hdr.stk[0].f;
            }
        }
        "#,
    );
    optimizes_to(
        r#"
        header H { bit<8> f; }
        struct S { H[4] stk; }
        control C(inout S hdr, in bit<2> i, out bit<8> o) {
            apply {
                hdr.stk[0].f = 1;
                hdr.stk[1].f = 2;
                o = hdr.stk[0].f;
            }
        }
        "#,
        r#"
        header H { bit<8> f; }
        struct S { H[4] stk; }
        control C(inout S hdr, in bit<2> i, out bit<8> o) {
            apply {
                hdr.stk[0].f = 1;
                hdr.stk[1].f = 2;
                o = 1;
            }
        }
        "#,
    );
}

#[test]
fn set_valid_invalidates_fields() {
    unchanged(
        r#"
        header H { bit<8> f; }
        struct S { H h; }
        control C(inout S hdr, out bit<8> o) {
            apply {
                hdr.h.f = 1;
                hdr.h.setValid();
                o = hdr.h.f;
            }
        }
        "#,
    );
}

#[test]
fn extern_calls_are_opaque() {
    unchanged(
        r#"
        extern void touch();
        control C(inout bit<8> y) {
            apply {
                y = 1;
                touch();
                y = y + 1;
            }
        }
        "#,
    );
    optimizes_to(
        r#"
        control C(inout bit<8> y) {
            apply {
                y = 1;
                y = y + 1;
            }
        }
        "#,
        r#"
        control C(inout bit<8> y) {
            apply {
                y = 1;
                y = 1 + 1;
            }
        }
        "#,
    );
}

#[test]
fn arguments_and_returns_are_propagated() {
    optimizes_to(
        r#"
        bit<8> twice(in bit<8> v) {
            return v + v;
        }
        control C(inout bit<8> y) {
            apply {
                bit<8> x = 3;
                y = twice(x);
            }
        }
        "#,
        r#"
        bit<8> twice(in bit<8> v) {
            return v + v;
        }
        control C(inout bit<8> y) {
            apply {
                y = twice(3);
            }
        }
        "#,
    );
}

#[test]
fn code_after_return_does_not_reach_the_join() {
    optimizes_to(
        r#"
        bit<8> pick(in bool c) {
            bit<8> r = 1;
            if (c) {
                return r;
            }
            r = 2;
            return r;
        }
        "#,
        r#"
        bit<8> pick(in bool c) {
            if (c) {
                return 1;
            }
            return 2;
        }
        "#,
    );
}

#[test]
fn exited_arm_contributes_only_liveness() {
    optimizes_to(
        r#"
        extern void get(out bit<8> v);
        control C(inout bit<8> y, in bool c) {
            apply {
                bit<8> x = 1;
                if (c) {
                    get(x);
                    y = x;
                    exit;
                }
                y = x;
            }
        }
        "#,
        r#"
        extern void get(out bit<8> v);
        control C(inout bit<8> y, in bool c) {
            apply {
                bit<8> x = 1;
                if (c) {
                    get(x);
                    y = x;
                    exit;
                }
                y = 1;
            }
        }
        "#,
    );
}

#[test]
fn policy_can_refuse_a_use_site() {
    let input = r#"
        extern void consume(in bit<8> v);
        control C(in bit<8> y) {
            apply {
                bit<8> x = y;
                consume(x);
            }
        }
        "#;
    optimizes_to(
        input,
        r#"
        extern void consume(in bit<8> v);
        control C(in bit<8> y) {
            apply {
                consume(y);
            }
        }
        "#,
    );
    optimizes_to_with(
        LocalCopyProp::default().with_policy(|site, _| site.position != Position::Argument),
        input,
        input,
    );
}

// SECTION: dead code

#[test]
fn dead_declaration_in_action_is_removed() {
    optimizes_to(
        r#"
        extern void consume(in bit<8> v);
        control C(in bool c) {
            action a() {
                bit<8> x;
            }
            action b() {
                bit<8> z;
                if (c) {
                    consume(z);
                }
            }
            table t { actions = { a; b; } }
            apply { t.apply(); }
        }
        "#,
        r#"
        extern void consume(in bit<8> v);
        control C(in bool c) {
            action a() {
            }
            action b() {
                bit<8> z;
                if (c) {
                    consume(z);
                }
            }
            table t { actions = { a; b; } }
            apply { t.apply(); }
        }
        "#,
    );
}

#[test]
fn dead_writes_keep_their_calls() {
    optimizes_to(
        r#"
        extern bit<8> next_value();
        control C(inout bit<8> y) {
            apply {
                bit<8> x = next_value();
                bit<8> z;
                z = next_value();
            }
        }
        "#,
        r#"
        extern bit<8> next_value();
        control C(inout bit<8> y) {
            apply {
                next_value();
                next_value();
            }
        }
        "#,
    );
}

#[test]
fn dead_validity_queries_are_dropped() {
    optimizes_to(
        r#"
        header H { bit<8> f; }
        struct S { H h; }
        control C(inout S hdr) {
            apply {
                bool v = hdr.h.isValid();
                bool w;
                w = hdr.h.isValid();
            }
        }
        "#,
        r#"
        header H { bit<8> f; }
        struct S { H h; }
        control C(inout S hdr) {
            apply {
            }
        }
        "#,
    );
}

#[test]
fn header_that_is_only_written_is_removed() {
    optimizes_to(
        r#"
        header H { bit<8> f; }
        control C(inout bit<8> y) {
            apply {
                H tmp;
                tmp.setValid();
                tmp.f = y;
            }
        }
        "#,
        r#"
        header H { bit<8> f; }
        control C(inout bit<8> y) {
            apply {
            }
        }
        "#,
    );
    unchanged(
        r#"
        header H { bit<8> f; }
        control C(inout bit<8> y) {
            apply {
                H tmp;
                tmp.setValid();
                y = tmp.f;
            }
        }
        "#,
    );
}

#[test]
fn degenerate_conditionals_are_folded() {
    optimizes_to(
        r#"
        control C(inout bit<8> y, in bool c) {
            apply {
                bit<8> x = 0;
                if (c) {
                    x = 1;
                } else {
                    y = 2;
                }
                if (c) {
                    x = 3;
                }
            }
        }
        "#,
        r#"
        control C(inout bit<8> y, in bool c) {
            apply {
                if (!c) {
                    y = 2;
                }
            }
        }
        "#,
    );
}

#[test]
fn parser_locals_are_eliminated_across_states() {
    optimizes_to(
        r#"
        header H { bit<8> f; }
        struct S { H h; }
        parser P(inout S hdr) {
            bit<8> tmp;
            bit<8> unused;
            state start {
                tmp = hdr.h.f;
                unused = 1;
                transition select (tmp) {
                    1: second;
                    default: accept;
                }
            }
            state second {
                hdr.h.f = tmp;
                transition accept;
            }
        }
        "#,
        r#"
        header H { bit<8> f; }
        struct S { H h; }
        parser P(inout S hdr) {
            bit<8> tmp;
            state start {
                tmp = hdr.h.f;
                transition select (hdr.h.f) {
                    1: second;
                    default: accept;
                }
            }
            state second {
                hdr.h.f = tmp;
                transition accept;
            }
        }
        "#,
    );
}

#[test]
fn field_written_in_a_later_state_stays_when_an_earlier_state_reads_it() {
    unchanged(
        r#"
        header H { bit<8> f; }
        struct S { H h; bit<8> x; }
        parser P(inout S hdr) {
            S tmp;
            state start {
                hdr.h = tmp.h;
                transition select (hdr.x) {
                    1: second;
                    default: accept;
                }
            }
            state second {
                tmp.h.f = 1;
                transition start;
            }
        }
        "#,
    );
}

// SECTION: tables

#[test]
fn table_applied_with_different_key_values_keeps_its_key() {
    unchanged(
        r#"
        header H { bit<8> f; }
        struct S { H h; }
        control C(inout S hdr) {
            action a() { }
            table t {
                key = { hdr.h.f : exact; }
                actions = { a; }
            }
            apply {
                hdr.h.f = 3;
                t.apply();
                hdr.h.f = 9;
                t.apply();
            }
        }
        "#,
    );
}

#[test]
fn branches_applying_with_different_key_values_keep_the_key() {
    unchanged(
        r#"
        header H { bit<8> f; }
        struct S { H h; }
        control C(inout S hdr, in bool c) {
            action a() { }
            table t {
                key = { hdr.h.f : exact; }
                actions = { a; }
            }
            apply {
                if (c) {
                    hdr.h.f = 3;
                    t.apply();
                } else {
                    hdr.h.f = 9;
                    t.apply();
                }
            }
        }
        "#,
    );
}

#[test]
fn agreed_key_value_replaces_the_key() {
    optimizes_to(
        r#"
        header H { bit<8> f; }
        struct S { H h; }
        control C(inout S hdr) {
            bit<8> k;
            action a() { }
            table t {
                key = { k : exact; }
                actions = { a; }
            }
            apply {
                k = hdr.h.f;
                t.apply();
            }
        }
        "#,
        r#"
        header H { bit<8> f; }
        struct S { H h; }
        control C(inout S hdr) {
            action a() { }
            table t {
                key = { hdr.h.f : exact; }
                actions = { a; }
            }
            apply {
                t.apply();
            }
        }
        "#,
    );
}

#[test]
fn key_context_can_refuse_a_key() {
    let input = r#"
        header H { bit<8> f; }
        struct S { H h; }
        control C(inout S hdr) {
            bit<8> k;
            action a() { }
            table t {
                key = { k : exact; }
                actions = { a; }
            }
            apply {
                k = hdr.h.f;
                t.apply();
            }
        }
        "#;
    optimizes_to_with(LocalCopyProp::default().with_key_context(|_| false), input, input);
}

#[test]
fn switch_arms_merge() {
    unchanged(
        r#"
        control C(inout bit<8> y) {
            action a() { }
            action b() { }
            table t { actions = { a; b; } }
            apply {
                bit<8> x = 1;
                switch (t.apply().action_run) {
                    a: { x = 2; }
                    b: { }
                }
                y = x;
            }
        }
        "#,
    );
    optimizes_to(
        r#"
        control C(inout bit<8> y) {
            action a() { }
            table t { actions = { a; } }
            apply {
                bit<8> x = 1;
                switch (t.apply().action_run) {
                    a: { x = 2; }
                    default: { x = 2; }
                }
                y = x;
            }
        }
        "#,
        r#"
        control C(inout bit<8> y) {
            action a() { }
            table t { actions = { a; } }
            apply {
                switch (t.apply().action_run) {
                    a: { }
                    default: { }
                }
                y = 2;
            }
        }
        "#,
    );
}

const UNUSED: &str = r#"
    control C(inout bit<8> y) {
        bit<8> k;
        action a() { y = 1; }
        action b() { y = 2; }
        table used { actions = { a; } }
        table spare {
            key = { k : exact; }
            actions = { b; }
        }
        apply {
            k = y;
            used.apply();
        }
    }
    "#;

#[test]
fn unused_tables_and_actions_are_removed() {
    optimizes_to(
        UNUSED,
        r#"
        control C(inout bit<8> y) {
            action a() { y = 1; }
            table used { actions = { a; } }
            apply {
                used.apply();
            }
        }
        "#,
    );
}

#[test]
fn unused_tables_can_be_kept() {
    let pass = LocalCopyProp::new(Options {
        eliminate_unused: false,
        ..Options::default()
    });
    optimizes_to_with(pass, UNUSED, UNUSED);
}

// SECTION: driver

#[test]
fn second_run_changes_nothing() {
    let input = r#"
        control C(inout bit<8> c, in bool cond) {
            apply {
                bit<8> a = 5;
                bit<8> b = a;
                if (cond) {
                    b = 7;
                }
                c = b;
            }
        }
        "#;
    let pass = LocalCopyProp::default();
    let once = pass.run(input.parse::<Program>().unwrap().validate().unwrap()).unwrap();
    let twice = pass.run(once.clone()).unwrap();
    assert_eq!(twice.0.to_string(), once.0.to_string());

    let fixed = pass
        .run_to_fixpoint(input.parse::<Program>().unwrap().validate().unwrap())
        .unwrap();
    assert_eq!(fixed.0.to_string(), once.0.to_string());
}

#[test]
fn options_fill_in_defaults() {
    let options: Options = serde_json::from_str(r#"{ "eliminate_unused": false }"#).unwrap();
    assert_eq!(
        options,
        Options {
            eliminate_unused: false,
            ..Options::default()
        }
    );
}

#[test]
fn ingress() {
    run_on_file("ingress");
}

#[test]
fn parser_states() {
    run_on_file("parser_states");
}

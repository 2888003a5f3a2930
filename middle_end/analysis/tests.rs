// analysis tests.

use super::*;
use crate::front_end::parse;

mod call_kind_tests;
mod side_effect_tests;
mod storage_tests;

const TYPES: &str = r#"
header H { bit<8> f; bit<8> g; }
struct S { H h; H[4] stk; bit<16> x; }
extern void count(in bit<8> v);
bit<8> twice(in bit<8> v) { return v + v; }
control C(inout S hdr, in bit<2> i) {
    bit<8> v = 0;
    action a() { }
    table t { actions = { a; } }
    apply { }
}
"#;

fn types() -> TypeMap {
    TypeMap::new(&parse(TYPES).unwrap())
}

fn call(callee: Expr, args: Vec<Expr>) -> Expr {
    Expr::Call {
        callee: Box::new(callee),
        args,
    }
}

// `hdr.h.f`
fn hdr_h_f() -> Expr {
    member(member(path("hdr"), "h"), "f")
}

use super::*;
use crate::middle_end::analysis::side_effects::*;

#[test]
fn only_calls_have_effects() {
    assert!(is_pure(&Expr::Binary {
        op: BinOp::Add,
        lhs: Box::new(hdr_h_f()),
        rhs: Box::new(int(1)),
    }));
    assert!(is_pure(&call(member(member(path("hdr"), "h"), "isValid"), vec![])));

    assert!(has_side_effects(&call(path("twice"), vec![int(1)])));
    assert!(has_side_effects(&member(
        call(member(path("t"), "apply"), vec![]),
        "hit"
    )));
    assert!(has_side_effects(&Expr::Unary {
        op: UnOp::Not,
        operand: Box::new(call(path("twice"), vec![int(1)])),
    }));
}

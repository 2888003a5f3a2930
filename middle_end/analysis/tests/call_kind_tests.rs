use super::*;
use crate::middle_end::analysis::call_kind::*;

#[test]
fn classifies_callees() {
    let types = types();
    let kind = |callee: &Expr| format!("{:?}", classify(&types, "C", callee));

    assert_eq!(kind(&member(path("t"), "apply")), "TableApply(\"t\")");
    assert_eq!(kind(&path("a")), "Action(\"a\")");
    assert_eq!(kind(&path("twice")), "Function(\"twice\")");
    assert_eq!(kind(&path("count")), "Extern(\"count\")");
    assert_eq!(kind(&path("nothing")), "Unknown");

    let h = member(path("hdr"), "h");
    assert_eq!(
        classify(&types, "C", &member(h.clone(), "setValid")),
        CallKind::Builtin(Builtin::SetValid)
    );
    assert_eq!(
        classify(&types, "C", &member(h, "isValid")),
        CallKind::Builtin(Builtin::IsValid)
    );
    assert!(!Builtin::IsValid.writes_receiver());
    assert!(Builtin::PopFront.writes_receiver());
    assert!(Builtin::PopFront.reads_receiver());
    assert!(!Builtin::SetValid.reads_receiver());
    // tables and actions belong to their control.
    assert_eq!(classify(&types, "twice", &path("a")), CallKind::Unknown);
}

#[test]
fn looks_up_parameters() {
    let types = types();
    let count = params(&types, "C", &CallKind::Extern("count".to_string())).unwrap();
    assert_eq!(count.len(), 1);
    assert_eq!(count[0].direction, Direction::In);
    assert!(params(&types, "C", &CallKind::TableApply("t".to_string())).is_none());
}

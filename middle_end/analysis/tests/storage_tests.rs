use super::*;
use crate::middle_end::analysis::storage::*;

fn name(e: &Expr) -> String {
    let types = types();
    let oracle = Oracle::new(&types, "C");
    let loc = oracle.location(e).unwrap();
    format!("{}{}", loc.name, if loc.exact { "" } else { " (inexact)" })
}

#[test]
fn names_storage_expressions() {
    assert_eq!(name(&path("v")), "v");
    assert_eq!(name(&hdr_h_f()), "hdr.h.f");
    assert_eq!(
        name(&member(index(member(path("hdr"), "stk"), int(2)), "g")),
        "hdr.stk[2].g"
    );
}

#[test]
fn imprecise_accesses_name_the_enclosing_storage() {
    let stk = member(path("hdr"), "stk");
    assert_eq!(
        name(&member(index(stk.clone(), path("i")), "f")),
        "hdr.stk (inexact)"
    );
    // out of bounds for a stack of 4.
    assert_eq!(name(&index(stk, int(4))), "hdr.stk (inexact)");
    assert_eq!(
        name(&Expr::Slice {
            base: Box::new(member(path("hdr"), "x")),
            hi: 7,
            lo: 0,
        }),
        "hdr.x (inexact)"
    );
}

#[test]
fn overlap_is_prefix_in_either_direction() {
    let hdr = StorageName::var("hdr");
    let h = hdr.field("h");
    let f = h.field("f");
    let g = h.field("g");
    let hf = StorageName::var("hf");

    assert!(h.overlaps(&f));
    assert!(f.overlaps(&h));
    assert!(f.overlaps(&f));
    assert!(!f.overlaps(&g));
    // not a prefix on a segment boundary.
    assert!(!hdr.overlaps(&hf));
    assert!(!hdr.index(1).overlaps(&hdr.index(2)));

    let ancestors: Vec<String> = f.ancestors().map(|n| n.to_string()).collect();
    assert_eq!(ancestors, vec!["hdr.h", "hdr"]);
}

#[test]
fn uses_include_indices_and_receivers() {
    let types = types();
    let oracle = Oracle::new(&types, "C");
    let e = Expr::Binary {
        op: BinOp::Add,
        lhs: Box::new(member(index(member(path("hdr"), "stk"), path("i")), "f")),
        rhs: Box::new(call(member(member(path("hdr"), "h"), "isValid"), vec![])),
    };
    let uses: Vec<String> = oracle.uses(&e).iter().map(|l| l.name.to_string()).collect();
    assert_eq!(uses, vec!["i", "hdr.stk", "hdr.h"]);

    let apply = call(member(path("t"), "apply"), vec![]);
    assert!(oracle.uses(&apply).is_empty());
}

// value table and use-site tests.

use pretty_assertions::assert_eq;

use super::var_table::VarTable;
use super::*;

fn name(path: &str) -> StorageName {
    let mut parts = path.split('.');
    let mut name = StorageName::var(parts.next().unwrap());
    for part in parts {
        name = name.field(part);
    }
    name
}

fn exact(path: &str) -> Location {
    Location {
        name: name(path),
        exact: true,
    }
}

fn value_of(path_expr: Expr, reads: &[&str]) -> Option<(Expr, Vec<StorageName>)> {
    Some((path_expr, reads.iter().map(|r| name(r)).collect()))
}

fn live(table: &VarTable, path: &str) -> bool {
    table.get(&name(path)).is_some_and(|info| info.live)
}

fn value(table: &VarTable, path: &str) -> Option<Expr> {
    table.get(&name(path)).and_then(|info| info.value.clone())
}

#[test]
fn substituted_read_leaves_storage_dead() {
    let mut table = VarTable::new();
    table.declare_local("x");
    table.write(&exact("x"), value_of(int(1), &[]));

    assert_eq!(table.read(&exact("x"), |_| true), Some(int(1)));
    assert!(!live(&table, "x"));
    assert!(table.is_dead(&name("x")));
}

#[test]
fn refused_value_makes_storage_live() {
    let mut table = VarTable::new();
    table.declare_local("x");
    table.write(&exact("x"), value_of(int(1), &[]));

    assert_eq!(table.read(&exact("x"), |_| false), None);
    assert!(live(&table, "x"));
    assert!(!table.is_dead(&name("x")));
}

#[test]
fn write_forgets_values_reading_the_target() {
    let mut table = VarTable::new();
    table.write(&exact("y"), value_of(path("x"), &["x"]));
    table.write(&exact("z"), value_of(member(path("h"), "f"), &["h.f"]));

    table.write(&exact("x"), value_of(int(2), &[]));
    assert_eq!(value(&table, "y"), None);
    assert_eq!(value(&table, "x"), Some(int(2)));

    // a write of the enclosing header reaches its fields.
    table.write(&exact("h"), None);
    assert_eq!(value(&table, "z"), None);
}

#[test]
fn self_referential_value_is_dropped() {
    let mut table = VarTable::new();
    let x_plus_one = Expr::Binary {
        op: BinOp::Add,
        lhs: Box::new(path("x")),
        rhs: Box::new(int(1)),
    };
    table.write(&exact("x"), value_of(x_plus_one, &["x"]));
    assert_eq!(value(&table, "x"), None);
}

#[test]
fn inexact_write_forgets_everything_inside() {
    let mut table = VarTable::new();
    let elem = name("hdr").field("stk").index(0).field("f");
    let elem_loc = Location {
        name: elem.clone(),
        exact: true,
    };
    table.write(&elem_loc, value_of(int(1), &[]));

    let stack = Location {
        name: name("hdr.stk"),
        exact: false,
    };
    table.write(&stack, value_of(int(2), &[]));
    assert_eq!(table.get(&elem).and_then(|i| i.value.clone()), None);
    assert_eq!(value(&table, "hdr.stk"), None);
}

#[test]
fn dead_check_falls_back_to_enclosing_entry() {
    let mut table = VarTable::new();
    table.declare_local("h");
    assert!(table.is_dead(&name("h.f")));

    table.write(&exact("h.f"), value_of(int(1), &[]));
    assert!(table.is_dead(&name("h.f")));

    table.mark_live(&name("h"));
    assert!(!table.is_dead(&name("h.f")));
    assert!(!table.is_dead(&name("h")));
}

#[test]
fn merge_keeps_only_agreed_values() {
    let mut before = VarTable::new();
    before.declare_local("a");
    before.declare_local("b");
    before.write(&exact("a"), value_of(int(1), &[]));

    let mut left = before.clone();
    let mut right = before;
    left.write(&exact("b"), value_of(int(7), &[]));
    right.write(&exact("b"), value_of(int(8), &[]));
    right.mark_live(&name("a"));

    let merged = left.merge(right);
    assert_eq!(value(&merged, "a"), Some(int(1)));
    assert_eq!(value(&merged, "b"), None);
    assert!(live(&merged, "a"));
}

#[test]
fn unreachable_arm_contributes_only_liveness() {
    let mut before = VarTable::new();
    before.declare_local("r");
    before.write(&exact("r"), value_of(int(1), &[]));

    let mut returned = before.clone();
    returned.write(&exact("r"), value_of(int(2), &[]));
    returned.mark_live(&name("r"));
    returned.set_unreachable();

    let merged = returned.merge(before);
    assert_eq!(value(&merged, "r"), Some(int(1)));
    assert!(live(&merged, "r"));
}

#[test]
fn clobber_spares_purely_local_values() {
    let mut table = VarTable::new();
    table.declare_local("l");
    table.declare_local("m");
    table.declare_local("n");
    table.write(&exact("g"), value_of(int(1), &[]));
    table.write(&exact("l"), value_of(int(2), &[]));
    table.write(&exact("m"), value_of(path("g"), &["g"]));
    table.write(&exact("n"), value_of(path("l"), &["l"]));

    table.clobber();
    assert_eq!(value(&table, "g"), None);
    assert!(live(&table, "g"));
    assert_eq!(value(&table, "l"), Some(int(2)));
    assert!(!live(&table, "l"));
    assert_eq!(value(&table, "m"), None);
    assert_eq!(value(&table, "n"), Some(path("l")));
}

#[test]
fn leaving_a_block_forgets_values_of_its_variables() {
    let mut table = VarTable::new();
    table.declare_local("inner");
    table.write(&exact("outer"), value_of(path("inner"), &["inner"]));
    table.forget_mentions("inner");
    assert_eq!(value(&table, "outer"), None);
}

#[test]
fn lists_are_substituted_only_when_allowed() {
    let list = Expr::List(vec![int(1), int(2)]);
    let target = name("s");
    let rhs = UseSite {
        position: Position::Rhs,
        name: &target,
    };
    let operand = UseSite {
        position: Position::Operand,
        name: &target,
    };

    let default = LocalCopyProp::default();
    assert!(!default.accepts(&rhs, &list));
    assert!(default.accepts(&rhs, &int(1)));

    let compound = LocalCopyProp::new(Options {
        propagate_compound: true,
        ..Options::default()
    });
    assert!(compound.accepts(&rhs, &list));
    assert!(!compound.accepts(&operand, &list));

    let picky = compound.with_policy(|site, _| site.position != Position::Rhs);
    assert!(!picky.accepts(&rhs, &list));
    assert!(picky.accepts(&operand, &int(1)));
}

//! Removal of declarations and assignments nothing reads.

use crate::middle_end::analysis::call_kind::Builtin;
use crate::middle_end::analysis::side_effects::{has_side_effects, is_pure};

use super::*;

// Removes from `stmts` the declarations and assignments of storage that
// `table` finds dead, keeping the calls they contain.  Also drops the
// statements that are left with nothing to do.
pub fn eliminate(table: &VarTable, oracle: &Oracle, stmts: &mut Block) {
    for stmt in mem::take(stmts) {
        if let Some(stmt) = rewrite(table, oracle, stmt) {
            stmts.push(stmt);
        }
    }
}

fn rewrite(table: &VarTable, oracle: &Oracle, mut stmt: Stmt) -> Option<Stmt> {
    match &mut stmt {
        Stmt::If { tt, ff, .. } => {
            eliminate(table, oracle, tt);
            eliminate(table, oracle, ff);
        }
        Stmt::Block(inner) => eliminate(table, oracle, inner),
        Stmt::Switch { cases, .. } => {
            for body in cases.iter_mut().filter_map(|case| case.body.as_mut()) {
                eliminate(table, oracle, body);
            }
        }
        _ => {}
    }

    match stmt {
        Stmt::Decl(v) if table.is_dead(&StorageName::var(&v.name)) => match v.init {
            Some(init) if init.is_call() && has_side_effects(&init) => {
                debug!("dropping dead {}, keeping its initializer", v.name);
                Some(Stmt::Call(init))
            }
            Some(init) if has_side_effects(&init) => Some(Stmt::Decl(VarDecl {
                init: Some(init),
                ..v
            })),
            _ => {
                debug!("dropping dead {}", v.name);
                None
            }
        },
        Stmt::Assign { lhs, rhs } => {
            let dead = is_pure(&lhs)
                && oracle
                    .location(&lhs)
                    .is_some_and(|loc| table.is_dead(&loc.name));
            if !dead {
                Some(Stmt::Assign { lhs, rhs })
            } else if rhs.is_call() && has_side_effects(&rhs) {
                debug!("dropping dead write to {lhs}, keeping the call");
                Some(Stmt::Call(rhs))
            } else if has_side_effects(&rhs) {
                Some(Stmt::Assign { lhs, rhs })
            } else {
                trace!("dropping dead write to {lhs}");
                None
            }
        }
        Stmt::Call(call) if mutates_dead_storage(table, oracle, &call) => {
            debug!("dropping {call}, its receiver is dead");
            None
        }
        Stmt::Block(inner) if inner.is_empty() => None,
        mut stmt @ Stmt::If { .. } => {
            fold_if(&mut stmt);
            match stmt {
                Stmt::Block(inner) if inner.is_empty() => None,
                stmt => Some(stmt),
            }
        }
        stmt => Some(stmt),
    }
}

// whether `call` is a validity or stack mutator whose receiver nothing reads.
fn mutates_dead_storage(table: &VarTable, oracle: &Oracle, call: &Expr) -> bool {
    let Expr::Call { callee, args } = call else {
        return false;
    };
    let Expr::Member { base, field } = &**callee else {
        return false;
    };
    Builtin::from_method(field).is_some_and(Builtin::writes_receiver)
        && is_pure(base)
        && args.iter().all(is_pure)
        && oracle
            .location(base)
            .is_some_and(|loc| table.is_dead(&loc.name))
}

// Simplifies an `if` with an empty then-branch: with nothing on either side
// and a pure condition it becomes an empty block, otherwise the branches
// swap under the negated condition.
pub fn fold_if(stmt: &mut Stmt) {
    let Stmt::If { cond, tt, ff } = stmt else {
        return;
    };
    if !tt.is_empty() {
        return;
    }
    if ff.is_empty() {
        if is_pure(cond) {
            *stmt = Stmt::Block(vec![]);
        }
        return;
    }
    mem::swap(tt, ff);
    *cond = mem::replace(cond, Expr::Bool(true)).negate();
}

// Whether a declaration at control or parser level stays.
pub fn keep_var(table: &VarTable, v: &VarDecl) -> bool {
    let keep = !table.is_dead(&StorageName::var(&v.name)) || v.init.as_ref().is_some_and(has_side_effects);
    if !keep {
        debug!("dropping dead {}", v.name);
    }
    keep
}

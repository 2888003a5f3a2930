//! Side-effect classification of expressions.
//!
//! Calls are assumed to have effects, with the exception of `isValid()`,
//! which only reads its receiver.  Everything else in the expression language
//! is pure.

use super::*;

pub fn has_side_effects(e: &Expr) -> bool {
    match e {
        Expr::Call { callee, args } => match &**callee {
            Expr::Member { base, field } if field == "isValid" && args.is_empty() => {
                has_side_effects(base)
            }
            _ => true,
        },
        e => e.children().into_iter().any(has_side_effects),
    }
}

pub fn is_pure(e: &Expr) -> bool {
    !has_side_effects(e)
}

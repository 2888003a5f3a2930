//! Static analyses over the typed tree: storage naming and aliasing, side
//! effects, and call classification.  These are the queries the optimization
//! passes are built on.

use crate::front_end::ast::*;
use crate::front_end::type_map::TypeMap;

pub mod call_kind;
pub mod side_effects;
pub mod storage;

#[cfg(test)]
mod tests;

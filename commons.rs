//! Definitions shared by the front end and the middle end.

use crate::front_end::ast::{validate::validate, Program, ValidationError};

/// A program that passed validation, so names resolve and types are known.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Valid<T>(pub T);

impl Program {
    pub fn validate(self) -> Result<Valid<Program>, ValidationError> {
        validate(&self)?;
        Ok(Valid(self))
    }
}

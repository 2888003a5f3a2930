//! Optimization passes.

pub mod local_copy_prop;

#[cfg(test)]
mod tests;

pub mod analysis;
pub mod optimization;

//! Command implementations for the `limn` binary

pub mod backup;
pub mod generate;
pub mod regenerate;
pub mod sections;
pub mod undo;

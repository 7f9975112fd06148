/// Implementations of the core traits that spawn local processes directly.
pub mod executor;
pub mod generator;
pub mod process;

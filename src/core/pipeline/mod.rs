pub mod persisting;
pub mod preparing;
pub mod round;
pub mod stress;

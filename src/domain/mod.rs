// Domain layer - Readings and the values derived from them
pub mod reading;
pub mod snapshot;
pub mod submission;
pub mod summary;

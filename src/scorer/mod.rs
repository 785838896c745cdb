pub mod reallocation;

pub use reallocation::{target_total, Allocatable, ReallocationEngine, ReallocationSuggestion};

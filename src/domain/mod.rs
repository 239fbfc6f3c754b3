//! Domain logic - pure batching and selection rules independent of git operations

pub mod batch;
pub mod branch;

pub use batch::BatchPlan;
pub use branch::BranchFilter;

//! Lifetime and storage planning.
//!
//! Decides where every reachable node's value lives in generated code and
//! in which order persistent fields depend on each other.

pub mod naming;
pub mod plan;
pub mod planner;

pub use naming::{lower_camel, Names};
pub use plan::{NodePlan, Plan, Storage};
pub use planner::Planner;

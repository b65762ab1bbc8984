//! Grid composition and order planning.

pub mod composer;
pub mod planner;

pub use composer::{arithmetic, compose, evenly_spaced_indices, geometric, synthetic};
pub use planner::{instructions_for, plan, OrderPlan};

//! Strahler order analysis of skeleton images
//!
//! Labels every skeleton voxel with its Strahler order by repeatedly
//! pruning terminal branches, then measures branch count, mean branch
//! length and ramification ratio per order.

mod engine;
mod label;
mod report;

pub use engine::{analyse_strahler, Strahler, StrahlerInput, StrahlerParams, StrahlerResult};
pub use label::threshold_order;
pub use report::{Diagnostic, IterationRecord, OrderRecord, Report};

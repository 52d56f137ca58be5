//! Domain types for StratLab

pub mod action;
pub mod bar;
pub mod position;

pub use action::{Action, ActionRequest, Decision, FibLevel, Reason};
pub use bar::{first_out_of_order, Bar};
pub use position::{PositionError, PositionState};

//! Request and result types.
//!
//! This module defines the inputs of the multi-parameter operations, the
//! typed result of every operation, and the data structures they share.

mod common;
mod requests;
mod responses;

pub use common::*;
pub use requests::*;
pub use responses::*;

//! Human-verification gate and its challenge endpoints.

pub mod gate;
pub mod page;

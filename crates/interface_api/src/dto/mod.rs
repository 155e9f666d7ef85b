//! Request and response bodies

pub mod fees;
pub mod payments;
pub mod revenue;

//! Route handlers

pub mod fees;
pub mod health;
pub mod payments;
pub mod revenue;
pub mod students;

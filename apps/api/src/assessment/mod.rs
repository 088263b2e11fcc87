//! The adaptive skill assessment flow: career questions, two remote skill
//! sessions, and the combined result.

pub mod aggregate;
pub mod flow;
pub mod handlers;
pub mod registry;
pub mod results;

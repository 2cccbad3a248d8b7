//! Common utilities and shared functionality
//!
//! Currency types, the authority trait and configuration loading shared by
//! the rest of the crate.

pub mod config;
pub mod traits;
pub mod types;

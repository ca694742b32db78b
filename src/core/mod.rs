//! Core business logic - framework-agnostic trip, entry and reporting operations.

pub mod currency;
pub mod entry;
pub mod report;
pub mod sample;
pub mod system_state;
pub mod trip;
pub mod validation;

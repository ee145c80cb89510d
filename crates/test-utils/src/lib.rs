//! Fixtures shared by reloadwatch's integration tests.

pub mod builders;
pub mod fake_trigger;

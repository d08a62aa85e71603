//! Domain model for the project list.
//!
//! # Responsibility
//! - Define the plain data shapes exchanged between repository, service and
//!   executables.

pub mod project;

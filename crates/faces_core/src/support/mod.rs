//! Testability helpers shared by infrastructure wrappers.
//!
//! # Responsibility
//! - Record what infrastructure was asked to do, so callers can assert on it
//!   without inspecting a real backing store.

pub mod output_tracker;

//! Repository layer over the scoped database.
//!
//! # Responsibility
//! - Translate domain reads/writes into statements run through `Database`.
//! - Keep SQL text inside the core persistence boundary.
//!
//! # Invariants
//! - Repositories never finalize a request scope themselves, except while
//!   initializing storage at startup.

pub mod project_repo;

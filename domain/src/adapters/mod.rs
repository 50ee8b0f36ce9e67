//! In-memory adapters that live inside the domain crate for convenience.
//!
//! Used by unit tests, the demo binary, and the server's `memory` storage
//! mode. The SQLite adapter lives in its own crate.

pub mod memory_repo;

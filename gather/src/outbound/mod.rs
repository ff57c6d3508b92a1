//! Outbound adapters implementing domain ports.
//!
//! - **memory**: process-local backend used by the CLI and integration tests.
//!
//! Adapters translate between domain types and storage. They contain no
//! business logic.

pub mod memory;

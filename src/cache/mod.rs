//! Cache Module
//!
//! The cache-fill protocol: how a local miss becomes a network query and how the
//! answers of peers flow back into the local store.
//!
//! ## Core Concepts
//! - **Fast path**: a local hit never touches the network.
//! - **Query / Answer**: a miss broadcasts a `GET`; any peer holding the key broadcasts
//!   a `SET`, which every listening node absorbs.
//! - **Response window**: a miss waits a bounded time for answers, then reads the store
//!   again. Absent is a normal result.
//! - **Lazy replication**: local writes are never pushed; values spread only through
//!   read misses.

pub mod coordinator;
pub mod handlers;
pub mod message;
pub mod protocol;
pub mod stats;
pub mod window;

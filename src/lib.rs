//! Peer-to-peer Cache Library
//!
//! This library crate defines the modules of a cache node. It serves as the foundation
//! for the binary executable (`main.rs`).
//!
//! ## Architecture Modules
//! - **`cache`**: The cache-fill protocol. Resolves keys locally, turns misses into
//!   broadcast queries, answers peers' queries and absorbs their answers. Also hosts the
//!   HTTP front end.
//! - **`mesh`**: The broadcast channel. A UDP mesh of direct peers with heartbeat-based
//!   liveness, plus an in-process hub for running several nodes in one process.
//! - **`store`**: The node-local key/value store and its found / not-found / failure
//!   contract.
//! - **`config`**: Command line configuration of a node.
//! - **`error`**: Error types shared by the modules above.

pub mod cache;
pub mod config;
pub mod error;
pub mod mesh;
pub mod store;

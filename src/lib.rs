//! Gistlink - short links and content uploads over a remote document store
//!
//! The core of this crate is a storage adapter for a remote
//! object-store-and-document API: uploads are pushed as base64-encoded
//! objects, and the entire slug table lives in one remote JSON document
//! rewritten through conditional (revision-checked) writes.
//!
//! # Architecture
//! - `remote`: the HTTP client adapter and its in-memory test double
//! - `upload`: content upload service (size gate, storage keys, batches)
//! - `store`: slug table read-modify-write cycle and click buffering
//! - `services`: thin actix-web handlers over the two services
//! - `config`: environment-driven configuration
//! - `system`: logging initialization

pub mod config;
pub mod errors;
pub mod remote;
pub mod services;
pub mod store;
pub mod system;
pub mod upload;

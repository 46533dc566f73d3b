//! Integration test suite for stackhub
//!
//! End-to-end tests over the public library API and the `stackhub` binary.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **resolution**: locking, component expansion and requested outputs on one stack
//! - **storage**: multi-replica check, read and write across fs and object stores
//! - **cli**: the `stackhub` binary against filesystem replicas

mod cli;
mod resolution;
mod storage;

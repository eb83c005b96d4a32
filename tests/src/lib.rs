//! # Courier Test Suite
//!
//! End-to-end scenarios that drive a producer, the in-memory transport and a
//! consumer together, plus shared fixtures for the benchmarks.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── fixtures.rs       # Billing domain messages, processors and bus builder
//! └── integration/      # Producer → transport → consumer flows
//!     ├── command_flow.rs
//!     ├── event_flow.rs
//!     ├── buffered_flow.rs
//!     ├── delivery_flow.rs
//!     ├── middleware_flow.rs
//!     └── registration_flow.rs
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p courier-tests
//!
//! # By flow
//! cargo test -p courier-tests integration::command_flow::
//!
//! # Benchmarks
//! cargo bench -p courier-tests
//! ```

pub mod fixtures;
pub mod integration;

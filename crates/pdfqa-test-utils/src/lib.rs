#![deny(unsafe_code)]

//! Shared test utilities for the pdfqa workspace.
//!
//! Config builders, tracing setup, an in-memory scripted chat provider and a
//! local HTTP server that speaks both provider wire formats.
//!
//! Add this crate as a `[dev-dependency]` in any workspace member:
//!
//! ```toml
//! [dev-dependencies]
//! pdfqa-test-utils = { workspace = true }
//! ```

pub mod config;
pub mod documents;
pub mod mock_server;
pub mod provider;
pub mod tracing_setup;

pub use config::{TestConfigBuilder, TestConfigFile};
pub use mock_server::{MockProvider, MockResponse};
pub use provider::{ScriptedProvider, Step};

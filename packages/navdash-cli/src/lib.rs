//! Command-line client for a navdash dashboard.
//!
//! Persistence goes over HTTP ([`http::HttpClient`]); everything else is the
//! controller from `navdash-core`.
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod http;
pub mod logging;

//! pbsync - bulk import and export for PocketBase collections
//!
//! This crate provides the core functionality for the `pbsync` CLI tool.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface using clap
//! - [`model`] - Data types (records, collection descriptors, list pages)
//! - [`remote`] - PocketBase HTTP client with retry, auth and lookups
//! - [`sync`] - File import/export and batch scheduling
//! - [`config`] - Configuration management
//! - [`error`] - Error types and handling

#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod config;
pub mod error;
pub mod model;
pub mod remote;
pub mod sync;

pub use error::{Error, Result};

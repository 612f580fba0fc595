//! Unit tests for bcupper
//!
//! These tests exercise config loading, retention decisions and archive
//! production without any transport.

mod archive;
mod config;
mod retention;

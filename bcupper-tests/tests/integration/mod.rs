//! Integration tests for bcupper
//!
//! These tests run the real manager, transport and space probe against the
//! local filesystem and read the produced archives back.

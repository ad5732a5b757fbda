//! Shared test utilities for the dotsync workspace.
//!
//! This crate provides standardised fixtures to avoid duplicating sandbox
//! setup across crate test suites. It is a dev-dependency only, never
//! published.
//!
//! # Modules
//!
//! - [`tree`]: [`TestTree`](tree::TestTree), a temporary source and
//!   destination pair with content, mode and mtime helpers

pub mod tree;

pub use tree::TestTree;

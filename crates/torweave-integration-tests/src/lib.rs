//! End-to-end tests for the torweave workspace.
//!
//! The actual tests live in `tests/`; this crate exists so they build
//! against every workspace member at once.

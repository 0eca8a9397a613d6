//! Shared test helpers for `credstore-core` integration tests.
//!
//! These helpers provide in-memory ports and a wired-up vault so that
//! tests can focus on behaviour instead of boilerplate.

#![allow(dead_code)]

pub mod fixtures;
pub mod generators;
pub mod repositories;

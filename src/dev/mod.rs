// src/dev/mod.rs
//! Helpers shared by the test suite and the developer binaries.

pub mod generator;

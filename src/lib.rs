//! Fragua - HotSpot LogCompilation analyzer with lifecycle correlation
//!
//! This library provides the core functionality for correlating the XML
//! records a HotSpot JVM emits under `-XX:+LogCompilation` into per-method
//! compilation lifecycles, with elapsed-time derivation, per-compiler
//! statistics, and comprehensive filtering.

pub mod assembly;
pub mod cli;
pub mod compilation;
pub mod csv_output;
pub mod filter;
pub mod json_output;
pub mod parser;
pub mod stamp;
pub mod stats;
pub mod tag;

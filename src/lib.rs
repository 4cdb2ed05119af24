//! chainscope - Supply-chain dependency analyzer
//!
//! This crate reads package manifests of several ecosystems, expands them
//! into a depth-bounded dependency graph and scores every component for
//! supply-chain risk:
//!
//! - [`parser`] turns manifest files into dependency entries
//! - [`analysis`] builds the [`graph::DependencyGraph`] from a manifest source
//! - [`risk`] scores components and the project as a whole
//! - [`export`] and [`output`] write the results to timestamped files

pub mod analysis;
pub mod config;
pub mod export;
pub mod graph;
pub mod output;
pub mod parser;
pub mod risk;

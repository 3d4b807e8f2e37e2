//! flowengine - a monotone data-flow and pointer-analysis core.
//!
//! This crate implements the analysis engine of a static analysis
//! framework for a method-level three-address IR: the generic
//! intraprocedural solver, a context-(in)sensitive Andersen-style
//! pointer analysis with on-the-fly call-graph construction, CHA,
//! interprocedural constant propagation, dead-code detection and a
//! taint-tracking overlay.
//!
//! Surrounding subsystems (an IR front-end, a class-hierarchy loader)
//! are out of scope; this crate only specifies and consumes the
//! contracts they must satisfy (see [`ir`]).

pub mod analyses;
pub mod callgraph;
pub mod cfg;
pub mod config;
pub mod engine;
pub mod error;
pub mod icfg;
pub mod ir;
pub mod lattice;
pub mod loader;
pub mod output;
pub mod pta;
pub mod solver;
pub mod taint;

pub use error::{AnalysisError, AnalysisResult};

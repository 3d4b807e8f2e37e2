//! Pointer analysis (spec §2 items 5-7, §4.5-§4.7): the pointer-flow
//! graph, heap and context abstractions, the CS-manager canonicalizer,
//! and the Andersen-style on-the-fly solver itself.

pub mod context;
pub mod cs_manager;
pub mod heap;
pub mod pfg;
pub mod pointer;
pub mod solver;

pub use context::{Context, ContextElem, ContextInsensitive, ContextSelector, KCallSite, KObject};
pub use cs_manager::{CSObjId, CSVarId, CsManager};
pub use heap::HeapModel;
pub use pfg::Pfg;
pub use pointer::{CSObjKey, CSVarKey, Pointer};
pub use solver::{solve, PtaEngine, PtaResult};

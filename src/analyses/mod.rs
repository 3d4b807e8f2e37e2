//! Client analyses: live-variable analysis, intraprocedural constant
//! propagation, and dead-code detection over a single method's
//! [`crate::cfg::Cfg`], each expressed as a [`crate::solver::DataflowAnalysis`]
//! impl so they share the one generic work-list driver; plus the
//! interprocedural constant-propagation lift over the whole [`crate::icfg::Icfg`],
//! which needs its own edge-aware solver.

pub mod constprop;
pub mod dead_code;
pub mod inter_constprop;
pub mod live_var;

pub use constprop::ConstPropagation;
pub use dead_code::{find_dead_code, DeadCode};
pub use inter_constprop::{InterConstPropagation, InterResult};
pub use live_var::LiveVariables;

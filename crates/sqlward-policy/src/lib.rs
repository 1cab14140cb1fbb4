//! Query policy for the Sqlward gateway.
//!
//! Two pure, synchronous components live here:
//!
//! 1. [`ReadOnlyGatekeeper`] - the only component allowed to approve a
//!    caller-supplied query for execution.
//! 2. [`analyze::recommendations`] - lexical heuristics over query text,
//!    used by the analyze action.
//!
//! Neither performs any I/O; both are deterministic given their inputs.

pub mod analyze;
pub mod gatekeeper;

pub use gatekeeper::{ReadOnlyGatekeeper, DENIED_KEYWORDS, MAX_ROW_CAP};

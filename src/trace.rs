//! Diagnostic tracing.
//!
//! Every search and merge step is narrated at `trace`/`debug` level, gated
//! by a logger the host wires up if it wants to watch the rewrite process
//! unfold. This crate's ambient equivalent is the `log` crate, used the way
//! the rest of the ecosystem does: call sites just use `log::trace!`/
//! `log::debug!` directly and the host wires up a subscriber (`env_logger`,
//! `tracing-log`, ...) if it wants to see any of it. This module only
//! re-exports the macros under a shorter, crate-local path so call sites in
//! `method`/`search`/`derive`/`solver` don't each need their own `use log::...`.

pub(crate) use log::{debug, trace};

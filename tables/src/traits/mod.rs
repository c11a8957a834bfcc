//! Traits Module
//!
//! Seams between the core and its collaborators.
//!
//! - [`source`]: the upstream table fetcher the graph is built from.

pub mod source;

//! Linear algebra layer.
//!
//! Backend job interface, the owned backend session, sparse helpers and
//! factorization backends.

pub mod backend;
pub mod backends;
pub mod session;
pub mod sparse;

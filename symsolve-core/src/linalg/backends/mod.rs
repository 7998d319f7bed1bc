//! Concrete [`SymmetricBackend`](super::backend::SymmetricBackend) implementations.

#[cfg(feature = "faer")]
mod faer_ldl;

#[cfg(feature = "faer")]
pub use faer_ldl::FaerLdlBackend;

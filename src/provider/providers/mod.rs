//! Backend-specific adapter implementations.

#[cfg(feature = "openai")]
mod openai;
#[cfg(feature = "openai")]
pub use openai::{SoraAdapter, SoraAdapterBuilder, SoraModel};

#[cfg(feature = "replicate")]
mod replicate;
#[cfg(feature = "replicate")]
pub use replicate::{ReplicateAdapter, ReplicateAdapterBuilder};

//! Two-state wrapper for backends that may be unreachable at construction.
//!
//! Connectivity is probed once; a backend that fails the probe stays
//! `Disabled` for the lifetime of the engine and every call becomes a no-op.

#[derive(Debug)]
pub enum Availability<T> {
    Available(T),
    Disabled { reason: String },
}

impl<T> Availability<T> {
    /// Wrap the outcome of a connection attempt, logging a failure once.
    pub fn probe(backend: &str, attempt: anyhow::Result<T>) -> Self {
        match attempt {
            Ok(inner) => {
                tracing::info!(backend, "backend available");
                Availability::Available(inner)
            }
            Err(e) => {
                tracing::warn!(
                    backend,
                    error = %format!("{e:#}"),
                    "backend unreachable, disabling"
                );
                Availability::Disabled { reason: format!("{e:#}") }
            }
        }
    }

    pub fn is_available(&self) -> bool { matches!(self, Availability::Available(_)) }

    pub fn available(&self) -> Option<&T> {
        match self {
            Availability::Available(inner) => Some(inner),
            Availability::Disabled { .. } => None,
        }
    }
}

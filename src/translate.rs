//! Native-error-to-host-error translation.
//!
//! Engines report failures through an error flag and a message. The helpers
//! here read that flag right after an engine call and turn it into exactly one
//! [`AdapterError`]; each facade then maps that into its own convention via
//! [`HostError`].

use crate::engine::Engine;
use crate::error::AdapterError;

const UNKNOWN_ENGINE_ERROR: &str = "unknown engine error";

fn native_message(engine: &dyn Engine) -> String {
    engine
        .last_error()
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| UNKNOWN_ENGINE_ERROR.to_owned())
}

/// Check the engine's error flag after a statement call.
///
/// # Errors
/// Returns `AdapterError::StatementError` carrying the engine message verbatim.
pub fn check(engine: &dyn Engine) -> Result<(), AdapterError> {
    if engine.is_error() {
        Err(AdapterError::StatementError {
            message: native_message(engine),
        })
    } else {
        Ok(())
    }
}

/// Check the engine's error flag after an open/load call.
///
/// # Errors
/// Returns `AdapterError::ConnectionFailure` with the engine message.
pub fn check_connection(engine: &dyn Engine) -> Result<(), AdapterError> {
    if engine.is_error() {
        Err(AdapterError::ConnectionFailure(native_message(engine)))
    } else {
        Ok(())
    }
}

/// A host contract's error representation.
pub trait HostError: Sized {
    /// Build the host error for an adapter failure.
    fn from_adapter(err: AdapterError) -> Self;
}

impl HostError for AdapterError {
    fn from_adapter(err: AdapterError) -> Self {
        err
    }
}

/// Convert an adapter result into a host result.
///
/// # Errors
/// Returns the host translation of the adapter error.
pub fn into_host<T, E: HostError>(result: Result<T, AdapterError>) -> Result<T, E> {
    result.map_err(E::from_adapter)
}

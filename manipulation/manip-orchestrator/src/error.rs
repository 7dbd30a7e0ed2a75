//! Error types for the orchestrator crate.

use manip_types::ManipError;
use thiserror::Error;

/// Errors raised while loading orders and configuration or wiring a run.
///
/// Failures during a pick are never raised; they are recorded in the
/// order's [`ExecutionOutcome`](manip_types::ExecutionOutcome).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum OrchestratorError {
    /// A manipulation error, typically invalid configuration.
    #[error(transparent)]
    Manip(#[from] ManipError),

    /// The order or configuration file is not valid JSON for its schema.
    #[error("parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// The order or configuration file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A work order names a bin that the manifest does not list.
    #[error("unknown bin: {0}")]
    UnknownBin(String),

    /// A work order asks for a product its bin does not contain.
    #[error("product {product} is not in bin {bin}")]
    ProductNotInBin {
        /// The bin named by the order.
        bin: String,
        /// The product named by the order.
        product: String,
    },
}

impl OrchestratorError {
    /// Creates an unknown bin error.
    #[must_use]
    pub fn unknown_bin(bin: impl Into<String>) -> Self {
        Self::UnknownBin(bin.into())
    }

    /// Creates a product-not-in-bin error.
    #[must_use]
    pub fn product_not_in_bin(bin: impl Into<String>, product: impl Into<String>) -> Self {
        Self::ProductNotInBin {
            bin: bin.into(),
            product: product.into(),
        }
    }
}

/// Result type for orchestrator setup.
pub type Result<T> = std::result::Result<T, OrchestratorError>;

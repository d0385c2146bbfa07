//! Cost optimization error types

use thiserror::Error;

/// Cost optimization error types
#[derive(Debug, Error)]
pub enum CostOptimizationError {
    /// No storage/transfer/compute combination had usable prices
    #[error(
        "No feasible chain at {stage} stage: {compute_entries} compute, {storage_entries} storage, {transfer_entries} transfer entries"
    )]
    NoFeasibleChain {
        /// Stage that produced the empty candidate set
        stage: String,
        /// Number of compute map keys
        compute_entries: usize,
        /// Number of storage map keys
        storage_entries: usize,
        /// Number of transfer map keys
        transfer_entries: usize,
    },

    /// Solver finished without a proven optimal assignment
    #[error("Solver {solver} finished without an optimal solution: {status}")]
    SolverNonOptimal {
        /// Solver name
        solver: String,
        /// Reported solver status
        status: String,
    },

    /// A price collaborator could not be reached
    #[error("Upstream {collaborator} unavailable: {reason}")]
    UpstreamUnavailable {
        /// Collaborator name
        collaborator: String,
        /// Failure reason
        reason: String,
    },

    /// Request parameter out of range
    #[error("Invalid input for {field}: {reason}")]
    InvalidInput {
        /// Offending field
        field: String,
        /// Why it was rejected
        reason: String,
    },

    /// Invalid configuration
    #[error("Invalid configuration: {message}")]
    ConfigurationError {
        /// Description
        message: String,
    },

    /// Fan-out worker panicked or was cancelled
    #[error("Cost map worker failed: {reason}")]
    TaskFailed {
        /// Join error text
        reason: String,
    },

    /// I/O error
    #[error("I/O error: {source}")]
    IoError {
        /// Underlying error
        #[from]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization error
    #[error("JSON error: {source}")]
    JsonError {
        /// Underlying error
        #[from]
        source: serde_json::Error,
    },

    /// TOML configuration parse error
    #[error("TOML error: {source}")]
    TomlError {
        /// Underlying error
        #[from]
        source: toml::de::Error,
    },
}

impl CostOptimizationError {
    /// Shorthand for [`CostOptimizationError::InvalidInput`]
    pub fn invalid_input(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Whether retrying the same request could succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::UpstreamUnavailable { .. } | Self::IoError { .. })
    }
}

/// Cost optimization result type
pub type CostOptimizationResult<T> = Result<T, CostOptimizationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_feasible_chain_error() {
        let error = CostOptimizationError::NoFeasibleChain {
            stage: "join".to_string(),
            compute_entries: 0,
            storage_entries: 4,
            transfer_entries: 16,
        };
        assert_eq!(
            error.to_string(),
            "No feasible chain at join stage: 0 compute, 4 storage, 16 transfer entries"
        );
    }

    #[test]
    fn test_solver_non_optimal_error() {
        let error = CostOptimizationError::SolverNonOptimal {
            solver: "exhaustive".to_string(),
            status: "TimedOut".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Solver exhaustive finished without an optimal solution: TimedOut"
        );
    }

    #[test]
    fn test_upstream_unavailable_error() {
        let error = CostOptimizationError::UpstreamUnavailable {
            collaborator: "price source".to_string(),
            reason: "connection reset".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Upstream price source unavailable: connection reset"
        );
        assert!(error.is_retryable());
    }

    #[test]
    fn test_invalid_input_helper() {
        let error = CostOptimizationError::invalid_input("confidence_level", "must be in (0, 100)");
        assert_eq!(
            error.to_string(),
            "Invalid input for confidence_level: must be in (0, 100)"
        );
        assert!(!error.is_retryable());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "Cannot access price snapshot",
        );
        let error = CostOptimizationError::from(io_error);
        assert!(error.to_string().contains("I/O error"));
        assert!(error.to_string().contains("Cannot access price snapshot"));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_error: serde_json::Error =
            serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let error = CostOptimizationError::from(json_error);
        assert!(error.to_string().contains("JSON error"));
    }

    #[test]
    fn test_toml_error_conversion() {
        let toml_error = toml::from_str::<toml::Value>("key = ").unwrap_err();
        let error = CostOptimizationError::from(toml_error);
        assert!(error.to_string().contains("TOML error"));
    }

    #[test]
    fn test_missing_snapshot_is_io_error() {
        match crate::sources::PriceSnapshot::load("/nonexistent/prices.json").unwrap_err() {
            CostOptimizationError::IoError { .. } => {}
            other => panic!("expected IoError, got {other:?}"),
        }
    }

    #[test]
    fn test_error_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<CostOptimizationError>();
        assert_sync::<CostOptimizationError>();
    }
}

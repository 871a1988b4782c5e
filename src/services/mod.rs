//! Service layer: thin glue between the HTTP surface and the optimiser core
//! (§1 "HTTP surface ... calls into the core with a scenario identifier").

pub mod optimizer_service;

pub use optimizer_service::OptimizerService;

/// Service trait for common service patterns.
pub trait Service {
    fn name(&self) -> &'static str;
}

/// Result type for service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Error taxonomy (§7). Higher layers (the HTTP surface) map these to status
/// codes: `NotFound`/`InvalidInput` → 404/400, `NoFeasibleSolution` → 422,
/// everything else → 500.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("no feasible solution: {0}")]
    NoFeasibleSolution(String),

    #[error("persistence error: {0}")]
    Persistence(String),
}

impl From<crate::optimizer::adapter::AdapterError> for ServiceError {
    fn from(err: crate::optimizer::adapter::AdapterError) -> Self {
        match err {
            crate::optimizer::adapter::AdapterError::NotFound(id) => {
                ServiceError::NotFound(format!("scenario '{id}' not found"))
            }
            crate::optimizer::adapter::AdapterError::Store(e) => ServiceError::Persistence(e.to_string()),
        }
    }
}

impl From<crate::optimizer::solution::SolveError> for ServiceError {
    fn from(err: crate::optimizer::solution::SolveError) -> Self {
        ServiceError::NoFeasibleSolution(err.to_string())
    }
}

impl From<crate::store::StoreError> for ServiceError {
    fn from(err: crate::store::StoreError) -> Self {
        match err {
            crate::store::StoreError::NotFound(msg) => ServiceError::NotFound(msg),
            crate::store::StoreError::Io(msg) => ServiceError::Persistence(msg),
        }
    }
}

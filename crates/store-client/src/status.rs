//! Mapping between gRPC status codes and store errors.

use sources::SourceError;
use tonic::{Code, Status};

/// Classify a failed call against `backend`
pub fn to_source_error(backend: &str, status: &Status) -> SourceError {
    match status.code() {
        // The channel's request timeout surfaces as Cancelled
        Code::DeadlineExceeded | Code::Cancelled => SourceError::Timeout {
            backend: backend.to_string(),
        },
        Code::Unavailable => SourceError::unavailable(backend, status.message()),
        Code::InvalidArgument | Code::DataLoss => SourceError::invalid_data(backend, status.message()),
        _ => SourceError::query(backend, format!("{:?}: {}", status.code(), status.message())),
    }
}

/// The status a store service answers with when its backing store fails
pub fn from_source_error(err: &SourceError) -> Status {
    match err {
        SourceError::Unavailable { .. } => Status::unavailable(err.to_string()),
        SourceError::Timeout { .. } => Status::deadline_exceeded(err.to_string()),
        SourceError::Query { .. } => Status::internal(err.to_string()),
        SourceError::InvalidData { .. } => Status::invalid_argument(err.to_string()),
    }
}

/// Saturating conversion for limits sent over the wire
pub(crate) fn wire_limit(limit: usize) -> u32 {
    u32::try_from(limit).unwrap_or(u32::MAX)
}

use thiserror::Error;

/// All errors coming from the warehouse client layer.
#[derive(Debug, Error)]
pub enum WarehouseError {
    /// The table (or dataset) referenced by a request does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Transport-level failure talking to the warehouse.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The warehouse answered with an error status.
    #[error("Warehouse API error ({status}): {message}")]
    Api {
        status: u16,
        reason: Option<String>,
        message: String,
    },

    /// Token minting or exchange failed.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// A response or cell could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The client was closed by teardown.
    #[error("Warehouse client is closed")]
    Closed,
}

impl WarehouseError {
    /// True when the error means the queried table does not exist.
    pub fn is_not_found(&self) -> bool {
        match self {
            WarehouseError::NotFound(_) => true,
            WarehouseError::Api { status, reason, .. } => {
                *status == 404 || reason.as_deref() == Some("notFound")
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_classification() {
        assert!(WarehouseError::NotFound("orders".into()).is_not_found());
        assert!(
            WarehouseError::Api {
                status: 400,
                reason: Some("notFound".into()),
                message: "Table missing".into(),
            }
            .is_not_found()
        );
        assert!(
            !WarehouseError::Api {
                status: 403,
                reason: Some("accessDenied".into()),
                message: "nope".into(),
            }
            .is_not_found()
        );
        assert!(!WarehouseError::Closed.is_not_found());
    }
}

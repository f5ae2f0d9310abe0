//! # Connector Errors
//!
//! Every way a fetch can fail. A failure aborts the whole fetch; there is no
//! partial-success shape.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConnectorError {
    /// The requested source is not one of `crm`, `support`, `analytics`.
    #[error("unknown data source '{0}'")]
    UnknownSource(String),

    /// The backing store could not be read or did not contain JSON.
    #[error("record store unavailable for {data_source}: {reason}")]
    StoreUnavailable { data_source: String, reason: String },

    /// The pagination cursor did not decode to an offset.
    #[error("malformed cursor: {0}")]
    MalformedCursor(String),

    /// The source has no such operation, e.g. a summary of CRM records.
    #[error("{data_source} does not support {operation}")]
    Unsupported {
        data_source: String,
        operation: &'static str,
    },

    /// A request parameter is outside its accepted range.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A page could not be rendered as JSON.
    #[error("failed to encode records: {0}")]
    Encoding(#[from] serde_json::Error),
}

impl ConnectorError {
    /// `true` for errors caused by the caller's input.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownSource(_)
                | Self::MalformedCursor(_)
                | Self::Unsupported { .. }
                | Self::InvalidArgument(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_classification() {
        assert!(ConnectorError::UnknownSource("erp".into()).is_client_error());
        assert!(ConnectorError::MalformedCursor("!!".into()).is_client_error());
        assert!(!ConnectorError::StoreUnavailable {
            data_source: "crm".into(),
            reason: "missing".into(),
        }
        .is_client_error());
    }

    #[test]
    fn test_unsupported_operation_is_client_error() {
        let err = ConnectorError::Unsupported {
            data_source: "crm".into(),
            operation: "summary",
        };
        assert!(err.is_client_error());
        assert_eq!(err.to_string(), "crm does not support summary");
        assert!(ConnectorError::InvalidArgument("days".into()).is_client_error());
    }
}

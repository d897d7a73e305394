//! Error types for lookup operations

use crate::record::Record;
use ipnet::IpNet;
use std::net::IpAddr;
use std::time::Duration;
use thiserror::Error;

/// Errors produced while splitting and interpreting a response line
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The line does not have the number of fields the schema requires
    ///
    /// This is the protocol-format error: the service answered with
    /// something other than a result line of the active mode.
    #[error("unexpected response format: expected {expected} fields, found {found} in {line:?}")]
    FieldCount {
        /// Fields required by the schema
        expected: usize,
        /// Fields present in the line
        found: usize,
        /// The offending line
        line: String,
    },

    /// A response line ran past the length limit without a terminator
    #[error("unexpected response format: line exceeds {limit} bytes")]
    LineTooLong {
        /// Maximum accepted line length in bytes
        limit: usize,
    },

    /// The ASN field is not a positive integer
    #[error("could not parse ASN {0:?}")]
    Asn(String),

    /// The range field is not valid CIDR notation
    #[error("could not parse range {0:?}")]
    Range(String),

    /// The queried address is not covered by the announced range
    #[error("address {address} is outside range {range}")]
    AddressOutsideRange {
        /// Queried address
        address: IpAddr,
        /// Announced range
        range: IpNet,
    },
}

/// Errors that can occur while resolving addresses or ASNs
#[derive(Debug, Error)]
pub enum LookupError {
    /// Connecting to or greeting the whois service failed
    #[error("failed to connect to {server}: {source}")]
    Connect {
        /// Server address as configured
        server: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The whois service did not accept the connection in time
    #[error("timed out connecting to {server} after {timeout:?}")]
    ConnectTimeout {
        /// Server address as configured
        server: String,
        /// Configured connect timeout
        timeout: Duration,
    },

    /// Reading from or writing to an established session failed
    #[error("session I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The service reported an error for a query
    #[error("{0}")]
    Upstream(String),

    /// A response line could not be interpreted
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// DNS resolution failed
    #[error("DNS resolution failed: {0}")]
    Dns(String),

    /// An earlier batch on this session was abandoned with replies still
    /// owed, so later replies can no longer be matched to their queries
    #[error("whois session is out of sync after an abandoned batch")]
    Desynchronized,

    /// The query returned no usable record
    #[error("no records found")]
    NoRecords,

    /// An address was neither 4 nor 16 bytes long
    #[error("invalid address length ({0})")]
    InvalidAddressLength(usize),
}

impl LookupError {
    /// Whether the service answered with something other than a result line
    pub fn is_protocol_format(&self) -> bool {
        matches!(
            self,
            LookupError::Parse(ParseError::FieldCount { .. } | ParseError::LineTooLong { .. })
        )
    }
}

/// A batch that was aborted part way through
///
/// Records resolved before the failure are kept so callers can decide
/// whether to salvage them.
#[derive(Debug, Error)]
#[error("{error} ({} records resolved before failure)", .partial.len())]
pub struct BatchError {
    partial: Vec<Record>,
    #[source]
    error: LookupError,
}

impl BatchError {
    /// Create a batch error from the records obtained so far
    pub fn new(partial: Vec<Record>, error: LookupError) -> Self {
        Self { partial, error }
    }

    /// Records resolved before the failure, in query order
    pub fn partial(&self) -> &[Record] {
        &self.partial
    }

    /// The failure that aborted the batch
    pub fn error(&self) -> &LookupError {
        &self.error
    }

    /// Split into the partial records and the failure
    pub fn into_parts(self) -> (Vec<Record>, LookupError) {
        (self.partial, self.error)
    }
}

impl From<LookupError> for BatchError {
    fn from(error: LookupError) -> Self {
        Self::new(Vec::new(), error)
    }
}

/// Result of a batch lookup
pub type BatchResult = Result<Vec<Record>, BatchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_format_detection() {
        let err = LookupError::from(ParseError::FieldCount {
            expected: 5,
            found: 4,
            line: "a|b|c|d".to_string(),
        });
        assert!(err.is_protocol_format());
        assert!(LookupError::from(ParseError::LineTooLong { limit: 4096 }).is_protocol_format());
        assert!(!LookupError::Upstream("no match".to_string()).is_protocol_format());
        assert!(!LookupError::Desynchronized.is_protocol_format());
        assert!(!LookupError::from(ParseError::Asn("x".to_string())).is_protocol_format());
    }

    #[test]
    fn test_upstream_message_passthrough() {
        let err = LookupError::Upstream("no match".to_string());
        assert_eq!(err.to_string(), "no match");
    }

    #[test]
    fn test_batch_error_parts() {
        let err = BatchError::new(Vec::new(), LookupError::NoRecords);
        assert!(err.partial().is_empty());
        assert!(matches!(err.error(), LookupError::NoRecords));
        assert!(err.to_string().contains("0 records"));

        let (records, error) = err.into_parts();
        assert!(records.is_empty());
        assert!(matches!(error, LookupError::NoRecords));
    }
}

//! The lookup capability shared by the whois and DNS transports

use crate::error::{BatchResult, LookupError};
use crate::record::Record;
use crate::types::Asn;
use async_trait::async_trait;
use std::net::IpAddr;

/// Resolves addresses and ASNs to ownership records
///
/// Batch methods return records in input order. A batch that fails part
/// way returns the records resolved before the failure inside the
/// [`BatchError`](crate::BatchError). A batch may also succeed with fewer
/// records than inputs when the transport closed early; callers that need
/// every answer must compare the counts.
#[async_trait]
pub trait AsnResolver: Send + Sync {
    /// Resolve a batch of addresses
    async fn lookup_addresses(&self, addresses: &[IpAddr]) -> BatchResult;

    /// Resolve a batch of ASNs
    async fn lookup_asns(&self, asns: &[Asn]) -> BatchResult;

    /// Resolve a single address
    async fn lookup_address(&self, address: IpAddr) -> Result<Record, LookupError> {
        first_record(self.lookup_addresses(&[address]).await)
    }

    /// Resolve a single ASN
    async fn lookup_asn(&self, asn: Asn) -> Result<Record, LookupError> {
        first_record(self.lookup_asns(&[asn]).await)
    }
}

/// Take the only record of a one-element batch
///
/// A batch can finish without producing anything, either with an error or
/// because the transport closed, so the result is never indexed blindly.
pub(crate) fn first_record(result: BatchResult) -> Result<Record, LookupError> {
    match result {
        Ok(records) => records.into_iter().next().ok_or(LookupError::NoRecords),
        Err(err) => {
            let (partial, error) = err.into_parts();
            partial.into_iter().next().ok_or(error)
        }
    }
}

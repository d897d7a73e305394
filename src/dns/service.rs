//! DNS-based lookup service
//!
//! This module resolves addresses and ASNs with one TXT query each against
//! Team Cymru's origin and ASN zones. It holds no mutable state, so a single
//! instance may be cloned and used from many tasks at once.

use super::reverse;
use super::txt::{create_default_resolver, TxtSource};
use crate::config::settings::ASN_ZONE;
use crate::error::{BatchError, BatchResult, LookupError};
use crate::record::{parse, Record, Schema};
use crate::resolver::AsnResolver;
use crate::types::Asn;
use async_trait::async_trait;
use hickory_resolver::TokioResolver;
use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;
use tracing::debug;

/// DNS-based ASN lookup service
///
/// # Examples
///
/// ```no_run
/// use asnr::dns::service::DirectoryLookup;
/// use asnr::AsnResolver;
/// use std::net::IpAddr;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let dns = DirectoryLookup::new();
///
///     let ip: IpAddr = "8.8.8.8".parse()?;
///     let record = dns.lookup_address(ip).await?;
///
///     println!("{} {}", record.asn, record.name);
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct DirectoryLookup {
    source: Arc<dyn TxtSource>,
}

impl DirectoryLookup {
    /// Create a lookup service using the system DNS configuration
    pub fn new() -> Self {
        Self::with_resolver(Arc::new(create_default_resolver()))
    }

    /// Create a lookup service with a specific DNS resolver
    pub fn with_resolver(resolver: Arc<TokioResolver>) -> Self {
        Self { source: resolver }
    }

    /// Create a lookup service backed by any TXT source
    pub fn with_source(source: Arc<dyn TxtSource>) -> Self {
        Self { source }
    }

    /// Resolve one address: origin record, then the AS name
    async fn query_address(&self, address: IpAddr) -> Result<Record, LookupError> {
        let name = reverse::for_ip(address);
        let txt = self.first_txt(&name).await?;
        let record = parse(&txt, Schema::Origin)?.with_address(address)?;

        // The origin zone does not publish names; any failure here fails the
        // whole address lookup.
        let owner = self.query_asn(record.asn).await?;
        Ok(Record {
            name: owner.name,
            ..record
        })
    }

    async fn query_asn(&self, asn: Asn) -> Result<Record, LookupError> {
        let name = format!("{asn}.{ASN_ZONE}");
        let txt = self.first_txt(&name).await?;
        Ok(parse(&txt, Schema::Asn)?)
    }

    async fn first_txt(&self, name: &str) -> Result<String, LookupError> {
        debug!(query = name, "TXT lookup");
        self.source
            .lookup_txt(name)
            .await?
            .into_iter()
            .next()
            .ok_or(LookupError::NoRecords)
    }
}

#[async_trait]
impl AsnResolver for DirectoryLookup {
    async fn lookup_addresses(&self, addresses: &[IpAddr]) -> BatchResult {
        let mut records = Vec::with_capacity(addresses.len());
        for &address in addresses {
            match self.query_address(address).await {
                Ok(record) => records.push(record),
                Err(e) => return Err(BatchError::new(records, e)),
            }
        }
        Ok(records)
    }

    async fn lookup_asns(&self, asns: &[Asn]) -> BatchResult {
        let mut records = Vec::with_capacity(asns.len());
        for &asn in asns {
            match self.query_asn(asn).await {
                Ok(record) => records.push(record),
                Err(e) => return Err(BatchError::new(records, e)),
            }
        }
        Ok(records)
    }
}

impl Default for DirectoryLookup {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DirectoryLookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectoryLookup").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::test_utils::StaticTxtSource;
    use crate::error::ParseError;
    use chrono::NaiveDate;

    const GOOGLE_ORIGIN: &str = "8.8.8.8.origin.asn.cymru.com";
    const GOOGLE_ASN: &str = "AS15169.asn.cymru.com";

    fn google_zone() -> StaticTxtSource {
        StaticTxtSource::new()
            .with_record(GOOGLE_ORIGIN, "15169 | 8.8.8.0/24 | US | arin | 1992-12-01")
            .with_record(GOOGLE_ASN, "15169 | US | arin | 2000-03-30 | GOOGLE, US")
    }

    fn lookup(source: StaticTxtSource) -> (DirectoryLookup, Arc<StaticTxtSource>) {
        let source = Arc::new(source);
        (DirectoryLookup::with_source(source.clone()), source)
    }

    #[tokio::test]
    async fn test_address_lookup_chains_name_query() {
        let (dns, source) = lookup(google_zone());
        let ip: IpAddr = "8.8.8.8".parse().unwrap();

        let record = dns.lookup_address(ip).await.unwrap();
        assert_eq!(record.asn.get(), 15169);
        assert_eq!(record.address, Some(ip));
        assert_eq!(record.range, Some("8.8.8.0/24".parse().unwrap()));
        assert_eq!(record.name.as_str(), "GOOGLE, US");
        // Allocation date comes from the origin record, not the AS record
        assert_eq!(record.allocated, NaiveDate::from_ymd_opt(1992, 12, 1));
        assert_eq!(source.queried(), vec![GOOGLE_ORIGIN, GOOGLE_ASN]);
    }

    #[tokio::test]
    async fn test_ipv6_address_lookup() {
        let ip: IpAddr = "2001:db8::1".parse().unwrap();
        let origin = reverse::for_ip(ip);
        let (dns, _) = lookup(
            StaticTxtSource::new()
                .with_record(&origin, "64496 | 2001:db8::/32 | NL | ripencc | 2005-01-01")
                .with_record("AS64496.asn.cymru.com", "64496 | NL | ripencc | 2005-01-01 | EXAMPLE-NET"),
        );

        let record = dns.lookup_address(ip).await.unwrap();
        assert_eq!(record.name.as_str(), "EXAMPLE-NET");
        assert!(origin.ends_with(".origin6.asn.cymru.com"));
    }

    #[tokio::test]
    async fn test_mapped_ipv4_address_lookup() {
        let (dns, source) = lookup(google_zone());
        let ip: IpAddr = "::ffff:8.8.8.8".parse().unwrap();

        let record = dns.lookup_address(ip).await.unwrap();
        assert_eq!(record.address, Some(ip));
        assert_eq!(record.range, Some("8.8.8.0/24".parse().unwrap()));
        assert!(record.covers_address());
        assert_eq!(source.queried()[0], GOOGLE_ORIGIN);
    }

    #[tokio::test]
    async fn test_asn_lookup_single_query() {
        let (dns, source) = lookup(google_zone());
        let asn = Asn::new(15169).unwrap();

        let record = dns.lookup_asn(asn).await.unwrap();
        assert_eq!(record.name.as_str(), "GOOGLE, US");
        assert_eq!(record.range, None);
        assert_eq!(source.query_count(), 1);
    }

    #[tokio::test]
    async fn test_no_txt_records_is_fatal() {
        let (dns, _) = lookup(StaticTxtSource::new().with_empty(GOOGLE_ORIGIN));
        let err = dns.lookup_address("8.8.8.8".parse().unwrap()).await.unwrap_err();
        assert!(matches!(err, LookupError::NoRecords));
    }

    #[tokio::test]
    async fn test_wrong_field_count_is_fatal() {
        let (dns, _) = lookup(
            StaticTxtSource::new()
                .with_record(GOOGLE_ORIGIN, "15169 | 8.8.8.0/24 | US | arin | 1992-12-01 | GOOGLE"),
        );
        let err = dns.lookup_address("8.8.8.8".parse().unwrap()).await.unwrap_err();
        assert!(matches!(
            err,
            LookupError::Parse(ParseError::FieldCount { expected: 5, found: 6, .. })
        ));
    }

    #[tokio::test]
    async fn test_failed_name_lookup_fails_address() {
        let (dns, _) = lookup(
            StaticTxtSource::new()
                .with_record(GOOGLE_ORIGIN, "15169 | 8.8.8.0/24 | US | arin | 1992-12-01")
                .with_failure(GOOGLE_ASN, "SERVFAIL"),
        );
        let err = dns.lookup_address("8.8.8.8".parse().unwrap()).await.unwrap_err();
        assert!(matches!(err, LookupError::Dns(msg) if msg == "SERVFAIL"));
    }

    #[tokio::test]
    async fn test_batch_keeps_partial_results() {
        let (dns, _) = lookup(google_zone());
        let asns = [
            Asn::new(15169).unwrap(),
            Asn::new(64511).unwrap(),
            Asn::new(15169).unwrap(),
        ];

        let err = dns.lookup_asns(&asns).await.unwrap_err();
        assert_eq!(err.partial().len(), 1);
        assert_eq!(err.partial()[0].asn.get(), 15169);
        assert!(matches!(err.error(), LookupError::Dns(_)));
    }

    #[tokio::test]
    async fn test_batch_preserves_order() {
        let (dns, _) = lookup(
            google_zone()
                .with_record("AS13335.asn.cymru.com", "13335 | US | arin | 2010-07-14 | CLOUDFLARENET, US"),
        );
        let asns = [Asn::new(13335).unwrap(), Asn::new(15169).unwrap()];

        let records = dns.lookup_asns(&asns).await.unwrap();
        let got: Vec<u32> = records.iter().map(|r| r.asn.get()).collect();
        assert_eq!(got, vec![13335, 15169]);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let (dns, source) = lookup(StaticTxtSource::new());
        assert!(dns.lookup_addresses(&[]).await.unwrap().is_empty());
        assert_eq!(source.query_count(), 0);
    }
}

//! TXT record sources

use crate::error::LookupError;
use async_trait::async_trait;
use hickory_resolver::config::ResolverConfig;
use hickory_resolver::name_server::TokioConnectionProvider;
use hickory_resolver::TokioResolver;
use tracing::{debug, trace};

/// Something that can answer TXT queries
///
/// Each returned string is one TXT record with its character strings
/// concatenated. An empty vector means the name exists but carries no TXT
/// data.
#[async_trait]
pub trait TxtSource: Send + Sync {
    /// Fetch the TXT records published at `name`
    async fn lookup_txt(&self, name: &str) -> Result<Vec<String>, LookupError>;
}

#[async_trait]
impl TxtSource for TokioResolver {
    async fn lookup_txt(&self, name: &str) -> Result<Vec<String>, LookupError> {
        let lookup = self
            .txt_lookup(name)
            .await
            .map_err(|e| LookupError::Dns(e.to_string()))?;

        let records: Vec<String> = lookup
            .iter()
            .map(|record| {
                record
                    .iter()
                    .map(|data| String::from_utf8_lossy(data))
                    .collect::<Vec<_>>()
                    .join("")
            })
            .collect();

        trace!(query = name, ?records, "TXT answer");
        Ok(records)
    }
}

/// Create a DNS resolver from the system configuration
///
/// Falls back to Cloudflare's public resolvers when the system
/// configuration cannot be read.
pub fn create_default_resolver() -> TokioResolver {
    match TokioResolver::builder_tokio() {
        Ok(builder) => builder.build(),
        Err(e) => {
            debug!(error = %e, "system DNS configuration unavailable, using defaults");
            TokioResolver::builder_with_config(
                ResolverConfig::cloudflare(),
                TokioConnectionProvider::default(),
            )
            .build()
        }
    }
}

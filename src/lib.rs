//! asnr - IP and ASN ownership lookups against Team Cymru's services
//!
//! Two transports resolve the same records:
//!
//! - [`WhoisClient`] keeps one bulk whois session open and pipelines whole
//!   batches of queries over it.
//! - [`DirectoryLookup`] issues one DNS TXT query per address or ASN, plus a
//!   second query per address for the AS name.
//!
//! Both implement [`AsnResolver`] and parse upstream lines with the same
//! [`record::parse`], so identical upstream text yields identical
//! [`Record`]s whichever transport fetched it.

pub mod config;
pub mod country;
pub mod dns;
pub mod error;
pub mod record;
pub mod resolver;
pub mod types;
pub mod whois;

// Re-export core types for library users
pub use config::{SessionConfig, SessionConfigBuilder};
pub use country::Country;
pub use dns::DirectoryLookup;
pub use error::{BatchError, BatchResult, LookupError, ParseError};
pub use record::Record;
pub use resolver::AsnResolver;
pub use types::{AsName, Asn};
pub use whois::WhoisClient;

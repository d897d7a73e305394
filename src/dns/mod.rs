//! DNS transport: origin and ASN zone TXT lookups

pub mod reverse;
pub mod service;
pub mod txt;

#[cfg(test)]
pub mod test_utils;

pub use service::DirectoryLookup;
pub use txt::{create_default_resolver, TxtSource};

//! Lookup results and the response-line parser shared by both transports

pub mod parser;


pub use parser::{parse, Schema};

use crate::country::Country;
use crate::error::ParseError;
use crate::types::{AsName, Asn};
use chrono::NaiveDate;
use ipnet::IpNet;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// Ownership metadata for an address or an ASN
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Announcing autonomous system
    pub asn: Asn,
    /// Queried address (address lookups only)
    pub address: Option<IpAddr>,
    /// Allocated block covering `address` (address lookups only)
    pub range: Option<IpNet>,
    /// Country the resource is registered in
    pub country: Country,
    /// Regional internet registry that allocated the resource
    pub registry: String,
    /// Allocation date, when the registry has one on file
    pub allocated: Option<NaiveDate>,
    /// Organization or AS name
    pub name: AsName,
}

impl Record {
    /// Attach the queried address, checking it lies within `range`
    pub fn with_address(mut self, address: IpAddr) -> Result<Self, ParseError> {
        check_covered(Some(address), self.range)?;
        self.address = Some(address);
        Ok(self)
    }

    /// Whether `range` covers `address`; vacuously true if either is absent
    pub fn covers_address(&self) -> bool {
        check_covered(self.address, self.range).is_ok()
    }
}

// IPv4-mapped addresses are compared as IPv4, the family their origin
// records are published under.
pub(crate) fn check_covered(address: Option<IpAddr>, range: Option<IpNet>) -> Result<(), ParseError> {
    match (address, range) {
        (Some(address), Some(range)) if !range.contains(&address.to_canonical()) => {
            Err(ParseError::AddressOutsideRange { address, range })
        }
        _ => Ok(()),
    }
}

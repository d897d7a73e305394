//! Response-line parsing
//!
//! Both transports hand their raw pipe-delimited lines to [`parse`], so the
//! same upstream text always yields the same [`Record`] regardless of how it
//! was fetched.

use super::{check_covered, Record};
use crate::country::Country;
use crate::error::ParseError;
use crate::types::{AsName, Asn};
use chrono::NaiveDate;
use ipnet::IpNet;
use std::net::IpAddr;
use tracing::debug;

/// Field delimiter used by every response variant
pub const FIELD_DELIMITER: char = '|';

/// Date format of the allocation field
const ALLOCATED_FORMAT: &str = "%Y-%m-%d";

/// Field layout of a response line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schema {
    /// Whois address reply: asn | address | range | cc | registry | allocated | name
    Address,
    /// Origin zone TXT record: asn | range | cc | registry | allocated
    Origin,
    /// Whois ASN reply and ASN zone TXT record: asn | cc | registry | allocated | name
    Asn,
}

impl Schema {
    /// Number of delimited fields a line of this schema carries
    pub fn field_count(self) -> usize {
        match self {
            Schema::Address => 7,
            Schema::Origin | Schema::Asn => 5,
        }
    }
}

/// Parse one response line
///
/// The ASN and range fields are strict. The allocation date is lenient: an
/// empty or malformed value yields `None`. An unresolvable country code
/// yields the empty country.
pub fn parse(line: &str, schema: Schema) -> Result<Record, ParseError> {
    let fields: Vec<&str> = line.split(FIELD_DELIMITER).map(str::trim).collect();

    let record = match (schema, fields.as_slice()) {
        (Schema::Address, &[asn, address, range, cc, registry, allocated, name]) => Record {
            asn: parse_asn(asn)?,
            address: parse_address(address),
            range: Some(parse_range(range)?),
            country: parse_country(cc),
            registry: registry.to_string(),
            allocated: parse_allocated(allocated),
            name: AsName::new(name),
        },
        (Schema::Origin, &[asn, range, cc, registry, allocated]) => Record {
            asn: parse_asn(asn)?,
            address: None,
            range: Some(parse_range(range)?),
            country: parse_country(cc),
            registry: registry.to_string(),
            allocated: parse_allocated(allocated),
            name: AsName::default(),
        },
        (Schema::Asn, &[asn, cc, registry, allocated, name]) => Record {
            asn: parse_asn(asn)?,
            address: None,
            range: None,
            country: parse_country(cc),
            registry: registry.to_string(),
            allocated: parse_allocated(allocated),
            name: AsName::new(name),
        },
        (schema, fields) => {
            return Err(ParseError::FieldCount {
                expected: schema.field_count(),
                found: fields.len(),
                line: line.to_string(),
            })
        }
    };

    check_covered(record.address, record.range)?;
    Ok(record)
}

fn parse_asn(field: &str) -> Result<Asn, ParseError> {
    field
        .parse::<Asn>()
        .map_err(|_| ParseError::Asn(field.to_string()))
}

fn parse_range(field: &str) -> Result<IpNet, ParseError> {
    field
        .parse::<IpNet>()
        .map(|net| net.trunc())
        .map_err(|_| ParseError::Range(field.to_string()))
}

fn parse_address(field: &str) -> Option<IpAddr> {
    if field.is_empty() {
        return None;
    }
    match field.parse() {
        Ok(ip) => Some(ip),
        Err(_) => {
            debug!(field, "ignoring unparseable address field");
            None
        }
    }
}

fn parse_country(field: &str) -> Country {
    if field.is_empty() {
        return Country::default();
    }
    Country::from_code(field).unwrap_or_else(|e| {
        debug!(error = %e, "ignoring unresolvable country");
        Country::default()
    })
}

// Many allocations predate reliable records, so a missing date is normal.
fn parse_allocated(field: &str) -> Option<NaiveDate> {
    if field.is_empty() {
        return None;
    }
    match NaiveDate::parse_from_str(field, ALLOCATED_FORMAT) {
        Ok(date) => Some(date),
        Err(e) => {
            debug!(field, error = %e, "ignoring malformed allocation date");
            None
        }
    }
}

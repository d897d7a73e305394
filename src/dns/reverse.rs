//! Reverse-name construction for origin zone queries

use crate::config::settings::{ORIGIN6_ZONE, ORIGIN_ZONE};
use crate::error::LookupError;
use std::net::IpAddr;

const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

/// Origin zone name for a raw address
///
/// Four bytes produce the reversed dotted-decimal form under the IPv4 origin
/// zone. Sixteen bytes produce the reversed nibble form under the IPv6
/// origin zone. Any other length is rejected.
pub fn for_octets(octets: &[u8]) -> Result<String, LookupError> {
    match octets {
        &[a, b, c, d] => Ok(format!("{d}.{c}.{b}.{a}.{ORIGIN_ZONE}")),
        octets if octets.len() == 16 => Ok(v6_name(octets)),
        octets => Err(LookupError::InvalidAddressLength(octets.len())),
    }
}

/// Origin zone name for an address
///
/// IPv4-mapped IPv6 addresses are queried in the IPv4 zone.
pub fn for_ip(ip: IpAddr) -> String {
    match ip.to_canonical() {
        IpAddr::V4(v4) => {
            let [a, b, c, d] = v4.octets();
            format!("{d}.{c}.{b}.{a}.{ORIGIN_ZONE}")
        }
        IpAddr::V6(v6) => v6_name(&v6.octets()),
    }
}

// Words from least to most significant, each word's nibbles from least to
// most significant.
fn v6_name(octets: &[u8]) -> String {
    let mut name = String::with_capacity(64 + ORIGIN6_ZONE.len());
    for pair in octets.chunks_exact(2).rev() {
        let word = u16::from_be_bytes([pair[0], pair[1]]);
        for shift in [0u16, 4, 8, 12] {
            name.push(HEX_DIGITS[usize::from((word >> shift) & 0xf)] as char);
            name.push('.');
        }
    }
    // The trailing separator doubles as the one before the zone
    name.push_str(ORIGIN6_ZONE);
    name
}

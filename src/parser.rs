//! Turns a range string into an ordered `(low, high)` boundary pair.
//!
//! Three syntaxes are tried in order: a single address, CIDR notation
//! (`A.B.C.D/p`, `1 <= p <= 32`), and a hyphenated range
//! (`A.B.C.D - E.F.G.H`, left <= right). See `spec.md` §4.4.

use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;
use std::sync::OnceLock;

use ipnet::Ipv4Net;
use regex::Regex;

use crate::boundary::{Boundary, Endpoint, Kind};
use crate::error::{Error, Result};

fn hyphen_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\s*([0-9a-fA-F:.]+)\s*-\s*([0-9a-fA-F:.]+)\s*$").unwrap())
}

/// Parse `range` into a `(low, high)` boundary pair, both carrying `tag`.
/// For a single address, `low` and `high` sit at the same address (the
/// caller/engine promotes that to a `Double` boundary at emit time).
pub fn parse_range(range: &str, tag: &[u8]) -> Result<(Boundary, Boundary)> {
    let trimmed = range.trim();

    if let Ok(addr) = IpAddr::from_str(trimmed) {
        return match addr {
            IpAddr::V6(_) => Err(Error::Ipv6NotSupported),
            IpAddr::V4(ip) => Ok(single(ip, tag)),
        };
    }

    if trimmed.contains('/') {
        if let Some((addr_part, _)) = trimmed.split_once('/') {
            if addr_part.contains(':') {
                return Err(Error::Ipv6NotSupported);
            }
        }
        match Ipv4Net::from_str(trimmed) {
            Ok(net) => {
                if net.prefix_len() == 0 {
                    return Err(Error::InvalidInput(format!("CIDR prefix out of range [1,32]: {range}")));
                }
                return Ok(pair(net.network(), net.broadcast(), tag));
            }
            Err(_) => return Err(Error::InvalidInput(format!("invalid CIDR range: {range}"))),
        }
    }

    if let Some(caps) = hyphen_pattern().captures(trimmed) {
        let low_raw = caps.get(1).unwrap().as_str();
        let high_raw = caps.get(2).unwrap().as_str();

        if low_raw.contains(':') || high_raw.contains(':') {
            return Err(Error::Ipv6NotSupported);
        }

        let low_ip = Ipv4Addr::from_str(low_raw).map_err(|_| Error::InvalidInput(format!("invalid range: {range}")))?;
        let high_ip = Ipv4Addr::from_str(high_raw).map_err(|_| Error::InvalidInput(format!("invalid range: {range}")))?;

        if low_ip > high_ip {
            return Err(Error::InvalidInput(format!("first address must not exceed the second: {range}")));
        }

        return Ok(pair(low_ip, high_ip, tag));
    }

    Err(Error::InvalidInput(format!(
        "use either of these: <IP>, <IP>/<1-32>, <IP> - <IP>, got: {range}"
    )))
}

/// Parse a bare IPv4/IPv6 address for `Find`.
pub fn parse_addr(addr: &str) -> Result<Ipv4Addr> {
    match IpAddr::from_str(addr.trim()) {
        Ok(IpAddr::V4(ip)) => Ok(ip),
        Ok(IpAddr::V6(_)) => Err(Error::Ipv6NotSupported),
        Err(_) => Err(Error::InvalidInput(format!("invalid IP address: {addr}"))),
    }
}

fn single(ip: Ipv4Addr, tag: &[u8]) -> (Boundary, Boundary) {
    (Boundary::new(Endpoint::Addr(ip), Kind::Lower, tag.to_vec()), Boundary::new(Endpoint::Addr(ip), Kind::Upper, tag.to_vec()))
}

fn pair(low: Ipv4Addr, high: Ipv4Addr, tag: &[u8]) -> (Boundary, Boundary) {
    (Boundary::new(Endpoint::Addr(low), Kind::Lower, tag.to_vec()), Boundary::new(Endpoint::Addr(high), Kind::Upper, tag.to_vec()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_address() {
        let (low, high) = parse_range("10.0.0.5", b"t").unwrap();
        assert_eq!(low.ip, Endpoint::Addr("10.0.0.5".parse().unwrap()));
        assert_eq!(high.ip, low.ip);
        assert_eq!(low.kind, Kind::Lower);
        assert_eq!(high.kind, Kind::Upper);
    }

    #[test]
    fn parses_cidr() {
        let (low, high) = parse_range("10.0.0.0/24", b"t").unwrap();
        assert_eq!(low.ip, Endpoint::Addr("10.0.0.0".parse().unwrap()));
        assert_eq!(high.ip, Endpoint::Addr("10.0.0.255".parse().unwrap()));
    }

    #[test]
    fn rejects_cidr_prefix_zero() { assert!(matches!(parse_range("10.0.0.0/0", b"t"), Err(Error::InvalidInput(_)))); }

    #[test]
    fn parses_hyphen_range() {
        let (low, high) = parse_range("10.0.0.3 - 10.0.0.9", b"t").unwrap();
        assert_eq!(low.ip, Endpoint::Addr("10.0.0.3".parse().unwrap()));
        assert_eq!(high.ip, Endpoint::Addr("10.0.0.9".parse().unwrap()));
    }

    #[test]
    fn rejects_reversed_hyphen_range() { assert!(matches!(parse_range("10.0.0.9 - 10.0.0.3", b"t"), Err(Error::InvalidInput(_)))); }

    #[test]
    fn rejects_ipv6() {
        assert!(matches!(parse_range("::1", b"t"), Err(Error::Ipv6NotSupported)));
        assert!(matches!(parse_addr("::1"), Err(Error::Ipv6NotSupported)));
    }

    #[test]
    fn rejects_garbage() { assert!(matches!(parse_range("not-an-ip", b"t"), Err(Error::InvalidInput(_)))); }
}

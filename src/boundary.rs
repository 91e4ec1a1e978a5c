//! The atomic unit of the interval index: a single IPv4 point annotated
//! with which interval edge(s) meet there and which tag applies.

use std::fmt;
use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

/// Which edge(s) of an interval a [`Boundary`] represents.
///
/// `Double` replaces the two-bit `(lower, upper)` encoding of the
/// original system, where `(false, false)` was an impossible state that
/// had to be guarded against at every call site. Here it simply doesn't
/// exist.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Kind {
    /// Left edge of an interval.
    Lower,
    /// Right edge of an interval.
    Upper,
    /// A singleton interval: both edges coincide at one address.
    Double,
}

impl Kind {
    #[must_use]
    pub const fn is_lower(self) -> bool { matches!(self, Kind::Lower) }

    #[must_use]
    pub const fn is_upper(self) -> bool { matches!(self, Kind::Upper) }

    #[must_use]
    pub const fn is_double(self) -> bool { matches!(self, Kind::Double) }

    /// The kind one address *below* a boundary of this kind carries,
    /// per the invert-the-edge-bits rule (`spec.md` §4.1): `Lower` and
    /// `Upper` swap, `Double` collapses to `Upper`.
    const fn below(self) -> Kind {
        match self {
            Kind::Lower | Kind::Upper => self.invert(),
            Kind::Double => Kind::Upper,
        }
    }

    /// Symmetric to [`Kind::below`]: `Double` collapses to `Lower`.
    const fn above(self) -> Kind {
        match self {
            Kind::Lower | Kind::Upper => self.invert(),
            Kind::Double => Kind::Lower,
        }
    }

    const fn invert(self) -> Kind {
        match self {
            Kind::Lower => Kind::Upper,
            Kind::Upper => Kind::Lower,
            Kind::Double => Kind::Double,
        }
    }
}

/// The address an endpoint sits at: a concrete IPv4 address, or one of
/// the two sentinels that bracket the whole space.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Endpoint {
    NegInf,
    Addr(Ipv4Addr),
    PosInf,
}

impl Endpoint {
    #[must_use]
    pub const fn is_sentinel(self) -> bool { !matches!(self, Endpoint::Addr(_)) }

    /// The ordering score: ±∞ for sentinels, otherwise the big-endian
    /// numeric value of the address. Exact for every IPv4 address.
    #[must_use]
    pub fn score(self) -> f64 {
        match self {
            Endpoint::NegInf => f64::NEG_INFINITY,
            Endpoint::PosInf => f64::INFINITY,
            Endpoint::Addr(ip) => f64::from(u32::from(ip)),
        }
    }

    /// The persisted key bytes for this endpoint: the literal sentinel
    /// tokens, or the 4-byte big-endian address.
    #[must_use]
    pub fn key_bytes(self) -> Vec<u8> {
        match self {
            Endpoint::NegInf => NEG_INF_KEY.to_vec(),
            Endpoint::PosInf => POS_INF_KEY.to_vec(),
            Endpoint::Addr(ip) => ip.octets().to_vec(),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::NegInf => write!(f, "-inf"),
            Endpoint::PosInf => write!(f, "+inf"),
            Endpoint::Addr(ip) => write!(f, "{ip}"),
        }
    }
}

pub const NEG_INF_KEY: &[u8] = b"-inf";
pub const POS_INF_KEY: &[u8] = b"+inf";
pub const NEG_INF_TAG: &[u8] = b"-inf";
pub const POS_INF_TAG: &[u8] = b"+inf";

/// A persisted endpoint record: address, kind, tag.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Boundary {
    pub ip: Endpoint,
    pub kind: Kind,
    pub tag: Vec<u8>,
}

impl Boundary {
    #[must_use]
    pub fn new(ip: Endpoint, kind: Kind, tag: Vec<u8>) -> Self { Boundary { ip, kind, tag } }

    #[must_use]
    pub fn neg_inf() -> Self { Boundary::new(Endpoint::NegInf, Kind::Upper, NEG_INF_TAG.to_vec()) }

    #[must_use]
    pub fn pos_inf() -> Self { Boundary::new(Endpoint::PosInf, Kind::Lower, POS_INF_TAG.to_vec()) }

    #[must_use]
    pub fn is_sentinel(&self) -> bool { self.ip.is_sentinel() }

    #[must_use]
    pub fn score(&self) -> f64 { self.ip.score() }

    #[must_use]
    pub fn key_bytes(&self) -> Vec<u8> { self.ip.key_bytes() }

    /// A boundary one address below this one, tagged with `tag`
    /// (defaulting to this boundary's own tag) and with the kind
    /// inverted per [`Kind::below`]. Underflowing IPv4 collapses to the
    /// −∞ sentinel; calling this on −∞ itself returns −∞ unchanged.
    #[must_use]
    pub fn below(&self, tag: Option<&[u8]>) -> Boundary {
        let tag = tag.unwrap_or(&self.tag).to_vec();
        let addr = match self.ip {
            Endpoint::NegInf => return Boundary::neg_inf(),
            Endpoint::PosInf => None,
            Endpoint::Addr(ip) => u32::from(ip).checked_sub(1),
        };
        match addr {
            Some(prev) => Boundary::new(Endpoint::Addr(Ipv4Addr::from(prev)), self.kind.below(), tag),
            None => Boundary::neg_inf(),
        }
    }

    /// Symmetric to [`Boundary::below`].
    #[must_use]
    pub fn above(&self, tag: Option<&[u8]>) -> Boundary {
        let tag = tag.unwrap_or(&self.tag).to_vec();
        let addr = match self.ip {
            Endpoint::PosInf => return Boundary::pos_inf(),
            Endpoint::NegInf => None,
            Endpoint::Addr(ip) => u32::from(ip).checked_add(1),
        };
        match addr {
            Some(next) if next <= u32::from(Ipv4Addr::BROADCAST) => {
                Boundary::new(Endpoint::Addr(Ipv4Addr::from(next)), self.kind.above(), tag)
            }
            _ => Boundary::pos_inf(),
        }
    }

    /// True if `self` and `other` sit at the same address (and hence
    /// share a score).
    #[must_use]
    pub fn equal_ip(&self, other: &Boundary) -> bool { self.ip == other.ip }

    /// True if the tags are byte-equal.
    #[must_use]
    pub fn equal_tag(&self, other: &Boundary) -> bool { self.tag == other.tag }

    /// True if every field matches.
    #[must_use]
    pub fn equal(&self, other: &Boundary) -> bool { self.ip == other.ip && self.kind == other.kind && self.tag == other.tag }

    /// Returns a copy of `self` promoted/demoted to the given kind,
    /// leaving the address and tag untouched.
    #[must_use]
    pub fn with_kind(&self, kind: Kind) -> Boundary { Boundary::new(self.ip, kind, self.tag.clone()) }

    /// Returns a copy of `self` with a different tag.
    #[must_use]
    pub fn with_tag(&self, tag: Vec<u8>) -> Boundary { Boundary::new(self.ip, self.kind, tag) }
}

impl fmt::Display for Boundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let suffix = match self.kind {
            Kind::Lower => "lb",
            Kind::Upper => "ub",
            Kind::Double => "db",
        };
        write!(f, "{}:{suffix}", self.ip)
    }
}

/// The record actually persisted in the KV bucket for a non-sentinel
/// boundary. Sentinels never round-trip through this type: their
/// identity is fixed by [`Boundary::neg_inf`] / [`Boundary::pos_inf`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DbRecord {
    pub low: bool,
    pub high: bool,
    pub tag: Vec<u8>,
}

impl From<&Boundary> for DbRecord {
    fn from(b: &Boundary) -> Self {
        let (low, high) = match b.kind {
            Kind::Lower => (true, false),
            Kind::Upper => (false, true),
            Kind::Double => (true, true),
        };
        DbRecord { low, high, tag: b.tag.clone() }
    }
}

impl DbRecord {
    /// Recover the [`Kind`] this record encodes. Panics on the
    /// impossible `(false, false)` combination: a corrupt record is a
    /// bug in the store, not a recoverable runtime condition.
    #[must_use]
    pub fn kind(&self) -> Kind {
        match (self.low, self.high) {
            (true, false) => Kind::Lower,
            (false, true) => Kind::Upper,
            (true, true) => Kind::Double,
            (false, false) => panic!("corrupt boundary record: neither lower nor upper bit set"),
        }
    }

    #[must_use]
    pub fn into_boundary(self, ip: Endpoint) -> Boundary {
        let kind = self.kind();
        Boundary::new(ip, kind, self.tag)
    }
}

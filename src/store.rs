//! Thin wrapper translating boundary operations into `sled` tree reads and
//! writes, standing in for the opaque "ordered KV bucket + sorted set with
//! transactional semantics" collaborator the core algorithm is written
//! against.
//!
//! `sled`'s `Tree` is itself byte-ordered, so the sorted set doesn't need a
//! separate score-indexed structure: an order-preserving key (see
//! [`order_key`]) turns a second `Tree` into exactly the sorted set the
//! engine needs, scanned with native `range()` queries.

use std::net::Ipv4Addr;

use sled::transaction::{ConflictableTransactionError, TransactionError, Transactional};
use sled::Tree;
use tracing::trace;

use crate::boundary::{Boundary, DbRecord, Endpoint, NEG_INF_KEY, POS_INF_KEY};
use crate::error::{Error, Result};

const TAG_NEG_INF: u8 = 0x00;
const TAG_FINITE: u8 = 0x01;
const TAG_POS_INF: u8 = 0x02;

/// The order-preserving key used inside the sorted-set tree. Byte
/// ordering reproduces score ordering: `0x00 < 0x01<ip> < 0x02`.
fn order_key(ip: Endpoint) -> Vec<u8> {
    match ip {
        Endpoint::NegInf => vec![TAG_NEG_INF],
        Endpoint::PosInf => vec![TAG_POS_INF],
        Endpoint::Addr(addr) => {
            let mut key = Vec::with_capacity(5);
            key.push(TAG_FINITE);
            key.extend_from_slice(&addr.octets());
            key
        }
    }
}

fn endpoint_from_order_key(bytes: &[u8]) -> Result<Endpoint> {
    match bytes.first() {
        Some(&TAG_NEG_INF) => Ok(Endpoint::NegInf),
        Some(&TAG_POS_INF) => Ok(Endpoint::PosInf),
        Some(&TAG_FINITE) if bytes.len() == 5 => {
            let octets: [u8; 4] = bytes[1..5].try_into().unwrap();
            Ok(Endpoint::Addr(Ipv4Addr::from(octets)))
        }
        _ => Err(Error::Inconsistent(format!("malformed order key: {bytes:?}"))),
    }
}

/// A single edit to apply to the store. Mirrors the three primitives the
/// original collaborator contract names: `insert_boundary` (adds both the
/// KV record and the sorted-set member), `update_boundary` (rewrites the
/// KV record of an address already present), and `remove_boundary`
/// (deletes both).
#[derive(Clone, Debug)]
pub enum Edit {
    Insert(Boundary),
    Update(Boundary),
    Remove(Boundary),
}

pub struct Store {
    kv: Tree,
    zset: Tree,
}

impl Store {
    pub fn open(db: &sled::Db, bucket: &str) -> Result<Self> {
        let kv = db.open_tree(bucket)?;
        let zset = db.open_tree(format!("{bucket}__zset"))?;
        Ok(Store { kv, zset })
    }

    /// Fetch the `(kind, tag)` fields for a single address, if present.
    pub fn get_boundary(&self, ip: Endpoint) -> Result<Option<Boundary>> {
        let key = Self::kv_key(ip);
        match self.kv.get(key)? {
            Some(raw) => {
                let record: DbRecord = serde_json::from_slice(&raw)?;
                Ok(Some(record.into_boundary(ip)))
            }
            None => Ok(None),
        }
    }

    /// Every boundary whose score lies in `[lo.score(), hi.score()]`, in
    /// ascending score order.
    pub fn range_inclusive(&self, lo: Endpoint, hi: Endpoint) -> Result<Vec<Boundary>> {
        let lo_key = order_key(lo);
        let hi_key = order_key(hi);
        self.decode_range(self.zset.range(lo_key..=hi_key))
    }

    /// Up to `limit` boundaries with score `<= at.score()`, nearest
    /// first internally but returned in ascending score order.
    pub fn nearest_at_or_below(&self, at: Endpoint, limit: usize) -> Result<Vec<Boundary>> {
        let hi_key = order_key(at);
        let mut found = self.decode_range(self.zset.range(..=hi_key).rev().take(limit))?;
        found.reverse();
        Ok(found)
    }

    /// Up to `limit` boundaries with score `>= at.score()`, in ascending
    /// score order.
    pub fn nearest_at_or_above(&self, at: Endpoint, limit: usize) -> Result<Vec<Boundary>> {
        let lo_key = order_key(at);
        self.decode_range(self.zset.range(lo_key..).take(limit))
    }

    /// Every stored boundary, in ascending score order.
    pub fn all(&self) -> Result<Vec<Boundary>> { self.decode_range(self.zset.iter()) }

    /// Wipe every entry from both the KV bucket and the sorted-set tree,
    /// without reinstalling the sentinels. Distinct from a `Reset`,
    /// which wipes and then reinstalls both buckets and the sentinels.
    pub fn clear(&self) -> Result<()> {
        self.kv.clear()?;
        self.zset.clear()?;
        Ok(())
    }

    fn decode_range<I>(&self, iter: I) -> Result<Vec<Boundary>>
    where
        I: Iterator<Item = sled::Result<(sled::IVec, sled::IVec)>>,
    {
        let mut out = Vec::new();
        for entry in iter {
            let (order_key_bytes, kv_key_bytes) = entry?;
            let ip = endpoint_from_order_key(&order_key_bytes)?;
            let raw = self
                .kv
                .get(&kv_key_bytes)?
                .ok_or_else(|| Error::Inconsistent(format!("sorted-set member {ip} missing from KV bucket")))?;
            let record: DbRecord = serde_json::from_slice(&raw)?;
            out.push(record.into_boundary(ip));
        }
        Ok(out)
    }

    fn kv_key(ip: Endpoint) -> Vec<u8> {
        match ip {
            Endpoint::NegInf => NEG_INF_KEY.to_vec(),
            Endpoint::PosInf => POS_INF_KEY.to_vec(),
            Endpoint::Addr(addr) => addr.octets().to_vec(),
        }
    }

    /// Apply a batch of edits as a single atomic transaction across the
    /// KV bucket and the sorted-set tree. On any failure nothing is
    /// committed.
    pub fn commit(&self, edits: &[Edit]) -> Result<()> {
        trace!(count = edits.len(), "committing boundary edits");
        let result: std::result::Result<(), TransactionError<Error>> =
            (&self.kv, &self.zset).transaction(|(kv, zset)| {
                for edit in edits {
                    match edit {
                        Edit::Insert(b) => {
                            let record = DbRecord::from(b);
                            let value = serde_json::to_vec(&record)
                                .map_err(|e| ConflictableTransactionError::Abort(Error::Encoding(e)))?;
                            let key = Self::kv_key(b.ip);
                            kv.insert(key.clone(), value)?;
                            zset.insert(order_key(b.ip), key)?;
                        }
                        Edit::Update(b) => {
                            let record = DbRecord::from(b);
                            let value = serde_json::to_vec(&record)
                                .map_err(|e| ConflictableTransactionError::Abort(Error::Encoding(e)))?;
                            let key = Self::kv_key(b.ip);
                            if kv.get(&key)?.is_none() {
                                return Err(ConflictableTransactionError::Abort(Error::Inconsistent(format!(
                                    "update_boundary on absent key {b}"
                                ))));
                            }
                            kv.insert(key, value)?;
                        }
                        Edit::Remove(b) => {
                            let key = Self::kv_key(b.ip);
                            kv.remove(key)?;
                            zset.remove(order_key(b.ip))?;
                        }
                    }
                }
                Ok(())
            });

        result.map_err(|e| match e {
            TransactionError::Abort(err) => err,
            TransactionError::Storage(err) => Error::Store(err),
        })
    }
}

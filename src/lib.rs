//! A persistent, transactional IPv4 interval-set index: insert a range
//! with an opaque tag, remove a range, and look up the tag covering a
//! given address. Overlapping or adjacent inserts with identical tags
//! coalesce so the stored representation is always a canonical, minimal
//! set of disjoint tagged intervals.
//!
//! ```no_run
//! use boundaryset::{BoundarySet, Config};
//!
//! let set = BoundarySet::open(Config::builder().data_dir("/tmp/example-nuts").build())?;
//! set.insert("10.0.0.0/24", b"internal")?;
//! assert_eq!(set.find("10.0.0.5")?, b"internal");
//! # Ok::<(), boundaryset::Error>(())
//! ```

pub mod boundary;
pub mod config;
pub mod engine;
pub mod error;
pub mod parser;
mod store;

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, info};

pub use boundary::{Boundary, Endpoint, Kind};
pub use config::{Config, ConfigBuilder};
pub use error::{Error, Result};
use store::Store;

/// A persistent, disk-backed interval-tagging store.
///
/// Every mutating operation (`insert`, `remove`, `reset`, `flush`) is
/// serialized behind an internal write guard and applied as one atomic
/// `sled` transaction; `find` takes no lock and may run concurrently
/// with other reads.
pub struct BoundarySet {
    db: sled::Db,
    store: Store,
    whitelist: sled::Tree,
    data_dir: PathBuf,
    write_guard: Mutex<()>,
}

impl BoundarySet {
    /// Open (creating if absent) the database at `config.data_dir()`,
    /// provisioning the blacklist bucket/sorted-set pair and an empty
    /// whitelist bucket, and installing the ±∞ sentinels if this is a
    /// fresh database.
    pub fn open(config: Config) -> Result<Self> {
        info!(data_dir = %config.data_dir().display(), "opening boundary set");
        std::fs::create_dir_all(config.data_dir()).map_err(sled::Error::from)?;
        let db = sled::open(config.data_dir())?;
        let store = Store::open(&db, config.blacklist_bucket())?;
        let whitelist = db.open_tree(config.whitelist_bucket())?;

        let set = BoundarySet { db, store, whitelist, data_dir: config.data_dir().to_path_buf(), write_guard: Mutex::new(()) };
        set.ensure_sentinels()?;
        Ok(set)
    }

    fn ensure_sentinels(&self) -> Result<()> {
        let mut edits = Vec::new();
        if self.store.get_boundary(Endpoint::NegInf)?.is_none() {
            edits.push(store::Edit::Insert(Boundary::neg_inf()));
        }
        if self.store.get_boundary(Endpoint::PosInf)?.is_none() {
            edits.push(store::Edit::Insert(Boundary::pos_inf()));
        }
        if !edits.is_empty() {
            debug!(count = edits.len(), "installing missing sentinels");
            self.store.commit(&edits)?;
        }
        Ok(())
    }

    /// Insert `range` tagged with `tag`, coalescing with any abutting or
    /// overlapping interval that carries the same tag.
    pub fn insert(&self, range: &str, tag: &[u8]) -> Result<()> {
        debug!(range, tag = %String::from_utf8_lossy(tag), "insert");
        let _guard = self.write_guard.lock().unwrap();
        let (low, high) = parser::parse_range(range, tag)?;
        let edits = engine::plan_insert(&self.store, &low, &high)?;
        self.store.commit(&edits)?;
        engine::check_consistency(&self.store, Some((&low, &high)))
    }

    /// Remove `range`, splitting or shrinking any interval it overlaps.
    pub fn remove(&self, range: &str) -> Result<()> {
        debug!(range, "remove");
        let _guard = self.write_guard.lock().unwrap();
        let (low, high) = parser::parse_range(range, b"")?;
        let edits = engine::plan_remove(&self.store, &low, &high)?;
        self.store.commit(&edits)?;
        engine::check_consistency(&self.store, None)
    }

    /// Return the tag covering `ip`, or [`Error::NotFound`].
    pub fn find(&self, ip: &str) -> Result<Vec<u8>> {
        debug!(ip, "find");
        let addr = parser::parse_addr(ip)?;
        engine::find(&self.store, addr)
    }

    /// Drop every stored interval and reinstall a fresh pair of
    /// sentinels, as a single transaction.
    pub fn reset(&self) -> Result<()> {
        debug!("reset");
        let _guard = self.write_guard.lock().unwrap();
        let mut edits: Vec<store::Edit> = self.store.all()?.into_iter().map(store::Edit::Remove).collect();
        edits.push(store::Edit::Insert(Boundary::neg_inf()));
        edits.push(store::Edit::Insert(Boundary::pos_inf()));
        self.store.commit(&edits)
    }

    /// Wipe the blacklist and whitelist buckets. Unlike [`reset`](Self::reset),
    /// the buckets and sentinels are not reinstalled — the database is left
    /// empty until the caller inserts again or calls `reset`.
    pub fn flush(&self) -> Result<()> {
        debug!("flush");
        let _guard = self.write_guard.lock().unwrap();
        self.store.clear()?;
        self.whitelist.clear()?;
        Ok(())
    }

    /// Flush and drop the database handle.
    pub fn close(self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }

    #[must_use]
    pub fn data_dir(&self) -> &Path { &self.data_dir }

    /// Run the invariant checker over the current committed state. See
    /// `spec.md` §4.3.5 and §8. Exposed publicly so tests and
    /// embedders can audit beyond what every mutating call already
    /// verifies against its own just-committed range.
    pub fn check_consistency(&self, last: Option<(&str, &str)>) -> Result<()> {
        let staged;
        let pair = match last {
            Some((low, high)) => {
                let low_addr = parser::parse_addr(low)?;
                let high_addr = parser::parse_addr(high)?;
                staged = (
                    Boundary::new(Endpoint::Addr(low_addr), Kind::Lower, Vec::new()),
                    Boundary::new(Endpoint::Addr(high_addr), Kind::Upper, Vec::new()),
                );
                Some((&staged.0, &staged.1))
            }
            None => None,
        };
        engine::check_consistency(&self.store, pair)
    }

    #[cfg(test)]
    fn all_boundaries(&self) -> Result<Vec<Boundary>> { self.store.all() }
}

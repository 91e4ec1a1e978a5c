//! Construction-time configuration. There is no live-reload: every field
//! is fixed when [`BoundarySet::open`](crate::BoundarySet::open) is
//! called. See `spec.md` §6.

use std::path::{Path, PathBuf};

const DEFAULT_DATA_DIR: &str = "nutsdata";
const DEFAULT_BLACKLIST_BUCKET: &str = "blacklist";
const DEFAULT_WHITELIST_BUCKET: &str = "whitelist";

/// Construction-time settings for a [`BoundarySet`](crate::BoundarySet).
#[derive(Clone, Debug)]
pub struct Config {
    pub(crate) data_dir: PathBuf,
    pub(crate) blacklist_bucket: String,
    pub(crate) whitelist_bucket: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            blacklist_bucket: DEFAULT_BLACKLIST_BUCKET.to_string(),
            whitelist_bucket: DEFAULT_WHITELIST_BUCKET.to_string(),
        }
    }
}

impl Config {
    #[must_use]
    pub fn builder() -> ConfigBuilder { ConfigBuilder::default() }

    #[must_use]
    pub fn data_dir(&self) -> &Path { &self.data_dir }

    #[must_use]
    pub fn blacklist_bucket(&self) -> &str { &self.blacklist_bucket }

    #[must_use]
    pub fn whitelist_bucket(&self) -> &str { &self.whitelist_bucket }
}

/// Builds a [`Config`], defaulting every field not explicitly set.
#[derive(Default)]
pub struct ConfigBuilder {
    inner: Config,
}

impl ConfigBuilder {
    #[must_use]
    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.inner.data_dir = dir.into();
        self
    }

    #[must_use]
    pub fn blacklist_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.inner.blacklist_bucket = bucket.into();
        self
    }

    #[must_use]
    pub fn whitelist_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.inner.whitelist_bucket = bucket.into();
        self
    }

    #[must_use]
    pub fn build(self) -> Config { self.inner }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let cfg = Config::default();
        assert_eq!(cfg.data_dir(), Path::new("nutsdata"));
        assert_eq!(cfg.blacklist_bucket(), "blacklist");
        assert_eq!(cfg.whitelist_bucket(), "whitelist");
    }

    #[test]
    fn builder_overrides_take_effect() {
        let cfg = Config::builder().data_dir("/tmp/custom").blacklist_bucket("bl").whitelist_bucket("wl").build();
        assert_eq!(cfg.data_dir(), Path::new("/tmp/custom"));
        assert_eq!(cfg.blacklist_bucket(), "bl");
        assert_eq!(cfg.whitelist_bucket(), "wl");
    }
}

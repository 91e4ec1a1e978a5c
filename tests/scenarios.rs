//! Black-box scenarios against the public API only (no internal
//! accessors), exercised via `find`/`check_consistency` rather than
//! inspecting the committed boundary sequence directly.

use boundaryset::{BoundarySet, Config, Error};

fn open() -> (tempfile::TempDir, BoundarySet) {
    let dir = tempfile::tempdir().unwrap();
    let set = BoundarySet::open(Config::builder().data_dir(dir.path()).build()).unwrap();
    (dir, set)
}

#[test]
fn scenario_7_stress_cut_below_and_above() {
    let (_dir, set) = open();
    set.insert("123.0.0.0 - 123.0.0.2", b"a").unwrap();
    set.insert("123.0.0.4 - 123.0.0.6", b"b").unwrap();
    set.insert("123.0.0.3", b"c").unwrap();
    set.insert("123.0.0.1 - 123.0.0.5", b"d").unwrap();

    assert_eq!(set.find("123.0.0.0").unwrap(), b"a");
    assert_eq!(set.find("123.0.0.1").unwrap(), b"d");
    assert_eq!(set.find("123.0.0.3").unwrap(), b"d");
    assert_eq!(set.find("123.0.0.5").unwrap(), b"d");
    assert_eq!(set.find("123.0.0.6").unwrap(), b"b");

    set.check_consistency(None).unwrap();
}

#[test]
fn insert_is_idempotent_in_tag() {
    let (_dir, set) = open();
    set.insert("10.0.0.0 - 10.0.0.20", b"t").unwrap();
    set.insert("10.0.0.0 - 10.0.0.20", b"t").unwrap();
    set.check_consistency(Some(("10.0.0.0", "10.0.0.20"))).unwrap();
    assert_eq!(set.find("10.0.0.10").unwrap(), b"t");
}

#[test]
fn remove_unknown_range_is_a_noop() {
    let (_dir, set) = open();
    set.insert("10.0.0.0 - 10.0.0.20", b"t").unwrap();
    set.remove("192.168.0.0 - 192.168.0.255").unwrap();
    assert_eq!(set.find("10.0.0.10").unwrap(), b"t");
}

#[test]
fn find_rejects_malformed_input() {
    let (_dir, set) = open();
    assert!(matches!(set.find("not-an-ip"), Err(Error::InvalidInput(_))));
}

#[test]
fn insert_rejects_reversed_cidr_prefix() {
    let (_dir, set) = open();
    assert!(matches!(set.insert("10.0.0.0/33", b"t"), Err(Error::InvalidInput(_))));
}

#[test]
fn insert_rejects_ipv6() {
    let (_dir, set) = open();
    assert!(matches!(set.insert("::1", b"t"), Err(Error::Ipv6NotSupported)));
}

#[test]
fn close_round_trip_preserves_data() {
    let dir = tempfile::tempdir().unwrap();
    let set = BoundarySet::open(Config::builder().data_dir(dir.path()).build()).unwrap();
    set.insert("10.0.0.0/24", b"t").unwrap();
    set.close().unwrap();

    let set = BoundarySet::open(Config::builder().data_dir(dir.path()).build()).unwrap();
    assert_eq!(set.find("10.0.0.1").unwrap(), b"t");
}

#[test]
fn flush_wipes_data_without_reinstalling_sentinels() {
    let (_dir, set) = open();
    set.insert("10.0.0.0/24", b"t").unwrap();
    set.flush().unwrap();
    assert!(matches!(set.find("10.0.0.1"), Err(Error::NotFound)));
    // the sentinels are gone too: a fresh insert has no ±∞ neighbours to
    // vicinity-query against until `reset` reinstalls them.
    assert!(matches!(set.insert("10.0.0.0/24", b"t"), Err(Error::Inconsistent(_))));
    set.reset().unwrap();
    set.insert("10.0.0.0/24", b"t").unwrap();
    assert_eq!(set.find("10.0.0.1").unwrap(), b"t");
}

#[test]
fn data_dir_reflects_configured_path() {
    let dir = tempfile::tempdir().unwrap();
    let set = BoundarySet::open(Config::builder().data_dir(dir.path()).build()).unwrap();
    assert_eq!(set.data_dir(), dir.path());
}

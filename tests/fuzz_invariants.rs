//! Property-based fuzzing: random insert/remove/find sequences over a
//! small IPv4 subspace, checked against a flat per-address reference
//! map (the simplest possible oracle for "what tag covers this
//! address") and against the consistency checker after every mutation.

use std::net::Ipv4Addr;

use boundaryset::{BoundarySet, Config, Error};
use proptest::prelude::*;

const SUBSPACE: u8 = 24; // addresses 10.0.0.0 .. 10.0.0.23
const TAGS: &[&[u8]] = &[b"a", b"b", b"c"];

fn addr(offset: u8) -> Ipv4Addr { Ipv4Addr::new(10, 0, 0, offset) }

#[derive(Clone, Debug)]
enum Op {
    Insert { lo: u8, hi: u8, tag: usize },
    Remove { lo: u8, hi: u8 },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    let bound = 0..SUBSPACE;
    prop_oneof![
        (bound.clone(), bound.clone(), 0..TAGS.len()).prop_map(|(a, b, tag)| {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            Op::Insert { lo, hi, tag }
        }),
        (bound.clone(), bound).prop_map(|(a, b)| {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            Op::Remove { lo, hi }
        }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn matches_flat_reference_map(ops in prop::collection::vec(op_strategy(), 0..40)) {
        let dir = tempfile::tempdir().unwrap();
        let set = BoundarySet::open(Config::builder().data_dir(dir.path()).build()).unwrap();
        let mut reference: [Option<usize>; SUBSPACE as usize] = [None; SUBSPACE as usize];

        for op in ops {
            match op {
                Op::Insert { lo, hi, tag } => {
                    let range = format!("{} - {}", addr(lo), addr(hi));
                    set.insert(&range, TAGS[tag]).unwrap();
                    for a in lo..=hi {
                        reference[a as usize] = Some(tag);
                    }
                }
                Op::Remove { lo, hi } => {
                    let range = format!("{} - {}", addr(lo), addr(hi));
                    set.remove(&range).unwrap();
                    for a in lo..=hi {
                        reference[a as usize] = None;
                    }
                }
            }

            set.check_consistency(None).unwrap();

            for a in 0..SUBSPACE {
                let got = set.find(&addr(a).to_string());
                match reference[a as usize] {
                    Some(tag) => prop_assert_eq!(got.unwrap(), TAGS[tag]),
                    None => prop_assert!(matches!(got, Err(Error::NotFound))),
                }
            }
        }
    }
}

//! The interval-set state machine: vicinity queries, insert/remove/find
//! expressed as boundary edits, and the consistency checker.
//!
//! Every function here reads through a [`Store`] reference and returns a
//! plan of [`Edit`]s (or, for `find`, a tag) without writing anything —
//! per `spec.md` §9's transactional-discipline note, all reads are staged
//! before any edit is computed, and the caller (`lib.rs`) is responsible
//! for committing the plan inside one `Store::commit` transaction.

use std::net::Ipv4Addr;

use crate::boundary::{Boundary, Endpoint, Kind};
use crate::error::{Error, Result};
use crate::store::{Edit, Store};

/// The three-way split around a candidate `[low, high]` range: boundaries
/// strictly below `low`, everything covered by `[low, high]`, and
/// boundaries strictly above `high`. `below`/`above` are capped at `n`
/// entries (nearest first in storage order, ascending score once
/// returned), `inside` is unbounded.
///
/// Because the ±∞ sentinels are always present, a healthy database never
/// returns an empty `below` or `above` — if it does, the database is
/// inconsistent and that's reported rather than silently tolerated.
pub fn vicinity(store: &Store, low: &Boundary, high: &Boundary, n: usize) -> Result<(Vec<Boundary>, Vec<Boundary>, Vec<Boundary>)> {
    let below = store.nearest_at_or_below(low.below(None).ip, n)?;
    let inside = store.range_inclusive(low.ip, high.ip)?;
    let above = store.nearest_at_or_above(high.above(None).ip, n)?;

    if below.is_empty() || above.is_empty() {
        return Err(Error::Inconsistent(format!(
            "vicinity of {low}-{high} found {} below, {} above (expected >= 1 each)",
            below.len(),
            above.len()
        )));
    }

    Ok((below, inside, above))
}

/// Plan the edits needed to insert `[low, high]` tagged with `low.tag`
/// (== `high.tag`; the caller guarantees this). See `spec.md` §4.3.2.
pub fn plan_insert(store: &Store, low: &Boundary, high: &Boundary) -> Result<Vec<Edit>> {
    let (below_n, inside, above_n) = vicinity(store, low, high, 1)?;
    let bn = below_n.last().expect("non-empty, checked by vicinity").clone();
    let an = above_n.first().expect("non-empty, checked by vicinity").clone();

    let mut edits: Vec<Edit> = inside.into_iter().map(Edit::Remove).collect();

    let b_cut = low.below(Some(&bn.tag));
    let a_cut = high.above(Some(&an.tag));

    let mut emit_low = true;
    let mut emit_high = true;

    if bn.kind.is_lower() {
        if !bn.equal_ip(&b_cut) {
            // room to close the prior interval before our left edge
            if !bn.equal_tag(low) {
                edits.push(Edit::Insert(b_cut));
            } else {
                emit_low = false; // same tag: extend, keep bn as the left edge
            }
        } else {
            // bn sits exactly one address left of low: no room to cut
            if !bn.equal_tag(low) {
                edits.push(Edit::Insert(bn.with_kind(Kind::Double)));
            } else {
                emit_low = false;
            }
        }
    } else if bn.kind.is_double() && bn.equal_ip(&b_cut) && bn.equal_tag(low) {
        // abutting singleton with the same tag is absorbed as our left edge
        edits.push(Edit::Insert(bn.with_kind(Kind::Lower)));
        emit_low = false;
    }

    if an.kind.is_upper() {
        if !an.equal_ip(&a_cut) {
            if !an.equal_tag(high) {
                edits.push(Edit::Insert(a_cut));
            } else {
                emit_high = false;
            }
        } else {
            if !an.equal_tag(high) {
                edits.push(Edit::Insert(an.with_kind(Kind::Double)));
            } else {
                emit_high = false;
            }
        }
    } else if an.kind.is_double() && an.equal_ip(&a_cut) && an.equal_tag(high) {
        edits.push(Edit::Insert(an.with_kind(Kind::Upper)));
        emit_high = false;
    }

    match (emit_low, emit_high) {
        (true, true) if low.equal_ip(high) => edits.push(Edit::Insert(low.with_kind(Kind::Double))),
        (true, true) => {
            edits.push(Edit::Insert(low.clone()));
            edits.push(Edit::Insert(high.clone()));
        }
        (true, false) => edits.push(Edit::Insert(low.clone())),
        (false, true) => edits.push(Edit::Insert(high.clone())),
        (false, false) => {}
    }

    Ok(edits)
}

/// Plan the edits needed to remove `[low, high]`. Tag is irrelevant for
/// removal. See `spec.md` §4.3.3.
pub fn plan_remove(store: &Store, low: &Boundary, high: &Boundary) -> Result<Vec<Edit>> {
    let (below_n, inside, above_n) = vicinity(store, low, high, 1)?;
    let bn = below_n.last().expect("non-empty, checked by vicinity").clone();
    let an = above_n.first().expect("non-empty, checked by vicinity").clone();

    let mut edits: Vec<Edit> = inside.into_iter().map(Edit::Remove).collect();

    if !(bn.kind.is_upper() || bn.kind.is_double()) {
        // bn.kind == Lower: we were inside a larger tagged interval on the left
        let b_cut = low.below(Some(&bn.tag));
        if bn.equal_ip(&b_cut) {
            edits.push(Edit::Update(bn.with_kind(Kind::Double)));
        } else {
            edits.push(Edit::Insert(b_cut));
        }
    }

    if !(an.kind.is_lower() || an.kind.is_double()) {
        // an.kind == Upper
        let a_cut = high.above(Some(&an.tag));
        if an.equal_ip(&a_cut) {
            edits.push(Edit::Update(an.with_kind(Kind::Double)));
        } else {
            edits.push(Edit::Insert(a_cut));
        }
    }

    Ok(edits)
}

/// Look up the tag covering `addr`, if any. See `spec.md` §4.3.4.
pub fn find(store: &Store, addr: Ipv4Addr) -> Result<Vec<u8>> {
    let probe = Boundary::new(Endpoint::Addr(addr), Kind::Double, Vec::new());
    let (below, inside, above) = vicinity(store, &probe, &probe, 1)?;

    if inside.len() == 1 {
        return Ok(inside[0].tag.clone());
    }

    let bn = below.last().expect("non-empty, checked by vicinity");
    let an = above.first().expect("non-empty, checked by vicinity");

    if bn.kind.is_lower() && an.kind.is_upper() {
        if bn.tag == an.tag {
            return Ok(bn.tag.clone());
        }
        return Err(Error::Inconsistent(format!("tag mismatch straddling {addr}: {:?} != {:?}", bn.tag, an.tag)));
    }

    Err(Error::NotFound)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum AutomatonState {
    ExpectLower,
    ExpectUpper,
}

/// Walk every stored boundary in score order and verify the `L (U L)* U`
/// alternation from `spec.md` §3, plus (when `last` is given) that the
/// most recently inserted range actually left a lower-edge boundary at
/// its low address and an upper-edge boundary at its high address. See
/// `spec.md` §4.3.5.
pub fn check_consistency(store: &Store, last: Option<(&Boundary, &Boundary)>) -> Result<()> {
    let all = store.all()?;

    if let Some((low, high)) = last {
        let found_low = all.iter().any(|b| b.equal_ip(low) && (b.kind.is_lower() || b.kind.is_double()));
        let found_high = all.iter().any(|b| b.equal_ip(high) && (b.kind.is_upper() || b.kind.is_double()));
        match (found_low, found_high) {
            (true, true) => {}
            (false, false) => return Err(Error::Inconsistent(format!("found neither LOWER at {low} nor UPPER at {high}"))),
            (false, true) => return Err(Error::Inconsistent(format!("did not find LOWER boundary at {low}"))),
            (true, false) => return Err(Error::Inconsistent(format!("did not find UPPER boundary at {high}"))),
        }
    }

    let mut state = AutomatonState::ExpectUpper;
    for (idx, b) in all.iter().enumerate() {
        match b.kind {
            Kind::Lower => {
                if state != AutomatonState::ExpectLower {
                    return Err(Error::Inconsistent(format!("idx={idx} {b}: unexpected LOWER while ExpectUpper")));
                }
                state = AutomatonState::ExpectUpper;
            }
            Kind::Double => {
                if state != AutomatonState::ExpectLower {
                    return Err(Error::Inconsistent(format!("idx={idx} {b}: unexpected DOUBLE while ExpectUpper")));
                }
                // consumed as U then L: net state unchanged
            }
            Kind::Upper => {
                if state != AutomatonState::ExpectUpper {
                    return Err(Error::Inconsistent(format!("idx={idx} {b}: unexpected UPPER while ExpectLower")));
                }
                if idx > 0 && all[idx - 1].tag != b.tag {
                    return Err(Error::Inconsistent(format!(
                        "idx={idx} {b}: tag {:?} does not match preceding boundary's tag {:?}",
                        b.tag,
                        all[idx - 1].tag
                    )));
                }
                state = AutomatonState::ExpectLower;
            }
        }
    }

    if state != AutomatonState::ExpectUpper {
        return Err(Error::Inconsistent("final boundary is not an UPPER/+inf sentinel".into()));
    }

    Ok(())
}

//! Abstract memory store
//!
//! A `MemStore` maps `(region, offset)` to the value set last written
//! there. Absence means unknown: reads of unmaterialized addresses return
//! top, and top-valued entries are never stored. The nested maps are
//! persistent, so merged stores share structure and equality can short
//! circuit on pointers before comparing contents.
//!
//! Reads reassemble narrower entries little-endian: the entry at the
//! lowest address supplies the low-order bits.

use core::fmt;

use im::OrdMap;
use num_bigint::BigInt;

use crate::valueset::region::Region;
use crate::valueset::value_set::ValueSet;

/// Abstract store from `(region, offset)` to value sets.
///
/// Stored widths are positive multiples of 8; offsets are byte addresses
/// within their region.
#[derive(Debug, Clone, Default)]
pub struct MemStore {
    regions: OrdMap<Region, OrdMap<BigInt, ValueSet>>,
}

impl MemStore {
    /// The fully unknown store: every address reads as top.
    pub fn new() -> Self {
        Self {
            regions: OrdMap::new(),
        }
    }

    /// Whether nothing is known (no materialized entries).
    pub fn is_top(&self) -> bool {
        self.regions.is_empty()
    }

    /// Number of materialized entries across all regions.
    pub fn len(&self) -> usize {
        self.regions.values().map(|m| m.len()).sum()
    }

    /// Whether the store has no materialized entries.
    pub fn is_empty(&self) -> bool {
        self.is_top()
    }

    /// The entry at a concrete address, if materialized.
    pub fn entry(&self, region: &Region, offset: &BigInt) -> Option<&ValueSet> {
        self.regions.get(region)?.get(offset)
    }

    /// Read `k` bits through an address value set.
    ///
    /// Enumeration of concrete addresses is bounded by `mem_max`; an
    /// address set with more points, or the universal top, reads as top
    /// without being enumerated.
    pub fn read(&self, k: u32, addr: &ValueSet, mem_max: Option<usize>) -> ValueSet {
        debug_assert!(k > 0 && k % 8 == 0, "read width {} not a byte multiple", k);
        if addr.is_empty() {
            return ValueSet::empty(k);
        }
        let bound = mem_max.unwrap_or(usize::MAX);
        let points = match addr.concrete_points(bound) {
            Some(points) => points,
            None => return ValueSet::top(k),
        };
        let mut acc = ValueSet::empty(k);
        for (region, offset) in points {
            acc = acc.union(&self.read_concrete(&region, &offset, k));
            if acc.is_top() {
                return ValueSet::top(k);
            }
        }
        acc
    }

    /// Read `k` bits at one concrete address, reassembling narrower
    /// entries little-endian.
    fn read_concrete(&self, region: &Region, offset: &BigInt, k: u32) -> ValueSet {
        let entry = match self.entry(region, offset) {
            Some(entry) => entry,
            None => return ValueSet::top(k),
        };
        let w = entry.width();
        if w == k {
            return entry.clone();
        }
        if w > k {
            // Extraction out of a wider entry is not modeled.
            return ValueSet::top(k);
        }
        let rest = self.read_concrete(region, &(offset + BigInt::from(w / 8)), k - w);
        if rest.is_top() {
            return ValueSet::top(k);
        }
        // The higher address holds the high-order bits.
        rest.concat(entry)
    }

    /// Write a `k`-bit value through an address value set.
    ///
    /// A unique concrete address gets a strong update; multiple candidate
    /// addresses get weak updates (union with the old value), collapsing
    /// to the unknown store when more than `mem_max` addresses would be
    /// touched.
    pub fn write(&self, k: u32, addr: &ValueSet, value: &ValueSet, mem_max: Option<usize>) -> Self {
        debug_assert!(k > 0 && k % 8 == 0, "write width {} not a byte multiple", k);
        debug_assert_eq!(value.width(), k, "written value has the wrong width");
        if addr.is_top() {
            if value.is_top() || mem_max.is_some() {
                // Anything, anywhere: nothing survives.
                return Self::new();
            }
            let mut out = self.clone();
            let points: Vec<(Region, BigInt)> = self
                .regions
                .iter()
                .flat_map(|(r, inner)| inner.keys().map(move |i| (*r, i.clone())))
                .collect();
            for (region, offset) in points {
                out = out.weak_at(&region, &offset, k, value);
            }
            return out;
        }
        if let Some((region, si)) = addr.as_singleton_region() {
            if si.is_top() {
                // Somewhere in one region: all its entries are stale.
                let mut out = self.clone();
                out.regions.remove(region);
                return out;
            }
            if let Some(offset) = si.as_singleton() {
                return self.strong_at(region, offset, value);
            }
        }
        let bound = mem_max.unwrap_or(usize::MAX);
        let points = match addr.concrete_points(bound) {
            Some(points) => points,
            None => return Self::new(),
        };
        let mut out = self.clone();
        for (region, offset) in &points {
            out = out.weak_at(region, offset, k, value);
        }
        for (region, _) in &points {
            out = out.widen_region(region, mem_max);
        }
        out
    }

    /// Narrow the entry at a unique concrete address by intersection.
    ///
    /// Only a singleton point address can be refined without risking
    /// unsoundness; any other address shape returns the store unchanged.
    pub fn write_intersection(&self, k: u32, addr: &ValueSet, value: &ValueSet) -> Self {
        let (region, si) = match addr.as_singleton_region() {
            Some(pair) => pair,
            None => return self.clone(),
        };
        let offset = match si.as_singleton() {
            Some(offset) => offset,
            None => return self.clone(),
        };
        let old = match self.entry(region, offset) {
            Some(old) if old.width() != k => return self.clone(),
            Some(old) => old.clone(),
            None => ValueSet::top(k),
        };
        let narrowed = old.intersect(value);
        if narrowed == old {
            return self.clone();
        }
        if narrowed.is_top() {
            return self.clone();
        }
        let mut out = self.clone();
        let mut inner = out.regions.get(region).cloned().unwrap_or_default();
        inner.insert(offset.clone(), narrowed);
        out.regions.insert(*region, inner);
        out
    }

    /// Strong update at one concrete address.
    fn strong_at(&self, region: &Region, offset: &BigInt, value: &ValueSet) -> Self {
        let existing = self.entry(region, offset);
        if value.is_top() {
            // Top is represented by absence.
            if existing.is_none() {
                return self.clone();
            }
            let mut out = self.clone();
            let mut inner = out.regions.get(region).cloned().unwrap_or_default();
            inner.remove(offset);
            if inner.is_empty() {
                out.regions.remove(region);
            } else {
                out.regions.insert(*region, inner);
            }
            return out;
        }
        if existing == Some(value) {
            // Rewriting an equal value would only break sharing.
            return self.clone();
        }
        let mut out = self.clone();
        let mut inner = out.regions.get(region).cloned().unwrap_or_default();
        inner.insert(offset.clone(), value.clone());
        out.regions.insert(*region, inner);
        out
    }

    /// Weak update at one concrete address: union with the old value.
    ///
    /// An absent entry is already top and stays absent; a width mismatch
    /// drops the entry.
    fn weak_at(&self, region: &Region, offset: &BigInt, k: u32, value: &ValueSet) -> Self {
        let old = match self.entry(region, offset) {
            Some(old) => old,
            None => return self.clone(),
        };
        if old.width() != k {
            return self.drop_entry(region, offset);
        }
        let merged = old.union(value);
        if merged.is_top() {
            return self.drop_entry(region, offset);
        }
        if &merged == old {
            return self.clone();
        }
        let mut out = self.clone();
        let mut inner = out.regions.get(region).cloned().unwrap_or_default();
        inner.insert(offset.clone(), merged);
        out.regions.insert(*region, inner);
        out
    }

    fn drop_entry(&self, region: &Region, offset: &BigInt) -> Self {
        let mut out = self.clone();
        if let Some(inner) = out.regions.get(region) {
            let mut inner = inner.clone();
            inner.remove(offset);
            if inner.is_empty() {
                out.regions.remove(region);
            } else {
                out.regions.insert(*region, inner);
            }
        }
        out
    }

    /// Collapse a region that has grown past the entry cap.
    pub fn widen_region(&self, region: &Region, mem_max: Option<usize>) -> Self {
        let max = match mem_max {
            Some(max) => max,
            None => return self.clone(),
        };
        match self.regions.get(region) {
            Some(inner) if inner.len() > max => {
                let mut out = self.clone();
                out.regions.remove(region);
                out
            }
            _ => self.clone(),
        }
    }

    /// Exclusive merge at control-flow joins.
    ///
    /// An address materialized on only one side is dropped: its other-side
    /// value is top, and top union anything is top, which is represented
    /// by absence. Same-address entries merge by value-set union; a width
    /// mismatch across the join drops the entry.
    pub fn union(&self, other: &Self) -> Self {
        if self.regions.ptr_eq(&other.regions) {
            return self.clone();
        }
        let mut out = OrdMap::new();
        for (region, a_inner) in self.regions.iter() {
            let b_inner = match other.regions.get(region) {
                Some(b_inner) => b_inner,
                None => continue,
            };
            if a_inner.ptr_eq(b_inner) {
                out.insert(*region, a_inner.clone());
                continue;
            }
            let mut merged = OrdMap::new();
            for (offset, a_val) in a_inner.iter() {
                let b_val = match b_inner.get(offset) {
                    Some(b_val) => b_val,
                    None => continue,
                };
                if a_val.width() != b_val.width() {
                    continue;
                }
                let joined = a_val.union(b_val);
                if !joined.is_top() {
                    merged.insert(offset.clone(), joined);
                }
            }
            if !merged.is_empty() {
                out.insert(*region, merged);
            }
        }
        Self { regions: out }
    }

    /// Inclusive merge keeping one-sided entries; same-address entries
    /// merge by value-set intersection.
    pub fn intersection(&self, other: &Self) -> Self {
        if self.regions.ptr_eq(&other.regions) {
            return self.clone();
        }
        self.inclusive_merge(other, |a, b| {
            let narrowed = a.intersect(b);
            if narrowed.is_top() {
                None
            } else {
                Some(narrowed)
            }
        })
    }

    /// Inclusive merge keeping one-sided entries; same-address entries
    /// merge by value-set widening.
    pub fn widen(&self, other: &Self) -> Self {
        if self.regions.ptr_eq(&other.regions) {
            return self.clone();
        }
        self.inclusive_merge(other, |a, b| {
            let widened = a.widen(b);
            if widened.is_top() {
                None
            } else {
                Some(widened)
            }
        })
    }

    fn inclusive_merge(
        &self,
        other: &Self,
        combine: impl Fn(&ValueSet, &ValueSet) -> Option<ValueSet>,
    ) -> Self {
        let mut out = self.regions.clone();
        for (region, b_inner) in other.regions.iter() {
            let merged = match self.regions.get(region) {
                None => b_inner.clone(),
                Some(a_inner) if a_inner.ptr_eq(b_inner) => a_inner.clone(),
                Some(a_inner) => {
                    let mut merged = a_inner.clone();
                    for (offset, b_val) in b_inner.iter() {
                        match a_inner.get(offset) {
                            None => {
                                merged.insert(offset.clone(), b_val.clone());
                            }
                            Some(a_val) if a_val.width() != b_val.width() => {
                                merged.remove(offset);
                            }
                            Some(a_val) => match combine(a_val, b_val) {
                                Some(joined) => {
                                    merged.insert(offset.clone(), joined);
                                }
                                None => {
                                    merged.remove(offset);
                                }
                            },
                        }
                    }
                    merged
                }
            };
            if merged.is_empty() {
                out.remove(region);
            } else {
                out.insert(*region, merged);
            }
        }
        Self { regions: out }
    }

    /// Whether every address of `self` reads at least as precisely as in
    /// `other` (pointwise value-set inclusion, absence meaning top).
    pub fn subset_of(&self, other: &Self) -> bool {
        if self.regions.ptr_eq(&other.regions) {
            return true;
        }
        other.regions.iter().all(|(region, o_inner)| {
            o_inner.iter().all(|(offset, o_val)| {
                self.entry(region, offset)
                    .is_some_and(|s_val| s_val.subset_of(o_val))
            })
        })
    }

    /// Fold over every materialized entry in region-then-offset order.
    pub fn fold<B>(&self, init: B, mut f: impl FnMut(B, &Region, &BigInt, &ValueSet) -> B) -> B {
        let mut acc = init;
        for (region, inner) in self.regions.iter() {
            for (offset, value) in inner.iter() {
                acc = f(acc, region, offset, value);
            }
        }
        acc
    }

    /// Structural equality with a sharing fast path.
    pub fn equal(&self, other: &Self) -> bool {
        self == other
    }
}

impl PartialEq for MemStore {
    fn eq(&self, other: &Self) -> bool {
        if self.regions.ptr_eq(&other.regions) {
            return true;
        }
        if self.regions.len() != other.regions.len() {
            return false;
        }
        self.regions.iter().all(|(region, a_inner)| {
            other
                .regions
                .get(region)
                .is_some_and(|b_inner| a_inner.ptr_eq(b_inner) || a_inner == b_inner)
        })
    }
}

impl Eq for MemStore {}

impl fmt::Display for MemStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_top() {
            return write!(f, "mem(top)");
        }
        writeln!(f, "mem {{")?;
        for (region, inner) in self.regions.iter() {
            for (offset, value) in inner.iter() {
                writeln!(f, "  {}[{}] = {}", region, offset, value)?;
            }
        }
        write!(f, "}}")
    }
}

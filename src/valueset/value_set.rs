//! Region-tagged value sets
//!
//! A value set maps memory regions to strided intervals of offsets, all at
//! one bit width. A value with only a `Global` entry is a plain number; an
//! entry under any other region is an offset from that region's unknown
//! base. The region-universal top is kept as a distinguished case so it
//! never has to be enumerated.

use core::fmt;

use im::OrdMap;
use num_bigint::BigInt;
use num_traits::ToPrimitive;

use crate::ssa::expr::{BinOp, CastKind, UnOp};
use crate::valueset::interval::StridedInterval;
use crate::valueset::region::Region;

/// A set of region-tagged `width`-bit values.
#[derive(Debug, Clone)]
pub struct ValueSet {
    width: u32,
    repr: Repr,
}

#[derive(Debug, Clone)]
enum Repr {
    /// Any value in any region.
    Top,
    /// Per-region offset intervals; absent regions contribute nothing.
    Map(OrdMap<Region, StridedInterval>),
}

impl ValueSet {
    /// The region-universal top at a width.
    pub fn top(width: u32) -> Self {
        Self {
            width,
            repr: Repr::Top,
        }
    }

    /// The empty value set at a width.
    pub fn empty(width: u32) -> Self {
        Self {
            width,
            repr: Repr::Map(OrdMap::new()),
        }
    }

    /// A concrete number in the global region.
    pub fn of_int(value: impl Into<BigInt>, width: u32) -> Self {
        Self::of_si(Region::Global, StridedInterval::of_int(value, width))
    }

    /// An interval of offsets within one region.
    pub fn of_si(region: Region, si: StridedInterval) -> Self {
        let width = si.width();
        if si.is_empty() {
            return Self::empty(width);
        }
        Self {
            width,
            repr: Repr::Map(OrdMap::unit(region, si)),
        }
    }

    /// Bit width of every member.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Whether this is the region-universal top.
    pub fn is_top(&self) -> bool {
        matches!(self.repr, Repr::Top)
    }

    /// Whether no value is represented.
    pub fn is_empty(&self) -> bool {
        match &self.repr {
            Repr::Top => false,
            Repr::Map(m) => m.is_empty(),
        }
    }

    /// The per-region map, unless this is top.
    pub fn as_map(&self) -> Option<&OrdMap<Region, StridedInterval>> {
        match &self.repr {
            Repr::Top => None,
            Repr::Map(m) => Some(m),
        }
    }

    /// The single `(region, interval)` pair, if there is exactly one.
    pub fn as_singleton_region(&self) -> Option<(&Region, &StridedInterval)> {
        let m = self.as_map()?;
        if m.len() == 1 {
            m.iter().next()
        } else {
            None
        }
    }

    /// The global interval, if the set lives entirely in the global region.
    pub fn global_only(&self) -> Option<&StridedInterval> {
        match self.as_singleton_region()? {
            (Region::Global, si) => Some(si),
            _ => None,
        }
    }

    /// The concrete number, if the set is a single global constant.
    pub fn as_const(&self) -> Option<&BigInt> {
        self.global_only()?.as_singleton()
    }

    /// The interval of offsets within one region.
    pub fn interval_of(&self, region: &Region) -> Option<&StridedInterval> {
        self.as_map()?.get(region)
    }

    /// Structural equality with a sharing fast path.
    pub fn equal(&self, other: &Self) -> bool {
        self == other
    }

    /// Set union; commutative.
    pub fn union(&self, other: &Self) -> Self {
        if self.width != other.width {
            return Self::top(self.width);
        }
        match (&self.repr, &other.repr) {
            (Repr::Top, _) | (_, Repr::Top) => Self::top(self.width),
            (Repr::Map(a), Repr::Map(b)) => {
                if a.ptr_eq(b) {
                    return self.clone();
                }
                let merged = a.clone().union_with(b.clone(), |x, y| x.union(&y));
                Self {
                    width: self.width,
                    repr: Repr::Map(merged),
                }
            }
        }
    }

    /// Narrow `self` by the constraint `other`.
    ///
    /// Regions of `self` that `other` also constrains are intersected;
    /// regions `other` says nothing about are kept as-is; regions only in
    /// `other` are dropped. This is the sound reading when the left
    /// operand is an observed value and the right a derived constraint,
    /// which is the only way refinement uses it.
    pub fn intersect(&self, other: &Self) -> Self {
        if self.width != other.width {
            return self.clone();
        }
        match (&self.repr, &other.repr) {
            (Repr::Top, _) => other.clone(),
            (_, Repr::Top) => self.clone(),
            (Repr::Map(a), Repr::Map(b)) => {
                if a.ptr_eq(b) {
                    return self.clone();
                }
                let mut out = OrdMap::new();
                for (region, si) in a.iter() {
                    match b.get(region) {
                        Some(other_si) => {
                            let narrowed = si.intersect(other_si);
                            if !narrowed.is_empty() {
                                out.insert(*region, narrowed);
                            }
                        }
                        None => {
                            out.insert(*region, si.clone());
                        }
                    }
                }
                Self {
                    width: self.width,
                    repr: Repr::Map(out),
                }
            }
        }
    }

    /// Widen `self` toward a fixpoint given the newer `other`.
    pub fn widen(&self, other: &Self) -> Self {
        if self.width != other.width {
            return Self::top(self.width);
        }
        match (&self.repr, &other.repr) {
            (Repr::Top, _) | (_, Repr::Top) => Self::top(self.width),
            (Repr::Map(a), Repr::Map(b)) => {
                if a.ptr_eq(b) {
                    return self.clone();
                }
                let merged = a.clone().union_with(b.clone(), |x, y| x.widen(&y));
                Self {
                    width: self.width,
                    repr: Repr::Map(merged),
                }
            }
        }
    }

    /// Whether every value of `self` is a value of `other`.
    pub fn subset_of(&self, other: &Self) -> bool {
        if self.width != other.width {
            return false;
        }
        match (&self.repr, &other.repr) {
            (_, Repr::Top) => true,
            (Repr::Top, Repr::Map(_)) => false,
            (Repr::Map(a), Repr::Map(b)) => {
                if a.ptr_eq(b) {
                    return true;
                }
                a.iter().all(|(region, si)| {
                    b.get(region).is_some_and(|other_si| si.subset_of(other_si))
                })
            }
        }
    }

    /// Apply a binary operator, following the region discipline: adding or
    /// subtracting a global constant moves offsets within their regions;
    /// subtracting two offsets of one region yields a global distance;
    /// every cross-region combination loses to top.
    pub fn binop(&self, op: BinOp, other: &Self) -> Self {
        if op.is_comparison() {
            return self.compare(op, other);
        }
        let w = self.width;
        if self.width != other.width {
            return Self::top(w);
        }
        if self.is_empty() || other.is_empty() {
            return Self::empty(w);
        }
        match op {
            BinOp::Add => {
                if let Some(k) = other.global_only() {
                    return self.map_offsets(|si| si.binop(BinOp::Add, k));
                }
                if let Some(k) = self.global_only() {
                    return other.map_offsets(|si| k.binop(BinOp::Add, si));
                }
                Self::top(w)
            }
            BinOp::Sub => {
                if let Some(k) = other.global_only() {
                    return self.map_offsets(|si| si.binop(BinOp::Sub, k));
                }
                if let (Some((ra, sa)), Some((rb, sb))) =
                    (self.as_singleton_region(), other.as_singleton_region())
                {
                    if ra == rb {
                        // Distance between two offsets of one base.
                        return Self::of_si(Region::Global, sa.binop(BinOp::Sub, sb));
                    }
                }
                Self::top(w)
            }
            _ => match (self.global_only(), other.global_only()) {
                (Some(a), Some(b)) => Self::of_si(Region::Global, a.binop(op, b)),
                _ => Self::top(w),
            },
        }
    }

    fn compare(&self, op: BinOp, other: &Self) -> Self {
        if let (Some(a), Some(b)) = (self.global_only(), other.global_only()) {
            return Self::of_si(Region::Global, a.binop(op, b));
        }
        // Offsets of one shared base are comparable even when the base is
        // unknown.
        if let (Some((ra, sa)), Some((rb, sb))) =
            (self.as_singleton_region(), other.as_singleton_region())
        {
            if ra == rb {
                return Self::of_si(Region::Global, sa.binop(op, sb));
            }
        }
        Self::of_si(Region::Global, StridedInterval::new(1, 1, 0, 1))
    }

    /// Apply a unary operator.
    pub fn unop(&self, op: UnOp) -> Self {
        match self.global_only() {
            Some(si) => Self::of_si(Region::Global, si.unop(op)),
            None => {
                if self.is_empty() {
                    self.clone()
                } else {
                    Self::top(self.width)
                }
            }
        }
    }

    /// Apply a width cast to every region's offsets.
    pub fn cast(&self, kind: CastKind, target: u32) -> Self {
        match &self.repr {
            Repr::Top => Self::top(target),
            Repr::Map(m) => {
                let mut out = OrdMap::new();
                for (region, si) in m.iter() {
                    out.insert(*region, si.cast(kind, target));
                }
                Self {
                    width: target,
                    repr: Repr::Map(out),
                }
            }
        }
    }

    /// Concatenate, with `self` forming the high-order bits.
    pub fn concat(&self, low: &Self) -> Self {
        let w = self.width + low.width;
        match (self.global_only(), low.global_only()) {
            (Some(a), Some(b)) => Self::of_si(Region::Global, a.concat(b)),
            _ => {
                if self.is_empty() || low.is_empty() {
                    Self::empty(w)
                } else {
                    Self::top(w)
                }
            }
        }
    }

    /// Relax every region's upper bound.
    pub fn remove_upper_bound(&self) -> Self {
        self.map_offsets_or_top(StridedInterval::remove_upper_bound)
    }

    /// Relax every region's lower bound.
    pub fn remove_lower_bound(&self) -> Self {
        self.map_offsets_or_top(StridedInterval::remove_lower_bound)
    }

    /// Every concrete `(region, offset)` point, unless more than `limit`.
    pub fn concrete_points(&self, limit: usize) -> Option<Vec<(Region, BigInt)>> {
        let m = self.as_map()?;
        let mut total = 0usize;
        for (_, si) in m.iter() {
            let n = si.cardinality();
            if n > BigInt::from(limit) {
                return None;
            }
            total = total.checked_add(n.to_usize()?)?;
            if total > limit {
                return None;
            }
        }
        let mut out = Vec::with_capacity(total);
        for (region, si) in m.iter() {
            for v in si.concrete_values(limit)? {
                out.push((*region, v));
            }
        }
        Some(out)
    }

    /// Transform each region's interval, dropping emptied regions.
    fn map_offsets(&self, f: impl Fn(&StridedInterval) -> StridedInterval) -> Self {
        match &self.repr {
            Repr::Top => Self::top(self.width),
            Repr::Map(m) => {
                let mut out = OrdMap::new();
                for (region, si) in m.iter() {
                    let mapped = f(si);
                    if !mapped.is_empty() {
                        out.insert(*region, mapped);
                    }
                }
                Self {
                    width: self.width,
                    repr: Repr::Map(out),
                }
            }
        }
    }

    fn map_offsets_or_top(&self, f: impl Fn(&StridedInterval) -> StridedInterval) -> Self {
        match &self.repr {
            Repr::Top => Self::top(self.width),
            Repr::Map(_) => self.map_offsets(f),
        }
    }
}

impl PartialEq for ValueSet {
    fn eq(&self, other: &Self) -> bool {
        if self.width != other.width {
            return false;
        }
        match (&self.repr, &other.repr) {
            (Repr::Top, Repr::Top) => true,
            (Repr::Map(a), Repr::Map(b)) => a.ptr_eq(b) || a == b,
            _ => false,
        }
    }
}

impl Eq for ValueSet {}

impl fmt::Display for ValueSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.repr {
            Repr::Top => write!(f, "top:{}", self.width),
            Repr::Map(m) if m.is_empty() => write!(f, "empty:{}", self.width),
            Repr::Map(m) => {
                write!(f, "{{")?;
                for (i, (region, si)) in m.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", region, si)?;
                }
                write!(f, "}}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_const_round_trip() {
        let v = ValueSet::of_int(5, 32);
        assert_eq!(v.as_const(), Some(&BigInt::from(5)));
    }

    #[test]
    fn test_add_const_moves_offsets() {
        let sp = ValueSet::of_si(Region::Local(1), StridedInterval::of_int(0, 32));
        let four = ValueSet::of_int(4, 32);
        let moved = sp.binop(BinOp::Add, &four);
        let (region, si) = moved.as_singleton_region().unwrap();
        assert_eq!(*region, Region::Local(1));
        assert_eq!(si.as_singleton(), Some(&BigInt::from(4)));
    }

    #[test]
    fn test_sub_same_region_is_global() {
        let a = ValueSet::of_si(Region::Local(1), StridedInterval::of_int(8, 32));
        let b = ValueSet::of_si(Region::Local(1), StridedInterval::of_int(3, 32));
        let d = a.binop(BinOp::Sub, &b);
        assert_eq!(d.as_const(), Some(&BigInt::from(5)));
    }

    #[test]
    fn test_cross_region_add_is_top() {
        let a = ValueSet::of_si(Region::Local(1), StridedInterval::of_int(0, 32));
        let b = ValueSet::of_si(Region::Local(2), StridedInterval::of_int(0, 32));
        assert!(a.binop(BinOp::Add, &b).is_top());
    }

    #[test]
    fn test_union_commutes() {
        let a = ValueSet::of_int(1, 32);
        let b = ValueSet::of_si(Region::Local(3), StridedInterval::new(32, 4, 0, 16));
        assert_eq!(a.union(&b), b.union(&a));
    }

    #[test]
    fn test_union_merges_strides() {
        let a = ValueSet::of_int(1, 32);
        let b = ValueSet::of_int(5, 32);
        let u = a.union(&b);
        let si = u.global_only().unwrap();
        assert_eq!(si.stride(), &BigInt::from(4));
        assert_eq!(si.lo(), &BigInt::from(1));
        assert_eq!(si.hi(), &BigInt::from(5));
    }

    #[test]
    fn test_intersect_keeps_unconstrained_regions() {
        let value = ValueSet::of_si(Region::Local(1), StridedInterval::of_int(0, 32));
        let constraint = ValueSet::of_si(Region::Global, StridedInterval::beloweq(9, 32));
        assert_eq!(value.intersect(&constraint), value);
    }

    #[test]
    fn test_intersect_narrows_shared_region() {
        let value = ValueSet::of_si(Region::Global, StridedInterval::new(32, 1, 0, 100));
        let constraint = ValueSet::of_si(Region::Global, StridedInterval::beloweq(9, 32));
        let narrowed = value.intersect(&constraint);
        assert_eq!(narrowed.global_only().unwrap().hi(), &BigInt::from(9));
    }

    #[test]
    fn test_top_absorbs_intersect() {
        let v = ValueSet::of_int(3, 32);
        assert_eq!(ValueSet::top(32).intersect(&v), v);
        assert_eq!(v.intersect(&ValueSet::top(32)), v);
    }

    #[test]
    fn test_concrete_points_spans_regions() {
        let v = ValueSet::of_si(Region::Global, StridedInterval::new(32, 2, 0, 4)).union(
            &ValueSet::of_si(Region::Local(1), StridedInterval::of_int(8, 32)),
        );
        let pts = v.concrete_points(16).unwrap();
        assert_eq!(pts.len(), 4);
        assert!(ValueSet::top(32).concrete_points(16).is_none());
    }

    #[test]
    fn test_subset_of_top() {
        let v = ValueSet::of_int(3, 32);
        assert!(v.subset_of(&ValueSet::top(32)));
        assert!(!ValueSet::top(32).subset_of(&v));
    }
}

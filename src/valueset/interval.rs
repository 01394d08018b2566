//! Strided intervals
//!
//! A strided interval `s[lo, hi]` at width `w` denotes the arithmetic
//! progression `{lo, lo + s, ..., hi}` of `w`-bit machine integers. Values
//! are kept in a canonical signed window `[-2^(w-1), 2^(w-1) - 1]`
//! (width 1 is the boolean window `[0, 1]`); operations that could wrap
//! past the window degrade to `top` rather than model wraparound.
//!
//! Bounds are arbitrary-precision integers, so no operation here can
//! overflow the host representation; gcd/lcm arithmetic keeps strides
//! exact through unions and intersections.

use core::fmt;

use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{One, Signed, ToPrimitive, Zero};

use crate::ssa::expr::{BinOp, CastKind, UnOp};

/// A strided interval of `width`-bit integers.
///
/// Invariants: `lo <= hi` with `(hi - lo)` divisible by `stride`, and
/// `stride == 0` exactly for singletons. The empty interval is the one
/// value with `lo > hi`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StridedInterval {
    width: u32,
    stride: BigInt,
    lo: BigInt,
    hi: BigInt,
}

/// Smallest representable value at a width.
fn window_min(width: u32) -> BigInt {
    if width <= 1 {
        BigInt::zero()
    } else {
        -(BigInt::one() << (width - 1) as usize)
    }
}

/// Largest representable value at a width.
fn window_max(width: u32) -> BigInt {
    if width == 0 {
        BigInt::zero()
    } else if width == 1 {
        BigInt::one()
    } else {
        (BigInt::one() << (width - 1) as usize) - 1
    }
}

/// `2^width`.
fn modulus(width: u32) -> BigInt {
    BigInt::one() << width as usize
}

/// Wrap an integer into the canonical window of a width.
fn normalize(v: BigInt, width: u32) -> BigInt {
    let m = modulus(width);
    let r = v.mod_floor(&m);
    if r > window_max(width) {
        r - m
    } else {
        r
    }
}

impl StridedInterval {
    /// The interval containing every `width`-bit value.
    pub fn top(width: u32) -> Self {
        Self {
            width,
            stride: if window_min(width) == window_max(width) {
                BigInt::zero()
            } else {
                BigInt::one()
            },
            lo: window_min(width),
            hi: window_max(width),
        }
    }

    /// The empty interval at a width.
    pub fn empty(width: u32) -> Self {
        Self {
            width,
            stride: BigInt::zero(),
            lo: BigInt::one(),
            hi: BigInt::zero(),
        }
    }

    /// The singleton interval of one machine integer, wrapped into the
    /// canonical window.
    pub fn of_int(value: impl Into<BigInt>, width: u32) -> Self {
        let v = normalize(value.into(), width);
        Self {
            width,
            stride: BigInt::zero(),
            lo: v.clone(),
            hi: v,
        }
    }

    /// The singleton zero.
    pub fn zero(width: u32) -> Self {
        Self::of_int(0, width)
    }

    /// An interval from raw parts, canonicalized.
    ///
    /// `hi` is aligned down onto the progression from `lo`; `lo > hi`
    /// yields the empty interval. Bounds must already lie in the window.
    pub fn new(
        width: u32,
        stride: impl Into<BigInt>,
        lo: impl Into<BigInt>,
        hi: impl Into<BigInt>,
    ) -> Self {
        let (lo, hi) = (lo.into(), hi.into());
        let mut stride = stride.into();
        debug_assert!(lo >= window_min(width) && hi <= window_max(width));
        if lo > hi {
            return Self::empty(width);
        }
        if stride.is_zero() && lo != hi {
            stride = BigInt::one();
        }
        let hi = if stride.is_zero() {
            lo.clone()
        } else {
            &hi - (&hi - &lo).mod_floor(&stride)
        };
        if lo == hi {
            stride = BigInt::zero();
        }
        Self {
            width,
            stride,
            lo,
            hi,
        }
    }

    /// Bit width.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Stride of the progression; zero for singletons.
    pub fn stride(&self) -> &BigInt {
        &self.stride
    }

    /// Lower bound.
    pub fn lo(&self) -> &BigInt {
        &self.lo
    }

    /// Upper bound.
    pub fn hi(&self) -> &BigInt {
        &self.hi
    }

    /// Whether no value is represented.
    pub fn is_empty(&self) -> bool {
        self.lo > self.hi
    }

    /// Whether every `width`-bit value is represented.
    pub fn is_top(&self) -> bool {
        !self.is_empty()
            && self.lo == window_min(self.width)
            && self.hi == window_max(self.width)
            && self.stride <= BigInt::one()
    }

    /// The single value, if this is a singleton.
    pub fn as_singleton(&self) -> Option<&BigInt> {
        if !self.is_empty() && self.lo == self.hi {
            Some(&self.lo)
        } else {
            None
        }
    }

    /// Whether `v` is a member.
    pub fn contains(&self, v: &BigInt) -> bool {
        if self.is_empty() || v < &self.lo || v > &self.hi {
            return false;
        }
        if self.stride.is_zero() {
            return *v == self.lo;
        }
        (v - &self.lo).mod_floor(&self.stride).is_zero()
    }

    /// Number of represented values.
    pub fn cardinality(&self) -> BigInt {
        if self.is_empty() {
            BigInt::zero()
        } else if self.stride.is_zero() {
            BigInt::one()
        } else {
            (&self.hi - &self.lo) / &self.stride + 1
        }
    }

    /// Every represented value, unless there are more than `limit`.
    pub fn concrete_values(&self, limit: usize) -> Option<Vec<BigInt>> {
        if self.cardinality() > BigInt::from(limit) {
            return None;
        }
        let mut out = Vec::new();
        if self.is_empty() {
            return Some(out);
        }
        let step = if self.stride.is_zero() {
            BigInt::one()
        } else {
            self.stride.clone()
        };
        let mut v = self.lo.clone();
        while v <= self.hi {
            out.push(v.clone());
            v += &step;
        }
        Some(out)
    }

    /// Whether every value of `self` is a value of `other`.
    pub fn subset_of(&self, other: &Self) -> bool {
        if self.is_empty() {
            return true;
        }
        if other.is_empty() || self.width != other.width {
            return false;
        }
        if self.lo < other.lo || self.hi > other.hi {
            return false;
        }
        if !other.contains(&self.lo) {
            return false;
        }
        if self.stride.is_zero() {
            return true;
        }
        // All elements are congruent to lo modulo other's stride.
        other.stride.is_zero() && self.lo == other.lo && self.hi == other.hi
            || !other.stride.is_zero() && self.stride.mod_floor(&other.stride).is_zero()
    }

    /// Least interval containing both operands.
    pub fn union(&self, other: &Self) -> Self {
        if self.width != other.width {
            return Self::top(self.width);
        }
        if self.is_empty() {
            return other.clone();
        }
        if other.is_empty() {
            return self.clone();
        }
        let phase = (&self.lo - &other.lo).abs();
        let stride = self.stride.gcd(&other.stride).gcd(&phase);
        let lo = self.lo.clone().min(other.lo.clone());
        let hi = self.hi.clone().max(other.hi.clone());
        Self::new(self.width, stride, lo, hi)
    }

    /// The values common to both operands.
    ///
    /// Exact for compatible progressions (solved by CRT); width mismatch
    /// degrades to top, which over-approximates and stays sound.
    pub fn intersect(&self, other: &Self) -> Self {
        if self.width != other.width {
            return Self::top(self.width);
        }
        if self.is_empty() || other.is_empty() {
            return Self::empty(self.width);
        }
        let lo = self.lo.clone().max(other.lo.clone());
        let hi = self.hi.clone().min(other.hi.clone());
        if lo > hi {
            return Self::empty(self.width);
        }
        if let Some(v) = self.as_singleton() {
            return if other.contains(v) {
                self.clone()
            } else {
                Self::empty(self.width)
            };
        }
        if let Some(v) = other.as_singleton() {
            return if self.contains(v) {
                other.clone()
            } else {
                Self::empty(self.width)
            };
        }
        // Solve x = lo1 (mod s1), x = lo2 (mod s2).
        let g = self.stride.gcd(&other.stride);
        let diff = &other.lo - &self.lo;
        if !diff.mod_floor(&g).is_zero() {
            return Self::empty(self.width);
        }
        let lcm = (&self.stride / &g) * &other.stride;
        let eg = self.stride.extended_gcd(&other.stride);
        // x0 = lo1 + s1 * t with s1 * t = diff (mod s2)
        let t = ((&diff / &g) * &eg.x).mod_floor(&(&other.stride / &g));
        let x0 = &self.lo + &self.stride * t;
        let start = &lo + (&x0 - &lo).mod_floor(&lcm);
        if start > hi {
            return Self::empty(self.width);
        }
        Self::new(self.width, lcm, start, hi)
    }

    /// Extrapolate `self` toward a fixpoint given the newer `other`.
    ///
    /// A bound that moved jumps to the window edge (with stride 1, the
    /// coarsest progression); a stable bound is kept with the combined
    /// stride. Guarantees termination of ascending chains.
    pub fn widen(&self, other: &Self) -> Self {
        if self.width != other.width {
            return Self::top(self.width);
        }
        if self.is_empty() {
            return other.clone();
        }
        if other.is_empty() {
            return self.clone();
        }
        let lo_blown = other.lo < self.lo;
        let hi_blown = other.hi > self.hi;
        if !lo_blown && !hi_blown {
            return self.union(other);
        }
        let lo = if lo_blown {
            window_min(self.width)
        } else {
            self.lo.clone()
        };
        let hi = if hi_blown {
            window_max(self.width)
        } else {
            self.hi.clone()
        };
        Self::new(self.width, 1, lo, hi)
    }

    // ------------------------------------------------------------------
    // Inequality constructors
    // ------------------------------------------------------------------

    /// All values signed-less-or-equal to `k`.
    pub fn beloweq(k: impl Into<BigInt>, width: u32) -> Self {
        let k = normalize(k.into(), width);
        Self::new(width, 1, window_min(width), k)
    }

    /// All values signed-less-than `k`.
    pub fn below(k: impl Into<BigInt>, width: u32) -> Self {
        let k = normalize(k.into(), width);
        if k == window_min(width) {
            return Self::empty(width);
        }
        Self::new(width, 1, window_min(width), k - 1)
    }

    /// All values signed-greater-or-equal to `k`.
    pub fn aboveeq(k: impl Into<BigInt>, width: u32) -> Self {
        let k = normalize(k.into(), width);
        Self::new(width, 1, k, window_max(width))
    }

    /// All values signed-greater-than `k`.
    pub fn above(k: impl Into<BigInt>, width: u32) -> Self {
        let k = normalize(k.into(), width);
        if k == window_max(width) {
            return Self::empty(width);
        }
        Self::new(width, 1, k + 1, window_max(width))
    }

    /// All values unsigned-less-or-equal to `k`.
    ///
    /// A bound past the sign boundary covers a set that is not contiguous
    /// in the signed window; those degrade to top.
    pub fn beloweq_unsigned(k: impl Into<BigInt>, width: u32) -> Self {
        let ku = k.into().mod_floor(&modulus(width));
        if ku <= window_max(width) {
            Self::new(width, 1, BigInt::zero(), ku)
        } else {
            Self::top(width)
        }
    }

    /// All values unsigned-less-than `k`.
    pub fn below_unsigned(k: impl Into<BigInt>, width: u32) -> Self {
        let ku = k.into().mod_floor(&modulus(width));
        if ku.is_zero() {
            return Self::empty(width);
        }
        Self::beloweq_unsigned(ku - 1, width)
    }

    /// All values unsigned-greater-or-equal to `k`.
    pub fn aboveeq_unsigned(k: impl Into<BigInt>, width: u32) -> Self {
        let ku = k.into().mod_floor(&modulus(width));
        if ku.is_zero() {
            Self::top(width)
        } else if ku > window_max(width) {
            // The suffix {k .. 2^w - 1} is entirely negative when signed.
            Self::new(width, 1, ku - modulus(width), -BigInt::one())
        } else {
            Self::top(width)
        }
    }

    /// All values unsigned-greater-than `k`.
    pub fn above_unsigned(k: impl Into<BigInt>, width: u32) -> Self {
        let ku = k.into().mod_floor(&modulus(width));
        if ku == modulus(width) - 1 {
            return Self::empty(width);
        }
        Self::aboveeq_unsigned(ku + 1, width)
    }

    /// Relax the upper bound to the window maximum, keeping the stride.
    pub fn remove_upper_bound(&self) -> Self {
        if self.is_empty() {
            return self.clone();
        }
        let stride = self.stride.clone().max(BigInt::one());
        let max = window_max(self.width);
        let hi = &max - (&max - &self.lo).mod_floor(&stride);
        Self::new(self.width, stride, self.lo.clone(), hi)
    }

    /// Relax the lower bound to the window minimum, keeping the stride.
    pub fn remove_lower_bound(&self) -> Self {
        if self.is_empty() {
            return self.clone();
        }
        let stride = self.stride.clone().max(BigInt::one());
        let min = window_min(self.width);
        let lo = &min + (&self.lo - &min).mod_floor(&stride);
        Self::new(self.width, stride, lo, self.hi.clone())
    }

    // ------------------------------------------------------------------
    // Operator dispatch
    // ------------------------------------------------------------------

    /// Apply a binary operator.
    pub fn binop(&self, op: BinOp, other: &Self) -> Self {
        let w = self.width;
        if self.width != other.width {
            return Self::top(if op.is_comparison() { 1 } else { w });
        }
        if self.is_empty() || other.is_empty() {
            return Self::empty(if op.is_comparison() { 1 } else { w });
        }
        match op {
            BinOp::Add => self.add(other),
            BinOp::Sub => self.sub(other),
            BinOp::Mul => self.mul(other),
            BinOp::Div => self.udiv(other),
            BinOp::SDiv => self.sdiv(other),
            BinOp::Mod => self.umod(other),
            BinOp::SMod => self.smod(other),
            BinOp::Lsh => self.lsh(other),
            BinOp::Rsh => self.rsh(other),
            BinOp::Arsh => self.arsh(other),
            BinOp::And => self.and(other),
            BinOp::Or => self.or(other),
            BinOp::Xor => self.xor(other),
            BinOp::Eq => self.cmp_eq(other),
            BinOp::Neq => self.cmp_eq(other).bool_not(),
            BinOp::Lt => self.cmp_ult(other, true),
            BinOp::Le => self.cmp_ult(other, false),
            BinOp::Slt => self.cmp_slt(other, true),
            BinOp::Sle => self.cmp_slt(other, false),
        }
    }

    /// Apply a unary operator.
    pub fn unop(&self, op: UnOp) -> Self {
        if self.is_empty() {
            return self.clone();
        }
        match op {
            UnOp::Neg => self.neg(),
            UnOp::Not => self.not(),
        }
    }

    /// Apply a width cast.
    pub fn cast(&self, kind: CastKind, target: u32) -> Self {
        if self.is_empty() {
            return Self::empty(target);
        }
        match kind {
            CastKind::Signed => self.cast_signed(target),
            CastKind::Unsigned => self.cast_unsigned(target),
            CastKind::Low => self.cast_low(target),
            CastKind::High => self.cast_high(target),
        }
    }

    fn add(&self, other: &Self) -> Self {
        let lo = &self.lo + &other.lo;
        let hi = &self.hi + &other.hi;
        let stride = self.stride.gcd(&other.stride);
        self.wrap_or_top(stride, lo, hi)
    }

    fn sub(&self, other: &Self) -> Self {
        let lo = &self.lo - &other.hi;
        let hi = &self.hi - &other.lo;
        let stride = self.stride.gcd(&other.stride);
        self.wrap_or_top(stride, lo, hi)
    }

    fn neg(&self) -> Self {
        let w = self.width;
        if w == 1 {
            // -0 = 0 and -1 = 1 (mod 2).
            return self.clone();
        }
        if self.lo == window_min(w) {
            return if self.as_singleton().is_some() {
                self.clone()
            } else {
                Self::top(w)
            };
        }
        Self::new(w, self.stride.clone(), -&self.hi, -&self.lo)
    }

    fn not(&self) -> Self {
        let w = self.width;
        if w == 1 {
            return Self::new(w, self.stride.clone(), BigInt::one() - &self.hi, BigInt::one() - &self.lo);
        }
        // !x = -x - 1, which never leaves the window.
        Self::new(
            w,
            self.stride.clone(),
            -&self.hi - 1,
            -&self.lo - 1,
        )
    }

    fn mul(&self, other: &Self) -> Self {
        if let Some(c) = other.as_singleton() {
            return self.scale(c);
        }
        if let Some(c) = self.as_singleton() {
            return other.scale(c);
        }
        let products = [
            &self.lo * &other.lo,
            &self.lo * &other.hi,
            &self.hi * &other.lo,
            &self.hi * &other.hi,
        ];
        let lo = products.iter().min().cloned().unwrap_or_default();
        let hi = products.iter().max().cloned().unwrap_or_default();
        self.wrap_or_top(BigInt::one(), lo, hi)
    }

    /// Multiply every value by a constant.
    fn scale(&self, c: &BigInt) -> Self {
        if c.is_zero() {
            return Self::zero(self.width);
        }
        let a = &self.lo * c;
        let b = &self.hi * c;
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        self.wrap_or_top(&self.stride * c.abs(), lo, hi)
    }

    fn udiv(&self, other: &Self) -> Self {
        let w = self.width;
        let (dlo, dhi) = match self.to_unsigned_range() {
            Some(r) => r,
            None => return Self::top(w),
        };
        match other.as_singleton() {
            Some(d) if !d.is_zero() => {
                let du = d.mod_floor(&modulus(w));
                Self::from_unsigned_range(w, &dlo / &du, &dhi / &du)
            }
            _ => Self::top(w),
        }
    }

    fn sdiv(&self, other: &Self) -> Self {
        let w = self.width;
        match other.as_singleton() {
            Some(d) if d.is_positive() => {
                // Truncating division is monotone for a positive divisor.
                Self::new(w, 1, &self.lo / d, &self.hi / d)
            }
            Some(d) if d.is_negative() && self.lo != window_min(w) => {
                Self::new(w, 1, &self.hi / d, &self.lo / d)
            }
            _ => Self::top(w),
        }
    }

    fn umod(&self, other: &Self) -> Self {
        let w = self.width;
        let (dlo, dhi) = match self.to_unsigned_range() {
            Some(r) => r,
            None => return Self::top(w),
        };
        match other.as_singleton() {
            Some(d) if !d.is_zero() => {
                let du = d.mod_floor(&modulus(w));
                if dhi < du {
                    // Every dividend is already smaller than the divisor.
                    Self::from_unsigned_range(w, dlo, dhi)
                } else {
                    Self::from_unsigned_range(w, BigInt::zero(), du - 1)
                }
            }
            _ => Self::top(w),
        }
    }

    fn smod(&self, other: &Self) -> Self {
        let w = self.width;
        match other.as_singleton() {
            Some(d) if !d.is_zero() => {
                let m = d.abs() - 1;
                let lo = if self.lo.is_negative() { -&m } else { BigInt::zero() };
                let hi = if self.hi.is_positive() { m } else { BigInt::zero() };
                Self::new(w, 1, lo, hi)
            }
            _ => Self::top(w),
        }
    }

    fn shift_amount(other: &Self) -> Option<BigInt> {
        let s = other.as_singleton()?;
        if s.is_negative() {
            None
        } else {
            Some(s.clone())
        }
    }

    fn lsh(&self, other: &Self) -> Self {
        let w = self.width;
        match Self::shift_amount(other) {
            Some(s) if s >= BigInt::from(w) => Self::zero(w),
            Some(s) => {
                let s = s.to_u32().unwrap_or(w);
                let factor = BigInt::one() << s as usize;
                self.scale(&factor)
            }
            None => Self::top(w),
        }
    }

    fn rsh(&self, other: &Self) -> Self {
        let w = self.width;
        let (ulo, uhi) = match self.to_unsigned_range() {
            Some(r) => r,
            None => return Self::top(w),
        };
        match Self::shift_amount(other) {
            Some(s) if s >= BigInt::from(w) => Self::zero(w),
            Some(s) => {
                let s = s.to_u32().unwrap_or(w) as usize;
                Self::from_unsigned_range(w, ulo >> s, uhi >> s)
            }
            None => Self::top(w),
        }
    }

    fn arsh(&self, other: &Self) -> Self {
        let w = self.width;
        match Self::shift_amount(other) {
            Some(s) => {
                // BigInt shifts are floor shifts, which is exactly the
                // arithmetic behavior, and monotone.
                let s = s.to_u32().unwrap_or(64).min(2 * w) as usize;
                Self::new(w, 1, &self.lo >> s, &self.hi >> s)
            }
            None => Self::top(w),
        }
    }

    fn and(&self, other: &Self) -> Self {
        let w = self.width;
        if let (Some(a), Some(b)) = (self.as_singleton(), other.as_singleton()) {
            let m = modulus(w);
            return Self::of_int(a.mod_floor(&m) & b.mod_floor(&m), w);
        }
        // Masking a non-negative range by a non-negative mask can only
        // shrink it.
        let nonneg = |si: &Self| !si.lo.is_negative();
        if nonneg(self) && nonneg(other) {
            let hi = self.hi.clone().min(other.hi.clone());
            return Self::new(w, 1, BigInt::zero(), hi);
        }
        Self::top(w)
    }

    fn or(&self, other: &Self) -> Self {
        let w = self.width;
        if let (Some(a), Some(b)) = (self.as_singleton(), other.as_singleton()) {
            let m = modulus(w);
            return Self::of_int(a.mod_floor(&m) | b.mod_floor(&m), w);
        }
        if !self.lo.is_negative() && !other.lo.is_negative() {
            let lo = self.lo.clone().max(other.lo.clone());
            return Self::new(w, 1, lo, window_max(w));
        }
        Self::top(w)
    }

    fn xor(&self, other: &Self) -> Self {
        let w = self.width;
        if let (Some(a), Some(b)) = (self.as_singleton(), other.as_singleton()) {
            let m = modulus(w);
            return Self::of_int(a.mod_floor(&m) ^ b.mod_floor(&m), w);
        }
        if !self.lo.is_negative() && !other.lo.is_negative() {
            return Self::new(w, 1, BigInt::zero(), window_max(w));
        }
        Self::top(w)
    }

    fn bool_true() -> Self {
        Self::of_int(1, 1)
    }

    fn bool_false() -> Self {
        Self::of_int(0, 1)
    }

    fn bool_maybe() -> Self {
        Self::new(1, 1, 0, 1)
    }

    fn bool_not(&self) -> Self {
        match self.as_singleton().and_then(|v| v.to_u8()) {
            Some(0) => Self::bool_true(),
            Some(_) => Self::bool_false(),
            None => Self::bool_maybe(),
        }
    }

    fn cmp_eq(&self, other: &Self) -> Self {
        if let (Some(a), Some(b)) = (self.as_singleton(), other.as_singleton()) {
            return if a == b {
                Self::bool_true()
            } else {
                Self::bool_false()
            };
        }
        if self.intersect(other).is_empty() {
            Self::bool_false()
        } else {
            Self::bool_maybe()
        }
    }

    fn cmp_slt(&self, other: &Self, strict: bool) -> Self {
        let always = if strict {
            self.hi < other.lo
        } else {
            self.hi <= other.lo
        };
        let never = if strict {
            self.lo >= other.hi
        } else {
            self.lo > other.hi
        };
        if always {
            Self::bool_true()
        } else if never {
            Self::bool_false()
        } else {
            Self::bool_maybe()
        }
    }

    fn cmp_ult(&self, other: &Self, strict: bool) -> Self {
        match (self.to_unsigned_range(), other.to_unsigned_range()) {
            (Some((alo, ahi)), Some((blo, bhi))) => {
                let always = if strict { ahi < blo } else { ahi <= blo };
                let never = if strict { alo >= bhi } else { alo > bhi };
                if always {
                    Self::bool_true()
                } else if never {
                    Self::bool_false()
                } else {
                    Self::bool_maybe()
                }
            }
            _ => Self::bool_maybe(),
        }
    }

    fn cast_signed(&self, target: u32) -> Self {
        let w = self.width;
        if target < w {
            return self.cast_low(target);
        }
        if w == 1 {
            // The 1-bit window is boolean; its sign bit is the bit itself.
            return match self.as_singleton().and_then(|v| v.to_u8()) {
                Some(0) => Self::zero(target),
                Some(_) => Self::of_int(-1, target),
                None => Self::new(target, 1, -1, 0),
            };
        }
        Self::new(target, self.stride.clone(), self.lo.clone(), self.hi.clone())
    }

    fn cast_unsigned(&self, target: u32) -> Self {
        let w = self.width;
        if target < w {
            return self.cast_low(target);
        }
        if target == w {
            return self.clone();
        }
        match self.to_unsigned_range() {
            Some((lo, hi)) => Self::new(target, self.stride.clone(), lo, hi),
            None => Self::new(target, 1, BigInt::zero(), modulus(w) - 1),
        }
    }

    fn cast_low(&self, target: u32) -> Self {
        if target == self.width {
            return self.clone();
        }
        if self.lo >= window_min(target) && self.hi <= window_max(target) {
            return Self::new(target, self.stride.clone(), self.lo.clone(), self.hi.clone());
        }
        match self.as_singleton() {
            Some(v) => Self::of_int(v.clone(), target),
            None => Self::top(target),
        }
    }

    fn cast_high(&self, target: u32) -> Self {
        if target >= self.width {
            return self.cast_unsigned(target);
        }
        let shift = (self.width - target) as usize;
        match self.to_unsigned_range() {
            Some((lo, hi)) => Self::from_unsigned_range(target, lo >> shift, hi >> shift),
            None => Self::top(target),
        }
    }

    /// Concatenate, with `self` forming the high-order bits.
    ///
    /// Byte-granular reassembly is little-endian at the memory layer; here
    /// the operands are already ordered high-then-low.
    pub fn concat(&self, low: &Self) -> Self {
        let w = self.width + low.width;
        if self.is_empty() || low.is_empty() {
            return Self::empty(w);
        }
        let (ulo, uhi, ustride) = match low.to_unsigned_range() {
            Some((lo, hi)) => (lo, hi, low.stride.clone()),
            // A sign-spanning low part still fits the unsigned window.
            None => (BigInt::zero(), modulus(low.width) - 1, BigInt::one()),
        };
        let factor = modulus(low.width);
        let stride = (&self.stride * &factor).gcd(&ustride);
        let lo = &self.lo * &factor + ulo;
        let hi = &self.hi * &factor + uhi;
        Self::new(w, stride, lo, hi)
    }

    /// Extract bits `[lo_bit, hi_bit]` inclusive.
    pub fn extract(&self, hi_bit: u32, lo_bit: u32) -> Self {
        let target = hi_bit.saturating_sub(lo_bit) + 1;
        if self.is_empty() {
            return Self::empty(target);
        }
        match self.as_singleton() {
            Some(v) => {
                let u = v.mod_floor(&modulus(self.width));
                Self::of_int((u >> lo_bit as usize).mod_floor(&modulus(target)), target)
            }
            None => Self::top(target),
        }
    }

    /// Interval from raw parts, degrading to top when a bound left the
    /// representable window (i.e. the machine operation may wrap).
    fn wrap_or_top(&self, stride: BigInt, lo: BigInt, hi: BigInt) -> Self {
        let w = self.width;
        if lo < window_min(w) || hi > window_max(w) {
            Self::top(w)
        } else {
            Self::new(w, stride, lo, hi)
        }
    }

    /// The bounds reinterpreted as unsigned values, when the interval does
    /// not straddle the sign boundary.
    fn to_unsigned_range(&self) -> Option<(BigInt, BigInt)> {
        if self.is_empty() {
            return None;
        }
        if !self.lo.is_negative() {
            Some((self.lo.clone(), self.hi.clone()))
        } else if self.hi.is_negative() {
            let m = modulus(self.width);
            Some((&self.lo + &m, &self.hi + &m))
        } else {
            None
        }
    }

    /// Interval from unsigned bounds in `[0, 2^w)`, renormalized into the
    /// signed window; a sign-straddling range degrades to top.
    fn from_unsigned_range(width: u32, lo: BigInt, hi: BigInt) -> Self {
        let max = window_max(width);
        if hi <= max {
            Self::new(width, 1, lo, hi)
        } else if lo > max {
            let m = modulus(width);
            Self::new(width, 1, lo - &m, hi - m)
        } else {
            Self::top(width)
        }
    }
}

impl fmt::Display for StridedInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            write!(f, "empty:{}", self.width)
        } else if self.is_top() {
            write!(f, "top:{}", self.width)
        } else {
            write!(f, "{}[{},{}]:{}", self.stride, self.lo, self.hi, self.width)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn si(stride: i64, lo: i64, hi: i64) -> StridedInterval {
        StridedInterval::new(32, stride, lo, hi)
    }

    #[test]
    fn test_singleton_canonical() {
        let s = si(8, 5, 5);
        assert_eq!(s.stride(), &BigInt::zero());
        assert_eq!(s.as_singleton(), Some(&BigInt::from(5)));
    }

    #[test]
    fn test_new_aligns_upper_bound() {
        let s = si(4, 1, 7);
        assert_eq!(s.hi(), &BigInt::from(5));
        assert!(s.contains(&BigInt::from(5)));
        assert!(!s.contains(&BigInt::from(3)));
    }

    #[test]
    fn test_union_strides() {
        let a = si(0, 1, 1);
        let b = si(0, 5, 5);
        let u = a.union(&b);
        assert_eq!(u, si(4, 1, 5));
    }

    #[test]
    fn test_union_commutes() {
        let a = si(2, 0, 10);
        let b = si(3, 3, 9);
        assert_eq!(a.union(&b), b.union(&a));
    }

    #[test]
    fn test_intersect_congruences() {
        // 1 mod 2 vs 0 mod 3 within [0, 30]: 3, 9, 15, 21, 27
        let a = si(2, 1, 29);
        let b = si(3, 0, 30);
        let i = a.intersect(&b);
        assert_eq!(i, si(6, 3, 27));
    }

    #[test]
    fn test_intersect_disjoint_phase() {
        let a = si(2, 0, 10);
        let b = si(2, 1, 11);
        assert!(a.intersect(&b).is_empty());
    }

    #[test]
    fn test_add_constant() {
        let a = si(0, 5, 5);
        let b = si(0, 3, 3);
        assert_eq!(a.binop(BinOp::Add, &b), si(0, 8, 8));
    }

    #[test]
    fn test_add_wraps_to_top() {
        let max = StridedInterval::of_int(i32::MAX as i64, 32);
        let one = StridedInterval::of_int(1, 32);
        assert!(max.binop(BinOp::Add, &one).is_top());
    }

    #[test]
    fn test_widen_stable_is_union() {
        let a = si(1, 0, 10);
        let b = si(1, 2, 8);
        assert_eq!(a.widen(&b), a);
    }

    #[test]
    fn test_widen_blows_moving_bound() {
        let a = si(0, 0, 0);
        let b = si(1, 0, 1);
        let w = a.widen(&b);
        assert_eq!(w.lo(), &BigInt::from(0));
        assert_eq!(w.hi(), &window_max(32));
    }

    #[test]
    fn test_widen_idempotent_at_fixpoint() {
        let a = si(1, 0, 100);
        let b = si(1, 5, 50);
        let w = a.widen(&b);
        assert_eq!(w, a);
        assert_eq!(w.widen(&b), w);
    }

    #[test]
    fn test_beloweq_intersection_narrows() {
        let x = si(1, 0, i32::MAX as i64);
        let c = StridedInterval::beloweq(9, 32);
        assert_eq!(x.intersect(&c), si(1, 0, 9));
    }

    #[test]
    fn test_remove_bounds() {
        let a = si(0, 7, 7);
        let up = a.remove_upper_bound();
        assert_eq!(up.lo(), &BigInt::from(7));
        assert_eq!(up.hi(), &window_max(32));
        let down = a.remove_lower_bound();
        assert_eq!(down.lo(), &window_min(32));
        assert_eq!(down.hi(), &BigInt::from(7));
    }

    #[test]
    fn test_concat_bytes() {
        let hi = StridedInterval::of_int(0x42, 8);
        let lo = StridedInterval::of_int(0x41, 8);
        let both = hi.concat(&lo);
        assert_eq!(both.width(), 16);
        assert_eq!(both.as_singleton(), Some(&BigInt::from(0x4241)));
    }

    #[test]
    fn test_concrete_values_bounded() {
        let a = si(4, 1, 13);
        let vals = a.concrete_values(10).unwrap();
        assert_eq!(
            vals,
            vec![BigInt::from(1), BigInt::from(5), BigInt::from(9), BigInt::from(13)]
        );
        assert!(a.concrete_values(3).is_none());
    }

    #[test]
    fn test_top_concrete_refused() {
        assert!(StridedInterval::top(32).concrete_values(1 << 16).is_none());
    }

    #[test]
    fn test_neg_symmetry() {
        let a = si(1, 2, 10);
        assert_eq!(a.unop(UnOp::Neg), si(1, -10, -2));
    }

    #[test]
    fn test_cast_signed_preserves_values() {
        let a = StridedInterval::of_int(-3, 8);
        let c = a.cast(CastKind::Signed, 32);
        assert_eq!(c.as_singleton(), Some(&BigInt::from(-3)));
    }

    #[test]
    fn test_cast_unsigned_of_negative() {
        let a = StridedInterval::of_int(-1, 8);
        let c = a.cast(CastKind::Unsigned, 32);
        assert_eq!(c.as_singleton(), Some(&BigInt::from(255)));
    }

    #[test]
    fn test_cmp_decidable() {
        let a = si(1, 0, 5);
        let b = si(1, 10, 20);
        assert_eq!(a.binop(BinOp::Slt, &b).as_singleton(), Some(&BigInt::one()));
        assert_eq!(b.binop(BinOp::Slt, &a).as_singleton(), Some(&BigInt::zero()));
    }

    #[test]
    fn test_boolean_window() {
        let t = StridedInterval::of_int(1, 1);
        assert_eq!(t.as_singleton(), Some(&BigInt::one()));
        assert!(StridedInterval::top(1).as_singleton().is_none());
    }
}

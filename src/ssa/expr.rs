//! SSA expressions
//!
//! The expression language the evaluator consumes. Pre-passes (lowering to
//! three-address code, copy propagation, de-endianization) shape programs
//! so that the interesting cases are flat: loads index memory variables,
//! branch predicates compare variables against literals.

use num_bigint::BigInt;

use crate::ssa::var::{Ty, Var};

/// Byte order recorded on memory accesses.
///
/// Programs are de-endianized before analysis, so this field is carried but
/// not consulted; byte-granular reassembly commits to little-endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    /// Least-significant byte at the lowest address.
    Little,
    /// Most-significant byte at the lowest address.
    Big,
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    /// Wrapping addition.
    Add,
    /// Wrapping subtraction.
    Sub,
    /// Wrapping multiplication.
    Mul,
    /// Unsigned division.
    Div,
    /// Signed division.
    SDiv,
    /// Unsigned remainder.
    Mod,
    /// Signed remainder.
    SMod,
    /// Left shift.
    Lsh,
    /// Logical right shift.
    Rsh,
    /// Arithmetic right shift.
    Arsh,
    /// Bitwise and.
    And,
    /// Bitwise or.
    Or,
    /// Bitwise xor.
    Xor,
    /// Equality; yields a 1-bit boolean.
    Eq,
    /// Disequality; yields a 1-bit boolean.
    Neq,
    /// Unsigned less-than; yields a 1-bit boolean.
    Lt,
    /// Unsigned less-or-equal; yields a 1-bit boolean.
    Le,
    /// Signed less-than; yields a 1-bit boolean.
    Slt,
    /// Signed less-or-equal; yields a 1-bit boolean.
    Sle,
}

impl BinOp {
    /// Whether this operator yields a 1-bit boolean.
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinOp::Eq | BinOp::Neq | BinOp::Lt | BinOp::Le | BinOp::Slt | BinOp::Sle
        )
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    /// Two's-complement negation.
    Neg,
    /// Bitwise complement.
    Not,
}

/// Width-changing cast kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastKind {
    /// Zero extension.
    Unsigned,
    /// Sign extension.
    Signed,
    /// Keep the high-order bits.
    High,
    /// Keep the low-order bits.
    Low,
}

/// An SSA expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Integer literal at a bit width.
    Int(BigInt, u32),
    /// Variable reference.
    Var(Var),
    /// SSA merge of the values flowing in from each predecessor.
    Phi(Vec<Var>),
    /// Binary operation.
    BinOp(BinOp, Box<Expr>, Box<Expr>),
    /// Unary operation.
    UnOp(UnOp, Box<Expr>),
    /// Width cast to the given target width.
    Cast(CastKind, u32, Box<Expr>),
    /// Memory read of `width` bits.
    Load {
        /// Memory expression (a memory variable after the pre-passes).
        mem: Box<Expr>,
        /// Address expression.
        index: Box<Expr>,
        /// Recorded byte order (redundant after de-endianization).
        endian: Endian,
        /// Result width in bits.
        width: u32,
    },
    /// Memory write of `width` bits, yielding the updated store.
    Store {
        /// Memory expression being updated.
        mem: Box<Expr>,
        /// Address expression.
        index: Box<Expr>,
        /// Value written.
        value: Box<Expr>,
        /// Recorded byte order (redundant after de-endianization).
        endian: Endian,
        /// Value width in bits.
        width: u32,
    },
    /// Bit concatenation; the first operand forms the high-order bits.
    Concat(Box<Expr>, Box<Expr>),
    /// Bit extraction of `[lo, hi]` inclusive.
    Extract(u32, u32, Box<Expr>),
    /// If-then-else.
    Ite(Box<Expr>, Box<Expr>, Box<Expr>),
    /// A value the lifter could not model.
    Unknown(String, Ty),
}

impl Expr {
    /// Integer literal convenience constructor.
    pub fn int(value: i64, width: u32) -> Self {
        Expr::Int(BigInt::from(value), width)
    }

    /// Variable reference convenience constructor.
    pub fn var(v: Var) -> Self {
        Expr::Var(v)
    }

    /// Binary operation convenience constructor.
    pub fn binop(op: BinOp, lhs: Expr, rhs: Expr) -> Self {
        Expr::BinOp(op, Box::new(lhs), Box::new(rhs))
    }

    /// Load convenience constructor (little-endian).
    pub fn load(mem: Var, index: Expr, width: u32) -> Self {
        Expr::Load {
            mem: Box::new(Expr::Var(mem)),
            index: Box::new(index),
            endian: Endian::Little,
            width,
        }
    }

    /// Store convenience constructor (little-endian).
    pub fn store(mem: Var, index: Expr, value: Expr, width: u32) -> Self {
        Expr::Store {
            mem: Box::new(Expr::Var(mem)),
            index: Box::new(index),
            value: Box::new(value),
            endian: Endian::Little,
            width,
        }
    }

    /// Inferred type of this expression.
    ///
    /// Purely syntactic: variables carry their declared type, operators
    /// follow their left operand, comparisons and literals fix their own
    /// widths. Total over all forms.
    pub fn ty(&self) -> Ty {
        match self {
            Expr::Int(_, w) => Ty::Reg(*w),
            Expr::Var(v) => v.ty,
            Expr::Phi(vars) => vars.first().map(|v| v.ty).unwrap_or(Ty::Reg(0)),
            Expr::BinOp(op, lhs, _) => {
                if op.is_comparison() {
                    Ty::Reg(1)
                } else {
                    lhs.ty()
                }
            }
            Expr::UnOp(_, e) => e.ty(),
            Expr::Cast(_, w, _) => Ty::Reg(*w),
            Expr::Load { width, .. } => Ty::Reg(*width),
            Expr::Store { .. } => Ty::Mem,
            Expr::Concat(hi, lo) => {
                let wh = hi.ty().width().unwrap_or(0);
                let wl = lo.ty().width().unwrap_or(0);
                Ty::Reg(wh + wl)
            }
            Expr::Extract(hi, lo, _) => Ty::Reg(hi.saturating_sub(*lo) + 1),
            Expr::Ite(_, then, _) => then.ty(),
            Expr::Unknown(_, ty) => *ty,
        }
    }

    /// Inferred bit width; zero for memory-typed expressions.
    pub fn width(&self) -> u32 {
        self.ty().width().unwrap_or(0)
    }

    /// The literal value if this is a boolean literal (width-1 integer).
    pub fn as_bool_literal(&self) -> Option<bool> {
        match self {
            Expr::Int(v, 1) => Some(*v != BigInt::from(0)),
            _ => None,
        }
    }

    /// The constant and its width if this is an integer literal.
    pub fn as_int_literal(&self) -> Option<(&BigInt, u32)> {
        match self {
            Expr::Int(v, w) => Some((v, *w)),
            _ => None,
        }
    }
}

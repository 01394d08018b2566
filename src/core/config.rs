//! Analysis configuration
//!
//! Tunables are carried on plain configuration records threaded to the
//! driver rather than process-wide globals, so concurrent analyses in one
//! process can disagree about them.

use num_bigint::BigInt;

use crate::core::error::{Result, VsaError};
use crate::ssa::var::Var;

/// Tunables shared by every operation of one analysis run.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// Narrow unsigned comparisons as if they were signed.
    ///
    /// On by default. This buys precision on the common compiler idiom of
    /// unsigned bounds checks over small non-negative values, and is
    /// unsound whenever a compared quantity crosses the sign boundary.
    /// Turn it off to trade that precision for soundness.
    pub signedness_hack: bool,
    /// Cap on the number of concrete addresses any memory operation will
    /// enumerate, and on per-region entry counts after weak writes.
    ///
    /// `None` removes the cap entirely.
    pub mem_max: Option<usize>,
}

impl AnalysisConfig {
    /// Default memory cap: 2^16 concrete addresses.
    pub const DEFAULT_MEM_MAX: usize = 1 << 16;

    /// Default number of meets at a vertex before merges switch to widening.
    pub const DEFAULT_NMEETS: u32 = 3;

    /// Configuration with the signedness hack disabled.
    pub fn sound() -> Self {
        Self {
            signedness_hack: false,
            ..Self::default()
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            signedness_hack: true,
            mem_max: Some(Self::DEFAULT_MEM_MAX),
        }
    }
}

/// Per-run inputs to the fixpoint driver.
///
/// The defaults for `sp` and `mem` are sentinels; [`InitOptions::validate`]
/// rejects a configuration that has not overridden both.
#[derive(Debug, Clone)]
pub struct InitOptions {
    /// Bytes to pre-populate the global region with, as `(address, byte)`.
    pub initial_mem: Vec<(u64, u8)>,
    /// SSA variable holding the architecture's stack pointer.
    pub sp: Var,
    /// SSA variable naming memory.
    pub mem: Var,
    /// Widening threshold override; `None` uses the framework default.
    pub nmeets: Option<u32>,
}

impl InitOptions {
    /// Options with the given stack-pointer and memory variables.
    pub fn new(sp: Var, mem: Var) -> Self {
        Self {
            initial_mem: Vec::new(),
            sp,
            mem,
            nmeets: None,
        }
    }

    /// Fail fast on a configuration still carrying sentinel variables.
    pub fn validate(&self) -> Result<()> {
        if self.sp.is_sentinel() {
            return Err(VsaError::SentinelStackPointer);
        }
        if self.mem.is_sentinel() {
            return Err(VsaError::SentinelMemory);
        }
        Ok(())
    }

    /// Initial-memory bytes as big-integer addresses.
    pub(crate) fn seed_bytes(&self) -> impl Iterator<Item = (BigInt, u8)> + '_ {
        self.initial_mem
            .iter()
            .map(|(addr, byte)| (BigInt::from(*addr), *byte))
    }

    /// Effective widening threshold.
    pub fn widen_threshold(&self) -> u32 {
        self.nmeets.unwrap_or(AnalysisConfig::DEFAULT_NMEETS)
    }
}

impl Default for InitOptions {
    fn default() -> Self {
        Self {
            initial_mem: Vec::new(),
            sp: Var::sentinel_sp(),
            mem: Var::sentinel_mem(),
            nmeets: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_rejected() {
        let opts = InitOptions::default();
        assert!(opts.validate().is_err());
    }

    #[test]
    fn test_configured_accepted() {
        let sp = Var::reg(1, "R_ESP", 32);
        let mem = Var::mem(2, "mem");
        assert!(InitOptions::new(sp, mem).validate().is_ok());
    }

    #[test]
    fn test_partial_override_rejected() {
        let mut opts = InitOptions::default();
        opts.sp = Var::reg(1, "R_ESP", 32);
        assert!(matches!(opts.validate(), Err(VsaError::SentinelMemory)));
    }
}

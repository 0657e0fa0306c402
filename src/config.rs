//! Runtime configuration for the blocked multiplication.
//!
//! The block edge length is the one performance knob: it is a plain value
//! carried by [`MatMulConfig`], so callers and tests can vary it without
//! recompiling. [`MatMulConfig::from_env`] lets a deployment override the
//! defaults through environment variables.

use tracing::{debug, warn};

use crate::error::{MatMulError, Result};
use crate::SZ_BLOCK;

/// Overrides the block edge length (positive integer).
pub const ENV_BLOCK_SIZE: &str = "BLOCKMM_BLOCK_SIZE";
/// Forces the sequential path when set to `1`, `true` or `yes`.
pub const ENV_SEQUENTIAL: &str = "BLOCKMM_SEQUENTIAL";
/// Runs on a dedicated pool with this many workers.
pub const ENV_THREADS: &str = "BLOCKMM_THREADS";

/// Edge length of the square tiles used for all three loop dimensions.
///
/// Always at least 1. Matrix dimensions do not need to be multiples of it:
/// edge tiles are clipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockSpec(usize);

impl BlockSpec {
    /// # Errors
    /// Returns [`MatMulError::InvalidBlockSize`] when `sz_block == 0`.
    pub fn new(sz_block: usize) -> Result<Self> {
        if sz_block == 0 {
            return Err(MatMulError::InvalidBlockSize(sz_block));
        }
        Ok(Self(sz_block))
    }

    #[inline]
    pub const fn size(self) -> usize {
        self.0
    }
}

impl Default for BlockSpec {
    fn default() -> Self {
        Self(SZ_BLOCK)
    }
}

impl TryFrom<usize> for BlockSpec {
    type Error = MatMulError;

    fn try_from(sz_block: usize) -> Result<Self> {
        Self::new(sz_block)
    }
}

/// How the row-block loop is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Parallelism {
    /// Every row band on the calling thread.
    Sequential,
    /// One Rayon task per row band, joined before returning.
    #[default]
    Parallel,
}

/// Parameters of a multiplication.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatMulConfig {
    pub block: BlockSpec,
    pub parallelism: Parallelism,
    /// Worker count of a dedicated pool; `None` uses Rayon's global pool.
    /// The dedicated pool is built and torn down by every product call.
    pub threads: Option<usize>,
}

impl MatMulConfig {
    pub fn new(block: BlockSpec) -> Self {
        Self {
            block,
            ..Self::default()
        }
    }

    /// # Errors
    /// Returns [`MatMulError::InvalidBlockSize`] when `sz_block == 0`.
    pub fn with_block_size(mut self, sz_block: usize) -> Result<Self> {
        self.block = BlockSpec::new(sz_block)?;
        Ok(self)
    }

    pub fn with_parallelism(mut self, parallelism: Parallelism) -> Self {
        self.parallelism = parallelism;
        self
    }

    /// Runs on a dedicated pool of `threads` workers (`0` lets Rayon pick).
    ///
    /// Each call to [`crate::multiply_with`] spawns that pool's OS threads and
    /// joins them before returning. For many small products, leave this unset
    /// and size the global pool with `RAYON_NUM_THREADS` instead.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }

    /// Shorthand for [`Parallelism::Sequential`].
    pub fn sequential() -> Self {
        Self::default().with_parallelism(Parallelism::Sequential)
    }

    /// Reads [`ENV_BLOCK_SIZE`], [`ENV_SEQUENTIAL`] and [`ENV_THREADS`] on top
    /// of the defaults. Unset variables keep their default.
    ///
    /// # Errors
    /// Returns [`MatMulError::InvalidEnv`] for an unparsable value and
    /// [`MatMulError::InvalidBlockSize`] for a zero block size.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Same as [`MatMulConfig::from_env`] with an explicit variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup(ENV_BLOCK_SIZE) {
            config.block = BlockSpec::new(parse_usize(ENV_BLOCK_SIZE, &value)?)?;
        }

        if let Some(value) = lookup(ENV_SEQUENTIAL) {
            config.parallelism = match value.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => Parallelism::Sequential,
                "0" | "false" | "no" | "" => Parallelism::Parallel,
                _ => {
                    return Err(MatMulError::InvalidEnv {
                        var: ENV_SEQUENTIAL,
                        value,
                    })
                }
            };
        }

        if let Some(value) = lookup(ENV_THREADS) {
            let threads = parse_usize(ENV_THREADS, &value)?;
            if threads > 0 && config.parallelism == Parallelism::Sequential {
                warn!(threads, "{ENV_THREADS} ignored: sequential execution requested");
            }
            config.threads = Some(threads);
        }

        debug!(
            sz_block = config.block.size(),
            parallelism = ?config.parallelism,
            threads = ?config.threads,
            "loaded configuration"
        );
        Ok(config)
    }
}

fn parse_usize(var: &'static str, value: &str) -> Result<usize> {
    value.trim().parse().map_err(|_| MatMulError::InvalidEnv {
        var,
        value: value.to_string(),
    })
}

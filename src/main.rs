use std::time::Instant;

use anyhow::{bail, Context, Result};
use blockmm::config::{MatMulConfig, Parallelism};
use blockmm::naive::{max_abs_diff, multiply_naive};
use blockmm::{multiply_with, Matrix};
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Multiplies two random matrices with the blocked algorithm and reports timing.
#[derive(Debug, Parser)]
#[command(name = "blockmm")]
#[command(about = "Cache-blocked parallel matrix multiplication", long_about = None)]
struct Cli {
    /// Rows of A (and of C)
    #[arg(value_name = "M", default_value_t = 1024)]
    m: usize,

    /// Columns of A, rows of B (defaults to M)
    #[arg(value_name = "K")]
    k: Option<usize>,

    /// Columns of B (and of C) (defaults to M)
    #[arg(value_name = "N")]
    n: Option<usize>,

    /// Tile edge length (overrides BLOCKMM_BLOCK_SIZE)
    #[arg(short, long)]
    block_size: Option<usize>,

    /// Run on the calling thread only
    #[arg(long)]
    sequential: bool,

    /// Size of a dedicated worker pool (overrides BLOCKMM_THREADS)
    #[arg(short, long)]
    threads: Option<usize>,

    /// Seed of the random operands
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Compare against the naive triple loop
    #[arg(long)]
    verify: bool,

    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn build_config(cli: &Cli) -> Result<MatMulConfig> {
    let mut config = MatMulConfig::from_env().context("reading BLOCKMM_* environment")?;
    if let Some(sz_block) = cli.block_size {
        config = config.with_block_size(sz_block)?;
    }
    if cli.sequential {
        config = config.with_parallelism(Parallelism::Sequential);
    }
    if let Some(threads) = cli.threads {
        config = config.with_threads(threads);
    }
    Ok(config)
}

/// Throughput of an `m×k · k×n` product, counting one multiply and one add per term.
fn mflops(m: usize, k: usize, n: usize, seconds: f64) -> f64 {
    if seconds > 0.0 {
        2.0 * (m as f64) * (n as f64) * (k as f64) / seconds * 1e-6
    } else {
        f64::INFINITY
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let (m, k, n) = (cli.m, cli.k.unwrap_or(cli.m), cli.n.unwrap_or(cli.m));
    let config = build_config(&cli)?;

    let mut rng = StdRng::seed_from_u64(cli.seed);
    let a = Matrix::<f64>::random(m, k, -1.0, 1.0, &mut rng);
    let b = Matrix::<f64>::random(k, n, -1.0, 1.0, &mut rng);

    let start = Instant::now();
    let c = multiply_with(&a, &b, &config)?;
    let seconds = start.elapsed().as_secs_f64();
    let mflops = mflops(m, k, n, seconds);
    info!(
        m,
        k,
        n,
        sz_block = config.block.size(),
        parallelism = ?config.parallelism,
        "blocked product computed in {seconds:.6} s ({mflops:.1} MFlops)"
    );

    if cli.verify {
        let reference = multiply_naive(&a, &b)?;
        let diff = max_abs_diff(&c, &reference);
        // |a|, |b| < 1: each element is a sum of k terms bounded by 1.
        let tolerance = f64::EPSILON * (k.max(1) as f64) * 4.0;
        if diff > tolerance {
            warn!(diff, tolerance, "blocked product differs from reference");
            bail!("verification failed: max |C - C_ref| = {diff:e} > {tolerance:e}");
        }
        info!(diff, "verification passed");
    }

    Ok(())
}

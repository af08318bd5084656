//! Core numeric types, constants, errors and runtime configuration for pgm.
//!
//! This crate provides the foundational types and configuration parameters
//! shared by the network model, the decision tree and the sampling engine.

mod config;
mod error;

pub use config::*;
pub use error::*;

// ============================================================================
// TYPE ALIASES
// ============================================================================
/// Expected utilities and utility table entries.
pub type Utility = f64;
/// Conditional, joint and scenario probabilities.
pub type Probability = f64;
/// Importance weights accumulated by likelihood weighting.
pub type Weight = f64;

// ============================================================================
// LIKELIHOOD WEIGHTING
// Samples are drawn in fixed-size batches, each batch with its own seeded rng,
// so a (seed, sample size) pair always reproduces the same estimate.
// ============================================================================
/// Number of independent trials per query.
pub const DEFAULT_SAMPLE_SIZE: usize = 10_000;
/// Seed of the first sampling batch. Batch `b` uses `seed + b`.
pub const DEFAULT_SAMPLE_SEED: u64 = 0x0BA7_E5AD;
/// Trials per sampling batch (unit of parallel work and deadline checks).
pub const SAMPLE_BATCH_SIZE: usize = 1024;
/// State index given to unobserved decisions of tuning networks.
pub const TUNING_DECISION_STATE: usize = 1;
/// Network property holding the divisor applied to unobserved utility tables.
pub const UNOBSERVED_UTILITY_PENALTY: &str = "unobservedUtilityPenalty";

// ============================================================================
// DECISION TREE SYNTHESIS
// ============================================================================
/// Name of the synthesized super-value node aggregating utility leaves.
pub const SUPER_VALUE_NODE: &str = "Global Utility";
/// Name of the synthesized metadecision choosing among eligible decisions.
pub const ORDER_DECISION_NODE: &str = "OD";

// ============================================================================
// RUNTIME UTILITIES
// ============================================================================
/// Initialize dual logging (terminal + file) with timestamped log files.
/// Creates `logs/` directory and writes DEBUG level to file, INFO to terminal.
#[cfg(feature = "logging")]
pub fn log() -> anyhow::Result<()> {
    std::fs::create_dir_all("logs")?;
    let config = simplelog::ConfigBuilder::new()
        .set_location_level(log::LevelFilter::Off)
        .set_target_level(log::LevelFilter::Off)
        .set_thread_level(log::LevelFilter::Off)
        .build();
    let time = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)?
        .as_secs();
    let file = simplelog::WriteLogger::new(
        log::LevelFilter::Debug,
        config.clone(),
        std::fs::File::create(format!("logs/{}.log", time))?,
    );
    let term = simplelog::TermLogger::new(
        log::LevelFilter::Info,
        config.clone(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    );
    simplelog::CombinedLogger::init(vec![term, file])?;
    Ok(())
}

/// Fails with [`Error::DeadlineExceeded`] once `deadline` has passed.
pub fn check(deadline: Option<std::time::Instant>) -> Result<()> {
    match deadline {
        Some(d) if std::time::Instant::now() >= d => Err(Error::DeadlineExceeded),
        _ => Ok(()),
    }
}

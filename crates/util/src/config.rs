use crate::DEFAULT_SAMPLE_SEED;
use crate::DEFAULT_SAMPLE_SIZE;
use std::time::Duration;
use std::time::Instant;

/// Runtime knobs read from the environment.
///
/// - `PGM_SAMPLE_SIZE` — likelihood weighting trials per query
/// - `PGM_SAMPLE_SEED` — seed of the first sampling batch
/// - `PGM_DEADLINE` — wall-clock budget per evaluation, e.g. "30s", "5m", "2h", "1d"
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Config {
    pub sample_size: usize,
    pub sample_seed: u64,
    pub budget: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sample_size: DEFAULT_SAMPLE_SIZE,
            sample_seed: DEFAULT_SAMPLE_SEED,
            budget: None,
        }
    }
}

impl Config {
    /// Reads overrides from the environment, falling back to the defaults.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Config::from_env`] over an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(size) = lookup("PGM_SAMPLE_SIZE") {
            config.sample_size = size
                .trim()
                .parse()
                .map_err(|e| anyhow::anyhow!("invalid PGM_SAMPLE_SIZE {}: {}", size, e))?;
            if config.sample_size == 0 {
                return Err(anyhow::anyhow!("PGM_SAMPLE_SIZE must be positive"));
            }
        }
        if let Some(seed) = lookup("PGM_SAMPLE_SEED") {
            config.sample_seed = seed
                .trim()
                .parse()
                .map_err(|e| anyhow::anyhow!("invalid PGM_SAMPLE_SEED {}: {}", seed, e))?;
        }
        if let Some(budget) = lookup("PGM_DEADLINE") {
            config.budget = Some(
                parse_duration(&budget)
                    .ok_or_else(|| anyhow::anyhow!("invalid PGM_DEADLINE {}", budget))?,
            );
        }
        log::debug!("runtime config {:?}", config);
        Ok(config)
    }

    /// Deadline for an evaluation starting now. A budget past the clock's
    /// range means no deadline.
    pub fn deadline(&self) -> Option<Instant> {
        self.budget.and_then(|budget| Instant::now().checked_add(budget))
    }
}

/// Wall-clock budget from a count and a unit: "30s", "5m", "2h" or "1d".
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    let (at, unit) = s.char_indices().last()?;
    let count = s[..at].parse::<u64>().ok()?;
    let scale = match unit {
        's' => 1,
        'm' => 60,
        'h' => 3600,
        'd' => 86400,
        _ => return None,
    };
    count.checked_mul(scale).map(Duration::from_secs)
}

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::encoding::CompactEmpty;
use crate::error::{DatasetError, Result};

pub const BATCH_SIZE: usize = 32;
/// Discount applied per remaining move to value targets.
pub const GAMMA: f32 = 0.99;
/// Sequential encoders and the TD walker skip games of 4 plies or fewer.
pub const MIN_PLIES_SEQUENTIAL: usize = 5;
pub const MIN_PLIES_RANDOM: usize = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    pub batch_size: usize,
    pub gamma: f32,
    pub min_plies_sequential: usize,
    pub min_plies_random: usize,
    /// Rewind to the first game at end of file instead of stopping.
    pub loop_forever: bool,
    /// Seed for sampling and shuffling; entropy when unset.
    pub seed: Option<u64>,
    pub compact_empty: CompactEmpty,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            batch_size: BATCH_SIZE,
            gamma: GAMMA,
            min_plies_sequential: MIN_PLIES_SEQUENTIAL,
            min_plies_random: MIN_PLIES_RANDOM,
            loop_forever: false,
            seed: None,
            compact_empty: CompactEmpty::default(),
        }
    }
}

impl DatasetConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|e| DatasetError::open(path, e))?;
        let config: Self = serde_json::from_str(&json)
            .map_err(|e| DatasetError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(DatasetError::Config("batch_size must be positive".to_string()));
        }
        if !(self.gamma > 0.0 && self.gamma <= 1.0) {
            return Err(DatasetError::Config(format!(
                "gamma must be in (0, 1], got {}",
                self.gamma
            )));
        }
        Ok(())
    }

    pub fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }

    pub fn with_loop(mut self, loop_forever: bool) -> Self {
        self.loop_forever = loop_forever;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = DatasetConfig::default();
        assert_eq!(config.batch_size, 32);
        assert_eq!(config.gamma, 0.99);
        assert_eq!(config.min_plies_sequential, 5);
        assert_eq!(config.min_plies_random, 2);
        assert!(!config.loop_forever);
        assert_eq!(config.compact_empty, CompactEmpty::Sentinel);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"batch_size": 8, "seed": 7, "compact_empty": "legacy"}}"#).unwrap();
        let config = DatasetConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.batch_size, 8);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.compact_empty, CompactEmpty::Legacy);
        assert_eq!(config.gamma, GAMMA);
    }

    #[test]
    fn test_validation() {
        let bad_batch = DatasetConfig { batch_size: 0, ..Default::default() };
        assert!(matches!(bad_batch.validate(), Err(DatasetError::Config(_))));
        let bad_gamma = DatasetConfig { gamma: 1.5, ..Default::default() };
        assert!(bad_gamma.validate().is_err());
        let zero_gamma = DatasetConfig { gamma: 0.0, ..Default::default() };
        assert!(zero_gamma.validate().is_err());
    }

    #[test]
    fn test_seeded_rng_is_reproducible() {
        let config = DatasetConfig { seed: Some(42), ..Default::default() };
        let a: Vec<u32> = (0..4).map(|_| config.rng().gen()).collect();
        let mut first = config.rng();
        let mut second = config.rng();
        assert_eq!(first.gen::<u64>(), second.gen::<u64>());
        assert!(a.iter().all(|&v| v == a[0]));
    }
}

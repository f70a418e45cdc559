use chrono::{DateTime, Utc};
use log::info;
use ndarray::{ArrayD, Axis, IxDyn};
use npyz::WriterBuilder;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use crate::error::{DatasetError, Result};

/// Arrays produced by one generator: inputs `x`, labels `y` and an optional
/// second label set `y2`. All share the leading sample axis.
#[derive(Debug, Clone, PartialEq)]
pub struct TensorSet {
    pub x: ArrayD<f32>,
    pub y: ArrayD<f32>,
    pub y2: Option<ArrayD<f32>>,
}

impl TensorSet {
    pub fn len(&self) -> usize {
        if self.x.ndim() == 0 {
            0
        } else {
            self.x.len_of(Axis(0))
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn shapes(&self) -> (Vec<usize>, Vec<usize>, Option<Vec<usize>>) {
        (
            self.x.shape().to_vec(),
            self.y.shape().to_vec(),
            self.y2.as_ref().map(|y2| y2.shape().to_vec()),
        )
    }
}

/// Describes the arrays written next to a source file.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CacheManifest {
    pub generator: String,
    pub featurized: bool,
    pub source: PathBuf,
    pub samples: usize,
    pub x_shape: Vec<usize>,
    pub y_shape: Vec<usize>,
    pub y2_shape: Option<Vec<usize>>,
    pub created_at: DateTime<Utc>,
}

/// `.npy` arrays cached beside a source file, named
/// `<source>.<generator>-<True|False>-{X,y,y2}.npy` so caches written by
/// the Python tooling are picked up.
pub struct TensorCache {
    source: PathBuf,
}

impl TensorCache {
    pub fn new<P: AsRef<Path>>(source: P) -> Self {
        Self {
            source: source.as_ref().to_path_buf(),
        }
    }

    fn sibling(&self, generator: &str, featurized: bool, suffix: &str) -> PathBuf {
        let mut name = OsString::from(self.source.as_os_str());
        let flag = if featurized { "True" } else { "False" };
        name.push(format!(".{}-{}-{}", generator, flag, suffix));
        PathBuf::from(name)
    }

    pub fn array_path(&self, generator: &str, featurized: bool, part: &str) -> PathBuf {
        self.sibling(generator, featurized, &format!("{}.npy", part))
    }

    pub fn manifest_path(&self, generator: &str, featurized: bool) -> PathBuf {
        self.sibling(generator, featurized, "meta.json")
    }

    pub fn save(&self, generator: &str, featurized: bool, set: &TensorSet) -> Result<()> {
        write_npy(&self.array_path(generator, featurized, "X"), &set.x)?;
        write_npy(&self.array_path(generator, featurized, "y"), &set.y)?;
        let y2_path = self.array_path(generator, featurized, "y2");
        match &set.y2 {
            Some(y2) => write_npy(&y2_path, y2)?,
            None if y2_path.exists() => fs::remove_file(&y2_path)?,
            None => {}
        }

        let (x_shape, y_shape, y2_shape) = set.shapes();
        let manifest = CacheManifest {
            generator: generator.to_string(),
            featurized,
            source: self.source.clone(),
            samples: set.len(),
            x_shape,
            y_shape,
            y2_shape,
            created_at: Utc::now(),
        };
        let path = self.manifest_path(generator, featurized);
        let json = serde_json::to_string_pretty(&manifest).map_err(|e| DatasetError::Cache {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        fs::write(&path, json).map_err(|e| DatasetError::open(&path, e))?;
        info!(
            "cached {} samples of {} (featurized={}) next to {}",
            manifest.samples,
            generator,
            featurized,
            self.source.display()
        );
        Ok(())
    }

    pub fn load_manifest(&self, generator: &str, featurized: bool) -> Result<CacheManifest> {
        let path = self.manifest_path(generator, featurized);
        let json = fs::read_to_string(&path).map_err(|e| DatasetError::open(&path, e))?;
        serde_json::from_str(&json).map_err(|e| DatasetError::Cache {
            path,
            reason: e.to_string(),
        })
    }

    /// Loads cached arrays, failing when any file is missing or the arrays
    /// disagree with the manifest.
    pub fn load(&self, generator: &str, featurized: bool) -> Result<TensorSet> {
        let manifest = self.load_manifest(generator, featurized)?;
        let set = TensorSet {
            x: read_npy(&self.array_path(generator, featurized, "X"))?,
            y: read_npy(&self.array_path(generator, featurized, "y"))?,
            y2: match manifest.y2_shape {
                Some(_) => Some(read_npy(&self.array_path(generator, featurized, "y2"))?),
                None => None,
            },
        };

        let (x_shape, y_shape, y2_shape) = set.shapes();
        if x_shape != manifest.x_shape
            || y_shape != manifest.y_shape
            || y2_shape != manifest.y2_shape
        {
            return Err(DatasetError::Cache {
                path: self.manifest_path(generator, featurized),
                reason: "cached arrays do not match the manifest shapes".to_string(),
            });
        }
        Ok(set)
    }

    /// Returns cached arrays when available (and `refresh` is off), otherwise
    /// builds them and writes them through.
    pub fn load_or_build<F>(
        &self,
        generator: &str,
        featurized: bool,
        refresh: bool,
        build: F,
    ) -> Result<TensorSet>
    where
        F: FnOnce() -> Result<TensorSet>,
    {
        if !refresh {
            match self.load(generator, featurized) {
                Ok(set) => {
                    info!(
                        "loaded {} cached samples of {} for {}",
                        set.len(),
                        generator,
                        self.source.display()
                    );
                    return Ok(set);
                }
                Err(e) => info!("cache miss for {} on {}: {}", generator, self.source.display(), e),
            }
        }
        let set = build()?;
        self.save(generator, featurized, &set)?;
        Ok(set)
    }
}

pub fn write_npy(path: &Path, array: &ArrayD<f32>) -> Result<()> {
    let file = File::create(path).map_err(|e| DatasetError::open(path, e))?;
    let shape: Vec<u64> = array.shape().iter().map(|&d| d as u64).collect();
    let mut writer: npyz::NpyWriter<f32, BufWriter<File>> = npyz::WriteOptions::new()
        .default_dtype()
        .shape(&shape)
        .writer(BufWriter::new(file))
        .begin_nd()?;
    writer.extend(array.iter().copied())?;
    writer.finish()?;
    Ok(())
}

pub fn read_npy(path: &Path) -> Result<ArrayD<f32>> {
    let file = File::open(path).map_err(|e| DatasetError::open(path, e))?;
    let npy = npyz::NpyFile::new(BufReader::new(file))?;
    let shape: Vec<usize> = npy.shape().iter().map(|&d| d as usize).collect();
    let data: Vec<f32> = npy.into_vec()?;
    ArrayD::from_shape_vec(IxDyn(&shape), data).map_err(|e| DatasetError::Cache {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array1, Array2};
    use std::cell::Cell;

    fn sample_set() -> TensorSet {
        TensorSet {
            x: Array2::from_shape_fn((3, 4), |(i, j)| (i * 4 + j) as f32).into_dyn(),
            y: Array1::from(vec![1.0, -1.0, 0.0]).into_dyn(),
            y2: None,
        }
    }

    #[test]
    fn test_file_naming() {
        let cache = TensorCache::new("/data/medium.pgn");
        assert_eq!(
            cache.array_path("random_black_state", false, "X"),
            PathBuf::from("/data/medium.pgn.random_black_state-False-X.npy")
        );
        assert_eq!(
            cache.manifest_path("white_phi_fromaction_sl", true),
            PathBuf::from("/data/medium.pgn.white_phi_fromaction_sl-True-meta.json")
        );
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TensorCache::new(dir.path().join("games.pgn"));
        let mut set = sample_set();
        set.y2 = Some(Array1::from(vec![0.5, 0.25, 0.125]).into_dyn());
        cache.save("random_white_state", false, &set).unwrap();

        let loaded = cache.load("random_white_state", false).unwrap();
        assert_eq!(loaded, set);
        let manifest = cache.load_manifest("random_white_state", false).unwrap();
        assert_eq!(manifest.samples, 3);
        assert_eq!(manifest.x_shape, vec![3, 4]);
        assert!(cache.load("random_white_state", true).is_err());
    }

    #[test]
    fn test_load_or_build_writes_through_once() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TensorCache::new(dir.path().join("games.pgn"));
        let builds = Cell::new(0);
        let build = || {
            builds.set(builds.get() + 1);
            Ok(sample_set())
        };

        let first = cache.load_or_build("random_black_state", false, false, build).unwrap();
        let second = cache.load_or_build("random_black_state", false, false, build).unwrap();
        assert_eq!(first, second);
        assert_eq!(builds.get(), 1);

        cache.load_or_build("random_black_state", false, true, build).unwrap();
        assert_eq!(builds.get(), 2);
    }

    #[test]
    fn test_shape_mismatch_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TensorCache::new(dir.path().join("games.pgn"));
        cache.save("random_black_state", false, &sample_set()).unwrap();
        let other = Array1::from(vec![1.0, 2.0]).into_dyn();
        write_npy(&cache.array_path("random_black_state", false, "y"), &other).unwrap();

        assert!(matches!(
            cache.load("random_black_state", false),
            Err(DatasetError::Cache { .. })
        ));
        let rebuilt = cache
            .load_or_build("random_black_state", false, false, || Ok(sample_set()))
            .unwrap();
        assert_eq!(rebuilt.y.shape(), &[3]);
    }
}

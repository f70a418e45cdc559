use log::debug;
use ndarray::{ArrayD, Axis, IxDyn};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::cache::{TensorCache, TensorSet};
use crate::config::DatasetConfig;
use crate::encoding::{NUM_FEATURIZED_CHANNELS, NUM_STATE_CHANNELS};
use crate::error::{DatasetError, Result};
use crate::generators::{
    load_test_suite, RandomBlackStates, RandomWhiteStates, StateActionBatches, TestSuite,
    Transitions,
};
use crate::geometry::{NUM_COLS, NUM_ROWS, NUM_SQUARES};
use crate::position::NUM_PIECES;

/// Which action labels a state-action variant keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionLabels {
    FromAndTo,
    From,
    To,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeneratorKind {
    WhiteStateAction,
    WhiteStateFromAction,
    WhiteStateToAction,
    WhitePhiFromAction,
    WhitePhiToAction,
    RandomWhiteState,
    RandomBlackState,
    WhiteSarsa,
    StrategicTestSuite,
}

impl GeneratorKind {
    pub const ALL: [GeneratorKind; 9] = [
        GeneratorKind::WhiteStateAction,
        GeneratorKind::WhiteStateFromAction,
        GeneratorKind::WhiteStateToAction,
        GeneratorKind::WhitePhiFromAction,
        GeneratorKind::WhitePhiToAction,
        GeneratorKind::RandomWhiteState,
        GeneratorKind::RandomBlackState,
        GeneratorKind::WhiteSarsa,
        GeneratorKind::StrategicTestSuite,
    ];

    pub fn name(self) -> &'static str {
        match self {
            GeneratorKind::WhiteStateAction => "white_state_action_sl",
            GeneratorKind::WhiteStateFromAction => "white_state_fromaction_sl",
            GeneratorKind::WhiteStateToAction => "white_state_toaction_sl",
            GeneratorKind::WhitePhiFromAction => "white_phi_fromaction_sl",
            GeneratorKind::WhitePhiToAction => "white_phi_toaction_sl",
            GeneratorKind::RandomWhiteState => "random_white_state",
            GeneratorKind::RandomBlackState => "random_black_state",
            GeneratorKind::WhiteSarsa => "white_sarsa",
            GeneratorKind::StrategicTestSuite => "strategic_test_suite",
        }
    }

    /// The `phi` variants always featurize.
    pub fn featurized(self, requested: bool) -> bool {
        match self {
            GeneratorKind::WhitePhiFromAction | GeneratorKind::WhitePhiToAction => true,
            _ => requested,
        }
    }

    pub fn action_labels(self) -> Option<ActionLabels> {
        match self {
            GeneratorKind::WhiteStateAction => Some(ActionLabels::FromAndTo),
            GeneratorKind::WhiteStateFromAction | GeneratorKind::WhitePhiFromAction => {
                Some(ActionLabels::From)
            }
            GeneratorKind::WhiteStateToAction | GeneratorKind::WhitePhiToAction => {
                Some(ActionLabels::To)
            }
            _ => None,
        }
    }
}

impl fmt::Display for GeneratorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for GeneratorKind {
    type Err = DatasetError;

    fn from_str(s: &str) -> Result<Self> {
        GeneratorKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.name() == s.trim())
            .ok_or_else(|| DatasetError::UnknownGenerator(s.to_string()))
    }
}

/// Rows of one output array, flattened in arrival order.
struct Column {
    data: Vec<f32>,
    row_shape: Vec<usize>,
}

impl Column {
    fn new(row_shape: &[usize]) -> Self {
        Self {
            data: Vec::new(),
            row_shape: row_shape.to_vec(),
        }
    }

    fn extend(&mut self, values: impl IntoIterator<Item = f32>) {
        self.data.extend(values);
    }

    fn push(&mut self, value: f32) {
        self.data.push(value);
    }

    fn into_array(self, rows: usize) -> Result<ArrayD<f32>> {
        let mut shape = Vec::with_capacity(self.row_shape.len() + 1);
        shape.push(rows);
        shape.extend_from_slice(&self.row_shape);
        ArrayD::from_shape_vec(IxDyn(&shape), self.data).map_err(|e| DatasetError::Cache {
            path: PathBuf::new(),
            reason: format!("collected rows do not fit {:?}: {}", shape, e),
        })
    }
}

/// A game file (or EPD suite) together with the settings its generators use.
pub struct Dataset {
    path: PathBuf,
    config: DatasetConfig,
}

impl Dataset {
    pub fn new(path: impl AsRef<Path>, config: DatasetConfig) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            config,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &DatasetConfig {
        &self.config
    }

    pub fn state_action_batches(&self, featurized: bool) -> Result<StateActionBatches> {
        StateActionBatches::open(&self.path, &self.config, featurized)
    }

    pub fn random_white_states(&self, featurized: bool) -> Result<RandomWhiteStates> {
        RandomWhiteStates::open(&self.path, &self.config, featurized)
    }

    pub fn random_black_states(&self, featurized: bool) -> Result<RandomBlackStates> {
        RandomBlackStates::open(&self.path, &self.config, featurized)
    }

    pub fn transitions(&self) -> Result<Transitions> {
        Transitions::open(&self.path, &self.config)
    }

    pub fn strategic_test_suite(&self, featurized: bool) -> Result<TestSuite> {
        load_test_suite(&self.path, featurized)
    }

    /// Runs a generator once over the whole file and collects its output.
    pub fn build(&self, kind: GeneratorKind, featurized: bool) -> Result<TensorSet> {
        let featurized = kind.featurized(featurized);
        let config = self.config.clone().with_loop(false);
        let channels = if featurized {
            NUM_FEATURIZED_CHANNELS
        } else {
            NUM_STATE_CHANNELS
        };
        let state_shape = [channels, NUM_ROWS, NUM_COLS];
        let mut x = Column::new(&state_shape);

        let set = match kind {
            GeneratorKind::WhiteSarsa => {
                return Err(DatasetError::UnsupportedGenerator(kind.name().to_string()))
            }
            GeneratorKind::RandomWhiteState => {
                let mut actions = Column::new(&[]);
                let mut outcomes = Column::new(&[]);
                let mut rows = 0;
                for sample in RandomWhiteStates::open(&self.path, &config, featurized)? {
                    let sample = sample?;
                    x.extend(sample.state.iter().copied());
                    actions.push(sample.action as f32);
                    outcomes.push(sample.outcome);
                    rows += 1;
                }
                TensorSet {
                    x: x.into_array(rows)?,
                    y: actions.into_array(rows)?,
                    y2: Some(outcomes.into_array(rows)?),
                }
            }
            GeneratorKind::RandomBlackState => {
                let mut rewards = Column::new(&[]);
                let mut rows = 0;
                for sample in RandomBlackStates::open(&self.path, &config, featurized)? {
                    let sample = sample?;
                    x.extend(sample.state.iter().copied());
                    rewards.push(sample.reward);
                    rows += 1;
                }
                TensorSet {
                    x: x.into_array(rows)?,
                    y: rewards.into_array(rows)?,
                    y2: None,
                }
            }
            GeneratorKind::StrategicTestSuite => {
                let suite = load_test_suite(&self.path, featurized)?;
                TensorSet {
                    x: suite.states.into_dyn(),
                    y: suite.actions.into_dyn(),
                    y2: None,
                }
            }
            _ => {
                let labels = kind.action_labels().unwrap_or(ActionLabels::FromAndTo);
                let mut from = Column::new(&[NUM_SQUARES]);
                let mut to = Column::new(&[NUM_SQUARES]);
                let mut rows = 0;
                for batch in StateActionBatches::open(&self.path, &config, featurized)? {
                    let batch = batch?;
                    x.extend(batch.states.iter().copied());
                    from.extend(batch.from.iter().copied());
                    to.extend(batch.to.iter().copied());
                    rows += batch.len();
                }
                match labels {
                    ActionLabels::FromAndTo => TensorSet {
                        x: x.into_array(rows)?,
                        y: from.into_array(rows)?,
                        y2: Some(to.into_array(rows)?),
                    },
                    ActionLabels::From => TensorSet {
                        x: x.into_array(rows)?,
                        y: from.into_array(rows)?,
                        y2: None,
                    },
                    ActionLabels::To => TensorSet {
                        x: x.into_array(rows)?,
                        y: to.into_array(rows)?,
                        y2: None,
                    },
                }
            }
        };
        debug!("built {} samples of {} from {}", set.len(), kind, self.path.display());
        Ok(set)
    }

    /// Cached arrays for `kind`, rebuilt when missing, inconsistent or when
    /// `refresh` is set.
    pub fn load(&self, kind: GeneratorKind, featurized: bool, refresh: bool) -> Result<TensorSet> {
        if kind == GeneratorKind::WhiteSarsa {
            return Err(DatasetError::UnsupportedGenerator(kind.name().to_string()));
        }
        let featurized = kind.featurized(featurized);
        TensorCache::new(&self.path).load_or_build(kind.name(), featurized, refresh, || {
            self.build(kind, featurized)
        })
    }
}

/// Piece-kind counts of the best moves in a suite, pawn first.
pub fn best_move_kinds(suite: &TestSuite) -> [usize; NUM_PIECES] {
    let mut counts = [0; NUM_PIECES];
    for row in suite.actions.axis_iter(Axis(0)) {
        if let Some(kind) = row.iter().position(|&v| v == 1.0) {
            counts[kind] += 1;
        }
    }
    counts
}

use log::debug;
use ndarray::{Array1, Array2, Array3, Array4, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::path::Path;

use crate::config::DatasetConfig;
use crate::encoding::{action_one_hot, dense_state, NUM_FEATURIZED_CHANNELS, NUM_STATE_CHANNELS};
use crate::error::Result;
use crate::game::{GameRecord, MalformedGame};
use crate::generators::{log_malformed, step, warn_empty_pass, GameStream, StreamEvent};
use crate::geometry::{NUM_COLS, NUM_ROWS, NUM_SQUARES};
use crate::pgn::GameReader;

const LABEL: &str = "state-action";

/// A white-to-move position and the move White played from it.
#[derive(Debug, Clone, PartialEq)]
pub struct StateActionSample {
    pub state: Array3<f32>,
    pub from: Array1<f32>,
    pub to: Array1<f32>,
}

/// A full batch: `states [n, C, 8, 8]`, `from [n, 64]`, `to [n, 64]`.
#[derive(Debug, Clone, PartialEq)]
pub struct StateActionBatch {
    pub states: Array4<f32>,
    pub from: Array2<f32>,
    pub to: Array2<f32>,
}

impl StateActionBatch {
    fn stack(samples: &[StateActionSample], channels: usize) -> Self {
        let n = samples.len();
        let mut batch = Self {
            states: Array4::zeros((n, channels, NUM_ROWS, NUM_COLS)),
            from: Array2::zeros((n, NUM_SQUARES)),
            to: Array2::zeros((n, NUM_SQUARES)),
        };
        for (i, sample) in samples.iter().enumerate() {
            batch.states.index_axis_mut(Axis(0), i).assign(&sample.state);
            batch.from.index_axis_mut(Axis(0), i).assign(&sample.from);
            batch.to.index_axis_mut(Axis(0), i).assign(&sample.to);
        }
        batch
    }

    pub fn len(&self) -> usize {
        self.states.len_of(Axis(0))
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Samples of every white move in a game, in order. A move that fails to
/// resolve ends the game; samples before it are kept.
pub fn white_move_samples(
    game: &GameRecord,
    featurized: bool,
) -> (Vec<StateActionSample>, Option<MalformedGame>) {
    let mut samples = Vec::new();
    let replay = match game.replay() {
        Ok(replay) => replay,
        Err(malformed) => return (samples, Some(malformed)),
    };
    for ply in replay {
        let ply = match ply {
            Ok(ply) => ply,
            Err(malformed) => return (samples, Some(malformed)),
        };
        if ply.index % 2 == 0 {
            let (from, to) = action_one_hot(ply.mv);
            samples.push(StateActionSample {
                state: dense_state(&ply.before.position(), featurized),
                from,
                to,
            });
        }
    }
    (samples, None)
}

/// Shuffled fixed-size batches of (state, from, to) over the white moves of
/// every usable game. A trailing partial batch is dropped.
pub struct StateActionBatches {
    stream: GameStream,
    featurized: bool,
    batch_size: usize,
    rng: StdRng,
    buffer: Vec<StateActionSample>,
    pending: std::vec::IntoIter<StateActionSample>,
    samples_this_pass: usize,
    batches: usize,
    done: bool,
}

impl StateActionBatches {
    pub fn open(path: impl AsRef<Path>, config: &DatasetConfig, featurized: bool) -> Result<Self> {
        Self::from_reader(GameReader::open(path)?, config, featurized)
    }

    pub fn from_reader(
        reader: GameReader,
        config: &DatasetConfig,
        featurized: bool,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            stream: GameStream::new(
                LABEL,
                reader,
                config.min_plies_sequential,
                config.loop_forever,
            ),
            featurized,
            batch_size: config.batch_size,
            rng: config.rng(),
            buffer: Vec::with_capacity(config.batch_size),
            pending: Vec::new().into_iter(),
            samples_this_pass: 0,
            batches: 0,
            done: false,
        })
    }

    pub fn channels(&self) -> usize {
        if self.featurized {
            NUM_FEATURIZED_CHANNELS
        } else {
            NUM_STATE_CHANNELS
        }
    }

    fn advance(&mut self) -> Result<Option<StateActionBatch>> {
        let channels = self.channels();
        loop {
            for sample in self.pending.by_ref() {
                self.buffer.push(sample);
                self.samples_this_pass += 1;
                if self.buffer.len() == self.batch_size {
                    self.buffer.shuffle(&mut self.rng);
                    let batch = StateActionBatch::stack(&self.buffer, channels);
                    self.buffer.clear();
                    self.batches += 1;
                    debug!("{}: emitting batch {}", self.stream.label(), self.batches);
                    return Ok(Some(batch));
                }
            }

            match self.stream.next_event()? {
                StreamEvent::Game(game) => {
                    let (samples, malformed) = white_move_samples(&game, self.featurized);
                    if let Some(malformed) = malformed {
                        log_malformed(self.stream.label(), &malformed);
                    }
                    self.pending = samples.into_iter();
                }
                StreamEvent::Rewound => {
                    if self.samples_this_pass == 0 {
                        warn_empty_pass(self.stream.label());
                        return Ok(None);
                    }
                    self.samples_this_pass = 0;
                }
                StreamEvent::Exhausted => {
                    if !self.buffer.is_empty() {
                        debug!(
                            "{}: dropping {} samples that do not fill a batch",
                            self.stream.label(),
                            self.buffer.len()
                        );
                        self.buffer.clear();
                    }
                    return Ok(None);
                }
            }
        }
    }
}

impl Iterator for StateActionBatches {
    type Item = Result<StateActionBatch>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let next = self.advance();
        step(&mut self.done, next)
    }
}

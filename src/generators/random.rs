use log::debug;
use ndarray::Array3;
use rand::rngs::StdRng;
use rand::Rng;
use std::path::Path;

use crate::config::DatasetConfig;
use crate::encoding::{combined_action_index, dense_state};
use crate::error::Result;
use crate::game::{GameRecord, MalformedGame, Outcome};
use crate::generators::{log_malformed, step, warn_empty_pass, GameStream, StreamEvent};
use crate::pgn::GameReader;

/// Value target for a position `moves_remaining` moves before the end.
pub fn discounted_reward(outcome: Outcome, moves_remaining: usize, gamma: f32) -> f32 {
    gamma.powi(moves_remaining as i32) * outcome.value()
}

/// Samples emitted in the current pass, and in the whole last pass once
/// the stream has looped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamProgress {
    pub cursor: usize,
    pub total_seen: usize,
    /// Usable games whose sampled position could not be reached.
    pub malformed: usize,
}

impl StreamProgress {
    fn advance(&mut self) {
        self.cursor += 1;
    }

    fn rewind(&mut self) {
        self.total_seen = self.cursor;
        self.cursor = 0;
    }
}

/// A white-to-move position, the move played from it and the final result.
#[derive(Debug, Clone, PartialEq)]
pub struct WhiteSample {
    pub state: Array3<f32>,
    pub action: usize,
    pub outcome: f32,
    pub ply: usize,
}

/// A black-to-move position with its discounted result.
#[derive(Debug, Clone, PartialEq)]
pub struct BlackSample {
    pub state: Array3<f32>,
    pub reward: f32,
    pub ply: usize,
    pub moves_remaining: usize,
}

/// Shared driver: one sample per usable game, rewinding in loop mode.
struct RandomSampler {
    stream: GameStream,
    featurized: bool,
    gamma: f32,
    rng: StdRng,
    progress: StreamProgress,
    done: bool,
}

impl RandomSampler {
    fn new(
        label: &'static str,
        reader: GameReader,
        config: &DatasetConfig,
        featurized: bool,
    ) -> Self {
        Self {
            stream: GameStream::new(label, reader, config.min_plies_random, config.loop_forever),
            featurized,
            gamma: config.gamma,
            rng: config.rng(),
            progress: StreamProgress::default(),
            done: false,
        }
    }

    /// Picks `k` uniformly in `[1, plies / 2]`.
    fn pick_turn(&mut self, game: &GameRecord) -> usize {
        let turns = (game.ply_count() / 2).max(1);
        self.rng.gen_range(1..=turns)
    }

    fn advance<T>(
        &mut self,
        mut sample: impl FnMut(&mut Self, &GameRecord) -> std::result::Result<T, MalformedGame>,
    ) -> Result<Option<T>> {
        loop {
            match self.stream.next_event()? {
                StreamEvent::Game(game) => match sample(self, &game) {
                    Ok(item) => {
                        self.progress.advance();
                        debug!(
                            "{}: sample {} from game #{}",
                            self.stream.label(),
                            self.progress.cursor,
                            game.number
                        );
                        return Ok(Some(item));
                    }
                    Err(malformed) => {
                        self.progress.malformed += 1;
                        log_malformed(self.stream.label(), &malformed);
                    }
                },
                StreamEvent::Rewound => {
                    if self.progress.cursor == 0 {
                        warn_empty_pass(self.stream.label());
                        return Ok(None);
                    }
                    self.progress.rewind();
                }
                StreamEvent::Exhausted => return Ok(None),
            }
        }
    }
}

/// One random white-to-move position per usable game.
pub struct RandomWhiteStates {
    sampler: RandomSampler,
}

impl RandomWhiteStates {
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
            sampler: RandomSampler::new("random-white", reader, config, featurized),
        })
    }

    pub fn progress(&self) -> StreamProgress {
        self.sampler.progress
    }

    /// The `k`-th white turn is ply `2(k - 1)`.
    fn sample(
        sampler: &mut RandomSampler,
        game: &GameRecord,
    ) -> std::result::Result<WhiteSample, MalformedGame> {
        let outcome = game.outcome()?;
        let ply = 2 * (sampler.pick_turn(game) - 1);
        let mut replay = game.replay()?;
        for _ in 0..ply {
            replay.next_ply()?;
        }
        let mv = match replay.peek_move() {
            Some(mv) => mv?,
            None => {
                return Err(game.malformed(format!(
                    "no recorded move at ply {} of {}",
                    ply,
                    game.moves.len()
                )))
            }
        };
        let board = *replay.board();
        Ok(WhiteSample {
            state: dense_state(&board.position(), sampler.featurized),
            action: combined_action_index(mv),
            outcome: outcome.value(),
            ply,
        })
    }
}

impl Iterator for RandomWhiteStates {
    type Item = Result<WhiteSample>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.sampler.done {
            return None;
        }
        let next = self.sampler.advance(Self::sample);
        step(&mut self.sampler.done, next)
    }
}

/// One random black-to-move position per usable game, valued by the
/// discounted final result.
pub struct RandomBlackStates {
    sampler: RandomSampler,
}

impl RandomBlackStates {
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
            sampler: RandomSampler::new("random-black", reader, config, featurized),
        })
    }

    pub fn progress(&self) -> StreamProgress {
        self.sampler.progress
    }

    /// The `k`-th black turn is ply `2k - 1`.
    fn sample(
        sampler: &mut RandomSampler,
        game: &GameRecord,
    ) -> std::result::Result<BlackSample, MalformedGame> {
        let outcome = game.outcome()?;
        let plies = game.ply_count();
        let ply = 2 * sampler.pick_turn(game) - 1;
        let board = game.board_at(ply)?;
        let moves_remaining = plies.saturating_sub(ply) / 2;
        Ok(BlackSample {
            state: dense_state(&board.position(), sampler.featurized),
            reward: discounted_reward(outcome, moves_remaining, sampler.gamma),
            ply,
            moves_remaining,
        })
    }
}

impl Iterator for RandomBlackStates {
    type Item = Result<BlackSample>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.sampler.done {
            return None;
        }
        let next = self.sampler.advance(Self::sample);
        step(&mut self.sampler.done, next)
    }
}

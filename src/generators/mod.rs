use log::{info, warn};

use crate::error::Result;
use crate::game::{GameRecord, MalformedGame};
use crate::pgn::GameReader;

pub mod random;
pub mod sequential;
pub mod test_suite;
pub mod transitions;

pub use random::{
    discounted_reward, BlackSample, RandomBlackStates, RandomWhiteStates, StreamProgress,
    WhiteSample,
};
pub use sequential::{StateActionBatch, StateActionBatches};
pub use test_suite::{load_test_suite, parse_epd_line, TestPosition, TestSuite};
pub use transitions::{Transition, Transitions};

pub(crate) enum StreamEvent {
    Game(GameRecord),
    /// End of file reached and the reader was rewound to the first game.
    Rewound,
    Exhausted,
}

/// Pulls games for a generator: applies the skip rule (too short, forfeited),
/// logs games that fail to parse and rewinds the file when looping.
pub(crate) struct GameStream {
    reader: GameReader,
    label: &'static str,
    min_plies: usize,
    loop_forever: bool,
    passes: usize,
}

impl GameStream {
    pub fn new(
        label: &'static str,
        reader: GameReader,
        min_plies: usize,
        loop_forever: bool,
    ) -> Self {
        Self {
            reader,
            label,
            min_plies,
            loop_forever,
            passes: 0,
        }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn next_event(&mut self) -> Result<StreamEvent> {
        loop {
            match self.reader.next_game()? {
                Some(Ok(game)) => {
                    if game.is_usable(self.min_plies) {
                        return Ok(StreamEvent::Game(game));
                    }
                }
                Some(Err(malformed)) => log_malformed(self.label, &malformed),
                None if self.loop_forever => {
                    self.passes += 1;
                    info!(
                        "{}: end of dataset after {} games, looping (pass {})",
                        self.label,
                        self.reader.games_read(),
                        self.passes + 1
                    );
                    self.reader.rewind()?;
                    return Ok(StreamEvent::Rewound);
                }
                None => return Ok(StreamEvent::Exhausted),
            }
        }
    }
}

pub(crate) fn log_malformed(label: &str, malformed: &MalformedGame) {
    warn!("{}: skipping malformed {}", label, malformed);
}

/// Ends a pass with no samples while looping, which would otherwise spin forever.
pub(crate) fn warn_empty_pass(label: &str) {
    warn!("{}: a full pass over the dataset produced no samples, stopping", label);
}

/// Converts one step of a fallible generator into iterator output, fusing
/// the iterator after the first error or the end of the stream.
pub(crate) fn step<T>(done: &mut bool, next: Result<Option<T>>) -> Option<Result<T>> {
    match next {
        Ok(Some(item)) => Some(Ok(item)),
        Ok(None) => {
            *done = true;
            None
        }
        Err(e) => {
            *done = true;
            Some(Err(e))
        }
    }
}

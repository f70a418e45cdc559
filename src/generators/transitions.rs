use chess::ChessMove;
use log::debug;
use std::path::Path;

use crate::board::Board;
use crate::config::DatasetConfig;
use crate::encoding::{compact_state, square_pair_index, CompactEmpty, CompactState};
use crate::error::Result;
use crate::game::{GameRecord, MalformedGame, Outcome};
use crate::generators::{log_malformed, step, warn_empty_pass, GameStream, StreamEvent};
use crate::pgn::GameReader;

const LABEL: &str = "sarsa";

/// One step of White's experience: White moves from `state` with `action`,
/// Black replies, and the walk lands in `next_state`.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub state: CompactState,
    pub action: usize,
    pub reward: f32,
    pub next_state: CompactState,
    /// White's following move, `None` when the game ends here.
    pub next_action: Option<usize>,
    pub new_game: bool,
}

struct GameWalk {
    game: GameRecord,
    board: Board,
    outcome: Outcome,
    ply: usize,
    limit: usize,
}

impl GameWalk {
    fn start(game: GameRecord) -> std::result::Result<Self, MalformedGame> {
        let outcome = game.outcome()?;
        let board = game.start_board()?;
        let limit = game.ply_count();
        Ok(Self {
            game,
            board,
            outcome,
            ply: 0,
            limit,
        })
    }

    fn is_finished(&self) -> bool {
        self.ply >= self.limit
    }

    fn has_recorded_move(&self) -> bool {
        self.ply < self.limit && self.ply < self.game.moves.len()
    }

    fn resolve_next(&self) -> std::result::Result<ChessMove, MalformedGame> {
        let Some(san) = self.game.moves.get(self.ply) else {
            let mut malformed = self.game.malformed("ply count exceeds the recorded moves");
            malformed.ply = Some(self.ply);
            return Err(malformed);
        };
        self.board.parse_san(san).map_err(|e| {
            let mut malformed = self.game.malformed(e.to_string());
            malformed.ply = Some(self.ply);
            malformed.san = Some(san.clone());
            malformed.fen = Some(self.board.to_fen());
            malformed
        })
    }

    fn play(&mut self, mv: ChessMove) {
        self.board = self.board.make_move(mv);
        self.ply += 1;
    }

    /// White's move and Black's reply, as one transition.
    fn step(&mut self, empty: CompactEmpty) -> std::result::Result<Transition, MalformedGame> {
        let new_game = self.ply == 0;
        let state = compact_state(&self.board.position(), empty);

        let white = self.resolve_next()?;
        self.play(white);
        if self.has_recorded_move() {
            let black = self.resolve_next()?;
            self.play(black);
        }

        let next_action = if self.has_recorded_move() {
            self.resolve_next().ok().map(square_pair_index)
        } else {
            None
        };
        let reward = if self.is_finished() { self.outcome.value() } else { 0.0 };

        Ok(Transition {
            state,
            action: square_pair_index(white),
            reward,
            next_state: compact_state(&self.board.position(), empty),
            next_action,
            new_game,
        })
    }
}

/// (s, a, r, s', a') transitions over every usable game, for tabular TD
/// methods. A game is walked for at most its declared ply count.
pub struct Transitions {
    stream: GameStream,
    empty: CompactEmpty,
    walk: Option<GameWalk>,
    emitted_this_pass: usize,
    done: bool,
}

impl Transitions {
    pub fn open(path: impl AsRef<Path>, config: &DatasetConfig) -> Result<Self> {
        Self::from_reader(GameReader::open(path)?, config)
    }

    pub fn from_reader(reader: GameReader, config: &DatasetConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            stream: GameStream::new(
                LABEL,
                reader,
                config.min_plies_sequential,
                config.loop_forever,
            ),
            empty: config.compact_empty,
            walk: None,
            emitted_this_pass: 0,
            done: false,
        })
    }

    fn advance(&mut self) -> Result<Option<Transition>> {
        loop {
            if let Some(walk) = self.walk.as_mut().filter(|walk| !walk.is_finished()) {
                match walk.step(self.empty) {
                    Ok(transition) => {
                        self.emitted_this_pass += 1;
                        return Ok(Some(transition));
                    }
                    Err(malformed) => {
                        log_malformed(self.stream.label(), &malformed);
                        self.walk = None;
                    }
                }
                continue;
            }

            match self.stream.next_event()? {
                StreamEvent::Game(game) => {
                    debug!("{}: walking game #{}", self.stream.label(), game.number);
                    match GameWalk::start(game) {
                        Ok(walk) => self.walk = Some(walk),
                        Err(malformed) => log_malformed(self.stream.label(), &malformed),
                    }
                }
                StreamEvent::Rewound => {
                    if self.emitted_this_pass == 0 {
                        warn_empty_pass(self.stream.label());
                        return Ok(None);
                    }
                    self.emitted_this_pass = 0;
                }
                StreamEvent::Exhausted => return Ok(None),
            }
        }
    }
}

impl Iterator for Transitions {
    type Item = Result<Transition>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let next = self.advance();
        step(&mut self.done, next)
    }
}

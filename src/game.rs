use chess::ChessMove;
use std::collections::HashMap;
use std::fmt;

use crate::board::Board;
use crate::error::{DatasetError, Result};

/// Marker in the final comment of a game that was forfeited.
pub const FORFEIT_MARKER: &str = "forfeit";

/// Final result of a game from White's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    WhiteWin,
    BlackWin,
    Draw,
}

impl Outcome {
    pub fn from_result(result: &str) -> Result<Self> {
        match result.trim() {
            "1-0" => Ok(Outcome::WhiteWin),
            "0-1" => Ok(Outcome::BlackWin),
            "1/2-1/2" => Ok(Outcome::Draw),
            other => Err(DatasetError::UnknownResult(other.to_string())),
        }
    }

    /// +1 for a White win, -1 for a Black win, 0 for a draw.
    pub fn value(self) -> f32 {
        match self {
            Outcome::WhiteWin => 1.0,
            Outcome::BlackWin => -1.0,
            Outcome::Draw => 0.0,
        }
    }
}

/// One game as read from a PGN file: its tag pairs and its mainline in SAN.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GameRecord {
    /// 1-based position of the game in its file.
    pub number: usize,
    pub headers: HashMap<String, String>,
    pub moves: Vec<String>,
    /// Comment following the last mainline move (or preceding the first
    /// move when the game has none).
    pub final_comment: Option<String>,
    /// Termination marker from the movetext (`1-0`, `*`, ...).
    pub result_token: Option<String>,
}

impl GameRecord {
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key).map(String::as_str)
    }

    /// Declared length in plies: the PlyCount header when it parses,
    /// otherwise the recorded mainline length.
    pub fn ply_count(&self) -> usize {
        self.header("PlyCount")
            .and_then(|count| count.trim().parse().ok())
            .unwrap_or(self.moves.len())
    }

    pub fn is_forfeit(&self) -> bool {
        self.final_comment
            .as_deref()
            .map_or(false, |comment| comment.contains(FORFEIT_MARKER))
    }

    /// A game is usable when it is long enough and was not forfeited.
    pub fn is_usable(&self, min_plies: usize) -> bool {
        self.ply_count() >= min_plies && !self.is_forfeit()
    }

    pub fn outcome(&self) -> std::result::Result<Outcome, MalformedGame> {
        let result = self
            .header("Result")
            .or(self.result_token.as_deref())
            .unwrap_or("");
        Outcome::from_result(result).map_err(|e| self.malformed(e.to_string()))
    }

    /// Starting position: the FEN header when present, else the standard one.
    pub fn start_board(&self) -> std::result::Result<Board, MalformedGame> {
        match self.header("FEN") {
            Some(fen) => Board::from_fen(fen).map_err(|e| self.malformed(e.to_string())),
            None => Ok(Board::default()),
        }
    }

    /// Walks the recorded mainline one ply at a time.
    pub fn replay(&self) -> std::result::Result<Replay<'_>, MalformedGame> {
        Ok(Replay {
            game: self,
            board: self.start_board()?,
            index: 0,
            fused: false,
        })
    }

    /// Position after the first `plies` recorded moves.
    pub fn board_at(&self, plies: usize) -> std::result::Result<Board, MalformedGame> {
        if plies > self.moves.len() {
            return Err(self.malformed(format!(
                "position after ply {} requested but only {} moves are recorded",
                plies,
                self.moves.len()
            )));
        }
        let mut replay = self.replay()?;
        for _ in 0..plies {
            replay.next_ply()?;
        }
        Ok(replay.board)
    }

    pub fn malformed(&self, reason: impl Into<String>) -> MalformedGame {
        MalformedGame {
            number: self.number,
            event: self.header("Event").map(str::to_string),
            white: self.header("White").map(str::to_string),
            black: self.header("Black").map(str::to_string),
            plies: self.ply_count(),
            ply: None,
            san: None,
            fen: None,
            reason: reason.into(),
        }
    }
}

/// A move played during replay, with the position it was played from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ply<'a> {
    pub index: usize,
    pub before: Board,
    pub mv: ChessMove,
    pub san: &'a str,
}

/// Mainline replay. After a move fails to resolve the replay yields that
/// error once and then stops.
#[derive(Debug)]
pub struct Replay<'a> {
    game: &'a GameRecord,
    board: Board,
    index: usize,
    fused: bool,
}

impl<'a> Replay<'a> {
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Number of plies played so far.
    pub fn plies_played(&self) -> usize {
        self.index
    }

    pub fn is_finished(&self) -> bool {
        self.fused || self.index >= self.game.moves.len()
    }

    /// Resolves the next recorded move without playing it.
    pub fn peek_move(&self) -> Option<std::result::Result<ChessMove, MalformedGame>> {
        if self.is_finished() {
            return None;
        }
        let san = &self.game.moves[self.index];
        Some(self.board.parse_san(san).map_err(|e| self.fail(san, e)))
    }

    pub fn next_ply(&mut self) -> std::result::Result<Ply<'a>, MalformedGame> {
        let game = self.game;
        let Some(san) = game.moves.get(self.index).filter(|_| !self.fused) else {
            return Err(game.malformed(format!("ply {} is beyond the recorded moves", self.index)));
        };
        let mv = match self.board.parse_san(san) {
            Ok(mv) => mv,
            Err(e) => {
                self.fused = true;
                return Err(self.fail(san, e));
            }
        };
        let before = self.board;
        self.board = before.make_move(mv);
        let ply = Ply {
            index: self.index,
            before,
            mv,
            san: san.as_str(),
        };
        self.index += 1;
        Ok(ply)
    }

    fn fail(&self, san: &str, error: DatasetError) -> MalformedGame {
        let mut malformed = self.game.malformed(error.to_string());
        malformed.ply = Some(self.index);
        malformed.san = Some(san.to_string());
        malformed.fen = Some(self.board.to_fen());
        malformed
    }
}

impl<'a> Iterator for Replay<'a> {
    type Item = std::result::Result<Ply<'a>, MalformedGame>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.is_finished() {
            return None;
        }
        Some(self.next_ply())
    }
}

/// A game that cannot be replayed, with enough context to find it again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedGame {
    pub number: usize,
    pub event: Option<String>,
    pub white: Option<String>,
    pub black: Option<String>,
    pub plies: usize,
    pub ply: Option<usize>,
    pub san: Option<String>,
    pub fen: Option<String>,
    pub reason: String,
}

impl fmt::Display for MalformedGame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let or_unknown = |value: &Option<String>| value.clone().unwrap_or_else(|| "?".to_string());
        write!(
            f,
            "game #{} ({} - {}, event {}, {} plies)",
            self.number,
            or_unknown(&self.white),
            or_unknown(&self.black),
            or_unknown(&self.event),
            self.plies
        )?;
        if let Some(ply) = self.ply {
            write!(f, " at ply {}", ply)?;
        }
        if let Some(san) = &self.san {
            write!(f, " move {}", san)?;
        }
        if let Some(fen) = &self.fen {
            write!(f, " from [{}]", fen)?;
        }
        write!(f, ": {}", self.reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess::{Piece, Square};

    fn record(moves: &[&str], headers: &[(&str, &str)]) -> GameRecord {
        GameRecord {
            number: 1,
            headers: headers.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
            moves: moves.iter().map(|m| m.to_string()).collect(),
            final_comment: None,
            result_token: None,
        }
    }

    #[test]
    fn test_outcome_mapping() {
        assert_eq!(Outcome::from_result("1-0").unwrap().value(), 1.0);
        assert_eq!(Outcome::from_result("0-1").unwrap().value(), -1.0);
        assert_eq!(Outcome::from_result("1/2-1/2").unwrap().value(), 0.0);
        assert!(matches!(Outcome::from_result("*"), Err(DatasetError::UnknownResult(_))));
    }

    #[test]
    fn test_ply_count_prefers_header() {
        let game = record(&["e4", "e5"], &[("PlyCount", "40")]);
        assert_eq!(game.ply_count(), 40);
        let game = record(&["e4", "e5"], &[("PlyCount", "lots")]);
        assert_eq!(game.ply_count(), 2);
        let game = record(&["e4", "e5", "Nf3"], &[]);
        assert_eq!(game.ply_count(), 3);
    }

    #[test]
    fn test_usability_filters() {
        let mut game = record(&["e4", "e5", "Nf3", "Nc6", "Bb5"], &[]);
        assert!(game.is_usable(5));
        assert!(!game.is_usable(6));
        game.final_comment = Some("Time forfeit".to_string());
        assert!(game.is_forfeit());
        assert!(!game.is_usable(2));
    }

    #[test]
    fn test_replay_and_board_at() {
        let game = record(&["e4", "e5", "Nf3"], &[]);
        let plies: Vec<_> = game.replay().unwrap().map(|p| p.unwrap()).collect();
        assert_eq!(plies.len(), 3);
        assert_eq!(plies[2].mv, ChessMove::new(Square::G1, Square::F3, None));
        assert_eq!(plies[1].before.get_piece_at(Square::E4), Some(Piece::Pawn));

        let board = game.board_at(2).unwrap();
        assert_eq!(board.get_piece_at(Square::E5), Some(Piece::Pawn));
        assert!(game.board_at(4).is_err());
    }

    #[test]
    fn test_replay_stops_at_bad_move() {
        let game = record(&["e4", "e5", "Qh6", "Nf6"], &[("White", "A"), ("Black", "B")]);
        let results: Vec<_> = game.replay().unwrap().collect();
        assert_eq!(results.len(), 3);
        let err = results[2].clone().unwrap_err();
        assert_eq!(err.ply, Some(2));
        assert_eq!(err.san.as_deref(), Some("Qh6"));
        assert!(err.to_string().contains("A - B"));
    }

    #[test]
    fn test_fen_header_sets_start() {
        let game = record(
            &["Kb1"],
            &[("FEN", "8/8/8/8/8/8/8/K6k w - - 0 1"), ("SetUp", "1")],
        );
        let board = game.board_at(1).unwrap();
        assert_eq!(board.get_piece_at(Square::B1), Some(Piece::King));
    }

    #[test]
    fn test_kingless_fen_header_is_malformed() {
        let game = record(&["e3"], &[("FEN", "8/8/8/8/8/8/4P3/8 w - - 0 1"), ("SetUp", "1")]);
        let err = game.replay().unwrap_err();
        assert!(err.reason.contains("king"), "{}", err.reason);
    }

    #[test]
    fn test_ambiguous_move_is_malformed() {
        // both knights reach d2 after 1. e4 e5 2. Nf3 Nc6 3. d3 Nf6
        let game = record(&["e4", "e5", "Nf3", "Nc6", "d3", "Nf6", "Nd2"], &[]);
        let results: Vec<_> = game.replay().unwrap().collect();
        assert_eq!(results.len(), 7);
        let err = results[6].clone().unwrap_err();
        assert_eq!(err.ply, Some(6));
        assert!(err.reason.contains("2 legal moves match"), "{}", err.reason);
    }
}

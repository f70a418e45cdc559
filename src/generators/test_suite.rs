use chess::ChessMove;
use log::{debug, warn};
use ndarray::{Array2, Array4, Axis};
use std::fs;
use std::path::Path;

use crate::board::Board;
use crate::encoding::{
    dense_state, moved_piece_one_hot, NUM_FEATURIZED_CHANNELS, NUM_STATE_CHANNELS,
};
use crate::error::{DatasetError, Result};
use crate::geometry::{NUM_COLS, NUM_ROWS};
use crate::position::NUM_PIECES;

/// One EPD record of a strategic test suite.
#[derive(Debug, Clone, PartialEq)]
pub struct TestPosition {
    pub id: Option<String>,
    pub board: Board,
    /// Candidate moves with their scores, in file order.
    pub scores: Vec<(ChessMove, i32)>,
    pub best_move: ChessMove,
}

/// Positions of a test suite stacked for evaluation: `states [n, C, 8, 8]`
/// and `actions [n, 6]`, the one-hot kind of the piece making the best move.
#[derive(Debug, Clone, PartialEq)]
pub struct TestSuite {
    pub ids: Vec<Option<String>>,
    pub states: Array4<f32>,
    pub actions: Array2<f32>,
}

impl TestSuite {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Parses `<fen fields> <op> <arg>; id "..."; c0 "Qd1+=10, Qe7=7";`.
pub fn parse_epd_line(line: &str) -> Result<TestPosition> {
    let invalid = |reason: String| DatasetError::InvalidEpd {
        line: line.trim().to_string(),
        reason,
    };
    let board = Board::from_epd(line)?;

    let mut id = None;
    let mut c0 = None;
    for operation in skip_fields(line, 4).split(';').map(str::trim) {
        if let Some(value) = operation_value(operation, "id") {
            id = Some(value.to_string());
        } else if let Some(value) = operation_value(operation, "c0") {
            c0 = Some(value);
        }
    }
    let c0 = c0.ok_or_else(|| invalid("missing c0 operation".to_string()))?;

    let mut scores = Vec::new();
    for entry in c0.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        // rsplit keeps promotions such as `e8=Q=10` intact
        let (san, score) = entry
            .rsplit_once('=')
            .ok_or_else(|| invalid(format!("c0 entry '{}' has no score", entry)))?;
        let score: i32 = score
            .trim()
            .parse()
            .map_err(|_| invalid(format!("c0 entry '{}' has a non-integer score", entry)))?;
        scores.push((board.parse_san(san.trim())?, score));
    }

    let mut best: Option<(ChessMove, i32)> = None;
    for &(mv, score) in &scores {
        if best.map_or(true, |(_, top)| score > top) {
            best = Some((mv, score));
        }
    }
    let (best_move, _) = best.ok_or_else(|| invalid("c0 lists no moves".to_string()))?;

    Ok(TestPosition {
        id,
        board,
        scores,
        best_move,
    })
}

/// The rest of `line` after its first `count` whitespace-separated fields,
/// with inner spacing left as written.
fn skip_fields(line: &str, count: usize) -> &str {
    let mut rest = line.trim_start();
    for _ in 0..count {
        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        rest = rest[end..].trim_start();
    }
    rest
}

/// Value of `<name> "<value>"`, or `None` when the operation has another name.
fn operation_value<'a>(operation: &'a str, name: &str) -> Option<&'a str> {
    let rest = operation.strip_prefix(name)?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let rest = rest.trim();
    Some(rest.strip_prefix('"').and_then(|r| r.strip_suffix('"')).unwrap_or(rest))
}

/// Loads every well-formed record of an EPD file. Malformed lines are
/// logged and skipped.
pub fn load_test_suite(path: impl AsRef<Path>, featurized: bool) -> Result<TestSuite> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|e| DatasetError::open(path, e))?;

    let mut positions = Vec::new();
    for (number, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match parse_epd_line(line) {
            Ok(position) => positions.push(position),
            Err(e) => warn!("{}:{}: skipping test position: {}", path.display(), number + 1, e),
        }
    }
    debug!("{}: loaded {} test positions", path.display(), positions.len());

    Ok(stack_positions(&positions, featurized))
}

fn stack_positions(positions: &[TestPosition], featurized: bool) -> TestSuite {
    let channels = if featurized {
        NUM_FEATURIZED_CHANNELS
    } else {
        NUM_STATE_CHANNELS
    };
    let n = positions.len();
    let mut suite = TestSuite {
        ids: Vec::with_capacity(n),
        states: Array4::zeros((n, channels, NUM_ROWS, NUM_COLS)),
        actions: Array2::zeros((n, NUM_PIECES)),
    };
    for (i, test) in positions.iter().enumerate() {
        let position = test.board.position();
        suite.ids.push(test.id.clone());
        suite
            .states
            .index_axis_mut(Axis(0), i)
            .assign(&dense_state(&position, featurized));
        // the best move is legal, so its source square is occupied
        if let Some(action) = moved_piece_one_hot(&position, test.best_move) {
            suite.actions.index_axis_mut(Axis(0), i).assign(&action);
        }
    }
    suite
}

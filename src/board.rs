use chess::{Board as ChessBoard, ChessMove, Color, Piece, Square};
use std::fmt;
use std::str::FromStr;

use crate::error::{DatasetError, Result};
use crate::pgn::san;
use crate::position::Position;

/// A playable game position: the `chess` crate board plus the conversions
/// the encoders need.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Board {
    inner: ChessBoard,
}

impl Board {
    pub fn new() -> Self {
        Self {
            inner: ChessBoard::default(),
        }
    }

    pub fn from_fen(fen: &str) -> Result<Self> {
        check_kings(fen, &Position::from_placement(fen)?)?;
        ChessBoard::from_str(fen.trim())
            .map(|board| Self { inner: board })
            .map_err(|e| DatasetError::InvalidFen {
                fen: fen.to_string(),
                reason: e.to_string(),
            })
    }

    /// Builds a board from the first four fields of an EPD record
    /// (placement, side to move, castling, en passant).
    pub fn from_epd(epd: &str) -> Result<Self> {
        let fields: Vec<&str> = epd.split_whitespace().take(4).collect();
        if fields.len() < 4 {
            return Err(DatasetError::InvalidEpd {
                line: epd.to_string(),
                reason: "expected placement, side, castling and en passant fields".to_string(),
            });
        }
        Self::from_fen(&format!("{} 0 1", fields.join(" ")))
    }

    pub fn make_move(&self, mv: ChessMove) -> Self {
        Self {
            inner: self.inner.make_move_new(mv),
        }
    }

    /// Resolves a SAN move (`Nf3`, `exd5`, `e8=Q+`, `O-O`) against this position.
    pub fn parse_san(&self, text: &str) -> Result<ChessMove> {
        san::resolve(&self.inner, text).map_err(|reason| DatasetError::San {
            san: text.to_string(),
            fen: self.to_fen(),
            reason: reason.to_string(),
        })
    }

    pub fn get_piece_at(&self, square: Square) -> Option<Piece> {
        self.inner.piece_on(square)
    }

    pub fn side_to_move(&self) -> Color {
        self.inner.side_to_move()
    }

    pub fn position(&self) -> Position {
        Position::from(&self.inner)
    }

    pub fn to_fen(&self) -> String {
        self.inner.to_string()
    }
}

/// `chess::Board` construction assumes one king per side; reject anything
/// else before it gets there.
fn check_kings(fen: &str, position: &Position) -> Result<()> {
    for color in [Color::White, Color::Black] {
        let kings = position.pieces(Piece::King, color).count_ones();
        if kings != 1 {
            return Err(DatasetError::InvalidFen {
                fen: fen.to_string(),
                reason: format!("expected one {:?} king, found {}", color, kings),
            });
        }
    }
    Ok(())
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl fmt::Debug for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Board({})", self.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fen_parsing() {
        let fen = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";
        let board = Board::from_fen(fen).unwrap();
        assert_eq!(board.to_fen(), fen);
        assert!(Board::from_fen("not a fen").is_err());
    }

    #[test]
    fn test_make_move_keeps_original() {
        let start = Board::default();
        let board = start.make_move(ChessMove::new(Square::E2, Square::E4, None));
        assert_eq!(start.get_piece_at(Square::E2), Some(Piece::Pawn));
        assert_eq!(board.side_to_move(), Color::Black);
        assert_eq!(board.get_piece_at(Square::E4), Some(Piece::Pawn));
        assert_eq!(board.get_piece_at(Square::E2), None);
    }

    #[test]
    fn test_from_epd_ignores_operations() {
        let epd = "1k1r4/pp1b1R2/3q2pp/4p3/2B5/4Q3/PPP2B2/2K5 b - - bm Qd1+; id \"STS.001\";";
        let board = Board::from_epd(epd).unwrap();
        assert_eq!(board.side_to_move(), Color::Black);
        assert_eq!(board.get_piece_at(Square::D6), Some(Piece::Queen));
        assert!(Board::from_epd("8/8/8").is_err());
    }

    #[test]
    fn test_rejects_boards_without_one_king_per_side() {
        for fen in [
            "8/8/8 w - - 0 1",
            "8/8/8/8/8/8/8/8 w - - 0 1",
            "8/8/8/8/8/8/4P3/8 w - - 0 1",
            "4k3/8/8/8/8/8/8/8 w - - 0 1",
            "4k3/8/8/8/8/8/8/2K1K3 w - - 0 1",
        ] {
            assert!(
                matches!(Board::from_fen(fen), Err(DatasetError::InvalidFen { .. })),
                "{} should be rejected",
                fen
            );
        }
        assert!(Board::from_epd("8/8/8 w - - c0 \"e4=1\";").is_err());
        assert!(Board::from_epd("8/8/8/8/8/8/8/8 w - - c0 \"e4=1\";").is_err());
        assert!(Board::from_fen("4k3/8/8/8/8/8/8/4K3 w - - 0 1").is_ok());
    }

    #[test]
    fn test_parse_san_reports_position() {
        let board = Board::new();
        let mv = board.parse_san("Nf3").unwrap();
        assert_eq!(mv, ChessMove::new(Square::G1, Square::F3, None));
        match board.parse_san("Qh5") {
            Err(DatasetError::San { san, fen, .. }) => {
                assert_eq!(san, "Qh5");
                assert_eq!(fen, board.to_fen());
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}

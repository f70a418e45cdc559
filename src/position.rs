use chess::{Color, Piece, ALL_COLORS, ALL_PIECES};
use std::fmt;

use crate::error::{DatasetError, Result};
use crate::geometry::{decode_piece_bitmap, rowcol_to_square, NUM_COLS, NUM_ROWS};

pub const NUM_PIECES: usize = 6;
pub const NUM_COLORS: usize = 2;

/// Piece placement on an 8x8 board, one bitmap per (color, kind).
///
/// Unlike `chess::Board` this carries no side-to-move, castling or legality
/// requirements, so any arrangement of pieces can be encoded (including
/// boards without kings). At most one piece occupies a square.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Position {
    bitmaps: [[u64; NUM_PIECES]; NUM_COLORS],
}

impl Position {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Places a piece, replacing whatever occupied the square.
    pub fn put(&mut self, square: usize, piece: Piece, color: Color) {
        self.clear(square);
        self.bitmaps[color.to_index()][piece.to_index()] |= 1u64 << square;
    }

    pub fn with_piece(mut self, square: usize, piece: Piece, color: Color) -> Self {
        self.put(square, piece, color);
        self
    }

    pub fn clear(&mut self, square: usize) {
        let mask = !(1u64 << square);
        for color_bitmaps in self.bitmaps.iter_mut() {
            for bitmap in color_bitmaps.iter_mut() {
                *bitmap &= mask;
            }
        }
    }

    /// Bitmap of `piece` of `color`; bit `i` set means square `i` is occupied.
    pub fn pieces(&self, piece: Piece, color: Color) -> u64 {
        self.bitmaps[color.to_index()][piece.to_index()]
    }

    pub fn color_occupancy(&self, color: Color) -> u64 {
        self.bitmaps[color.to_index()].iter().fold(0, |acc, b| acc | b)
    }

    pub fn occupied(&self) -> u64 {
        self.color_occupancy(Color::White) | self.color_occupancy(Color::Black)
    }

    pub fn piece_at(&self, square: usize) -> Option<(Piece, Color)> {
        let bit = 1u64 << square;
        for color in ALL_COLORS {
            for piece in ALL_PIECES {
                if self.pieces(piece, color) & bit != 0 {
                    return Some((piece, color));
                }
            }
        }
        None
    }

    pub fn piece_count(&self) -> usize {
        self.occupied().count_ones() as usize
    }

    /// Iterates every (square, piece, color) on the board in square order per bitmap.
    pub fn iter(&self) -> impl Iterator<Item = (usize, Piece, Color)> + '_ {
        ALL_COLORS.into_iter().flat_map(move |color| {
            ALL_PIECES.into_iter().flat_map(move |piece| {
                decode_piece_bitmap(self.pieces(piece, color))
                    .map(move |square| (square, piece, color))
            })
        })
    }

    /// Parses the piece-placement field of a FEN/EPD string
    /// (e.g. `rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR`). Trailing fields,
    /// if any, are ignored.
    pub fn from_placement(placement: &str) -> Result<Self> {
        let field = placement.split_whitespace().next().unwrap_or("");
        let invalid = |reason: &str| DatasetError::InvalidFen {
            fen: placement.to_string(),
            reason: reason.to_string(),
        };

        let ranks: Vec<&str> = field.split('/').collect();
        if ranks.len() != NUM_ROWS {
            return Err(invalid("expected 8 ranks"));
        }

        let mut position = Position::empty();
        // FEN lists rank 8 first
        for (i, rank_text) in ranks.iter().enumerate() {
            let row = NUM_ROWS - 1 - i;
            let mut col = 0usize;
            for ch in rank_text.chars() {
                if let Some(skip) = ch.to_digit(10) {
                    col += skip as usize;
                    continue;
                }
                let (piece, color) =
                    piece_from_char(ch).ok_or_else(|| invalid("unknown piece letter"))?;
                if col >= NUM_COLS {
                    return Err(invalid("rank overflows 8 files"));
                }
                position.put(rowcol_to_square(row, col), piece, color);
                col += 1;
            }
            if col != NUM_COLS {
                return Err(invalid("rank does not cover 8 files"));
            }
        }
        Ok(position)
    }

    /// Renders the FEN piece-placement field.
    pub fn placement(&self) -> String {
        let mut out = String::new();
        for row in (0..NUM_ROWS).rev() {
            let mut empty = 0;
            for col in 0..NUM_COLS {
                match self.piece_at(rowcol_to_square(row, col)) {
                    Some((piece, color)) => {
                        if empty > 0 {
                            out.push_str(&empty.to_string());
                            empty = 0;
                        }
                        out.push(piece_to_char(piece, color));
                    }
                    None => empty += 1,
                }
            }
            if empty > 0 {
                out.push_str(&empty.to_string());
            }
            if row > 0 {
                out.push('/');
            }
        }
        out
    }
}

impl From<&chess::Board> for Position {
    fn from(board: &chess::Board) -> Self {
        let mut bitmaps = [[0u64; NUM_PIECES]; NUM_COLORS];
        for color in ALL_COLORS {
            let color_mask = *board.color_combined(color);
            for piece in ALL_PIECES {
                bitmaps[color.to_index()][piece.to_index()] = (*board.pieces(piece) & color_mask).0;
            }
        }
        Self { bitmaps }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.placement())
    }
}

pub fn piece_from_char(ch: char) -> Option<(Piece, Color)> {
    let color = if ch.is_ascii_uppercase() { Color::White } else { Color::Black };
    let piece = match ch.to_ascii_lowercase() {
        'p' => Piece::Pawn,
        'n' => Piece::Knight,
        'b' => Piece::Bishop,
        'r' => Piece::Rook,
        'q' => Piece::Queen,
        'k' => Piece::King,
        _ => return None,
    };
    Some((piece, color))
}

pub fn piece_to_char(piece: Piece, color: Color) -> char {
    let ch = match piece {
        Piece::Pawn => 'p',
        Piece::Knight => 'n',
        Piece::Bishop => 'b',
        Piece::Rook => 'r',
        Piece::Queen => 'q',
        Piece::King => 'k',
    };
    match color {
        Color::White => ch.to_ascii_uppercase(),
        Color::Black => ch,
    }
}

/// Sliding pieces: the ones whose influence is traced along rays.
pub fn is_slider(piece: Piece) -> bool {
    matches!(piece, Piece::Bishop | Piece::Rook | Piece::Queen)
}

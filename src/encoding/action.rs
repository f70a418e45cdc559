use chess::{ChessMove, Piece, Square, ALL_PIECES, ALL_SQUARES};
use ndarray::Array1;

use crate::geometry::NUM_SQUARES;
use crate::position::{Position, NUM_PIECES};

/// Promotion slots in the combined index: none, then one per piece kind.
pub const NUM_PROMOTION_SLOTS: usize = NUM_PIECES;
pub const NUM_SQUARE_PAIRS: usize = NUM_SQUARES * NUM_SQUARES;
pub const NUM_COMBINED_ACTIONS: usize = NUM_PROMOTION_SLOTS * NUM_SQUARE_PAIRS;

/// 64-long one-hot vectors of the source and destination squares.
pub fn action_one_hot(mv: ChessMove) -> (Array1<f32>, Array1<f32>) {
    (
        square_one_hot(mv.get_source()),
        square_one_hot(mv.get_dest()),
    )
}

pub fn square_one_hot(square: Square) -> Array1<f32> {
    let mut one_hot = Array1::zeros(NUM_SQUARES);
    one_hot[square.to_index()] = 1.0;
    one_hot
}

/// `from * 64 + to`, ignoring promotion.
pub fn square_pair_index(mv: ChessMove) -> usize {
    mv.get_source().to_index() * NUM_SQUARES + mv.get_dest().to_index()
}

/// 0 for no promotion, otherwise the promoted piece's kind index.
pub fn promotion_index(promotion: Option<Piece>) -> usize {
    promotion.map_or(0, |piece| piece.to_index())
}

/// `promotion * 4096 + from * 64 + to`.
pub fn combined_action_index(mv: ChessMove) -> usize {
    promotion_index(mv.get_promotion()) * NUM_SQUARE_PAIRS + square_pair_index(mv)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DecodedAction {
    pub promotion: Option<Piece>,
    pub from: usize,
    pub to: usize,
}

impl DecodedAction {
    pub fn to_move(self) -> ChessMove {
        ChessMove::new(ALL_SQUARES[self.from], ALL_SQUARES[self.to], self.promotion)
    }
}

/// Inverse of [`combined_action_index`]; `None` outside the index space.
pub fn decode_action_index(index: usize) -> Option<DecodedAction> {
    if index >= NUM_COMBINED_ACTIONS {
        return None;
    }
    let slot = index / NUM_SQUARE_PAIRS;
    let pair = index % NUM_SQUARE_PAIRS;
    Some(DecodedAction {
        promotion: if slot == 0 { None } else { Some(ALL_PIECES[slot]) },
        from: pair / NUM_SQUARES,
        to: pair % NUM_SQUARES,
    })
}

pub fn piece_one_hot(piece: Piece) -> Array1<f32> {
    let mut one_hot = Array1::zeros(NUM_PIECES);
    one_hot[piece.to_index()] = 1.0;
    one_hot
}

/// One-hot kind of the piece standing on the move's source square, `None`
/// when that square is empty.
pub fn moved_piece_one_hot(position: &Position, mv: ChessMove) -> Option<Array1<f32>> {
    position
        .piece_at(mv.get_source().to_index())
        .map(|(piece, _)| piece_one_hot(piece))
}

use chess::{Color, Piece};
use ndarray::Array3;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::encoding::influence;
use crate::geometry::{square_to_rowcol, NUM_COLS, NUM_ROWS, NUM_SQUARES};
use crate::position::{Position, NUM_PIECES};

pub const NUM_STATE_CHANNELS: usize = 12;

/// Channel of a piece in the basic planes: white pieces 0..5, black 6..11,
/// each ordered pawn, knight, bishop, rook, queen, king.
#[inline]
pub fn channel_index(piece: Piece, color: Color) -> usize {
    color.to_index() * NUM_PIECES + piece.to_index()
}

/// One-hot occupancy planes, shape `[12, 8, 8]`.
pub fn state_planes(position: &Position) -> Array3<f32> {
    let mut planes = Array3::zeros((NUM_STATE_CHANNELS, NUM_ROWS, NUM_COLS));
    for (square, piece, color) in position.iter() {
        let (row, col) = square_to_rowcol(square);
        planes[[channel_index(piece, color), row, col]] = 1.0;
    }
    planes
}

/// Label used for empty squares in a [`CompactState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompactEmpty {
    /// Empty squares are -1, distinct from every piece channel.
    #[default]
    Sentinel,
    /// Empty squares are 0, the same label as a white pawn. Matches older
    /// tabular datasets.
    Legacy,
}

impl CompactEmpty {
    pub fn label(self) -> i8 {
        match self {
            CompactEmpty::Sentinel => -1,
            CompactEmpty::Legacy => 0,
        }
    }
}

/// Per-square channel labels, usable as a hash key for tabular methods.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CompactState([i8; NUM_SQUARES]);

impl CompactState {
    pub fn labels(&self) -> &[i8; NUM_SQUARES] {
        &self.0
    }

    pub fn get(&self, square: usize) -> i8 {
        self.0[square]
    }
}

impl fmt::Debug for CompactState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.0.iter()).finish()
    }
}

pub fn compact_state(position: &Position, empty: CompactEmpty) -> CompactState {
    let mut labels = [empty.label(); NUM_SQUARES];
    for (square, piece, color) in position.iter() {
        labels[square] = channel_index(piece, color) as i8;
    }
    CompactState(labels)
}

/// How a position is turned into a state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StateMode {
    #[default]
    Planes,
    Compact(CompactEmpty),
    Featurized,
}

impl StateMode {
    /// Mode from the `hashable`/`featurized` flag pair; featurized wins.
    pub fn from_flags(hashable: bool, featurized: bool, empty: CompactEmpty) -> Self {
        if featurized {
            StateMode::Featurized
        } else if hashable {
            StateMode::Compact(empty)
        } else {
            StateMode::Planes
        }
    }

    /// Channels of the dense tensor this mode produces, `None` for compact states.
    pub fn channels(self) -> Option<usize> {
        match self {
            StateMode::Planes => Some(NUM_STATE_CHANNELS),
            StateMode::Featurized => Some(influence::NUM_FEATURIZED_CHANNELS),
            StateMode::Compact(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EncodedState {
    Dense(Array3<f32>),
    Compact(CompactState),
}

pub fn encode_state(position: &Position, mode: StateMode) -> EncodedState {
    match mode {
        StateMode::Planes => EncodedState::Dense(state_planes(position)),
        StateMode::Featurized => EncodedState::Dense(influence::featurize(position)),
        StateMode::Compact(empty) => EncodedState::Compact(compact_state(position, empty)),
    }
}

/// Dense tensor for generators: basic planes, or the influence features.
pub fn dense_state(position: &Position, featurized: bool) -> Array3<f32> {
    if featurized {
        influence::featurize(position)
    } else {
        state_planes(position)
    }
}

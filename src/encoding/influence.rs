use chess::{Color, Piece, ALL_COLORS};
use ndarray::{s, Array3};

use crate::encoding::state::{state_planes, NUM_STATE_CHANNELS};
use crate::geometry::{
    decode_piece_bitmap, offset_square, square_to_rowcol, Direction, BISHOP_DIRECTIONS, NUM_COLS,
    NUM_ROWS, QUEEN_DIRECTIONS, ROOK_DIRECTIONS,
};
use crate::position::{is_slider, Position};

pub const SLIDER_FAMILIES: [Piece; 3] = [Piece::Rook, Piece::Bishop, Piece::Queen];
pub const NUM_ROLES: usize = 4;
pub const NUM_ROLE_CHANNELS: usize = SLIDER_FAMILIES.len() * NUM_ROLES;
pub const NUM_OCCUPANCY_CHANNELS: usize = 3;
pub const NUM_INFLUENCE_CHANNELS: usize = NUM_ROLE_CHANNELS + NUM_OCCUPANCY_CHANNELS;
pub const NUM_FEATURIZED_CHANNELS: usize = NUM_STATE_CHANNELS + NUM_INFLUENCE_CHANNELS;

pub const WHITE_OCCUPANCY_CHANNEL: usize = NUM_STATE_CHANNELS + NUM_ROLE_CHANNELS;
pub const BLACK_OCCUPANCY_CHANNEL: usize = WHITE_OCCUPANCY_CHANNEL + 1;
pub const FREE_SQUARE_CHANNEL: usize = WHITE_OCCUPANCY_CHANNEL + 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    WhiteAttack,
    WhiteDefend,
    BlackAttack,
    BlackDefend,
}

impl Role {
    pub fn new(slider: Color, target: Color) -> Self {
        match (slider, slider == target) {
            (Color::White, false) => Role::WhiteAttack,
            (Color::White, true) => Role::WhiteDefend,
            (Color::Black, false) => Role::BlackAttack,
            (Color::Black, true) => Role::BlackDefend,
        }
    }

    fn offset(self) -> usize {
        self as usize
    }
}

fn directions(family: Piece) -> &'static [Direction] {
    match family {
        Piece::Rook => &ROOK_DIRECTIONS,
        Piece::Bishop => &BISHOP_DIRECTIONS,
        _ => &QUEEN_DIRECTIONS,
    }
}

/// Channel of a family/role map in the full featurized tensor, or `None`
/// for a piece that is not a slider.
pub fn role_channel(family: Piece, role: Role) -> Option<usize> {
    SLIDER_FAMILIES
        .iter()
        .position(|&f| f == family)
        .map(|i| NUM_STATE_CHANNELS + i * NUM_ROLES + role.offset())
}

/// Role maps followed by the occupancy maps, shape `[15, 8, 8]`.
///
/// Rays are walked outward from every rook, bishop and queen and stop at the
/// first occupied square. A pawn, knight or king there bumps the slider's
/// family map: the attack map for an enemy piece, the defend map for a
/// friendly one. Sliders never count other sliders, so a queen behind a rook
/// contributes nothing past it.
pub fn influence_maps(position: &Position) -> Array3<f32> {
    let mut maps = Array3::zeros((NUM_INFLUENCE_CHANNELS, NUM_ROWS, NUM_COLS));
    let occupied = position.occupied();

    for (family_index, &family) in SLIDER_FAMILIES.iter().enumerate() {
        for color in ALL_COLORS {
            for from in decode_piece_bitmap(position.pieces(family, color)) {
                for &direction in directions(family) {
                    let mut square = from;
                    while let Some(next) = offset_square(square, direction) {
                        square = next;
                        if occupied & (1u64 << square) == 0 {
                            continue;
                        }
                        if let Some((piece, target)) = position.piece_at(square) {
                            if !is_slider(piece) {
                                let role = Role::new(color, target);
                                let channel = family_index * NUM_ROLES + role.offset();
                                let (row, col) = square_to_rowcol(square);
                                maps[[channel, row, col]] += 1.0;
                            }
                        }
                        break;
                    }
                }
            }
        }
    }

    let white = position.color_occupancy(Color::White);
    let black = position.color_occupancy(Color::Black);
    for square in 0..NUM_ROWS * NUM_COLS {
        let (row, col) = square_to_rowcol(square);
        let bit = 1u64 << square;
        maps[[NUM_ROLE_CHANNELS, row, col]] = f32::from(u8::from(white & bit != 0));
        maps[[NUM_ROLE_CHANNELS + 1, row, col]] = f32::from(u8::from(black & bit != 0));
        maps[[NUM_ROLE_CHANNELS + 2, row, col]] = f32::from(u8::from(occupied & bit == 0));
    }
    maps
}

/// Basic planes plus influence maps, shape `[27, 8, 8]`.
pub fn featurize(position: &Position) -> Array3<f32> {
    let mut features = Array3::zeros((NUM_FEATURIZED_CHANNELS, NUM_ROWS, NUM_COLS));
    features
        .slice_mut(s![..NUM_STATE_CHANNELS, .., ..])
        .assign(&state_planes(position));
    features
        .slice_mut(s![NUM_STATE_CHANNELS.., .., ..])
        .assign(&influence_maps(position));
    features
}

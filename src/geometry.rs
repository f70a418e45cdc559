// Squares are numbered row-major from a1 (a1=0, h1=7, a2=8, h8=63), the same
// order as `chess::BitBoard`, so bit `i` of a piece bitmap is square `i`.
pub const NUM_ROWS: usize = 8;
pub const NUM_COLS: usize = 8;
pub const NUM_SQUARES: usize = NUM_ROWS * NUM_COLS;

/// A single step along a ray, as (row delta, column delta).
pub type Direction = (i8, i8);

pub const ROOK_DIRECTIONS: [Direction; 4] = [(1, 0), (0, 1), (-1, 0), (0, -1)];
pub const BISHOP_DIRECTIONS: [Direction; 4] = [(1, 1), (-1, 1), (-1, -1), (1, -1)];
pub const QUEEN_DIRECTIONS: [Direction; 8] = [
    (1, 0),
    (0, 1),
    (-1, 0),
    (0, -1),
    (1, 1),
    (-1, 1),
    (-1, -1),
    (1, -1),
];

#[inline]
pub fn square_to_rowcol(square: usize) -> (usize, usize) {
    (square / NUM_COLS, square % NUM_COLS)
}

#[inline]
pub fn rowcol_to_square(row: usize, col: usize) -> usize {
    row * NUM_COLS + col
}

/// Moves one step from `square` along `direction`, or `None` when the step
/// leaves the board.
#[inline]
pub fn offset_square(square: usize, direction: Direction) -> Option<usize> {
    let (row, col) = square_to_rowcol(square);
    let row = row as i32 + direction.0 as i32;
    let col = col as i32 + direction.1 as i32;
    if (0..NUM_ROWS as i32).contains(&row) && (0..NUM_COLS as i32).contains(&col) {
        Some(rowcol_to_square(row as usize, col as usize))
    } else {
        None
    }
}

/// Iterates the squares set in a piece bitmap, least significant bit first.
pub fn decode_piece_bitmap(bitmap: u64) -> BitmapSquares {
    BitmapSquares { remaining: bitmap }
}

#[derive(Debug, Clone, Copy)]
pub struct BitmapSquares {
    remaining: u64,
}

impl Iterator for BitmapSquares {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.remaining == 0 {
            return None;
        }
        let square = self.remaining.trailing_zeros() as usize;
        // clear lowest set bit
        self.remaining &= self.remaining - 1;
        Some(square)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.remaining.count_ones() as usize;
        (n, Some(n))
    }
}

impl ExactSizeIterator for BitmapSquares {}

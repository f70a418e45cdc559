use chess::{Board, ChessMove, File, MoveGen, Piece, Rank, Square};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SanError {
    #[error("empty move text")]
    Empty,
    #[error("cannot read move text")]
    Malformed,
    #[error("no legal move matches")]
    NoMatch,
    #[error("{0} legal moves match")]
    Ambiguous(usize),
}

/// Finds the unique legal move in `board` described by `text`.
///
/// Check, mate and annotation suffixes are ignored, captures need not be
/// marked, promotions may be written with or without `=`, and castling
/// accepts both `O-O` and `0-0`.
pub fn resolve(board: &Board, text: &str) -> Result<ChessMove, SanError> {
    let san = text.trim().trim_end_matches(&['+', '#', '!', '?'][..]);
    if san.is_empty() {
        return Err(SanError::Empty);
    }

    let pattern = match castling_file(san) {
        Some(file) => SanPattern::castle(board, file),
        None => SanPattern::parse(san)?,
    };

    // MoveGen's size hint is not exact once iteration starts, so collect
    // rather than count the remainder.
    let candidates: Vec<ChessMove> = MoveGen::new_legal(board)
        .filter(|&mv| pattern.matches(board, mv))
        .collect();
    match candidates.as_slice() {
        [] => Err(SanError::NoMatch),
        [only] => Ok(*only),
        many => Err(SanError::Ambiguous(many.len())),
    }
}

fn castling_file(san: &str) -> Option<File> {
    match san {
        "O-O" | "0-0" => Some(File::G),
        "O-O-O" | "0-0-0" => Some(File::C),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy)]
struct SanPattern {
    piece: Piece,
    from_file: Option<File>,
    from_rank: Option<Rank>,
    dest: Square,
    promotion: Option<Piece>,
}

impl SanPattern {
    fn castle(board: &Board, file: File) -> Self {
        let king = board.king_square(board.side_to_move());
        Self {
            piece: Piece::King,
            from_file: None,
            from_rank: None,
            dest: Square::make_square(king.get_rank(), file),
            promotion: None,
        }
    }

    fn parse(san: &str) -> Result<Self, SanError> {
        let mut chars: Vec<char> = san.chars().filter(|c| !matches!(c, 'x' | ':' | '-')).collect();

        let piece = match chars.first().copied().and_then(piece_from_letter) {
            Some(piece) => {
                chars.remove(0);
                piece
            }
            None => Piece::Pawn,
        };

        let promotion = if let Some(eq) = chars.iter().position(|&c| c == '=') {
            let letter = chars.get(eq + 1).copied().ok_or(SanError::Malformed)?;
            chars.truncate(eq);
            Some(piece_from_letter(letter.to_ascii_uppercase()).ok_or(SanError::Malformed)?)
        } else if piece == Piece::Pawn {
            match chars.last().copied().and_then(piece_from_letter) {
                Some(promoted) => {
                    chars.pop();
                    Some(promoted)
                }
                None => None,
            }
        } else {
            None
        };

        if chars.len() < 2 {
            return Err(SanError::Malformed);
        }
        let split = chars.len() - 2;
        let file = file_from_char(chars[split]).ok_or(SanError::Malformed)?;
        let rank = rank_from_char(chars[split + 1]).ok_or(SanError::Malformed)?;

        let mut from_file = None;
        let mut from_rank = None;
        for &c in &chars[..split] {
            if let Some(f) = file_from_char(c) {
                from_file = Some(f);
            } else if let Some(r) = rank_from_char(c) {
                from_rank = Some(r);
            } else {
                return Err(SanError::Malformed);
            }
        }

        Ok(Self {
            piece,
            from_file,
            from_rank,
            dest: Square::make_square(rank, file),
            promotion,
        })
    }

    fn matches(&self, board: &Board, mv: ChessMove) -> bool {
        let source = mv.get_source();
        board.piece_on(source) == Some(self.piece)
            && mv.get_dest() == self.dest
            && mv.get_promotion() == self.promotion
            && self.from_file.map_or(true, |f| source.get_file() == f)
            && self.from_rank.map_or(true, |r| source.get_rank() == r)
    }
}

fn piece_from_letter(c: char) -> Option<Piece> {
    match c {
        'N' => Some(Piece::Knight),
        'B' => Some(Piece::Bishop),
        'R' => Some(Piece::Rook),
        'Q' => Some(Piece::Queen),
        'K' => Some(Piece::King),
        _ => None,
    }
}

fn file_from_char(c: char) -> Option<File> {
    match c {
        'a'..='h' => Some(File::from_index(c as usize - 'a' as usize)),
        _ => None,
    }
}

fn rank_from_char(c: char) -> Option<Rank> {
    match c {
        '1'..='8' => Some(Rank::from_index(c as usize - '1' as usize)),
        _ => None,
    }
}

mod error;
mod parse;
mod reader;
pub mod san;
mod tokenize;

pub use error::PgnParseError;
pub use parse::parse_game;
pub use reader::{GameEntry, GameReader};
pub use tokenize::{tokenize_pgn, PgnToken};

use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader, Cursor};
use std::path::{Path, PathBuf};

use crate::error::{DatasetError, Result};
use crate::game::{GameRecord, MalformedGame};
use crate::pgn::parse::parse_game;

/// A game read from the stream, or the diagnostics of one that failed to parse.
pub type GameEntry = std::result::Result<GameRecord, MalformedGame>;

const RESULT_TOKENS: [&str; 4] = ["1-0", "0-1", "1/2-1/2", "*"];

enum Origin {
    Path(PathBuf),
    Text(String),
}

/// Streams games out of a PGN source one at a time. Files ending in `.gz`
/// are decompressed on the fly.
pub struct GameReader {
    origin: Origin,
    source: Box<dyn BufRead>,
    pending_line: Option<String>,
    games_read: usize,
}

impl GameReader {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let origin = Origin::Path(path.as_ref().to_path_buf());
        let source = open_source(&origin)?;
        Ok(Self {
            origin,
            source,
            pending_line: None,
            games_read: 0,
        })
    }

    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        let source: Box<dyn BufRead> = Box::new(Cursor::new(text.clone().into_bytes()));
        Self {
            origin: Origin::Text(text),
            source,
            pending_line: None,
            games_read: 0,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        match &self.origin {
            Origin::Path(path) => Some(path),
            Origin::Text(_) => None,
        }
    }

    /// Games returned since the last rewind, including malformed ones.
    pub fn games_read(&self) -> usize {
        self.games_read
    }

    /// Starts over from the first game.
    pub fn rewind(&mut self) -> Result<()> {
        self.source = open_source(&self.origin)?;
        self.pending_line = None;
        self.games_read = 0;
        Ok(())
    }

    /// Reads the next game, `None` at end of input.
    ///
    /// A game ends where the next tag section starts, at a blank line
    /// following a termination marker, or at end of input.
    pub fn next_game(&mut self) -> Result<Option<GameEntry>> {
        let mut text = String::new();
        let mut has_movetext = false;
        let mut in_comment = false;

        while let Some(line) = self.next_line()? {
            let trimmed = line.trim();

            if !in_comment {
                if trimmed.starts_with('%') {
                    continue;
                }
                if trimmed.is_empty() {
                    if has_movetext && ends_with_result(&text) {
                        break;
                    }
                    continue;
                }
                if trimmed.starts_with('[') && has_movetext {
                    self.pending_line = Some(line);
                    break;
                }
            }

            if !trimmed.starts_with('[') && !trimmed.is_empty() {
                has_movetext = true;
            }
            in_comment = scan_braces(trimmed, in_comment);
            text.push_str(trimmed);
            text.push('\n');
        }

        if text.trim().is_empty() {
            return Ok(None);
        }

        self.games_read += 1;
        let number = self.games_read;
        Ok(Some(parse_game(number, &text).map_err(|e| MalformedGame {
            number,
            event: None,
            white: None,
            black: None,
            plies: 0,
            ply: None,
            san: None,
            fen: None,
            reason: format!("unparseable PGN: {}", e),
        })))
    }

    fn next_line(&mut self) -> Result<Option<String>> {
        if let Some(line) = self.pending_line.take() {
            return Ok(Some(line));
        }
        let mut line = String::new();
        if self.source.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line))
    }
}

impl Iterator for GameReader {
    type Item = Result<GameEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_game().transpose()
    }
}

fn open_source(origin: &Origin) -> Result<Box<dyn BufRead>> {
    match origin {
        Origin::Path(path) => {
            let file = File::open(path).map_err(|e| DatasetError::open(path, e))?;
            let gzipped = path.extension().map_or(false, |ext| ext == "gz");
            if gzipped {
                Ok(Box::new(BufReader::new(GzDecoder::new(file))))
            } else {
                Ok(Box::new(BufReader::new(file)))
            }
        }
        Origin::Text(text) => Ok(Box::new(Cursor::new(text.clone().into_bytes()))),
    }
}

/// Whether a `{}` comment is still open after `line`, given whether one was
/// open before it. Braces after `;` or inside a quoted tag value do not count.
fn scan_braces(line: &str, mut in_comment: bool) -> bool {
    let mut in_string = false;
    let mut escaped = false;
    for ch in line.chars() {
        if in_comment {
            in_comment = ch != '}';
            continue;
        }
        if in_string {
            if ch == '"' && !escaped {
                in_string = false;
            }
            escaped = ch == '\\' && !escaped;
            continue;
        }
        match ch {
            '{' => in_comment = true,
            '"' => in_string = true,
            ';' => break,
            _ => {}
        }
    }
    in_comment
}

fn ends_with_result(text: &str) -> bool {
    text.split_whitespace()
        .last()
        .map_or(false, |token| RESULT_TOKENS.contains(&token))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    const TWO_GAMES: &str = r#"[Event "First"]
[Result "1-0"]

1. e4 e5 2. Qh5 Nc6 3. Bc4 Nf6 4. Qxf7# 1-0

[Event "Second"]
[Result "0-1"]

1. f3 e5 2. g4 {multi-line
[not a tag]} Qh4# 0-1
"#;

    #[test]
    fn test_splits_games() {
        let mut reader = GameReader::from_text(TWO_GAMES);
        let first = reader.next_game().unwrap().unwrap().unwrap();
        assert_eq!(first.number, 1);
        assert_eq!(first.header("Event"), Some("First"));
        assert_eq!(first.moves.len(), 7);

        let second = reader.next_game().unwrap().unwrap().unwrap();
        assert_eq!(second.number, 2);
        assert_eq!(second.header("Event"), Some("Second"));
        assert_eq!(second.moves, vec!["f3", "e5", "g4", "Qh4#"]);

        assert!(reader.next_game().unwrap().is_none());
    }

    #[test]
    fn test_braces_in_line_comments_and_tags_do_not_open_comments() {
        let text = r#"[Event "A {open"]
[Result "1-0"]

1. e4 ; threat {unclosed in line comment
e5 2. Qh5 Nc6 3. Bc4 Nf6 4. Qxf7# 1-0

[Event "B"]
[Result "0-1"]

1. f3 e5 2. g4 Qh4# 0-1

[Event "C"]
[Result "1/2-1/2"]

1. d4 {a real
comment} d5 1/2-1/2
"#;
        let games: Vec<GameRecord> = GameReader::from_text(text)
            .map(|g| g.unwrap().unwrap())
            .collect();
        let events: Vec<_> = games.iter().map(|g| g.header("Event").unwrap_or_default()).collect();
        assert_eq!(events, vec!["A {open", "B", "C"]);
        assert_eq!(games[0].moves.len(), 7);
        assert_eq!(games[1].moves.len(), 4);
        assert_eq!(games[2].moves, vec!["d4", "d5"]);
    }

    #[test]
    fn test_scan_braces() {
        assert!(scan_braces("1. e4 {start", false));
        assert!(!scan_braces("end} e5", true));
        assert!(!scan_braces("1. e4 ; {not a comment", false));
        assert!(!scan_braces(r#"[Annotator "x{y \" {z"]"#, false));
        assert!(!scan_braces("still inside ; }", true));
    }

    #[test]
    fn test_games_without_tags_split_on_blank_line() {
        let mut reader = GameReader::from_text("1. d4 d5 1/2-1/2\n\n1. c4 *\n");
        let games: Vec<_> = reader.by_ref().map(|g| g.unwrap().unwrap()).collect();
        assert_eq!(games.len(), 2);
        assert_eq!(games[1].moves, vec!["c4"]);
    }

    #[test]
    fn test_rewind_restarts() {
        let mut reader = GameReader::from_text(TWO_GAMES);
        assert_eq!(reader.by_ref().count(), 2);
        reader.rewind().unwrap();
        assert_eq!(reader.games_read(), 0);
        let again = reader.next_game().unwrap().unwrap().unwrap();
        assert_eq!(again.header("Event"), Some("First"));
    }

    #[test]
    fn test_unparseable_game_is_reported() {
        let mut reader = GameReader::from_text("[Event \"Broken\"]\n\n1. e4 {open comment\n");
        let entry = reader.next_game().unwrap().unwrap();
        let malformed = entry.unwrap_err();
        assert_eq!(malformed.number, 1);
        assert!(malformed.reason.contains("unparseable"));
    }

    #[test]
    fn test_reads_gzip_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("games.pgn.gz");
        let mut encoder = GzEncoder::new(File::create(&path).unwrap(), Compression::default());
        encoder.write_all(TWO_GAMES.as_bytes()).unwrap();
        encoder.finish().unwrap();

        let reader = GameReader::open(&path).unwrap();
        assert_eq!(reader.path(), Some(path.as_path()));
        let events: Vec<String> = reader
            .map(|g| g.unwrap().unwrap().header("Event").unwrap_or_default().to_string())
            .collect();
        assert_eq!(events, vec!["First", "Second"]);
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            GameReader::open("/definitely/not/here.pgn"),
            Err(DatasetError::Open { .. })
        ));
    }
}

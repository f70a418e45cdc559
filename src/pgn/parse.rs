use std::collections::HashMap;
use std::str::FromStr;

use crate::game::GameRecord;
use crate::pgn::error::PgnParseError;
use crate::pgn::tokenize::{tokenize_pgn, PgnToken};

/// Builds a game record from the text of one PGN game. Variations are
/// skipped; only mainline moves and comments are kept.
pub fn parse_game(number: usize, pgn: &str) -> Result<GameRecord, PgnParseError> {
    let tokens = tokenize_pgn(pgn)?;

    let mut headers = HashMap::new();
    let mut moves = Vec::new();
    let mut comments: Vec<Option<String>> = Vec::new();
    let mut opening_comment: Option<String> = None;
    let mut result_token = None;
    let mut depth = 0usize;

    for token in tokens {
        match token {
            PgnToken::Tag(tag) => {
                let (key, value) = parse_tag(&tag)?;
                headers.insert(key, value);
            }
            PgnToken::StartVariation => depth += 1,
            PgnToken::EndVariation => {
                depth = depth.checked_sub(1).ok_or(PgnParseError::UnbalancedVariation)?;
            }
            _ if depth > 0 => {}
            PgnToken::Move(san) => {
                moves.push(san);
                comments.push(None);
            }
            PgnToken::Comment(text) => {
                let slot = match comments.last_mut() {
                    Some(slot) => slot,
                    None => &mut opening_comment,
                };
                match slot {
                    Some(existing) => {
                        existing.push(' ');
                        existing.push_str(&text);
                    }
                    None => *slot = Some(text),
                }
            }
            PgnToken::Result(result) => result_token = Some(result),
            PgnToken::MoveNumberAndPeriods(..) | PgnToken::Annotation(_) => {}
        }
    }

    if depth != 0 {
        return Err(PgnParseError::UnbalancedVariation);
    }

    let final_comment = match comments.pop() {
        Some(comment) => comment,
        None => opening_comment,
    };

    Ok(GameRecord {
        number,
        headers,
        moves,
        final_comment,
        result_token,
    })
}

/// Splits `Key "Value"` into its parts, unescaping `\"` and `\\`.
fn parse_tag(tag: &str) -> Result<(String, String), PgnParseError> {
    let invalid = || PgnParseError::InvalidTag(tag.to_string());
    let (key, rest) = tag.trim().split_once(char::is_whitespace).ok_or_else(invalid)?;
    let quoted = rest.trim();
    let inner = quoted
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .ok_or_else(invalid)?;

    let mut value = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(escaped) = chars.next() {
                value.push(escaped);
            }
        } else {
            value.push(c);
        }
    }
    Ok((key.to_string(), value))
}

impl FromStr for GameRecord {
    type Err = PgnParseError;

    fn from_str(pgn: &str) -> Result<Self, Self::Err> {
        parse_game(1, pgn)
    }
}

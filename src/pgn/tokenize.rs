use std::iter::Peekable;
use std::str::Chars;

use crate::pgn::error::PgnParseError;

/// Represents a token in a PGN string
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum PgnToken {
    Tag(String),                       // e.g. `Event "F/S Return Match"` (brackets stripped)
    Move(String),                      // e.g. "e4", "Nf3#", "O-O"
    MoveNumberAndPeriods(u16, usize),  // e.g. "12." or "12..."
    StartVariation,                    // '('
    EndVariation,                      // ')'
    Comment(String),                   // `{...}` or `; ...` to end of line
    Annotation(String),                // "!", "?!", "$19", ...
    Result(String),                    // "1-0", "0-1", "1/2-1/2", "*"
}

/// Characters that end a move or annotation token even without whitespace.
fn is_delimiter(c: char) -> bool {
    c.is_ascii_whitespace() || matches!(c, '{' | '}' | '(' | ')' | '[' | ']' | ';')
}

/// Tokenizes a PGN string into a list of PgnTokens
pub fn tokenize_pgn(pgn: &str) -> Result<Vec<PgnToken>, PgnParseError> {
    let mut tokens = Vec::new();
    let mut chars = pgn.chars().peekable();

    while let Some(&ch) = chars.peek() {
        match ch {
            _ if ch.is_ascii_whitespace() => {
                chars.next();
            }
            '[' => {
                chars.next(); // Consume '['
                let tag = collect_tag(&mut chars);
                if chars.next().is_none() {
                    return Err(PgnParseError::InvalidTag(tag));
                }
                tokens.push(PgnToken::Tag(tag.trim().to_string()));
            }
            '(' => {
                tokens.push(PgnToken::StartVariation);
                chars.next();
            }
            ')' => {
                tokens.push(PgnToken::EndVariation);
                chars.next();
            }
            '{' => {
                chars.next(); // Consume '{'
                let comment = collect_until(&mut chars, |c| c == '}');
                if chars.next().is_none() {
                    return Err(PgnParseError::InvalidComment(comment));
                }
                tokens.push(PgnToken::Comment(comment.trim().to_string()));
            }
            ';' => {
                chars.next();
                let comment = collect_until(&mut chars, |c| c == '\n');
                tokens.push(PgnToken::Comment(comment.trim().to_string()));
            }
            '!' | '?' | '$' => {
                let annotation = collect_until(&mut chars, is_delimiter);
                tokens.push(PgnToken::Annotation(annotation));
            }
            '*' => {
                tokens.push(PgnToken::Result("*".to_string()));
                chars.next();
            }
            _ if ch.is_ascii_digit() => {
                // Move number, result, or zero-style castling ("0-0")
                let text = collect_until(&mut chars, |c| c == '.' || is_delimiter(c));
                if text == "0-0"
                    || text == "0-0-0"
                    || text.starts_with("0-0+")
                    || text.starts_with("0-0-0+")
                {
                    tokens.push(PgnToken::Move(text));
                } else if text.contains('-') {
                    tokens.push(PgnToken::Result(text));
                } else if let Ok(num) = text.parse::<u16>() {
                    let periods = collect_until(&mut chars, |c| c != '.');
                    tokens.push(PgnToken::MoveNumberAndPeriods(num, periods.len()));
                } else {
                    return Err(PgnParseError::InvalidToken(text));
                }
            }
            _ if ch.is_alphabetic() => {
                let mv = collect_until(&mut chars, is_delimiter);
                tokens.push(PgnToken::Move(mv));
            }
            _ => {
                let invalid = collect_until(&mut chars, |c| c.is_ascii_whitespace());
                return Err(PgnParseError::InvalidToken(invalid));
            }
        }
    }

    Ok(tokens)
}

/// Collects characters from the iterator until a condition is met or the iterator ends
fn collect_until(chars: &mut Peekable<Chars>, until_condition: fn(char) -> bool) -> String {
    let mut content = String::new();

    while let Some(&ch) = chars.peek() {
        if until_condition(ch) {
            break;
        }

        content.push(ch);
        chars.next();
    }

    content
}

/// Collects a tag body up to the closing ']', which may legally appear inside
/// the quoted value.
fn collect_tag(chars: &mut Peekable<Chars>) -> String {
    let mut content = String::new();
    let mut in_quotes = false;
    let mut escaped = false;

    while let Some(&ch) = chars.peek() {
        if ch == ']' && !in_quotes {
            break;
        }
        if ch == '"' && !escaped {
            in_quotes = !in_quotes;
        }
        escaped = ch == '\\' && !escaped;
        content.push(ch);
        chars.next();
    }

    content
}

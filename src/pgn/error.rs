use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PgnParseError {
    #[error("invalid tag: {0}")]
    InvalidTag(String),
    #[error("unterminated comment: {0}")]
    InvalidComment(String),
    #[error("invalid token: {0}")]
    InvalidToken(String),
    #[error("unbalanced variation parentheses")]
    UnbalancedVariation,
}

use thiserror::Error;

use crate::storage::Row;
use crate::types::page::{COLUMN_EMAIL_MAX, COLUMN_USERNAME_MAX};

/// A parsed statement ready to run against a table.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Statement {
    /// `insert <id> <username> <email>`
    Insert(Row),
    /// `select`
    Select,
}

/// Reasons a line could not be turned into a [`Statement`].
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum PrepareError {
    /// Missing fields, extra fields, or an id that is not an integer.
    #[error("Syntax error. Could not parse statement.")]
    SyntaxError,
    /// Username or email longer than its column.
    #[error("String is too long.")]
    StringTooLong,
    /// An id below zero.
    #[error("ID must be positive.")]
    NegativeId,
    /// The first word is not a known statement.
    #[error("Unrecognized keyword at start of '{0}'.")]
    Unrecognized(String),
}

/// Parses one input line.
pub fn prepare(input: &str) -> Result<Statement, PrepareError> {
    let input = input.trim();
    let mut words = input.split_whitespace();
    match words.next() {
        Some("insert") => prepare_insert(words),
        Some("select") if words.next().is_none() => Ok(Statement::Select),
        _ => Err(PrepareError::Unrecognized(input.to_string())),
    }
}

fn prepare_insert<'a>(mut words: impl Iterator<Item = &'a str>) -> Result<Statement, PrepareError> {
    let (Some(id), Some(username), Some(email), None) =
        (words.next(), words.next(), words.next(), words.next())
    else {
        return Err(PrepareError::SyntaxError);
    };
    let id: i64 = id.parse().map_err(|_| PrepareError::SyntaxError)?;
    if id < 0 {
        return Err(PrepareError::NegativeId);
    }
    let id = u32::try_from(id).map_err(|_| PrepareError::SyntaxError)?;
    if username.len() > COLUMN_USERNAME_MAX || email.len() > COLUMN_EMAIL_MAX {
        return Err(PrepareError::StringTooLong);
    }
    Row::new(id, username, email)
        .map(Statement::Insert)
        .map_err(|_| PrepareError::SyntaxError)
}

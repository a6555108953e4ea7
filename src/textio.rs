//! Line-oriented text helpers shared by the cells and world file formats.
//!
//! Every value sits on its own line or on a short whitespace-separated line
//! (`width height`, `x y value`). Parsing fails fast with a [`FormatError`]
//! naming the field that could not be read.

use std::fmt;
use std::io::{self, BufRead};
use std::str::FromStr;

/// Errors raised while reading a text file.
#[derive(Debug)]
pub enum FormatError {
    Io(io::Error),
    UnexpectedEof,
    Invalid { field: &'static str, value: String },
    Engine(String),
}

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "IO error: {}", e),
            Self::UnexpectedEof => write!(f, "Unexpected EOF"),
            Self::Invalid { field, value } => write!(f, "Invalid {} value: {:?}", field, value),
            Self::Engine(msg) => write!(f, "Invalid engine state: {}", msg),
        }
    }
}

impl std::error::Error for FormatError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for FormatError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl FormatError {
    pub fn invalid(field: &'static str, value: impl ToString) -> Self {
        Self::Invalid {
            field,
            value: value.to_string(),
        }
    }
}

/// Pulls trimmed, non-blank lines out of a buffered reader.
pub struct LineReader<R> {
    inner: R,
    line_number: usize,
}

impl<R: BufRead> LineReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            line_number: 0,
        }
    }

    /// Number of physical lines consumed so far
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    /// Read the next non-blank line with surrounding whitespace removed.
    pub fn next_line(&mut self) -> Result<String, FormatError> {
        let mut buf = String::new();
        loop {
            buf.clear();
            if self.inner.read_line(&mut buf)? == 0 {
                return Err(FormatError::UnexpectedEof);
            }
            self.line_number += 1;
            let trimmed = buf.trim();
            if !trimmed.is_empty() {
                return Ok(trimmed.to_string());
            }
        }
    }

    /// Read a line holding a single value.
    pub fn read_value<T: FromStr>(&mut self, field: &'static str) -> Result<T, FormatError> {
        let line = self.next_line()?;
        line.parse()
            .map_err(|_| FormatError::invalid(field, &line))
    }

    /// Read a line holding exactly one value per named field.
    pub fn read_fields<T: FromStr>(&mut self, fields: &[&'static str]) -> Result<Vec<T>, FormatError> {
        let line = self.next_line()?;
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() != fields.len() {
            let field = fields.get(tokens.len()).or(fields.last()).copied().unwrap_or("line");
            return Err(FormatError::invalid(field, &line));
        }
        tokens
            .iter()
            .zip(fields)
            .map(|(token, field)| token.parse().map_err(|_| FormatError::invalid(field, token)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skips_blank_lines() {
        let mut reader = LineReader::new("\n  \n 42 \n".as_bytes());
        let value: i32 = reader.read_value("count").unwrap();
        assert_eq!(value, 42);
        assert_eq!(reader.line_number(), 3);
    }

    #[test]
    fn test_read_fields() {
        let mut reader = LineReader::new("3 4 5\n".as_bytes());
        let values: Vec<i32> = reader.read_fields(&["x", "y", "value"]).unwrap();
        assert_eq!(values, vec![3, 4, 5]);
    }

    #[test]
    fn test_names_bad_field() {
        let mut reader = LineReader::new("3 oops 5\n".as_bytes());
        let err = reader.read_fields::<i32>(&["x", "y", "value"]).unwrap_err();
        assert!(matches!(err, FormatError::Invalid { field: "y", .. }));
    }

    #[test]
    fn test_short_line_is_invalid() {
        let mut reader = LineReader::new("3\n".as_bytes());
        let err = reader.read_fields::<i32>(&["width", "height"]).unwrap_err();
        assert!(matches!(err, FormatError::Invalid { field: "height", .. }));
    }

    #[test]
    fn test_eof() {
        let mut reader = LineReader::new("".as_bytes());
        assert!(matches!(
            reader.read_value::<i32>("width"),
            Err(FormatError::UnexpectedEof)
        ));
    }
}

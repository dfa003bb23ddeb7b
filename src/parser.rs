//! SQL template and property-string parsers using nom.
//!
//! Two small grammars live here:
//!
//! ```text
//! SELECT name FROM actor WHERE note <> '?' AND actor_id = ?   -- comment ?
//!                                      ─┬─                ┬    ─────┬─────
//!                                       │                 │         └── kept as text
//!                                       │                 └── Placeholder
//!                                       └── quoted, kept as text
//!
//! ?serverSidePrepare=true&clientCache=true&cacheSizeLimit=2048
//! ┬ ─────────┬───────── ┬
//! │          │          └── separator
//! │          └── key=value
//! └── optional leading '?'
//! ```

use nom::{
    IResult,
    branch::alt,
    bytes::complete::{tag, take_until, take_while1},
    character::complete::{anychar, char, not_line_ending, satisfy},
    combinator::{eof, map, not, opt, peek, recognize, value},
    multi::{many0, many0_count, separated_list0},
    sequence::{pair, preceded, separated_pair, terminated, tuple},
};
use std::fmt::Write;

use crate::error::{BenchError, BenchResult};

/// One piece of a parsed SQL template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Piece {
    /// Literal SQL, including quoted sections and comments.
    Text(String),
    /// A `?` parameter marker.
    Placeholder,
}

/// A SQL statement split into literal text and parameter markers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    sql: String,
    pieces: Vec<Piece>,
}

impl Template {
    /// The SQL text as given.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn pieces(&self) -> &[Piece] {
        &self.pieces
    }

    /// Number of `?` markers outside quotes and comments.
    pub fn placeholder_count(&self) -> usize {
        self.pieces
            .iter()
            .filter(|p| matches!(p, Piece::Placeholder))
            .count()
    }

    /// Substitute integer parameters into the text, in order.
    ///
    /// Integers are rendered as plain literals, so no quoting or escaping is
    /// involved.
    pub fn render(&self, params: &[i64]) -> BenchResult<String> {
        let expected = self.placeholder_count();
        if params.len() != expected {
            return Err(BenchError::Execution(format!(
                "Template expects {} parameter(s), got {}",
                expected,
                params.len()
            )));
        }

        let mut sql = String::with_capacity(self.sql.len() + params.len() * 20);
        let mut params = params.iter();
        for piece in &self.pieces {
            match piece {
                Piece::Text(text) => sql.push_str(text),
                Piece::Placeholder => {
                    if let Some(v) = params.next() {
                        let _ = write!(sql, "{}", v);
                    }
                }
            }
        }
        Ok(sql)
    }
}

#[derive(Debug, Clone)]
enum RawPiece<'a> {
    Text(&'a str),
    Placeholder,
}

/// Parse a SQL statement into a [`Template`].
pub fn parse_template(sql: &str) -> BenchResult<Template> {
    match many0(template_piece)(sql) {
        Ok(("", raw)) => Ok(assemble(sql, raw)),
        Ok((remaining, _)) => {
            let what = if remaining.starts_with("/*") {
                "comment"
            } else {
                "quoted section"
            };
            Err(BenchError::parse(
                sql.len() - remaining.len(),
                format!("Unterminated {}: '{}'", what, preview(remaining)),
            ))
        }
        Err(e) => Err(BenchError::parse(0, format!("Parse failed: {:?}", e))),
    }
}

fn assemble(sql: &str, raw: Vec<RawPiece<'_>>) -> Template {
    let mut pieces: Vec<Piece> = Vec::new();
    for piece in raw {
        match piece {
            RawPiece::Placeholder => pieces.push(Piece::Placeholder),
            RawPiece::Text(text) => match pieces.last_mut() {
                Some(Piece::Text(prev)) => prev.push_str(text),
                _ => pieces.push(Piece::Text(text.to_string())),
            },
        }
    }
    Template {
        sql: sql.to_string(),
        pieces,
    }
}

fn preview(rest: &str) -> String {
    rest.chars().take(24).collect()
}

fn template_piece(input: &str) -> IResult<&str, RawPiece<'_>> {
    alt((
        value(RawPiece::Placeholder, char('?')),
        map(|i| quoted('\'', i), RawPiece::Text),
        map(|i| quoted('"', i), RawPiece::Text),
        map(|i| quoted('`', i), RawPiece::Text),
        map(line_comment, RawPiece::Text),
        map(block_comment, RawPiece::Text),
        map(plain_text, RawPiece::Text),
        // A '-' or '/' that did not open a comment. An unclosed "/*" is left
        // unconsumed and reported by the caller.
        map(
            alt((tag("-"), terminated(tag("/"), not(char('*'))))),
            RawPiece::Text,
        ),
    ))(input)
}

/// A quoted string or identifier. Handles backslash escapes and doubled quotes.
fn quoted(quote: char, input: &str) -> IResult<&str, &str> {
    recognize(tuple((
        char(quote),
        many0_count(alt((
            value((), pair(char('\\'), anychar)),
            value((), pair(char(quote), char(quote))),
            value((), satisfy(move |c| c != quote && c != '\\')),
        ))),
        char(quote),
    )))(input)
}

/// `# ...`, or `-- ...` where the dashes are followed by whitespace, a
/// control character or the end of input. `2--1` is arithmetic in MySQL.
fn line_comment(input: &str) -> IResult<&str, &str> {
    let dashes = terminated(
        tag("--"),
        alt((
            peek(recognize(satisfy(|c| c.is_whitespace() || c.is_control()))),
            eof,
        )),
    );
    recognize(pair(alt((dashes, tag("#"))), not_line_ending))(input)
}

fn block_comment(input: &str) -> IResult<&str, &str> {
    recognize(tuple((tag("/*"), take_until("*/"), tag("*/"))))(input)
}

fn plain_text(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| !matches!(c, '?' | '\'' | '"' | '`' | '-' | '#' | '/'))(input)
}

/// Parse a connection-string style option list into `(key, value)` pairs.
///
/// Accepts an optional leading `?`. Keys are validated by the caller.
pub fn parse_properties(input: &str) -> BenchResult<Vec<(String, String)>> {
    let input = input.trim();

    match properties(input) {
        Ok(("", pairs)) => Ok(pairs
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()),
        Ok((remaining, _)) => Err(BenchError::parse(
            input.len() - remaining.len(),
            format!("Unexpected trailing content: '{}'", remaining),
        )),
        Err(e) => Err(BenchError::parse(0, format!("Parse failed: {:?}", e))),
    }
}

fn properties(input: &str) -> IResult<&str, Vec<(&str, &str)>> {
    preceded(opt(char('?')), separated_list0(char('&'), property))(input)
}

fn property(input: &str) -> IResult<&str, (&str, &str)> {
    separated_pair(
        take_while1(|c: char| c.is_alphanumeric() || c == '_'),
        char('='),
        take_while1(|c: char| c != '&' && !c.is_whitespace()),
    )(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_single_placeholder() {
        let t = parse_template("SELECT * FROM actor WHERE actor_id = ?").unwrap();
        assert_eq!(t.placeholder_count(), 1);
        assert_eq!(
            t.pieces(),
            &[
                Piece::Text("SELECT * FROM actor WHERE actor_id = ".into()),
                Piece::Placeholder
            ]
        );
    }

    #[test]
    fn test_markers_in_quotes_and_comments_are_text() {
        let sql = "SELECT 'a?b', \"c?\", `d?` -- e?\nFROM t /* f? */ WHERE x = ? # g?";
        let t = parse_template(sql).unwrap();
        assert_eq!(t.placeholder_count(), 1);
    }

    #[test]
    fn test_escaped_and_doubled_quotes() {
        let t = parse_template(r"SELECT 'it''s ?', 'back\'slash ?' FROM t WHERE id = ?").unwrap();
        assert_eq!(t.placeholder_count(), 1);
    }

    #[test]
    fn test_lone_dash_and_slash() {
        let t = parse_template("SELECT a - 1, b / 2 FROM t WHERE id = ?").unwrap();
        assert_eq!(t.placeholder_count(), 1);
        assert_eq!(t.render(&[3]).unwrap(), "SELECT a - 1, b / 2 FROM t WHERE id = 3");
    }

    #[test]
    fn test_unterminated_quote() {
        let err = parse_template("SELECT 'oops WHERE id = ?").unwrap_err();
        match err {
            BenchError::Parse { position, .. } => assert_eq!(position, 7),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_double_dash_without_space_is_arithmetic() {
        let t = parse_template("SELECT * FROM actor WHERE actor_id = 2--1 + ?").unwrap();
        assert_eq!(t.placeholder_count(), 1);
        assert_eq!(
            t.render(&[5]).unwrap(),
            "SELECT * FROM actor WHERE actor_id = 2--1 + 5"
        );

        let t = parse_template("SELECT ? --\tcomment ?\nFROM dual --").unwrap();
        assert_eq!(t.placeholder_count(), 1);
    }

    #[test]
    fn test_unterminated_block_comment() {
        let err = parse_template("SELECT 1 /* ? ").unwrap_err();
        match err {
            BenchError::Parse { position, message } => {
                assert_eq!(position, 9);
                assert!(message.contains("comment"), "{message}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_render_checks_arity() {
        let t = parse_template("SELECT ? + ?").unwrap();
        assert_eq!(t.render(&[1, 2]).unwrap(), "SELECT 1 + 2");
        assert!(t.render(&[1]).is_err());
    }

    #[test]
    fn test_render_negative_literal() {
        let t = parse_template("SELECT * FROM t WHERE id = ?").unwrap();
        assert_eq!(t.render(&[-4]).unwrap(), "SELECT * FROM t WHERE id = -4");
    }

    #[test]
    fn test_properties() {
        let props = parse_properties("?useServerPrepStmts=true&cachePrepStmts=false").unwrap();
        assert_eq!(
            props,
            vec![
                ("useServerPrepStmts".to_string(), "true".to_string()),
                ("cachePrepStmts".to_string(), "false".to_string()),
            ]
        );
    }

    #[test]
    fn test_properties_empty() {
        assert!(parse_properties("").unwrap().is_empty());
        assert!(parse_properties("?").unwrap().is_empty());
    }

    #[test]
    fn test_properties_trailing_separator() {
        let err = parse_properties("clientCache=true&").unwrap_err();
        match err {
            BenchError::Parse { position, .. } => assert_eq!(position, 16),
            other => panic!("unexpected error: {other}"),
        }
    }
}

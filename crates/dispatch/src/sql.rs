//! Tokenizing and splitting of SQL scripts.
//!
//! Only the tokenizer is used, statements are never parsed. This keeps
//! Postgres only syntax such as `CLUSTER ON` usable.

use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::keywords::Keyword;
use sqlparser::tokenizer::{Location, Token, TokenWithSpan, Tokenizer};

use crate::errors::Result;

/// Tokenize sql, dropping whitespace and comments.
pub fn tokenize(sql: &str) -> Result<Vec<TokenWithSpan>> {
    let dialect = PostgreSqlDialect {};
    let tokens = Tokenizer::new(&dialect, sql).tokenize_with_location()?;
    Ok(tokens
        .into_iter()
        .filter(|t| !matches!(t.token, Token::Whitespace(_) | Token::EOF))
        .collect())
}

/// Check if the token is the given unquoted keyword.
pub fn is_keyword(token: &Token, keyword: Keyword) -> bool {
    matches!(token, Token::Word(w) if w.quote_style.is_none() && w.keyword == keyword)
}

/// Converts tokenizer locations (1-based line and character column) into
/// byte offsets.
struct Offsets<'a> {
    sql: &'a str,
    line_starts: Vec<usize>,
}

impl<'a> Offsets<'a> {
    fn new(sql: &'a str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(sql.match_indices('\n').map(|(idx, _)| idx + 1))
            .collect();
        Offsets { sql, line_starts }
    }

    fn offset(&self, loc: Location) -> usize {
        let line = (loc.line as usize).saturating_sub(1);
        let start = match self.line_starts.get(line) {
            Some(start) => *start,
            None => return self.sql.len(),
        };
        let column = (loc.column as usize).saturating_sub(1);
        self.sql[start..]
            .char_indices()
            .nth(column)
            .map(|(idx, _)| start + idx)
            .unwrap_or(self.sql.len())
    }
}

/// Split a script into statements on top level semicolons.
///
/// Returned statements are trimmed and don't include the terminating
/// semicolon. Leading comments are dropped, empty statements are skipped.
pub fn split_statements(sql: &str) -> Result<Vec<&str>> {
    let offsets = Offsets::new(sql);
    let mut statements = Vec::new();
    let mut start: Option<usize> = None;
    let mut end = 0;

    for tok in tokenize(sql)? {
        match tok.token {
            Token::SemiColon => {
                if let Some(s) = start.take() {
                    statements.push(sql[s..end].trim());
                }
            }
            _ => {
                start.get_or_insert_with(|| offsets.offset(tok.span.start));
                end = offsets.offset(tok.span.end);
            }
        }
    }
    if let Some(s) = start {
        statements.push(sql[s..end].trim());
    }

    Ok(statements)
}

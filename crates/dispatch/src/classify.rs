//! Decides what to do with each incoming statement.

use sqlparser::keywords::Keyword;
use sqlparser::tokenizer::Token;

use crate::sql::{is_keyword, tokenize};

/// Application name used by the remote connections opened for dispatched
/// statements.
pub const REMOTE_APPLICATION_NAME: &str = "pg_parallizator";

/// What should happen to a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementAction {
    /// Run it on the issuing session as usual.
    Passthrough,
    /// Run it on its own remote connection without waiting for it.
    Dispatch,
    /// Wait for all dispatched statements, then run it as usual.
    BarrierThenProceed,
}

/// Information about where a statement is being executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifyContext {
    /// Statement was issued directly by the client rather than from inside
    /// a function or another statement.
    pub top_level: bool,
    /// Application name of the issuing session.
    pub application_name: Option<String>,
    pub max_workers: usize,
}

impl ClassifyContext {
    pub fn top_level(max_workers: usize) -> Self {
        ClassifyContext {
            top_level: true,
            application_name: None,
            max_workers,
        }
    }

    /// The session is itself one of our remote connections. Dispatching from
    /// there would recurse.
    fn is_remote_session(&self) -> bool {
        self.application_name.as_deref() == Some(REMOTE_APPLICATION_NAME)
    }
}

/// Classify a single statement.
///
/// Plain `CREATE [UNIQUE] INDEX` is dispatched. `ALTER TABLE ... CLUSTER ON`
/// (and the materialized view form) needs the index to exist, so everything in flight is drained first.
/// Anything else passes through.
pub fn classify(statement: &str, ctx: &ClassifyContext) -> StatementAction {
    // Statements the tokenizer rejects are left for the server to report.
    let tokens: Vec<Token> = match tokenize(statement) {
        Ok(tokens) => tokens
            .into_iter()
            .map(|t| t.token)
            .take_while(|t| *t != Token::SemiColon)
            .collect(),
        Err(_) => return StatementAction::Passthrough,
    };
    let kw = |idx: usize, keyword: Keyword| {
        tokens
            .get(idx)
            .is_some_and(|t| is_keyword(t, keyword))
    };

    if kw(0, Keyword::CREATE) {
        let idx = if kw(1, Keyword::UNIQUE) { 2 } else { 1 };
        if kw(idx, Keyword::INDEX)
            && !kw(idx + 1, Keyword::CONCURRENTLY)
            && ctx.top_level
            && !ctx.is_remote_session()
            && ctx.max_workers > 0
        {
            return StatementAction::Dispatch;
        }
        return StatementAction::Passthrough;
    }

    let alters_relation = kw(0, Keyword::ALTER)
        && (kw(1, Keyword::TABLE) || (kw(1, Keyword::MATERIALIZED) && kw(2, Keyword::VIEW)));
    if alters_relation {
        let cluster_on = tokens.windows(2).any(|pair| {
            is_keyword(&pair[0], Keyword::CLUSTER) && is_keyword(&pair[1], Keyword::ON)
        });
        if cluster_on {
            return StatementAction::BarrierThenProceed;
        }
    }

    StatementAction::Passthrough
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> ClassifyContext {
        ClassifyContext::top_level(4)
    }

    #[test]
    fn create_index_dispatches() {
        let cases = [
            "CREATE INDEX idx ON t (a)",
            "create unique index on t (a, b)",
            "/* build */ Create Index idx_b ON t USING btree (b);",
        ];
        for case in cases {
            assert_eq!(StatementAction::Dispatch, classify(case, &ctx()), "{case}");
        }
    }

    #[test]
    fn create_index_passthrough() {
        let cases = [
            "CREATE INDEX CONCURRENTLY idx ON t (a)",
            "create unique index concurrently on t (a)",
            "CREATE TABLE index (a int)",
            "create table t (a int)",
            "select 'create index i on t (a)'",
            "create index on t (a) where b = 'unterminated",
        ];
        for case in cases {
            assert_eq!(
                StatementAction::Passthrough,
                classify(case, &ctx()),
                "{case}"
            );
        }
    }

    #[test]
    fn context_disables_dispatch() {
        let stmt = "create index on t (a)";

        let mut nested = ctx();
        nested.top_level = false;
        assert_eq!(StatementAction::Passthrough, classify(stmt, &nested));

        let mut remote = ctx();
        remote.application_name = Some(REMOTE_APPLICATION_NAME.to_string());
        assert_eq!(StatementAction::Passthrough, classify(stmt, &remote));

        assert_eq!(
            StatementAction::Passthrough,
            classify(stmt, &ClassifyContext::top_level(0))
        );
    }

    #[test]
    fn cluster_on_is_barrier() {
        let cases = [
            "ALTER TABLE t CLUSTER ON idx",
            "alter table if exists only s.t add column c int, cluster on t_a_idx",
            "ALTER MATERIALIZED VIEW mv CLUSTER ON mv_a_idx",
            "alter materialized view if exists s.mv cluster on mv_a_idx",
        ];
        for case in cases {
            assert_eq!(
                StatementAction::BarrierThenProceed,
                classify(case, &ctx()),
                "{case}"
            );
        }

        let cases = [
            "ALTER TABLE t SET WITHOUT CLUSTER",
            "ALTER TABLE t ADD COLUMN \"cluster\" int",
            "CLUSTER t USING idx",
            "ALTER VIEW v RENAME TO cluster_on",
            "ALTER MATERIALIZED VIEW mv SET WITHOUT CLUSTER",
        ];
        for case in cases {
            assert_eq!(
                StatementAction::Passthrough,
                classify(case, &ctx()),
                "{case}"
            );
        }
    }
}

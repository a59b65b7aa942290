//! Scripted executor for unit tests.

use crate::client::{Executor, Row};
use crate::error::{TsqlError, TsqlResult};
use crate::qb::Params;
use crate::value::Value;
use std::sync::Mutex;

enum Reply {
    Rows(Vec<Row>),
    Affected(u64),
    Fail(String),
}

/// Answers statements by the first registered SQL fragment they contain.
/// Unmatched queries return no rows; unmatched statements affect none.
pub(crate) struct MockExecutor {
    replies: Vec<(String, Reply)>,
    version: String,
    log: Mutex<Vec<(String, Params)>>,
}

impl Default for MockExecutor {
    fn default() -> Self {
        Self {
            replies: Vec::new(),
            version: "16.0.1000.6".to_string(),
            log: Mutex::new(Vec::new()),
        }
    }
}

impl MockExecutor {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn version(mut self, version: &str) -> Self {
        self.version = version.to_string();
        self
    }

    pub(crate) fn rows(mut self, fragment: &str, rows: Vec<Row>) -> Self {
        self.replies.push((fragment.to_string(), Reply::Rows(rows)));
        self
    }

    pub(crate) fn affected(mut self, fragment: &str, n: u64) -> Self {
        self.replies.push((fragment.to_string(), Reply::Affected(n)));
        self
    }

    pub(crate) fn fail(mut self, fragment: &str, message: &str) -> Self {
        self.replies.push((fragment.to_string(), Reply::Fail(message.to_string())));
        self
    }

    /// Every statement seen so far, in order.
    pub(crate) fn statements(&self) -> Vec<(String, Params)> {
        self.log.lock().unwrap().clone()
    }

    pub(crate) fn count_matching(&self, fragment: &str) -> usize {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|(sql, _)| sql.contains(fragment))
            .count()
    }

    fn reply(&self, sql: &str, params: &Params) -> Option<&Reply> {
        self.log.lock().unwrap().push((sql.to_string(), params.clone()));
        self.replies
            .iter()
            .find(|(fragment, _)| sql.contains(fragment.as_str()))
            .map(|(_, reply)| reply)
    }
}

impl Executor for MockExecutor {
    async fn execute(&self, sql: &str, params: &Params) -> TsqlResult<u64> {
        match self.reply(sql, params) {
            Some(Reply::Affected(n)) => Ok(*n),
            Some(Reply::Rows(rows)) => Ok(rows.len() as u64),
            Some(Reply::Fail(msg)) => Err(TsqlError::upstream(msg.clone())),
            None => Ok(0),
        }
    }

    async fn query_all(&self, sql: &str, params: &Params) -> TsqlResult<Vec<Row>> {
        match self.reply(sql, params) {
            Some(Reply::Rows(rows)) => Ok(rows.clone()),
            Some(Reply::Affected(_)) | None => Ok(Vec::new()),
            Some(Reply::Fail(msg)) => Err(TsqlError::upstream(msg.clone())),
        }
    }

    async fn server_version_string(&self) -> TsqlResult<String> {
        Ok(self.version.clone())
    }
}

/// A catalog column row as returned by the column query.
pub(crate) fn column_row(name: &str, data_type: &str, nullable: bool, identity: bool) -> Row {
    Row::from_pairs([
        ("column_name", Value::from(name)),
        ("is_nullable", Value::from(if nullable { "YES" } else { "NO" })),
        ("data_type", Value::from(data_type)),
        ("column_default", Value::Null),
        ("numeric_precision", Value::Null),
        ("numeric_scale", Value::Null),
        ("is_identity", Value::from(i64::from(identity))),
        ("is_computed", Value::from(0_i64)),
        ("comment", Value::Null),
    ])
}

/// A single-column row.
pub(crate) fn row1(column: &str, value: impl Into<Value>) -> Row {
    Row::from_pairs([(column, value.into())])
}

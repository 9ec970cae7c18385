//! Request options and their query string encoding.

use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::{Map, Value};

use crate::error::WapiError;
use crate::transport::Query;

/// Options for fetch, paginated fetch and count.
///
/// Built like `GetOptions::new().param("comment~", "office").proxy_search("gm")`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GetOptions {
    /// Search filters. Ignored when fetching by object reference.
    pub params: Option<Map<String, Value>>,
    pub return_fields: Option<Vec<String>>,
    /// Extra fields on top of the default ones. Ignored when `return_fields` is set.
    pub return_fields_plus: Option<Vec<String>>,
    /// `GM` or `LOCAL`, any case.
    pub proxy_search: Option<String>,
    /// One of `json`, `json-pretty`, `xml`, `xml-pretty`. Defaults to `json`.
    pub return_type: Option<String>,
}

impl GetOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn params(mut self, params: Map<String, Value>) -> Self {
        self.params = Some(params);
        self
    }

    /// Add one search filter.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params
            .get_or_insert_with(Map::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn return_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.return_fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn return_fields_plus<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.return_fields_plus = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn proxy_search(mut self, proxy_search: impl Into<String>) -> Self {
        self.proxy_search = Some(proxy_search.into());
        self
    }

    pub fn return_type(mut self, return_type: impl Into<String>) -> Self {
        self.return_type = Some(return_type.into());
        self
    }
}

/// Scheduling and approval options shared by create, update and delete.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScheduleOptions {
    /// Unix timestamp, strictly in the future.
    pub schedule_time: Option<i64>,
    pub schedule_now: bool,
    pub schedule_predecessor_task: Option<String>,
    /// `WARN` or `NONE`, any case.
    pub schedule_warn_level: Option<String>,
    pub approval_comment: Option<String>,
    /// `true` or `false`, any case.
    pub approval_query_mode: Option<String>,
    pub approval_ticket_number: Option<i64>,
}

impl ScheduleOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule_time(mut self, timestamp: i64) -> Self {
        self.schedule_time = Some(timestamp);
        self
    }

    pub fn schedule_now(mut self, now: bool) -> Self {
        self.schedule_now = now;
        self
    }

    pub fn predecessor_task(mut self, task: impl Into<String>) -> Self {
        self.schedule_predecessor_task = Some(task.into());
        self
    }

    pub fn warn_level(mut self, level: impl Into<String>) -> Self {
        self.schedule_warn_level = Some(level.into());
        self
    }

    pub fn approval_comment(mut self, comment: impl Into<String>) -> Self {
        self.approval_comment = Some(comment.into());
        self
    }

    pub fn approval_query_mode(mut self, mode: impl Into<String>) -> Self {
        self.approval_query_mode = Some(mode.into());
        self
    }

    pub fn approval_ticket_number(mut self, ticket: i64) -> Self {
        self.approval_ticket_number = Some(ticket);
        self
    }

    /// Encode as `_schedinfo.*` / `_approvalinfo.*` parameters, checking
    /// `schedule_time` against the current clock.
    pub fn to_query(&self) -> Result<Query, WapiError> {
        self.to_query_at(unix_now())
    }

    /// Encode against an explicit `now` (seconds since the epoch).
    ///
    /// # Errors
    ///
    /// Returns `WapiError::IncompatibleOperation` when both `schedule_time`
    /// and `schedule_now` are set, and `WapiError::BadParameter` for any
    /// value outside its allowed range.
    pub fn to_query_at(&self, now: i64) -> Result<Query, WapiError> {
        let mut query = Query::new();

        if self.schedule_time.is_some() && self.schedule_now {
            return Err(WapiError::IncompatibleOperation(
                "you cannot use _schedinfo.scheduled_time and _schedinfo.schedule_now at the same time"
                    .into(),
            ));
        }

        if let Some(time) = self.schedule_time {
            if time <= now {
                return Err(WapiError::BadParameter(format!(
                    "schedule_time must be a positive integer representing a FUTURE TIME but you provide {}",
                    time
                )));
            }
            push(&mut query, "_schedinfo.scheduled_time", time.to_string());
        }
        if self.schedule_now {
            push(&mut query, "_schedinfo.schedule_now", "1");
        }
        if let Some(task) = &self.schedule_predecessor_task {
            push(&mut query, "_schedinfo.predecessor_task", task.as_str());
        }
        if let Some(level) = &self.schedule_warn_level {
            let level = level.to_uppercase();
            if level != "WARN" && level != "NONE" {
                return Err(WapiError::BadParameter(format!(
                    "schedule_warn_level must be either WARN or NONE but you provide {}",
                    self.schedule_warn_level.as_deref().unwrap_or_default()
                )));
            }
            push(&mut query, "_schedinfo.warnlevel", level);
        }
        if let Some(comment) = &self.approval_comment {
            push(&mut query, "_approvalinfo.comment", comment.as_str());
        }
        if let Some(mode) = &self.approval_query_mode {
            let mode = mode.to_lowercase();
            if mode != "true" && mode != "false" {
                return Err(WapiError::BadParameter(format!(
                    "approval_query_mode must be either true or false but you provide {}",
                    self.approval_query_mode.as_deref().unwrap_or_default()
                )));
            }
            push(&mut query, "_approvalinfo.query_mode", mode);
        }
        if let Some(ticket) = self.approval_ticket_number {
            push(&mut query, "_approvalinfo.ticket_number", ticket.to_string());
        }

        Ok(query)
    }
}

/// Options for create and update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteOptions {
    pub schedule: ScheduleOptions,
    pub return_fields: Option<Vec<String>>,
    pub return_fields_plus: Option<Vec<String>>,
}

impl WriteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(mut self, schedule: ScheduleOptions) -> Self {
        self.schedule = schedule;
        self
    }

    pub fn return_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.return_fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn return_fields_plus<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.return_fields_plus = Some(fields.into_iter().map(Into::into).collect());
        self
    }
}

/// Append a parameter.
pub(crate) fn push(query: &mut Query, key: &str, value: impl Into<String>) {
    query.push((key.to_string(), value.into()));
}

/// Append a JSON value as query parameters. Arrays repeat the key.
pub(crate) fn push_value(query: &mut Query, key: &str, value: &Value) {
    match value {
        Value::Array(items) => {
            for item in items {
                push_value(query, key, item);
            }
        }
        Value::String(s) => push(query, key, s.as_str()),
        Value::Null => push(query, key, ""),
        other => push(query, key, other.to_string()),
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

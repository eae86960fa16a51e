//! Mock Backend Implementation
//!
//! Serves scripted responses in order and records every request it sees.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use ddtail_protocol::{LogsQuery, LogsResponse, RawLog, ResponseStatus};
use serde_json::{json, Value};

use super::failure::{FailureConfig, FailureInjector};
use crate::backend::{Fetcher, Page, TransportError};

/// Configurable mock backend for testing
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    responses: Arc<Mutex<VecDeque<LogsResponse>>>,
    requests: Arc<Mutex<Vec<LogsQuery>>>,
    failures: Arc<Mutex<FailureInjector>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a wire response
    pub fn push_response(&self, response: LogsResponse) {
        if let Ok(mut responses) = self.responses.lock() {
            responses.push_back(response);
        }
    }

    /// Queue a page of records
    pub fn push_page(&self, logs: Vec<RawLog>, next_cursor: Option<&str>, status: ResponseStatus) {
        self.push_response(LogsResponse {
            logs,
            next_log_id: next_cursor.map(str::to_string),
            status,
        });
    }

    /// Builder-style variant of `push_page`
    pub fn with_page(self, logs: Vec<RawLog>, next_cursor: Option<&str>, status: ResponseStatus) -> Self {
        self.push_page(logs, next_cursor, status);
        self
    }

    /// Inject a transport failure
    pub fn inject_failure(&self, config: FailureConfig) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.inject(config);
        }
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<LogsQuery> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// Cursor sent with each request
    pub fn cursors(&self) -> Vec<Option<String>> {
        self.requests().into_iter().map(|q| q.start_at).collect()
    }

    /// Scripted responses not yet served
    pub fn remaining(&self) -> usize {
        self.responses.lock().map(|r| r.len()).unwrap_or(0)
    }
}

impl Fetcher for MockBackend {
    fn fetch(&self, query: &LogsQuery) -> Result<Page, TransportError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(query.clone());
        }

        let injected = self.failures.lock().ok().and_then(|mut f| f.check());
        if let Some(error) = injected {
            return Err(error);
        }

        let next = self.responses.lock().ok().and_then(|mut r| r.pop_front());
        Ok(match next {
            Some(response) => Page::from_response(response),
            // An exhausted script behaves like a quiet backend.
            None => Page::from_response(LogsResponse::default()),
        })
    }
}

/// A record with the given id, timestamp and extra content fields
pub fn raw_log(id: &str, timestamp: &str, fields: Value) -> RawLog {
    let mut content = match fields {
        Value::Object(map) => map,
        _ => serde_json::Map::new(),
    };
    content.insert("timestamp".to_string(), json!(timestamp));
    RawLog {
        id: id.to_string(),
        content: Value::Object(content),
    }
}

/// A record whose only content is a timestamp and a message
pub fn message_log(id: &str, timestamp: &str, message: &str) -> RawLog {
    raw_log(id, timestamp, json!({ "message": message }))
}

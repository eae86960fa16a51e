//! Search session assembly
//!
//! Turns effective settings plus command-line choices into a ready
//! `TailEngine`, and runs it in the requested mode.

use std::io::Write;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::backend::{Fetcher, HttpTransport, TransportError};
use crate::config::{ConfigError, Settings};
use crate::exit::FailureKind;
use crate::normalize::Normalizer;
use crate::query::{QueryBuilder, QueryError, QueryOptions, TimeWindow};
use crate::render::{OutputMode, Renderer};
use crate::tail::{EngineConfig, TailEngine, TailError};

/// What the user asked for on the command line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchOptions {
    /// Poll forever instead of one page-walk.
    pub follow: bool,
    /// Relative window; overrides `query.range_seconds`.
    pub range: Option<Duration>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    /// Search text; overrides `query.text`.
    pub text: Option<String>,
    /// Page size; overrides `query.limit`.
    pub limit: Option<i64>,
    pub color: bool,
    pub utc: bool,
    pub json: bool,
}

impl SearchOptions {
    /// The configuration layer contributed by these options.
    pub fn cli_overrides(&self) -> Option<Value> {
        let mut query = Map::new();
        if let Some(range) = self.range {
            query.insert("range_seconds".to_string(), json!(range.as_secs()));
        }
        if let Some(text) = &self.text {
            query.insert("text".to_string(), json!(text));
        }
        if let Some(limit) = self.limit {
            query.insert("limit".to_string(), json!(limit));
        }

        if query.is_empty() {
            None
        } else {
            Some(json!({ "query": query }))
        }
    }

    pub fn output_mode(&self) -> OutputMode {
        if self.json {
            OutputMode::Json
        } else {
            OutputMode::Formatted
        }
    }
}

/// Errors raised while setting up or running a session
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error("Cannot create HTTP client: {0}")]
    Client(TransportError),

    #[error(transparent)]
    Tail(#[from] TailError),
}

impl SessionError {
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            SessionError::Config(_) => FailureKind::Config,
            SessionError::Query(_) => FailureKind::Usage,
            SessionError::Client(_) => FailureKind::Transport,
            SessionError::Tail(e) => e.failure_kind(),
        }
    }

    pub fn exit_code(&self) -> i32 {
        self.failure_kind().exit_code().code()
    }

    pub fn is_broken_pipe(&self) -> bool {
        matches!(self, SessionError::Tail(e) if e.is_broken_pipe())
    }
}

/// Query options from settings, with the absolute window from the command
/// line when both ends were given.
pub fn query_options(settings: &Settings, options: &SearchOptions) -> Result<QueryOptions, QueryError> {
    let defaults = settings.query();
    let window = TimeWindow::resolve(defaults.range_seconds, options.start, options.end)?;

    let mut query = QueryOptions::new(window).with_limit(defaults.limit);
    if let Some(text) = &defaults.text {
        query = query.with_text(text.clone());
    }
    Ok(query)
}

/// Assemble an engine over the given fetcher.
pub fn build_engine<F: Fetcher>(
    settings: &Settings,
    options: &SearchOptions,
    fetcher: F,
) -> Result<TailEngine<F>, SessionError> {
    let query = query_options(settings, options)?;
    debug!(
        text = query.effective_text(),
        limit = query.effective_limit(),
        window = ?query.window,
        "Query prepared"
    );

    let normalizer = Normalizer::new(settings.field_mapping().clone())
        .with_color(options.color && !options.json)
        .with_utc(options.utc);
    let renderer = Renderer::new(options.output_mode(), settings.templates().to_vec());

    Ok(TailEngine::new(
        fetcher,
        QueryBuilder::new(query),
        normalizer,
        renderer,
        EngineConfig::from_tail(settings.tail()),
    ))
}

/// HTTP transport for the configured backend.
pub fn connect(settings: &Settings) -> Result<HttpTransport, SessionError> {
    settings.server().require_credentials()?;
    HttpTransport::new(settings.server()).map_err(SessionError::Client)
}

/// Run the engine in the requested mode.
pub fn run<F, S, W>(engine: &mut TailEngine<F, S>, follow: bool, out: &mut W) -> Result<(), SessionError>
where
    F: Fetcher,
    S: crate::tail::Sleeper,
    W: Write,
{
    if follow {
        engine.run_tail(out)?;
    } else {
        engine.run_once(out)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FileLayer;
    use crate::mock::{message_log, MockBackend};
    use ddtail_protocol::ResponseStatus;

    fn settings(cli: Option<Value>) -> Settings {
        Settings::build(FileLayer::None, cli).unwrap()
    }

    #[test]
    fn test_cli_overrides_only_set_values() {
        assert_eq!(SearchOptions::default().cli_overrides(), None);

        let options = SearchOptions {
            range: Some(Duration::from_secs(300)),
            limit: Some(10),
            ..Default::default()
        };
        assert_eq!(
            options.cli_overrides(),
            Some(json!({"query": {"range_seconds": 300, "limit": 10}}))
        );
    }

    #[test]
    fn test_query_options_from_settings() {
        let options = SearchOptions {
            text: Some("service:web".to_string()),
            limit: Some(-1),
            ..Default::default()
        };
        let settings = settings(options.cli_overrides());
        let query = query_options(&settings, &options).unwrap();

        assert_eq!(query.window, TimeWindow::Relative(60));
        assert_eq!(query.effective_text(), "service:web");
        assert_eq!(query.effective_limit(), 50);
    }

    #[test]
    fn test_inverted_range_is_usage_error() {
        let options = SearchOptions {
            start: Some(Utc::now()),
            end: Some(Utc::now() - chrono::Duration::hours(1)),
            ..Default::default()
        };
        let err = build_engine(&settings(None), &options, MockBackend::new())
            .err()
            .unwrap();
        assert_eq!(err.failure_kind(), FailureKind::Usage);
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_missing_credentials() {
        let err = connect(&settings(None)).unwrap_err();
        assert!(matches!(err, SessionError::Config(_)));
        assert!(err.to_string().contains("api_key"));
    }

    #[test]
    fn test_single_shot_run() {
        let backend = MockBackend::new().with_page(
            vec![message_log("a", "2019-10-03T13:22:52.000Z", "hello")],
            None,
            ResponseStatus::Done,
        );
        let options = SearchOptions {
            json: true,
            ..Default::default()
        };
        let mut engine = build_engine(&settings(None), &options, backend.clone()).unwrap();

        let mut out = Vec::new();
        run(&mut engine, false, &mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), 1);
        assert!(text.contains("hello"));
        assert_eq!(backend.requests().len(), 1);
    }

    #[test]
    fn test_backend_error_exit_code() {
        let backend = MockBackend::new().with_page(vec![], None, ResponseStatus::Error);
        let mut engine = build_engine(&settings(None), &SearchOptions::default(), backend).unwrap();

        let err = run(&mut engine, false, &mut Vec::new()).unwrap_err();
        assert_eq!(err.exit_code(), 30);
    }
}

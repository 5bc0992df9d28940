//! Domain error types.
//!
//! Two deliberately separate families:
//! - [`MaestroError`]: fatal evaluation/data/config failures that unwind the
//!   current expression tree. A strategy run either produces a complete
//!   allocation or fails with one of these.
//! - [`PublishError`]: observability-sink failures, kept distinct so callers
//!   can ignore publish problems without masking real evaluation bugs.

/// A parse error with position information for strategy parsing.
#[derive(Debug, Clone, thiserror::Error)]
#[error("parse error at position {position}: {message}")]
pub struct ParseError {
    pub message: String,
    pub position: usize,
}

impl ParseError {
    /// Format the error with a caret pointing at the error position in the input.
    pub fn display_with_context(&self, input: &str) -> String {
        let caret = " ".repeat(self.position) + "^";
        format!(
            "{input}\n{caret}\n{err}",
            input = input,
            caret = caret,
            err = self
        )
    }
}

/// Failure to publish an observability event. Never converted into a
/// [`MaestroError`] implicitly.
#[derive(Debug, Clone, thiserror::Error)]
#[error("failed to publish {event} event: {reason}")]
pub struct PublishError {
    pub event: String,
    pub reason: String,
}

/// Top-level error type for maestro.
#[derive(Debug, thiserror::Error)]
pub enum MaestroError {
    #[error("unknown operator '{symbol}'")]
    UnknownOperator { symbol: String },

    #[error("operator '{operator}' expects {expected} argument(s), got {got}")]
    Arity {
        operator: String,
        expected: String,
        got: usize,
    },

    #[error("operator '{operator}' expected {expected}, got {got}")]
    ArgType {
        operator: String,
        expected: String,
        got: String,
    },

    #[error(
        "condition '{condition}' was false and no else branch exists; strategies must cover both branches"
    )]
    MissingElseBranch { condition: String },

    #[error("operator '{operator}' is no longer supported: {guidance}")]
    DeprecatedOperator { operator: String, guidance: String },

    #[error("operator '{operator}' produced no assets")]
    NoAssets { operator: String },

    #[error("no usable volatility for any of {candidates} candidate(s) in weight-inverse-volatility")]
    NoValidVolatilities { candidates: usize },

    #[error("no candidate in filter could be scored with metric '{metric}'")]
    NoScorableCandidates { metric: String },

    #[error("indicator {indicator} for {symbol}: {reason}")]
    Indicator {
        symbol: String,
        indicator: String,
        reason: String,
    },

    #[error("insufficient data for {symbol}: have {bars} bars, need {minimum} for {indicator}")]
    InsufficientData {
        symbol: String,
        indicator: String,
        bars: usize,
        minimum: usize,
    },

    #[error("market data error: {reason}")]
    MarketData { reason: String },

    #[error("return cache error: {reason}")]
    ReturnCache { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&MaestroError> for std::process::ExitCode {
    fn from(err: &MaestroError) -> Self {
        let code: u8 = match err {
            MaestroError::Io(_) => 1,
            MaestroError::ConfigParse { .. }
            | MaestroError::ConfigMissing { .. }
            | MaestroError::ConfigInvalid { .. } => 2,
            MaestroError::MarketData { .. } | MaestroError::ReturnCache { .. } => 3,
            MaestroError::Parse(_) => 4,
            MaestroError::Indicator { .. } | MaestroError::InsufficientData { .. } => 5,
            _ => 6,
        };
        std::process::ExitCode::from(code)
    }
}


use thiserror::Error;

#[derive(Error, Debug)]
pub enum PierreError {
    #[error("Config error: {0}")]
    Config(String),
    #[error("I/O error: {0}")]
    Io(String),
    #[error("Export error: {0}")]
    Export(String),
    #[error("Render error: {0}")]
    Render(String),
    #[error("Parse error{}: {message}", .line.map(|l| format!(" on line {l}")).unwrap_or_default())]
    Parse { message: String, line: Option<usize>, col: Option<usize> },
    #[error("Unknown name: '{0}'")]
    UnknownName(String),
    #[error("Unknown hypothesis: '{0}'")]
    UnknownHypothesis(String),
    #[error("Hypothesis '{0}' listed more than once")]
    DuplicateHypothesis(String),
    #[error("Prior for '{0}' declared after evidence was applied")]
    LatePrior(String),
    #[error("Evidence block gives no likelihood for hypothesis '{0}'")]
    MissingLikelihood(String),
    #[error("Division by zero in '{0}'")]
    DivisionByZero(String),
    #[error("Result of '{0}' is not a finite number")]
    NonFinite(String),
    #[error("Degenerate distribution: probabilities sum to {0}")]
    DegenerateDistribution(f64),
    #[error("Unknown block type '{0}'")]
    UnknownBlock(String),
    #[error("Internal invariant violated: {0}")]
    Invariant(String),
    #[error("line {line}: {source}")]
    Located { line: usize, source: Box<PierreError> },
}

impl PierreError {
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse { message: message.into(), line: None, col: None }
    }
    /// Attaches the 1-based line of the original document the error was raised on.
    /// Errors that already carry a location keep it.
    pub fn at_line(self, line: usize) -> Self {
        match self {
            Self::Parse { message, line: None, col } => Self::Parse { message, line: Some(line), col },
            located @ (Self::Parse { .. } | Self::Located { .. }) => located,
            other => Self::Located { line, source: Box::new(other) },
        }
    }
    /// The error with any location wrapper peeled off.
    pub fn root(&self) -> &PierreError {
        match self {
            Self::Located { source, .. } => source.root(),
            other => other,
        }
    }
    pub fn line(&self) -> Option<usize> {
        match self {
            Self::Parse { line, .. } => *line,
            Self::Located { line, .. } => Some(*line),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, PierreError>;

// Helper conversions
impl From<std::io::Error> for PierreError {
    fn from(e: std::io::Error) -> Self { Self::Io(e.to_string()) }
}
impl From<::config::ConfigError> for PierreError {
    fn from(e: ::config::ConfigError) -> Self { Self::Config(e.to_string()) }
}
impl From<serde_json::Error> for PierreError {
    fn from(e: serde_json::Error) -> Self { Self::Export(e.to_string()) }
}
impl From<serde_yaml::Error> for PierreError {
    fn from(e: serde_yaml::Error) -> Self { Self::Export(e.to_string()) }
}

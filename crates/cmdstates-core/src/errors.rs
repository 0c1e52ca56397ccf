use thiserror::Error;

/// Result type alias using StatesError
pub type Result<T> = std::result::Result<T, StatesError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable error code that can be used for programmatic
/// error handling, testing, and operator alerting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Input
    InvalidInput,
    InvalidDate,
    InvalidPowerCommand,
    MissingParam,
    UnknownCommandSet,

    // Data integrity
    CommandBeforeWindow,
    EmptyStates,

    // Dual-store consistency
    ArchiveNoMatch,
    ArchiveNotContiguous,
    ArchiveWouldEmpty,

    // Integration/IO
    Io,
    Serialization,
    Persistence,

    // Internal
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            ExErrorKind::InvalidDate => "ERR_INVALID_DATE",
            ExErrorKind::InvalidPowerCommand => "ERR_INVALID_POWER_COMMAND",
            ExErrorKind::MissingParam => "ERR_MISSING_PARAM",
            ExErrorKind::UnknownCommandSet => "ERR_UNKNOWN_COMMAND_SET",
            ExErrorKind::CommandBeforeWindow => "ERR_COMMAND_BEFORE_WINDOW",
            ExErrorKind::EmptyStates => "ERR_EMPTY_STATES",
            ExErrorKind::ArchiveNoMatch => "ERR_ARCHIVE_NO_MATCH",
            ExErrorKind::ArchiveNotContiguous => "ERR_ARCHIVE_NOT_CONTIGUOUS",
            ExErrorKind::ArchiveWouldEmpty => "ERR_ARCHIVE_WOULD_EMPTY",
            ExErrorKind::Io => "ERR_IO",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
            ExErrorKind::Persistence => "ERR_PERSISTENCE",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }
}

/// Canonical structured error type
///
/// Carries a classification kind plus operation and date context. Backends
/// produce these directly; domain errors convert into them for logging.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    date: Option<String>,
    message: String,
    source: Option<Box<ExError>>,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            date: None,
            message: String::new(),
            source: None,
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add the state or command date the error refers to
    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Add source error
    pub fn with_source(mut self, source: ExError) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Get the operation context, if any
    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    /// Get the date context, if any
    pub fn date(&self) -> Option<&str> {
        self.date.as_deref()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the source error, if any
    pub fn source_error(&self) -> Option<&ExError> {
        self.source.as_deref()
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(date) = &self.date {
            write!(f, " (date: {})", date)?;
        }
        if let Some(source) = &self.source {
            write!(f, " caused by {}", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {}

// ========== End Error Facility ==========

/// Error taxonomy for commanded-states operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StatesError {
    /// Power command payload is not five hex digits
    #[error("{mnemonic} in unexpected format")]
    InvalidPowerCommand { mnemonic: String },

    /// Date string could not be parsed or formatted
    #[error("Invalid date '{date}': {reason}")]
    InvalidDate { date: String, reason: String },

    /// Command is missing a parameter its type requires
    #[error("Command {cmd} at {date} is missing parameter {param}")]
    MissingParam {
        cmd: String,
        date: String,
        param: String,
    },

    /// Unknown state attribute name
    #[error("Unknown state key: {key}")]
    InvalidStateKey { key: String },

    /// Unknown command set name
    #[error("Unknown command set '{name}': {reason}")]
    UnknownCommandSet { name: String, reason: String },

    /// A command was found before the start of the window it was assembled for
    #[error("Found command at {date} before start of window {window_start}")]
    CommandBeforeWindow { date: String, window_start: String },

    /// The reconciler was handed nothing to reconcile
    #[error("Unexpected input of an empty states table")]
    EmptyStates,

    /// Archive has no rows at or after the deletion point
    #[error("Expected to delete archive states from {datestart} but none matched")]
    ArchiveNoMatch { datestart: String },

    /// Archive rows to delete do not form a contiguous block at the end
    #[error("Archive states table is not ordered by datestart after {datestart}")]
    ArchiveNotContiguous { datestart: String },

    /// Deleting would leave the archive empty
    #[error("Refusing to delete all {n_rows} archive rows from {datestart}")]
    ArchiveWouldEmpty { datestart: String, n_rows: usize },

    /// Backend failure
    #[error("{0}")]
    Persistence(ExError),

    /// Serialization failure
    #[error("Serialization error: {message}")]
    Serialization { message: String },
}

impl PartialEq for ExError {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.op == other.op && self.message == other.message
    }
}

impl From<ExError> for StatesError {
    fn from(err: ExError) -> Self {
        StatesError::Persistence(err)
    }
}

impl From<serde_json::Error> for StatesError {
    fn from(err: serde_json::Error) -> Self {
        StatesError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<StatesError> for ExError {
    fn from(err: StatesError) -> Self {
        let message = err.to_string();
        match err {
            StatesError::InvalidPowerCommand { .. } => {
                ExError::new(ExErrorKind::InvalidPowerCommand).with_message(message)
            }
            StatesError::InvalidDate { date, .. } => ExError::new(ExErrorKind::InvalidDate)
                .with_date(date)
                .with_message(message),
            StatesError::MissingParam { date, .. } => ExError::new(ExErrorKind::MissingParam)
                .with_date(date)
                .with_message(message),
            StatesError::InvalidStateKey { .. } => {
                ExError::new(ExErrorKind::InvalidInput).with_message(message)
            }
            StatesError::UnknownCommandSet { .. } => {
                ExError::new(ExErrorKind::UnknownCommandSet).with_message(message)
            }
            StatesError::CommandBeforeWindow { date, .. } => {
                ExError::new(ExErrorKind::CommandBeforeWindow)
                    .with_date(date)
                    .with_message(message)
            }
            StatesError::EmptyStates => ExError::new(ExErrorKind::EmptyStates).with_message(message),
            StatesError::ArchiveNoMatch { datestart } => ExError::new(ExErrorKind::ArchiveNoMatch)
                .with_date(datestart)
                .with_message(message),
            StatesError::ArchiveNotContiguous { datestart } => {
                ExError::new(ExErrorKind::ArchiveNotContiguous)
                    .with_date(datestart)
                    .with_message(message)
            }
            StatesError::ArchiveWouldEmpty { datestart, .. } => {
                ExError::new(ExErrorKind::ArchiveWouldEmpty)
                    .with_date(datestart)
                    .with_message(message)
            }
            StatesError::Persistence(inner) => inner,
            StatesError::Serialization { .. } => {
                ExError::new(ExErrorKind::Serialization).with_message(message)
            }
        }
    }
}

impl StatesError {
    /// Stable error code of the kind this error converts to
    pub fn code(&self) -> &'static str {
        ExError::from(self.clone()).code()
    }
}

use std::error::Error as StdError;
use std::fmt;
use thiserror::Error;

/// Boxed error detail carried as a source.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Queue,
    Task,
    Inference,
    Store,
    Config,
    Service,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Queue => write!(f, "queue"),
            ErrorKind::Task => write!(f, "task"),
            ErrorKind::Inference => write!(f, "inference"),
            ErrorKind::Store => write!(f, "store"),
            ErrorKind::Config => write!(f, "config"),
            ErrorKind::Service => write!(f, "service"),
        }
    }
}

pub struct ErrorInner {
    pub kind: ErrorKind,
    pub source: Option<BoxError>,
    pub message: Option<String>,
}

pub struct Error {
    pub inner: Box<ErrorInner>,
}

impl Error {
    pub fn new<E>(kind: ErrorKind, source: Option<E>) -> Error
    where
        E: Into<BoxError>,
    {
        Error {
            inner: Box::new(ErrorInner {
                kind,
                source: source.map(Into::into),
                message: None,
            }),
        }
    }

    pub fn with_message<E>(kind: ErrorKind, message: impl Into<String>, source: Option<E>) -> Error
    where
        E: Into<BoxError>,
    {
        Error {
            inner: Box::new(ErrorInner {
                kind,
                source: source.map(Into::into),
                message: Some(message.into()),
            }),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.inner.kind
    }

    pub fn is_queue(&self) -> bool {
        matches!(self.inner.kind, ErrorKind::Queue)
    }

    pub fn is_task(&self) -> bool {
        matches!(self.inner.kind, ErrorKind::Task)
    }

    pub fn is_store(&self) -> bool {
        matches!(self.inner.kind, ErrorKind::Store)
    }

    pub fn is_config(&self) -> bool {
        matches!(self.inner.kind, ErrorKind::Config)
    }

    /// True when the queue reported that it will never yield another item.
    pub fn is_queue_closed(&self) -> bool {
        self.inner
            .source
            .as_ref()
            .and_then(|s| s.downcast_ref::<QueueError>())
            .is_some_and(|e| matches!(e, QueueError::Closed))
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut f = f.debug_struct("vigil::Error");
        f.field("kind", &self.inner.kind);
        if let Some(ref message) = self.inner.message {
            f.field("message", message);
        }
        if let Some(ref source) = self.inner.source {
            f.field("source", source);
        }
        f.finish()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref message) = self.inner.message {
            write!(f, "{} error: {}", self.inner.kind, message)?;
        } else {
            write!(f, "{} error", self.inner.kind)?;
        }

        if let Some(ref source) = self.inner.source {
            write!(f, ": {source}")?;
        }

        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.inner
            .source
            .as_ref()
            .map(|e| &**e as &(dyn StdError + 'static))
    }
}

impl From<QueueError> for Error {
    fn from(err: QueueError) -> Self {
        Error::new(ErrorKind::Queue, Some(err))
    }
}

impl From<TaskError> for Error {
    fn from(err: TaskError) -> Self {
        Error::new(ErrorKind::Task, Some(err))
    }
}

impl From<InferenceError> for Error {
    fn from(err: InferenceError) -> Self {
        Error::new(ErrorKind::Inference, Some(err))
    }
}

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        Error::new(ErrorKind::Store, Some(err))
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Error::new(ErrorKind::Config, Some(err))
    }
}

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("connection failed")]
    ConnectionFailed(#[source] BoxError),
    #[error("push data to queue failed")]
    PushFailed(#[source] BoxError),
    #[error("receive from queue failed")]
    PopFailed(#[source] BoxError),
    #[error("queue closed")]
    Closed,
}

/// Raised while decoding a raw queue payload into a task.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("empty payload")]
    EmptyPayload,
    #[error("malformed payload: {0}")]
    Malformed(#[source] serde_json::Error),
    #[error("invalid field `{field}`: {reason}")]
    InvalidField {
        field: &'static str,
        reason: &'static str,
    },
}

#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("transport error: {0}")]
    Transport(#[source] BoxError),
    #[error("request timed out")]
    Timeout,
    #[error("unexpected status: {0}")]
    Status(u16),
    #[error("decode error: {0}")]
    Decode(String),
}

impl InferenceError {
    /// Short label used as a metric dimension.
    pub fn cause(&self) -> &'static str {
        match self {
            InferenceError::Transport(_) => "transport",
            InferenceError::Timeout => "timeout",
            InferenceError::Status(_) => "status",
            InferenceError::Decode(_) => "decode",
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("pool error: {0}")]
    Pool(String),
    #[error("redis error: {0}")]
    Redis(#[source] BoxError),
    #[error("invalid record `{key}`: {reason}")]
    InvalidRecord { key: String, reason: String },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Read(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid value for {var}: {value}")]
    InvalidEnv { var: &'static str, value: String },
}

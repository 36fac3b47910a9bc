use std::fmt::{Debug, Display, Formatter};

pub type Error = Box<dyn std::error::Error + Send + Sync>;

/// Coarse classification of a failure, used by callers to decide whether a
/// failure is local to one record or fatal to the whole call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A blob did not match the layout its discriminator promises.
    Decode,
    /// A point query returned nothing.
    NotFound,
    /// The RPC or subscription capability itself failed.
    Transport,
    /// An application-supplied handler returned an error or panicked.
    Handler,
    /// Configuration could not be read, parsed or written.
    Config,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorKind::Decode => "decode",
            ErrorKind::NotFound => "not found",
            ErrorKind::Transport => "transport",
            ErrorKind::Handler => "handler",
            ErrorKind::Config => "config",
        };
        write!(f, "{}", s)
    }
}

pub struct MonitorError {
    kind: ErrorKind,
    err: String,
    file: &'static str,
    line: u32,
    // Send + Sync so errors can cross the monitor task boundary
    source: Option<Error>,
}

impl MonitorError {
    pub fn new(
        kind: ErrorKind,
        err: impl Into<String>,
        file: &'static str,
        line: u32,
        source: Option<Error>,
    ) -> Self {
        Self {
            kind,
            err: err.into(),
            file,
            line,
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.err
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == ErrorKind::NotFound
    }

    pub fn is_transport(&self) -> bool {
        self.kind == ErrorKind::Transport
    }
}

#[macro_export]
macro_rules! monitor_error {
    ($kind:expr, $fmt:expr $(, $($args:tt)*)?) => {
        $crate::err::MonitorError::new(
            $kind,
            format!($fmt $(,$($args)*)?),
            file!(), line!(), None)
    };
}

#[macro_export]
macro_rules! monitor_error_with_source {
    ($kind:expr, $source:expr, $fmt:expr $(, $($args:tt)*)?) => {
        $crate::err::MonitorError::new(
            $kind,
            format!($fmt $(,$($args)*)?),
            file!(), line!(), Some(Box::new($source) as $crate::err::Error))
    }
}

impl Debug for MonitorError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]:{} {} error: {}", self.file, self.line, self.kind, self.err)?;
        if let Some(source) = &self.source {
            write!(f, " (caused by: {})", source)?;
        }
        Ok(())
    }
}

impl Display for MonitorError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.err)
    }
}

impl std::error::Error for MonitorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &dyn std::error::Error)
    }
}

/// This is defined as a convenience.
pub type Result<T> = std::result::Result<T, MonitorError>;

use std::error::Error as StdError;
use std::fmt;
use std::panic::Location;

use thiserror::Error;

/// File/line pair identifying where an error was raised or wrapped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    file: String,
    line: u32,
}

impl SourceLocation {
    pub const UNKNOWN_FILE: &'static str = "<unknown>";

    pub fn new(file: impl Into<String>, line: u32) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }

    /// Location of the code that called the current `#[track_caller]` function.
    #[track_caller]
    pub fn caller() -> Self {
        let location = Location::caller();
        Self::new(location.file(), location.line())
    }

    /// Sentinel used when no location could be resolved.
    pub fn unknown() -> Self {
        Self::new(Self::UNKNOWN_FILE, 0)
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn is_unknown(&self) -> bool {
        self.line == 0 && self.file == Self::UNKNOWN_FILE
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// The propagation state handed to [`AnnotatedError::wrap`].
///
/// Rust has no ambient traceback to inspect, so the wrap site is captured
/// explicitly. Located [`Fault`]s inside the wrapped error take precedence
/// over the wrap site.
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    wrap_site: Option<SourceLocation>,
}

impl ExecutionContext {
    /// Capture the caller as the wrap site.
    #[track_caller]
    pub fn capture() -> Self {
        Self::at(SourceLocation::caller())
    }

    pub fn at(location: SourceLocation) -> Self {
        Self {
            wrap_site: Some(location),
        }
    }

    /// A context with no wrap site. Errors without a located fault resolve
    /// to [`SourceLocation::unknown`].
    pub fn detached() -> Self {
        Self { wrap_site: None }
    }

    pub fn wrap_site(&self) -> Option<&SourceLocation> {
        self.wrap_site.as_ref()
    }
}

#[derive(Debug)]
enum FaultKind {
    Message(String),
    Error(Box<dyn StdError + Send + Sync + 'static>),
}

/// An error that remembers the location it was raised at.
///
/// Displays exactly like the message or error it carries.
#[derive(Debug)]
pub struct Fault {
    location: SourceLocation,
    kind: FaultKind,
}

impl Fault {
    pub fn new(location: SourceLocation, message: impl Into<String>) -> Self {
        Self {
            location,
            kind: FaultKind::Message(message.into()),
        }
    }

    /// Locate an existing error. An error that already is a `Fault` keeps
    /// its original location.
    pub fn from_error<E>(location: SourceLocation, error: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        let boxed: Box<dyn StdError + Send + Sync + 'static> = Box::new(error);
        match boxed.downcast::<Fault>() {
            Ok(fault) => *fault,
            Err(other) => Self {
                location,
                kind: FaultKind::Error(other),
            },
        }
    }

    pub fn location(&self) -> &SourceLocation {
        &self.location
    }

    /// The located error, when this fault wraps one rather than a bare message.
    pub fn inner(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        match &self.kind {
            FaultKind::Message(_) => None,
            FaultKind::Error(error) => Some(error.as_ref()),
        }
    }

    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        self.inner().and_then(|error| error.downcast_ref::<E>())
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            FaultKind::Message(message) => f.write_str(message),
            FaultKind::Error(error) => fmt::Display::fmt(error, f),
        }
    }
}

impl StdError for Fault {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match &self.kind {
            FaultKind::Message(_) => None,
            FaultKind::Error(error) => error.source(),
        }
    }
}

/// Locate `error` at the caller.
#[track_caller]
pub fn locate<E>(error: E) -> Fault
where
    E: StdError + Send + Sync + 'static,
{
    Fault::from_error(SourceLocation::caller(), error)
}

/// Attach the caller's location to the error side of a `Result`.
pub trait ResultExt<T> {
    fn located(self) -> Result<T, Fault>;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
    E: StdError + Send + Sync + 'static,
{
    #[track_caller]
    fn located(self) -> Result<T, Fault> {
        match self {
            Ok(value) => Ok(value),
            Err(error) => Err(Fault::from_error(SourceLocation::caller(), error)),
        }
    }
}

/// Build an `anyhow::Error` holding a [`Fault`] located at the macro call site.
#[macro_export]
macro_rules! fault {
    ($($arg:tt)+) => {
        $crate::__private::anyhow::Error::new($crate::exception::Fault::new(
            $crate::exception::SourceLocation::new(file!(), line!()),
            format!($($arg)+),
        ))
    };
}

/// Return early with a located [`Fault`], like `anyhow::bail!`.
#[macro_export]
macro_rules! raise {
    ($($arg:tt)+) => {
        return ::std::result::Result::Err($crate::fault!($($arg)+).into())
    };
}

/// Where a fault happened and what it said. Built once when an error is
/// wrapped; never changes afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticRecord {
    source_file: String,
    line_number: u32,
    original_message: String,
}

impl DiagnosticRecord {
    fn new(location: SourceLocation, original_message: String) -> Self {
        Self {
            source_file: location.file,
            line_number: location.line,
            original_message,
        }
    }

    pub fn source_file(&self) -> &str {
        &self.source_file
    }

    pub fn line_number(&self) -> u32 {
        self.line_number
    }

    pub fn original_message(&self) -> &str {
        &self.original_message
    }
}

impl fmt::Display for DiagnosticRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Error occurred in script [{}] line number [{}] error message [{}]",
            self.source_file, self.line_number, self.original_message
        )
    }
}

/// An error annotated with the file and line it originated from.
#[derive(Debug, Error)]
#[error("{record}")]
pub struct AnnotatedError {
    record: DiagnosticRecord,
    #[source]
    original: anyhow::Error,
}

impl AnnotatedError {
    /// Wrap `error`, resolving its origin from the deepest located [`Fault`]
    /// in its chain, then the context's wrap site, then the unknown sentinel.
    ///
    /// The walk stops at an already annotated error, so re-wrapping points at
    /// the new wrap site.
    pub fn wrap<E>(error: E, context: ExecutionContext) -> Self
    where
        E: Into<anyhow::Error>,
    {
        let original = error.into();
        let location = deepest_fault(&original)
            .cloned()
            .or(context.wrap_site)
            .unwrap_or_else(SourceLocation::unknown);
        let record = DiagnosticRecord::new(location, original.to_string());
        Self { record, original }
    }

    pub fn record(&self) -> &DiagnosticRecord {
        &self.record
    }

    pub fn original(&self) -> &anyhow::Error {
        &self.original
    }

    pub fn into_original(self) -> anyhow::Error {
        self.original
    }
}

fn deepest_fault(error: &anyhow::Error) -> Option<&SourceLocation> {
    let mut deepest = None;
    for cause in error.chain() {
        if cause.is::<AnnotatedError>() {
            break;
        }
        if let Some(fault) = cause.downcast_ref::<Fault>() {
            deepest = Some(fault.location());
            // A located annotated error hides its chain; the fault is the outermost wrap.
            if fault.downcast_ref::<AnnotatedError>().is_some() {
                break;
            }
        }
    }
    deepest
}

/// Wrap `error` using the caller as the wrap site.
#[track_caller]
pub fn annotate<E>(error: E) -> AnnotatedError
where
    E: Into<anyhow::Error>,
{
    AnnotatedError::wrap(error, ExecutionContext::capture())
}

pub trait AnnotateExt<T> {
    fn annotate(self) -> Result<T, AnnotatedError>;
}

impl<T, E> AnnotateExt<T> for Result<T, E>
where
    E: Into<anyhow::Error>,
{
    #[track_caller]
    fn annotate(self) -> Result<T, AnnotatedError> {
        match self {
            Ok(value) => Ok(value),
            Err(error) => Err(AnnotatedError::wrap(error, ExecutionContext::capture())),
        }
    }
}

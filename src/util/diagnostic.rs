//! User-facing errors and diagnostic formatting.
//!
//! Every failure a user can fix themselves (bad configuration, an unknown
//! step, a failing build tool) travels as a [`UserNotification`]. Anything
//! else reaching the CLI boundary is treated as an internal defect.

use std::fmt;
use std::path::PathBuf;

use miette::Diagnostic as MietteDiagnostic;
use thiserror::Error;

/// Common suggestion messages for consistent error handling.
pub mod suggestions {
    /// Suggestion when no project configuration file is found.
    pub const NO_CONFIG: &str =
        "help: Add a `yanga.yaml` to the project root or pass `--project-dir`";

    /// Suggestion when a variant is missing or ambiguous.
    pub const SELECT_VARIANT: &str = "help: Pass `--variant-name <NAME>` to pick a variant";

    /// Suggestion when a platform is missing or ambiguous.
    pub const SELECT_PLATFORM: &str = "help: Pass `--platform <NAME>` to pick a platform";

    /// Suggestion when a pipeline step is unknown.
    pub const STEP_NOT_FOUND: &str = "help: Run `yanga run --print` to list the pipeline steps";

    /// Suggestion when cmake cannot be located.
    pub const CMAKE_NOT_FOUND: &str =
        "help: Install CMake and make sure it is on PATH or installed by a pipeline step";

    /// Suggestion when a build tool fails.
    pub const BUILD_FAILED: &str = "help: Run `yanga run --verbose` for more details";
}

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// A diagnostic message with optional context and suggestions.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// Primary message
    pub message: String,
    /// Severity level
    pub severity: Severity,
    /// Additional context lines
    pub context: Vec<String>,
    /// Suggested fixes
    pub suggestions: Vec<String>,
    /// Related location (file path)
    pub location: Option<PathBuf>,
}

impl Diagnostic {
    /// Create a new error diagnostic.
    pub fn error(message: impl Into<String>) -> Self {
        Diagnostic {
            message: message.into(),
            severity: Severity::Error,
            context: Vec::new(),
            suggestions: Vec::new(),
            location: None,
        }
    }

    /// Create a new warning diagnostic.
    pub fn warning(message: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Warning,
            ..Diagnostic::error(message)
        }
    }

    /// Add context to the diagnostic.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context.push(context.into());
        self
    }

    /// Add a suggestion for fixing the issue.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    /// Add a file location.
    pub fn with_location(mut self, path: impl Into<PathBuf>) -> Self {
        self.location = Some(path.into());
        self
    }

    /// Format the diagnostic for terminal output.
    pub fn format(&self, color: bool) -> String {
        let mut output = String::new();

        let severity_str = match (color, self.severity) {
            (true, Severity::Error) => "\x1b[1;31merror\x1b[0m".to_string(),
            (true, Severity::Warning) => "\x1b[1;33mwarning\x1b[0m".to_string(),
            (false, severity) => severity.to_string(),
        };

        output.push_str(&format!("{}: {}\n", severity_str, self.message));

        if let Some(ref path) = self.location {
            output.push_str(&format!("  --> {}\n", path.display()));
        }

        for ctx in &self.context {
            output.push_str(&format!("  = {}\n", ctx));
        }

        for suggestion in &self.suggestions {
            output.push_str(&format!("  {}\n", suggestion));
        }

        output
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format(false))
    }
}

/// The one error type that is shown to the user as-is.
///
/// Raise it with `bail!(UserNotification::new(..))`; the CLI logs the
/// message and exits with code 1 without an internal backtrace.
#[derive(Debug, Clone, Error, MietteDiagnostic)]
#[error("{message}")]
#[diagnostic(code(yanga::user_notification))]
pub struct UserNotification {
    message: String,
    #[help]
    help: Option<String>,
    location: Option<PathBuf>,
}

impl UserNotification {
    /// Create a notification with just a message.
    pub fn new(message: impl Into<String>) -> Self {
        UserNotification {
            message: message.into(),
            help: None,
            location: None,
        }
    }

    /// Attach a help line.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Attach the file the problem originates from.
    pub fn with_location(mut self, path: impl Into<PathBuf>) -> Self {
        self.location = Some(path.into());
        self
    }

    /// The primary message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Convert to a printable diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let mut diag = Diagnostic::error(self.message.clone());
        if let Some(ref path) = self.location {
            diag = diag.with_location(path.clone());
        }
        if let Some(ref help) = self.help {
            diag = diag.with_suggestion(help.clone());
        }
        diag
    }
}

impl From<Diagnostic> for UserNotification {
    fn from(diag: Diagnostic) -> Self {
        let mut message = diag.message;
        for ctx in &diag.context {
            message.push_str(&format!("\n{}", ctx));
        }
        UserNotification {
            message,
            help: if diag.suggestions.is_empty() {
                None
            } else {
                Some(diag.suggestions.join("\n"))
            },
            location: diag.location,
        }
    }
}

/// Find a [`UserNotification`] anywhere in an error chain.
pub fn find_user_notification(err: &anyhow::Error) -> Option<&UserNotification> {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<UserNotification>())
}

/// Print a diagnostic to stderr.
pub fn emit(diagnostic: &Diagnostic, color: bool) {
    eprint!("{}", diagnostic.format(color));
}

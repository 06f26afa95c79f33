use std::fmt;

/// Application error type
#[derive(Debug)]
pub enum AppError {
    /// Browser/CDP level errors
    Browser(BrowserError),
    /// Navigation errors (all wait strategies exhausted)
    Navigation(NavigationError),
    /// Login verification errors
    Login(LoginError),
    /// Form interaction errors
    Form(FormError),
    /// Result extraction errors
    Result(ResultError),
    /// Record ingestion errors
    Ingest(IngestError),
    /// File operation errors
    File(FileError),
    /// Configuration errors
    Config(ConfigError),
    /// Anything else (wrapping third-party errors)
    Other(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Browser(e) => write!(f, "browser error: {}", e),
            AppError::Navigation(e) => write!(f, "navigation error: {}", e),
            AppError::Login(e) => write!(f, "login error: {}", e),
            AppError::Form(e) => write!(f, "form error: {}", e),
            AppError::Result(e) => write!(f, "result error: {}", e),
            AppError::Ingest(e) => write!(f, "ingest error: {}", e),
            AppError::File(e) => write!(f, "file error: {}", e),
            AppError::Config(e) => write!(f, "configuration error: {}", e),
            AppError::Other(msg) => write!(f, "error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Browser(e) => Some(e),
            AppError::Navigation(e) => Some(e),
            AppError::Login(e) => Some(e),
            AppError::Form(e) => Some(e),
            AppError::Result(e) => Some(e),
            AppError::Ingest(e) => Some(e),
            AppError::File(e) => Some(e),
            AppError::Config(e) => Some(e),
            AppError::Other(_) => None,
        }
    }
}

/// Browser/CDP level errors
#[derive(Debug)]
pub enum BrowserError {
    /// Connecting to an already-running browser failed
    ConnectionFailed {
        port: u16,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// Launching a fresh browser failed
    LaunchFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// Creating a page failed
    PageCreationFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// Executing injected JavaScript failed
    ScriptExecutionFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// Arming the download capture failed
    DownloadSetupFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl fmt::Display for BrowserError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BrowserError::ConnectionFailed { port, source } => {
                write!(f, "could not connect to browser (port {}): {}", port, source)
            }
            BrowserError::LaunchFailed { source } => {
                write!(f, "could not launch browser: {}", source)
            }
            BrowserError::PageCreationFailed { source } => {
                write!(f, "could not create page: {}", source)
            }
            BrowserError::ScriptExecutionFailed { source } => {
                write!(f, "script execution failed: {}", source)
            }
            BrowserError::DownloadSetupFailed { source } => {
                write!(f, "download capture setup failed: {}", source)
            }
        }
    }
}

impl std::error::Error for BrowserError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BrowserError::ConnectionFailed { source, .. }
            | BrowserError::LaunchFailed { source }
            | BrowserError::PageCreationFailed { source }
            | BrowserError::ScriptExecutionFailed { source }
            | BrowserError::DownloadSetupFailed { source } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
        }
    }
}

/// Navigation errors
#[derive(Debug)]
pub enum NavigationError {
    /// Every wait strategy in the ordered list failed
    AllStrategiesFailed {
        url: String,
        attempts: usize,
        last_error: String,
    },
    /// All strategies timed out: the portal blocks non-US egress
    GeoRestricted {
        url: String,
        detail: String,
    },
}

impl fmt::Display for NavigationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NavigationError::AllStrategiesFailed {
                url,
                attempts,
                last_error,
            } => {
                write!(
                    f,
                    "navigation to {} failed after {} strategies: {}",
                    url, attempts, last_error
                )
            }
            NavigationError::GeoRestricted { url, detail } => {
                write!(
                    f,
                    "access to {} blocked - likely geo-restriction; the portal rejects \
                     connections from outside the US ({})",
                    url, detail
                )
            }
        }
    }
}

impl std::error::Error for NavigationError {}

/// Login verification errors
#[derive(Debug)]
pub enum LoginError {
    /// An explicit failure indicator was present on the page
    FailureIndicator { text: String },
    /// Neither a success indicator nor a URL change was observed
    Unverified,
    /// Login fields were not found on the page
    FieldsNotFound,
}

impl fmt::Display for LoginError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoginError::FailureIndicator { text } => {
                write!(f, "login failed: {}", text)
            }
            LoginError::Unverified => {
                write!(f, "could not verify login success (no indicator, URL unchanged)")
            }
            LoginError::FieldsNotFound => {
                write!(f, "login form fields not found on page")
            }
        }
    }
}

impl std::error::Error for LoginError {}

/// Form interaction errors
#[derive(Debug)]
pub enum FormError {
    /// Login fields still present and verification fields absent
    StaleNavigation,
    /// No submit control resolved after exhausting the selector list
    SubmitControlNotFound,
    /// No file upload control resolved on the multi-record form
    UploadControlNotFound,
}

impl fmt::Display for FormError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormError::StaleNavigation => {
                write!(
                    f,
                    "still on login page - navigation to verification form failed"
                )
            }
            FormError::SubmitControlNotFound => {
                write!(f, "could not find submit control")
            }
            FormError::UploadControlNotFound => {
                write!(f, "could not find file upload control")
            }
        }
    }
}

impl std::error::Error for FormError {}

/// Result extraction errors
#[derive(Debug)]
pub enum ResultError {
    /// No download arrived and the page-to-PDF fallback also failed
    NoArtifact { detail: String },
}

impl fmt::Display for ResultError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResultError::NoArtifact { detail } => {
                write!(
                    f,
                    "no result artifact: download missing and PDF synthesis failed ({})",
                    detail
                )
            }
        }
    }
}

impl std::error::Error for ResultError {}

/// Record ingestion errors
#[derive(Debug)]
pub enum IngestError {
    /// Required columns absent from the source table
    MissingColumns { columns: Vec<String> },
    /// Every row was rejected during validation
    NoValidRecords,
    /// Row-level validation errors block the batch
    RowErrors { count: usize },
}

impl fmt::Display for IngestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IngestError::MissingColumns { columns } => {
                write!(f, "missing required columns: {}", columns.join(", "))
            }
            IngestError::NoValidRecords => {
                write!(f, "no valid records found in input")
            }
            IngestError::RowErrors { count } => {
                write!(f, "{} row-level validation errors block the batch", count)
            }
        }
    }
}

impl std::error::Error for IngestError {}

/// File operation errors
#[derive(Debug)]
pub enum FileError {
    /// Reading a file failed
    ReadFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// Writing a file failed
    WriteFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl fmt::Display for FileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileError::ReadFailed { path, source } => {
                write!(f, "read failed ({}): {}", path, source)
            }
            FileError::WriteFailed { path, source } => {
                write!(f, "write failed ({}): {}", path, source)
            }
        }
    }
}

impl std::error::Error for FileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FileError::ReadFailed { source, .. } | FileError::WriteFailed { source, .. } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
        }
    }
}

/// Configuration errors
#[derive(Debug)]
pub enum ConfigError {
    /// A required credential variable is absent or empty
    MissingCredentials { var_name: String },
    /// An environment variable could not be parsed
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingCredentials { var_name } => {
                write!(f, "credential variable {} is not set", var_name)
            }
            ConfigError::EnvVarParseFailed {
                var_name,
                value,
                expected_type,
            } => {
                write!(
                    f,
                    "environment variable {} unparseable: value '{}' is not a {}",
                    var_name, value, expected_type
                )
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ========== Conversions from common error types ==========

impl From<chromiumoxide::error::CdpError> for AppError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        AppError::Browser(BrowserError::ScriptExecutionFailed {
            source: Box::new(err),
        })
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Other(format!("HTTP request failed: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Other(format!("JSON error: {}", err))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::File(FileError::ReadFailed {
            path: String::new(),
            source: Box::new(err),
        })
    }
}

// ========== Convenience constructors ==========

impl AppError {
    pub fn missing_credentials(var_name: impl Into<String>) -> Self {
        AppError::Config(ConfigError::MissingCredentials {
            var_name: var_name.into(),
        })
    }

    pub fn browser_connection_failed(
        port: u16,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Browser(BrowserError::ConnectionFailed {
            port,
            source: Box::new(source),
        })
    }

    pub fn browser_launch_failed(
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Browser(BrowserError::LaunchFailed {
            source: Box::new(source),
        })
    }

    pub fn geo_restricted(url: impl Into<String>, detail: impl Into<String>) -> Self {
        AppError::Navigation(NavigationError::GeoRestricted {
            url: url.into(),
            detail: detail.into(),
        })
    }

    pub fn login_failure(text: impl Into<String>) -> Self {
        AppError::Login(LoginError::FailureIndicator { text: text.into() })
    }

    pub fn file_write_failed(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::File(FileError::WriteFailed {
            path: path.into(),
            source: Box::new(source),
        })
    }
}

// ========== Result type alias ==========

/// Application result type
pub type AppResult<T> = Result<T, AppError>;

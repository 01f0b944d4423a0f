use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeskError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Authentication failed ({status}) for {url}")]
    AuthError { status: u16, url: String },

    #[error("Validation failed: {}", format_field_errors(.fields))]
    ValidationError {
        fields: BTreeMap<String, Vec<String>>,
    },

    #[error("Backend returned {status} for {url}: {body}")]
    HttpStatusError {
        status: u16,
        url: String,
        body: String,
    },

    #[error("Unexpected response from {url}: {message}")]
    ResponseShapeError { url: String, message: String },

    #[error("{kind} '{id}' not found")]
    NotFoundError { kind: String, id: String },

    #[error("Layout error: {message}")]
    LayoutError { message: String },

    #[error("Interview flow error: cannot apply {event} during {step}")]
    InterviewFlowError { step: String, event: String },
}

pub type Result<T> = std::result::Result<T, DeskError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Auth,
    Validation,
    Configuration,
    Data,
    Flow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

fn format_field_errors(fields: &BTreeMap<String, Vec<String>>) -> String {
    fields
        .iter()
        .map(|(field, messages)| format!("{}: {}", field, messages.join("; ")))
        .collect::<Vec<_>>()
        .join(", ")
}

impl DeskError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            DeskError::ApiError(_) | DeskError::HttpStatusError { .. } => ErrorCategory::Network,
            DeskError::AuthError { .. } => ErrorCategory::Auth,
            DeskError::ValidationError { .. } => ErrorCategory::Validation,
            DeskError::ConfigError { .. }
            | DeskError::ConfigValidationError { .. }
            | DeskError::InvalidConfigValueError { .. }
            | DeskError::MissingConfigError { .. } => ErrorCategory::Configuration,
            DeskError::IoError(_)
            | DeskError::SerializationError(_)
            | DeskError::ResponseShapeError { .. }
            | DeskError::NotFoundError { .. } => ErrorCategory::Data,
            DeskError::LayoutError { .. } | DeskError::InterviewFlowError { .. } => {
                ErrorCategory::Flow
            }
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            DeskError::NotFoundError { .. } | DeskError::InterviewFlowError { .. } => {
                ErrorSeverity::Low
            }
            DeskError::ApiError(_)
            | DeskError::HttpStatusError { .. }
            | DeskError::ValidationError { .. }
            | DeskError::LayoutError { .. } => ErrorSeverity::Medium,
            DeskError::AuthError { .. }
            | DeskError::ResponseShapeError { .. }
            | DeskError::SerializationError(_) => ErrorSeverity::High,
            DeskError::IoError(_)
            | DeskError::ConfigError { .. }
            | DeskError::ConfigValidationError { .. }
            | DeskError::InvalidConfigValueError { .. }
            | DeskError::MissingConfigError { .. } => ErrorSeverity::Critical,
        }
    }

    /// Auth failures log the user out.
    pub fn is_auth_error(&self) -> bool {
        matches!(self, DeskError::AuthError { .. })
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            DeskError::ApiError(e) if e.is_timeout() => {
                "The backend did not answer in time".to_string()
            }
            DeskError::ApiError(_) => "Could not reach the backend".to_string(),
            DeskError::AuthError { .. } => "Your session has expired, please log in again".to_string(),
            DeskError::ValidationError { fields } => {
                format!("Some fields are invalid: {}", format_field_errors(fields))
            }
            DeskError::HttpStatusError { status, .. } => {
                format!("The backend rejected the request (HTTP {})", status)
            }
            DeskError::NotFoundError { kind, id } => format!("No {} with id {}", kind, id),
            DeskError::MissingConfigError { field } => {
                format!("Missing configuration value: {}", field)
            }
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Network => "Check the backend URL and your connection, then retry",
            ErrorCategory::Auth => "Provide a fresh token with --token or RECRUIT_DESK_TOKEN",
            ErrorCategory::Validation => "Fix the listed fields and submit again",
            ErrorCategory::Configuration => "Review the configuration file and command line flags",
            ErrorCategory::Data => "Reload the data; if it persists, inspect the backend response",
            ErrorCategory::Flow => "Go back to the previous step and try again",
        }
    }
}

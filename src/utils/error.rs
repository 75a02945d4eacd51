use thiserror::Error;

#[derive(Error, Debug)]
pub enum GuardError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value for {field}: {value} ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("{file}:{block} at line {line}: {message}")]
    InvalidAttributeError {
        file: String,
        block: String,
        line: usize,
        message: String,
    },

    #[error("Failed to parse blocks in {file}: {message}")]
    ParseError { file: String, message: String },

    #[error("Block at line {line} is not closed")]
    UnclosedBlockError { line: usize },

    #[error("Unexpected closed block at line {line}, character {character}")]
    UnexpectedEndTagError { line: usize, character: usize },

    #[error("Diff parsing error: {message}")]
    DiffError { message: String },

    #[error("Tree-sitter error: {message}")]
    GrammarError { message: String },

    #[error("Validation failed: {message}")]
    ValidationError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Io,
    Configuration,
    Input,
    Internal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// 使用者可修正的輸入或設定
    High,
    Critical,
}

impl ErrorSeverity {
    /// Process exit code. 1 is reserved for violations.
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorSeverity::High => 2,
            ErrorSeverity::Critical => 3,
        }
    }
}

impl GuardError {
    pub fn config(message: impl Into<String>) -> Self {
        GuardError::ConfigError {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            GuardError::IoError(_) => ErrorCategory::Io,
            GuardError::ConfigError { .. }
            | GuardError::InvalidConfigValueError { .. }
            | GuardError::InvalidAttributeError { .. } => ErrorCategory::Configuration,
            GuardError::ParseError { .. }
            | GuardError::UnclosedBlockError { .. }
            | GuardError::UnexpectedEndTagError { .. }
            | GuardError::DiffError { .. } => ErrorCategory::Input,
            GuardError::SerializationError(_)
            | GuardError::GrammarError { .. }
            | GuardError::ValidationError { .. } => ErrorCategory::Internal,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Configuration | ErrorCategory::Input => ErrorSeverity::High,
            ErrorCategory::Io | ErrorCategory::Internal => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            GuardError::IoError(_) => "Check that the files exist and are readable",
            GuardError::ConfigError { .. } | GuardError::InvalidConfigValueError { .. } => {
                "Check the command line flags and the .sortguard.toml file"
            }
            GuardError::InvalidAttributeError { .. } => {
                "Fix the attribute value on the block's start tag"
            }
            GuardError::ParseError { .. }
            | GuardError::UnclosedBlockError { .. }
            | GuardError::UnexpectedEndTagError { .. } => {
                "Make sure every <block> tag has a matching </block> tag"
            }
            GuardError::DiffError { .. } => {
                "Pipe the output of `git diff --patch` into sortguard"
            }
            GuardError::SerializationError(_)
            | GuardError::GrammarError { .. }
            | GuardError::ValidationError { .. } => "Re-run with --verbose and report the issue",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            GuardError::IoError(e) => format!("Could not access a file: {}", e),
            GuardError::InvalidAttributeError {
                file,
                block,
                line,
                message,
            } => format!("Block {}:{} defined at line {}: {}", file, block, line, message),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, GuardError>;

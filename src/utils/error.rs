use thiserror::Error;

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("Git operation failed: {0}")]
    GitError(#[from] git2::Error),

    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("File watcher error: {0}")]
    WatchError(#[from] notify::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("No repository found: {message}")]
    RepositoryNotFound { message: String },

    #[error("Repository {path} has no working directory")]
    BareRepository { path: String },

    #[error("Cannot read tutorial index {path}: {reason}")]
    IndexNotFound { path: String, reason: String },

    #[error("Missing configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Commit {oid}: {reason}")]
    MalformedCommit { oid: String, reason: String },

    #[error("Malformed tutorial history: {message}")]
    MalformedHistory { message: String },

    #[error("No commit is tagged with slug '{slug}'")]
    UnknownSlug { slug: String },

    #[error("Slug '{slug}' is used by more than one commit")]
    DuplicateSlug { slug: String },

    #[error("File '{path}' not found in tree of commit {oid}")]
    MissingFile { path: String, oid: String },

    #[error("File '{path}' is not valid UTF-8")]
    InvalidUtf8 { path: String },

    #[error("Shortcode error on line {line}: {message}")]
    Shortcode { line: usize, message: String },

    #[error("Tutorial '{name}' appears more than once in the index")]
    DuplicateTutorial { name: String },

    #[error("Release error: {message}")]
    Release { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Repository,
    TutorialContent,
    Output,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl BuildError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    pub fn malformed_commit(oid: impl ToString, reason: impl Into<String>) -> Self {
        Self::MalformedCommit {
            oid: oid.to_string(),
            reason: reason.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ConfigError { .. }
            | Self::RepositoryNotFound { .. }
            | Self::BareRepository { .. }
            | Self::IndexNotFound { .. }
            | Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            Self::GitError(_) | Self::Release { .. } => ErrorCategory::Repository,
            Self::MalformedCommit { .. }
            | Self::MalformedHistory { .. }
            | Self::UnknownSlug { .. }
            | Self::DuplicateSlug { .. }
            | Self::MissingFile { .. }
            | Self::InvalidUtf8 { .. }
            | Self::Shortcode { .. }
            | Self::DuplicateTutorial { .. }
            | Self::YamlError(_) => ErrorCategory::TutorialContent,
            Self::ZipError(_) => ErrorCategory::Output,
            Self::IoError(_) | Self::WatchError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Configuration | ErrorCategory::TutorialContent => ErrorSeverity::High,
            ErrorCategory::Repository => ErrorSeverity::Medium,
            ErrorCategory::Output | ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::ConfigError { .. }
            | Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. } => {
                "Check the command-line options and the settings file"
            }
            Self::RepositoryNotFound { .. } => {
                "Specify a repository with -r/--repository-path or the GIT_DIR environment variable"
            }
            Self::BareRepository { .. } => {
                "Gather from a clone with a working directory, where the index file is checked out"
            }
            Self::IndexNotFound { .. } => {
                "Check --index-file names a file in the repository's working directory"
            }
            Self::GitError(_) => "Check that the repository exists and the revision names a commit",
            Self::MalformedCommit { .. } | Self::MalformedHistory { .. } => {
                "Each commit should be the base, a tagged code change, a tutorial-text change, or an asset addition"
            }
            Self::UnknownSlug { .. } | Self::DuplicateSlug { .. } => {
                "Check the {#slug} prefixes of commit subjects against the tutorial text"
            }
            Self::MissingFile { .. } | Self::InvalidUtf8 { .. } => {
                "The tutorial directory needs UTF-8 tutorial.md and code.py files"
            }
            Self::Shortcode { .. } => "Shortcodes look like {{< commit slug >}} on a line of their own",
            Self::DuplicateTutorial { .. } | Self::YamlError(_) => {
                "index.yaml should list each tutorial once, with 'name' and 'tip-commit'"
            }
            Self::Release { .. } => {
                "The recipe branch should hold only index.yaml, each tutorial branch only its directory"
            }
            Self::ZipError(_) | Self::IoError(_) => "Check the output path is writable",
            Self::WatchError(_) => "Check the repository directory can be watched",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Repository => format!("Repository problem: {}", self),
            ErrorCategory::TutorialContent => format!("Tutorial content problem: {}", self),
            ErrorCategory::Output => format!("Could not write output: {}", self),
            ErrorCategory::System => format!("System error: {}", self),
        }
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }
}

pub type Result<T> = std::result::Result<T, BuildError>;

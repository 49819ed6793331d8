use std::path::PathBuf;

/// Exit code for a duplicate service name across definition documents.
pub const EXIT_DUPLICATE_SERVICE: i32 = 64;
/// Exit code for more than one service marked as default.
pub const EXIT_MULTIPLE_DEFAULTS: i32 = 65;

/// Unrecoverable registry validation failures.
///
/// Either of these corrupts routing correctness for every service, not just
/// the offending file, so the whole run aborts and no config artifacts are
/// written.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("duplicate service name '{name}': already defined in {first}, redefined in {second}")]
    DuplicateService {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("multiple services marked as default: '{first}' and '{second}'")]
    MultipleDefaults { first: String, second: String },
}

impl RegistryError {
    /// Distinct process exit code for this failure class.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::DuplicateService { .. } => EXIT_DUPLICATE_SERVICE,
            Self::MultipleDefaults { .. } => EXIT_MULTIPLE_DEFAULTS,
        }
    }
}

/// Recoverable, file-granular definition document failures. Logged and
/// skipped; the registry build continues with the remaining documents.
#[derive(Debug, thiserror::Error)]
pub enum DefinitionFileError {
    #[error("failed to read {path}: {source}")]
    Unreadable {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Malformed {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("{path}: top-level document is not a mapping of service names")]
    NotAMapping { path: PathBuf },
}

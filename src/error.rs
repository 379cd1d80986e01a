use std::path::Path;

/// Crate-wide error: a process exit code plus a human-readable message.
///
/// Exit codes:
/// - `2` input, I/O or configuration problems (including missing data files)
/// - `3` insufficient or inconsistent data
/// - `4` numeric or internal failures
#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    /// A serialized record collection the caller expected is not on disk.
    pub fn missing_data(path: &Path) -> Self {
        Self::new(
            2,
            format!(
                "'{}' not found. Ensure you ran `lcfeat download` to obtain the train/test data.",
                path.display()
            ),
        )
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

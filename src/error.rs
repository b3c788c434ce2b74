//! Application error type.
//!
//! Every fallible step returns `Result<T, AppError>`. The error carries the
//! process exit code alongside a human-readable message, so `main` only has to
//! print and exit.
//!
//! Exit codes:
//! - `2`: invalid configuration or filesystem failure
//! - `3`: malformed or unexpected API payload
//! - `4`: network failure or non-2xx HTTP response

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

    /// Bad dates, zero window size, unusable paths in config.
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(2, message)
    }

    /// Failed to create a directory or write an output file.
    pub fn io(message: impl Into<String>) -> Self {
        Self::new(2, message)
    }

    /// Response body was not the JSON array we expect.
    pub fn payload(message: impl Into<String>) -> Self {
        Self::new(3, message)
    }

    /// Connection failure, timeout, or non-2xx status.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(4, message)
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

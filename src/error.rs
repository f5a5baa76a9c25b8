//! Application error type.
//!
//! The numeric core never fails (degenerate fits surface as NaN fields), so
//! errors only come from the edges: input parsing, settings validation, file
//! I/O and the terminal. Each carries the process exit code it maps to.

/// Invalid input values or settings.
pub const EXIT_INVALID_INPUT: u8 = 2;
/// Not enough data to do what was asked.
pub const EXIT_INSUFFICIENT_DATA: u8 = 3;
/// I/O, terminal or other runtime failure.
pub const EXIT_RUNTIME: u8 = 4;

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

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(EXIT_INVALID_INPUT, message)
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        Self::new(EXIT_RUNTIME, message)
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

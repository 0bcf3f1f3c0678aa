//! Structured error types for xlpane.
//!
//! Nothing in this crate is fatal to the add-in session: callers catch these
//! at the boundary of each host reaction and keep serving events.

/// All errors that can occur while talking to the host or handling user input.
#[derive(Debug, thiserror::Error)]
pub enum XlpaneError {
    /// Malformed color, address, or action arguments.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The host does not offer a requested capability (e.g. an event type).
    #[error("Host capability unavailable: {0}")]
    HostUnavailable(String),

    /// A document interaction failed (sheet deleted mid-call, API rejection).
    #[error("Host call failed: {0}")]
    Host(String),

    /// Invalid configuration supplied at startup.
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON (de)serialization error.
    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, XlpaneError>;

impl XlpaneError {
    /// Short message suitable for a non-blocking user notification.
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidInput(msg) => msg.clone(),
            Self::HostUnavailable(what) => {
                format!("{what} is not supported by this version of Excel.")
            }
            Self::Host(msg) => format!("Excel API error: {msg}"),
            Self::Config(msg) => format!("Add-in configuration is invalid: {msg}"),
            Self::Json(e) => format!("Could not read add-in data: {e}"),
        }
    }

    /// Whether the failure came from the host side of the boundary.
    pub fn is_host_failure(&self) -> bool {
        matches!(self, Self::Host(_) | Self::HostUnavailable(_))
    }
}

#[cfg(target_arch = "wasm32")]
impl From<XlpaneError> for wasm_bindgen::JsValue {
    fn from(e: XlpaneError) -> Self {
        wasm_bindgen::JsValue::from_str(&e.to_string())
    }
}

use thiserror::Error;

/// The main error type for run control reboot operations.
///
/// Variants separate retryable network faults, fatal precondition faults
/// and data faults so that callers can decide whether to continue a batch
/// or abort the run.
#[derive(Error, Debug)]
pub enum RebootError {
    /// The management API answered with a status code >= 400
    ///
    /// # Fields
    /// * `status` - The HTTP status code
    /// * `body` - The response body, as text
    #[error("HTTP error {status}: {body}")]
    Http { status: u16, body: String },

    /// Represents transport failures while the route to the API is otherwise intact
    ///
    /// # Fields
    /// * `0` - A description of what went wrong during the connection attempt
    #[error("Connection error: {0}")]
    Connection(String),

    /// The request did not complete in time
    #[error("Timeout error: {0}")]
    Timeout(String),

    /// Any other request failure (builder errors, redirects, body errors)
    #[error("Request error: {0}")]
    Request(String),

    /// The SOCKS tunnel is required to reach the API and nothing listens on its port
    ///
    /// # Fields
    /// * `host` - The host the tunnel was expected on
    /// * `port` - The port the tunnel was expected on
    #[error("Missing tunnel to the control network: nothing listens on {host}:{port} (run `ssh -D {port} <username>@<jump-host>`)")]
    TunnelMissing { host: String, port: u16 },

    /// The response body did not have the expected shape
    #[error("Decode error: {0}")]
    Decode(String),

    /// Represents validation failures of identifiers, descriptors and settings
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A remote restart failed
    ///
    /// # Fields
    /// * `service` - The service descriptor being restarted
    /// * `stage` - The restart stage the failure happened in
    /// * `message` - A description of the failure
    #[error("Remote shell error for {service} during {stage}: {message}")]
    RemoteShell {
        service: String,
        stage: String,
        message: String,
    },

    /// A phase failed in a way that makes continuing unsafe
    #[error("Run aborted: {0}")]
    Aborted(String),

    /// The operator interrupted an operation
    #[error("Cancelled: {0}")]
    Cancelled(String),

    /// Invalid startup configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RebootError {
    /// Returns true if the whole run must stop on this error.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            RebootError::TunnelMissing { .. }
                | RebootError::Aborted(_)
                | RebootError::Configuration(_)
        )
    }

    /// Returns true for transport faults that may succeed on a later attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, RebootError::Connection(_) | RebootError::Timeout(_))
    }
}

/// Specialized error type for validation failures.
///
/// This enum provides detailed context about why a validation
/// failed, including field-specific errors and format violations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Represents a validation failure for a specific field
    ///
    /// # Fields
    /// * `field` - The name of the field that failed validation
    /// * `message` - A detailed message about why validation failed
    #[error("Field '{field}' validation failed: {message}")]
    Field { field: String, message: String },

    /// Represents format/syntax validation failures
    ///
    /// # Fields
    /// * `0` - Description of the format violation
    #[error("Format error: {0}")]
    Format(String),

    /// Represents violations of domain constraints
    ///
    /// # Fields
    /// * `0` - Description of the constraint violation
    #[error("Domain constraint violation: {0}")]
    ConstraintViolation(String),
}

/// Type alias for Results that may fail with a RebootError
pub type RebootResult<T> = Result<T, RebootError>;

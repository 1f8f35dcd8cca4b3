use thiserror::Error;

/// Everything that can go wrong while fetching a single page.
#[derive(Debug, Error)]
pub enum FetchError {
    /// 401 or 403. Never retried.
    #[error("{}", describe_status(*.status))]
    Auth { status: u16 },

    /// 429.
    #[error("{}", describe_status(429))]
    RateLimited,

    /// Any 5xx.
    #[error("{}", describe_status(*.status))]
    Server { status: u16 },

    /// Any other non-success status.
    #[error("{} Response: {}", describe_status(*.status), .body)]
    Client { status: u16, body: String },

    /// Transport failure before a status line was received (timeout, refused, reset).
    #[error("Request network/timeout error: {0}")]
    Network(#[from] reqwest::Error),

    /// The body did not have the expected shape.
    #[error("Malformed response on page {page}: {detail}")]
    Malformed { page: usize, detail: String },
}

impl FetchError {
    /// Classify a non-success HTTP status.
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 | 403 => FetchError::Auth { status },
            429 => FetchError::RateLimited,
            500..=599 => FetchError::Server { status },
            _ => FetchError::Client { status, body },
        }
    }

    /// Transient failures worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Network(_) | FetchError::RateLimited | FetchError::Server { .. } => true,
            FetchError::Auth { .. } | FetchError::Client { .. } | FetchError::Malformed { .. } => {
                false
            }
        }
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, FetchError::Auth { .. })
    }
}

/// Human-readable explanation of an HTTP status returned by the lifelog API.
pub fn describe_status(status: u16) -> String {
    match status {
        401 => "Authentication error (401 - Unauthorized). Please check your API key.".to_string(),
        403 => "Permission error (403 - Forbidden).".to_string(),
        404 => "API endpoint not found (404).".to_string(),
        429 => "API error (429 - Too Many Requests / Rate Limited).".to_string(),
        500 => "Server error (500 - Internal Server Error).".to_string(),
        502 => "Server error (502 - Bad Gateway).".to_string(),
        503 => "Server error (503 - Service Unavailable).".to_string(),
        504 => "Server error (504 - Gateway Timeout). The service is probably rate limiting you."
            .to_string(),
        400..=499 => format!("Client error ({status}). Check request parameters."),
        500..=599 => format!("Server error ({status})."),
        _ => format!("API error ({status})."),
    }
}

/// Errors produced while talking to the model or coercing its output.
///
/// Callers at the HTTP boundary collapse every variant into the same
/// generic failure; the distinction only matters for logs and tests.
///
/// # Examples
///
/// ```rust
/// use ideaforge_ai::AiError;
///
/// let err = AiError::UnexpectedShape("missing key 'swot'".to_string());
/// assert!(err.to_string().contains("swot"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum AiError {
    /// Provider settings are missing or unusable (e.g. no API key).
    #[error("AI: invalid provider configuration: {0}")]
    InvalidConfig(String),

    /// The HTTP request to the completion endpoint failed.
    #[error("AI: HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The completion endpoint answered with a non-success status.
    #[error("AI: API error: status={status}, body={body}")]
    Api { status: u16, body: String },

    /// The response carried no choices or an empty message.
    #[error("AI: empty completion")]
    EmptyResponse,

    /// The model output did not contain parseable JSON.
    #[error("AI: malformed JSON in model output: {0}")]
    MalformedJson(#[from] serde_json::Error),

    /// The JSON parsed but does not have the expected structure.
    #[error("AI: unexpected response shape: {0}")]
    UnexpectedShape(String),
}

pub type Result<T> = std::result::Result<T, AiError>;

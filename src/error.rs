use thiserror::Error;

/// Classified failures surfaced by the analysis pipeline.
///
/// Per-candidate failures are recorded during model fallback and never reach
/// the caller individually; the variant surfaced at the end is derived from
/// the last failure encountered.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("OpenRouter API key not configured. Please add OPENROUTER_API_KEY to your .env file")]
    NotConfigured,

    #[error("Could not decode the image: {0}")]
    ImageDecode(String),

    #[error("Request to {model} failed: {message}")]
    BackendRequest { model: String, message: String },

    #[error("Failed to parse nutrition data from the AI response: {0}")]
    MalformedResponse(String),

    #[error("No food items detected in the image. Please try a clearer photo")]
    NoItemsDetected,

    #[error("API quota exceeded ({0}). Please try again later")]
    RateLimited(String),

    #[error("AI model is currently overloaded ({0}). Please try again in a few moments")]
    Overloaded(String),
}

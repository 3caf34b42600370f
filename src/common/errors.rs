use thiserror::Error as ThisError;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Internal failure causes stay distinguishable even though the handlers
/// collapse all of them into one 500 response at the boundary.
#[derive(Debug, ThisError)]
pub enum Error {
    #[error("sentiment request failed: {0}")]
    Classifier(#[from] reqwest::Error),

    #[error("sentiment response contained no predictions")]
    EmptyClassification,

    #[error("store operation failed: {0}")]
    Store(#[source] BoxError),

    #[error("alert delivery failed: {0}")]
    Alert(#[source] BoxError),

    #[error("item attribute {0} is missing or malformed")]
    Attribute(&'static str),

    #[error("item contains a non-JSON-representable attribute")]
    UnsupportedAttribute,

    #[error("serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("response build failed: {0}")]
    Http(#[from] lambda_http::http::Error),
}

impl Error {
    pub fn store(err: impl Into<BoxError>) -> Self {
        Error::Store(err.into())
    }

    pub fn alert(err: impl Into<BoxError>) -> Self {
        Error::Alert(err.into())
    }
}

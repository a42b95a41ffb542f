use thiserror::Error;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("store returned status {code}: {body}")]
    Status { code: u16, body: String },

    #[error("could not decode response: {0}")]
    Decode(String),

    #[error("invalid range: {0}")]
    InvalidRange(String),

    #[error("invalid client configuration: {0}")]
    Config(String),
}

impl GatewayError {
    pub(crate) fn from_reqwest(context: &str, e: reqwest::Error) -> Self {
        if e.is_timeout() {
            GatewayError::Timeout(format!("{context}: {e}"))
        } else {
            GatewayError::Http(e)
        }
    }
}

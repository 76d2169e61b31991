/// Core error type for the sniper workspace.
///
/// The adapter crate maps serenity errors into this type so failures can be
/// handled consistently (user-facing message vs logged-and-skipped).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("invalid response mode: {0:?} (expected \"embed\" or \"webhook\")")]
    InvalidResponseMode(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("discord error: {0}")]
    Discord(String),
}

pub type Result<T> = std::result::Result<T, Error>;

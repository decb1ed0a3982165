use std::error::Error as StdError;
use std::fmt::Write as _;

use roster::RepoError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("repository error")]
    Repo(#[from] RepoError),
    #[error("configuration error")]
    Config(#[from] config::ConfigError),
    #[error("no configuration profile named `{0}`")]
    UnknownProfile(String),
}

/// Render `err` followed by every `source()` beneath it, one per line.
pub fn chain(err: &(dyn StdError + 'static)) -> String {
    let mut out = err.to_string();
    let mut cur = err.source();
    while let Some(cause) = cur {
        let _ = write!(out, "\n  caused by: {}", cause);
        cur = cause.source();
    }
    out
}

use crate::recipe::RecipeId;

/// Errors surfaced by the recommendation engine and its HTTP client.
///
/// `Clone` so a single failed page fetch can be handed to every caller that
/// was waiting on the same in-flight request.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    #[error("http transport error: {0}")]
    Transport(String),
    #[error("unexpected status {status} from {endpoint}")]
    Status { endpoint: String, status: u16 },
    #[error("failed to parse response: {0}")]
    Parse(String),
    #[error("failed to resolve page {page}")]
    PageFetch {
        page: u32,
        #[source]
        source: Box<Error>,
    },
    #[error("failed to fetch detail for recipe {id}: {reason}")]
    DetailFetch { id: RecipeId, reason: String },
    #[error("session was reset while page {page} was in flight")]
    SessionReset { page: u32 },
    #[error("session is closed")]
    SessionClosed,
}

impl Error {
    /// Wraps a failure that happened while resolving `page`.
    pub fn page_fetch(page: u32, source: Error) -> Self {
        match source {
            // Already attributed to a page, or not a fetch failure at all.
            Error::PageFetch { .. } | Error::SessionReset { .. } | Error::SessionClosed => source,
            other => Error::PageFetch {
                page,
                source: Box::new(other),
            },
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error::Parse(error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

use inat_protocol::LookupError;
use inat_query::QueryError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ResolveError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("Empty query")]
    EmptyQuery,

    #[error("Malformed query: {0}")]
    MalformedQuery(String),

    #[error("Nothing found: {0}")]
    NotFound(String),

    #[error("Ambiguous query: {0}")]
    Ambiguous(String),

    #[error(transparent)]
    Lookup(#[from] LookupError),
}

impl From<QueryError> for ResolveError {
    fn from(err: QueryError) -> Self {
        match err {
            QueryError::Malformed(reason) => ResolveError::MalformedQuery(reason),
        }
    }
}

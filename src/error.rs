use thiserror::Error;

#[derive(Error, Debug)]
pub enum CtrError {
    #[error("Counter store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Cannot init counter for key {key:?}: {source}")]
    SetAfterMissingRead {
        key: String,
        #[source]
        source: Box<CtrError>,
    },

    #[error("Cannot parse stored value {raw:?} for key {key:?} as integer")]
    MalformedStoredValue { key: String, raw: String },

    #[error("Counter {key:?} cannot be incremented past {value}")]
    CounterOverflow { key: String, value: i64 },

    #[error("{0} parameter is mandatory")]
    MissingParameter(&'static str),

    #[error("Invalid {name} parameter: {value:?}")]
    InvalidParameter { name: &'static str, value: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Request task failed: {0}")]
    TaskFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl CtrError {
    /// True for errors caused by the caller's input (reported as 400).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            CtrError::MissingParameter(_) | CtrError::InvalidParameter { .. }
        )
    }
}

pub type CtrResult<T> = Result<T, CtrError>;

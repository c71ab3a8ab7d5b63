use thiserror::Error;

/// Process exit codes reported by the CLI.
pub mod exit_code {
    pub const GENERIC: u8 = 1;
    pub const FETCH: u8 = 2;
    pub const PARSE: u8 = 3;
    pub const DATABASE: u8 = 4;
    pub const CONFIG: u8 = 5;
}

#[derive(Error, Debug)]
pub enum ScraperError {
    #[error("Fetch failed for {url}: HTTP {status}")]
    Fetch { url: String, status: u16 },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Worker {worker} failed: {message}")]
    Worker { worker: usize, message: String },
}

impl ScraperError {
    /// Status codes worth another attempt: rate limiting and server-side failures.
    pub fn is_retryable(&self) -> bool {
        match self {
            ScraperError::Fetch { status, .. } => *status == 429 || (500..=599).contains(status),
            ScraperError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            _ => false,
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            ScraperError::Fetch { .. } | ScraperError::Http(_) => exit_code::FETCH,
            ScraperError::Parse(_) => exit_code::PARSE,
            ScraperError::Store(_) => exit_code::DATABASE,
            ScraperError::Config(_) | ScraperError::Toml(_) => exit_code::CONFIG,
            ScraperError::Json(_) | ScraperError::Io(_) | ScraperError::Worker { .. } => {
                exit_code::GENERIC
            }
        }
    }
}

/// A structural element the extractor expected was absent or malformed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Missing required element '{element}' in {context}")]
    MissingElement {
        element: &'static str,
        context: String,
    },

    #[error("Malformed date '{input}': {reason}")]
    BadDate { input: String, reason: String },

    #[error("Malformed card quantity '{input}'")]
    BadQuantity { input: String },

    #[error("Malformed price '{input}'")]
    BadPrice { input: String },

    #[error("Malformed url '{input}': {reason}")]
    BadUrl { input: String, reason: String },
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Duplicate {table} row for key ({key})")]
    UniqueViolation { table: &'static str, key: String },

    #[error("No {table} row for key ({key})")]
    MissingRow { table: &'static str, key: String },

    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Database I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store connection lock poisoned")]
    Poisoned,
}

pub type Result<T> = std::result::Result<T, ScraperError>;
pub type StoreResult<T> = std::result::Result<T, StoreError>;

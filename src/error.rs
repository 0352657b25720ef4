use thiserror::Error;

#[derive(Error, Debug)]
pub enum TallyError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unknown account: {0}")]
    UnknownAccount(String),

    #[error("Unknown format: {0}")]
    UnknownFormat(String),

    #[error("No importer registered for account type: {0}")]
    NoImporter(String),

    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, TallyError>;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TinyOrmError {
    #[error("sled error")]
    Sled(#[from] sled::Error),
    #[error("serializer error")]
    Serializer(#[from] bincode::Error),
    #[error("sqlite error")]
    Sqlite(#[from] rusqlite::Error),
    #[error("no row with id {id} in table `{table}`")]
    NotFound { table: String, id: i64 },
    #[error("invalid record state: {0}")]
    InvalidState(&'static str),
    #[error("row does not match column contract: {0}")]
    Decode(String),
    #[error("unknown column `{0}`")]
    UnknownColumn(String),
    #[error("record is currently borrowed")]
    Borrowed,
}

impl TinyOrmError {
    /// Whether the error was raised by the underlying storage engine.
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            TinyOrmError::Sled(_) | TinyOrmError::Serializer(_) | TinyOrmError::Sqlite(_)
        )
    }
}

pub type DbResult<T> = Result<T, TinyOrmError>;

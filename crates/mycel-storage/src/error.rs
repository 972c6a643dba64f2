//! Storage error types

use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// RocksDB error
    #[error("rocksdb error: {0}")]
    RocksDb(#[from] rocksdb::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Deserialization error
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// Invalid column family
    #[error("invalid column family: {0}")]
    InvalidColumnFamily(String),

    /// Database not open
    #[error("database not open")]
    NotOpen,

    /// Database already open
    #[error("database already open")]
    AlreadyOpen,

    /// Invalid module namespace identifier
    #[error("invalid namespace: {0:?}")]
    InvalidNamespace(String),

    /// Rename target already holds state
    #[error("namespace already exists: {0}")]
    NamespaceExists(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

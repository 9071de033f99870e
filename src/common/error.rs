use thiserror::Error;

use super::types::{PageId, TransactionId};

/// Database error types
#[derive(Error, Debug)]
pub enum HeapDbError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed data: {0}")]
    Malformed(String),

    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("Ambiguous field name: {0}")]
    AmbiguousName(String),

    #[error("Incompatible types: {0}")]
    IncompatibleTypes(String),

    #[error("Page {0} not found")]
    PageNotFound(PageId),

    #[error("Invalid record id: {0}")]
    InvalidRid(String),

    #[error("Buffer pool is full, no clean pages available to evict")]
    BufferPoolFull,

    #[error("Lock on {page} unavailable for transaction {tid}")]
    LockUnavailable { page: PageId, tid: TransactionId },

    #[error("Transaction {0} is already running")]
    TransactionAlreadyRunning(TransactionId),

    #[error("Invalid slot ID: {0}")]
    InvalidSlotId(u16),

    #[error("Slot {0} is empty")]
    EmptySlot(u16),

    #[error("Page is full")]
    PageFull,
}

pub type Result<T> = std::result::Result<T, HeapDbError>;

mod buffer_pool;
mod lru_k_replacer;
mod page_lock;

pub use buffer_pool::*;
pub use lru_k_replacer::*;
pub use page_lock::*;

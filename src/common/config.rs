/// Size of a page in bytes (4 KB)
pub const PAGE_SIZE: usize = 4096;

/// Fixed on-disk width of every string field, in bytes
pub const STRING_LENGTH: usize = 32;

/// On-disk width of an integer field (i64, little-endian)
pub const INT_FIELD_SIZE: usize = 8;

/// Heap page header: slot count (i32) followed by used slot count (i32)
pub const HEAP_PAGE_HEADER_SIZE: usize = 8;

/// Default K value for LRU-K replacement policy
pub const DEFAULT_LRUK_K: usize = 2;

/// Default buffer pool size (number of pages)
pub const DEFAULT_BUFFER_POOL_SIZE: usize = 10;

/// Default number of right-side tuples an equality join expects to buffer
pub const DEFAULT_JOIN_BUFFER_SIZE: usize = 10_000;

/// Width of a row when tuples are pretty printed with aligned columns
pub const PRETTY_PRINT_WIDTH: usize = 120;

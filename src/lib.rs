//! heapdb - A heap-file storage engine with a pull-based query pipeline
//!
//! Tables are stored as heap files made of fixed-size pages. Every page
//! access goes through a bounded buffer pool that hands out page-level
//! reader/writer locks to transactions and never writes uncommitted data to
//! disk.
//!
//! # Architecture
//!
//! - **Tuples** (`tuple`): field types, descriptors, values and rows
//!   - `TupleDesc`: ordered list of typed, optionally qualified fields
//!   - `Tuple`: one row plus the record id of the slot it was read from
//!
//! - **Storage Layer** (`storage`): pages on disk
//!   - `DiskManager`: Reads and writes pages of one file
//!   - `HeapPage`: Fixed-width slotted page
//!   - `HeapFile`: Sequence of heap pages; inserts, deletes and scans
//!   - `load_from_csv`: Bulk loading from delimited text
//!
//! - **Buffer Pool** (`buffer`): Memory management for pages
//!   - `BufferPool`: Page cache, page locks, commit and abort
//!   - `LruKReplacer`: LRU-K choice of clean pages to evict
//!
//! - **Execution** (`execution`): Query operators
//!   - `Filter`, `Project`, `EqualityJoin`, `OrderBy`, `Limit`, `Aggregate`
//!   - `Insert`, `Delete`: mutations through a `DbFile`
//!   - `Expr`: field references, constants, arithmetic and comparisons
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use heapdb::buffer::BufferPool;
//! use heapdb::execution::{collect_tuples, BoolOp, Expr, Filter};
//! use heapdb::storage::{DbFile, HeapFile};
//! use heapdb::tuple::{DataType, Tuple, TupleDesc, Value};
//! use heapdb::TransactionId;
//!
//! let pool = Arc::new(BufferPool::new(50));
//! let desc = TupleDesc::builder()
//!     .field("id", DataType::Int)
//!     .field("name", DataType::String)
//!     .build_arc();
//! let people = HeapFile::open("people.dat", desc.clone(), pool.clone()).unwrap();
//!
//! let tid = TransactionId::new();
//! pool.begin_transaction(tid).unwrap();
//! people
//!     .insert_tuple(Tuple::new(desc, vec![Value::Int(1), Value::from("ada")]), tid)
//!     .unwrap();
//!
//! let first = Filter::new(
//!     Expr::compare(BoolOp::Eq, Expr::field("id", DataType::Int), Expr::constant(1)),
//!     people.clone(),
//! );
//! for tuple in collect_tuples(&first, tid).unwrap() {
//!     println!("{}", tuple);
//! }
//! pool.commit_transaction(tid).unwrap();
//! ```

pub mod buffer;
pub mod common;
pub mod execution;
pub mod storage;
pub mod tuple;

// Re-export commonly used types at the crate root
pub use common::{HeapDbError, PageId, RecordId, Result, SlotId, TransactionId};

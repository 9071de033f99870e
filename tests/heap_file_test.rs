//! Integration tests for heap files: persistence, deletes and CSV loading

use std::io::{Cursor, Write};
use std::sync::Arc;

use heapdb::buffer::BufferPool;
use heapdb::common::{HeapDbError, TransactionId, PAGE_SIZE};
use heapdb::execution::compute_field_sum;
use heapdb::storage::{CsvOptions, DbFile, HeapFile};
use heapdb::tuple::{DataType, Tuple, TupleBuilder, TupleDesc, Value};
use tempfile::{tempdir, NamedTempFile};

fn schema() -> Arc<TupleDesc> {
    TupleDesc::builder()
        .field("a", DataType::Int)
        .field("b", DataType::String)
        .build_arc()
}

fn row(desc: &Arc<TupleDesc>, a: i64, b: &str) -> Tuple {
    TupleBuilder::new(desc.clone()).value(a).value(b).build()
}

fn read_all(file: &HeapFile) -> Vec<Vec<Value>> {
    let tid = TransactionId::new();
    file.pool().begin_transaction(tid).unwrap();
    let rows = file
        .scan(tid)
        .map(|t| t.unwrap().values().to_vec())
        .collect();
    file.pool().commit_transaction(tid).unwrap();
    rows
}

#[test]
fn test_heap_file_persists_across_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("t.dat");
    let desc = schema();

    {
        let pool = Arc::new(BufferPool::new(10));
        let file = HeapFile::open(&path, desc.clone(), pool.clone()).unwrap();
        let tid = TransactionId::new();
        pool.begin_transaction(tid).unwrap();
        file.insert_tuple(row(&desc, 1, "x"), tid).unwrap();
        file.insert_tuple(row(&desc, 2, "y"), tid).unwrap();

        let seen: Vec<_> = file.scan(tid).map(|t| t.unwrap()).collect();
        assert_eq!(seen, vec![row(&desc, 1, "x"), row(&desc, 2, "y")]);
        pool.commit_transaction(tid).unwrap();
    }

    assert_eq!(std::fs::metadata(&path).unwrap().len(), PAGE_SIZE as u64);

    let pool = Arc::new(BufferPool::new(10));
    let file = HeapFile::open(&path, desc.clone(), pool).unwrap();
    assert_eq!(file.num_pages(), 1);
    assert_eq!(
        read_all(&file),
        vec![
            vec![Value::Int(1), Value::from("x")],
            vec![Value::Int(2), Value::from("y")],
        ]
    );
}

#[test]
fn test_uncommitted_inserts_never_reach_disk() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("t.dat");
    let desc = schema();
    let pool = Arc::new(BufferPool::new(10));

    let file = HeapFile::open(&path, desc.clone(), pool.clone()).unwrap();
    let setup = TransactionId::new();
    pool.begin_transaction(setup).unwrap();
    file.insert_tuple(row(&desc, 1, "kept"), setup).unwrap();
    pool.commit_transaction(setup).unwrap();

    let tid = TransactionId::new();
    pool.begin_transaction(tid).unwrap();
    file.insert_tuple(row(&desc, 2, "lost"), tid).unwrap();
    pool.abort_transaction(tid).unwrap();

    assert_eq!(read_all(&file), vec![vec![Value::Int(1), Value::from("kept")]]);

    drop(file);
    let reopened = HeapFile::open(&path, desc, Arc::new(BufferPool::new(10))).unwrap();
    assert_eq!(read_all(&reopened), vec![vec![Value::Int(1), Value::from("kept")]]);
}

#[test]
fn test_committed_delete_persists() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("t.dat");
    let desc = schema();

    {
        let pool = Arc::new(BufferPool::new(10));
        let file = HeapFile::open(&path, desc.clone(), pool.clone()).unwrap();
        let tid = TransactionId::new();
        pool.begin_transaction(tid).unwrap();
        for (a, b) in [(1, "one"), (2, "two"), (3, "three")] {
            file.insert_tuple(row(&desc, a, b), tid).unwrap();
        }
        pool.commit_transaction(tid).unwrap();

        let tid = TransactionId::new();
        pool.begin_transaction(tid).unwrap();
        let victim = file
            .scan(tid)
            .map(|t| t.unwrap())
            .find(|t| t.value(0) == Some(&Value::Int(2)))
            .unwrap();
        file.delete_tuple(&victim, tid).unwrap();
        pool.commit_transaction(tid).unwrap();
    }

    let file = HeapFile::open(&path, desc, Arc::new(BufferPool::new(10))).unwrap();
    assert_eq!(
        read_all(&file),
        vec![
            vec![Value::Int(1), Value::from("one")],
            vec![Value::Int(3), Value::from("three")],
        ]
    );
}

#[test]
fn test_file_spans_many_pages() {
    let desc = schema();
    let pool = Arc::new(BufferPool::new(3));
    let file = HeapFile::temporary(desc.clone(), pool.clone()).unwrap();
    let per_page = desc.slots_per_page();
    let total = per_page * 5 + 7;

    // Commit page by page so the small pool always has clean victims
    for chunk in (0..total).collect::<Vec<_>>().chunks(per_page) {
        let tid = TransactionId::new();
        pool.begin_transaction(tid).unwrap();
        for &i in chunk {
            file.insert_tuple(row(&desc, i as i64, "r"), tid).unwrap();
        }
        pool.commit_transaction(tid).unwrap();
    }

    assert_eq!(file.num_pages(), 6);
    let values: Vec<i64> = read_all(&file)
        .into_iter()
        .map(|r| r[0].as_int().unwrap())
        .collect();
    assert_eq!(values, (0..total as i64).collect::<Vec<_>>());
    assert!(pool.num_resident_pages() <= pool.capacity());
}

#[test]
fn test_load_csv_and_sum() {
    let mut csv = NamedTempFile::new().unwrap();
    write!(csv, "a,b\n1,x\n2,y\n3,z\n").unwrap();
    csv.flush().unwrap();

    let pool = Arc::new(BufferPool::new(10));
    assert_eq!(compute_field_sum(pool, csv.path(), schema(), "a").unwrap(), 6);
}

#[test]
fn test_load_csv_leaves_other_transactions_in_memory() {
    let desc = schema();
    let pool = Arc::new(BufferPool::new(2));
    let other_file = HeapFile::temporary(desc.clone(), pool.clone()).unwrap();
    let other = TransactionId::new();
    pool.begin_transaction(other).unwrap();
    other_file
        .insert_tuple(row(&desc, -1, "uncommitted"), other)
        .unwrap();

    // Enough rows to fill the pool twice over while `other` holds a dirty page
    let rows = desc.slots_per_page() + 50;
    let csv: String = (0..rows).map(|i| format!("{},r\n", i)).collect();
    let target = HeapFile::temporary(desc, pool.clone()).unwrap();
    let options = CsvOptions::default().with_header(false);
    assert_eq!(target.load_from_csv(Cursor::new(csv), &options).unwrap(), rows);

    pool.abort_transaction(other).unwrap();
    assert!(read_all(&other_file).is_empty());
    assert_eq!(read_all(&target).len(), rows);
}

#[test]
fn test_load_csv_with_options() {
    let pool = Arc::new(BufferPool::new(10));
    let file = HeapFile::temporary(schema(), pool).unwrap();
    let input = "7|seven|ignored\n-8|eight|ignored\n";
    let options = CsvOptions::default()
        .with_header(false)
        .with_separator("|")
        .with_skip_last_field(true);

    assert_eq!(file.load_from_csv(Cursor::new(input), &options).unwrap(), 2);
    assert_eq!(
        read_all(&file),
        vec![
            vec![Value::Int(7), Value::from("seven")],
            vec![Value::Int(-8), Value::from("eight")],
        ]
    );
}

#[test]
fn test_load_csv_rejects_bad_rows() {
    let pool = Arc::new(BufferPool::new(10));
    let file = HeapFile::temporary(schema(), pool).unwrap();

    let err = file
        .load_from_csv(Cursor::new("a,b\n1,x,extra\n"), &CsvOptions::default())
        .unwrap_err();
    assert!(matches!(err, HeapDbError::Malformed(_)));

    let err = file
        .load_from_csv(Cursor::new("a,b\nabc,x\n"), &CsvOptions::default())
        .unwrap_err();
    assert!(matches!(err, HeapDbError::TypeMismatch(_)));
    assert!(read_all(&file).is_empty());
}

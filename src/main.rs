use std::sync::Arc;

use heapdb::buffer::BufferPool;
use heapdb::execution::{collect_tuples, ArithOp, BoolOp, Expr, Filter, Operator, OrderBy, Project};
use heapdb::storage::{DbFile, HeapFile};
use heapdb::tuple::{DataType, TupleBuilder, TupleDesc};
use heapdb::TransactionId;

fn main() {
    println!("heapdb - A heap-file storage engine in Rust");
    println!("===========================================\n");

    let pool = Arc::new(BufferPool::default());
    println!("Created buffer pool with {} pages", pool.capacity());

    let desc = TupleDesc::builder()
        .field("id", DataType::Int)
        .field("name", DataType::String)
        .field("age", DataType::Int)
        .build_arc();
    let people = HeapFile::temporary(desc.clone(), pool.clone()).expect("Failed to create heap file");
    println!("Created heap file at: {}\n", people.backing_file().display());

    // Insert some tuples
    let tid = TransactionId::new();
    pool.begin_transaction(tid).expect("Failed to begin transaction");
    let rows = [(1, "ada", 36), (2, "brian", 17), (3, "grace", 85), (4, "linus", 21)];
    for (id, name, age) in rows {
        let tuple = TupleBuilder::new(desc.clone())
            .value(id)
            .value(name)
            .value(age)
            .build();
        let rid = people.insert_tuple(tuple, tid).expect("Failed to insert tuple");
        println!("Inserted ({}, {}, {}) at {}", id, name, age, rid);
    }
    pool.commit_transaction(tid).expect("Failed to commit");
    println!("\nCommitted {} pages to disk", people.num_pages());

    // SELECT name, age + 1 FROM people WHERE age >= 18 ORDER BY age DESC
    let adults = Filter::new(
        Expr::compare(BoolOp::Ge, Expr::field("age", DataType::Int), Expr::constant(18)),
        people.clone(),
    );
    let sorted = OrderBy::new(vec![Expr::field("age", DataType::Int)], adults, vec![false])
        .expect("Failed to build sort");
    let plan = Project::new(
        vec![
            Expr::field("name", DataType::String),
            Expr::arith(ArithOp::Add, Expr::field("age", DataType::Int), Expr::constant(1)),
        ],
        vec!["name".to_string(), "next_age".to_string()],
        false,
        sorted,
    )
    .expect("Failed to build projection");

    let tid = TransactionId::new();
    pool.begin_transaction(tid).expect("Failed to begin transaction");
    let result = collect_tuples(&plan, tid).expect("Query failed");
    pool.commit_transaction(tid).expect("Failed to commit");

    println!("\n{}", plan.descriptor().header_string(true));
    for tuple in &result {
        println!("{}", tuple.pretty_print(true));
    }

    println!("\nDemo completed successfully!");
}

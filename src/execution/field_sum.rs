use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use log::debug;

use crate::buffer::BufferPool;
use crate::common::{HeapDbError, Result, TransactionId};
use crate::storage::{CsvOptions, HeapFile};
use crate::tuple::{DataType, FieldType, TupleDesc, Value};

use super::{collect_tuples, AggFunc, AggState, Aggregate, Expr};

/// Loads a comma-separated file with a header line into a temporary heap
/// file and returns the sum of its integer column `field`.
pub fn compute_field_sum<P: AsRef<Path>>(
    pool: Arc<BufferPool>,
    csv_path: P,
    desc: Arc<TupleDesc>,
    field: &str,
) -> Result<i64> {
    let index = desc.find_field(&FieldType::named(field, DataType::Unknown))?;
    let column = &desc.fields()[index];
    if column.data_type != DataType::Int {
        return Err(HeapDbError::TypeMismatch(format!(
            "cannot sum {} column {}",
            column.data_type,
            column.display_name()
        )));
    }
    let column = column.clone();

    let reader = BufReader::new(File::open(csv_path.as_ref())?);
    let file = HeapFile::temporary(desc, Arc::clone(&pool))?;
    let loaded = file.load_from_csv(reader, &CsvOptions::default())?;

    let sum = AggState::new(AggFunc::Sum, "sum", Expr::Field(column))?;
    let plan = Aggregate::new(Vec::new(), vec![sum], Arc::clone(&file));

    let tid = TransactionId::new();
    pool.begin_transaction(tid)?;
    let rows = collect_tuples(&plan, tid);
    pool.commit_transaction(tid)?;

    let total = match rows?.first().and_then(|row| row.value(0)) {
        Some(Value::Int(total)) => *total,
        _ => 0,
    };
    debug!("sum of {} over {} rows is {}", field, loaded, total);
    Ok(total)
}

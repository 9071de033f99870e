use std::io::BufRead;

use log::{debug, warn};

use crate::common::{HeapDbError, Result, TransactionId, STRING_LENGTH};
use crate::tuple::{truncate_string, DataType, Tuple, Value};

use super::{DbFile, HeapFile};

/// How a delimited text source is split into fields.
#[derive(Debug, Clone)]
pub struct CsvOptions {
    /// Skip the first non-blank line
    pub has_header: bool,
    pub separator: String,
    /// Drop the final field of every line (for sources with a trailing separator)
    pub skip_last_field: bool,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            has_header: true,
            separator: ",".to_string(),
            skip_last_field: false,
        }
    }
}

impl CsvOptions {
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    pub fn with_header(mut self, has_header: bool) -> Self {
        self.has_header = has_header;
        self
    }

    pub fn with_skip_last_field(mut self, skip: bool) -> Self {
        self.skip_last_field = skip;
        self
    }
}

/// Inserts every data line of `reader` into `file`.
///
/// The load runs in its own transaction. If an insert runs out of clean
/// pages, the rows loaded so far are committed and the load continues in a
/// fresh transaction, retrying that insert once. Pages of other transactions
/// are never written.
pub fn load_from_csv<R: BufRead>(
    file: &HeapFile,
    reader: R,
    options: &CsvOptions,
) -> Result<usize> {
    if options.separator.is_empty() {
        return Err(HeapDbError::Malformed("empty field separator".to_string()));
    }

    let pool = file.pool();
    let mut tid = TransactionId::new();
    pool.begin_transaction(tid)?;

    match insert_lines(file, reader, options, &mut tid) {
        Ok(count) => {
            pool.commit_transaction(tid)?;
            debug!("loaded {} tuples into {}", count, file.file_id());
            Ok(count)
        }
        Err(e) => {
            if let Err(abort_err) = pool.abort_transaction(tid) {
                warn!("failed to abort csv load {}: {}", tid, abort_err);
            }
            Err(e)
        }
    }
}

fn insert_lines<R: BufRead>(
    file: &HeapFile,
    reader: R,
    options: &CsvOptions,
    tid: &mut TransactionId,
) -> Result<usize> {
    let desc = file.descriptor();
    let mut seen = 0;
    let mut loaded = 0;

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }
        let line_no = index + 1;
        seen += 1;

        let mut fields: Vec<&str> = line.split(options.separator.as_str()).collect();
        if options.skip_last_field {
            fields.pop();
        }
        if fields.len() != desc.len() {
            return Err(HeapDbError::Malformed(format!(
                "line {} ({}) has {} fields, expected {}",
                line_no,
                line,
                fields.len(),
                desc.len()
            )));
        }
        if seen == 1 && options.has_header {
            continue;
        }

        let values = fields
            .iter()
            .zip(desc.fields())
            .map(|(raw, field)| parse_field(raw, field.data_type, line_no))
            .collect::<Result<Vec<_>>>()?;
        let tuple = Tuple::new(desc.clone(), values);

        match file.insert_tuple(tuple.clone(), *tid) {
            Err(HeapDbError::BufferPoolFull) => {
                debug!("pool full at line {}, committing {} rows", line_no, loaded);
                let pool = file.pool();
                pool.commit_transaction(*tid)?;
                *tid = TransactionId::new();
                pool.begin_transaction(*tid)?;
                file.insert_tuple(tuple, *tid)?;
            }
            other => {
                other?;
            }
        }
        loaded += 1;
    }
    Ok(loaded)
}

/// Ints may be written with a fraction; they are truncated toward zero.
fn parse_field(raw: &str, data_type: DataType, line_no: usize) -> Result<Value> {
    match data_type {
        DataType::Int => {
            let trimmed = raw.trim();
            match trimmed.parse::<f64>() {
                Ok(v) if v.is_finite() => Ok(Value::Int(v.trunc() as i64)),
                _ => Err(HeapDbError::TypeMismatch(format!(
                    "line {}: cannot convert {:?} to int",
                    line_no, trimmed
                ))),
            }
        }
        DataType::String => Ok(Value::String(
            truncate_string(raw, STRING_LENGTH).to_string(),
        )),
        DataType::Unknown => Err(HeapDbError::TypeMismatch(format!(
            "line {}: field has unknown type",
            line_no
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::sync::Arc;

    use crate::buffer::BufferPool;
    use crate::tuple::TupleDesc;

    fn create_file() -> Arc<HeapFile> {
        let pool = Arc::new(BufferPool::new(10));
        let desc = TupleDesc::builder()
            .field("a", DataType::Int)
            .field("b", DataType::String)
            .build_arc();
        HeapFile::temporary(desc, pool).unwrap()
    }

    fn values(file: &HeapFile) -> Vec<Vec<Value>> {
        let tid = TransactionId::new();
        let rows = file
            .scan(tid)
            .map(|t| t.unwrap().values().to_vec())
            .collect();
        file.pool().commit_transaction(tid).unwrap();
        rows
    }

    #[test]
    fn test_load_with_header() {
        let file = create_file();
        let csv = "a,b\n1,x\n2,y\n\n3,z\n";
        let n = load_from_csv(&file, Cursor::new(csv), &CsvOptions::default()).unwrap();
        assert_eq!(n, 3);
        assert_eq!(
            values(&file),
            vec![
                vec![Value::Int(1), Value::from("x")],
                vec![Value::Int(2), Value::from("y")],
                vec![Value::Int(3), Value::from("z")],
            ]
        );
    }

    #[test]
    fn test_load_custom_separator_and_trailing_field() {
        let file = create_file();
        let csv = " 4.9 |four|\n-2|neg|\n";
        let options = CsvOptions::default()
            .with_header(false)
            .with_separator("|")
            .with_skip_last_field(true);
        assert_eq!(load_from_csv(&file, Cursor::new(csv), &options).unwrap(), 2);
        assert_eq!(values(&file)[0], vec![Value::Int(4), Value::from("four")]);
        assert_eq!(values(&file)[1][0], Value::Int(-2));
    }

    #[test]
    fn test_wrong_arity_is_malformed() {
        let file = create_file();
        let csv = "a,b\n1,x,extra\n";
        let err = load_from_csv(&file, Cursor::new(csv), &CsvOptions::default()).unwrap_err();
        assert!(matches!(err, HeapDbError::Malformed(_)));
    }

    #[test]
    fn test_header_arity_is_checked() {
        let file = create_file();
        let err = load_from_csv(&file, Cursor::new("a\n1,x\n"), &CsvOptions::default())
            .unwrap_err();
        assert!(matches!(err, HeapDbError::Malformed(_)));
    }

    #[test]
    fn test_bad_int_is_type_mismatch() {
        let file = create_file();
        let csv = "a,b\nabc,x\n";
        let err = load_from_csv(&file, Cursor::new(csv), &CsvOptions::default()).unwrap_err();
        assert!(matches!(err, HeapDbError::TypeMismatch(_)));
    }

    #[test]
    fn test_long_strings_truncated() {
        let file = create_file();
        let csv = format!("1,{}\n", "s".repeat(STRING_LENGTH * 2));
        let options = CsvOptions::default().with_header(false);
        load_from_csv(&file, Cursor::new(csv), &options).unwrap();
        assert_eq!(values(&file)[0][1], Value::String("s".repeat(STRING_LENGTH)));
    }

    #[test]
    fn test_load_commits_in_batches_when_pool_is_full() {
        let desc = TupleDesc::builder()
            .field("a", DataType::Int)
            .field("b", DataType::String)
            .build_arc();
        let file = HeapFile::temporary(desc.clone(), Arc::new(BufferPool::new(1))).unwrap();
        let rows = desc.slots_per_page() + 5;
        let csv: String = (0..rows).map(|i| format!("{},r\n", i)).collect();
        let options = CsvOptions::default().with_header(false);

        assert_eq!(load_from_csv(&file, Cursor::new(csv), &options).unwrap(), rows);
        assert_eq!(file.num_pages(), 2);
        let loaded = values(&file);
        assert_eq!(loaded.len(), rows);
        assert_eq!(loaded[rows - 1][0], Value::Int(rows as i64 - 1));
    }
}

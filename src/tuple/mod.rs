mod data_type;
mod schema;
mod tuple;
mod value;

pub use data_type::DataType;
pub use schema::{FieldType, TupleDesc, TupleDescBuilder};
pub use tuple::{Tuple, TupleBuilder};
pub use value::Value;

pub(crate) use value::truncate_string;

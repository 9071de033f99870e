mod csv_loader;
mod db_file;
pub mod disk;
mod heap_file;
pub mod page;

pub use csv_loader::*;
pub use db_file::*;
pub use heap_file::*;

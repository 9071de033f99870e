//! Pull-based query operators and the expressions they evaluate.

mod agg_state;
mod aggregate;
mod delete;
mod expr;
mod field_sum;
mod filter;
mod insert;
mod join;
mod limit;
mod operator;
mod order_by;
mod project;

pub use agg_state::*;
pub use aggregate::*;
pub use delete::*;
pub use expr::*;
pub use field_sum::*;
pub use filter::*;
pub use insert::*;
pub use join::*;
pub use limit::*;
pub use operator::*;
pub use order_by::*;
pub use project::*;

pub mod period;
pub mod sales;

pub use period::Period;
pub use sales::{
    transform_sales, COLUMN_ALIASES, KEPT_SECTORS, OUTPUT_COLUMNS, REQUIRED_COLUMNS,
};

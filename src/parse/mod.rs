pub mod row;
pub mod table;
pub mod types;

pub use row::{parse_extent, parse_row};
pub use table::{parse_content, parse_headings, parse_page, parse_table, PageTables, RawGrid};
pub use types::{BitRange, Dimension, Extent, FieldRecord};

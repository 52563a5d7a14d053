//! CSV mapping and output
//!
//! [`mapper`] holds the pure header/row functions; [`writer`] owns the
//! output files and the overwrite/append policy.

pub mod mapper;
pub mod writer;

pub use mapper::{
    encode_cell, flatten_columns, main_header, main_submission_row, repeat_header, repeat_rows,
    MediaOptions,
};
pub use writer::CsvTarget;

//! Presentation and export of result tables.

pub mod export;
pub mod generator;

pub use export::{export, header, load_csv, write_csv, EXPORT_FILE_NAME};
pub use generator::{
    generate_json_table, generate_markdown_table, generate_summary, generate_text_table,
};

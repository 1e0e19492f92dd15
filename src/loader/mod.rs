//! Loaders for the converter's configuration files: schema (`.dt`) and mapping files.

pub mod mapping;
pub mod schema;

pub use mapping::{load_mapping, save_mapping};
pub use schema::{default_schema_path, load_schema, parse_schema};

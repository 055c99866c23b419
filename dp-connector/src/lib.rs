pub mod cleaner;
pub mod conn_util;
pub mod dialect;
pub mod generator;
pub mod pumper;
pub mod schema_analyzer;
pub mod sqlx_ext;
pub mod table_sorter;

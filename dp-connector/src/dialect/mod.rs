pub mod mssql;
pub mod mysql;
pub mod oracle;
pub mod pg;

use async_trait::async_trait;
use dp_common::config::config_enums::DbType;
use sqlx::{any::Any, Transaction};

use self::{
    mssql::MssqlDialect, mysql::MysqlDialect, oracle::OracleDialect, pg::PgDialect,
};

/// Vendor-specific SQL forms and control statements.
///
/// The introspection queries return fixed column shapes, all cells readable
/// as (nullable) strings:
/// - tables: (table_name)
/// - columns: (table_name, column_name, data_type, extended_type,
///   length_or_precision, is_nullable, key_hint, extra_hint, unique_hint,
///   comment), one bind parameter: the schema
/// - foreign keys: (table_name, constraint_name, column_name,
///   referenced_table_name, referenced_column_name)
#[async_trait]
pub trait Dialect {
    fn db_type(&self) -> DbType;

    fn tables_query(&self) -> String;
    fn columns_query(&self) -> String;
    fn foreign_keys_query(&self) -> String;

    /// Relax global referential integrity inside the given transaction.
    async fn before_pump(&self, tx: &mut Transaction<'_, Any>) -> anyhow::Result<()>;

    /// Restore what `before_pump` relaxed.
    async fn after_pump(&self, tx: &mut Transaction<'_, Any>) -> anyhow::Result<()>;

    async fn before_table(
        &self,
        _tx: &mut Transaction<'_, Any>,
        _table: &str,
        _has_identity: bool,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    async fn after_table(
        &self,
        _tx: &mut Transaction<'_, Any>,
        _table: &str,
        _has_identity: bool,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    fn insert_query(&self, table: &str, cols: &[String]) -> String;

    fn truncate_query(&self, table: &str) -> String;

    /// 0-based index in, native placeholder text out.
    fn placeholder(&self, index: usize) -> String;

    fn normalize_type(&self, raw: &str) -> String;

    fn default_schema(&self, input: &str) -> String;

    fn limit_query(&self, query: &str, limit: usize) -> String;
}

pub fn get_dialect(db_type: &DbType) -> Box<dyn Dialect + Send + Sync> {
    match db_type {
        DbType::Pg => Box::new(PgDialect {}),
        DbType::Mssql => Box::new(MssqlDialect {}),
        DbType::Oracle => Box::new(OracleDialect {}),
        // unknown drivers are treated as mysql compatible
        _ => Box::new(MysqlDialect {}),
    }
}

pub(crate) fn join_placeholders(count: usize, dialect: &dyn Dialect) -> String {
    (0..count)
        .map(|i| dialect.placeholder(i))
        .collect::<Vec<String>>()
        .join(", ")
}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn test_get_dialect_dispatch() {
        assert_eq!(get_dialect(&DbType::Mysql).db_type(), DbType::Mysql);
        assert_eq!(get_dialect(&DbType::Pg).db_type(), DbType::Pg);
        assert_eq!(get_dialect(&DbType::Mssql).db_type(), DbType::Mssql);
        assert_eq!(get_dialect(&DbType::Oracle).db_type(), DbType::Oracle);
    }

    #[test]
    fn test_placeholder_forms() {
        assert_eq!(get_dialect(&DbType::Mysql).placeholder(0), "?");
        assert_eq!(get_dialect(&DbType::Pg).placeholder(0), "$1");
        assert_eq!(get_dialect(&DbType::Pg).placeholder(2), "$3");
        assert_eq!(get_dialect(&DbType::Mssql).placeholder(1), "@p2");
        assert_eq!(get_dialect(&DbType::Oracle).placeholder(1), ":2");
    }

    #[test]
    fn test_default_schemas() {
        assert_eq!(get_dialect(&DbType::Pg).default_schema(""), "public");
        assert_eq!(get_dialect(&DbType::Mssql).default_schema(""), "dbo");
        assert_eq!(get_dialect(&DbType::Mysql).default_schema("sakila"), "sakila");
        assert_eq!(get_dialect(&DbType::Oracle).default_schema("SCOTT"), "SCOTT");
    }
}

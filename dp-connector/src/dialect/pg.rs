use async_trait::async_trait;
use dp_common::{config::config_enums::DbType, error::Error, utils::sql_util::SqlUtil};
use sqlx::{any::Any, Transaction};

use super::{join_placeholders, Dialect};

pub struct PgDialect {}

#[async_trait]
impl Dialect for PgDialect {
    fn db_type(&self) -> DbType {
        DbType::Pg
    }

    fn tables_query(&self) -> String {
        "SELECT table_name FROM information_schema.tables \
         WHERE table_schema = $1 AND table_type = 'BASE TABLE'"
            .to_string()
    }

    fn columns_query(&self) -> String {
        // column_default carries 'nextval(..)' for serials, the pk/unique
        // hints come from subqueries on table_constraints
        "SELECT
            c.table_name,
            c.column_name,
            c.data_type,
            c.udt_name,
            CAST(c.character_maximum_length AS VARCHAR) AS length_or_precision,
            c.is_nullable,
            (SELECT 'PRI' FROM information_schema.table_constraints tc
             JOIN information_schema.key_column_usage kcu ON tc.constraint_name = kcu.constraint_name
             WHERE tc.constraint_type = 'PRIMARY KEY'
             AND kcu.table_schema = c.table_schema AND kcu.table_name = c.table_name
             AND kcu.column_name = c.column_name LIMIT 1) AS column_key,
            c.column_default,
            (SELECT 'UNIQUE' FROM information_schema.table_constraints tc
             JOIN information_schema.key_column_usage kcu ON tc.constraint_name = kcu.constraint_name
             WHERE tc.constraint_type = 'UNIQUE'
             AND kcu.table_schema = c.table_schema AND kcu.table_name = c.table_name
             AND kcu.column_name = c.column_name LIMIT 1) AS is_unique,
            col_description(format('%I.%I', c.table_schema, c.table_name)::regclass,
                            c.ordinal_position::int) AS column_comment
        FROM information_schema.columns c
        WHERE c.table_schema = $1
        ORDER BY c.table_name, c.ordinal_position"
            .to_string()
    }

    fn foreign_keys_query(&self) -> String {
        "SELECT kcu.table_name, kcu.constraint_name, kcu.column_name, \
         ccu.table_name AS referenced_table_name, \
         ccu.column_name AS referenced_column_name \
         FROM information_schema.key_column_usage kcu \
         JOIN information_schema.constraint_column_usage ccu \
         ON kcu.constraint_name = ccu.constraint_name \
         JOIN information_schema.table_constraints tc \
         ON kcu.constraint_name = tc.constraint_name \
         WHERE kcu.table_schema = $1 AND tc.constraint_type = 'FOREIGN KEY'"
            .to_string()
    }

    async fn before_pump(&self, tx: &mut Transaction<'_, Any>) -> anyhow::Result<()> {
        // only helps for DEFERRABLE keys, but does not need superuser
        sqlx::query("SET CONSTRAINTS ALL DEFERRED")
            .execute(&mut *tx)
            .await?;
        Ok(())
    }

    async fn after_pump(&self, tx: &mut Transaction<'_, Any>) -> anyhow::Result<()> {
        sqlx::query("SET CONSTRAINTS ALL IMMEDIATE")
            .execute(&mut *tx)
            .await?;
        Ok(())
    }

    async fn before_table(
        &self,
        tx: &mut Transaction<'_, Any>,
        _table: &str,
        _has_identity: bool,
    ) -> anyhow::Result<()> {
        // replica role suspends FK triggers entirely but needs superuser,
        // deferred constraints are the non-privileged fallback
        if let Err(replica_err) = sqlx::query("SET session_replication_role = 'replica'")
            .execute(&mut *tx)
            .await
        {
            if let Err(deferred_err) = sqlx::query("SET CONSTRAINTS ALL DEFERRED")
                .execute(&mut *tx)
                .await
            {
                anyhow::bail! {Error::PumpError(format!(
                    "replication_role failed: {}, deferred failed: {}",
                    replica_err, deferred_err
                ))}
            }
        }
        Ok(())
    }

    async fn after_table(
        &self,
        tx: &mut Transaction<'_, Any>,
        _table: &str,
        _has_identity: bool,
    ) -> anyhow::Result<()> {
        sqlx::query("SET session_replication_role = 'origin'")
            .execute(&mut *tx)
            .await?;
        Ok(())
    }

    fn insert_query(&self, table: &str, cols: &[String]) -> String {
        format!(
            "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT DO NOTHING",
            self.escape(table),
            SqlUtil::escape_cols(cols, &self.db_type()).join(", "),
            join_placeholders(cols.len(), self)
        )
    }

    fn truncate_query(&self, table: &str) -> String {
        format!("TRUNCATE TABLE {} CASCADE", self.escape(table))
    }

    fn placeholder(&self, index: usize) -> String {
        format!("${}", index + 1)
    }

    fn normalize_type(&self, raw: &str) -> String {
        let raw = raw.to_lowercase();
        match raw.as_str() {
            "int4" | "int2" => "int".to_string(),
            "int8" => "bigint".to_string(),
            "float4" => "float".to_string(),
            "float8" => "double".to_string(),
            "bpchar" => "char".to_string(),
            _ => raw,
        }
    }

    fn default_schema(&self, input: &str) -> String {
        if input.is_empty() {
            return "public".to_string();
        }
        input.to_string()
    }

    fn limit_query(&self, query: &str, limit: usize) -> String {
        format!("{} LIMIT {}", query, limit)
    }
}

impl PgDialect {
    fn escape(&self, token: &str) -> String {
        SqlUtil::escape_by_db_type(token, &DbType::Pg)
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn test_insert_query() {
        let dialect = PgDialect {};
        let cols = vec!["store_id".to_string(), "manager_staff_id".to_string()];
        assert_eq!(
            dialect.insert_query("store", &cols),
            "INSERT INTO \"store\" (\"store_id\", \"manager_staff_id\") \
             VALUES ($1, $2) ON CONFLICT DO NOTHING"
        );
    }

    #[test]
    fn test_truncate_cascades() {
        let dialect = PgDialect {};
        assert_eq!(
            dialect.truncate_query("store"),
            "TRUNCATE TABLE \"store\" CASCADE"
        );
    }

    #[test]
    fn test_normalize_type() {
        let dialect = PgDialect {};
        assert_eq!(dialect.normalize_type("int4"), "int");
        assert_eq!(dialect.normalize_type("int8"), "bigint");
        assert_eq!(dialect.normalize_type("float8"), "double");
        assert_eq!(dialect.normalize_type("bpchar"), "char");
        assert_eq!(dialect.normalize_type("tsvector"), "tsvector");
    }
}

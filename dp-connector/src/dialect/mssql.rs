use async_trait::async_trait;
use dp_common::{config::config_enums::DbType, error::Error};
use sqlx::{any::Any, Row, Transaction};

use super::{join_placeholders, Dialect};

pub struct MssqlDialect {}

const LIST_DBO_TABLES: &str = "SELECT TABLE_NAME FROM INFORMATION_SCHEMA.TABLES \
     WHERE TABLE_TYPE = 'BASE TABLE' AND TABLE_SCHEMA = 'dbo'";

#[async_trait]
impl Dialect for MssqlDialect {
    fn db_type(&self) -> DbType {
        DbType::Mssql
    }

    fn tables_query(&self) -> String {
        "SELECT TABLE_NAME FROM INFORMATION_SCHEMA.TABLES \
         WHERE TABLE_SCHEMA = @p1 AND TABLE_TYPE = 'BASE TABLE'"
            .to_string()
    }

    fn columns_query(&self) -> String {
        // identity columns surface through sys.identity_columns, unique
        // columns through both constraints and unique indexes, comments
        // through the MS_Description extended property
        "SELECT
            c.TABLE_NAME,
            c.COLUMN_NAME,
            c.DATA_TYPE,
            c.DATA_TYPE,
            CAST(c.CHARACTER_MAXIMUM_LENGTH AS NVARCHAR(30)) AS LENGTH_OR_PRECISION,
            c.IS_NULLABLE,
            CASE WHEN pk.COLUMN_NAME IS NOT NULL THEN 'PRIMARY' ELSE '' END AS COLUMN_KEY,
            CASE
                WHEN idc.name IS NOT NULL THEN 'identity'
                ELSE c.COLUMN_DEFAULT
            END AS EXTRA,
            CASE WHEN uq.COLUMN_NAME IS NOT NULL OR ui.COLUMN_NAME IS NOT NULL \
                 THEN 'UNIQUE' ELSE '' END AS IS_UNIQUE,
            CAST(ep.value AS NVARCHAR(MAX)) AS COLUMN_COMMENT
        FROM INFORMATION_SCHEMA.COLUMNS c
        LEFT JOIN (
            SELECT kcu.TABLE_NAME, kcu.COLUMN_NAME
            FROM INFORMATION_SCHEMA.TABLE_CONSTRAINTS tc
            JOIN INFORMATION_SCHEMA.KEY_COLUMN_USAGE kcu
                ON tc.CONSTRAINT_NAME = kcu.CONSTRAINT_NAME
            WHERE tc.CONSTRAINT_TYPE = 'PRIMARY KEY' AND tc.TABLE_SCHEMA = @p1
        ) pk ON c.TABLE_NAME = pk.TABLE_NAME AND c.COLUMN_NAME = pk.COLUMN_NAME
        LEFT JOIN (
            SELECT kcu.TABLE_NAME, kcu.COLUMN_NAME
            FROM INFORMATION_SCHEMA.TABLE_CONSTRAINTS tc
            JOIN INFORMATION_SCHEMA.KEY_COLUMN_USAGE kcu
                ON tc.CONSTRAINT_NAME = kcu.CONSTRAINT_NAME
            WHERE tc.CONSTRAINT_TYPE = 'UNIQUE' AND tc.TABLE_SCHEMA = @p1
        ) uq ON c.TABLE_NAME = uq.TABLE_NAME AND c.COLUMN_NAME = uq.COLUMN_NAME
        LEFT JOIN (
            SELECT t.name AS TABLE_NAME, col.name AS COLUMN_NAME
            FROM sys.indexes idx
            JOIN sys.index_columns ic ON idx.object_id = ic.object_id AND idx.index_id = ic.index_id
            JOIN sys.columns col ON ic.object_id = col.object_id AND ic.column_id = col.column_id
            JOIN sys.tables t ON idx.object_id = t.object_id
            JOIN sys.schemas s ON t.schema_id = s.schema_id
            WHERE idx.is_unique = 1 AND idx.is_primary_key = 0 AND s.name = @p1
        ) ui ON c.TABLE_NAME = ui.TABLE_NAME AND c.COLUMN_NAME = ui.COLUMN_NAME
        LEFT JOIN sys.identity_columns idc
            ON idc.object_id = OBJECT_ID(c.TABLE_SCHEMA + '.' + c.TABLE_NAME)
            AND idc.name = c.COLUMN_NAME
        LEFT JOIN sys.extended_properties ep
            ON ep.major_id = OBJECT_ID(c.TABLE_SCHEMA + '.' + c.TABLE_NAME)
            AND ep.minor_id = c.ORDINAL_POSITION
            AND ep.name = 'MS_Description'
        WHERE c.TABLE_SCHEMA = @p1
        ORDER BY c.TABLE_NAME, c.ORDINAL_POSITION"
            .to_string()
    }

    fn foreign_keys_query(&self) -> String {
        "SELECT KCU1.TABLE_NAME, KCU1.CONSTRAINT_NAME, KCU1.COLUMN_NAME, \
         KCU2.TABLE_NAME AS REF_TABLE, KCU2.COLUMN_NAME AS REF_COLUMN \
         FROM INFORMATION_SCHEMA.REFERENTIAL_CONSTRAINTS RC \
         JOIN INFORMATION_SCHEMA.KEY_COLUMN_USAGE KCU1 \
         ON RC.CONSTRAINT_NAME = KCU1.CONSTRAINT_NAME \
         JOIN INFORMATION_SCHEMA.KEY_COLUMN_USAGE KCU2 \
         ON RC.UNIQUE_CONSTRAINT_NAME = KCU2.CONSTRAINT_NAME \
         WHERE KCU1.TABLE_SCHEMA = @p1"
            .to_string()
    }

    async fn before_pump(&self, tx: &mut Transaction<'_, Any>) -> anyhow::Result<()> {
        for table in Self::list_base_tables(tx).await? {
            let sql = format!("ALTER TABLE {} NOCHECK CONSTRAINT all", table);
            if let Err(error) = sqlx::query(&sql).execute(&mut *tx).await {
                anyhow::bail! {Error::PumpError(format!(
                    "failed to disable constraints on {}: {}",
                    table, error
                ))}
            }
        }
        Ok(())
    }

    async fn after_pump(&self, tx: &mut Transaction<'_, Any>) -> anyhow::Result<()> {
        // WITH CHECK CHECK re-validates existing rows while re-enabling
        for table in Self::list_base_tables(tx).await? {
            let sql = format!("ALTER TABLE {} WITH CHECK CHECK CONSTRAINT all", table);
            if let Err(error) = sqlx::query(&sql).execute(&mut *tx).await {
                anyhow::bail! {Error::PumpError(format!(
                    "failed to enable constraints on {}: {}",
                    table, error
                ))}
            }
        }
        Ok(())
    }

    async fn before_table(
        &self,
        tx: &mut Transaction<'_, Any>,
        table: &str,
        _has_identity: bool,
    ) -> anyhow::Result<()> {
        let sql = format!("ALTER TABLE {} NOCHECK CONSTRAINT all", table);
        sqlx::query(&sql).execute(&mut *tx).await?;
        Ok(())
    }

    // constraints stay disabled per table until after_pump re-enables them
    // globally, circular schemas would reject rows otherwise

    fn insert_query(&self, table: &str, cols: &[String]) -> String {
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table,
            cols.join(", "),
            join_placeholders(cols.len(), self)
        )
    }

    fn truncate_query(&self, table: &str) -> String {
        format!("TRUNCATE TABLE {}", table)
    }

    fn placeholder(&self, index: usize) -> String {
        format!("@p{}", index + 1)
    }

    fn normalize_type(&self, raw: &str) -> String {
        let raw = raw.to_lowercase();
        match raw.as_str() {
            "nvarchar" | "nchar" | "text" | "ntext" => "varchar".to_string(),
            "bit" => "boolean".to_string(),
            "decimal" | "numeric" | "money" | "smallmoney" => "decimal".to_string(),
            "float" | "real" => "float".to_string(),
            "datetime" | "datetime2" | "smalldatetime" | "date" => "datetime".to_string(),
            "image" | "binary" | "varbinary" => "blob".to_string(),
            _ => raw,
        }
    }

    fn default_schema(&self, input: &str) -> String {
        if input.is_empty() {
            return "dbo".to_string();
        }
        input.to_string()
    }

    fn limit_query(&self, query: &str, limit: usize) -> String {
        let trimmed = query.trim_start();
        if trimmed.to_uppercase().starts_with("SELECT") {
            return query.replacen("SELECT", &format!("SELECT TOP {}", limit), 1);
        }
        query.to_string()
    }
}

impl MssqlDialect {
    async fn list_base_tables(tx: &mut Transaction<'_, Any>) -> anyhow::Result<Vec<String>> {
        let rows = sqlx::query(LIST_DBO_TABLES).fetch_all(&mut *tx).await?;
        let mut tables = Vec::with_capacity(rows.len());
        for row in rows.iter() {
            let table: String = row.try_get(0)?;
            tables.push(table);
        }
        Ok(tables)
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn test_insert_query() {
        let dialect = MssqlDialect {};
        let cols = vec!["name".to_string(), "city".to_string()];
        assert_eq!(
            dialect.insert_query("customer", &cols),
            "INSERT INTO customer (name, city) VALUES (@p1, @p2)"
        );
    }

    #[test]
    fn test_normalize_type() {
        let dialect = MssqlDialect {};
        assert_eq!(dialect.normalize_type("NVARCHAR"), "varchar");
        assert_eq!(dialect.normalize_type("bit"), "boolean");
        assert_eq!(dialect.normalize_type("money"), "decimal");
        assert_eq!(dialect.normalize_type("datetime2"), "datetime");
        assert_eq!(dialect.normalize_type("varbinary"), "blob");
        assert_eq!(dialect.normalize_type("tinyint"), "tinyint");
    }

    #[test]
    fn test_limit_query_injects_top() {
        let dialect = MssqlDialect {};
        assert_eq!(
            dialect.limit_query("SELECT customer_id FROM customer", 5),
            "SELECT TOP 5 customer_id FROM customer"
        );
        assert_eq!(dialect.limit_query("EXEC something", 5), "EXEC something");
    }
}

use async_trait::async_trait;
use dp_common::{config::config_enums::DbType, error::Error};
use sqlx::{any::Any, Row, Transaction};

use super::{join_placeholders, Dialect};

/// Oracle works on the current user's objects (USER_TABLES and friends),
/// the schema argument is only consumed by a dummy bind clause so every
/// dialect keeps the same one-parameter query contract.
pub struct OracleDialect {}

const LIST_ENABLED_FKS: &str = "SELECT TABLE_NAME, CONSTRAINT_NAME FROM USER_CONSTRAINTS \
     WHERE CONSTRAINT_TYPE = 'R' AND STATUS = 'ENABLED'";

const LIST_DISABLED_FKS: &str = "SELECT TABLE_NAME, CONSTRAINT_NAME FROM USER_CONSTRAINTS \
     WHERE CONSTRAINT_TYPE = 'R' AND STATUS = 'DISABLED'";

#[async_trait]
impl Dialect for OracleDialect {
    fn db_type(&self) -> DbType {
        DbType::Oracle
    }

    fn tables_query(&self) -> String {
        "SELECT TABLE_NAME FROM USER_TABLES WHERE :1 IS NOT NULL".to_string()
    }

    fn columns_query(&self) -> String {
        "SELECT
            t.TABLE_NAME,
            t.COLUMN_NAME,
            CASE
                WHEN t.DATA_TYPE = 'NUMBER' AND COALESCE(t.DATA_SCALE, 0) > 0 THEN 'DECIMAL'
                WHEN t.DATA_TYPE = 'NUMBER' THEN 'INTEGER'
                ELSE t.DATA_TYPE
            END,
            t.DATA_TYPE || CASE WHEN t.DATA_LENGTH IS NOT NULL \
                THEN '(' || t.DATA_LENGTH || ')' ELSE '' END,
            TO_CHAR(COALESCE(t.DATA_PRECISION, t.DATA_LENGTH)) AS LENGTH_OR_PRECISION,
            CASE WHEN t.NULLABLE = 'Y' THEN 'YES' ELSE 'NO' END,
            CASE WHEN p.CONSTRAINT_NAME IS NOT NULL THEN 'PRI' ELSE '' END,
            CASE WHEN t.IDENTITY_COLUMN = 'YES' THEN 'auto_increment' ELSE '' END,
            CASE WHEN u.CONSTRAINT_NAME IS NOT NULL THEN 'UNIQUE' ELSE '' END,
            c.COMMENTS
        FROM USER_TAB_COLUMNS t
        LEFT JOIN (
            SELECT cc.TABLE_NAME, cc.COLUMN_NAME, cc.CONSTRAINT_NAME
            FROM USER_CONS_COLUMNS cc
            JOIN USER_CONSTRAINTS uc ON cc.CONSTRAINT_NAME = uc.CONSTRAINT_NAME
            WHERE uc.CONSTRAINT_TYPE = 'P'
        ) p ON t.TABLE_NAME = p.TABLE_NAME AND t.COLUMN_NAME = p.COLUMN_NAME
        LEFT JOIN (
            SELECT cc.TABLE_NAME, cc.COLUMN_NAME, cc.CONSTRAINT_NAME
            FROM USER_CONS_COLUMNS cc
            JOIN USER_CONSTRAINTS uc ON cc.CONSTRAINT_NAME = uc.CONSTRAINT_NAME
            WHERE uc.CONSTRAINT_TYPE = 'U'
        ) u ON t.TABLE_NAME = u.TABLE_NAME AND t.COLUMN_NAME = u.COLUMN_NAME
        LEFT JOIN USER_COL_COMMENTS c \
            ON t.TABLE_NAME = c.TABLE_NAME AND t.COLUMN_NAME = c.COLUMN_NAME
        WHERE :1 IS NOT NULL
        ORDER BY t.TABLE_NAME, t.COLUMN_ID"
            .to_string()
    }

    fn foreign_keys_query(&self) -> String {
        "SELECT
            c.TABLE_NAME,
            c.CONSTRAINT_NAME,
            cc.COLUMN_NAME,
            r.TABLE_NAME AS REF_TABLE,
            rcc.COLUMN_NAME AS REF_COLUMN
        FROM USER_CONSTRAINTS c
        JOIN USER_CONS_COLUMNS cc
            ON c.CONSTRAINT_NAME = cc.CONSTRAINT_NAME AND c.OWNER = cc.OWNER
        JOIN USER_CONSTRAINTS r
            ON c.R_CONSTRAINT_NAME = r.CONSTRAINT_NAME AND c.R_OWNER = r.OWNER
        JOIN USER_CONS_COLUMNS rcc
            ON r.CONSTRAINT_NAME = rcc.CONSTRAINT_NAME AND r.OWNER = rcc.OWNER
            AND cc.POSITION = rcc.POSITION
        WHERE c.CONSTRAINT_TYPE = 'R' AND :1 IS NOT NULL"
            .to_string()
    }

    async fn before_pump(&self, tx: &mut Transaction<'_, Any>) -> anyhow::Result<()> {
        // generated datetimes are bound as 'YYYY-MM-DD HH24:MI:SS' strings
        sqlx::query("ALTER SESSION SET NLS_DATE_FORMAT = 'YYYY-MM-DD HH24:MI:SS'")
            .execute(&mut *tx)
            .await?;
        sqlx::query("ALTER SESSION SET NLS_TIMESTAMP_FORMAT = 'YYYY-MM-DD HH24:MI:SS'")
            .execute(&mut *tx)
            .await?;

        // ALTER is DDL, each statement implicitly commits the transaction
        for (table, constraint) in Self::list_fk_constraints(tx, LIST_ENABLED_FKS).await? {
            let sql = format!("ALTER TABLE {} DISABLE CONSTRAINT {}", table, constraint);
            if let Err(error) = sqlx::query(&sql).execute(&mut *tx).await {
                anyhow::bail! {Error::PumpError(format!(
                    "failed to disable constraint {} on {}: {}",
                    constraint, table, error
                ))}
            }
        }
        Ok(())
    }

    async fn after_pump(&self, tx: &mut Transaction<'_, Any>) -> anyhow::Result<()> {
        for (table, constraint) in Self::list_fk_constraints(tx, LIST_DISABLED_FKS).await? {
            let sql = format!("ALTER TABLE {} ENABLE CONSTRAINT {}", table, constraint);
            if let Err(error) = sqlx::query(&sql).execute(&mut *tx).await {
                anyhow::bail! {Error::PumpError(format!(
                    "failed to enable constraint {} on {}: {}",
                    constraint, table, error
                ))}
            }
        }
        Ok(())
    }

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
        format!(":{}", index + 1)
    }

    fn normalize_type(&self, raw: &str) -> String {
        let raw = raw.to_lowercase();
        if raw.contains("char") || raw.contains("clob") {
            return "string".to_string();
        }
        if raw.contains("int") || raw.contains("number") || raw.contains("float") {
            return "integer".to_string();
        }
        if raw.contains("date") || raw.contains("time") || raw.contains("year") {
            return "datetime".to_string();
        }
        raw
    }

    fn default_schema(&self, input: &str) -> String {
        input.to_string()
    }

    fn limit_query(&self, query: &str, limit: usize) -> String {
        format!("SELECT * FROM ({}) WHERE ROWNUM <= {}", query, limit)
    }
}

impl OracleDialect {
    async fn list_fk_constraints(
        tx: &mut Transaction<'_, Any>,
        sql: &str,
    ) -> anyhow::Result<Vec<(String, String)>> {
        let rows = sqlx::query(sql).fetch_all(&mut *tx).await?;
        let mut constraints = Vec::with_capacity(rows.len());
        for row in rows.iter() {
            let table: String = row.try_get(0)?;
            let constraint: String = row.try_get(1)?;
            constraints.push((table, constraint));
        }
        Ok(constraints)
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn test_insert_query() {
        let dialect = OracleDialect {};
        let cols = vec!["EMP_NM".to_string(), "HIRE_DT".to_string()];
        assert_eq!(
            dialect.insert_query("EMPLOYEES", &cols),
            "INSERT INTO EMPLOYEES (EMP_NM, HIRE_DT) VALUES (:1, :2)"
        );
    }

    #[test]
    fn test_normalize_type_buckets() {
        let dialect = OracleDialect {};
        assert_eq!(dialect.normalize_type("VARCHAR2"), "string");
        assert_eq!(dialect.normalize_type("CLOB"), "string");
        assert_eq!(dialect.normalize_type("NUMBER"), "integer");
        assert_eq!(dialect.normalize_type("DATE"), "datetime");
        assert_eq!(dialect.normalize_type("TIMESTAMP(6)"), "datetime");
        assert_eq!(dialect.normalize_type("RAW"), "raw");
    }

    #[test]
    fn test_limit_query_wraps_rownum() {
        let dialect = OracleDialect {};
        assert_eq!(
            dialect.limit_query("SELECT EMP_ID FROM EMPLOYEES", 3),
            "SELECT * FROM (SELECT EMP_ID FROM EMPLOYEES) WHERE ROWNUM <= 3"
        );
    }
}

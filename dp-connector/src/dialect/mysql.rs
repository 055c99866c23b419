use async_trait::async_trait;
use dp_common::{config::config_enums::DbType, utils::sql_util::SqlUtil};
use sqlx::{any::Any, Transaction};

use super::{join_placeholders, Dialect};

pub struct MysqlDialect {}

#[async_trait]
impl Dialect for MysqlDialect {
    fn db_type(&self) -> DbType {
        DbType::Mysql
    }

    fn tables_query(&self) -> String {
        "SELECT TABLE_NAME FROM information_schema.TABLES \
         WHERE TABLE_SCHEMA = ? AND TABLE_TYPE = 'BASE TABLE'"
            .to_string()
    }

    fn columns_query(&self) -> String {
        // COLUMN_KEY carries 'PRI', EXTRA carries 'auto_increment',
        // COLUMN_TYPE keeps the full definition for enum/set parsing
        "SELECT TABLE_NAME, COLUMN_NAME, DATA_TYPE, COLUMN_TYPE, \
         CAST(CHARACTER_MAXIMUM_LENGTH AS CHAR) AS LENGTH_OR_PRECISION, \
         IS_NULLABLE, COLUMN_KEY, EXTRA, \
         IF(COLUMN_KEY = 'UNI', 'UNIQUE', NULL) AS IS_UNIQUE, COLUMN_COMMENT \
         FROM information_schema.COLUMNS \
         WHERE TABLE_SCHEMA = ? \
         ORDER BY TABLE_NAME, ORDINAL_POSITION"
            .to_string()
    }

    fn foreign_keys_query(&self) -> String {
        "SELECT TABLE_NAME, CONSTRAINT_NAME, COLUMN_NAME, \
         REFERENCED_TABLE_NAME, REFERENCED_COLUMN_NAME \
         FROM information_schema.KEY_COLUMN_USAGE \
         WHERE TABLE_SCHEMA = ? AND REFERENCED_TABLE_NAME IS NOT NULL"
            .to_string()
    }

    async fn before_pump(&self, tx: &mut Transaction<'_, Any>) -> anyhow::Result<()> {
        sqlx::query("SET FOREIGN_KEY_CHECKS = 0")
            .execute(&mut *tx)
            .await?;
        Ok(())
    }

    async fn after_pump(&self, tx: &mut Transaction<'_, Any>) -> anyhow::Result<()> {
        sqlx::query("SET FOREIGN_KEY_CHECKS = 1")
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
        // session scoped, must be set inside each table transaction
        sqlx::query("SET FOREIGN_KEY_CHECKS = 0")
            .execute(&mut *tx)
            .await?;
        Ok(())
    }

    fn insert_query(&self, table: &str, cols: &[String]) -> String {
        format!(
            "INSERT IGNORE INTO {} ({}) VALUES ({})",
            self.escape(table),
            SqlUtil::escape_cols(cols, &self.db_type()).join(", "),
            join_placeholders(cols.len(), self)
        )
    }

    fn truncate_query(&self, table: &str) -> String {
        format!("TRUNCATE TABLE {}", self.escape(table))
    }

    fn placeholder(&self, _index: usize) -> String {
        "?".to_string()
    }

    fn normalize_type(&self, raw: &str) -> String {
        raw.to_lowercase()
    }

    fn default_schema(&self, input: &str) -> String {
        // the current database is resolved by the caller via SELECT DATABASE()
        input.to_string()
    }

    fn limit_query(&self, query: &str, limit: usize) -> String {
        format!("{} LIMIT {}", query, limit)
    }
}

impl MysqlDialect {
    fn escape(&self, token: &str) -> String {
        SqlUtil::escape_by_db_type(token, &DbType::Mysql)
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn test_insert_query() {
        let dialect = MysqlDialect {};
        let cols = vec!["first_name".to_string(), "last_name".to_string()];
        assert_eq!(
            dialect.insert_query("actor", &cols),
            "INSERT IGNORE INTO `actor` (`first_name`, `last_name`) VALUES (?, ?)"
        );
    }

    #[test]
    fn test_truncate_query() {
        let dialect = MysqlDialect {};
        assert_eq!(dialect.truncate_query("actor"), "TRUNCATE TABLE `actor`");
    }

    #[test]
    fn test_normalize_type() {
        let dialect = MysqlDialect {};
        assert_eq!(dialect.normalize_type("VARCHAR"), "varchar");
        assert_eq!(dialect.normalize_type("tinyint"), "tinyint");
    }

    #[test]
    fn test_limit_query() {
        let dialect = MysqlDialect {};
        assert_eq!(
            dialect.limit_query("SELECT actor_id FROM actor", 10),
            "SELECT actor_id FROM actor LIMIT 10"
        );
    }
}

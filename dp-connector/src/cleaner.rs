use dp_common::{config::config_enums::DbType, log_info, log_warn, meta::table::Table};
use sqlx::any::AnyPool;

use crate::dialect::Dialect;

const CLEAN_LOG_EVERY: usize = 5;

/// Wipes tables in reverse dependency order inside one transaction,
/// children before parents, with referential integrity relaxed by the
/// dialect's pump hooks. Individual table failures are logged and skipped.
pub struct Cleaner<'a> {
    pub conn_pool: &'a AnyPool,
    pub dialect: &'a (dyn Dialect + Send + Sync),
}

impl Cleaner<'_> {
    pub async fn clean(&self, tables: &[Table]) -> anyhow::Result<()> {
        log_info!("disabling foreign key checks");

        let mut tx = self.conn_pool.begin().await?;
        if let Err(error) = self.dialect.before_pump(&mut tx).await {
            log_warn!("before_pump hook failed: {}, continuing", error);
            if self.dialect.db_type() == DbType::Pg {
                // a failed statement poisons a postgres transaction
                tx.rollback().await?;
                tx = self.conn_pool.begin().await?;
            }
        }

        let total = tables.len();
        for (count, table) in tables.iter().rev().enumerate() {
            let query = if self.dialect.db_type() == DbType::Mssql {
                // TRUNCATE is rejected on FK-referenced tables
                format!("DELETE FROM {}", table.name)
            } else {
                self.dialect.truncate_query(&table.name)
            };
            if let Err(error) = sqlx::query(&query).execute(&mut tx).await {
                log_warn!("failed to clean {}: {}, continuing", table.name, error);
            }

            if self.dialect.db_type() == DbType::Mssql {
                let reseed = format!("DBCC CHECKIDENT ('{}', RESEED, 0)", table.name);
                if let Err(error) = sqlx::query(&reseed).execute(&mut tx).await {
                    log_warn!(
                        "failed to reseed identity for {}: {}, continuing",
                        table.name,
                        error
                    );
                }
            }

            let done = count + 1;
            if done % CLEAN_LOG_EVERY == 0 || done == total {
                log_info!("cleaned {}/{} tables", done, total);
            }
        }

        log_info!("enabling foreign key checks");
        if let Err(error) = self.dialect.after_pump(&mut tx).await {
            log_warn!("after_pump hook failed: {}", error);
        }

        tx.commit().await?;
        log_info!("database cleaned");
        Ok(())
    }
}

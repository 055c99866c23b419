use std::collections::{HashMap, HashSet};

use dp_common::{
    log_debug, log_info, log_warn,
    meta::{
        col_value::ColValue,
        column::Column,
        pump_result::{PumpResult, PumpStatus},
        table::Table,
    },
};
use sqlx::{any::AnyPool, Row};

use crate::{dialect::Dialect, generator::ValueGenerator, sqlx_ext::SqlxAnyExt};

/// Parent table name -> primary key values collected after its pump,
/// consumed by downstream child tables.
pub type FkPool = HashMap<String, Vec<ColValue>>;

const ATTEMPT_BUDGET_FACTOR: usize = 10;
const LOGGED_ERRORS_PER_TABLE: usize = 3;

pub struct Pumper<'a> {
    pub conn_pool: &'a AnyPool,
    pub dialect: &'a (dyn Dialect + Send + Sync),
    pub generator: ValueGenerator,
}

impl Pumper<'_> {
    /// Insert `requested` rows into every table, in dependency order.
    /// `on_progress` fires once per successfully inserted row.
    pub async fn pump(
        &mut self,
        tables: &[Table],
        requested: usize,
        on_progress: &mut (dyn FnMut() + Send),
    ) -> anyhow::Result<Vec<PumpResult>> {
        let mut results = Vec::with_capacity(tables.len());
        let mut fk_pool: FkPool = FkPool::new();

        for table in tables {
            let result = self
                .pump_table(table, requested, &fk_pool, on_progress)
                .await?;
            results.push(result);

            // parents feed children, refresh between tables
            self.refresh_fk_pool(table, &mut fk_pool).await;
        }
        Ok(results)
    }

    async fn pump_table(
        &mut self,
        table: &Table,
        requested: usize,
        fk_pool: &FkPool,
        on_progress: &mut (dyn FnMut() + Send),
    ) -> anyhow::Result<PumpResult> {
        let initial_count = match self.count_rows(&table.name).await {
            Ok(count) => count,
            Err(error) => {
                log_warn!("failed to count {} before pump: {}", table.name, error);
                0
            }
        };

        let adjusted = adjusted_count(table, requested);
        let has_identity = table.has_identity();

        let insert_cols = table.insertable_columns();
        let col_names: Vec<String> = insert_cols.iter().map(|col| col.name.clone()).collect();
        let insert_sql = self.dialect.insert_query(&table.name, &col_names);

        let mut tx = self.conn_pool.begin().await?;
        if let Err(error) = self
            .dialect
            .before_table(&mut tx, &table.name, has_identity)
            .await
        {
            log_warn!("before_table hook failed for {}: {}", table.name, error);
        }

        let has_composite_pk = table.pk_count() > 1;
        let mut used_pk_tuples: HashSet<String> = HashSet::new();
        let mut used_unique_values: HashMap<&str, HashSet<String>> = insert_cols
            .iter()
            .filter(|col| col.is_unique)
            .map(|col| (col.name.as_str(), HashSet::new()))
            .collect();

        let mut inserted = 0;
        let mut attempts = 0;
        let mut error_msg = String::new();

        while inserted < adjusted && attempts < adjusted * ATTEMPT_BUDGET_FACTOR {
            attempts += 1;
            let Some(values) = self.generate_row(table, &insert_cols, fk_pool, attempts) else {
                error_msg = "unsatisfiable foreign key, table skipped".to_string();
                log_warn!("{}: unsatisfiable foreign key, skipping table", table.name);
                break;
            };

            if has_composite_pk {
                let key = composite_pk_key(&insert_cols, &values);
                if !used_pk_tuples.insert(key) {
                    continue;
                }
            }

            let collision = insert_cols.iter().enumerate().any(|(i, col)| {
                col.is_unique
                    && used_unique_values[col.name.as_str()].contains(&values[i].to_dedup_key())
            });
            if collision {
                continue;
            }
            for (i, col) in insert_cols.iter().enumerate() {
                if col.is_unique {
                    used_unique_values
                        .get_mut(col.name.as_str())
                        .unwrap()
                        .insert(values[i].to_dedup_key());
                }
            }

            let mut query = sqlx::query(&insert_sql);
            for value in values.iter() {
                query = query.bind_col_value(value);
            }
            match query.execute(&mut tx).await {
                Ok(_) => {
                    inserted += 1;
                    on_progress();
                }
                Err(error) => {
                    if attempts <= LOGGED_ERRORS_PER_TABLE {
                        log_debug!(
                            "{} attempt {} failed: {}, query: {}",
                            table.name,
                            attempts,
                            error,
                            insert_sql
                        );
                    }
                }
            }
        }

        if let Err(error) = self
            .dialect
            .after_table(&mut tx, &table.name, has_identity)
            .await
        {
            log_warn!("after_table hook failed for {}: {}", table.name, error);
        }
        if let Err(error) = tx.commit().await {
            log_warn!("commit failed for {}: {}", table.name, error);
        }

        let final_count = match self.count_rows(&table.name).await {
            Ok(count) => count,
            Err(error) => {
                log_warn!("failed to count {} after pump: {}", table.name, error);
                initial_count
            }
        };
        let actual = final_count - initial_count;

        let status = if actual >= adjusted as i64 {
            PumpStatus::Ok
        } else {
            if error_msg.is_empty() {
                if inserted == 0 && attempts > 0 {
                    error_msg = "failed to insert any rows, check logs for details".to_string();
                } else {
                    error_msg = format!(
                        "only inserted {} out of {}, high failure rate?",
                        actual, adjusted
                    );
                }
            }
            PumpStatus::MissingData
        };

        log_info!(
            "pumped {}: {}/{} rows in {} attempts",
            table.name,
            actual,
            adjusted,
            attempts
        );

        Ok(PumpResult {
            table_name: table.name.clone(),
            // the report shows the original request even when a cap bound
            target: requested,
            actual,
            status,
            error_msg,
        })
    }

    fn generate_row(
        &mut self,
        table: &Table,
        insert_cols: &[&Column],
        fk_pool: &FkPool,
        attempt: usize,
    ) -> Option<Vec<ColValue>> {
        let mut values = Vec::with_capacity(insert_cols.len());
        for col in insert_cols {
            values.push(self.smart_value(col, table, fk_pool, attempt)?);
        }
        Some(values)
    }

    fn smart_value(
        &mut self,
        col: &Column,
        table: &Table,
        fk_pool: &FkPool,
        attempt: usize,
    ) -> Option<ColValue> {
        if let Some(fk) = table.find_foreign_key(&col.name) {
            return fk_value(
                col,
                fk_pool.get(&fk.ref_table).map(|values| values.as_slice()),
                attempt,
                &mut self.generator,
            );
        }
        Some(self.generator.generate(col, &table.name))
    }

    async fn count_rows(&self, table: &str) -> anyhow::Result<i64> {
        let sql = format!("SELECT COUNT(*) FROM {}", table);
        let row = sqlx::query(&sql).fetch_one(self.conn_pool).await?;
        // mssql counts are 32-bit, mysql/pg are 64-bit
        let count = match row.try_get::<i64, _>(0) {
            Ok(count) => count,
            Err(_) => row.try_get::<i32, _>(0)? as i64,
        };
        Ok(count)
    }

    /// Collect the table's single-column primary key values for its
    /// children. Tables without one contribute nothing.
    async fn refresh_fk_pool(&self, table: &Table, fk_pool: &mut FkPool) {
        let Some(pk) = table.single_pk_column() else {
            return;
        };

        let sql = format!("SELECT {} FROM {}", pk.name, table.name);
        let rows = match sqlx::query(&sql).fetch_all(self.conn_pool).await {
            Ok(rows) => rows,
            Err(error) => {
                log_warn!("failed to collect pk values of {}: {}", table.name, error);
                return;
            }
        };

        let mut values = Vec::with_capacity(rows.len());
        for row in rows.iter() {
            if let Ok(value) = row.try_get::<i64, _>(0) {
                values.push(ColValue::LongLong(value));
            } else if let Ok(value) = row.try_get::<i32, _>(0) {
                values.push(ColValue::LongLong(value as i64));
            } else if let Ok(value) = row.try_get::<String, _>(0) {
                values.push(ColValue::String(value));
            }
        }
        fk_pool.insert(table.name.clone(), values);
    }

    /// Re-count every table after the pump and upgrade statuses.
    pub async fn verify(&self, results: Vec<PumpResult>) -> Vec<PumpResult> {
        let mut verified = Vec::with_capacity(results.len());
        for result in results {
            let (actual, status) = match self.count_rows(&result.table_name).await {
                Ok(current) if current >= result.target as i64 => {
                    (current, PumpStatus::VerifiedOk)
                }
                Ok(current) => (
                    current,
                    PumpStatus::Partial {
                        actual: current,
                        target: result.target,
                    },
                ),
                Err(error) => (result.actual, PumpStatus::VerifyFail(error.to_string())),
            };
            verified.push(PumpResult {
                table_name: result.table_name,
                target: result.target,
                actual,
                status,
                error_msg: result.error_msg,
            });
        }
        verified
    }
}

/// FK value ladder: pool-backed pick first, then the empty-pool fallbacks
/// for cycles. UNIQUE columns and retries pick sequentially so they do not
/// collide, the first attempt of a plain column picks at random.
fn fk_value(
    col: &Column,
    pool_values: Option<&[ColValue]>,
    attempt: usize,
    generator: &mut ValueGenerator,
) -> Option<ColValue> {
    if let Some(values) = pool_values {
        if !values.is_empty() {
            let index = if col.is_unique || attempt > 0 {
                attempt % values.len()
            } else {
                generator.pick_index(values.len())
            };
            return Some(values[index].clone());
        }
    }

    // empty pool: the parent sits later in a dependency cycle
    if col.is_nullable {
        return Some(ColValue::None);
    }
    if col.is_unique && attempt > 0 {
        return Some(ColValue::LongLong(attempt as i64));
    }
    // assume the parent bootstraps with pk 1
    Some(ColValue::LongLong(1))
}

fn composite_pk_key(insert_cols: &[&Column], values: &[ColValue]) -> String {
    let mut parts = Vec::new();
    for (i, col) in insert_cols.iter().enumerate() {
        if col.is_pk {
            parts.push(values[i].to_dedup_key());
        }
    }
    parts.join("|")
}

pub fn data_type_max(data_type: &str) -> usize {
    match data_type.to_lowercase().as_str() {
        "tinyint" => 255,
        "smallint" => 32_767,
        "mediumint" => 8_388_607,
        _ => 2_147_483_647,
    }
}

/// Clamp the requested row count by the narrowest auto-increment column,
/// a tinyint identity cannot hold more than 255 distinct keys.
pub fn adjusted_count(table: &Table, requested: usize) -> usize {
    let mut max_count = requested;
    for col in table.columns.iter() {
        if !col.is_auto_inc {
            continue;
        }
        let type_max = data_type_max(&col.data_type);
        if type_max < max_count {
            max_count = type_max;
            log_info!(
                "table {}: identity column {} ({}) caps rows at {}",
                table.name,
                col.name,
                col.data_type,
                type_max
            );
        }
    }
    max_count
}

#[cfg(test)]
mod tests {

    use super::*;

    fn column(name: &str) -> Column {
        Column {
            name: name.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_data_type_max() {
        assert_eq!(data_type_max("tinyint"), 255);
        assert_eq!(data_type_max("smallint"), 32767);
        assert_eq!(data_type_max("mediumint"), 8_388_607);
        assert_eq!(data_type_max("int"), 2_147_483_647);
        assert_eq!(data_type_max("bigint"), 2_147_483_647);
    }

    #[test]
    fn test_adjusted_count_caps_by_identity_type() {
        let mut table = Table::new("actor");
        let mut id = column("actor_id");
        id.is_pk = true;
        id.is_auto_inc = true;
        id.data_type = "tinyint".to_string();
        table.columns.push(id);

        assert_eq!(adjusted_count(&table, 1_000_000), 255);
        assert_eq!(adjusted_count(&table, 100), 100);
    }

    #[test]
    fn test_adjusted_count_without_identity() {
        let mut table = Table::new("film_actor");
        table.columns.push(column("film_id"));
        assert_eq!(adjusted_count(&table, 1_000_000), 1_000_000);
    }

    #[test]
    fn test_fk_value_sequential_for_unique() {
        let mut generator = ValueGenerator::new(Some(1));
        let mut col = column("store_id");
        col.is_unique = true;
        let pool = vec![
            ColValue::LongLong(10),
            ColValue::LongLong(20),
            ColValue::LongLong(30),
        ];

        assert_eq!(
            fk_value(&col, Some(&pool), 1, &mut generator),
            Some(ColValue::LongLong(20))
        );
        assert_eq!(
            fk_value(&col, Some(&pool), 2, &mut generator),
            Some(ColValue::LongLong(30))
        );
        assert_eq!(
            fk_value(&col, Some(&pool), 3, &mut generator),
            Some(ColValue::LongLong(10))
        );
    }

    #[test]
    fn test_fk_value_random_pick_stays_in_pool() {
        let mut generator = ValueGenerator::new(Some(1));
        let col = column("customer_id");
        let pool = vec![ColValue::LongLong(1), ColValue::LongLong(2)];
        for _ in 0..20 {
            let value = fk_value(&col, Some(&pool), 0, &mut generator).unwrap();
            assert!(pool.contains(&value));
        }
    }

    #[test]
    fn test_fk_value_empty_pool_fallbacks() {
        let mut generator = ValueGenerator::new(Some(1));

        let mut nullable = column("manager_staff_id");
        nullable.is_nullable = true;
        assert_eq!(
            fk_value(&nullable, None, 0, &mut generator),
            Some(ColValue::None)
        );

        let mut unique = column("manager_staff_id");
        unique.is_unique = true;
        assert_eq!(
            fk_value(&unique, Some(&[]), 5, &mut generator),
            Some(ColValue::LongLong(5))
        );

        let plain = column("store_id");
        assert_eq!(
            fk_value(&plain, Some(&[]), 0, &mut generator),
            Some(ColValue::LongLong(1))
        );
    }

    #[test]
    fn test_composite_pk_key() {
        let mut film_id = column("film_id");
        film_id.is_pk = true;
        let mut actor_id = column("actor_id");
        actor_id.is_pk = true;
        let note = column("note");
        let cols: Vec<&Column> = vec![&film_id, &actor_id, &note];

        let values = vec![
            ColValue::LongLong(3),
            ColValue::LongLong(7),
            ColValue::String("x".to_string()),
        ];
        assert_eq!(composite_pk_key(&cols, &values), "3|7");

        let with_null = vec![
            ColValue::LongLong(3),
            ColValue::None,
            ColValue::String("x".to_string()),
        ];
        assert_eq!(composite_pk_key(&cols, &with_null), "3|NULL");
    }
}

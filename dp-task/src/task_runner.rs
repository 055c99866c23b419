use std::collections::HashSet;

use anyhow::bail;
use dp_common::{
    config::{
        config_enums::DbType,
        pump_config::{PumpConfig, SettingsConfig},
    },
    error::Error,
    log_info,
    meta::{pump_result::PumpResult, table::Table},
};
use dp_connector::{
    cleaner::Cleaner,
    conn_util::ConnUtil,
    dialect::{get_dialect, Dialect},
    generator::ValueGenerator,
    pumper::Pumper,
    schema_analyzer::SchemaAnalyzer,
};
use log4rs::config::RawConfig;
use sqlx::{any::AnyPool, Row};

const DEFAULT_CONFIG_FILE: &str = "dbpump.ini";
const LOG_LEVEL_PLACEHOLDER: &str = "LOG_LEVEL_PLACEHOLDER";
const LOG_DIR_PLACEHOLDER: &str = "LOG_DIR_PLACEHOLDER";

const DEFAULT_LOG4RS_YAML: &str = "
appenders:
  stdout:
    kind: console
    encoder:
      pattern: \"{d(%Y-%m-%d %H:%M:%S)} [{l}] {m}{n}\"
  default_file:
    kind: file
    path: \"LOG_DIR_PLACEHOLDER/dbpump.log\"
    encoder:
      pattern: \"{d(%Y-%m-%d %H:%M:%S)} [{l}] {m}{n}\"
root:
  level: LOG_LEVEL_PLACEHOLDER
  appenders:
    - stdout
loggers:
  default_logger:
    level: LOG_LEVEL_PLACEHOLDER
    appenders:
      - stdout
      - default_file
    additive: false
";

#[derive(Debug, Default)]
pub struct RunOptions {
    pub config_file: Option<String>,
    pub url: Option<String>,
    pub driver: Option<String>,
    pub count: Option<usize>,
    pub clean_first: bool,
    pub dry_run: bool,
    pub tables: Vec<String>,
}

pub struct TaskRunner {
    db_type: DbType,
    url: String,
    settings: SettingsConfig,
}

impl TaskRunner {
    /// Resolve the target database: an explicit `--url` bypasses the config
    /// file, otherwise the single active entry of the config file is used.
    pub fn new(opts: &RunOptions) -> anyhow::Result<Self> {
        if let Some(url) = &opts.url {
            let db_type = match &opts.driver {
                Some(driver) => match driver.parse::<DbType>() {
                    Ok(db_type) => db_type,
                    Err(_) => {
                        bail! {Error::ConfigError(format!("unsupported driver: {}", driver))}
                    }
                },
                None => match DbType::from_url(url) {
                    Some(db_type) => db_type,
                    None => {
                        bail! {Error::ConfigError(
                            "could not detect driver from DSN, please specify --driver"
                                .to_string()
                        )}
                    }
                },
            };
            return Ok(Self {
                db_type,
                url: url.clone(),
                settings: SettingsConfig::default(),
            });
        }

        let config_file = opts
            .config_file
            .clone()
            .unwrap_or_else(|| DEFAULT_CONFIG_FILE.to_string());
        let config = PumpConfig::new(&config_file)?;
        let active = config.active_database().clone();
        log_info!("using database: {} ({})", active.name, active.db_type);

        Ok(Self {
            db_type: active.db_type,
            url: active.url,
            settings: config.settings,
        })
    }

    pub fn init_log4rs(&self) -> anyhow::Result<()> {
        let config_str = DEFAULT_LOG4RS_YAML
            .replace(LOG_LEVEL_PLACEHOLDER, &self.settings.log_level)
            .replace(LOG_DIR_PLACEHOLDER, &self.settings.log_dir);
        let config: RawConfig = serde_yaml::from_str(&config_str)?;
        log4rs::init_raw_config(config)?;
        Ok(())
    }

    /// The full pipeline: analyze, optionally clean, pump, verify.
    /// Returns the verified per-table results for the report.
    pub async fn fill(
        &self,
        opts: &RunOptions,
        on_progress: &mut (dyn FnMut() + Send),
    ) -> anyhow::Result<Vec<PumpResult>> {
        let conn_pool = self.connect().await?;
        let dialect = get_dialect(&self.db_type);

        let tables = self.analyze(&conn_pool, dialect.as_ref()).await?;
        let tables = self.filter_tables(tables, &opts.tables)?;

        if opts.dry_run {
            log_info!("dry-run mode active, no data will be written");
            for (i, table) in tables.iter().enumerate() {
                log_info!(
                    "[{:02}] {} (dependencies: {:?})",
                    i + 1,
                    table.name,
                    table.dependencies
                );
            }
            conn_pool.close().await;
            return Ok(Vec::new());
        }

        if opts.clean_first {
            let cleaner = Cleaner {
                conn_pool: &conn_pool,
                dialect: dialect.as_ref(),
            };
            cleaner.clean(&tables).await?;
        }

        let count = opts.count.unwrap_or(self.settings.default_count);
        log_info!("starting pump with count={} per table", count);

        let mut pumper = Pumper {
            conn_pool: &conn_pool,
            dialect: dialect.as_ref(),
            generator: ValueGenerator::new(self.settings.seed),
        };
        let results = pumper.pump(&tables, count, on_progress).await?;
        let verified = pumper.verify(results).await;

        conn_pool.close().await;
        Ok(verified)
    }

    /// Wipe every table in reverse dependency order.
    pub async fn clean(&self) -> anyhow::Result<()> {
        let conn_pool = self.connect().await?;
        let dialect = get_dialect(&self.db_type);

        let tables = self.analyze(&conn_pool, dialect.as_ref()).await?;
        let cleaner = Cleaner {
            conn_pool: &conn_pool,
            dialect: dialect.as_ref(),
        };
        cleaner.clean(&tables).await?;

        conn_pool.close().await;
        Ok(())
    }

    async fn connect(&self) -> anyhow::Result<AnyPool> {
        // the pipeline is strictly sequential, one connection is enough
        ConnUtil::create_conn_pool(&self.url, &self.db_type, 1).await
    }

    async fn analyze(
        &self,
        conn_pool: &AnyPool,
        dialect: &(dyn Dialect + Send + Sync),
    ) -> anyhow::Result<Vec<Table>> {
        log_info!("analyzing schema");
        let schema = self.resolve_schema(conn_pool).await?;
        let analyzer = SchemaAnalyzer {
            conn_pool,
            dialect,
            schema,
        };
        analyzer.analyze().await
    }

    /// MySQL scopes introspection by the current database, the other
    /// dialects fill their defaults from an empty input.
    async fn resolve_schema(&self, conn_pool: &AnyPool) -> anyhow::Result<String> {
        if self.db_type != DbType::Mysql {
            return Ok(String::new());
        }
        let row = sqlx::query("SELECT DATABASE()").fetch_one(conn_pool).await?;
        let schema: Option<String> = row.try_get(0)?;
        match schema {
            Some(schema) if !schema.is_empty() => Ok(schema),
            _ => {
                bail! {Error::MetadataError(
                    "no database selected, add the database name to the DSN".to_string()
                )}
            }
        }
    }

    /// Selection precedence: CLI flag > config settings > all tables.
    fn filter_tables(
        &self,
        all_tables: Vec<Table>,
        cli_tables: &[String],
    ) -> anyhow::Result<Vec<Table>> {
        let requested = if !cli_tables.is_empty() {
            cli_tables
        } else {
            self.settings.tables.as_slice()
        };
        if requested.is_empty() {
            return Ok(all_tables);
        }

        let wanted: HashSet<String> = requested.iter().map(|tb| tb.to_lowercase()).collect();
        let filtered: Vec<Table> = all_tables
            .into_iter()
            .filter(|table| wanted.contains(&table.name.to_lowercase()))
            .collect();

        if filtered.is_empty() {
            bail! {Error::ConfigError(format!(
                "no matching tables found for: {:?}",
                requested
            ))}
        }
        Ok(filtered)
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    fn runner_with_tables(tables: Vec<String>) -> TaskRunner {
        TaskRunner {
            db_type: DbType::Mysql,
            url: "mysql://localhost/test".to_string(),
            settings: SettingsConfig {
                tables,
                ..Default::default()
            },
        }
    }

    fn named_tables(names: &[&str]) -> Vec<Table> {
        names.iter().map(|name| Table::new(name)).collect()
    }

    #[test]
    fn test_cli_url_bypasses_config() {
        let opts = RunOptions {
            url: Some("postgres://app@localhost/app".to_string()),
            ..Default::default()
        };
        let runner = TaskRunner::new(&opts).unwrap();
        assert_eq!(runner.db_type, DbType::Pg);
    }

    #[test]
    fn test_cli_driver_overrides_detection() {
        let opts = RunOptions {
            url: Some("server=localhost;database=app".to_string()),
            driver: Some("sqlserver".to_string()),
            ..Default::default()
        };
        let runner = TaskRunner::new(&opts).unwrap();
        assert_eq!(runner.db_type, DbType::Mssql);
    }

    #[test]
    fn test_undetectable_dsn_requires_driver() {
        let opts = RunOptions {
            url: Some("server=localhost;database=app".to_string()),
            ..Default::default()
        };
        assert!(TaskRunner::new(&opts).is_err());
    }

    #[test]
    fn test_filter_precedence_cli_over_config() {
        let runner = runner_with_tables(vec!["store".to_string()]);
        let tables = named_tables(&["store", "staff", "payment"]);

        let filtered = runner
            .filter_tables(tables, &["Staff".to_string()])
            .unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].name, "staff");
    }

    #[test]
    fn test_filter_falls_back_to_config_then_all() {
        let runner = runner_with_tables(vec!["store".to_string()]);
        let filtered = runner
            .filter_tables(named_tables(&["store", "staff"]), &[])
            .unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].name, "store");

        let runner = runner_with_tables(Vec::new());
        let all = runner
            .filter_tables(named_tables(&["store", "staff"]), &[])
            .unwrap();
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn test_filter_without_match_fails() {
        let runner = runner_with_tables(Vec::new());
        let result = runner.filter_tables(named_tables(&["store"]), &["ghost".to_string()]);
        assert!(result.is_err());
    }
}

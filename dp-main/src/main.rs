use std::process;

use clap::{Parser, Subcommand};
use dp_common::{
    log_error, log_info,
    meta::pump_result::{PumpResult, PumpStatus},
};
use dp_task::task_runner::{RunOptions, TaskRunner};
use indicatif::{ProgressBar, ProgressStyle};

#[derive(Parser)]
#[command(name = "dbpump", version, about = "Database data generator & pumper")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fill the database with generated rows
    Fill {
        /// Rows to generate per table (overrides config)
        #[arg(long)]
        count: Option<usize>,

        /// Wipe the selected tables before filling
        #[arg(long)]
        clean: bool,

        /// Analyze and report without writing anything
        #[arg(long)]
        dry_run: bool,

        /// Restrict the run to these tables
        #[arg(short, long, value_delimiter = ',')]
        tables: Vec<String>,

        /// Config file path (default ./dbpump.ini)
        #[arg(long)]
        config: Option<String>,

        /// Connection DSN, bypasses the config file
        #[arg(long)]
        dsn: Option<String>,

        /// Driver name: mysql, postgres, sqlserver, oracle
        #[arg(long)]
        driver: Option<String>,
    },

    /// Wipe all tables in reverse dependency order
    Clean {
        /// Config file path (default ./dbpump.ini)
        #[arg(long)]
        config: Option<String>,

        /// Connection DSN, bypasses the config file
        #[arg(long)]
        dsn: Option<String>,

        /// Driver name: mysql, postgres, sqlserver, oracle
        #[arg(long)]
        driver: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(error) = run(cli).await {
        log_error!("{:#}", error);
        eprintln!("error: {:#}", error);
        process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Fill {
            count,
            clean,
            dry_run,
            tables,
            config,
            dsn,
            driver,
        } => {
            let opts = RunOptions {
                config_file: config,
                url: dsn,
                driver,
                count,
                clean_first: clean,
                dry_run,
                tables,
            };
            let runner = TaskRunner::new(&opts)?;
            runner.init_log4rs()?;

            let bar = ProgressBar::new_spinner();
            bar.set_style(
                ProgressStyle::with_template("{spinner} inserted {pos} rows ({per_sec})")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            let mut on_progress = || bar.inc(1);

            let started = std::time::Instant::now();
            let results = runner.fill(&opts, &mut on_progress).await?;
            bar.finish_and_clear();

            if !results.is_empty() {
                print_report(&results);
                log_info!("pump done, elapsed: {:?}", started.elapsed());
            }
            Ok(())
        }

        Commands::Clean {
            config,
            dsn,
            driver,
        } => {
            let opts = RunOptions {
                config_file: config,
                url: dsn,
                driver,
                ..Default::default()
            };
            let runner = TaskRunner::new(&opts)?;
            runner.init_log4rs()?;
            runner.clean().await
        }
    }
}

fn print_report(results: &[PumpResult]) {
    println!("\nsummary report (dependency order):");
    let mut total = 0;
    for (i, result) in results.iter().enumerate() {
        let icon = if result.status == PumpStatus::VerifiedOk {
            '✓'
        } else {
            '!'
        };
        println!(
            "[{}] [{:02}/{:02}] {:<24} : {} rows (target: {}) - {}",
            icon,
            i + 1,
            results.len(),
            result.table_name,
            result.actual,
            result.target,
            result.status
        );
        if !result.error_msg.is_empty() {
            println!("    └ {}", result.error_msg);
        }
        total += result.actual;
    }
    println!("--------------------------------------------------");
    println!("total rows inserted: {}", total);
}

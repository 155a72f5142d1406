//! 批量导入抽取结果 (JSON 数组) 到数据库

use anyhow::Context;
use clap::Parser;
use invoice_analytics::models::ExtractionRecord;
use invoice_analytics::service::loader::write_skip_report;
use invoice_analytics::{create_pool, run_migrations, AppConfig, Loader, PgLoadStore};
use std::fs::File;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::fmt::time::ChronoLocal;

#[derive(Parser, Debug)]
#[command(name = "seed")]
#[command(about = "Load extracted invoice records into the analytics database")]
struct Cli {
    /// JSON file containing an array of extraction records
    file: PathBuf,

    /// Clear payments, line items, invoices, customers and vendors first
    #[arg(long)]
    reset: bool,

    /// Write skipped records to this CSV file
    #[arg(long)]
    skip_report: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_target(false)
        .init();

    let config = AppConfig::load(cli.config.as_deref()).context("failed to load configuration")?;

    let file = File::open(&cli.file)
        .with_context(|| format!("cannot open {}", cli.file.display()))?;
    let records: Vec<ExtractionRecord> = serde_json::from_reader(std::io::BufReader::new(file))
        .with_context(|| format!("{} is not a JSON array of records", cli.file.display()))?;
    info!("Loaded {} records from {}", records.len(), cli.file.display());

    let pool = create_pool(&config.database)
        .await
        .context("failed to connect to database")?;
    run_migrations(&pool).await.context("failed to apply migrations")?;

    let loader = Loader::new(PgLoadStore::new(pool));
    if cli.reset {
        loader.reset().await?;
    }

    let stats = loader.load(&records).await?;

    println!("Seed completed");
    println!("  Vendors:    {}", stats.vendors_created);
    println!("  Customers:  {}", stats.customers_created);
    println!("  Invoices:   {}", stats.invoices_created);
    println!("  Line items: {}", stats.line_items_created);
    println!("  Skipped:    {}", stats.skipped);

    if let Some(path) = cli.skip_report {
        let out = File::create(&path)
            .with_context(|| format!("cannot create {}", path.display()))?;
        write_skip_report(&stats.errors, out)?;
        info!("Skip report written to {} ({} rows)", path.display(), stats.errors.len());
    }

    Ok(())
}

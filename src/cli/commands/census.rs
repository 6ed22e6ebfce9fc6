//! Census command implementation

use super::shared::{create_spinner, print_summary};
use crate::cli::args::CensusArgs;
use crate::constants::nomis_columns;
use crate::error::Result;
use crate::fetch::HttpFetcher;
use crate::models::ProcessingStats;
use crate::nomis::NomisClient;
use crate::nomis::reshape::{merge_tables, wide_table};
use crate::table::write_csv;
use colored::*;
use std::time::Instant;
use tracing::{info, warn};

/// Build one query per dataset code and optionally download the results.
///
/// Downloaded tables are also pivoted to one row per area and merged
/// into a single `<prefix>_nomisweb.csv`.
pub async fn run_census(args: CensusArgs) -> Result<ProcessingStats> {
    let start = Instant::now();
    args.validate()?;
    let config = args.config();
    config.validate()?;

    let spinner = create_spinner("Scraping Nomisweb dataset definitions...", args.logging.show_progress());
    let client = NomisClient::connect(
        HttpFetcher::new(&config.user_agent)?,
        &config,
        args.api_key.clone().unwrap_or_default(),
    )
    .await?;
    spinner.finish_and_clear();

    let mut stats = ProcessingStats::default();
    let mut wide_tables = Vec::new();
    for code in &args.codes.codes {
        let plan = client.build_url(code).await?;
        println!(
            "\n{} {} ({})",
            code.bright_cyan().bold(),
            plan.name,
            plan.dataset_id.bright_white()
        );
        println!("  {}", plan.url);

        let Some(dir) = args.output_dir.as_ref().filter(|_| args.download) else {
            continue;
        };

        let mut frame = client.download(&plan).await?;
        let path = dir.join(format!("{}_{}.csv", code.replace(['/', '\\', ' '], "_"), plan.dataset_id));
        write_csv(&path, &mut frame)?;
        info!("Wrote {} rows for {} to {}", frame.height(), code, path.display());

        stats.files_downloaded += 1;
        stats.records_written += frame.height();
        stats.output_paths.push(path);

        if frame.column(nomis_columns::CELL_NAME).is_ok() {
            wide_tables.push(wide_table(&frame, code)?);
        } else {
            warn!("{} has no decoded cells, leaving it out of the merged table", code);
        }
    }

    if let Some(path) = args.merged_path().filter(|_| !wide_tables.is_empty()) {
        let mut merged = merge_tables(wide_tables)?;
        println!("\nWriting merged census table to {}...", path.display());
        write_csv(&path, &mut merged)?;
        info!("Merged table has {} areas", merged.height());
        stats.output_paths.push(path);
    }

    stats.records_read = args.codes.codes.len();
    stats.processing_time_ms = start.elapsed().as_millis();
    print_summary("Census queries complete", &stats);
    Ok(stats)
}

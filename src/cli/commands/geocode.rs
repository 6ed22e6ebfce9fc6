//! Geocode command implementation

use super::shared::{create_progress_bar, print_summary};
use crate::cli::args::GeocodeArgs;
use crate::error::Result;
use crate::fetch::HttpFetcher;
use crate::geocode::{FrequencyTable, Geocoder, geocoded_frame, reshape_long};
use crate::models::ProcessingStats;
use crate::table::{CsvSource, read_csv_file, write_csv};
use colored::*;
use std::time::Instant;
use tracing::info;

/// Reshape, geocode and write a participant postcode file
pub async fn run_geocode(args: GeocodeArgs) -> Result<ProcessingStats> {
    let start = Instant::now();
    args.validate()?;
    let config = args.config();
    config.validate()?;

    println!("{}", "Reading and formatting data...".bright_yellow());
    let input = read_csv_file(&args.input, CsvSource::default())?;
    let records = reshape_long(&input, &args.id_column)?;
    let total = records.len();

    println!(
        "{} {} postcodes with {} worker(s) ({} cores available)",
        "Geocoding".bright_cyan(),
        total.to_string().bright_white().bold(),
        config.workers,
        num_cpus::get()
    );

    let geocoder = Geocoder::new(HttpFetcher::new(&config.user_agent)?, &config);
    let progress = create_progress_bar(total as u64, "postcodes", args.logging.show_progress());
    let geocoded = geocoder
        .geocode_all(records, config.workers, &progress)
        .await?;
    progress.finish_and_clear();

    let rejected = geocoded.iter().filter(|r| !r.outcome.is_found()).count();
    info!("{} of {} postcodes were rejected", rejected, total);

    println!(
        "\n{}\n",
        "Frequency table for country of residence:".bright_green().bold()
    );
    print!("{}", FrequencyTable::from_records(&geocoded));

    let mut frame = geocoded_frame(&args.id_column, &geocoded)?;
    write_csv(&args.output, &mut frame)?;

    let stats = ProcessingStats {
        records_read: input.height(),
        records_written: frame.height(),
        unmatched_records: rejected,
        output_paths: vec![args.output.clone()],
        processing_time_ms: start.elapsed().as_millis(),
        ..Default::default()
    };
    print_summary("Geocoding complete", &stats);
    Ok(stats)
}

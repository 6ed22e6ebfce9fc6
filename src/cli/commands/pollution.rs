//! Pollution command implementation

use super::shared::{create_spinner, print_summary};
use crate::cli::args::PollutionArgs;
use crate::constants::participant_columns;
use crate::defra::{DefraClient, linker};
use crate::error::Result;
use crate::fetch::HttpFetcher;
use crate::models::{PollutantSelection, ProcessingStats};
use crate::table::{CsvSource, read_csv_file, require_columns, write_csv};
use colored::*;
use std::time::Instant;

/// Link a geocoded participant file to the selected pollutants
pub async fn run_pollution(args: PollutionArgs) -> Result<ProcessingStats> {
    let start = Instant::now();
    args.validate()?;
    let config = args.config();
    config.validate()?;
    let pollutants = &args.pollutants.pollutants;

    println!("{}", "Reading geocoded data...".bright_yellow());
    let records = read_csv_file(&args.input, CsvSource::default())?;
    require_columns(
        &records,
        &[
            args.id_column.as_str(),
            participant_columns::YEAR,
            participant_columns::EASTINGS,
            participant_columns::NORTHINGS,
        ],
        "geocoded file",
    )?;

    let spinner = create_spinner("Scraping pollution data...", args.logging.show_progress());
    let client = DefraClient::connect(HttpFetcher::new(&config.user_agent)?, &config).await?;
    let years = linker::cohort_years(&records)?;
    let plan = client.plan(&years, pollutants)?;
    spinner.finish_and_clear();

    print_selection(&plan);

    let names: Vec<String> = pollutants.iter().map(|p| p.to_string()).collect();
    let spinner = create_spinner(
        &format!("Linking postcodes to {}...", names.join(", ")),
        args.logging.show_progress(),
    );
    let mut linked = client.link(&records, pollutants).await?;
    spinner.finish_and_clear();

    let output = args.output_path();
    println!("Writing results to {}...", output.display());
    write_csv(&output, &mut linked.frame)?;

    let stats = ProcessingStats {
        records_read: records.height(),
        records_written: linked.frame.height(),
        unmatched_records: linked.unmatched,
        files_downloaded: linked.files_downloaded,
        output_paths: vec![output],
        processing_time_ms: start.elapsed().as_millis(),
    };
    print_summary("Pollution linking complete", &stats);
    Ok(stats)
}

/// Print the chosen source per pollutant and cohort year
fn print_selection(plan: &[PollutantSelection]) {
    println!("\n{}", "Information on selected pollutants:".bright_green().bold());
    println!("Pay attention to:");
    println!("  1) differences between the postcode year and the pollution data year");
    println!("  2) comments, since units sometimes differ between years\n");

    let mut rows: Vec<&PollutantSelection> = plan.iter().collect();
    rows.sort_by(|a, b| a.entry.pollutant.cmp(&b.entry.pollutant));

    println!(
        "  {:<10} {:<15} {:<16} {:<14} {}",
        "Pollutant".bright_cyan(),
        "Year: postcode".bright_cyan(),
        "Year: pollution".bright_cyan(),
        "Metric".bright_cyan(),
        "Comments".bright_cyan()
    );
    for row in rows {
        let data_year = if row.entry.year.trim() == row.cohort_year {
            row.entry.year.normal()
        } else {
            row.entry.year.bright_yellow()
        };
        println!(
            "  {:<10} {:<15} {:<16} {:<14} {}",
            row.entry.pollutant,
            row.cohort_year,
            data_year,
            row.entry.metric,
            row.entry.comment.as_deref().unwrap_or("")
        );
    }
    println!();
}

use clap::Parser;
use cohort_linker::cli::{args::Args, commands};
use std::process;

fn main() {
    // Parse command line arguments
    let args = Args::parse();

    // If no subcommand was provided, show help and available commands
    if args.command.is_none() {
        show_help_and_commands();
        process::exit(0);
    }

    let runtime = tokio::runtime::Runtime::new().unwrap_or_else(|e| {
        eprintln!("Failed to create async runtime: {}", e);
        process::exit(1);
    });

    let result = runtime.block_on(async {
        let shutdown_signal = async {
            // Without a signal handler, run to completion
            if tokio::signal::ctrl_c().await.is_err() {
                std::future::pending::<()>().await;
            }
        };

        tokio::select! {
            result = commands::run(args) => result,
            _ = shutdown_signal => {
                eprintln!("\nReceived CTRL+C, shutting down...");
                Err(cohort_linker::LinkerError::ProcessingInterrupted {
                    reason: "Interrupted by user".to_string(),
                })
            }
        }
    });

    match result {
        Ok(_stats) => {
            // Stats have already been reported by the command
            process::exit(0);
        }
        Err(error) => {
            eprintln!("Error: {:#}", error);
            process::exit(1);
        }
    }
}

/// Show help information and available commands when no subcommand is provided
fn show_help_and_commands() {
    println!("Cohort Linker - area-level data for UK cohort participants");
    println!("==========================================================");
    println!();
    println!("USAGE:");
    println!("    cohort-linker <COMMAND> [OPTIONS]");
    println!();
    println!("COMMANDS:");
    println!("    geocode     Geocode participant postcodes with postcodes.io");
    println!("    census      Build (and optionally download) Nomisweb census queries");
    println!("    pollution   Attach DEFRA PCM annual pollution values to participants");
    println!("    help        Show this help message or help for specific commands");
    println!();
    println!("EXAMPLES:");
    println!("    # Geocode postcodes collected in several years:");
    println!("    cohort-linker geocode -f postcodes.csv -i id_twin -o geocoded.csv -j 4");
    println!();
    println!("    # Build query URLs for two census tables:");
    println!("    cohort-linker census -c KS101EW,QS119EW -k $NOMIS_API_KEY");
    println!();
    println!("    # Link geocoded participants to PM10 and NO2:");
    println!("    cohort-linker pollution -f geocoded.csv -i id_twin -o cohort -p PM10,NO2");
    println!();
    println!("For detailed help on any command, use:");
    println!("    cohort-linker <COMMAND> --help");
}

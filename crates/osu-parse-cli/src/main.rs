//! osu-parse - Decode osu! replays and beatmaps from the command line
//!
//! Usage:
//!   osu-parse <command> [options]   Run a command, printing JSON to stdout
//!   osu-parse --help                Show help

use tracing::Level;
use tracing_subscriber::FmtSubscriber;

mod cli;

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    if args.is_empty() || args.iter().any(|a| a == "--help" || a == "-h") {
        cli::print_help();
        return Ok(());
    }

    let (command, options) = match cli::parse_args(&args) {
        Ok(parsed) => parsed,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!();
            cli::print_help();
            std::process::exit(1);
        }
    };

    init_logging(options.verbosity);
    osu_parse_core::init_diagnostics();

    cli::run(command, options)
}

fn init_logging(verbosity: u8) {
    // Logs go to stderr so stdout stays valid JSON
    let level = match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}

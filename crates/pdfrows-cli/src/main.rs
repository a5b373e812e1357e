mod commands;
mod output;
mod page_range;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "pdfrows",
    version,
    about = "Extract tables and text from PDF documents"
)]
struct Cli {
    /// Log debug output to stderr (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract the table between two markers
    Import {
        /// Path to the PDF file, or - for stdin
        input_file: PathBuf,

        /// Backend: lopdf (default) or pdftotext
        #[arg(short, long)]
        backend: Option<String>,

        /// Pages to read, in order (e.g. 1,3-4)
        #[arg(short, long)]
        pages: Option<String>,

        /// Text of the line just above the table
        #[arg(long, value_name = "TEXT", conflicts_with = "starts_after_regex")]
        starts_after: Option<String>,

        /// Regex matching the line just above the table
        #[arg(long, value_name = "RE")]
        starts_after_regex: Option<String>,

        /// Text of the line just below the table
        #[arg(long, value_name = "TEXT", conflicts_with = "ends_before_regex")]
        ends_before: Option<String>,

        /// Regex matching the line just below the table
        #[arg(long, value_name = "RE")]
        ends_before_regex: Option<String>,

        /// Algorithm: y-groups (default), header-position or rects-boundaries
        #[arg(short, long)]
        algorithm: Option<String>,

        /// JSON options file; flags override its values
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Output format: table (default), csv or json
        #[arg(short, long, default_value = "table")]
        output: String,

        /// Write the table to a file instead of stdout
        #[arg(short = 'O', long = "out", value_name = "FILE")]
        out: Option<PathBuf>,
    },
    /// Print the number of pages
    Pages {
        /// Path to the PDF file, or - for stdin
        input_file: PathBuf,

        #[arg(short, long)]
        backend: Option<String>,
    },
    /// Print the plain text of each page, separated by form feeds
    Text {
        /// Path to the PDF file, or - for stdin
        input_file: PathBuf,

        #[arg(short, long)]
        backend: Option<String>,

        /// Pages to print, in order (e.g. 1,3-4)
        #[arg(short, long)]
        pages: Option<String>,
    },
    /// List backends and what they support
    Backends,
}

fn init_tracing(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Import {
            input_file,
            backend,
            pages,
            starts_after,
            starts_after_regex,
            ends_before,
            ends_before_regex,
            algorithm,
            config,
            output,
            out,
        } => commands::import::run(commands::import::ImportArgs {
            input_file,
            backend,
            pages,
            starts_after,
            starts_after_regex,
            ends_before,
            ends_before_regex,
            algorithm,
            config,
            output,
            out,
        }),
        Commands::Pages {
            input_file,
            backend,
        } => commands::pages::run(&input_file, backend.as_deref()),
        Commands::Text {
            input_file,
            backend,
            pages,
        } => commands::text::run(&input_file, backend.as_deref(), pages.as_deref()),
        Commands::Backends => commands::backends::run(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

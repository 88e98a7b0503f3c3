use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info};
use std::fs::{self, File};
use std::io::{self, IsTerminal, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use vtile::{
    codec::{display_name, STDIN_NAME},
    read_tile, render, resolve_format, CodecConfig, JsonIndent, Tile, TileError, TileFormat,
};

/// Convert vector tiles between the binary and JSON formats and report
/// per-column statistics
#[derive(Parser)]
#[command(name = "vtile")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Configuration file path (JSON)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Supported tile formats
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    /// Binary vector tile
    Tile,
    /// JSON document
    Json,
}

impl From<Format> for TileFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Tile => TileFormat::Tile,
            Format::Json => TileFormat::Json,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a tile between formats
    Convert {
        /// Source file (use '-' or omit for stdin)
        #[arg(value_name = "SOURCE")]
        source: Option<String>,

        /// Destination file (use '-' or omit for stdout)
        #[arg(value_name = "DEST")]
        dest: Option<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "tile")]
        format: Format,

        /// Source format; detected from the file extension when omitted
        #[arg(long, value_enum)]
        srcformat: Option<Format>,

        /// JSON indentation: number of spaces, or 'none' for compact output
        #[arg(long, value_name = "N|none", default_value = "4")]
        indent: JsonIndent,
    },

    /// Print a min/max report for every column of a tile
    Info {
        /// Source file (use '-' or omit for stdin)
        #[arg(value_name = "SOURCE")]
        source: Option<String>,

        /// Source format; detected from the file extension when omitted
        #[arg(long, value_enum)]
        srcformat: Option<Format>,

        /// JSON indentation: number of spaces, or 'none' for compact output
        #[arg(long, value_name = "N|none", default_value = "4")]
        indent: JsonIndent,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity flags
    setup_logging(cli.verbose, cli.quiet);

    // Load configuration if specified
    let config = if let Some(config_path) = &cli.config {
        load_config(config_path)?
    } else {
        CodecConfig::default()
    };

    match cli.command {
        Commands::Convert {
            source,
            dest,
            format,
            srcformat,
            indent,
        } => {
            convert_command(
                source.as_deref(),
                dest.as_deref(),
                srcformat.map(TileFormat::from),
                format.into(),
                indent,
                &config,
                cli.quiet,
            )?;
        }
        Commands::Info {
            source,
            srcformat,
            indent,
        } => {
            info_command(
                source.as_deref(),
                srcformat.map(TileFormat::from),
                indent,
                &config,
                cli.quiet,
            )?;
        }
    }

    Ok(())
}

/// Set up logging based on verbosity flags
fn setup_logging(verbose: bool, quiet: bool) {
    let log_level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "info"
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .format_module_path(false)
        .format_target(false)
        .init();

    debug!("Logging initialized at {} level", log_level);
}

/// Load configuration from a JSON file
fn load_config(path: &Path) -> Result<CodecConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let config: CodecConfig = serde_json::from_str(&text)
        .with_context(|| format!("Invalid config file: {}", path.display()))?;
    debug!("Loaded configuration from {}: {:?}", path.display(), config);
    Ok(config)
}

fn is_stdio(name: Option<&str>) -> bool {
    matches!(name, None | Some(STDIN_NAME))
}

/// Open the source for reading, stdin for '-' or no name
fn open_input(source: Option<&str>) -> Result<Box<dyn Read>> {
    match source {
        Some(path) if !is_stdio(Some(path)) => {
            let file =
                File::open(path).with_context(|| format!("Failed to open input file: {}", path))?;
            Ok(Box::new(io::BufReader::new(file)))
        }
        _ => Ok(Box::new(io::stdin().lock())),
    }
}

/// Write output to file or stdout
fn write_output(dest: Option<&str>, content: &[u8], format: TileFormat) -> Result<()> {
    match dest {
        Some(path) if !is_stdio(Some(path)) => {
            fs::write(path, content)
                .with_context(|| format!("Failed to write output file: {}", path))?;
        }
        _ => {
            let mut stdout = io::stdout();
            if format == TileFormat::Tile && stdout.is_terminal() {
                debug!("Writing a binary tile to a terminal");
            }
            stdout
                .write_all(content)
                .context("Failed to write to stdout")?;
            stdout.flush().context("Failed to flush stdout")?;
        }
    }
    Ok(())
}

/// Resolve the source format and decode the tile
fn load_tile(
    source: Option<&str>,
    srcformat: Option<TileFormat>,
    config: &CodecConfig,
    quiet: bool,
) -> Result<Tile> {
    // Fails for stdin without --srcformat before anything is read
    let format = resolve_format(srcformat, source).map_err(|e| map_tile_error(e, "Format detection"))?;
    debug!("Source format: {}", format);

    let reader = open_input(source)?;
    let progress = create_progress_bar(quiet, "Decoding tile");
    let decode_start = Instant::now();
    let tile = read_tile(reader, source, Some(format), config)
        .map_err(|e| map_tile_error(e, &format!("Decoding {}", display_name(source))))?;
    progress.finish_and_clear();

    debug!(
        "Decoded {} columns and {} points in {:.3}s",
        tile.column_count(),
        tile.point_count(),
        decode_start.elapsed().as_secs_f64()
    );
    Ok(tile)
}

/// Execute the convert command
fn convert_command(
    source: Option<&str>,
    dest: Option<&str>,
    srcformat: Option<TileFormat>,
    format: TileFormat,
    indent: JsonIndent,
    config: &CodecConfig,
    quiet: bool,
) -> Result<()> {
    let start_time = Instant::now();

    info!(
        "Converting {} -> {}",
        display_name(source),
        dest.filter(|d| !is_stdio(Some(*d))).unwrap_or("<stdout>")
    );

    let tile = load_tile(source, srcformat, config, quiet)?;

    // Render fully before touching the destination so failures leave no partial output
    let progress = create_progress_bar(quiet, "Encoding tile");
    let output = render(&tile, format, indent).map_err(|e| map_tile_error(e, "Encoding"))?;
    progress.finish_and_clear();

    write_output(dest, &output, format)?;

    let total_duration = start_time.elapsed();

    // Display summary; stdout may carry the tile itself
    if !quiet && !is_stdio(dest) {
        eprintln!("✓ Conversion complete");
        eprintln!("  Columns:     {}", tile.column_count());
        eprintln!("  Points:      {}", tile.point_count());
        eprintln!("  Output:      {} ({})", format_bytes(output.len()), format);
        eprintln!("  Time:        {:.3}s", total_duration.as_secs_f64());
    }

    info!("Conversion completed in {:.3}s", total_duration.as_secs_f64());

    Ok(())
}

/// Execute the info command
fn info_command(
    source: Option<&str>,
    srcformat: Option<TileFormat>,
    indent: JsonIndent,
    config: &CodecConfig,
    quiet: bool,
) -> Result<()> {
    let start_time = Instant::now();

    info!("Reading tile info from {}", display_name(source));

    // Fails for stdin without --srcformat before anything is read
    let format = resolve_format(srcformat, source).map_err(|e| map_tile_error(e, "Format detection"))?;
    debug!("Source format: {}", format);

    let reader = open_input(source)?;
    let progress = create_progress_bar(quiet, "Computing statistics");
    let text = vtile::info(reader, source, Some(format), indent, config)
        .map_err(|e| map_tile_error(e, &format!("Reading {}", display_name(source))))?;
    progress.finish_and_clear();

    let mut stdout = io::stdout();
    stdout
        .write_all(text.as_bytes())
        .context("Failed to write to stdout")?;
    stdout.flush().context("Failed to flush stdout")?;

    debug!(
        "Info command completed in {:.3}s",
        start_time.elapsed().as_secs_f64()
    );

    Ok(())
}

/// Create a progress bar (spinner) for operations
fn create_progress_bar(quiet: bool, message: &str) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]));
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

/// Format bytes in human-readable format
fn format_bytes(bytes: usize) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];

    let mut size = bytes as f64;
    let mut unit_index = 0;
    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.2} {}", size, UNITS[unit_index])
    }
}

/// Map TileError to anyhow::Error with context
fn map_tile_error(error: TileError, context: &str) -> anyhow::Error {
    match error {
        TileError::UndeterminableFormat { input } => {
            anyhow::anyhow!(
                "{}: cannot read from {} unless the source format is specified (use --srcformat)",
                context,
                input
            )
        }
        TileError::Truncated { needed, available } => {
            anyhow::anyhow!(
                "{}: tile is truncated: header declares {} bytes, only {} present",
                context,
                needed,
                available
            )
        }
        TileError::InvalidMagic { found, .. } => {
            anyhow::anyhow!(
                "{}: not a binary tile (starts with {:02x?}); use --srcformat json for JSON input",
                context,
                found
            )
        }
        TileError::EmptyColumn { column } => {
            anyhow::anyhow!(
                "{}: column '{}' has no values (set \"empty_column_policy\": \"omit\" in the config file to skip it)",
                context,
                column
            )
        }
        other => anyhow::anyhow!("{}: {}", context, other),
    }
}

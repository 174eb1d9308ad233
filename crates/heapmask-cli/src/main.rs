//! heapmask - Sanitize Java heap dumps
//!
//! This tool copies an HPROF heap dump while replacing the contents of every
//! `byte[]` and `char[]` array with a fixed pattern, so the result can be
//! shared for analysis without leaking strings, keys or payloads.

use anyhow::{ensure, Context, Result};
use clap::Parser;
use heapmask_core::{MaskPattern, SanitizeSummary, Sanitizer, SanitizerConfig};
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn, Level};
use tracing_subscriber::EnvFilter;
use zip::write::SimpleFileOptions;
use zip::CompressionMethod;

/// Sanitize a Java heap dump by replacing byte and char array contents
#[derive(Parser, Debug)]
#[command(name = "heapmask")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input heap dump (.hprof). File path, or `-`, `stdin`, `0` for standard input
    input: PathBuf,

    /// Output heap dump. File path, `-`, `stdout`, `1` for standard output,
    /// or `=`, `stderr`, `2` for standard error
    output: PathBuf,

    /// Input is a tar archive; its first entry is sanitized
    #[arg(short = 'a', long)]
    tar_input: bool,

    /// Write the output as a zip archive holding a single entry
    #[arg(short = 'z', long, conflicts_with = "zstd_output")]
    zip_output: bool,

    /// Compress the output with zstd
    #[arg(long)]
    zstd_output: bool,

    /// zstd compression level
    #[arg(long, default_value = "3")]
    zstd_level: i32,

    /// Sanitization text to replace array contents with (backslash escapes allowed)
    #[arg(short, long, default_value = "\\0")]
    text: String,

    /// Buffer size for reading and writing, also the progress reporting step
    #[arg(short, long, default_value = "100MB", value_parser = parse_data_size)]
    buffer_size: u64,

    /// Copy primitive arrays verbatim (diagnostics only; output is NOT sanitized)
    #[arg(long, env = "HEAPMASK_DISABLE_MASKING")]
    disable_masking: bool,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Where the heap dump is read from
#[derive(Debug, Clone, PartialEq, Eq)]
enum Input {
    Stdin,
    File(PathBuf),
}

/// Final path component, which selects the standard streams
fn stream_name(path: &Path) -> Option<&str> {
    path.file_name().and_then(|name| name.to_str())
}

impl Input {
    fn from_arg(path: &Path) -> Self {
        match stream_name(path) {
            Some("-" | "stdin" | "0") => Input::Stdin,
            _ => Input::File(path.to_path_buf()),
        }
    }
}

/// Where the sanitized dump is written to
#[derive(Debug, Clone, PartialEq, Eq)]
enum Output {
    Stdout,
    Stderr,
    File(PathBuf),
}

impl Output {
    fn from_arg(path: &Path) -> Self {
        match stream_name(path) {
            Some("-" | "stdout" | "1") => Output::Stdout,
            Some("=" | "stderr" | "2") => Output::Stderr,
            _ => Output::File(path.to_path_buf()),
        }
    }
}

/// Logs progress each time the written byte count crosses a step boundary
struct ProgressMonitor {
    step: u64,
    steps: u64,
}

impl ProgressMonitor {
    fn new(step: u64) -> Self {
        Self { step, steps: 0 }
    }

    /// Returns a progress line when `written` has entered a new step
    fn observe(&mut self, written: u64) -> Option<String> {
        let current = if self.step == 0 {
            written
        } else {
            written / self.step
        };
        if current == self.steps {
            return None;
        }
        self.steps = current;
        Some(format!("Processed {}", display_size(written)))
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());
    // Keep logs off whichever standard stream carries the dump
    if Output::from_arg(&cli.output) == Output::Stderr {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(io::stdout)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(io::stderr)
            .init();
    }

    let summary = run(&cli)?;
    info!(
        "Summary: {} records, {} heap sub-records, {} arrays masked ({})",
        summary.records,
        summary.heap_records,
        summary.arrays_masked,
        display_size(summary.bytes_masked)
    );
    Ok(())
}

/// Sanitize the configured input into the configured output.
///
/// An output file is removed on failure only once this run has created it.
fn run(cli: &Cli) -> Result<SanitizeSummary> {
    let input = Input::from_arg(&cli.input);
    let output = Output::from_arg(&cli.output);

    if let (Input::File(input), Output::File(output)) = (&input, &output) {
        ensure!(
            input != output,
            "Input and output files cannot be the same: {}",
            input.display()
        );
    }

    let pattern = MaskPattern::from_escaped(&cli.text).context("Invalid sanitization text")?;
    let config = SanitizerConfig::new()
        .pattern(pattern)
        .masking(!cli.disable_masking);
    if cli.disable_masking {
        warn!("Masking is disabled: array contents are copied verbatim");
    }

    info!("Starting heap dump sanitization");
    info!("Input: {}", cli.input.display());
    info!("Output: {}", cli.output.display());
    let started = Instant::now();

    let buffer_size = usize::try_from(cli.buffer_size).context("Buffer size too large")?;
    let reader = open_input(&input, buffer_size)?;
    let writer = open_output(&output, buffer_size)?;

    let sanitizer = Sanitizer::with_config(config);
    let result = write_output(cli, &sanitizer, reader, writer);
    if result.is_err() {
        if let Output::File(path) = &output {
            discard_partial_output(path);
        }
    }
    let summary = result?;

    info!("Finished in {}", friendly_duration(started.elapsed()));
    Ok(summary)
}

/// Sanitize into `writer`, wrapped in the requested container
fn write_output(
    cli: &Cli,
    sanitizer: &Sanitizer,
    reader: Box<dyn Read>,
    writer: Box<dyn Write>,
) -> Result<SanitizeSummary> {
    let mut monitor = ProgressMonitor::new(cli.buffer_size);
    let progress = move |written| {
        if let Some(line) = monitor.observe(written) {
            info!("{}", line);
        }
    };

    if cli.zip_output {
        let entry = zip_entry_name(&cli.output);
        debug!("Writing zip entry: {}", entry);
        let mut archive = zip::ZipWriter::new_stream(writer);
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .large_file(true);
        archive
            .start_file(entry, options)
            .context("Failed to start zip entry")?;
        let summary = sanitize(sanitizer, cli.tar_input, reader, &mut archive, progress)?;
        let mut writer = archive.finish().context("Failed to finish zip archive")?;
        writer.flush().context("Failed to flush output")?;
        Ok(summary)
    } else if cli.zstd_output {
        let mut encoder =
            zstd::Encoder::new(writer, cli.zstd_level).context("Failed to start zstd stream")?;
        let summary = sanitize(sanitizer, cli.tar_input, reader, &mut encoder, progress)?;
        let mut writer = encoder.finish().context("Failed to finish zstd stream")?;
        writer.flush().context("Failed to flush output")?;
        Ok(summary)
    } else {
        let mut writer = writer;
        let summary = sanitize(sanitizer, cli.tar_input, reader, &mut writer, progress)?;
        writer.flush().context("Failed to flush output")?;
        Ok(summary)
    }
}

/// Zip entry name: the output file name without a trailing `.zip`
fn zip_entry_name(output: &Path) -> String {
    let name = output
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    match name.strip_suffix(".zip") {
        Some(stem) => stem.to_string(),
        None => name,
    }
}

/// Run the sanitizer over the raw input or the first entry of a tar archive
fn sanitize<W: Write>(
    sanitizer: &Sanitizer,
    tar_input: bool,
    reader: Box<dyn Read>,
    writer: W,
    progress: impl FnMut(u64) + 'static,
) -> Result<SanitizeSummary> {
    if !tar_input {
        return sanitizer
            .sanitize_with_progress(reader, writer, progress)
            .context("Failed to sanitize heap dump");
    }

    let mut archive = tar::Archive::new(reader);
    let mut entries = archive.entries().context("Failed to read tar archive")?;
    let entry = entries
        .next()
        .context("No tar entries found in input")?
        .context("Failed to read tar entry")?;
    if let Ok(path) = entry.path() {
        debug!("Sanitizing tar entry: {}", path.display());
    }

    sanitizer
        .sanitize_with_progress(entry, writer, progress)
        .context("Failed to sanitize heap dump")
}

fn open_input(input: &Input, buffer_size: usize) -> Result<Box<dyn Read>> {
    let inner: Box<dyn Read> = match input {
        Input::Stdin => Box::new(io::stdin().lock()),
        Input::File(path) => Box::new(
            File::open(path)
                .with_context(|| format!("Failed to open input file: {}", path.display()))?,
        ),
    };
    if buffer_size == 0 {
        return Ok(inner);
    }
    Ok(Box::new(BufReader::with_capacity(buffer_size, inner)))
}

fn open_output(output: &Output, buffer_size: usize) -> Result<Box<dyn Write>> {
    let inner: Box<dyn Write> = match output {
        Output::Stdout => Box::new(io::stdout().lock()),
        Output::Stderr => Box::new(io::stderr().lock()),
        Output::File(path) => Box::new(
            File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path.display()))?,
        ),
    };
    if buffer_size == 0 {
        return Ok(inner);
    }
    Ok(Box::new(BufWriter::with_capacity(buffer_size, inner)))
}

/// Remove a truncated output file left behind by a failed run
fn discard_partial_output(path: &Path) {
    if !path.is_file() {
        return;
    }
    match fs::remove_file(path) {
        Ok(()) => warn!("Removed partial output: {}", path.display()),
        Err(e) => warn!("Failed to remove partial output {}: {}", path.display(), e),
    }
}

/// Parse a size such as `512`, `64KB` or `100MB` (binary multiples)
fn parse_data_size(s: &str) -> std::result::Result<u64, String> {
    let s = s.trim();
    let split = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    let (digits, unit) = s.split_at(split);
    if digits.is_empty() {
        return Err(format!("invalid size '{}': expected a number", s));
    }
    let value: u64 = digits
        .parse()
        .map_err(|e| format!("invalid size '{}': {}", s, e))?;

    let multiplier: u64 = match unit.trim().to_ascii_uppercase().as_str() {
        "" | "B" => 1,
        "KB" => 1 << 10,
        "MB" => 1 << 20,
        "GB" => 1 << 30,
        "TB" => 1 << 40,
        other => return Err(format!("invalid size unit '{}': use B, KB, MB, GB or TB", other)),
    };

    value
        .checked_mul(multiplier)
        .ok_or_else(|| format!("size '{}' is too large", s))
}

/// Human-readable byte count, rounded down to a whole unit
fn display_size(bytes: u64) -> String {
    const UNITS: [(u64, &str); 4] = [
        (1 << 40, "TB"),
        (1 << 30, "GB"),
        (1 << 20, "MB"),
        (1 << 10, "KB"),
    ];
    for (size, unit) in UNITS {
        if bytes / size > 0 {
            return format!("{} {}", bytes / size, unit);
        }
    }
    format!("{} bytes", bytes)
}

/// Format a duration as `1h 2m 3.5s`
fn friendly_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    let millis = duration.subsec_millis();

    let mut parts = Vec::new();
    if hours > 0 {
        parts.push(format!("{}h", hours));
    }
    if minutes > 0 {
        parts.push(format!("{}m", minutes));
    }
    if millis > 0 {
        let fraction = format!("{:03}", millis);
        parts.push(format!("{}.{}s", seconds, fraction.trim_end_matches('0')));
    } else if seconds > 0 || parts.is_empty() {
        parts.push(format!("{}s", seconds));
    }
    parts.join(" ")
}

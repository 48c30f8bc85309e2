// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Headless edit pipeline driven by command-line arguments.
//
// Usage examples:
//   retouch -i photo.jpg --op auto_enhance --op '{"op":"rotate","degrees":90}' -o out.png
//   retouch -i photo.png --op sharpen --op blur --undo 1 -o out.webp
//   retouch -i photo.png --ascii 100 --ascii-color ansi
//   retouch -i small.png --upscale 2 --format jpeg --quality 85
//
// Load -> apply ops in order -> optional remote upscale -> optional undo ->
// export (image or ASCII text). Exit code 0 on success, 1 on any failure.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use retouch_core::error::{Result, RetouchError};
use retouch_core::human_errors::humanize_error;
use retouch_core::{EngineConfig, RasterFormat};
use retouch_editor::gateway::StubProvider;
use retouch_editor::session::check_upload_size;
use retouch_editor::{EditSession, EnhancementGateway, RemoteOperation};
use retouch_raster::{AsciiOptions, ColorMode, EditOp, codec};
use tracing::{info, warn};

// ============================================================================
// CLI argument definition (clap Derive)
// ============================================================================

/// Retouch headless raster editor.
#[derive(Parser, Debug)]
#[command(
    name = "retouch",
    version,
    about = "Apply filters and transforms to an image and export the result",
    long_about = "Load an image, apply a chain of edit operations through the undo/redo\n\
                  history, and export the result as an image or ASCII art.\n\n\
                  Operations are JSON objects tagged by \"op\" or bare tool ids:\n  \
                  rotate flip resize crop adjust sharpen blur edge_detect denoise\n  \
                  auto_enhance remove_background sketch watercolor oil_paint cartoon"
)]
pub struct CliArgs {
    /// Source image. The format is taken from the extension, or sniffed.
    #[arg(short, long, value_name = "FILE")]
    pub input: PathBuf,

    /// Edit operation, applied in the order given. Repeatable.
    #[arg(long = "op", value_name = "OP")]
    pub ops: Vec<String>,

    /// Output path. Defaults to `<input stem>.retouched.<ext>` beside the input.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format: jpeg, png, gif, webp, bmp, tiff. Inferred from --output
    /// when omitted, then from the config default.
    #[arg(short, long, value_name = "FORMAT")]
    pub format: Option<String>,

    /// JPEG quality (1-100). Defaults to the config value.
    #[arg(short, long, value_name = "1-100")]
    pub quality: Option<u8>,

    /// Write ASCII art instead of an image, optionally with a column count.
    #[arg(long, value_name = "COLS", num_args = 0..=1)]
    pub ascii: Option<Option<u32>>,

    /// Colour mode for --ascii: plain, ansi, html.
    #[arg(long, default_value = "plain", value_parser = parse_color_mode)]
    pub ascii_color: ColorMode,

    /// Enlarge by an integer factor via the remote gateway, falling back to a
    /// local resize.
    #[arg(long, value_name = "FACTOR")]
    pub upscale: Option<u32>,

    /// Undo this many edits before exporting.
    #[arg(long, value_name = "N", default_value_t = 0)]
    pub undo: usize,

    /// Engine configuration file (JSON).
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Print the edit history to stderr before exporting.
    #[arg(long)]
    pub history: bool,
}

// ============================================================================
// Public entry point
// ============================================================================

/// Run the pipeline and turn the outcome into an exit code, printing a
/// humanized message on failure.
pub async fn run(args: CliArgs) -> ExitCode {
    match execute(&args).await {
        Ok(path) => {
            println!("{}", path.display());
            ExitCode::SUCCESS
        }
        Err(err) => {
            let human = humanize_error(&err);
            eprintln!("error: {}", human.message);
            eprintln!("  {}", human.suggestion);
            tracing::debug!(error = %err, "Pipeline failed");
            ExitCode::FAILURE
        }
    }
}

/// Run the whole pipeline, returning the path written.
pub async fn execute(args: &CliArgs) -> Result<PathBuf> {
    let config = match &args.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };

    let ops = args
        .ops
        .iter()
        .map(|op| parse_op(op, &config))
        .collect::<Result<Vec<_>>>()?;

    let bytes = tokio::fs::read(&args.input).await?;
    let mut session = open_session(bytes, &args.input, config.clone())
        .await?
        .with_gateway(EnhancementGateway::new().with_provider(StubProvider));

    session.apply_all(ops).await?;

    if let Some(factor) = args.upscale {
        session
            .enhance_remote(RemoteOperation::Upscale { factor })
            .await?;
    }

    for step in 0..args.undo {
        if !session.undo() {
            warn!(requested = args.undo, undone = step, "Nothing left to undo");
            break;
        }
    }

    if args.history {
        print_history(&session);
    }

    let output = match args.ascii {
        Some(columns) => {
            let options = AsciiOptions {
                columns: columns.unwrap_or(config.ascii_columns),
                color: args.ascii_color,
            };
            let text = session.ascii(options).await?;
            let path = output_path(&args.input, args.output.as_deref(), "txt");
            tokio::fs::write(&path, text).await?;
            path
        }
        None => {
            let format = resolve_format(args.format.as_deref(), args.output.as_deref(), &config)?;
            let quality = args.quality.unwrap_or(config.default_quality);
            let encoded = session.export(format, quality).await?;
            let path = output_path(&args.input, args.output.as_deref(), format.extension());
            tokio::fs::write(&path, encoded).await?;
            path
        }
    };

    info!(path = %output.display(), "Output written");
    Ok(output)
}

// ============================================================================
// Helpers
// ============================================================================

/// Parse one `--op` value: a JSON object, or a bare tool id whose tunable
/// defaults come from the config.
pub fn parse_op(raw: &str, config: &EngineConfig) -> Result<EditOp> {
    let raw = raw.trim();
    if raw.starts_with('{') {
        raw.parse()
    } else {
        EditOp::from_tool_id(raw, config)
    }
}

fn parse_color_mode(raw: &str) -> std::result::Result<ColorMode, String> {
    match raw.to_ascii_lowercase().as_str() {
        "plain" => Ok(ColorMode::Plain),
        "ansi" => Ok(ColorMode::Ansi),
        "html" => Ok(ColorMode::Html),
        other => Err(format!("unknown colour mode {other:?} (expected plain, ansi or html)")),
    }
}

/// Explicit `--format`, then the output's extension, then the config default.
pub fn resolve_format(
    explicit: Option<&str>,
    output: Option<&Path>,
    config: &EngineConfig,
) -> Result<RasterFormat> {
    if let Some(name) = explicit {
        return RasterFormat::from_extension(name)
            .ok_or_else(|| RetouchError::Settings(format!("unknown output format {name:?}")));
    }
    let inferred = output
        .and_then(Path::extension)
        .and_then(|ext| ext.to_str())
        .and_then(RasterFormat::from_extension);
    Ok(inferred.unwrap_or(config.default_export_format))
}

/// `output` if given, else `<stem>.retouched.<extension>` beside `input`.
pub fn output_path(input: &Path, output: Option<&Path>, extension: &str) -> PathBuf {
    if let Some(path) = output {
        return path.to_path_buf();
    }
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("image");
    input.with_file_name(format!("{stem}.retouched.{extension}"))
}

/// Open a session, taking the MIME type from the file extension or sniffing
/// the bytes when the extension is unknown.
async fn open_session(bytes: Vec<u8>, input: &Path, config: EngineConfig) -> Result<EditSession> {
    let declared = input
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(RasterFormat::from_extension);
    match declared {
        Some(format) => EditSession::open(bytes, format.mime_type(), config).await,
        None => {
            check_upload_size(bytes.len(), &config)?;
            let raster = tokio::task::spawn_blocking(move || codec::decode_guessed(&bytes))
                .await
                .map_err(|err| RetouchError::Task(err.to_string()))??;
            Ok(EditSession::new(raster).with_config(config))
        }
    }
}

fn print_history(session: &EditSession) {
    let history = session.history();
    for (index, entry) in history.entries().iter().enumerate() {
        let marker = if index == history.current_index() { '>' } else { ' ' };
        eprintln!(
            "{marker} {index:>3}  {:<18} {}",
            entry.tool_name,
            entry.timestamp.format("%H:%M:%S")
        );
    }
}

use anyhow::Result;
use clap::Parser;
use std::path::{Path, PathBuf};

use emblem::config::{self, BrightnessBias, Layout, WatermarkMode};
use emblem::export::{self, Codec};
use emblem::exif::{self, PhotoMetadata};
use emblem::render::{Typeface, reveal};
use emblem::session::RenderSession;
use emblem::{layout, pipeline};

#[derive(Parser, Debug)]
#[command(
    name = "emblem",
    version,
    about = "Stamp photos with their own EXIF data, visibly or hidden in the pixels"
)]
struct Cli {
    /// Image files or directories to process
    #[arg(value_name = "PATH")]
    paths: Vec<PathBuf>,

    /// Path to config file (default: config.json next to binary)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Initialize a default config.json and exit
    #[arg(long)]
    init: bool,

    /// Watermark style
    #[arg(long, value_enum)]
    mode: Option<WatermarkMode>,

    /// Line arrangement
    #[arg(long, value_enum)]
    layout: Option<Layout>,

    /// Ink colour for the visible watermark
    #[arg(long, value_enum)]
    brightness: Option<BrightnessBias>,

    /// Free-text location shown next to the copyright
    #[arg(long)]
    location: Option<String>,

    /// Copyright holder, overriding the Copyright tag
    #[arg(long)]
    copyright: Option<String>,

    /// Output format
    #[arg(long, value_enum)]
    codec: Option<Codec>,

    /// Base output directory (default: the pictures folder)
    #[arg(short, long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Seed for the concealed watermark noise
    #[arg(long)]
    seed: Option<u64>,

    /// Display watermark metadata and the planned caption, then exit
    #[arg(long = "show-metadata")]
    show_metadata: bool,

    /// Write contrast-stretched copies that expose a concealed watermark
    #[arg(long)]
    reveal: bool,

    /// Amplification used by --reveal
    #[arg(long, default_value_t = reveal::DEFAULT_GAIN)]
    gain: f32,

    /// Output results as JSON
    #[arg(long)]
    json: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    /// Fold command-line overrides into the loaded config.
    fn apply(&self, config: &mut config::Config) {
        if let Some(mode) = self.mode {
            config.watermark.mode = mode;
        }
        if let Some(layout) = self.layout {
            config.watermark.layout = layout;
        }
        if let Some(brightness) = self.brightness {
            config.watermark.brightness = brightness;
        }
        if let Some(ref location) = self.location {
            config.watermark.location = location.clone();
        }
        if let Some(ref copyright) = self.copyright {
            config.watermark.copyright_override = copyright.clone();
        }
        if let Some(codec) = self.codec {
            config.output.codec = codec;
        }
        if let Some(ref dir) = self.output_dir {
            config.output.directory = Some(dir.clone());
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Handle --init
    if cli.init {
        let config = config::Config::default();
        let path = cli.config.as_deref();
        config.save(path)?;
        let save_path = match path {
            Some(p) => p.to_path_buf(),
            None => config::Config::config_path()?,
        };
        println!("Default config written to {}", save_path.display());
        return Ok(());
    }

    if cli.paths.is_empty() {
        anyhow::bail!("No input files or directories specified. Use --help for usage.");
    }

    let mut config = config::Config::load(cli.config.as_deref())?;
    cli.apply(&mut config);
    config.validate()?;

    let images = pipeline::collect_images(&cli.paths);
    if images.is_empty() {
        anyhow::bail!("No supported image files found in the specified paths.");
    }

    // Handle --show-metadata
    if cli.show_metadata {
        for image_path in &images {
            print_metadata(image_path, &config);
        }
        return Ok(());
    }

    // Handle --reveal
    if cli.reveal {
        let mut output = config.output.clone();
        output.preserve_metadata = false;
        for image_path in &images {
            match pipeline::load_photo(image_path) {
                Ok(photo) => {
                    let revealed = reveal::reveal(&photo.image, cli.gain);
                    if let Some(out) = export::export_or_log(&revealed, None, &output) {
                        log::info!("Revealed {} -> {}", image_path.display(), out.display());
                    }
                }
                Err(e) => log::error!("{}: {e}", image_path.display()),
            }
        }
        return Ok(());
    }

    let typeface = Typeface::from_config(&config.font)?;
    let mut session = RenderSession::new(typeface);

    log::info!("Found {} image(s) to process", images.len());
    log::info!(
        "Mode: {:?}, layout: {:?}, codec: {:?}",
        config.watermark.mode,
        config.watermark.layout,
        config.output.codec
    );

    // Process each image
    let mut results = Vec::new();
    let total = images.len();

    for (i, image_path) in images.iter().enumerate() {
        log::info!(
            "[{}/{}] Processing: {}",
            i + 1,
            total,
            image_path.display()
        );

        let result = pipeline::process_image(image_path, &config, &mut session).await;

        if let Some(ref err) = result.error {
            log::error!("  Error: {err}");
        } else {
            if result.lines.is_empty() {
                log::info!("  No metadata to stamp; saved an unmarked copy");
            }
            for line in &result.lines {
                log::info!("  │ {line}");
            }
            if let Some(ref out) = result.output_path {
                log::info!("  Saved: {}", out.display());
            }
        }

        results.push(result);
    }

    // JSON output
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    }

    // Summary
    let success = results.iter().filter(|r| r.error.is_none()).count();
    let failed = results.len() - success;
    log::info!("Done: {success} succeeded, {failed} failed out of {total} images");

    Ok(())
}

// ANSI color codes
const GREEN: &str = "\x1b[32m";
const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";

/// Max width for the value column before wrapping.
const VAL_WIDTH: usize = 46;
/// Indent for continuation lines (tag column width + " : " = 25 chars + 2 leading spaces).
const INDENT: &str = "                           ";

/// Print the tags a file carries, the normalized fields, and the caption
/// the current settings would produce.
fn print_metadata(path: &Path, config: &config::Config) {
    let tags = exif::read_tags(path);
    let metadata = PhotoMetadata::from_tags(&tags);
    let lines = layout::plan(&metadata, &config.watermark);

    println!();
    println!("{BOLD}File:{RESET} {}", path.display());
    println!("{DIM}{}{RESET}", "═".repeat(72));

    println!("  {BOLD}EXIF Tags{RESET}");
    println!("  {DIM}{}{RESET}", "─".repeat(70));
    if tags.is_empty() {
        println!("  {DIM}(no EXIF metadata found){RESET}");
    }
    for (tag, value) in tags.iter() {
        print_row(tag.name(), value);
    }
    println!();

    println!("  {BOLD}Watermark Fields{RESET}");
    println!("  {DIM}{}{RESET}", "─".repeat(70));
    let captured = metadata
        .captured_at
        .map(|ts| ts.format("%Y-%m-%d %H:%M:%S").to_string());
    let author = metadata.author(&config.watermark.copyright_override);
    let fields: Vec<(&str, Option<&str>)> = vec![
        ("Manufacturer", metadata.manufacturer.as_deref()),
        ("Model", metadata.model.as_deref()),
        ("Lens", metadata.lens_model.as_deref()),
        ("Aperture", metadata.f_number.as_deref()),
        ("Shutter", metadata.shutter_speed.as_deref()),
        ("FocalLength", metadata.focal_length.as_deref()),
        ("ISO", metadata.iso.as_deref()),
        ("Captured", captured.as_deref()),
        ("Author", Some(author.as_str()).filter(|a| !a.is_empty())),
    ];
    for (name, value) in fields {
        if let Some(v) = value {
            print_row(name, v);
        }
    }
    println!();

    println!("  {BOLD}Caption ({:?}){RESET}", config.watermark.layout);
    println!("  {DIM}{}{RESET}", "─".repeat(70));
    if lines.is_empty() {
        println!("  {DIM}(nothing to stamp){RESET}");
    }
    for line in lines.iter() {
        println!("  {GREEN}{line}{RESET}");
    }
    println!();
}

/// Print a single row in the metadata table.
fn print_row(tag: &str, val: &str) {
    let tag_col = format!("{:<22}", tag);
    let lines = wrap_text(val, VAL_WIDTH);
    for (i, line) in lines.iter().enumerate() {
        if i == 0 {
            println!("  {tag_col} : {line}");
        } else {
            println!("  {INDENT}{line}");
        }
    }
}

/// Wrap text at word boundaries to fit within max_width.
fn wrap_text(s: &str, max_width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current_line = String::new();

    for word in s.split_whitespace() {
        if current_line.is_empty() {
            current_line = word.to_string();
        } else if current_line.len() + 1 + word.len() <= max_width {
            current_line.push(' ');
            current_line.push_str(word);
        } else {
            lines.push(current_line);
            current_line = word.to_string();
        }
    }

    if !current_line.is_empty() {
        lines.push(current_line);
    }

    if lines.is_empty() {
        lines.push(s.to_string());
    }

    lines
}

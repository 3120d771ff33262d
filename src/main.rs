use std::path::{Path, PathBuf};
use std::time::Instant;

use archsketch::config::Config;
use archsketch::diagram::DiagramStore;
use archsketch::export::EXPORT_FILE_NAME;
use archsketch::notify::{LogNotifier, RecordingNotifier, Severity};
use archsketch::persist::{FileStorage, MemoryStorage};
use archsketch::workspace::{CanvasEvent, Workspace};
use chrono::Utc;
use clap::{Parser, Subcommand};
use resvg::usvg;
use tiny_skia::{Pixmap, Transform};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Architecture diagram sketching engine
#[derive(Parser, Debug)]
#[command(name = "archsketch")]
#[command(version)]
#[command(about = "Render, inspect, export and edit architecture diagram snapshots", long_about = None)]
struct Args {
    /// Config file (TOML or YAML)
    #[arg(short, long, value_name = "CONFIG", global = true)]
    config: Option<PathBuf>,

    /// More log output (-v info, -vv debug). RUST_LOG overrides this.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a snapshot to SVG, PNG or PDF
    Render {
        #[arg(value_name = "SNAPSHOT")]
        snapshot: PathBuf,

        /// Output file path (extension determines format: .svg, .png or .pdf)
        #[arg(short, long, value_name = "OUTPUT")]
        output: PathBuf,

        /// Fit the whole diagram into the canvas instead of using the saved viewport
        #[arg(long)]
        fit: bool,

        /// Raster scale multiplier for PNG output
        #[arg(long, default_value_t = 1.0)]
        png_scale: f32,
    },
    /// Write the export document (diagram plus cost metrics)
    Export {
        #[arg(value_name = "SNAPSHOT")]
        snapshot: PathBuf,

        /// Output file or directory; stdout when omitted
        #[arg(short, long, value_name = "OUTPUT")]
        output: Option<PathBuf>,
    },
    /// Summarise a snapshot and report anything that fails to load
    Inspect {
        #[arg(value_name = "SNAPSHOT")]
        snapshot: PathBuf,
    },
    /// Apply a JSON array of canvas events and save the result
    Apply {
        #[arg(value_name = "EVENTS")]
        events: PathBuf,

        /// Snapshot to edit, created when missing. Defaults to the configured storage path
        #[arg(short, long, value_name = "SNAPSHOT")]
        snapshot: Option<PathBuf>,
    },
}

fn main() -> Result<(), String> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let config = match &args.config {
        Some(path) => Config::load(path).map_err(|e| e.to_string())?,
        None => Config::default(),
    };

    match args.command {
        Command::Render {
            snapshot,
            output,
            fit,
            png_scale,
        } => render(&config, &snapshot, &output, fit, png_scale),
        Command::Export { snapshot, output } => export(&config, &snapshot, output.as_deref()),
        Command::Inspect { snapshot } => inspect(&snapshot),
        Command::Apply { events, snapshot } => {
            let snapshot = snapshot.unwrap_or_else(|| config.storage_path());
            apply(&config, &snapshot, &events)
        }
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_snapshot(path: &Path) -> Result<String, String> {
    std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read snapshot {}: {}", path.display(), e))
}

/// Opens a read-only session over the snapshot text.
fn open_readonly(
    config: &Config,
    snapshot: &Path,
) -> Result<Workspace<MemoryStorage, LogNotifier>, String> {
    let text = read_snapshot(snapshot)?;
    Workspace::open(
        config,
        MemoryStorage::with_content(text),
        LogNotifier,
        Instant::now(),
    )
    .map_err(|e| e.to_string())
}

fn render(
    config: &Config,
    snapshot: &Path,
    output: &Path,
    fit: bool,
    png_scale: f32,
) -> Result<(), String> {
    let mut workspace = open_readonly(config, snapshot)?;
    if fit {
        workspace.fit_to_bounds();
    }
    let svg = workspace.svg();

    let output_ext = output
        .extension()
        .and_then(|e| e.to_str())
        .ok_or("Output file has no extension")?
        .to_ascii_lowercase();

    let bytes = match output_ext.as_str() {
        "svg" => svg.into_bytes(),
        "png" => svg_to_png(&svg, png_scale)?,
        "pdf" => svg_to_pdf(&svg)?,
        _ => {
            return Err(format!(
                "Unsupported output format: .{} (use .svg, .png or .pdf)",
                output_ext
            ));
        }
    };
    std::fs::write(output, bytes)
        .map_err(|e| format!("Failed to write {}: {}", output.display(), e))?;
    eprintln!(
        "{} saved to: {}",
        output_ext.to_ascii_uppercase(),
        output.display()
    );
    Ok(())
}

fn export(config: &Config, snapshot: &Path, output: Option<&Path>) -> Result<(), String> {
    let mut workspace = open_readonly(config, snapshot)?;
    let document = workspace
        .export(Utc::now())
        .ok_or("No components to export")?;
    let json = document.to_json_pretty().map_err(|e| e.to_string())?;

    match output {
        Some(path) => {
            let path = if path.is_dir() {
                path.join(EXPORT_FILE_NAME)
            } else {
                path.to_path_buf()
            };
            std::fs::write(&path, json)
                .map_err(|e| format!("Failed to write {}: {}", path.display(), e))?;
            eprintln!("Export saved to: {}", path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}

fn inspect(snapshot: &Path) -> Result<(), String> {
    let text = read_snapshot(snapshot)?;
    let (store, issues) = DiagramStore::from_json(&text);

    println!("components:   {}", store.component_count());
    for component in store.components() {
        println!(
            "  {:<10} {:<11} {:<24} ${}/mo at ({:.0}, {:.0})",
            component.id,
            component.kind,
            component.display_name,
            component.monthly_cost,
            component.position.x,
            component.position.y
        );
    }
    println!("connections:  {}", store.connection_count());
    for connection in store.connections() {
        println!(
            "  {:<10} {}.{} -> {}.{}",
            connection.id,
            connection.from_component_id,
            connection.from_side,
            connection.to_component_id,
            connection.to_side
        );
    }
    println!("monthly cost: ${}", store.total_monthly_cost());
    println!(
        "viewport:     zoom {:.2}, pan ({:.1}, {:.1})",
        store.viewport().zoom(),
        store.viewport().pan().x,
        store.viewport().pan().y
    );

    if !issues.is_empty() {
        println!("issues:       {}", issues.len());
        for issue in &issues {
            println!("  {}", issue);
        }
    }
    Ok(())
}

fn apply(config: &Config, snapshot: &Path, events: &Path) -> Result<(), String> {
    let events_text = std::fs::read_to_string(events)
        .map_err(|e| format!("Failed to read events {}: {}", events.display(), e))?;
    let events: Vec<CanvasEvent> = serde_json::from_str(&events_text)
        .map_err(|e| format!("Failed to parse events: {}", e))?;

    let mut workspace = Workspace::open(
        config,
        FileStorage::new(snapshot),
        RecordingNotifier::default(),
        Instant::now(),
    )
    .map_err(|e| e.to_string())?;

    let total = events.len();
    let mut failed = 0;
    for (index, event) in events.into_iter().enumerate() {
        if let Err(e) = workspace.handle(event) {
            warn!(index, "event rejected: {}", e);
            failed += 1;
        }
    }
    workspace.flush();

    for (message, severity) in &workspace.notifier().messages {
        if matches!(severity, Severity::Warning | Severity::Error) {
            eprintln!("{:?}: {}", severity, message);
        }
    }
    info!(total, failed, "events applied");
    eprintln!(
        "Applied {} of {} events to {}",
        total - failed,
        total,
        snapshot.display()
    );
    Ok(())
}

fn svg_to_png(svg: &str, scale: f32) -> Result<Vec<u8>, String> {
    if !scale.is_finite() || scale <= 0.0 {
        return Err(format!("Invalid --png-scale value: {}", scale));
    }

    let mut opts = usvg::Options::default();
    {
        let fontdb = opts.fontdb_mut();
        fontdb.load_system_fonts();
        let fallbacks = FontFallbacks::scan(fontdb.faces().flat_map(|f| &f.families));
        if let Some(family) = fallbacks.sans() {
            fontdb.set_sans_serif_family(family);
        }
    }

    let tree =
        usvg::Tree::from_str(svg, &opts).map_err(|e| format!("Failed to parse SVG: {}", e))?;

    let width = (tree.size().width() * scale).ceil() as u32;
    let height = (tree.size().height() * scale).ceil() as u32;
    let mut pixmap = Pixmap::new(width, height).ok_or("Failed to create pixmap")?;

    resvg::render(&tree, Transform::from_scale(scale, scale), &mut pixmap.as_mut());

    pixmap
        .encode_png()
        .map_err(|e| format!("Failed to encode PNG: {}", e))
}

fn svg_to_pdf(svg: &str) -> Result<Vec<u8>, String> {
    use svg2pdf::usvg::fontdb;

    let mut db = fontdb::Database::new();
    db.load_system_fonts();
    let fallbacks = FontFallbacks::scan(db.faces().flat_map(|f| &f.families));
    if let Some(family) = fallbacks.sans() {
        db.set_sans_serif_family(family);
    }

    let mut opts = svg2pdf::usvg::Options::default();
    opts.fontdb = std::sync::Arc::new(db);

    let tree = svg2pdf::usvg::Tree::from_str(svg, &opts)
        .map_err(|e| format!("Failed to parse SVG: {}", e))?;

    // Text as paths; viewers without the font still show the labels.
    let mut options = svg2pdf::ConversionOptions::default();
    options.embed_text = false;

    svg2pdf::to_pdf(&tree, options, svg2pdf::PageOptions::default())
        .map_err(|e| format!("Failed to convert SVG to PDF: {}", e))
}

/// Sans-serif family to use when the theme's `sans-serif` is not mapped by
/// the system font database.
#[derive(Debug, Default)]
struct FontFallbacks {
    sans: Option<String>,
    first: Option<String>,
}

impl FontFallbacks {
    fn scan<'a, L: 'a>(families: impl Iterator<Item = &'a (String, L)>) -> Self {
        let mut found = Self::default();
        for (family, _) in families {
            if found.first.is_none() {
                found.first = Some(family.clone());
            }
            if found.sans.is_none() && family.to_ascii_lowercase().contains("sans") {
                found.sans = Some(family.clone());
            }
        }
        found
    }

    fn sans(&self) -> Option<&str> {
        self.sans.as_deref().or(self.first.as_deref())
    }
}

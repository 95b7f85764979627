//! Clipboard Client
//!
//! Command-line host for the clipboard bridge: inspect, set and watch the
//! system clipboard.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use clipboard_bridge::{
    Bitmap, BridgeConfig, ClipboardBackend, ClipboardBridge, ClipboardBridgeBuilder, ClipboardData,
    ClipboardDataType, ClipboardManager, ClipboardSource, ImageEncoding, Payload, SyntheticEventSource,
};

mod config;
mod window;

#[derive(Debug, Parser)]
#[command(name = "clipboard-client", version, about = "Inspect and drive the system clipboard")]
struct Cli {
    /// Print results as JSON.
    #[arg(long, global = true)]
    json: bool,

    /// Configuration file to use instead of the per-user one.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Show the current clipboard content.
    Get {
        /// Also write the payload to a file; images are saved as PNG.
        #[arg(long, value_name = "PATH")]
        save: Option<PathBuf>,
    },
    /// Show the kind of the current clipboard content.
    Type,
    /// Report whether the clipboard holds anything.
    Empty,
    /// Remove everything from the clipboard.
    Clear,
    /// Put text on the clipboard.
    SetText { text: String },
    /// Put a list of files on the clipboard.
    SetFiles {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Put a PNG image on the clipboard.
    SetImage { png: PathBuf },
    /// Print every clipboard change until interrupted.
    Watch,
    /// Show the effective configuration.
    Config {
        /// Write the defaults to the configuration file.
        #[arg(long)]
        init: bool,
    },
}

/// What gets printed for one clipboard payload.
#[derive(Debug, Serialize)]
struct Summary<'a> {
    data_type: ClipboardDataType,
    formats: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<&'a ClipboardSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    paths: Option<&'a [String]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<ImageSize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    bytes: Option<usize>,
}

#[derive(Debug, Serialize)]
struct ImageSize {
    width: u32,
    height: u32,
}

impl<'a> Summary<'a> {
    fn of(data: &'a ClipboardData) -> Self {
        let mut summary = Summary {
            data_type: data.data_type(),
            formats: data.formats(),
            source: data.source(),
            text: None,
            paths: None,
            image: None,
            bytes: None,
        };
        match data.payload() {
            Payload::Text(text) => summary.text = Some(text.as_str()),
            Payload::PathList(paths) => summary.paths = Some(paths.as_slice()),
            Payload::Image(bitmap) => {
                summary.image = Some(ImageSize { width: bitmap.width(), height: bitmap.height() })
            }
            Payload::Bytes(bytes) => summary.bytes = Some(bytes.len()),
        }
        summary
    }
}

type AppResult<T> = Result<T, Box<dyn std::error::Error>>;

fn main() -> AppResult<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let loaded = config::load(cli.config.as_deref());
    if let Some(warning) = &loaded.warning {
        warn!("{}", warning);
    }
    let config = loaded.config;
    debug!(?config, "configuration loaded");

    match cli.command {
        Command::Config { init } => show_config(&config, cli.config.as_deref(), init, cli.json),
        Command::Watch => watch(&config, cli.json),
        command => {
            let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
            // One-shot commands never wait for updates.
            let bridge = bridge_builder(&config).event_source(SyntheticEventSource::new()).build()?;
            let result = runtime.block_on(run_once(&bridge, command, cli.json));
            bridge.dispose();
            result
        }
    }
}

fn system_backend() -> Arc<dyn ClipboardBackend> {
    #[cfg(any(target_os = "linux", target_os = "windows"))]
    {
        Arc::new(clipboard_bridge::SystemClipboard::new())
    }
    #[cfg(not(any(target_os = "linux", target_os = "windows")))]
    {
        warn!("No system clipboard backend for this platform, using a process-local clipboard");
        Arc::new(clipboard_bridge::MemoryClipboard::new())
    }
}

fn bridge_builder(config: &BridgeConfig) -> ClipboardBridgeBuilder {
    ClipboardBridge::builder(system_backend()).config(config)
}

async fn run_once(bridge: &ClipboardBridge, command: Command, json: bool) -> AppResult<()> {
    match command {
        Command::Get { save } => {
            let data = bridge.get_clipboard_data_async().await?;
            match &data {
                Some(data) => print_data(data, json)?,
                None if json => println!("null"),
                None => println!("(clipboard is empty)"),
            }
            if let (Some(path), Some(data)) = (save, &data) {
                save_payload(data, &path)?;
                info!("Saved clipboard payload to {}", path.display());
            }
        }
        Command::Type => {
            let data_type = bridge.get_clipboard_data_type_async().await?;
            if json {
                println!("{}", serde_json::to_string(&data_type)?);
            } else {
                println!("{}", data_type);
            }
        }
        Command::Empty => {
            let empty = bridge.is_clipboard_empty_async().await?;
            if json {
                println!("{}", serde_json::json!({ "empty": empty }));
            } else {
                println!("{}", if empty { "empty" } else { "not empty" });
            }
        }
        Command::Clear => {
            bridge.clear_clipboard_async().await?;
            info!("Clipboard cleared");
        }
        Command::SetText { text } => {
            info!("Setting clipboard text: {} chars", text.chars().count());
            bridge.set_clipboard_data_async(Some(ClipboardData::text(text))).await?;
        }
        Command::SetFiles { paths } => {
            let paths: Vec<String> = paths.iter().map(|p| absolute(p)).collect();
            info!("Setting clipboard file list: {} entries", paths.len());
            bridge.set_clipboard_data_async(Some(ClipboardData::path_list(paths))).await?;
        }
        Command::SetImage { png } => {
            let bytes = fs::read(&png)?;
            let bitmap = Bitmap::decode(&bytes, ImageEncoding::Png)?;
            info!("Setting clipboard image: {}x{}", bitmap.width(), bitmap.height());
            bridge.set_clipboard_data_async(Some(ClipboardData::image(bitmap))).await?;
        }
        Command::Watch | Command::Config { .. } => {
            return Err(format!("{:?} is not a one-shot command", command).into());
        }
    }
    Ok(())
}

fn print_data(data: &ClipboardData, json: bool) -> AppResult<()> {
    if json {
        println!("{}", serde_json::to_string(&Summary::of(data))?);
        return Ok(());
    }

    let from = data.source().map(|s| format!(" from {}", s)).unwrap_or_default();
    println!("[{}{}] formats: {}", data.data_type(), from, data.formats().join(", "));
    match data.payload() {
        Payload::Text(text) => {
            if text.chars().count() > 100 {
                let head: String = text.chars().take(100).collect();
                println!("{}...", head);
            } else {
                println!("{}", text);
            }
        }
        _ => println!("{}", data),
    }
    Ok(())
}

fn save_payload(data: &ClipboardData, path: &Path) -> AppResult<()> {
    let bytes = match data.payload() {
        Payload::Text(text) => text.as_bytes().to_vec(),
        Payload::PathList(paths) => paths.join("\n").into_bytes(),
        Payload::Image(bitmap) => bitmap.encode(ImageEncoding::Png)?,
        Payload::Bytes(bytes) => bytes.clone(),
    };
    fs::write(path, bytes)?;
    Ok(())
}

fn absolute(path: &Path) -> String {
    fs::canonicalize(path)
        .unwrap_or_else(|_| path.to_path_buf())
        .to_string_lossy()
        .into_owned()
}

fn show_config(config: &BridgeConfig, path: Option<&Path>, init: bool, json: bool) -> AppResult<()> {
    let path = path.map(Path::to_path_buf).or_else(config::config_path);
    if init {
        match &path {
            Some(path) => {
                config::save_default(path)?;
                info!("Default configuration saved to {}", path.display());
            }
            None => error!("No configuration directory on this system"),
        }
    }
    if json {
        println!("{}", serde_json::to_string(config)?);
    } else {
        if let Some(path) = &path {
            println!("# {}", path.display());
        }
        print!("{}", toml::to_string_pretty(config)?);
    }
    Ok(())
}

fn print_event(data: &ClipboardData, json: bool) {
    if let Err(e) = print_data(data, json) {
        error!("Failed to print clipboard change: {}", e);
    }
}

/// Forward change events to stdout from a dedicated thread.
fn spawn_printer(bridge: &ClipboardBridge, json: bool) -> AppResult<std::thread::JoinHandle<()>> {
    let mut events = bridge.subscribe()?;
    let handle = std::thread::Builder::new().name("clipboard-printer".to_string()).spawn(move || {
        use tokio::sync::broadcast::error::RecvError;
        loop {
            match events.blocking_recv() {
                Ok(event) => print_event(&event.into_data(), json),
                Err(RecvError::Lagged(skipped)) => warn!("Skipped {} clipboard changes", skipped),
                Err(RecvError::Closed) => break,
            }
        }
    })?;
    Ok(handle)
}

#[cfg(target_os = "windows")]
fn watch(config: &BridgeConfig, json: bool) -> AppResult<()> {
    let window = window::MessageWindow::create()?;
    let hook = clipboard_bridge::WindowHook::new(window.hwnd())?;
    let bridge = bridge_builder(config).event_source(hook).build()?;
    let _printer = spawn_printer(&bridge, json)?;
    info!("Watching the clipboard, press Ctrl+C to stop");
    window.run();
    bridge.dispose();
    Ok(())
}

#[cfg(not(target_os = "windows"))]
fn watch(config: &BridgeConfig, json: bool) -> AppResult<()> {
    let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
    let bridge = bridge_builder(config).build()?;
    let printer = spawn_printer(&bridge, json)?;
    info!("Watching the clipboard, press Ctrl+C to stop");
    runtime.block_on(tokio::signal::ctrl_c())?;
    info!("Stopping clipboard watch");
    drop(bridge);
    let _ = printer.join();
    Ok(())
}

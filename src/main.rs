#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

use std::path::PathBuf;

use clap::Parser;
use loudlab::app::StartupConfig;
use loudlab::LoudnessEditor;

#[derive(Parser)]
#[command(author, version, about = "LoudLab Batch Loudness Editor", long_about = None)]
struct Cli {
    /// directory to open at launch
    folder: Option<PathBuf>,

    /// number of worker threads, default to CPU core count
    #[arg(short, long)]
    threads: Option<usize>,

    /// populate the list with synthetic entries instead of scanning
    #[arg(long, hide = true)]
    dummy_list: Option<usize>,
}

fn main() -> eframe::Result<()> {
    _ = pretty_env_logger::formatted_builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .try_init();

    let cli = Cli::parse();
    let startup = StartupConfig {
        open_folder: cli.folder,
        threads: cli.threads,
        dummy_list_count: cli.dummy_list,
    };

    let viewport = egui::ViewportBuilder::default()
        .with_min_inner_size([900.0, 500.0])
        .with_inner_size([1280.0, 720.0]);
    let native_options = eframe::NativeOptions {
        viewport,
        ..Default::default()
    };
    eframe::run_native(
        "LoudLab Batch Loudness Editor",
        native_options,
        Box::new(move |cc| {
            Ok(Box::new(
                LoudnessEditor::new(cc, startup).expect("failed to init app"),
            ))
        }),
    )
}

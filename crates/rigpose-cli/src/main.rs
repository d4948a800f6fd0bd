use std::{error::Error, fs, path::Path, path::PathBuf};

use clap::Parser;
use serde::{Deserialize, Serialize};

use rigpose_core::{board_points, BoardSpec, RigCamera};
use rigpose_pipeline::{calibrate_rig, RunOptions};

/// Rig world-pose calibration from pre-collected observations.
///
/// The input file carries the board geometry plus, per camera, the detected
/// corners and per-image PnP pose for every synchronized capture. Refined
/// `.world.pose` files are written next to the JSON report on stdout.
#[derive(Debug, Parser)]
#[command(author, version, about = "Multi-camera rig world-pose calibration")]
struct Args {
    /// Path to JSON file containing RigCalibrationInput.
    #[arg(long)]
    input: String,

    /// Directory receiving one <id>.world.pose file per camera.
    #[arg(long)]
    out_dir: PathBuf,

    /// Optional path to JSON RunOptions. Defaults are used if omitted.
    #[arg(long)]
    options: Option<String>,
}

/// Everything the refinement stage needs, detection already done.
#[derive(Debug, Serialize, Deserialize)]
struct RigCalibrationInput {
    board: BoardSpec,
    cameras: Vec<RigCamera>,
}

fn load_json_file<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, Box<dyn Error>> {
    let data = fs::read_to_string(path)?;
    let value = serde_json::from_str(&data)?;
    Ok(value)
}

fn calibrate_from_files(
    input_path: &str,
    out_dir: &Path,
    options_path: Option<&str>,
) -> Result<String, Box<dyn Error>> {
    let input: RigCalibrationInput = load_json_file(Path::new(input_path))?;

    let opts = if let Some(opts_path) = options_path {
        load_json_file::<RunOptions>(Path::new(opts_path))?
    } else {
        RunOptions::default()
    };

    let board = board_points(&input.board);
    let output_dirs = vec![out_dir.to_path_buf(); input.cameras.len()];
    let report = calibrate_rig(&input.cameras, &output_dirs, &board, &opts)?;
    Ok(serde_json::to_string_pretty(&report)?)
}

fn main() {
    env_logger::init();
    if let Err(err) = try_main() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn try_main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let json = calibrate_from_files(&args.input, &args.out_dir, args.options.as_deref())?;
    println!("{}", json);
    Ok(())
}

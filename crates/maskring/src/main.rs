//! maskring: convert a directory of binary PNG masks to single-ring
//! polygon annotations.
//!
//! Every `.png` file in the input directory is thresholded, optionally
//! upscaled and smoothed, traced, and written as one JSON record holding
//! its polygons (holes merged in), area and bounding box. Files are
//! processed in parallel; the output keeps the sorted file order.
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin maskring -- [OPTIONS] <INPUT_DIR>
//! ```
//!
//! Logging goes to stderr and is controlled by `RUST_LOG`.

mod batch;
mod error;
mod prepare;

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use maskring_pipeline::{OrphanPolicy, PipelineConfig};
use tracing_subscriber::EnvFilter;

use crate::error::CliError;
use crate::prepare::PrepareOptions;

/// Convert binary PNG masks to single-ring polygon annotations.
#[derive(Parser)]
#[command(name = "maskring", version)]
struct Cli {
    /// Directory containing the PNG masks.
    input_dir: PathBuf,

    /// Write JSON to this file instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Pixels brighter than this are foreground.
    #[arg(long, default_value_t = prepare::DEFAULT_THRESHOLD)]
    threshold: u8,

    /// Upscale factor applied before tracing (1.0 disables).
    #[arg(long, default_value_t = prepare::DEFAULT_UPSCALE)]
    upscale: f64,

    /// Gaussian blur sigma applied after upscaling (0 disables).
    #[arg(long, default_value_t = prepare::DEFAULT_BLUR_SIGMA)]
    blur_sigma: f32,

    /// Simplification tolerance as a fraction of each contour's perimeter.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_EPSILON_FACTOR)]
    epsilon_factor: f64,

    /// What to do with holes whose enclosing contour was discarded.
    #[arg(long, value_enum, default_value_t = Orphans::Drop)]
    orphans: Orphans,

    /// Full pipeline config as a JSON string.
    ///
    /// When provided, `--epsilon-factor` and `--orphans` are ignored.
    /// The JSON must be a valid `PipelineConfig` serialization; its
    /// working scale is always replaced by `--upscale`.
    #[arg(long)]
    config_json: Option<String>,

    /// Pretty-print the JSON output.
    #[arg(long)]
    pretty: bool,
}

/// Orphaned hole handling.
#[derive(Clone, Copy, ValueEnum)]
enum Orphans {
    /// Discard the hole.
    Drop,
    /// Emit the hole as a polygon of its own.
    Promote,
}

/// Build a [`PipelineConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and the
/// individual pipeline flags are ignored. The working scale is reset to
/// its default either way, since each file sets it from the upscale it
/// actually received.
fn config_from_cli(cli: &Cli) -> Result<PipelineConfig, CliError> {
    let config = if let Some(ref json) = cli.config_json {
        PipelineConfig {
            scale_x: PipelineConfig::DEFAULT_SCALE,
            scale_y: PipelineConfig::DEFAULT_SCALE,
            ..serde_json::from_str(json)?
        }
    } else {
        PipelineConfig {
            epsilon_factor: cli.epsilon_factor,
            orphan_policy: match cli.orphans {
                Orphans::Drop => OrphanPolicy::Drop,
                Orphans::Promote => OrphanPolicy::Promote,
            },
            ..PipelineConfig::default()
        }
    };
    config.validate()?;
    Ok(config)
}

const fn options_from_cli(cli: &Cli) -> PrepareOptions {
    PrepareOptions {
        threshold: cli.threshold,
        upscale: cli.upscale,
        blur_sigma: cli.blur_sigma,
    }
}

fn run(cli: &Cli) -> Result<ExitCode, CliError> {
    let config = config_from_cli(cli)?;
    let options = options_from_cli(cli);
    options.validate()?;

    let paths = batch::collect_masks(&cli.input_dir)?;
    tracing::info!(
        dir = %cli.input_dir.display(),
        masks = paths.len(),
        "processing masks"
    );

    let records = batch::run_batch(&paths, &options, &config);
    let failed = records.iter().filter(|r| r.is_failure()).count();

    let json = if cli.pretty {
        serde_json::to_string_pretty(&records)?
    } else {
        serde_json::to_string(&records)?
    };
    match cli.output {
        Some(ref path) => std::fs::write(path, json).map_err(|e| CliError::io(path, e))?,
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{json}").map_err(|e| CliError::io("<stdout>", e))?;
        }
    }

    tracing::info!(masks = records.len(), failed, "done");
    Ok(if failed == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("maskring").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn cli_defaults_match_library_defaults() {
        let cli = parse(&["masks"]);
        let config = config_from_cli(&cli).unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(options_from_cli(&cli), PrepareOptions::default());
    }

    #[test]
    fn flags_override_defaults() {
        let cli = parse(&["masks", "--epsilon-factor", "0.01", "--orphans", "promote"]);
        let config = config_from_cli(&cli).unwrap();
        assert!((config.epsilon_factor - 0.01).abs() < f64::EPSILON);
        assert_eq!(config.orphan_policy, OrphanPolicy::Promote);
    }

    #[test]
    fn config_json_replaces_flags() {
        let cli = parse(&[
            "masks",
            "--epsilon-factor",
            "0.5",
            "--config-json",
            r#"{"epsilon_factor": 0.002}"#,
        ]);
        let config = config_from_cli(&cli).unwrap();
        assert!((config.epsilon_factor - 0.002).abs() < f64::EPSILON);
    }

    #[test]
    fn config_json_scale_is_ignored() {
        let cli = parse(&[
            "masks",
            "--config-json",
            r#"{"scale_x": 0.0, "scale_y": -3.0}"#,
        ]);
        let config = config_from_cli(&cli).unwrap();
        assert!((config.scale_x - PipelineConfig::DEFAULT_SCALE).abs() < f64::EPSILON);
        assert!((config.scale_y - PipelineConfig::DEFAULT_SCALE).abs() < f64::EPSILON);
    }

    #[test]
    fn malformed_config_json_is_rejected() {
        let cli = parse(&["masks", "--config-json", "{not json"]);
        assert!(matches!(config_from_cli(&cli), Err(CliError::Json(_))));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let cli = parse(&["masks", "--epsilon-factor=-0.1"]);
        assert!(matches!(config_from_cli(&cli), Err(CliError::Pipeline(_))));
    }

    #[test]
    fn run_writes_output_file() {
        let dir = tempfile::tempdir().unwrap();
        let masks = dir.path().join("masks");
        std::fs::create_dir(&masks).unwrap();
        let img = image::GrayImage::from_fn(16, 16, |x, y| {
            image::Luma([if (4..12).contains(&x) && (4..12).contains(&y) {
                255
            } else {
                0
            }])
        });
        img.save(masks.join("m.png")).unwrap();
        let out = dir.path().join("out.json");

        let cli = parse(&[
            masks.to_str().unwrap(),
            "--output",
            out.to_str().unwrap(),
            "--upscale",
            "1",
            "--blur-sigma",
            "0",
        ]);
        assert!(run(&cli).is_ok());

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
        let first = &written[0];
        assert_eq!(first["file_name"], "m.png");
        assert_eq!(first["width"], 16);
        assert_eq!(first["bbox"], serde_json::json!([4.0, 4.0, 11.0, 11.0]));
        assert_eq!(first["polygons"].as_array().unwrap().len(), 1);
    }
}

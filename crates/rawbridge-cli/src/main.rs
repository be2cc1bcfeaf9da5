use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use rawbridge_core::export::{export_embedded_thumbnail, export_raster};
use rawbridge_core::{decode_with_options, DecodeOptions, DecodedImage, ErrorPolicy, ShotMetadata};
use tracing::{debug, info, instrument};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(
    name = "rawbridge",
    about = "Decode camera RAW files and export their rasters through LibRaw",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// decode a RAW file and print its dimensions and capture time
    Decode {
        /// the RAW file to decode
        file: PathBuf,

        /// a JSON file with decode options. flags below override it
        #[arg(long)]
        config: Option<PathBuf>,

        /// report native stage failures and keep going
        #[arg(long)]
        best_effort: bool,

        /// the demosaic algorithm: 0 linear, 1 VNG, 2 PPG, 3 AHD
        #[arg(long)]
        demosaic: Option<i32>,

        /// write the decoded raster to this path. the format follows the extension
        #[arg(long)]
        save: Option<PathBuf>,

        /// print the summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// export the processed raster (or the embedded thumbnail) next to other exports
    Export {
        /// the RAW file to export
        file: PathBuf,

        /// the directory the export is written to
        #[arg(long, short)]
        output_dir: PathBuf,

        /// export the embedded JPEG thumbnail instead of the processed raster
        #[arg(long)]
        thumbnail: bool,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Decode {
            file,
            config,
            best_effort,
            demosaic,
            save,
            json,
        } => {
            let options = load_options(config.as_deref(), best_effort, demosaic)?;
            run_decode(&file, &options, save.as_deref(), json)
        }
        Command::Export {
            file,
            output_dir,
            thumbnail,
        } => run_export(&file, &output_dir, thumbnail),
    }
}

/// Build decode options from an optional JSON file plus command-line flags.
fn load_options(
    config: Option<&Path>,
    best_effort: bool,
    demosaic: Option<i32>,
) -> anyhow::Result<DecodeOptions> {
    let mut options = match config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("invalid decode options in {}", path.display()))?
        }
        None => DecodeOptions::default(),
    };

    if best_effort {
        options.error_policy = ErrorPolicy::BestEffort;
    }
    if demosaic.is_some() {
        options.demosaic = demosaic;
    }

    debug!(?options, "decode options");
    Ok(options)
}

#[instrument(skip(options))]
fn run_decode(
    file: &Path,
    options: &DecodeOptions,
    save: Option<&Path>,
    json: bool,
) -> anyhow::Result<()> {
    let (image, meta) = decode_with_options(file, options)
        .with_context(|| format!("failed to decode {}", file.display()))?;

    if let Some(path) = save {
        image
            .as_dynamic()
            .save(path)
            .with_context(|| format!("failed to save {}", path.display()))?;
        info!("saved {}", path.display());
    }

    println!("{}", summarize(&image, &meta, json)?);
    Ok(())
}

fn summarize(image: &DecodedImage, meta: &ShotMetadata, json: bool) -> anyhow::Result<String> {
    if json {
        let summary = serde_json::json!({
            "width": image.width,
            "height": image.height,
            "color": image.color,
            "capture_timestamp": meta.capture_timestamp,
            "capture_date_time": meta.capture_date_time,
        });
        return Ok(serde_json::to_string_pretty(&summary)?);
    }

    Ok(format!(
        "{}x{} {:?}, captured {}",
        image.width, image.height, image.color, meta.capture_date_time
    ))
}

#[instrument]
fn run_export(file: &Path, output_dir: &Path, thumbnail: bool) -> anyhow::Result<()> {
    let (Some(input_dir), Some(file_name)) = (file.parent(), file.file_name()) else {
        bail!("{} is not a file path", file.display());
    };

    fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create {}", output_dir.display()))?;

    let exported = if thumbnail {
        export_embedded_thumbnail(input_dir, file_name, output_dir)
    } else {
        export_raster(input_dir, file_name, output_dir)
    }
    .with_context(|| format!("failed to export {}", file.display()))?;

    println!("{}", exported.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rawbridge_core::decode::{decode_container, synthesize, RawPixelBuffer};

    fn sample_image() -> DecodedImage {
        let buffer = RawPixelBuffer {
            width: 2,
            height: 1,
            colors: 3,
            bits: 8,
            data: vec![10, 20, 30, 40, 50, 60],
        };
        decode_container(&synthesize(&buffer)).unwrap()
    }

    #[test]
    fn test_parse_decode_flags() {
        let cli = Cli::try_parse_from([
            "rawbridge",
            "decode",
            "DSC01234.ARW",
            "--best-effort",
            "--demosaic",
            "1",
            "--json",
        ])
        .unwrap();

        match cli.command {
            Command::Decode {
                file,
                best_effort,
                demosaic,
                json,
                ..
            } => {
                assert_eq!(file, PathBuf::from("DSC01234.ARW"));
                assert!(best_effort);
                assert_eq!(demosaic, Some(1));
                assert!(json);
            }
            other => panic!("Expected decode command, got: {:?}", other),
        }
    }

    #[test]
    fn test_export_requires_output_dir() {
        assert!(Cli::try_parse_from(["rawbridge", "export", "DSC01234.ARW"]).is_err());
    }

    #[test]
    fn test_flags_override_config() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = dir.path().join("options.json");
        fs::write(&config, r#"{"no_auto_bright": true, "demosaic": 3}"#).unwrap();

        let options = load_options(Some(&config), true, Some(0)).unwrap();

        assert_eq!(options.error_policy, ErrorPolicy::BestEffort);
        assert!(options.no_auto_bright);
        assert_eq!(options.demosaic, Some(0));
        assert_eq!(options.highlight, None);
    }

    #[test]
    fn test_invalid_config_is_reported() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = dir.path().join("options.json");
        fs::write(&config, "not json").unwrap();

        let err = load_options(Some(&config), false, None).unwrap_err();
        assert!(err.to_string().contains("invalid decode options"));
    }

    #[test]
    fn test_summary_text() {
        let meta = ShotMetadata::from_timestamp(1_700_000_000);
        let text = summarize(&sample_image(), &meta, false).unwrap();
        assert_eq!(text, "2x1 Rgb8, captured 2023-11-14T22:13:20");
    }

    #[test]
    fn test_summary_json() {
        let meta = ShotMetadata::from_timestamp(0);
        let text = summarize(&sample_image(), &meta, true).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();

        assert_eq!(value["width"], 2);
        assert_eq!(value["color"], "Rgb8");
        assert_eq!(value["capture_date_time"], "1970-01-01T00:00:00");
    }
}

//! hanzi-snap CLI: run the pipeline on one file and print the document.
//!
//! Usage:
//!   hanzi-snap <image>                          OCR + segment + translate
//!   hanzi-snap <video> --video                  Sample frames, dedup, translate
//!   hanzi-snap <file> --cloud-segmentation      Let the model split sentences
//!   hanzi-snap <file> --no-translate            Stop after segmentation
//!   hanzi-snap <file> --traditional             Source text is traditional Chinese

use hanzi_snap::config::SegmentationMode;
use hanzi_snap::video::FfmpegFrameSource;
use hanzi_snap::{Config, Document, DocumentSource, Pipeline, Script};
use std::path::Path;
use tokio_util::sync::CancellationToken;

struct Args {
    path: String,
    video: bool,
    cloud_segmentation: bool,
    translate: bool,
    script: Script,
}

fn parse_args() -> Option<Args> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let path = args.iter().find(|a| !a.starts_with("--"))?.clone();
    let has = |flag: &str| args.iter().any(|a| a == flag);
    Some(Args {
        video: has("--video") || is_video_path(&path),
        cloud_segmentation: has("--cloud-segmentation"),
        translate: !has("--no-translate"),
        script: if has("--traditional") { Script::Traditional } else { Script::Simplified },
        path,
    })
}

fn is_video_path(path: &str) -> bool {
    Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| matches!(e.to_lowercase().as_str(), "mp4" | "mov" | "m4v" | "mkv" | "webm"))
        .unwrap_or(false)
}

fn load_env_files() {
    for env_file in [".env.local", ".env"] {
        let path = Path::new(env_file);
        if path.exists() {
            match dotenvy::from_path(path) {
                Ok(_) => eprintln!("[STARTUP] Loaded {}", path.display()),
                Err(e) => eprintln!("[STARTUP] Failed to load {}: {}", path.display(), e),
            }
            break;
        }
    }
}

fn main() {
    let Some(args) = parse_args() else {
        eprintln!("Usage:");
        eprintln!("  hanzi-snap <image|video> [--video] [--cloud-segmentation] [--no-translate] [--traditional]");
        std::process::exit(1);
    };

    load_env_files();
    env_logger::init();

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to start runtime: {}", e);
            std::process::exit(1);
        }
    };

    match runtime.block_on(run(args)) {
        Ok(document) => match serde_json::to_string_pretty(&document) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Failed to serialize document: {}", e);
                std::process::exit(1);
            }
        },
        Err(e) => {
            if e.is_configuration() {
                eprintln!("{}. Set it in .env, the environment or {}", e, hanzi_snap::config::settings_path().display());
            } else {
                eprintln!("Error: {}", e);
            }
            std::process::exit(1);
        }
    }
}

async fn run(args: Args) -> hanzi_snap::Result<Document> {
    let mut config = Config::load();
    if args.cloud_segmentation {
        config.segmentation = SegmentationMode::Cloud;
    }
    let pipeline = Pipeline::new(config)?;
    let cancel = CancellationToken::new();
    let progress = |fraction: f64| log::info!("[PIPELINE] Progress {:.0}%", fraction * 100.0);

    let mut document = if args.video {
        let frames = FfmpegFrameSource::open(&args.path)?;
        match pipeline
            .process_video(&frames, DocumentSource::Imported, args.script, &cancel, progress)
            .await?
        {
            Some(doc) => doc,
            None => Document::new(DocumentSource::Imported, args.script, true, Vec::new()),
        }
    } else {
        let bytes = std::fs::read(&args.path)?;
        pipeline.process_image(&bytes, DocumentSource::Imported, args.script).await?
    };

    if args.translate {
        let summary = pipeline.translate_document(&mut document, &cancel, progress).await?;
        if !summary.is_complete() {
            eprintln!("Translated {}/{} sentences", summary.processed, summary.total);
        }
    }
    Ok(document)
}

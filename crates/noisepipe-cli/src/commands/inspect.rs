use std::path::{Path, PathBuf};

use noisepipe_core::AudioStream;
use serde_json::json;

pub fn run(path: &str, json: bool) {
    let path = Path::new(path);
    let files = if path.is_dir() {
        let mut files = match wav_files_in(path) {
            Ok(files) => files,
            Err(e) => {
                eprintln!("Error: cannot read '{}': {e}", path.display());
                std::process::exit(1);
            }
        };
        if files.is_empty() {
            eprintln!("No .wav files in '{}'", path.display());
            std::process::exit(1);
        }
        files.sort();
        files
    } else {
        vec![path.to_path_buf()]
    };

    let mut entries = Vec::new();
    for file in &files {
        let stream = match AudioStream::open(file) {
            Ok(stream) => stream,
            Err(e) => {
                eprintln!("Error: {e}");
                std::process::exit(1);
            }
        };
        entries.push((file, stream));
    }

    if json {
        let report: Vec<_> = entries
            .iter()
            .map(|(file, s)| {
                json!({
                    "path": file.display().to_string(),
                    "sample_rate": s.sample_rate,
                    "channel_count": s.channel_count,
                    "sample_width": s.sample_width,
                    "frame_count": s.frame_count,
                    "duration_sec": s.frame_count as f64 / s.sample_rate as f64,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&report).unwrap());
        return;
    }

    for (file, s) in &entries {
        println!("{}", file.display());
        println!("  {}", s.format());
        println!(
            "  duration: {:.3}s",
            s.frame_count as f64 / s.sample_rate as f64
        );
    }
}

fn wav_files_in(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "wav") {
            files.push(path);
        }
    }
    Ok(files)
}

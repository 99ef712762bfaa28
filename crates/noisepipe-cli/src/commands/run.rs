use log::info;
use noisepipe_core::{PipelineConfig, Stage, StageReport, run_pipeline};

use super::parse_transform;

pub struct RunCommandConfig<'a> {
    pub config_path: Option<&'a str>,
    pub transform: Option<&'a str>,
    pub gain: f64,
    pub arity: usize,
    pub block_size: Option<usize>,
    pub input_dir: Option<&'a str>,
    pub output: Option<&'a str>,
}

pub fn run(cfg: RunCommandConfig) {
    let reports = if let Some(path) = cfg.config_path {
        run_from_config(path)
    } else {
        run_single_stage(&cfg)
    };

    let mut total_blocks = 0u64;
    let mut total_frames = 0u64;
    for (index, report) in reports.iter().enumerate() {
        println!(
            "Stage {index}: {} combination(s), {} block(s), {} frame(s)",
            report.combinations, report.blocks, report.frames
        );
        for output in &report.outputs {
            println!("  {}", output.display());
        }
        total_blocks += report.blocks;
        total_frames += report.frames;
    }
    println!(
        "Done: {} stage(s), {total_blocks} block(s), {total_frames} frame(s)",
        reports.len()
    );
}

fn run_from_config(path: &str) -> Vec<StageReport> {
    let config = match PipelineConfig::from_file(path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: cannot load pipeline config: {e}");
            std::process::exit(1);
        }
    };
    info!(
        "running {}-stage pipeline from '{path}'",
        config.stages.len()
    );
    match run_pipeline(&config) {
        Ok(reports) => reports,
        Err(e) => {
            eprintln!("Error: pipeline failed: {e}");
            std::process::exit(1);
        }
    }
}

fn run_single_stage(cfg: &RunCommandConfig) -> Vec<StageReport> {
    let (Some(transform), Some(input_dir), Some(output)) =
        (cfg.transform, cfg.input_dir, cfg.output)
    else {
        eprintln!("Error: without --config, all of --transform, --input-dir, --output are required");
        std::process::exit(1);
    };

    let spec = parse_transform(transform, cfg.gain);
    let mut stage = match Stage::new(&spec, cfg.arity, cfg.block_size, input_dir, output) {
        Ok(stage) => stage,
        Err(e) => {
            eprintln!("Error: invalid stage: {e}");
            std::process::exit(1);
        }
    };
    match stage.execute() {
        Ok(report) => vec![report],
        Err(e) => {
            eprintln!("Error: stage '{}' failed: {e}", stage.name());
            std::process::exit(1);
        }
    }
}

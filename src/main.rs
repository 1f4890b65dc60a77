use anyhow::{bail, Context, Result};
use log::info;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use avatar_retarget::align::PinholeCamera;
use avatar_retarget::config::Config;
use avatar_retarget::engine::{self, Engine, EngineSettings};
use avatar_retarget::rig::{BonePose, Skeleton};
use avatar_retarget::source::ReplaySource;

const CONFIG_PATH: &str = "config.toml";

/// 出力1行分
#[derive(Serialize)]
struct FrameRecord<'a> {
    timestamp_us: u64,
    root: RootRecord,
    bones: &'a [BonePose],
}

#[derive(Serialize)]
struct RootRecord {
    position: [f32; 3],
    scale: f32,
}

fn open_output(dir: &str) -> Result<(PathBuf, BufWriter<File>)> {
    fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir))?;
    let ts = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let path = Path::new(dir).join(format!("bones_{}.jsonl", ts));
    let file = File::create(&path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    Ok((path, BufWriter::new(file)))
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // avatar-retarget [config.toml] <recording.jsonl>
    let args: Vec<String> = std::env::args().skip(1).collect();
    let (config_path, recording) = match args.as_slice() {
        [recording] => (CONFIG_PATH, recording.as_str()),
        [config, recording] => (config.as_str(), recording.as_str()),
        _ => bail!("usage: avatar-retarget [config.toml] <recording.jsonl>"),
    };

    info!("avatar-retarget {}", env!("GIT_VERSION"));
    let config = Config::load_or_default(config_path);
    info!(
        "skeleton={} visibility>={} alignment={} (bias={})",
        config.skeleton.path,
        config.landmarks.visibility_threshold,
        if config.alignment.enabled { "ON" } else { "OFF" },
        config.alignment.scale_bias
    );

    let skeleton = Skeleton::load(&config.skeleton.path)?;
    let camera = PinholeCamera::from_config(&config.camera);
    let mut engine = Engine::new(skeleton, camera, EngineSettings::from_config(&config))?;
    let mut source = ReplaySource::open(recording)?;

    let (out_path, mut out) = open_output(&config.output.dir)?;
    info!("Output: {}", out_path.display());

    let stats = engine::run(&mut engine, &mut source, |engine, frame, _report| {
        let root = engine.root();
        let bones = engine.poses();
        let record = FrameRecord {
            timestamp_us: frame.timestamp_us,
            root: RootRecord {
                position: root.position.into(),
                scale: root.scale,
            },
            bones: &bones,
        };
        serde_json::to_writer(&mut out, &record)?;
        out.write_all(b"\n")?;
        Ok(())
    });
    out.flush()?;
    let stats = stats?;

    info!(
        "done: {} frames ({} with faults, {} alignments skipped)",
        stats.frames, stats.faulty_frames, stats.skipped_alignments
    );
    Ok(())
}

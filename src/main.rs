//! Agent entrypoint: replays recorded detector output through the analysis pipelines.
//! Runs a single recording to a verdict, or a live session over stdin (Ctrl+C to stop).

use dog_aggression::{
    config::{AppConfig, FramePipeline},
    logging::StructuredLogger,
    model::load_classifier,
    replay::{resolve_detections, RecordedFrame, Recording, ReplayDetector, ReplaySource},
    report::{LiveReport, VerdictReport},
    service::AnalysisService,
};
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

static STOP: AtomicBool = AtomicBool::new(false);

fn run_recording(config: AppConfig, path: &Path) -> Result<(), BoxError> {
    let recording = Recording::load(path)?;
    info!(path = %path.display(), frames = recording.frames.len(), "replaying recording");
    let detector = Arc::new(ReplayDetector::new(&recording, config.scene.class_names.clone()));
    let classifier = load_classifier(&config.model)?;
    let service = AnalysisService::builder()
        .pose_detector(detector.clone())
        .object_detector(detector)
        .classifier(classifier)
        .config(config)
        .build()?;

    let analysis = service.analyze_video(&mut ReplaySource::new(&recording));
    StructuredLogger::emit_json(&VerdictReport::from(&analysis), &mut std::io::stdout())?;
    Ok(())
}

fn run_live(config: AppConfig) -> Result<(), BoxError> {
    let pipeline = config.video.pipeline;
    let class_names = config.scene.class_names.clone();
    let min_confidence = config.scene.detection_confidence;
    let classifier = load_classifier(&config.model)?;
    let service = AnalysisService::builder()
        .classifier(classifier)
        .config(config)
        .build()?;

    let _ = ctrlc::set_handler(|| STOP.store(true, Ordering::Relaxed));
    let (tx, rx) = mpsc::channel::<String>();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines().map_while(Result::ok) {
            if tx.send(line).is_err() {
                break;
            }
        }
    });

    info!(?pipeline, "live session (Ctrl+C to stop)");
    let session_id = Uuid::new_v4();
    let mut session = service.live_session();
    let mut stdout = std::io::stdout();
    while !STOP.load(Ordering::Relaxed) {
        let line = match rx.recv_timeout(Duration::from_millis(200)) {
            Ok(line) => line,
            Err(mpsc::RecvTimeoutError::Timeout) => continue,
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        };
        if line.trim().is_empty() {
            continue;
        }
        let frame: RecordedFrame = match serde_json::from_str(&line) {
            Ok(f) => f,
            Err(e) => {
                warn!(error = %e, "skipping malformed frame line");
                continue;
            }
        };
        let analysis = match pipeline {
            FramePipeline::Scene => {
                match resolve_detections(&frame.detections, &class_names, min_confidence) {
                    Ok(detections) => service.analyze_live_detections(detections),
                    Err(e) => {
                        warn!(error = %e, "skipping frame with unresolvable detections");
                        continue;
                    }
                }
            }
            FramePipeline::Pose => service.analyze_live_pose(frame.pose),
        };
        session.push(&analysis.frame);
        StructuredLogger::emit_json(&LiveReport::from(&analysis), &mut stdout)?;
    }

    let verdict = session.finish();
    StructuredLogger::emit_json(&VerdictReport::new(session_id, &verdict), &mut stdout)?;
    info!(%session_id, "live session stopping");
    Ok(())
}

fn main() -> Result<(), BoxError> {
    let config_path = std::env::var("DOG_AGENT_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.json"));
    let config = AppConfig::load(&config_path);

    StructuredLogger::init(config.log.json, &config.log.level);
    info!(config = %config_path.display(), "dog aggression agent starting");

    let mut args = std::env::args().skip(1);
    match args.next().as_deref() {
        Some("--live") => run_live(config),
        Some(path) => run_recording(config, Path::new(path)),
        None => Err("usage: dog-aggression-agent <recording.json> | --live".into()),
    }
}

//! Dog aggression agent: pose- and scene-based behavior classification for images, videos and
//! live camera frames.
//!
//! Modular structure:
//! - [`features`]: Keypoint set and behavioral feature extraction
//! - [`model`]: Preprocessing and ONNX behavior classifier
//! - [`scene`]: Weighted aggression scoring of object detections
//! - [`temporal`]: Majority-vote aggregation across frames
//! - [`service`]: Analysis service wiring detectors to the pipelines
//! - [`media`]: Frames, video sources and temporary media
//! - [`report`]: Legacy JSON response shapes
//! - [`replay`]: Recorded detector output as detectors and sources
//! - [`logging`]: Structured JSON logging

pub mod config;
pub mod error;
pub mod features;
pub mod logging;
pub mod media;
pub mod model;
pub mod replay;
pub mod report;
pub mod results;
pub mod scene;
pub mod service;
pub mod temporal;

pub use config::AppConfig;
pub use error::AgentError;
pub use features::{FeatureExtractor, FeatureVector, KeypointSet};
pub use logging::StructuredLogger;
pub use model::{FrameClassifier, OnnxClassifier};
pub use results::{Detection, FrameLabel, FrameResult};
pub use scene::SceneScorer;
pub use service::AnalysisService;
pub use temporal::TemporalAggregator;

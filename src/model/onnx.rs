//! ONNX Runtime behavior classifier. Input: [1, selected_features] f32, output: class
//! probabilities [1, 2] (export with zipmap disabled). Missing model file → no classifier,
//! and the frame classifier runs in degraded mode.

use super::ProbabilityModel;
use crate::error::AgentError;
use ndarray::Array2;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Value;
use std::path::Path;
use std::sync::Mutex;

/// Output name produced by skl2onnx classifiers
const PROBABILITY_OUTPUT: &str = "probabilities";

pub struct OnnxClassifier {
    // Runs need exclusive access to the session
    session: Mutex<Session>,
    output_name: String,
}

impl OnnxClassifier {
    /// Load model from path. Returns Ok(None) when the file is absent.
    pub fn load(path: &Path) -> Result<Option<Self>, AgentError> {
        if !path.exists() {
            tracing::warn!(path = %path.display(), "ONNX classifier not found; classification degraded");
            return Ok(None);
        }

        let session = Session::builder()
            .map_err(|e| AgentError::Model(format!("session builder: {e}")))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| AgentError::Model(format!("optimization level: {e}")))?
            .commit_from_file(path)
            .map_err(|e| AgentError::Model(format!("load {}: {e}", path.display())))?;

        let output_name = session
            .outputs
            .iter()
            .find(|o| o.name == PROBABILITY_OUTPUT)
            .or_else(|| session.outputs.last())
            .map(|o| o.name.clone())
            .ok_or_else(|| AgentError::Model("model defines no outputs".into()))?;

        tracing::info!(path = %path.display(), output = %output_name, "ONNX classifier loaded");
        Ok(Some(Self {
            session: Mutex::new(session),
            output_name,
        }))
    }
}

impl ProbabilityModel for OnnxClassifier {
    fn predict_proba(&self, input: &[f32]) -> Result<Vec<f32>, AgentError> {
        let arr = Array2::<f32>::from_shape_vec((1, input.len()), input.to_vec())
            .map_err(|e| AgentError::Model(format!("input shape: {e}")))?;
        let tensor = Value::from_array(arr).map_err(|e| AgentError::Model(format!("tensor: {e}")))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| AgentError::Model("session lock poisoned".into()))?;
        let outputs = session
            .run(ort::inputs![tensor])
            .map_err(|e| AgentError::Model(format!("inference failed: {e}")))?;
        let output = outputs
            .get(&self.output_name)
            .ok_or_else(|| AgentError::Model(format!("missing output {}", self.output_name)))?;
        let (_, data) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| AgentError::Model(format!("extract: {e}")))?;
        Ok(data.to_vec())
    }
}

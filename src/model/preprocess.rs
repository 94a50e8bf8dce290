//! Inference-time preprocessing fitted at training: median imputation, standard scaling,
//! k-best feature selection. Parameters are loaded from JSON.

use crate::error::AgentError;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preprocessor {
    /// Per-feature training medians, substituted for non-finite inputs
    pub medians: Vec<f32>,
    pub means: Vec<f32>,
    pub scales: Vec<f32>,
    /// Indices kept by feature selection, in model input order
    pub selected: Vec<usize>,
}

impl Preprocessor {
    pub fn load(path: &Path) -> Result<Self, AgentError> {
        let data = std::fs::read_to_string(path)?;
        let p: Preprocessor = serde_json::from_str(&data)?;
        p.validate()?;
        Ok(p)
    }

    /// Pass-through over `dim` features; useful when the model embeds its own preprocessing
    pub fn identity(dim: usize) -> Self {
        Self {
            medians: vec![0.0; dim],
            means: vec![0.0; dim],
            scales: vec![1.0; dim],
            selected: (0..dim).collect(),
        }
    }

    pub fn input_dim(&self) -> usize {
        self.medians.len()
    }

    pub fn output_dim(&self) -> usize {
        self.selected.len()
    }

    pub fn validate(&self) -> Result<(), AgentError> {
        let dim = self.medians.len();
        if self.means.len() != dim || self.scales.len() != dim {
            return Err(AgentError::Preprocess(format!(
                "parameter length mismatch: medians {dim}, means {}, scales {}",
                self.means.len(),
                self.scales.len()
            )));
        }
        if self.selected.is_empty() {
            return Err(AgentError::Preprocess("no selected features".into()));
        }
        if let Some(bad) = self.selected.iter().find(|&&i| i >= dim) {
            return Err(AgentError::Preprocess(format!("selected index {bad} out of range {dim}")));
        }
        Ok(())
    }

    pub fn transform(&self, features: &[f32]) -> Result<Vec<f32>, AgentError> {
        if features.len() != self.input_dim() {
            return Err(AgentError::Preprocess(format!(
                "expected {} features, got {}",
                self.input_dim(),
                features.len()
            )));
        }
        let scaled: Vec<f32> = features
            .iter()
            .enumerate()
            .map(|(i, &v)| {
                let v = if v.is_finite() { v } else { self.medians[i] };
                // Constant training columns are left unscaled
                let scale = if self.scales[i] == 0.0 { 1.0 } else { self.scales[i] };
                (v - self.means[i]) / scale
            })
            .collect();
        let out: Vec<f32> = self.selected.iter().map(|&i| scaled[i]).collect();
        if out.iter().any(|v| !v.is_finite()) {
            return Err(AgentError::Preprocess("non-finite value after scaling".into()));
        }
        Ok(out)
    }
}

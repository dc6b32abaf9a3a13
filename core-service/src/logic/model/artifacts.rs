//! Fitted Transforms - Scaler, Reducer, Label Encoder
//!
//! Parameters are learned at training time and exported as JSON
//! (`mean_`/`scale_`, `components_`/`mean_`, `classes_`). Nothing here
//! recomputes statistics; the transforms are pure matrix operations.

use std::path::Path;

use ndarray::{Array1, Array2, ArrayView2, Axis};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::logic::error::{InferenceError, LoadError, Stage};

/// Read + deserialize a JSON artifact
pub fn read_json_artifact<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T, LoadError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| LoadError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn width_error(stage: Stage, expected: usize, actual: usize) -> InferenceError {
    InferenceError::new(
        stage,
        format!("expected {} input columns, got {}", expected, actual),
    )
}

// ============================================================================
// SCALER
// ============================================================================

/// Standardization: (x - mean) / scale
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    #[serde(default)]
    pub mean: Option<Vec<f64>>,
    #[serde(default)]
    pub scale: Option<Vec<f64>>,
}

impl StandardScaler {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let scaler: Self = read_json_artifact(path)?;
        scaler.validate()?;
        Ok(scaler)
    }

    pub fn validate(&self) -> Result<(), LoadError> {
        match (&self.mean, &self.scale) {
            (None, None) => Err(LoadError::Artifact {
                artifact: "scaler",
                reason: "neither mean nor scale present".to_string(),
            }),
            (Some(m), Some(s)) if m.len() != s.len() => Err(LoadError::Artifact {
                artifact: "scaler",
                reason: format!("mean has {} entries, scale has {}", m.len(), s.len()),
            }),
            _ => Ok(()),
        }
    }

    /// Number of features the scaler was fitted on
    pub fn n_features(&self) -> usize {
        self.mean
            .as_ref()
            .or(self.scale.as_ref())
            .map(Vec::len)
            .unwrap_or(0)
    }

    pub fn transform(&self, x: ArrayView2<'_, f64>) -> Result<Array2<f64>, InferenceError> {
        if x.ncols() != self.n_features() {
            return Err(width_error(Stage::Scale, self.n_features(), x.ncols()));
        }

        let mut out = x.to_owned();
        if let Some(mean) = &self.mean {
            out -= &Array1::from_vec(mean.clone());
        }
        if let Some(scale) = &self.scale {
            // zero-variance features are fitted with scale 1
            let scale: Array1<f64> = scale.iter().map(|s| if *s == 0.0 { 1.0 } else { *s }).collect();
            out /= &scale;
        }
        Ok(out)
    }
}

// ============================================================================
// REDUCER
// ============================================================================

/// Principal-component projection: (x - mean) . components^T
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PcaReducer {
    pub mean: Vec<f64>,
    /// k x d
    pub components: Vec<Vec<f64>>,
    #[serde(default)]
    pub whiten: bool,
    #[serde(default)]
    pub explained_variance: Option<Vec<f64>>,
}

impl PcaReducer {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let reducer: Self = read_json_artifact(path)?;
        reducer.validate()?;
        Ok(reducer)
    }

    pub fn validate(&self) -> Result<(), LoadError> {
        let invalid = |reason: String| LoadError::Artifact {
            artifact: "reducer",
            reason,
        };

        if self.components.is_empty() {
            return Err(invalid("no components".to_string()));
        }
        let d = self.mean.len();
        if let Some(row) = self.components.iter().find(|row| row.len() != d) {
            return Err(invalid(format!(
                "component has {} weights, mean has {}",
                row.len(),
                d
            )));
        }
        if self.whiten {
            match &self.explained_variance {
                Some(var) if var.len() == self.components.len() => {}
                _ => {
                    return Err(invalid(
                        "whitening requires one explained_variance per component".to_string(),
                    ))
                }
            }
        }
        Ok(())
    }

    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    pub fn n_components(&self) -> usize {
        self.components.len()
    }

    fn components_matrix(&self) -> Array2<f64> {
        let k = self.n_components();
        let d = self.n_features();
        Array2::from_shape_fn((k, d), |(i, j)| self.components[i][j])
    }

    pub fn transform(&self, x: ArrayView2<'_, f64>) -> Result<Array2<f64>, InferenceError> {
        if x.ncols() != self.n_features() {
            return Err(width_error(Stage::Reduce, self.n_features(), x.ncols()));
        }

        let centered = &x - &Array1::from_vec(self.mean.clone());
        let mut projected = centered.dot(&self.components_matrix().t());

        if self.whiten {
            if let Some(var) = &self.explained_variance {
                let std: Array1<f64> = var.iter().map(|v| v.sqrt().max(f64::EPSILON)).collect();
                projected /= &std;
            }
        }
        Ok(projected)
    }
}

// ============================================================================
// LABEL ENCODER
// ============================================================================

/// Integer class index <-> class name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelEncoder {
    pub classes: Vec<String>,
}

impl LabelEncoder {
    pub fn new<I, S>(classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            classes: classes.into_iter().map(Into::into).collect(),
        }
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let encoder: Self = read_json_artifact(path)?;
        if encoder.classes.is_empty() {
            return Err(LoadError::Artifact {
                artifact: "label encoder",
                reason: "no classes".to_string(),
            });
        }
        Ok(encoder)
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn decode(&self, index: i64) -> Option<&str> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.classes.get(i))
            .map(String::as_str)
    }

    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.classes.iter().position(|c| c == label)
    }
}

/// Largest entry of one probability row (confidence fallback)
pub fn row_max(probabilities: &Array2<f64>, row: usize) -> Option<f64> {
    probabilities
        .index_axis(Axis(0), row)
        .iter()
        .copied()
        .fold(None, |acc, v| Some(acc.map_or(v, |a: f64| a.max(v))))
}

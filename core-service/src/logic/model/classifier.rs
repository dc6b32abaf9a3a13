//! Classifier - Trained Model Backends
//!
//! Load và chạy classifier đã train.
//! Raw output is resolved into `RawLabels` right here, at the boundary:
//! some exported models embed class names, others emit encoder indices.

use std::path::{Path, PathBuf};

use ndarray::{Array1, Array2, ArrayView2, Axis};
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Value;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::artifacts::read_json_artifact;
use crate::logic::error::{InferenceError, LoadError, Stage};

// ============================================================================
// RAW OUTPUT
// ============================================================================

/// What the classifier hands back, before label decoding
#[derive(Debug, Clone, PartialEq)]
pub enum RawLabels {
    /// Model already emits class names
    TextLabel(Vec<String>),
    /// Model emits label-encoder indices
    EncodedIndex(Vec<i64>),
}

impl RawLabels {
    pub fn len(&self) -> usize {
        match self {
            RawLabels::TextLabel(v) => v.len(),
            RawLabels::EncodedIndex(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone)]
pub struct ClassifierOutput {
    pub labels: RawLabels,
    /// rows x classes, when the model supports probability estimates
    pub probabilities: Option<Array2<f64>>,
}

// ============================================================================
// CLASSIFIER TRAIT
// ============================================================================

/// Trait cho classifier backends (ONNX, linear, test doubles)
pub trait Classifier: Send + Sync {
    fn name(&self) -> &str;

    /// Input width, when the backend knows it
    fn n_features(&self) -> Option<usize>;

    /// Class names in probability-column order, when embedded in the model
    fn classes(&self) -> Option<&[String]>;

    /// Number of classes the model can emit, when the backend knows it
    fn class_count(&self) -> Option<usize> {
        self.classes().map(<[String]>::len)
    }

    fn infer(&self, features: ArrayView2<'_, f64>) -> Result<ClassifierOutput, InferenceError>;
}

/// Pick a backend by file extension (`.onnx` / `.json`)
pub fn load_classifier(path: impl AsRef<Path>) -> Result<Box<dyn Classifier>, LoadError> {
    let path = path.as_ref();
    match path.extension().and_then(|e| e.to_str()) {
        Some("onnx") => Ok(Box::new(OnnxClassifier::from_file(path)?)),
        Some("json") => Ok(Box::new(LinearClassifier::from_json_file(path)?)),
        _ => Err(LoadError::Artifact {
            artifact: "classifier",
            reason: format!("unsupported classifier format: {}", path.display()),
        }),
    }
}

// ============================================================================
// LINEAR IMPLEMENTATION
// ============================================================================

/// Multinomial linear model exported as JSON (`coef_`, `intercept_`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearClassifier {
    /// k x d (k == 1 for a binary model)
    pub coef: Vec<Vec<f64>>,
    pub intercept: Vec<f64>,
    /// Embedded class names -> TextLabel output
    #[serde(default)]
    pub classes: Option<Vec<String>>,
    #[serde(default = "default_probability")]
    pub probability: bool,
}

fn default_probability() -> bool {
    true
}

impl LinearClassifier {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let model: Self = read_json_artifact(path)?;
        model.validate()?;
        log::info!(
            "Linear classifier loaded from {} ({} classes, {} features)",
            path.display(),
            model.n_classes(),
            model.width()
        );
        Ok(model)
    }

    pub fn validate(&self) -> Result<(), LoadError> {
        let invalid = |reason: String| LoadError::Artifact {
            artifact: "classifier",
            reason,
        };

        if self.coef.is_empty() {
            return Err(invalid("no coefficients".to_string()));
        }
        if self.intercept.len() != self.coef.len() {
            return Err(invalid(format!(
                "{} intercepts for {} coefficient rows",
                self.intercept.len(),
                self.coef.len()
            )));
        }
        let d = self.width();
        if self.coef.iter().any(|row| row.len() != d) {
            return Err(invalid("ragged coefficient matrix".to_string()));
        }
        if let Some(classes) = &self.classes {
            if classes.len() != self.n_classes() {
                return Err(invalid(format!(
                    "{} class names for {} classes",
                    classes.len(),
                    self.n_classes()
                )));
            }
        }
        Ok(())
    }

    fn width(&self) -> usize {
        self.coef.first().map(Vec::len).unwrap_or(0)
    }

    pub fn n_classes(&self) -> usize {
        if self.coef.len() == 1 {
            2
        } else {
            self.coef.len()
        }
    }

    fn decision(&self, x: ArrayView2<'_, f64>) -> Array2<f64> {
        let w = Array2::from_shape_fn((self.coef.len(), self.width()), |(i, j)| self.coef[i][j]);
        x.dot(&w.t()) + &Array1::from_vec(self.intercept.clone())
    }

    /// Binary: [1 - sigmoid, sigmoid]; multiclass: softmax
    fn probabilities(&self, scores: &Array2<f64>) -> Array2<f64> {
        if self.coef.len() == 1 {
            let n = scores.nrows();
            let mut p = Array2::zeros((n, 2));
            for (i, s) in scores.column(0).iter().enumerate() {
                let pos = 1.0 / (1.0 + (-s).exp());
                p[[i, 0]] = 1.0 - pos;
                p[[i, 1]] = pos;
            }
            return p;
        }

        let mut p = scores.clone();
        for mut row in p.axis_iter_mut(Axis(0)) {
            let max = row.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            row.mapv_inplace(|v| (v - max).exp());
            let sum = row.sum();
            row.mapv_inplace(|v| v / sum);
        }
        p
    }
}

impl Classifier for LinearClassifier {
    fn name(&self) -> &str {
        "linear"
    }

    fn n_features(&self) -> Option<usize> {
        Some(self.width())
    }

    fn classes(&self) -> Option<&[String]> {
        self.classes.as_deref()
    }

    fn class_count(&self) -> Option<usize> {
        Some(self.n_classes())
    }

    fn infer(&self, features: ArrayView2<'_, f64>) -> Result<ClassifierOutput, InferenceError> {
        if features.ncols() != self.width() {
            return Err(InferenceError::new(
                Stage::Classify,
                format!("expected {} features, got {}", self.width(), features.ncols()),
            ));
        }

        let scores = self.decision(features);
        let indices: Vec<i64> = if self.coef.len() == 1 {
            scores.column(0).iter().map(|s| i64::from(*s > 0.0)).collect()
        } else {
            scores
                .axis_iter(Axis(0))
                .map(|row| argmax(row.iter().copied()) as i64)
                .collect()
        };

        let labels = match &self.classes {
            Some(names) => RawLabels::TextLabel(
                indices.iter().map(|&i| names[i as usize].clone()).collect(),
            ),
            None => RawLabels::EncodedIndex(indices),
        };

        let probabilities = self.probability.then(|| self.probabilities(&scores));

        Ok(ClassifierOutput {
            labels,
            probabilities,
        })
    }
}

/// First index of the maximum (ties -> lowest index)
fn argmax(values: impl Iterator<Item = f64>) -> usize {
    let mut best = 0;
    let mut best_val = f64::NEG_INFINITY;
    for (i, v) in values.enumerate() {
        if v > best_val {
            best = i;
            best_val = v;
        }
    }
    best
}

// ============================================================================
// ONNX IMPLEMENTATION
// ============================================================================

/// Tên output theo quy ước của converter (sklearn-onnx)
const LABEL_OUTPUT: &str = "label";
const PROBABILITY_OUTPUT: &str = "probabilities";

/// ONNX Runtime session. `Session::run` needs `&mut`, hence the mutex.
pub struct OnnxClassifier {
    session: Mutex<Session>,
    model_path: PathBuf,
    label_output: String,
    probability_output: Option<String>,
}

impl OnnxClassifier {
    /// Load ONNX model từ file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        log::info!("Loading ONNX classifier from: {}", path.display());

        if !path.exists() {
            return Err(LoadError::Io {
                path: path.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "model not found"),
            });
        }

        let session = Session::builder()
            .map_err(|e| onnx_load_error(path, e))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| onnx_load_error(path, e))?
            .commit_from_file(path)
            .map_err(|e| onnx_load_error(path, e))?;

        let names: Vec<String> = session.outputs.iter().map(|o| o.name.clone()).collect();
        let label_output = names
            .iter()
            .find(|n| n.as_str() == LABEL_OUTPUT)
            .or_else(|| names.first())
            .cloned()
            .ok_or_else(|| LoadError::Artifact {
                artifact: "classifier",
                reason: "ONNX model defines no outputs".to_string(),
            })?;
        let probability_output = names
            .iter()
            .find(|n| n.as_str() == PROBABILITY_OUTPUT)
            .or_else(|| names.iter().find(|n| **n != label_output))
            .cloned();

        log::info!(
            "ONNX classifier loaded (label output '{}', probability output {:?})",
            label_output,
            probability_output
        );

        Ok(Self {
            session: Mutex::new(session),
            model_path: path.to_path_buf(),
            label_output,
            probability_output,
        })
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }
}

fn classify_error(e: impl std::fmt::Display) -> InferenceError {
    InferenceError::new(Stage::Classify, e.to_string())
}

fn onnx_load_error(path: &Path, e: impl std::fmt::Display) -> LoadError {
    LoadError::Onnx {
        path: path.to_path_buf(),
        source: e.to_string().into(),
    }
}

impl Classifier for OnnxClassifier {
    fn name(&self) -> &str {
        "onnx"
    }

    fn n_features(&self) -> Option<usize> {
        None
    }

    fn classes(&self) -> Option<&[String]> {
        None
    }

    fn infer(&self, features: ArrayView2<'_, f64>) -> Result<ClassifierOutput, InferenceError> {
        let input = features.mapv(|v| v as f32);
        let n_rows = input.nrows();
        let input_tensor = Value::from_array(input).map_err(classify_error)?;

        let mut session = self.session.lock();
        let outputs = session.run(ort::inputs![input_tensor]).map_err(classify_error)?;

        let label_value = outputs.get(&self.label_output).ok_or_else(|| {
            InferenceError::new(
                Stage::Classify,
                format!("missing output '{}'", self.label_output),
            )
        })?;

        let labels = match label_value.try_extract_tensor::<i64>() {
            Ok((_, data)) => RawLabels::EncodedIndex(data.to_vec()),
            Err(_) => {
                let (_, data) = label_value.try_extract_strings().map_err(classify_error)?;
                RawLabels::TextLabel(data)
            }
        };

        let probabilities = match self.probability_output.as_ref().and_then(|name| outputs.get(name)) {
            Some(value) => match value.try_extract_tensor::<f32>() {
                Ok((shape, data)) if shape.len() == 2 && shape[0] as usize == n_rows => {
                    let n_classes = shape[1] as usize;
                    Array2::from_shape_vec(
                        (n_rows, n_classes),
                        data.iter().map(|p| *p as f64).collect(),
                    )
                    .ok()
                }
                Ok(_) | Err(_) => {
                    log::warn!("Probability output is not a rows x classes tensor, ignoring it");
                    None
                }
            },
            None => None,
        };

        Ok(ClassifierOutput {
            labels,
            probabilities,
        })
    }
}

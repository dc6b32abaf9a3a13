//! Model Artifact Bundle
//!
//! Scaler + reducer + classifier + label encoder + feature schema, loaded
//! eagerly, all-or-nothing, once at startup. Immutable afterwards; share it
//! across callers with `Arc`.
//!
//! OPERATIONAL PRECONDITION: all five files must come from the same
//! training run. Mixing runs is undefined behavior. Shape checks below
//! catch the obvious cases; an optional `manifest.json` with SHA-256
//! checksums pins the exact files of a run, nothing else can prove it.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::artifacts::{read_json_artifact, LabelEncoder, PcaReducer, StandardScaler};
use super::classifier::{load_classifier, Classifier};
use crate::constants;
use crate::logic::error::LoadError;
use crate::logic::features::FeatureSchema;

// ============================================================================
// PATHS + MANIFEST
// ============================================================================

/// Optional `manifest.json` shipped next to the artifacts
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BundleManifest {
    #[serde(default)]
    pub run_id: Option<String>,
    #[serde(default)]
    pub files: ManifestFiles,
    /// file name -> hex SHA-256
    #[serde(default)]
    pub sha256: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ManifestFiles {
    pub scaler: Option<String>,
    pub reducer: Option<String>,
    pub classifier: Option<String>,
    pub label_encoder: Option<String>,
    pub feature_columns: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundlePaths {
    pub scaler: PathBuf,
    pub reducer: PathBuf,
    pub classifier: PathBuf,
    pub label_encoder: PathBuf,
    pub feature_columns: PathBuf,
    pub run_id: Option<String>,
    /// path -> expected hex SHA-256
    pub checksums: BTreeMap<PathBuf, String>,
}

impl BundlePaths {
    /// Default file names inside `dir`, overridden by `manifest.json` if present
    pub fn in_dir(dir: impl AsRef<Path>) -> Result<Self, LoadError> {
        let dir = dir.as_ref();
        let manifest_path = dir.join(constants::MANIFEST_FILE);
        let manifest: BundleManifest = if manifest_path.exists() {
            log::info!("Using bundle manifest {}", manifest_path.display());
            read_json_artifact(&manifest_path)?
        } else {
            BundleManifest::default()
        };

        let pick = |name: &Option<String>, default: &str| dir.join(name.as_deref().unwrap_or(default));

        let classifier = match &manifest.files.classifier {
            Some(name) => dir.join(name),
            None => {
                let onnx = dir.join(constants::CLASSIFIER_ONNX_FILE);
                if onnx.exists() {
                    onnx
                } else {
                    dir.join(constants::CLASSIFIER_JSON_FILE)
                }
            }
        };

        Ok(Self {
            scaler: pick(&manifest.files.scaler, constants::SCALER_FILE),
            reducer: pick(&manifest.files.reducer, constants::REDUCER_FILE),
            classifier,
            label_encoder: pick(&manifest.files.label_encoder, constants::LABEL_ENCODER_FILE),
            feature_columns: pick(&manifest.files.feature_columns, constants::FEATURE_COLUMNS_FILE),
            run_id: manifest.run_id,
            checksums: manifest
                .sha256
                .into_iter()
                .map(|(file, digest)| (dir.join(file), digest))
                .collect(),
        })
    }

    fn all(&self) -> [&Path; 5] {
        [
            self.feature_columns.as_path(),
            self.scaler.as_path(),
            self.reducer.as_path(),
            self.classifier.as_path(),
            self.label_encoder.as_path(),
        ]
    }

    /// Verify every listed checksum
    pub fn verify_checksums(&self) -> Result<(), LoadError> {
        for (path, expected) in &self.checksums {
            let actual = sha256_file(path)?;
            if !actual.eq_ignore_ascii_case(expected.trim()) {
                return Err(LoadError::Checksum {
                    path: path.clone(),
                    expected: expected.clone(),
                    actual,
                });
            }
            log::debug!("Checksum OK: {}", path.display());
        }

        let unlisted: Vec<_> = self
            .all()
            .into_iter()
            .filter(|p| !self.checksums.contains_key(*p))
            .collect();
        if !self.checksums.is_empty() && !unlisted.is_empty() {
            log::warn!("Manifest lists no checksum for {:?}", unlisted);
        }
        Ok(())
    }
}

/// Hex SHA-256 of a file
pub fn sha256_file(path: &Path) -> Result<String, LoadError> {
    let bytes = std::fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(hex::encode(hasher.finalize()))
}

// ============================================================================
// METADATA
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleMetadata {
    pub run_id: Option<String>,
    pub classifier: String,
    pub layout_hash: u32,
    pub feature_count: usize,
    pub n_components: usize,
    pub class_count: usize,
    pub loaded_at: chrono::DateTime<chrono::Utc>,
}

// ============================================================================
// BUNDLE
// ============================================================================

pub struct ModelArtifactBundle {
    schema: FeatureSchema,
    scaler: StandardScaler,
    reducer: PcaReducer,
    classifier: Box<dyn Classifier>,
    encoder: LabelEncoder,
    metadata: BundleMetadata,
}

impl ModelArtifactBundle {
    /// Load every artifact; any failure aborts the whole load
    pub fn load(paths: &BundlePaths) -> Result<Self, LoadError> {
        log::info!("Loading model bundle (classifier: {})", paths.classifier.display());

        paths.verify_checksums()?;

        let schema = FeatureSchema::from_file(&paths.feature_columns)?;
        let scaler = StandardScaler::from_json_file(&paths.scaler)?;
        let reducer = PcaReducer::from_json_file(&paths.reducer)?;
        let encoder = LabelEncoder::from_json_file(&paths.label_encoder)?;
        let classifier = load_classifier(&paths.classifier)?;

        let mut bundle = Self::from_parts(schema, scaler, reducer, classifier, encoder)?;
        bundle.metadata.run_id = paths.run_id.clone();

        log::info!(
            "Model bundle ready: {} features -> {} components -> {} classes ({})",
            bundle.metadata.feature_count,
            bundle.metadata.n_components,
            bundle.metadata.class_count,
            bundle.metadata.classifier
        );
        Ok(bundle)
    }

    /// Load from a directory using default names / manifest
    pub fn load_dir(dir: impl AsRef<Path>) -> Result<Self, LoadError> {
        Self::load(&BundlePaths::in_dir(dir)?)
    }

    /// Assemble from in-memory components (same shape checks as `load`)
    pub fn from_parts(
        schema: FeatureSchema,
        scaler: StandardScaler,
        reducer: PcaReducer,
        classifier: Box<dyn Classifier>,
        encoder: LabelEncoder,
    ) -> Result<Self, LoadError> {
        scaler.validate()?;
        reducer.validate()?;

        if scaler.n_features() != schema.len() {
            return Err(LoadError::ShapeMismatch(format!(
                "scaler fitted on {} features, schema lists {}",
                scaler.n_features(),
                schema.len()
            )));
        }
        if reducer.n_features() != schema.len() {
            return Err(LoadError::ShapeMismatch(format!(
                "reducer expects {} features, schema lists {}",
                reducer.n_features(),
                schema.len()
            )));
        }
        if let Some(width) = classifier.n_features() {
            if width != reducer.n_components() {
                return Err(LoadError::ShapeMismatch(format!(
                    "classifier expects {} inputs, reducer yields {} components",
                    width,
                    reducer.n_components()
                )));
            }
        }
        // index-emitting classifier: class count must match the encoder
        if classifier.classes().is_none() {
            if let Some(count) = classifier.class_count() {
                if count != encoder.classes().len() {
                    return Err(LoadError::ShapeMismatch(format!(
                        "classifier emits {} classes, label encoder knows {}",
                        count,
                        encoder.classes().len()
                    )));
                }
            }
        }
        if let Some(classes) = classifier.classes() {
            if classes != encoder.classes() {
                log::warn!(
                    "Classifier classes {:?} differ from label encoder classes {:?}",
                    classes,
                    encoder.classes()
                );
            }
        }

        let metadata = BundleMetadata {
            run_id: None,
            classifier: classifier.name().to_string(),
            layout_hash: schema.layout_hash(),
            feature_count: schema.len(),
            n_components: reducer.n_components(),
            class_count: encoder.classes().len(),
            loaded_at: chrono::Utc::now(),
        };

        Ok(Self {
            schema,
            scaler,
            reducer,
            classifier,
            encoder,
            metadata,
        })
    }

    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.metadata.run_id = Some(run_id.into());
        self
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn scaler(&self) -> &StandardScaler {
        &self.scaler
    }

    pub fn reducer(&self) -> &PcaReducer {
        &self.reducer
    }

    pub fn classifier(&self) -> &dyn Classifier {
        self.classifier.as_ref()
    }

    pub fn encoder(&self) -> &LabelEncoder {
        &self.encoder
    }

    pub fn metadata(&self) -> &BundleMetadata {
        &self.metadata
    }
}

impl std::fmt::Debug for ModelArtifactBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelArtifactBundle")
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

//! Integration Tests for the Inference Pipeline
//!
//! Tests bundle + normalizer + classifier + decode chạy end-to-end.

#[cfg(test)]
mod integration_tests {
    use ndarray::{Array2, ArrayView2};

    use crate::constants::{EXPLANATION_MODEL, EXPLANATION_OVERRIDE};
    use crate::logic::error::{Error, InferenceError, InputError, Stage};
    use crate::logic::features::{FeatureSchema, RawTable, SchemaRules};
    use crate::logic::model::{
        classify, Classifier, ClassifierOutput, LabelEncoder, LinearClassifier, ModelArtifactBundle,
        PcaReducer, PredictOptions, RawLabels, StandardScaler,
    };

    // ========================================================================
    // FIXTURES
    // ========================================================================

    /// Test double: fixed labels/probabilities regardless of input
    struct FixedClassifier {
        labels: RawLabels,
        probabilities: Option<Array2<f64>>,
        classes: Option<Vec<String>>,
    }

    impl Classifier for FixedClassifier {
        fn name(&self) -> &str {
            "fixed"
        }

        fn n_features(&self) -> Option<usize> {
            None
        }

        fn classes(&self) -> Option<&[String]> {
            self.classes.as_deref()
        }

        fn infer(&self, features: ArrayView2<'_, f64>) -> Result<ClassifierOutput, InferenceError> {
            if features.nrows() != self.labels.len() {
                return Err(InferenceError::new(Stage::Classify, "unexpected row count"));
            }
            Ok(ClassifierOutput {
                labels: self.labels.clone(),
                probabilities: self.probabilities.clone(),
            })
        }
    }

    fn schema() -> FeatureSchema {
        FeatureSchema::new(["Flow Duration", "Packet Length Mean"]).unwrap()
    }

    fn identity_parts() -> (StandardScaler, PcaReducer) {
        let scaler = StandardScaler {
            mean: Some(vec![0.0, 0.0]),
            scale: Some(vec![1.0, 1.0]),
        };
        let reducer = PcaReducer {
            mean: vec![0.0, 0.0],
            components: vec![vec![1.0, 0.0], vec![0.0, 1.0]],
            whiten: false,
            explained_variance: None,
        };
        (scaler, reducer)
    }

    fn bundle_with(classifier: Box<dyn Classifier>) -> ModelArtifactBundle {
        let (scaler, reducer) = identity_parts();
        ModelArtifactBundle::from_parts(
            schema(),
            scaler,
            reducer,
            classifier,
            LabelEncoder::new(["BENIGN", "DDoS"]),
        )
        .unwrap()
    }

    /// Feature 0 high -> BENIGN, feature 1 high -> DDoS
    fn linear_bundle(probability: bool) -> ModelArtifactBundle {
        bundle_with(Box::new(LinearClassifier {
            coef: vec![vec![1.0, 0.0], vec![0.0, 1.0]],
            intercept: vec![0.0, 0.0],
            classes: None,
            probability,
        }))
    }

    fn csv(text: &str) -> RawTable {
        RawTable::from_csv_bytes(text.as_bytes()).unwrap()
    }

    // ========================================================================
    // MODEL PATH
    // ========================================================================

    #[test]
    fn test_one_record_per_row_in_order() {
        let bundle = linear_bundle(true);
        let raw = csv("Packet Length Mean,Flow Duration\n9,0\n0,9\n5,1\n");

        let result = classify(&bundle, &raw, &SchemaRules::default(), &PredictOptions::default()).unwrap();

        let labels: Vec<&str> = result.records.iter().map(|r| r.predicted_label.as_str()).collect();
        assert_eq!(labels, vec!["DDoS", "BENIGN", "DDoS"]);
        for record in &result.records {
            let c = record.confidence_score.unwrap();
            assert!((0.0..=1.0).contains(&c));
            assert!(c > 0.5);
            assert_eq!(record.explanation, EXPLANATION_MODEL);
        }
    }

    #[test]
    fn test_no_probability_support_gives_absent_confidence() {
        let bundle = linear_bundle(false);
        let raw = csv("Flow Duration,Packet Length Mean\n1,0\n0,1\n");

        let result = classify(&bundle, &raw, &SchemaRules::default(), &PredictOptions::default()).unwrap();
        assert_eq!(result.records.len(), 2);
        assert!(result.records.iter().all(|r| r.confidence_score.is_none()));
    }

    #[test]
    fn test_label_column_present_does_not_bypass_model() {
        let bundle = linear_bundle(true);
        let raw = csv("Flow Duration,Packet Length Mean,Label\n9,0,DDoS\n9,0,DDoS\n");

        let result = classify(&bundle, &raw, &SchemaRules::default(), &PredictOptions::default()).unwrap();
        assert!(result.records.iter().all(|r| r.predicted_label == "BENIGN"));
        assert!(result.records.iter().all(|r| r.explanation == EXPLANATION_MODEL));
    }

    #[test]
    fn test_unknown_label_confidence_uses_row_max() {
        let bundle = bundle_with(Box::new(FixedClassifier {
            labels: RawLabels::TextLabel(vec!["Bot".into()]),
            probabilities: Some(ndarray::array![[0.25, 0.75]]),
            classes: None,
        }));
        let raw = csv("Flow Duration,Packet Length Mean\n1,2\n");

        let result = classify(&bundle, &raw, &SchemaRules::default(), &PredictOptions::default()).unwrap();
        assert_eq!(result.records[0].predicted_label, "Bot");
        assert_eq!(result.records[0].confidence_score, Some(0.75));
    }

    #[test]
    fn test_confidence_clamped_and_nan_zeroed() {
        let bundle = bundle_with(Box::new(FixedClassifier {
            labels: RawLabels::TextLabel(vec!["BENIGN".into(), "DDoS".into()]),
            probabilities: Some(ndarray::array![[1.3, f64::NAN], [1.3, f64::NAN]]),
            classes: None,
        }));
        let raw = csv("Flow Duration,Packet Length Mean\n1,2\n3,4\n");

        let result = classify(&bundle, &raw, &SchemaRules::default(), &PredictOptions::default()).unwrap();
        assert_eq!(result.records[0].confidence_score, Some(1.0));
        assert_eq!(result.records[1].confidence_score, Some(0.0));
        for record in &result.records {
            let c = record.confidence_score.unwrap();
            assert!((0.0..=1.0).contains(&c));
        }
    }

    #[test]
    fn test_encoded_index_out_of_range_is_decode_error() {
        let bundle = bundle_with(Box::new(FixedClassifier {
            labels: RawLabels::EncodedIndex(vec![7]),
            probabilities: None,
            classes: None,
        }));
        let raw = csv("Flow Duration,Packet Length Mean\n1,2\n");

        let err = classify(&bundle, &raw, &SchemaRules::default(), &PredictOptions::default()).unwrap_err();
        assert!(matches!(err, Error::Inference(InferenceError { stage: Stage::Decode, .. })));
    }

    #[test]
    fn test_classifier_row_count_drift_is_inference_error() {
        let bundle = bundle_with(Box::new(FixedClassifier {
            labels: RawLabels::TextLabel(vec!["BENIGN".into()]),
            probabilities: None,
            classes: None,
        }));
        let raw = csv("Flow Duration,Packet Length Mean\n1,2\n3,4\n");

        let err = classify(&bundle, &raw, &SchemaRules::default(), &PredictOptions::default()).unwrap_err();
        assert!(matches!(err, Error::Inference(_)));
    }

    #[test]
    fn test_empty_table_is_input_error() {
        let bundle = linear_bundle(true);
        let raw = csv("Flow Duration,Packet Length Mean\n");

        let err = classify(&bundle, &raw, &SchemaRules::default(), &PredictOptions::default()).unwrap_err();
        assert!(matches!(err, Error::Input(InputError::Empty)));
    }

    // ========================================================================
    // DIAGNOSTIC OVERRIDE
    // ========================================================================

    #[test]
    fn test_override_reports_dominant_label() {
        let bundle = linear_bundle(true);
        let raw = csv("Flow Duration,Packet Length Mean,Attack Type\n9,0,DDoS\n9,0,DDoS\n0,9,Normal\n");
        let options = PredictOptions { diagnostic_override: true };

        let result = classify(&bundle, &raw, &SchemaRules::default(), &options).unwrap();
        assert_eq!(result.records.len(), 3);
        for record in &result.records {
            assert_eq!(record.predicted_label, "DDoS");
            assert_eq!(record.confidence_score, Some(1.0));
            assert_eq!(record.explanation, EXPLANATION_OVERRIDE);
        }
    }

    #[test]
    fn test_override_without_label_column_runs_model() {
        let bundle = linear_bundle(true);
        let raw = csv("Flow Duration,Packet Length Mean\n0,9\n");
        let options = PredictOptions { diagnostic_override: true };

        let result = classify(&bundle, &raw, &SchemaRules::default(), &options).unwrap();
        assert_eq!(result.records[0].predicted_label, "DDoS");
        assert_eq!(result.records[0].explanation, EXPLANATION_MODEL);
    }

    // ========================================================================
    // BUNDLE SHAPES
    // ========================================================================

    #[test]
    fn test_bundle_rejects_scaler_width_mismatch() {
        let (_, reducer) = identity_parts();
        let scaler = StandardScaler {
            mean: Some(vec![0.0, 0.0, 0.0]),
            scale: Some(vec![1.0, 1.0, 1.0]),
        };
        let result = ModelArtifactBundle::from_parts(
            schema(),
            scaler,
            reducer,
            Box::new(LinearClassifier {
                coef: vec![vec![1.0, 0.0], vec![0.0, 1.0]],
                intercept: vec![0.0, 0.0],
                classes: None,
                probability: true,
            }),
            LabelEncoder::new(["BENIGN", "DDoS"]),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_metadata_reflects_parts() {
        let bundle = linear_bundle(true).with_run_id("run-42");
        let meta = bundle.metadata();
        assert_eq!(meta.run_id.as_deref(), Some("run-42"));
        assert_eq!(meta.feature_count, 2);
        assert_eq!(meta.n_components, 2);
        assert_eq!(meta.class_count, 2);
        assert_eq!(meta.layout_hash, bundle.schema().layout_hash());
    }
}

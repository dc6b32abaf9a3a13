//! Router tests (in-memory bundle, no network)

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

use ndarray::ArrayView2;

use flowguard_core::logic::model::{
    Classifier, ClassifierOutput, LabelEncoder, LinearClassifier, PcaReducer, RawLabels, StandardScaler,
};
use flowguard_core::{FeatureSchema, InferenceError, ModelArtifactBundle, SchemaRules};

use crate::config::Config;
use crate::{create_router, AppState};

const BOUNDARY: &str = "flowguard-test-boundary";

/// Emits a label index the encoder does not know
struct OutOfRangeClassifier;

impl Classifier for OutOfRangeClassifier {
    fn name(&self) -> &str {
        "out-of-range"
    }

    fn n_features(&self) -> Option<usize> {
        None
    }

    fn classes(&self) -> Option<&[String]> {
        None
    }

    fn infer(&self, features: ArrayView2<'_, f64>) -> Result<ClassifierOutput, InferenceError> {
        Ok(ClassifierOutput {
            labels: RawLabels::EncodedIndex(vec![2; features.nrows()]),
            probabilities: None,
        })
    }
}

fn bundle() -> ModelArtifactBundle {
    bundle_with(Box::new(LinearClassifier {
        coef: vec![vec![1.0, 0.0], vec![0.0, 1.0]],
        intercept: vec![0.0, 0.0],
        classes: None,
        probability: true,
    }))
}

fn bundle_with(classifier: Box<dyn Classifier>) -> ModelArtifactBundle {
    ModelArtifactBundle::from_parts(
        FeatureSchema::new(["Flow Duration", "Packet Length Mean"]).unwrap(),
        StandardScaler {
            mean: Some(vec![0.0, 0.0]),
            scale: Some(vec![1.0, 1.0]),
        },
        PcaReducer {
            mean: vec![0.0, 0.0],
            components: vec![vec![1.0, 0.0], vec![0.0, 1.0]],
            whiten: false,
            explained_variance: None,
        },
        classifier,
        LabelEncoder::new(["BENIGN", "DDoS"]),
    )
    .unwrap()
}

fn app(allow_override: bool) -> Router {
    app_with(bundle(), allow_override)
}

fn app_with(bundle: ModelArtifactBundle, allow_override: bool) -> Router {
    let config = Config {
        allow_diagnostic_override: allow_override,
        ..Config::default()
    };
    create_router(AppState {
        bundle: Arc::new(bundle),
        rules: Arc::new(SchemaRules::default()),
        config,
    })
}

fn multipart_request(uri: &str, field: &str, csv: &str) -> Request<Body> {
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"flows.csv\"\r\n\
         Content-Type: text/csv\r\n\r\n{csv}\r\n--{b}--\r\n",
        b = BOUNDARY,
        field = field,
        csv = csv,
    );
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_root_and_health() {
    let response = app(false)
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app(false)
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["model"]["feature_count"], 2);
}

#[tokio::test]
async fn test_predict_returns_summary() {
    let csv = "Flow Duration,Packet Length Mean,Src IP\n9,0,10.0.0.1\n0,9,10.0.0.2\n0,9,10.0.0.3\n";
    let response = tokio_test::assert_ok!(
        app(false).oneshot(multipart_request("/predict", "csv_file", csv)).await
    );
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["total_flows"], 3);
    assert_eq!(json["attack_counts"]["DDoS"], 2);
    assert_eq!(json["attack_counts"]["BENIGN"], 1);
    assert_eq!(json["detailed_results"].as_array().unwrap().len(), 3);
    assert_eq!(json["detailed_results"][0]["predicted_label"], "BENIGN");

    let avg = json["summary_stats"]["average_confidence"].as_f64().unwrap();
    assert!((0.0..=1.0).contains(&avg));
}

#[tokio::test]
async fn test_predict_empty_table_is_400() {
    let response = app(false)
        .oneshot(multipart_request("/predict", "csv_file", "Flow Duration,Packet Length Mean\n"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert_eq!(json["status"], 400);
}

#[tokio::test]
async fn test_predict_missing_field_is_400() {
    let response = app(false)
        .oneshot(multipart_request("/predict", "file", "Flow Duration\n1\n"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_override_forbidden_unless_enabled() {
    let csv = "Flow Duration,Packet Length Mean,Attack Type\n9,0,DDoS\n9,0,DDoS\n0,9,Normal\n";

    let response = app(false)
        .oneshot(multipart_request("/predict?diagnostic_override=true", "csv_file", csv))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app(true)
        .oneshot(multipart_request("/predict?diagnostic_override=true", "csv_file", csv))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["attack_counts"]["DDoS"], 3);
    assert_eq!(json["summary_stats"]["min_confidence"], 1.0);
}

#[tokio::test]
async fn test_label_column_alone_does_not_override() {
    let csv = "Flow Duration,Packet Length Mean,Attack Type\n9,0,DDoS\n";
    let response = app(true)
        .oneshot(multipart_request("/predict", "csv_file", csv))
        .await
        .unwrap();
    let json = json_body(response).await;
    assert_eq!(json["detailed_results"][0]["predicted_label"], "BENIGN");
}

#[tokio::test]
async fn test_inference_failure_reports_cause() {
    let csv = "Flow Duration,Packet Length Mean\n-5,-5\n";
    let response = app_with(bundle_with(Box::new(OutOfRangeClassifier)), false)
        .oneshot(multipart_request("/predict", "csv_file", csv))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let json = json_body(response).await;
    let message = json["error"].as_str().unwrap();
    assert!(message.starts_with("Prediction failed: "));
    assert!(message.contains("decode"));
    assert!(message.contains("label index 2"));
    assert_eq!(json["status"], 500);
}

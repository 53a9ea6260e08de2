//! HTTP client for the face service: detection and similarity queries.

use crate::wire::{
    DetectedFace, ErrorBody, FindSimilarRequest, SimilarFace, FACE_ATTRIBUTES, FIND_SIMILAR_MODE,
};
use facematch_core::{
    DetectOptions, Face, FaceDetector, FaceSet, ImageSource, SimilarCandidate, SimilarityOracle,
};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use url::Url;

const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";
const API_PATH: &str = "face/v1.0/";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_CANDIDATES: u32 = 20;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("invalid endpoint {0:?}: expected an http(s) URL such as https://<region>.api.cognitive.microsoft.com")]
    InvalidEndpoint(String),
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("face service returned {status}: {code} {message}")]
    Api {
        status: StatusCode,
        code: String,
        message: String,
    },
    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Connection settings for [`FaceClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub endpoint: String,
    pub subscription_key: String,
    pub timeout: Duration,
    /// Upper bound on `findsimilars` results per query.
    pub max_candidates: u32,
}

impl ClientConfig {
    pub fn new(endpoint: impl Into<String>, subscription_key: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            subscription_key: subscription_key.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_candidates: DEFAULT_MAX_CANDIDATES,
        }
    }
}

/// Face service client. Implements both [`FaceDetector`] and
/// [`SimilarityOracle`].
#[derive(Debug, Clone)]
pub struct FaceClient {
    http: Client,
    api_base: Url,
    subscription_key: String,
    max_candidates: u32,
}

impl FaceClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ServiceError> {
        let api_base = normalize_endpoint(&config.endpoint)?
            .join(API_PATH)
            .map_err(|_| ServiceError::InvalidEndpoint(config.endpoint.clone()))?;
        let http = Client::builder().timeout(config.timeout).build()?;

        tracing::debug!(api_base = %api_base, "face client ready");

        Ok(Self {
            http,
            api_base,
            subscription_key: config.subscription_key.clone(),
            max_candidates: config.max_candidates,
        })
    }

    /// Detect faces in an image the service downloads itself.
    pub async fn detect_with_url(
        &self,
        image_url: &Url,
        options: DetectOptions,
    ) -> Result<FaceSet, ServiceError> {
        let request = self
            .post("detect")?
            .query(&detect_params(options))
            .json(&serde_json::json!({ "url": image_url.as_str() }));
        self.detect_request(request).await
    }

    /// Detect faces in image bytes uploaded with the request.
    pub async fn detect_with_stream(
        &self,
        image: Vec<u8>,
        options: DetectOptions,
    ) -> Result<FaceSet, ServiceError> {
        let request = self
            .post("detect")?
            .query(&detect_params(options))
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(image);
        self.detect_request(request).await
    }

    /// Raw image bytes, downloaded or read from disk.
    pub async fn fetch_image(&self, source: &ImageSource) -> Result<Vec<u8>, ServiceError> {
        match source {
            ImageSource::Url(url) => {
                let response = self.http.get(url.clone()).send().await?.error_for_status()?;
                Ok(response.bytes().await?.to_vec())
            }
            ImageSource::File(path) => read_file(path).await,
        }
    }

    async fn detect_request(&self, request: RequestBuilder) -> Result<FaceSet, ServiceError> {
        let start = std::time::Instant::now();
        let faces: Vec<DetectedFace> = self.send(request).await?;
        tracing::info!(
            faces = faces.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "detection finished"
        );
        Ok(faces.into_iter().map(Face::from).collect::<Vec<_>>().into())
    }

    fn post(&self, operation: &str) -> Result<RequestBuilder, ServiceError> {
        let url = self
            .api_base
            .join(operation)
            .map_err(|_| ServiceError::InvalidEndpoint(self.api_base.to_string()))?;
        Ok(self
            .http
            .post(url)
            .header(SUBSCRIPTION_KEY_HEADER, &self.subscription_key))
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ServiceError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let (code, message) = match serde_json::from_str::<ErrorBody>(&body) {
                Ok(parsed) => (parsed.error.code, parsed.error.message),
                Err(_) => (String::new(), body),
            };
            tracing::warn!(%status, code = %code, "face service error");
            return Err(ServiceError::Api { status, code, message });
        }

        Ok(serde_json::from_str(&body)?)
    }
}

impl FaceDetector for FaceClient {
    type Error = ServiceError;

    async fn detect(
        &self,
        source: &ImageSource,
        options: DetectOptions,
    ) -> Result<FaceSet, ServiceError> {
        tracing::info!(source = %source, "detecting faces");
        match source {
            ImageSource::Url(url) => self.detect_with_url(url, options).await,
            ImageSource::File(path) => {
                let bytes = read_file(path).await?;
                self.detect_with_stream(bytes, options).await
            }
        }
    }
}

impl SimilarityOracle for FaceClient {
    type Error = ServiceError;

    async fn find_similar(
        &self,
        face_id: &str,
        candidate_ids: &[String],
    ) -> Result<Vec<SimilarCandidate>, ServiceError> {
        let body = FindSimilarRequest {
            face_id,
            face_ids: candidate_ids,
            max_num_of_candidates_returned: self.max_candidates,
            mode: FIND_SIMILAR_MODE,
        };
        let request = self.post("findsimilars")?.json(&body);
        let similar: Vec<SimilarFace> = self.send(request).await?;
        Ok(similar.into_iter().map(SimilarCandidate::from).collect())
    }
}

/// Reduce an endpoint to scheme, host and port.
///
/// Endpoints are often copied with the API path attached
/// (`https://westus.api.cognitive.microsoft.com/face/v1.0`).
pub fn normalize_endpoint(endpoint: &str) -> Result<Url, ServiceError> {
    let invalid = || ServiceError::InvalidEndpoint(endpoint.to_string());
    let mut url = Url::parse(endpoint.trim()).map_err(|_| invalid())?;
    if !matches!(url.scheme(), "http" | "https") || url.host().is_none() {
        return Err(invalid());
    }
    url.set_path("/");
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

fn detect_params(options: DetectOptions) -> Vec<(&'static str, &'static str)> {
    let mut params = vec![("returnFaceId", "true"), ("returnFaceLandmarks", "false")];
    if options.with_attributes {
        params.push(("returnFaceAttributes", FACE_ATTRIBUTES));
    }
    params
}

async fn read_file(path: &std::path::Path) -> Result<Vec<u8>, ServiceError> {
    tokio::fs::read(path).await.map_err(|source| ServiceError::Io {
        path: path.to_path_buf(),
        source,
    })
}

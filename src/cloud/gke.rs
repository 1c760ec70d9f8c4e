//! Google Kubernetes Engine REST client

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::{
    CloudClient, CloudError, CreateClusterRequest, ExternalCluster, OperationHandle,
    ProviderStatus,
};

/// Default Container Engine API endpoint
pub const DEFAULT_ENDPOINT: &str = "https://container.googleapis.com";

/// Upper bound for a single API request
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for the Container Engine v1 API scoped to one project
#[derive(Clone)]
pub struct GkeClient {
    http: Client,
    endpoint: String,
    project: String,
    access_token: String,
}

/// Cluster resource as returned by `projects.locations.clusters.get`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClusterResource {
    name: String,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    zone: Option<String>,
    #[serde(default)]
    status: String,
    #[serde(default)]
    current_node_count: Option<i32>,
    #[serde(default)]
    initial_node_count: Option<i32>,
}

/// Long-running operation returned by `projects.locations.clusters.create`
#[derive(Debug, Deserialize)]
struct Operation {
    name: String,
}

/// Google API error envelope
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

impl GkeClient {
    /// Create a client for `project` authenticating with a bearer token
    pub fn new(
        endpoint: impl Into<String>,
        project: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Result<Self, CloudError> {
        let http = Client::builder()
            .user_agent(concat!("gke-cluster-operator/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            project: project.into(),
            access_token: access_token.into(),
        })
    }

    fn clusters_url(&self, zone: &str) -> String {
        format!(
            "{}/v1/projects/{}/locations/{}/clusters",
            self.endpoint, self.project, zone
        )
    }
}

#[async_trait]
impl CloudClient for GkeClient {
    async fn get_cluster(&self, zone: &str, name: &str) -> Result<ExternalCluster, CloudError> {
        let url = format!("{}/{}", self.clusters_url(zone), name);
        debug!(url = %url, "Fetching GKE cluster");

        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(CloudError::NotFound {
                zone: zone.to_string(),
                name: name.to_string(),
            });
        }
        let cluster: ClusterResource = decode(check_status(response).await?).await?;

        Ok(ExternalCluster {
            zone: cluster
                .location
                .or(cluster.zone)
                .unwrap_or_else(|| zone.to_string()),
            status: ProviderStatus::parse(&cluster.status),
            node_count: cluster
                .current_node_count
                .or(cluster.initial_node_count)
                .unwrap_or(0),
            name: cluster.name,
        })
    }

    async fn create_cluster(
        &self,
        zone: &str,
        request: &CreateClusterRequest,
    ) -> Result<OperationHandle, CloudError> {
        let url = self.clusters_url(zone);
        debug!(url = %url, cluster = %request.name, "Creating GKE cluster");

        let body = json!({
            "cluster": {
                "name": request.name,
                "initialNodeCount": request.initial_node_count,
            }
        });
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await?;

        let operation: Operation = decode(check_status(response).await?).await?;
        Ok(OperationHandle(operation.name))
    }
}

/// Turn a non-success response into [`CloudError::Api`]
async fn check_status(response: Response) -> Result<Response, CloudError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(CloudError::Api {
        status: status.as_u16(),
        message: error_message(&body),
    })
}

/// Read a successful response body as `T`
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, CloudError> {
    let body = response.bytes().await?;
    serde_json::from_slice(&body).map_err(CloudError::Decode)
}

/// Extract the message from a Google error envelope, falling back to the raw body
fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) if !envelope.error.message.is_empty() => envelope.error.message,
        _ => body.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use http_body_util::{BodyExt, Full};
    use hyper::body::{Bytes, Incoming};
    use hyper::server::conn::http1;
    use hyper::service::service_fn;
    use hyper::{Request, Response as HttpResponse};
    use hyper_util::rt::TokioIo;
    use serde_json::Value;
    use tokio::net::TcpListener;

    use super::*;

    const CLUSTERS_PATH: &str = "/v1/projects/proj/locations/us-central1-a/clusters";

    type Captured = Arc<Mutex<Option<Value>>>;

    fn reply(status: u16, body: &'static str) -> HttpResponse<Full<Bytes>> {
        let mut response = HttpResponse::new(Full::new(Bytes::from_static(body.as_bytes())));
        *response.status_mut() = hyper::StatusCode::from_u16(status).unwrap();
        response
    }

    async fn respond(req: Request<Incoming>, captured: Captured) -> HttpResponse<Full<Bytes>> {
        let method = req.method().as_str().to_string();
        let path = req.uri().path().to_string();
        let body = req.into_body().collect().await.unwrap().to_bytes();

        let cluster = path.strip_prefix(CLUSTERS_PATH).unwrap_or_default();
        match (method.as_str(), cluster) {
            ("GET", "/demo") => reply(
                200,
                r#"{"name": "demo", "location": "us-central1-a",
                    "status": "PROVISIONING", "currentNodeCount": 3}"#,
            ),
            ("GET", "/missing") => reply(
                404,
                r#"{"error": {"code": 404, "message": "Not found", "status": "NOT_FOUND"}}"#,
            ),
            ("GET", "/flaky") => reply(
                500,
                r#"{"error": {"code": 500, "message": "googleapi: Error 404"}}"#,
            ),
            ("GET", "/garbled") => reply(200, "<html>maintenance</html>"),
            ("POST", "") => {
                *captured.lock().unwrap() = serde_json::from_slice(&body).ok();
                reply(200, r#"{"name": "operation-1234", "status": "RUNNING"}"#)
            }
            _ => reply(400, "unexpected request"),
        }
    }

    /// Serve a canned Container Engine API on a local port
    async fn fake_api() -> (GkeClient, Captured) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let captured: Captured = Arc::new(Mutex::new(None));

        let seen = captured.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let seen = seen.clone();
                tokio::spawn(async move {
                    let service = service_fn(move |req| {
                        let seen = seen.clone();
                        async move { Ok::<_, hyper::Error>(respond(req, seen).await) }
                    });
                    let _ = http1::Builder::new()
                        .serve_connection(TokioIo::new(stream), service)
                        .await;
                });
            }
        });

        let client = GkeClient::new(format!("http://{}", addr), "proj", "token").unwrap();
        (client, captured)
    }

    #[tokio::test]
    async fn get_cluster_parses_api_payload() {
        let (client, _) = fake_api().await;

        let cluster = client.get_cluster("us-central1-a", "demo").await.unwrap();

        assert_eq!(cluster.name, "demo");
        assert_eq!(cluster.zone, "us-central1-a");
        assert_eq!(cluster.status, ProviderStatus::Provisioning);
        assert_eq!(cluster.node_count, 3);
    }

    #[tokio::test]
    async fn http_404_is_not_found() {
        let (client, _) = fake_api().await;

        let err = client.get_cluster("us-central1-a", "missing").await.unwrap_err();

        assert!(err.is_not_found());
        assert!(matches!(err, CloudError::NotFound { ref name, .. } if name == "missing"));
    }

    #[tokio::test]
    async fn not_found_text_in_server_error_stays_api_error() {
        let (client, _) = fake_api().await;

        let err = client.get_cluster("us-central1-a", "flaky").await.unwrap_err();

        assert!(!err.is_not_found());
        match err {
            CloudError::Api { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "googleapi: Error 404");
            }
            other => panic!("expected Api error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn malformed_success_body_is_decode_error() {
        let (client, _) = fake_api().await;

        let err = client.get_cluster("us-central1-a", "garbled").await.unwrap_err();

        assert!(matches!(err, CloudError::Decode(_)));
    }

    #[tokio::test]
    async fn create_cluster_posts_name_and_node_count() {
        let (client, captured) = fake_api().await;
        let request = CreateClusterRequest {
            name: "demo".to_string(),
            initial_node_count: 3,
        };

        let operation = client.create_cluster("us-central1-a", &request).await.unwrap();

        assert_eq!(operation, OperationHandle("operation-1234".to_string()));
        assert_eq!(
            captured.lock().unwrap().clone(),
            Some(serde_json::json!({
                "cluster": {"name": "demo", "initialNodeCount": 3}
            }))
        );
    }

    #[test]
    fn clusters_url_trims_trailing_slash() {
        let client = GkeClient::new("https://example.test/", "proj", "token").unwrap();
        assert_eq!(
            client.clusters_url("us-central1-a"),
            "https://example.test/v1/projects/proj/locations/us-central1-a/clusters"
        );
    }

    #[test]
    fn error_message_prefers_envelope() {
        let body = r#"{"error": {"code": 403, "message": "permission denied"}}"#;
        assert_eq!(error_message(body), "permission denied");
        assert_eq!(error_message("  upstream timeout \n"), "upstream timeout");
    }
}

use serde::{Serialize, de::DeserializeOwned};
use shared::{
    CellId, Coordinate, GridData,
    api::{
        AckResponse, EvidenceEntry, EvidenceResponse, FeedbackRequest, GridResponse,
        HealthResponse, RlAgentStats, RlFeedbackStats, RlRouteResponse, RouteRequest,
        RouteResponse, UploadResponse,
    },
};
use tracing::{debug, info};

use crate::{config::PlannerConfig, error::PlannerError};

/// Image handed to `/upload-image`.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// HTTP client for the SmartRoute service.
#[derive(Clone)]
pub struct SmartRouteClient {
    root: String,
    client: reqwest::Client,
}

impl SmartRouteClient {
    pub fn new(root: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            root: root.into().trim_end_matches('/').to_string(),
            client,
        }
    }

    pub fn from_config(config: &PlannerConfig) -> Result<Self, PlannerError> {
        Ok(Self::new(config.api_root.clone(), build_http_client(config)?))
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.root)
    }

    pub async fn fetch_route(&self, start: Coordinate, end: Coordinate) -> Result<RouteResponse, PlannerError> {
        debug!(
            "requesting route start=({:.5},{:.5}) end=({:.5},{:.5})",
            start.lat, start.lon, end.lat, end.lon
        );
        let response: RouteResponse = self.post_json("/route", &RouteRequest::new(start, end)).await?;
        if !response.success {
            return Err(PlannerError::rejected(response.message, "Route generation failed"));
        }
        if response.route_coordinates.is_empty() {
            return Err(PlannerError::InvalidResponse("route has no coordinates".into()));
        }
        Ok(response)
    }

    pub async fn fetch_grid(&self) -> Result<GridData, PlannerError> {
        let response: GridResponse = self.get_json("/grid").await?;
        match response {
            GridResponse {
                success: true,
                data: Some(data),
                ..
            } => {
                info!(cells = data.cells.len(), size = data.grid_size, "grid data loaded");
                Ok(data)
            }
            GridResponse { message, .. } => Err(PlannerError::rejected(message, "grid unavailable")),
        }
    }

    pub async fn upload_image(&self, image: ImageUpload, cell: CellId) -> Result<UploadResponse, PlannerError> {
        let part = reqwest::multipart::Part::bytes(image.bytes)
            .file_name(image.file_name)
            .mime_str(&image.mime_type)?;
        let form = reqwest::multipart::Form::new()
            .part("image", part)
            .text("cell", cell.to_string());

        let response = self
            .client
            .post(self.url("/upload-image"))
            .multipart(form)
            .send()
            .await?;
        let body: UploadResponse = decode(response).await?;
        if !body.success {
            return Err(PlannerError::rejected(body.message, "image upload failed"));
        }
        Ok(body)
    }

    pub async fn fetch_rl_route(&self, start: Coordinate, end: Coordinate) -> Result<RlRouteResponse, PlannerError> {
        let response: RlRouteResponse = self.post_json("/route/rl", &RouteRequest::new(start, end)).await?;
        if !response.success {
            return Err(PlannerError::rejected(response.message, "RL route unavailable"));
        }
        Ok(response)
    }

    pub async fn send_feedback(&self, feedback: &FeedbackRequest) -> Result<AckResponse, PlannerError> {
        let response: AckResponse = self.post_json("/feedback", feedback).await?;
        if !response.success {
            return Err(PlannerError::rejected(response.message, "feedback rejected"));
        }
        Ok(response)
    }

    pub async fn rl_agent_stats(&self) -> Result<RlAgentStats, PlannerError> {
        self.get_json("/monitor/rl-agent").await
    }

    pub async fn rl_feedback_stats(&self) -> Result<RlFeedbackStats, PlannerError> {
        self.get_json("/monitor/rl-feedback").await
    }

    pub async fn health(&self) -> Result<HealthResponse, PlannerError> {
        self.get_json("/health").await
    }

    pub async fn cell_evidence(&self, cell: CellId) -> Result<Vec<EvidenceEntry>, PlannerError> {
        let response: EvidenceResponse = self.get_json(&format!("/evidence/{cell}")).await?;
        if !response.success {
            return Err(PlannerError::rejected(response.message, "evidence unavailable"));
        }
        Ok(response.evidence)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, PlannerError> {
        let response = self
            .client
            .get(self.url(path))
            .header("Accept", "application/json")
            .send()
            .await?;
        decode(response).await
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, PlannerError> {
        let response = self
            .client
            .post(self.url(path))
            .header("Accept", "application/json")
            .json(body)
            .send()
            .await?;
        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, PlannerError> {
    let status = response.status();
    let text = response.text().await?;
    if !status.is_success() {
        let message = serde_json::from_str::<AckResponse>(&text)
            .ok()
            .and_then(|ack| ack.message)
            .unwrap_or(text);
        return Err(PlannerError::Api {
            status: status.as_u16(),
            message,
        });
    }
    Ok(serde_json::from_str(&text)?)
}

pub fn build_http_client(config: &PlannerConfig) -> Result<reqwest::Client, PlannerError> {
    let builder = reqwest::Client::builder();
    #[cfg(not(target_arch = "wasm32"))]
    let builder = builder.timeout(config.request_timeout);
    #[cfg(target_arch = "wasm32")]
    let _ = config;
    Ok(builder.build()?)
}

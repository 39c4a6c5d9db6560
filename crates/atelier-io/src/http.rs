//! Blocking HTTP client for a collaborator backend.

use std::time::Duration;

use atelier_config::CollaboratorConfig;
use atelier_store::VirtualTree;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, warn};
use url::Url;

use crate::error::{CollaboratorError, Result};
use crate::service::{
    Collaborators, Coordinates, GenerateRequest, GenerationService, HierarchyService,
    ImageInsertion, ImageRequest, ImageService, MapRequest, MapService, UploadService,
    UploadedFile,
};

const USER_AGENT: &str = "Atelier/0.1";

/// Speaks JSON to the backend named by `[collaborators]`.
#[derive(Debug, Clone)]
pub struct HttpCollaborator {
    client: reqwest::blocking::Client,
    base: Url,
    endpoints: CollaboratorConfig,
}

impl HttpCollaborator {
    pub fn new(config: &CollaboratorConfig) -> Result<Self> {
        let raw = config
            .base_url
            .as_deref()
            .ok_or_else(|| CollaboratorError::Unavailable("no base_url configured".to_string()))?;
        let base = Url::parse(raw)
            .map_err(|error| CollaboratorError::Unavailable(format!("invalid base_url {raw:?}: {error}")))?;
        let scheme = base.scheme().to_ascii_lowercase();
        if scheme != "http" && scheme != "https" {
            return Err(CollaboratorError::Unavailable(format!(
                "unsupported scheme {scheme:?}"
            )));
        }

        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(|source| CollaboratorError::Transport {
                endpoint: raw.to_string(),
                source,
            })?;

        Ok(Self {
            client,
            base,
            endpoints: config.clone(),
        })
    }

    fn url(&self, endpoint: &str) -> Result<Url> {
        self.base
            .join(endpoint)
            .map_err(|error| CollaboratorError::Unavailable(format!("invalid endpoint {endpoint:?}: {error}")))
    }

    fn post<B, R>(&self, endpoint: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = self.url(endpoint)?;
        debug!(%url, "collaborator request");
        let transport = |source: reqwest::Error| CollaboratorError::Transport {
            endpoint: endpoint.to_string(),
            source,
        };

        let response = self.client.post(url).json(body).send().map_err(transport)?;
        let status = response.status();
        let text = response.text().map_err(transport)?;

        if !status.is_success() {
            let body: Value = serde_json::from_str(&text).unwrap_or(Value::Null);
            let message = body
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed"))
                .to_string();
            let code = body.get("code").and_then(Value::as_str).map(str::to_string);
            warn!(endpoint, status = status.as_u16(), ?code, "collaborator error response");
            return Err(CollaboratorError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                code,
                message,
            });
        }

        serde_json::from_str(&text).map_err(|source| CollaboratorError::Decode {
            endpoint: endpoint.to_string(),
            source,
        })
    }

    /// `code` of a success payload; absent or blank code is a failure.
    fn code_of(&self, endpoint: &str, body: Value) -> Result<String> {
        match body.get("code").and_then(Value::as_str) {
            Some(code) if !code.trim().is_empty() => Ok(code.to_string()),
            _ => Err(CollaboratorError::MissingCode {
                endpoint: endpoint.to_string(),
            }),
        }
    }
}

impl GenerationService for HttpCollaborator {
    fn generate(&self, request: &GenerateRequest) -> Result<String> {
        let endpoint = &self.endpoints.generate_endpoint;
        let body = self.post(endpoint, request)?;
        self.code_of(endpoint, body)
    }
}

impl ImageService for HttpCollaborator {
    fn add_images(&self, request: &ImageRequest) -> Result<ImageInsertion> {
        let endpoint = &self.endpoints.images_endpoint;
        let body: Value = self.post(endpoint, request)?;
        let code = self.code_of(endpoint, body.clone())?;
        let images = match body.get("images") {
            Some(images) => serde_json::from_value(images.clone()).map_err(|source| {
                CollaboratorError::Decode {
                    endpoint: endpoint.to_string(),
                    source,
                }
            })?,
            None => Vec::new(),
        };
        Ok(ImageInsertion { code, images })
    }
}

impl MapService for HttpCollaborator {
    fn geocode(&self, address: &str) -> Result<Coordinates> {
        let endpoint = &self.endpoints.geocode_endpoint;
        let body: Value = self.post(endpoint, &json!({ "address": address }))?;
        let coordinates = body.get("coordinates").cloned().unwrap_or(Value::Null);
        serde_json::from_value(coordinates).map_err(|source| CollaboratorError::Decode {
            endpoint: endpoint.to_string(),
            source,
        })
    }

    fn add_map(&self, request: &MapRequest) -> Result<String> {
        let endpoint = &self.endpoints.map_endpoint;
        let body = self.post(endpoint, request)?;
        self.code_of(endpoint, body)
    }
}

impl UploadService for HttpCollaborator {
    fn upload(&self, file: &UploadedFile) -> Result<()> {
        let _: Value = self.post(&self.endpoints.upload_endpoint, file)?;
        Ok(())
    }
}

impl HierarchyService for HttpCollaborator {
    fn update_hierarchy(&self, tree: &VirtualTree) -> Result<()> {
        let _: Value = self.post(
            &self.endpoints.hierarchy_endpoint,
            &json!({ "hierarchy": tree }),
        )?;
        Ok(())
    }
}

impl Collaborators {
    /// HTTP collaborators when a backend is configured, offline ones otherwise.
    pub fn from_config(config: &CollaboratorConfig) -> Self {
        match HttpCollaborator::new(config) {
            Ok(http) => Self::uniform(http),
            Err(error) => {
                if config.base_url.is_some() {
                    warn!(%error, "collaborator backend disabled");
                }
                Self::offline()
            }
        }
    }
}

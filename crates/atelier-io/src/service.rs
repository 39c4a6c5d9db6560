//! Request/response shapes and traits of the external collaborators.

use std::sync::Arc;

use atelier_store::{ImageRecord, VirtualTree};
use serde::{Deserialize, Serialize};

use crate::error::{CollaboratorError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    /// Natural-language description of the edit.
    pub prompt: String,
    pub current_code: String,
    pub existing_pages: Vec<String>,
    pub page_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    pub file_name: String,
    pub text_content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRequest {
    pub current_code: String,
    pub page_path: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub queries: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub uploaded_files: Vec<UploadedFile>,
    pub site_theme: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageInsertion {
    pub code: String,
    #[serde(default)]
    pub images: Vec<ImageRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapMarker {
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapRequest {
    pub current_code: String,
    pub map_description: String,
    pub lat: f64,
    pub lng: f64,
    pub zoom: u8,
    #[serde(default)]
    pub markers: Vec<MapMarker>,
}

impl MapRequest {
    pub const DEFAULT_ZOOM: u8 = 13;

    /// Map centred on `at` with a single marker there.
    pub fn at(current_code: impl Into<String>, description: impl Into<String>, at: Coordinates) -> Self {
        let description = description.into();
        Self {
            current_code: current_code.into(),
            markers: vec![MapMarker {
                lat: at.lat,
                lng: at.lng,
                title: description.clone(),
            }],
            map_description: description,
            lat: at.lat,
            lng: at.lng,
            zoom: Self::DEFAULT_ZOOM,
        }
    }
}

/// Code generation from a natural-language request.
pub trait GenerationService: Send + Sync {
    /// Replacement markup for the page. A success without code is an error.
    fn generate(&self, request: &GenerateRequest) -> Result<String>;
}

/// Image search and upload insertion.
pub trait ImageService: Send + Sync {
    fn add_images(&self, request: &ImageRequest) -> Result<ImageInsertion>;
}

/// Geocoding and map embedding.
pub trait MapService: Send + Sync {
    fn geocode(&self, address: &str) -> Result<Coordinates>;
    fn add_map(&self, request: &MapRequest) -> Result<String>;
}

/// Receiver of files dropped on the editor.
pub trait UploadService: Send + Sync {
    fn upload(&self, file: &UploadedFile) -> Result<()>;
}

/// Persistence of the folder/page hierarchy.
pub trait HierarchyService: Send + Sync {
    fn update_hierarchy(&self, tree: &VirtualTree) -> Result<()>;
}

/// Every collaborator the editor talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub generation: Arc<dyn GenerationService>,
    pub images: Arc<dyn ImageService>,
    pub maps: Arc<dyn MapService>,
    pub uploads: Arc<dyn UploadService>,
    pub hierarchy: Arc<dyn HierarchyService>,
}

impl Collaborators {
    /// All collaborators backed by one service value.
    pub fn uniform<S>(service: S) -> Self
    where
        S: GenerationService + ImageService + MapService + UploadService + HierarchyService + 'static,
    {
        let service = Arc::new(service);
        Self {
            generation: service.clone(),
            images: service.clone(),
            maps: service.clone(),
            uploads: service.clone(),
            hierarchy: service,
        }
    }

    /// Collaborators that fail every call with `Unavailable`.
    pub fn offline() -> Self {
        Self::uniform(Offline)
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}

/// Stand-in used when no collaborator backend is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct Offline;

fn offline<T>() -> Result<T> {
    Err(CollaboratorError::Unavailable(
        "no collaborator backend configured".to_string(),
    ))
}

impl GenerationService for Offline {
    fn generate(&self, _request: &GenerateRequest) -> Result<String> {
        offline()
    }
}

impl ImageService for Offline {
    fn add_images(&self, _request: &ImageRequest) -> Result<ImageInsertion> {
        offline()
    }
}

impl MapService for Offline {
    fn geocode(&self, _address: &str) -> Result<Coordinates> {
        offline()
    }

    fn add_map(&self, _request: &MapRequest) -> Result<String> {
        offline()
    }
}

impl UploadService for Offline {
    fn upload(&self, _file: &UploadedFile) -> Result<()> {
        offline()
    }
}

impl HierarchyService for Offline {
    fn update_hierarchy(&self, _tree: &VirtualTree) -> Result<()> {
        offline()
    }
}

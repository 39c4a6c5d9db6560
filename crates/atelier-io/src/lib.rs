//! External collaborators: service traits, their HTTP implementation and
//! the background job queue the editor runs them on.

pub mod error;
pub mod http;
pub mod jobs;
pub mod service;

pub use error::{CollaboratorError, Result};
pub use http::HttpCollaborator;
pub use jobs::{Completed, JobId, JobQueue};
pub use service::{
    Collaborators, Coordinates, GenerateRequest, GenerationService, HierarchyService,
    ImageInsertion, ImageRequest, ImageService, MapMarker, MapRequest, MapService, Offline,
    UploadService, UploadedFile,
};

pub mod auth;
pub mod client;
pub mod error;
pub mod logging;
pub mod payload;
pub mod resource;
pub mod retry;
pub mod search;
pub mod timestamps;

pub use auth::Credential;
pub use client::{AgentsClient, ApiSurface, ClientConfig, ListParams, SortOrder};
pub use error::{AzaError, Result};
pub use resource::Resource;

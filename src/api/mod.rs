//! REST collaborator interface.
//!
//! SYSTEM CONTEXT
//! ==============
//! [`Backend`] is the seam between the session layer and the network. The
//! session manager only ever talks to the trait, so tests drive it with an
//! in-memory backend and production uses [`http::HttpBackend`].
//!
//! Authenticated methods take the bearer token explicitly. The backend keeps
//! no credential of its own; the session manager decides which token (if
//! any) goes on each call.

pub mod http;
pub mod types;

use crate::draft::ValidRecipe;
use crate::error::ClientError;
use types::{AuthResponse, FavoriteToggle, Profile, ProfileUpdate, Recipe, RefreshResponse, UploadResponse};

/// Image bytes to attach to a recipe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

#[async_trait::async_trait]
pub trait Backend: Send + Sync {
    // --- auth ---------------------------------------------------------------

    async fn register(&self, name: &str, email: &str, password: &str) -> Result<AuthResponse, ClientError>;

    async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, ClientError>;

    /// Exchange the refresh cookie for a new access token.
    async fn refresh(&self) -> Result<RefreshResponse, ClientError>;

    /// Tell the backend the session is over. Callers ignore the result.
    async fn logout(&self, bearer: Option<&str>) -> Result<(), ClientError>;

    async fn profile(&self, bearer: &str) -> Result<Profile, ClientError>;

    /// Change name, email, or password. The response body is not relied on;
    /// callers re-read the profile.
    async fn update_profile(&self, bearer: &str, update: &ProfileUpdate) -> Result<(), ClientError>;

    // --- favorites ----------------------------------------------------------

    async fn list_favorites(&self, bearer: &str) -> Result<Vec<String>, ClientError>;

    async fn toggle_favorite(&self, bearer: &str, recipe_id: &str) -> Result<FavoriteToggle, ClientError>;

    // --- recipes ------------------------------------------------------------

    async fn list_recipes(&self, bearer: Option<&str>) -> Result<Vec<Recipe>, ClientError>;

    async fn get_recipe(&self, bearer: Option<&str>, recipe_id: &str) -> Result<Recipe, ClientError>;

    async fn my_recipes(&self, bearer: &str) -> Result<Vec<Recipe>, ClientError>;

    async fn create_recipe(&self, bearer: &str, recipe: &ValidRecipe) -> Result<Recipe, ClientError>;

    async fn update_recipe(&self, bearer: &str, recipe_id: &str, recipe: &ValidRecipe) -> Result<Recipe, ClientError>;

    async fn delete_recipe(&self, bearer: &str, recipe_id: &str) -> Result<(), ClientError>;

    async fn upload_image(&self, bearer: &str, image: &ImageUpload) -> Result<UploadResponse, ClientError>;

    /// Returns the updated recipe when the backend echoes it.
    async fn add_comment(&self, bearer: &str, recipe_id: &str, text: &str) -> Result<Option<Recipe>, ClientError>;

    /// Returns the updated recipe when the backend echoes it.
    async fn rate_recipe(&self, bearer: &str, recipe_id: &str, rating: u8) -> Result<Option<Recipe>, ClientError>;
}

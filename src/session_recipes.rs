//! Recipe operations routed through the session's request authenticator.
//!
//! Reads go out with the bearer token when there is one and anonymously
//! otherwise. Writes require a session. Drafts, ratings, and comments are
//! validated before anything is sent.
//!
//! After a rating or comment the backend may or may not echo the updated
//! recipe. When it does, that document is trusted; when it does not, the
//! recipe is fetched again.

use super::SessionManager;
use crate::api::types::{Recipe, UploadResponse};
use crate::api::{Backend, ImageUpload};
use crate::catalog::RecipeQuery;
use crate::draft::{RecipeDraft, validate_comment, validate_rating};
use crate::error::ClientError;
use crate::storage::CredentialStore;

/// Largest image accepted for upload.
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

impl<B: Backend, S: CredentialStore> SessionManager<B, S> {
    /// Every recipe the backend serves.
    ///
    /// # Errors
    ///
    /// Returns the backend error.
    pub async fn list_recipes(&mut self) -> Result<Vec<Recipe>, ClientError> {
        authorized!(self, optional bearer => self.backend.list_recipes(bearer.as_deref()))
    }

    /// Fetch the list and apply `query` locally.
    ///
    /// # Errors
    ///
    /// Returns the backend error.
    pub async fn search_recipes(&mut self, query: &RecipeQuery) -> Result<Vec<Recipe>, ClientError> {
        let recipes = self.list_recipes().await?;
        Ok(query.apply(recipes))
    }

    /// # Errors
    ///
    /// Returns [`ClientError::NotFound`] for an unknown id, or the backend error.
    pub async fn get_recipe(&mut self, recipe_id: &str) -> Result<Recipe, ClientError> {
        authorized!(self, optional bearer => self.backend.get_recipe(bearer.as_deref(), recipe_id))
    }

    /// Recipes created by the current user.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotLoggedIn`] without a session, or the backend error.
    pub async fn my_recipes(&mut self) -> Result<Vec<Recipe>, ClientError> {
        authorized!(self, bearer => self.backend.my_recipes(&bearer))
    }

    /// # Errors
    ///
    /// Returns [`ClientError::Validation`] for an invalid draft (nothing is
    /// sent), [`ClientError::NotLoggedIn`] without a session, or the backend error.
    pub async fn create_recipe(&mut self, draft: &RecipeDraft) -> Result<Recipe, ClientError> {
        let recipe = draft.validate()?;
        let created = authorized!(self, bearer => self.backend.create_recipe(&bearer, &recipe))?;
        tracing::info!(recipe_id = %created.id(), "recipe created");
        Ok(created)
    }

    /// Replace a recipe with `draft`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Validation`] for an invalid draft (nothing is
    /// sent), [`ClientError::Forbidden`] for someone else's recipe, or the
    /// backend error.
    pub async fn update_recipe(&mut self, recipe_id: &str, draft: &RecipeDraft) -> Result<Recipe, ClientError> {
        let recipe = draft.validate()?;
        let updated = authorized!(self, bearer => self.backend.update_recipe(&bearer, recipe_id, &recipe))?;
        tracing::info!(%recipe_id, "recipe updated");
        Ok(updated)
    }

    /// # Errors
    ///
    /// Returns [`ClientError::Forbidden`] for someone else's recipe, or the backend error.
    pub async fn delete_recipe(&mut self, recipe_id: &str) -> Result<(), ClientError> {
        authorized!(self, bearer => self.backend.delete_recipe(&bearer, recipe_id))?;
        tracing::info!(%recipe_id, "recipe deleted");
        Ok(())
    }

    /// Upload an image and return the URL to put in a draft.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Validation`] for an empty, oversized, or
    /// non-image payload (nothing is sent), or the backend error.
    pub async fn upload_image(&mut self, image: &ImageUpload) -> Result<UploadResponse, ClientError> {
        if image.bytes.is_empty() {
            return Err(ClientError::validation("image is empty"));
        }
        if image.bytes.len() > MAX_IMAGE_BYTES {
            return Err(ClientError::validation(format!("image exceeds {MAX_IMAGE_BYTES} bytes")));
        }
        if !image.mime.starts_with("image/") {
            return Err(ClientError::validation(format!("not an image type: {}", image.mime)));
        }
        authorized!(self, bearer => self.backend.upload_image(&bearer, image))
    }

    /// Comment on a recipe and return the updated recipe.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Validation`] for a blank comment (nothing is
    /// sent), [`ClientError::NotLoggedIn`] without a session, or the backend error.
    pub async fn add_comment(&mut self, recipe_id: &str, text: &str) -> Result<Recipe, ClientError> {
        let text = validate_comment(text)?;
        let echoed = authorized!(self, bearer => self.backend.add_comment(&bearer, recipe_id, text))?;
        match echoed {
            Some(recipe) => Ok(recipe),
            None => self.get_recipe(recipe_id).await,
        }
    }

    /// Rate a recipe 1 to 5 stars and return the updated recipe.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Validation`] outside `1..=5` (nothing is sent),
    /// [`ClientError::NotLoggedIn`] without a session, or the backend error.
    pub async fn rate_recipe(&mut self, recipe_id: &str, rating: u8) -> Result<Recipe, ClientError> {
        let rating = validate_rating(rating)?;
        let echoed = authorized!(self, bearer => self.backend.rate_recipe(&bearer, recipe_id, rating))?;
        match echoed {
            Some(recipe) => Ok(recipe),
            None => self.get_recipe(recipe_id).await,
        }
    }
}

#[cfg(test)]
#[path = "session_recipes_test.rs"]
mod tests;

//! Shared fixtures for unit tests: JWT builders and an in-memory backend.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;

use crate::api::types::{
    AuthResponse, Comment, FavoriteEntry, FavoriteToggle, Profile, ProfileUpdate, Recipe, RefreshResponse, UploadResponse,
};
use crate::api::{Backend, ImageUpload};
use crate::credential::unix_now;
use crate::draft::ValidRecipe;
use crate::error::{ClientError, classify_status};

/// Unsigned JWT with the given payload.
pub(crate) fn make_token(payload: &serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let body = URL_SAFE_NO_PAD.encode(payload.to_string());
    format!("{header}.{body}.signature")
}

/// Token for `user_id` valid for an hour. `nonce` keeps tokens distinct.
pub(crate) fn valid_token(user_id: &str, nonce: u32) -> String {
    make_token(&serde_json::json!({ "id": user_id, "exp": unix_now() + 3600, "n": nonce }))
}

/// Token for `user_id` that expired an hour ago.
pub(crate) fn expired_token(user_id: &str) -> String {
    make_token(&serde_json::json!({ "id": user_id, "exp": unix_now() - 3600 }))
}

pub(crate) const USER: &str = "u1";
pub(crate) const PASSWORD: &str = "pw";

// =========================================================================
// MockBackend
// =========================================================================

/// Backend that keeps server-side state in memory.
///
/// Authenticated calls succeed only with a token in `accepted`. `refresh`
/// hands out `refresh_token` (and accepts it) or answers 401 when unset.
#[derive(Default)]
pub(crate) struct MockBackend {
    calls: Mutex<HashMap<&'static str, usize>>,
    accepted: Mutex<HashSet<String>>,
    pub refresh_token: Mutex<Option<String>>,
    /// Hand out the refresh token without accepting it on later calls.
    pub reject_refreshed: AtomicBool,
    pub login_token: Mutex<Option<String>>,
    pub register_issues_token: AtomicBool,
    pub network_down: AtomicBool,
    pub fail_logout: AtomicBool,
    pub profile_status: Mutex<Option<u16>>,
    pub echo_mutations: AtomicBool,
    profile_name: Mutex<Option<String>>,
    profile_email: Mutex<Option<String>>,
    favorites: Mutex<BTreeSet<String>>,
    recipes: Mutex<BTreeMap<String, Recipe>>,
    next_id: AtomicUsize,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accept(&self, token: &str) {
        self.accepted.lock().unwrap().insert(token.to_owned());
    }

    pub fn revoke(&self, token: &str) {
        self.accepted.lock().unwrap().remove(token);
    }

    pub fn with_refresh(self, token: Option<String>) -> Self {
        *self.refresh_token.lock().unwrap() = token;
        self
    }

    pub fn set_favorites(&self, ids: &[&str]) {
        *self.favorites.lock().unwrap() = ids.iter().map(|s| (*s).to_owned()).collect();
    }

    pub fn server_favorites(&self) -> BTreeSet<String> {
        self.favorites.lock().unwrap().clone()
    }

    pub fn add_recipe(&self, recipe: Recipe) {
        self.recipes.lock().unwrap().insert(recipe.id().to_owned(), recipe);
    }

    pub fn recipe(&self, id: &str) -> Option<Recipe> {
        self.recipes.lock().unwrap().get(id).cloned()
    }

    pub fn calls(&self, name: &str) -> usize {
        self.calls.lock().unwrap().get(name).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    fn record(&self, name: &'static str) -> Result<(), ClientError> {
        *self.calls.lock().unwrap().entry(name).or_insert(0) += 1;
        if self.network_down.load(Ordering::SeqCst) {
            return Err(ClientError::Transport("connection refused".into()));
        }
        Ok(())
    }

    fn check(&self, bearer: &str) -> Result<(), ClientError> {
        if self.accepted.lock().unwrap().contains(bearer) {
            Ok(())
        } else {
            Err(classify_status(401, r#"{"message":"jwt expired"}"#))
        }
    }

    fn owner_of(&self, bearer: &str) -> Option<String> {
        crate::credential::decode_claims(bearer)
            .ok()
            .and_then(|c| c.user_id().map(str::to_owned))
    }

    fn echo(&self, id: &str) -> Option<Recipe> {
        if self.echo_mutations.load(Ordering::SeqCst) { self.recipe(id) } else { None }
    }

    fn store_recipe(&self, id: String, body: &ValidRecipe, owner: Option<String>) -> Recipe {
        let mut recipe = Recipe::new(id, body.title.clone());
        recipe.description.clone_from(&body.description);
        recipe.ingredients.clone_from(&body.ingredients);
        recipe.instructions.clone_from(&body.instructions);
        recipe.category.clone_from(&body.category);
        recipe.tags.clone_from(&body.tags);
        recipe.image.clone_from(&body.image);
        recipe.creator_id = owner;
        self.add_recipe(recipe.clone());
        recipe
    }
}

#[async_trait::async_trait]
impl Backend for MockBackend {
    async fn register(&self, name: &str, email: &str, _password: &str) -> Result<AuthResponse, ClientError> {
        self.record("register")?;
        let token = if self.register_issues_token.load(Ordering::SeqCst) {
            let token = valid_token(USER, 100);
            self.accept(&token);
            Some(token)
        } else {
            None
        };
        Ok(AuthResponse::new(USER, Some(name.to_owned()), Some(email.to_owned()), token))
    }

    async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, ClientError> {
        self.record("login")?;
        if password != PASSWORD {
            return Err(classify_status(401, r#"{"message":"Invalid email or password"}"#));
        }
        let token = self.login_token.lock().unwrap().clone().unwrap_or_else(|| valid_token(USER, 200));
        self.accept(&token);
        Ok(AuthResponse::new(USER, Some("Ada".into()), Some(email.to_owned()), Some(token)))
    }

    async fn refresh(&self) -> Result<RefreshResponse, ClientError> {
        self.record("refresh")?;
        let token = self.refresh_token.lock().unwrap().clone();
        match token {
            Some(token) => {
                if !self.reject_refreshed.load(Ordering::SeqCst) {
                    self.accept(&token);
                }
                Ok(RefreshResponse { token })
            }
            None => Err(classify_status(401, r#"{"message":"refresh token missing"}"#)),
        }
    }

    async fn logout(&self, _bearer: Option<&str>) -> Result<(), ClientError> {
        self.record("logout")?;
        if self.fail_logout.load(Ordering::SeqCst) {
            return Err(ClientError::Transport("connection reset".into()));
        }
        Ok(())
    }

    async fn profile(&self, bearer: &str) -> Result<Profile, ClientError> {
        self.record("profile")?;
        self.check(bearer)?;
        if let Some(status) = *self.profile_status.lock().unwrap() {
            return Err(classify_status(status, ""));
        }
        let favorites = self.server_favorites().into_iter().map(FavoriteEntry::Id).collect();
        let id = self.owner_of(bearer).unwrap_or_else(|| USER.to_owned());
        let name = self.profile_name.lock().unwrap().clone().unwrap_or_else(|| "Ada Lovelace".into());
        let email = self.profile_email.lock().unwrap().clone().unwrap_or_else(|| "ada@example.test".into());
        Ok(Profile::new(id, Some(name), Some(email), favorites))
    }

    async fn update_profile(&self, bearer: &str, update: &ProfileUpdate) -> Result<(), ClientError> {
        self.record("update_profile")?;
        self.check(bearer)?;
        if let Some(name) = &update.name {
            *self.profile_name.lock().unwrap() = Some(name.clone());
        }
        if let Some(email) = &update.email {
            *self.profile_email.lock().unwrap() = Some(email.clone());
        }
        Ok(())
    }

    async fn list_favorites(&self, bearer: &str) -> Result<Vec<String>, ClientError> {
        self.record("list_favorites")?;
        self.check(bearer)?;
        Ok(self.server_favorites().into_iter().collect())
    }

    async fn toggle_favorite(&self, bearer: &str, recipe_id: &str) -> Result<FavoriteToggle, ClientError> {
        self.record("toggle_favorite")?;
        self.check(bearer)?;
        let mut favorites = self.favorites.lock().unwrap();
        let added = if favorites.remove(recipe_id) {
            false
        } else {
            favorites.insert(recipe_id.to_owned());
            true
        };
        Ok(FavoriteToggle { added })
    }

    async fn list_recipes(&self, bearer: Option<&str>) -> Result<Vec<Recipe>, ClientError> {
        self.record("list_recipes")?;
        if let Some(bearer) = bearer {
            self.check(bearer)?;
        }
        Ok(self.recipes.lock().unwrap().values().cloned().collect())
    }

    async fn get_recipe(&self, bearer: Option<&str>, recipe_id: &str) -> Result<Recipe, ClientError> {
        self.record("get_recipe")?;
        if let Some(bearer) = bearer {
            self.check(bearer)?;
        }
        self.recipe(recipe_id)
            .ok_or_else(|| classify_status(404, r#"{"message":"Recipe not found"}"#))
    }

    async fn my_recipes(&self, bearer: &str) -> Result<Vec<Recipe>, ClientError> {
        self.record("my_recipes")?;
        self.check(bearer)?;
        let owner = self.owner_of(bearer).unwrap_or_default();
        Ok(self
            .recipes
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.is_owned_by(&owner))
            .cloned()
            .collect())
    }

    async fn create_recipe(&self, bearer: &str, recipe: &ValidRecipe) -> Result<Recipe, ClientError> {
        self.record("create_recipe")?;
        self.check(bearer)?;
        let id = format!("new-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        Ok(self.store_recipe(id, recipe, self.owner_of(bearer)))
    }

    async fn update_recipe(&self, bearer: &str, recipe_id: &str, recipe: &ValidRecipe) -> Result<Recipe, ClientError> {
        self.record("update_recipe")?;
        self.check(bearer)?;
        let existing = self
            .recipe(recipe_id)
            .ok_or_else(|| classify_status(404, r#"{"message":"Recipe not found"}"#))?;
        let owner = self.owner_of(bearer);
        if existing.creator() != owner.as_deref() {
            return Err(classify_status(403, r#"{"message":"Not authorized to edit this recipe"}"#));
        }
        Ok(self.store_recipe(recipe_id.to_owned(), recipe, owner))
    }

    async fn delete_recipe(&self, bearer: &str, recipe_id: &str) -> Result<(), ClientError> {
        self.record("delete_recipe")?;
        self.check(bearer)?;
        let owner = self.owner_of(bearer);
        let mut recipes = self.recipes.lock().unwrap();
        match recipes.get(recipe_id) {
            None => Err(classify_status(404, "")),
            Some(r) if r.creator() != owner.as_deref() => Err(classify_status(403, r#"{"message":"Not your recipe"}"#)),
            Some(_) => {
                recipes.remove(recipe_id);
                Ok(())
            }
        }
    }

    async fn upload_image(&self, bearer: &str, image: &ImageUpload) -> Result<UploadResponse, ClientError> {
        self.record("upload_image")?;
        self.check(bearer)?;
        Ok(UploadResponse { url: format!("/uploads/{}", image.file_name) })
    }

    async fn add_comment(&self, bearer: &str, recipe_id: &str, text: &str) -> Result<Option<Recipe>, ClientError> {
        self.record("add_comment")?;
        self.check(bearer)?;
        {
            let mut recipes = self.recipes.lock().unwrap();
            let recipe = recipes
                .get_mut(recipe_id)
                .ok_or_else(|| classify_status(404, ""))?;
            recipe.comments.push(Comment { author: self.owner_of(bearer), text: text.to_owned(), created_at: None });
        }
        Ok(self.echo(recipe_id))
    }

    async fn rate_recipe(&self, bearer: &str, recipe_id: &str, rating: u8) -> Result<Option<Recipe>, ClientError> {
        self.record("rate_recipe")?;
        self.check(bearer)?;
        {
            let mut recipes = self.recipes.lock().unwrap();
            let recipe = recipes
                .get_mut(recipe_id)
                .ok_or_else(|| classify_status(404, ""))?;
            let total = recipe.average_rating * f64::from(recipe.num_reviews) + f64::from(rating);
            recipe.num_reviews += 1;
            recipe.average_rating = total / f64::from(recipe.num_reviews);
        }
        Ok(self.echo(recipe_id))
    }
}

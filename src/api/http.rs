//! `reqwest` implementation of [`Backend`].
//!
//! Thin HTTP wrapper: build the request, attach the bearer token when one is
//! given, classify non-success statuses, and parse the body. Parsing is kept
//! in small pure functions so it can be tested without a server.
//!
//! The client keeps a cookie jar. The backend sets its refresh cookie on
//! login, and the jar sends it back on refresh and logout.

use std::time::Duration;

use reqwest::header::AUTHORIZATION;
use reqwest::{Method, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;

use super::types::{
    AuthResponse, CommentRequest, FavoriteToggle, FavoritesResponse, LoginRequest, Profile, ProfileUpdate, RatingRequest, Recipe,
    RecipeList, RefreshResponse, RegisterRequest, UploadResponse,
};
use super::{Backend, ImageUpload};
use crate::config::{ClientConfig, Timeouts};
use crate::draft::ValidRecipe;
use crate::error::{ClientError, classify_status};

const RECIPES_PATH: &str = "/api/recipes";

/// Fixed routes under [`RECIPES_PATH`] that a recipe id must not shadow.
const RESERVED_RECIPE_ROUTES: [&str; 3] = ["favorites", "my-recipes", "upload"];

// =============================================================================
// CLIENT
// =============================================================================

#[derive(Debug, Clone)]
pub struct HttpBackend {
    http: reqwest::Client,
    base_url: Url,
    auth_prefix: String,
}

impl HttpBackend {
    /// Build a backend client for `base_url` with the given auth route prefix.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::ConfigParse`] if `base_url` is not an absolute
    /// URL that can carry a path, or [`ClientError::HttpClientBuild`] if the
    /// TLS/cookie stack fails to initialize.
    pub fn new(base_url: &str, auth_prefix: &str, timeouts: Timeouts) -> Result<Self, ClientError> {
        let base = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|e| ClientError::ConfigParse(format!("invalid API URL {base_url}: {e}")))?;
        if base.cannot_be_a_base() {
            return Err(ClientError::ConfigParse(format!("API URL cannot carry a path: {base_url}")));
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeouts.request_secs))
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .cookie_store(true)
            .build()
            .map_err(|e| ClientError::HttpClientBuild(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base,
            auth_prefix: auth_prefix.trim_end_matches('/').to_owned(),
        })
    }

    /// Build a backend client from parsed config.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::ConfigParse`] for an unusable API URL, or
    /// [`ClientError::HttpClientBuild`] if the HTTP client fails to build.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ClientError> {
        Self::new(&config.api_url, &config.auth_prefix, config.timeouts)
    }

    /// `base + prefix + segments`, each segment percent-encoded on its own so
    /// `/`, `?`, and `#` inside an id stay inside that segment.
    fn url(&self, prefix: &str, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|()| ClientError::ConfigParse(format!("API URL cannot carry a path: {}", self.base_url)))?;
            path.pop_if_empty().extend(prefix.split('/').filter(|s| !s.is_empty()));
            for segment in segments {
                path.push(segment);
            }
        }
        Ok(url)
    }

    fn auth_url(&self, route: &str) -> Result<Url, ClientError> {
        self.url(&self.auth_prefix, &[route])
    }

    fn recipes_url(&self, segments: &[&str]) -> Result<Url, ClientError> {
        self.url(RECIPES_PATH, segments)
    }

    fn request(&self, method: Method, url: Url, bearer: Option<&str>) -> RequestBuilder {
        let builder = self.http.request(method, url);
        match bearer {
            Some(token) => builder.header(AUTHORIZATION, bearer_header(token)),
            None => builder,
        }
    }
}

/// `Authorization` header value for a token.
#[must_use]
pub fn bearer_header(token: &str) -> String {
    format!("Bearer {token}")
}

/// A caller-supplied recipe id, checked so it addresses exactly one recipe.
fn recipe_segment(recipe_id: &str) -> Result<&str, ClientError> {
    let id = recipe_id.trim();
    if id.is_empty() || id == "." || id == ".." || RESERVED_RECIPE_ROUTES.contains(&id) {
        return Err(ClientError::validation(format!("invalid recipe id {recipe_id:?}")));
    }
    Ok(id)
}

// =============================================================================
// RESPONSE HANDLING
// =============================================================================

async fn read_body(builder: RequestBuilder) -> Result<String, ClientError> {
    let response: Response = builder.send().await?;
    let status = response.status().as_u16();
    let text = response.text().await?;
    if !(200..300).contains(&status) {
        tracing::debug!(status, "backend returned error status");
        return Err(classify_status(status, &text));
    }
    Ok(text)
}

async fn send_json<T: DeserializeOwned>(builder: RequestBuilder) -> Result<T, ClientError> {
    let text = read_body(builder).await?;
    parse_json(&text)
}

fn parse_json<T: DeserializeOwned>(text: &str) -> Result<T, ClientError> {
    serde_json::from_str(text).map_err(|e| ClientError::Decode(e.to_string()))
}

/// Mutation responses that may or may not echo the updated document.
fn parse_optional_recipe(text: &str) -> Option<Recipe> {
    #[derive(serde::Deserialize)]
    struct Wrapped {
        recipe: Recipe,
    }
    serde_json::from_str::<Recipe>(text)
        .ok()
        .or_else(|| serde_json::from_str::<Wrapped>(text).ok().map(|w| w.recipe))
}

// =============================================================================
// BACKEND
// =============================================================================

#[async_trait::async_trait]
impl Backend for HttpBackend {
    async fn register(&self, name: &str, email: &str, password: &str) -> Result<AuthResponse, ClientError> {
        let body = RegisterRequest { name, email, password };
        send_json(self.request(Method::POST, self.auth_url("register")?, None).json(&body)).await
    }

    async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, ClientError> {
        let body = LoginRequest { email, password };
        send_json(self.request(Method::POST, self.auth_url("login")?, None).json(&body)).await
    }

    async fn refresh(&self) -> Result<RefreshResponse, ClientError> {
        send_json(self.request(Method::GET, self.auth_url("refresh")?, None)).await
    }

    async fn logout(&self, bearer: Option<&str>) -> Result<(), ClientError> {
        read_body(self.request(Method::GET, self.auth_url("logout")?, bearer))
            .await
            .map(drop)
    }

    async fn profile(&self, bearer: &str) -> Result<Profile, ClientError> {
        send_json(self.request(Method::GET, self.auth_url("profile")?, Some(bearer))).await
    }

    async fn update_profile(&self, bearer: &str, update: &ProfileUpdate) -> Result<(), ClientError> {
        read_body(self.request(Method::PUT, self.auth_url("profile")?, Some(bearer)).json(update))
            .await
            .map(drop)
    }

    async fn list_favorites(&self, bearer: &str) -> Result<Vec<String>, ClientError> {
        let url = self.recipes_url(&["favorites"])?;
        let resp: FavoritesResponse = send_json(self.request(Method::GET, url, Some(bearer))).await?;
        Ok(resp.into_ids())
    }

    async fn toggle_favorite(&self, bearer: &str, recipe_id: &str) -> Result<FavoriteToggle, ClientError> {
        let url = self.recipes_url(&["favorites", recipe_segment(recipe_id)?])?;
        send_json(self.request(Method::POST, url, Some(bearer))).await
    }

    async fn list_recipes(&self, bearer: Option<&str>) -> Result<Vec<Recipe>, ClientError> {
        let list: RecipeList = send_json(self.request(Method::GET, self.recipes_url(&[])?, bearer)).await?;
        Ok(list.into_vec())
    }

    async fn get_recipe(&self, bearer: Option<&str>, recipe_id: &str) -> Result<Recipe, ClientError> {
        let url = self.recipes_url(&[recipe_segment(recipe_id)?])?;
        send_json(self.request(Method::GET, url, bearer)).await
    }

    async fn my_recipes(&self, bearer: &str) -> Result<Vec<Recipe>, ClientError> {
        let url = self.recipes_url(&["my-recipes"])?;
        let list: RecipeList = send_json(self.request(Method::GET, url, Some(bearer))).await?;
        Ok(list.into_vec())
    }

    async fn create_recipe(&self, bearer: &str, recipe: &ValidRecipe) -> Result<Recipe, ClientError> {
        send_json(self.request(Method::POST, self.recipes_url(&[])?, Some(bearer)).json(recipe)).await
    }

    async fn update_recipe(&self, bearer: &str, recipe_id: &str, recipe: &ValidRecipe) -> Result<Recipe, ClientError> {
        let url = self.recipes_url(&[recipe_segment(recipe_id)?])?;
        send_json(self.request(Method::PUT, url, Some(bearer)).json(recipe)).await
    }

    async fn delete_recipe(&self, bearer: &str, recipe_id: &str) -> Result<(), ClientError> {
        let url = self.recipes_url(&[recipe_segment(recipe_id)?])?;
        read_body(self.request(Method::DELETE, url, Some(bearer)))
            .await
            .map(drop)
    }

    async fn upload_image(&self, bearer: &str, image: &ImageUpload) -> Result<UploadResponse, ClientError> {
        let part = reqwest::multipart::Part::bytes(image.bytes.clone())
            .file_name(image.file_name.clone())
            .mime_str(&image.mime)
            .map_err(|e| ClientError::validation(format!("invalid image type {}: {e}", image.mime)))?;
        let form = reqwest::multipart::Form::new().part("image", part);
        let url = self.recipes_url(&["upload"])?;
        send_json(self.request(Method::POST, url, Some(bearer)).multipart(form)).await
    }

    async fn add_comment(&self, bearer: &str, recipe_id: &str, text: &str) -> Result<Option<Recipe>, ClientError> {
        let url = self.recipes_url(&[recipe_segment(recipe_id)?, "comment"])?;
        let body = read_body(self.request(Method::POST, url, Some(bearer)).json(&CommentRequest { text })).await?;
        Ok(parse_optional_recipe(&body))
    }

    async fn rate_recipe(&self, bearer: &str, recipe_id: &str, rating: u8) -> Result<Option<Recipe>, ClientError> {
        let url = self.recipes_url(&[recipe_segment(recipe_id)?, "rate"])?;
        let body = read_body(self.request(Method::POST, url, Some(bearer)).json(&RatingRequest { rating })).await?;
        Ok(parse_optional_recipe(&body))
    }
}

#[cfg(test)]
#[path = "http_test.rs"]
mod tests;

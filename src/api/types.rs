//! Wire types shared by the backend trait and its HTTP implementation.
//!
//! The backend is a document store, so ids arrive as `_id`; some routes also
//! emit `id`. Both are accepted. Unknown fields are ignored everywhere.

use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::credential::{Credential, UserRef};

/// Document identifier carried as `_id` or `id` (or both).
///
/// Always used through `#[serde(flatten)]` so a struct can accept either key
/// without tripping serde's duplicate-field check. Serializes back as `_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdField(pub String);

impl<'de> Deserialize<'de> for IdField {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Ids {
            #[serde(rename = "_id")]
            object_id: Option<String>,
            id: Option<String>,
        }
        let ids = Ids::deserialize(deserializer)?;
        ids.object_id
            .or(ids.id)
            .map(IdField)
            .ok_or_else(|| serde::de::Error::missing_field("_id"))
    }
}

impl Serialize for IdField {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry("_id", &self.0)?;
        map.end()
    }
}

// =============================================================================
// AUTH
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

/// Response to login and registration.
///
/// Registration may omit the token, in which case the user must log in.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthResponse {
    #[serde(flatten)]
    id: IdField,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
}

impl AuthResponse {
    #[must_use]
    pub fn new(id: impl Into<String>, name: Option<String>, email: Option<String>, token: Option<String>) -> Self {
        Self { id: IdField(id.into()), name, email, token }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id.0
    }

    #[must_use]
    pub fn user(&self) -> UserRef {
        UserRef { id: self.id.0.clone(), name: self.name.clone(), email: self.email.clone() }
    }

    /// The credential this response grants, if it carries a token.
    #[must_use]
    pub fn credential(&self) -> Option<Credential> {
        self.token
            .as_ref()
            .filter(|t| !t.trim().is_empty())
            .map(|t| Credential::new(t.clone(), Some(self.user())))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RefreshResponse {
    pub token: String,
}

/// The current user's document.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Profile {
    #[serde(flatten)]
    id: IdField,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub favorites: Vec<FavoriteEntry>,
}

impl Profile {
    #[must_use]
    pub fn new(id: impl Into<String>, name: Option<String>, email: Option<String>, favorites: Vec<FavoriteEntry>) -> Self {
        Self { id: IdField(id.into()), name, email, favorites }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id.0
    }

    /// Ids of the favorited recipes, whatever form the backend sent them in.
    #[must_use]
    pub fn favorite_ids(&self) -> Vec<String> {
        self.favorites.iter().map(|f| f.id().to_owned()).collect()
    }
}

/// Changes to the current user's profile. `None` leaves a field alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl ProfileUpdate {
    /// Trimmed copy with blank fields dropped. Passwords are kept verbatim.
    #[must_use]
    pub fn normalized(&self) -> Self {
        let trimmed = |v: &Option<String>| v.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(str::to_owned);
        Self {
            name: trimmed(&self.name),
            email: trimmed(&self.email),
            password: self.password.clone().filter(|p| !p.is_empty()),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.password.is_none()
    }
}

// =============================================================================
// FAVORITES
// =============================================================================

/// One favorite: either a bare recipe id or a populated recipe document.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum FavoriteEntry {
    Id(String),
    Recipe(Box<Recipe>),
}

impl FavoriteEntry {
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Id(id) => id,
            Self::Recipe(recipe) => recipe.id(),
        }
    }
}

/// Favorites listing: a bare array or `{"favorites": [...]}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum FavoritesResponse {
    List(Vec<FavoriteEntry>),
    Wrapped { favorites: Vec<FavoriteEntry> },
}

impl FavoritesResponse {
    #[must_use]
    pub fn into_ids(self) -> Vec<String> {
        let entries = match self {
            Self::List(entries) | Self::Wrapped { favorites: entries } => entries,
        };
        entries.iter().map(|e| e.id().to_owned()).collect()
    }
}

/// Result of a favorite toggle as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct FavoriteToggle {
    #[serde(alias = "isFavorite", alias = "favorited")]
    pub added: bool,
}

// =============================================================================
// RECIPES
// =============================================================================

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Comment {
    #[serde(default, alias = "name", skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(alias = "comment")]
    pub text: String,
    #[serde(default, rename = "createdAt", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// A recipe document as served by the backend.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Recipe {
    #[serde(flatten)]
    id: IdField,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub instructions: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Creator as stored on the document: an id or a populated user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<CreatorRef>,
    #[serde(default, rename = "creatorId", skip_serializing_if = "Option::is_none")]
    pub creator_id: Option<String>,
    #[serde(default, rename = "creatorName", skip_serializing_if = "Option::is_none")]
    pub creator_name: Option<String>,
    #[serde(default, rename = "averageRating")]
    pub average_rating: f64,
    #[serde(default, rename = "numReviews")]
    pub num_reviews: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub comments: Vec<Comment>,
    #[serde(default, rename = "createdAt", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl Recipe {
    /// A recipe with only an id and a title set.
    #[must_use]
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: IdField(id.into()),
            title: title.into(),
            description: String::new(),
            ingredients: Vec::new(),
            instructions: String::new(),
            category: None,
            tags: Vec::new(),
            image: None,
            user: None,
            creator_id: None,
            creator_name: None,
            average_rating: 0.0,
            num_reviews: 0,
            comments: Vec::new(),
            created_at: None,
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id.0
    }

    /// The creator's user id, from whichever field the backend filled.
    #[must_use]
    pub fn creator(&self) -> Option<&str> {
        self.user.as_ref().map(CreatorRef::id).or(self.creator_id.as_deref())
    }

    #[must_use]
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.creator() == Some(user_id)
    }
}

/// Recipe creator: a bare user id or a populated user document.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum CreatorRef {
    Id(String),
    User {
        #[serde(flatten)]
        id: IdField,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
}

impl CreatorRef {
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Id(id) | Self::User { id: IdField(id), .. } => id,
        }
    }
}

/// Recipe listing: a bare array or `{"recipes": [...]}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RecipeList {
    List(Vec<Recipe>),
    Wrapped { recipes: Vec<Recipe> },
}

impl RecipeList {
    #[must_use]
    pub fn into_vec(self) -> Vec<Recipe> {
        match self {
            Self::List(recipes) | Self::Wrapped { recipes } => recipes,
        }
    }
}

/// Response to an image upload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct UploadResponse {
    #[serde(alias = "image", alias = "imageUrl", alias = "path")]
    pub url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentRequest<'a> {
    pub text: &'a str,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct RatingRequest {
    pub rating: u8,
}

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;

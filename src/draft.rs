//! Client-side validation of recipe payloads, ratings, and comments.
//!
//! Validation runs before any request is built, so a rejected draft never
//! costs a round trip.

use serde::Serialize;

use crate::error::ClientError;

pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;

/// Editable recipe fields as entered by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeDraft {
    pub title: String,
    pub description: String,
    pub ingredients: Vec<String>,
    pub instructions: String,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub image: Option<String>,
}

/// A draft that passed validation; this is what goes on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidRecipe {
    pub title: String,
    pub description: String,
    pub ingredients: Vec<String>,
    pub instructions: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl RecipeDraft {
    /// Trim every field and drop blank list entries.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Validation`] when the title, every ingredient,
    /// or the instructions are blank.
    pub fn validate(&self) -> Result<ValidRecipe, ClientError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(ClientError::validation("title is required"));
        }
        let ingredients = clean_list(&self.ingredients);
        if ingredients.is_empty() {
            return Err(ClientError::validation("add at least one ingredient"));
        }
        let instructions = self.instructions.trim();
        if instructions.is_empty() {
            return Err(ClientError::validation("instructions are required"));
        }

        Ok(ValidRecipe {
            title: title.to_owned(),
            description: self.description.trim().to_owned(),
            ingredients,
            instructions: instructions.to_owned(),
            category: non_blank(self.category.as_deref()),
            tags: clean_list(&self.tags),
            image: non_blank(self.image.as_deref()),
        })
    }
}

fn clean_list(items: &[String]) -> Vec<String> {
    items
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|s| !s.is_empty()).map(str::to_owned)
}

/// Check a star rating.
///
/// # Errors
///
/// Returns [`ClientError::Validation`] outside `1..=5`.
pub fn validate_rating(rating: u8) -> Result<u8, ClientError> {
    if (MIN_RATING..=MAX_RATING).contains(&rating) {
        Ok(rating)
    } else {
        Err(ClientError::validation(format!("rating must be between {MIN_RATING} and {MAX_RATING}")))
    }
}

/// Trim a comment body.
///
/// # Errors
///
/// Returns [`ClientError::Validation`] for a blank comment.
pub fn validate_comment(text: &str) -> Result<&str, ClientError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        Err(ClientError::validation("comment cannot be empty"))
    } else {
        Ok(trimmed)
    }
}

#[cfg(test)]
#[path = "draft_test.rs"]
mod tests;

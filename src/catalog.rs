//! Client-side filtering and sorting of a fetched recipe list.
//!
//! The backend serves the whole list; search and ordering are recomputed
//! locally whenever the query changes.

use std::cmp::Ordering;
use std::str::FromStr;

use crate::api::types::Recipe;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortKey {
    /// Most recently created first; undated recipes last.
    #[default]
    Newest,
    /// Highest average rating first, then most reviews.
    Rating,
    /// Alphabetical by title, case-insensitive.
    Title,
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "newest" | "new" | "recent" => Ok(Self::Newest),
            "rating" | "top" | "top-rated" => Ok(Self::Rating),
            "title" | "name" | "az" => Ok(Self::Title),
            other => Err(format!("unknown sort key '{other}' (expected newest, rating, or title)")),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeQuery {
    /// Case-insensitive substring matched against title, description, and ingredients.
    pub search: Option<String>,
    pub category: Option<String>,
    pub tag: Option<String>,
    pub sort: SortKey,
}

impl RecipeQuery {
    /// Filter and sort `recipes`. Sorting is stable.
    #[must_use]
    pub fn apply(&self, recipes: Vec<Recipe>) -> Vec<Recipe> {
        let needle = normalized(self.search.as_deref());
        let category = normalized(self.category.as_deref());
        let tag = normalized(self.tag.as_deref());

        let mut matched: Vec<Recipe> = recipes
            .into_iter()
            .filter(|r| needle.as_deref().is_none_or(|n| matches_search(r, n)))
            .filter(|r| {
                category
                    .as_deref()
                    .is_none_or(|c| r.category.as_deref().is_some_and(|rc| rc.to_lowercase() == c))
            })
            .filter(|r| tag.as_deref().is_none_or(|t| r.tags.iter().any(|rt| rt.to_lowercase() == t)))
            .collect();

        matched.sort_by(|a, b| compare(self.sort, a, b));
        matched
    }
}

fn normalized(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_lowercase)
}

fn matches_search(recipe: &Recipe, needle: &str) -> bool {
    recipe.title.to_lowercase().contains(needle)
        || recipe.description.to_lowercase().contains(needle)
        || recipe
            .ingredients
            .iter()
            .any(|i| i.to_lowercase().contains(needle))
}

fn compare(sort: SortKey, a: &Recipe, b: &Recipe) -> Ordering {
    match sort {
        SortKey::Newest => match (&a.created_at, &b.created_at) {
            (Some(x), Some(y)) => y.cmp(x),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        },
        SortKey::Rating => b
            .average_rating
            .total_cmp(&a.average_rating)
            .then_with(|| b.num_reviews.cmp(&a.num_reviews)),
        SortKey::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
    }
}

#[cfg(test)]
#[path = "catalog_test.rs"]
mod tests;

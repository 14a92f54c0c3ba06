use super::*;

fn recipe(id: &str, title: &str, created: Option<&str>, rating: f64, reviews: u32) -> Recipe {
    let mut r = Recipe::new(id, title);
    r.created_at = created.map(str::to_owned);
    r.average_rating = rating;
    r.num_reviews = reviews;
    r
}

fn ids(recipes: &[Recipe]) -> Vec<&str> {
    recipes.iter().map(Recipe::id).collect()
}

fn sample() -> Vec<Recipe> {
    let mut soup = recipe("soup", "Tomato Soup", Some("2024-03-01T00:00:00Z"), 4.0, 3);
    soup.description = "Warm and red".into();
    soup.ingredients = vec!["Tomato".into(), "Basil".into()];
    soup.category = Some("Dinner".into());
    soup.tags = vec!["vegan".into()];

    let mut cake = recipe("cake", "apple cake", Some("2024-05-01T00:00:00Z"), 4.0, 9);
    cake.ingredients = vec!["Apple".into(), "Flour".into()];
    cake.category = Some("dessert".into());
    cake.tags = vec!["Sweet".into()];

    let mut salad = recipe("salad", "Basil Salad", None, 5.0, 1);
    salad.category = Some("Dinner".into());
    salad.tags = vec!["Vegan".into(), "quick".into()];

    vec![soup, cake, salad]
}

#[test]
fn empty_query_sorts_newest_first_undated_last() {
    let out = RecipeQuery::default().apply(sample());
    assert_eq!(ids(&out), vec!["cake", "soup", "salad"]);
}

#[test]
fn search_matches_title_description_and_ingredients() {
    let by_ingredient = RecipeQuery { search: Some("basil".into()), ..Default::default() }.apply(sample());
    assert_eq!(ids(&by_ingredient), vec!["soup", "salad"]);

    let by_description = RecipeQuery { search: Some("  RED ".into()), ..Default::default() }.apply(sample());
    assert_eq!(ids(&by_description), vec!["soup"]);
}

#[test]
fn blank_search_is_ignored() {
    let out = RecipeQuery { search: Some("   ".into()), ..Default::default() }.apply(sample());
    assert_eq!(out.len(), 3);
}

#[test]
fn category_and_tag_are_case_insensitive_exact() {
    let dinner = RecipeQuery { category: Some("dinner".into()), ..Default::default() }.apply(sample());
    assert_eq!(ids(&dinner), vec!["soup", "salad"]);

    let vegan_dinner = RecipeQuery {
        category: Some("DINNER".into()),
        tag: Some("vegan".into()),
        sort: SortKey::Title,
        ..Default::default()
    }
    .apply(sample());
    assert_eq!(ids(&vegan_dinner), vec!["salad", "soup"]);

    let partial = RecipeQuery { tag: Some("veg".into()), ..Default::default() }.apply(sample());
    assert!(partial.is_empty());

    let mut tart = recipe("tart", "Tarte", None, 0.0, 0);
    tart.category = Some("CRÈME".into());
    tart.tags = vec!["ÉTÉ".into()];
    for (category, tag) in [("crème", "été"), ("CRÈME", "ÉTÉ"), ("Crème", "Été")] {
        let query = RecipeQuery { category: Some(category.into()), tag: Some(tag.into()), ..Default::default() };
        assert_eq!(ids(&query.apply(vec![tart.clone()])), vec!["tart"], "{category} / {tag}");
    }
}

#[test]
fn rating_sort_breaks_ties_by_review_count() {
    let out = RecipeQuery { sort: SortKey::Rating, ..Default::default() }.apply(sample());
    assert_eq!(ids(&out), vec!["salad", "cake", "soup"]);
}

#[test]
fn title_sort_ignores_case() {
    let out = RecipeQuery { sort: SortKey::Title, ..Default::default() }.apply(sample());
    assert_eq!(ids(&out), vec!["cake", "salad", "soup"]);
}

#[test]
fn sort_key_parses_aliases() {
    assert_eq!("Newest".parse::<SortKey>().unwrap(), SortKey::Newest);
    assert_eq!("top-rated".parse::<SortKey>().unwrap(), SortKey::Rating);
    assert_eq!(" az ".parse::<SortKey>().unwrap(), SortKey::Title);
    assert!("random".parse::<SortKey>().unwrap_err().contains("unknown sort key"));
}

//! Database module: schema and per-table queries for persistent storage.
//!
//! Layout:
//! - `schema.rs`: SQL DDL for initializing the database (SQLite-first)
//! - `sqlite.rs`: the `Storage` handle, connection setup and row helpers
//! - one file per table family, each adding `impl Storage` methods

pub mod cache;
pub mod grocery;
pub mod pinterest;
pub mod plans;
pub mod profiles;
pub mod recipes;
pub mod schema;
pub mod signals;
pub mod sqlite;

pub use cache::CachedRecipe;
pub use grocery::StoredGroceryList;
pub use pinterest::PinterestConnection;
pub use plans::NewMeal;
pub use schema::SQLITE_INIT;
pub use signals::Preferences;
pub use sqlite::{SqlitePool, Storage};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MealSource, Recipe, RecipeOrigin, SignalKind};
    use chrono::NaiveDate;

    async fn storage() -> Storage {
        Storage::connect("sqlite::memory:").await.unwrap()
    }

    fn recipe(name: &str) -> Recipe {
        Recipe {
            name: name.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn replacing_a_week_bumps_cache_counters() {
        let db = storage().await;
        let week = NaiveDate::from_ymd_opt(2025, 3, 3).unwrap();
        let meals = vec![
            NewMeal { day_of_week: 0, recipe: recipe("Chili"), source: MealSource::Generated },
            NewMeal { day_of_week: 3, recipe: recipe("Pad Thai"), source: MealSource::Generated },
        ];
        let first = db.replace_plan("u1", week, &meals).await.unwrap();
        let second = db.replace_plan("u1", week, &meals[..1]).await.unwrap();
        assert_ne!(first.id, second.id);

        let history = db.list_plans("u1").await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].meal_count, 1);

        let cached = db.cached_recipes(10).await.unwrap();
        assert_eq!(cached[0].recipe.name, "Chili");
        assert_eq!(cached[0].times_served, 2);
        assert_eq!(db.cache_size().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn saved_recipes_dedup_by_name() {
        let db = storage().await;
        db.insert_saved("u1", &recipe("Green Curry"), RecipeOrigin::Manual)
            .await
            .unwrap();
        let dup = db
            .insert_saved("u1", &recipe("green  curry"), RecipeOrigin::Pinterest)
            .await;
        assert!(matches!(dup, Err(crate::MealwiseError::DuplicateRecipe(_))));
        // another user may save the same name
        db.insert_saved("u2", &recipe("Green Curry"), RecipeOrigin::Manual)
            .await
            .unwrap();

        let found = db.list_saved("u1", Some("CURRY")).await.unwrap();
        assert_eq!(found.len(), 1);
        assert!(db.list_saved("u1", Some("tikka")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn later_signals_override_earlier_ones() {
        let db = storage().await;
        db.add_signal("u1", "Lasagna", SignalKind::Liked).await.unwrap();
        db.add_signal("u1", "Tacos", SignalKind::Disliked).await.unwrap();
        db.add_signal("u1", "lasagna", SignalKind::Disliked).await.unwrap();
        db.add_signal("u1", "Soup", SignalKind::Saved).await.unwrap();
        let prefs = db.preferences("u1").await.unwrap();
        assert!(prefs.liked.is_empty());
        assert_eq!(prefs.disliked, vec!["Tacos", "lasagna"]);
        assert!(prefs.is_disliked("LASAGNA"));
    }
}

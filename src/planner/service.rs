use chrono::{NaiveDate, Utc};
use std::collections::HashSet;
use tracing::{info, warn};

use super::week::{assign_days, week_start_of};
use crate::config::PlannerConfig;
use crate::db::{CachedRecipe, NewMeal, Preferences, Storage};
use crate::error::MealwiseError;
use crate::llm::prompts::{plan_prompt, swap_prompt};
use crate::llm::{SharedLlm, recipes_from_text};
use crate::types::{
    Meal, MealPlan, MealSource, Profile, Rating, Recipe, RecipeOrigin, SavedRecipe, SignalKind,
    name_key,
};

/// Rows of the shared recipe cache considered per plan.
const CACHE_SCAN_LIMIT: i64 = 500;

/// Plan generation and meal feedback for one request.
#[derive(Clone)]
pub struct Planner {
    storage: Storage,
    llm: SharedLlm,
    config: PlannerConfig,
}

impl Planner {
    pub fn new(storage: Storage, llm: SharedLlm, config: PlannerConfig) -> Self {
        Self {
            storage,
            llm,
            config,
        }
    }

    async fn require_profile(&self, user_id: &str) -> Result<Profile, MealwiseError> {
        self.storage
            .get_profile(user_id)
            .await?
            .filter(|p| p.onboarding_completed)
            .ok_or(MealwiseError::ProfileIncomplete)
    }

    /// Build and persist the plan for the week containing `week_of` (default: today).
    ///
    /// Any existing plan for that week is replaced along with its grocery list.
    pub async fn generate_plan(
        &self,
        user_id: &str,
        week_of: Option<NaiveDate>,
    ) -> Result<MealPlan, MealwiseError> {
        let week_start = week_start_of(week_of.unwrap_or_else(|| Utc::now().date_naive()));
        let profile = self.require_profile(user_id).await?;
        let quota = profile.dinners_per_week as usize;

        let prefs = self.storage.preferences(user_id).await?;
        let recent: HashSet<String> = self
            .storage
            .recent_meal_keys(user_id, week_start, self.config.recent_weeks)
            .await?
            .into_iter()
            .collect();
        let cached = self.storage.cached_recipes(CACHE_SCAN_LIMIT).await?;
        let mut candidates = cache_candidates(&profile, &prefs, &recent, cached).into_iter();

        let cache_share = self.config.cache_share.clamp(0.0, 1.0);
        let cache_quota = ((quota as f64) * cache_share).floor() as usize;

        let mut chosen: Vec<(Recipe, MealSource)> = Vec::with_capacity(quota);
        let mut taken: HashSet<String> = HashSet::new();
        for recipe in candidates.by_ref().take(cache_quota) {
            taken.insert(recipe.name_key());
            chosen.push((recipe, MealSource::Cache));
        }

        let mut llm_failure: Option<MealwiseError> = None;
        let wanted = quota - chosen.len();
        if wanted > 0 {
            let mut avoid: Vec<String> = chosen.iter().map(|(r, _)| r.name.clone()).collect();
            avoid.extend(recent.iter().cloned());
            avoid.extend(prefs.disliked.iter().cloned());

            let reply = self
                .llm
                .complete(plan_prompt(&profile, wanted, &avoid, &prefs))
                .await
                .and_then(|text| recipes_from_text(&text));
            match reply {
                Ok(generated) => {
                    for mut recipe in generated {
                        if chosen.len() >= quota {
                            break;
                        }
                        let key = recipe.name_key();
                        if taken.contains(&key) || recent.contains(&key) || prefs.is_disliked(&key) {
                            continue;
                        }
                        if recipe.servings.is_none() {
                            recipe.servings = Some(profile.household_size);
                        }
                        taken.insert(key);
                        chosen.push((recipe, MealSource::Generated));
                    }
                }
                Err(e) => {
                    warn!("plan generation LLM call failed for {}: {}", user_id, e);
                    llm_failure = Some(e);
                }
            }
        }

        // top up from the cache when the model came back short
        for recipe in candidates {
            if chosen.len() >= quota {
                break;
            }
            if taken.insert(recipe.name_key()) {
                chosen.push((recipe, MealSource::Cache));
            }
        }

        if chosen.is_empty() {
            return Err(llm_failure.unwrap_or_else(|| {
                MealwiseError::LlmOutput("no usable recipes for this plan".to_string())
            }));
        }

        let days = assign_days(chosen.len());
        let meals: Vec<NewMeal> = chosen
            .into_iter()
            .zip(days)
            .map(|((recipe, source), day_of_week)| NewMeal {
                day_of_week,
                recipe,
                source,
            })
            .collect();
        let from_cache = meals
            .iter()
            .filter(|m| m.source == MealSource::Cache)
            .count();

        let plan = self.storage.replace_plan(user_id, week_start, &meals).await?;
        info!(
            user_id,
            week_start = %week_start,
            meals = meals.len(),
            from_cache,
            "meal plan generated"
        );
        Ok(plan)
    }

    /// Replace one meal with a fresh LLM suggestion.
    pub async fn swap_meal(&self, user_id: &str, meal_id: i64) -> Result<Meal, MealwiseError> {
        let meal = self
            .storage
            .get_meal(user_id, meal_id)
            .await?
            .ok_or(MealwiseError::NotFound("meal"))?;
        let profile = self.require_profile(user_id).await?;
        let plan = self
            .storage
            .get_plan(user_id, meal.meal_plan_id)
            .await?
            .ok_or(MealwiseError::NotFound("plan"))?;
        let prefs = self.storage.preferences(user_id).await?;

        let mut avoid: Vec<String> = plan.meals.iter().map(|m| m.recipe.name.clone()).collect();
        avoid.extend(prefs.disliked.iter().cloned());
        let avoid_keys: HashSet<String> = avoid.iter().map(|n| name_key(n)).collect();

        let text = self
            .llm
            .complete(swap_prompt(&profile, &meal.recipe, &avoid))
            .await?;
        let mut replacement = recipes_from_text(&text)?
            .into_iter()
            .find(|r| !avoid_keys.contains(&r.name_key()))
            .ok_or_else(|| MealwiseError::LlmOutput("no usable replacement recipe".to_string()))?;
        if replacement.servings.is_none() {
            replacement.servings = Some(profile.household_size);
        }

        self.storage
            .add_signal(user_id, &meal.recipe.name, SignalKind::Skipped)
            .await?;
        let updated = self
            .storage
            .replace_meal_recipe(&meal, &replacement, MealSource::Generated)
            .await?;
        info!(
            user_id,
            meal_id,
            from = %meal.recipe.name,
            to = %updated.recipe.name,
            "meal swapped"
        );
        Ok(updated)
    }

    pub async fn rate_meal(
        &self,
        user_id: &str,
        meal_id: i64,
        rating: Rating,
    ) -> Result<Meal, MealwiseError> {
        let mut meal = self
            .storage
            .get_meal(user_id, meal_id)
            .await?
            .ok_or(MealwiseError::NotFound("meal"))?;
        self.storage.set_meal_rating(meal.id, rating).await?;
        self.storage
            .add_signal(user_id, &meal.recipe.name, rating.into())
            .await?;
        meal.rating = Some(rating);
        Ok(meal)
    }

    /// Copy a meal's recipe into the cookbook. Saving twice returns the existing row.
    pub async fn save_meal(&self, user_id: &str, meal_id: i64) -> Result<SavedRecipe, MealwiseError> {
        let meal = self
            .storage
            .get_meal(user_id, meal_id)
            .await?
            .ok_or(MealwiseError::NotFound("meal"))?;
        if let Some(existing) = self.storage.find_saved_by_name(user_id, &meal.recipe.name).await? {
            return Ok(existing);
        }
        let saved = match self
            .storage
            .insert_saved(user_id, &meal.recipe, RecipeOrigin::Meal)
            .await
        {
            Ok(saved) => saved,
            // lost a race with a concurrent save
            Err(MealwiseError::DuplicateRecipe(_)) => self
                .storage
                .find_saved_by_name(user_id, &meal.recipe.name)
                .await?
                .ok_or(MealwiseError::NotFound("recipe"))?,
            Err(e) => return Err(e),
        };
        self.storage
            .add_signal(user_id, &meal.recipe.name, SignalKind::Saved)
            .await?;
        Ok(saved)
    }
}

/// Cached recipes usable for this profile, liked first, then most served.
fn cache_candidates(
    profile: &Profile,
    prefs: &Preferences,
    recent: &HashSet<String>,
    cached: Vec<CachedRecipe>,
) -> Vec<Recipe> {
    let mut usable: Vec<(bool, i64, Recipe)> = cached
        .into_iter()
        .filter(|c| fits_profile(&c.recipe, profile))
        .filter(|c| {
            let key = c.recipe.name_key();
            !recent.contains(&key) && !prefs.is_disliked(&key)
        })
        .map(|c| (prefs.is_liked(&c.recipe.name), c.times_served, c.recipe))
        .collect();
    usable.sort_by(|a, b| b.0.cmp(&a.0).then(b.1.cmp(&a.1)));
    usable.into_iter().map(|(_, _, r)| r).collect()
}

fn fits_profile(recipe: &Recipe, profile: &Profile) -> bool {
    let restrictions_met = profile
        .dietary_restrictions
        .iter()
        .all(|r| recipe.has_tag(r));
    let no_disliked = !profile
        .disliked_ingredients
        .iter()
        .any(|d| recipe.mentions_ingredient(d));
    let quick_enough = match (profile.max_cook_minutes, recipe.total_minutes()) {
        (Some(max), Some(total)) => total <= max,
        _ => true,
    };
    restrictions_met && no_disliked && quick_enough
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{CompletionRequest, LlmClient};
    use crate::types::{Ingredient, SkillLevel};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct ScriptedLlm {
        replies: Mutex<VecDeque<Result<String, MealwiseError>>>,
        prompts: Mutex<Vec<CompletionRequest>>,
    }

    impl ScriptedLlm {
        fn with(replies: Vec<Result<String, MealwiseError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                prompts: Mutex::default(),
            })
        }
    }

    #[async_trait]
    impl LlmClient for ScriptedLlm {
        async fn complete(&self, req: CompletionRequest) -> Result<String, MealwiseError> {
            self.prompts.lock().unwrap().push(req);
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(MealwiseError::LlmNotConfigured))
        }
    }

    fn recipe(name: &str) -> Recipe {
        Recipe {
            name: name.to_string(),
            prep_minutes: Some(10),
            cook_minutes: Some(20),
            ingredients: vec![Ingredient {
                name: "rice".into(),
                quantity: Some(1.0),
                unit: Some("cup".into()),
                category: Default::default(),
                note: None,
            }],
            ..Default::default()
        }
    }

    fn profile(user_id: &str, dinners: u32) -> Profile {
        Profile {
            user_id: user_id.into(),
            display_name: None,
            household_size: 2,
            dinners_per_week: dinners,
            dietary_restrictions: vec![],
            disliked_ingredients: vec![],
            favorite_cuisines: vec![],
            max_cook_minutes: None,
            skill_level: SkillLevel::Intermediate,
            onboarding_completed: true,
            updated_at: Utc::now(),
        }
    }

    fn week() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 4).unwrap()
    }

    /// Seed the shared cache through another user's old plan.
    async fn seed_cache(storage: &Storage, names: &[&str]) {
        let meals: Vec<NewMeal> = names
            .iter()
            .map(|n| NewMeal {
                day_of_week: 0,
                recipe: recipe(n),
                source: MealSource::Generated,
            })
            .collect();
        let old_week = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        storage.replace_plan("seed", old_week, &meals).await.unwrap();
    }

    fn reply(names: &[&str]) -> Result<String, MealwiseError> {
        let recipes: Vec<_> = names
            .iter()
            .map(|n| serde_json::json!({"name": n, "ingredients": ["1 onion"]}))
            .collect();
        Ok(serde_json::json!({ "recipes": recipes }).to_string())
    }

    async fn setup(
        dinners: u32,
        llm: Arc<ScriptedLlm>,
    ) -> (Storage, Planner) {
        let storage = Storage::connect("sqlite::memory:").await.unwrap();
        storage.upsert_profile(&profile("u1", dinners)).await.unwrap();
        let planner = Planner::new(storage.clone(), llm, PlannerConfig::default());
        (storage, planner)
    }

    #[tokio::test]
    async fn mixes_cache_and_generated_without_duplicates() {
        let llm = ScriptedLlm::with(vec![reply(&["Risotto", "Bibimbap", "Gumbo"])]);
        let (storage, planner) = setup(4, llm.clone()).await;
        seed_cache(&storage, &["Risotto", "Tacos"]).await;

        let plan = planner.generate_plan("u1", Some(week())).await.unwrap();
        assert_eq!(plan.week_start, NaiveDate::from_ymd_opt(2025, 6, 2).unwrap());
        let names: Vec<_> = plan.meals.iter().map(|m| m.recipe.name.as_str()).collect();
        assert_eq!(names.len(), 4);
        assert_eq!(
            plan.meals.iter().filter(|m| m.source == MealSource::Cache).count(),
            2
        );
        // the cached Risotto was already chosen, so the generated one is dropped
        assert_eq!(names.iter().filter(|n| **n == "Risotto").count(), 1);
        assert!(names.contains(&"Bibimbap") && names.contains(&"Gumbo"));
        let days: Vec<u8> = plan.meals.iter().map(|m| m.day_of_week).collect();
        assert_eq!(days, vec![0, 1, 3, 5]);

        let prompts = llm.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].prompt.contains("Plan 2 distinct dinners"));
        assert!(prompts[0].prompt.contains("Risotto"));
    }

    #[tokio::test]
    async fn llm_failure_is_topped_up_from_cache() {
        let llm = ScriptedLlm::with(vec![Err(MealwiseError::LlmUpstream {
            status: axum::http::StatusCode::BAD_GATEWAY,
            body: String::new(),
        })]);
        let (storage, planner) = setup(4, llm).await;
        seed_cache(&storage, &["A", "B", "C"]).await;

        let plan = planner.generate_plan("u1", Some(week())).await.unwrap();
        assert_eq!(plan.meals.len(), 3);
        assert!(plan.meals.iter().all(|m| m.source == MealSource::Cache));
    }

    #[tokio::test]
    async fn empty_plan_is_an_error() {
        let llm = ScriptedLlm::with(vec![Ok("I cannot help with that".into())]);
        let (_storage, planner) = setup(3, llm).await;
        let err = planner.generate_plan("u1", Some(week())).await.unwrap_err();
        assert!(matches!(err, MealwiseError::LlmOutput(_)));
    }

    #[tokio::test]
    async fn profile_is_required() {
        let llm = ScriptedLlm::with(vec![]);
        let (_storage, planner) = setup(3, llm).await;
        let err = planner.generate_plan("nobody", None).await.unwrap_err();
        assert!(matches!(err, MealwiseError::ProfileIncomplete));
    }

    #[tokio::test]
    async fn disliked_and_recent_meals_are_not_reused() {
        let llm = ScriptedLlm::with(vec![
            reply(&["Stew"]),
            reply(&["Ramen", "Pho"]),
        ]);
        let (storage, planner) = setup(2, llm).await;
        seed_cache(&storage, &["Pizza", "Curry"]).await;
        storage.add_signal("u1", "pizza", SignalKind::Disliked).await.unwrap();

        // one cache slot: Pizza is disliked, so Curry is used
        let first = planner.generate_plan("u1", Some(week())).await.unwrap();
        let names: Vec<_> = first.meals.iter().map(|m| m.recipe.name.clone()).collect();
        assert_eq!(names, vec!["Curry", "Stew"]);

        // next week Curry and Stew are recent, leaving no cache candidates
        let next = week() + chrono::Duration::days(7);
        let second = planner.generate_plan("u1", Some(next)).await.unwrap();
        let names: Vec<_> = second.meals.iter().map(|m| m.recipe.name.clone()).collect();
        assert_eq!(names, vec!["Ramen", "Pho"]);
    }

    #[test]
    fn profile_filter_checks_tags_dislikes_and_time() {
        let mut p = profile("u", 3);
        p.dietary_restrictions = vec!["vegetarian".into()];
        p.disliked_ingredients = vec!["ric".into()];
        p.max_cook_minutes = Some(25);

        let mut r = recipe("Fried Rice");
        assert!(!fits_profile(&r, &p));
        r.dietary_tags = vec!["Vegetarian".into()];
        assert!(!fits_profile(&r, &p), "substring dislike still applies");
        p.disliked_ingredients.clear();
        assert!(!fits_profile(&r, &p), "30 minutes exceeds the limit");
        p.max_cook_minutes = Some(30);
        assert!(fits_profile(&r, &p));
    }

    #[tokio::test]
    async fn swap_records_skip_and_replaces_recipe() {
        let llm = ScriptedLlm::with(vec![reply(&["Lasagna"]), reply(&["Lasagna", "Falafel"])]);
        let (storage, planner) = setup(1, llm).await;
        let plan = planner.generate_plan("u1", Some(week())).await.unwrap();
        let meal_id = plan.meals[0].id;

        let swapped = planner.swap_meal("u1", meal_id).await.unwrap();
        assert_eq!(swapped.recipe.name, "Falafel");
        assert_eq!(swapped.rating, None);

        let reloaded = storage.get_plan("u1", plan.id).await.unwrap().unwrap();
        assert_eq!(reloaded.meals[0].recipe.name, "Falafel");
        assert!(matches!(
            planner.swap_meal("someone-else", meal_id).await,
            Err(MealwiseError::NotFound("meal"))
        ));
    }

    #[tokio::test]
    async fn rating_and_saving_feed_preferences() {
        let llm = ScriptedLlm::with(vec![reply(&["Paella"])]);
        let (storage, planner) = setup(1, llm).await;
        let plan = planner.generate_plan("u1", Some(week())).await.unwrap();
        let meal_id = plan.meals[0].id;

        let rated = planner.rate_meal("u1", meal_id, Rating::Liked).await.unwrap();
        assert_eq!(rated.rating, Some(Rating::Liked));
        assert!(storage.preferences("u1").await.unwrap().is_liked("paella"));

        let first = planner.save_meal("u1", meal_id).await.unwrap();
        let again = planner.save_meal("u1", meal_id).await.unwrap();
        assert_eq!(first.id, again.id);
        assert_eq!(first.origin, RecipeOrigin::Meal);
    }
}

use std::fmt::Write as _;

use super::CompletionRequest;
use crate::db::Preferences;
use crate::types::{GroceryCategory, Profile, Recipe};

const RECIPE_SCHEMA: &str = r#"{
  "name": string,
  "description": string,
  "cuisine": string,
  "prep_minutes": integer,
  "cook_minutes": integer,
  "servings": integer,
  "dietary_tags": [string],
  "ingredients": [{"name": string, "quantity": number|null, "unit": string|null, "category": string}],
  "instructions": [string]
}"#;

const PLANNER_SYSTEM: &str = "You are a home-cooking meal planner. \
Reply with JSON only, no prose and no Markdown.";

const EXTRACT_SYSTEM: &str = "You extract recipes from web page text. \
Reply with JSON only, no prose and no Markdown. Never invent a recipe that is not on the page.";

const GENERATE_SYSTEM: &str = "You write realistic home recipes from short descriptions. \
Reply with JSON only, no prose and no Markdown.";

fn category_names() -> String {
    GroceryCategory::ALL
        .iter()
        .filter_map(|c| serde_json::to_value(c).ok())
        .filter_map(|v| v.as_str().map(str::to_string))
        .collect::<Vec<_>>()
        .join(", ")
}

fn list_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "none".to_string()
    } else {
        items.join(", ")
    }
}

fn household_section(profile: &Profile) -> String {
    let mut s = String::new();
    let _ = writeln!(s, "Household size: {}", profile.household_size);
    let _ = writeln!(
        s,
        "Dietary restrictions (must all be honored): {}",
        list_or_none(&profile.dietary_restrictions)
    );
    let _ = writeln!(
        s,
        "Never use these ingredients: {}",
        list_or_none(&profile.disliked_ingredients)
    );
    let _ = writeln!(
        s,
        "Favorite cuisines: {}",
        list_or_none(&profile.favorite_cuisines)
    );
    if let Some(max) = profile.max_cook_minutes {
        let _ = writeln!(s, "Total prep plus cook time at most {max} minutes");
    }
    let _ = writeln!(s, "Cooking skill: {}", profile.skill_level.as_str());
    s
}

fn output_rules() -> String {
    format!(
        "Each recipe object must follow this shape:\n{RECIPE_SCHEMA}\n\
         \"servings\" should match the household size. \
         \"dietary_tags\" must list every restriction the recipe satisfies, lowercase. \
         \"category\" is one of: {}. \
         Use units such as tsp, tbsp, cup, ml, l, oz, lb, g, kg, clove, can, or omit the unit for whole items.\n",
        category_names()
    )
}

/// Ask for `count` distinct dinners for one week.
pub fn plan_prompt(
    profile: &Profile,
    count: usize,
    avoid: &[String],
    prefs: &Preferences,
) -> CompletionRequest {
    let mut prompt = format!("Plan {count} distinct dinners for this household.\n\n");
    prompt.push_str(&household_section(profile));
    let _ = writeln!(
        prompt,
        "Do not suggest any of these dishes: {}",
        list_or_none(avoid)
    );
    if !prefs.liked.is_empty() {
        let _ = writeln!(
            prompt,
            "Dishes they enjoyed (suggest similar ideas, not repeats): {}",
            prefs.liked.join(", ")
        );
    }
    if !prefs.disliked.is_empty() {
        let _ = writeln!(
            prompt,
            "Dishes they disliked (avoid similar ideas): {}",
            prefs.disliked.join(", ")
        );
    }
    prompt.push('\n');
    prompt.push_str(&output_rules());
    let _ = write!(
        prompt,
        "Reply as {{\"recipes\": [ ...exactly {count} recipe objects... ]}}"
    );
    CompletionRequest::new(PLANNER_SYSTEM, prompt)
}

/// Ask for one replacement dinner.
pub fn swap_prompt(profile: &Profile, current: &Recipe, avoid: &[String]) -> CompletionRequest {
    let mut prompt = format!(
        "Suggest one dinner to replace \"{}\", which the household wants to skip this week.\n\n",
        current.name
    );
    prompt.push_str(&household_section(profile));
    let _ = writeln!(
        prompt,
        "Do not suggest any of these dishes: {}",
        list_or_none(avoid)
    );
    prompt.push('\n');
    prompt.push_str(&output_rules());
    prompt.push_str("Reply as {\"recipes\": [ one recipe object ]}");
    CompletionRequest::new(PLANNER_SYSTEM, prompt)
}

/// Ask the model to pull a recipe out of visible page text.
pub fn extract_prompt(page_text: &str, title_hint: Option<&str>) -> CompletionRequest {
    let mut prompt = String::from("Extract the recipe from the web page text below.\n");
    if let Some(title) = title_hint {
        let _ = writeln!(prompt, "The page was saved under the title \"{title}\".");
    }
    prompt.push_str(&output_rules());
    prompt.push_str(
        "Reply as {\"recipe\": recipe object}. If the page holds no recipe, reply {\"recipe\": null}.\n\n",
    );
    prompt.push_str("PAGE TEXT:\n");
    prompt.push_str(page_text);
    CompletionRequest::new(EXTRACT_SYSTEM, prompt)
}

/// Ask the model to write a plausible recipe from a pin's title and description.
pub fn generate_prompt(title: Option<&str>, description: Option<&str>) -> CompletionRequest {
    let mut prompt = String::from("Write a complete recipe for the dish described below.\n");
    if let Some(title) = title {
        let _ = writeln!(prompt, "Title: {title}");
    }
    if let Some(description) = description {
        let _ = writeln!(prompt, "Description: {description}");
    }
    prompt.push_str(&output_rules());
    prompt.push_str("Reply as {\"recipe\": recipe object}.");
    CompletionRequest::new(GENERATE_SYSTEM, prompt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SkillLevel;
    use chrono::Utc;

    fn profile() -> Profile {
        Profile {
            user_id: "u".into(),
            display_name: None,
            household_size: 3,
            dinners_per_week: 4,
            dietary_restrictions: vec!["vegetarian".into()],
            disliked_ingredients: vec!["cilantro".into()],
            favorite_cuisines: vec![],
            max_cook_minutes: Some(45),
            skill_level: SkillLevel::Beginner,
            onboarding_completed: true,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn plan_prompt_carries_constraints() {
        let prefs = Preferences {
            liked: vec!["Shakshuka".into()],
            disliked: vec![],
        };
        let req = plan_prompt(&profile(), 2, &["Veggie Chili".into()], &prefs);
        assert!(req.prompt.contains("Plan 2 distinct dinners"));
        assert!(req.prompt.contains("vegetarian"));
        assert!(req.prompt.contains("cilantro"));
        assert!(req.prompt.contains("at most 45 minutes"));
        assert!(req.prompt.contains("Veggie Chili"));
        assert!(req.prompt.contains("Shakshuka"));
        assert!(!req.prompt.contains("disliked (avoid"));
        assert!(req.prompt.contains("meat_seafood"));
    }

    #[test]
    fn extract_prompt_allows_null() {
        let req = extract_prompt("Mix and bake.", Some("Banana bread"));
        assert!(req.prompt.contains("{\"recipe\": null}"));
        assert!(req.prompt.ends_with("Mix and bake."));
    }
}

//! SQL DDL for initializing storage.
//! SQLite-first design; timestamps are RFC3339 text, dates are `YYYY-MM-DD`,
//! structured values (recipes, lists) are JSON text.

pub const SQLITE_INIT: &str = r#"
CREATE TABLE IF NOT EXISTS profiles (
    user_id TEXT PRIMARY KEY,
    display_name TEXT NULL,
    household_size INTEGER NOT NULL,
    dinners_per_week INTEGER NOT NULL,
    dietary_restrictions TEXT NOT NULL DEFAULT '[]',
    disliked_ingredients TEXT NOT NULL DEFAULT '[]',
    favorite_cuisines TEXT NOT NULL DEFAULT '[]',
    max_cook_minutes INTEGER NULL,
    skill_level TEXT NOT NULL DEFAULT 'intermediate',
    onboarding_completed INTEGER NOT NULL DEFAULT 0,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS meal_plans (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL,
    week_start TEXT NOT NULL,
    created_at TEXT NOT NULL,
    UNIQUE (user_id, week_start)
);

CREATE TABLE IF NOT EXISTS meals (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    meal_plan_id INTEGER NOT NULL REFERENCES meal_plans(id) ON DELETE CASCADE,
    day_of_week INTEGER NOT NULL,
    name TEXT NOT NULL,
    recipe TEXT NOT NULL,
    source TEXT NOT NULL,
    rating TEXT NULL
);

CREATE INDEX IF NOT EXISTS idx_meals_plan ON meals(meal_plan_id);

CREATE TABLE IF NOT EXISTS saved_recipes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL,
    name TEXT NOT NULL,
    name_key TEXT NOT NULL,
    recipe TEXT NOT NULL,
    origin TEXT NOT NULL,
    source_url TEXT NULL,
    image_url TEXT NULL,
    created_at TEXT NOT NULL,
    UNIQUE (user_id, name_key)
);

CREATE TABLE IF NOT EXISTS grocery_lists (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    meal_plan_id INTEGER NOT NULL UNIQUE REFERENCES meal_plans(id) ON DELETE CASCADE,
    user_id TEXT NOT NULL,
    group_by TEXT NOT NULL,
    list TEXT NOT NULL,
    checked TEXT NOT NULL DEFAULT '[]',
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS preference_signals (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL,
    recipe_name TEXT NOT NULL,
    signal TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_signals_user ON preference_signals(user_id);

CREATE TABLE IF NOT EXISTS recipe_cache (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name_key TEXT NOT NULL UNIQUE,
    recipe TEXT NOT NULL,
    cuisine TEXT NULL,
    dietary_tags TEXT NOT NULL DEFAULT '[]',
    total_minutes INTEGER NULL,
    times_served INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    last_served_at TEXT NULL
);

CREATE TABLE IF NOT EXISTS pinterest_connections (
    user_id TEXT PRIMARY KEY,
    access_token TEXT NOT NULL,
    refresh_token TEXT NULL,
    expires_at TEXT NOT NULL,
    scope TEXT NULL,
    username TEXT NULL,
    updated_at TEXT NOT NULL
);
"#;

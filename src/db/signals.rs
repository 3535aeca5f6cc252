use chrono::Utc;
use std::collections::HashMap;

use super::sqlite::Storage;
use crate::error::MealwiseError;
use crate::types::{SignalKind, name_key};

/// Latest like/dislike per recipe name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Preferences {
    pub liked: Vec<String>,
    pub disliked: Vec<String>,
}

impl Preferences {
    pub fn is_liked(&self, name: &str) -> bool {
        let key = name_key(name);
        self.liked.iter().any(|n| name_key(n) == key)
    }

    pub fn is_disliked(&self, name: &str) -> bool {
        let key = name_key(name);
        self.disliked.iter().any(|n| name_key(n) == key)
    }
}

impl Storage {
    pub async fn add_signal(
        &self,
        user_id: &str,
        recipe_name: &str,
        kind: SignalKind,
    ) -> Result<(), MealwiseError> {
        sqlx::query(
            r#"INSERT INTO preference_signals (user_id, recipe_name, signal, created_at)
               VALUES (?, ?, ?, ?)"#,
        )
        .bind(user_id)
        .bind(recipe_name)
        .bind(kind.as_str())
        .bind(Utc::now().to_rfc3339())
        .execute(self.pool())
        .await?;
        Ok(())
    }

    /// Fold the signal log into current likes and dislikes; a later signal for the
    /// same name overrides an earlier one.
    pub async fn preferences(&self, user_id: &str) -> Result<Preferences, MealwiseError> {
        let rows: Vec<(String, String)> = sqlx::query_as(
            r#"SELECT recipe_name, signal FROM preference_signals
               WHERE user_id = ? AND signal IN ('liked', 'disliked')
               ORDER BY id ASC"#,
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;

        let mut latest: HashMap<String, (usize, String, bool)> = HashMap::new();
        for (idx, (name, signal)) in rows.into_iter().enumerate() {
            latest.insert(name_key(&name), (idx, name, signal == "liked"));
        }
        let mut ordered: Vec<_> = latest.into_values().collect();
        ordered.sort_by_key(|(idx, _, _)| *idx);

        let mut prefs = Preferences::default();
        for (_, name, liked) in ordered {
            if liked {
                prefs.liked.push(name);
            } else {
                prefs.disliked.push(name);
            }
        }
        Ok(prefs)
    }
}

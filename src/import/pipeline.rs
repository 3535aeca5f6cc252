use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use super::html::{page_text, page_title};
use super::jsonld::recipe_from_html;
use crate::config::ImportConfig;
use crate::db::Storage;
use crate::error::MealwiseError;
use crate::http::build_http_client;
use crate::llm::prompts::{extract_prompt, generate_prompt};
use crate::llm::{SharedLlm, optional_recipe_from_text};
use crate::pinterest::{PinSummary, PinterestService};
use crate::types::{Recipe, RecipeOrigin, SavedRecipe};

/// Pages larger than this are abandoned without being parsed.
pub const MAX_PAGE_BYTES: usize = 2 * 1024 * 1024;
pub const MAX_IMPORT_BATCH: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    StructuredData,
    AiExtracted,
    AiGenerated,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedRecipe {
    pub recipe: Recipe,
    pub method: ExtractionMethod,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportedPin {
    pub pin_id: String,
    pub method: ExtractionMethod,
    pub recipe: SavedRecipe,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DuplicatePin {
    pub pin_id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedPin {
    pub pin_id: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportReport {
    pub imported: Vec<ImportedPin>,
    pub duplicates: Vec<DuplicatePin>,
    pub failed: Vec<FailedPin>,
}

/// Turns pins into cookbook recipes: structured data, then AI extraction, then AI generation.
#[derive(Clone)]
pub struct Importer {
    storage: Storage,
    pinterest: PinterestService,
    llm: SharedLlm,
    http: reqwest::Client,
    config: ImportConfig,
}

impl Importer {
    pub fn new(
        storage: Storage,
        pinterest: PinterestService,
        llm: SharedLlm,
        config: ImportConfig,
    ) -> Result<Self, MealwiseError> {
        let http = build_http_client(Duration::from_secs(config.fetch_timeout_secs.max(1)))?;
        Ok(Self {
            storage,
            pinterest,
            llm,
            http,
            config,
        })
    }

    /// Fetch a page body as text. Bodies over [`MAX_PAGE_BYTES`] are an error.
    pub async fn fetch_page(&self, url: &str) -> Result<String, MealwiseError> {
        let url = Url::parse(url)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(MealwiseError::Validation(format!(
                "unsupported link scheme: {}",
                url.scheme()
            )));
        }
        let resp = self
            .http
            .get(url)
            .header("Accept", "text/html,application/xhtml+xml")
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(MealwiseError::UpstreamStatus(status));
        }

        if resp.content_length().is_some_and(|len| len > MAX_PAGE_BYTES as u64) {
            return Err(MealwiseError::PageTooLarge(MAX_PAGE_BYTES));
        }
        let mut body: Vec<u8> = Vec::new();
        let mut chunks = resp.bytes_stream();
        while let Some(chunk) = chunks.next().await {
            let chunk = chunk?;
            if body.len() + chunk.len() > MAX_PAGE_BYTES {
                return Err(MealwiseError::PageTooLarge(MAX_PAGE_BYTES));
            }
            body.extend_from_slice(&chunk);
        }
        Ok(String::from_utf8_lossy(&body).into_owned())
    }

    /// Run the three extraction stages for one pin.
    pub async fn extract_recipe(&self, pin: &PinSummary) -> Result<ExtractedRecipe, MealwiseError> {
        let page = match pin.link.as_deref() {
            Some(link) => match self.fetch_page(link).await {
                Ok(html) => Some(html),
                Err(e) => {
                    warn!(pin_id = %pin.id, "fetching pin link failed: {}", e);
                    None
                }
            },
            None => None,
        };

        if let Some(html) = page {
            if let Some(recipe) = recipe_from_html(&html) {
                return Ok(finish(recipe, pin, ExtractionMethod::StructuredData));
            }

            let text = page_text(&html, self.config.max_page_chars);
            if !text.is_empty() {
                let title = pin.title.clone().or_else(|| page_title(&html));
                let reply = self
                    .llm
                    .complete(extract_prompt(&text, title.as_deref()))
                    .await
                    .and_then(|t| optional_recipe_from_text(&t));
                match reply {
                    Ok(Some(recipe)) => {
                        return Ok(finish(recipe, pin, ExtractionMethod::AiExtracted));
                    }
                    Ok(None) => debug!(pin_id = %pin.id, "no recipe found in page text"),
                    Err(e) => warn!(pin_id = %pin.id, "AI extraction failed: {}", e),
                }
            }
        }

        if pin.title.is_none() && pin.description.is_none() {
            return Err(MealwiseError::NoRecipeInformation);
        }
        let text = self
            .llm
            .complete(generate_prompt(pin.title.as_deref(), pin.description.as_deref()))
            .await?;
        let recipe = optional_recipe_from_text(&text)?
            .ok_or_else(|| MealwiseError::LlmOutput("model returned no recipe".to_string()))?;
        Ok(finish(recipe, pin, ExtractionMethod::AiGenerated))
    }

    async fn import_one(&self, user_id: &str, pin_id: &str) -> Result<ExtractedRecipe, MealwiseError> {
        let pin = self.pinterest.get_pin(user_id, pin_id).await?;
        self.extract_recipe(&pin).await
    }

    /// Import a batch of pins. Individual failures are reported, never raised.
    pub async fn import_pins(
        &self,
        user_id: &str,
        pin_ids: &[String],
    ) -> Result<ImportReport, MealwiseError> {
        let mut seen_ids = HashSet::new();
        let pin_ids: Vec<&str> = pin_ids
            .iter()
            .map(|id| id.trim())
            .filter(|id| !id.is_empty() && seen_ids.insert(*id))
            .collect();
        if pin_ids.is_empty() {
            return Err(MealwiseError::Validation("pin_ids must not be empty".to_string()));
        }
        if pin_ids.len() > MAX_IMPORT_BATCH {
            return Err(MealwiseError::Validation(format!(
                "at most {MAX_IMPORT_BATCH} pins per import"
            )));
        }
        // fail the whole request early when there is no usable connection
        self.pinterest.valid_access_token(user_id).await?;

        let concurrency = self.config.concurrency.max(1);
        let mut results: Vec<(usize, &str, Result<ExtractedRecipe, MealwiseError>)> =
            stream::iter(pin_ids.iter().copied().enumerate())
                .map(|(idx, pin_id)| async move {
                    (idx, pin_id, self.import_one(user_id, pin_id).await)
                })
                .buffer_unordered(concurrency)
                .boxed()
                .collect()
                .await;
        results.sort_by_key(|(idx, _, _)| *idx);

        let mut known = self.storage.saved_name_keys(user_id).await?;
        let mut report = ImportReport::default();
        for (_, pin_id, result) in results {
            let extracted = match result {
                Ok(extracted) => extracted,
                Err(e) => {
                    report.failed.push(FailedPin {
                        pin_id: pin_id.to_string(),
                        reason: e.to_string(),
                    });
                    continue;
                }
            };
            let key = extracted.recipe.name_key();
            if known.contains(&key) {
                report.duplicates.push(DuplicatePin {
                    pin_id: pin_id.to_string(),
                    name: extracted.recipe.name,
                });
                continue;
            }
            let saved = self
                .storage
                .insert_saved(user_id, &extracted.recipe, RecipeOrigin::Pinterest)
                .await;
            report.settle(&mut known, pin_id, key, extracted, saved);
        }

        info!(
            user_id,
            imported = report.imported.len(),
            duplicates = report.duplicates.len(),
            failed = report.failed.len(),
            "pinterest import finished"
        );
        Ok(report)
    }
}

impl ImportReport {
    /// Record the outcome of saving one extracted pin. Only names that made it
    /// into the cookbook count as known for the rest of the batch.
    fn settle(
        &mut self,
        known: &mut HashSet<String>,
        pin_id: &str,
        key: String,
        extracted: ExtractedRecipe,
        saved: Result<SavedRecipe, MealwiseError>,
    ) {
        match saved {
            Ok(recipe) => {
                known.insert(key);
                self.imported.push(ImportedPin {
                    pin_id: pin_id.to_string(),
                    method: extracted.method,
                    recipe,
                });
            }
            Err(MealwiseError::DuplicateRecipe(_)) => {
                known.insert(key);
                self.duplicates.push(DuplicatePin {
                    pin_id: pin_id.to_string(),
                    name: extracted.recipe.name,
                });
            }
            Err(e) => self.failed.push(FailedPin {
                pin_id: pin_id.to_string(),
                reason: e.to_string(),
            }),
        }
    }
}

/// Attach the pin's link and image where the recipe has none.
fn finish(mut recipe: Recipe, pin: &PinSummary, method: ExtractionMethod) -> ExtractedRecipe {
    if pin.link.is_some() {
        recipe.source_url = pin.link.clone();
    }
    if recipe.image_url.is_none() {
        recipe.image_url = pin.image_url.clone();
    }
    ExtractedRecipe { recipe, method }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn extracted(name: &str) -> ExtractedRecipe {
        ExtractedRecipe {
            recipe: Recipe {
                name: name.into(),
                ..Default::default()
            },
            method: ExtractionMethod::AiGenerated,
        }
    }

    #[test]
    fn failed_save_leaves_name_free_for_later_pins() {
        let mut report = ImportReport::default();
        let mut known = HashSet::new();
        let first = extracted("Tomato Soup");
        let key = first.recipe.name_key();

        report.settle(
            &mut known,
            "1",
            key.clone(),
            first,
            Err(MealwiseError::Validation("disk full".into())),
        );
        assert!(!known.contains(&key));
        assert_eq!(report.failed[0].pin_id, "1");

        let second = extracted("tomato soup");
        let saved = SavedRecipe {
            id: 7,
            user_id: "u1".into(),
            recipe: second.recipe.clone(),
            origin: RecipeOrigin::Pinterest,
            source_url: None,
            image_url: None,
            created_at: Utc::now(),
        };
        report.settle(&mut known, "2", second.recipe.name_key(), second, Ok(saved));
        assert!(known.contains(&key));
        assert_eq!(report.imported.len(), 1);
        assert_eq!(report.imported[0].pin_id, "2");
    }

    #[test]
    fn store_side_duplicate_is_remembered() {
        let mut report = ImportReport::default();
        let mut known = HashSet::new();
        let dup = extracted("Chili");
        let key = dup.recipe.name_key();
        report.settle(
            &mut known,
            "9",
            key.clone(),
            dup,
            Err(MealwiseError::DuplicateRecipe("Chili".into())),
        );
        assert!(known.contains(&key));
        assert_eq!(report.duplicates[0].name, "Chili");
        assert!(report.failed.is_empty());
    }
}

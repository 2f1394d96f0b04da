//! AI service client: meal analysis, recipe suggestions and recipe pictures.

mod gemini;

pub use gemini::{GeminiClient, IMAGE_MIME_TYPE};

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::de::DeserializeOwned;

use crate::config::{resolve_api_key, AiConfig};
use crate::error::{AnnapurnaError, Result, INVALID_FORMAT_MESSAGE};
use crate::model::{MealAnalysis, Nutrients, Profile, Recipe};
use crate::prompts;

static LEADING_FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*```(?:json|JSON)?\s*").unwrap());
static TRAILING_FENCE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s*```\s*$").unwrap());

static PLACEHOLDER_IMAGE_BASE: LazyLock<reqwest::Url> =
    LazyLock::new(|| reqwest::Url::parse("https://picsum.photos/seed/").unwrap());

/// Remove a markdown code fence wrapped around a model answer, if present.
pub fn strip_code_fences(text: &str) -> &str {
    let start = LEADING_FENCE_RE.find(text).map_or(0, |m| m.end());
    let rest = &text[start..];
    let end = TRAILING_FENCE_RE.find(rest).map_or(rest.len(), |m| m.start());
    &rest[..end]
}

/// Strip code fences and decode the remaining JSON. Anything that does not
/// decode into `T` is an [`AnnapurnaError::InvalidFormat`].
pub fn parse_json_response<T: DeserializeOwned>(text: &str) -> Result<T> {
    let cleaned = strip_code_fences(text);
    serde_json::from_str(cleaned).map_err(|e| {
        tracing::error!(error = %e, response = %cleaned, "failed to parse JSON from AI");
        AnnapurnaError::InvalidFormat(INVALID_FORMAT_MESSAGE.to_string())
    })
}

/// Deterministic stand-in picture for a recipe, seeded by its name.
pub fn placeholder_image_url(recipe_name: &str) -> String {
    let mut url = PLACEHOLDER_IMAGE_BASE.clone();
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.pop_if_empty().push(recipe_name).push("400").push("300");
    }
    url.to_string()
}

pub fn image_data_uri(base64: &str) -> String {
    format!("data:{IMAGE_MIME_TYPE};base64,{base64}")
}

/// Gemini-backed implementation of the three AI operations.
#[derive(Debug, Clone)]
pub struct AiService {
    client: GeminiClient,
    images_enabled: bool,
}

impl AiService {
    /// Create the service from configuration. Fails when no API key is available.
    pub fn from_config(config: &AiConfig) -> Result<Self> {
        let api_key = resolve_api_key(config)?;
        Ok(Self {
            client: GeminiClient::new(
                api_key,
                config.base_url.clone(),
                config.text_model.clone(),
                config.image_model.clone(),
            ),
            images_enabled: config.images,
        })
    }

    /// Estimate foods and totals for a free-text meal description.
    pub async fn analyze_meal(&self, meal_text: &str) -> Result<MealAnalysis> {
        let meal_text = meal_text.trim();
        if meal_text.is_empty() {
            return Err(AnnapurnaError::InvalidInput(
                "meal description cannot be empty".into(),
            ));
        }

        let prompt = prompts::nutrition_prompt(meal_text);
        let text = self.client.generate_json_text(&prompt).await.map_err(|e| {
            tracing::error!(error = %e, "error analyzing meal");
            e
        })?;
        parse_json_response(&text)
    }

    /// Suggest dinner recipes for the gap between `totals` and the profile goals.
    pub async fn generate_recipes(
        &self,
        totals: &Nutrients,
        profile: &Profile,
    ) -> Result<Vec<Recipe>> {
        let prompt = prompts::recipe_prompt(totals, profile);
        let text = self.client.generate_json_text(&prompt).await.map_err(|e| {
            tracing::error!(error = %e, "error generating recipes");
            e
        })?;
        let recipes: Vec<Recipe> = parse_json_response(&text)?;
        if recipes.len() != prompts::RECIPES_PER_REQUEST {
            tracing::warn!(
                expected = prompts::RECIPES_PER_REQUEST,
                got = recipes.len(),
                "model returned an unexpected number of recipes"
            );
        }
        Ok(recipes)
    }

    /// Picture for a recipe as a `data:` URI. Never fails: any error yields
    /// [`placeholder_image_url`].
    pub async fn generate_image(&self, recipe_name: &str, ingredients: &str) -> String {
        if !self.images_enabled {
            return placeholder_image_url(recipe_name);
        }
        let prompt = prompts::image_prompt(recipe_name, ingredients);
        match self.client.generate_image_base64(&prompt).await {
            Ok(b64) => image_data_uri(&b64),
            Err(e) => {
                tracing::warn!(recipe = recipe_name, error = %e, "image generation failed, using placeholder");
                placeholder_image_url(recipe_name)
            }
        }
    }

    /// Generate a picture for every recipe concurrently. Results are keyed by
    /// recipe name and merged as they finish, so a later finisher wins on
    /// duplicate names.
    pub async fn illustrate_recipes(&self, recipes: &[Recipe]) -> HashMap<String, String> {
        let mut tasks = tokio::task::JoinSet::new();
        for recipe in recipes {
            let service = self.clone();
            let name = recipe.name.clone();
            let ingredients = recipe.ingredient_list();
            tasks.spawn(async move {
                let url = service.generate_image(&name, &ingredients).await;
                (name, url)
            });
        }

        let mut urls = HashMap::with_capacity(recipes.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((name, url)) => {
                    urls.insert(name, url);
                }
                Err(e) => tracing::warn!(error = %e, "image task failed"),
            }
        }
        for recipe in recipes {
            urls.entry(recipe.name.clone())
                .or_insert_with(|| placeholder_image_url(&recipe.name));
        }
        urls
    }
}

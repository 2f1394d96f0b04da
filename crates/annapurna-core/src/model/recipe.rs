use serde::{Deserialize, Serialize};

use super::meal::Nutrients;

/// A suggested dish. Field names follow the JSON shape requested in the recipe prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub nutrients: Nutrients,
    #[serde(default)]
    pub portion_suggestion: String,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub instructions: Vec<String>,
    #[serde(default)]
    pub cooking_time: String,
}

impl Recipe {
    /// Ingredient list as a single sentence fragment for the image prompt.
    pub fn ingredient_list(&self) -> String {
        self.ingredients.join(", ")
    }

    pub fn same_name(&self, name: &str) -> bool {
        self.name == name
    }
}

/// Add `recipe` if no saved recipe shares its name, otherwise remove every
/// saved recipe with that name. Returns whether the recipe is saved afterwards.
pub fn toggle_by_name(saved: &mut Vec<Recipe>, recipe: Recipe) -> bool {
    if saved.iter().any(|r| r.same_name(&recipe.name)) {
        saved.retain(|r| !r.same_name(&recipe.name));
        false
    } else {
        saved.push(recipe);
        true
    }
}

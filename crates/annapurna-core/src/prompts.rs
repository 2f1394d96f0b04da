//! Prompt templates for the text and image models. Pure string building.

use crate::model::{Nutrients, Profile};

const NUTRITION_EXAMPLE: &str = r#"{
  "foods": [
    {"name": "roti", "quantity": 2, "calories": 240, "protein": 6, "carbs": 40, "fat": 8},
    {"name": "dal", "quantity": 1, "calories": 180, "protein": 10, "carbs": 25, "fat": 6}
  ],
  "total": {"calories": 420, "protein": 16, "carbs": 65, "fat": 14}
}"#;

const RECIPE_EXAMPLE: &str = r#"[
  {
    "name": "Paneer Bhurji with 2 Rotis",
    "description": "A quick and protein-rich scrambled cottage cheese dish, perfect for a light yet satisfying dinner.",
    "nutrients": {"calories": 450, "protein": 25, "carbs": 35, "fat": 22},
    "portion_suggestion": "1 serving (approx. 300g)",
    "ingredients": ["200g Paneer", "2 medium Rotis", "1 Onion", "1 Tomato", "Ginger-garlic paste", "Spices (turmeric, garam masala)"],
    "instructions": [
      "Heat oil in a pan and saute the onions until golden.",
      "Add tomatoes and ginger-garlic paste, and cook until soft.",
      "Crumble the paneer and add it to the pan along with spices.",
      "Cook for 5-7 minutes, stirring occasionally.",
      "Serve hot with rotis."
    ],
    "cooking_time": "Approx. 20 minutes"
  }
]"#;

/// Number of recipes requested per generation.
pub const RECIPES_PER_REQUEST: usize = 2;

/// Ask for a `{"foods": [...], "total": {...}}` breakdown of a free-text meal.
pub fn nutrition_prompt(meal_text: &str) -> String {
    format!(
        "You are Annapurna.ai, an expert Indian food nutrition assistant.\n\
         Your task is to estimate the nutritional breakdown for the meal described by the user.\n\
         Respond ONLY with a valid JSON object. Do not include any text before or after the JSON.\n\
         The JSON should have a \"foods\" array and a \"total\" object.\n\
         Each item in the \"foods\" array should be an object with \"name\", \"quantity\", \"calories\", \"protein\", \"carbs\", and \"fat\".\n\
         Base your estimations on typical portion sizes for Indian cuisine.\n\
         \n\
         Meal: \"{meal_text}\"\n\
         \n\
         Example Output:\n\
         {NUTRITION_EXAMPLE}\n"
    )
}

/// Ask for dinner recipes that close the gap between `totals` and the profile's goals.
pub fn recipe_prompt(totals: &Nutrients, profile: &Profile) -> String {
    let goals = &profile.goals;
    let location_context = profile
        .location()
        .map(|(city, country)| {
            format!(
                "The user is located in {city}, {country}. Suggest recipes and ingredients \
                 that are culturally relevant and easily available in this region."
            )
        })
        .unwrap_or_default();

    format!(
        "You are Annapurna.ai, a personalized Indian diet planner.\n\
         \n\
         User's current nutrient summary for the day:\n\
         Calories Consumed: {cal} / {cal_goal} kcal\n\
         Protein Consumed: {protein} / {protein_goal} g\n\
         Carbs Consumed: {carbs} / {carbs_goal} g\n\
         Fat Consumed: {fat} / {fat_goal} g\n\
         Dietary Preference: {preference}\n\
         {location_context}\n\
         \n\
         Your task is to generate {count} dinner recipes that help the user meet their remaining daily targets.\n\
         The recipes must adhere to the user's dietary preference.\n\
         For each recipe, provide:\n\
         - name: The name of the dish.\n\
         - description: A short, appealing description.\n\
         - nutrients: An object with per-serving calories, protein, carbs, and fat.\n\
         - portion_suggestion: A practical portion size suggestion (e.g., \"1 bowl (approx. 250g)\").\n\
         - ingredients: An array of strings with ingredients.\n\
         - instructions: An array of strings, with each string being a step-by-step cooking instruction.\n\
         - cooking_time: A string indicating the estimated total cooking time (e.g., \"Approx. 25 minutes\").\n\
         \n\
         Respond ONLY with a valid JSON array containing the {count} recipe objects. Do not include any text before or after the JSON.\n\
         \n\
         Example output:\n\
         {RECIPE_EXAMPLE}\n",
        cal = totals.calories.round(),
        cal_goal = goals.calories,
        protein = totals.protein.round(),
        protein_goal = goals.protein,
        carbs = totals.carbs.round(),
        carbs_goal = goals.carbs,
        fat = totals.fat.round(),
        fat_goal = goals.fat,
        preference = profile.preference,
        count = RECIPES_PER_REQUEST,
    )
}

/// Food-photography prompt for a recipe picture.
pub fn image_prompt(recipe_name: &str, ingredients: &str) -> String {
    format!(
        "High-quality, vibrant, professional food photography of an Indian dish called \
         \"{recipe_name}\". The dish is made with {ingredients}. The photo is styled for a \
         modern, healthy recipe app, with a clean background and natural lighting."
    )
}

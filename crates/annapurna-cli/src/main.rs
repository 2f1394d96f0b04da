use std::collections::HashMap;
use std::io::{BufRead, Read, Write};

use annapurna_core::ai::{placeholder_image_url, AiService};
use annapurna_core::config::{self, AiConfig, AnnapurnaConfig, TrackerConfig};
use annapurna_core::dashboard::{DashboardSummary, NutrientProgress, WaterProgress};
use annapurna_core::model::*;
use annapurna_core::state::UserState;
use annapurna_core::storage::open_store;
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use owo_colors::OwoColorize;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

const ANALYZE_FAILED: &str = "Sorry, I couldn't analyze that meal. Please try again.";
const RECIPES_FAILED: &str = "Sorry, I couldn't generate recipes right now. Please try again later.";
const NOT_ONBOARDED: &str =
    "no profile yet. Run `annapurna onboard --name <NAME> --age <AGE>` to get started.";

#[derive(Parser)]
#[command(
    name = "annapurna",
    about = "Annapurna: Indian meal logging, water tracking and dinner ideas",
    version
)]
enum Cli {
    /// Create your profile and daily goals
    Onboard {
        /// Your name
        #[arg(long)]
        name: String,
        /// Your age in years
        #[arg(long)]
        age: u32,
        #[command(flatten)]
        details: ProfileDetails,
    },
    /// Show or edit your profile
    Profile {
        #[command(subcommand)]
        action: ProfileCommand,
    },
    /// Describe a meal in plain words and log its estimated nutrition
    Log {
        /// Meal description, e.g. "2 rotis, a bowl of dal and some rice"
        #[arg(conflicts_with = "stdin")]
        text: Vec<String>,
        /// Read the meal description from stdin (e.g. a speech-to-text pipe)
        #[arg(long)]
        stdin: bool,
    },
    /// List or delete today's meals
    Meals {
        #[command(subcommand)]
        action: MealsCommand,
    },
    /// Track water intake
    Water {
        #[command(subcommand)]
        action: WaterCommand,
    },
    /// Today's progress against your goals
    Dashboard {
        /// Output raw JSON
        #[arg(long)]
        json: bool,
    },
    /// Dinner ideas for your remaining targets, and your saved recipes
    Recipes {
        #[command(subcommand)]
        action: RecipesCommand,
    },
    /// Show store location, onboarding state and AI configuration
    Status,
    /// Delete all stored data and start over
    Reset {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum ProfileCommand {
    /// Print the current profile and goals
    Show {
        /// Output raw JSON
        #[arg(long)]
        json: bool,
    },
    /// Change profile fields; anything not given keeps its current value
    Set {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        age: Option<u32>,
        #[command(flatten)]
        details: ProfileDetails,
    },
}

#[derive(Subcommand)]
enum MealsCommand {
    /// List logged meals, newest first
    List {
        /// Output raw JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a meal by ID (full UUID or 8-char prefix)
    Delete {
        id: String,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum WaterCommand {
    /// Add water: a glass by default
    Add {
        /// Add one glass (250 ml unless configured)
        #[arg(long, conflicts_with_all = ["bottle", "ml"])]
        glass: bool,
        /// Add one bottle (1000 ml unless configured)
        #[arg(long, conflicts_with = "ml")]
        bottle: bool,
        /// Add an exact amount in ml
        #[arg(long, value_name = "ML")]
        ml: Option<u32>,
    },
    /// Show today's intake
    Show,
}

#[derive(Subcommand)]
enum RecipesCommand {
    /// Ask for dinner recipes that fit what is left of today's goals
    Generate {
        /// Skip image generation and use placeholder pictures
        #[arg(long)]
        no_images: bool,
        /// Save the recipe with this number (can be repeated)
        #[arg(long, value_name = "N")]
        save: Vec<usize>,
        /// Output raw JSON
        #[arg(long)]
        json: bool,
    },
    /// List saved recipes
    Saved {
        /// Output raw JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a saved recipe in full
    Show { name: String },
    /// Remove a recipe from your saved list
    Unsave { name: String },
}

#[derive(Args, Default)]
struct ProfileDetails {
    /// male, female or other
    #[arg(long)]
    gender: Option<Gender>,
    /// veg or non-veg
    #[arg(long)]
    preference: Option<DietaryPreference>,
    /// Daily calorie goal in kcal
    #[arg(long)]
    calorie_goal: Option<u32>,
    /// City, used to suggest regional recipes
    #[arg(long)]
    city: Option<String>,
    /// Country, used to suggest regional recipes
    #[arg(long)]
    country: Option<String>,
}

impl ProfileDetails {
    fn apply(self, mut input: ProfileInput) -> ProfileInput {
        if let Some(gender) = self.gender {
            input.gender = gender;
        }
        if let Some(preference) = self.preference {
            input.preference = preference;
        }
        if let Some(goal) = self.calorie_goal {
            input.calorie_goal = goal;
        }
        if self.city.is_some() {
            input.city = self.city;
        }
        if self.country.is_some() {
            input.country = self.country;
        }
        input
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let cli = Cli::parse();
    let config = AnnapurnaConfig::load(Some(&std::env::current_dir()?)).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load config, using defaults");
        AnnapurnaConfig::default_config()
    });

    run(cli, &config).await
}

async fn run(cli: Cli, config: &AnnapurnaConfig) -> Result<()> {
    let mut state = make_state(config).await?;

    let needs_profile = !matches!(cli, Cli::Onboard { .. } | Cli::Status | Cli::Reset { .. });
    if needs_profile && !state.is_onboarding_complete() {
        anyhow::bail!(NOT_ONBOARDED);
    }

    match cli {
        Cli::Onboard { name, age, details } => {
            cmd_onboard(&mut state, &config.tracker, name, age, details).await
        }
        Cli::Profile { action } => match action {
            ProfileCommand::Show { json } => cmd_profile_show(&state, json),
            ProfileCommand::Set { name, age, details } => {
                cmd_profile_set(&mut state, name, age, details).await
            }
        },
        Cli::Log { text, stdin } => {
            let text = if stdin {
                let mut buf = String::new();
                std::io::stdin()
                    .read_to_string(&mut buf)
                    .context("failed to read meal description from stdin")?;
                buf
            } else {
                text.join(" ")
            };
            cmd_log(&mut state, &config.ai, &text).await
        }
        Cli::Meals { action } => match action {
            MealsCommand::List { json } => cmd_meals_list(&state, json),
            MealsCommand::Delete { id, yes } => {
                cmd_meals_delete(&mut state, &id, yes, &mut std::io::stdin().lock()).await
            }
        },
        Cli::Water { action } => match action {
            WaterCommand::Add { glass: _, bottle, ml } => {
                let amount = match (bottle, ml) {
                    (_, Some(ml)) => ml,
                    (true, None) => config.tracker.bottle_ml,
                    (false, None) => config.tracker.glass_ml,
                };
                cmd_water_add(&mut state, &config.tracker, amount).await
            }
            WaterCommand::Show => cmd_water_show(&state, &config.tracker),
        },
        Cli::Dashboard { json } => cmd_dashboard(&state, &config.tracker, json),
        Cli::Recipes { action } => match action {
            RecipesCommand::Generate {
                no_images,
                save,
                json,
            } => cmd_recipes_generate(&mut state, &config.ai, no_images, &save, json).await,
            RecipesCommand::Saved { json } => cmd_recipes_saved(&state, json),
            RecipesCommand::Show { name } => cmd_recipes_show(&state, &name),
            RecipesCommand::Unsave { name } => cmd_recipes_unsave(&mut state, &name).await,
        },
        Cli::Status => cmd_status(&state, config),
        Cli::Reset { yes } => cmd_reset(&mut state, yes, &mut std::io::stdin().lock()).await,
    }
}

async fn make_state(config: &AnnapurnaConfig) -> Result<UserState> {
    let store = open_store(config).context("failed to open store")?;
    UserState::hydrate(store)
        .await
        .context("failed to load stored data")
}

fn require_profile(state: &UserState) -> Result<&Profile> {
    state.profile().context(NOT_ONBOARDED)
}

fn make_ai(config: &AiConfig) -> Result<AiService> {
    AiService::from_config(config).context("AI service is not configured")
}

/// Ask a yes/no question; anything but `y`/`yes` is a no.
fn confirm(prompt: &str, input: &mut dyn BufRead) -> Result<bool> {
    print!("{prompt} [y/N] ");
    std::io::stdout().flush()?;
    let mut answer = String::new();
    input
        .read_line(&mut answer)
        .context("failed to read confirmation")?;
    Ok(matches!(
        answer.trim().to_ascii_lowercase().as_str(),
        "y" | "yes"
    ))
}

// ---------------------------------------------------------------------------
// onboard / profile
// ---------------------------------------------------------------------------

async fn cmd_onboard(
    state: &mut UserState,
    tracker: &TrackerConfig,
    name: String,
    age: u32,
    details: ProfileDetails,
) -> Result<()> {
    if let Some(existing) = state.profile() {
        anyhow::bail!(
            "already onboarded as {}. Use `annapurna profile set` to change your profile.",
            existing.name
        );
    }

    let input = details.apply(
        ProfileInput::new(name, age).with_calorie_goal(tracker.default_calorie_goal),
    );
    let profile = state.save_profile(input).await.context("failed to save profile")?;

    println!(
        "{} Welcome, {}!",
        "✓".green(),
        profile.name.bold()
    );
    print_goals(&profile.goals);
    Ok(())
}

fn cmd_profile_show(state: &UserState, json: bool) -> Result<()> {
    let profile = require_profile(state)?;

    if json {
        println!("{}", serde_json::to_string_pretty(profile)?);
        return Ok(());
    }

    println!("{}", profile.name.bold());
    println!("  {}        {}", "Age:".dimmed(), profile.age);
    println!("  {}     {}", "Gender:".dimmed(), profile.gender);
    println!("  {}       {}", "Diet:".dimmed(), profile.preference);
    if let Some((city, country)) = profile.location() {
        println!("  {}   {city}, {country}", "Location:".dimmed());
    }
    print_goals(&profile.goals);
    Ok(())
}

async fn cmd_profile_set(
    state: &mut UserState,
    name: Option<String>,
    age: Option<u32>,
    details: ProfileDetails,
) -> Result<()> {
    let mut input = require_profile(state)?.to_input();
    if let Some(name) = name {
        input.name = name;
    }
    if let Some(age) = age {
        input.age = age;
    }
    let input = details.apply(input);

    let profile = state.save_profile(input).await.context("failed to save profile")?;
    println!("{} Profile updated.", "✓".green());
    print_goals(&profile.goals);
    Ok(())
}

fn print_goals(goals: &Goals) {
    println!(
        "  {}      {} kcal · {}g protein · {}g carbs · {}g fat",
        "Goals:".dimmed(),
        goals.calories.to_string().cyan(),
        goals.protein,
        goals.carbs,
        goals.fat
    );
}

// ---------------------------------------------------------------------------
// log / meals
// ---------------------------------------------------------------------------

async fn cmd_log(state: &mut UserState, ai_config: &AiConfig, text: &str) -> Result<()> {
    let text = text.trim();
    if text.is_empty() {
        println!("Nothing to log. Describe your meal, e.g. `annapurna log 2 idli with sambar`.");
        return Ok(());
    }

    let ai = make_ai(ai_config)?;
    let analysis = match ai.analyze_meal(text).await {
        Ok(analysis) => analysis,
        Err(e) if e.is_ai_failure() => {
            tracing::debug!(error = %e, "meal analysis failed");
            anyhow::bail!(ANALYZE_FAILED);
        }
        Err(e) => return Err(e).context("failed to analyze meal"),
    };

    let entry = state.add_meal(analysis).await.context("failed to save meal")?;
    println!(
        "{} Logged {} ({})",
        "✓".green(),
        entry.describe().bold(),
        entry.short_id().dimmed()
    );
    println!("  {}", format_nutrients(&entry.total));
    for food in &entry.foods {
        println!(
            "    {} {} × {}  {}",
            "·".dimmed(),
            food.quantity,
            food.name,
            format!("{:.0} kcal", food.nutrients.calories).dimmed()
        );
    }
    Ok(())
}

fn format_nutrients(n: &Nutrients) -> String {
    format!(
        "{} kcal · {:.0}g protein · {:.0}g carbs · {:.0}g fat",
        format!("{:.0}", n.calories).cyan(),
        n.protein,
        n.carbs,
        n.fat
    )
}

fn cmd_meals_list(state: &UserState, json: bool) -> Result<()> {
    let meals = state.meal_log();

    if json {
        println!("{}", serde_json::to_string_pretty(meals)?);
        return Ok(());
    }

    if meals.is_empty() {
        println!("No meals logged yet.");
        return Ok(());
    }

    println!(
        "  {}  {}  {}  {}",
        format!("{:<8}", "ID").dimmed(),
        format!("{:<5}", "Time").dimmed(),
        format!("{:>6}", "kcal").dimmed(),
        "Foods".dimmed(),
    );
    println!("{}", "─".repeat(60).dimmed());

    for meal in meals {
        let time = meal.timestamp.with_timezone(&chrono::Local).format("%H:%M");
        println!(
            "  {}  {}  {}  {}",
            meal.short_id().dimmed(),
            time,
            format!("{:>6.0}", meal.total.calories).cyan(),
            meal.describe()
        );
    }

    let totals = state.daily_totals();
    println!("{}", "─".repeat(60).dimmed());
    println!("  {}  {}", "Total:".bold(), format_nutrients(&totals));
    Ok(())
}

async fn cmd_meals_delete(
    state: &mut UserState,
    id: &str,
    yes: bool,
    input: &mut dyn BufRead,
) -> Result<()> {
    let meal = state.find_meal_by_prefix(id)?;
    let (meal_id, label) = (meal.id, format!("{} ({})", meal.describe(), meal.short_id()));

    if !yes && !confirm(&format!("Delete {label}?"), input)? {
        println!("Cancelled.");
        return Ok(());
    }

    state.delete_meal(meal_id).await.context("failed to delete meal")?;
    println!("{} Deleted {label}", "✓".green());
    Ok(())
}

// ---------------------------------------------------------------------------
// water
// ---------------------------------------------------------------------------

async fn cmd_water_add(state: &mut UserState, tracker: &TrackerConfig, ml: u32) -> Result<()> {
    if ml == 0 {
        anyhow::bail!("water amount must be greater than 0 ml");
    }
    let total = state.add_water(ml).await.context("failed to save water intake")?;
    println!("{} Added {ml} ml.", "✓".green());
    print_water(&WaterProgress::new(total, tracker.water_goal_ml));
    Ok(())
}

fn cmd_water_show(state: &UserState, tracker: &TrackerConfig) -> Result<()> {
    print_water(&WaterProgress::new(
        state.water_intake(),
        tracker.water_goal_ml,
    ));
    Ok(())
}

fn print_water(water: &WaterProgress) {
    println!(
        "  {:<9} {}  {:.1} / {:.1} L",
        "Water",
        progress_bar(water.percent).blue(),
        water.consumed_liters,
        water.goal_liters
    );
}

// ---------------------------------------------------------------------------
// dashboard
// ---------------------------------------------------------------------------

const BAR_WIDTH: usize = 20;

fn progress_bar(percent: f64) -> String {
    let filled = ((percent.clamp(0.0, 100.0) / 100.0) * BAR_WIDTH as f64).round() as usize;
    format!("{}{}", "█".repeat(filled), "░".repeat(BAR_WIDTH - filled))
}

fn print_nutrient(p: &NutrientProgress) {
    let bar = progress_bar(p.percent);
    let bar = if p.over_goal {
        bar.red().to_string()
    } else {
        bar.green().to_string()
    };
    let left = if p.over_goal {
        format!("{:.0} {} over", p.consumed - f64::from(p.goal), p.unit)
            .red()
            .to_string()
    } else {
        format!("{:.0} {} left", p.remaining(), p.unit)
            .dimmed()
            .to_string()
    };
    println!(
        "  {:<9} {bar}  {:.0} / {} {}  ({left})",
        p.label, p.consumed, p.goal, p.unit
    );
}

fn cmd_dashboard(state: &UserState, tracker: &TrackerConfig, json: bool) -> Result<()> {
    let profile = require_profile(state)?;
    let summary = DashboardSummary::build(
        profile,
        &state.daily_totals(),
        state.water_intake(),
        tracker.water_goal_ml,
    );

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("{}", format!("Namaste, {}!", summary.name).bold());
    println!(
        "  {} meal(s) logged today · {} diet",
        state.meal_log().len(),
        profile.preference
    );
    println!();
    for nutrient in summary.nutrients() {
        print_nutrient(nutrient);
    }
    print_water(&summary.water);
    Ok(())
}

// ---------------------------------------------------------------------------
// recipes
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct RecipeCard<'a> {
    #[serde(flatten)]
    recipe: &'a Recipe,
    image_url: &'a str,
}

fn describe_image(url: &str) -> String {
    if url.starts_with("data:") {
        format!("generated ({} KB)", url.len() * 3 / 4 / 1024)
    } else {
        url.to_string()
    }
}

fn print_recipe(index: Option<usize>, recipe: &Recipe, image_url: Option<&str>, full: bool) {
    let heading = match index {
        Some(i) => format!("[{i}] {}", recipe.name),
        None => recipe.name.clone(),
    };
    println!("{}", heading.bold());
    if !recipe.description.is_empty() {
        println!("  {}", recipe.description);
    }
    println!("  {}", format_nutrients(&recipe.nutrients));
    if !recipe.portion_suggestion.is_empty() {
        println!("  {}   {}", "Portion:".dimmed(), recipe.portion_suggestion);
    }
    if !recipe.cooking_time.is_empty() {
        println!("  {}      {}", "Time:".dimmed(), recipe.cooking_time);
    }
    if let Some(url) = image_url {
        println!("  {}     {}", "Image:".dimmed(), describe_image(url));
    }

    if full {
        println!("  {}", "Ingredients:".dimmed());
        for ingredient in &recipe.ingredients {
            println!("    - {ingredient}");
        }
        println!("  {}", "Instructions:".dimmed());
        for (i, step) in recipe.instructions.iter().enumerate() {
            println!("    {}. {step}", i + 1);
        }
    } else if !recipe.ingredients.is_empty() {
        println!("  {}  {}", "Contains:".dimmed(), recipe.ingredient_list());
    }
}

async fn cmd_recipes_generate(
    state: &mut UserState,
    ai_config: &AiConfig,
    no_images: bool,
    save: &[usize],
    json: bool,
) -> Result<()> {
    let profile = require_profile(state)?.clone();

    let mut ai_config = ai_config.clone();
    if no_images {
        ai_config.images = false;
    }
    let ai = make_ai(&ai_config)?;

    let recipes = match ai.generate_recipes(&state.daily_totals(), &profile).await {
        Ok(recipes) => recipes,
        Err(e) if e.is_ai_failure() => {
            tracing::debug!(error = %e, "recipe generation failed");
            anyhow::bail!(RECIPES_FAILED);
        }
        Err(e) => return Err(e).context("failed to generate recipes"),
    };

    if let Some(bad) = save.iter().find(|&&n| n == 0 || n > recipes.len()) {
        anyhow::bail!("no recipe #{bad} to save (got {} recipes)", recipes.len());
    }

    let images: HashMap<String, String> = ai.illustrate_recipes(&recipes).await;
    let image_for = |r: &Recipe| -> String {
        images
            .get(&r.name)
            .cloned()
            .unwrap_or_else(|| placeholder_image_url(&r.name))
    };

    if json {
        let urls: Vec<String> = recipes.iter().map(&image_for).collect();
        let cards: Vec<RecipeCard> = recipes
            .iter()
            .zip(&urls)
            .map(|(recipe, url)| RecipeCard {
                recipe,
                image_url: url,
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&cards)?);
    } else if recipes.is_empty() {
        println!("No recipes this time. Try again in a moment.");
    } else {
        for (i, recipe) in recipes.iter().enumerate() {
            if i > 0 {
                println!();
            }
            print_recipe(Some(i + 1), recipe, Some(&image_for(recipe)), false);
        }
    }

    for &n in save {
        let recipe = &recipes[n - 1];
        if state.find_saved_recipe(&recipe.name).is_some() {
            continue;
        }
        state
            .toggle_saved_recipe(recipe.clone())
            .await
            .context("failed to save recipe")?;
        if !json {
            println!("{} Saved {}", "✓".green(), recipe.name.bold());
        }
    }
    Ok(())
}

fn cmd_recipes_saved(state: &UserState, json: bool) -> Result<()> {
    let saved = state.saved_recipes();

    if json {
        println!("{}", serde_json::to_string_pretty(saved)?);
        return Ok(());
    }

    if saved.is_empty() {
        println!("No saved recipes. Use `annapurna recipes generate --save N` to keep one.");
        return Ok(());
    }

    for recipe in saved {
        println!(
            "  {}  {}",
            recipe.name.bold(),
            format!("{:.0} kcal · {}", recipe.nutrients.calories, recipe.cooking_time).dimmed()
        );
    }
    Ok(())
}

fn cmd_recipes_show(state: &UserState, name: &str) -> Result<()> {
    let recipe = state
        .find_saved_recipe(name)
        .with_context(|| format!("no saved recipe named '{name}'"))?;
    print_recipe(None, recipe, None, true);
    Ok(())
}

async fn cmd_recipes_unsave(state: &mut UserState, name: &str) -> Result<()> {
    let recipe = state
        .find_saved_recipe(name)
        .cloned()
        .with_context(|| format!("no saved recipe named '{name}'"))?;
    state
        .toggle_saved_recipe(recipe.clone())
        .await
        .context("failed to update saved recipes")?;
    println!("{} Removed {}", "✓".green(), recipe.name.bold());
    Ok(())
}

// ---------------------------------------------------------------------------
// status / reset
// ---------------------------------------------------------------------------

fn cmd_status(state: &UserState, config: &AnnapurnaConfig) -> Result<()> {
    let version = env!("CARGO_PKG_VERSION");
    println!("{}", format!("Annapurna Status v{version}").bold());
    println!(
        "  {}      {}",
        "Store:".dimmed(),
        state.store().path().display()
    );

    match state.profile() {
        Some(profile) => println!(
            "  {}    {} ({})",
            "Profile:".dimmed(),
            "onboarded".green(),
            profile.name
        ),
        None => println!("  {}    {}", "Profile:".dimmed(), "not onboarded".yellow()),
    }
    println!(
        "  {}     {}",
        "Meals:".dimmed(),
        state.meal_log().len().to_string().cyan()
    );
    println!("  {}     {} ml", "Water:".dimmed(), state.water_intake());
    println!(
        "  {}     {}",
        "Saved:".dimmed(),
        state.saved_recipes().len().to_string().cyan()
    );

    let env_var = config
        .ai
        .env_var
        .as_deref()
        .unwrap_or(config::DEFAULT_API_KEY_ENV);
    match config::resolve_api_key(&config.ai) {
        Ok(_) => println!(
            "  {}    {} ({})",
            "AI key:".dimmed(),
            "present".green(),
            config.ai.text_model
        ),
        Err(_) => println!(
            "  {}    {} (set ai.api_key or {env_var})",
            "AI key:".dimmed(),
            "missing".red()
        ),
    }
    println!(
        "  {}    {}",
        "Images:".dimmed(),
        if config.ai.images {
            config.ai.image_model.as_str()
        } else {
            "placeholders only"
        }
    );
    Ok(())
}

async fn cmd_reset(state: &mut UserState, yes: bool, input: &mut dyn BufRead) -> Result<()> {
    if !yes && !confirm("Delete your profile, meals, water and saved recipes?", input)? {
        println!("Cancelled.");
        return Ok(());
    }
    state.reset().await.context("failed to clear store")?;
    println!("{} All data cleared.", "✓".green());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use annapurna_core::storage::LocalStore;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn test_state() -> UserState {
        UserState::hydrate(LocalStore::open_in_memory().unwrap())
            .await
            .unwrap()
    }

    async fn onboarded_state() -> UserState {
        let mut state = test_state().await;
        cmd_onboard(
            &mut state,
            &TrackerConfig::default(),
            "Asha".into(),
            29,
            ProfileDetails::default(),
        )
        .await
        .unwrap();
        state
    }

    fn mock_ai(server: &MockServer) -> AiConfig {
        AiConfig {
            api_key: Some("test-key".into()),
            base_url: Some(server.uri()),
            ..Default::default()
        }
    }

    fn gemini_text(text: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "candidates": [{"content": {"parts": [{"text": text}]}}]
        }))
    }

    const MEAL_JSON: &str = r#"{"foods": [{"name": "masala dosa", "quantity": 1,
        "calories": 380, "protein": 8, "carbs": 55, "fat": 14}],
        "total": {"calories": 380, "protein": 8, "carbs": 55, "fat": 14}}"#;

    const RECIPES_JSON: &str = r#"[
        {"name": "Paneer Tikka", "nutrients": {"calories": 420, "protein": 28, "carbs": 12, "fat": 26},
         "ingredients": ["Paneer", "Curd"], "instructions": ["Marinate.", "Grill."],
         "cooking_time": "Approx. 30 minutes"},
        {"name": "Vegetable Khichdi", "nutrients": {"calories": 380, "protein": 14, "carbs": 60, "fat": 8},
         "ingredients": ["Rice", "Moong dal"], "instructions": ["Pressure cook."],
         "cooking_time": "Approx. 25 minutes"}
    ]"#;

    // -----------------------------------------------------------------------
    // cli parsing
    // -----------------------------------------------------------------------

    #[test]
    fn test_cli_parses_nested_commands() {
        let cli = Cli::try_parse_from(["annapurna", "water", "add", "--bottle"]).unwrap();
        assert!(matches!(
            cli,
            Cli::Water {
                action: WaterCommand::Add { bottle: true, .. }
            }
        ));

        let cli = Cli::try_parse_from([
            "annapurna", "recipes", "generate", "--save", "1", "--save", "2",
        ])
        .unwrap();
        match cli {
            Cli::Recipes {
                action: RecipesCommand::Generate { save, .. },
            } => assert_eq!(save, vec![1, 2]),
            _ => panic!("expected recipes generate"),
        }
    }

    #[test]
    fn test_cli_rejects_conflicting_water_amounts() {
        assert!(Cli::try_parse_from(["annapurna", "water", "add", "--glass", "--bottle"]).is_err());
        assert!(Cli::try_parse_from(["annapurna", "water", "add", "--bottle", "--ml", "300"]).is_err());
    }

    #[test]
    fn test_cli_parses_profile_enums() {
        let cli = Cli::try_parse_from([
            "annapurna", "onboard", "--name", "Asha", "--age", "29", "--gender", "female",
            "--preference", "non-veg",
        ])
        .unwrap();
        match cli {
            Cli::Onboard { details, .. } => {
                assert_eq!(details.gender, Some(Gender::Female));
                assert_eq!(details.preference, Some(DietaryPreference::NonVeg));
            }
            _ => panic!("expected onboard"),
        }
        assert!(Cli::try_parse_from([
            "annapurna", "onboard", "--name", "Asha", "--age", "29", "--preference", "vegan",
        ])
        .is_err());
    }

    // -----------------------------------------------------------------------
    // onboard / profile
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn test_cmd_onboard_uses_configured_default_goal() {
        let mut state = test_state().await;
        let tracker = TrackerConfig {
            default_calorie_goal: 2000,
            ..Default::default()
        };
        cmd_onboard(&mut state, &tracker, "Asha".into(), 29, ProfileDetails::default())
            .await
            .unwrap();

        let profile = state.profile().unwrap();
        assert_eq!(profile.calorie_goal, 2000);
        assert_eq!(profile.goals.protein, 100);
    }

    #[tokio::test]
    async fn test_cmd_onboard_twice_fails() {
        let mut state = onboarded_state().await;
        let err = cmd_onboard(
            &mut state,
            &TrackerConfig::default(),
            "Someone".into(),
            40,
            ProfileDetails::default(),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("already onboarded"));
        assert_eq!(state.profile().unwrap().name, "Asha");
    }

    #[tokio::test]
    async fn test_cmd_onboard_rejects_bad_age() {
        let mut state = test_state().await;
        let result = cmd_onboard(
            &mut state,
            &TrackerConfig::default(),
            "Asha".into(),
            0,
            ProfileDetails::default(),
        )
        .await;
        assert!(result.is_err());
        assert!(!state.is_onboarding_complete());
    }

    #[tokio::test]
    async fn test_cmd_onboard_rejects_zero_calorie_goal() {
        let mut state = test_state().await;
        let err = cmd_onboard(
            &mut state,
            &TrackerConfig::default(),
            "Asha".into(),
            29,
            ProfileDetails {
                calorie_goal: Some(0),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(format!("{err:#}").contains("calorie goal must be greater than zero"));
        assert!(!state.is_onboarding_complete());
    }

    #[tokio::test]
    async fn test_cmd_profile_set_merges_over_existing() {
        let mut state = onboarded_state().await;
        cmd_profile_set(
            &mut state,
            None,
            Some(30),
            ProfileDetails {
                calorie_goal: Some(2200),
                city: Some("Kochi".into()),
                country: Some("India".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let profile = state.profile().unwrap();
        assert_eq!(profile.name, "Asha");
        assert_eq!(profile.age, 30);
        assert_eq!(profile.goals, Goals::from_calorie_goal(2200));
        assert_eq!(profile.location(), Some(("Kochi", "India")));
    }

    #[tokio::test]
    async fn test_cmd_profile_show_requires_profile() {
        assert!(cmd_profile_show(&test_state().await, true).is_err());
        assert!(cmd_profile_show(&onboarded_state().await, true).is_ok());
    }

    // -----------------------------------------------------------------------
    // log / meals
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn test_cmd_log_adds_meal() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-2.5-flash:generateContent"))
            .respond_with(gemini_text(&format!("```json\n{MEAL_JSON}\n```")))
            .mount(&server)
            .await;

        let mut state = onboarded_state().await;
        cmd_log(&mut state, &mock_ai(&server), "one masala dosa")
            .await
            .unwrap();

        assert_eq!(state.meal_log().len(), 1);
        assert_eq!(state.daily_totals().calories, 380.0);
    }

    #[tokio::test]
    async fn test_cmd_log_empty_text_is_noop() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(gemini_text(MEAL_JSON))
            .expect(0)
            .mount(&server)
            .await;

        let mut state = onboarded_state().await;
        cmd_log(&mut state, &mock_ai(&server), "   ").await.unwrap();
        assert!(state.meal_log().is_empty());
    }

    #[tokio::test]
    async fn test_cmd_log_ai_failure_shows_retry_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let mut state = onboarded_state().await;
        let err = cmd_log(&mut state, &mock_ai(&server), "poha")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), ANALYZE_FAILED);
        assert!(state.meal_log().is_empty());
    }

    #[tokio::test]
    async fn test_cmd_log_invalid_json_shows_retry_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(gemini_text("not json at all"))
            .mount(&server)
            .await;

        let mut state = onboarded_state().await;
        let err = cmd_log(&mut state, &mock_ai(&server), "poha")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), ANALYZE_FAILED);
    }

    async fn state_with_meal() -> (UserState, String) {
        let mut state = onboarded_state().await;
        let analysis: MealAnalysis = serde_json::from_str(MEAL_JSON).unwrap();
        let short = state.add_meal(analysis).await.unwrap().short_id();
        (state, short)
    }

    #[tokio::test]
    async fn test_cmd_meals_list_json() {
        let (state, _) = state_with_meal().await;
        assert!(cmd_meals_list(&state, true).is_ok());
        assert!(cmd_meals_list(&state, false).is_ok());
    }

    #[tokio::test]
    async fn test_cmd_meals_delete_with_yes() {
        let (mut state, short) = state_with_meal().await;
        cmd_meals_delete(&mut state, &short, true, &mut "".as_bytes()).await.unwrap();
        assert!(state.meal_log().is_empty());
    }

    #[tokio::test]
    async fn test_cmd_meals_delete_confirmed_interactively() {
        let (mut state, short) = state_with_meal().await;
        cmd_meals_delete(&mut state, &short, false, &mut "y\n".as_bytes())
            .await
            .unwrap();
        assert!(state.meal_log().is_empty());
    }

    #[tokio::test]
    async fn test_cmd_meals_delete_declined() {
        let (mut state, short) = state_with_meal().await;
        cmd_meals_delete(&mut state, &short, false, &mut "n\n".as_bytes())
            .await
            .unwrap();
        assert_eq!(state.meal_log().len(), 1);

        cmd_meals_delete(&mut state, &short, false, &mut "".as_bytes()).await.unwrap();
        assert_eq!(state.meal_log().len(), 1);
    }

    #[tokio::test]
    async fn test_cmd_meals_delete_unknown_id() {
        let (mut state, _) = state_with_meal().await;
        assert!(
            cmd_meals_delete(&mut state, "zzzzzzzz", true, &mut "".as_bytes())
                .await
                .is_err()
        );
        assert_eq!(state.meal_log().len(), 1);
    }

    // -----------------------------------------------------------------------
    // water / dashboard
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn test_cmd_water_add_accumulates() {
        let mut state = onboarded_state().await;
        let tracker = TrackerConfig::default();
        cmd_water_add(&mut state, &tracker, tracker.glass_ml).await.unwrap();
        cmd_water_add(&mut state, &tracker, tracker.bottle_ml).await.unwrap();
        cmd_water_add(&mut state, &tracker, 100).await.unwrap();
        assert_eq!(state.water_intake(), 1350);
        assert!(cmd_water_show(&state, &tracker).is_ok());
    }

    #[tokio::test]
    async fn test_cmd_water_add_zero_rejected() {
        let mut state = onboarded_state().await;
        assert!(cmd_water_add(&mut state, &TrackerConfig::default(), 0).await.is_err());
        assert_eq!(state.water_intake(), 0);
    }

    #[tokio::test]
    async fn test_cmd_dashboard() {
        let (state, _) = state_with_meal().await;
        let tracker = TrackerConfig::default();
        assert!(cmd_dashboard(&state, &tracker, true).is_ok());
        assert!(cmd_dashboard(&state, &tracker, false).is_ok());
        assert!(cmd_dashboard(&test_state().await, &tracker, false).is_err());
    }

    #[test]
    fn test_progress_bar() {
        assert_eq!(progress_bar(0.0), "░".repeat(BAR_WIDTH));
        assert_eq!(progress_bar(100.0), "█".repeat(BAR_WIDTH));
        assert_eq!(
            progress_bar(50.0),
            format!("{}{}", "█".repeat(10), "░".repeat(10))
        );
        assert_eq!(progress_bar(250.0), "█".repeat(BAR_WIDTH));
    }

    // -----------------------------------------------------------------------
    // recipes
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn test_cmd_recipes_generate_and_save() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-2.5-flash:generateContent"))
            .respond_with(gemini_text(RECIPES_JSON))
            .mount(&server)
            .await;

        let mut state = onboarded_state().await;
        cmd_recipes_generate(&mut state, &mock_ai(&server), true, &[2], false)
            .await
            .unwrap();

        let saved: Vec<_> = state.saved_recipes().iter().map(|r| r.name.clone()).collect();
        assert_eq!(saved, vec!["Vegetable Khichdi"]);

        // Saving again keeps it saved.
        cmd_recipes_generate(&mut state, &mock_ai(&server), true, &[2], true)
            .await
            .unwrap();
        assert_eq!(state.saved_recipes().len(), 1);
    }

    #[tokio::test]
    async fn test_cmd_recipes_generate_bad_index() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(gemini_text(RECIPES_JSON))
            .mount(&server)
            .await;

        let mut state = onboarded_state().await;
        let err = cmd_recipes_generate(&mut state, &mock_ai(&server), true, &[3], false)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no recipe #3"));
        assert!(state.saved_recipes().is_empty());
    }

    #[tokio::test]
    async fn test_cmd_recipes_generate_failure_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let mut state = onboarded_state().await;
        let err = cmd_recipes_generate(&mut state, &mock_ai(&server), true, &[], false)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), RECIPES_FAILED);
    }

    #[tokio::test]
    async fn test_cmd_recipes_show_and_unsave() {
        let mut state = onboarded_state().await;
        let recipes: Vec<Recipe> = serde_json::from_str(RECIPES_JSON).unwrap();
        state.toggle_saved_recipe(recipes[0].clone()).await.unwrap();

        assert!(cmd_recipes_saved(&state, false).is_ok());
        assert!(cmd_recipes_show(&state, "paneer tikka").is_ok());
        assert!(cmd_recipes_show(&state, "Dal Makhani").is_err());

        cmd_recipes_unsave(&mut state, "Paneer Tikka").await.unwrap();
        assert!(state.saved_recipes().is_empty());
        assert!(cmd_recipes_unsave(&mut state, "Paneer Tikka").await.is_err());
    }

    #[test]
    fn test_describe_image() {
        assert_eq!(
            describe_image("https://picsum.photos/seed/Poha/400/300"),
            "https://picsum.photos/seed/Poha/400/300"
        );
        let data = format!("data:image/jpeg;base64,{}", "A".repeat(4096));
        assert!(describe_image(&data).starts_with("generated ("));
    }

    // -----------------------------------------------------------------------
    // status / reset
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn test_cmd_status_without_profile() {
        let state = test_state().await;
        assert!(cmd_status(&state, &AnnapurnaConfig::default_config()).is_ok());
    }

    #[tokio::test]
    async fn test_cmd_reset() {
        let (mut state, _) = state_with_meal().await;
        cmd_reset(&mut state, false, &mut "no\n".as_bytes()).await.unwrap();
        assert!(state.is_onboarding_complete());

        cmd_reset(&mut state, true, &mut "".as_bytes()).await.unwrap();
        assert!(!state.is_onboarding_complete());
        assert!(state.meal_log().is_empty());
    }
}

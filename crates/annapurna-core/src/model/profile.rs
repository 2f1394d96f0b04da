use serde::{Deserialize, Serialize};

use crate::error::{AnnapurnaError, Result};

pub const DEFAULT_CALORIE_GOAL: u32 = 1800;
pub const MAX_NAME_LENGTH: usize = 100;
pub const MAX_AGE: u32 = 130;

// Share of daily calories per macro, and kcal per gram.
const PROTEIN_RATIO: f64 = 0.20;
const CARBS_RATIO: f64 = 0.50;
const FAT_RATIO: f64 = 0.30;
const KCAL_PER_GRAM_PROTEIN: f64 = 4.0;
const KCAL_PER_GRAM_CARBS: f64 = 4.0;
const KCAL_PER_GRAM_FAT: f64 = 9.0;

/// Daily macro targets. Always derived from the calorie goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Goals {
    pub calories: u32,
    pub protein: u32,
    pub carbs: u32,
    pub fat: u32,
}

impl Goals {
    /// 20/50/30 protein/carbs/fat split of `calorie_goal`, in grams.
    pub fn from_calorie_goal(calorie_goal: u32) -> Self {
        let grams = |ratio: f64, kcal_per_gram: f64| -> u32 {
            ((f64::from(calorie_goal) * ratio) / kcal_per_gram).round() as u32
        };
        Self {
            calories: calorie_goal,
            protein: grams(PROTEIN_RATIO, KCAL_PER_GRAM_PROTEIN),
            carbs: grams(CARBS_RATIO, KCAL_PER_GRAM_CARBS),
            fat: grams(FAT_RATIO, KCAL_PER_GRAM_FAT),
        }
    }
}

impl Default for Goals {
    fn default() -> Self {
        Self::from_calorie_goal(DEFAULT_CALORIE_GOAL)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    #[default]
    Male,
    Female,
    Other,
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Male => write!(f, "Male"),
            Self::Female => write!(f, "Female"),
            Self::Other => write!(f, "Other"),
        }
    }
}

impl std::str::FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "male" | "m" => Ok(Self::Male),
            "female" | "f" => Ok(Self::Female),
            "other" => Ok(Self::Other),
            _ => Err(format!("unknown gender: {s} (expected male, female or other)")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DietaryPreference {
    #[default]
    Veg,
    #[serde(rename = "Non-Veg")]
    NonVeg,
}

impl std::fmt::Display for DietaryPreference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Veg => write!(f, "Veg"),
            Self::NonVeg => write!(f, "Non-Veg"),
        }
    }
}

impl std::str::FromStr for DietaryPreference {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace(['_', ' '], "-").as_str() {
            "veg" | "vegetarian" => Ok(Self::Veg),
            "non-veg" | "nonveg" | "non-vegetarian" => Ok(Self::NonVeg),
            _ => Err(format!(
                "unknown dietary preference: {s} (expected veg or non-veg)"
            )),
        }
    }
}

/// What the user fills in at onboarding or on the profile form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileInput {
    pub name: String,
    pub age: u32,
    #[serde(default)]
    pub gender: Gender,
    #[serde(default)]
    pub preference: DietaryPreference,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default = "default_calorie_goal")]
    pub calorie_goal: u32,
}

fn default_calorie_goal() -> u32 {
    DEFAULT_CALORIE_GOAL
}

impl ProfileInput {
    pub fn new(name: impl Into<String>, age: u32) -> Self {
        Self {
            name: name.into(),
            age,
            gender: Gender::default(),
            preference: DietaryPreference::default(),
            city: None,
            country: None,
            calorie_goal: DEFAULT_CALORIE_GOAL,
        }
    }

    pub fn with_calorie_goal(mut self, calorie_goal: u32) -> Self {
        self.calorie_goal = calorie_goal;
        self
    }

    pub fn with_preference(mut self, preference: DietaryPreference) -> Self {
        self.preference = preference;
        self
    }

    pub fn with_location(mut self, city: impl Into<String>, country: impl Into<String>) -> Self {
        self.city = Some(city.into());
        self.country = Some(country.into());
        self
    }
}

/// Validate a profile form submission.
pub fn validate_profile_input(input: &ProfileInput) -> Result<()> {
    let name = input.name.trim();
    if name.is_empty() {
        return Err(AnnapurnaError::InvalidInput("name cannot be empty".into()));
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(AnnapurnaError::InvalidInput(format!(
            "name exceeds maximum length of {MAX_NAME_LENGTH} characters"
        )));
    }
    if input.age == 0 || input.age > MAX_AGE {
        return Err(AnnapurnaError::InvalidInput(format!(
            "age must be between 1 and {MAX_AGE}"
        )));
    }
    if input.calorie_goal == 0 {
        return Err(AnnapurnaError::InvalidInput(
            "calorie goal must be greater than zero".into(),
        ));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub name: String,
    pub age: u32,
    pub gender: Gender,
    pub preference: DietaryPreference,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    pub calorie_goal: u32,
    pub goals: Goals,
}

impl Profile {
    /// Build a profile from form input. Goals are recomputed here and nowhere else.
    pub fn from_input(input: ProfileInput) -> Self {
        let goals = Goals::from_calorie_goal(input.calorie_goal);
        Self {
            name: input.name.trim().to_string(),
            age: input.age,
            gender: input.gender,
            preference: input.preference,
            city: non_blank(input.city),
            country: non_blank(input.country),
            calorie_goal: input.calorie_goal,
            goals,
        }
    }

    /// The form values this profile was saved from, for pre-filling an edit.
    pub fn to_input(&self) -> ProfileInput {
        ProfileInput {
            name: self.name.clone(),
            age: self.age,
            gender: self.gender,
            preference: self.preference,
            city: self.city.clone(),
            country: self.country.clone(),
            calorie_goal: self.calorie_goal,
        }
    }

    /// `(city, country)` when both are known.
    pub fn location(&self) -> Option<(&str, &str)> {
        match (self.city.as_deref(), self.country.as_deref()) {
            (Some(city), Some(country)) => Some((city, country)),
            _ => None,
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Calories (kcal) and macros (g). Missing or `null` fields in AI output
/// count as zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Nutrients {
    #[serde(default, deserialize_with = "null_as_zero")]
    pub calories: f64,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub protein: f64,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub carbs: f64,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub fat: f64,
}

fn null_as_zero<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or_default())
}

impl Nutrients {
    pub const ZERO: Self = Self {
        calories: 0.0,
        protein: 0.0,
        carbs: 0.0,
        fat: 0.0,
    };

    pub fn new(calories: f64, protein: f64, carbs: f64, fat: f64) -> Self {
        Self {
            calories,
            protein,
            carbs,
            fat,
        }
    }
}

impl std::ops::Add for Nutrients {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            calories: self.calories + rhs.calories,
            protein: self.protein + rhs.protein,
            carbs: self.carbs + rhs.carbs,
            fat: self.fat + rhs.fat,
        }
    }
}

impl std::iter::Sum for Nutrients {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, |acc, n| acc + n)
    }
}

impl<'a> std::iter::Sum<&'a Nutrients> for Nutrients {
    fn sum<I: Iterator<Item = &'a Nutrients>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

/// Portion as the model reports it: usually a count, sometimes free text
/// like "1 bowl".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Quantity {
    Count(f64),
    Text(String),
}

impl Default for Quantity {
    fn default() -> Self {
        Self::Count(1.0)
    }
}

fn null_as_default_quantity<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Quantity, D::Error> {
    Ok(Option::<Quantity>::deserialize(deserializer)?.unwrap_or_default())
}

impl std::fmt::Display for Quantity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Count(n) if n.fract() == 0.0 => write!(f, "{}", *n as i64),
            Self::Count(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodItem {
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default_quantity")]
    pub quantity: Quantity,
    #[serde(flatten)]
    pub nutrients: Nutrients,
}

/// What the nutrition prompt asks the model to return.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealAnalysis {
    #[serde(default)]
    pub foods: Vec<FoodItem>,
    pub total: Nutrients,
}

/// One logged eating event. `total` is the model's figure, not a sum of `foods`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealEntry {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub foods: Vec<FoodItem>,
    #[serde(default)]
    pub total: Nutrients,
}

impl MealEntry {
    pub fn new(analysis: MealAnalysis) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            foods: analysis.foods,
            total: analysis.total,
        }
    }

    /// First 8 hex characters of the id, enough to address a meal from the CLI.
    pub fn short_id(&self) -> String {
        self.id.to_string()[..8].to_string()
    }

    /// Comma-separated food names, for one-line listings.
    pub fn describe(&self) -> String {
        if self.foods.is_empty() {
            return "(no itemized foods)".to_string();
        }
        self.foods
            .iter()
            .map(|f| f.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Element-wise sum of every entry's `total`.
pub fn daily_totals(log: &[MealEntry]) -> Nutrients {
    log.iter().map(|m| &m.total).sum()
}

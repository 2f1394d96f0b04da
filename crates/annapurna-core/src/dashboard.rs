//! Progress view over today's totals and water intake.

use serde::Serialize;

use crate::model::{Nutrients, Profile};

/// Progress of one nutrient against its goal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NutrientProgress {
    pub label: &'static str,
    pub unit: &'static str,
    pub consumed: f64,
    pub goal: u32,
    /// 0–100, capped.
    pub percent: f64,
    pub over_goal: bool,
}

impl NutrientProgress {
    pub fn new(label: &'static str, unit: &'static str, consumed: f64, goal: u32) -> Self {
        let percent = if goal == 0 {
            0.0
        } else {
            (consumed / f64::from(goal) * 100.0).clamp(0.0, 100.0)
        };
        Self {
            label,
            unit,
            consumed,
            goal,
            percent,
            over_goal: consumed > f64::from(goal),
        }
    }

    /// Amount left before the goal is reached, never negative.
    pub fn remaining(&self) -> f64 {
        (f64::from(self.goal) - self.consumed).max(0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WaterProgress {
    pub consumed_ml: u32,
    pub goal_ml: u32,
    pub consumed_liters: f64,
    pub goal_liters: f64,
    pub percent: f64,
}

impl WaterProgress {
    pub fn new(consumed_ml: u32, goal_ml: u32) -> Self {
        let percent = if goal_ml == 0 {
            0.0
        } else {
            (f64::from(consumed_ml) / f64::from(goal_ml) * 100.0).min(100.0)
        };
        Self {
            consumed_ml,
            goal_ml,
            consumed_liters: liters(consumed_ml),
            goal_liters: liters(goal_ml),
            percent,
        }
    }
}

fn liters(ml: u32) -> f64 {
    (f64::from(ml) / 100.0).round() / 10.0
}

/// Everything the dashboard shows for the day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub name: String,
    pub calories: NutrientProgress,
    pub protein: NutrientProgress,
    pub carbs: NutrientProgress,
    pub fat: NutrientProgress,
    pub water: WaterProgress,
}

impl DashboardSummary {
    pub fn build(profile: &Profile, totals: &Nutrients, water_ml: u32, water_goal_ml: u32) -> Self {
        let goals = &profile.goals;
        Self {
            name: profile.name.clone(),
            calories: NutrientProgress::new("Calories", "kcal", totals.calories, goals.calories),
            protein: NutrientProgress::new("Protein", "g", totals.protein, goals.protein),
            carbs: NutrientProgress::new("Carbs", "g", totals.carbs, goals.carbs),
            fat: NutrientProgress::new("Fat", "g", totals.fat, goals.fat),
            water: WaterProgress::new(water_ml, water_goal_ml),
        }
    }

    pub fn nutrients(&self) -> [&NutrientProgress; 4] {
        [&self.calories, &self.protein, &self.carbs, &self.fat]
    }
}

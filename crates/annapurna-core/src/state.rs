//! Application state: the profile, today's meal log, water intake and saved
//! recipes, with every mutation persisted to the [`LocalStore`] right away.

use uuid::Uuid;

use crate::error::{AnnapurnaError, Result};
use crate::model::{
    self, validate_profile_input, MealAnalysis, MealEntry, Nutrients, Profile, ProfileInput,
    Recipe,
};
use crate::storage::{LocalStore, StoreKey};

#[derive(Debug)]
pub struct UserState {
    store: LocalStore,
    profile: Option<Profile>,
    meal_log: Vec<MealEntry>,
    water_intake: u32,
    saved_recipes: Vec<Recipe>,
}

impl UserState {
    /// Load everything from `store`. Unreadable profile, meal log or water
    /// data wipes the store and starts empty; unreadable saved recipes only
    /// read as empty.
    pub async fn hydrate(store: LocalStore) -> Result<Self> {
        let snapshot = store.load_snapshot().await?;
        let saved_recipes = store.load_saved_recipes().await;
        tracing::debug!(
            onboarded = snapshot.profile.is_some(),
            meals = snapshot.meal_log.len(),
            water_ml = snapshot.water_intake,
            saved_recipes = saved_recipes.len(),
            "state hydrated"
        );
        Ok(Self {
            store,
            profile: snapshot.profile,
            meal_log: snapshot.meal_log,
            water_intake: snapshot.water_intake,
            saved_recipes,
        })
    }

    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    pub fn profile(&self) -> Option<&Profile> {
        self.profile.as_ref()
    }

    /// Meals, newest first.
    pub fn meal_log(&self) -> &[MealEntry] {
        &self.meal_log
    }

    pub fn water_intake(&self) -> u32 {
        self.water_intake
    }

    pub fn saved_recipes(&self) -> &[Recipe] {
        &self.saved_recipes
    }

    pub fn is_onboarding_complete(&self) -> bool {
        self.profile.is_some()
    }

    /// Validate the form, derive goals and replace the stored profile.
    pub async fn save_profile(&mut self, input: ProfileInput) -> Result<&Profile> {
        validate_profile_input(&input)?;
        let profile = Profile::from_input(input);
        self.store.save(StoreKey::Profile, &profile).await?;
        tracing::debug!(calorie_goal = profile.calorie_goal, "profile saved");
        Ok(&*self.profile.insert(profile))
    }

    /// Record an analysed meal at the front of the log.
    pub async fn add_meal(&mut self, analysis: MealAnalysis) -> Result<&MealEntry> {
        let entry = MealEntry::new(analysis);
        let mut log = Vec::with_capacity(self.meal_log.len() + 1);
        log.push(entry);
        log.extend(self.meal_log.iter().cloned());
        self.store.save(StoreKey::MealLog, &log).await?;
        self.meal_log = log;
        Ok(&self.meal_log[0])
    }

    /// Remove the meal with `id`, keeping the order of the others.
    pub async fn delete_meal(&mut self, id: Uuid) -> Result<MealEntry> {
        let pos = self
            .meal_log
            .iter()
            .position(|m| m.id == id)
            .ok_or_else(|| AnnapurnaError::NotFound(format!("no meal with id {id}")))?;
        let mut log = self.meal_log.clone();
        let removed = log.remove(pos);
        self.store.save(StoreKey::MealLog, &log).await?;
        self.meal_log = log;
        Ok(removed)
    }

    /// Add `ml` to today's intake and return the new total.
    pub async fn add_water(&mut self, ml: u32) -> Result<u32> {
        let total = self.water_intake.saturating_add(ml);
        self.store.save(StoreKey::WaterIntake, &total).await?;
        self.water_intake = total;
        Ok(total)
    }

    pub fn daily_totals(&self) -> Nutrients {
        model::daily_totals(&self.meal_log)
    }

    /// Save `recipe`, or unsave it if a recipe with the same name is already
    /// saved. Returns whether it is saved afterwards.
    pub async fn toggle_saved_recipe(&mut self, recipe: Recipe) -> Result<bool> {
        let mut saved = self.saved_recipes.clone();
        let now_saved = model::toggle_by_name(&mut saved, recipe);
        self.store.save(StoreKey::SavedRecipes, &saved).await?;
        self.saved_recipes = saved;
        Ok(now_saved)
    }

    pub fn find_saved_recipe(&self, name: &str) -> Option<&Recipe> {
        self.saved_recipes
            .iter()
            .find(|r| r.name.eq_ignore_ascii_case(name.trim()))
    }

    /// Look up a meal by full id or by a unique id prefix.
    pub fn find_meal_by_prefix(&self, prefix: &str) -> Result<&MealEntry> {
        let prefix = prefix.trim().to_ascii_lowercase();
        if prefix.is_empty() {
            return Err(AnnapurnaError::InvalidInput("meal id cannot be empty".into()));
        }
        if let Ok(id) = Uuid::parse_str(&prefix) {
            return self
                .meal_log
                .iter()
                .find(|m| m.id == id)
                .ok_or_else(|| AnnapurnaError::NotFound(format!("no meal with id {id}")));
        }

        let matches: Vec<_> = self
            .meal_log
            .iter()
            .filter(|m| m.id.to_string().starts_with(&prefix))
            .collect();
        match matches.as_slice() {
            [] => Err(AnnapurnaError::NotFound(format!(
                "no meal found matching prefix '{prefix}'"
            ))),
            [only] => Ok(*only),
            many => Err(AnnapurnaError::InvalidInput(format!(
                "ambiguous prefix '{prefix}' matches {} meals. Use a longer prefix.",
                many.len()
            ))),
        }
    }

    /// Wipe the store and return to the not-onboarded state.
    pub async fn reset(&mut self) -> Result<()> {
        self.store.clear().await?;
        self.profile = None;
        self.meal_log.clear();
        self.water_intake = 0;
        self.saved_recipes.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FoodItem;

    async fn state() -> UserState {
        UserState::hydrate(LocalStore::open_in_memory().unwrap())
            .await
            .unwrap()
    }

    fn analysis(calories: f64, protein: f64, carbs: f64, fat: f64) -> MealAnalysis {
        MealAnalysis {
            foods: vec![FoodItem {
                name: "thali".into(),
                quantity: Default::default(),
                nutrients: Nutrients::new(calories, protein, carbs, fat),
            }],
            total: Nutrients::new(calories, protein, carbs, fat),
        }
    }

    fn recipe(name: &str) -> Recipe {
        serde_json::from_value(serde_json::json!({ "name": name })).unwrap()
    }

    #[tokio::test]
    async fn test_fresh_state_is_uninitialized() {
        let s = state().await;
        assert!(!s.is_onboarding_complete());
        assert!(s.profile().is_none());
        assert!(s.meal_log().is_empty());
        assert_eq!(s.water_intake(), 0);
        assert_eq!(s.daily_totals(), Nutrients::ZERO);
    }

    #[tokio::test]
    async fn test_save_profile_completes_onboarding() {
        let mut s = state().await;
        let profile = s
            .save_profile(ProfileInput::new("Asha", 29).with_calorie_goal(1800))
            .await
            .unwrap();
        assert_eq!(profile.goals.protein, 90);
        assert!(s.is_onboarding_complete());

        let reloaded = UserState::hydrate(s.store().clone()).await.unwrap();
        assert_eq!(reloaded.profile().unwrap().name, "Asha");
    }

    #[tokio::test]
    async fn test_save_profile_rejects_invalid_input() {
        let mut s = state().await;
        let err = s.save_profile(ProfileInput::new("  ", 29)).await.unwrap_err();
        assert!(matches!(err, AnnapurnaError::InvalidInput(_)));
        assert!(!s.is_onboarding_complete());
    }

    #[tokio::test]
    async fn test_save_profile_rejects_zero_calorie_goal() {
        let mut s = state().await;
        s.save_profile(ProfileInput::new("Asha", 29)).await.unwrap();

        let err = s
            .save_profile(ProfileInput::new("Asha", 29).with_calorie_goal(0))
            .await
            .unwrap_err();
        assert!(matches!(err, AnnapurnaError::InvalidInput(_)));
        assert_eq!(s.profile().unwrap().calorie_goal, 1800);

        let reloaded = UserState::hydrate(s.store().clone()).await.unwrap();
        assert_eq!(reloaded.profile().unwrap().goals.calories, 1800);
    }

    #[tokio::test]
    async fn test_add_meal_prepends_and_persists() {
        let mut s = state().await;
        let first = s.add_meal(analysis(400.0, 20.0, 50.0, 10.0)).await.unwrap().id;
        let second = s.add_meal(analysis(200.0, 6.0, 40.0, 10.0)).await.unwrap().id;

        let ids: Vec<_> = s.meal_log().iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![second, first]);

        let reloaded = UserState::hydrate(s.store().clone()).await.unwrap();
        assert_eq!(reloaded.meal_log(), s.meal_log());
        assert_eq!(
            reloaded.daily_totals(),
            Nutrients::new(600.0, 26.0, 90.0, 20.0)
        );
    }

    #[tokio::test]
    async fn test_delete_meal_preserves_order_of_rest() {
        let mut s = state().await;
        let a = s.add_meal(analysis(100.0, 1.0, 1.0, 1.0)).await.unwrap().id;
        let b = s.add_meal(analysis(200.0, 2.0, 2.0, 2.0)).await.unwrap().id;
        let c = s.add_meal(analysis(300.0, 3.0, 3.0, 3.0)).await.unwrap().id;

        let removed = s.delete_meal(b).await.unwrap();
        assert_eq!(removed.id, b);
        let ids: Vec<_> = s.meal_log().iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![c, a]);
        assert_eq!(s.daily_totals().calories, 400.0);
    }

    #[tokio::test]
    async fn test_delete_unknown_meal_is_not_found() {
        let mut s = state().await;
        s.add_meal(analysis(100.0, 1.0, 1.0, 1.0)).await.unwrap();
        let err = s.delete_meal(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AnnapurnaError::NotFound(_)));
        assert_eq!(s.meal_log().len(), 1);
    }

    #[tokio::test]
    async fn test_water_accumulates() {
        let mut s = state().await;
        assert_eq!(s.add_water(250).await.unwrap(), 250);
        assert_eq!(s.add_water(1000).await.unwrap(), 1250);
        assert_eq!(s.add_water(250).await.unwrap(), 1500);
        let reloaded = UserState::hydrate(s.store().clone()).await.unwrap();
        assert_eq!(reloaded.water_intake(), 1500);
    }

    #[tokio::test]
    async fn test_water_saturates() {
        let mut s = state().await;
        s.add_water(u32::MAX - 10).await.unwrap();
        assert_eq!(s.add_water(250).await.unwrap(), u32::MAX);
    }

    #[tokio::test]
    async fn test_toggle_saved_recipe() {
        let mut s = state().await;
        assert!(s.toggle_saved_recipe(recipe("Poha")).await.unwrap());
        assert!(s.toggle_saved_recipe(recipe("Upma")).await.unwrap());
        assert_eq!(s.saved_recipes().len(), 2);

        assert!(!s.toggle_saved_recipe(recipe("Poha")).await.unwrap());
        let names: Vec<_> = s.saved_recipes().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Upma"]);

        let reloaded = UserState::hydrate(s.store().clone()).await.unwrap();
        assert_eq!(reloaded.saved_recipes().len(), 1);
        assert!(reloaded.find_saved_recipe("upma").is_some());
    }

    #[tokio::test]
    async fn test_find_meal_by_prefix() {
        let mut s = state().await;
        let entry = s.add_meal(analysis(100.0, 1.0, 1.0, 1.0)).await.unwrap().clone();

        assert_eq!(s.find_meal_by_prefix(&entry.short_id()).unwrap().id, entry.id);
        assert_eq!(
            s.find_meal_by_prefix(&entry.id.to_string().to_uppercase())
                .unwrap()
                .id,
            entry.id
        );
        assert!(matches!(
            s.find_meal_by_prefix("zzzzzzzz").unwrap_err(),
            AnnapurnaError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_find_meal_ambiguous_prefix() {
        let mut s = state().await;
        let mut a = MealEntry::new(analysis(100.0, 1.0, 1.0, 1.0));
        let mut b = MealEntry::new(analysis(200.0, 1.0, 1.0, 1.0));
        a.id = Uuid::parse_str("abcd1234-0000-4000-8000-000000000001").unwrap();
        b.id = Uuid::parse_str("abcd5678-0000-4000-8000-000000000002").unwrap();
        s.meal_log = vec![b, a];

        assert!(matches!(
            s.find_meal_by_prefix("abcd").unwrap_err(),
            AnnapurnaError::InvalidInput(_)
        ));
        assert_eq!(s.find_meal_by_prefix("abcd5").unwrap().total.calories, 200.0);
    }

    #[tokio::test]
    async fn test_hydrate_from_corrupt_store_starts_over() {
        let store = LocalStore::open_in_memory().unwrap();
        store.save(StoreKey::WaterIntake, &750u32).await.unwrap();
        store.save_raw(StoreKey::Profile, "not json").await.unwrap();

        let s = UserState::hydrate(store).await.unwrap();
        assert!(!s.is_onboarding_complete());
        assert_eq!(s.water_intake(), 0);
    }

    #[tokio::test]
    async fn test_reset_returns_to_onboarding() {
        let mut s = state().await;
        s.save_profile(ProfileInput::new("Asha", 29)).await.unwrap();
        s.add_water(500).await.unwrap();
        s.toggle_saved_recipe(recipe("Poha")).await.unwrap();

        s.reset().await.unwrap();
        assert!(!s.is_onboarding_complete());
        assert_eq!(s.water_intake(), 0);
        assert!(s.saved_recipes().is_empty());

        let reloaded = UserState::hydrate(s.store().clone()).await.unwrap();
        assert!(!reloaded.is_onboarding_complete());
    }
}

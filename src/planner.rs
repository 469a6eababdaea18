use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::completion::{CompletionError, CompletionGateway};
use crate::models::{MealPlan, MealRecord, MealType, ProfileError, UserProfile};
use crate::nutrition::daily_targets;
use crate::parser::{parse_meal_plan, parse_single_meal, ParseError};
use crate::prompt::{full_plan_prompt, single_meal_prompt};
use crate::regen::{regeneration_target, RegenError, TargetSource};

#[derive(Debug, Error)]
pub enum PlanError {
    #[error(transparent)] Profile(#[from] ProfileError),
    #[error(transparent)] Regeneration(#[from] RegenError),
    #[error("completion service failed: {0}")] Completion(#[from] CompletionError),
    #[error(transparent)] Parse(#[from] ParseError),
}

#[derive(Debug, Clone)]
pub struct GeneratedPlan {
    pub plan: MealPlan,
    pub raw_text: String,
}

#[derive(Debug, Clone)]
pub struct RegeneratedMeal {
    pub meal: MealRecord,
    pub raw_text: String,
}

/// Stateless: everything a call needs arrives in its arguments.
pub struct MealPlanner {
    completion: Arc<dyn CompletionGateway>,
}

impl MealPlanner {
    pub fn new(completion: Arc<dyn CompletionGateway>) -> Self {
        Self { completion }
    }

    pub async fn generate(&self, profile: &UserProfile) -> Result<GeneratedPlan, PlanError> {
        let targets = daily_targets(profile);
        info!(
            "🚀 Generating meal plan: {} kcal, {}g protein, {}g fat, {}g carbs",
            targets.target_calories, targets.daily_macros.protein, targets.daily_macros.fat, targets.daily_macros.carbs
        );

        let prompt = full_plan_prompt(&targets, &profile.health_condition, &profile.dietary_restriction);
        let raw_text = self.completion.complete(&prompt).await?;
        let meals = parse_meal_plan(&raw_text)?;

        info!("✅ Meal plan ready: {} / {} / {}", meals.breakfast.name, meals.lunch.name, meals.dinner.name);
        Ok(GeneratedPlan { plan: MealPlan { targets, meals }, raw_text: raw_text.trim().to_string() })
    }

    /// Produces a replacement for `meal`. `plan` carries the caller's current day; its
    /// slot for `meal` is not read unless it is also passed as `original`.
    pub async fn regenerate(
        &self,
        meal: MealType,
        plan: &MealPlan,
        health: &str,
        dietary: &str,
        original: Option<&MealRecord>,
    ) -> Result<RegeneratedMeal, PlanError> {
        let source = match original {
            Some(original) => TargetSource::OriginalMeal(original),
            None => {
                let [a, b] = meal.others();
                TargetSource::RemainingBudget { targets: &plan.targets, others: [plan.meals.get(a), plan.meals.get(b)] }
            }
        };
        let target = regeneration_target(meal, source)?;
        info!(
            "🔄 Regenerating {}: {} kcal, {}g protein, {}g fat, {}g carbs",
            meal, target.calories, target.protein, target.fat, target.carbs
        );

        let prompt = single_meal_prompt(meal, &target, health, dietary);
        let raw_text = self.completion.complete(&prompt).await?;
        let record = parse_single_meal(&raw_text, meal)?;

        info!("✅ New {}: {}", meal, record.name);
        Ok(RegeneratedMeal { meal: record, raw_text: raw_text.trim().to_string() })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::{DailyTargets, DayMeals, Gender, Macros};
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    /// Replays canned responses and records every prompt it is sent.
    pub(crate) struct ScriptedCompletion {
        responses: Mutex<Vec<Result<String, CompletionError>>>,
        pub prompts: Mutex<Vec<String>>,
    }

    impl ScriptedCompletion {
        pub(crate) fn new(responses: Vec<Result<String, CompletionError>>) -> Arc<Self> {
            Arc::new(Self { responses: Mutex::new(responses), prompts: Mutex::new(Vec::new()) })
        }

        pub(crate) fn replying(text: &str) -> Arc<Self> {
            Self::new(vec![Ok(text.to_string())])
        }
    }

    #[async_trait]
    impl CompletionGateway for ScriptedCompletion {
        async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                return Err(CompletionError::Other("no scripted response left".into()));
            }
            responses.remove(0)
        }
    }

    pub(crate) const PLAN_TEXT: &str = "Breakfast:\nName: Oat Bowl\nCalories: 500\nProtein: 30g\nFat: 15g\nCarbs: 60g\n\
        Ingredients:\n1. 1 cup oats\n2. 1 banana\nRecipe:\n1. Cook oats.\n2. Slice banana on top.\n\n\
        Lunch:\nName: Chicken Wrap\nCalories: 700\nProtein: 45g\nFat: 20g\nCarbs: 80g\n\
        Ingredients:\n1. 1 tortilla\n2. 120g chicken\nRecipe:\n1. Grill chicken.\n2. Wrap it.\n\n\
        Dinner:\nName: Salmon Rice\nCalories: 800\nProtein: 50g\nFat: 21g\nCarbs: 110g\n\
        Ingredients:\n1. 180g salmon\n2. 1 cup rice\nRecipe:\n1. Bake salmon.\n2. Serve on rice.\n";

    pub(crate) const DINNER_TEXT: &str = "Dinner:\nName: Bean Chili\nCalories: 780\nProtein: 48g\nFat: 20g\nCarbs: 105g\n\
        Ingredients:\n1. 1 can kidney beans\n2. 1 can tomatoes\nRecipe:\n1. Simmer for 40 minutes.";

    pub(crate) fn sample_plan() -> MealPlan {
        MealPlan {
            targets: DailyTargets { target_calories: 2000, daily_macros: Macros { protein: 125, fat: 56, carbs: 250 } },
            meals: parse_meal_plan(PLAN_TEXT).unwrap(),
        }
    }

    #[tokio::test]
    async fn generate_composes_targets_prompt_and_parse() {
        let completion = ScriptedCompletion::replying(PLAN_TEXT);
        let planner = MealPlanner::new(completion.clone());
        let profile = UserProfile { gender: Gender::Male, dietary_restriction: "no pork".into(), ..UserProfile::default() };

        let generated = planner.generate(&profile).await.unwrap();

        assert_eq!(generated.plan.targets.target_calories, 2040);
        assert_eq!(generated.plan.targets.daily_macros, Macros { protein: 128, fat: 57, carbs: 255 });
        assert_eq!(generated.plan.meals.lunch.name, "Chicken Wrap");
        assert_eq!(generated.raw_text, PLAN_TEXT.trim());

        let prompts = completion.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("- Calories: 2040 kcal"));
        assert!(prompts[0].contains("- Dietary restriction: no pork"));
    }

    #[tokio::test]
    async fn generate_fails_on_incomplete_plan() {
        let cut = PLAN_TEXT.find("Dinner:").unwrap();
        let planner = MealPlanner::new(ScriptedCompletion::replying(&PLAN_TEXT[..cut]));
        let err = planner.generate(&UserProfile::default()).await.unwrap_err();
        assert!(matches!(err, PlanError::Parse(ParseError::MissingMeal(MealType::Dinner))));
    }

    #[tokio::test]
    async fn generate_propagates_upstream_failure() {
        let planner = MealPlanner::new(ScriptedCompletion::new(vec![Err(CompletionError::Http("connection refused".into()))]));
        let err = planner.generate(&UserProfile::default()).await.unwrap_err();
        assert!(matches!(err, PlanError::Completion(CompletionError::Http(_))));
    }

    #[tokio::test]
    async fn regenerate_from_remaining_budget() {
        let completion = ScriptedCompletion::replying(DINNER_TEXT);
        let planner = MealPlanner::new(completion.clone());
        let plan = sample_plan();

        let regenerated = planner.regenerate(MealType::Dinner, &plan, "none", "vegan", None).await.unwrap();

        assert_eq!(regenerated.meal.meal_type, MealType::Dinner);
        assert_eq!(regenerated.meal.name, "Bean Chili");
        assert_eq!(regenerated.meal.ingredients, vec!["1 can kidney beans", "1 can tomatoes"]);

        // 2000 - 500 - 700, and likewise for each macro
        let prompts = completion.prompts.lock().unwrap();
        assert!(prompts[0].contains("Regenerate the dinner meal"));
        assert!(prompts[0].contains("- Calories: 800 kcal"));
        assert!(prompts[0].contains("- Protein: 50g"));
        assert!(prompts[0].contains("- Fat: 21g"));
        assert!(prompts[0].contains("- Carbs: 110g"));
        assert!(prompts[0].contains("- Dietary restriction: vegan"));
    }

    #[tokio::test]
    async fn regenerate_with_original_ignores_other_meals() {
        let completion = ScriptedCompletion::new(vec![Ok(DINNER_TEXT.into()), Ok(DINNER_TEXT.into())]);
        let planner = MealPlanner::new(completion.clone());
        let plan = sample_plan();
        let original = plan.meals.dinner.clone();

        let mut altered = plan.clone();
        altered.meals = DayMeals {
            breakfast: MealRecord { calories: "1500".into(), ..plan.meals.breakfast.clone() },
            lunch: MealRecord { protein: "".into(), ..plan.meals.lunch.clone() },
            dinner: plan.meals.dinner.clone(),
        };

        planner.regenerate(MealType::Dinner, &plan, "none", "none", Some(&original)).await.unwrap();
        planner.regenerate(MealType::Dinner, &altered, "none", "none", Some(&original)).await.unwrap();

        let prompts = completion.prompts.lock().unwrap();
        assert_eq!(prompts[0], prompts[1]);
        assert!(prompts[0].contains("- Calories: 800 kcal"));
    }

    #[tokio::test]
    async fn regenerate_fails_when_reply_has_no_meal() {
        let planner = MealPlanner::new(ScriptedCompletion::replying("I'm sorry, I can't help with that."));
        let err = planner.regenerate(MealType::Dinner, &sample_plan(), "none", "none", None).await.unwrap_err();
        assert!(matches!(err, PlanError::Parse(ParseError::MissingMeal(MealType::Dinner))));
    }

    #[tokio::test]
    async fn implausible_budget_never_reaches_the_service() {
        let completion = ScriptedCompletion::replying(DINNER_TEXT);
        let planner = MealPlanner::new(completion.clone());
        let mut plan = sample_plan();
        plan.meals.breakfast.calories = "1800".into();

        let err = planner.regenerate(MealType::Dinner, &plan, "none", "none", None).await.unwrap_err();
        assert!(matches!(err, PlanError::Regeneration(RegenError::ImplausibleTarget { .. })));
        assert!(completion.prompts.lock().unwrap().is_empty());
    }
}

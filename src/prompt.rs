use crate::models::{DailyTargets, MealType};
use crate::regen::MealTarget;

/// Layout of one meal block. The parser matches these prefixes literally.
fn meal_layout(meal: MealType) -> String {
    format!(
        "{}:\n\
         Name: <Name of the dish>\n\
         Calories: <Meal calories>\n\
         Protein: <Meal protein in grams>\n\
         Fat: <Meal fat in grams>\n\
         Carbs: <Meal carbs in grams>\n\
         Ingredients:\n\
         1. <Ingredient 1>\n\
         2. <Ingredient 2>\n\
         3. ...\n\
         Recipe:\n\
         1. <Step 1>\n\
         2. <Step 2>\n\
         3. ...",
        meal.header()
    )
}

pub fn full_plan_prompt(targets: &DailyTargets, health: &str, dietary: &str) -> String {
    let macros = targets.daily_macros;
    let layout = MealType::ALL.into_iter().map(meal_layout).collect::<Vec<_>>().join("\n\n");
    format!(
        "You are a nutritionist. Create a 1-day meal plan with breakfast, lunch and dinner only, \
         for a person whose daily targets are:\n\
         - Calories: {calories} kcal\n\
         - Protein: {protein}g\n\
         - Fat: {fat}g\n\
         - Carbs: {carbs}g\n\
         - Health condition: {health}\n\
         - Dietary restriction: {dietary}\n\n\
         The three meals together should add up to these targets as closely as practical; \
         exact agreement is desired but not required.\n\n\
         Output the plan exactly in this format, with one blank line between meals:\n\n\
         {layout}\n\n\
         Do not include any extra text, numbering outside these lists, or explanations.",
        calories = targets.target_calories,
        protein = macros.protein,
        fat = macros.fat,
        carbs = macros.carbs,
    )
}

pub fn single_meal_prompt(meal: MealType, target: &MealTarget, health: &str, dietary: &str) -> String {
    format!(
        "You are a nutritionist. Regenerate the {meal} meal for a 1-day meal plan so that its \
         nutritional values meet:\n\
         - Calories: {calories} kcal\n\
         - Protein: {protein}g\n\
         - Fat: {fat}g\n\
         - Carbs: {carbs}g\n\
         - Health condition: {health}\n\
         - Dietary restriction: {dietary}\n\n\
         Matching these values exactly is desired but not required.\n\n\
         Output the {meal} exactly in this format:\n\n\
         {layout}\n\n\
         Do not include any extra text, numbering outside these lists, or explanations.",
        calories = target.calories,
        protein = target.protein,
        fat = target.fat,
        carbs = target.carbs,
        layout = meal_layout(meal),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Macros;

    fn header_lines(prompt: &str) -> Vec<&str> {
        prompt
            .lines()
            .map(str::trim)
            .filter(|l| ["Breakfast:", "Lunch:", "Dinner:"].contains(l))
            .collect()
    }

    #[test]
    fn full_plan_lists_all_meals_in_order() {
        let targets = DailyTargets {
            target_calories: 2040,
            daily_macros: Macros { protein: 128, fat: 57, carbs: 255 },
        };
        let prompt = full_plan_prompt(&targets, "Diabetes", "vegetarian");
        assert_eq!(header_lines(&prompt), vec!["Breakfast:", "Lunch:", "Dinner:"]);
        assert!(prompt.contains("- Calories: 2040 kcal"));
        assert!(prompt.contains("- Protein: 128g"));
        assert!(prompt.contains("- Fat: 57g"));
        assert!(prompt.contains("- Carbs: 255g"));
        assert!(prompt.contains("- Health condition: Diabetes"));
        assert!(prompt.contains("- Dietary restriction: vegetarian"));
        assert_eq!(prompt.matches("\nIngredients:\n").count(), 3);
        assert_eq!(prompt.matches("\nRecipe:\n").count(), 3);
    }

    #[test]
    fn single_meal_names_only_that_meal() {
        let target = MealTarget { calories: 800.0, protein: 50.0, fat: 20.5, carbs: 110.0 };
        let prompt = single_meal_prompt(MealType::Lunch, &target, "none", "none");
        assert_eq!(header_lines(&prompt), vec!["Lunch:"]);
        assert!(prompt.contains("Regenerate the lunch meal"));
        assert!(prompt.contains("- Calories: 800 kcal"));
        assert!(prompt.contains("- Fat: 20.5g"));
    }
}

use thiserror::Error;

use crate::models::{DailyTargets, MealRecord, MealType};

#[derive(Debug, Error, PartialEq)]
pub enum RegenError {
    #[error("{meal} {field} is not a number: '{value}'")]
    InvalidNutrient { meal: MealType, field: &'static str, value: String },
    #[error("remaining budget for {meal} is implausible ({calories} kcal, {protein}g protein, {fat}g fat, {carbs}g carbs); the other meals already exceed the daily targets")]
    ImplausibleTarget { meal: MealType, calories: f64, protein: f64, fat: f64, carbs: f64 },
}

/// Nutrition the regenerated meal is asked to hit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MealTarget {
    pub calories: f64,
    pub protein: f64,
    pub fat: f64,
    pub carbs: f64,
}

/// Where the regenerated meal's numbers come from.
#[derive(Debug, Clone, Copy)]
pub enum TargetSource<'a> {
    /// Reproduce the replaced meal's footprint exactly.
    OriginalMeal(&'a MealRecord),
    /// Whatever the day's targets leave after the two unchanged meals.
    RemainingBudget { targets: &'a DailyTargets, others: [&'a MealRecord; 2] },
}

/// Leading decimal number of a nutrition string: "450 kcal" -> 450, "30g" -> 30,
/// "1,050 kcal" -> 1050. Commas only count as thousands separators; "1,5" is unreadable.
pub fn leading_number(s: &str) -> Option<f64> {
    let s = s.trim();
    let end = s
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || c == ',' || (c == '.' && i > 0) || (c == '-' && i == 0)))
        .map_or(s.len(), |(i, _)| i);
    let run = s[..end].trim_end_matches(|c: char| c == '.' || c == ',');
    let (whole, fraction) = run.split_once('.').unwrap_or((run, ""));
    if whole.contains(',') {
        let mut groups = whole.trim_start_matches('-').split(',');
        let lead = groups.next()?;
        if lead.is_empty() || lead.len() > 3 || groups.any(|g| g.len() != 3) {
            return None;
        }
    }
    if fraction.contains(',') {
        return None;
    }
    run.replace(',', "").parse().ok()
}

fn nutrient(meal: MealType, field: &'static str, value: &str, blank_as_zero: bool) -> Result<f64, RegenError> {
    if blank_as_zero && value.trim().is_empty() {
        return Ok(0.0);
    }
    leading_number(value).ok_or_else(|| RegenError::InvalidNutrient { meal, field, value: value.to_string() })
}

fn nutrition_of(record: &MealRecord, blank_as_zero: bool) -> Result<MealTarget, RegenError> {
    let meal = record.meal_type;
    Ok(MealTarget {
        calories: nutrient(meal, "calories", &record.calories, blank_as_zero)?,
        protein: nutrient(meal, "protein", &record.protein, blank_as_zero)?,
        fat: nutrient(meal, "fat", &record.fat, blank_as_zero)?,
        carbs: nutrient(meal, "carbs", &record.carbs, blank_as_zero)?,
    })
}

fn one_decimal(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

pub fn regeneration_target(meal: MealType, source: TargetSource<'_>) -> Result<MealTarget, RegenError> {
    match source {
        TargetSource::OriginalMeal(original) => nutrition_of(original, false),
        TargetSource::RemainingBudget { targets, others } => {
            let a = nutrition_of(others[0], true)?;
            let b = nutrition_of(others[1], true)?;
            let macros = targets.daily_macros;
            let target = MealTarget {
                calories: one_decimal(targets.target_calories as f64 - a.calories - b.calories),
                protein: one_decimal(macros.protein as f64 - a.protein - b.protein),
                fat: one_decimal(macros.fat as f64 - a.fat - b.fat),
                carbs: one_decimal(macros.carbs as f64 - a.carbs - b.carbs),
            };
            if target.calories <= 0.0 || target.protein < 0.0 || target.fat < 0.0 || target.carbs < 0.0 {
                return Err(RegenError::ImplausibleTarget {
                    meal,
                    calories: target.calories,
                    protein: target.protein,
                    fat: target.fat,
                    carbs: target.carbs,
                });
            }
            Ok(target)
        }
    }
}

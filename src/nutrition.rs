//! Daily energy and macronutrient targets.
//!
//! BMR uses the revised Harris-Benedict coefficients (Roza & Shizgal, 1984),
//! scaled by an activity multiplier to get TDEE. Goals shift TDEE by a flat
//! 500 kcal/day (about 0.5 kg per week), then calories are split 25/25/50
//! across protein, fat and carbohydrate using Atwater factors.

use crate::models::{ActivityLevel, DailyTargets, Gender, Goal, Macros, UserProfile};

/// kcal per day added or removed for a weight change goal.
pub const GOAL_ADJUSTMENT_KCAL: f64 = 500.0;

pub const PROTEIN_SHARE: f64 = 0.25;
pub const FAT_SHARE: f64 = 0.25;
pub const CARB_SHARE: f64 = 0.50;

pub const KCAL_PER_G_PROTEIN: f64 = 4.0;
pub const KCAL_PER_G_FAT: f64 = 9.0;
pub const KCAL_PER_G_CARBS: f64 = 4.0;

fn male_bmr(weight_kg: f64, height_cm: f64, age: f64) -> f64 {
    13.397 * weight_kg + 4.799 * height_cm - 5.677 * age + 88.362
}

fn female_bmr(weight_kg: f64, height_cm: f64, age: f64) -> f64 {
    9.247 * weight_kg + 3.098 * height_cm - 4.330 * age + 447.593
}

/// Basal metabolic rate in kcal/day. Other and unspecified genders get the mean of both formulas.
pub fn bmr(gender: Gender, weight_kg: f64, height_cm: f64, age: u32) -> f64 {
    let age = f64::from(age);
    match gender {
        Gender::Male => male_bmr(weight_kg, height_cm, age),
        Gender::Female => female_bmr(weight_kg, height_cm, age),
        Gender::Other | Gender::Unspecified => {
            (male_bmr(weight_kg, height_cm, age) + female_bmr(weight_kg, height_cm, age)) / 2.0
        }
    }
}

pub fn activity_factor(level: ActivityLevel) -> f64 {
    match level {
        ActivityLevel::UpToOneHour => 1.2,
        ActivityLevel::OneToThreeHours => 1.375,
        ActivityLevel::ThreeToSixHours => 1.55,
        ActivityLevel::SixToTenHours => 1.725,
        ActivityLevel::OverTenHours => 1.9,
    }
}

pub fn tdee(profile: &UserProfile) -> f64 {
    bmr(profile.gender, profile.weight_kg, profile.height_cm, profile.age) * activity_factor(profile.activity)
}

pub fn target_calories(profile: &UserProfile) -> i64 {
    let tdee = tdee(profile);
    let adjusted = match profile.goal {
        Goal::LoseWeight => tdee - GOAL_ADJUSTMENT_KCAL,
        Goal::GainWeight => tdee + GOAL_ADJUSTMENT_KCAL,
        Goal::Maintain => tdee,
    };
    adjusted.round() as i64
}

pub fn macro_split(target_calories: i64) -> Macros {
    let kcal = target_calories as f64;
    Macros {
        protein: (kcal * PROTEIN_SHARE / KCAL_PER_G_PROTEIN).round() as i64,
        fat: (kcal * FAT_SHARE / KCAL_PER_G_FAT).round() as i64,
        carbs: (kcal * CARB_SHARE / KCAL_PER_G_CARBS).round() as i64,
    }
}

pub fn daily_targets(profile: &UserProfile) -> DailyTargets {
    let target_calories = target_calories(profile);
    DailyTargets { target_calories, daily_macros: macro_split(target_calories) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GenerateRequest;
    use pretty_assertions::assert_eq;

    fn male_profile() -> UserProfile {
        UserProfile { gender: Gender::Male, ..UserProfile::default() }
    }

    #[test]
    fn reference_male_profile() {
        let profile = male_profile();
        let bmr = bmr(Gender::Male, 70.0, 170.0, 25);
        assert!((bmr - 1700.057).abs() < 1e-6, "bmr was {bmr}");
        assert!((tdee(&profile) - 2040.0684).abs() < 1e-6);

        let targets = daily_targets(&profile);
        assert_eq!(targets.target_calories, 2040);
        assert_eq!(targets.daily_macros, Macros { protein: 128, fat: 57, carbs: 255 });
    }

    #[test]
    fn female_and_unspecified_profiles() {
        let female = UserProfile { gender: Gender::Female, ..UserProfile::default() };
        assert_eq!(target_calories(&female), 1816);

        let other = UserProfile { gender: Gender::Other, ..UserProfile::default() };
        let unspecified = UserProfile::default();
        assert_eq!(target_calories(&other), 1928);
        assert_eq!(target_calories(&unspecified), 1928);
    }

    #[test]
    fn bmr_is_monotonic() {
        for gender in [Gender::Male, Gender::Female, Gender::Unspecified] {
            for w in [40.0, 70.0, 120.0] {
                for h in [150.0, 170.0, 200.0] {
                    for a in [18, 40, 80] {
                        let base = bmr(gender, w, h, a);
                        assert!(bmr(gender, w + 1.0, h, a) > base);
                        assert!(bmr(gender, w, h + 1.0, a) > base);
                        assert!(bmr(gender, w, h, a + 1) < base);
                    }
                }
            }
        }
    }

    #[test]
    fn lose_and_gain_are_a_thousand_apart() {
        let lose = UserProfile { goal: Goal::LoseWeight, ..male_profile() };
        let gain = UserProfile { goal: Goal::GainWeight, ..male_profile() };
        assert_eq!(target_calories(&lose), 1540);
        assert_eq!(target_calories(&gain), 2540);
        assert_eq!(target_calories(&gain) - target_calories(&lose), 1000);
    }

    #[test]
    fn activity_bands() {
        assert_eq!(activity_factor(ActivityLevel::UpToOneHour), 1.2);
        assert_eq!(activity_factor(ActivityLevel::OverTenHours), 1.9);

        let req = GenerateRequest {
            gender: Some("Male".into()),
            activity: Some("daily marathons".into()),
            ..GenerateRequest::default()
        };
        let unknown = UserProfile::try_from(&req).unwrap();
        assert_eq!(tdee(&unknown), tdee(&male_profile()));

        let active = UserProfile { activity: ActivityLevel::ThreeToSixHours, ..male_profile() };
        assert_eq!(target_calories(&active), 2635);
    }

    #[test]
    fn macro_split_roughly_restores_calories() {
        for kcal in [1200, 1816, 2040, 3230] {
            let m = macro_split(kcal);
            let back = m.protein * 4 + m.fat * 9 + m.carbs * 4;
            assert!((back - kcal).abs() <= 8, "{kcal} -> {back}");
        }
    }
}

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer, ser::SerializeMap};
use serde_with::{serde_as, DisplayFromStr, PickFirst};
use thiserror::Error;
use uuid::Uuid;

pub const DEFAULT_AGE: u32 = 25;
pub const DEFAULT_HEIGHT_CM: f64 = 170.0;
pub const DEFAULT_WEIGHT_KG: f64 = 70.0;
pub const DEFAULT_ACTIVITY: &str = "0-1 hr/week";
pub const DEFAULT_CONDITION: &str = "none";

#[derive(Debug, Error, PartialEq)]
pub enum ProfileError {
    #[error("{field} must be a positive whole number, got '{value}'")]
    NotAWholeNumber { field: &'static str, value: String },
    #[error("{field} must be a positive number, got '{value}'")]
    NotAPositiveNumber { field: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
}

impl MealType {
    pub const ALL: [MealType; 3] = [MealType::Breakfast, MealType::Lunch, MealType::Dinner];

    /// Lowercase key used on the wire (`breakfastName`, `regenMeal: "lunch"`).
    pub fn key(self) -> &'static str {
        match self {
            MealType::Breakfast => "breakfast",
            MealType::Lunch => "lunch",
            MealType::Dinner => "dinner",
        }
    }

    /// Capitalised header used in the model's text layout.
    pub fn header(self) -> &'static str {
        match self {
            MealType::Breakfast => "Breakfast",
            MealType::Lunch => "Lunch",
            MealType::Dinner => "Dinner",
        }
    }

    pub fn from_key(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.key().eq_ignore_ascii_case(s.trim()))
    }

    /// The two meals left untouched when `self` is regenerated, in day order.
    pub fn others(self) -> [MealType; 2] {
        match self {
            MealType::Breakfast => [MealType::Lunch, MealType::Dinner],
            MealType::Lunch => [MealType::Breakfast, MealType::Dinner],
            MealType::Dinner => [MealType::Breakfast, MealType::Lunch],
        }
    }
}

impl fmt::Display for MealType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.key()) }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gender {
    Male,
    Female,
    Other,
    Unspecified,
}

impl Gender {
    fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "male" | "m" => Gender::Male,
            "female" | "f" => Gender::Female,
            "other" => Gender::Other,
            _ => Gender::Unspecified,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Goal {
    LoseWeight,
    Maintain,
    GainWeight,
}

impl Goal {
    /// Accepts the labels the forms have used over time ("Lose Weight", "Maintain Weight", "Gain Muscle").
    fn parse(s: &str) -> Self {
        let s = s.to_ascii_lowercase();
        if s.contains("lose") {
            Goal::LoseWeight
        } else if s.contains("gain") {
            Goal::GainWeight
        } else {
            Goal::Maintain
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityLevel {
    UpToOneHour,
    OneToThreeHours,
    ThreeToSixHours,
    SixToTenHours,
    OverTenHours,
}

impl ActivityLevel {
    pub const ALL: [ActivityLevel; 5] = [
        ActivityLevel::UpToOneHour,
        ActivityLevel::OneToThreeHours,
        ActivityLevel::ThreeToSixHours,
        ActivityLevel::SixToTenHours,
        ActivityLevel::OverTenHours,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ActivityLevel::UpToOneHour => "0-1 hr/week",
            ActivityLevel::OneToThreeHours => "1-3 hrs/week",
            ActivityLevel::ThreeToSixHours => "3-6 hrs/week",
            ActivityLevel::SixToTenHours => "6-10 hrs/week",
            ActivityLevel::OverTenHours => "10+ hrs/week",
        }
    }

    pub fn from_label(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.label().eq_ignore_ascii_case(s.trim()))
    }
}

/// Validated biometric input. Built fresh for every request.
#[derive(Debug, Clone, PartialEq)]
pub struct UserProfile {
    pub gender: Gender,
    pub age: u32,
    pub height_cm: f64,
    pub weight_kg: f64,
    pub goal: Goal,
    pub activity: ActivityLevel,
    pub health_condition: String,
    pub dietary_restriction: String,
}

impl Default for UserProfile {
    fn default() -> Self {
        Self {
            gender: Gender::Unspecified,
            age: DEFAULT_AGE,
            height_cm: DEFAULT_HEIGHT_CM,
            weight_kg: DEFAULT_WEIGHT_KG,
            goal: Goal::Maintain,
            activity: ActivityLevel::UpToOneHour,
            health_condition: DEFAULT_CONDITION.to_string(),
            dietary_restriction: DEFAULT_CONDITION.to_string(),
        }
    }
}

fn non_blank(v: &Option<String>) -> Option<&str> {
    v.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn positive_number(field: &'static str, raw: &str) -> Result<f64, ProfileError> {
    match raw.parse::<f64>() {
        Ok(n) if n.is_finite() && n > 0.0 => Ok(n),
        _ => Err(ProfileError::NotAPositiveNumber { field, value: raw.to_string() }),
    }
}

impl TryFrom<&GenerateRequest> for UserProfile {
    type Error = ProfileError;

    fn try_from(req: &GenerateRequest) -> Result<Self, Self::Error> {
        let mut profile = UserProfile::default();
        if let Some(g) = non_blank(&req.gender) {
            profile.gender = Gender::parse(g);
        }
        if let Some(age) = non_blank(&req.age) {
            profile.age = age
                .parse::<u32>()
                .ok()
                .filter(|a| *a > 0)
                .ok_or_else(|| ProfileError::NotAWholeNumber { field: "age", value: age.to_string() })?;
        }
        if let Some(h) = non_blank(&req.height) {
            profile.height_cm = positive_number("height", h)?;
        }
        if let Some(w) = non_blank(&req.weight) {
            profile.weight_kg = positive_number("weight", w)?;
        }
        if let Some(goal) = non_blank(&req.goal) {
            profile.goal = Goal::parse(goal);
        }
        if let Some(activity) = non_blank(&req.activity) {
            profile.activity = ActivityLevel::from_label(activity).unwrap_or_else(|| {
                tracing::warn!("⚠️ Unknown activity level '{}', using {}", activity, DEFAULT_ACTIVITY);
                ActivityLevel::UpToOneHour
            });
        }
        if let Some(h) = non_blank(&req.health) {
            profile.health_condition = h.to_string();
        }
        if let Some(d) = non_blank(&req.dietary) {
            profile.dietary_restriction = d.to_string();
        }
        Ok(profile)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Macros {
    #[serde(deserialize_with = "int_or_numeric_string")]
    pub protein: i64,
    #[serde(deserialize_with = "int_or_numeric_string")]
    pub fat: i64,
    #[serde(deserialize_with = "int_or_numeric_string")]
    pub carbs: i64,
}

#[serde_as]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyTargets {
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub target_calories: i64,
    pub daily_macros: Macros,
}

/// One parsed meal. Nutrition values keep the model's own formatting ("450 kcal").
#[derive(Debug, Clone, PartialEq)]
pub struct MealRecord {
    pub meal_type: MealType,
    pub name: String,
    pub calories: String,
    pub protein: String,
    pub fat: String,
    pub carbs: String,
    pub ingredients: Vec<String>,
    pub recipe: Vec<String>,
}

impl MealRecord {
    pub fn new(meal_type: MealType) -> Self {
        Self {
            meal_type,
            name: String::new(),
            calories: String::new(),
            protein: String::new(),
            fat: String::new(),
            carbs: String::new(),
            ingredients: Vec::new(),
            recipe: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DayMeals {
    pub breakfast: MealRecord,
    pub lunch: MealRecord,
    pub dinner: MealRecord,
}

impl DayMeals {
    pub fn get(&self, meal: MealType) -> &MealRecord {
        match meal {
            MealType::Breakfast => &self.breakfast,
            MealType::Lunch => &self.lunch,
            MealType::Dinner => &self.dinner,
        }
    }

    /// Replaces the slot named by `record.meal_type` wholesale.
    pub fn replace(&mut self, record: MealRecord) {
        let slot = match record.meal_type {
            MealType::Breakfast => &mut self.breakfast,
            MealType::Lunch => &mut self.lunch,
            MealType::Dinner => &mut self.dinner,
        };
        *slot = record;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MealPlan {
    pub targets: DailyTargets,
    pub meals: DayMeals,
}

// --- Wire types ---

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct GenerateRequest {
    #[serde(default, deserialize_with = "lenient_text")]
    pub gender: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub age: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub height: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub weight: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub goal: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub activity: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub health: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub dietary: Option<String>,
}

/// Meal as held by the client between requests.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct MealInput {
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub calories: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub protein: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub fat: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub carbs: Option<String>,
    #[serde(default)]
    pub ingredients: Option<ListInput>,
    #[serde(default)]
    pub recipe: Option<ListInput>,
}

/// Lists arrive either as arrays or as the numbered text this service renders.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(untagged)]
pub enum ListInput {
    Items(Vec<String>),
    Numbered(String),
}

impl ListInput {
    pub fn into_items(self) -> Vec<String> {
        match self {
            ListInput::Items(items) => items,
            ListInput::Numbered(text) => text
                .lines()
                .map(|l| strip_numbering(l.trim()).trim().to_string())
                .filter(|l| !l.is_empty())
                .collect(),
        }
    }
}

fn strip_numbering(line: &str) -> &str {
    let digits = line.bytes().take_while(u8::is_ascii_digit).count();
    if digits > 0 {
        if let Some(rest) = line[digits..].strip_prefix('.') {
            return rest;
        }
    }
    line
}

impl MealInput {
    pub fn into_record(self, meal_type: MealType) -> MealRecord {
        MealRecord {
            meal_type,
            name: self.name.unwrap_or_default(),
            calories: self.calories.unwrap_or_default(),
            protein: self.protein.unwrap_or_default(),
            fat: self.fat.unwrap_or_default(),
            carbs: self.carbs.unwrap_or_default(),
            ingredients: self.ingredients.map(ListInput::into_items).unwrap_or_default(),
            recipe: self.recipe.map(ListInput::into_items).unwrap_or_default(),
        }
    }
}

/// Everything but `regenMeal`, which is validated before this is decoded.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RegenerateRequest {
    #[serde(flatten)]
    pub targets: DailyTargets,
    #[serde(default)]
    pub breakfast: Option<MealInput>,
    #[serde(default)]
    pub lunch: Option<MealInput>,
    #[serde(default)]
    pub dinner: Option<MealInput>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub health: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub dietary: Option<String>,
    #[serde(default)]
    pub original_meal: Option<MealInput>,
}

impl RegenerateRequest {
    pub fn take_meal(&mut self, meal: MealType) -> Option<MealInput> {
        match meal {
            MealType::Breakfast => self.breakfast.take(),
            MealType::Lunch => self.lunch.take(),
            MealType::Dinner => self.dinner.take(),
        }
    }
}

/// Flat per-meal view (`breakfastName`, `lunchCalories`, ...) the client renders directly.
#[derive(Debug, Clone)]
pub struct MealPlanView(pub MealPlan);

pub fn numbered(items: &[String]) -> String {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| format!("{}. {}", i + 1, item))
        .collect::<Vec<_>>()
        .join("\n")
}

impl Serialize for MealPlanView {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let plan = &self.0;
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("targetCalories", &plan.targets.target_calories)?;
        map.serialize_entry("dailyMacros", &plan.targets.daily_macros)?;
        for meal in MealType::ALL {
            let rec = plan.meals.get(meal);
            let key = meal.key();
            map.serialize_entry(&format!("{key}Name"), &rec.name)?;
            map.serialize_entry(&format!("{key}Ingredients"), &numbered(&rec.ingredients))?;
            map.serialize_entry(&format!("{key}Recipe"), &numbered(&rec.recipe))?;
            map.serialize_entry(&format!("{key}Calories"), &rec.calories)?;
            map.serialize_entry(&format!("{key}Protein"), &rec.protein)?;
            map.serialize_entry(&format!("{key}Fat"), &rec.fat)?;
            map.serialize_entry(&format!("{key}Carbs"), &rec.carbs)?;
        }
        map.end()
    }
}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub plan_id: Uuid,
    pub generated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub plan: MealPlanView,
    pub raw_meal_plan_text: String,
}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RegenerateResponse {
    #[serde(flatten)]
    pub plan: MealPlanView,
    pub regenerated_meal_raw_text: String,
}

// --- Lenient decoding helpers ---

#[derive(Deserialize)]
#[serde(untagged)]
enum TextOrNumber {
    Text(String),
    Int(i64),
    Float(f64),
}

fn lenient_text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<TextOrNumber>::deserialize(d)?.map(|v| match v {
        TextOrNumber::Text(s) => s,
        TextOrNumber::Int(n) => n.to_string(),
        TextOrNumber::Float(n) => n.to_string(),
    }))
}

fn int_or_numeric_string<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
    match TextOrNumber::deserialize(d)? {
        TextOrNumber::Int(n) => Ok(n),
        TextOrNumber::Float(n) => Ok(n.round() as i64),
        TextOrNumber::Text(s) => s
            .trim()
            .parse::<f64>()
            .map(|n| n.round() as i64)
            .map_err(|_| serde::de::Error::custom(format!("expected a number, got '{s}'"))),
    }
}

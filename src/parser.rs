//! Line grammar for model output.
//!
//! ```text
//! plan   := preamble? block{3}
//! block  := header field* ("Ingredients:" item*)? ("Recipe:" item*)?
//! header := ("Breakfast" | "Lunch" | "Dinner") ":"
//! field  := ("Name" | "Calories" | "Protein" | "Fat" | "Carbs") ":" text
//! item   := digits "." whitespace text
//! ```
//!
//! Anything else inside a block is skipped, so chatty output does not break parsing.

use std::collections::HashMap;

use thiserror::Error;
use tracing::{debug, warn};

use crate::models::{DayMeals, MealRecord, MealType};

#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("model response has no {0} section")]
    MissingMeal(MealType),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Name,
    Calories,
    Protein,
    Fat,
    Carbs,
}

const FIELDS: [(&str, Field); 5] = [
    ("Name:", Field::Name),
    ("Calories:", Field::Calories),
    ("Protein:", Field::Protein),
    ("Fat:", Field::Fat),
    ("Carbs:", Field::Carbs),
];

#[derive(Debug, PartialEq)]
enum Line<'a> {
    Header(MealType),
    Field(Field, &'a str),
    Ingredients,
    Recipe,
    Item(&'a str),
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    SeekHeader,
    SeekField,
    InIngredients,
    InRecipe,
}

fn header(line: &str) -> Option<MealType> {
    let bare = line.trim_matches(|c: char| c == '*' || c == '#' || c.is_whitespace());
    MealType::from_key(bare.strip_suffix(':')?)
}

fn numbered_item(line: &str) -> Option<&str> {
    let digits = line.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    let rest = line[digits..].strip_prefix('.')?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    Some(rest.trim())
}

fn classify(raw: &str) -> Line<'_> {
    let line = raw.trim();
    if let Some(meal) = header(line) {
        return Line::Header(meal);
    }
    for (prefix, field) in FIELDS {
        if let Some(value) = line.strip_prefix(prefix) {
            return Line::Field(field, value.trim());
        }
    }
    match line {
        "Ingredients:" => Line::Ingredients,
        "Recipe:" => Line::Recipe,
        _ => numbered_item(line).map_or(Line::Other, Line::Item),
    }
}

/// Applies one in-block line to `record`, returning the next state.
fn step(state: State, line: Line<'_>, record: &mut MealRecord) -> State {
    match line {
        Line::Field(field, value) => {
            let slot = match field {
                Field::Name => &mut record.name,
                Field::Calories => &mut record.calories,
                Field::Protein => &mut record.protein,
                Field::Fat => &mut record.fat,
                Field::Carbs => &mut record.carbs,
            };
            *slot = value.to_string();
            state
        }
        Line::Ingredients => State::InIngredients,
        Line::Recipe => State::InRecipe,
        Line::Item(text) => {
            match state {
                State::InIngredients => record.ingredients.push(text.to_string()),
                State::InRecipe => record.recipe.push(text.to_string()),
                State::SeekHeader | State::SeekField => {}
            }
            state
        }
        Line::Header(_) | Line::Other => state,
    }
}

/// Parses a full-day response into its three meals. Every meal must be present.
pub fn parse_meal_plan(text: &str) -> Result<DayMeals, ParseError> {
    let mut meals: HashMap<MealType, MealRecord> = HashMap::new();
    let mut current: Option<MealRecord> = None;
    let mut state = State::SeekHeader;

    for raw in text.lines() {
        match classify(raw) {
            Line::Header(meal) => {
                if let Some(done) = current.replace(MealRecord::new(meal)) {
                    meals.insert(done.meal_type, done);
                }
                state = State::SeekField;
            }
            line => {
                if let Some(record) = current.as_mut() {
                    state = step(state, line, record);
                }
            }
        }
    }
    if let Some(done) = current {
        meals.insert(done.meal_type, done);
    }

    debug!("📋 Parsed {} meal blocks", meals.len());
    let mut take = |meal: MealType| meals.remove(&meal).ok_or(ParseError::MissingMeal(meal));
    Ok(DayMeals { breakfast: take(MealType::Breakfast)?, lunch: take(MealType::Lunch)?, dinner: take(MealType::Dinner)? })
}

/// Parses a one-meal response. Chatter and a leading header are skipped; a header after the
/// meal's first field, section or item ends it. A reply with none of those is an error.
pub fn parse_single_meal(text: &str, meal: MealType) -> Result<MealRecord, ParseError> {
    let mut record = MealRecord::new(meal);
    let mut state = State::SeekField;
    let mut seen_content = false;

    for raw in text.lines() {
        match classify(raw) {
            Line::Header(found) if !seen_content => {
                if found != meal {
                    warn!("⚠️ Asked for {} but the response is headed {}", meal, found);
                }
            }
            Line::Header(found) => {
                debug!("Ignoring trailing {} section in single-meal response", found);
                break;
            }
            Line::Other => {}
            Line::Item(_) if state == State::SeekField => {}
            line => {
                state = step(state, line, &mut record);
                seen_content = true;
            }
        }
    }

    if !seen_content {
        return Err(ParseError::MissingMeal(meal));
    }
    Ok(record)
}

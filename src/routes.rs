use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::Instrument;
use uuid::Uuid;

use crate::{
    models::{
        DayMeals, GenerateRequest, GenerateResponse, MealPlan, MealPlanView, MealRecord, MealType, RegenerateRequest,
        RegenerateResponse, UserProfile, DEFAULT_CONDITION,
    },
    planner::{MealPlanner, PlanError},
};

#[derive(Clone)]
pub struct AppState {
    pub planner: Arc<MealPlanner>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/generate", post(generate_meal_plan))
        .route("/api/regenerate", post(regenerate_meal))
        // path the original browser client posts regenerations to
        .route("/api/handler", post(regenerate_meal))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        )
        .with_state(state)
}

const COMPLETION_FAILED: &str = "completion service failed";
const INVALID_REGEN_MEAL: &str = "regenMeal must be 'breakfast', 'lunch', or 'dinner'";

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self { status: StatusCode::BAD_REQUEST, message: message.into() }
    }
}

impl From<PlanError> for ApiError {
    fn from(err: PlanError) -> Self {
        let status = match &err {
            PlanError::Profile(_) | PlanError::Regeneration(_) => StatusCode::BAD_REQUEST,
            PlanError::Completion(_) | PlanError::Parse(_) => StatusCode::BAD_GATEWAY,
        };
        match status {
            StatusCode::BAD_REQUEST => tracing::warn!("⚠️ Rejected request: {}", err),
            _ => tracing::error!("❌ Meal planning failed: {}", err),
        }
        // upstream details stay in the logs
        let message = match err {
            PlanError::Completion(_) => COMPLETION_FAILED.to_string(),
            other => other.to_string(),
        };
        Self { status, message }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::warn!("⚠️ Unreadable request body: {}", rejection.body_text());
        Self::bad_request(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

fn condition_or_default(value: Option<String>) -> String {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()).unwrap_or_else(|| DEFAULT_CONDITION.to_string())
}

pub async fn generate_meal_plan(
    State(state): State<AppState>,
    body: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Json<GenerateResponse>, ApiError> {
    let Json(body) = body?;
    let profile = UserProfile::try_from(&body).map_err(PlanError::from)?;
    let plan_id = Uuid::new_v4();
    tracing::info!(%plan_id, "🎯 Profile: {:?}", profile);

    let generated = state.planner.generate(&profile).instrument(tracing::info_span!("generate", %plan_id)).await?;
    Ok(Json(GenerateResponse {
        plan_id,
        generated_at: Utc::now(),
        plan: MealPlanView(generated.plan),
        raw_meal_plan_text: generated.raw_text,
    }))
}

/// `regenMeal` is checked before the rest of the body is read.
fn requested_meal(body: &Value) -> Result<MealType, ApiError> {
    let meal = match body.get("regenMeal") {
        Some(Value::String(key)) => MealType::from_key(key),
        _ => None,
    };
    meal.ok_or_else(|| {
        tracing::warn!("⚠️ Invalid regenMeal: {:?}", body.get("regenMeal"));
        ApiError::bad_request(INVALID_REGEN_MEAL)
    })
}

#[axum::debug_handler]
pub async fn regenerate_meal(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<RegenerateResponse>, ApiError> {
    let Json(raw) = body?;
    let meal = requested_meal(&raw)?;
    let mut body: RegenerateRequest = serde_json::from_value(raw)
        .map_err(|e| ApiError::bad_request(format!("invalid regenerate request: {}", e)))?;

    let mut slot = |m: MealType| -> Result<MealRecord, ApiError> {
        match body.take_meal(m) {
            Some(input) => Ok(input.into_record(m)),
            None if m == meal => Ok(MealRecord::new(m)),
            None => Err(ApiError::bad_request(format!("{} is required when regenerating {}", m, meal))),
        }
    };
    let meals = DayMeals {
        breakfast: slot(MealType::Breakfast)?,
        lunch: slot(MealType::Lunch)?,
        dinner: slot(MealType::Dinner)?,
    };
    let mut plan = MealPlan { targets: body.targets, meals };
    let original = body.original_meal.take().map(|m| m.into_record(meal));
    let health = condition_or_default(body.health.take());
    let dietary = condition_or_default(body.dietary.take());

    let regenerated = state.planner.regenerate(meal, &plan, &health, &dietary, original.as_ref()).await?;
    plan.meals.replace(regenerated.meal);

    Ok(Json(RegenerateResponse { plan: MealPlanView(plan), regenerated_meal_raw_text: regenerated.raw_text }))
}

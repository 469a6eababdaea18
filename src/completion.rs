use std::time::Duration;

use async_trait::async_trait;
use rand::seq::SliceRandom;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::{error, info};

use crate::models::MealType;

pub const DEMO_KEY: &str = "DEMO_KEY";
const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4";
const DEFAULT_TIMEOUT_SECS: u64 = 120;
const TEMPERATURE: f32 = 0.7;

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("HTTP error: {0}")] Http(String),
    #[error("completion service returned an empty response")] EmptyResponse,
    #[error("Other: {0}")] Other(String),
}

/// The text completion service, seen from the planner: prompt in, free text out.
#[async_trait]
pub trait CompletionGateway: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError>;
}

#[derive(Debug, Clone)]
pub struct CompletionConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

impl CompletionConfig {
    pub fn from_env() -> Self {
        let timeout_secs = std::env::var("COMPLETION_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        Self {
            api_key: std::env::var("OPENAI_API_KEY").unwrap_or_else(|_| DEMO_KEY.into()),
            base_url: std::env::var("OPENAI_API_BASE").unwrap_or_else(|_| DEFAULT_API_BASE.to_string()),
            model: std::env::var("OPENAI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    pub fn is_demo(&self) -> bool {
        self.api_key == DEMO_KEY
    }
}

fn preview(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...[{} chars]", &text[..cut], text.chars().count()),
        None => text.to_string(),
    }
}

/// Chat-completions client for OpenAI and compatible endpoints.
pub struct OpenAiClient {
    client: Client,
    config: CompletionConfig,
}

impl OpenAiClient {
    pub fn new(config: CompletionConfig) -> Result<Self, CompletionError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| CompletionError::Other(e.to_string()))?;
        Ok(Self { client, config })
    }

    async fn perform_api_call(&self, prompt: &str) -> Result<String, CompletionError> {
        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));
        info!("🔗 Making request to: {} (model {})", url, self.config.model);

        let request_body = json!({
            "model": self.config.model,
            "messages": [{ "role": "user", "content": prompt }],
            "temperature": TEMPERATURE,
        });

        let response = self.client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| CompletionError::Http(e.to_string()))?;

        let status = response.status();
        info!("📥 Response status: {}", status);

        let response_text = response.text().await.map_err(|e| CompletionError::Http(e.to_string()))?;
        if !status.is_success() {
            error!("❌ API Error response: {}", preview(&response_text, 500));
            return Err(CompletionError::Http(format!("status={}", status)));
        }

        let parsed: ChatResponse = serde_json::from_str(&response_text)
            .map_err(|e| CompletionError::Other(format!("parse error: {}: {}", e, preview(&response_text, 200))))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .unwrap_or_default();
        if content.is_empty() {
            return Err(CompletionError::EmptyResponse);
        }
        info!("📥 Model response ({} chars): {}", content.chars().count(), preview(&content, 160));
        Ok(content)
    }
}

#[async_trait]
impl CompletionGateway for OpenAiClient {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        if self.config.is_demo() {
            info!("Using demo mode - no completion service call");
            return Ok(demo_response(prompt));
        }
        self.perform_api_call(prompt).await.map_err(|e| {
            error!("❌ Completion failed: {}", e);
            e
        })
    }
}

// --- Response Parsing Helpers ---

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice { message: Message }

#[derive(Debug, Deserialize)]
struct Message { #[serde(default)] content: Option<String> }

// --- Demo mode ---

struct DemoDish {
    name: &'static str,
    calories: u32,
    protein: u32,
    fat: u32,
    carbs: u32,
    ingredients: &'static [&'static str],
    recipe: &'static [&'static str],
}

const DEMO_BREAKFASTS: &[DemoDish] = &[
    DemoDish {
        name: "Greek Yogurt Parfait",
        calories: 450, protein: 30, fat: 12, carbs: 55,
        ingredients: &["200g Greek yogurt", "1/2 cup granola", "1 cup mixed berries", "1 tsp honey"],
        recipe: &["Spoon half the yogurt into a glass.", "Add granola and berries.", "Top with remaining yogurt and honey."],
    },
    DemoDish {
        name: "Spinach Omelette with Toast",
        calories: 480, protein: 32, fat: 20, carbs: 40,
        ingredients: &["3 eggs", "1 cup spinach", "2 slices wholegrain toast"],
        recipe: &["Whisk the eggs.", "Wilt spinach in a pan, pour over eggs and cook until set.", "Serve with toast."],
    },
];

const DEMO_LUNCHES: &[DemoDish] = &[
    DemoDish {
        name: "Chicken Quinoa Bowl",
        calories: 700, protein: 50, fat: 20, carbs: 80,
        ingredients: &["150g chicken breast", "1 cup cooked quinoa", "1 cup roasted vegetables", "1 tbsp olive oil"],
        recipe: &["Grill the chicken.", "Toss vegetables in oil and roast.", "Slice chicken and serve over quinoa with vegetables."],
    },
    DemoDish {
        name: "Lentil and Vegetable Soup",
        calories: 620, protein: 35, fat: 14, carbs: 88,
        ingredients: &["1 cup red lentils", "1 carrot", "1 onion", "500ml vegetable stock"],
        recipe: &["Dice the vegetables.", "Simmer everything in stock for 25 minutes.", "Blend half and stir back in."],
    },
];

const DEMO_DINNERS: &[DemoDish] = &[
    DemoDish {
        name: "Baked Salmon with Sweet Potato",
        calories: 650, protein: 45, fat: 25, carbs: 60,
        ingredients: &["180g salmon fillet", "200g sweet potato", "1 cup broccoli"],
        recipe: &["Bake salmon at 200C for 15 minutes.", "Roast sweet potato wedges.", "Steam broccoli and plate together."],
    },
    DemoDish {
        name: "Tofu Stir Fry",
        calories: 600, protein: 32, fat: 22, carbs: 70,
        ingredients: &["200g firm tofu", "1 cup brown rice", "1 bell pepper", "1 tbsp soy sauce"],
        recipe: &["Press and cube the tofu.", "Stir fry tofu and pepper.", "Add soy sauce and serve over rice."],
    },
];

fn demo_block(meal: MealType) -> String {
    let menu = match meal {
        MealType::Breakfast => DEMO_BREAKFASTS,
        MealType::Lunch => DEMO_LUNCHES,
        MealType::Dinner => DEMO_DINNERS,
    };
    let dish = menu.choose(&mut rand::thread_rng()).unwrap_or(&menu[0]);
    let list = |items: &[&str]| {
        items.iter().enumerate().map(|(i, s)| format!("{}. {}", i + 1, s)).collect::<Vec<_>>().join("\n")
    };
    format!(
        "{}:\nName: {}\nCalories: {}\nProtein: {}g\nFat: {}g\nCarbs: {}g\nIngredients:\n{}\nRecipe:\n{}",
        meal.header(),
        dish.name,
        dish.calories,
        dish.protein,
        dish.fat,
        dish.carbs,
        list(dish.ingredients),
        list(dish.recipe),
    )
}

/// Answers with a block for each meal header the prompt's layout asks for.
fn demo_response(prompt: &str) -> String {
    MealType::ALL
        .into_iter()
        .filter(|meal| {
            let header = format!("{}:", meal.header());
            prompt.lines().any(|l| l.trim() == header)
        })
        .map(demo_block)
        .collect::<Vec<_>>()
        .join("\n\n")
}

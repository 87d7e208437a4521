//! Function handlers: one per deployed function, each taking a gateway event

use clap::ValueEnum;
use serde::Serialize;
use serde_json::{json, Value};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info};

use super::gateway::{GatewayEvent, GatewayResponse};
use crate::error::{ChefError, Result};
use crate::nutrition::{lookup_totals, NutritionService};
use crate::pipeline::{ingredient_list, StageHandlers};
use crate::session::{ProcessRequest, SessionService};

/// Every function a gateway or orchestrator can invoke
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Function {
    CreateSession,
    SessionStatus,
    UpdateProfile,
    Process,
    SessionResult,
    Price,
    Nutrition,
    Combine,
    RecipeStage,
    PriceStage,
    NutritionStage,
}

fn to_json<T: Serialize>(value: &T) -> Result<Value> {
    Ok(serde_json::to_value(value)?)
}

fn string_field(body: &Value, key: &str) -> Option<String> {
    body.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Run `work` unless the event is a preflight, mapping errors to responses
async fn respond<F>(event: &GatewayEvent, work: F) -> GatewayResponse
where
    F: Future<Output = Result<Value>>,
{
    if event.is_preflight() {
        return GatewayResponse::preflight();
    }
    match work.await {
        Ok(body) => GatewayResponse::ok(&body),
        Err(e) => GatewayResponse::error(&e),
    }
}

#[derive(Clone)]
pub struct ApiHandlers {
    sessions: Arc<SessionService>,
    stages: Arc<StageHandlers>,
    nutrition: Arc<NutritionService>,
}

impl ApiHandlers {
    pub fn new(
        sessions: Arc<SessionService>,
        stages: Arc<StageHandlers>,
        nutrition: Arc<NutritionService>,
    ) -> Self {
        Self {
            sessions,
            stages,
            nutrition,
        }
    }

    /// Route one event to the named function
    pub async fn dispatch(&self, function: Function, event: &GatewayEvent) -> GatewayResponse {
        debug!("Dispatching {:?}", function);
        match function {
            Function::CreateSession => self.create_session(event).await,
            Function::SessionStatus => self.session_status(event).await,
            Function::UpdateProfile => self.update_profile(event).await,
            Function::Process => self.process(event).await,
            Function::SessionResult => self.session_result(event).await,
            Function::Price => self.price(event).await,
            Function::Nutrition => self.nutrition(event).await,
            Function::Combine | Function::RecipeStage | Function::PriceStage
            | Function::NutritionStage => self.stage(function, event).await,
        }
    }

    fn session_id(event: &GatewayEvent) -> Result<String> {
        if let Some(id) = event.param("sessionId") {
            return Ok(id.to_string());
        }
        let body = event.body_json()?;
        string_field(&body, "sessionId")
            .ok_or_else(|| ChefError::MissingField("sessionId".to_string()))
    }

    pub async fn create_session(&self, event: &GatewayEvent) -> GatewayResponse {
        respond(event, async move { to_json(&self.sessions.create().await?) }).await
    }

    pub async fn session_status(&self, event: &GatewayEvent) -> GatewayResponse {
        respond(event, async move {
            let session_id = Self::session_id(event)?;
            to_json(&self.sessions.status(&session_id).await?)
        })
        .await
    }

    pub async fn update_profile(&self, event: &GatewayEvent) -> GatewayResponse {
        respond(event, async move {
            let session_id = Self::session_id(event)?;
            let body = event.body_json()?;
            let additional = body.get("additionalInfo").cloned().unwrap_or(Value::Null);
            to_json(&self.sessions.update_profile(&session_id, additional).await?)
        })
        .await
    }

    pub async fn process(&self, event: &GatewayEvent) -> GatewayResponse {
        respond(event, async move {
            let body = event.body_json()?;
            let request = ProcessRequest {
                session_id: string_field(&body, "sessionId"),
                user_profile: body.get("userProfile").filter(|v| !v.is_null()).cloned(),
                profile: body.get("profile").filter(|v| !v.is_null()).cloned(),
            };
            to_json(&self.sessions.process(request).await?)
        })
        .await
    }

    pub async fn session_result(&self, event: &GatewayEvent) -> GatewayResponse {
        respond(event, async move {
            let session_id = Self::session_id(event)?;
            to_json(&self.sessions.result(&session_id).await?)
        })
        .await
    }

    /// Price lookup route; the session is optional here
    pub async fn price(&self, event: &GatewayEvent) -> GatewayResponse {
        respond(event, async move {
            let body = event.body_json()?;
            let ingredients = ingredient_list(body.get("ingredients"));
            if ingredients.is_empty() {
                return Err(ChefError::MissingField("ingredients".to_string()));
            }
            let session_id = string_field(&body, "sessionId");
            info!("Price lookup for {} ingredients", ingredients.len());
            self.stages
                .price_lookup(session_id.as_deref(), &ingredients)
                .await
        })
        .await
    }

    /// Nutrition for free-text ingredient lines
    pub async fn nutrition(&self, event: &GatewayEvent) -> GatewayResponse {
        respond(event, async move {
            let body = event.body_json()?;
            let lines: Vec<String> = body
                .get("ingredients")
                .and_then(Value::as_array)
                .map(|items| {
                    items
                        .iter()
                        .filter_map(Value::as_str)
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default();
            if lines.is_empty() {
                return Err(ChefError::MissingField("ingredients".to_string()));
            }

            let items = self.nutrition.lookup_lines(&lines).await;
            let (totals, total_nutrition) = lookup_totals(&items);
            let mut result = json!({
                "total_nutrition": total_nutrition,
                "ingredient_details": to_json(&items)?,
            });
            if body.get("include_analysis").and_then(Value::as_bool).unwrap_or(false) {
                let user_profile = body.get("user_profile").cloned().unwrap_or(Value::Null);
                result["ai_analysis"] =
                    Value::String(self.nutrition.analysis(&items, &totals, &user_profile).await);
            }
            Ok(result)
        })
        .await
    }

    /// Orchestrated stages, also reachable as functions
    async fn stage(&self, function: Function, event: &GatewayEvent) -> GatewayResponse {
        respond(event, async move {
            let body = event.body_json()?;
            match function {
                Function::RecipeStage => self.stages.recipe(&body).await,
                Function::PriceStage => self.stages.price(&body).await,
                Function::NutritionStage => self.stages.nutrition(&body).await,
                _ => self.stages.combine(&body).await,
            }
        })
        .await
    }
}

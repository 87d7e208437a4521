//! Common test utilities: every handler wired to in-memory collaborators

#![allow(dead_code)]

use ai_chef::abstractions::{
    FetchRequest, MockHttpFetcher, MockModelClient, RecordingWorkflowEngine, StaticSecretStore,
};
use ai_chef::api::{ApiHandlers, GatewayEvent, GatewayResponse};
use ai_chef::config::ChefConfig;
use ai_chef::nutrition::{MemoryNutritionIndex, NutritionFacts, NutritionRecord, NutritionService};
use ai_chef::pipeline::{LocalWorkflowEngine, StageHandlers};
use ai_chef::pricing::ShoppingClient;
use ai_chef::recipe::RecipeGenerator;
use ai_chef::session::SessionService;
use ai_chef::storage::MemoryStore;
use anyhow::anyhow;
use serde_json::{json, Value};
use std::sync::Arc;

pub const SHOPPING_SECRET: &str = "naver-shopping";

/// Shopping API answering with `offers(query)` for every search
pub fn shopping_api<F>(offers: F) -> MockHttpFetcher
where
    F: Fn(&str) -> Value + Send + Sync + 'static,
{
    MockHttpFetcher::new(move |request: &FetchRequest| {
        let query = request
            .query_value("query")
            .ok_or_else(|| anyhow!("missing query"))?;
        Ok(json!({ "items": offers(query) }))
    })
}

/// Shopping API that never finds anything
pub fn empty_shopping_api() -> MockHttpFetcher {
    shopping_api(|_| json!([]))
}

pub fn item(title: &str, price: u64, mall: &str) -> Value {
    json!({
        "title": title,
        "lprice": price.to_string(),
        "mallName": mall,
        "link": format!("https://shop.example/{mall}"),
        "image": "",
        "category1": "식품",
        "productId": format!("{title}-{price}"),
        "brand": "",
    })
}

pub fn nutrition_records() -> Vec<NutritionRecord> {
    let facts = |calories, protein, fat, carbs, fiber, sodium| NutritionFacts {
        calories,
        protein,
        fat,
        carbs,
        fiber,
        sodium,
    };
    vec![
        NutritionRecord::new("두부", "표준식품", facts(80.0, 8.0, 4.5, 2.0, 1.0, 10.0)),
        NutritionRecord::new("양파", "표준식품", facts(40.0, 1.0, 0.1, 9.0, 1.7, 4.0)),
        NutritionRecord::new("마늘", "표준식품", facts(130.0, 7.0, 0.2, 28.0, 2.0, 5.0)),
        NutritionRecord::new("올리브유", "가공식품", facts(880.0, 0.0, 100.0, 0.0, 0.0, 0.0)),
    ]
}

pub struct TestApp {
    pub store: Arc<MemoryStore>,
    pub model: Arc<MockModelClient>,
    pub fetcher: Arc<MockHttpFetcher>,
    pub workflow: Arc<RecordingWorkflowEngine>,
    pub stages: Arc<StageHandlers>,
    pub engine: LocalWorkflowEngine,
    pub handlers: ApiHandlers,
}

pub struct TestAppBuilder {
    fetcher: MockHttpFetcher,
    with_secret: bool,
    workflow: RecordingWorkflowEngine,
    config: ChefConfig,
}

impl TestAppBuilder {
    pub fn new() -> Self {
        let mut config = ChefConfig::default();
        config.shopping.secret_name = Some(SHOPPING_SECRET.to_string());
        Self {
            fetcher: empty_shopping_api(),
            with_secret: true,
            workflow: RecordingWorkflowEngine::new(),
            config,
        }
    }

    pub fn with_fetcher(mut self, fetcher: MockHttpFetcher) -> Self {
        self.fetcher = fetcher;
        self
    }

    pub fn without_credentials(mut self) -> Self {
        self.with_secret = false;
        self
    }

    pub fn with_workflow(mut self, workflow: RecordingWorkflowEngine) -> Self {
        self.workflow = workflow;
        self
    }

    pub fn build(self) -> TestApp {
        let store = Arc::new(MemoryStore::new());
        let model = Arc::new(MockModelClient::new());
        let fetcher = Arc::new(self.fetcher);
        let workflow = Arc::new(self.workflow);
        let mut secrets = StaticSecretStore::new();
        if self.with_secret {
            secrets = secrets.with_secret(
                SHOPPING_SECRET,
                json!({"client_id": "test-id", "client_secret": "test-secret"}),
            );
        }

        let index = Arc::new(MemoryNutritionIndex::with_records(nutrition_records()));
        let nutrition = Arc::new(NutritionService::new(
            index.clone(),
            model.clone(),
            self.config.nutrition.clone(),
            self.config.model.clone(),
        ));
        let stages = Arc::new(StageHandlers::new(
            store.clone(),
            RecipeGenerator::new(model.clone(), self.config.model.clone())
                .with_reference_index(index),
            ShoppingClient::new(fetcher.clone(), Arc::new(secrets), self.config.shopping.clone()),
            nutrition.clone(),
            self.config.session.clone(),
            self.config.shopping.clone(),
        ));
        let sessions = Arc::new(SessionService::new(
            store.clone(),
            workflow.clone(),
            self.config.session.clone(),
        ));
        TestApp {
            engine: LocalWorkflowEngine::new(stages.clone()),
            handlers: ApiHandlers::new(sessions, stages.clone(), nutrition),
            store,
            model,
            fetcher,
            workflow,
            stages,
        }
    }
}

impl TestApp {
    /// Create a session through the handler and return its id
    pub async fn create_session(&self) -> String {
        let response = self
            .handlers
            .create_session(&GatewayEvent::http("POST", "/sessions"))
            .await;
        assert_eq!(response.status_code, 200);
        response.body_json()["sessionId"]
            .as_str()
            .expect("sessionId in response")
            .to_string()
    }
}

pub fn post(path: &str, body: Value) -> GatewayEvent {
    GatewayEvent::http("POST", path).with_body(Value::String(body.to_string()))
}

pub fn get_session(path: &str, session_id: &str) -> GatewayEvent {
    GatewayEvent::http("GET", path).with_path_param("sessionId", session_id)
}

pub fn body(response: &GatewayResponse) -> Value {
    response.body_json()
}

/// Questionnaire submission for `target`
pub fn questionnaire(target: &str) -> Value {
    json!({
        "target": target,
        "responses": {"100": "30000", "101": "2", "1": "없음", "2": "새우"}
    })
}

//! End-to-end pipeline runs: process request, stage sequence, result polling

mod common;

use ai_chef::storage::{DocumentStore, SessionStatus};
use common::*;
use serde_json::{json, Value};

const RECIPE_REPLY: &str = r#"다음은 요청하신 레시피입니다.
{
  "recipeName": "두부 양파 볶음",
  "description": "간단한 저탄수 반찬",
  "cookingTime": 15,
  "difficulty": "easy",
  "servings": 2,
  "ingredients": [
    {"name": "두부", "amount": 300, "unit": "g"},
    {"name": "양파", "amount": 1, "unit": "개"},
    {"name": "올리브유", "amount": 1, "unit": "큰술"}
  ],
  "instructions": ["두부를 썬다", "양파와 함께 볶는다"]
}
감사합니다."#;

async fn start(app: &TestApp, target: &str) -> (String, Value) {
    let session_id = app.create_session().await;
    let response = app
        .handlers
        .process(&post(
            "/sessions/process",
            json!({"sessionId": session_id, "userProfile": questionnaire(target)}),
        ))
        .await;
    assert_eq!(response.status_code, 200);
    let input = app.workflow.get_executions().await.remove(0);
    (session_id, input)
}

async fn poll_result(app: &TestApp, session_id: &str) -> (u16, Value) {
    let response = app
        .handlers
        .session_result(&get_session("/sessions/{id}/result", session_id))
        .await;
    (response.status_code, body(&response))
}

#[tokio::test]
async fn test_full_pipeline_produces_combined_result() {
    let fetcher = shopping_api(|query| match query {
        "두부" => json!([item("국산 두부 300g", 1800, "마트A"), item("두부 2입", 2500, "마트B")]),
        "양파" => json!([item("양파 1.5kg", 3500, "마트A")]),
        _ => json!([]),
    });
    let app = TestAppBuilder::new().with_fetcher(fetcher).build();
    app.model.add_response(RECIPE_REPLY).await;

    let (session_id, input) = start(&app, "keto").await;

    let (status, processing) = poll_result(&app, &session_id).await;
    assert_eq!(status, 200);
    assert_eq!(processing["status"], "processing");
    assert_eq!(processing["progress"]["phase"], "workflow_starting");

    app.engine.run(input).await.unwrap();

    let (status, completed) = poll_result(&app, &session_id).await;
    assert_eq!(status, 200);
    assert_eq!(completed["status"], "completed");
    assert!(completed["processingTime"].is_i64());

    let data = &completed["result"]["data"];
    assert_eq!(data["recipe"]["name"], "두부 양파 볶음");
    assert_eq!(data["recipe"]["difficulty"], "easy");
    assert_eq!(data["totalEstimatedCost"], 5300);
    assert_eq!(data["shoppingInfo"]["totalItems"], 2);
    assert_eq!(data["summary"]["ingredientsFound"], 2);
    assert_eq!(data["summary"]["totalIngredients"], 3);
    assert_eq!(data["summary"]["nutritionAvailable"], true);

    // 두부 300 g + 양파 100 g + 올리브유 15 g
    assert_eq!(data["nutrition"]["total"]["calories"], 412.0);
    assert_eq!(data["nutrition"]["targetCompliance"]["target"], "keto");
    assert_eq!(completed["result"]["metadata"]["version"], "2.0");

    let session = app.store.get_session(&session_id).await.unwrap().unwrap();
    assert_eq!(session.progress, 100);
    assert_eq!(session.attribute("recipeStatus"), Some(&json!("completed")));
    assert_eq!(session.attribute("nutritionStatus"), Some(&json!("completed")));
    assert!(session.attribute("priceData").is_some());

    let recipe_record = app
        .store
        .get_result(&format!("{session_id}_recipe"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(recipe_record.summary["recipeName"], "두부 양파 볶음");
    assert!(recipe_record.data["nutrition"]["total"].is_object());
}

#[tokio::test]
async fn test_model_failure_falls_back_to_default_recipe() {
    let app = TestAppBuilder::new().build();
    app.model.add_error("model endpoint timed out").await;

    let (session_id, input) = start(&app, "diabetes").await;
    app.engine.run(input).await.unwrap();

    let (status, completed) = poll_result(&app, &session_id).await;
    assert_eq!(status, 200);
    assert_eq!(completed["result"]["data"]["recipe"]["name"], "기본 diabetes 레시피");
    assert_eq!(completed["result"]["data"]["totalEstimatedCost"], 0);

    let record = app
        .store
        .get_result(&format!("{session_id}_recipe"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.metadata["source"], "fallback");
}

#[tokio::test]
async fn test_missing_credentials_fail_the_session() {
    let app = TestAppBuilder::new().without_credentials().build();
    app.model.add_response(RECIPE_REPLY).await;

    let (session_id, input) = start(&app, "diet").await;
    assert!(app.engine.run(input).await.is_err());

    let session = app.store.get_session(&session_id).await.unwrap().unwrap();
    assert_eq!(session.status, SessionStatus::Failed);
    assert_eq!(session.phase.as_deref(), Some("price_lookup_failed"));
    assert!(app.fetcher.get_requests().await.is_empty());

    let (status, body) = poll_result(&app, &session_id).await;
    assert_eq!(status, 500);
    assert_eq!(body["error"], "PROCESSING_FAILED");
}

#[tokio::test]
async fn test_shopping_outage_still_completes() {
    let app = TestAppBuilder::new()
        .with_fetcher(ai_chef::abstractions::MockHttpFetcher::failing("connection refused"))
        .build();
    app.model.add_response(RECIPE_REPLY).await;

    let (session_id, input) = start(&app, "general").await;
    app.engine.run(input).await.unwrap();

    let (status, completed) = poll_result(&app, &session_id).await;
    assert_eq!(status, 200);
    let data = &completed["result"]["data"];
    assert_eq!(data["summary"]["ingredientsFound"], 0);
    assert_eq!(data["summary"]["successRate"], 0.0);
    assert_eq!(data["shoppingInfo"]["items"], json!([]));
}

#[tokio::test]
async fn test_result_falls_back_to_stage_records() {
    let app = TestAppBuilder::new().build();
    app.model.add_response(RECIPE_REPLY).await;
    let (session_id, input) = start(&app, "keto").await;
    app.engine.run(input).await.unwrap();

    app.store
        .update_session(
            &session_id,
            &ai_chef::storage::SessionUpdate::new().set("finalResult", Value::Null),
        )
        .await
        .unwrap();

    let (status, body) = poll_result(&app, &session_id).await;
    assert_eq!(status, 200);
    assert_eq!(body["result"]["recipe"]["recipeName"], "두부 양파 볶음");
    assert!(body["result"]["price"].is_object());
}

#[tokio::test]
async fn test_fridge_prompt_quotes_indexed_nutrition() {
    let app = TestAppBuilder::new().build();
    app.model.add_response(RECIPE_REPLY).await;

    let session_id = app.create_session().await;
    let profile = json!({
        "target": "fridge",
        "responses": {"100": "10000", "101": "2", "6": "두부,양파,용과"}
    });
    let response = app
        .handlers
        .process(&post(
            "/sessions/process",
            json!({"sessionId": session_id, "userProfile": profile}),
        ))
        .await;
    assert_eq!(response.status_code, 200);
    let input = app.workflow.get_executions().await.remove(0);
    app.engine.run(input).await.unwrap();

    let calls = app.model.get_calls().await;
    let prompt = &calls[0].prompt;
    assert!(prompt.contains("- 두부: 칼로리 80kcal"));
    assert!(prompt.contains("- 양파: 칼로리 40kcal"));
    assert!(!prompt.contains("- 용과:"));
}

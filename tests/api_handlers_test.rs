//! Gateway handler behavior against in-memory collaborators

mod common;

use ai_chef::abstractions::RecordingWorkflowEngine;
use ai_chef::api::{Function, GatewayEvent};
use ai_chef::storage::{DocumentStore, SessionStatus, SessionUpdate};
use common::*;
use serde_json::json;

#[tokio::test]
async fn test_price_scenario_with_no_results() {
    let app = TestAppBuilder::new().build();

    let response = app
        .handlers
        .price(&post("/price", json!({"ingredients": ["새우", "양파", "마늘"]})))
        .await;

    assert_eq!(response.status_code, 200);
    let body = body(&response);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["summary"]["totalIngredients"], 3);
    assert_eq!(body["data"]["summary"]["foundIngredients"], 0);
    assert_eq!(body["data"]["summary"]["successRate"], 0.0);
    assert_eq!(body["data"]["recommendations"]["totalEstimatedCost"], 0);
    assert_eq!(
        body["data"]["recommendations"]["optimalVendors"],
        json!([])
    );
    assert_eq!(app.fetcher.get_requests().await.len(), 3);
}

#[tokio::test]
async fn test_price_lookup_ranks_and_groups_by_vendor() {
    let fetcher = shopping_api(|query| match query {
        "양파" => json!([
            item("<b>양파</b> 3kg", 7900, "마트B"),
            item("양파 1kg", 3200, "마트A"),
            item("양파 품절", 0, "마트C"),
        ]),
        "마늘" => json!([item("깐마늘 500g", 6500, "마트A")]),
        _ => json!([]),
    });
    let app = TestAppBuilder::new().with_fetcher(fetcher).build();

    let response = app
        .handlers
        .price(&post("/price", json!({"ingredients": ["양파", {"name": "마늘"}, "새우"]})))
        .await;
    assert_eq!(response.status_code, 200);
    let data = body(&response)["data"].clone();

    let onions = data["ingredients"]["양파"].as_array().unwrap();
    assert_eq!(onions.len(), 2);
    assert_eq!(onions[0]["price"], 3200);
    assert_eq!(onions[1]["name"], "양파 3kg");

    assert_eq!(data["summary"]["foundIngredients"], 2);
    assert_eq!(data["recommendations"]["totalEstimatedCost"], 9700);
    let vendors = data["recommendations"]["optimalVendors"].as_array().unwrap();
    assert_eq!(vendors.len(), 1);
    assert_eq!(vendors[0]["vendor"], "마트A");
    assert_eq!(vendors[0]["itemCount"], 2);
}

#[tokio::test]
async fn test_repeated_ingredient_is_priced_once() {
    let fetcher = shopping_api(|query| match query {
        "소금" => json!([item("천일염 1kg", 3000, "마트A")]),
        _ => json!([]),
    });
    let app = TestAppBuilder::new().with_fetcher(fetcher).build();

    let response = app
        .handlers
        .price(&post("/price", json!({"ingredients": ["소금", "소금", {"name": "소금"}]})))
        .await;

    assert_eq!(response.status_code, 200);
    let data = body(&response)["data"].clone();
    assert_eq!(data["summary"]["totalIngredients"], 1);
    assert_eq!(data["ingredients"].as_object().unwrap().len(), 1);
    assert_eq!(data["recommendations"]["totalEstimatedCost"], 3000);
    assert_eq!(app.fetcher.get_requests().await.len(), 1);
}

#[tokio::test]
async fn test_price_without_ingredients_is_bad_request() {
    let app = TestAppBuilder::new().build();
    let response = app.handlers.price(&post("/price", json!({}))).await;
    assert_eq!(response.status_code, 400);
    assert_eq!(body(&response)["error"], "MISSING_FIELD");
    assert!(app.fetcher.get_requests().await.is_empty());
}

#[tokio::test]
async fn test_price_without_credentials_is_upstream_error() {
    let app = TestAppBuilder::new().without_credentials().build();
    let response = app
        .handlers
        .price(&post("/price", json!({"ingredients": ["양파"]})))
        .await;
    assert_eq!(response.status_code, 502);
    assert_eq!(body(&response)["error"], "CREDENTIALS_UNAVAILABLE");
    assert!(app.fetcher.get_requests().await.is_empty());
}

#[tokio::test]
async fn test_process_without_session_id_touches_nothing() {
    let app = TestAppBuilder::new().build();

    let response = app
        .handlers
        .process(&post("/sessions/process", json!({"userProfile": questionnaire("keto")})))
        .await;

    assert_eq!(response.status_code, 400);
    assert_eq!(body(&response)["error"], "MISSING_FIELD");
    assert_eq!(app.store.session_count().await, 0);
    assert!(app.workflow.get_executions().await.is_empty());
    assert!(app.model.get_calls().await.is_empty());
    assert!(app.fetcher.get_requests().await.is_empty());
}

#[tokio::test]
async fn test_process_starts_one_execution() {
    let app = TestAppBuilder::new().build();
    let session_id = app.create_session().await;

    let response = app
        .handlers
        .process(&post(
            "/sessions/process",
            json!({"sessionId": session_id, "userProfile": questionnaire("keto")}),
        ))
        .await;

    assert_eq!(response.status_code, 200);
    let body = body(&response);
    assert_eq!(body["success"], true);
    assert_eq!(body["status"], "processing");
    assert_eq!(body["estimatedTime"], 25);

    let executions = app.workflow.get_executions().await;
    assert_eq!(executions.len(), 1);
    assert_eq!(executions[0]["sessionId"], session_id.as_str());
    assert_eq!(executions[0]["profile"]["target"], "keto");
    assert_eq!(executions[0]["profile"]["budget"], 30000);

    let session = app.store.get_session(&session_id).await.unwrap().unwrap();
    assert_eq!(session.status, SessionStatus::Processing);
    assert_eq!(session.execution_id.as_deref(), Some("recorded-1"));
}

#[tokio::test]
async fn test_process_rejects_incomplete_profile() {
    let app = TestAppBuilder::new().build();
    let session_id = app.create_session().await;

    let response = app
        .handlers
        .process(&post(
            "/sessions/process",
            json!({"sessionId": session_id, "userProfile": {"target": "diet", "responses": {}}}),
        ))
        .await;

    assert_eq!(response.status_code, 400);
    let body = body(&response);
    assert_eq!(body["error"], "INVALID_PROFILE");
    assert_eq!(body["details"]["missingFields"], json!(["responses.100", "responses.101"]));
    assert!(app.workflow.get_executions().await.is_empty());
}

#[tokio::test]
async fn test_process_twice_conflicts() {
    let app = TestAppBuilder::new().build();
    let session_id = app.create_session().await;
    let event = post(
        "/sessions/process",
        json!({"sessionId": session_id, "userProfile": questionnaire("diet")}),
    );

    assert_eq!(app.handlers.process(&event).await.status_code, 200);
    let second = app.handlers.process(&event).await;
    assert_eq!(second.status_code, 409);
    assert_eq!(body(&second)["error"], "ALREADY_PROCESSING");
}

#[tokio::test]
async fn test_workflow_start_failure_marks_session_failed() {
    let app = TestAppBuilder::new()
        .with_workflow(RecordingWorkflowEngine::failing("state machine unavailable"))
        .build();
    let session_id = app.create_session().await;

    let response = app
        .handlers
        .process(&post(
            "/sessions/process",
            json!({"sessionId": session_id, "userProfile": questionnaire("fridge")}),
        ))
        .await;

    assert_eq!(response.status_code, 500);
    let session = app.store.get_session(&session_id).await.unwrap().unwrap();
    assert_eq!(session.status, SessionStatus::Failed);
}

#[tokio::test]
async fn test_status_and_unknown_session() {
    let app = TestAppBuilder::new().build();
    let session_id = app.create_session().await;

    let status = app
        .handlers
        .session_status(&get_session("/sessions/{id}/status", &session_id))
        .await;
    assert_eq!(status.status_code, 200);
    assert_eq!(body(&status)["status"], "idle");

    let missing = app
        .handlers
        .session_status(&get_session("/sessions/{id}/status", "sess_unknown"))
        .await;
    assert_eq!(missing.status_code, 404);
    assert_eq!(body(&missing)["error"], "SESSION_NOT_FOUND");

    let no_id = app
        .handlers
        .session_status(&GatewayEvent::http("GET", "/sessions/status"))
        .await;
    assert_eq!(no_id.status_code, 400);
}

#[tokio::test]
async fn test_update_profile_merges_additional_info() {
    let app = TestAppBuilder::new().build();
    let session_id = app.create_session().await;
    app.store
        .update_session(
            &session_id,
            &SessionUpdate::new().set("profile", json!({"target": "diabetes"})),
        )
        .await
        .unwrap();

    let event = GatewayEvent::http("PUT", "/sessions/{id}/profile")
        .with_path_param("sessionId", &session_id)
        .with_body(json!({"additionalInfo": {"mealTime": "dinner"}}));
    let response = app.handlers.update_profile(&event).await;

    assert_eq!(response.status_code, 200);
    let body = body(&response);
    assert_eq!(body["phase"], "additional_info_collected");
    assert_eq!(body["profile"]["target"], "diabetes");
    assert_eq!(body["profile"]["additionalInfo"]["mealTime"], "dinner");
    assert_eq!(body["profile"]["hasAdditionalQuestions"], false);
}

#[tokio::test]
async fn test_result_of_idle_session_is_invalid_status() {
    let app = TestAppBuilder::new().build();
    let session_id = app.create_session().await;
    let response = app
        .handlers
        .session_result(&get_session("/sessions/{id}/result", &session_id))
        .await;
    assert_eq!(response.status_code, 400);
    assert_eq!(body(&response)["error"], "INVALID_STATUS");
}

#[tokio::test]
async fn test_nutrition_lookup() {
    let app = TestAppBuilder::new().build();
    app.model.add_response("균형 잡힌 구성입니다.").await;

    let response = app
        .handlers
        .nutrition(&post(
            "/nutrition",
            json!({"ingredients": ["두부 200g", "양파 1개", "용과 1개"], "include_analysis": true}),
        ))
        .await;

    assert_eq!(response.status_code, 200);
    let body = body(&response);
    assert_eq!(body["total_nutrition"]["total_calories"], 200.0);
    let details = body["ingredient_details"].as_array().unwrap();
    assert_eq!(details.len(), 3);
    assert!(details[2]["error"].is_string());
    assert_eq!(body["ai_analysis"], "균형 잡힌 구성입니다.");
}

#[tokio::test]
async fn test_nutrition_lookup_requires_ingredients() {
    let app = TestAppBuilder::new().build();
    let response = app
        .handlers
        .nutrition(&post("/nutrition", json!({"ingredients": []})))
        .await;
    assert_eq!(response.status_code, 400);
}

#[tokio::test]
async fn test_preflight_on_every_function() {
    let app = TestAppBuilder::new().build();
    let event = GatewayEvent::http("OPTIONS", "/sessions/process");
    for function in [Function::CreateSession, Function::Process, Function::Price, Function::Combine] {
        let response = app.handlers.dispatch(function, &event).await;
        assert_eq!(response.status_code, 200);
        assert!(response.body.is_empty());
        assert_eq!(response.headers["Access-Control-Allow-Origin"], "*");
    }
    assert_eq!(app.store.session_count().await, 0);
}

#[tokio::test]
async fn test_combine_accepts_direct_orchestrator_event() {
    let app = TestAppBuilder::new().build();
    let session_id = app.create_session().await;

    let event = GatewayEvent::from_value(json!({
        "sessionId": session_id,
        "recipeResult": {"recipe": "{\"recipe\": {\"recipeName\": \"두부조림\", \"servings\": 2}}"},
        "pricingResult": {"success": true, "data": {
            "summary": {"totalIngredients": 1, "foundIngredients": 1, "successRate": 1.0},
            "ingredients": {"두부": [{"name": "두부 300g", "price": 1500, "vendor": "마트A"}]},
            "recommendations": {"totalEstimatedCost": 1500, "optimalVendors": []}
        }}
    }));
    let response = app.handlers.dispatch(Function::Combine, &event).await;

    assert_eq!(response.status_code, 200);
    let body = body(&response);
    assert_eq!(body["data"]["recipe"]["name"], "두부조림");
    assert_eq!(body["data"]["totalEstimatedCost"], 1500);
    assert_eq!(body["data"]["shoppingInfo"]["totalItems"], 1);

    let session = app.store.get_session(&session_id).await.unwrap().unwrap();
    assert_eq!(session.status, SessionStatus::Completed);
}

//! Session lifecycle operations behind the session routes

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::profile::{missing_questionnaire_fields, Profile};
use super::tracker::StatusTracker;
use crate::abstractions::WorkflowEngine;
use crate::config::SessionConfig;
use crate::error::{ChefError, ErrorCode, Result};
use crate::storage::{
    DocumentStore, ResultType, SessionRecord, SessionStatus, SessionUpdate,
};

pub const PHASE_WORKFLOW_STARTING: &str = "workflow_starting";
pub const PHASE_ADDITIONAL_INFO: &str = "additional_info_collected";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedSession {
    pub session_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatusView {
    pub session_id: String,
    pub status: SessionStatus,
    pub phase: Option<String>,
    pub progress: u8,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub last_activity: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdated {
    pub session_id: String,
    pub status: SessionStatus,
    pub phase: &'static str,
    pub profile: Value,
    pub updated_at: DateTime<Utc>,
}

/// Body of a processing request
#[derive(Debug, Clone, Default)]
pub struct ProcessRequest {
    pub session_id: Option<String>,
    /// Questionnaire submission
    pub user_profile: Option<Value>,
    /// Already normalized profile
    pub profile: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessStarted {
    pub success: bool,
    pub execution_id: String,
    pub estimated_time: u32,
    pub status: SessionStatus,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressInfo {
    pub percentage: u8,
    pub phase: String,
    pub message: &'static str,
}

/// What the result route answers for a session
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResultView {
    #[serde(rename_all = "camelCase")]
    Completed {
        success: bool,
        status: SessionStatus,
        session_id: String,
        result: Value,
        completed_at: Option<DateTime<Utc>>,
        processing_time: Option<i64>,
    },
    #[serde(rename_all = "camelCase")]
    Processing {
        success: bool,
        status: SessionStatus,
        session_id: String,
        progress: ProgressInfo,
        started_at: DateTime<Utc>,
        updated_at: Option<DateTime<Utc>>,
    },
}

/// User-facing message for a pipeline phase
pub fn phase_message(phase: &str) -> &'static str {
    match phase {
        "workflow_starting" => "워크플로우를 시작하고 있습니다...",
        "recipe_generation" => "레시피를 생성하고 있습니다...",
        "recipe_completed" => "레시피 생성이 완료되었습니다.",
        "price_lookup" => "재료 가격을 조회하고 있습니다...",
        "price_completed" => "가격 조회가 완료되었습니다.",
        "nutrition_calculation" => "영양 정보를 계산하고 있습니다...",
        "nutrition_completed" => "영양 정보 계산이 완료되었습니다.",
        "image_generation" => "레시피 이미지를 생성하고 있습니다...",
        "image_completed" => "이미지 생성이 완료되었습니다.",
        "combining_results" => "결과를 합성하고 있습니다...",
        "all_completed" | "finished" => "모든 처리가 완료되었습니다.",
        _ => "처리 중입니다...",
    }
}

/// Session operations over the document store and workflow engine
pub struct SessionService {
    store: Arc<dyn DocumentStore>,
    workflow: Arc<dyn WorkflowEngine>,
    tracker: StatusTracker,
    config: SessionConfig,
}

impl SessionService {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        workflow: Arc<dyn WorkflowEngine>,
        config: SessionConfig,
    ) -> Self {
        let tracker = StatusTracker::new(store.clone(), config.error_max_len);
        Self {
            store,
            workflow,
            tracker,
            config,
        }
    }

    async fn load(&self, session_id: &str) -> Result<SessionRecord> {
        self.store
            .get_session(session_id)
            .await?
            .ok_or_else(|| ChefError::session_not_found(session_id))
    }

    pub async fn create(&self) -> Result<CreatedSession> {
        let session_id = format!("sess_{}", Uuid::new_v4());
        let record = SessionRecord::new(
            &session_id,
            Utc::now(),
            self.config.ttl_chrono(),
            self.config.max_retries,
        );
        self.store.put_session(&record).await?;
        info!("Created session {}", session_id);
        Ok(CreatedSession {
            session_id,
            created_at: record.created_at,
            expires_at: record.expires_at,
        })
    }

    pub async fn status(&self, session_id: &str) -> Result<SessionStatusView> {
        let record = self.load(session_id).await?;
        Ok(SessionStatusView {
            session_id: record.session_id,
            status: record.status,
            phase: record.phase,
            progress: record.progress,
            created_at: record.created_at,
            expires_at: record.expires_at,
            last_activity: record.last_activity,
            updated_at: record.updated_at,
            error: record.error,
        })
    }

    /// Merge follow-up answers into the stored profile
    pub async fn update_profile(
        &self,
        session_id: &str,
        additional_info: Value,
    ) -> Result<ProfileUpdated> {
        let record = self.load(session_id).await?;
        let additional = match additional_info {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                return Err(ChefError::validation(format!(
                    "additionalInfo must be an object, got {other}"
                )))
            }
        };

        let mut profile = match record.profile {
            Some(Value::Object(map)) => map,
            _ => Map::new(),
        };
        let has_more = additional
            .get("hasAdditionalQuestions")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let mut merged_info = match profile.remove("additionalInfo") {
            Some(Value::Object(map)) => map,
            _ => Map::new(),
        };
        merged_info.extend(additional);
        profile.insert("hasAdditionalQuestions".into(), Value::Bool(has_more));
        profile.insert("additionalInfo".into(), Value::Object(merged_info));
        let profile = Value::Object(profile);

        let now = Utc::now();
        let updated = self
            .store
            .update_session(
                session_id,
                &SessionUpdate::new()
                    .set("profile", &profile)
                    .set("phase", PHASE_ADDITIONAL_INFO)
                    .set("updatedAt", now)
                    .set("lastActivity", now),
            )
            .await?;
        info!("Updated profile for session {}", session_id);

        Ok(ProfileUpdated {
            session_id: session_id.to_string(),
            status: updated.status,
            phase: PHASE_ADDITIONAL_INFO,
            profile,
            updated_at: now,
        })
    }

    /// Validate the profile and start one pipeline execution
    pub async fn process(&self, request: ProcessRequest) -> Result<ProcessStarted> {
        let session_id = request
            .session_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ChefError::MissingField("sessionId".to_string()))?;
        let session = self.load(&session_id).await?;

        let (stored_profile, profile) = match (request.user_profile, request.profile) {
            (Some(raw), _) => {
                let missing = missing_questionnaire_fields(&raw);
                if !missing.is_empty() {
                    return Err(ChefError::validation_with_details(
                        ErrorCode::INVALID_PROFILE,
                        "필수 프로필 정보가 누락되었습니다.",
                        json!({ "missingFields": missing }),
                    ));
                }
                let profile = Profile::from_questionnaire(&raw);
                (raw, profile)
            }
            (None, Some(normalized)) if normalized.get("target").is_some() => {
                let profile = Profile::from_value(&normalized);
                (normalized, profile)
            }
            (None, _) => {
                return Err(ChefError::validation_with_details(
                    ErrorCode::INVALID_PROFILE,
                    "사용자 프로필이 필요합니다.",
                    json!({ "missingFields": ["userProfile"] }),
                ))
            }
        };

        if session.status == SessionStatus::Processing {
            return Err(ChefError::conflict(
                ErrorCode::ALREADY_PROCESSING,
                "이미 처리 중인 세션입니다.",
            ));
        }

        let now = Utc::now();
        self.store
            .update_session(
                &session_id,
                &SessionUpdate::new()
                    .set("status", SessionStatus::Processing)
                    .set("profile", &stored_profile)
                    .set("phase", PHASE_WORKFLOW_STARTING)
                    .set("progress", 5)
                    .set("error", Value::Null)
                    .set("updatedAt", now)
                    .set("lastActivity", now),
            )
            .await?;

        let input = json!({ "sessionId": session_id, "profile": profile });
        let execution_id = match self.workflow.start_execution(input).await {
            Ok(id) => id,
            Err(e) => {
                error!("Failed to start workflow for session {}: {}", session_id, e);
                self.tracker
                    .update(
                        &session_id,
                        SessionStatus::Failed,
                        "workflow_start_failed",
                        5,
                        Some(&e.to_string()),
                    )
                    .await;
                return Err(ChefError::Workflow(e.to_string()));
            }
        };

        self.store
            .update_session(
                &session_id,
                &SessionUpdate::new()
                    .set("executionId", &execution_id)
                    .set("startedAt", Utc::now()),
            )
            .await?;
        info!(
            "Started execution {} for session {} ({})",
            execution_id, session_id, profile.target
        );

        Ok(ProcessStarted {
            success: true,
            execution_id,
            estimated_time: profile.target.estimated_seconds(),
            status: SessionStatus::Processing,
            message: "레시피 생성이 시작되었습니다.".to_string(),
        })
    }

    pub async fn result(&self, session_id: &str) -> Result<ResultView> {
        let session = self.load(session_id).await?;
        match session.status {
            SessionStatus::Completed => {
                let result = match session.final_result.clone() {
                    Some(result) => result,
                    None => self.assemble_result_records(session_id).await?.ok_or_else(|| {
                        ChefError::NotFound {
                            code: ErrorCode::RESULT_NOT_FOUND,
                            message: "결과를 찾을 수 없습니다.".to_string(),
                        }
                    })?,
                };
                let completed_at = session.completed_at.or(session.updated_at);
                let processing_time =
                    completed_at.map(|end| (end - session.created_at).num_seconds());
                Ok(ResultView::Completed {
                    success: true,
                    status: SessionStatus::Completed,
                    session_id: session.session_id,
                    result,
                    completed_at,
                    processing_time,
                })
            }
            SessionStatus::Processing => {
                let phase = session.phase.unwrap_or_else(|| "unknown".to_string());
                Ok(ResultView::Processing {
                    success: true,
                    status: SessionStatus::Processing,
                    session_id: session.session_id,
                    progress: ProgressInfo {
                        percentage: session.progress,
                        message: phase_message(&phase),
                        phase,
                    },
                    started_at: session.started_at.unwrap_or(session.created_at),
                    updated_at: session.updated_at,
                })
            }
            SessionStatus::Failed => Err(ChefError::ProcessingFailed(
                session
                    .error
                    .unwrap_or_else(|| "처리 중 오류가 발생했습니다.".to_string()),
            )),
            SessionStatus::Idle => Err(ChefError::validation_with_details(
                ErrorCode::INVALID_STATUS,
                format!("잘못된 세션 상태: {}", session.status),
                json!({ "status": session.status }),
            )),
        }
    }

    /// Collect per-stage result records into one object
    async fn assemble_result_records(&self, session_id: &str) -> Result<Option<Value>> {
        let mut result = Map::new();
        for result_type in [ResultType::Recipe, ResultType::Price, ResultType::Image] {
            let record = match self
                .store
                .get_result(&result_type.result_id(session_id))
                .await
            {
                Ok(Some(record)) => record,
                Ok(None) => continue,
                Err(e) => {
                    warn!(
                        "Failed to read {} result for session {}: {}",
                        result_type.as_str(),
                        session_id,
                        e
                    );
                    continue;
                }
            };
            let value = match result_type {
                ResultType::Recipe => record.data.get("recipe").cloned().unwrap_or(record.data),
                ResultType::Price => record.data,
                ResultType::Image => json!({
                    "imageUrl": record.data.get("imageUrl"),
                    "status": record.data.get("status"),
                    "createdAt": record.created_at,
                }),
            };
            result.insert(result_type.as_str().to_string(), value);
        }
        Ok((!result.is_empty()).then_some(Value::Object(result)))
    }
}

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{
    AppState,
    error::ApiError,
    guard::Session,
    hcen::{ChatRequest, ChatTurn},
    models::{
        Conversation, ConversationDetail, ConversationFilter, ConversationQuery,
        ConversationSummary, CreateConversationRequest, MessageRole, SendMessageRequest,
        SendMessageResponse,
    },
    validation::{Validator, clean_ci, non_empty},
};

fn role_name(role: MessageRole) -> &'static str {
    match role {
        MessageRole::User => "user",
        MessageRole::Assistant => "assistant",
    }
}

/// Loads a conversation the caller owns. 404 when missing, 403 when it belongs
/// to another health worker.
async fn owned_conversation(
    state: &AppState,
    health_worker_id: Uuid,
    id: Uuid,
) -> Result<Conversation, ApiError> {
    let conversation = state
        .repo
        .find_conversation(id)
        .await?
        .ok_or_else(|| ApiError::not_found("conversation not found"))?;
    if conversation.health_worker_id != health_worker_id {
        return Err(ApiError::forbidden("the conversation belongs to another health worker"));
    }
    Ok(conversation)
}

/// The requested conversation, else the latest one with this patient, else a new one.
async fn get_or_create(
    state: &AppState,
    health_worker_id: Uuid,
    health_user_ci: &str,
    conversation_id: Option<Uuid>,
) -> Result<Conversation, ApiError> {
    if let Some(id) = conversation_id {
        return owned_conversation(state, health_worker_id, id).await;
    }
    match state
        .repo
        .find_latest_conversation(health_worker_id, health_user_ci)
        .await?
    {
        Some(conversation) => Ok(conversation),
        None => Ok(state
            .repo
            .create_conversation(health_worker_id, health_user_ci)
            .await?),
    }
}

fn required_ci(raw: &str) -> Result<String, ApiError> {
    let ci = clean_ci(raw);
    let mut v = Validator::new();
    v.required("healthUserCi", &ci, "La cédula es requerida");
    v.finish()?;
    Ok(ci)
}

/// send_message
///
/// [Health Worker Route] Asks HCEN's assistant about a patient's clinical
/// history.
///
/// The user message is stored before HCEN is called and stays stored when
/// HCEN fails (502), so the transcript shows the unanswered question.
#[utoipa::path(
    post,
    path = "/chat/messages",
    request_body = SendMessageRequest,
    responses(
        (status = 200, description = "Answered", body = SendMessageResponse),
        (status = 400, description = "Validation failed"),
        (status = 403, description = "Foreign conversation"),
        (status = 502, description = "HCEN failed")
    )
)]
pub async fn send_message(
    State(state): State<AppState>,
    session: Session,
    Json(payload): Json<SendMessageRequest>,
) -> Result<Json<SendMessageResponse>, ApiError> {
    let health_worker_id = session.require_health_worker()?;
    let ci = clean_ci(&payload.health_user_ci);
    let text = payload.message.trim().to_string();

    let mut v = Validator::new();
    v.required("healthUserCi", &ci, "La cédula es requerida")
        .required("message", &text, "El mensaje es requerido");
    v.finish()?;

    let conversation = get_or_create(&state, health_worker_id, &ci, payload.conversation_id).await?;
    let previous = state.repo.list_messages(conversation.id).await?;

    let user_message = state
        .repo
        .add_message(conversation.id, MessageRole::User, &text)
        .await?;

    let mut history: Vec<ChatTurn> = previous
        .iter()
        .map(|m| ChatTurn {
            role: role_name(m.role).to_string(),
            content: m.content.clone(),
        })
        .collect();
    history.push(ChatTurn {
        role: role_name(MessageRole::User).to_string(),
        content: text.clone(),
    });

    let request = ChatRequest {
        query: text,
        conversation_history: history,
        health_user_ci: conversation.health_user_ci.clone(),
        document_id: None,
    };
    let answer = match state.hcen.chat(&request).await {
        Ok(answer) => answer,
        Err(e) => {
            tracing::error!(conversation = %conversation.id, "HCEN chat failed: {}", e);
            return Err(ApiError::Upstream(
                "the clinical history assistant is unavailable".to_string(),
            ));
        }
    };

    let assistant_message = state
        .repo
        .add_message(conversation.id, MessageRole::Assistant, &answer.answer)
        .await?;

    Ok(Json(SendMessageResponse {
        conversation_id: conversation.id,
        user_message,
        assistant_message,
        sources: answer.sources,
    }))
}

/// get_conversation
///
/// [Health Worker Route] The conversation with a patient and its messages,
/// oldest first. Creates one when none exists yet.
#[utoipa::path(
    get,
    path = "/chat/conversation",
    params(ConversationQuery),
    responses(
        (status = 200, description = "Conversation", body = ConversationDetail),
        (status = 403, description = "Foreign conversation"),
        (status = 404, description = "Unknown conversation id")
    )
)]
pub async fn get_conversation(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<ConversationQuery>,
) -> Result<Json<ConversationDetail>, ApiError> {
    let health_worker_id = session.require_health_worker()?;
    let ci = required_ci(&query.health_user_ci)?;

    let conversation = get_or_create(&state, health_worker_id, &ci, query.conversation_id).await?;
    let messages = state.repo.list_messages(conversation.id).await?;

    Ok(Json(ConversationDetail {
        conversation,
        messages,
    }))
}

#[utoipa::path(
    post,
    path = "/chat/conversations",
    request_body = CreateConversationRequest,
    responses((status = 201, description = "Created", body = Conversation))
)]
pub async fn create_conversation(
    State(state): State<AppState>,
    session: Session,
    Json(payload): Json<CreateConversationRequest>,
) -> Result<(StatusCode, Json<Conversation>), ApiError> {
    let health_worker_id = session.require_health_worker()?;
    let ci = required_ci(&payload.health_user_ci)?;

    let conversation = state.repo.create_conversation(health_worker_id, &ci).await?;
    Ok((StatusCode::CREATED, Json(conversation)))
}

#[utoipa::path(
    get,
    path = "/chat/conversations",
    params(ConversationFilter),
    responses((status = 200, description = "Most recent first", body = [ConversationSummary]))
)]
pub async fn list_conversations(
    State(state): State<AppState>,
    session: Session,
    Query(filter): Query<ConversationFilter>,
) -> Result<Json<Vec<ConversationSummary>>, ApiError> {
    let health_worker_id = session.require_health_worker()?;
    let ci = non_empty(filter.health_user_ci).as_deref().map(clean_ci);

    let conversations = state
        .repo
        .list_conversations(health_worker_id, ci.as_deref())
        .await?;
    Ok(Json(conversations))
}

#[utoipa::path(
    delete,
    path = "/chat/conversations/{id}",
    params(("id" = Uuid, Path, description = "Conversation ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Foreign conversation"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_conversation(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let health_worker_id = session.require_health_worker()?;
    owned_conversation(&state, health_worker_id, id).await?;

    if !state.repo.delete_conversation(id).await? {
        return Err(ApiError::not_found("conversation not found"));
    }
    Ok(StatusCode::NO_CONTENT)
}

use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    routing::{get, post},
};
use axum_valid::{Valid, ValidRejection};

use crate::{
    dto::group::{
        AcceptedResponse, BeginInitRequest, CancelInitResponse, CompleteInitRequest,
        ErrorResponse, GroupInfoResponse, HistoryEntry, PhaseResponse, ResetRequest,
        SubmissionRequest, UserStatsResponse, UserSubmissionsResponse, history_entries,
    },
    error::AppError,
    services::{lifecycle_service, query_service, submission_service},
    state::{
        SharedState,
        game::{GroupId, UserId},
    },
};

/// Validated JSON body; rejections are turned into [`AppError`] by the handler.
type ValidJson<T> = Result<Valid<Json<T>>, ValidRejection<JsonRejection>>;

/// Routes driven by the chat adapter for a single group.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route(
            "/groups/{group_id}/init",
            post(begin_init).put(complete_init).delete(cancel_init),
        )
        .route("/groups/{group_id}/submissions", post(submit))
        .route("/groups/{group_id}/reset", post(reset))
        .route("/groups/{group_id}/stats", get(stats))
        .route("/groups/{group_id}/info", get(info))
        .route("/groups/{group_id}/history", get(history))
        .route(
            "/groups/{group_id}/users/{user_id}/submissions",
            get(user_submissions),
        )
}

/// Start the setup conversation of a group.
#[utoipa::path(
    post,
    path = "/groups/{group_id}/init",
    tag = "lifecycle",
    params(("group_id" = i64, Path, description = "Chat group identifier")),
    request_body = BeginInitRequest,
    responses(
        (status = 200, description = "Setup pending; a channel is expected next", body = PhaseResponse),
        (status = 409, description = "Group already initialized", body = ErrorResponse)
    )
)]
pub async fn begin_init(
    State(state): State<SharedState>,
    Path(group_id): Path<GroupId>,
    payload: ValidJson<BeginInitRequest>,
) -> Result<Json<PhaseResponse>, AppError> {
    let Valid(Json(payload)) = payload?;
    let phase = lifecycle_service::begin_init(&state, group_id, payload.user_id).await?;
    Ok(Json(PhaseResponse { phase }))
}

/// Attach the channel named in the pending setup conversation.
#[utoipa::path(
    put,
    path = "/groups/{group_id}/init",
    tag = "lifecycle",
    params(("group_id" = i64, Path, description = "Chat group identifier")),
    request_body = CompleteInitRequest,
    responses(
        (status = 200, description = "Group initialized", body = GroupInfoResponse),
        (status = 400, description = "Malformed channel handle; setup ends", body = ErrorResponse),
        (status = 409, description = "No setup pending or already initialized", body = ErrorResponse),
        (status = 422, description = "Bot cannot post in the channel", body = ErrorResponse)
    )
)]
pub async fn complete_init(
    State(state): State<SharedState>,
    Path(group_id): Path<GroupId>,
    payload: Result<Json<CompleteInitRequest>, JsonRejection>,
) -> Result<Json<GroupInfoResponse>, AppError> {
    // The handle itself is checked by the service so a bad one still ends the setup.
    let Json(payload) = payload?;
    let info = lifecycle_service::complete_init(&state, group_id, &payload.channel).await?;
    Ok(Json(info.into()))
}

/// Abandon a pending setup conversation.
#[utoipa::path(
    delete,
    path = "/groups/{group_id}/init",
    tag = "lifecycle",
    params(("group_id" = i64, Path, description = "Chat group identifier")),
    responses((status = 200, description = "Cancellation outcome", body = CancelInitResponse))
)]
pub async fn cancel_init(
    State(state): State<SharedState>,
    Path(group_id): Path<GroupId>,
) -> Json<CancelInitResponse> {
    let cancelled = lifecycle_service::cancel_init(&state, group_id);
    Json(CancelInitResponse { cancelled })
}

/// Report a find from a caption or a reply command.
#[utoipa::path(
    post,
    path = "/groups/{group_id}/submissions",
    tag = "submissions",
    params(("group_id" = i64, Path, description = "Chat group identifier")),
    request_body = SubmissionRequest,
    responses(
        (status = 200, description = "Find accepted", body = AcceptedResponse),
        (status = 400, description = "No number in the message", body = ErrorResponse),
        (status = 409, description = "Not initialized, duplicate or out of sequence", body = ErrorResponse),
        (status = 502, description = "Reposting the proof failed", body = ErrorResponse),
        (status = 503, description = "Storage unavailable", body = ErrorResponse)
    )
)]
pub async fn submit(
    State(state): State<SharedState>,
    Path(group_id): Path<GroupId>,
    payload: ValidJson<SubmissionRequest>,
) -> Result<Json<AcceptedResponse>, AppError> {
    let Valid(Json(payload)) = payload?;
    let accepted =
        submission_service::submit_event(&state, group_id, payload.user_id, payload.event.into())
            .await?;
    Ok(Json(accepted.into()))
}

/// Wipe all data of the group.
#[utoipa::path(
    post,
    path = "/groups/{group_id}/reset",
    tag = "lifecycle",
    params(("group_id" = i64, Path, description = "Chat group identifier")),
    request_body = ResetRequest,
    responses(
        (status = 204, description = "Group reset"),
        (status = 403, description = "Requester is not a group administrator", body = ErrorResponse)
    )
)]
pub async fn reset(
    State(state): State<SharedState>,
    Path(group_id): Path<GroupId>,
    payload: ValidJson<ResetRequest>,
) -> Result<StatusCode, AppError> {
    let Valid(Json(payload)) = payload?;
    lifecycle_service::reset(&state, group_id, payload.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Leaderboard of the group.
#[utoipa::path(
    get,
    path = "/groups/{group_id}/stats",
    tag = "queries",
    params(("group_id" = i64, Path, description = "Chat group identifier")),
    responses(
        (status = 200, description = "Leaderboard", body = [UserStatsResponse]),
        (status = 409, description = "Group not initialized", body = ErrorResponse)
    )
)]
pub async fn stats(
    State(state): State<SharedState>,
    Path(group_id): Path<GroupId>,
) -> Result<Json<Vec<UserStatsResponse>>, AppError> {
    let stats = query_service::get_stats(&state, group_id).await?;
    Ok(Json(stats.into_iter().map(Into::into).collect()))
}

/// Current number, latest proof and channel of the group.
#[utoipa::path(
    get,
    path = "/groups/{group_id}/info",
    tag = "queries",
    params(("group_id" = i64, Path, description = "Chat group identifier")),
    responses(
        (status = 200, description = "Group progress", body = GroupInfoResponse),
        (status = 409, description = "Group not initialized", body = ErrorResponse)
    )
)]
pub async fn info(
    State(state): State<SharedState>,
    Path(group_id): Path<GroupId>,
) -> Result<Json<GroupInfoResponse>, AppError> {
    Ok(Json(query_service::get_info(&state, group_id).await?.into()))
}

/// Every found number with its proof link.
#[utoipa::path(
    get,
    path = "/groups/{group_id}/history",
    tag = "queries",
    params(("group_id" = i64, Path, description = "Chat group identifier")),
    responses((status = 200, description = "Found numbers, ascending", body = [HistoryEntry]))
)]
pub async fn history(
    State(state): State<SharedState>,
    Path(group_id): Path<GroupId>,
) -> Result<Json<Vec<HistoryEntry>>, AppError> {
    let history = query_service::get_history(&state, group_id).await?;
    Ok(Json(history_entries(history)))
}

/// Numbers found by one member.
#[utoipa::path(
    get,
    path = "/groups/{group_id}/users/{user_id}/submissions",
    tag = "queries",
    params(
        ("group_id" = i64, Path, description = "Chat group identifier"),
        ("user_id" = i64, Path, description = "Chat user identifier")
    ),
    responses((status = 200, description = "Numbers found by the user", body = UserSubmissionsResponse))
)]
pub async fn user_submissions(
    State(state): State<SharedState>,
    Path((group_id, user_id)): Path<(GroupId, UserId)>,
) -> Result<Json<UserSubmissionsResponse>, AppError> {
    let numbers = query_service::get_user_submissions(&state, group_id, user_id).await?;
    Ok(Json(UserSubmissionsResponse::new(user_id, numbers)))
}

use utoipa::OpenApi;

#[derive(OpenApi)]
/// OpenAPI document of the Number Hunt HTTP API.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::group::begin_init,
        crate::routes::group::complete_init,
        crate::routes::group::cancel_init,
        crate::routes::group::submit,
        crate::routes::group::reset,
        crate::routes::group::stats,
        crate::routes::group::info,
        crate::routes::group::history,
        crate::routes::group::user_submissions,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::health::HealthStatus,
            crate::dto::group::BeginInitRequest,
            crate::dto::group::CompleteInitRequest,
            crate::dto::group::CancelInitResponse,
            crate::dto::group::PhaseResponse,
            crate::dto::group::SubmissionRequest,
            crate::dto::group::SubmissionPayload,
            crate::dto::group::MediaRefDto,
            crate::dto::group::AcceptedResponse,
            crate::dto::group::ResetRequest,
            crate::dto::group::UserStatsResponse,
            crate::dto::group::GroupInfoResponse,
            crate::dto::group::HistoryEntry,
            crate::dto::group::UserSubmissionsResponse,
            crate::dto::group::ErrorResponse,
            crate::state::lifecycle::GroupPhase,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "lifecycle", description = "Group setup and reset"),
        (name = "submissions", description = "Reporting finds"),
        (name = "queries", description = "Leaderboard and history"),
    )
)]
pub struct ApiDoc;

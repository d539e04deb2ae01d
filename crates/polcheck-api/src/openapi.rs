//! # OpenAPI Specification Assembly
//!
//! Assembles the utoipa-documented routes into one OpenAPI document, served
//! at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

/// Assembled OpenAPI spec for the entire API surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "polcheck API",
        version = "0.1.0",
        description = "Upload policy PDFs and check documents against them, by literal containment or with a hosted model.",
        license(name = "AGPL-3.0-or-later")
    ),
    paths(
        crate::routes::policies::upload_policy,
        crate::routes::policies::list_policies,
        crate::routes::policies::delete_policy,
        crate::routes::check::check_document,
    ),
    components(schemas(
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
        crate::routes::policies::UploadForm,
        crate::routes::policies::UploadResponse,
        crate::routes::policies::PolicySummary,
        crate::routes::policies::PolicyListResponse,
        crate::routes::check::CheckDocumentRequest,
        crate::routes::check::ComplianceResponseSchema,
        crate::routes::check::ComplianceReportSchema,
        crate::routes::check::ViolationSchema,
    )),
    tags(
        (name = "policies", description = "Policy upload and management"),
        (name = "compliance", description = "Document compliance checks"),
    )
)]
pub struct ApiDoc;

/// Build the OpenAPI router.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

/// GET /openapi.json: Return the generated OpenAPI specification.
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

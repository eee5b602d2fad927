use axum::extract::{Extension, State};
use serde::Serialize;

use crate::db::{AppState, queries};
use crate::error::{AppError, OptionExt, Result, msg};
use crate::extractors::{Json, Path};
use crate::id::is_valid_prefixed_id;
use crate::middleware::AuthenticatedUser;
use crate::models::{CourseDetail, PurchaseWithCourse};

#[derive(Debug, Serialize)]
pub struct CourseWithPurchaseStatus {
    pub course: CourseDetail,
    pub purchased: bool,
}

/// Course page data plus whether the caller has bought it.
///
/// Under the default policy any purchase record counts, including pending and
/// failed ones; see `PurchasedPolicy`.
pub async fn get_course_detail_with_purchase_status(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(course_id): Path<String>,
) -> Result<Json<CourseWithPurchaseStatus>> {
    if !is_valid_prefixed_id(&course_id) {
        return Err(AppError::NotFound(msg::COURSE_NOT_FOUND.into()));
    }

    let conn = state.db.get()?;

    let course = queries::get_course_detail(&conn, &course_id)?
        .or_not_found(msg::COURSE_NOT_FOUND)?;

    let purchased =
        queries::has_purchased(&conn, &auth.user_id, &course_id, state.purchased_policy)?;

    Ok(Json(CourseWithPurchaseStatus { course, purchased }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchasedCoursesResponse {
    pub purchased_course: Vec<PurchaseWithCourse>,
}

/// Completed sales of the caller's own courses (the caller as creator).
/// An empty list is a normal result.
pub async fn get_all_purchased_courses(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
) -> Result<Json<PurchasedCoursesResponse>> {
    let conn = state.db.get()?;
    let purchased_course = queries::list_completed_purchases_for_creator(&conn, &auth.user_id)?;
    Ok(Json(PurchasedCoursesResponse { purchased_course }))
}

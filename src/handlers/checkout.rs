use axum::extract::{Extension, State};
use serde::{Deserialize, Serialize};

use crate::db::{AppState, queries};
use crate::error::{AppError, OptionExt, Result, msg};
use crate::extractors::Json;
use crate::id::{generate_order_id, is_valid_prefixed_id};
use crate::middleware::AuthenticatedUser;
use crate::models::CreatePurchase;
use crate::payments::NewOrder;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub course_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub success: bool,
    pub session_id: String,
}

/// Start a checkout: create a gateway order for the course and record a
/// pending purchase.
///
/// The purchase is only persisted once the gateway has issued a session, so a
/// failed gateway call leaves no local record. The reverse is not covered: if
/// the insert fails after the order was created, the remote order is orphaned
/// and only logged.
pub async fn create_checkout_session(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Json(request): Json<CheckoutRequest>,
) -> Result<Json<CheckoutResponse>> {
    if !is_valid_prefixed_id(&request.course_id) {
        return Err(AppError::NotFound(msg::COURSE_NOT_FOUND.into()));
    }

    let (course, user) = {
        let conn = state.db.get()?;
        let course = queries::get_course_by_id(&conn, &request.course_id)?
            .or_not_found(msg::COURSE_NOT_FOUND)?;
        let user = queries::get_user_by_id(&conn, &auth.user_id)?
            .or_not_found(msg::USER_NOT_FOUND)?;
        (course, user)
    };

    let order_id = generate_order_id();

    let order = NewOrder {
        order_id: order_id.clone(),
        amount: course.price,
        currency: state.checkout.currency.clone(),
        customer_id: user.id.clone(),
        customer_email: user.email.clone(),
        customer_phone: state.checkout.customer_phone.clone(),
        return_url: state.checkout.return_url(&course.id),
        notify_url: state.checkout.notify_url.clone(),
    };

    let session_id = match state.gateway.create_order(&order).await {
        Ok(Some(session_id)) => session_id,
        Ok(None) => {
            return Err(AppError::PaymentSession(format!(
                "{} returned no session for order {}",
                state.gateway.provider_name(),
                order_id
            )));
        }
        Err(e @ AppError::PaymentSession(_)) => return Err(e),
        Err(e) => return Err(AppError::PaymentSession(e.to_string())),
    };

    let conn = state.db.get().map_err(|e| {
        tracing::error!(
            "Order {} created at {} but purchase was not recorded: {}",
            order_id,
            state.gateway.provider_name(),
            e
        );
        AppError::from(e)
    })?;

    let purchase = queries::create_purchase(
        &conn,
        &CreatePurchase {
            course_id: course.id.clone(),
            user_id: user.id.clone(),
            creator_id: course.creator_id.clone(),
            amount: course.price,
            payment_id: order_id.clone(),
        },
    )
    .map_err(|e| {
        tracing::error!(
            "Order {} created at {} but purchase was not recorded: {}",
            order_id,
            state.gateway.provider_name(),
            e
        );
        e
    })?;

    tracing::info!(
        "Checkout started: purchase {} (order {}) for course {} by user {}",
        purchase.id,
        order_id,
        course.id,
        user.id
    );

    Ok(Json(CheckoutResponse {
        success: true,
        session_id,
    }))
}

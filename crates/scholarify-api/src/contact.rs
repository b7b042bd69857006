use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use axum_extra::extract::WithRejection;
use tracing::{info, warn};

use scholarify_types::api::{ContactRequest, ContactResponse};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::rate_limit::ClientIp;
use crate::{run_db, validate};

const NAME_MAX: usize = 120;
const SUBJECT_MAX: usize = 200;

/// Stores a visitor's message for staff to read.
pub async fn submit_contact(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    WithRejection(Json(req), _): WithRejection<Json<ContactRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    if !state.contact_limiter.allow(&ip).await {
        warn!("Contact rate limit hit for {}", ip);
        return Err(ApiError::TooManyRequests);
    }

    let name = req.name.trim().to_string();
    let email = req.email.trim().to_string();
    let subject = req.subject.trim().to_string();
    let message = req.message.trim().to_string();

    validate::required("Name", &name)?;
    validate::required("Email", &email)?;
    validate::required("Message", &message)?;
    validate::email(&email)?;
    validate::max_len("Name", &name, NAME_MAX)?;
    validate::max_len("Subject", &subject, SUBJECT_MAX)?;

    let id = run_db(&state, move |db| {
        db.insert_contact_message(&name, &email, &subject, &message)
    })
    .await?;
    info!("Contact message {} received", id);

    Ok((
        StatusCode::CREATED,
        Json(ContactResponse {
            id,
            detail: "Thanks! Your message has been sent.".into(),
        }),
    ))
}

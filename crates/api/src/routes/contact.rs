//! Contact form endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use chrono::Utc;
use common::ContactId;
use domain::ContactForm;
use serde::Serialize;
use settlement::PaymentGateway;
use store::Store;

use crate::AppState;
use crate::error::ApiError;

const THANK_YOU_MESSAGE: &str =
    "Thank you for your message! We will get back to you within 24 hours.";

#[derive(Serialize)]
pub struct ContactCreatedResponse {
    pub id: ContactId,
    pub message: &'static str,
}

/// POST /contact
#[tracing::instrument(skip(state, form))]
pub async fn create<S: Store + Clone, G: PaymentGateway>(
    State(state): State<Arc<AppState<S, G>>>,
    Json(form): Json<ContactForm>,
) -> Result<(StatusCode, Json<ContactCreatedResponse>), ApiError> {
    let lead = form.into_lead(Utc::now())?;
    state.store.insert_contact(&lead).await?;

    metrics::counter!("contact_leads_total").increment(1);
    tracing::info!(contact_id = %lead.id, "contact lead received");

    Ok((
        StatusCode::CREATED,
        Json(ContactCreatedResponse {
            id: lead.id,
            message: THANK_YOU_MESSAGE,
        }),
    ))
}

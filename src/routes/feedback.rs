use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::{
    auth::MaybeUser,
    db::{queries, with_retry},
    error::AppError,
    extract::AppJson,
    forms::FeedbackForm,
    models::Feedback,
    AppState,
};

/// Submit feedback. Works signed out; signed-in authors are linked.
pub async fn submit_feedback(
    State(state): State<Arc<AppState>>,
    MaybeUser(auth): MaybeUser,
    AppJson(form): AppJson<FeedbackForm>,
) -> Result<(StatusCode, Json<Feedback>), AppError> {
    form.validate()?;

    let pool = &state.db;
    let form = &form;
    let user_id = auth.as_ref().map(|a| a.id());
    let feedback = with_retry(&state.retry, "submit feedback", || async move {
        Ok(queries::create_feedback(pool, form, user_id).await?)
    })
    .await?;

    tracing::info!("Feedback {} received (user: {:?})", feedback.id, user_id);

    Ok((StatusCode::CREATED, Json(feedback)))
}

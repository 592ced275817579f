use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;

use crate::AppState;
use crate::error::{ChatError, Result};
use crate::history::{self, MAX_OFFSET_MINUTES};
use crate::models::{DayGroup, Message, NewMessage};

/// Store a message and broadcast it. 201 for a new message, 200 when the
/// client uuid was already stored.
pub async fn send_message_handler(
    State(state): State<AppState>,
    Json(new): Json<NewMessage>,
) -> Result<(StatusCode, Json<Message>)> {
    let appended = state.hub.submit_tracked(new).await?;
    let status = if appended.duplicate {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((status, Json(appended.message)))
}

pub async fn history_handler(
    State(state): State<AppState>,
    Path((user_a, user_b)): Path<(String, String)>,
) -> Result<Json<Vec<Message>>> {
    Ok(Json(
        state.history.open_conversation(&user_a, &user_b).await?,
    ))
}

#[derive(Debug, Deserialize)]
pub struct DaysQuery {
    #[serde(default)]
    pub tz_offset_minutes: i32,
}

/// History bucketed by calendar day in the viewer's UTC offset.
pub async fn history_by_day_handler(
    State(state): State<AppState>,
    Path((user_a, user_b)): Path<(String, String)>,
    Query(query): Query<DaysQuery>,
) -> Result<Json<Vec<DayGroup>>> {
    let offset = history::viewer_offset(query.tz_offset_minutes).ok_or_else(|| {
        ChatError::BadRequest(format!(
            "tz_offset_minutes must be within ±{}",
            MAX_OFFSET_MINUTES
        ))
    })?;
    let messages = state.history.open_conversation(&user_a, &user_b).await?;
    Ok(Json(history::group_by_day(&messages, &offset)))
}

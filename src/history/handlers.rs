//! History endpoints (`/api/history`). All require a logged-in session.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use super::db as history_db;
use crate::analysis::db as analysis_db;
use crate::auth::AuthContext;
use crate::db;
use crate::domain::Analysis;
use crate::error::{AppError, AppResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryQuery {
    pub history_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveRequest {
    pub history_name: String,
    #[serde(flatten)]
    pub analysis: Analysis,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameRequest {
    pub history_name: String,
    pub new_name: String,
}

fn require_name(name: &str) -> AppResult<&str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("History name is required.".to_string()));
    }
    Ok(name)
}

/// GET /api/history/list
pub async fn list(State(state): State<AppState>, auth: AuthContext) -> AppResult<Json<Vec<String>>> {
    let conn = db::try_lock(&state.db)?;
    let names = history_db::get_history_names_by_user_id(&conn, auth.user_id)?;
    Ok(Json(names))
}

/// GET /api/history/get?historyName=
pub async fn get(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(query): Query<HistoryQuery>,
) -> AppResult<Json<Analysis>> {
    let name = require_name(&query.history_name)?;

    let conn = db::try_lock(&state.db)?;
    let history = history_db::get_history(&conn, name, auth.user_id)?
        .ok_or_else(|| AppError::HistoryNotFound(name.to_string()))?;
    let analysis = analysis_db::get_analysis(&conn, history.id)?.unwrap_or_default();
    Ok(Json(analysis))
}

/// POST /api/history/save
pub async fn save(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<SaveRequest>,
) -> AppResult<String> {
    let name = require_name(&req.history_name)?;

    let conn = db::try_lock(&state.db)?;
    let tx = conn.unchecked_transaction()?;
    let history_id = match history_db::get_history(&tx, name, auth.user_id)? {
        Some(existing) => existing.id,
        None => history_db::create_history(&tx, auth.user_id, name)?,
    };
    analysis_db::save_analysis(&tx, history_id, &req.analysis)?;
    tx.commit()?;

    tracing::debug!("User {} saved history '{}'", auth.login_id, name);
    Ok(format!("History saved: {}", name))
}

/// PUT /api/history/rename
pub async fn rename(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<RenameRequest>,
) -> AppResult<String> {
    let old_name = require_name(&req.history_name)?;
    let new_name = require_name(&req.new_name)?;

    let conn = db::try_lock(&state.db)?;
    if history_db::get_history(&conn, old_name, auth.user_id)?.is_none() {
        return Err(AppError::HistoryNotFound(old_name.to_string()));
    }
    if new_name != old_name && history_db::get_history(&conn, new_name, auth.user_id)?.is_some() {
        return Err(AppError::DuplicateHistory(new_name.to_string()));
    }
    history_db::rename_history(&conn, auth.user_id, old_name, new_name)?;
    Ok(format!("History renamed to: {}", new_name))
}

/// DELETE /api/history/delete?historyName=
pub async fn delete(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(query): Query<HistoryQuery>,
) -> AppResult<String> {
    let name = require_name(&query.history_name)?;

    let conn = db::try_lock(&state.db)?;
    let history = history_db::get_history(&conn, name, auth.user_id)?
        .ok_or_else(|| AppError::HistoryNotFound(name.to_string()))?;

    let tx = conn.unchecked_transaction()?;
    analysis_db::delete_analysis(&tx, history.id)?;
    history_db::delete_history(&tx, &history.history_name, auth.user_id)?;
    tx.commit()?;

    Ok(format!("History deleted: {}", history.history_name))
}

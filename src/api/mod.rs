use axum::Json;
use axum::extract::{Path, Query};
use axum::response::{IntoResponse, Response};
use axum::routing::{post, put};
use axum::{Router, extract::State, http::StatusCode, routing::get};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::formatting::format_full_name;
use crate::models::*;
use crate::services::{Column, SubmittedForm};
use crate::state::AppState;

#[derive(Deserialize)]
struct ListQueryParams {
    filter: Option<String>,
}

#[derive(Deserialize)]
struct FullNameParams {
    mode: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FullNameResponse {
    pub full_name: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/courses", get(list_courses).post(create_course))
        .route("/courses/reload", post(reload_courses))
        .route("/courses/sort/{column}", post(sort_courses))
        .route("/courses/{id}", put(update_course).delete(delete_course))
        .route("/people/full-name", post(full_name))
        .with_state(state)
}

async fn health() -> StatusCode {
    StatusCode::OK
}

/// `?filter=` replaces the stored filter (empty clears it); without the
/// parameter the current filter and sort are kept.
async fn list_courses(
    State(state): State<AppState>,
    Query(params): Query<ListQueryParams>,
) -> Json<Vec<CourseRow>> {
    let rows = match params.filter {
        Some(text) => state.courses.filter(&text).await,
        None => state.courses.visible_rows().await,
    };
    Json(rows)
}

async fn reload_courses(State(state): State<AppState>) -> Result<Json<Vec<CourseRow>>, AppError> {
    state.courses.refresh().await?;
    Ok(Json(state.courses.visible_rows().await))
}

async fn sort_courses(
    State(state): State<AppState>,
    Path(column): Path<String>,
) -> Result<Json<Vec<CourseRow>>, AppError> {
    let column = column.parse::<Column>()?;
    Ok(Json(state.courses.toggle_sort(column).await))
}

/// The body is the dialog's result; `null` means the form was cancelled.
async fn create_course(
    State(state): State<AppState>,
    Json(form): Json<Option<CourseForm>>,
) -> Result<Response, AppError> {
    let created = state.courses.open_create(&SubmittedForm(form)).await?;
    Ok(match created {
        Some(pending) => (StatusCode::CREATED, Json(pending)).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    })
}

async fn update_course(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(form): Json<Option<CourseForm>>,
) -> Result<Response, AppError> {
    let row = state.courses.find_row(id).await.ok_or(AppError::NotFound)?;
    let updated = state.courses.open_edit(&row, &SubmittedForm(form)).await?;
    Ok(match updated {
        Some(update) => Json(update).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    })
}

async fn delete_course(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    state.courses.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn full_name(
    Query(params): Query<FullNameParams>,
    Json(person): Json<Person>,
) -> Json<FullNameResponse> {
    Json(FullNameResponse {
        full_name: format_full_name(&person, params.mode.as_deref()),
    })
}

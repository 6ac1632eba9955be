//! Category API endpoints

use axum::{Extension, Json, extract::State, http::StatusCode};
use engine::{Category, CategoryKind};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{ServerError, server::ServerState, user};

#[derive(Deserialize)]
pub struct CategoryNew {
    pub name: String,
    pub kind: CategoryKind,
}

#[derive(Serialize)]
pub struct CategoryCreated {
    pub id: Uuid,
}

#[derive(Serialize)]
pub struct CategoryView {
    pub id: Uuid,
    pub name: String,
    pub kind: CategoryKind,
}

impl From<Category> for CategoryView {
    fn from(category: Category) -> Self {
        Self {
            id: category.id,
            name: category.name,
            kind: category.kind,
        }
    }
}

pub async fn create(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<CategoryNew>,
) -> Result<(StatusCode, Json<CategoryCreated>), ServerError> {
    let id = state
        .engine
        .create_category(&user.username, &payload.name, payload.kind)
        .await?;
    Ok((StatusCode::CREATED, Json(CategoryCreated { id })))
}

pub async fn list(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
) -> Result<Json<Vec<CategoryView>>, ServerError> {
    let categories = state.engine.list_categories(&user.username).await?;
    Ok(Json(
        categories.into_iter().map(CategoryView::from).collect(),
    ))
}

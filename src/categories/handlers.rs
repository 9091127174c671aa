use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{info, instrument};

use super::{
    dto::{CategoryRequest, CategoryView, CreatedCategoryResponse, ListCategoriesQuery},
    repo_types::CategoryFilter,
};
use crate::{
    api::{parse_id, Data, JsonBody, Listing, PathParam, QueryParams},
    auth::middleware::AuthUser,
    db::{Page, StoreError},
    error::{AppError, AppResult},
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/categories", get(list_categories).post(create_category))
        .route(
            "/categories/:category_id",
            get(get_category)
                .post(update_category)
                .delete(delete_category),
        )
}

fn duplicate_name(e: StoreError) -> AppError {
    match e {
        StoreError::Conflict => AppError::Conflict("Category already exists"),
        other => other.into(),
    }
}

#[instrument(skip(state))]
pub async fn list_categories(
    State(state): State<AppState>,
    auth: AuthUser,
    QueryParams(q): QueryParams<ListCategoriesQuery>,
) -> AppResult<Json<Listing<CategoryView>>> {
    let page = Page::new(q.page, q.limit)?;
    let filter = CategoryFilter {
        page,
        search: q.search.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()),
    };
    let categories = state.categories.list(auth.user_id, &filter).await?;
    Ok(Json(Listing {
        data: categories.iter().map(CategoryView::from).collect(),
        meta: page,
    }))
}

#[instrument(skip(state, payload))]
pub async fn create_category(
    State(state): State<AppState>,
    auth: AuthUser,
    JsonBody(payload): JsonBody<CategoryRequest>,
) -> AppResult<(StatusCode, Json<CreatedCategoryResponse>)> {
    let fields = payload.validate()?;
    let category = state
        .categories
        .create(auth.user_id, &fields, OffsetDateTime::now_utc())
        .await
        .map_err(duplicate_name)?;

    info!(user_id = auth.user_id, category_id = category.id, "category created");
    Ok((
        StatusCode::CREATED,
        Json(CreatedCategoryResponse {
            category: CategoryView::from(&category),
        }),
    ))
}

#[instrument(skip(state))]
pub async fn get_category(
    State(state): State<AppState>,
    auth: AuthUser,
    PathParam(category_id): PathParam<String>,
) -> AppResult<Json<Data<CategoryView>>> {
    let id = parse_id(&category_id, "categoryId")?;
    let category = state
        .categories
        .find_owned(auth.user_id, id)
        .await?
        .ok_or(AppError::NotFound("Category not found"))?;
    Ok(Json(Data {
        data: CategoryView::from(&category),
    }))
}

#[instrument(skip(state, payload))]
pub async fn update_category(
    State(state): State<AppState>,
    auth: AuthUser,
    PathParam(category_id): PathParam<String>,
    JsonBody(payload): JsonBody<CategoryRequest>,
) -> AppResult<Json<Data<CategoryView>>> {
    let id = parse_id(&category_id, "categoryId")?;
    let fields = payload.validate()?;
    let category = state
        .categories
        .update(auth.user_id, id, &fields, OffsetDateTime::now_utc())
        .await
        .map_err(duplicate_name)?
        .ok_or(AppError::NotFound("Category not found"))?;

    info!(user_id = auth.user_id, category_id = id, "category updated");
    Ok(Json(Data {
        data: CategoryView::from(&category),
    }))
}

#[instrument(skip(state))]
pub async fn delete_category(
    State(state): State<AppState>,
    auth: AuthUser,
    PathParam(category_id): PathParam<String>,
) -> AppResult<StatusCode> {
    let id = parse_id(&category_id, "categoryId")?;
    let deleted = state
        .categories
        .soft_delete(auth.user_id, id, OffsetDateTime::now_utc())
        .await?;
    if !deleted {
        return Err(AppError::NotFound("Category not found"));
    }

    info!(user_id = auth.user_id, category_id = id, "category deleted");
    Ok(StatusCode::NO_CONTENT)
}

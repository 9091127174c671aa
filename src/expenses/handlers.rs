use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};
use time::OffsetDateTime;
use tracing::instrument;

use super::{
    dto::{CreatedExpenseResponse, ExpenseRequest, ExpenseView, ListExpensesQuery, OverviewQuery},
    overview::Overview,
};
use crate::{
    api::{parse_date, parse_id, Data, JsonBody, Listing, PathParam, QueryParams},
    auth::middleware::AuthUser,
    db::Page,
    error::AppResult,
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/expenses", get(list_expenses).post(create_expense))
        .route("/expenses/overview", get(overview))
        .route(
            "/expenses/:expense_id",
            get(get_expense).post(update_expense).delete(delete_expense),
        )
}

#[instrument(skip(state))]
pub async fn list_expenses(
    State(state): State<AppState>,
    auth: AuthUser,
    QueryParams(q): QueryParams<ListExpensesQuery>,
) -> AppResult<Json<Listing<ExpenseView>>> {
    let page = Page::new(q.page, q.limit)?;
    let date = parse_date(q.date.as_deref())?;
    let categories = q.category_ids()?;

    let expenses = state
        .expenses
        .list(auth.user_id, page, date, categories)
        .await?;
    Ok(Json(Listing {
        data: expenses.iter().map(ExpenseView::from).collect(),
        meta: page,
    }))
}

#[instrument(skip(state, payload))]
pub async fn create_expense(
    State(state): State<AppState>,
    auth: AuthUser,
    JsonBody(payload): JsonBody<ExpenseRequest>,
) -> AppResult<(StatusCode, Json<CreatedExpenseResponse>)> {
    let fields = payload.validate()?;
    let expense = state.expenses.create(auth.user_id, &fields).await?;
    Ok((
        StatusCode::CREATED,
        Json(CreatedExpenseResponse {
            expense: ExpenseView::from(&expense),
        }),
    ))
}

#[instrument(skip(state))]
pub async fn overview(
    State(state): State<AppState>,
    auth: AuthUser,
    QueryParams(q): QueryParams<OverviewQuery>,
) -> AppResult<Json<Overview>> {
    let date = parse_date(q.date.as_deref())?;
    let period = q.period.as_deref().unwrap_or("today");
    let today = OffsetDateTime::now_utc().date();

    let overview = state
        .expenses
        .overview(auth.user_id, period, date, today)
        .await?;
    Ok(Json(overview))
}

#[instrument(skip(state))]
pub async fn get_expense(
    State(state): State<AppState>,
    auth: AuthUser,
    PathParam(expense_id): PathParam<String>,
) -> AppResult<Json<Data<ExpenseView>>> {
    let id = parse_id(&expense_id, "expenseId")?;
    let expense = state.expenses.get(auth.user_id, id).await?;
    Ok(Json(Data {
        data: ExpenseView::from(&expense),
    }))
}

#[instrument(skip(state, payload))]
pub async fn update_expense(
    State(state): State<AppState>,
    auth: AuthUser,
    PathParam(expense_id): PathParam<String>,
    JsonBody(payload): JsonBody<ExpenseRequest>,
) -> AppResult<Json<Data<ExpenseView>>> {
    let id = parse_id(&expense_id, "expenseId")?;
    let fields = payload.validate()?;
    let expense = state.expenses.update(auth.user_id, id, &fields).await?;
    Ok(Json(Data {
        data: ExpenseView::from(&expense),
    }))
}

#[instrument(skip(state))]
pub async fn delete_expense(
    State(state): State<AppState>,
    auth: AuthUser,
    PathParam(expense_id): PathParam<String>,
) -> AppResult<StatusCode> {
    let id = parse_id(&expense_id, "expenseId")?;
    state.expenses.delete(auth.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

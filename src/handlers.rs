use crate::app::Page;
use crate::errors::{ApiError, AppError};
use crate::filter::{filter_plans, sort_plans};
use crate::models::{
    CategoryQuery, Plan, PlanForm, PlanListQuery, PublishFailure, SortDir, SortKey, StatsResponse,
    StatusFilter, ValidationErrors,
};
use crate::state::AppState;
use crate::stats::{build_stats, failed_stats};
use crate::ui::{self, ListControls, PlanListView, PublishOutcome};
use crate::validation::validate_plan;
use axum::{
    extract::{Query, State},
    http::{StatusCode, Uri},
    response::{Html, IntoResponse, Response},
    Form, Json,
};
use serde::de::DeserializeOwned;
use tracing::{info, warn};

pub async fn health_check() -> &'static str {
    "ok"
}

pub async fn dashboard(State(state): State<AppState>) -> Html<String> {
    Html(ui::render_dashboard(&load_stats(&state).await))
}

/// Paths the router does not match exactly (say `/all-plans/`) are resolved
/// through `Page::from_path`; anything unknown renders the dashboard.
pub async fn fallback(State(state): State<AppState>, uri: Uri) -> Html<String> {
    match Page::from_path(uri.path()) {
        Page::Dashboard => dashboard(State(state)).await,
        Page::Create => create_form().await,
        Page::AllPlans => all_plans(State(state), query_or_default(&uri)).await,
        Page::ByCategory => by_category(State(state), query_or_default(&uri)).await,
        Page::Categories => categories(State(state)).await,
        Page::Analytics => analytics(State(state)).await,
    }
}

fn query_or_default<T: DeserializeOwned + Default>(uri: &Uri) -> Query<T> {
    Query::try_from_uri(uri).unwrap_or_else(|_| Query(T::default()))
}

pub async fn analytics(State(state): State<AppState>) -> Html<String> {
    Html(ui::render_analytics(&load_stats(&state).await))
}

pub async fn get_stats(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(load_stats(&state).await)
}

async fn load_stats(state: &AppState) -> StatsResponse {
    match state.api.list_plans().await {
        Ok(plans) => build_stats(&plans, state.refresh_seconds()),
        Err(err) => {
            warn!("dashboard stats unavailable: {err}");
            failed_stats(state.refresh_seconds())
        }
    }
}

pub async fn create_form() -> Html<String> {
    Html(ui::render_create(&PlanForm::default(), None))
}

pub async fn create_submit(
    State(state): State<AppState>,
    Form(form): Form<PlanForm>,
) -> Html<String> {
    let outcome = match submit_plan(&state, &form).await {
        Ok(plan) => PublishOutcome::Published(plan),
        Err(PublishError::Invalid(errors)) => PublishOutcome::Invalid(errors),
        Err(PublishError::Backend(err)) => PublishOutcome::Failed(err.to_string()),
    };
    // keep what the user typed only when they need to fix it
    let shown = if matches!(outcome, PublishOutcome::Published(_)) {
        PlanForm::default()
    } else {
        form
    };
    Html(ui::render_create(&shown, Some(&outcome)))
}

pub async fn publish(State(state): State<AppState>, Json(form): Json<PlanForm>) -> Response {
    match submit_plan(&state, &form).await {
        Ok(plan) => Json(plan).into_response(),
        Err(PublishError::Invalid(errors)) => {
            (StatusCode::UNPROCESSABLE_ENTITY, Json(ValidationErrors { errors })).into_response()
        }
        Err(PublishError::Backend(err)) => {
            let (status, body) = match &err {
                ApiError::Status { status, body } => (Some(*status), Some(body.clone())),
                _ => (None, None),
            };
            let failure = PublishFailure {
                error: err.to_string(),
                status,
                body,
            };
            (StatusCode::BAD_GATEWAY, Json(failure)).into_response()
        }
    }
}

enum PublishError {
    Invalid(Vec<String>),
    Backend(ApiError),
}

async fn submit_plan(state: &AppState, form: &PlanForm) -> Result<Plan, PublishError> {
    let new_plan = validate_plan(form).map_err(|errors| {
        info!("publish rejected: {} validation error(s)", errors.len());
        PublishError::Invalid(errors)
    })?;

    let created = state
        .api
        .publish_plan(&new_plan)
        .await
        .map_err(PublishError::Backend)?;
    info!(
        "published plan id={:?} name={:?} category={:?}",
        created.id, created.name, created.category
    );
    Ok(created)
}

fn list_controls(query: &PlanListQuery) -> ListControls {
    ListControls {
        search: query.q.clone().unwrap_or_default(),
        status: StatusFilter::parse(query.status.as_deref()),
        sort: query.sort.as_deref().and_then(SortKey::parse),
        dir: SortDir::parse(query.dir.as_deref()),
    }
}

fn apply_controls(plans: &[Plan], controls: &ListControls) -> Vec<Plan> {
    let mut filtered = filter_plans(plans, Some(&controls.search), controls.status);
    if let Some(key) = controls.sort {
        sort_plans(&mut filtered, key, controls.dir);
    }
    filtered
}

pub async fn all_plans(
    State(state): State<AppState>,
    Query(query): Query<PlanListQuery>,
) -> Html<String> {
    let controls = list_controls(&query);
    let html = match state.api.list_plans().await {
        Ok(plans) => {
            let filtered = apply_controls(&plans, &controls);
            ui::render_all_plans(
                &controls,
                PlanListView::Loaded {
                    plans: &filtered,
                    fetched: plans.len(),
                },
            )
        }
        Err(err) => ui::render_all_plans(&controls, PlanListView::Failed(err.to_string())),
    };
    Html(html)
}

pub async fn get_plans(
    State(state): State<AppState>,
    Query(query): Query<PlanListQuery>,
) -> Result<Json<Vec<Plan>>, AppError> {
    let controls = list_controls(&query);
    let plans = state.api.list_plans().await?;
    Ok(Json(apply_controls(&plans, &controls)))
}

pub async fn by_category(
    State(state): State<AppState>,
    Query(query): Query<CategoryQuery>,
) -> Html<String> {
    let raw_id = query.id.as_deref().map(str::trim).unwrap_or("");
    if raw_id.is_empty() {
        return Html(ui::render_by_category("", None));
    }

    let result = match raw_id.parse::<i64>() {
        Err(_) => Err("Category ID must be a whole number".to_string()),
        Ok(id) => state
            .api
            .plans_by_category(id)
            .await
            .map_err(|err| err.to_string()),
    };
    Html(ui::render_by_category(raw_id, Some(result)))
}

pub async fn categories(State(state): State<AppState>) -> Html<String> {
    let result = state
        .api
        .list_categories()
        .await
        .map_err(|err| err.to_string());
    Html(ui::render_categories(result))
}

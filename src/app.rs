use crate::handlers;
use crate::state::AppState;
use axum::{routing::{get, post}, Router};
use tower_http::trace::TraceLayer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Dashboard,
    Create,
    AllPlans,
    ByCategory,
    Categories,
    Analytics,
}

impl Page {
    /// Sidebar order.
    pub const ALL: [Page; 6] = [
        Page::Dashboard,
        Page::Create,
        Page::AllPlans,
        Page::ByCategory,
        Page::Categories,
        Page::Analytics,
    ];

    /// Unknown paths land on the dashboard.
    pub fn from_path(path: &str) -> Self {
        let trimmed = path.trim_end_matches('/');
        let path = if trimmed.is_empty() { "/" } else { trimmed };
        Self::ALL
            .into_iter()
            .find(|page| page.path() == path)
            .unwrap_or(Page::Dashboard)
    }

    pub fn path(self) -> &'static str {
        match self {
            Page::Dashboard => "/",
            Page::Create => "/create",
            Page::AllPlans => "/all-plans",
            Page::ByCategory => "/by-category",
            Page::Categories => "/categories",
            Page::Analytics => "/analytics",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Page::Dashboard => "Dashboard",
            Page::Create => "Publish plan",
            Page::AllPlans => "All plans",
            Page::ByCategory => "Plans by category",
            Page::Categories => "Categories",
            Page::Analytics => "Analytics",
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::dashboard))
        .route("/create", get(handlers::create_form).post(handlers::create_submit))
        .route("/all-plans", get(handlers::all_plans))
        .route("/by-category", get(handlers::by_category))
        .route("/categories", get(handlers::categories))
        .route("/analytics", get(handlers::analytics))
        .route("/api/stats", get(handlers::get_stats))
        .route("/api/plans", get(handlers::get_plans))
        .route("/api/plans/publish", post(handlers::publish))
        .route("/healthz", get(handlers::health_check))
        .fallback(handlers::fallback)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// A plan as returned by the backend. Every field is optional so one odd
/// record never breaks a whole page.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Plan {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub date: Option<String>,
    pub image_url: Option<String>,
    pub location: Option<String>,
    pub map: Option<String>,
    pub priority: Option<i64>,
    #[serde(deserialize_with = "category_id")]
    pub category: Option<i64>,
    pub is_active: Option<bool>,
    pub cost_estimate: Option<f64>,
    pub views: Option<i64>,
    pub assistance: Option<i64>,
}

impl Plan {
    pub fn scheduled_day(&self) -> Option<NaiveDate> {
        self.date.as_deref().and_then(parse_day)
    }

    pub fn scheduled_at(&self) -> Option<NaiveDateTime> {
        self.date.as_deref().and_then(parse_timestamp)
    }

    pub fn is_active(&self) -> bool {
        self.is_active == Some(true)
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("(unnamed)")
    }
}

/// Categories are rendered verbatim, so their shape is left open.
pub type Category = Map<String, Value>;

/// Body sent to `POST /plans/publish`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewPlan {
    pub name: String,
    pub description: String,
    pub date: String,
    pub image_url: String,
    pub location: String,
    pub map: String,
    pub priority: i64,
    pub category: i64,
    pub is_active: bool,
    pub cost_estimate: f64,
}

/// Raw publish input, as posted by the HTML form or the JSON API.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlanForm {
    pub name: Option<String>,
    pub description: Option<String>,
    pub date: Option<String>,
    pub image_url: Option<String>,
    pub location: Option<String>,
    pub map: Option<String>,
    #[serde(deserialize_with = "loose_string")]
    pub priority: Option<String>,
    #[serde(deserialize_with = "loose_string")]
    pub category: Option<String>,
    #[serde(deserialize_with = "loose_string")]
    pub is_active: Option<String>,
    #[serde(deserialize_with = "loose_string")]
    pub cost_estimate: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    All,
    Active,
    Inactive,
}

impl StatusFilter {
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("active") | Some("true") => Self::Active,
            Some("inactive") | Some("false") => Self::Inactive,
            _ => Self::All,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Id,
    Name,
    Date,
    Views,
    Priority,
    Cost,
}

impl SortKey {
    pub const ALL: [SortKey; 6] = [
        SortKey::Id,
        SortKey::Name,
        SortKey::Date,
        SortKey::Views,
        SortKey::Priority,
        SortKey::Cost,
    ];

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|key| key.as_str().eq_ignore_ascii_case(value.trim()))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Name => "name",
            Self::Date => "date",
            Self::Views => "views",
            Self::Priority => "priority",
            Self::Cost => "cost",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortDir {
    #[default]
    Asc,
    Desc,
}

impl SortDir {
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(dir) if dir.eq_ignore_ascii_case("desc") => Self::Desc,
            _ => Self::Asc,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// Query string of the plan list page and `/api/plans`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PlanListQuery {
    pub q: Option<String>,
    pub status: Option<String>,
    pub sort: Option<String>,
    pub dir: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CategoryQuery {
    pub id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Kpis {
    pub total: u64,
    pub active: u64,
    pub upcoming_week: u64,
    pub upcoming_all: u64,
    pub expired: u64,
    pub max_views: Option<i64>,
    pub min_cost: Option<f64>,
    pub avg_cost: Option<f64>,
    pub avg_priority: Option<f64>,
    pub zero_assistance: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DailyPoint {
    pub date: String,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategoryPoint {
    pub category: i64,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TopPlan {
    pub id: Option<i64>,
    pub name: String,
    pub views: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistogramBin {
    pub start: f64,
    pub end: f64,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScatterPoint {
    pub name: String,
    pub priority: i64,
    pub views: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatsResponse {
    pub generated_at: String,
    pub refresh_seconds: u64,
    pub error: Option<String>,
    pub kpis: Option<Kpis>,
    pub daily_publish: Vec<DailyPoint>,
    pub by_category: Vec<CategoryPoint>,
    pub top_viewed: Vec<TopPlan>,
    pub cost_histogram: Vec<HistogramBin>,
    pub priority_views: Vec<ScatterPoint>,
}

#[derive(Debug, Serialize)]
pub struct ValidationErrors {
    pub errors: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct PublishFailure {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

pub fn parse_day(raw: &str) -> Option<NaiveDate> {
    parse_timestamp(raw).map(|dt| dt.date())
}

/// Date-only values land at midnight; offsets are dropped, keeping wall time.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }
    const DATETIME_FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
    ];
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|day| day.and_hms_opt(0, 0, 0))
        })
}

fn category_id<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(value_as_id))
}

fn value_as_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        Value::Object(obj) => obj.get("id").and_then(value_as_id),
        _ => None,
    }
}

// JSON clients send numbers and booleans where the HTML form sends strings.
fn loose_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

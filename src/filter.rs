use crate::models::{Plan, SortDir, SortKey, StatusFilter};
use chrono::NaiveDateTime;
use std::cmp::Ordering;

/// Keeps plans whose name contains `search` (case-insensitive) and whose
/// active flag matches `status`. The term is matched as typed, surrounding
/// whitespace included; only an empty term matches everything.
pub fn filter_plans(plans: &[Plan], search: Option<&str>, status: StatusFilter) -> Vec<Plan> {
    let needle = search.filter(|term| !term.is_empty()).map(str::to_lowercase);

    plans
        .iter()
        .filter(|plan| match &needle {
            None => true,
            Some(needle) => plan
                .name
                .as_deref()
                .is_some_and(|name| name.to_lowercase().contains(needle.as_str())),
        })
        .filter(|plan| match status {
            StatusFilter::All => true,
            StatusFilter::Active => plan.is_active == Some(true),
            StatusFilter::Inactive => plan.is_active == Some(false),
        })
        .cloned()
        .collect()
}

/// Stable sort; plans missing the sort field always go last.
pub fn sort_plans(plans: &mut [Plan], key: SortKey, dir: SortDir) {
    plans.sort_by(|a, b| match (sort_field(a, key), sort_field(b, key)) {
        (Some(x), Some(y)) => {
            let ord = x.compare(&y);
            match dir {
                SortDir::Asc => ord,
                SortDir::Desc => ord.reverse(),
            }
        }
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}

enum Field {
    Int(i64),
    Float(f64),
    Text(String),
    Time(NaiveDateTime),
}

impl Field {
    fn compare(&self, other: &Field) -> Ordering {
        match (self, other) {
            (Field::Int(a), Field::Int(b)) => a.cmp(b),
            (Field::Float(a), Field::Float(b)) => a.total_cmp(b),
            (Field::Text(a), Field::Text(b)) => a.cmp(b),
            (Field::Time(a), Field::Time(b)) => a.cmp(b),
            _ => Ordering::Equal,
        }
    }
}

fn sort_field(plan: &Plan, key: SortKey) -> Option<Field> {
    match key {
        SortKey::Id => plan.id.map(Field::Int),
        SortKey::Name => plan.name.as_ref().map(|n| Field::Text(n.to_lowercase())),
        SortKey::Date => plan.scheduled_at().map(Field::Time),
        SortKey::Views => plan.views.map(Field::Int),
        SortKey::Priority => plan.priority.map(Field::Int),
        SortKey::Cost => plan.cost_estimate.map(Field::Float),
    }
}

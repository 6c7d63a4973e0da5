use crate::models::{
    CategoryPoint, DailyPoint, HistogramBin, Kpis, Plan, ScatterPoint, StatsResponse, TopPlan,
};
use chrono::{Duration, Local, NaiveDate};
use std::collections::BTreeMap;

pub const DAYS_BEFORE: i64 = 10;
pub const DAYS_AFTER: i64 = 30;
pub const UPCOMING_WINDOW_DAYS: i64 = 7;
pub const TOP_COUNT: usize = 10;
pub const HISTOGRAM_BINS: usize = 10;

pub const LOAD_ERROR: &str = "Could not load plans from the backend";

pub fn build_stats(plans: &[Plan], refresh_seconds: u64) -> StatsResponse {
    build_stats_at(Local::now().date_naive(), plans, refresh_seconds)
}

pub fn build_stats_at(today: NaiveDate, plans: &[Plan], refresh_seconds: u64) -> StatsResponse {
    StatsResponse {
        generated_at: Local::now().to_rfc3339(),
        refresh_seconds,
        error: None,
        kpis: Some(build_kpis(today, plans)),
        daily_publish: daily_publish(today, plans),
        by_category: active_upcoming_by_category(today, plans),
        top_viewed: top_viewed(plans, TOP_COUNT),
        cost_histogram: cost_histogram(plans, HISTOGRAM_BINS),
        priority_views: priority_views(plans),
    }
}

/// What the dashboard shows when the plan list could not be fetched.
pub fn failed_stats(refresh_seconds: u64) -> StatsResponse {
    StatsResponse {
        generated_at: Local::now().to_rfc3339(),
        refresh_seconds,
        error: Some(LOAD_ERROR.to_string()),
        kpis: None,
        daily_publish: Vec::new(),
        by_category: Vec::new(),
        top_viewed: Vec::new(),
        cost_histogram: Vec::new(),
        priority_views: Vec::new(),
    }
}

pub fn build_kpis(today: NaiveDate, plans: &[Plan]) -> Kpis {
    let week_end = today + Duration::days(UPCOMING_WINDOW_DAYS);
    let days: Vec<NaiveDate> = plans.iter().filter_map(Plan::scheduled_day).collect();

    let costs: Vec<f64> = plans
        .iter()
        .filter_map(|p| p.cost_estimate)
        .filter(|c| c.is_finite())
        .collect();
    let priorities: Vec<f64> = plans.iter().filter_map(|p| p.priority).map(|p| p as f64).collect();

    Kpis {
        total: plans.len() as u64,
        active: plans.iter().filter(|p| p.is_active()).count() as u64,
        upcoming_week: days.iter().filter(|d| **d >= today && **d <= week_end).count() as u64,
        upcoming_all: days.iter().filter(|d| **d >= today).count() as u64,
        expired: days.iter().filter(|d| **d < today).count() as u64,
        max_views: plans.iter().filter_map(|p| p.views).max(),
        min_cost: costs.iter().copied().reduce(f64::min),
        avg_cost: mean(&costs),
        avg_priority: mean(&priorities),
        zero_assistance: plans.iter().filter(|p| p.assistance == Some(0)).count() as u64,
    }
}

pub fn daily_publish(today: NaiveDate, plans: &[Plan]) -> Vec<DailyPoint> {
    let start = today - Duration::days(DAYS_BEFORE);
    let end = today + Duration::days(DAYS_AFTER);

    let mut counts: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    for day in plans.iter().filter_map(Plan::scheduled_day) {
        if day >= start && day <= end {
            *counts.entry(day).or_default() += 1;
        }
    }

    start
        .iter_days()
        .take_while(|day| *day <= end)
        .map(|day| DailyPoint {
            date: day.to_string(),
            count: counts.get(&day).copied().unwrap_or(0),
        })
        .collect()
}

pub fn active_upcoming_by_category(today: NaiveDate, plans: &[Plan]) -> Vec<CategoryPoint> {
    let mut counts: BTreeMap<i64, u64> = BTreeMap::new();
    for plan in plans {
        let upcoming = plan.scheduled_day().is_some_and(|day| day >= today);
        if let (true, true, Some(category)) = (plan.is_active(), upcoming, plan.category) {
            *counts.entry(category).or_default() += 1;
        }
    }
    counts
        .into_iter()
        .map(|(category, count)| CategoryPoint { category, count })
        .collect()
}

pub fn top_viewed(plans: &[Plan], limit: usize) -> Vec<TopPlan> {
    let mut ranked: Vec<TopPlan> = plans
        .iter()
        .filter_map(|p| {
            p.views.map(|views| TopPlan {
                id: p.id,
                name: p.display_name().to_string(),
                views,
            })
        })
        .collect();
    // sort_by is stable, so equal view counts keep their fetch order
    ranked.sort_by(|a, b| b.views.cmp(&a.views));
    ranked.truncate(limit);
    ranked
}

pub fn cost_histogram(plans: &[Plan], bins: usize) -> Vec<HistogramBin> {
    let costs: Vec<f64> = plans
        .iter()
        .filter_map(|p| p.cost_estimate)
        .filter(|c| c.is_finite())
        .collect();
    let (Some(min), Some(max)) = (
        costs.iter().copied().reduce(f64::min),
        costs.iter().copied().reduce(f64::max),
    ) else {
        return Vec::new();
    };

    if bins == 0 || min == max {
        return vec![HistogramBin {
            start: min,
            end: max,
            count: costs.len() as u64,
        }];
    }

    let width = (max - min) / bins as f64;
    let mut histogram: Vec<HistogramBin> = (0..bins)
        .map(|i| HistogramBin {
            start: min + width * i as f64,
            end: if i + 1 == bins { max } else { min + width * (i + 1) as f64 },
            count: 0,
        })
        .collect();

    for cost in costs {
        let index = (((cost - min) / width) as usize).min(bins - 1);
        histogram[index].count += 1;
    }
    histogram
}

pub fn priority_views(plans: &[Plan]) -> Vec<ScatterPoint> {
    plans
        .iter()
        .filter_map(|p| match (p.priority, p.views) {
            (Some(priority), Some(views)) => Some(ScatterPoint {
                name: p.display_name().to_string(),
                priority,
                views,
            }),
            _ => None,
        })
        .collect()
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

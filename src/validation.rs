use crate::models::{NewPlan, PlanForm};

pub const MIN_NAME_CHARS: usize = 3;
pub const MIN_DESCRIPTION_CHARS: usize = 10;
pub const DEFAULT_PRIORITY: i64 = 5;
pub const PRIORITY_RANGE: std::ops::RangeInclusive<i64> = 1..=10;

/// Checks a publish form and builds the backend payload.
///
/// Every violated rule is reported, in form order. The payload is only built
/// when the list is empty.
pub fn validate_plan(form: &PlanForm) -> Result<NewPlan, Vec<String>> {
    let mut errors = Vec::new();

    let name = trimmed(&form.name);
    if name.chars().count() < MIN_NAME_CHARS {
        errors.push(format!("Name must be at least {MIN_NAME_CHARS} characters"));
    }

    let description = trimmed(&form.description);
    if description.chars().count() < MIN_DESCRIPTION_CHARS {
        errors.push(format!(
            "Description must be at least {MIN_DESCRIPTION_CHARS} characters"
        ));
    }

    let date = trimmed(&form.date);
    if date.is_empty() {
        errors.push("Date is required".to_string());
    }

    let priority = match present(&form.priority) {
        None => Some(DEFAULT_PRIORITY),
        Some(raw) => match raw.parse::<i64>() {
            Ok(value) if PRIORITY_RANGE.contains(&value) => Some(value),
            Ok(_) => {
                errors.push(format!(
                    "Priority must be between {} and {}",
                    PRIORITY_RANGE.start(),
                    PRIORITY_RANGE.end()
                ));
                None
            }
            Err(_) => {
                errors.push("Priority must be a whole number".to_string());
                None
            }
        },
    };

    let category = match present(&form.category) {
        None => {
            errors.push("Category is required".to_string());
            None
        }
        Some(raw) => match raw.parse::<i64>() {
            Ok(value) => Some(value),
            Err(_) => {
                errors.push("Category must be a whole number".to_string());
                None
            }
        },
    };

    let is_active = match present(&form.is_active) {
        None => Some(true),
        Some(raw) => {
            let flag = parse_flag(raw);
            if flag.is_none() {
                errors.push("Active flag must be yes or no".to_string());
            }
            flag
        }
    };

    let cost_estimate = match present(&form.cost_estimate) {
        None => Some(0.0),
        Some(raw) => match raw.parse::<f64>() {
            Ok(value) if value.is_finite() => Some(value),
            _ => {
                errors.push("Cost estimate must be a number".to_string());
                None
            }
        },
    };

    match (priority, category, is_active, cost_estimate) {
        (Some(priority), Some(category), Some(is_active), Some(cost_estimate))
            if errors.is_empty() =>
        {
            Ok(NewPlan {
                name: name.to_string(),
                description: description.to_string(),
                date: normalize_date(date),
                image_url: trimmed(&form.image_url).to_string(),
                location: trimmed(&form.location).to_string(),
                map: trimmed(&form.map).to_string(),
                priority,
                category,
                is_active,
                cost_estimate,
            })
        }
        _ => Err(errors),
    }
}

/// Appends `:00` to a `YYYY-MM-DDTHH:MM` timestamp; other inputs pass through.
pub fn normalize_date(date: &str) -> String {
    let bytes = date.as_bytes();
    let minutes_only = bytes.len() == 16 && bytes[10] == b'T' && bytes[13] == b':';
    if minutes_only {
        format!("{date}:00")
    } else {
        date.to_string()
    }
}

pub fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" | "si" | "sí" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

fn trimmed(value: &Option<String>) -> &str {
    value.as_deref().map(str::trim).unwrap_or("")
}

fn present(value: &Option<String>) -> Option<&str> {
    Some(trimmed(value)).filter(|v| !v.is_empty())
}

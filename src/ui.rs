use crate::app::Page;
use crate::charts::stats_script;
use crate::models::{Category, Kpis, Plan, PlanForm, SortDir, SortKey, StatsResponse, StatusFilter};
use serde_json::Value;

/// Result of a publish attempt, as shown under the form.
#[derive(Debug)]
pub enum PublishOutcome {
    Invalid(Vec<String>),
    Published(Plan),
    Failed(String),
}

/// Current state of the all-plans filter controls.
#[derive(Debug, Clone, Default)]
pub struct ListControls {
    pub search: String,
    pub status: StatusFilter,
    pub sort: Option<SortKey>,
    pub dir: SortDir,
}

pub enum PlanListView<'a> {
    Loaded { plans: &'a [Plan], fetched: usize },
    Failed(String),
}

pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

pub fn render_page(page: Page, content: &str, script: &str) -> String {
    let nav: String = Page::ALL
        .into_iter()
        .map(|p| {
            let class = if p == page { "nav-link active" } else { "nav-link" };
            format!(r#"<a class="{class}" href="{}">{}</a>"#, p.path(), p.title())
        })
        .collect();

    let mut html = String::with_capacity(LAYOUT_HEAD.len() + content.len() + script.len() + 512);
    html.push_str(&LAYOUT_HEAD.replace("{{TITLE}}", page.title()));
    html.push_str(r#"<aside class="sidebar"><h2>Plans admin</h2><nav>"#);
    html.push_str(&nav);
    html.push_str("</nav></aside>\n<main class=\"content\">\n");
    html.push_str(&format!("<h1>{}</h1>\n", page.title()));
    html.push_str(content);
    html.push_str("\n</main>\n");
    html.push_str(script);
    html.push_str(LAYOUT_TAIL);
    html
}

fn alert(kind: &str, message: &str) -> String {
    format!(r#"<div class="alert alert-{kind}">{}</div>"#, escape_html(message))
}

fn tile(id: &str, label: &str, value: String) -> String {
    format!(
        r#"<div class="stat"><span class="label">{label}</span><span id="{id}" class="value">{value}</span></div>"#
    )
}

fn chart_card(id: &str, title: &str, subtitle: &str) -> String {
    format!(
        r#"<section class="card chart-card"><h2>{title}</h2><p class="subtitle">{subtitle}</p><svg id="{id}" viewBox="0 0 600 260" role="img" aria-label="{title}"></svg></section>"#
    )
}

fn fmt_int(value: Option<i64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "--".to_string())
}

fn fmt_float(value: Option<f64>, decimals: usize) -> String {
    value
        .map(|v| format!("{v:.decimals$}"))
        .unwrap_or_else(|| "--".to_string())
}

fn stats_header(stats: &StatsResponse) -> String {
    let hidden = if stats.error.is_some() { "" } else { " hidden" };
    format!(
        r#"<div id="stats-error" class="alert alert-danger"{hidden}>{}</div>
<p class="hint">Refreshes every {}s. Last update: <span id="stats-updated">{}</span></p>"#,
        escape_html(stats.error.as_deref().unwrap_or("")),
        stats.refresh_seconds,
        escape_html(&stats.generated_at),
    )
}

fn initial_stats_json(stats: &StatsResponse) -> String {
    let json = serde_json::to_string(stats).unwrap_or_else(|_| "null".to_string());
    // keep the payload from closing its own <script> element
    format!(
        r#"<script id="initial-stats" type="application/json">{}</script>"#,
        json.replace("</", "<\\/")
    )
}

pub fn render_dashboard(stats: &StatsResponse) -> String {
    let k = stats.kpis.as_ref();
    let count = |f: fn(&Kpis) -> u64| {
        k.map(|k| f(k).to_string())
            .unwrap_or_else(|| "--".to_string())
    };

    let tiles = [
        tile("kpi-total", "Total plans", count(|k| k.total)),
        tile("kpi-active", "Active", count(|k| k.active)),
        tile("kpi-upcoming-week", "Next 7 days", count(|k| k.upcoming_week)),
        tile("kpi-upcoming-all", "Upcoming", count(|k| k.upcoming_all)),
        tile("kpi-expired", "Expired", count(|k| k.expired)),
        tile("kpi-max-views", "Max views", fmt_int(k.and_then(|k| k.max_views))),
        tile("kpi-zero-assistance", "No assistance yet", count(|k| k.zero_assistance)),
    ]
    .concat();

    let content = format!(
        r#"{header}
<section class="panel">{tiles}</section>
{daily}
<div class="chart-grid-2">
{category}
{top}
</div>
{initial}"#,
        header = stats_header(stats),
        daily = chart_card(
            "chart-daily",
            "Plans per day",
            "Scheduled plans from 10 days ago to 30 days ahead.",
        ),
        category = chart_card(
            "chart-category",
            "Active upcoming by category",
            "Active plans dated today or later.",
        ),
        top = chart_card("chart-top", "Most viewed", "Top 10 plans by views."),
        initial = initial_stats_json(stats),
    );

    render_page(Page::Dashboard, &content, &stats_script("dashboard", stats.refresh_seconds))
}

pub fn render_analytics(stats: &StatsResponse) -> String {
    let k = stats.kpis.as_ref();
    let tiles = [
        tile("kpi-avg-cost", "Average cost", fmt_float(k.and_then(|k| k.avg_cost), 2)),
        tile("kpi-min-cost", "Lowest cost", fmt_float(k.and_then(|k| k.min_cost), 2)),
        tile("kpi-avg-priority", "Average priority", fmt_float(k.and_then(|k| k.avg_priority), 1)),
        tile("kpi-max-views", "Max views", fmt_int(k.and_then(|k| k.max_views))),
    ]
    .concat();

    let content = format!(
        r#"{header}
<section class="panel">{tiles}</section>
<div class="chart-grid-2">
{cost}
{scatter}
</div>
{initial}"#,
        header = stats_header(stats),
        cost = chart_card("chart-cost", "Cost estimate distribution", "Plans per cost bucket."),
        scatter = chart_card("chart-scatter", "Priority vs views", "One dot per plan."),
        initial = initial_stats_json(stats),
    );

    render_page(Page::Analytics, &content, &stats_script("analytics", stats.refresh_seconds))
}

fn input_row(
    label: &str,
    name: &str,
    kind: &str,
    value: &Option<String>,
    placeholder: &str,
) -> String {
    format!(
        r#"<label class="field"><span>{label}</span><input type="{kind}" name="{name}" value="{}" placeholder="{placeholder}" /></label>"#,
        escape_html(value.as_deref().unwrap_or(""))
    )
}

pub fn render_create(form: &PlanForm, outcome: Option<&PublishOutcome>) -> String {
    let description = escape_html(form.description.as_deref().unwrap_or(""));
    let inactive = form
        .is_active
        .as_deref()
        .and_then(crate::validation::parse_flag)
        == Some(false);
    let (yes, no) = if inactive { ("", " selected") } else { (" selected", "") };

    let result = match outcome {
        None => String::new(),
        Some(PublishOutcome::Invalid(errors)) => {
            let items: String = errors
                .iter()
                .map(|e| format!("<li>{}</li>", escape_html(e)))
                .collect();
            format!(
                r#"<div class="alert alert-warning"><strong>Please fix the following:</strong><ul>{items}</ul></div>"#
            )
        }
        Some(PublishOutcome::Published(plan)) => alert(
            "success",
            &format!(
                "Plan published: #{} {} (category {})",
                fmt_int(plan.id),
                plan.display_name(),
                fmt_int(plan.category)
            ),
        ),
        Some(PublishOutcome::Failed(message)) => alert("danger", message),
    };

    let content = format!(
        r#"<section class="card">
<form method="post" action="/create" class="plan-form">
{name}
<label class="field"><span>Description</span><textarea name="description" rows="3">{description}</textarea></label>
{date}
{image}
{location}
{map}
{priority}
{category}
<label class="field"><span>Active</span><select name="isActive"><option value="true"{yes}>Yes</option><option value="false"{no}>No</option></select></label>
{cost}
<button class="btn" type="submit">Publish</button>
</form>
{result}
</section>"#,
        name = input_row("Name", "name", "text", &form.name, ""),
        date = input_row("Date", "date", "text", &form.date, "2026-03-15T10:00:00"),
        image = input_row("Image URL", "imageUrl", "text", &form.image_url, ""),
        location = input_row("Location", "location", "text", &form.location, ""),
        map = input_row("Map URL", "map", "text", &form.map, ""),
        priority = input_row("Priority (1-10)", "priority", "number", &form.priority, "5"),
        category = input_row("Category ID", "category", "number", &form.category, ""),
        cost = input_row("Cost estimate", "costEstimate", "number", &form.cost_estimate, "0"),
    );

    render_page(Page::Create, &content, "")
}

fn list_href(controls: &ListControls, sort: SortKey, dir: SortDir) -> String {
    format!(
        "/all-plans?q={}&status={}&sort={}&dir={}",
        urlencoding::encode(&controls.search),
        controls.status.as_str(),
        sort.as_str(),
        dir.as_str()
    )
}

fn sort_header(controls: &ListControls, key: SortKey, label: &str) -> String {
    let (dir, marker) = match (controls.sort, controls.dir) {
        (Some(current), SortDir::Asc) if current == key => (SortDir::Desc, " ▲"),
        (Some(current), SortDir::Desc) if current == key => (SortDir::Asc, " ▼"),
        _ => (SortDir::Asc, ""),
    };
    format!(
        r#"<th><a href="{}">{label}{marker}</a></th>"#,
        escape_html(&list_href(controls, key, dir))
    )
}

fn active_badge(plan: &Plan) -> &'static str {
    match plan.is_active {
        Some(true) => r#"<span class="badge on">Active</span>"#,
        Some(false) => r#"<span class="badge off">Inactive</span>"#,
        None => r#"<span class="badge">--</span>"#,
    }
}

fn plan_row(plan: &Plan) -> String {
    format!(
        "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
        fmt_int(plan.id),
        escape_html(plan.display_name()),
        escape_html(plan.date.as_deref().unwrap_or("")),
        fmt_int(plan.category),
        active_badge(plan),
        fmt_int(plan.priority),
        fmt_int(plan.views),
        fmt_int(plan.assistance),
        fmt_float(plan.cost_estimate, 2),
    )
}

pub fn render_all_plans(controls: &ListControls, view: PlanListView<'_>) -> String {
    let status_options: String = [StatusFilter::All, StatusFilter::Active, StatusFilter::Inactive]
        .into_iter()
        .map(|s| {
            let selected = if s == controls.status { " selected" } else { "" };
            format!(r#"<option value="{0}"{selected}>{0}</option>"#, s.as_str())
        })
        .collect();
    let sort_inputs = controls
        .sort
        .map(|key| {
            format!(
                r#"<input type="hidden" name="sort" value="{}" /><input type="hidden" name="dir" value="{}" />"#,
                key.as_str(),
                controls.dir.as_str()
            )
        })
        .unwrap_or_default();

    let filters = format!(
        r#"<form id="filters" class="filters" method="get" action="/all-plans">
<input type="search" name="q" value="{}" placeholder="Search by name" />
<select name="status">{status_options}</select>
{sort_inputs}
<button class="btn" type="submit">Apply</button>
</form>"#,
        escape_html(&controls.search)
    );

    let body = match view {
        PlanListView::Failed(message) => alert("danger", &message),
        PlanListView::Loaded { fetched: 0, .. } => alert("info", "No plans found"),
        PlanListView::Loaded { plans, .. } if plans.is_empty() => {
            alert("info", "No plans match the current filters")
        }
        PlanListView::Loaded { plans, fetched } => {
            let headers = [
                sort_header(controls, SortKey::Id, "ID"),
                sort_header(controls, SortKey::Name, "Name"),
                sort_header(controls, SortKey::Date, "Date"),
                "<th>Category</th><th>Status</th>".to_string(),
                sort_header(controls, SortKey::Priority, "Priority"),
                sort_header(controls, SortKey::Views, "Views"),
                "<th>Assistance</th>".to_string(),
                sort_header(controls, SortKey::Cost, "Cost"),
            ]
            .concat();
            let rows: String = plans.iter().map(plan_row).collect();
            format!(
                r#"<p class="hint">Showing {} of {fetched} plans.</p>
<div class="table-wrap"><table class="data"><thead><tr>{headers}</tr></thead><tbody>{rows}</tbody></table></div>"#,
                plans.len()
            )
        }
    };

    let content = format!(r#"<section class="card">{filters}{body}</section>"#);
    render_page(Page::AllPlans, &content, FILTER_JS)
}

/// Only plain web links make it into `src`/`href`; anything else
/// (`javascript:`, `data:`, relative paths) is dropped.
fn safe_url(raw: &str) -> Option<&str> {
    let url = raw.trim();
    let scheme = url.split_once("://").map(|(scheme, _)| scheme)?;
    (scheme.eq_ignore_ascii_case("http") || scheme.eq_ignore_ascii_case("https")).then_some(url)
}

fn plan_card(plan: &Plan) -> String {
    let image = plan
        .image_url
        .as_deref()
        .and_then(safe_url)
        .map(|url| format!(r#"<img src="{}" alt="" loading="lazy" />"#, escape_html(url)))
        .unwrap_or_default();
    let map = plan
        .map
        .as_deref()
        .and_then(safe_url)
        .map(|url| {
            format!(
                r#" · <a href="{}" target="_blank" rel="noopener">map</a>"#,
                escape_html(url)
            )
        })
        .unwrap_or_default();

    format!(
        r#"<article class="plan-card">{image}<div class="plan-body"><h3>{name}</h3><p class="meta">#{id} · {date} · {badge}</p><p>{description}</p><p class="meta">{location}{map}</p><p class="meta">{views} views · priority {priority}</p></div></article>"#,
        name = escape_html(plan.display_name()),
        id = fmt_int(plan.id),
        date = escape_html(plan.date.as_deref().unwrap_or("no date")),
        badge = active_badge(plan),
        description = escape_html(plan.description.as_deref().unwrap_or("")),
        location = escape_html(plan.location.as_deref().unwrap_or("")),
        views = fmt_int(plan.views),
        priority = fmt_int(plan.priority),
    )
}

pub fn render_by_category(raw_id: &str, result: Option<Result<Vec<Plan>, String>>) -> String {
    let body = match result {
        None => String::new(),
        Some(Err(message)) => alert("danger", &message),
        Some(Ok(plans)) if plans.is_empty() => alert("info", "No plans in this category"),
        Some(Ok(plans)) => {
            let cards: String = plans.iter().map(plan_card).collect();
            format!(r#"<div class="cards">{cards}</div>"#)
        }
    };

    let content = format!(
        r#"<section class="card">
<form class="filters" method="get" action="/by-category">
<input type="number" name="id" value="{}" placeholder="Category ID" />
<button class="btn" type="submit">Look up</button>
</form>
{body}
</section>"#,
        escape_html(raw_id)
    );
    render_page(Page::ByCategory, &content, "")
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Column names in first-seen order across all categories.
pub fn category_columns(categories: &[Category]) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    for key in categories.iter().flat_map(|c| c.keys()) {
        if !columns.contains(key) {
            columns.push(key.clone());
        }
    }
    columns
}

pub fn render_categories(result: Result<Vec<Category>, String>) -> String {
    let body = match result {
        Err(message) => alert("danger", &message),
        Ok(categories) if categories.is_empty() => alert("info", "No categories available"),
        Ok(categories) => {
            let columns = category_columns(&categories);
            let headers: String = columns
                .iter()
                .map(|c| format!("<th>{}</th>", escape_html(c)))
                .collect();
            let rows: String = categories
                .iter()
                .map(|category| {
                    let cells: String = columns
                        .iter()
                        .map(|col| {
                            let text = category.get(col).map(cell_text).unwrap_or_default();
                            format!("<td>{}</td>", escape_html(&text))
                        })
                        .collect();
                    format!("<tr>{cells}</tr>")
                })
                .collect();
            format!(
                r#"<div class="table-wrap"><table class="data"><thead><tr>{headers}</tr></thead><tbody>{rows}</tbody></table></div>"#
            )
        }
    };

    render_page(Page::Categories, &format!(r#"<section class="card">{body}</section>"#), "")
}

const FILTER_JS: &str = r#"<script>
  const filters = document.getElementById('filters');
  if (filters) {
    let timer = null;
    filters.querySelectorAll('input[name="q"], select').forEach((el) => {
      el.addEventListener('input', () => {
        clearTimeout(timer);
        timer = setTimeout(() => filters.submit(), 350);
      });
    });
  }
</script>"#;

const LAYOUT_HEAD: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>{{TITLE}} · Plans admin</title>
  <style>
    :root {
      --bg: #f4f5f7;
      --ink: #23262b;
      --muted: #6b7078;
      --sidebar: #343a40;
      --sidebar-hover: #495057;
      --accent: #3f6ad8;
      --accent-2: #2f4858;
      --card: #ffffff;
      --shadow: 0 4px 12px rgba(0, 0, 0, 0.1);
    }

    * {
      box-sizing: border-box;
    }

    body {
      margin: 0;
      background: var(--bg);
      color: var(--ink);
      font-family: "Segoe UI", "Helvetica Neue", Arial, sans-serif;
    }

    .sidebar {
      position: fixed;
      inset: 0 auto 0 0;
      width: 250px;
      padding: 2rem 1rem;
      background: var(--sidebar);
      overflow-y: auto;
    }

    .sidebar h2 {
      color: #fff;
      text-align: center;
      margin: 0 0 1.5rem;
    }

    .nav-link {
      display: block;
      color: #fff;
      padding: 0.5rem 1rem;
      margin-bottom: 0.5rem;
      border-radius: 5px;
      text-decoration: none;
    }

    .nav-link:hover,
    .nav-link.active {
      background: var(--sidebar-hover);
    }

    .content {
      margin-left: 270px;
      padding: 2rem;
      display: grid;
      gap: 1.5rem;
    }

    h1 {
      margin: 0;
    }

    .card {
      background: var(--card);
      border-radius: 10px;
      box-shadow: var(--shadow);
      padding: 1.5rem 2rem;
    }

    .card h2 {
      margin: 0;
      font-size: 1.2rem;
    }

    .subtitle,
    .hint {
      margin: 0.25rem 0 0.75rem;
      color: var(--muted);
      font-size: 0.9rem;
    }

    .panel {
      display: grid;
      grid-template-columns: repeat(auto-fit, minmax(160px, 1fr));
      gap: 1rem;
    }

    .stat {
      background: var(--card);
      border-radius: 10px;
      box-shadow: var(--shadow);
      padding: 1rem 1.25rem;
      display: grid;
      gap: 0.4rem;
    }

    .stat .label {
      font-size: 0.75rem;
      text-transform: uppercase;
      letter-spacing: 0.1em;
      color: var(--muted);
    }

    .stat .value {
      font-size: 1.6rem;
      font-weight: 600;
      color: var(--accent-2);
    }

    .chart-grid-2 {
      display: grid;
      grid-template-columns: repeat(auto-fit, minmax(420px, 1fr));
      gap: 1.5rem;
    }

    .chart-card svg {
      width: 100%;
      height: 260px;
      display: block;
    }

    .chart-bar {
      fill: var(--accent);
    }

    .chart-point {
      fill: rgba(63, 106, 216, 0.55);
      stroke: var(--accent);
    }

    .chart-grid {
      stroke: rgba(47, 72, 88, 0.12);
    }

    .chart-label {
      fill: var(--muted);
      font-size: 11px;
    }

    .alert {
      padding: 0.75rem 1rem;
      border-radius: 8px;
      margin-top: 1rem;
    }

    .alert-success { background: #d1e7dd; color: #0f5132; }
    .alert-danger { background: #f8d7da; color: #842029; }
    .alert-warning { background: #fff3cd; color: #664d03; }
    .alert-info { background: #cff4fc; color: #055160; }

    .plan-form {
      display: grid;
      gap: 0.6rem;
      max-width: 640px;
    }

    .field {
      display: grid;
      grid-template-columns: 160px 1fr;
      align-items: center;
      gap: 0.75rem;
    }

    input,
    select,
    textarea {
      border: 1px solid #ced4da;
      border-radius: 8px;
      padding: 0.45rem 0.6rem;
      font: inherit;
    }

    .btn {
      border: none;
      border-radius: 8px;
      padding: 0.55rem 1.2rem;
      background: var(--accent);
      color: #fff;
      font-weight: bold;
      cursor: pointer;
      justify-self: start;
    }

    .filters {
      display: flex;
      flex-wrap: wrap;
      gap: 0.6rem;
      margin-bottom: 1rem;
    }

    .table-wrap {
      max-height: 500px;
      overflow-y: auto;
    }

    table.data {
      width: 100%;
      border-collapse: collapse;
    }

    table.data th,
    table.data td {
      padding: 0.5rem 0.6rem;
      border-bottom: 1px solid #e3e6ea;
      text-align: left;
    }

    table.data tbody tr:nth-child(odd) {
      background: #f8f9fa;
    }

    table.data th a {
      color: inherit;
      text-decoration: none;
    }

    .badge {
      padding: 0.15rem 0.5rem;
      border-radius: 999px;
      font-size: 0.8rem;
      background: #e9ecef;
    }

    .badge.on { background: #d1e7dd; color: #0f5132; }
    .badge.off { background: #f8d7da; color: #842029; }

    .cards {
      display: grid;
      grid-template-columns: repeat(auto-fill, minmax(260px, 1fr));
      gap: 1rem;
    }

    .plan-card {
      border: 1px solid #e3e6ea;
      border-radius: 10px;
      overflow: hidden;
    }

    .plan-card img {
      width: 100%;
      height: 140px;
      object-fit: cover;
    }

    .plan-body {
      padding: 0.75rem 1rem;
    }

    .plan-body h3 {
      margin: 0 0 0.25rem;
    }

    .meta {
      color: var(--muted);
      font-size: 0.85rem;
      margin: 0.25rem 0;
    }

    @media (max-width: 800px) {
      .sidebar {
        position: static;
        width: auto;
      }
      .content {
        margin-left: 0;
      }
    }
  </style>
</head>
<body>
"#;

const LAYOUT_TAIL: &str = "\n</body>\n</html>\n";

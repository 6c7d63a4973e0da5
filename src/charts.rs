//! Inline SVG chart drawing shipped with the dashboard and analytics pages.
//!
//! The page embeds the first `StatsResponse` as JSON and then polls
//! `/api/stats`. A tick is skipped while a fetch is still running, and a
//! response is dropped if a newer one was already applied.

/// Script for a stats page. `view` is `"dashboard"` or `"analytics"`.
pub fn stats_script(view: &str, refresh_seconds: u64) -> String {
    format!(
        "<script>\n{CHARTS_JS}\nstartStats('{view}', {ms});\n</script>",
        ms = refresh_seconds.saturating_mul(1000)
    )
}

const CHARTS_JS: &str = r#"
const SVG_W = 600;
const SVG_H = 260;
const PAD_X = 48;
const PAD_Y = 40;
const TOP = 20;

const esc = (value) => String(value)
  .replace(/&/g, '&amp;')
  .replace(/</g, '&lt;')
  .replace(/>/g, '&gt;')
  .replace(/"/g, '&quot;');

const fmtNumber = (value, decimals = 0) => {
  if (typeof value !== 'number' || Number.isNaN(value)) {
    return '--';
  }
  return decimals === 0 ? Math.round(value).toString() : value.toFixed(decimals);
};

const emptyChart = (svg, message) => {
  svg.setAttribute('viewBox', `0 0 ${SVG_W} ${SVG_H}`);
  svg.innerHTML = `<text class="chart-label" x="50%" y="50%" text-anchor="middle">${esc(message)}</text>`;
};

const yGrid = (max, y, left, right) => {
  let grid = '';
  const ticks = 4;
  for (let i = 0; i <= ticks; i += 1) {
    const value = (max * i) / ticks;
    const yPos = y(value);
    grid += `<line class="chart-grid" x1="${left}" y1="${yPos}" x2="${right}" y2="${yPos}" />`;
    grid += `<text class="chart-label" x="${left - 8}" y="${yPos + 4}" text-anchor="end">${fmtNumber(value, max < 4 ? 1 : 0)}</text>`;
  }
  return grid;
};

const renderBars = (svg, points, emptyMessage) => {
  if (!svg) {
    return;
  }
  if (!points.length) {
    emptyChart(svg, emptyMessage);
    return;
  }
  const max = Math.max(1, ...points.map((p) => p.value));
  const slot = (SVG_W - PAD_X * 2) / points.length;
  const barW = Math.max(2, slot * 0.7);
  const y = (value) => SVG_H - PAD_Y - (value / max) * (SVG_H - TOP - PAD_Y);
  const labelEvery = Math.ceil(points.length / 10);

  const bars = points.map((p, i) => {
    const x = PAD_X + i * slot + (slot - barW) / 2;
    const top = y(p.value);
    return `<rect class="chart-bar" x="${x.toFixed(2)}" y="${top.toFixed(2)}" width="${barW.toFixed(2)}" height="${(SVG_H - PAD_Y - top).toFixed(2)}"><title>${esc(p.label)}: ${p.value}</title></rect>`;
  }).join('');

  const labels = points.map((p, i) => {
    if (i % labelEvery !== 0) {
      return '';
    }
    const x = PAD_X + i * slot + slot / 2;
    return `<text class="chart-label" x="${x.toFixed(2)}" y="${SVG_H - PAD_Y + 16}" text-anchor="middle">${esc(p.label)}</text>`;
  }).join('');

  svg.setAttribute('viewBox', `0 0 ${SVG_W} ${SVG_H}`);
  svg.innerHTML = `${yGrid(max, y, PAD_X, SVG_W - PAD_X)}${bars}${labels}`;
};

const renderHBars = (svg, points, emptyMessage) => {
  if (!svg) {
    return;
  }
  if (!points.length) {
    emptyChart(svg, emptyMessage);
    return;
  }
  const left = 170;
  const max = Math.max(1, ...points.map((p) => p.value));
  const row = (SVG_H - TOP - 10) / points.length;
  const barH = Math.max(4, row * 0.65);
  const x = (value) => (value / max) * (SVG_W - left - 60);

  const rows = points.map((p, i) => {
    const yPos = TOP + i * row + (row - barH) / 2;
    const name = p.label.length > 24 ? `${p.label.slice(0, 23)}…` : p.label;
    return `<text class="chart-label" x="${left - 8}" y="${(yPos + barH / 2 + 4).toFixed(2)}" text-anchor="end">${esc(name)}</text>`
      + `<rect class="chart-bar" x="${left}" y="${yPos.toFixed(2)}" width="${Math.max(1, x(p.value)).toFixed(2)}" height="${barH.toFixed(2)}"><title>${esc(p.label)}: ${p.value}</title></rect>`
      + `<text class="chart-label" x="${(left + x(p.value) + 6).toFixed(2)}" y="${(yPos + barH / 2 + 4).toFixed(2)}">${p.value}</text>`;
  }).join('');

  svg.setAttribute('viewBox', `0 0 ${SVG_W} ${SVG_H}`);
  svg.innerHTML = rows;
};

const renderScatter = (svg, points, emptyMessage) => {
  if (!svg) {
    return;
  }
  if (!points.length) {
    emptyChart(svg, emptyMessage);
    return;
  }
  const maxY = Math.max(1, ...points.map((p) => p.y));
  const x = (value) => PAD_X + ((value - 1) / 9) * (SVG_W - PAD_X * 2);
  const y = (value) => SVG_H - PAD_Y - (value / maxY) * (SVG_H - TOP - PAD_Y);

  let xTicks = '';
  for (let p = 1; p <= 10; p += 1) {
    xTicks += `<text class="chart-label" x="${x(p).toFixed(2)}" y="${SVG_H - PAD_Y + 16}" text-anchor="middle">${p}</text>`;
  }
  const dots = points.map((p) =>
    `<circle class="chart-point" cx="${x(p.x).toFixed(2)}" cy="${y(p.y).toFixed(2)}" r="5"><title>${esc(p.label)}: priority ${p.x}, ${p.y} views</title></circle>`
  ).join('');

  svg.setAttribute('viewBox', `0 0 ${SVG_W} ${SVG_H}`);
  svg.innerHTML = `${yGrid(maxY, y, PAD_X, SVG_W - PAD_X)}${xTicks}${dots}`;
};

const setTile = (id, text) => {
  const el = document.getElementById(id);
  if (el) {
    el.textContent = text;
  }
};

const renderStats = (view, stats) => {
  const errorEl = document.getElementById('stats-error');
  if (errorEl) {
    errorEl.textContent = stats.error || '';
    errorEl.hidden = !stats.error;
  }
  const k = stats.kpis || {};
  setTile('kpi-total', fmtNumber(k.total));
  setTile('kpi-active', fmtNumber(k.active));
  setTile('kpi-upcoming-week', fmtNumber(k.upcoming_week));
  setTile('kpi-upcoming-all', fmtNumber(k.upcoming_all));
  setTile('kpi-expired', fmtNumber(k.expired));
  setTile('kpi-max-views', fmtNumber(k.max_views));
  setTile('kpi-zero-assistance', fmtNumber(k.zero_assistance));
  setTile('kpi-min-cost', fmtNumber(k.min_cost, 2));
  setTile('kpi-avg-cost', fmtNumber(k.avg_cost, 2));
  setTile('kpi-avg-priority', fmtNumber(k.avg_priority, 1));
  setTile('stats-updated', stats.generated_at);

  const empty = stats.error ? 'No data' : 'Nothing to show yet';
  if (view === 'dashboard') {
    renderBars(
      document.getElementById('chart-daily'),
      stats.daily_publish.map((d) => ({ label: d.date.slice(5), value: d.count })),
      empty
    );
    renderBars(
      document.getElementById('chart-category'),
      stats.by_category.map((c) => ({ label: `#${c.category}`, value: c.count })),
      empty
    );
    renderHBars(
      document.getElementById('chart-top'),
      stats.top_viewed.map((t) => ({ label: t.name, value: t.views })),
      empty
    );
  } else {
    renderBars(
      document.getElementById('chart-cost'),
      stats.cost_histogram.map((b) => ({ label: fmtNumber(b.start), value: b.count })),
      empty
    );
    renderScatter(
      document.getElementById('chart-scatter'),
      stats.priority_views.map((p) => ({ x: p.priority, y: p.views, label: p.name })),
      empty
    );
  }
};

const startStats = (view, intervalMs) => {
  let issued = 0;
  let applied = 0;
  let inFlight = false;

  const initial = document.getElementById('initial-stats');
  if (initial) {
    renderStats(view, JSON.parse(initial.textContent));
  }

  const tick = async () => {
    if (inFlight) {
      return;
    }
    inFlight = true;
    const seq = ++issued;
    try {
      const res = await fetch('/api/stats');
      const stats = await res.json();
      if (seq > applied) {
        applied = seq;
        renderStats(view, stats);
      }
    } catch (err) {
      setTile('stats-updated', `refresh failed: ${err.message}`);
    } finally {
      inFlight = false;
    }
  };

  setInterval(tick, intervalMs);
};
"#;

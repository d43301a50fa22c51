//! Scripts evaluated inside the page against the Highcharts runtime
//!
//! Every script is an IIFE whose result is `JSON.stringify`-ed, so it crosses
//! the DevTools boundary as a plain string regardless of how the backend
//! serializes remote objects.

use crate::infrastructure::config::CapPolicy;

/// `true` once `Highcharts` exists and has at least one chart instance
pub const CHARTS_READY: &str = r"(() => JSON.stringify(
  typeof Highcharts !== 'undefined' && !!Highcharts.charts &&
  Highcharts.charts.filter(Boolean).length > 0
))()";

/// Clicks the first range-selector button matching `labels`, trying each
/// label across every chart before moving to the next. Returns the matched
/// label or `null`.
#[must_use]
pub fn click_range_button(labels: &[String]) -> String {
    let labels_json = serde_json::to_string(labels).unwrap_or_else(|_| "[]".to_string());
    format!(
        r"(() => {{
  const labels = {labels_json};
  const norm = (s) => String(s || '').toUpperCase().replace(/\s/g, '');
  function clickRange(label) {{
    if (typeof Highcharts === 'undefined' || !Highcharts.charts) return false;
    for (const ch of Highcharts.charts) {{
      if (!ch) continue;
      const rs = ch.rangeSelector;
      if (!rs || !rs.buttons) continue;
      for (let i = 0; i < rs.buttons.length; i++) {{
        const btn = rs.buttons[i];
        if (btn && norm(btn.textStr) === norm(label)) {{
          rs.clickButton(i, true);
          return true;
        }}
      }}
    }}
    return false;
  }}
  for (const label of labels) {{
    if (clickRange(label)) return JSON.stringify(label);
  }}
  return JSON.stringify(null);
}})()"
    )
}

/// Collects `[x, y]` pairs from every non-internal, non-navigator series.
/// Only numeric x/y pairs are emitted.
#[must_use]
pub fn extract_series(point_cap: usize, policy: CapPolicy) -> String {
    let (cap, per_series) = match policy {
        CapPolicy::AfterSeries => (point_cap.to_string(), false),
        CapPolicy::WithinSeries => (point_cap.to_string(), true),
        CapPolicy::Disabled => ("null".to_string(), false),
    };
    format!(
        r"(() => {{
  const results = [];
  const cap = {cap};
  const perSeries = {per_series};
  if (typeof Highcharts === 'undefined' || !Highcharts.charts) return JSON.stringify(results);
  const isOverview = (s) => {{
    const o = s.options || {{}};
    if (o.isInternal) return true;
    const id = String(o.id || '');
    return id === 'navigator' || id.startsWith('highcharts-navigator-series');
  }};
  for (const ch of Highcharts.charts) {{
    if (!ch || !ch.series) continue;
    for (const s of ch.series) {{
      if (!s || !s.points || s.points.length === 0) continue;
      if (isOverview(s)) continue;
      let taken = 0;
      for (const p of s.points) {{
        if (p && typeof p.x === 'number' && typeof p.y === 'number') {{
          results.push([p.x, p.y]);
          taken += 1;
          if (perSeries && cap !== null && taken > cap) return JSON.stringify(results);
        }}
      }}
      if (!perSeries && cap !== null && results.length > cap) return JSON.stringify(results);
    }}
  }}
  return JSON.stringify(results);
}})()"
    )
}

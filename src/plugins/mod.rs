//! Built-in extension modules. Each plugin contributes importers, schema
//! migrations, category seeds, and CLI commands through `PluginHooks`;
//! the core never refers to a plugin by name outside this list.

pub mod bofa;
#[cfg(feature = "gusto")]
pub mod gusto;
pub mod k1;

use crate::hooks::{Plugin, PluginHooks};

pub fn builtin_plugins() -> Vec<Box<dyn Plugin>> {
    vec![
        Box::new(bofa::BofaPlugin),
        #[cfg(feature = "gusto")]
        Box::new(gusto::GustoPlugin),
        Box::new(k1::K1Plugin),
    ]
}

/// Run every built-in plugin's registration against a fresh collector.
pub fn collect_hooks() -> PluginHooks {
    let mut hooks = PluginHooks::new();
    for plugin in builtin_plugins() {
        plugin.register(&mut hooks);
    }
    hooks
}

/// Strip commas, quotes, and currency symbols; parenthesized values are
/// negative. Unparseable input becomes 0.0 (bank exports are messy and a
/// bad cell must not abort the file).
pub(crate) fn parse_amount(raw: &str) -> f64 {
    let s = raw.replace([',', '"', '$'], "");
    let s = s.trim();
    if let Some(inner) = s.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        return -inner.trim().parse::<f64>().unwrap_or(0.0);
    }
    s.parse().unwrap_or(0.0)
}

/// MM/DD/YYYY to ISO 8601, validating against the calendar. Returns None
/// for anything else so malformed rows can be dropped.
pub(crate) fn parse_date_mdy(raw: &str) -> Option<String> {
    let parts: Vec<&str> = raw.trim().split('/').collect();
    if parts.len() != 3 {
        return None;
    }
    let m: u32 = parts[0].parse().ok()?;
    let d: u32 = parts[1].parse().ok()?;
    let y: i32 = parts[2].parse().ok()?;
    chrono::NaiveDate::from_ymd_opt(y, m, d).map(|date| date.format("%Y-%m-%d").to_string())
}

//! Gusto payroll XLSX importer. Aggregates the per-employee detail into
//! one wages row and one employer-taxes row per check date, then
//! categorizes its own rows in a post-import hook so the generic rule
//! pass never sees them.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

use calamine::{Data, Reader};
use rusqlite::Connection;

use crate::error::{Result, TallyError};
use crate::hooks::{Plugin, PluginHooks};
use crate::models::NormalizedRow;
use crate::registry::Importer;

pub struct GustoPlugin;

impl Plugin for GustoPlugin {
    fn name(&self) -> &'static str {
        "gusto"
    }

    fn register(&self, hooks: &mut PluginHooks) {
        hooks.add_importer(Arc::new(GustoPayroll));
    }
}

/// Excel epoch is 1899-12-30 (accounting for the 1900 leap year bug).
pub(crate) fn excel_serial_to_date(serial: f64) -> String {
    let base = chrono::NaiveDate::from_ymd_opt(1899, 12, 30).unwrap();
    let date = base + chrono::Duration::days(serial as i64);
    date.format("%Y-%m-%d").to_string()
}

fn cell_date(cell: &Data) -> Option<String> {
    match cell {
        Data::Float(f) => Some(excel_serial_to_date(*f)),
        Data::Int(i) => Some(excel_serial_to_date(*i as f64)),
        Data::String(s) => Some(s.clone()),
        _ => None,
    }
}

fn cell_amount(cell: &Data) -> Option<f64> {
    match cell {
        Data::Float(f) => Some(*f),
        Data::Int(i) => Some(*i as f64),
        _ => None,
    }
}

pub struct GustoPayroll;

impl Importer for GustoPayroll {
    fn key(&self) -> &'static str {
        "gusto_payroll"
    }

    fn name(&self) -> &'static str {
        "Gusto Payroll"
    }

    fn account_types(&self) -> &'static [&'static str] {
        &["payroll"]
    }

    fn file_extensions(&self) -> &'static [&'static str] {
        &[".xlsx"]
    }

    fn detect(&self, file_path: &Path) -> bool {
        if !file_path
            .extension()
            .is_some_and(|e| e.eq_ignore_ascii_case("xlsx"))
        {
            return false;
        }
        let Ok(workbook) = calamine::open_workbook_auto(file_path) else {
            return false;
        };
        workbook.sheet_names().iter().any(|name| name == "payrolls")
    }

    fn parse(&self, file_path: &Path) -> Result<Vec<NormalizedRow>> {
        let mut workbook = calamine::open_workbook_auto(file_path)
            .map_err(|e| TallyError::Other(format!("Failed to open XLSX: {e}")))?;

        // payrolls sheet: col 3 = check_date, col 7 = gross pay
        let mut wages_by_date: BTreeMap<String, f64> = BTreeMap::new();
        if let Ok(range) = workbook.worksheet_range("payrolls") {
            for row in range.rows().skip(1) {
                if row.len() < 8 {
                    continue;
                }
                let (Some(date), Some(gross)) = (cell_date(&row[3]), cell_amount(&row[7])) else {
                    continue;
                };
                *wages_by_date.entry(date).or_default() += gross;
            }
        }

        // taxes sheet: col 6 = payer (only Employer rows count), col 7 = amount
        let mut taxes_by_date: BTreeMap<String, f64> = BTreeMap::new();
        if let Ok(range) = workbook.worksheet_range("taxes") {
            for row in range.rows().skip(1) {
                if row.len() < 8 {
                    continue;
                }
                match &row[6] {
                    Data::String(payer) if payer == "Employer" => {}
                    _ => continue,
                }
                let (Some(date), Some(amount)) = (cell_date(&row[3]), cell_amount(&row[7])) else {
                    continue;
                };
                *taxes_by_date.entry(date).or_default() += amount;
            }
        }

        let mut rows = Vec::new();
        for (date, total) in &wages_by_date {
            rows.push(NormalizedRow {
                date: date.clone(),
                description: format!("Payroll \u{2014} Wages ({date})"),
                amount: -total.abs(),
            });
        }
        for (date, total) in &taxes_by_date {
            rows.push(NormalizedRow {
                date: date.clone(),
                description: format!("Payroll \u{2014} Employer Taxes ({date})"),
                amount: -total.abs(),
            });
        }
        Ok(rows)
    }

    /// Stamp payroll categories onto the rows this importer just produced,
    /// matched by the same natural key the pipeline dedupes on.
    fn post_import(&self, conn: &Connection, account_id: i64, rows: &[NormalizedRow]) -> Result<()> {
        let mut categories: HashMap<&str, i64> = HashMap::new();
        for name in ["Payroll \u{2014} Wages", "Payroll \u{2014} Taxes", "Payroll \u{2014} Benefits"] {
            let id: std::result::Result<i64, _> =
                conn.query_row("SELECT id FROM categories WHERE name = ?1", [name], |r| r.get(0));
            if let Ok(id) = id {
                categories.insert(name, id);
            }
        }

        let mut stmt = conn.prepare_cached(
            "UPDATE transactions SET category_id = ?1, is_flagged = 0, flag_reason = NULL \
             WHERE account_id = ?2 AND date = ?3 AND amount = ?4 AND description = ?5",
        )?;
        for row in rows {
            let category_id = if row.description.contains("Wages") {
                categories.get("Payroll \u{2014} Wages")
            } else if row.description.contains("Taxes") {
                categories.get("Payroll \u{2014} Taxes")
            } else if row.description.contains("Benefits") {
                categories.get("Payroll \u{2014} Benefits")
            } else {
                None
            };
            if let Some(&category_id) = category_id {
                stmt.execute(rusqlite::params![
                    category_id,
                    account_id,
                    row.date,
                    row.amount,
                    row.description
                ])?;
            }
        }
        Ok(())
    }
}

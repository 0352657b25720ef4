//! Bank of America export formats: checking, credit card, and line of
//! credit. All three carry preamble rows before the real header, so the
//! parsers scan for the header instead of trusting row positions.

use std::path::Path;
use std::sync::Arc;

use csv::StringRecord;

use super::{parse_amount, parse_date_mdy};
use crate::error::Result;
use crate::hooks::{Plugin, PluginHooks};
use crate::models::NormalizedRow;
use crate::registry::Importer;

pub struct BofaPlugin;

impl Plugin for BofaPlugin {
    fn name(&self) -> &'static str {
        "bofa"
    }

    fn register(&self, hooks: &mut PluginHooks) {
        hooks.add_importer(Arc::new(BofaChecking));
        hooks.add_importer(Arc::new(BofaCreditCard));
        hooks.add_importer(Arc::new(BofaLineOfCredit));
    }
}

fn csv_records(file_path: &Path) -> Result<Vec<StringRecord>> {
    let file = std::fs::File::open(file_path)?;
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(std::io::BufReader::new(file));
    // A row that fails CSV parsing is dropped, not fatal.
    Ok(rdr.records().filter_map(|r| r.ok()).collect())
}

fn is_checking_header(record: &StringRecord) -> bool {
    record.len() >= 4 && record[0].trim() == "Date" && record[1].contains("Description")
}

// ---------------------------------------------------------------------------
// Checking: Date,Description,Amount,Running Bal. — amounts pre-signed
// ---------------------------------------------------------------------------

pub struct BofaChecking;

impl Importer for BofaChecking {
    fn key(&self) -> &'static str {
        "bofa_checking"
    }

    fn name(&self) -> &'static str {
        "Bank of America Checking"
    }

    fn account_types(&self) -> &'static [&'static str] {
        &["checking"]
    }

    fn file_extensions(&self) -> &'static [&'static str] {
        &[".csv"]
    }

    fn detect(&self, file_path: &Path) -> bool {
        csv_records(file_path)
            .map(|records| records.iter().any(is_checking_header))
            .unwrap_or(false)
    }

    fn parse(&self, file_path: &Path) -> Result<Vec<NormalizedRow>> {
        let mut rows = Vec::new();
        let mut in_data = false;
        for record in csv_records(file_path)? {
            if !in_data {
                in_data = is_checking_header(&record);
                continue;
            }
            if record.len() < 3 || record[0].trim().is_empty() {
                continue;
            }
            let Some(date) = parse_date_mdy(&record[0]) else {
                continue;
            };
            let description = record[1].trim().to_string();
            if description.is_empty() || description.contains("Beginning balance") {
                continue;
            }
            rows.push(NormalizedRow {
                date,
                description,
                amount: parse_amount(&record[2]),
            });
        }
        Ok(rows)
    }
}

// ---------------------------------------------------------------------------
// Credit card: columns located from the header row; amounts are unsigned
// and the Type column (D = charge, C = credit) carries the sign
// ---------------------------------------------------------------------------

struct CardColumns {
    date: usize,
    desc: usize,
    amount: usize,
    txn_type: usize,
}

fn locate_card_columns(record: &StringRecord) -> CardColumns {
    let mut cols = CardColumns { date: 3, desc: 5, amount: 6, txn_type: 9 };
    for (i, field) in record.iter().enumerate() {
        match field.trim() {
            "Posting Date" => cols.date = i,
            "Payee" => cols.desc = i,
            "Amount" => cols.amount = i,
            "Type" => cols.txn_type = i,
            _ => {}
        }
    }
    cols
}

pub struct BofaCreditCard;

impl Importer for BofaCreditCard {
    fn key(&self) -> &'static str {
        "bofa_credit_card"
    }

    fn name(&self) -> &'static str {
        "Bank of America Credit Card"
    }

    fn account_types(&self) -> &'static [&'static str] {
        &["credit_card"]
    }

    fn file_extensions(&self) -> &'static [&'static str] {
        &[".csv"]
    }

    fn detect(&self, file_path: &Path) -> bool {
        std::fs::read_to_string(file_path)
            .map(|content| content.contains("CardHolder Name"))
            .unwrap_or(false)
    }

    fn parse(&self, file_path: &Path) -> Result<Vec<NormalizedRow>> {
        let mut rows = Vec::new();
        let mut located: Option<CardColumns> = None;
        for record in csv_records(file_path)? {
            let cols = match &located {
                Some(cols) => cols,
                None => {
                    if record.iter().any(|f| f.contains("Posting Date")) {
                        located = Some(locate_card_columns(&record));
                    }
                    continue;
                }
            };
            let min_len = cols.date.max(cols.desc).max(cols.amount).max(cols.txn_type) + 1;
            if record.len() < min_len || record[2].trim().is_empty() {
                continue;
            }
            let Some(date) = parse_date_mdy(&record[cols.date]) else {
                continue;
            };
            let amount = parse_amount(&record[cols.amount]);
            let amount = if record[cols.txn_type].trim() == "D" {
                -amount.abs()
            } else {
                amount.abs()
            };
            rows.push(NormalizedRow {
                date,
                description: record[cols.desc].trim().to_string(),
                amount,
            });
        }
        Ok(rows)
    }
}

// ---------------------------------------------------------------------------
// Line of credit: same layout as the card export but amounts are
// pre-signed from the bank's perspective, so charges come in positive
// ---------------------------------------------------------------------------

pub struct BofaLineOfCredit;

impl Importer for BofaLineOfCredit {
    fn key(&self) -> &'static str {
        "bofa_line_of_credit"
    }

    fn name(&self) -> &'static str {
        "Bank of America Line of Credit"
    }

    fn account_types(&self) -> &'static [&'static str] {
        &["line_of_credit"]
    }

    fn file_extensions(&self) -> &'static [&'static str] {
        &[".csv"]
    }

    // No detector: differentiated from the card layout by account type.

    fn parse(&self, file_path: &Path) -> Result<Vec<NormalizedRow>> {
        let mut rows = Vec::new();
        let mut located: Option<CardColumns> = None;
        for record in csv_records(file_path)? {
            let cols = match &located {
                Some(cols) => cols,
                None => {
                    if record.iter().any(|f| f.contains("Posting Date")) {
                        located = Some(locate_card_columns(&record));
                    }
                    continue;
                }
            };
            let min_len = cols.date.max(cols.desc).max(cols.amount) + 1;
            if record.len() < min_len || record[2].trim().is_empty() {
                continue;
            }
            let Some(date) = parse_date_mdy(&record[cols.date]) else {
                continue;
            };
            rows.push(NormalizedRow {
                date,
                description: record[cols.desc].trim().to_string(),
                amount: -parse_amount(&record[cols.amount]),
            });
        }
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_checking_skips_preamble_and_balance_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "checking.csv", "\
Account Name: Biz Checking
Account Number: ****1234

Date,Description,Amount,Running Bal.
01/15/2025,ADOBE CREATIVE,-50.00,950.00
01/16/2025,Beginning balance,1000.00,1000.00
01/17/2025,STRIPE PAYOUT,\"2,500.00\",\"3,450.00\"
");
        let rows = BofaChecking.parse(&path).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].description, "ADOBE CREATIVE");
        assert_eq!(rows[0].amount, -50.0);
        assert_eq!(rows[1].amount, 2500.0);
    }

    #[test]
    fn test_checking_drops_malformed_dates() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "checking.csv", "\
Date,Description,Amount,Running Bal.
not-a-date,GHOST ROW,-1.00,0.00
01/17/2025,REAL ROW,-2.00,0.00
");
        let rows = BofaChecking.parse(&path).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].description, "REAL ROW");
    }

    #[test]
    fn test_checking_detector() {
        let dir = tempfile::tempdir().unwrap();
        let yes = write(dir.path(), "yes.csv", "Date,Description,Amount,Running Bal.\n");
        let no = write(dir.path(), "no.csv", "Posting Date,Payee,Amount\n");
        assert!(BofaChecking.detect(&yes));
        assert!(!BofaChecking.detect(&no));
    }

    const CARD_CSV: &str = "\
CardHolder Name,JANE DOE
,,,,,,,,,
A,B,Ref,Posting Date,X,Payee,Amount,Y,Z,Type
x,y,123,01/15/2025,q,UNITED AIRLINES BOOKING,450.00,a,b,D
x,y,124,01/20/2025,q,PAYMENT THANK YOU,450.00,a,b,C
";

    #[test]
    fn test_credit_card_signs_from_type_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "card.csv", CARD_CSV);
        let rows = BofaCreditCard.parse(&path).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].amount, -450.0); // D = charge
        assert_eq!(rows[1].amount, 450.0); // C = credit
    }

    #[test]
    fn test_credit_card_detector_uses_cardholder_marker() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "card.csv", CARD_CSV);
        assert!(BofaCreditCard.detect(&path));
    }

    #[test]
    fn test_line_of_credit_negates_presigned_amounts() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "loc.csv", "\
A,B,Ref,Posting Date,X,Payee,Amount
x,y,123,02/01/2025,q,DRAW FOR PAYROLL,1000.00
x,y,124,02/15/2025,q,PAYMENT RECEIVED,-400.00
");
        let rows = BofaLineOfCredit.parse(&path).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].amount, -1000.0); // charge becomes outflow
        assert_eq!(rows[1].amount, 400.0); // payment becomes inflow
    }
}

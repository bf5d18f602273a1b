// src/fmp/transform.rs
use crate::fmp::client::{Statement, StatementRow};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

/// Output metric code ← FMP field name.
pub const METRIC_MAP: &[(&str, &str)] = &[
    ("sales", "revenue"),
    ("ebit", "operatingIncome"),
    ("ebitda", "ebitda"),
    ("net_income", "netIncome"),
    ("ocf", "operatingCashFlow"),
    ("capex", "capitalExpenditure"),
    ("free_cf", "freeCashFlow"),
    ("basic_shares", "sharesOutstanding"),
    ("fd_shares", "weightedAverageDilutedSharesOutstanding"),
    ("market_cap", "marketCap"),
    ("enterprise_value", "enterpriseValue"),
    ("total_debt", "totalDebt"),
    ("cash_equivalents", "cashAndShortTermInvestments"),
    ("ev_ebitda", "enterpriseValueOverEBITDA"),
    ("ev_sales", "evToSales"),
    ("price_earnings", "peRatio"),
];

/// One observation in the tall export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TallRow {
    #[serde(rename = "FY")]
    pub fiscal_year: i32,
    pub metric: String,
    pub value: f64,
}

/// The `years` completed years before `current_year`, newest first.
pub fn fiscal_window(current_year: i32, years: u32) -> Vec<i32> {
    (1..=years as i32).map(|back| current_year - back).collect()
}

/// Reads a numeric field. FMP sends numbers, occasionally as strings; nulls
/// and anything unparseable are treated as missing.
fn number(row: &StatementRow, field: &str) -> Option<f64> {
    let value: Option<f64> = match row.get(field)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    value.filter(|v| v.is_finite())
}

/// Fiscal year of a period: `calendarYear` where the statement carries it,
/// otherwise the year prefix of `date` (`YYYY-MM-DD`).
pub fn fiscal_year(statement: Statement, row: &StatementRow) -> Option<i32> {
    if statement.uses_calendar_year() {
        let calendar_year = match row.get("calendarYear") {
            Some(Value::String(s)) => s.trim().parse().ok(),
            Some(Value::Number(n)) => n.as_i64().and_then(|y| i32::try_from(y).ok()),
            _ => None,
        };
        if calendar_year.is_some() {
            return calendar_year;
        }
    }

    row.get("date")
        .and_then(Value::as_str)
        .and_then(|date| date.get(..4))
        .and_then(|year| year.parse().ok())
}

/// Metrics computed from other fields of the same period. Not part of the
/// default export; `to_tall` adds them only when asked to.
fn derived(statement: Statement, row: &StatementRow) -> Vec<(&'static str, f64)> {
    let mut out = Vec::new();
    match statement {
        Statement::Enterprise => {
            let market_cap = number(row, "marketCap");
            let diluted = number(row, "weightedAverageDilutedSharesOutstanding");
            let basic = number(row, "sharesOutstanding").filter(|shares| *shares != 0.0);
            if let (Some(cap), Some(diluted), Some(basic)) = (market_cap, diluted, basic) {
                out.push(("fd_market_cap", cap * diluted / basic));
            }
        }
        Statement::Balance => {
            if let (Some(debt), Some(cash)) = (number(row, "totalDebt"), number(row, "cashAndShortTermInvestments")) {
                out.push(("net_debt", debt - cash));
            }
        }
        _ => {}
    }
    out
}

/// Melts the fetched statements into `(FY, metric, value)` rows.
///
/// Periods outside `window` are dropped. When several statements (or periods)
/// supply the same `(FY, metric)`, the first in statement order wins, so the
/// export never carries two values for one upsert key. Output is sorted by
/// metric, then FY newest first.
///
/// Only `METRIC_MAP` codes are emitted unless `include_derived` is set, in
/// which case `fd_market_cap` and `net_debt` are added where computable.
pub fn to_tall(
    statements: &[(Statement, Vec<StatementRow>)],
    window: &[i32],
    include_derived: bool,
) -> Vec<TallRow> {
    let mut seen: HashSet<(i32, &'static str)> = HashSet::new();
    let mut rows = Vec::new();

    for (statement, periods) in statements {
        for period in periods {
            let Some(fy) = fiscal_year(*statement, period) else {
                tracing::trace!("Skipping {} period without a year", statement.path());
                continue;
            };
            if !window.contains(&fy) {
                continue;
            }

            let mapped = METRIC_MAP
                .iter()
                .filter_map(|(metric, field)| number(period, field).map(|value| (*metric, value)));
            let extra = if include_derived { derived(*statement, period) } else { Vec::new() };

            for (metric, value) in mapped.chain(extra) {
                if seen.insert((fy, metric)) {
                    rows.push(TallRow { fiscal_year: fy, metric: metric.to_string(), value });
                } else {
                    tracing::trace!("{} FY{} already taken, ignoring {} value", metric, fy, statement.path());
                }
            }
        }
    }

    rows.sort_by(|a, b| a.metric.cmp(&b.metric).then(b.fiscal_year.cmp(&a.fiscal_year)));
    rows
}

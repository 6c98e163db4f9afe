use gridsync_model::{CellValue, FieldType};
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

const DATE_KEYWORDS: &[&str] = &[
    "date", "time", "created", "updated", "modified", "birthday", "dob", "deadline", "due",
    "timestamp", "start", "end", "expir",
];
const CURRENCY_KEYWORDS: &[&str] = &[
    "price", "cost", "amount", "total", "fee", "salary", "revenue", "budget", "payment", "balance",
    "income", "expense", "tax", "discount", "rate",
];
const BOOLEAN_KEYWORDS: &[&str] = &[
    "active",
    "enabled",
    "completed",
    "done",
    "verified",
    "approved",
    "status",
    "paid",
    "available",
    "visible",
    "published",
    "archived",
    "deleted",
    "confirmed",
    "toggle",
];
const NUMBER_KEYWORDS: &[&str] = &[
    "count",
    "quantity",
    "qty",
    "number",
    "num",
    "age",
    "score",
    "rating",
    "rank",
    "index",
    "size",
    "weight",
    "height",
    "length",
    "width",
    "percent",
    "percentage",
];
const CATEGORY_KEYWORDS: &[&str] = &["category", "description", "item", "type", "label"];
const PRODUCT_ID_KEYWORDS: &[&str] =
    &["product id", "productid", "barcode", "sku", "item id", "itemid"];

const BOOLEAN_VALUES: &[&str] = &[
    "true", "false", "yes", "no", "1", "0", "y", "n", "on", "off",
];

/// Assigns a [`FieldType`] to each column.
///
/// Per column, strict precedence:
/// 1. an explicit user override,
/// 2. a formula cell (`=`-prefixed) in the parallel formula row,
/// 3. the sample-value verdict when the sample is non-blank and decisive,
/// 4. the header-keyword verdict,
/// 5. `Text`.
///
/// Pure: identical input always yields the identical types.
pub fn infer_field_types(
    headers: &[String],
    sample_row: &[CellValue],
    formula_row: Option<&[Option<String>]>,
    overrides: &BTreeMap<usize, FieldType>,
) -> Vec<FieldType> {
    let column_count = headers.len().max(sample_row.len());
    (0..column_count)
        .map(|col| {
            if let Some(ty) = overrides.get(&col) {
                return *ty;
            }
            let formula_cell = formula_row.and_then(|r| r.get(col)).and_then(Option::as_deref);
            if formula_cell.is_some_and(|f| f.starts_with('=')) {
                return FieldType::Formula;
            }
            let header = headers
                .get(col)
                .map(|h| h.trim().to_lowercase())
                .unwrap_or_default();
            let sample = sample_row.get(col).map(|c| c.as_trimmed()).unwrap_or_default();
            infer_column(&header, sample)
        })
        .collect()
}

fn infer_column(header: &str, sample: &str) -> FieldType {
    let header_hint = infer_from_header(header);

    // No data in the sample: the header is the only signal.
    if sample.is_empty() {
        return header_hint;
    }

    let data_hint = infer_from_sample(sample);
    if data_hint != FieldType::Text {
        return data_hint;
    }
    if header_hint != FieldType::Text {
        return header_hint;
    }
    FieldType::Text
}

fn infer_from_header(header: &str) -> FieldType {
    let contains_any = |keywords: &[&str]| keywords.iter().any(|k| header.contains(k));
    if contains_any(DATE_KEYWORDS) {
        FieldType::Date
    } else if contains_any(CURRENCY_KEYWORDS) {
        FieldType::Currency
    } else if contains_any(BOOLEAN_KEYWORDS) {
        FieldType::Boolean
    } else if contains_any(NUMBER_KEYWORDS) {
        FieldType::Number
    } else if contains_any(PRODUCT_ID_KEYWORDS) || contains_any(CATEGORY_KEYWORDS) {
        FieldType::Text
    } else {
        FieldType::Text
    }
}

fn infer_from_sample(sample: &str) -> FieldType {
    if sample.is_empty() {
        return FieldType::Text;
    }
    if BOOLEAN_VALUES.contains(&sample.to_lowercase().as_str()) {
        return FieldType::Boolean;
    }

    static CURRENCY_RE: OnceLock<Regex> = OnceLock::new();
    static NUMBER_RE: OnceLock<Regex> = OnceLock::new();
    static DATE_RES: OnceLock<Vec<Regex>> = OnceLock::new();

    let has_currency_symbol = sample
        .chars()
        .next()
        .is_some_and(|c| "$€£¥₹".contains(c));
    let currency = CURRENCY_RE.get_or_init(|| {
        Regex::new(r"^[$€£¥₹]?\s*-?\d{1,3}(,\d{3})*(\.\d{1,2})?$").expect("valid regex")
    });
    if has_currency_symbol && currency.is_match(sample) {
        return FieldType::Currency;
    }

    let dates = DATE_RES.get_or_init(|| {
        [
            r"^\d{4}-\d{2}-\d{2}$",                 // 2024-01-15
            r"^\d{1,2}/\d{1,2}/\d{2,4}$",           // 1/15/2024
            r"^\d{1,2}-\d{1,2}-\d{2,4}$",           // 15-01-2024
            r"^\d{1,2}\s+\w{3,9}\s+\d{2,4}$",       // 15 January 2024
            r"^\w{3,9}\s+\d{1,2},?\s+\d{2,4}$",     // January 15, 2024
            r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}.*$",   // ISO 8601 timestamp
        ]
        .iter()
        .map(|p| Regex::new(p).expect("valid regex"))
        .collect()
    });
    if dates.iter().any(|re| re.is_match(sample)) {
        return FieldType::Date;
    }

    let number =
        NUMBER_RE.get_or_init(|| Regex::new(r"^-?\d{1,3}(,\d{3})*(\.\d+)?$").expect("valid regex"));
    if number.is_match(sample) {
        return FieldType::Number;
    }
    FieldType::Text
}

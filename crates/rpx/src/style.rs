//! 🎨 Style provider: a lookup table wearing a trench coat.
//!
//! Maps column types to header styles and conditional highlight rules. No state, no I/O,
//! no opinions beyond the ones hardcoded below. The renderer decides what "grey" means.

use std::sync::LazyLock;

use regex::Regex;

use crate::common::Value;
use crate::schema::ColumnType;

pub const HEADER_BACKGROUND: &str = "#616161";
pub const HEADER_TEXT: &str = "#FFFFFF";
pub const ODD_ROW_BACKGROUND: &str = "#F3F2F2";
pub const BORDER_COLOR: &str = "#C4BABA";
pub const HORIZONTAL_PADDING: u32 = 20;
pub const VERTICAL_PADDING: u32 = 5;

// -- 🔍 "12 - 40", "-", "7-": the numeric range heuristic. odd, narrow, and load-bearing.
static NUMERIC_RANGE_TEXT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]*\s*-\s*[0-9]*$").expect("valid numeric range regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HorizontalAlign {
    Left,
    Center,
    Right,
}

/// 🏷️ How a column header looks. Tokens, not pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderStyle {
    pub align: HorizontalAlign,
    pub padding_left: u32,
    pub padding_right: u32,
    pub background: &'static str,
    pub text_color: &'static str,
}

/// 🏷️ Header style for a column type. Numbers lean right, text sits in the middle.
pub fn header_style(column_type: ColumnType) -> HeaderStyle {
    let (align, padding_left, padding_right) = match column_type {
        ColumnType::Integer | ColumnType::Long | ColumnType::Float | ColumnType::Double => {
            (HorizontalAlign::Right, 0, HORIZONTAL_PADDING)
        }
        ColumnType::String => (HorizontalAlign::Center, HORIZONTAL_PADDING, HORIZONTAL_PADDING),
        ColumnType::Boolean => (HorizontalAlign::Center, 0, 0),
    };
    HeaderStyle {
        align,
        padding_left,
        padding_right,
        background: HEADER_BACKGROUND,
        text_color: HEADER_TEXT,
    }
}

/// 🚦 A highlight rule evaluated per cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConditionalStyle {
    /// Numeric value within `[min, max]` gets right-aligned.
    NumericRange { min: f64, max: f64 },
    /// Text shaped like `digits - digits` gets centered.
    NumericRangeText,
}

impl ConditionalStyle {
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            ConditionalStyle::NumericRange { min, max } => value
                .as_f64()
                .is_some_and(|number| number >= *min && number <= *max),
            ConditionalStyle::NumericRangeText => match value {
                Value::Null => false,
                other => NUMERIC_RANGE_TEXT.is_match(&other.to_string()),
            },
        }
    }

    pub fn align(&self) -> HorizontalAlign {
        match self {
            ConditionalStyle::NumericRange { .. } => HorizontalAlign::Right,
            ConditionalStyle::NumericRangeText => HorizontalAlign::Center,
        }
    }
}

/// 🚦 Highlight rule for a column type. Booleans get nothing. Booleans never get anything.
pub fn conditional_style(column_type: ColumnType) -> Option<ConditionalStyle> {
    match column_type {
        ColumnType::Integer | ColumnType::Long | ColumnType::Float | ColumnType::Double => {
            Some(ConditionalStyle::NumericRange {
                min: 0.0,
                max: f64::from(i32::MAX),
            })
        }
        ColumnType::String => Some(ConditionalStyle::NumericRangeText),
        ColumnType::Boolean => None,
    }
}

/// 🧾 Table-wide defaults applied when a report is laid out as a plain table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableStyle {
    pub print_background_on_odd_rows: bool,
    pub odd_row_background: &'static str,
    pub border_color: &'static str,
    pub horizontal_padding: u32,
    pub vertical_padding: u32,
    pub use_full_page_width: bool,
}

impl Default for TableStyle {
    fn default() -> Self {
        Self {
            print_background_on_odd_rows: true,
            odd_row_background: ODD_ROW_BACKGROUND,
            border_color: BORDER_COLOR,
            horizontal_padding: HORIZONTAL_PADDING,
            vertical_padding: VERTICAL_PADDING,
            use_full_page_width: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_one_where_numbers_lean_right_and_words_stay_centered() {
        assert_eq!(header_style(ColumnType::Long).align, HorizontalAlign::Right);
        assert_eq!(header_style(ColumnType::String).align, HorizontalAlign::Center);
        assert_eq!(header_style(ColumnType::String).padding_left, HORIZONTAL_PADDING);
        assert_eq!(header_style(ColumnType::Boolean).padding_right, 0);
    }

    #[test]
    fn the_one_where_the_numeric_rule_stops_at_max_int() {
        let rule = conditional_style(ColumnType::Integer).expect("numeric columns have a rule");
        assert!(rule.matches(&Value::Int(0)));
        assert!(rule.matches(&Value::Long(i64::from(i32::MAX))));
        assert!(!rule.matches(&Value::Long(i64::from(i32::MAX) + 1)));
        assert!(!rule.matches(&Value::Double(-0.5)));
    }

    #[test]
    fn the_one_where_the_range_heuristic_is_exactly_as_odd_as_advertised() {
        let rule = conditional_style(ColumnType::String).expect("strings have a rule");
        assert!(rule.matches(&Value::String("10 - 20".into())));
        assert!(rule.matches(&Value::String("-".into())));
        assert!(rule.matches(&Value::String("7-".into())));
        assert!(!rule.matches(&Value::String("ten - twenty".into())));
        assert!(!rule.matches(&Value::String("10 - 20 - 30".into())));
    }

    #[test]
    fn the_one_where_booleans_get_no_highlight() {
        assert!(conditional_style(ColumnType::Boolean).is_none());
    }
}

//! Pure parsing of channel input into typed answer values.

use super::domain::{AnswerValue, SelectionPayload};

/// Longest free-text answer accepted, in characters.
pub const FREE_TEXT_MAX_CHARS: usize = 1000;

fn tokens(text: &str) -> Vec<&str> {
    text.split(|c: char| c == ',' || c == ';' || c.is_whitespace())
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .collect()
}

fn push_distinct<T: PartialEq>(values: &mut Vec<T>, value: T) {
    if !values.contains(&value) {
        values.push(value);
    }
}

/// Parses a numeric-scale answer typed by the respondent.
///
/// Tokens are separated by commas, semicolons or whitespace. Any non-numeric or out-of-range
/// token rejects the whole input. Single-select input must hold exactly one token; multi-select
/// values are deduplicated in first-seen order and collapse to a bare number when one remains.
pub fn parse_answer(text: &str, multi_select: bool, min: i32, max: i32) -> Option<AnswerValue> {
    let parts = tokens(text);
    if parts.is_empty() {
        return None;
    }

    let mut numbers = Vec::with_capacity(parts.len());
    for part in parts {
        let number = part.parse::<i32>().ok()?;
        if number < min || number > max {
            return None;
        }
        numbers.push(number);
    }

    if !multi_select {
        return match numbers.as_slice() {
            [single] => Some(AnswerValue::Numeric(*single)),
            _ => None,
        };
    }

    let mut distinct = Vec::with_capacity(numbers.len());
    for number in numbers {
        push_distinct(&mut distinct, number);
    }
    AnswerValue::from_distinct(distinct)
}

/// Integer carried by a button or list selection, if any.
pub fn extract_selection(payload: &SelectionPayload) -> Option<i32> {
    payload.raw_value()?.parse::<i32>().ok()
}

/// Selection path of [`parse_answer`]: the extracted value must fall inside `[min, max]`.
pub fn parse_selection(payload: &SelectionPayload, min: i32, max: i32) -> Option<AnswerValue> {
    let value = extract_selection(payload)?;
    (min..=max)
        .contains(&value)
        .then_some(AnswerValue::Numeric(value))
}

/// Parses 1-based option indices for a sub-question, returning 0-based positions.
pub fn parse_option_indices(
    text: &str,
    option_count: usize,
    allow_multiple: bool,
) -> Option<Vec<usize>> {
    if option_count == 0 {
        return None;
    }

    let parts = tokens(text);
    if parts.is_empty() {
        return None;
    }

    let mut indices = Vec::with_capacity(parts.len());
    for part in parts {
        let index = part.parse::<usize>().ok()?;
        if index < 1 || index > option_count {
            return None;
        }
        push_distinct(&mut indices, index - 1);
    }

    if !allow_multiple && indices.len() > 1 {
        return None;
    }
    Some(indices)
}

/// Sub-question selection delivered as a button/list payload.
pub fn parse_option_selection(payload: &SelectionPayload, option_count: usize) -> Option<usize> {
    let index = usize::try_from(extract_selection(payload)?).ok()?;
    (index >= 1 && index <= option_count).then(|| index - 1)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FreeTextRejection {
    Empty,
    TooLong,
}

pub fn parse_free_text(text: &str) -> Result<&str, FreeTextRejection> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(FreeTextRejection::Empty);
    }
    if trimmed.chars().count() > FREE_TEXT_MAX_CHARS {
        return Err(FreeTextRejection::TooLong);
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn single_select_accepts_one_value() {
        assert_eq!(parse_answer(" 3 ", false, 1, 5), Some(AnswerValue::Numeric(3)));
        assert_eq!(parse_answer("3,4", false, 1, 5), None);
        assert_eq!(parse_answer("", false, 1, 5), None);
    }

    #[test]
    fn multi_select_dedupes_in_order() {
        assert_eq!(
            parse_answer("3; 1 3,2", true, 1, 5),
            Some(AnswerValue::MultiNumeric(vec![3, 1, 2]))
        );
        assert_eq!(parse_answer("2,2", true, 1, 5), Some(AnswerValue::Numeric(2)));
    }

    #[test]
    fn rejects_non_numeric_and_out_of_range_tokens() {
        assert_eq!(parse_answer("2, x", true, 1, 5), None);
        assert_eq!(parse_answer("0", false, 1, 5), None);
        assert_eq!(parse_answer("1,6", true, 1, 5), None);
        assert_eq!(parse_answer("0", false, 0, 4), Some(AnswerValue::Numeric(0)));
    }

    #[test]
    fn selection_uses_payload_keys_and_range() {
        let payload = SelectionPayload {
            button_payload: Some("4".to_string()),
            button_text: Some("Sempre".to_string()),
            ..SelectionPayload::default()
        };
        assert_eq!(extract_selection(&payload), Some(4));
        assert_eq!(parse_selection(&payload, 0, 4), Some(AnswerValue::Numeric(4)));
        assert_eq!(parse_selection(&payload, 0, 3), None);
    }

    #[test]
    fn option_indices_respect_response_type() {
        assert_eq!(parse_option_indices("1 3", 4, true), Some(vec![0, 2]));
        assert_eq!(parse_option_indices("1 3", 4, false), None);
        assert_eq!(parse_option_indices("2,2", 4, false), Some(vec![1]));
        assert_eq!(parse_option_indices("5", 4, true), None);
        assert_eq!(parse_option_indices("1", 0, true), None);
    }

    #[test]
    fn free_text_bounds() {
        assert_eq!(parse_free_text("  ok "), Ok("ok"));
        assert_eq!(parse_free_text("   "), Err(FreeTextRejection::Empty));
        let long = "a".repeat(FREE_TEXT_MAX_CHARS + 1);
        assert_eq!(parse_free_text(&long), Err(FreeTextRejection::TooLong));
        let limit = "é".repeat(FREE_TEXT_MAX_CHARS);
        assert!(parse_free_text(&limit).is_ok());
    }

    proptest! {
        #[test]
        fn accepted_values_stay_in_range(
            values in proptest::collection::vec(-3i32..10, 1..6),
            multi in any::<bool>(),
        ) {
            let text = values
                .iter()
                .map(i32::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            if let Some(parsed) = parse_answer(&text, multi, 1, 5) {
                prop_assert!(parsed.within(1, 5));
            }
        }

        #[test]
        fn out_of_range_token_rejects_input(
            valid in proptest::collection::vec(1i32..=5, 0..4),
            bad in prop_oneof![-50i32..1, 6i32..50],
        ) {
            let mut parts: Vec<String> = valid.iter().map(i32::to_string).collect();
            parts.push(bad.to_string());
            prop_assert_eq!(parse_answer(&parts.join(" "), true, 1, 5), None);
        }

        #[test]
        fn non_numeric_token_rejects_input(
            valid in proptest::collection::vec(1i32..=5, 0..4),
            word in "[a-z]{1,6}",
        ) {
            let mut parts: Vec<String> = valid.iter().map(i32::to_string).collect();
            parts.insert(0, word);
            prop_assert_eq!(parse_answer(&parts.join(";"), true, 1, 5), None);
        }
    }
}

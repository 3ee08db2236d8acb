//! Locale-aware price and number parsing.

use std::borrow::Cow;

use crate::patterns::{
    CURRENCY_MARK, DIGIT_GROUP_GAP, EUROPEAN_PRICE, NUMERIC_RUN, RATING_VALUE, US_PRICE,
};

/// Parse a displayed price into a number.
///
/// Understands European (`1.234,56`) and US (`1,234.56`) separators. Input
/// that cannot be read as a price yields `0.0`, never `NaN`. When several
/// numbers appear, the one beside a currency mark wins.
///
/// ```rust
/// use product_extract::normalize::parse_price;
///
/// assert!((parse_price("1.234,56 €") - 1234.56).abs() < 1e-9);
/// assert!((parse_price("$29.99") - 29.99).abs() < 1e-9);
/// assert!((parse_price("2 x 19,99 €") - 19.99).abs() < 1e-9);
/// assert_eq!(parse_price("Currently unavailable"), 0.0);
/// ```
#[must_use]
pub fn parse_price(text: &str) -> f64 {
    let joined = join_digit_groups(text);
    let Some(run) = price_run(&joined) else {
        return 0.0;
    };
    let run = run.trim_end_matches(['.', ',']);

    let normalized = if EUROPEAN_PRICE.is_match(run) {
        run.replace(['.', ' ', '\''], "").replace(',', ".")
    } else if US_PRICE.is_match(run) {
        run.replace(',', "")
    } else if run.parse::<f64>().is_ok() {
        run.to_string()
    } else if run.matches(',').count() == 1 && !run.contains('.') {
        run.replace(',', ".")
    } else {
        run.chars().filter(char::is_ascii_digit).collect()
    };

    finite_or_zero(normalized.parse::<f64>().unwrap_or(0.0))
}

/// Parse a count such as `"1,234 ratings"` or `"12 345"` into an integer.
#[must_use]
pub fn parse_count(text: &str) -> u64 {
    let Some(run) = NUMERIC_RUN.find(text) else {
        return 0;
    };
    let digits: String = run.as_str().chars().filter(char::is_ascii_digit).collect();
    digits.parse().unwrap_or(0)
}

/// Parse a star rating such as `"4,5 out of 5"`.
#[must_use]
pub fn parse_rating(text: &str) -> Option<f64> {
    let captured = RATING_VALUE.captures(text)?.get(1)?.as_str().replace(',', ".");
    captured.parse::<f64>().ok().filter(|rating| rating.is_finite())
}

/// Close thousands gaps so `1 234,56` reads as one run. Gaps chain
/// (`1 234 567`), and a match consumes the digit before the next gap.
fn join_digit_groups(text: &str) -> Cow<'_, str> {
    let mut joined = Cow::Borrowed(text);
    while DIGIT_GROUP_GAP.is_match(&joined) {
        joined = Cow::Owned(DIGIT_GROUP_GAP.replace_all(&joined, "$1$2").into_owned());
    }
    joined
}

/// The numeric run touching a currency mark, else the first one.
fn price_run(text: &str) -> Option<&str> {
    let runs: Vec<_> = NUMERIC_RUN.find_iter(text).collect();
    runs.iter()
        .find(|run| {
            let before = text[..run.start()].trim_end();
            let after = text[run.end()..].trim_start();
            let leads = CURRENCY_MARK
                .find_iter(before)
                .last()
                .is_some_and(|mark| mark.end() == before.len());
            leads || CURRENCY_MARK.find(after).is_some_and(|mark| mark.start() == 0)
        })
        .or_else(|| runs.first())
        .map(|run| run.as_str())
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() && value >= 0.0 {
        value
    } else {
        0.0
    }
}

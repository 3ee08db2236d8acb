//! Currency inference from hostnames and visible page text.

/// Hostname suffix to ISO 4217 code. Longer suffixes come first so that
/// `.com.au` wins over `.com`.
const HOST_CURRENCIES: &[(&str, &str)] = &[
    (".co.uk", "GBP"),
    (".com.au", "AUD"),
    (".co.jp", "JPY"),
    (".com.br", "BRL"),
    (".com.mx", "MXN"),
    (".com.tr", "TRY"),
    (".fr", "EUR"),
    (".de", "EUR"),
    (".it", "EUR"),
    (".es", "EUR"),
    (".nl", "EUR"),
    (".be", "EUR"),
    (".at", "EUR"),
    (".ie", "EUR"),
    (".pt", "EUR"),
    (".uk", "GBP"),
    (".ca", "CAD"),
    (".in", "INR"),
    (".ch", "CHF"),
    (".pl", "PLN"),
    (".se", "SEK"),
    (".com", "USD"),
];

/// Currency glyphs in scan order. Prefixed dollar forms precede the bare `$`.
const TEXT_CURRENCIES: &[(&str, &str)] = &[
    ("€", "EUR"),
    ("£", "GBP"),
    ("₹", "INR"),
    ("₽", "RUB"),
    ("¥", "JPY"),
    ("CHF", "CHF"),
    ("CA$", "CAD"),
    ("C$", "CAD"),
    ("A$", "AUD"),
    ("R$", "BRL"),
    ("$", "USD"),
];

/// Currency implied by a hostname suffix.
///
/// ```rust
/// use product_extract::normalize::currency_for_host;
///
/// assert_eq!(currency_for_host("shop.amazon.fr"), Some("EUR"));
/// assert_eq!(currency_for_host("www.amazon.co.uk"), Some("GBP"));
/// assert_eq!(currency_for_host("localhost"), None);
/// ```
#[must_use]
pub fn currency_for_host(hostname: &str) -> Option<&'static str> {
    let host = hostname.trim().trim_end_matches('.').to_ascii_lowercase();
    HOST_CURRENCIES
        .iter()
        .find(|(suffix, _)| host.ends_with(suffix))
        .map(|(_, code)| *code)
}

/// First currency glyph found in visible text.
#[must_use]
pub fn currency_from_text(text: &str) -> Option<&'static str> {
    TEXT_CURRENCIES
        .iter()
        .filter_map(|(glyph, code)| text.find(glyph).map(|pos| (pos, glyph.len(), *code)))
        // Earliest glyph wins; at the same position the longer glyph (`CA$`) wins.
        .min_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)))
        .map(|(_, _, code)| code)
}

/// Hostname first, then page text, then `default`.
#[must_use]
pub fn infer_currency(hostname: &str, page_text: &str, default: &str) -> String {
    currency_for_host(hostname)
        .or_else(|| currency_from_text(page_text))
        .unwrap_or(default)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_table() {
        assert_eq!(currency_for_host("shop.amazon.fr"), Some("EUR"));
        assert_eq!(currency_for_host("amazon.co.uk"), Some("GBP"));
        assert_eq!(currency_for_host("www.amazon.com"), Some("USD"));
        assert_eq!(currency_for_host("www.amazon.com.au"), Some("AUD"));
        assert_eq!(currency_for_host("www.amazon.co.jp"), Some("JPY"));
        assert_eq!(currency_for_host("AMAZON.DE"), Some("EUR"));
    }

    #[test]
    fn test_unknown_host_uses_default() {
        assert_eq!(currency_for_host("shop.example"), None);
        assert_eq!(infer_currency("shop.example", "", "EUR"), "EUR");
    }

    #[test]
    fn test_text_scan_when_host_unknown() {
        assert_eq!(infer_currency("shop.example", "Only £12.99 today", "EUR"), "GBP");
        assert_eq!(currency_from_text("CA$ 15.00"), Some("CAD"));
        assert_eq!(currency_from_text("$15.00"), Some("USD"));
        assert_eq!(currency_from_text("no glyphs"), None);
    }

    #[test]
    fn test_host_wins_over_text() {
        assert_eq!(infer_currency("www.amazon.de", "$5", "USD"), "EUR");
    }
}

use product_extract::extract_bytes;
use product_extract::extractor::{extract_complete_blocking, AmazonExtractor};
use product_extract::Page;

/// UTF-8 content is handled correctly
#[test]
fn utf8_content_handled_correctly() {
    let html = "<html><head><meta charset=\"utf-8\"></head><body>\
        <span id=\"productTitle\">Théière en fonte 中文</span>\
        </body></html>"
        .as_bytes();

    let record = extract_bytes("https://www.amazon.fr/dp/B0THEIERE1", html, None).expect("supported platform");
    assert_eq!(record.title, "Théière en fonte 中文");
}

/// ISO-8859-1 declared in a meta tag is converted to UTF-8
#[test]
fn iso88591_meta_charset_converted() {
    // é = 0xE9, ñ = 0xF1 in ISO-8859-1
    let html = b"<html><head><meta charset=\"ISO-8859-1\"></head><body>\
        <span id=\"productTitle\">Caf\xE9 espa\xF1ol</span>\
        <div id=\"corePrice_feature_div\"><span class=\"a-offscreen\">12,50 \x80</span></div>\
        </body></html>";

    let record = extract_bytes("https://www.amazon.es/dp/B0CAFECAFE", html, None).expect("supported platform");
    assert_eq!(record.title, "Café español");
    assert!((record.price - 12.5).abs() < 1e-9);
}

/// The Content-Type header charset wins over a missing meta declaration
#[test]
fn content_type_charset_used() {
    let html = b"<span id=\"productTitle\">M\xFCnchen Edition</span>";
    let page = Page::from_bytes(
        "https://www.amazon.de/dp/B0MUNCHEN1",
        html,
        Some("text/html; charset=windows-1252"),
    )
    .expect("valid page url");

    let record = extract_complete_blocking(&AmazonExtractor::default(), &page);
    assert_eq!(record.title, "München Edition");
}

/// Invalid UTF-8 sequences are replaced rather than failing
#[test]
fn invalid_utf8_is_lossy() {
    let html = b"<span id=\"productTitle\">Broken \xFF\xFE bytes</span>";
    let record = extract_bytes("https://www.amazon.com/dp/B0BROKEN01", html, None).expect("supported platform");
    assert!(record.title.starts_with("Broken"));
    assert!(record.title.ends_with("bytes"));
}

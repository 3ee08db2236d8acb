//! Performance benchmarks for product-extract.
//!
//! Run with: `cargo bench`
//!
//! Benchmarks include:
//! - A synthetic Amazon page with JSON-LD, gallery script and reviews
//! - Price parsing and image canonicalization microbenchmarks
//! - Saved product pages from `../data/product_pages`, when present

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use product_extract::normalize::{canonicalize_image_url, parse_price};
use product_extract::{extract, extract_with_options, Options};
use std::fs;

const SAMPLE_HTML: &str = r#"
<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>Amazon.com: Steel Water Bottle</title>
    <meta property="og:title" content="Steel Water Bottle">
    <script type="application/ld+json">
    {"@context": "https://schema.org", "@type": "Product", "name": "Steel Water Bottle",
     "brand": {"@type": "Brand", "name": "Hydra"}, "sku": "HB-750",
     "offers": {"@type": "Offer", "price": "19.99", "priceCurrency": "USD"},
     "aggregateRating": {"ratingValue": "4.6", "reviewCount": "1532"}}
    </script>
</head>
<body>
    <span id="productTitle">Steel Water Bottle</span>
    <a id="bylineInfo">Visit the Hydra Store</a>
    <div id="corePrice_feature_div"><span class="a-offscreen">$19.99</span></div>
    <div id="altImages">
        <img src="https://m.media-amazon.com/images/I/71B0EXAMPLE1a._SS40_.jpg">
        <img src="https://m.media-amazon.com/images/I/71B0EXAMPLE1b._SS40_.jpg">
    </div>
    <script>
        var data = {'colorImages': {'initial': [
            {"hiRes": "https://m.media-amazon.com/images/I/81B0EXAMPLE1c._SL1500_.jpg"},
            {"hiRes": "https://m.media-amazon.com/images/I/81B0EXAMPLE1d._SL1500_.jpg"}
        ]}};
    </script>
    <div id="feature-bullets"><ul>
        <li><span>Keeps drinks cold for 24 hours</span></li>
        <li><span>Leak-proof lid</span></li>
    </ul></div>
    <table id="productDetails_techSpec_section_1">
        <tr><th>Capacity</th><td>750 ml</td></tr>
        <tr><th>Material</th><td>Stainless steel</td></tr>
    </table>
    <div data-hook="review">
        <span class="a-profile-name">Sam</span>
        <i data-hook="review-star-rating"><span class="a-icon-alt">5.0 out of 5 stars</span></i>
        <span data-hook="review-body"><span>Great bottle.</span></span>
    </div>
</body>
</html>
"#;

const SAMPLE_URL: &str = "https://www.amazon.com/dp/B0EXAMPLE1";

fn bench_extract_default(c: &mut Criterion) {
    c.bench_function("extract_default", |b| {
        b.iter(|| extract(black_box(SAMPLE_URL), black_box(SAMPLE_HTML)));
    });
}

fn bench_extract_with_options(c: &mut Criterion) {
    let options = Options {
        max_images: 5,
        max_reviews: 5,
        ..Options::default()
    };

    c.bench_function("extract_with_options", |b| {
        b.iter(|| extract_with_options(black_box(SAMPLE_URL), black_box(SAMPLE_HTML), black_box(&options)));
    });
}

fn bench_normalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalize");
    group.bench_function("parse_price", |b| {
        b.iter(|| {
            for text in ["1.234,56 €", "$29.99", "1,234.56", "EUR 12", "n/a"] {
                black_box(parse_price(black_box(text)));
            }
        });
    });
    group.bench_function("canonicalize_image_url", |b| {
        b.iter(|| {
            canonicalize_image_url(
                black_box("//m.media-amazon.com/images/I/71abcDEF12._AC_SX300_SY300_.jpg?x=1"),
                black_box("._AC_SL1500_."),
            )
        });
    });
    group.finish();
}

/// Benchmark with saved product pages of varying sizes
fn bench_real_world_html(c: &mut Criterion) {
    let html_dir = "../data/product_pages";

    // Saved pages and the URL each was captured from
    let sample_files = [
        ("amazon.html", "https://www.amazon.com/dp/B0EXAMPLE1"),
        ("temu.html", "https://www.temu.com/item-g-601099512345678.html"),
        ("aliexpress.html", "https://www.aliexpress.com/item/1005006123456789.html"),
    ];

    let mut group = c.benchmark_group("real_world");

    for (filename, url) in &sample_files {
        let path = format!("{html_dir}/{filename}");
        if let Ok(html) = fs::read_to_string(&path) {
            let size_kb = html.len() / 1024;
            group.throughput(Throughput::Bytes(html.len() as u64));
            group.bench_with_input(
                BenchmarkId::new("extract", format!("{filename} ({size_kb}KB)")),
                &html,
                |b, html| {
                    b.iter(|| extract(black_box(url), black_box(html)));
                },
            );
        }
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_extract_default,
    bench_extract_with_options,
    bench_normalize,
    bench_real_world_html
);
criterion_main!(benches);

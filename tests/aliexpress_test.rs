use product_extract::extractor::{extract_complete_blocking, AliExpressExtractor, SiteExtractor};
use product_extract::intercept::MemoryHost;
use product_extract::{Page, VideoKind};

const URL: &str = "https://www.aliexpress.com/item/1005006123456789.html?spm=a2g0o.productlist";

const HTML: &str = r#"<!DOCTYPE html>
<html>
<head><title>Wireless Earbuds Pro - AliExpress</title></head>
<body>
<div class="slider--wrap">
    <img src="//ae01.alicdn.com/kf/S1a2b3c4d5e6f.jpg_80x80.jpg">
</div>
<div class="product-description">Hi-fi sound with active noise cancelling.</div>
<script>
window.runParams = {
    resultCode: 200,
    data: {
        "titleModule": {"subject": "Wireless Earbuds Pro"},
        "storeModule": {"storeName": "Soundcore Official Store"},
        "priceModule": {
            "minAmount": {"value": 19.99, "currency": "EUR"},
            "maxAmount": {"value": 29.99, "currency": "EUR"}
        },
        "imageModule": {
            "imagePathList": [
                "https://ae01.alicdn.com/kf/S1a2b3c4d5e6f.jpg",
                "https://ae01.alicdn.com/kf/S7g8h9i0j1k2l.jpg"
            ],
            "videoUid": "abc123"
        },
        "skuModule": {
            "productSKUPropertyList": [{
                "skuPropertyName": "Color",
                "skuPropertyValues": [
                    {"propertyValueId": 193, "propertyValueDisplayName": "Black",
                     "skuPropertyImagePath": "https://ae01.alicdn.com/kf/Sblack0001aa.jpg_50x50.jpg"},
                    {"propertyValueId": 29, "propertyValueDisplayName": "White"}
                ]
            }]
        },
        "feedbackModule": {"averageStar": "4.8", "totalValidNum": 1520, "positiveRate": "97.1%"},
        "specsModule": {"props": [
            {"attrName": "Brand Name", "attrValue": "Soundcore"},
            {"attrName": "Battery Life", "attrValue": "40h"}
        ]}
    }
};
</script>
<div class="feedback-list">
    <div class="feedback-item">
        <span class="user-name">P***e</span>
        <span class="user-country">DE</span>
        <div class="star-view"><span style="width: 80%"></span></div>
        <div class="buyer-feedback">Good fit</div>
        <span class="r-time">10 Jan 2026</span>
        <img src="https://ae01.alicdn.com/kf/Sfeedback01.jpg">
        <img src="https://ae01.alicdn.com/kf/avatar/Sface01.jpg">
    </div>
</div>
</body>
</html>"#;

fn page() -> Page {
    Page::new(URL, HTML).expect("valid page url")
}

#[test]
fn aliexpress_page_data_modules() {
    let page = page();
    let record = extract_complete_blocking(&AliExpressExtractor::default(), &page);

    assert_eq!(record.platform, "aliexpress");
    assert_eq!(record.external_id, "1005006123456789");
    assert_eq!(record.title, "Wireless Earbuds Pro");
    assert_eq!(record.brand, "Soundcore Official Store");
    assert_eq!(record.description, "Hi-fi sound with active noise cancelling.");
    assert_eq!(record.sku, "1005006123456789");

    assert!((record.price - 19.99).abs() < 1e-9);
    assert_eq!(record.original_price, Some(29.99));
    // aliexpress.com alone would imply USD
    assert_eq!(record.currency, "EUR");
}

#[test]
fn aliexpress_images_and_video_uid() {
    let page = page();
    let record = extract_complete_blocking(&AliExpressExtractor::default(), &page);

    assert_eq!(
        record.images,
        vec![
            "https://ae01.alicdn.com/kf/S1a2b3c4d5e6f.jpg".to_string(),
            "https://ae01.alicdn.com/kf/S7g8h9i0j1k2l.jpg".to_string(),
        ]
    );

    assert_eq!(record.videos.len(), 1);
    assert_eq!(
        record.videos[0].url,
        "https://cloud.video.taobao.com/play/u/abc123/p/1/e/6/t/1/1005006123456789.mp4"
    );
    assert_eq!(record.videos[0].kind, VideoKind::Mp4);
}

#[test]
fn aliexpress_variants_from_sku_module() {
    let page = page();
    let record = extract_complete_blocking(&AliExpressExtractor::default(), &page);

    assert_eq!(record.variants.len(), 2);
    assert_eq!(record.variants[0].id, "193");
    assert_eq!(record.variants[0].title, "Black");
    assert_eq!(record.variants[0].kind.as_deref(), Some("Color"));
    assert_eq!(
        record.variants[0].image.as_deref(),
        Some("https://ae01.alicdn.com/kf/Sblack0001aa.jpg")
    );
    assert!(record.variants.iter().all(|variant| variant.available));
}

#[test]
fn aliexpress_dom_reviews_and_feedback_summary() {
    let page = page();
    let record = extract_complete_blocking(&AliExpressExtractor::default(), &page);

    assert_eq!(record.reviews.len(), 1);
    let review = &record.reviews[0];
    assert_eq!(review.author, "P***e");
    assert_eq!(review.content, "Good fit");
    assert_eq!(review.country, "DE");
    assert_eq!(review.date, "10 Jan 2026");
    assert!((review.rating - 4.0).abs() < 1e-9);
    assert_eq!(review.images, vec!["https://ae01.alicdn.com/kf/Sfeedback01.jpg".to_string()]);

    let summary = record.rating_summary.expect("rating summary");
    assert!((summary.average_rating - 4.8).abs() < 1e-9);
    assert_eq!(summary.total_count, 1520);
    assert_eq!(summary.positive_rate.as_deref(), Some("97.1%"));
}

#[test]
fn aliexpress_intercepted_feedback_replaces_dom_reviews() {
    let page = page();
    let extractor = AliExpressExtractor::default();
    let host = MemoryHost::new();
    assert!(extractor.install_interception(&host));
    assert!(!extractor.install_interception(&host));
    assert_eq!(host.hook_counts(), (1, 1));

    host.deliver_fetch(
        "https://feedback.aliexpress.com/pc/searchEvaluation.do?productId=1005006123456789&page=1",
        r#"{"data": {"totalNum": 2, "evaViewList": [
            {"buyerName": "M***a", "buyerEval": 100, "buyerFeedback": "Great sound",
             "evalDate": "12 Feb 2026", "buyerCountry": "FR",
             "images": ["https://ae01.alicdn.com/kf/Sreview0001.jpg"]},
            {"buyerName": "J***n", "buyerEval": 60, "buyerFeedback": "Battery is weak"}
        ]}}"#,
    );

    let record = extract_complete_blocking(&extractor, &page);
    assert_eq!(record.reviews.len(), 2);
    assert_eq!(record.reviews[0].author, "M***a");
    assert!((record.reviews[0].rating - 5.0).abs() < 1e-9);
    assert!((record.reviews[1].rating - 3.0).abs() < 1e-9);
    assert_eq!(record.reviews[0].country, "FR");
}

#[test]
fn aliexpress_specifications_from_specs_module() {
    let page = page();
    let record = extract_complete_blocking(&AliExpressExtractor::default(), &page);

    assert_eq!(record.specifications.len(), 2);
    assert_eq!(record.specifications.get("Brand Name").map(String::as_str), Some("Soundcore"));
    assert_eq!(record.specifications.get("Battery Life").map(String::as_str), Some("40h"));
}

#[test]
fn aliexpress_dom_fallbacks_without_page_data() {
    let html = r#"<html><body>
        <h1 data-pl="product-title">Ceramic Mug 350 ml</h1>
        <div class="product-price">
            <span class="product-price-current">€ 12,34</span>
            <span class="product-price-origin">€ 20,00</span>
        </div>
        <div class="sku-property">
            <div class="sku-property-item" data-sku-id="200001" title="Blue"></div>
            <div class="sku-property-item disabled" data-sku-id="200002" title="Green"></div>
        </div>
        <div class="specification--wrap"><ul>
            <li><span class="specification--name">Material</span><span class="specification--value">Ceramic</span></li>
            <li>Capacity: 350 ml</li>
        </ul></div>
    </body></html>"#;
    let page = Page::new("https://www.aliexpress.com/item/1005001234567890.html", html).expect("valid page url");
    let record = extract_complete_blocking(&AliExpressExtractor::default(), &page);

    assert_eq!(record.title, "Ceramic Mug 350 ml");
    assert!((record.price - 12.34).abs() < 1e-9);
    assert_eq!(record.original_price, Some(20.0));
    assert_eq!(record.currency, "EUR");

    assert_eq!(record.variants.len(), 2);
    assert_eq!(record.variants[0].id, "200001");
    assert_eq!(record.variants[0].title, "Blue");
    assert!(!record.variants[1].available);

    assert_eq!(record.specifications.get("Material").map(String::as_str), Some("Ceramic"));
    assert_eq!(record.specifications.get("Capacity").map(String::as_str), Some("350 ml"));
}

#[test]
fn aliexpress_currency_from_body_when_price_has_no_symbol() {
    let html = r#"<html><body>
        <h1 data-pl="product-title">Garden Hose 15 m</h1>
        <div class="product-price"><span class="product-price-current">12,34</span></div>
        <p class="shipping-note">Alle Preise in € inkl. MwSt.</p>
        <script>var tracking = {"fx": "$"};</script>
    </body></html>"#;
    let page = Page::new("https://www.aliexpress.com/item/1005009999999999.html", html).expect("valid page url");
    let record = extract_complete_blocking(&AliExpressExtractor::default(), &page);

    assert!((record.price - 12.34).abs() < 1e-9);
    // aliexpress.com alone would imply USD; script text is not visible
    assert_eq!(record.currency, "EUR");
}

#[test]
fn aliexpress_bundle_price_ignores_quantity() {
    let html = r#"<html><body>
        <h1 data-pl="product-title">AA Batteries</h1>
        <div class="product-price"><span class="product-price-current">2 x 19,99 €</span></div>
    </body></html>"#;
    let page = Page::new("https://www.aliexpress.com/item/1005008888888888.html", html).expect("valid page url");
    let record = extract_complete_blocking(&AliExpressExtractor::default(), &page);

    assert!((record.price - 19.99).abs() < 1e-9);
    assert_eq!(record.currency, "EUR");
}

#[test]
fn aliexpress_og_image_used_when_gallery_missing() {
    let html = r#"<html><head>
        <meta property="og:image" content="https://ae01.alicdn.com/kf/Scover0001ab.jpg_640x640.jpg">
    </head><body><h1 data-pl="product-title">Desk Lamp</h1></body></html>"#;
    let page = Page::new("https://www.aliexpress.com/item/1005007777777777.html", html).expect("valid page url");
    let record = extract_complete_blocking(&AliExpressExtractor::default(), &page);

    assert_eq!(record.images, vec!["https://ae01.alicdn.com/kf/Scover0001ab.jpg".to_string()]);
}

//! HTML extraction for product and shade pages.

use crate::catalog::slugify;
use crate::error::{Error, Result};
use crate::model::Product;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;
use url::Url;

mod selectors {
    use super::*;

    fn parse(css: &str) -> Selector {
        Selector::parse(css).expect("static selector")
    }

    pub static TITLE: LazyLock<Selector> =
        LazyLock::new(|| parse(r#"h1.product-title, h1[class*="title"], .product-name h1"#));
    pub static PRICE: LazyLock<Selector> =
        LazyLock::new(|| parse(r#".product-price, [class*="price"], .price-item"#));
    pub static TAGLINE: LazyLock<Selector> =
        LazyLock::new(|| parse(r#".product-subtitle, .short-description, [class*="subtitle"]"#));
    pub static DESCRIPTION: LazyLock<Selector> =
        LazyLock::new(|| parse(r#".product-description, [class*="description"], .rte"#));
    pub static GALLERY: LazyLock<Vec<Selector>> = LazyLock::new(|| {
        [
            ".product-gallery img",
            ".product-images img",
            ".product-media img",
            r#"[class*="gallery"] img"#,
            ".main-image img",
        ]
        .into_iter()
        .map(parse)
        .collect()
    });
    pub static SECTION: LazyLock<Selector> =
        LazyLock::new(|| parse(r#".product-info section, .accordion-item, [class*="tab"]"#));
    pub static HEADING: LazyLock<Selector> = LazyLock::new(|| parse("h2, h3, .heading, .title"));
    pub static CDN_IMAGE: LazyLock<Selector> =
        LazyLock::new(|| parse(r#"img[src*="cdn.shopify.com/s/files"]"#));
}

const IMAGE_EXTENSIONS: [&str; 4] = [".jpg", ".jpeg", ".png", ".webp"];

fn text_of(el: ElementRef<'_>) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn first_text(doc: &Html, sel: &Selector) -> String {
    doc.select(sel).next().map(text_of).unwrap_or_default()
}

/// Absolute form of an image `src` with query string and fragment removed.
/// Protocol-relative sources are resolved to https.
pub fn normalize_image_url(raw: &str) -> Result<String> {
    let raw = raw.trim();
    let absolute = match raw.strip_prefix("//") {
        Some(rest) => format!("https://{rest}"),
        None => raw.to_string(),
    };
    let mut url = Url::parse(&absolute).map_err(|source| Error::Url {
        url: raw.to_string(),
        source,
    })?;
    url.set_query(None);
    url.set_fragment(None);
    Ok(url.into())
}

/// Extracts the product record from a product page.
pub fn parse_product_page(html: &str, page_url: &str, max_images: usize) -> Product {
    let doc = Html::parse_document(html);
    let title = first_text(&doc, &selectors::TITLE);
    let mut product = Product {
        url: page_url.to_string(),
        slug: slugify(&title),
        price: first_text(&doc, &selectors::PRICE),
        tagline: first_text(&doc, &selectors::TAGLINE),
        main_description: first_text(&doc, &selectors::DESCRIPTION),
        title,
        ..Default::default()
    };

    let mut images: Vec<String> = Vec::new();
    for sel in selectors::GALLERY.iter() {
        for img in doc.select(sel) {
            let attrs = img.value();
            let Some(src) = attrs.attr("src").or_else(|| attrs.attr("data-src")) else {
                continue;
            };
            if !src.starts_with("http") {
                continue;
            }
            match normalize_image_url(src) {
                Ok(url) if !images.contains(&url) => images.push(url),
                Ok(_) => {}
                Err(e) => tracing::debug!("skipping image: {e}"),
            }
        }
    }
    images.truncate(max_images);
    product.images = images;

    for section in doc.select(&selectors::SECTION) {
        let Some(heading) = section.select(&selectors::HEADING).next() else {
            continue;
        };
        let heading = text_of(heading).to_lowercase();
        let content = text_of(section);
        if heading.contains("ingredient") {
            product.key_ingredients = content;
        } else if heading.contains("how to") || heading.contains("use") {
            product.how_to_use = content;
        }
    }
    product
}

/// Gallery images of a shade page: the first `limit` CDN images, minus
/// consent-banner assets and anything that is not a still image.
pub fn parse_shade_images(html: &str, limit: usize) -> Vec<String> {
    let doc = Html::parse_document(html);
    let mut urls: Vec<String> = Vec::new();
    for img in doc.select(&selectors::CDN_IMAGE).take(limit) {
        let Some(src) = img.value().attr("src") else {
            continue;
        };
        if src.to_lowercase().contains("axeptio") {
            continue;
        }
        let Ok(clean) = normalize_image_url(src) else {
            continue;
        };
        let lower = clean.to_lowercase();
        if IMAGE_EXTENSIONS.iter().any(|ext| lower.contains(ext)) && !urls.contains(&clean) {
            urls.push(clean);
        }
    }
    urls
}

/// Storefront URL that preselects a shade on its mini-colour product page.
pub fn shade_url(base: &str, main_color: &str, shade_number: &str, shade_name: &str) -> String {
    format!(
        "{}/products/mini-color-{}?Teinte={}.+{}",
        base.trim_end_matches('/'),
        main_color.trim().to_lowercase(),
        shade_number.trim(),
        shade_name.trim().replace(' ', "+")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const PRODUCT_PAGE: &str = r#"
        <html><body>
          <div class="product-name"><h1 class="product-title">Mavala  Scientifique K+</h1></div>
          <span class="product-price">€ 19,90</span>
          <p class="product-subtitle">Nail hardener</p>
          <div class="product-description">Strengthens
            soft nails.</div>
          <div class="product-gallery">
            <img src="https://cdn.example.com/a.jpg?v=1&width=200">
            <img src="https://cdn.example.com/a.jpg?v=2">
            <img data-src="https://cdn.example.com/b.png#zoom">
            <img src="/relative/c.jpg">
          </div>
          <div class="product-media">
            <img src="https://cdn.example.com/c.webp">
            <img src="https://cdn.example.com/d.jpg">
            <img src="https://cdn.example.com/e.jpg">
            <img src="https://cdn.example.com/f.jpg">
          </div>
          <div class="product-info">
            <section><h3>Key Ingredients</h3><p>Keratin</p></section>
            <section><h3>How to apply</h3><p>Apply to tips.</p></section>
          </div>
        </body></html>
    "#;

    #[test]
    fn product_page_fields() {
        let p = parse_product_page(PRODUCT_PAGE, "https://shop.example/products/k", 5);
        assert_eq!(p.title, "Mavala Scientifique K+");
        assert_eq!(p.slug, "mavala-scientifique-k");
        assert_eq!(p.price, "€ 19,90");
        assert_eq!(p.tagline, "Nail hardener");
        assert_eq!(p.main_description, "Strengthens soft nails.");
        assert_eq!(
            p.images,
            vec![
                "https://cdn.example.com/a.jpg",
                "https://cdn.example.com/b.png",
                "https://cdn.example.com/c.webp",
                "https://cdn.example.com/d.jpg",
                "https://cdn.example.com/e.jpg",
            ]
        );
        assert_eq!(p.key_ingredients, "Key Ingredients Keratin");
        assert_eq!(p.how_to_use, "How to apply Apply to tips.");
    }

    #[test]
    fn empty_page_gives_blank_product() {
        let p = parse_product_page("<html></html>", "u", 5);
        assert!(p.title.is_empty());
        assert!(p.images.is_empty());
    }

    #[rstest]
    #[case("https://cdn.shopify.com/s/files/1/x.jpg?v=12&width=600", "https://cdn.shopify.com/s/files/1/x.jpg")]
    #[case("//cdn.shopify.com/s/files/1/y.png#top", "https://cdn.shopify.com/s/files/1/y.png")]
    #[case("  https://a.example/z.webp  ", "https://a.example/z.webp")]
    fn normalizes_image_urls(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(normalize_image_url(raw).unwrap(), expected);
    }

    #[test]
    fn relative_url_is_rejected() {
        assert!(matches!(normalize_image_url("/img/a.jpg"), Err(Error::Url { .. })));
    }

    #[test]
    fn shade_images_first_three_cdn_only() {
        let html = r#"
            <img src="https://static.axeptio.eu/cdn.shopify.com/s/files/logo.png">
            <img src="https://cdn.shopify.com/s/files/1/49-white.jpg?v=3">
            <img src="https://cdn.shopify.com/s/files/1/49-white.jpg?v=4">
            <img src="https://other.example/ignored.jpg">
            <img src="https://cdn.shopify.com/s/files/1/49-white-2.png">
        "#;
        assert_eq!(
            parse_shade_images(html, 3),
            vec!["https://cdn.shopify.com/s/files/1/49-white.jpg"]
        );
        assert_eq!(
            parse_shade_images(html, 4),
            vec![
                "https://cdn.shopify.com/s/files/1/49-white.jpg",
                "https://cdn.shopify.com/s/files/1/49-white-2.png",
            ]
        );
    }

    #[test]
    fn shade_images_skip_non_image_assets() {
        let html = r#"<img src="https://cdn.shopify.com/s/files/1/promo.svg">"#;
        assert!(parse_shade_images(html, 3).is_empty());
    }

    #[test]
    fn builds_shade_urls() {
        assert_eq!(
            shade_url("https://www.mavala.com/", "Blue", "363", "LONG ISLAND"),
            "https://www.mavala.com/products/mini-color-blue?Teinte=363.+LONG+ISLAND"
        );
    }
}

//! SKU detection cascade.
//!
//! Each rule is a pure function over the host page returning at most one
//! SKU. Rules run in [`CASCADE`] order and the first non-empty answer wins;
//! later rules are weaker signals. No rule panics or propagates an error:
//! anything unparseable reads as "no signal" and the next rule runs.

use std::sync::LazyLock;

use lifestyle_core::resolve::{Resolution, SkuSource};
use regex::Regex;
use scraper::{ElementRef, Selector};
use serde_json::Value;
use tracing::{debug, info};

use crate::HostPage;

pub type Rule = fn(&HostPage) -> Option<String>;

/// Every rule, strongest first.
pub const CASCADE: &[(SkuSource, Rule)] = &[
    (SkuSource::MountOverride, mount_override),
    (SkuSource::UrlPath, url_path),
    (SkuSource::InlineScript, inline_script),
    (SkuSource::MetaTag, meta_tag),
    (SkuSource::FormInput, form_input),
    (SkuSource::JsonLd, json_ld),
    (SkuSource::DataAttribute, data_attribute),
];

pub fn resolve(page: &HostPage) -> Option<Resolution> {
    let found = CASCADE.iter().find_map(|&(source, rule)| {
        rule(page).map(|sku| Resolution { sku, source })
    });
    match &found {
        Some(r) => info!(sku = %r.sku, source = %r.source, "resolved SKU"),
        None => debug!("no SKU signal on host page"),
    }
    found
}

fn selector(css: &str) -> Selector {
    Selector::parse(css).unwrap()
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn attr(el: ElementRef<'_>, name: &str) -> Option<String> {
    el.value().attr(name).and_then(non_empty)
}

/// `data-sku` on the widget mount point, then the embed script's
/// configured SKU.
pub fn mount_override(page: &HostPage) -> Option<String> {
    let mounts = selector("[data-lifestyle-widget], #lifestyle-widget");
    page.document()
        .select(&mounts)
        .find_map(|el| attr(el, "data-sku"))
        .or_else(|| page.configured_sku().and_then(non_empty))
}

/// The path segment right after `products`, e.g. `/products/blue-mug`.
pub fn url_path(page: &HostPage) -> Option<String> {
    let mut segments = page.url()?.path_segments()?;
    segments.find(|s| *s == "products")?;
    segments.next().and_then(non_empty)
}

static SKU_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"["']?\bsku["']?\s*:\s*["']([^"'\r\n]*)["']"#).unwrap());

static VARIANT_SKU: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\bvariants\s*\[\s*0\s*\]\s*\.\s*sku\s*=\s*["']([^"'\r\n]*)["']"#).unwrap()
});

/// `"sku": "..."` keys or `variants[0].sku = "..."` assignments in inline
/// scripts. JSON-LD blocks are left to [`json_ld`].
pub fn inline_script(page: &HostPage) -> Option<String> {
    let scripts = selector(r#"script:not([type="application/ld+json"]):not([src])"#);
    let texts: Vec<String> = page
        .document()
        .select(&scripts)
        .map(|el| el.text().collect())
        .collect();

    [&*SKU_KEY, &*VARIANT_SKU].into_iter().find_map(|pattern| {
        texts.iter().find_map(|text| {
            pattern
                .captures_iter(text)
                .find_map(|caps| caps.get(1).and_then(|m| non_empty(m.as_str())))
        })
    })
}

/// Retailer item id meta tags, primary name before legacy names. Each name
/// is looked up under both `property` and `name`.
pub fn meta_tag(page: &HostPage) -> Option<String> {
    const NAMES: &[&str] = &[
        "product:retailer_item_id",
        "og:retailer_item_id",
        "shopify-product-handle",
    ];
    NAMES.iter().find_map(|name| {
        let sel = selector(&format!(r#"meta[property="{name}"], meta[name="{name}"]"#));
        page.document()
            .select(&sel)
            .find_map(|el| attr(el, "content"))
    })
}

/// The variant id carried by the add-to-cart form: `<input name="id">` or
/// the selected option of `<select name="id">`.
pub fn form_input(page: &HostPage) -> Option<String> {
    let controls = selector(r#"input[name="id"], select[name="id"]"#);
    let options = selector("option");
    page.document().select(&controls).find_map(|el| {
        if el.value().name() != "select" {
            return attr(el, "value");
        }
        let mut all = el.select(&options);
        let selected = el
            .select(&options)
            .find(|o| o.value().attr("selected").is_some());
        let option = selected.or_else(|| all.next())?;
        match option.value().attr("value") {
            Some(value) => non_empty(value),
            None => non_empty(&option.text().collect::<String>()),
        }
    })
}

/// JSON-LD product data. All blocks are scanned for `sku` before any is
/// scanned for `productID`, then `offers.sku`. Blocks that fail to parse
/// are skipped.
pub fn json_ld(page: &HostPage) -> Option<String> {
    let blocks = selector(r#"script[type="application/ld+json"]"#);
    let mut nodes = Vec::new();
    for el in page.document().select(&blocks) {
        let text: String = el.text().collect();
        match serde_json::from_str::<Value>(&text) {
            Ok(value) => flatten_nodes(value, &mut nodes),
            Err(e) => debug!(error = %e, "skipping malformed JSON-LD block"),
        }
    }

    let fields: [fn(&Value) -> Option<String>; 3] = [
        |node| scalar(node.get("sku")?),
        |node| scalar(node.get("productID")?),
        |node| offers_sku(node.get("offers")?),
    ];
    fields
        .iter()
        .find_map(|field| nodes.iter().find_map(|node| field(node)))
}

/// Top-level arrays and `@graph` containers hold several nodes.
fn flatten_nodes(value: Value, out: &mut Vec<Value>) {
    match value {
        Value::Array(items) => items.into_iter().for_each(|v| flatten_nodes(v, out)),
        Value::Object(mut obj) => {
            if let Some(graph) = obj.remove("@graph") {
                flatten_nodes(graph, out);
            }
            out.push(Value::Object(obj));
        }
        _ => {}
    }
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => non_empty(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn offers_sku(offers: &Value) -> Option<String> {
    match offers {
        Value::Array(items) => items.iter().find_map(|o| scalar(o.get("sku")?)),
        other => scalar(other.get("sku")?),
    }
}

/// `data-product-handle` or `data-product-id` on any element.
pub fn data_attribute(page: &HostPage) -> Option<String> {
    let sel = selector("[data-product-handle], [data-product-id]");
    page.document().select(&sel).find_map(|el| {
        attr(el, "data-product-handle").or_else(|| attr(el, "data-product-id"))
    })
}

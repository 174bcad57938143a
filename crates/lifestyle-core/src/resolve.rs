use std::fmt;

/// Where a resolved SKU came from, strongest signal first.
///
/// The order of the variants is the order sources are consulted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SkuSource {
    /// Override attribute on the widget mount point, or a configured SKU.
    MountOverride,
    /// Path segment after `/products/`.
    UrlPath,
    /// `sku` key or `variants[0].sku` assignment in an inline script.
    InlineScript,
    /// Retailer item id meta tag.
    MetaTag,
    /// Form control named `id`.
    FormInput,
    /// JSON-LD structured data.
    JsonLd,
    /// Product handle / id data attribute.
    DataAttribute,
}

impl fmt::Display for SkuSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SkuSource::MountOverride => "mount-override",
            SkuSource::UrlPath => "url-path",
            SkuSource::InlineScript => "inline-script",
            SkuSource::MetaTag => "meta-tag",
            SkuSource::FormInput => "form-input",
            SkuSource::JsonLd => "json-ld",
            SkuSource::DataAttribute => "data-attribute",
        };
        f.write_str(name)
    }
}

/// A SKU and the source that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub sku: String,
    pub source: SkuSource,
}

/// Determines the SKU a host page is displaying.
///
/// `None` is terminal for the page: callers show nothing and do not retry.
/// Implementations must not panic on malformed host markup.
pub trait SkuResolver {
    fn resolve(&self) -> Option<Resolution>;

    fn resolve_sku(&self) -> Option<String> {
        self.resolve().map(|r| r.sku)
    }
}

/// An already-resolved SKU, for callers that ran detection themselves.
impl SkuResolver for Option<Resolution> {
    fn resolve(&self) -> Option<Resolution> {
        self.clone()
    }
}

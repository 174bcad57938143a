pub mod cascade;
pub mod mounts;

use lifestyle_core::facade::WidgetHost;
use lifestyle_core::resolve::{Resolution, SkuResolver};
use lifestyle_core::view::MarkupView;
use scraper::{Html, Selector};
use tracing::debug;
use url::Url;

/// Sentinel the hosted embed script uses for "no configured SKU".
pub const AUTO_DETECT: &str = "AUTO_DETECT";

/// A storefront page the widget has been dropped into.
///
/// Built from the page's HTML and location. Parsing never fails: html5ever
/// recovers from any markup, and an unparseable location only disables the
/// URL-based signal.
pub struct HostPage {
    document: Html,
    url: Option<Url>,
    configured_sku: Option<String>,
    inserted: Vec<String>,
}

impl HostPage {
    pub fn parse(html: &str, location: &str) -> Self {
        let url = Url::parse(location)
            .map_err(|e| debug!(location, error = %e, "host location not parsed"))
            .ok();
        Self {
            document: Html::parse_document(html),
            url,
            configured_sku: None,
            inserted: Vec::new(),
        }
    }

    /// SKU configured on the embed script. [`AUTO_DETECT`] and blank values
    /// mean "detect from the page".
    pub fn with_configured_sku(mut self, sku: &str) -> Self {
        let sku = sku.trim();
        self.configured_sku = (!sku.is_empty() && sku != AUTO_DETECT).then(|| sku.to_string());
        self
    }

    pub fn document(&self) -> &Html {
        &self.document
    }

    pub fn url(&self) -> Option<&Url> {
        self.url.as_ref()
    }

    pub fn configured_sku(&self) -> Option<&str> {
        self.configured_sku.as_deref()
    }

    /// Whether an element with this id exists, or was inserted by us.
    pub fn has_element_id(&self, id: &str) -> bool {
        if self.inserted.iter().any(|i| i == id) {
            return true;
        }
        let Ok(sel) = Selector::parse(&format!("[id=\"{}\"]", id.replace('"', "\\\""))) else {
            return false;
        };
        self.document.select(&sel).next().is_some()
    }

    /// Ids of containers created through [`WidgetHost::insert_container`].
    pub fn inserted(&self) -> &[String] {
        &self.inserted
    }
}

impl SkuResolver for HostPage {
    fn resolve(&self) -> Option<Resolution> {
        cascade::resolve(self)
    }
}

impl WidgetHost for HostPage {
    type View = MarkupView;

    fn container(&mut self, id: &str) -> Option<MarkupView> {
        self.has_element_id(id).then(MarkupView::new)
    }

    fn insert_container(&mut self, id: &str) -> Option<MarkupView> {
        mounts::insertion_target(self)?;
        self.inserted.push(id.to_string());
        Some(MarkupView::new())
    }
}

//! Where on the host page the widget goes.

use lifestyle_core::embed::embed_url;
use lifestyle_core::error::CoreError;
use scraper::Selector;

use crate::HostPage;

/// Product-page regions the auto-init path appends a container to, in
/// preference order.
pub const INSERTION_SELECTORS: &[&str] = &[
    ".product-single__description",
    ".product__description",
    ".product-form",
];

/// Default mount id when the page declares no `data-lifestyle-widget`.
pub const DEFAULT_MOUNT_ID: &str = "lifestyle-widget";

/// First insertion selector that matches the page.
pub fn insertion_target(page: &HostPage) -> Option<&'static str> {
    INSERTION_SELECTORS.iter().copied().find(|css| {
        Selector::parse(css)
            .map(|sel| page.document().select(&sel).next().is_some())
            .unwrap_or(false)
    })
}

/// A declared widget slot on the host page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountPoint {
    /// Element id, if it has one.
    pub id: Option<String>,
    /// `data-sku` on the element, overriding the detected SKU.
    pub sku: Option<String>,
}

/// Every `[data-lifestyle-widget]` element, or `#lifestyle-widget` when the
/// page declares none.
pub fn mount_points(page: &HostPage) -> Vec<MountPoint> {
    let read = |sel: &Selector| -> Vec<MountPoint> {
        page.document()
            .select(sel)
            .map(|el| MountPoint {
                id: el.value().id().map(str::to_string).filter(|s| !s.is_empty()),
                sku: el
                    .value()
                    .attr("data-sku")
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string),
            })
            .collect()
    };

    let declared = Selector::parse("[data-lifestyle-widget]").map(|s| read(&s)).unwrap_or_default();
    if !declared.is_empty() {
        return declared;
    }
    Selector::parse(&format!("#{DEFAULT_MOUNT_ID}"))
        .map(|s| read(&s))
        .unwrap_or_default()
}

/// One iframe the parent-side script would create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedPlan {
    pub container_id: String,
    pub sku: String,
    pub iframe_src: String,
}

/// Plan an iframe per mount point. Mounts without their own `data-sku`
/// use `detected`; mounts with neither are skipped. Unnamed mounts get
/// `lifestyle-widget-<n>` ids.
pub fn plan_embeds(
    page: &HostPage,
    detected: Option<&str>,
    widget_base: &str,
) -> Result<Vec<EmbedPlan>, CoreError> {
    let mut plans = Vec::new();
    for (n, mount) in mount_points(page).into_iter().enumerate() {
        let Some(sku) = mount.sku.or_else(|| detected.map(str::to_string)) else {
            continue;
        };
        let container_id = mount
            .id
            .unwrap_or_else(|| format!("{DEFAULT_MOUNT_ID}-{n}"));
        let iframe_src = embed_url(widget_base, &sku)?.to_string();
        plans.push(EmbedPlan {
            container_id,
            sku,
            iframe_src,
        });
    }
    Ok(plans)
}

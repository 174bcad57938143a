//! Iframe height negotiation.
//!
//! The framed widget page reports its content height to the parent window
//! after load, on every DOM mutation and on resize. The parent accepts
//! reports only from the widget's own origin and sizes the iframe element
//! to match. Messages only ever travel child → parent.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::error::CoreError;

/// Message posted from the framed widget to its parent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EmbedMessage {
    #[serde(rename = "WIDGET_RESIZE")]
    WidgetResize { height: f64 },
}

/// Last height, in CSS pixels, sent to (or applied by) the parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct EmbedHeight(pub u32);

/// Why the child is re-measuring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeTrigger {
    Load,
    Mutation,
    WindowResize,
}

/// Measures the widget root container.
pub trait RootMeasure {
    fn scroll_height(&self) -> u32;
}

/// The parent window as seen from inside the iframe.
pub trait ParentWindow {
    /// `window.parent.postMessage(message, "*")`.
    fn post_message(&mut self, message: Value);
}

/// Child half of the bridge.
pub struct HeightReporter<M, P> {
    measure: M,
    parent: Option<P>,
    last: Option<EmbedHeight>,
}

impl<M: RootMeasure, P: ParentWindow> HeightReporter<M, P> {
    /// `parent` is `None` when the page is not framed; nothing is posted then.
    pub fn new(measure: M, parent: Option<P>) -> Self {
        Self {
            measure,
            parent,
            last: None,
        }
    }

    pub fn last_posted(&self) -> Option<EmbedHeight> {
        self.last
    }

    /// Measure and post. Posts even if the height has not changed.
    pub fn notify(&mut self, trigger: ResizeTrigger) -> Option<EmbedHeight> {
        let parent = self.parent.as_mut()?;
        let height = EmbedHeight(self.measure.scroll_height());
        let message = EmbedMessage::WidgetResize {
            height: f64::from(height.0),
        };
        match serde_json::to_value(&message) {
            Ok(value) => parent.post_message(value),
            Err(e) => {
                debug!(error = %e, "resize message not encoded");
                return None;
            }
        }
        debug!(?trigger, height = height.0, "posted widget height");
        self.last = Some(height);
        Some(height)
    }

    /// Coalesce a burst of triggers (e.g. one mutation-observer callback
    /// batch) into a single post.
    pub fn notify_burst<I>(&mut self, triggers: I) -> Option<EmbedHeight>
    where
        I: IntoIterator<Item = ResizeTrigger>,
    {
        let last = triggers.into_iter().last()?;
        self.notify(last)
    }
}

/// The hosting `<iframe>` element on the parent page.
pub trait FrameElement {
    fn set_height_px(&mut self, px: u32);
}

/// Parent half of the bridge.
pub struct FrameResizer<F> {
    widget_origin: String,
    frame: F,
    applied: Option<EmbedHeight>,
}

impl<F: FrameElement> FrameResizer<F> {
    /// `widget_base` is any URL on the widget's origin; only its origin is
    /// kept.
    pub fn new(widget_base: &str, frame: F) -> Result<Self, CoreError> {
        Ok(Self {
            widget_origin: origin_of(widget_base)?,
            frame,
            applied: None,
        })
    }

    pub fn widget_origin(&self) -> &str {
        &self.widget_origin
    }

    pub fn applied(&self) -> Option<EmbedHeight> {
        self.applied
    }

    pub fn frame(&self) -> &F {
        &self.frame
    }

    /// Handle one `message` event. Foreign origins and anything that is not
    /// a well-formed resize are ignored silently.
    pub fn handle_message(&mut self, origin: &str, data: &Value) -> Option<EmbedHeight> {
        if origin != self.widget_origin {
            return None;
        }
        let EmbedMessage::WidgetResize { height } = EmbedMessage::deserialize(data).ok()?;
        if !height.is_finite() || height < 0.0 || height > f64::from(u32::MAX) {
            return None;
        }
        let px = EmbedHeight(height.round() as u32);
        self.frame.set_height_px(px.0);
        self.applied = Some(px);
        Some(px)
    }
}

/// Serialized origin (`scheme://host[:port]`) of `url`.
pub fn origin_of(url: &str) -> Result<String, CoreError> {
    let parsed = Url::parse(url).map_err(|e| CoreError::InvalidConfig(format!("{url}: {e}")))?;
    Ok(parsed.origin().ascii_serialization())
}

/// Iframe source for the embeddable widget page:
/// `<widget_base>/widget?sku=<sku>&embed=true`.
pub fn embed_url(widget_base: &str, sku: &str) -> Result<Url, CoreError> {
    let mut url =
        Url::parse(widget_base)
            .map_err(|e| CoreError::InvalidConfig(format!("{widget_base}: {e}")))?;
    url.path_segments_mut()
        .map_err(|()| CoreError::InvalidConfig(format!("{widget_base}: cannot be a base")))?
        .pop_if_empty()
        .push("widget");
    url.query_pairs_mut()
        .clear()
        .append_pair("sku", sku)
        .append_pair("embed", "true");
    Ok(url)
}

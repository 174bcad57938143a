//! Presentation of widget state.
//!
//! The state machine owns the state and pushes every change through a
//! [`WidgetView`]. [`MarkupView`] renders to an HTML fragment, the same
//! markup the hosted script injects into the product page.

use std::fmt::Write;

use html_escape::{encode_double_quoted_attribute, encode_text};

use crate::likes::LikeBook;
use crate::widget::WidgetLoadState;

pub const LOADING_MESSAGE: &str = "Loading lifestyle images...";
pub const EMPTY_MESSAGE: &str = "No lifestyle images available";
pub const FAILURE_MESSAGE: &str = "Failed to load lifestyle images";

const HEART_PATH: &str = "M4.318 6.318a4.5 4.5 0 000 6.364L12 20.364l7.682-7.682a4.5 4.5 0 00-6.364-6.364L12 7.636l-1.318-1.318a4.5 4.5 0 00-6.364 0z";

/// Receives the full state after every transition.
pub trait WidgetView {
    fn render(&mut self, state: &WidgetLoadState, likes: &LikeBook);
}

impl<V: WidgetView + ?Sized> WidgetView for Box<V> {
    fn render(&mut self, state: &WidgetLoadState, likes: &LikeBook) {
        (**self).render(state, likes);
    }
}

/// Keeps the most recent markup.
#[derive(Debug, Default, Clone)]
pub struct MarkupView {
    markup: String,
    renders: usize,
}

impl MarkupView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn markup(&self) -> &str {
        &self.markup
    }

    /// How many times the view has been rendered.
    pub fn render_count(&self) -> usize {
        self.renders
    }
}

impl WidgetView for MarkupView {
    fn render(&mut self, state: &WidgetLoadState, likes: &LikeBook) {
        self.markup = render_markup(state, likes);
        self.renders += 1;
    }
}

/// Render `state` to an HTML fragment. Server strings are escaped.
pub fn render_markup(state: &WidgetLoadState, likes: &LikeBook) -> String {
    match state {
        WidgetLoadState::Idle => String::new(),
        WidgetLoadState::Loading => {
            format!(r#"<div class="lifestyle-widget-loading">{LOADING_MESSAGE}</div>"#)
        }
        WidgetLoadState::Empty => {
            format!(r#"<div class="lifestyle-widget-error">{EMPTY_MESSAGE}</div>"#)
        }
        WidgetLoadState::Errored(_) => {
            format!(r#"<div class="lifestyle-widget-error">{FAILURE_MESSAGE}</div>"#)
        }
        WidgetLoadState::Ready(renders) => {
            let mut out = String::from(r#"<div class="lifestyle-widget-grid">"#);
            for render in renders {
                let like = likes.get(&render.id);
                let fill = if like.liked { "filled" } else { "outline" };
                let _ = write!(
                    out,
                    concat!(
                        r#"<div class="lifestyle-widget-item" data-render-id="{id}">"#,
                        r#"<img src="{src}" alt="{alt}" loading="lazy">"#,
                        r#"<div class="lifestyle-widget-like">"#,
                        r#"<svg class="lifestyle-widget-heart {fill}" viewBox="0 0 24 24" stroke="currentColor" stroke-width="2"><path d="{path}"/></svg>"#,
                        r#"<span class="lifestyle-widget-count">{total}</span>"#,
                        "</div></div>",
                    ),
                    id = encode_double_quoted_attribute(&render.id),
                    src = encode_double_quoted_attribute(&render.image_url),
                    alt = encode_double_quoted_attribute(&render.alt_text),
                    fill = fill,
                    path = HEART_PATH,
                    total = encode_text(&like.total.to_string()),
                );
            }
            out.push_str("</div>");
            out
        }
    }
}

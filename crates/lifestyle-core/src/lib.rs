//! Client runtime for the lifestyle image widget.
//!
//! The widget shows up to two lifestyle images for the product a storefront
//! page is displaying, lets the visitor like them and reports view/like/click
//! analytics. This crate holds the parts that do not depend on how the host
//! page is parsed or how requests travel:
//!
//! - [`session`]: durable anonymous visitor id
//! - [`widget`]: load → render → interact state machine
//! - [`likes`], [`analytics`]: toggle and event clients over [`api::WidgetApi`]
//! - [`embed`]: iframe height protocol, both halves
//! - [`facade`]: `init` / `load` entry points for host integrations
//!
//! SKU detection lives behind [`resolve::SkuResolver`]; transports implement
//! [`api::WidgetApi`] and decode bodies with [`wire`].

pub mod analytics;
pub mod api;
pub mod config;
pub mod embed;
pub mod error;
pub mod facade;
pub mod likes;
pub mod resolve;
pub mod session;
pub mod system;
pub mod types;
pub mod view;
pub mod widget;
pub mod wire;

pub use api::WidgetApi;
pub use config::{LikeEventPolicy, WidgetConfig};
pub use error::CoreError;
pub use facade::{LifestyleWidget, MountError, WidgetHost};
pub use resolve::{Resolution, SkuResolver, SkuSource};
pub use session::SessionProvider;
pub use types::{EventType, LikeState, Render, SessionId};
pub use view::{MarkupView, WidgetView};
pub use widget::{Widget, WidgetLoadState};

use std::cell::RefCell;

use thiserror::Error;
use tracing::warn;

use crate::api::WidgetApi;
use crate::config::WidgetConfig;
use crate::resolve::SkuResolver;
use crate::session::SessionProvider;
use crate::types::SessionId;
use crate::view::WidgetView;
use crate::widget::Widget;

/// Why a widget could not be placed on the page.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MountError {
    #[error("could not detect SKU for lifestyle widget")]
    SkuNotDetected,
    #[error("could not find suitable element to insert lifestyle widget")]
    NoInsertionPoint,
    #[error("widget container not found: {0}")]
    ContainerNotFound(String),
}

/// The page the widget is being placed on.
pub trait WidgetHost {
    type View: WidgetView;

    /// A view onto an existing element with this id.
    fn container(&mut self, id: &str) -> Option<Self::View>;

    /// Create an element with this id at the page's insertion point.
    fn insert_container(&mut self, id: &str) -> Option<Self::View>;
}

/// Default container id for a SKU.
pub fn container_id(sku: &str) -> String {
    format!("lifestyle-widget-{sku}")
}

/// Entry point handed to host integrations.
///
/// Owns the API handle, the session provider and the configuration, and
/// starts a fresh [`Widget`] per mount.
pub struct LifestyleWidget<A> {
    api: A,
    sessions: RefCell<SessionProvider>,
    config: WidgetConfig,
}

impl<A: WidgetApi + Clone> LifestyleWidget<A> {
    pub fn new(api: A, sessions: SessionProvider, config: WidgetConfig) -> Self {
        Self {
            api,
            sessions: RefCell::new(sessions),
            config,
        }
    }

    pub fn session_id(&self) -> SessionId {
        self.sessions.borrow_mut().session_id()
    }

    pub fn clear_session(&self) {
        self.sessions.borrow_mut().clear();
    }

    /// A new machine in `Idle` for `sku`, rendering into `view`.
    pub fn mount<V: WidgetView>(&self, sku: &str, view: V) -> Widget<A, V> {
        Widget::new(
            sku,
            self.api.clone(),
            self.session_id(),
            view,
            self.config.clone(),
        )
    }

    /// Load `sku` into the existing element `container_id`.
    pub async fn load<H: WidgetHost>(
        &self,
        sku: &str,
        container_id: &str,
        host: &mut H,
    ) -> Result<Widget<A, H::View>, MountError> {
        let Some(view) = host.container(container_id) else {
            warn!(container_id, "widget container not found");
            return Err(MountError::ContainerNotFound(container_id.to_string()));
        };
        let widget = self.mount(sku, view);
        widget.load().await;
        Ok(widget)
    }

    /// Detect the SKU, insert a container for it and load.
    pub async fn init<R, H>(
        &self,
        resolver: &R,
        host: &mut H,
    ) -> Result<Widget<A, H::View>, MountError>
    where
        R: SkuResolver,
        H: WidgetHost,
    {
        let Some(resolution) = resolver.resolve() else {
            warn!("could not detect SKU for lifestyle widget");
            return Err(MountError::SkuNotDetected);
        };
        let id = container_id(&resolution.sku);
        let Some(view) = host.insert_container(&id) else {
            warn!(
                sku = %resolution.sku,
                "could not find suitable element to insert lifestyle widget"
            );
            return Err(MountError::NoInsertionPoint);
        };
        let widget = self.mount(&resolution.sku, view);
        widget.load().await;
        Ok(widget)
    }
}

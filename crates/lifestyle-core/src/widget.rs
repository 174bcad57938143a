//! The per-SKU widget state machine.
//!
//! ```text
//! Idle ──load──▶ Loading ──┬─ ≥1 render ──▶ Ready(renders)  ⟲ toggle_like
//!                          ├─ 0 renders ──▶ Empty
//!                          └─ failure ────▶ Errored(reason)
//! ```
//!
//! `Empty` and `Errored` are terminal for a mount. State lives behind
//! `RefCell`s and no borrow is held across an await, so a `load` and any
//! number of toggles on different renders can be in flight at once on a
//! single-threaded executor. After [`Widget::unmount`] every pending
//! continuation drops its result instead of writing it.

use std::cell::{Cell, Ref, RefCell};

use tracing::{debug, info, warn};

use crate::analytics::Analytics;
use crate::api::{WidgetApi, RENDERS_ENDPOINT};
use crate::config::WidgetConfig;
use crate::error::CoreError;
use crate::likes::{LikeBook, LikeToggle};
use crate::types::{EventType, LikeState, Render, SessionId};
use crate::view::WidgetView;

/// Load state of one widget mount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WidgetLoadState {
    Idle,
    Loading,
    Ready(Vec<Render>),
    Empty,
    Errored(String),
}

impl WidgetLoadState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, WidgetLoadState::Empty | WidgetLoadState::Errored(_))
    }

    pub fn renders(&self) -> Option<&[Render]> {
        match self {
            WidgetLoadState::Ready(renders) => Some(renders),
            _ => None,
        }
    }
}

pub struct Widget<A, V> {
    sku: String,
    api: A,
    session: SessionId,
    config: WidgetConfig,
    state: RefCell<WidgetLoadState>,
    likes: RefCell<LikeBook>,
    view: RefCell<V>,
    mounted: Cell<bool>,
    view_logged: Cell<bool>,
}

impl<A: WidgetApi, V: WidgetView> Widget<A, V> {
    pub fn new(
        sku: impl Into<String>,
        api: A,
        session: SessionId,
        view: V,
        config: WidgetConfig,
    ) -> Self {
        Self {
            sku: sku.into(),
            api,
            session,
            config,
            state: RefCell::new(WidgetLoadState::Idle),
            likes: RefCell::new(LikeBook::new()),
            view: RefCell::new(view),
            mounted: Cell::new(true),
            view_logged: Cell::new(false),
        }
    }

    pub fn sku(&self) -> &str {
        &self.sku
    }

    pub fn session(&self) -> &SessionId {
        &self.session
    }

    pub fn state(&self) -> WidgetLoadState {
        self.state.borrow().clone()
    }

    pub fn like_state(&self, render_id: &str) -> LikeState {
        self.likes.borrow().get(render_id)
    }

    pub fn view(&self) -> Ref<'_, V> {
        self.view.borrow()
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.get()
    }

    /// Detach from the view. Results still in flight are discarded.
    pub fn unmount(&self) {
        if self.mounted.replace(false) {
            debug!(sku = %self.sku, "widget unmounted");
        }
    }

    /// Run `Idle → Loading → {Ready, Empty, Errored}` once.
    ///
    /// On `Ready` the single `view` event for this mount goes out keyed to
    /// the first render, then like states are hydrated if configured. No
    /// retry on failure; a second call on the same mount is a no-op.
    pub async fn load(&self) {
        if *self.state.borrow() != WidgetLoadState::Idle {
            debug!(sku = %self.sku, "load ignored: widget already started");
            return;
        }
        if !self.mounted.get() {
            return;
        }
        self.transition(WidgetLoadState::Loading);

        let result = self.fetch_renders().await;
        if !self.mounted.get() {
            debug!(sku = %self.sku, "discarding renders for unmounted widget");
            return;
        }

        let mut renders = match result {
            Ok(renders) => renders,
            Err(e) => {
                warn!(sku = %self.sku, error = %e, "failed to load renders");
                self.transition(WidgetLoadState::Errored(e.reason()));
                return;
            }
        };
        renders.truncate(self.config.max_renders);
        if renders.is_empty() {
            self.transition(WidgetLoadState::Empty);
            return;
        }

        let ids: Vec<String> = renders.iter().map(|r| r.id.clone()).collect();
        self.transition(WidgetLoadState::Ready(renders));

        self.log_view(&ids[0]).await;
        if self.config.hydrate_likes {
            self.hydrate_likes(&ids).await;
        }
    }

    /// The configured timeout uses tokio's timer; outside a tokio runtime
    /// the fetch runs unbounded.
    async fn fetch_renders(&self) -> Result<Vec<Render>, CoreError> {
        let request = self.api.fetch_renders(&self.sku);
        let Some(limit) = self.config.load_timeout() else {
            return request.await;
        };
        if tokio::runtime::Handle::try_current().is_err() {
            warn!(sku = %self.sku, "no tokio runtime, loading without timeout");
            return request.await;
        }
        tokio::time::timeout(limit, request)
            .await
            .map_err(|_| CoreError::Timeout {
                endpoint: RENDERS_ENDPOINT.to_string(),
                millis: limit.as_millis() as u64,
            })?
    }

    async fn log_view(&self, first_render: &str) {
        if self.view_logged.replace(true) {
            return;
        }
        Analytics::new(&self.api, &self.session)
            .log(first_render, EventType::View)
            .await;
    }

    /// Best-effort: failures leave every render at the unliked default.
    async fn hydrate_likes(&self, ids: &[String]) {
        match self.api.like_states(ids, &self.session).await {
            Ok(lookup) => {
                if !self.mounted.get() {
                    return;
                }
                let added = self.likes.borrow_mut().hydrate(lookup, ids);
                if added > 0 {
                    self.redraw();
                }
            }
            Err(e) => debug!(sku = %self.sku, error = %e, "like hydration skipped"),
        }
    }

    /// Toggle the like on one displayed render.
    ///
    /// The displayed state changes only after the server confirms, and then
    /// is replaced by the response wholesale. On failure nothing changes and
    /// the error is returned to the caller; it is never retried here.
    pub async fn toggle_like(&self, render_id: &str) -> Result<LikeState, CoreError> {
        self.ensure_displayed(render_id)?;

        let confirmed = LikeToggle::new(&self.api, &self.session)
            .toggle(render_id)
            .await?;

        if self.mounted.get() {
            self.likes.borrow_mut().confirm(render_id, confirmed);
            self.redraw();
        }
        if self.config.like_event_policy.should_log(confirmed.liked) {
            Analytics::new(&self.api, &self.session)
                .log(render_id, EventType::Like)
                .await;
        }
        Ok(confirmed)
    }

    /// Record a click-through on a displayed render.
    pub async fn record_click(&self, render_id: &str) -> Result<(), CoreError> {
        self.ensure_displayed(render_id)?;
        Analytics::new(&self.api, &self.session)
            .log(render_id, EventType::Click)
            .await;
        Ok(())
    }

    fn ensure_displayed(&self, render_id: &str) -> Result<(), CoreError> {
        if !self.mounted.get() {
            return Err(CoreError::NotReady);
        }
        let state = self.state.borrow();
        let renders = state.renders().ok_or(CoreError::NotReady)?;
        if renders.iter().any(|r| r.id == render_id) {
            Ok(())
        } else {
            Err(CoreError::UnknownRender(render_id.to_string()))
        }
    }

    fn transition(&self, next: WidgetLoadState) {
        info!(sku = %self.sku, state = state_name(&next), "widget state");
        *self.state.borrow_mut() = next;
        self.redraw();
    }

    fn redraw(&self) {
        let state = self.state.borrow();
        let likes = self.likes.borrow();
        self.view.borrow_mut().render(&state, &likes);
    }
}

fn state_name(state: &WidgetLoadState) -> &'static str {
    match state {
        WidgetLoadState::Idle => "idle",
        WidgetLoadState::Loading => "loading",
        WidgetLoadState::Ready(_) => "ready",
        WidgetLoadState::Empty => "empty",
        WidgetLoadState::Errored(_) => "errored",
    }
}

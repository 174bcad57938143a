//! End-to-end behaviour of the widget state machine against a scripted API.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;
use std::time::Duration;

use async_trait::async_trait;
use lifestyle_core::api::WidgetApi;
use lifestyle_core::facade::{LifestyleWidget, MountError, WidgetHost};
use lifestyle_core::resolve::{Resolution, SkuResolver, SkuSource};
use lifestyle_core::system::MemoryStorage;
use lifestyle_core::types::{EventPayload, TogglePayload};
use lifestyle_core::view::{EMPTY_MESSAGE, FAILURE_MESSAGE};
use lifestyle_core::wire::{decode_renders, decode_toggle};
use lifestyle_core::{
    CoreError, EventType, LikeEventPolicy, LikeState, MarkupView, Render, SessionId,
    SessionProvider, Widget, WidgetConfig, WidgetLoadState,
};

/// In-memory stand-in for the server. Toggles follow the real XOR rule
/// unless a raw response has been scripted.
#[derive(Default)]
struct ScriptedApi {
    renders_status: Cell<u16>,
    renders_body: RefCell<String>,
    hang_renders: Cell<bool>,
    scripted_toggles: RefCell<VecDeque<(u16, String)>>,
    fail_toggles: Cell<bool>,
    fail_events: Cell<bool>,
    fail_like_states: Cell<bool>,
    other_likes: RefCell<HashMap<String, u64>>,
    likes: RefCell<HashSet<(String, String)>>,
    events: RefCell<Vec<EventPayload>>,
    calls: RefCell<Vec<&'static str>>,
}

impl ScriptedApi {
    fn with_renders(status: u16, body: &str) -> Rc<Self> {
        let api = Self::default();
        api.renders_status.set(status);
        *api.renders_body.borrow_mut() = body.to_string();
        Rc::new(api)
    }

    fn events(&self) -> Vec<(String, EventType)> {
        self.events
            .borrow()
            .iter()
            .map(|e| (e.sku_id.clone(), e.event_type))
            .collect()
    }

    fn total(&self, render_id: &str) -> u64 {
        let mine = self
            .likes
            .borrow()
            .iter()
            .filter(|(r, _)| r == render_id)
            .count() as u64;
        mine + self.other_likes.borrow().get(render_id).copied().unwrap_or(0)
    }
}

fn transport(endpoint: &str) -> CoreError {
    CoreError::Transport {
        endpoint: endpoint.to_string(),
        message: "connection reset".to_string(),
    }
}

#[async_trait(?Send)]
impl WidgetApi for ScriptedApi {
    async fn fetch_renders(&self, _sku: &str) -> Result<Vec<Render>, CoreError> {
        self.calls.borrow_mut().push("renders");
        tokio::task::yield_now().await;
        if self.hang_renders.get() {
            std::future::pending::<()>().await;
        }
        if self.renders_status.get() == 0 {
            return Err(transport("renders"));
        }
        decode_renders(self.renders_status.get(), &self.renders_body.borrow(), 2)
    }

    async fn toggle_like(&self, payload: &TogglePayload) -> Result<LikeState, CoreError> {
        self.calls.borrow_mut().push("toggle");
        tokio::task::yield_now().await;
        if self.fail_toggles.get() {
            return Err(transport("likes"));
        }
        if let Some((status, body)) = self.scripted_toggles.borrow_mut().pop_front() {
            return decode_toggle(status, &body);
        }
        let key = (payload.sku_id.clone(), payload.session_id.to_string());
        let liked = {
            let mut likes = self.likes.borrow_mut();
            if likes.remove(&key) {
                false
            } else {
                likes.insert(key);
                true
            }
        };
        Ok(LikeState::new(liked, self.total(&payload.sku_id)))
    }

    async fn like_states(
        &self,
        render_ids: &[String],
        session: &SessionId,
    ) -> Result<HashMap<String, LikeState>, CoreError> {
        self.calls.borrow_mut().push("like_states");
        if self.fail_like_states.get() {
            return Err(transport("likes"));
        }
        let likes = self.likes.borrow();
        Ok(render_ids
            .iter()
            .map(|id| {
                let liked = likes.contains(&(id.clone(), session.to_string()));
                (id.clone(), LikeState::new(liked, self.total(id)))
            })
            .collect())
    }

    async fn log_event(&self, payload: &EventPayload) -> Result<(), CoreError> {
        self.calls.borrow_mut().push("event");
        self.events.borrow_mut().push(payload.clone());
        if self.fail_events.get() {
            return Err(transport("events"));
        }
        Ok(())
    }
}

const TWO_RENDERS: &str = r#"[
    {"id":"render1","image_url":"https://example.com/image1.jpg","alt_text":"Test image 1"},
    {"id":"render2","image_url":"https://example.com/image2.jpg","alt_text":"Test image 2"}
]"#;

fn facade(api: &Rc<ScriptedApi>, config: WidgetConfig) -> LifestyleWidget<Rc<ScriptedApi>> {
    let sessions =
        SessionProvider::persistent("shopify-widget-session", Box::new(MemoryStorage::new()));
    LifestyleWidget::new(Rc::clone(api), sessions, config)
}

fn widget(api: &Rc<ScriptedApi>) -> Widget<Rc<ScriptedApi>, MarkupView> {
    facade(api, WidgetConfig::default()).mount("ABC123", MarkupView::new())
}

#[tokio::test]
async fn two_renders_reach_ready_with_one_view_event() {
    let api = ScriptedApi::with_renders(200, TWO_RENDERS);
    let widget = widget(&api);
    assert_eq!(widget.state(), WidgetLoadState::Idle);

    widget.load().await;

    let state = widget.state();
    let renders = state.renders().expect("ready");
    assert_eq!(renders.len(), 2);
    assert_eq!(renders[0].id, "render1");
    assert_eq!(api.events(), vec![("render1".to_string(), EventType::View)]);
    assert!(widget.view().markup().contains("https://example.com/image2.jpg"));
}

#[tokio::test]
async fn like_updates_count_from_response_and_logs_like() {
    let api = ScriptedApi::with_renders(200, TWO_RENDERS);
    api.scripted_toggles
        .borrow_mut()
        .push_back((200, r#"{"liked":true,"total_likes":5}"#.to_string()));
    let widget = widget(&api);
    widget.load().await;

    let state = widget.toggle_like("render1").await.unwrap();

    assert_eq!(state, LikeState::new(true, 5));
    assert_eq!(widget.like_state("render1"), state);
    assert!(widget
        .view()
        .markup()
        .contains(r#"<span class="lifestyle-widget-count">5</span>"#));
    assert_eq!(
        api.events(),
        vec![
            ("render1".to_string(), EventType::View),
            ("render1".to_string(), EventType::Like),
        ]
    );
}

#[tokio::test]
async fn error_status_reaches_errored_without_analytics() {
    let api = ScriptedApi::with_renders(500, r#"{"error":"API Error"}"#);
    let widget = widget(&api);

    widget.load().await;

    assert!(matches!(widget.state(), WidgetLoadState::Errored(_)));
    assert!(widget.view().markup().contains(FAILURE_MESSAGE));
    assert!(api.events().is_empty());
}

#[tokio::test]
async fn transport_error_reaches_errored_without_view() {
    let api = ScriptedApi::with_renders(0, "");
    let widget = widget(&api);
    widget.load().await;
    assert!(matches!(widget.state(), WidgetLoadState::Errored(_)));
    assert!(api.events().is_empty());
    assert_eq!(*api.calls.borrow(), vec!["renders"]);
}

#[tokio::test]
async fn zero_renders_is_empty_not_errored() {
    let api = ScriptedApi::with_renders(200, "[]");
    let widget = widget(&api);
    widget.load().await;
    assert_eq!(widget.state(), WidgetLoadState::Empty);
    assert!(widget.view().markup().contains(EMPTY_MESSAGE));
    assert!(api.events().is_empty());
}

#[tokio::test]
async fn terminal_states_do_not_reload() {
    let api = ScriptedApi::with_renders(200, "[]");
    let widget = widget(&api);
    widget.load().await;
    widget.load().await;
    assert_eq!(*api.calls.borrow(), vec!["renders"]);
    assert!(widget.state().is_terminal());
}

#[tokio::test]
async fn second_load_does_not_repeat_view() {
    let api = ScriptedApi::with_renders(200, TWO_RENDERS);
    let widget = widget(&api);
    widget.load().await;
    widget.load().await;
    assert_eq!(api.events().len(), 1);
}

#[tokio::test]
async fn toggle_twice_is_its_own_inverse() {
    let api = ScriptedApi::with_renders(200, TWO_RENDERS);
    api.other_likes.borrow_mut().insert("render2".to_string(), 3);
    let widget = widget(&api);
    widget.load().await;
    let before = widget.like_state("render2");
    assert_eq!(before, LikeState::new(false, 3));

    let first = widget.toggle_like("render2").await.unwrap();
    let second = widget.toggle_like("render2").await.unwrap();

    assert_eq!(first, LikeState::new(true, 4));
    assert_eq!(second, LikeState::new(false, 3));
    assert_eq!(widget.like_state("render2").total, before.total);
}

#[tokio::test]
async fn every_toggle_logs_like_by_default() {
    let api = ScriptedApi::with_renders(200, TWO_RENDERS);
    let widget = widget(&api);
    widget.load().await;
    widget.toggle_like("render1").await.unwrap();
    widget.toggle_like("render1").await.unwrap();

    let likes = api
        .events()
        .into_iter()
        .filter(|(_, kind)| *kind == EventType::Like)
        .count();
    assert_eq!(likes, 2);
}

#[tokio::test]
async fn liked_only_policy_skips_unlike() {
    let api = ScriptedApi::with_renders(200, TWO_RENDERS);
    let config = WidgetConfig {
        like_event_policy: LikeEventPolicy::LikedOnly,
        ..WidgetConfig::default()
    };
    let widget = facade(&api, config).mount("ABC123", MarkupView::new());
    widget.load().await;
    widget.toggle_like("render1").await.unwrap();
    widget.toggle_like("render1").await.unwrap();

    assert_eq!(
        api.events(),
        vec![
            ("render1".to_string(), EventType::View),
            ("render1".to_string(), EventType::Like),
        ]
    );
}

#[tokio::test]
async fn failed_toggle_leaves_display_untouched() {
    let api = ScriptedApi::with_renders(200, TWO_RENDERS);
    api.other_likes.borrow_mut().insert("render1".to_string(), 7);
    let widget = widget(&api);
    widget.load().await;
    let shown = widget.like_state("render1");
    let markup = widget.view().markup().to_string();

    api.fail_toggles.set(true);
    assert!(widget.toggle_like("render1").await.is_err());

    assert_eq!(widget.like_state("render1"), shown);
    assert_eq!(widget.view().markup(), markup);
    assert!(api.events().iter().all(|(_, kind)| *kind != EventType::Like));
    assert_eq!(
        api.calls.borrow().iter().filter(|c| **c == "toggle").count(),
        1,
        "a failed toggle is never retried"
    );
}

#[tokio::test]
async fn garbage_toggle_body_counts_as_failure() {
    let api = ScriptedApi::with_renders(200, TWO_RENDERS);
    api.scripted_toggles
        .borrow_mut()
        .push_back((200, "<html>gateway</html>".to_string()));
    let widget = widget(&api);
    widget.load().await;
    assert!(widget.toggle_like("render1").await.is_err());
    assert_eq!(widget.like_state("render1"), LikeState::default());
}

#[tokio::test]
async fn toggle_requires_ready_and_known_render() {
    let api = ScriptedApi::with_renders(200, TWO_RENDERS);
    let widget = widget(&api);
    assert!(matches!(widget.toggle_like("render1").await, Err(CoreError::NotReady)));
    widget.load().await;
    assert!(matches!(
        widget.toggle_like("render9").await,
        Err(CoreError::UnknownRender(_))
    ));
    assert!(!api.calls.borrow().contains(&"toggle"));
}

#[tokio::test]
async fn hydration_prefills_session_likes() {
    let api = ScriptedApi::with_renders(200, TWO_RENDERS);
    let widget = widget(&api);
    api.likes
        .borrow_mut()
        .insert(("render2".to_string(), widget.session().to_string()));
    api.other_likes.borrow_mut().insert("render2".to_string(), 1);

    widget.load().await;

    assert_eq!(widget.like_state("render2"), LikeState::new(true, 2));
    assert!(widget.view().markup().contains("lifestyle-widget-heart filled"));
    assert_eq!(*api.calls.borrow(), vec!["renders", "event", "like_states"]);
}

#[tokio::test]
async fn hydration_failure_is_swallowed() {
    let api = ScriptedApi::with_renders(200, TWO_RENDERS);
    api.fail_like_states.set(true);
    let widget = widget(&api);
    widget.load().await;
    assert!(widget.state().renders().is_some());
    assert_eq!(widget.like_state("render1"), LikeState::default());
}

#[tokio::test]
async fn failed_view_event_does_not_affect_ui() {
    let api = ScriptedApi::with_renders(200, TWO_RENDERS);
    api.fail_events.set(true);
    let widget = widget(&api);
    widget.load().await;
    assert!(widget.state().renders().is_some());
    assert_eq!(api.events().len(), 1, "attempted once, never retried");
}

#[tokio::test]
async fn concurrent_toggles_on_different_renders() {
    let api = ScriptedApi::with_renders(200, TWO_RENDERS);
    let widget = widget(&api);
    widget.load().await;

    let (a, b) = tokio::join!(widget.toggle_like("render1"), widget.toggle_like("render2"));

    assert!(a.unwrap().liked);
    assert!(b.unwrap().liked);
    assert!(widget.like_state("render1").liked);
    assert!(widget.like_state("render2").liked);
}

#[tokio::test]
async fn unmount_discards_in_flight_load() {
    let api = ScriptedApi::with_renders(200, TWO_RENDERS);
    let widget = widget(&api);

    assert!(widget.is_mounted());
    tokio::join!(widget.load(), async { widget.unmount() });

    assert!(!widget.is_mounted());
    assert_eq!(widget.state(), WidgetLoadState::Loading);
    assert_eq!(widget.view().render_count(), 1);
    assert!(api.events().is_empty());
}

#[tokio::test]
async fn unmount_discards_in_flight_toggle_result() {
    let api = ScriptedApi::with_renders(200, TWO_RENDERS);
    let widget = widget(&api);
    widget.load().await;
    let renders_before = widget.view().render_count();

    let (result, ()) = tokio::join!(widget.toggle_like("render1"), async { widget.unmount() });

    assert!(result.unwrap().liked);
    assert_eq!(widget.like_state("render1"), LikeState::default());
    assert_eq!(widget.view().render_count(), renders_before);
}

#[tokio::test]
async fn hung_fetch_stays_loading_without_timeout() {
    let api = ScriptedApi::with_renders(200, TWO_RENDERS);
    api.hang_renders.set(true);
    let widget = widget(&api);
    let outer = tokio::time::timeout(Duration::from_millis(20), widget.load()).await;
    assert!(outer.is_err());
    assert_eq!(widget.state(), WidgetLoadState::Loading);
}

#[tokio::test]
async fn configured_timeout_surfaces_as_errored() {
    let api = ScriptedApi::with_renders(200, TWO_RENDERS);
    api.hang_renders.set(true);
    let config = WidgetConfig {
        load_timeout_ms: Some(10),
        ..WidgetConfig::default()
    };
    let widget = facade(&api, config).mount("ABC123", MarkupView::new());
    widget.load().await;
    assert_eq!(widget.state(), WidgetLoadState::Errored("timed out".to_string()));
    assert!(api.events().is_empty());
}

#[test]
fn timeout_outside_tokio_loads_unbounded() {
    let api = ScriptedApi::with_renders(200, TWO_RENDERS);
    let config = WidgetConfig {
        load_timeout_ms: Some(1000),
        ..WidgetConfig::default()
    };
    let widget = facade(&api, config).mount("ABC123", MarkupView::new());

    futures::executor::block_on(widget.load());

    assert_eq!(widget.state().renders().map(<[Render]>::len), Some(2));
    assert_eq!(api.events(), vec![("render1".to_string(), EventType::View)]);
}

#[tokio::test]
async fn click_is_logged_against_render() {
    let api = ScriptedApi::with_renders(200, TWO_RENDERS);
    let widget = widget(&api);
    widget.load().await;
    widget.record_click("render2").await.unwrap();
    assert_eq!(api.events()[1], ("render2".to_string(), EventType::Click));
}

#[tokio::test]
async fn session_is_shared_across_mounts() {
    let api = ScriptedApi::with_renders(200, TWO_RENDERS);
    let entry = facade(&api, WidgetConfig::default());
    let a = entry.mount("ABC123", MarkupView::new());
    let b = entry.mount("XYZ789", MarkupView::new());
    assert_eq!(a.session(), b.session());
}

struct FixedResolver(Option<&'static str>);

impl SkuResolver for FixedResolver {
    fn resolve(&self) -> Option<Resolution> {
        self.0.map(|sku| Resolution {
            sku: sku.to_string(),
            source: SkuSource::UrlPath,
        })
    }
}

#[derive(Default)]
struct Page {
    ids: Vec<String>,
    has_insertion_point: bool,
}

impl WidgetHost for Page {
    type View = MarkupView;

    fn container(&mut self, id: &str) -> Option<MarkupView> {
        self.ids.iter().any(|i| i == id).then(MarkupView::new)
    }

    fn insert_container(&mut self, id: &str) -> Option<MarkupView> {
        if !self.has_insertion_point {
            return None;
        }
        self.ids.push(id.to_string());
        Some(MarkupView::new())
    }
}

#[tokio::test]
async fn init_mounts_under_sku_container() {
    let api = ScriptedApi::with_renders(200, TWO_RENDERS);
    let entry = facade(&api, WidgetConfig::default());
    let mut page = Page {
        has_insertion_point: true,
        ..Page::default()
    };

    let widget = entry.init(&FixedResolver(Some("ABC123")), &mut page).await.unwrap();

    assert_eq!(widget.sku(), "ABC123");
    assert_eq!(page.ids, vec!["lifestyle-widget-ABC123"]);
    assert!(widget.state().renders().is_some());
}

#[tokio::test]
async fn init_without_sku_makes_no_requests() {
    let api = ScriptedApi::with_renders(200, TWO_RENDERS);
    let entry = facade(&api, WidgetConfig::default());
    let mut page = Page {
        has_insertion_point: true,
        ..Page::default()
    };
    let err = entry.init(&FixedResolver(None), &mut page).await.err();
    assert_eq!(err, Some(MountError::SkuNotDetected));
    assert!(api.calls.borrow().is_empty());
}

#[tokio::test]
async fn init_without_insertion_point() {
    let api = ScriptedApi::with_renders(200, TWO_RENDERS);
    let entry = facade(&api, WidgetConfig::default());
    let err = entry
        .init(&FixedResolver(Some("ABC123")), &mut Page::default())
        .await
        .err();
    assert_eq!(err, Some(MountError::NoInsertionPoint));
}

#[tokio::test]
async fn load_into_missing_container() {
    let api = ScriptedApi::with_renders(200, TWO_RENDERS);
    let entry = facade(&api, WidgetConfig::default());
    let err = entry
        .load("ABC123", "nowhere", &mut Page::default())
        .await
        .err();
    assert_eq!(err, Some(MountError::ContainerNotFound("nowhere".to_string())));
    assert!(api.calls.borrow().is_empty());
}

#[tokio::test]
async fn load_into_existing_container() {
    let api = ScriptedApi::with_renders(200, TWO_RENDERS);
    let entry = facade(&api, WidgetConfig::default());
    let mut page = Page {
        ids: vec!["product-widget".to_string()],
        ..Page::default()
    };

    let widget = entry.load("XYZ789", "product-widget", &mut page).await.unwrap();

    assert_eq!(widget.sku(), "XYZ789");
    assert!(matches!(widget.state(), WidgetLoadState::Ready(ref r) if r.len() == 2));
    assert_eq!(widget.view().render_count(), 2);
    assert_eq!(page.ids, vec!["product-widget"]);
}

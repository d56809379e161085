use crate::api::{ApiClient, ApiError, Topic, TopicPage};
use crate::feed::state::FeedState;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Completion events from background feed tasks.
///
/// Every asynchronous operation resolves into one of these; the hosting loop
/// routes them back into [`FeedController::handle_event`] so all state
/// mutation happens on the event loop, never inside a spawned task.
pub enum FeedEvent {
    InitialLoaded(Result<TopicPage, ApiError>),
    /// Cursor fetches carry the list generation they were issued under, so a
    /// completion that raced a reload is recognized as stale and dropped.
    OlderLoaded {
        generation: u64,
        result: Result<TopicPage, ApiError>,
    },
    NewerLoaded {
        generation: u64,
        result: Result<Vec<Topic>, ApiError>,
    },
    /// The poll timer elapsed. Routed as an event so the count request is
    /// built from the newest id at handling time, not at tick time.
    PollTick,
    NewCountFetched(Result<u64, ApiError>),
    DeleteCompleted {
        topic_id: i64,
        result: Result<(), ApiError>,
    },
    /// A composed topic was submitted. The feed does not insert the result
    /// locally; the next poll surfaces it as a new-topic count. The UI layer
    /// watches this event to settle the compose box.
    TopicPosted(Result<Topic, ApiError>),
}

/// Orchestrates the feed: owns the [`FeedState`], the API client, the fixed
/// scope, and the poll timer.
///
/// User-triggered operations check the state's re-entrancy gate, then spawn a
/// request task that reports back through the event channel. The `active`
/// flag is the teardown guard: once [`stop`](Self::stop) runs, every event —
/// including poll ticks already queued in the channel — is discarded instead
/// of mutating torn-down state. One-shot requests are not cancelled on stop;
/// their late completions are discarded the same way.
pub struct FeedController {
    api: ApiClient,
    /// Feed scope, fixed at creation: `None` for the global feed, or a
    /// username for that profile's topics.
    scope: Option<String>,
    page_size: u32,
    poll_interval: Duration,
    state: FeedState,
    events: mpsc::Sender<FeedEvent>,
    active: bool,
    poll_handle: Option<JoinHandle<()>>,
}

impl FeedController {
    pub fn new(
        api: ApiClient,
        scope: Option<String>,
        page_size: u32,
        poll_interval: Duration,
        events: mpsc::Sender<FeedEvent>,
    ) -> Self {
        Self {
            api,
            scope,
            page_size,
            poll_interval,
            state: FeedState::new(),
            events,
            active: false,
            poll_handle: None,
        }
    }

    pub fn state(&self) -> &FeedState {
        &self.state
    }

    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    /// Activate the controller and kick off the initial page load.
    pub fn start(&mut self) {
        self.active = true;
        self.load_initial();
    }

    /// Deactivate: no further events mutate state, and the poll timer is
    /// torn down. Idempotent — a second call finds the handle already taken.
    pub fn stop(&mut self) {
        self.active = false;
        if let Some(handle) = self.poll_handle.take() {
            handle.abort();
            tracing::debug!("Aborted poll task on controller stop");
        }
    }

    /// Fetch the first page. Also serves as the manual reload after a failed
    /// initial load; guarded so only one initial fetch is in flight.
    pub fn load_initial(&mut self) {
        if self.state.flags().loading_initial {
            return;
        }
        self.state.begin_initial();

        let api = self.api.clone();
        let scope = self.scope.clone();
        let size = self.page_size;
        let tx = self.events.clone();
        tokio::spawn(async move {
            let result = api.initial_page(scope.as_deref(), size).await;
            send_event(&tx, FeedEvent::InitialLoaded(result)).await;
        });
    }

    /// Fetch the page before the current oldest topic. Silent no-op when the
    /// feed is empty or a load-older is already in flight.
    pub fn load_older(&mut self) {
        let Some(cursor) = self.state.begin_older() else {
            tracing::trace!("load_older suppressed (empty feed or already in flight)");
            return;
        };
        let generation = self.state.generation();

        let api = self.api.clone();
        let scope = self.scope.clone();
        let size = self.page_size;
        let tx = self.events.clone();
        tokio::spawn(async move {
            let result = api.older_page(cursor, scope.as_deref(), size).await;
            send_event(&tx, FeedEvent::OlderLoaded { generation, result }).await;
        });
    }

    /// Fetch everything newer than the current newest topic. Silent no-op
    /// when a load-newer is already in flight.
    pub fn load_newer(&mut self) {
        let Some(cursor) = self.state.begin_newer() else {
            tracing::trace!("load_newer suppressed (already in flight)");
            return;
        };
        let generation = self.state.generation();

        let api = self.api.clone();
        let scope = self.scope.clone();
        let tx = self.events.clone();
        tokio::spawn(async move {
            let result = api.newer_topics(cursor, scope.as_deref()).await;
            send_event(&tx, FeedEvent::NewerLoaded { generation, result }).await;
        });
    }

    /// Stage a topic for deletion, pending confirmation.
    pub fn request_delete(&mut self, topic: Topic) {
        self.state.request_delete(topic);
    }

    /// Abandon a pending delete confirmation.
    pub fn cancel_delete(&mut self) {
        self.state.cancel_delete();
    }

    /// Issue the delete request for the confirmed target. No-op without a
    /// pending target or while a delete is already in flight.
    pub fn confirm_delete(&mut self) {
        let Some(topic_id) = self.state.begin_delete() else {
            return;
        };

        let api = self.api.clone();
        let tx = self.events.clone();
        tokio::spawn(async move {
            let result = api.delete_topic(topic_id).await;
            send_event(&tx, FeedEvent::DeleteCompleted { topic_id, result }).await;
        });
    }

    /// Submit a composed topic. The in-flight gate for composing lives in
    /// the UI layer, which also consumes the completion event.
    pub fn post_topic(&self, content: String) {
        let api = self.api.clone();
        let tx = self.events.clone();
        tokio::spawn(async move {
            let result = api.post_topic(&content).await;
            send_event(&tx, FeedEvent::TopicPosted(result)).await;
        });
    }

    /// Apply a completion event to the feed state.
    ///
    /// Discards everything after deactivation — the required guard against
    /// late-arriving responses mutating torn-down state.
    pub fn handle_event(&mut self, event: FeedEvent) {
        if !self.active {
            tracing::debug!("Discarding feed event after deactivation");
            return;
        }

        match event {
            FeedEvent::InitialLoaded(result) => {
                let ok = result.is_ok();
                self.state
                    .finish_initial(log_failure("initial_load", result));
                // Polling starts once the first page has landed; a reload
                // after that reuses the already-running timer.
                if ok && self.poll_handle.is_none() {
                    self.start_polling();
                }
            }
            FeedEvent::OlderLoaded { generation, result } => {
                self.state
                    .finish_older(generation, log_failure("load_older", result));
            }
            FeedEvent::NewerLoaded { generation, result } => {
                self.state
                    .finish_newer(generation, log_failure("load_newer", result));
            }
            FeedEvent::PollTick => self.spawn_count_fetch(),
            FeedEvent::NewCountFetched(result) => {
                // Failures leave the previous count; the next tick overwrites.
                if let Ok(count) = log_failure("poll_count", result) {
                    self.state.set_new_topic_count(count);
                }
            }
            FeedEvent::DeleteCompleted { topic_id, result } => {
                self.state
                    .finish_delete(topic_id, log_failure("delete", result));
            }
            FeedEvent::TopicPosted(result) => {
                // Settled by the UI layer; nothing to merge here.
                let _ = log_failure("post_topic", result);
            }
        }
    }

    /// Ask the server how many topics are newer than the current newest id.
    /// Intentionally unguarded: overlapping count fetches are idempotent and
    /// last-write-wins.
    fn spawn_count_fetch(&self) {
        let api = self.api.clone();
        let scope = self.scope.clone();
        let after_id = self.state.newest_id();
        let tx = self.events.clone();
        tokio::spawn(async move {
            let result = api.new_topic_count(after_id, scope.as_deref()).await;
            send_event(&tx, FeedEvent::NewCountFetched(result)).await;
        });
    }

    fn start_polling(&mut self) {
        if let Some(handle) = self.poll_handle.take() {
            handle.abort();
        }

        let tx = self.events.clone();
        let interval = self.poll_interval;
        tracing::debug!(
            interval_ms = interval.as_millis() as u64,
            "Starting new-topic poll"
        );

        self.poll_handle = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // An interval's first tick fires immediately; the page we just
            // loaded is fresh, so consume it and start one full interval out.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if tx.send(FeedEvent::PollTick).await.is_err() {
                    // Receiver dropped: the hosting loop is gone.
                    break;
                }
            }
        }));
    }
}

impl Drop for FeedController {
    fn drop(&mut self) {
        if let Some(handle) = self.poll_handle.take() {
            handle.abort();
            tracing::debug!("Aborted poll task on controller drop");
        }
    }
}

async fn send_event(tx: &mpsc::Sender<FeedEvent>, event: FeedEvent) {
    if tx.send(event).await.is_err() {
        tracing::warn!("Failed to send feed event (receiver dropped)");
    }
}

/// Log a failed operation and erase the error for the pure state layer,
/// which only distinguishes success from failure.
fn log_failure<T>(operation: &'static str, result: Result<T, ApiError>) -> Result<T, ()> {
    result.map_err(|e| {
        tracing::warn!(operation, error = %e, "Feed request failed");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::User;

    fn test_topic(id: i64) -> Topic {
        Topic {
            id,
            content: format!("topic {}", id),
            date: 0,
            user: User {
                id: 1,
                username: "user1".into(),
                display_name: "display1".into(),
                image: None,
            },
            attachment: None,
        }
    }

    fn test_page(ids: &[i64], last: bool) -> TopicPage {
        TopicPage {
            content: ids.iter().copied().map(test_topic).collect(),
            last,
        }
    }

    fn test_controller() -> (FeedController, mpsc::Receiver<FeedEvent>) {
        let (tx, rx) = mpsc::channel(32);
        let api = ApiClient::new("http://127.0.0.1:9", None).unwrap();
        let controller = FeedController::new(api, None, 5, Duration::from_secs(60), tx);
        (controller, rx)
    }

    #[tokio::test]
    async fn test_events_before_start_are_discarded() {
        let (mut controller, _rx) = test_controller();

        controller.handle_event(FeedEvent::InitialLoaded(Ok(test_page(&[10], false))));
        assert!(controller.state().topics().is_empty());
    }

    #[tokio::test]
    async fn test_events_after_stop_are_discarded() {
        let (mut controller, _rx) = test_controller();
        controller.active = true;
        controller.handle_event(FeedEvent::InitialLoaded(Ok(test_page(&[10, 9], false))));
        assert_eq!(controller.state().topics().len(), 2);

        controller.stop();

        // Late completions from in-flight requests must not mutate state
        let generation = controller.state().generation();
        controller.handle_event(FeedEvent::NewerLoaded {
            generation,
            result: Ok(vec![test_topic(21)]),
        });
        controller.handle_event(FeedEvent::NewCountFetched(Ok(7)));
        assert_eq!(controller.state().topics().len(), 2);
        assert_eq!(controller.state().new_topic_count(), 0);
    }

    #[tokio::test]
    async fn test_older_page_raced_by_reload_is_not_merged() {
        let (mut controller, _rx) = test_controller();
        controller.active = true;
        controller.handle_event(FeedEvent::InitialLoaded(Ok(test_page(&[10, 9], false))));
        let issued_under = controller.state().generation();

        // Reload resolves while the older page is still in flight; the fresh
        // page already contains the ids the older fetch will return
        controller.handle_event(FeedEvent::InitialLoaded(Ok(test_page(
            &[10, 9, 8, 7],
            false,
        ))));
        controller.handle_event(FeedEvent::OlderLoaded {
            generation: issued_under,
            result: Ok(test_page(&[8, 7], true)),
        });

        let ids: Vec<i64> = controller.state().topics().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![10, 9, 8, 7]);
        assert!(!controller.state().flags().loading_older);
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let (mut controller, _rx) = test_controller();
        controller.active = true;
        controller.handle_event(FeedEvent::InitialLoaded(Ok(test_page(&[10], false))));
        assert!(controller.poll_handle.is_some());

        controller.stop();
        assert!(controller.poll_handle.is_none());
        controller.stop(); // second call finds nothing to tear down
        assert!(controller.poll_handle.is_none());
    }

    #[tokio::test]
    async fn test_polling_starts_only_after_successful_initial_load() {
        let (mut controller, _rx) = test_controller();
        controller.active = true;

        controller.handle_event(FeedEvent::InitialLoaded(Err(ApiError::HttpStatus(500))));
        assert!(controller.poll_handle.is_none());

        controller.handle_event(FeedEvent::InitialLoaded(Ok(test_page(&[], true))));
        assert!(controller.poll_handle.is_some());
    }

    #[tokio::test]
    async fn test_failed_count_keeps_previous_value() {
        let (mut controller, _rx) = test_controller();
        controller.active = true;
        controller.handle_event(FeedEvent::NewCountFetched(Ok(2)));
        controller.handle_event(FeedEvent::NewCountFetched(Err(ApiError::Timeout)));
        assert_eq!(controller.state().new_topic_count(), 2);
    }
}

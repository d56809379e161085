use crate::api::{Topic, TopicPage};
use std::collections::HashSet;

// ============================================================================
// In-Flight Flags
// ============================================================================

/// Per-operation in-flight flags.
///
/// Each flag is a re-entrancy guard: while it is set, a second invocation of
/// the same operation is a silent no-op. Cross-operation concurrency (e.g. a
/// poll tick racing a load-older) is permitted and must not corrupt the list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedFlags {
    pub loading_initial: bool,
    pub loading_older: bool,
    pub loading_newer: bool,
    pub deleting: bool,
}

impl FeedFlags {
    /// True when any request is outstanding. Used by the UI for the spinner.
    pub fn any(&self) -> bool {
        self.loading_initial || self.loading_older || self.loading_newer || self.deleting
    }
}

// ============================================================================
// Feed State
// ============================================================================

/// The materialized feed: an ordered topic list plus pagination and polling
/// metadata. Created empty, mutated only through the methods below, and
/// discarded when the controller is torn down — nothing here persists.
///
/// Invariants:
/// - `topics` is ordered by strictly descending id and contains no duplicate
///   ids. Appends trust the server's cursor contract; prepends de-duplicate
///   defensively because two overlapping polls can disagree with a
///   concurrently resolving load-newer.
/// - Every `finish_*` method clears its flag on both success and failure, so
///   no failure can leave an operation permanently gated off.
/// - Cursor-based completions carry the generation they were issued under.
///   `finish_initial` replaces the list wholesale and bumps the generation,
///   so an older/newer page fetched against the previous list is discarded
///   instead of merged into a list its cursor no longer describes.
#[derive(Debug, Default)]
pub struct FeedState {
    topics: Vec<Topic>,
    is_last_page: bool,
    new_topic_count: u64,
    flags: FeedFlags,
    pending_delete: Option<Topic>,
    generation: u64,
}

impl FeedState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn topics(&self) -> &[Topic] {
        &self.topics
    }

    pub fn is_last_page(&self) -> bool {
        self.is_last_page
    }

    pub fn new_topic_count(&self) -> u64 {
        self.new_topic_count
    }

    pub fn flags(&self) -> FeedFlags {
        self.flags
    }

    pub fn pending_delete(&self) -> Option<&Topic> {
        self.pending_delete.as_ref()
    }

    /// Newest topic id, or 0 when the feed is empty. The zero sentinel is
    /// what the count and newer endpoints expect for an empty feed.
    pub fn newest_id(&self) -> i64 {
        self.topics.first().map_or(0, |t| t.id)
    }

    /// Oldest topic id (the tail), if any. Cursor for backward pagination.
    pub fn oldest_id(&self) -> Option<i64> {
        self.topics.last().map(|t| t.id)
    }

    /// Current list generation. Captured alongside a cursor when an older or
    /// newer fetch is issued, and checked again when it completes.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    // ------------------------------------------------------------------
    // Initial load
    // ------------------------------------------------------------------

    pub fn begin_initial(&mut self) {
        self.flags.loading_initial = true;
    }

    /// Success replaces the page wholesale. Failure settles to a neutral
    /// empty state so the caller renders "no topics" instead of hanging.
    /// Either way the list is replaced, so the generation advances and any
    /// cursor fetch still in flight resolves as stale.
    pub fn finish_initial(&mut self, result: Result<TopicPage, ()>) {
        self.flags.loading_initial = false;
        self.generation = self.generation.wrapping_add(1);
        match result {
            Ok(page) => {
                self.topics = page.content;
                self.is_last_page = page.last;
            }
            Err(()) => {
                self.topics.clear();
                self.is_last_page = false;
            }
        }
    }

    // ------------------------------------------------------------------
    // Load-older (backward pagination)
    // ------------------------------------------------------------------

    /// Claim the load-older gate. Returns the cursor (oldest id) when the
    /// fetch should proceed; `None` when the feed is empty or a load-older
    /// is already in flight.
    pub fn begin_older(&mut self) -> Option<i64> {
        if self.flags.loading_older {
            return None;
        }
        let cursor = self.oldest_id()?;
        self.flags.loading_older = true;
        Some(cursor)
    }

    /// Append an older page to the tail. The server guarantees every
    /// returned id is below the current tail; the list is concatenated, not
    /// re-sorted. Failure leaves the list untouched. A page fetched under an
    /// earlier generation was cut against a list that a reload has since
    /// replaced; merging it would duplicate ids, so it is dropped and only
    /// the flag clears.
    pub fn finish_older(&mut self, generation: u64, result: Result<TopicPage, ()>) {
        self.flags.loading_older = false;
        if generation != self.generation {
            return;
        }
        if let Ok(page) = result {
            debug_assert!(
                page.content
                    .first()
                    .and_then(|head| self.oldest_id().map(|tail| head.id < tail))
                    .unwrap_or(true),
                "older page must start below the current tail"
            );
            self.topics.extend(page.content);
            self.is_last_page = page.last;
        }
    }

    // ------------------------------------------------------------------
    // Load-newer
    // ------------------------------------------------------------------

    /// Claim the load-newer gate. Returns the cursor (newest id, 0 for an
    /// empty feed) or `None` when a load-newer is already in flight.
    pub fn begin_newer(&mut self) -> Option<i64> {
        if self.flags.loading_newer {
            return None;
        }
        self.flags.loading_newer = true;
        Some(self.newest_id())
    }

    /// Prepend newer topics (received newest-first) and reset the pending
    /// count. Incoming ids already present are dropped: the poll count and a
    /// racing fetch can overlap, and the uniqueness invariant wins over
    /// at-least-once fidelity. Failure keeps the count so the user can retry.
    /// Stale-generation completions are dropped like in [`finish_older`]:
    /// their cursor described a head the reload has since replaced.
    ///
    /// [`finish_older`]: Self::finish_older
    pub fn finish_newer(&mut self, generation: u64, result: Result<Vec<Topic>, ()>) {
        self.flags.loading_newer = false;
        if generation != self.generation {
            return;
        }
        if let Ok(fetched) = result {
            let existing: HashSet<i64> = self.topics.iter().map(|t| t.id).collect();
            let fresh: Vec<Topic> = fetched
                .into_iter()
                .filter(|t| !existing.contains(&t.id))
                .collect();
            self.topics.splice(0..0, fresh);
            self.new_topic_count = 0;
        }
    }

    // ------------------------------------------------------------------
    // New-topic count polling
    // ------------------------------------------------------------------

    /// Overwrite the pending count with the server's authoritative value.
    /// Overlapping polls are tolerated; last write wins.
    pub fn set_new_topic_count(&mut self, count: u64) {
        self.new_topic_count = count;
    }

    // ------------------------------------------------------------------
    // Delete workflow: Idle -> ConfirmPending -> Deleting -> Idle
    // ------------------------------------------------------------------

    /// Stage a topic for deletion, pending confirmation. No request is
    /// issued. Re-targeting while another confirmation is pending is allowed.
    pub fn request_delete(&mut self, topic: Topic) {
        if self.flags.deleting {
            return;
        }
        self.pending_delete = Some(topic);
    }

    /// Abandon the pending confirmation. No-op if a delete request is
    /// already in flight.
    pub fn cancel_delete(&mut self) {
        if self.flags.deleting {
            return;
        }
        self.pending_delete = None;
    }

    /// Claim the delete gate. Returns the target id when the request should
    /// be issued; `None` without a confirmed target or when already deleting.
    pub fn begin_delete(&mut self) -> Option<i64> {
        if self.flags.deleting {
            return None;
        }
        let id = self.pending_delete.as_ref()?.id;
        self.flags.deleting = true;
        Some(id)
    }

    /// Settle a delete. Success removes the topic by id filter — safe even
    /// if the list was reshaped by a concurrent merge — and clears the
    /// target. Failure keeps `pending_delete` so confirmation can be retried
    /// without re-selecting.
    pub fn finish_delete(&mut self, topic_id: i64, result: Result<(), ()>) {
        self.flags.deleting = false;
        if result.is_ok() {
            self.topics.retain(|t| t.id != topic_id);
            self.pending_delete = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::User;
    use pretty_assertions::assert_eq;

    fn topic(id: i64) -> Topic {
        Topic {
            id,
            content: format!("topic {}", id),
            date: 1_714_000_000_000 + id,
            user: User {
                id: 1,
                username: "user1".into(),
                display_name: "display1".into(),
                image: None,
            },
            attachment: None,
        }
    }

    fn page(ids: &[i64], last: bool) -> TopicPage {
        TopicPage {
            content: ids.iter().copied().map(topic).collect(),
            last,
        }
    }

    fn ids(state: &FeedState) -> Vec<i64> {
        state.topics().iter().map(|t| t.id).collect()
    }

    fn loaded(ids: &[i64], last: bool) -> FeedState {
        let mut state = FeedState::new();
        state.begin_initial();
        state.finish_initial(Ok(page(ids, last)));
        state
    }

    #[test]
    fn test_initial_empty_page_settles_to_no_topics() {
        let mut state = FeedState::new();
        state.begin_initial();
        assert!(state.flags().loading_initial);

        state.finish_initial(Ok(page(&[], true)));
        assert!(state.topics().is_empty());
        assert!(!state.flags().loading_initial);
    }

    #[test]
    fn test_initial_failure_leaves_neutral_empty_state() {
        let mut state = FeedState::new();
        state.begin_initial();
        state.finish_initial(Err(()));

        assert!(state.topics().is_empty());
        assert!(!state.flags().loading_initial);
        assert!(!state.is_last_page());
    }

    #[test]
    fn test_older_page_appends_and_adopts_last_flag() {
        let mut state = loaded(&[10, 9], false);

        let cursor = state.begin_older();
        assert_eq!(cursor, Some(9));
        state.finish_older(state.generation(), Ok(page(&[1], true)));

        assert_eq!(ids(&state), vec![10, 9, 1]);
        assert!(state.is_last_page());
        assert!(!state.flags().loading_older);
    }

    #[test]
    fn test_older_is_noop_on_empty_feed() {
        let mut state = FeedState::new();
        assert_eq!(state.begin_older(), None);
        assert!(!state.flags().loading_older);
    }

    #[test]
    fn test_older_reentrancy_guard() {
        let mut state = loaded(&[10, 9], false);
        assert_eq!(state.begin_older(), Some(9));
        // Second call before the first resolves: silently suppressed
        assert_eq!(state.begin_older(), None);
    }

    #[test]
    fn test_older_failure_rolls_back_flag_only() {
        let mut state = loaded(&[10, 9], false);
        state.begin_older();
        state.finish_older(state.generation(), Err(()));

        assert_eq!(ids(&state), vec![10, 9]);
        assert!(!state.flags().loading_older);
        assert!(!state.is_last_page());
    }

    #[test]
    fn test_stale_older_page_after_reload_is_discarded() {
        let mut state = loaded(&[10, 9], false);
        let cursor = state.begin_older().unwrap();
        assert_eq!(cursor, 9);
        let issued_under = state.generation();

        // A manual reload resolves first and the fresh page already holds
        // everything the in-flight older fetch was cut for
        state.begin_initial();
        state.finish_initial(Ok(page(&[10, 9, 8, 7], false)));

        state.finish_older(issued_under, Ok(page(&[8, 7], true)));

        assert_eq!(ids(&state), vec![10, 9, 8, 7]);
        assert!(!state.flags().loading_older);
        assert!(!state.is_last_page()); // stale page's last flag not adopted
    }

    #[test]
    fn test_stale_newer_fetch_after_reload_is_discarded() {
        let mut state = loaded(&[10, 9], false);
        assert_eq!(state.begin_newer(), Some(10));
        let issued_under = state.generation();

        state.begin_initial();
        state.finish_initial(Ok(page(&[30, 29], false)));

        // Cut against the old head (10); prepending would break ordering
        state.finish_newer(issued_under, Ok(vec![topic(21)]));

        assert_eq!(ids(&state), vec![30, 29]);
        assert!(!state.flags().loading_newer);
    }

    #[test]
    fn test_failed_initial_load_also_advances_generation() {
        let mut state = loaded(&[10, 9], false);
        let issued_under = state.generation();
        state.begin_older();

        // Reload fails: the list is replaced with the neutral empty state,
        // so the older page's cursor is just as invalid
        state.begin_initial();
        state.finish_initial(Err(()));

        state.finish_older(issued_under, Ok(page(&[8, 7], true)));
        assert!(state.topics().is_empty());
    }

    #[test]
    fn test_newer_prepends_and_resets_count() {
        let mut state = loaded(&[10, 9], false);
        state.set_new_topic_count(1);

        assert_eq!(state.begin_newer(), Some(10));
        state.finish_newer(state.generation(), Ok(vec![topic(21)]));

        assert_eq!(ids(&state), vec![21, 10, 9]);
        assert_eq!(state.new_topic_count(), 0);
        assert!(!state.flags().loading_newer);
    }

    #[test]
    fn test_newer_on_empty_feed_uses_zero_cursor() {
        let mut state = FeedState::new();
        assert_eq!(state.begin_newer(), Some(0));
    }

    #[test]
    fn test_newer_failure_keeps_count_for_retry() {
        let mut state = loaded(&[10], false);
        state.set_new_topic_count(2);

        state.begin_newer();
        state.finish_newer(state.generation(), Err(()));

        assert_eq!(state.new_topic_count(), 2);
        assert!(!state.flags().loading_newer);
        assert_eq!(ids(&state), vec![10]);
    }

    #[test]
    fn test_newer_drops_duplicate_ids() {
        let mut state = loaded(&[10, 9], false);
        state.begin_newer();
        // Server returned an item the list already holds (racing polls)
        state.finish_newer(state.generation(), Ok(vec![topic(11), topic(10)]));

        assert_eq!(ids(&state), vec![11, 10, 9]);
    }

    #[test]
    fn test_count_overwrites_not_accumulates() {
        let mut state = FeedState::new();
        state.set_new_topic_count(3);
        state.set_new_topic_count(1);
        assert_eq!(state.new_topic_count(), 1);
    }

    #[test]
    fn test_delete_removes_by_id_filter() {
        let mut state = loaded(&[10, 9], false);

        state.request_delete(topic(10));
        assert_eq!(state.pending_delete().map(|t| t.id), Some(10));

        let target = state.begin_delete();
        assert_eq!(target, Some(10));
        assert!(state.flags().deleting);

        state.finish_delete(10, Ok(()));
        assert_eq!(ids(&state), vec![9]);
        assert!(state.pending_delete().is_none());
        assert!(!state.flags().deleting);
    }

    #[test]
    fn test_delete_of_absent_id_is_safe_noop() {
        let mut state = loaded(&[10, 9], false);
        // List mutated concurrently: the target vanished before completion
        state.request_delete(topic(7));
        state.begin_delete();
        state.finish_delete(7, Ok(()));

        assert_eq!(ids(&state), vec![10, 9]);
    }

    #[test]
    fn test_delete_failure_keeps_pending_target() {
        let mut state = loaded(&[10], false);
        state.request_delete(topic(10));
        state.begin_delete();
        state.finish_delete(10, Err(()));

        assert_eq!(ids(&state), vec![10]);
        assert!(!state.flags().deleting);
        // Target survives so confirmation can be retried
        assert_eq!(state.pending_delete().map(|t| t.id), Some(10));
    }

    #[test]
    fn test_cancel_clears_pending_target() {
        let mut state = loaded(&[10], false);
        state.request_delete(topic(10));
        state.cancel_delete();
        assert!(state.pending_delete().is_none());
    }

    #[test]
    fn test_cancel_ignored_while_deleting() {
        let mut state = loaded(&[10], false);
        state.request_delete(topic(10));
        state.begin_delete();
        state.cancel_delete();
        // Request already in flight; the target stays until it settles
        assert!(state.pending_delete().is_some());
    }

    #[test]
    fn test_begin_delete_without_target_is_noop() {
        let mut state = loaded(&[10], false);
        assert_eq!(state.begin_delete(), None);
        assert!(!state.flags().deleting);
    }

    #[test]
    fn test_cross_operation_concurrency_does_not_corrupt_list() {
        // load-older in flight while a newer merge and a poll tick land
        let mut state = loaded(&[10, 9], false);
        let cursor = state.begin_older().unwrap();
        assert_eq!(cursor, 9);

        state.set_new_topic_count(1);
        state.begin_newer();
        state.finish_newer(state.generation(), Ok(vec![topic(21)]));

        state.finish_older(state.generation(), Ok(page(&[1], true)));

        assert_eq!(ids(&state), vec![21, 10, 9, 1]);
        assert_eq!(state.new_topic_count(), 0);
    }

    mod merge_properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Any sequence of older appends and newer prepends built from
            /// well-formed server responses keeps the list strictly
            /// descending and duplicate-free.
            #[test]
            fn merged_list_stays_descending_and_unique(
                initial in proptest::collection::btree_set(0i64..1000, 1..20),
                older in proptest::collection::btree_set(-1000i64..0, 0..20),
                newer in proptest::collection::btree_set(1000i64..2000, 0..20),
            ) {
                let initial: Vec<i64> = initial.into_iter().rev().collect();
                let older: Vec<i64> = older.into_iter().rev().collect();
                let newer: Vec<i64> = newer.into_iter().rev().collect();

                let mut state = loaded(&initial, false);
                if state.begin_older().is_some() {
                    state.finish_older(state.generation(), Ok(page(&older, true)));
                }
                state.begin_newer();
                state.finish_newer(state.generation(), Ok(newer.iter().copied().map(topic).collect()));

                let merged = ids(&state);
                prop_assert!(merged.windows(2).all(|w| w[0] > w[1]));
            }
        }
    }
}

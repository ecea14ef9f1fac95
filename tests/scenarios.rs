//! End-to-end poll lifecycle scenarios, store through hub.

use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;

use livepoll::clock::{ClockConfig, LifecycleClock};
use livepoll::poll::{PollError, TallyStore};
use livepoll::realtime::BroadcastHub;

async fn tea_or_coffee(store: &TallyStore, duration_minutes: i64) -> (Uuid, Uuid, Uuid) {
    let poll = store
        .create_poll(
            "Tea or coffee?",
            vec!["Tea".to_string(), "Coffee".to_string()],
            duration_minutes,
            None,
        )
        .await
        .unwrap();
    (poll.id, poll.options[0].id, poll.options[1].id)
}

/// Two voters split their votes; expiry yields a tie between both options.
#[tokio::test]
async fn scenario_split_vote_ends_in_tie() {
    let store = Arc::new(TallyStore::new());
    let hub = Arc::new(BroadcastHub::new());
    let clock = LifecycleClock::new(Arc::clone(&store), Arc::clone(&hub), ClockConfig::default());

    let (poll_id, tea, coffee) = tea_or_coffee(&store, 1).await;

    store
        .submit_vote(poll_id, "voter-1", tea, Utc::now(), |_| {})
        .await
        .unwrap();
    store
        .submit_vote(poll_id, "voter-2", coffee, Utc::now(), |_| {})
        .await
        .unwrap();

    let snapshot = store.snapshot(poll_id, Utc::now()).await.unwrap();
    assert!(snapshot.is_open);
    assert_eq!(snapshot.options[0].votes, 1);
    assert_eq!(snapshot.options[1].votes, 1);
    assert!(snapshot.winners.is_none());

    let after_expiry = store.get_poll(poll_id).await.unwrap().expires_at + Duration::seconds(1);
    clock.tick(after_expiry).await;

    let closing = store.snapshot(poll_id, after_expiry).await.unwrap();
    assert!(!closing.is_open);
    assert_eq!(closing.winners, Some(vec![tea, coffee]));
}

/// Two votes for tea against one for coffee: tea wins outright.
#[tokio::test]
async fn scenario_majority_wins_outright() {
    let store = TallyStore::new();
    let (poll_id, tea, coffee) = tea_or_coffee(&store, 1).await;

    for (voter, option_id) in [("voter-1", tea), ("voter-2", tea), ("voter-3", coffee)] {
        store
            .submit_vote(poll_id, voter, option_id, Utc::now(), |_| {})
            .await
            .unwrap();
    }

    let after_expiry = store.get_poll(poll_id).await.unwrap().expires_at + Duration::seconds(1);
    store.close_expired(after_expiry, |_| {}).await;

    let closing = store.snapshot(poll_id, after_expiry).await.unwrap();
    assert_eq!(closing.winners, Some(vec![tea]));
}

/// A retry by the same voter is rejected and changes nothing.
#[tokio::test]
async fn scenario_retry_is_rejected_verbatim() {
    let store = TallyStore::new();
    let (poll_id, tea, coffee) = tea_or_coffee(&store, 5).await;

    store
        .submit_vote(poll_id, "voter-v", tea, Utc::now(), |_| {})
        .await
        .unwrap();

    // Retrying with any option is rejected with the stable reason
    for option_id in [tea, coffee] {
        let err = store
            .submit_vote(poll_id, "voter-v", option_id, Utc::now(), |_| {})
            .await
            .unwrap_err();
        assert_eq!(err, PollError::AlreadyVoted);
        assert_eq!(err.reason_code(), "already_voted");
    }

    let snapshot = store.snapshot(poll_id, Utc::now()).await.unwrap();
    assert_eq!(snapshot.options[0].votes, 1);
    assert_eq!(snapshot.options[1].votes, 0);
}

/// A vote between expiry and the clock tick is rejected by the derived
/// predicate, not the stale flag.
#[tokio::test]
async fn scenario_expired_poll_rejects_before_clock_runs() {
    let store = TallyStore::new();
    let (poll_id, tea, _) = tea_or_coffee(&store, 1).await;

    let poll = store.get_poll(poll_id).await.unwrap();
    let after_expiry = poll.expires_at + Duration::seconds(1);

    // No clock has run: the flag still says active
    assert!(store.get_poll(poll_id).await.unwrap().is_active);

    let err = store
        .submit_vote(poll_id, "voter-late", tea, after_expiry, |_| {})
        .await
        .unwrap_err();
    assert_eq!(err, PollError::PollClosed);
    assert_eq!(err.reason_code(), "poll_closed");
}

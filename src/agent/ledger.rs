//! Per-conversation pending-action ledger.
//!
//! Holds at most one open confirmation/clarification per `(chat, user)` key
//! and resolves a later reply against it. Expiry is lazy: entries are
//! checked when a reply arrives, and an optional [`sweep`](PendingActionLedger::sweep)
//! reclaims memory on whatever schedule the caller likes.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::agent::classifier::Candidate;
use crate::channels::ChatKey;

/// Clock abstraction so expiry is deterministic under test.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Replies that confirm a single pending command.
const AFFIRMATIVE_TOKENS: &[&str] = &["yes", "y", "ok", "okay", "confirm", "execute", "sure"];

/// Replies that cancel a pending request.
const NEGATIVE_TOKENS: &[&str] = &["no", "n", "cancel", "nope", "abort", "stop"];

/// An open confirmation or clarification awaiting a qualifying reply.
/// Read-only once created; superseded, consumed, or expired as a whole.
#[derive(Debug, Clone)]
pub struct PendingAction {
    pub id: Uuid,
    /// Ordered, highest confidence first.
    pub candidates: Vec<Candidate>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Result of matching a reply against the pending entry for a key.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Single pending candidate, affirmative reply. Entry consumed.
    Confirmed(Candidate),
    /// One of several candidates picked by name or index. Entry consumed.
    Selected(Candidate),
    /// Negative reply. Entry deleted.
    Cancelled,
    /// The entry's ttl had elapsed. Entry deleted.
    Expired,
    /// No live entry, or the reply did not address the pending one; in the
    /// latter case the entry stays and the caller should treat the reply
    /// as a fresh utterance.
    NotFound,
}

pub struct PendingActionLedger {
    entries: Mutex<HashMap<ChatKey, PendingAction>>,
    clock: Arc<dyn Clock>,
}

impl PendingActionLedger {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
        }
    }

    pub fn with_system_clock() -> Self {
        Self::new(Arc::new(SystemClock))
    }

    /// Create the entry for `key`, overwriting any previous one: the most
    /// recent intent wins.
    pub async fn open(
        &self,
        key: ChatKey,
        candidates: Vec<Candidate>,
        ttl: Duration,
    ) -> PendingAction {
        let now = self.clock.now();
        let expires_at = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|delta| now.checked_add_signed(delta))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        let action = PendingAction {
            id: Uuid::new_v4(),
            candidates,
            created_at: now,
            expires_at,
        };
        self.entries.lock().await.insert(key, action.clone());
        action
    }

    /// Match a reply against the live entry for `key`.
    ///
    /// The whole match-and-delete runs inside one lock acquisition with no
    /// await points, so an entry is consumed at most once even under
    /// concurrent replies; the loser of the race sees `NotFound`.
    pub async fn resolve(&self, key: ChatKey, reply_text: &str) -> Outcome {
        let mut entries = self.entries.lock().await;

        let Some(action) = entries.get(&key).cloned() else {
            return Outcome::NotFound;
        };
        if action.expires_at <= self.clock.now() {
            entries.remove(&key);
            return Outcome::Expired;
        }

        let token = normalize_reply(reply_text);

        if action.candidates.len() == 1 && is_affirmative(&token) {
            let candidate = action.candidates[0].clone();
            entries.remove(&key);
            return Outcome::Confirmed(candidate);
        }

        if action.candidates.len() > 1 {
            if let Some(candidate) = select_candidate(&action.candidates, &token) {
                entries.remove(&key);
                return Outcome::Selected(candidate);
            }
        }

        if is_negative(&token) {
            entries.remove(&key);
            return Outcome::Cancelled;
        }

        // Anything else is a fresh utterance; the entry stays open.
        Outcome::NotFound
    }

    /// Diagnostic read. Never mutates, never expires.
    pub async fn peek(&self, key: ChatKey) -> Option<PendingAction> {
        self.entries.lock().await.get(&key).cloned()
    }

    /// Drop expired entries to bound memory. Takes the same lock as
    /// `resolve`, so the two cannot race on a key.
    pub async fn sweep(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|_, action| action.expires_at > now);
        before - entries.len()
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

/// Lowercase the reply and shed trailing punctuation: "Yes!" confirms.
fn normalize_reply(text: &str) -> String {
    text.trim()
        .trim_end_matches(|c: char| matches!(c, '.' | '!' | '?' | ','))
        .trim()
        .to_lowercase()
}

fn is_affirmative(token: &str) -> bool {
    AFFIRMATIVE_TOKENS.contains(&token)
}

fn is_negative(token: &str) -> bool {
    NEGATIVE_TOKENS.contains(&token)
}

/// Match a clarification reply against the candidate list, by 1-based
/// index or by command name.
fn select_candidate(candidates: &[Candidate], token: &str) -> Option<Candidate> {
    if let Ok(index) = token.parse::<usize>() {
        if (1..=candidates.len()).contains(&index) {
            return Some(candidates[index - 1].clone());
        }
        return None;
    }
    candidates
        .iter()
        .find(|c| c.command_name.eq_ignore_ascii_case(token))
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::ParameterMap;
    use std::sync::Mutex as StdMutex;

    /// Manually advanced clock for expiry tests.
    struct ManualClock {
        now: StdMutex<DateTime<Utc>>,
    }

    impl ManualClock {
        fn starting_at(now: DateTime<Utc>) -> Arc<Self> {
            Arc::new(Self {
                now: StdMutex::new(now),
            })
        }

        fn advance(&self, delta: chrono::Duration) {
            let mut now = self.now.lock().unwrap();
            *now += delta;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.now.lock().unwrap()
        }
    }

    fn candidate(name: &str, confidence: u8) -> Candidate {
        Candidate {
            command_name: name.to_string(),
            confidence,
            parameters: ParameterMap::new(),
        }
    }

    fn key() -> ChatKey {
        ChatKey {
            chat_id: 10,
            user_id: 20,
        }
    }

    const TTL: Duration = Duration::from_secs(300);

    #[tokio::test]
    async fn missing_entry_is_not_found() {
        let ledger = PendingActionLedger::with_system_clock();
        assert_eq!(ledger.resolve(key(), "yes").await, Outcome::NotFound);
    }

    #[tokio::test]
    async fn affirmative_reply_confirms_single_candidate() {
        let ledger = PendingActionLedger::with_system_clock();
        ledger.open(key(), vec![candidate("get_time", 60)], TTL).await;

        match ledger.resolve(key(), "Yes!").await {
            Outcome::Confirmed(c) => assert_eq!(c.command_name, "get_time"),
            other => panic!("expected Confirmed, got {other:?}"),
        }
        // Consumed: a second identical reply finds nothing.
        assert_eq!(ledger.resolve(key(), "yes").await, Outcome::NotFound);
    }

    #[tokio::test]
    async fn negative_reply_cancels() {
        let ledger = PendingActionLedger::with_system_clock();
        ledger.open(key(), vec![candidate("get_time", 60)], TTL).await;

        assert_eq!(ledger.resolve(key(), "no").await, Outcome::Cancelled);
        assert_eq!(ledger.resolve(key(), "no").await, Outcome::NotFound);
    }

    #[tokio::test]
    async fn selection_by_index_and_by_name() {
        let ledger = PendingActionLedger::with_system_clock();
        let candidates = vec![candidate("get_time", 60), candidate("random_number", 55)];

        ledger.open(key(), candidates.clone(), TTL).await;
        match ledger.resolve(key(), "2").await {
            Outcome::Selected(c) => assert_eq!(c.command_name, "random_number"),
            other => panic!("expected Selected, got {other:?}"),
        }

        ledger.open(key(), candidates, TTL).await;
        match ledger.resolve(key(), "Random_Number").await {
            Outcome::Selected(c) => assert_eq!(c.command_name, "random_number"),
            other => panic!("expected Selected, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn out_of_range_index_leaves_the_entry_open() {
        let ledger = PendingActionLedger::with_system_clock();
        let candidates = vec![candidate("get_time", 60), candidate("random_number", 55)];
        ledger.open(key(), candidates, TTL).await;

        assert_eq!(ledger.resolve(key(), "5").await, Outcome::NotFound);
        assert!(ledger.peek(key()).await.is_some());
    }

    #[tokio::test]
    async fn unrelated_reply_leaves_the_entry_open() {
        let ledger = PendingActionLedger::with_system_clock();
        ledger.open(key(), vec![candidate("get_time", 60)], TTL).await;

        assert_eq!(
            ledger.resolve(key(), "actually, what's the weather?").await,
            Outcome::NotFound
        );
        assert!(ledger.peek(key()).await.is_some());
    }

    #[tokio::test]
    async fn affirmative_to_a_clarification_does_not_select() {
        let ledger = PendingActionLedger::with_system_clock();
        let candidates = vec![candidate("get_time", 60), candidate("random_number", 55)];
        ledger.open(key(), candidates, TTL).await;

        assert_eq!(ledger.resolve(key(), "yes").await, Outcome::NotFound);
    }

    #[tokio::test]
    async fn expired_entry_reports_expired_once_then_not_found() {
        let clock = ManualClock::starting_at(Utc::now());
        let ledger = PendingActionLedger::new(clock.clone());
        ledger.open(key(), vec![candidate("get_time", 60)], TTL).await;

        clock.advance(chrono::Duration::seconds(301));
        assert_eq!(ledger.resolve(key(), "yes").await, Outcome::Expired);
        assert_eq!(ledger.resolve(key(), "yes").await, Outcome::NotFound);
    }

    #[tokio::test]
    async fn expiry_wins_regardless_of_reply_content() {
        let clock = ManualClock::starting_at(Utc::now());
        let ledger = PendingActionLedger::new(clock.clone());
        ledger.open(key(), vec![candidate("get_time", 60)], TTL).await;

        clock.advance(chrono::Duration::seconds(400));
        assert_eq!(ledger.resolve(key(), "gibberish").await, Outcome::Expired);
    }

    #[tokio::test]
    async fn reopening_overwrites_the_previous_entry() {
        let ledger = PendingActionLedger::with_system_clock();
        ledger.open(key(), vec![candidate("get_time", 60)], TTL).await;
        ledger
            .open(key(), vec![candidate("random_number", 70)], TTL)
            .await;

        match ledger.resolve(key(), "yes").await {
            Outcome::Confirmed(c) => assert_eq!(c.command_name, "random_number"),
            other => panic!("expected Confirmed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn keys_are_independent() {
        let ledger = PendingActionLedger::with_system_clock();
        let other = ChatKey {
            chat_id: 10,
            user_id: 99,
        };
        ledger.open(key(), vec![candidate("get_time", 60)], TTL).await;
        ledger.open(other, vec![candidate("echo", 60)], TTL).await;

        assert!(matches!(
            ledger.resolve(key(), "yes").await,
            Outcome::Confirmed(_)
        ));
        // The other user's pending action is untouched.
        assert!(ledger.peek(other).await.is_some());
    }

    #[tokio::test]
    async fn peek_does_not_expire_entries() {
        let clock = ManualClock::starting_at(Utc::now());
        let ledger = PendingActionLedger::new(clock.clone());
        ledger.open(key(), vec![candidate("get_time", 60)], TTL).await;

        clock.advance(chrono::Duration::seconds(301));
        assert!(ledger.peek(key()).await.is_some());
        assert_eq!(ledger.len().await, 1);
    }

    #[tokio::test]
    async fn sweep_reclaims_only_expired_entries() {
        let clock = ManualClock::starting_at(Utc::now());
        let ledger = PendingActionLedger::new(clock.clone());
        let fresh = ChatKey {
            chat_id: 1,
            user_id: 1,
        };
        ledger.open(key(), vec![candidate("get_time", 60)], TTL).await;

        clock.advance(chrono::Duration::seconds(200));
        ledger.open(fresh, vec![candidate("echo", 60)], TTL).await;

        clock.advance(chrono::Duration::seconds(150));
        // First entry is now 350s old, the second 150s.
        assert_eq!(ledger.sweep().await, 1);
        assert!(ledger.peek(key()).await.is_none());
        assert!(ledger.peek(fresh).await.is_some());
    }

    #[tokio::test]
    async fn concurrent_replies_consume_at_most_once() {
        let ledger = Arc::new(PendingActionLedger::with_system_clock());
        ledger.open(key(), vec![candidate("get_time", 60)], TTL).await;

        let first = {
            let ledger = ledger.clone();
            tokio::spawn(async move { ledger.resolve(key(), "yes").await })
        };
        let second = {
            let ledger = ledger.clone();
            tokio::spawn(async move { ledger.resolve(key(), "yes").await })
        };

        let outcomes = [first.await.unwrap(), second.await.unwrap()];
        let confirmed = outcomes
            .iter()
            .filter(|o| matches!(o, Outcome::Confirmed(_)))
            .count();
        let not_found = outcomes
            .iter()
            .filter(|o| matches!(o, Outcome::NotFound))
            .count();
        assert_eq!(confirmed, 1);
        assert_eq!(not_found, 1);
    }

    #[test]
    fn normalization_handles_case_and_punctuation() {
        assert_eq!(normalize_reply("  Yes!  "), "yes");
        assert_eq!(normalize_reply("OK."), "ok");
        assert_eq!(normalize_reply("No, thanks"), "no, thanks");
        assert!(is_affirmative(&normalize_reply("CONFIRM")));
        assert!(is_negative(&normalize_reply("Cancel.")));
    }
}

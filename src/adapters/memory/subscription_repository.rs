//! In-memory subscription repository.
//!
//! Each operation runs under a single lock, so insert-if-absent and the
//! conditional updates are atomic the same way the database functions are.
//!
//! # Security Note
//!
//! Nothing is persisted. Use for tests and local development only.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::domain::foundation::{
    Clock, DomainError, ProviderSubscriptionId, SubscriptionId, SystemClock, UserId,
};
use crate::domain::subscription::{ApplyOutcome, StatusUpdate, Subscription};
use crate::ports::{NewSubscription, SubscriptionRepository};

/// In-memory implementation of the SubscriptionRepository port.
///
/// # Example
///
/// ```ignore
/// let repo = InMemorySubscriptionRepository::new().with_user("user-1");
/// repo.create_subscription_atomic(&new_subscription).await?;
/// assert_eq!(repo.len(), 1);
/// ```
pub struct InMemorySubscriptionRepository {
    clock: Arc<dyn Clock>,
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    users: HashSet<String>,
    /// Keyed by provider subscription id.
    subscriptions: HashMap<String, Subscription>,
    fail_writes: bool,
}

impl Default for InMemorySubscriptionRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemorySubscriptionRepository {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            state: Mutex::new(State::default()),
        }
    }

    /// Registers a known user.
    pub fn with_user(self, user_id: impl Into<String>) -> Self {
        self.add_user(user_id);
        self
    }

    pub fn add_user(&self, user_id: impl Into<String>) {
        self.state().users.insert(user_id.into());
    }

    /// Makes every subsequent write fail with `DatabaseError`.
    pub fn set_fail_writes(&self, fail: bool) {
        self.state().fail_writes = fail;
    }

    /// Inserts a row directly, bypassing all checks.
    pub fn insert(&self, subscription: Subscription) {
        let key = subscription.provider_subscription_id.as_str().to_string();
        self.state().subscriptions.insert(key, subscription);
    }

    pub fn get(&self, provider_subscription_id: &str) -> Option<Subscription> {
        self.state().subscriptions.get(provider_subscription_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.state().subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn check_writable(state: &State) -> Result<(), DomainError> {
    if state.fail_writes {
        return Err(DomainError::database("Simulated write failure"));
    }
    Ok(())
}

#[async_trait]
impl SubscriptionRepository for InMemorySubscriptionRepository {
    async fn create_subscription_atomic(
        &self,
        subscription: &NewSubscription,
    ) -> Result<SubscriptionId, DomainError> {
        let now = self.clock.now();
        let mut state = self.state();
        check_writable(&state)?;

        let key = subscription.provider_subscription_id.as_str();
        if state.subscriptions.contains_key(key) {
            return Err(DomainError::subscription_exists(key));
        }
        if !state.users.contains(subscription.user_id.as_str()) {
            return Err(DomainError::user_not_found(subscription.user_id.as_str()));
        }

        let created = Subscription::create(
            subscription.user_id.clone(),
            subscription.provider_subscription_id.clone(),
            subscription.provider_plan_id.clone(),
            subscription.initial_status,
            now,
        )?;
        let id = created.id;
        state.subscriptions.insert(key.to_string(), created);
        Ok(id)
    }

    async fn cancel_subscription_atomic(
        &self,
        user_id: &UserId,
        provider_subscription_id: &ProviderSubscriptionId,
        reason: &str,
    ) -> Result<(), DomainError> {
        let now = self.clock.now();
        let mut state = self.state();
        check_writable(&state)?;

        let key = provider_subscription_id.as_str();
        match state.subscriptions.get_mut(key) {
            Some(sub) if &sub.user_id == user_id => sub
                .cancel(reason, now)
                .map_err(|_| DomainError::subscription_not_found(key)),
            _ => Err(DomainError::subscription_not_found(key)),
        }
    }

    async fn apply_status_update(
        &self,
        provider_subscription_id: &ProviderSubscriptionId,
        update: &StatusUpdate,
    ) -> Result<ApplyOutcome, DomainError> {
        let now = self.clock.now();
        let mut state = self.state();
        check_writable(&state)?;

        Ok(match state.subscriptions.get_mut(provider_subscription_id.as_str()) {
            Some(sub) => sub.apply(update, now),
            None => ApplyOutcome::NotFound,
        })
    }

    async fn find_by_provider_id(
        &self,
        provider_subscription_id: &ProviderSubscriptionId,
    ) -> Result<Option<Subscription>, DomainError> {
        Ok(self.get(provider_subscription_id.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{ErrorCode, ManualClock, ProviderPlanId, Timestamp};
    use crate::domain::subscription::{FieldWrite, SubscriptionStatus};

    fn new_subscription(user: &str, psid: &str, status: SubscriptionStatus) -> NewSubscription {
        NewSubscription {
            user_id: UserId::new(user).unwrap(),
            provider_subscription_id: ProviderSubscriptionId::new(psid).unwrap(),
            provider_plan_id: ProviderPlanId::new("P-MONTHLY").unwrap(),
            initial_status: status,
        }
    }

    fn psid(id: &str) -> ProviderSubscriptionId {
        ProviderSubscriptionId::new(id).unwrap()
    }

    // ══════════════════════════════════════════════════════════════
    // Atomic creation
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn creates_row_for_known_user() {
        let repo = InMemorySubscriptionRepository::new().with_user("user-1");

        repo.create_subscription_atomic(&new_subscription("user-1", "I-1", SubscriptionStatus::Active))
            .await
            .unwrap();

        let row = repo.get("I-1").unwrap();
        assert_eq!(row.status, SubscriptionStatus::Active);
        assert!(row.start_date.is_some());
    }

    #[tokio::test]
    async fn duplicate_provider_id_is_rejected() {
        let repo = InMemorySubscriptionRepository::new()
            .with_user("user-1")
            .with_user("user-2");
        repo.create_subscription_atomic(&new_subscription("user-1", "I-1", SubscriptionStatus::Pending))
            .await
            .unwrap();

        let err = repo
            .create_subscription_atomic(&new_subscription("user-2", "I-1", SubscriptionStatus::Pending))
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::SubscriptionExists);
        assert_eq!(repo.get("I-1").unwrap().user_id.as_str(), "user-1");
    }

    #[tokio::test]
    async fn unknown_user_is_rejected() {
        let repo = InMemorySubscriptionRepository::new();

        let err = repo
            .create_subscription_atomic(&new_subscription("ghost", "I-1", SubscriptionStatus::Pending))
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::UserNotFound);
        assert!(repo.is_empty());
    }

    #[tokio::test]
    async fn invalid_initial_status_is_rejected() {
        let repo = InMemorySubscriptionRepository::new().with_user("user-1");

        let err = repo
            .create_subscription_atomic(&new_subscription("user-1", "I-1", SubscriptionStatus::Expired))
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::ValidationFailed);
    }

    #[tokio::test]
    async fn concurrent_creates_yield_exactly_one_row() {
        let repo = Arc::new(InMemorySubscriptionRepository::new().with_user("user-1"));

        let attempts = (0..10).map(|_| {
            let repo = repo.clone();
            async move {
                repo.create_subscription_atomic(&new_subscription(
                    "user-1",
                    "I-RACE",
                    SubscriptionStatus::Pending,
                ))
                .await
            }
        });
        let results = futures::future::join_all(attempts).await;

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert_eq!(repo.len(), 1);
    }

    // ══════════════════════════════════════════════════════════════
    // Cancellation
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn cancel_requires_matching_owner() {
        let repo = InMemorySubscriptionRepository::new().with_user("user-1");
        repo.create_subscription_atomic(&new_subscription("user-1", "I-1", SubscriptionStatus::Active))
            .await
            .unwrap();

        let err = repo
            .cancel_subscription_atomic(&UserId::new("user-2").unwrap(), &psid("I-1"), "nope")
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::SubscriptionNotFound);

        repo.cancel_subscription_atomic(&UserId::new("user-1").unwrap(), &psid("I-1"), "bye")
            .await
            .unwrap();
        let row = repo.get("I-1").unwrap();
        assert_eq!(row.status, SubscriptionStatus::Cancelled);
        assert_eq!(row.cancellation_reason.as_deref(), Some("bye"));
        assert!(row.cancelled_at.is_some());
    }

    #[tokio::test]
    async fn cancelling_twice_reports_not_found() {
        let repo = InMemorySubscriptionRepository::new().with_user("user-1");
        let user = UserId::new("user-1").unwrap();
        repo.create_subscription_atomic(&new_subscription("user-1", "I-1", SubscriptionStatus::Active))
            .await
            .unwrap();

        repo.cancel_subscription_atomic(&user, &psid("I-1"), "first").await.unwrap();
        let err = repo
            .cancel_subscription_atomic(&user, &psid("I-1"), "second")
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::SubscriptionNotFound);
        assert_eq!(repo.get("I-1").unwrap().cancellation_reason.as_deref(), Some("first"));
    }

    // ══════════════════════════════════════════════════════════════
    // Keyed updates
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn update_for_missing_row_reports_not_found() {
        let repo = InMemorySubscriptionRepository::new();

        let outcome = repo
            .apply_status_update(&psid("I-NONE"), &StatusUpdate::status_only(SubscriptionStatus::Active))
            .await
            .unwrap();

        assert_eq!(outcome, ApplyOutcome::NotFound);
    }

    #[tokio::test]
    async fn update_uses_injected_clock() {
        let start = Timestamp::now();
        let clock = Arc::new(ManualClock::new(start));
        let repo = InMemorySubscriptionRepository::with_clock(clock.clone()).with_user("user-1");
        repo.create_subscription_atomic(&new_subscription("user-1", "I-1", SubscriptionStatus::Pending))
            .await
            .unwrap();

        clock.advance(chrono::Duration::seconds(30));
        let later = start.plus_secs(30);
        let update = StatusUpdate {
            status: SubscriptionStatus::Active,
            start_date: FieldWrite::SetIfNull(later),
            next_billing_date: FieldWrite::Keep,
        };
        repo.apply_status_update(&psid("I-1"), &update).await.unwrap();

        let row = repo.get("I-1").unwrap();
        assert_eq!(row.updated_at, later);
        assert_eq!(row.start_date, Some(later));
    }

    #[tokio::test]
    async fn fail_writes_surfaces_database_error() {
        let repo = InMemorySubscriptionRepository::new().with_user("user-1");
        repo.set_fail_writes(true);

        let err = repo
            .create_subscription_atomic(&new_subscription("user-1", "I-1", SubscriptionStatus::Active))
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert!(repo.is_empty());
    }
}

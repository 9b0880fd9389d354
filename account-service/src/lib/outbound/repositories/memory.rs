use std::collections::HashMap;

use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::domain::errors::AccountError;
use crate::domain::magic_link::ports::MagicLinkRepository;
use crate::domain::oauth::models::OAuthLink;
use crate::domain::oauth::models::OAuthState;
use crate::domain::oauth::ports::OAuthLinkRepository;
use crate::domain::oauth::ports::OAuthStateRepository;
use crate::domain::user::models::EmailAddress;
use crate::domain::user::models::User;
use crate::domain::user::models::UserId;
use crate::domain::user::ports::CredentialRepository;
use crate::domain::user::ports::UserRepository;

#[derive(Default)]
struct Tables {
    users: HashMap<UserId, User>,
    /// Unique index on the normalized email.
    emails: HashMap<EmailAddress, UserId>,
    password_hashes: HashMap<UserId, String>,
    /// Keyed by `(provider, provider_user_id)`.
    links: HashMap<(String, String), OAuthLink>,
    states: HashMap<String, OAuthState>,
    used_token_ids: HashMap<String, DateTime<Utc>>,
}

impl Tables {
    fn purge_expired(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.states.len() + self.used_token_ids.len();

        self.states.retain(|_, state| !state.is_expired(now));
        self.used_token_ids.retain(|_, expires_at| *expires_at >= now);

        before - (self.states.len() + self.used_token_ids.len())
    }
}

/// Process-local store implementing every repository port.
///
/// All tables sit behind one lock, so each operation is an atomic
/// check-and-mutate. Suitable for tests, demos and single-node deployments
/// that can afford to lose state on restart.
///
/// Expired CSRF states and magic-link ids are dropped whenever a new one is
/// written, so the one-time tables stay bounded by what is still live.
#[derive(Default)]
pub struct InMemoryAccountStore {
    tables: RwLock<Tables>,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn user_count(&self) -> usize {
        self.tables.read().await.users.len()
    }

    /// Drop expired CSRF states and forgotten magic-link ids.
    ///
    /// Returns how many entries were removed.
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let removed = self.tables.write().await.purge_expired(now);
        if removed > 0 {
            tracing::debug!(removed, "Purged expired one-time entries");
        }
        removed
    }
}

#[async_trait]
impl UserRepository for InMemoryAccountStore {
    async fn create(&self, user: User) -> Result<User, AccountError> {
        let mut tables = self.tables.write().await;

        if tables.emails.contains_key(&user.email) {
            return Err(AccountError::EmailAlreadyExists(user.email.to_string()));
        }
        if tables.users.contains_key(&user.id) {
            return Err(AccountError::Storage(format!("duplicate user id {}", user.id)));
        }

        tables.emails.insert(user.email.clone(), user.id);
        tables.users.insert(user.id, user.clone());

        Ok(user)
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, AccountError> {
        Ok(self.tables.read().await.users.get(id).cloned())
    }

    async fn find_by_email(&self, email: &EmailAddress) -> Result<Option<User>, AccountError> {
        let tables = self.tables.read().await;
        Ok(tables
            .emails
            .get(email)
            .and_then(|id| tables.users.get(id))
            .cloned())
    }

    async fn mark_verified(&self, id: &UserId) -> Result<User, AccountError> {
        let mut tables = self.tables.write().await;

        let user = tables
            .users
            .get_mut(id)
            .ok_or_else(|| AccountError::UserNotFound(id.to_string()))?;
        user.is_verified = true;

        Ok(user.clone())
    }

    async fn change_email(
        &self,
        id: &UserId,
        current: &EmailAddress,
        new: &EmailAddress,
    ) -> Result<Option<User>, AccountError> {
        let mut tables = self.tables.write().await;

        match tables.users.get(id) {
            Some(user) if user.email != *current => return Ok(None),
            Some(_) => {}
            None => return Err(AccountError::UserNotFound(id.to_string())),
        }

        if let Some(owner) = tables.emails.get(new) {
            if owner != id {
                return Err(AccountError::EmailAlreadyExists(new.to_string()));
            }
        }

        tables.emails.remove(current);
        tables.emails.insert(new.clone(), *id);

        let user = tables
            .users
            .get_mut(id)
            .ok_or_else(|| AccountError::UserNotFound(id.to_string()))?;
        user.email = new.clone();
        user.is_verified = true;

        Ok(Some(user.clone()))
    }

    async fn delete(&self, id: &UserId) -> Result<(), AccountError> {
        let mut tables = self.tables.write().await;

        let user = tables
            .users
            .remove(id)
            .ok_or_else(|| AccountError::UserNotFound(id.to_string()))?;

        tables.emails.remove(&user.email);
        tables.password_hashes.remove(id);
        tables.links.retain(|_, link| link.user_id != *id);

        Ok(())
    }
}

#[async_trait]
impl CredentialRepository for InMemoryAccountStore {
    async fn get_password_hash(&self, user_id: &UserId) -> Result<Option<String>, AccountError> {
        Ok(self.tables.read().await.password_hashes.get(user_id).cloned())
    }

    async fn set_password_hash(&self, user_id: &UserId, hash: &str) -> Result<(), AccountError> {
        let mut tables = self.tables.write().await;

        if !tables.users.contains_key(user_id) {
            return Err(AccountError::UserNotFound(user_id.to_string()));
        }
        tables.password_hashes.insert(*user_id, hash.to_string());

        Ok(())
    }
}

#[async_trait]
impl MagicLinkRepository for InMemoryAccountStore {
    async fn consume_token_id(
        &self,
        token_id: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<bool, AccountError> {
        let mut tables = self.tables.write().await;

        if tables.used_token_ids.contains_key(token_id) {
            return Ok(false);
        }
        tables.purge_expired(Utc::now());
        tables.used_token_ids.insert(token_id.to_string(), expires_at);

        Ok(true)
    }
}

#[async_trait]
impl OAuthLinkRepository for InMemoryAccountStore {
    async fn find_link(
        &self,
        provider: &str,
        provider_user_id: &str,
    ) -> Result<Option<OAuthLink>, AccountError> {
        let key = (provider.to_string(), provider_user_id.to_string());
        Ok(self.tables.read().await.links.get(&key).cloned())
    }

    async fn find_link_for_user(
        &self,
        user_id: &UserId,
        provider: &str,
    ) -> Result<Option<OAuthLink>, AccountError> {
        Ok(self
            .tables
            .read()
            .await
            .links
            .values()
            .find(|link| link.user_id == *user_id && link.provider == provider)
            .cloned())
    }

    async fn create_link(&self, link: OAuthLink) -> Result<OAuthLink, AccountError> {
        let mut tables = self.tables.write().await;

        if !tables.users.contains_key(&link.user_id) {
            return Err(AccountError::UserNotFound(link.user_id.to_string()));
        }

        let key = (link.provider.clone(), link.provider_user_id.clone());
        if tables.links.contains_key(&key) {
            return Err(AccountError::ProviderLinked);
        }
        tables.links.insert(key, link.clone());

        Ok(link)
    }

    async fn delete_link(&self, user_id: &UserId, provider: &str) -> Result<bool, AccountError> {
        let mut tables = self.tables.write().await;
        let before = tables.links.len();

        tables
            .links
            .retain(|_, link| !(link.user_id == *user_id && link.provider == provider));

        Ok(tables.links.len() < before)
    }
}

#[async_trait]
impl OAuthStateRepository for InMemoryAccountStore {
    async fn store_state(&self, state: OAuthState) -> Result<(), AccountError> {
        let mut tables = self.tables.write().await;

        tables.purge_expired(Utc::now());
        tables.states.insert(state.state.clone(), state);

        Ok(())
    }

    async fn consume_state(&self, state: &str) -> Result<Option<OAuthState>, AccountError> {
        Ok(self.tables.write().await.states.remove(state))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Duration;

    use super::*;
    use crate::domain::user::models::AuthMethod;

    fn user(email: &str) -> User {
        User::new(EmailAddress::new(email).unwrap(), AuthMethod::Password, false)
    }

    #[tokio::test]
    async fn test_create_enforces_unique_email() {
        let store = InMemoryAccountStore::new();
        store.create(user("a@x.com")).await.unwrap();

        let err = store.create(user("A@X.com")).await.unwrap_err();
        assert_eq!(err, AccountError::EmailAlreadyExists("a@x.com".to_string()));
        assert_eq!(store.user_count().await, 1);
    }

    #[tokio::test]
    async fn test_change_email_moves_index() {
        let store = InMemoryAccountStore::new();
        let created = store.create(user("old@x.com")).await.unwrap();

        let old = EmailAddress::new("old@x.com").unwrap();
        let new = EmailAddress::new("new@x.com").unwrap();
        let moved = store
            .change_email(&created.id, &old, &new)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(moved.email, new);
        assert!(moved.is_verified);

        assert!(store.find_by_email(&old).await.unwrap().is_none());
        assert_eq!(store.find_by_email(&new).await.unwrap().unwrap().id, created.id);

        // The old address is free again
        store.create(user("old@x.com")).await.unwrap();
    }

    #[tokio::test]
    async fn test_change_email_rejects_taken_email() {
        let store = InMemoryAccountStore::new();
        store.create(user("taken@x.com")).await.unwrap();
        let mine = store.create(user("mine@x.com")).await.unwrap();

        let err = store
            .change_email(
                &mine.id,
                &mine.email,
                &EmailAddress::new("taken@x.com").unwrap(),
            )
            .await
            .unwrap_err();

        assert_eq!(err, AccountError::EmailAlreadyExists("taken@x.com".to_string()));
    }

    #[tokio::test]
    async fn test_change_email_from_stale_address_is_refused() {
        let store = InMemoryAccountStore::new();
        let created = store.create(user("old@x.com")).await.unwrap();
        let old = EmailAddress::new("old@x.com").unwrap();
        let first = EmailAddress::new("first@x.com").unwrap();
        let second = EmailAddress::new("second@x.com").unwrap();

        store.change_email(&created.id, &old, &first).await.unwrap();
        let stale = store.change_email(&created.id, &old, &second).await.unwrap();

        assert!(stale.is_none());
        assert!(store.find_by_email(&second).await.unwrap().is_none());
        assert_eq!(store.find_by_id(&created.id).await.unwrap().unwrap().email, first);
    }

    #[tokio::test]
    async fn test_mark_verified_keeps_concurrent_email_change() {
        let store = InMemoryAccountStore::new();
        let created = store.create(user("old@x.com")).await.unwrap();
        let new = EmailAddress::new("new@x.com").unwrap();

        // Another writer moves the email after `created` was read
        store
            .change_email(&created.id, &created.email, &new)
            .await
            .unwrap();
        let verified = store.mark_verified(&created.id).await.unwrap();

        assert_eq!(verified.email, new);
        assert!(verified.is_verified);
        assert!(store.find_by_email(&created.email).await.unwrap().is_none());
        assert!(matches!(
            store.mark_verified(&UserId::new()).await,
            Err(AccountError::UserNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_cascades() {
        let store = InMemoryAccountStore::new();
        let created = store.create(user("a@x.com")).await.unwrap();
        store.set_password_hash(&created.id, "hash").await.unwrap();
        store
            .create_link(OAuthLink::new(created.id, "google", "g-1"))
            .await
            .unwrap();

        store.delete(&created.id).await.unwrap();

        assert!(store.get_password_hash(&created.id).await.unwrap().is_none());
        assert!(store.find_link("google", "g-1").await.unwrap().is_none());
        assert_eq!(
            store.delete(&created.id).await.unwrap_err(),
            AccountError::UserNotFound(created.id.to_string())
        );
    }

    #[tokio::test]
    async fn test_set_password_hash_requires_user() {
        let store = InMemoryAccountStore::new();
        let result = store.set_password_hash(&UserId::new(), "hash").await;
        assert!(matches!(result, Err(AccountError::UserNotFound(_))));
    }

    #[tokio::test]
    async fn test_links_are_unique_per_identity() {
        let store = InMemoryAccountStore::new();
        let first = store.create(user("a@x.com")).await.unwrap();
        let second = store.create(user("b@x.com")).await.unwrap();

        store
            .create_link(OAuthLink::new(first.id, "github", "42"))
            .await
            .unwrap();
        let err = store
            .create_link(OAuthLink::new(second.id, "github", "42"))
            .await
            .unwrap_err();
        assert_eq!(err, AccountError::ProviderLinked);

        let link = store.find_link_for_user(&first.id, "github").await.unwrap();
        assert_eq!(link.unwrap().provider_user_id, "42");

        assert!(store.delete_link(&first.id, "github").await.unwrap());
        assert!(!store.delete_link(&first.id, "github").await.unwrap());
    }

    #[tokio::test]
    async fn test_state_consumed_once_under_contention() {
        let store = Arc::new(InMemoryAccountStore::new());
        store
            .store_state(OAuthState {
                state: "s".to_string(),
                expires_at: Utc::now() + Duration::minutes(10),
            })
            .await
            .unwrap();

        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store.consume_state("s").await.unwrap().is_some()
            }));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn test_consume_token_id_once() {
        let store = InMemoryAccountStore::new();
        let expires_at = Utc::now() + Duration::minutes(15);

        assert!(store.consume_token_id("jti-1", expires_at).await.unwrap());
        assert!(!store.consume_token_id("jti-1", expires_at).await.unwrap());
        assert!(store.consume_token_id("jti-2", expires_at).await.unwrap());
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let store = InMemoryAccountStore::new();
        let now = Utc::now();

        store
            .store_state(OAuthState {
                state: "fresh".to_string(),
                expires_at: now + Duration::minutes(1),
            })
            .await
            .unwrap();
        store
            .consume_token_id("live", now + Duration::minutes(1))
            .await
            .unwrap();

        assert_eq!(store.purge_expired(now).await, 0);
        assert_eq!(store.purge_expired(now + Duration::minutes(2)).await, 2);
        assert!(store.consume_state("fresh").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_writes_drop_expired_one_time_entries() {
        let store = InMemoryAccountStore::new();
        let now = Utc::now();

        store
            .store_state(OAuthState {
                state: "stale".to_string(),
                expires_at: now - Duration::minutes(1),
            })
            .await
            .unwrap();
        store
            .consume_token_id("old", now - Duration::minutes(1))
            .await
            .unwrap();

        // Each write sweeps what expired before it
        store
            .store_state(OAuthState {
                state: "fresh".to_string(),
                expires_at: now + Duration::minutes(10),
            })
            .await
            .unwrap();
        store
            .consume_token_id("new", now + Duration::minutes(10))
            .await
            .unwrap();

        assert!(store.consume_state("stale").await.unwrap().is_none());
        assert!(store.consume_state("fresh").await.unwrap().is_some());
        assert_eq!(store.purge_expired(now).await, 0);
        assert!(!store.consume_token_id("new", now + Duration::minutes(10)).await.unwrap());
    }
}

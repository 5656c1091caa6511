use std::sync::Mutex;

use axum::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::store::{NewUser, StoreError, User, UserStore};

/// In-memory store with the same duplicate-email semantics as the
/// Postgres unique index. Backs `AppState::fake()` and the handler tests.
#[derive(Default)]
pub struct MemoryStore {
    users: Mutex<Vec<User>>,
}

impl MemoryStore {
    pub fn count(&self) -> usize {
        self.users.lock().unwrap().len()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.lock().unwrap();
        Ok(users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let users = self.users.lock().unwrap();
        Ok(users.iter().find(|u| u.id == id).cloned())
    }

    async fn insert(&self, new_user: NewUser) -> Result<User, StoreError> {
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.email == new_user.email) {
            return Err(StoreError::DuplicateEmail);
        }
        let user = User {
            id: Uuid::new_v4(),
            email: new_user.email,
            username: new_user.username,
            password_hash: new_user.password_hash,
            created_at: OffsetDateTime::now_utc(),
        };
        users.push(user.clone());
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: email.into(),
            username: "someone".into(),
            password_hash: "$argon2id$fake".into(),
        }
    }

    #[tokio::test]
    async fn insert_assigns_id_and_timestamp() {
        let store = MemoryStore::default();
        let user = store.insert(new_user("a@b.com")).await.expect("insert");
        assert_eq!(user.email, "a@b.com");
        assert_eq!(store.count(), 1);

        let found = store.find_by_id(user.id).await.expect("find_by_id");
        assert_eq!(found.map(|u| u.id), Some(user.id));
    }

    #[tokio::test]
    async fn insert_rejects_duplicate_email() {
        let store = MemoryStore::default();
        store.insert(new_user("a@b.com")).await.expect("first insert");
        let err = store.insert(new_user("a@b.com")).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateEmail));
        assert_eq!(store.count(), 1);
    }

    #[tokio::test]
    async fn find_by_email_misses_unknown_user() {
        let store = MemoryStore::default();
        let found = store.find_by_email("nobody@b.com").await.expect("find");
        assert!(found.is_none());
    }
}

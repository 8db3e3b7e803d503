use std::{collections::HashMap, sync::Arc, time::Duration, time::Instant};

use rand::{distributions::Alphanumeric, Rng};
use tokio::sync::Mutex;

const DEFAULT_LOGIN_STATE_TTL: Duration = Duration::from_secs(600);

/// Where to send the visitor once the identity provider hands them back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginIntent {
    pub return_to: Option<String>,
}

struct PendingLogin {
    created: Instant,
    intent: LoginIntent,
}

/// Single-use CSRF states for the identity provider redirect.
#[derive(Clone)]
pub struct OAuthStateStore {
    inner: Arc<Mutex<HashMap<String, PendingLogin>>>,
    ttl: Duration,
}

impl OAuthStateStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            ttl,
        }
    }

    pub async fn issue(&self, return_to: Option<String>) -> String {
        let state = random_state();
        let mut guard = self.inner.lock().await;
        prune(&mut guard, self.ttl);
        guard.insert(
            state.clone(),
            PendingLogin {
                created: Instant::now(),
                intent: LoginIntent { return_to },
            },
        );
        state
    }

    pub async fn consume(&self, state: &str) -> Option<LoginIntent> {
        let mut guard = self.inner.lock().await;
        prune(&mut guard, self.ttl);
        guard.remove(state).map(|pending| pending.intent)
    }
}

impl Default for OAuthStateStore {
    fn default() -> Self {
        Self::new(DEFAULT_LOGIN_STATE_TTL)
    }
}

fn random_state() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

fn prune(map: &mut HashMap<String, PendingLogin>, ttl: Duration) {
    let now = Instant::now();
    map.retain(|_, pending| now.duration_since(pending.created) <= ttl);
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    #[tokio::test]
    async fn state_is_consumed_once_and_keeps_intent() {
        let store = OAuthStateStore::new(Duration::from_secs(60));
        let state = store.issue(Some("/dashboard/billing".into())).await;

        assert_eq!(state.len(), 32);
        let intent = store.consume(&state).await.expect("state should be valid");
        assert_eq!(intent.return_to.as_deref(), Some("/dashboard/billing"));
        assert!(store.consume(&state).await.is_none());
    }

    #[tokio::test]
    async fn state_expires_after_ttl() {
        let store = OAuthStateStore::new(Duration::from_millis(10));
        let state = store.issue(None).await;

        sleep(Duration::from_millis(25)).await;

        assert!(store.consume(&state).await.is_none());
    }
}

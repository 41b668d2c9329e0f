// ABOUTME: In-process registry of live sandboxes and their cleanup timers
// ABOUTME: Per-id insert/remove plus token-guarded timers that fire at most once

use crate::types::Sandbox;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::AbortHandle;
use tracing::debug;

struct ArmedTimer {
    token: u64,
    handle: AbortHandle,
}

/// Shared between request handlers and cleanup timer tasks.
///
/// A timer only runs its callback after it has removed its own entry from
/// `timers` (matched by token), and every destroy path removes the entry
/// first. Whichever side removes the entry owns the cleanup.
#[derive(Default)]
pub struct SandboxRegistry {
    sandboxes: RwLock<HashMap<String, Sandbox>>,
    timers: Mutex<HashMap<String, ArmedTimer>>,
    next_token: AtomicU64,
}

impl SandboxRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, sandbox: Sandbox) {
        let mut sandboxes = self.sandboxes.write().await;
        sandboxes.insert(sandbox.id.clone(), sandbox);
    }

    pub async fn remove(&self, id: &str) -> Option<Sandbox> {
        let mut sandboxes = self.sandboxes.write().await;
        sandboxes.remove(id)
    }

    pub async fn get(&self, id: &str) -> Option<Sandbox> {
        let sandboxes = self.sandboxes.read().await;
        sandboxes.get(id).cloned()
    }

    pub async fn list_for_owner(&self, owner: &str) -> Vec<Sandbox> {
        let sandboxes = self.sandboxes.read().await;
        let mut owned: Vec<Sandbox> = sandboxes
            .values()
            .filter(|s| s.owner == owner)
            .cloned()
            .collect();
        owned.sort_by_key(|s| s.created_at);
        owned
    }

    pub async fn len(&self) -> usize {
        self.sandboxes.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Arm (or re-arm) the cleanup timer for `id`. Any previous timer is aborted.
    pub async fn arm_timer<F, Fut>(self: &Arc<Self>, id: &str, delay: Duration, on_expire: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        let registry = Arc::clone(self);
        let key = id.to_string();

        // Held across spawn so the task cannot claim before its entry exists
        let mut timers = self.timers.lock().await;
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if registry.claim_timer(&key, token).await {
                on_expire().await;
            }
        });

        let armed = ArmedTimer {
            token,
            handle: task.abort_handle(),
        };
        if let Some(previous) = timers.insert(id.to_string(), armed) {
            previous.handle.abort();
        }
        debug!("Armed cleanup timer for {} ({:?})", id, delay);
    }

    /// Cancel the timer for `id`. Returns true if one was armed.
    pub async fn cancel_timer(&self, id: &str) -> bool {
        let mut timers = self.timers.lock().await;
        match timers.remove(id) {
            Some(timer) => {
                timer.handle.abort();
                debug!("Cancelled cleanup timer for {}", id);
                true
            }
            None => false,
        }
    }

    pub async fn has_timer(&self, id: &str) -> bool {
        self.timers.lock().await.contains_key(id)
    }

    /// Called by a firing timer: removes its entry only if it is still current
    async fn claim_timer(&self, id: &str, token: u64) -> bool {
        let mut timers = self.timers.lock().await;
        match timers.get(id) {
            Some(timer) if timer.token == token => {
                timers.remove(id);
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SandboxStatus;
    use chrono::Utc;
    use std::sync::atomic::AtomicUsize;

    fn sandbox(id: &str, owner: &str) -> Sandbox {
        let now = Utc::now();
        Sandbox {
            id: id.to_string(),
            owner: owner.to_string(),
            image: "node:18".to_string(),
            working_directory: "/app".to_string(),
            host_mount_path: "/tmp/x".into(),
            exposed_port: None,
            memory_limit_mb: 512,
            cpu_quota: 50_000,
            cpu_period: 100_000,
            created_at: now,
            cleanup_deadline: now,
            status: SandboxStatus::Running,
        }
    }

    fn counting_callback(counter: &Arc<AtomicUsize>) -> impl FnOnce() -> std::future::Ready<()> {
        let counter = Arc::clone(counter);
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
            std::future::ready(())
        }
    }

    #[tokio::test]
    async fn test_insert_get_remove() {
        let registry = SandboxRegistry::new();
        registry.insert(sandbox("a", "1")).await;
        registry.insert(sandbox("b", "2")).await;

        assert_eq!(registry.len().await, 2);
        assert_eq!(registry.list_for_owner("1").await.len(), 1);
        assert!(registry.get("a").await.is_some());

        assert!(registry.remove("a").await.is_some());
        assert!(registry.remove("a").await.is_none());
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_timer_fires_once() {
        let registry = Arc::new(SandboxRegistry::new());
        let fired = Arc::new(AtomicUsize::new(0));

        registry
            .arm_timer("a", Duration::from_millis(20), counting_callback(&fired))
            .await;
        assert!(registry.has_timer("a").await);

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!registry.has_timer("a").await);
    }

    #[tokio::test]
    async fn test_cancelled_timer_never_fires() {
        let registry = Arc::new(SandboxRegistry::new());
        let fired = Arc::new(AtomicUsize::new(0));

        registry
            .arm_timer("a", Duration::from_millis(30), counting_callback(&fired))
            .await;
        assert!(registry.cancel_timer("a").await);
        assert!(!registry.cancel_timer("a").await);

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_rearm_replaces_previous_timer() {
        let registry = Arc::new(SandboxRegistry::new());
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        registry
            .arm_timer("a", Duration::from_millis(30), counting_callback(&first))
            .await;
        registry
            .arm_timer("a", Duration::from_millis(30), counting_callback(&second))
            .await;

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }
}

//! Mounted-view scope for late responses.
//!
//! Leaving a view does not cancel its requests. Each view holds a
//! [`ViewScope`]; when the view goes away the scope is unmounted, and any
//! response that arrives afterwards is dropped instead of applied.

use std::future::Future;

use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Lifetime of one mounted view.
#[derive(Debug, Clone)]
pub struct ViewScope {
    name: &'static str,
    token: CancellationToken,
}

impl ViewScope {
    #[must_use]
    pub fn mount(name: &'static str) -> Self {
        Self {
            name,
            token: CancellationToken::new(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub fn is_mounted(&self) -> bool {
        !self.token.is_cancelled()
    }

    /// The view went away. Clones of this scope see it too.
    pub fn unmount(&self) {
        self.token.cancel();
    }

    /// Apply `result` only if the view is still mounted.
    ///
    /// Returns `None` when the result was dropped.
    pub fn deliver<T, R>(&self, result: T, apply: impl FnOnce(T) -> R) -> Option<R> {
        if self.is_mounted() {
            Some(apply(result))
        } else {
            debug!(
                name: "view.response.dropped",
                view = self.name,
                "Response arrived after the view unmounted"
            );
            None
        }
    }

    /// Await `request` to completion, then deliver it.
    pub async fn settle<T, R>(
        &self,
        request: impl Future<Output = T>,
        apply: impl FnOnce(T) -> R,
    ) -> Option<R> {
        let result = request.await;
        self.deliver(result, apply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_deliver_while_mounted() {
        let scope = ViewScope::mount("profile");
        let mut applied = Vec::new();
        assert_eq!(scope.deliver(5, |v| applied.push(v)), Some(()));
        assert_eq!(applied, vec![5]);
    }

    #[test]
    fn test_drop_after_unmount() {
        let scope = ViewScope::mount("profile");
        let clone = scope.clone();
        scope.unmount();

        let mut applied = false;
        assert!(clone.deliver((), |()| applied = true).is_none());
        assert!(!applied);
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_outlives_view() {
        let scope = ViewScope::mount("bookings");
        let remote = scope.clone();

        let pending = tokio::spawn(async move {
            remote
                .settle(
                    async {
                        tokio::time::sleep(Duration::from_secs(5)).await;
                        "late"
                    },
                    str::to_string,
                )
                .await
        });

        tokio::time::sleep(Duration::from_secs(1)).await;
        scope.unmount();

        // The request still ran to completion; its result was discarded.
        assert_eq!(pending.await.unwrap(), None);
    }
}

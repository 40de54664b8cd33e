//! Task-local trace id for the request being served.

use std::cell::RefCell;

use tokio::task_local;

task_local! {
    static TRACE_ID: RefCell<Option<String>>;
}

/// The current request's trace id, or "unknown" outside a request.
pub fn trace_id() -> String {
    TRACE_ID
        .try_with(|cell| cell.borrow().clone())
        .ok()
        .flatten()
        .unwrap_or_else(|| "unknown".to_string())
}

/// Run `future` with `trace_id` as the task-local trace id.
pub async fn with_trace_id<F, R>(trace_id: String, future: F) -> R
where
    F: std::future::Future<Output = R>,
{
    TRACE_ID.scope(RefCell::new(Some(trace_id)), future).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_trace_id_outside_context() {
        assert_eq!(trace_id(), "unknown");
    }

    #[tokio::test]
    async fn test_nested_trace_contexts() {
        let result = with_trace_id("outer".to_string(), async {
            assert_eq!(trace_id(), "outer");

            let inner = with_trace_id("inner".to_string(), async { trace_id() }).await;

            assert_eq!(trace_id(), "outer");
            inner
        })
        .await;

        assert_eq!(result, "inner");
        assert_eq!(trace_id(), "unknown");
    }
}

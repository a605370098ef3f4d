//! The bounded-concurrency bulk dispatcher.
//!
//! Turns a lazily-produced sequence of [`RequestDescriptor`]s into submitted
//! calls with at most `limit` in flight, delivering exactly one [`Outcome`]
//! per request to a single sequential consumer. Requests are instantiated one
//! at a time as capacity frees up, so a file with far more rows than the
//! concurrency ceiling never materializes every request body up front.
//!
//! A response is fulfilled only when its status is <= 201; anything higher is
//! routed to the failure path with the flattened error-envelope message, and
//! a transport failure with no response at all records the fixed sentinel.

use std::future::Future;

use futures::stream::{self, StreamExt};

use starlift_client::{rejection_message, ApiClient, ApiError, SubmitReply, NO_RESPONSE_MESSAGE};

use crate::request::{Outcome, RequestDescriptor};

/// Executes `requests` against `submit` under a hard concurrency ceiling.
///
/// `on_outcome` is invoked exactly once per request, in completion order, and
/// never reentrantly — it is the single writer for counters and log handles.
/// The call blocks until every request has settled and returns the number of
/// requests submitted.
pub async fn dispatch<I, F, Fut, O>(requests: I, limit: usize, submit: F, mut on_outcome: O) -> usize
where
    I: IntoIterator<Item = RequestDescriptor>,
    F: Fn(RequestDescriptor) -> Fut,
    Fut: Future<Output = Result<SubmitReply, ApiError>>,
    O: FnMut(Outcome),
{
    let mut in_flight = stream::iter(requests.into_iter().map(|descriptor| {
        let row_index = descriptor.row_index;
        let call = submit(descriptor);
        async move { (row_index, call.await) }
    }))
    .buffer_unordered(limit.max(1));

    let mut settled = 0usize;
    while let Some((row_index, result)) = in_flight.next().await {
        settled += 1;
        on_outcome(settle(row_index, result));
    }
    settled
}

/// Submit one descriptor through the API client. The production `submit`
/// capability for [`dispatch`]; tests substitute closures with counters and
/// artificial latency.
pub async fn submit_descriptor(
    client: &ApiClient,
    descriptor: RequestDescriptor,
) -> Result<SubmitReply, ApiError> {
    client
        .submit(descriptor.method, &descriptor.path, &descriptor.body)
        .await
}

fn settle(row_index: usize, result: Result<SubmitReply, ApiError>) -> Outcome {
    match result {
        Ok(reply) if reply.status <= 201 => Outcome::Success {
            row_index,
            status: reply.status,
            body: reply.body,
        },
        Ok(reply) => Outcome::Failure {
            row_index,
            reason: rejection_message(&reply.body),
        },
        Err(ApiError::Http(_)) => Outcome::Failure {
            row_index,
            reason: NO_RESPONSE_MESSAGE.to_string(),
        },
        Err(e) => Outcome::Failure {
            row_index,
            reason: e.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use reqwest::Method;
    use serde_json::json;

    use super::*;

    fn descriptor(row_index: usize) -> RequestDescriptor {
        RequestDescriptor {
            row_index,
            method: Method::POST,
            path: "accounts".into(),
            body: json!({"row": row_index}),
        }
    }

    fn ok_reply() -> Result<SubmitReply, ApiError> {
        Ok(SubmitReply {
            status: 200,
            body: String::new(),
        })
    }

    #[tokio::test]
    async fn delivers_exactly_one_outcome_per_request_under_reordering() {
        const N: usize = 40;
        let requests = (0..N).map(descriptor);

        // Vary latency so completions arrive far out of submission order.
        let submit = |d: RequestDescriptor| async move {
            let delay = (d.row_index * 13) % 29;
            tokio::time::sleep(Duration::from_millis(delay as u64)).await;
            ok_reply()
        };

        let mut seen = Vec::new();
        let settled = dispatch(requests, 7, submit, |outcome| {
            assert!(outcome.is_success());
            seen.push(outcome.row_index());
        })
        .await;

        assert_eq!(settled, N);
        let mut sorted = seen.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted, (0..N).collect::<Vec<_>>(), "no duplicates or omissions");
    }

    #[tokio::test]
    async fn never_exceeds_the_concurrency_limit() {
        const LIMIT: usize = 5;
        let current = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);

        let submit = |_d: RequestDescriptor| {
            let current = &current;
            let peak = &peak;
            async move {
                let now = current.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                current.fetch_sub(1, Ordering::SeqCst);
                ok_reply()
            }
        };

        let settled = dispatch((0..30).map(descriptor), LIMIT, submit, |_| {}).await;
        assert_eq!(settled, 30);
        assert!(
            peak.load(Ordering::SeqCst) <= LIMIT,
            "peak in-flight {} exceeded limit {LIMIT}",
            peak.load(Ordering::SeqCst)
        );
    }

    #[tokio::test]
    async fn requests_are_instantiated_lazily() {
        const LIMIT: usize = 2;
        let built = AtomicUsize::new(0);
        let completed = AtomicUsize::new(0);

        let requests = (0..20).map(|i| {
            built.fetch_add(1, Ordering::SeqCst);
            descriptor(i)
        });

        let submit = |_d: RequestDescriptor| {
            let built = &built;
            let completed = &completed;
            async move {
                // Descriptors are pulled on demand: never more than the
                // settled count plus the concurrency window exist.
                assert!(
                    built.load(Ordering::SeqCst) <= completed.load(Ordering::SeqCst) + LIMIT,
                    "descriptors were materialized eagerly"
                );
                tokio::time::sleep(Duration::from_millis(1)).await;
                completed.fetch_add(1, Ordering::SeqCst);
                ok_reply()
            }
        };

        dispatch(requests, LIMIT, submit, |_| {}).await;
        assert_eq!(built.load(Ordering::SeqCst), 20);
    }

    #[tokio::test]
    async fn status_above_201_routes_to_failure_with_flattened_message() {
        let submit = |_d: RequestDescriptor| async move {
            Ok(SubmitReply {
                status: 422,
                body: r#"{"error":{"message":[{"name":"Name is required"},"oops"]}}"#.into(),
            })
        };

        let mut outcomes = Vec::new();
        dispatch([descriptor(0)], 1, submit, |o| outcomes.push(o)).await;

        match &outcomes[0] {
            Outcome::Failure { row_index, reason } => {
                assert_eq!(*row_index, 0);
                assert!(reason.contains("Name is required"));
                assert!(reason.contains("oops"));
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn status_201_is_a_success() {
        let submit = |_d: RequestDescriptor| async move {
            Ok(SubmitReply {
                status: 201,
                body: r#"{"data":{"id":1}}"#.into(),
            })
        };
        let mut outcomes = Vec::new();
        dispatch([descriptor(0)], 1, submit, |o| outcomes.push(o)).await;
        assert!(outcomes[0].is_success());
    }

    #[tokio::test]
    async fn transport_failure_records_the_sentinel_reason() {
        // Port 1 refuses connections immediately, producing a real
        // reqwest transport error with no response.
        let submit = |_d: RequestDescriptor| async move {
            let err = reqwest::Client::new()
                .get("http://127.0.0.1:1/")
                .send()
                .await
                .expect_err("connection should be refused");
            Err(ApiError::Http(err))
        };

        let mut outcomes = Vec::new();
        dispatch([descriptor(3)], 1, submit, |o| outcomes.push(o)).await;

        match &outcomes[0] {
            Outcome::Failure { row_index, reason } => {
                assert_eq!(*row_index, 3);
                assert_eq!(reason, NO_RESPONSE_MESSAGE);
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }
}

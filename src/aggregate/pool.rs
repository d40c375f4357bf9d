//! Bounded-concurrency drain of a work queue.
//!
//! A fixed number of workers pull items from one shared queue; each worker
//! awaits one item at a time, so at most `concurrency` calls are ever in
//! flight. Workers are polled in place with `join_all` rather than spawned,
//! which keeps the whole drain cancellable by dropping its future.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Mutex, PoisonError};

use futures::future::join_all;

/// Runs `f` once per item with at most `concurrency` calls outstanding.
///
/// Results are returned in input order, whatever order the calls finished
/// in. A `concurrency` of zero is treated as one.
pub async fn drain_bounded<T, R, F, Fut>(items: Vec<T>, concurrency: usize, f: F) -> Vec<R>
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = R>,
{
    let total = items.len();
    let workers = concurrency.max(1).min(total);

    let queue: Mutex<VecDeque<(usize, T)>> = Mutex::new(items.into_iter().enumerate().collect());
    let slots: Mutex<Vec<Option<R>>> = Mutex::new((0..total).map(|_| None).collect());

    let queue = &queue;
    let slots_ref = &slots;
    let f = &f;
    join_all((0..workers).map(move |_| async move {
        loop {
            let next = queue.lock().unwrap_or_else(PoisonError::into_inner).pop_front();
            let Some((idx, item)) = next else { break };
            let out = f(item).await;
            slots_ref.lock().unwrap_or_else(PoisonError::into_inner)[idx] = Some(out);
        }
    }))
    .await;

    slots
        .into_inner()
        .unwrap_or_else(PoisonError::into_inner)
        .into_iter()
        .flatten()
        .collect()
}

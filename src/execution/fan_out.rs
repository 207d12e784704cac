use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Outputs of one bounded fan-out, collected after every worker finished
#[derive(Debug)]
pub struct FanOutResults<K, T> {
    pub completed: Vec<(K, T)>,
    /// Keys whose worker panicked or was cancelled
    pub aborted: Vec<K>,
}

/// Run `task` once per key with at most `max_in_flight` workers alive
///
/// A permit is taken before each spawn, so at most `max_in_flight` tasks
/// exist at any time. Returns only after all spawned workers have been
/// joined; every key ends up in exactly one of the two result lists.
pub async fn fan_out<K, T, F, Fut>(keys: Vec<K>, max_in_flight: usize, task: F) -> FanOutResults<K, T>
where
    K: Clone + PartialEq + Send + 'static,
    T: Send + 'static,
    F: Fn(K) -> Fut,
    Fut: Future<Output = T> + Send + 'static,
{
    let semaphore = Arc::new(Semaphore::new(max_in_flight.max(1)));
    let mut workers = JoinSet::new();
    let mut pending = keys.clone();

    for key in keys {
        let permit = match semaphore.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => break,
        };
        let work = task(key.clone());
        workers.spawn(async move {
            let _permit = permit;
            (key, work.await)
        });
    }

    let mut completed = Vec::with_capacity(pending.len());
    while let Some(joined) = workers.join_next().await {
        match joined {
            Ok((key, output)) => {
                if let Some(pos) = pending.iter().position(|k| *k == key) {
                    pending.swap_remove(pos);
                }
                completed.push((key, output));
            }
            Err(e) => tracing::error!("Worker aborted: {}", e),
        }
    }

    FanOutResults {
        completed,
        aborted: pending,
    }
}

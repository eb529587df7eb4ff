use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};

/// Shared pool for CPU-bound background work (chunk payload decoding).
/// Jobs are fire-and-forget; completion is reported over whatever channel
/// the submitter threads through the closure.
pub struct JobPool {
    pool: ThreadPool,
}

impl JobPool {
    pub fn new(num_threads: Option<usize>) -> Result<Self, ThreadPoolBuildError> {
        let threads = num_threads.unwrap_or_else(default_thread_count);
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|index| format!("decode-worker-{index}"))
            .build()?;
        Ok(Self { pool })
    }

    pub fn spawn<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.pool.spawn(job);
    }
}

/// Leave a core for the main loop; never fewer than two workers so a slow
/// decode cannot starve the pool, never more than eight.
fn default_thread_count() -> usize {
    let available = std::thread::available_parallelism()
        .map(|parallelism| parallelism.get())
        .unwrap_or(4);
    available.saturating_sub(1).clamp(2, 8)
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;

    use super::JobPool;

    #[test]
    fn spawned_jobs_run_and_report_back() {
        let pool = JobPool::new(Some(2)).expect("build job pool");
        let (tx, rx) = mpsc::channel();
        for value in 0..4 {
            let tx = tx.clone();
            pool.spawn(move || {
                let _ = tx.send(value * value);
            });
        }
        drop(tx);
        let mut results: Vec<i32> = rx.iter().collect();
        results.sort_unstable();
        assert_eq!(results, vec![0, 1, 4, 9]);
    }
}

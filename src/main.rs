/*!
 * Lock Async - Demo Driver
 *
 * Spawns contending tasks that each swap two shared cells across several
 * awaited steps under the mutex, then reports the lock status.
 *
 * Environment variables:
 * - LOCK_DEMO_TASKS: number of contending tasks (default: 8)
 * - LOCK_TIMEOUT_MS, LOCK_BACKOFF_BASE_MS, LOCK_BACKOFF_CEILING: mutex config
 */

use lock_async::{init_tracing, AsyncMutex, LockError, MutexConfig};
use miette::{miette, IntoDiagnostic, Result};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info};

const DEFAULT_DEMO_TASKS: usize = 8;
const STEP: Duration = Duration::from_millis(2);

struct Cells {
    a: AtomicI64,
    b: AtomicI64,
}

impl Cells {
    /// Swap `a` and `b` with a suspension between every read and write
    async fn swap(&self) {
        sleep(STEP).await;
        let c = self.a.load(Ordering::Relaxed);
        sleep(STEP).await;
        self.a.store(self.b.load(Ordering::Relaxed), Ordering::Relaxed);
        sleep(STEP).await;
        self.b.store(c, Ordering::Relaxed);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = MutexConfig::from_env()?;
    let tasks = match std::env::var("LOCK_DEMO_TASKS") {
        Ok(raw) => raw.trim().parse::<usize>().into_diagnostic()?,
        Err(_) => DEFAULT_DEMO_TASKS,
    };

    info!(
        tasks,
        timeout_ms = config.timeout.as_millis() as u64,
        base_ms = config.base.as_millis() as u64,
        ceiling = config.ceiling,
        "Starting lock demo"
    );

    let mutex = Arc::new(AsyncMutex::new(config)?);
    let cells = Arc::new(Cells {
        a: AtomicI64::new(1),
        b: AtomicI64::new(2),
    });

    let handles: Vec<_> = (0..tasks)
        .map(|_| {
            let mutex = mutex.clone();
            let cells = cells.clone();
            tokio::spawn(async move { mutex.run(|| cells.swap()).await })
        })
        .collect();

    let mut completed = 0usize;
    let mut timed_out = 0usize;
    for handle in handles {
        match handle.await.into_diagnostic()? {
            Ok(()) => completed += 1,
            Err(err @ LockError::Timeout(_)) => {
                error!(%err, "task gave up waiting");
                timed_out += 1;
            }
            Err(err) => return Err(err.into()),
        }
    }

    let status = mutex.status();
    println!("{}", serde_json::to_string_pretty(&status).into_diagnostic()?);

    let a = cells.a.load(Ordering::Relaxed);
    let b = cells.b.load(Ordering::Relaxed);
    let expected = if completed % 2 == 0 { (1, 2) } else { (2, 1) };

    info!(completed, timed_out, a, b, "Lock demo finished");

    if (a, b) != expected {
        return Err(miette!(
            "swap invariant violated: a={a}, b={b} after {completed} serialized swaps"
        ));
    }

    Ok(())
}

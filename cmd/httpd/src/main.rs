//! # admit-httpd
//!
//! HTTP/1.1 demo server on top of `BoundedWorkerPool`.
//!
//! - The accept loop turns every connection into an `HttpTask`
//! - The pool runs it on a worker thread (`200 OK`), or, when all workers
//!   are busy and the queue is full, invokes it in rejected mode on the
//!   accept thread (`503 Service Unavailable`, `Retry-After: 1`)
//! - No client ever hangs waiting for a slot that will not come
//!
//! ## Usage
//!
//!     cargo run -p admit-httpd --release -- \
//!         [--port 8080] [--workers 4] [--queue 16] [--work-ms 20]
//!
//! Pool size falls back to `ADMIT_WORKERS` / `ADMIT_QUEUE_CAPACITY`.
//! Log verbosity follows `RUST_LOG` (default `info`).
//!
//! ## Overload demo
//!
//!     cargo run -p admit-httpd -- --workers 2 --queue 2 --work-ms 200
//!     wrk -t4 -c64 -d10s http://127.0.0.1:8080/

mod http;

use std::net::TcpListener;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use admit_pool::{BoundedWorkerPool, PoolConfig};
use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use crate::http::HttpTask;

static RUNNING: AtomicBool = AtomicBool::new(true);

const ACCEPT_IDLE: Duration = Duration::from_millis(5);
const STATS_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Parser, Debug)]
#[command(
    name = "admit-httpd",
    version,
    about = "HTTP/1.1 demo server with fail-fast admission control"
)]
struct Args {
    /// Address to bind
    #[arg(long, default_value = "127.0.0.1")]
    bind: String,

    /// TCP port
    #[arg(short, long, env = "ADMIT_PORT", default_value_t = 8080)]
    port: u16,

    /// Worker threads (default: ADMIT_WORKERS or CPU count)
    #[arg(short, long)]
    workers: Option<usize>,

    /// Queue capacity beyond busy workers (default: ADMIT_QUEUE_CAPACITY or 64)
    #[arg(short, long)]
    queue: Option<usize>,

    /// Simulated handler latency per request, in milliseconds
    #[arg(long, default_value_t = 0)]
    work_ms: u64,
}

impl Args {
    fn pool_config(&self) -> PoolConfig {
        let mut config = PoolConfig::from_env().thread_name("httpd-worker");
        if let Some(w) = self.workers {
            config = config.workers(w);
        }
        if let Some(q) = self.queue {
            config = config.queue_capacity(q);
        }
        config
    }
}

// ── Accept loop ──

/// Accept connections until a signal clears `RUNNING`, submitting one
/// task per connection. Rejected tasks run right here, on this thread.
fn accept_loop(listener: &TcpListener, pool: &BoundedWorkerPool, work: Duration) {
    while RUNNING.load(Ordering::Relaxed) {
        match listener.accept() {
            Ok((stream, peer)) => {
                if let Err(e) = stream.set_nonblocking(false) {
                    warn!(%peer, error = %e, "dropping connection: cannot switch to blocking");
                    continue;
                }
                pool.submit(HttpTask::new(stream, peer, work));
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                thread::sleep(ACCEPT_IDLE);
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => {
                warn!(error = %e, "accept failed");
                thread::sleep(ACCEPT_IDLE);
            }
        }
    }
}

// ── Stats printer ──

fn stats_loop(pool: Arc<BoundedWorkerPool>) {
    let start = Instant::now();
    let mut last = pool.stats();

    while RUNNING.load(Ordering::Relaxed) {
        thread::sleep(STATS_INTERVAL);
        let now = pool.stats();
        let delta_accepted = now.accepted() - last.accepted();
        let delta_rejected = now.rejected() - last.rejected();
        info!(
            elapsed_s = start.elapsed().as_secs(),
            running = pool.running(),
            queued = pool.queued(),
            accepted_per_s = delta_accepted / STATS_INTERVAL.as_secs(),
            rejected_per_s = delta_rejected / STATS_INTERVAL.as_secs(),
            served = http::SERVED.load(Ordering::Relaxed),
            refused = http::REJECTED.load(Ordering::Relaxed),
            failed = now.failed,
            "stats"
        );
        last = now;
    }
}

// ── Main ──

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    unsafe {
        libc::signal(libc::SIGINT, handle_signal as libc::sighandler_t);
        libc::signal(libc::SIGTERM, handle_signal as libc::sighandler_t);
        libc::signal(libc::SIGPIPE, libc::SIG_IGN);
    }

    let config = args.pool_config();
    config.log();
    let pool = Arc::new(BoundedWorkerPool::new(config).context("failed to start worker pool")?);

    let addr = format!("{}:{}", args.bind, args.port);
    let listener = TcpListener::bind(&addr).with_context(|| format!("failed to bind {}", addr))?;
    listener
        .set_nonblocking(true)
        .context("failed to make listener non-blocking")?;
    info!(%addr, work_ms = args.work_ms, "admit-httpd listening");

    let stats_pool = Arc::clone(&pool);
    let stats = thread::Builder::new()
        .name("httpd-stats".into())
        .spawn(move || stats_loop(stats_pool))
        .context("failed to spawn stats thread")?;

    accept_loop(&listener, &pool, Duration::from_millis(args.work_ms));

    info!("signal received, shutting down");
    drop(listener);
    pool.shutdown();
    let _ = stats.join();

    let final_stats = pool.stats();
    info!(
        submitted = final_stats.submitted,
        dispatched = final_stats.dispatched,
        queued = final_stats.queued,
        rejected = final_stats.rejected(),
        drained = final_stats.drained,
        failed = final_stats.failed,
        "admit-httpd stopped"
    );
    Ok(())
}

extern "C" fn handle_signal(_sig: libc::c_int) {
    RUNNING.store(false, Ordering::Relaxed);
}

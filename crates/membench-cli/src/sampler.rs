//! Rate sampler: every 100 ms, records bytes/sec derived from the
//! process-wide allocation counter.

use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use membench_core::Environment;

const SAMPLE_INTERVAL: Duration = Duration::from_millis(100);

pub struct Sampler {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Sampler {
    /// Spawn a sampler thread writing `"<elapsedSeconds>, <MBps>\n"` lines
    /// to `path` every 100ms until [`Sampler::stop`] is called.
    pub fn start(env: Arc<Environment>, path: &Path) -> std::io::Result<Self> {
        let mut file = File::create(path)?;
        let running = Arc::new(AtomicBool::new(true));
        let thread_running = Arc::clone(&running);

        let handle = thread::spawn(move || {
            let start = Instant::now();
            let mut last_bytes = env.bytes_allocated();
            let mut last_instant = start;

            while thread_running.load(Ordering::Relaxed) {
                thread::sleep(SAMPLE_INTERVAL);
                let now = Instant::now();
                let bytes = env.bytes_allocated();
                let elapsed_secs = now.duration_since(last_instant).as_secs_f64();
                let mbps = if elapsed_secs > 0.0 {
                    (bytes.saturating_sub(last_bytes)) as f64 / 1_048_576.0 / elapsed_secs
                } else {
                    0.0
                };
                last_bytes = bytes;
                last_instant = now;

                let line = format!("{:.2}, {:.2}\n", start.elapsed().as_secs_f64(), mbps);
                if let Err(err) = file.write_all(line.as_bytes()) {
                    tracing::warn!(%err, "sampler I/O error, terminating sampler thread");
                    return;
                }
            }
        });

        Ok(Self {
            running,
            handle: Some(handle),
        })
    }

    pub fn stop(mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::warn!("sampler thread panicked");
            }
        }
    }
}

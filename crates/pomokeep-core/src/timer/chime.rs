//! Completion signal.
//!
//! The engine hands every chime to [`BackgroundChime`], which plays it on a
//! dedicated thread. A slow or failing chime never holds up a state change;
//! its result only reaches the log.

use std::sync::mpsc;
use std::thread::{self, JoinHandle};

use thiserror::Error;

#[derive(Debug, Error)]
#[error("chime failed: {0}")]
pub struct ChimeError(pub String);

pub trait Chime: Send {
    fn play(&self) -> Result<(), ChimeError>;
}

/// Plays nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentChime;

impl Chime for SilentChime {
    fn play(&self) -> Result<(), ChimeError> {
        Ok(())
    }
}

impl<F> Chime for F
where
    F: Fn() -> Result<(), ChimeError> + Send,
{
    fn play(&self) -> Result<(), ChimeError> {
        self()
    }
}

/// Forwards play requests to a worker thread that owns the real chime.
///
/// `play` only queues a request. Dropping waits for queued chimes so a
/// short-lived process still gets to ring.
pub struct BackgroundChime {
    tx: Option<mpsc::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl BackgroundChime {
    pub fn spawn(inner: Box<dyn Chime>) -> Self {
        let (tx, rx) = mpsc::channel::<()>();
        let spawned = thread::Builder::new()
            .name("pomokeep-chime".into())
            .spawn(move || {
                for () in rx {
                    if let Err(e) = inner.play() {
                        tracing::warn!("{e}");
                    }
                }
            });

        match spawned {
            Ok(handle) => Self {
                tx: Some(tx),
                handle: Some(handle),
            },
            Err(e) => {
                tracing::warn!("chime thread did not start; completions will be silent: {e}");
                Self {
                    tx: None,
                    handle: None,
                }
            }
        }
    }
}

impl Chime for BackgroundChime {
    fn play(&self) -> Result<(), ChimeError> {
        let sent = self.tx.as_ref().map(|tx| tx.send(()).is_ok()).unwrap_or(false);
        if sent {
            Ok(())
        } else {
            Err(ChimeError("chime thread is not running".into()))
        }
    }
}

impl Drop for BackgroundChime {
    fn drop(&mut self) {
        self.tx.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::warn!("chime thread panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    #[test]
    fn play_returns_before_the_chime_finishes() {
        let rung = Arc::new(AtomicUsize::new(0));
        let counter = rung.clone();
        let slow = move || -> Result<(), ChimeError> {
            thread::sleep(Duration::from_millis(300));
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        };

        let chime = BackgroundChime::spawn(Box::new(slow));
        let started = Instant::now();
        chime.play().unwrap();
        chime.play().unwrap();
        assert!(started.elapsed() < Duration::from_millis(250));

        drop(chime);
        assert_eq!(rung.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn inner_failures_stay_on_the_worker() {
        let failing = || -> Result<(), ChimeError> { Err(ChimeError("no device".into())) };
        let chime = BackgroundChime::spawn(Box::new(failing));
        assert!(chime.play().is_ok());
    }
}

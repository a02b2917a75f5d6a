//! Async host for [`TimerEngine`].
//!
//! Owns the engine behind a tokio mutex, fans events out over a broadcast
//! channel and drives `tick()` from a spawned interval task while the engine
//! hands out a [`TickToken`].

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use super::engine::{LifecycleEvent, TickToken, TimerEngine, TimerView};
use crate::events::Event;

const EVENT_CAPACITY: usize = 64;

pub struct TimerService {
    engine: Arc<Mutex<TimerEngine>>,
    events: broadcast::Sender<Event>,
    ticker: Mutex<Option<(TickToken, JoinHandle<()>)>>,
    tick_interval: Duration,
}

impl TimerService {
    /// Wrap an engine. A session restored during construction starts
    /// ticking immediately. Must be called from within a tokio runtime.
    pub async fn new(engine: TimerEngine, tick_interval: Duration) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let service = Self {
            engine: Arc::new(Mutex::new(engine)),
            events,
            ticker: Mutex::new(None),
            tick_interval,
        };
        service.reschedule().await;
        service
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    /// Run a command against the engine, publish its event and bring the
    /// ticker in line with the new state.
    pub async fn command<F>(&self, f: F) -> Option<Event>
    where
        F: FnOnce(&mut TimerEngine) -> Option<Event>,
    {
        let event = {
            let mut engine = self.engine.lock().await;
            f(&mut engine)
        };
        if let Some(event) = &event {
            // No subscribers is fine.
            let _ = self.events.send(event.clone());
        }
        self.reschedule().await;
        event
    }

    pub async fn lifecycle(&self, event: LifecycleEvent) -> Option<Event> {
        self.command(|engine| engine.handle_lifecycle(event)).await
    }

    pub async fn view(&self) -> TimerView {
        self.engine.lock().await.view()
    }

    pub async fn query<R>(&self, f: impl FnOnce(&TimerEngine) -> R) -> R {
        let engine = self.engine.lock().await;
        f(&engine)
    }

    /// Stop ticking. The engine state and its snapshot are left as they are.
    pub async fn shutdown(&self) {
        if let Some((_, handle)) = self.ticker.lock().await.take() {
            handle.abort();
        }
    }

    async fn reschedule(&self) {
        let token = self.engine.lock().await.tick_token();
        let mut slot = self.ticker.lock().await;

        if let (Some((current, handle)), Some(wanted)) = (slot.as_ref(), token) {
            if *current == wanted && !handle.is_finished() {
                return;
            }
        }
        if let Some((_, handle)) = slot.take() {
            handle.abort();
        }
        let Some(token) = token else {
            return;
        };

        let engine = self.engine.clone();
        let events = self.events.clone();
        let period = self.tick_interval;
        let handle = tokio::spawn(async move {
            let mut interval = time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick completes immediately.
            interval.tick().await;
            loop {
                interval.tick().await;
                let Some(event) = engine.lock().await.tick(token) else {
                    break;
                };
                let done = event.is_terminal();
                let _ = events.send(event);
                if done {
                    tracing::debug!("ticker finished");
                    break;
                }
            }
        });
        *slot = Some((token, handle));
    }
}

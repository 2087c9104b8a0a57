//! Simulation Clock
//!
//! Drives `Dashboard::tick` on a fixed period from a background tokio task.
//! Each tick runs entirely under the dashboard's write lock, so readers see
//! either the previous generation or the next one. Cancellation is only
//! observed between ticks: `stop()` lets a tick that already began finish,
//! then waits for the task to exit, after which no further tick happens.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::defaults;
use crate::engine::{SharedDashboard, TickEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClockState {
    Stopped,
    Running,
}

struct Running {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

pub struct SimulationClock {
    dashboard: SharedDashboard,
    period: Duration,
    events: broadcast::Sender<TickEvent>,
    running: Option<Running>,
}

impl SimulationClock {
    pub fn new(dashboard: SharedDashboard, period: Duration) -> Self {
        let (events, _) = broadcast::channel(defaults::TICK_EVENT_CHANNEL_CAPACITY);
        Self {
            dashboard,
            period,
            events,
            running: None,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn state(&self) -> ClockState {
        if self.is_running() {
            ClockState::Running
        } else {
            ClockState::Stopped
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Receive a `TickEvent` after every completed tick, scheduled or manual.
    pub fn subscribe(&self) -> broadcast::Receiver<TickEvent> {
        self.events.subscribe()
    }

    /// Sender half, for components that publish on the clock's behalf.
    pub fn events(&self) -> broadcast::Sender<TickEvent> {
        self.events.clone()
    }

    /// Schedule the recurring tick. The first tick fires one period from now.
    ///
    /// Returns `false` if the clock was already running.
    pub fn start(&mut self) -> bool {
        if self.running.is_some() {
            return false;
        }
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run(
            self.dashboard.clone(),
            self.period,
            self.events.clone(),
            cancel.clone(),
        ));
        self.running = Some(Running { cancel, handle });
        info!(period_ms = self.period.as_millis() as u64, "[Clock] Started");
        true
    }

    /// Cancel the recurring tick and wait for the task to finish.
    ///
    /// Returns `false` if the clock was not running.
    pub async fn stop(&mut self) -> bool {
        let Some(Running { cancel, handle }) = self.running.take() else {
            return false;
        };
        cancel.cancel();
        if let Err(e) = handle.await {
            warn!(error = %e, "[Clock] Tick task ended abnormally");
        }
        info!("[Clock] Stopped");
        true
    }

    /// Run one tick immediately, independent of the schedule.
    pub async fn tick_now(&self) -> TickEvent {
        tick_once(&self.dashboard, &self.events).await
    }
}

async fn tick_once(dashboard: &SharedDashboard, events: &broadcast::Sender<TickEvent>) -> TickEvent {
    let event = {
        let mut d = dashboard.write().await;
        d.tick(Utc::now())
    };
    // No subscribers is fine
    let _ = events.send(event.clone());
    event
}

async fn run(
    dashboard: SharedDashboard,
    period: Duration,
    events: broadcast::Sender<TickEvent>,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("[Clock] Cancellation received");
                break;
            }
            _ = interval.tick() => {}
        }
        let event = tick_once(&dashboard, &events).await;
        debug!(generation = event.generation, alerts = event.alerts.len(), "[Clock] Tick");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::presets;
    use crate::engine::{Dashboard, Engine, EngineOptions};
    use crate::simulation::ScriptedRandom;

    fn shared() -> SharedDashboard {
        let engine = Engine::from_config(&presets::wells(), EngineOptions::default(), Utc::now()).unwrap();
        Dashboard::new(vec![engine], Box::new(ScriptedRandom::constant(0.0)))
            .unwrap()
            .into_shared()
    }

    #[tokio::test(start_paused = true)]
    async fn test_clock_ticks_on_period() {
        let dashboard = shared();
        let mut clock = SimulationClock::new(dashboard.clone(), Duration::from_secs(3));
        let mut rx = clock.subscribe();
        assert!(clock.start());
        assert!(!clock.start());

        let event = rx.recv().await.unwrap();
        assert_eq!(event.generation, 1);
        let event = rx.recv().await.unwrap();
        assert_eq!(event.generation, 2);

        assert!(clock.stop().await);
        assert_eq!(clock.state(), ClockState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_ticks_after_stop() {
        let dashboard = shared();
        let mut clock = SimulationClock::new(dashboard.clone(), Duration::from_secs(3));
        clock.start();
        tokio::time::sleep(Duration::from_millis(6_500)).await;
        clock.stop().await;
        let stopped_at = dashboard.read().await.generation();
        assert_eq!(stopped_at, 2);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(dashboard.read().await.generation(), stopped_at);
        assert!(!clock.stop().await);
    }

    #[tokio::test]
    async fn test_stop_waits_for_in_flight_tick() {
        let dashboard = shared();
        let mut clock = SimulationClock::new(dashboard.clone(), Duration::from_millis(10));
        clock.start();

        // Hold the lock so the next scheduled tick blocks mid-flight.
        let guard = dashboard.write().await;
        tokio::time::sleep(Duration::from_millis(30)).await;
        let before = guard.generation();
        let stopping = tokio::spawn(async move {
            clock.stop().await;
        });
        // Let stop() cancel before the blocked tick can proceed.
        tokio::task::yield_now().await;
        drop(guard);
        stopping.await.unwrap();

        let after = dashboard.read().await.generation();
        assert_eq!(after, before + 1, "in-flight tick must complete");
    }

    #[tokio::test]
    async fn test_tick_now_publishes_event() {
        let dashboard = shared();
        let clock = SimulationClock::new(dashboard, Duration::from_secs(3));
        let mut rx = clock.subscribe();
        let event = clock.tick_now().await;
        assert_eq!(event.generation, 1);
        assert_eq!(rx.recv().await.unwrap().generation, 1);
    }
}

#![forbid(unsafe_code)]

//! Timer actor: decouples the inter-packet sleep from the supervisor so a
//! shutdown request can preempt the wait between packets.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{sleep, Instant};

pub(crate) struct ShaperTimer {
    duration: mpsc::Receiver<Duration>,
    timing: mpsc::Sender<Instant>,
}

impl ShaperTimer {
    pub(crate) fn new() -> (Self, mpsc::Sender<Duration>, mpsc::Receiver<Instant>) {
        // Single-slot each way: the supervisor consumes a tick before it
        // requests the next interval, so neither send ever waits.
        let (duration_tx, duration_rx) = mpsc::channel(1);
        let (timing_tx, timing_rx) = mpsc::channel(1);
        let timer = Self { duration: duration_rx, timing: timing_tx };
        (timer, duration_tx, timing_rx)
    }

    pub(crate) async fn run(mut self) {
        // First tick fires immediately so the opening packet needs no arming.
        if self.timing.send(Instant::now()).await.is_err() {
            return;
        }
        while let Some(interval) = self.duration.recv().await {
            sleep(interval).await;
            if self.timing.send(Instant::now()).await.is_err() {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn first_tick_is_immediate() {
        let (timer, _duration, mut timing) = ShaperTimer::new();
        tokio::spawn(timer.run());
        assert!(timing.recv().await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_follow_requested_intervals() {
        let (timer, duration, mut timing) = ShaperTimer::new();
        tokio::spawn(timer.run());

        let first = timing.recv().await.unwrap();
        duration.send(Duration::from_millis(250)).await.unwrap();
        let second = timing.recv().await.unwrap();
        assert!(second - first >= Duration::from_millis(250));
    }

    #[tokio::test(start_paused = true)]
    async fn closing_duration_closes_timing() {
        let (timer, duration, mut timing) = ShaperTimer::new();
        tokio::spawn(timer.run());

        timing.recv().await.unwrap();
        drop(duration);
        assert!(timing.recv().await.is_none());
    }
}

//! Signal-driven shutdown
//!
//! A single flag is set by the signal task and polled by the wait loop.
//! The loop sleeps between polls so an attached, idle daemon uses no CPU.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use anyhow::{Context, Result};
use log::info;
use tokio::{
    signal::unix::{signal, SignalKind},
    time::{interval, MissedTickBehavior},
};

/// Cooperative termination request
#[derive(Debug, Clone, Default)]
pub struct ShutdownFlag(Arc<AtomicBool>);

impl ShutdownFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Set the flag on SIGINT or SIGTERM
    pub fn install_signal_handlers(&self) -> Result<()> {
        let mut interrupt =
            signal(SignalKind::interrupt()).context("Failed to install SIGINT handler")?;
        let mut terminate =
            signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;
        let flag = self.clone();

        tokio::spawn(async move {
            tokio::select! {
                _ = interrupt.recv() => info!("Interrupted, shutting down..."),
                _ = terminate.recv() => info!("Terminated, shutting down..."),
            }
            flag.request();
        });

        Ok(())
    }

    /// Block until shutdown is requested, checking once per `poll`
    pub async fn wait(&self, poll: Duration) {
        let mut ticker = interval(poll);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        while !self.is_requested() {
            ticker.tick().await;
        }
    }
}

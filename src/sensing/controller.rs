use anyhow::{bail, Context, Result};
use log::info;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::loop_worker::{sensing_loop, SensingContext};

/// Owns the lifecycle of one session's sensing loop task: spawn, pause gate,
/// cooperative shutdown.
pub struct SensingController {
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
    pause_tx: Option<watch::Sender<bool>>,
}

impl SensingController {
    pub fn new() -> Self {
        Self {
            handle: None,
            cancel_token: None,
            pause_tx: None,
        }
    }

    pub fn start_sensing(&mut self, ctx: SensingContext) -> Result<()> {
        if self.handle.is_some() {
            bail!("sensing already active");
        }

        let cancel_token = CancellationToken::new();
        let token_clone = cancel_token.clone();

        // Pause channel: false = ticks flow, true = ticks are skipped while
        // fusion state stays frozen.
        let (pause_tx, pause_rx) = watch::channel(false);

        let handle = tokio::spawn(sensing_loop(ctx, token_clone, pause_rx));

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        self.pause_tx = Some(pause_tx);
        Ok(())
    }

    pub fn set_paused(&self, paused: bool) {
        if let Some(tx) = &self.pause_tx {
            let _ = tx.send(paused);
            info!(
                "sensing loop {}",
                if paused { "paused" } else { "resumed" }
            );
        }
    }

    pub async fn stop_sensing(&mut self) -> Result<()> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }
        self.pause_tx = None;

        if let Some(handle) = self.handle.take() {
            handle
                .await
                .context("sensing loop task failed to join")
                .map(|_| ())
        } else {
            Ok(())
        }
    }
}

impl Default for SensingController {
    fn default() -> Self {
        Self::new()
    }
}

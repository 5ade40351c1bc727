// Top-level run: negotiate a connection, then run the mirroring session
use crate::adb::{Bridge, DEFAULT_COMMAND_TIMEOUT};
use crate::connection::{ConnectRequest, Negotiator, Timing};
use crate::error::MirrorResult;
use crate::session::{Mirror, Rotation, RunContext, RunOutcome, SessionRunner};
use log::{info, warn};
use std::future::Future;
use std::time::Duration;

/// Everything a run needs after arguments and config file are merged.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOptions {
    pub request: ConnectRequest,
    pub rotation: Option<Rotation>,
    pub timing: Timing,
    pub command_timeout: Duration,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            request: ConnectRequest::default(),
            rotation: None,
            timing: Timing::default(),
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }
}

pub async fn run<B: Bridge, M: Mirror>(
    bridge: &B,
    mirror: &M,
    options: &RunOptions,
    ctx: &RunContext,
) -> MirrorResult<()> {
    let mut negotiator = Negotiator::new(bridge, options.timing);
    let outcome = negotiator.negotiate(&options.request).await?;
    if outcome.mode_transition_performed {
        info!("📶 Switched {} to wireless mode", outcome.target);
    }
    ctx.record_target(outcome.target.clone());

    SessionRunner::new(bridge, mirror, options.rotation)
        .run(&outcome.target, ctx)
        .await
}

/// Runs until completion or until `shutdown` resolves, whichever comes first.
/// Restoration is left to the finalizer in both cases.
pub async fn run_until<B: Bridge, M: Mirror>(
    bridge: &B,
    mirror: &M,
    options: &RunOptions,
    ctx: &RunContext,
    shutdown: impl Future<Output = ()>,
) -> RunOutcome {
    tokio::select! {
        result = run(bridge, mirror, options, ctx) => result.into(),
        _ = shutdown => RunOutcome::Interrupted,
    }
}

/// Resolves on Ctrl-C, or SIGTERM on unix
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Could not listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Could not listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

// ABOUTME: Loopback capability probe using an ephemeral socat listener container.
// ABOUTME: Races a retrying TCP dial against a timeout and always tears the listener down.

use crate::engine::EngineClient;
use crate::runner::{BoxError, ContainerRunner, Hook, RunnerError};
use crate::types::{ContainerName, ImageRef};
use parking_lot::Mutex;
use snafu::{IntoError, ResultExt, Snafu};
use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinError;

pub const DEFAULT_PROBE_PORT: u16 = 8443;
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

pub const LISTENER_CONTAINER: &str = "test-localhost-bind";
pub const ENUMERATE_CONTAINER: &str = "test-additional-ips";

const TERMINATE_SIGNAL: &str = "TERM";

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ProbeError {
    #[snafu(display("dialing {address} failed after {attempts} attempts: {source}"))]
    Dial {
        address: SocketAddr,
        attempts: u32,
        source: io::Error,
    },

    #[snafu(display(
        "failed to determine the host IP address: no answer within {}s",
        timeout.as_secs()
    ))]
    Timeout { timeout: Duration },

    #[snafu(display("listener container {name:?} stopped before the dial finished: {reason}"))]
    Listener { name: String, reason: String },

    #[snafu(display("cannot set up listener container: {source}"))]
    Setup { source: RunnerError },
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeErrorKind {
    /// The listener ran but loopback could not be dialed.
    Dial,
    /// No dial result arrived in time.
    Timeout,
    /// The listener container exited or failed early.
    Listener,
    /// The listener could not be configured.
    Setup,
}

impl ProbeError {
    pub fn kind(&self) -> ProbeErrorKind {
        match self {
            ProbeError::Dial { .. } => ProbeErrorKind::Dial,
            ProbeError::Timeout { .. } => ProbeErrorKind::Timeout,
            ProbeError::Listener { .. } => ProbeErrorKind::Listener,
            ProbeError::Setup { .. } => ProbeErrorKind::Setup,
        }
    }
}

/// Retry schedule for dialing the listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DialPolicy {
    pub attempt_timeout: Duration,
    pub interval: Duration,
    pub attempts: u32,
}

impl Default for DialPolicy {
    fn default() -> Self {
        Self {
            attempt_timeout: Duration::from_millis(200),
            interval: Duration::from_secs(1),
            attempts: 10,
        }
    }
}

/// Knobs for both helper containers of the network build.
#[derive(Debug, Clone)]
pub struct ProbeSettings {
    pub port: u16,
    pub timeout: Duration,
    pub dial: DialPolicy,
    pub listener_name: String,
    pub enumerate_name: String,
    /// Wait budget for each helper container.
    pub wait_budget: Duration,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            port: DEFAULT_PROBE_PORT,
            timeout: DEFAULT_PROBE_TIMEOUT,
            dial: DialPolicy::default(),
            listener_name: LISTENER_CONTAINER.to_string(),
            enumerate_name: ENUMERATE_CONTAINER.to_string(),
            wait_budget: crate::runner::DEFAULT_WAIT_BUDGET,
        }
    }
}

/// Dial `address` until it accepts a connection, returning the 1-based attempt
/// that succeeded or the last error.
pub async fn wait_for_successful_dial(
    address: SocketAddr,
    policy: &DialPolicy,
) -> Result<u32, io::Error> {
    let mut last_error = io::Error::new(io::ErrorKind::InvalidInput, "no dial attempts configured");

    for attempt in 1..=policy.attempts {
        match tokio::time::timeout(policy.attempt_timeout, TcpStream::connect(address)).await {
            Ok(Ok(_stream)) => return Ok(attempt),
            Ok(Err(e)) => last_error = e,
            Err(_) => {
                last_error = io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("no answer within {}ms", policy.attempt_timeout.as_millis()),
                )
            }
        }
        tracing::trace!(%address, attempt, error = %last_error, "dial failed, trying again");

        if attempt < policy.attempts {
            tokio::time::sleep(policy.interval).await;
        }
    }

    Err(last_error)
}

/// Resolves once `stop` turns true or its sender is gone.
async fn stop_requested(mut stop: watch::Receiver<bool>) {
    let _ = stop.wait_for(|stopped| *stopped).await;
}

enum Race {
    Dialed(Result<u32, io::Error>),
    ListenerDone(Result<Option<RunnerError>, JoinError>),
    TimedOut,
}

/// Decide whether the host can serve on loopback by running a listener on the
/// host network and dialing it.
pub(crate) async fn probe_loopback(
    engine: Arc<dyn EngineClient>,
    image: &ImageRef,
    settings: &ProbeSettings,
    log_dir: Option<PathBuf>,
) -> Result<IpAddr, ProbeError> {
    let name = ContainerName::new(&settings.listener_name).map_err(|e| {
        SetupSnafu.into_error(RunnerError::Configuration(format!("container name: {e}")))
    })?;
    let address = SocketAddr::from((Ipv4Addr::LOCALHOST, settings.port));
    let policy = settings.dial;

    // Raised once the race is decided. A listener started after that point
    // fails its first on-start hook and is killed by the runner.
    let (stop_tx, stop_rx) = watch::channel(false);
    let guard_rx = stop_rx.clone();
    let stop_guard = Hook::custom("listener-still-needed", move |_id| {
        let stopped = *guard_rx.borrow();
        async move {
            if stopped {
                Err::<(), BoxError>("host IP already decided".into())
            } else {
                Ok(())
            }
        }
    });

    let (tx, mut rx) = oneshot::channel();
    let tx = Arc::new(Mutex::new(Some(tx)));
    let dial_hook = Hook::custom("dial-loopback", move |_id| {
        let tx = Arc::clone(&tx);
        let stop = stop_rx.clone();
        async move {
            let result = tokio::select! {
                result = wait_for_successful_dial(address, &policy) => result,
                _ = stop_requested(stop) => return Ok(()),
            };
            let sender = tx.lock().take();
            if let Some(sender) = sender {
                let _ = sender.send(result);
            }
            Ok::<(), BoxError>(())
        }
    });

    let mut builder = ContainerRunner::builder(Arc::clone(&engine))
        .discard()
        .host_network()
        .privileged()
        .entrypoint(["socat"])
        .command([
            format!("TCP-LISTEN:{},crlf,reuseaddr,fork", settings.port),
            "SYSTEM:\"echo 'hello world'\"".to_string(),
        ])
        .on_start(stop_guard)
        .on_start(dial_hook)
        .wait_budget(settings.wait_budget);
    if let Some(dir) = log_dir {
        builder = builder.persist_logs(dir);
    }
    let runner = builder.build().await.context(SetupSnafu)?;

    let listener_image = image.clone();
    let listener_name = name.clone();
    let mut listener = tokio::spawn(async move {
        let outcome = runner.run(&listener_image, &listener_name).await;
        outcome.error().cloned()
    });

    let race = tokio::select! {
        biased;
        dialed = &mut rx => match dialed {
            Ok(result) => Race::Dialed(result),
            // Sender dropped with the runner: the listener is finishing.
            Err(_) => Race::ListenerDone((&mut listener).await),
        },
        finished = &mut listener => Race::ListenerDone(finished),
        _ = tokio::time::sleep(settings.timeout) => Race::TimedOut,
    };

    stop_tx.send_replace(true);
    if let Err(e) = engine.kill_container(name.as_str(), TERMINATE_SIGNAL).await
        && !e.is_not_found()
    {
        tracing::error!(container = %name, error = %e, "killing listener container");
    }
    if !matches!(race, Race::ListenerDone(_)) {
        tracing::debug!(container = %name, "waiting for the listener container to finish");
        match (&mut listener).await {
            Ok(Some(err)) => tracing::debug!(container = %name, error = %err, "listener stopped"),
            Ok(None) => {}
            Err(e) => tracing::warn!(container = %name, error = %e, "listener task failed"),
        }
    }

    match race {
        Race::Dialed(Ok(attempt)) => {
            tracing::debug!(%address, attempt, "using 127.0.0.1 as the host IP");
            Ok(IpAddr::V4(Ipv4Addr::LOCALHOST))
        }
        Race::Dialed(Err(source)) => Err(ProbeError::Dial {
            address,
            attempts: policy.attempts,
            source,
        }),
        Race::ListenerDone(finished) => {
            let reason = match finished {
                Ok(Some(err)) => err.to_string(),
                Ok(None) => "container exited".to_string(),
                Err(e) => e.to_string(),
            };
            ListenerSnafu {
                name: name.to_string(),
                reason,
            }
            .fail()
        }
        Race::TimedOut => TimeoutSnafu {
            timeout: settings.timeout,
        }
        .fail(),
    }
}

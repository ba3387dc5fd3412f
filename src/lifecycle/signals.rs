//! OS signal handling.
//!
//! # Responsibilities
//! - Name the termination signals a run can watch
//! - Register a per-run subscription to those signals
//! - Resolve with whichever watched signal arrives first
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - Registration is synchronous, so a signal delivered after `register`
//!   returns is buffered by Tokio and never missed
//! - Dropping the listener drops the subscription; nothing leaks across runs

use std::fmt;
use std::str::FromStr;

use futures_util::future::select_all;
use serde::{Deserialize, Serialize};

/// A process signal that can trigger shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Signal {
    /// SIGINT (Ctrl+C).
    Interrupt,
    /// SIGTERM.
    Terminate,
    /// SIGHUP.
    Hangup,
    /// SIGQUIT.
    Quit,
    /// SIGUSR1.
    User1,
    /// SIGUSR2.
    User2,
}

impl Signal {
    /// Conventional name, e.g. `SIGTERM`.
    pub fn name(&self) -> &'static str {
        match self {
            Signal::Interrupt => "SIGINT",
            Signal::Terminate => "SIGTERM",
            Signal::Hangup => "SIGHUP",
            Signal::Quit => "SIGQUIT",
            Signal::User1 => "SIGUSR1",
            Signal::User2 => "SIGUSR2",
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error for unrecognized signal names.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown signal: {0}")]
pub struct UnknownSignal(pub String);

impl FromStr for Signal {
    type Err = UnknownSignal;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "interrupt" | "int" | "sigint" => Ok(Signal::Interrupt),
            "terminate" | "term" | "sigterm" => Ok(Signal::Terminate),
            "hangup" | "hup" | "sighup" => Ok(Signal::Hangup),
            "quit" | "sigquit" => Ok(Signal::Quit),
            "user1" | "usr1" | "sigusr1" => Ok(Signal::User1),
            "user2" | "usr2" | "sigusr2" => Ok(Signal::User2),
            _ => Err(UnknownSignal(s.to_string())),
        }
    }
}

impl TryFrom<String> for Signal {
    type Error = UnknownSignal;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Signal> for String {
    fn from(signal: Signal) -> Self {
        signal.name().to_string()
    }
}

/// A registered subscription to a set of signals.
#[derive(Debug)]
pub struct SignalListener {
    watched: Vec<Signal>,
    streams: Vec<(Signal, os::Stream)>,
}

impl SignalListener {
    /// Subscribe to `signals`. Duplicates are ignored.
    ///
    /// On Windows `Interrupt` is Ctrl+C and `Terminate` is a console close or
    /// system shutdown event. The other signals have no console equivalent;
    /// they are accepted and never delivered.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn register(signals: &[Signal]) -> std::io::Result<Self> {
        let mut watched: Vec<Signal> = Vec::with_capacity(signals.len());
        for signal in signals {
            if !watched.contains(signal) {
                watched.push(*signal);
            }
        }

        let mut streams = Vec::with_capacity(watched.len());
        for signal in &watched {
            for stream in os::subscribe(*signal)? {
                streams.push((*signal, stream));
            }
        }
        Ok(Self { watched, streams })
    }

    /// Signals this listener watches.
    pub fn signals(&self) -> Vec<Signal> {
        self.watched.clone()
    }

    /// Wait for the next watched signal. Never resolves if nothing can be delivered.
    pub async fn recv(&mut self) -> Signal {
        if self.streams.is_empty() {
            return std::future::pending().await;
        }
        let waits = self.streams.iter_mut().map(|(signal, stream)| {
            Box::pin(async move {
                if stream.recv().await.is_none() {
                    // Signal driver is gone; this stream will never fire.
                    std::future::pending::<()>().await;
                }
                *signal
            })
        });
        let (signal, _, _) = select_all(waits).await;
        signal
    }
}

#[cfg(unix)]
mod os {
    use tokio::signal::unix::{signal, SignalKind};

    use super::Signal;

    #[derive(Debug)]
    pub(super) struct Stream(tokio::signal::unix::Signal);

    impl Stream {
        pub(super) async fn recv(&mut self) -> Option<()> {
            self.0.recv().await
        }
    }

    pub(super) fn subscribe(watched: Signal) -> std::io::Result<Vec<Stream>> {
        let kind = match watched {
            Signal::Interrupt => SignalKind::interrupt(),
            Signal::Terminate => SignalKind::terminate(),
            Signal::Hangup => SignalKind::hangup(),
            Signal::Quit => SignalKind::quit(),
            Signal::User1 => SignalKind::user_defined1(),
            Signal::User2 => SignalKind::user_defined2(),
        };
        Ok(vec![Stream(signal(kind)?)])
    }
}

#[cfg(windows)]
mod os {
    use tokio::signal::windows;

    use super::Signal;

    #[derive(Debug)]
    pub(super) enum Stream {
        CtrlC(windows::CtrlC),
        CtrlClose(windows::CtrlClose),
        CtrlShutdown(windows::CtrlShutdown),
    }

    impl Stream {
        pub(super) async fn recv(&mut self) -> Option<()> {
            match self {
                Stream::CtrlC(s) => s.recv().await,
                Stream::CtrlClose(s) => s.recv().await,
                Stream::CtrlShutdown(s) => s.recv().await,
            }
        }
    }

    pub(super) fn subscribe(watched: Signal) -> std::io::Result<Vec<Stream>> {
        match watched {
            Signal::Interrupt => Ok(vec![Stream::CtrlC(windows::ctrl_c()?)]),
            Signal::Terminate => Ok(vec![
                Stream::CtrlClose(windows::ctrl_close()?),
                Stream::CtrlShutdown(windows::ctrl_shutdown()?),
            ]),
            Signal::Hangup | Signal::Quit | Signal::User1 | Signal::User2 => Ok(Vec::new()),
        }
    }
}

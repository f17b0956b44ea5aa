use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tokio::sync::watch;

/// The backend currently stepping the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// In-process analytic integrator.
    #[default]
    Light,
    /// Native dynamics engine.
    Native,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Light => f.write_str("Light"),
            Self::Native => f.write_str("Native"),
        }
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "light" => Ok(Self::Light),
            "native" => Ok(Self::Native),
            other => Err(format!("unknown mode '{other}', expected light or native")),
        }
    }
}

/// Native backend lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InitStatus {
    #[default]
    Idle,
    Initializing,
    Ready,
    Failed,
}

impl fmt::Display for InitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Initializing => "initializing",
            Self::Ready => "ready",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// A handle on the in-flight native initialization that any number of
/// callers can await. Awaiting does not apply the result; the router does
/// that at its next step boundary.
#[derive(Debug, Clone)]
pub enum InitObserver {
    Settled(InitStatus),
    Pending(watch::Receiver<InitStatus>),
}

impl InitObserver {
    /// Wait until the attempt settles. A vanished init task counts as failure.
    pub async fn resolved(self) -> InitStatus {
        match self {
            Self::Settled(status) => status,
            Self::Pending(mut rx) => {
                let settled = match rx.wait_for(|s| *s != InitStatus::Initializing).await {
                    Ok(status) => *status,
                    Err(_) => InitStatus::Failed,
                };
                settled
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_parses_case_insensitively() {
        assert_eq!("Native".parse::<Mode>().unwrap(), Mode::Native);
        assert_eq!("light".parse::<Mode>().unwrap(), Mode::Light);
        assert!("turbo".parse::<Mode>().is_err());
    }

    #[test]
    fn mode_display_matches_overlay() {
        assert_eq!(Mode::Light.to_string(), "Light");
        assert_eq!(Mode::Native.to_string(), "Native");
    }

    #[tokio::test]
    async fn observer_waits_for_settlement() {
        let (tx, rx) = watch::channel(InitStatus::Initializing);
        let observer = InitObserver::Pending(rx);
        let a = tokio::spawn(observer.clone().resolved());
        let b = tokio::spawn(observer.resolved());
        tx.send_replace(InitStatus::Ready);
        assert_eq!(a.await.unwrap(), InitStatus::Ready);
        assert_eq!(b.await.unwrap(), InitStatus::Ready);
    }

    #[tokio::test]
    async fn dropped_sender_reads_as_failure() {
        let (tx, rx) = watch::channel(InitStatus::Initializing);
        drop(tx);
        assert_eq!(InitObserver::Pending(rx).resolved().await, InitStatus::Failed);
    }
}

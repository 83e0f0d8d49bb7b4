use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use crate::core::LoaderError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceState {
    Starting,
    Ready,
    Failed(String),
}

/// Startup state of the background streaming service. Waiters park on the
/// channel until the service reports ready or failed, or their timeout runs out.
#[derive(Clone)]
pub struct ServiceGate {
    state: Arc<watch::Sender<ServiceState>>,
}

impl Default for ServiceGate {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceGate {
    pub fn new() -> Self {
        let (sender, _receiver) = watch::channel(ServiceState::Starting);
        Self {
            state: Arc::new(sender),
        }
    }

    /// Only the first report counts.
    fn settle(&self, settled: ServiceState) -> bool {
        self.state.send_if_modified(|state| {
            if *state == ServiceState::Starting {
                *state = settled;
                true
            } else {
                false
            }
        })
    }

    pub fn mark_ready(&self) {
        if self.settle(ServiceState::Ready) {
            log::info!("Streaming service is ready");
        }
    }

    pub fn mark_failed(&self, reason: impl Into<String>) {
        let reason = reason.into();
        log::error!("Streaming service failed to start: {}", reason);
        self.settle(ServiceState::Failed(reason));
    }

    pub fn state(&self) -> ServiceState {
        self.state.borrow().clone()
    }

    pub fn is_ready(&self) -> bool {
        self.state() == ServiceState::Ready
    }

    pub async fn wait_ready(&self, timeout: Duration) -> Result<(), LoaderError> {
        let mut receiver = self.state.subscribe();
        let settled = tokio::time::timeout(timeout, receiver.wait_for(|state| *state != ServiceState::Starting))
            .await
            .ok()
            .and_then(|result| result.ok().map(|state| state.clone()));

        match settled {
            Some(ServiceState::Ready) => Ok(()),
            Some(ServiceState::Failed(reason)) => Err(LoaderError::ServiceFailed(reason)),
            Some(ServiceState::Starting) | None => {
                log::warn!("Streaming service not ready after {:?}", timeout);
                Err(LoaderError::ServiceTimeout(timeout))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn test_wait_returns_once_marked_ready() {
        let gate = ServiceGate::new();
        let service = gate.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            service.mark_ready();
        });

        gate.wait_ready(Duration::from_secs(5)).await.expect("Gate never opened");
        assert!(gate.is_ready());
    }

    #[tokio::test]
    async fn test_wait_on_open_gate_returns_immediately() {
        let gate = ServiceGate::new();
        gate.mark_ready();
        gate.mark_ready();
        assert!(gate.wait_ready(Duration::from_millis(1)).await.is_ok());
    }

    #[tokio::test]
    async fn test_wait_times_out() {
        let gate = ServiceGate::new();
        match gate.wait_ready(Duration::from_millis(30)).await {
            Err(LoaderError::ServiceTimeout(waited)) => assert_eq!(waited, Duration::from_millis(30)),
            other => panic!("Unexpected result: {:?}", other),
        }
        assert!(!gate.is_ready());
    }

    #[tokio::test]
    async fn test_failed_service_ends_wait_early() {
        let gate = ServiceGate::new();
        let service = gate.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            service.mark_failed("Not a directory");
        });

        let started = Instant::now();
        match gate.wait_ready(Duration::from_secs(30)).await {
            Err(LoaderError::ServiceFailed(reason)) => assert_eq!(reason, "Not a directory"),
            other => panic!("Unexpected result: {:?}", other),
        }
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(gate.state(), ServiceState::Failed("Not a directory".to_string()));
    }

    #[tokio::test]
    async fn test_first_report_wins() {
        let gate = ServiceGate::new();
        gate.mark_failed("disk full");
        gate.mark_ready();
        assert!(!gate.is_ready());
        assert!(matches!(gate.wait_ready(Duration::from_millis(1)).await, Err(LoaderError::ServiceFailed(_))));
    }
}

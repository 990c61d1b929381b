//! Readiness gate shared by the sync workers and the quote aggregator

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

use super::SyncError;

#[derive(Debug, Clone, Default)]
struct GateState {
	/// Workers that still owe their first successful cycle
	pending: BTreeSet<String>,
	failed: Option<String>,
}

impl GateState {
	fn settled(&self) -> bool {
		self.pending.is_empty() || self.failed.is_some()
	}
}

/// Opens once every registered worker has completed one cycle.
///
/// A gate with nothing registered is open. Once failed it stays failed.
#[derive(Debug, Clone)]
pub struct ReadinessGate {
	state: Arc<watch::Sender<GateState>>,
}

impl Default for ReadinessGate {
	fn default() -> Self {
		Self::new()
	}
}

impl ReadinessGate {
	pub fn new() -> Self {
		let (state, _) = watch::channel(GateState::default());
		Self {
			state: Arc::new(state),
		}
	}

	pub fn register(&self, key: &str) {
		self.state.send_modify(|state| {
			state.pending.insert(key.to_string());
		});
	}

	/// Record the first completed cycle of `key`. Later calls are no-ops.
	pub fn mark_ready(&self, key: &str) {
		let opened = self.state.send_if_modified(|state| {
			if !state.pending.remove(key) {
				return false;
			}
			state.pending.is_empty()
		});
		if opened {
			info!("All sync workers completed their first cycle, quoting is open");
		}
	}

	pub fn fail(&self, reason: impl Into<String>) {
		let reason = reason.into();
		self.state.send_if_modified(|state| {
			if state.failed.is_some() || state.pending.is_empty() {
				return false;
			}
			warn!("Readiness gate failed: {}", reason);
			state.failed = Some(reason);
			true
		});
	}

	pub fn is_ready(&self) -> bool {
		let state = self.state.borrow();
		state.pending.is_empty() && state.failed.is_none()
	}

	pub fn pending(&self) -> Vec<String> {
		self.state.borrow().pending.iter().cloned().collect()
	}

	/// Wait until the gate opens, fails, or `timeout` elapses
	pub async fn wait(&self, timeout: Duration) -> Result<(), SyncError> {
		let mut rx = self.state.subscribe();
		let settled = tokio::time::timeout(timeout, rx.wait_for(GateState::settled)).await;

		let state = match settled {
			Ok(Ok(state)) => state.clone(),
			// The sender lives in `self`, so the channel cannot close while we wait
			Ok(Err(_)) => self.state.borrow().clone(),
			Err(_) => {
				return Err(SyncError::NotReady {
					reason: format!(
						"sync did not complete within {}ms, still waiting on: {}",
						timeout.as_millis(),
						self.pending().join(", ")
					),
				})
			},
		};

		match state.failed {
			Some(reason) => Err(SyncError::NotReady { reason }),
			None => Ok(()),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn test_empty_gate_is_open() {
		let gate = ReadinessGate::new();
		assert!(gate.is_ready());
		gate.wait(Duration::from_millis(10)).await.unwrap();
	}

	#[tokio::test(start_paused = true)]
	async fn test_waiters_block_until_every_worker_reports() {
		let gate = ReadinessGate::new();
		gate.register("provider:kado");
		gate.register("catalog:tokens");

		let waiter = {
			let gate = gate.clone();
			tokio::spawn(async move { gate.wait(Duration::from_secs(60)).await })
		};

		gate.mark_ready("provider:kado");
		tokio::task::yield_now().await;
		assert!(!waiter.is_finished());

		gate.mark_ready("catalog:tokens");
		waiter.await.unwrap().unwrap();

		// Later callers pass straight through
		gate.mark_ready("catalog:tokens");
		gate.wait(Duration::from_millis(1)).await.unwrap();
	}

	#[tokio::test]
	async fn test_failed_gate_reports_not_ready() {
		let gate = ReadinessGate::new();
		gate.register("provider:transak");
		gate.fail("provider:transak stopped before its first cycle");

		let err = gate.wait(Duration::from_secs(1)).await.unwrap_err();
		assert!(matches!(err, SyncError::NotReady { reason } if reason.contains("transak")));
		assert!(!gate.is_ready());
	}

	#[tokio::test(start_paused = true)]
	async fn test_wait_times_out() {
		let gate = ReadinessGate::new();
		gate.register("provider:kado");

		let err = gate.wait(Duration::from_secs(5)).await.unwrap_err();
		assert!(matches!(err, SyncError::NotReady { reason } if reason.contains("provider:kado")));
	}
}

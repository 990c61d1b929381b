//! Retrying sync workers and their lifecycle

use chrono::Utc;
use onramp_types::CatalogStorage;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::{ReadinessGate, SyncResult, SyncTask};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncWorkerConfig {
	/// Interval between successful cycles
	pub resync_delay: Duration,
	/// Delay before retrying a failed cycle
	pub on_fail_retry: Duration,
}

impl Default for SyncWorkerConfig {
	fn default() -> Self {
		Self {
			resync_delay: Duration::from_secs(60 * 60),
			on_fail_retry: Duration::from_secs(30),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum CycleOutcome {
	Synced,
	/// Someone else synced recently, next attempt after the remaining interval
	Fresh(Duration),
	Failed,
}

/// Runs one [`SyncTask`] forever: every `resync_delay` on success, every `on_fail_retry` on
/// failure, until shut down
pub struct SyncWorker {
	task: Arc<dyn SyncTask>,
	state: Arc<dyn CatalogStorage>,
	gate: ReadinessGate,
	config: SyncWorkerConfig,
}

impl SyncWorker {
	/// Create a worker and register it with `gate`
	pub fn new(
		task: Arc<dyn SyncTask>,
		state: Arc<dyn CatalogStorage>,
		gate: ReadinessGate,
		config: SyncWorkerConfig,
	) -> Self {
		gate.register(&task.key());
		Self {
			task,
			state,
			gate,
			config,
		}
	}

	pub fn key(&self) -> String {
		self.task.key()
	}

	pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
		tokio::spawn(self.run(shutdown))
	}

	pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
		let key = self.key();
		let mut completed_once = false;
		info!(worker = %key, "Sync worker started");

		loop {
			if *shutdown.borrow() {
				break;
			}

			let delay = match self.cycle(&key).await {
				CycleOutcome::Synced => {
					completed_once = true;
					self.gate.mark_ready(&key);
					self.config.resync_delay
				},
				CycleOutcome::Fresh(remaining) => {
					completed_once = true;
					self.gate.mark_ready(&key);
					remaining
				},
				CycleOutcome::Failed => self.config.on_fail_retry,
			};

			tokio::select! {
				_ = tokio::time::sleep(delay) => {},
				changed = shutdown.changed() => {
					if changed.is_err() {
						break;
					}
				},
			}
		}

		if !completed_once {
			self.gate
				.fail(format!("{} stopped before completing its first cycle", key));
		}
		info!(worker = %key, "Sync worker stopped");
	}

	async fn cycle(&self, key: &str) -> CycleOutcome {
		match self.remaining_freshness(key).await {
			Ok(Some(remaining)) => {
				debug!(worker = %key, "Last sync is still fresh, skipping cycle");
				return CycleOutcome::Fresh(remaining);
			},
			Ok(None) => {},
			Err(e) => warn!(worker = %key, "Could not read last sync time: {}", e),
		}

		match self.task.run().await {
			Ok(()) => {
				if let Err(e) = self.state.mark_synced(key, Utc::now()).await {
					warn!(worker = %key, "Could not record sync time: {}", e);
				}
				debug!(worker = %key, "Sync cycle completed");
				CycleOutcome::Synced
			},
			Err(e) => {
				error!(
					worker = %key,
					"Sync cycle failed, retrying in {:?}: {}", self.config.on_fail_retry, e
				);
				CycleOutcome::Failed
			},
		}
	}

	/// Time left before the last recorded sync goes stale, if it is still fresh
	async fn remaining_freshness(&self, key: &str) -> SyncResult<Option<Duration>> {
		let Some(last) = self.state.last_synced(key).await? else {
			return Ok(None);
		};
		let elapsed = (Utc::now() - last).to_std().unwrap_or_default();
		Ok(self.config.resync_delay.checked_sub(elapsed).filter(|d| !d.is_zero()))
	}
}

/// Owns the sync workers and their shared shutdown signal
pub struct SyncManager {
	workers: Vec<SyncWorker>,
	handles: Vec<JoinHandle<()>>,
	shutdown: watch::Sender<bool>,
	gate: ReadinessGate,
}

impl SyncManager {
	pub fn new(gate: ReadinessGate) -> Self {
		let (shutdown, _) = watch::channel(false);
		Self {
			workers: Vec::new(),
			handles: Vec::new(),
			shutdown,
			gate,
		}
	}

	pub fn gate(&self) -> &ReadinessGate {
		&self.gate
	}

	pub fn add_task(
		&mut self,
		task: Arc<dyn SyncTask>,
		state: Arc<dyn CatalogStorage>,
		config: SyncWorkerConfig,
	) {
		self.workers
			.push(SyncWorker::new(task, state, self.gate.clone(), config));
	}

	pub fn worker_count(&self) -> usize {
		self.workers.len() + self.handles.len()
	}

	/// Spawn every worker added so far
	pub fn start(&mut self) {
		for worker in self.workers.drain(..) {
			self.handles.push(worker.spawn(self.shutdown.subscribe()));
		}
		info!("Started {} sync workers", self.handles.len());
	}

	/// Signal shutdown and wait for the workers to exit
	pub async fn shutdown(mut self) {
		self.shutdown.send_replace(true);
		// Workers that never started still owe the gate a cycle
		for worker in self.workers.drain(..) {
			self.gate
				.fail(format!("{} was never started", worker.key()));
		}
		for handle in self.handles.drain(..) {
			if let Err(e) = handle.await {
				error!("Sync worker failed to shut down cleanly: {}", e);
			}
		}
	}
}

//! Per-step view of a route handed to step executors

use onramp_types::{
	Execution, ExecutionError, ExecutionResult, ExecutionSettings, ExecutionStatus, Process,
	ProcessUpdate, ProviderMeta, Route, StepExtended,
};
use tokio::sync::watch;

use super::store::ExecutionStateStore;

/// What a step executor reached before returning control
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
	/// The step is DONE, move on to the next one
	Done,
	/// The step needs the user (closed payment window, background mode) and can be resumed
	Parked,
	/// A stop was requested and observed at a safe point
	Stopped,
}

/// Everything an executor may touch while running one step
#[derive(Clone)]
pub struct StepContext {
	store: ExecutionStateStore,
	route_id: String,
	step_index: usize,
	step_id: String,
	provider: ProviderMeta,
	control: watch::Receiver<ExecutionSettings>,
	dev: bool,
}

impl StepContext {
	pub fn new(
		store: ExecutionStateStore,
		route: &Route,
		step_index: usize,
		control: watch::Receiver<ExecutionSettings>,
		dev: bool,
	) -> ExecutionResult<Self> {
		let step = route
			.steps
			.get(step_index)
			.ok_or_else(|| ExecutionError::InvalidStep {
				step_id: onramp_types::step_id(&route.id, step_index),
				reason: "step index out of range".to_string(),
			})?;
		Ok(Self {
			store,
			route_id: route.id.clone(),
			step_index,
			step_id: step.id.clone(),
			provider: route.provider.clone(),
			control,
			dev,
		})
	}

	pub fn route_id(&self) -> &str {
		&self.route_id
	}

	pub fn step_id(&self) -> &str {
		&self.step_id
	}

	pub fn provider(&self) -> &ProviderMeta {
		&self.provider
	}

	/// Use provider sandboxes
	pub fn dev(&self) -> bool {
		self.dev
	}

	pub fn route(&self) -> ExecutionResult<Route> {
		self.store
			.get_route(&self.route_id)
			.ok_or_else(|| ExecutionError::Evicted {
				route_id: self.route_id.clone(),
			})
	}

	pub fn step(&self) -> ExecutionResult<StepExtended> {
		let route = self.route()?;
		route
			.steps
			.into_iter()
			.nth(self.step_index)
			.ok_or_else(|| ExecutionError::InvalidStep {
				step_id: self.step_id.clone(),
				reason: "step disappeared from route".to_string(),
			})
	}

	pub fn settings(&self) -> ExecutionSettings {
		*self.control.borrow()
	}

	pub fn allow_execution(&self) -> bool {
		self.settings().allow_execution
	}

	pub fn execute_in_background(&self) -> bool {
		self.settings().execute_in_background
	}

	/// A fresh receiver for waiting on settings changes
	pub fn control(&self) -> watch::Receiver<ExecutionSettings> {
		self.control.clone()
	}

	/// Merge `update` into this step's process log
	pub fn update_process(&self, update: ProcessUpdate) -> ExecutionResult<Process> {
		let mut process = None;
		let step_index = self.step_index;
		self.store.update_route(&self.route_id, |route| {
			if let Some(step) = route.steps.get_mut(step_index) {
				let execution = step.execution.get_or_insert_with(Execution::default);
				process = Some(execution.apply(update).clone());
			}
		})?;
		process.ok_or_else(|| ExecutionError::InvalidStep {
			step_id: self.step_id.clone(),
			reason: "step disappeared from route".to_string(),
		})
	}

	pub fn set_status(&self, status: ExecutionStatus) -> ExecutionResult<()> {
		let step_index = self.step_index;
		self.store.update_route(&self.route_id, |route| {
			if let Some(step) = route.steps.get_mut(step_index) {
				step.execution.get_or_insert_with(Execution::default).status = status;
			}
		})?;
		Ok(())
	}

	/// Record a failed process and mark the step FAILED
	pub fn fail(&self, update: ProcessUpdate) -> ExecutionResult<()> {
		self.update_process(update)?;
		self.set_status(ExecutionStatus::Failed)
	}
}

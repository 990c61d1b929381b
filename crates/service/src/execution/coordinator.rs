//! Route execution coordinator
//!
//! Drives routes step by step through the registered executors. At most one execution runs per
//! route id: a second `execute_route` for an id in flight joins the first one's handle.

use futures::FutureExt;
use onramp_types::{
	Executable, ExecutionError, ExecutionResult, ExecutionSettings, ExecutionStatus, Route,
	RouteStatus, StepKind, SwapExecutionService,
};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::context::{StepContext, StepOutcome};
use super::executors::ExecutorRegistry;
use super::store::{ExecutionHandle, ExecutionStateStore, Registration, UpdateHook};

/// Caller overrides applied when a route enters the store
#[derive(Clone, Default)]
pub struct ExecutionOverrides {
	pub execute_in_background: Option<bool>,
	pub update_hook: Option<UpdateHook>,
}

impl ExecutionOverrides {
	pub fn in_background(mut self, execute_in_background: bool) -> Self {
		self.execute_in_background = Some(execute_in_background);
		self
	}

	pub fn with_update_hook<F>(mut self, hook: F) -> Self
	where
		F: Fn(Route) + Send + Sync + 'static,
	{
		self.update_hook = Some(Arc::new(hook));
		self
	}

	/// Deliver route snapshots over a channel instead of a callback
	pub fn with_update_channel(self) -> (Self, mpsc::UnboundedReceiver<Route>) {
		let (sender, receiver) = mpsc::unbounded_channel();
		let overrides = self.with_update_hook(move |route| {
			// A receiver that went away just stops listening
			let _ = sender.send(route);
		});
		(overrides, receiver)
	}

	fn settings(&self) -> ExecutionSettings {
		let defaults = ExecutionSettings::default();
		ExecutionSettings {
			allow_execution: true,
			execute_in_background: self
				.execute_in_background
				.unwrap_or(defaults.execute_in_background),
		}
	}
}

#[derive(Clone)]
pub struct ExecutionCoordinator {
	store: ExecutionStateStore,
	executors: Arc<ExecutorRegistry>,
	swap_service: Option<Arc<dyn SwapExecutionService>>,
	dev: bool,
}

impl ExecutionCoordinator {
	pub fn new(store: ExecutionStateStore, executors: Arc<ExecutorRegistry>) -> Self {
		Self {
			store,
			executors,
			swap_service: None,
			dev: false,
		}
	}

	/// Service that in-flight swaps are reported to when background mode changes
	pub fn with_swap_service(mut self, swap_service: Arc<dyn SwapExecutionService>) -> Self {
		self.swap_service = Some(swap_service);
		self
	}

	/// Look orders up in provider sandboxes
	pub fn with_dev(mut self, dev: bool) -> Self {
		self.dev = dev;
		self
	}

	pub fn store(&self) -> &ExecutionStateStore {
		&self.store
	}

	/// Execute a quote or route until it is DONE or HALTED.
	///
	/// The route is registered before this returns, so a second call for the same id joins the
	/// first one's handle even if neither handle has been polled yet. Joining a route already in
	/// flight returns its outcome, `overrides` are ignored then. Must be called within a Tokio
	/// runtime.
	pub fn execute_route(
		&self,
		executable: impl Into<Executable>,
		overrides: ExecutionOverrides,
	) -> ExecutionHandle {
		self.start(executable.into(), overrides)
	}

	/// Pick up a HALTED route, or join it if it is still in flight
	pub fn resume_route_execution(
		&self,
		mut route: Route,
		overrides: ExecutionOverrides,
	) -> ExecutionHandle {
		if let Some(handle) = self.store.handle(&route.id) {
			debug!(route_id = %route.id, "Route already in flight, joining");
			return handle;
		}

		info!(route_id = %route.id, "Resuming route execution");
		route.prune_failed_steps();
		route.status = RouteStatus::Running;
		self.execute_route(route, overrides)
	}

	/// Ask a route to halt at its next safe point
	pub fn stop_route_execution(&self, route_id: &str) -> ExecutionResult<()> {
		self.store
			.update_settings(route_id, |settings| settings.allow_execution = false)?;
		self.store
			.update_route(route_id, |route| route.status = RouteStatus::Halting)?;
		info!(route_id = %route_id, "Stop requested");
		Ok(())
	}

	/// Toggle background mode, including for a swap currently running inside the route
	pub async fn update_route_execution(
		&self,
		route_id: &str,
		execute_in_background: bool,
	) -> ExecutionResult<()> {
		self.store.update_settings(route_id, |settings| {
			settings.execute_in_background = execute_in_background
		})?;

		let Some(route) = self.store.get_route(route_id) else {
			return Ok(());
		};
		let active_swap = route.steps.iter().find(|step| {
			step.kind() == StepKind::TokenSwap
				&& matches!(
					step.status(),
					Some(ExecutionStatus::Pending) | Some(ExecutionStatus::ActionRequired)
				)
		});

		if let (Some(step), Some(service)) = (active_swap, &self.swap_service) {
			service
				.update_execution(&step.id, execute_in_background)
				.await
				.map_err(|e| ExecutionError::Swap {
					step_id: step.id.clone(),
					message: e.to_string(),
				})?;
		}
		Ok(())
	}

	pub fn get_active_route(&self, route_id: &str) -> Option<Route> {
		self.store.get_route(route_id)
	}

	pub fn active_route_ids(&self) -> Vec<String> {
		self.store.route_ids()
	}

	fn start(&self, executable: Executable, overrides: ExecutionOverrides) -> ExecutionHandle {
		let route = match executable {
			Executable::Quote(quote) => Route::from_quote(Uuid::new_v4().to_string(), quote),
			Executable::Route(route) => route,
		};
		let route_id = route.id.clone();
		let settings = overrides.settings();

		let registration = self
			.store
			.register(route, settings, overrides.update_hook, |control| {
				let coordinator = self.clone();
				let route_id = route_id.clone();
				async move { coordinator.run(route_id, control).await }
					.boxed()
					.shared()
			});

		match registration {
			Registration::Joined(handle) => {
				debug!(route_id = %route_id, "Joining in-flight execution");
				handle
			},
			Registration::Registered(handle) => {
				// Driven by the runtime so the route finishes even if every caller goes away
				tokio::spawn(handle.clone());
				handle
			},
		}
	}

	async fn run(
		self,
		route_id: String,
		control: watch::Receiver<ExecutionSettings>,
	) -> ExecutionResult<Route> {
		let route = self.snapshot(&route_id)?;
		info!(
			route_id = %route_id,
			provider = %route.provider.key,
			"Executing route with {} steps",
			route.steps.len()
		);

		for index in 0..route.steps.len() {
			if !self.allow_execution(&route_id) {
				return self.halt(&route_id);
			}

			let route = self.snapshot(&route_id)?;
			let step = &route.steps[index];
			if step.is_done() {
				debug!(route_id = %route_id, step_id = %step.id, "Step already done, skipping");
				continue;
			}
			let route = if step.status() == Some(ExecutionStatus::Failed) {
				debug!(route_id = %route_id, step_id = %step.id, "Retrying failed step");
				self.store.update_route(&route_id, |route| {
					if let Some(execution) = route.steps[index].execution.as_mut() {
						execution.prune_unfinished();
						execution.status = ExecutionStatus::Pending;
					}
				})?
			} else {
				route
			};

			let step = &route.steps[index];
			let executor = match self.executors.resolve(&route.provider.key, step.kind()) {
				Ok(executor) => executor,
				Err(e) => return self.abort(&route_id, e),
			};
			let ctx = StepContext::new(self.store.clone(), &route, index, control.clone(), self.dev)?;

			match executor.execute(&ctx).await {
				Ok(StepOutcome::Done) => {
					debug!(route_id = %route_id, step_id = %ctx.step_id(), "Step done");
				},
				Ok(outcome) => {
					debug!(route_id = %route_id, step_id = %ctx.step_id(), "Step returned {:?}", outcome);
					return self.halt(&route_id);
				},
				Err(e) => return self.abort(&route_id, e),
			}

			if !self.allow_execution(&route_id) {
				return self.halt(&route_id);
			}
		}

		let route = self
			.store
			.update_route(&route_id, |route| route.status = RouteStatus::Done)?;
		self.store.remove(&route_id);
		info!(route_id = %route_id, "Route execution done");
		Ok(route)
	}

	fn snapshot(&self, route_id: &str) -> ExecutionResult<Route> {
		self.store
			.get_route(route_id)
			.ok_or_else(|| ExecutionError::Evicted {
				route_id: route_id.to_string(),
			})
	}

	fn allow_execution(&self, route_id: &str) -> bool {
		self.store
			.settings(route_id)
			.map_or(false, |settings| settings.allow_execution)
	}

	fn halt(&self, route_id: &str) -> ExecutionResult<Route> {
		let route = self
			.store
			.update_route(route_id, |route| route.status = RouteStatus::Halted)?;
		self.store.remove(route_id);
		info!(route_id = %route_id, "Route execution halted");
		Ok(route)
	}

	fn abort(&self, route_id: &str, e: ExecutionError) -> ExecutionResult<Route> {
		error!(route_id = %route_id, "Route execution failed: {}", e);
		if let Err(update_error) = self
			.store
			.update_route(route_id, |route| route.status = RouteStatus::Halted)
		{
			warn!(route_id = %route_id, "Could not mark failed route halted: {}", update_error);
		}
		self.store.remove(route_id);
		Err(e)
	}
}

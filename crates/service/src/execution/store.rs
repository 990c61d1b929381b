//! In-flight route state
//!
//! The store is the single source of truth for routes being executed. Reads hand out owned
//! copies and writes replace the stored route, so no caller ever shares a working copy with
//! another. Every route mutation is reported to the route's update hook.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::{BoxFuture, Shared};
use onramp_types::{ExecutionError, ExecutionResult, ExecutionSettings, Route};
use std::sync::Arc;
use tokio::sync::watch;

/// Observer receiving a snapshot of the route after every mutation
pub type UpdateHook = Arc<dyn Fn(Route) + Send + Sync>;

/// Completion handle shared by every caller joined on one execution
pub type ExecutionHandle = Shared<BoxFuture<'static, ExecutionResult<Route>>>;

struct ActiveRoute {
	route: Route,
	settings: watch::Sender<ExecutionSettings>,
	update_hook: Option<UpdateHook>,
	handle: ExecutionHandle,
}

/// Outcome of [`ExecutionStateStore::register`]
pub enum Registration {
	/// The route was already in flight
	Joined(ExecutionHandle),
	/// The route was stored, its handle still has to be driven
	Registered(ExecutionHandle),
}

#[derive(Clone, Default)]
pub struct ExecutionStateStore {
	routes: Arc<DashMap<String, ActiveRoute>>,
}

impl ExecutionStateStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Store `route` unless its id is already in flight.
	///
	/// `start` builds the execution future from the route's settings receiver. It runs while the
	/// entry is locked, so it must only construct the future, never poll it.
	pub fn register<F>(
		&self,
		route: Route,
		settings: ExecutionSettings,
		update_hook: Option<UpdateHook>,
		start: F,
	) -> Registration
	where
		F: FnOnce(watch::Receiver<ExecutionSettings>) -> ExecutionHandle,
	{
		match self.routes.entry(route.id.clone()) {
			Entry::Occupied(entry) => Registration::Joined(entry.get().handle.clone()),
			Entry::Vacant(entry) => {
				let (settings, control) = watch::channel(settings);
				let handle = start(control);
				entry.insert(ActiveRoute {
					route,
					settings,
					update_hook,
					handle: handle.clone(),
				});
				Registration::Registered(handle)
			},
		}
	}

	pub fn contains(&self, route_id: &str) -> bool {
		self.routes.contains_key(route_id)
	}

	pub fn get_route(&self, route_id: &str) -> Option<Route> {
		self.routes.get(route_id).map(|active| active.route.clone())
	}

	pub fn handle(&self, route_id: &str) -> Option<ExecutionHandle> {
		self.routes.get(route_id).map(|active| active.handle.clone())
	}

	pub fn settings(&self, route_id: &str) -> Option<ExecutionSettings> {
		self.routes
			.get(route_id)
			.map(|active| *active.settings.borrow())
	}

	pub fn subscribe(&self, route_id: &str) -> Option<watch::Receiver<ExecutionSettings>> {
		self.routes
			.get(route_id)
			.map(|active| active.settings.subscribe())
	}

	pub fn route_ids(&self) -> Vec<String> {
		self.routes.iter().map(|entry| entry.key().clone()).collect()
	}

	pub fn len(&self) -> usize {
		self.routes.len()
	}

	pub fn is_empty(&self) -> bool {
		self.routes.is_empty()
	}

	/// Apply `mutate` to a copy of the route, store it and notify the hook
	pub fn update_route<F>(&self, route_id: &str, mutate: F) -> ExecutionResult<Route>
	where
		F: FnOnce(&mut Route),
	{
		let (snapshot, hook) = {
			let mut active = self
				.routes
				.get_mut(route_id)
				.ok_or_else(|| ExecutionError::RouteNotFound {
					route_id: route_id.to_string(),
				})?;
			let mut route = active.route.clone();
			mutate(&mut route);
			active.route = route.clone();
			(route, active.update_hook.clone())
		};

		// The shard lock is released before the hook runs so it may read the store
		if let Some(hook) = hook {
			hook(snapshot.clone());
		}
		Ok(snapshot)
	}

	/// Modify the route's execution settings and wake everything watching them
	pub fn update_settings<F>(&self, route_id: &str, modify: F) -> ExecutionResult<ExecutionSettings>
	where
		F: FnOnce(&mut ExecutionSettings),
	{
		let active = self
			.routes
			.get(route_id)
			.ok_or_else(|| ExecutionError::RouteNotFound {
				route_id: route_id.to_string(),
			})?;
		active.settings.send_modify(modify);
		let settings = *active.settings.borrow();
		Ok(settings)
	}

	pub fn remove(&self, route_id: &str) -> Option<Route> {
		self.routes.remove(route_id).map(|(_, active)| active.route)
	}
}

//! # Routing Table
//!
//! Binds message types to processor types through named routes. Each route
//! carries the queue the processor consumes from and the routing key its
//! message type is published under.
//!
//! ## Rules
//!
//! - Both endpoints must be registered in the [`TypeCatalog`].
//! - A command type has at most one route; a second one is refused.
//! - An event type may have any number of routes (one per listener).
//! - Route names are unique.
//!
//! Lookups return the first match in insertion order and are cached per key.

use crate::catalog::TypeCatalog;
use crate::naming::{queue_name, routing_key};
use crate::processor::ProcessorKind;
use crate::registration::{Provider, Resolver, Subject};
use courier_types::{BusError, BusResult, MessageKind};
use parking_lot::RwLock;
use rand::RngCore;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

/// Random bytes behind a generated route name (hex-encoded, so 10 characters).
const ROUTE_NAME_BYTES: usize = 5;

/// A binding of one message type to one processor type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    queue_name: String,
    routing_key: String,
    processor_type: String,
    message_type: String,
    route_name: String,
}

impl Route {
    /// Build a route, deriving its queue name and routing key from the types.
    /// A random name is generated when `route_name` is `None`.
    #[must_use]
    pub fn create(message_type: &str, processor_type: &str, route_name: Option<&str>) -> Self {
        let route_name = match route_name {
            Some(name) => name.to_string(),
            None => random_route_name(),
        };
        Self {
            queue_name: queue_name(processor_type),
            routing_key: routing_key(message_type),
            processor_type: processor_type.to_string(),
            message_type: message_type.to_string(),
            route_name,
        }
    }

    #[must_use]
    pub fn queue_name(&self) -> &str {
        &self.queue_name
    }

    #[must_use]
    pub fn routing_key(&self) -> &str {
        &self.routing_key
    }

    #[must_use]
    pub fn processor_type(&self) -> &str {
        &self.processor_type
    }

    #[must_use]
    pub fn message_type(&self) -> &str {
        &self.message_type
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.route_name
    }
}

fn random_route_name() -> String {
    let mut bytes = [0u8; ROUTE_NAME_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Lookup {
    QueueName,
    RoutingKey,
    ProcessorType,
    MessageType,
    Name,
}

impl Lookup {
    fn matches(self, route: &Route, key: &str) -> bool {
        match self {
            Self::QueueName => route.queue_name == key,
            Self::RoutingKey => route.routing_key == key,
            Self::ProcessorType => route.processor_type == key,
            Self::MessageType => route.message_type == key,
            Self::Name => route.route_name == key,
        }
    }
}

/// Ordered route collection plus the set of routable message types.
#[derive(Debug, Default)]
pub struct RouteTable {
    catalog: TypeCatalog,
    routes: Vec<Route>,
    routable: HashSet<String>,
    cache: RwLock<HashMap<(Lookup, String), usize>>,
}

impl RouteTable {
    #[must_use]
    pub fn new(catalog: TypeCatalog) -> Self {
        Self {
            catalog,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn catalog(&self) -> &TypeCatalog {
        &self.catalog
    }

    pub fn catalog_mut(&mut self) -> &mut TypeCatalog {
        &mut self.catalog
    }

    /// Register a route from `message_type` to `processor_type`.
    ///
    /// # Errors
    ///
    /// `BusError::Configuration` when either type is unknown to the catalog,
    /// when the kinds do not pair up (command/handler, event/listener), when a
    /// command already has a route, when the route name is taken, or when the
    /// same event/listener pair is registered twice.
    pub fn add_route(
        &mut self,
        message_type: &str,
        processor_type: &str,
        route_name: Option<&str>,
    ) -> BusResult<&Route> {
        let message_kind = self.catalog.message_kind(message_type).ok_or_else(|| {
            BusError::Configuration(format!(
                "message type \"{message_type}\" is not registered"
            ))
        })?;
        let processor_kind = self.catalog.processor_kind(processor_type).ok_or_else(|| {
            BusError::Configuration(format!(
                "processor type \"{processor_type}\" is not registered"
            ))
        })?;
        check_pairing(message_type, message_kind, processor_type, processor_kind)?;

        if message_kind == MessageKind::Command {
            if let Some(existing) = self.routes.iter().find(|r| r.message_type == message_type) {
                return Err(BusError::Configuration(format!(
                    "command \"{message_type}\" is already handled by \"{}\"",
                    existing.processor_type
                )));
            }
        } else if self
            .routes
            .iter()
            .any(|r| r.message_type == message_type && r.processor_type == processor_type)
        {
            return Err(BusError::Configuration(format!(
                "\"{processor_type}\" already listens to \"{message_type}\""
            )));
        }

        if let Some(name) = route_name {
            if self.routes.iter().any(|r| r.route_name == name) {
                return Err(BusError::Configuration(format!(
                    "route name \"{name}\" is already in use"
                )));
            }
        }

        let mut route = Route::create(message_type, processor_type, route_name);
        while route_name.is_none() && self.routes.iter().any(|r| r.route_name == route.route_name) {
            route.route_name = random_route_name();
        }

        info!(
            route = %route.route_name,
            message_type,
            processor_type,
            queue = %route.queue_name,
            "Route registered"
        );

        self.routable.insert(message_type.to_string());
        self.routes.push(route);
        let index = self.routes.len() - 1;
        Ok(&self.routes[index])
    }

    /// Register every processor the provider lists, with the subjects the
    /// resolver reports for it. Message and processor types are added to the
    /// catalog on the way.
    ///
    /// # Errors
    ///
    /// Resolver failures and every [`RouteTable::add_route`] error.
    pub fn populate(&mut self, provider: &dyn Provider, resolver: &dyn Resolver) -> BusResult<usize> {
        let mut added = 0;
        for processor_type in provider.processor_types() {
            let subjects = resolver.resolve(&processor_type)?;
            let Some(first) = subjects.first() else {
                debug!(processor_type = %processor_type, "Processor has no subjects");
                continue;
            };

            let processor_kind = match self.catalog.processor_kind(&processor_type) {
                Some(kind) => kind,
                None => processor_kind_for(first.kind),
            };
            self.catalog.register_processor(&processor_type, processor_kind)?;

            for Subject {
                message_type, kind, ..
            } in &subjects
            {
                self.catalog.register_message(message_type, *kind)?;
                self.add_route(message_type, &processor_type, None)?;
                added += 1;
            }
        }
        Ok(added)
    }

    #[must_use]
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Every route of a message type, in insertion order.
    pub fn routes_for_message<'a>(&'a self, message_type: &'a str) -> impl Iterator<Item = &'a Route> {
        self.routes.iter().filter(move |r| r.message_type == message_type)
    }

    /// Route matching both the queue and the message type, else the first
    /// route of the message type.
    ///
    /// # Errors
    ///
    /// `BusError::RouteNotFound` when the message type has no route at all.
    pub fn find_route(&self, queue_name: &str, message_type: &str) -> BusResult<&Route> {
        self.routes
            .iter()
            .find(|r| r.queue_name == queue_name && r.message_type == message_type)
            .map_or_else(|| self.find_route_by_message_type(message_type), Ok)
    }

    /// # Errors
    ///
    /// `BusError::RouteNotFound` on a miss.
    pub fn find_route_by_queue_name(&self, queue_name: &str) -> BusResult<&Route> {
        self.find_by(Lookup::QueueName, queue_name)
    }

    /// # Errors
    ///
    /// `BusError::RouteNotFound` on a miss.
    pub fn find_route_by_routing_key(&self, routing_key: &str) -> BusResult<&Route> {
        self.find_by(Lookup::RoutingKey, routing_key)
    }

    /// # Errors
    ///
    /// `BusError::RouteNotFound` on a miss.
    pub fn find_route_by_processor_type(&self, processor_type: &str) -> BusResult<&Route> {
        self.find_by(Lookup::ProcessorType, processor_type)
    }

    /// # Errors
    ///
    /// `BusError::RouteNotFound` on a miss.
    pub fn find_route_by_message_type(&self, message_type: &str) -> BusResult<&Route> {
        self.find_by(Lookup::MessageType, message_type)
    }

    /// # Errors
    ///
    /// `BusError::RouteNotFound` on a miss.
    pub fn find_route_by_name(&self, route_name: &str) -> BusResult<&Route> {
        self.find_by(Lookup::Name, route_name)
    }

    /// Whether at least one route exists for the message type.
    #[must_use]
    pub fn is_routable(&self, message_type: &str) -> bool {
        self.routable.contains(message_type)
    }

    /// Distinct queue names in declaration order.
    #[must_use]
    pub fn queue_names(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.routes
            .iter()
            .map(Route::queue_name)
            .filter(|queue| seen.insert(*queue))
            .collect()
    }

    fn find_by(&self, lookup: Lookup, key: &str) -> BusResult<&Route> {
        let cache_key = (lookup, key.to_string());
        if let Some(&index) = self.cache.read().get(&cache_key) {
            return Ok(&self.routes[index]);
        }

        let index = self
            .routes
            .iter()
            .position(|route| lookup.matches(route, key))
            .ok_or_else(|| BusError::RouteNotFound {
                key: key.to_string(),
            })?;
        self.cache.write().insert(cache_key, index);
        Ok(&self.routes[index])
    }
}

fn processor_kind_for(kind: MessageKind) -> ProcessorKind {
    match kind {
        MessageKind::Command => ProcessorKind::Handler,
        MessageKind::Event => ProcessorKind::Listener,
    }
}

fn check_pairing(
    message_type: &str,
    message_kind: MessageKind,
    processor_type: &str,
    processor_kind: ProcessorKind,
) -> BusResult<()> {
    if processor_kind_for(message_kind) == processor_kind {
        return Ok(());
    }
    Err(BusError::Configuration(format!(
        "{processor_kind} \"{processor_type}\" cannot process {message_kind} \"{message_type}\""
    )))
}

//! # Bus
//!
//! Pairs a routing table with a transport. Producers and consumers borrow
//! the bus; binding the routes makes every route's queue receive what is
//! published under its routing key.

use crate::router::RouteTable;
use crate::transport::Transport;
use courier_types::BusResult;
use tracing::info;

#[derive(Debug)]
pub struct Bus<T: Transport> {
    router: RouteTable,
    transport: T,
}

impl<T: Transport> Bus<T> {
    #[must_use]
    pub fn new(router: RouteTable, transport: T) -> Self {
        Self { router, transport }
    }

    #[must_use]
    pub fn router(&self) -> &RouteTable {
        &self.router
    }

    pub fn router_mut(&mut self) -> &mut RouteTable {
        &mut self.router
    }

    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Initialise the transport and bind every route's queue to its
    /// routing key. Returns the number of routes bound.
    ///
    /// # Errors
    ///
    /// `BusError::Transport` from the backend.
    pub fn bind_routes(&self) -> BusResult<usize> {
        self.transport.init()?;
        for route in self.router.routes() {
            self.transport
                .bind_queue(route.queue_name(), route.routing_key())?;
        }
        let bound = self.router.routes().len();
        info!(routes = bound, "Routes bound");
        Ok(bound)
    }

    /// # Errors
    ///
    /// `BusError::Transport` from the backend.
    pub fn unbind_routes(&self) -> BusResult<usize> {
        self.transport.init()?;
        for route in self.router.routes() {
            self.transport
                .unbind_queue(route.queue_name(), route.routing_key())?;
        }
        let unbound = self.router.routes().len();
        info!(routes = unbound, "Routes unbound");
        Ok(unbound)
    }
}

//! # Middleware
//!
//! Envelope transformers wrapped around the transport call. A chain built
//! from `[A, B, C]` runs as:
//!
//! ```text
//! A ─► B ─► C ─► terminal
//! ```
//!
//! Each middleware gets the envelope and a [`Next`] continuation. Passing the
//! envelope to `next` hands it down the chain; dropping `next` short-circuits
//! and the terminal is never reached.

pub mod envelope;
pub mod signature;
pub mod unique;

pub use envelope::{
    CorrelationIdMiddleware, EnvelopeIdMiddleware, EnvelopeTimestampMiddleware,
    PersistentDeliveryMiddleware,
};
pub use signature::{SignatureVerificationMiddleware, SignedEnvelopeMiddleware};
pub use unique::UniqueEnvelopeMiddleware;

use courier_types::Envelope;
use std::fmt;

pub trait Middleware {
    fn handle(&self, envelope: Envelope, next: Next<'_>);
}

/// Continuation into the rest of a middleware chain. Usable at most once.
pub struct Next<'a> {
    rest: &'a [Box<dyn Middleware>],
    terminal: &'a mut Option<Envelope>,
}

impl Next<'_> {
    pub fn run(self, envelope: Envelope) {
        match self.rest.split_first() {
            Some((middleware, rest)) => middleware.handle(
                envelope,
                Next {
                    rest,
                    terminal: self.terminal,
                },
            ),
            None => *self.terminal = Some(envelope),
        }
    }
}

struct FnMiddleware<F>(F);

impl<F> Middleware for FnMiddleware<F>
where
    F: Fn(Envelope, Next<'_>),
{
    fn handle(&self, envelope: Envelope, next: Next<'_>) {
        (self.0)(envelope, next);
    }
}

/// Ordered middleware stack. Added first runs first.
#[derive(Default)]
pub struct MiddlewareChain {
    middleware: Vec<Box<dyn Middleware>>,
}

impl MiddlewareChain {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, middleware: impl Middleware + 'static) -> &mut Self {
        self.middleware.push(Box::new(middleware));
        self
    }

    pub fn add_fn<F>(&mut self, middleware: F) -> &mut Self
    where
        F: Fn(Envelope, Next<'_>) + 'static,
    {
        self.add(FnMiddleware(middleware))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.middleware.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.middleware.is_empty()
    }

    /// Run the envelope through the chain. `None` when a middleware
    /// short-circuited.
    #[must_use]
    pub fn run(&self, envelope: Envelope) -> Option<Envelope> {
        let mut terminal = None;
        Next {
            rest: &self.middleware,
            terminal: &mut terminal,
        }
        .run(envelope);
        terminal
    }
}

impl fmt::Debug for MiddlewareChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewareChain")
            .field("len", &self.middleware.len())
            .finish()
    }
}

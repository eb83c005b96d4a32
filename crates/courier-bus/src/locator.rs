//! # Locators
//!
//! Look up the processor instance registered for a processor type.

use crate::processor::Processor;
use std::collections::HashMap;

/// Resolve processor instances by processor type name.
pub trait Locator {
    /// `None` when nothing is registered for `processor_type`.
    fn instance_for(&self, processor_type: &str) -> Option<Processor>;
}

/// Locator backed by a map of ready-made instances.
#[derive(Debug, Default, Clone)]
pub struct InMemoryLocator {
    instances: HashMap<String, Processor>,
}

impl InMemoryLocator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the instance for `processor_type`.
    pub fn add_instance(&mut self, processor_type: impl Into<String>, processor: Processor) -> &mut Self {
        self.instances.insert(processor_type.into(), processor);
        self
    }

    /// Builder form of [`InMemoryLocator::add_instance`].
    #[must_use]
    pub fn with_instance(mut self, processor_type: impl Into<String>, processor: Processor) -> Self {
        self.add_instance(processor_type, processor);
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

impl Locator for InMemoryLocator {
    fn instance_for(&self, processor_type: &str) -> Option<Processor> {
        self.instances.get(processor_type).cloned()
    }
}

type Factory = Box<dyn Fn() -> Processor>;

/// Locator that builds a fresh instance on every lookup.
#[derive(Default)]
pub struct FactoryLocator {
    factories: HashMap<String, Factory>,
}

impl FactoryLocator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_factory<F>(&mut self, processor_type: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn() -> Processor + 'static,
    {
        self.factories.insert(processor_type.into(), Box::new(factory));
        self
    }
}

impl Locator for FactoryLocator {
    fn instance_for(&self, processor_type: &str) -> Option<Processor> {
        self.factories.get(processor_type).map(|factory| factory())
    }
}

//! # Static Registration
//!
//! Processor-to-message bindings computed ahead of time and fed to
//! [`RouteTable::populate`](crate::router::RouteTable::populate).
//!
//! A [`Provider`] lists processor types; a [`Resolver`] tells which messages a
//! processor takes and through which method name.

use crate::naming::{lower_first, short_name, upper_first};
use courier_types::{BusError, BusResult, MessageKind};
use std::collections::{HashMap, HashSet};

/// One message a processor subscribes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    pub message_type: String,
    pub kind: MessageKind,
    pub method_name: String,
}

impl Subject {
    #[must_use]
    pub fn new(message_type: impl Into<String>, kind: MessageKind, method_name: impl Into<String>) -> Self {
        Self {
            message_type: message_type.into(),
            kind,
            method_name: method_name.into(),
        }
    }
}

pub trait Provider {
    fn processor_types(&self) -> Vec<String>;
}

pub trait Resolver {
    /// # Errors
    ///
    /// `BusError::Configuration` when the processor type is unknown.
    fn resolve(&self, processor_type: &str) -> BusResult<Vec<Subject>>;
}

/// Provider over an explicit list of processor types.
#[derive(Debug, Default, Clone)]
pub struct ArrayProvider {
    processor_types: Vec<String>,
}

impl ArrayProvider {
    /// # Errors
    ///
    /// `BusError::Configuration` when a processor type is listed twice.
    pub fn new<I, S>(processor_types: I) -> BusResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let mut list = Vec::new();
        for processor_type in processor_types {
            let processor_type = processor_type.into();
            if !seen.insert(processor_type.clone()) {
                return Err(BusError::Configuration(format!(
                    "processor \"{processor_type}\" is listed more than once"
                )));
            }
            list.push(processor_type);
        }
        Ok(Self {
            processor_types: list,
        })
    }
}

impl Provider for ArrayProvider {
    fn processor_types(&self) -> Vec<String> {
        self.processor_types.clone()
    }
}

/// Resolver over a map filled at startup.
///
/// Method names default to `handle<Message>` for handlers and to the
/// lower-first message name for listeners.
#[derive(Debug, Default, Clone)]
pub struct StaticResolver {
    subjects: HashMap<String, Vec<Subject>>,
}

impl StaticResolver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_handler(&mut self, processor_type: &str, command_type: &str) -> &mut Self {
        let method = format!("handle{}", upper_first(short_name(command_type)));
        self.add_subject(processor_type, Subject::new(command_type, MessageKind::Command, method))
    }

    pub fn add_listener(&mut self, processor_type: &str, event_type: &str) -> &mut Self {
        let method = lower_first(short_name(event_type));
        self.add_subject(processor_type, Subject::new(event_type, MessageKind::Event, method))
    }

    pub fn add_subject(&mut self, processor_type: &str, subject: Subject) -> &mut Self {
        self.subjects
            .entry(processor_type.to_string())
            .or_default()
            .push(subject);
        self
    }
}

impl Resolver for StaticResolver {
    fn resolve(&self, processor_type: &str) -> BusResult<Vec<Subject>> {
        self.subjects.get(processor_type).cloned().ok_or_else(|| {
            BusError::Configuration(format!(
                "no subjects registered for processor \"{processor_type}\""
            ))
        })
    }
}

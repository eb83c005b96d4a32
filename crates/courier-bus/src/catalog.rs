//! # Type Catalog
//!
//! Registry of the message and processor type names known to the bus. The
//! router refuses routes whose endpoints are missing here, and the consumer
//! uses it to classify a received message type.

use crate::processor::ProcessorKind;
use courier_types::{BusError, BusResult, Message, MessageKind};
use std::collections::HashMap;

/// What a registered type name refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeEntry {
    Message(MessageKind),
    Processor(ProcessorKind),
}

#[derive(Debug, Default, Clone)]
pub struct TypeCatalog {
    entries: HashMap<String, TypeEntry>,
}

impl TypeCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a message type name.
    ///
    /// # Errors
    ///
    /// `BusError::Configuration` if the name is already registered with a
    /// different meaning.
    pub fn register_message(&mut self, type_name: &str, kind: MessageKind) -> BusResult<()> {
        self.register(type_name, TypeEntry::Message(kind))
    }

    /// Register a typed message.
    ///
    /// # Errors
    ///
    /// See [`TypeCatalog::register_message`].
    pub fn register_message_type<M: Message>(&mut self) -> BusResult<()> {
        self.register_message(M::TYPE_NAME, M::KIND)
    }

    /// Register a processor type name.
    ///
    /// # Errors
    ///
    /// `BusError::Configuration` if the name is already registered with a
    /// different meaning.
    pub fn register_processor(&mut self, type_name: &str, kind: ProcessorKind) -> BusResult<()> {
        self.register(type_name, TypeEntry::Processor(kind))
    }

    #[must_use]
    pub fn lookup(&self, type_name: &str) -> Option<TypeEntry> {
        self.entries.get(type_name).copied()
    }

    #[must_use]
    pub fn message_kind(&self, type_name: &str) -> Option<MessageKind> {
        match self.lookup(type_name)? {
            TypeEntry::Message(kind) => Some(kind),
            TypeEntry::Processor(_) => None,
        }
    }

    #[must_use]
    pub fn processor_kind(&self, type_name: &str) -> Option<ProcessorKind> {
        match self.lookup(type_name)? {
            TypeEntry::Processor(kind) => Some(kind),
            TypeEntry::Message(_) => None,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn register(&mut self, type_name: &str, entry: TypeEntry) -> BusResult<()> {
        if type_name.is_empty() {
            return Err(BusError::Configuration("type name must not be empty".into()));
        }
        match self.entries.get(type_name) {
            Some(existing) if *existing != entry => Err(BusError::Configuration(format!(
                "type \"{type_name}\" is already registered as {existing:?}"
            ))),
            Some(_) => Ok(()),
            None => {
                self.entries.insert(type_name.to_string(), entry);
                Ok(())
            }
        }
    }
}

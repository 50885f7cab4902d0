//! Push-style access to evaluation contexts.
//!
//! The engine never inspects a caller's context type directly. Instead, the context is asked to
//! report its attributes to a supplied [`AttributeSink`], which keeps the engine agnostic to
//! concrete context shapes (a request, a session, a plain map).

use crate::{AttributeValue, Attributes};

/// Receiver of attribute name/value pairs.
pub trait AttributeSink {
    /// Called once per attribute the context exposes.
    fn receive(&mut self, name: &str, value: AttributeValue);
}

/// An opaque source of named attribute values for one evaluation.
pub trait AttributeContext {
    /// Report every attribute to `sink`.
    fn populate(&self, sink: &mut dyn AttributeSink);
}

impl AttributeSink for Attributes {
    fn receive(&mut self, name: &str, value: AttributeValue) {
        self.insert(name.to_owned(), value);
    }
}

impl AttributeContext for Attributes {
    fn populate(&self, sink: &mut dyn AttributeSink) {
        for (name, value) in self {
            sink.receive(name, value.clone());
        }
    }
}

/// Drain a context into a plain attribute map for one evaluation pass.
pub(crate) fn collect_attributes(context: &dyn AttributeContext) -> Attributes {
    let mut attributes = Attributes::new();
    context.populate(&mut attributes);
    attributes
}

//! Static descriptions of methods and parameters, supplied by the host at
//! registration time. These stand in for the runtime reflection a managed
//! host would otherwise use to inspect a call site.
use std::fmt;

/// Identifies a candidate method: the declaring type's fully-qualified name,
/// the method name, and the parameter type sequence (used, along with the
/// name, to resolve an interface method to a concrete implementation).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MethodDescriptor {
    pub declaring_type: String,
    pub method_name: String,
    pub param_type_names: Vec<String>,
    pub is_interface: bool,
    /// `true` for non-static, publicly observable, non-constructor,
    /// non-property-accessor methods not declared on the root object type.
    /// Set by the host registration layer; consulted by the cache's
    /// eligibility filter.
    pub is_interceptable_shape: bool,
}

impl MethodDescriptor {
    pub fn new(
        declaring_type: impl Into<String>,
        method_name: impl Into<String>,
        param_type_names: Vec<String>,
    ) -> Self {
        MethodDescriptor {
            declaring_type: declaring_type.into(),
            method_name: method_name.into(),
            param_type_names,
            is_interface: false,
            is_interceptable_shape: true,
        }
    }

    pub fn interface(mut self) -> Self {
        self.is_interface = true;
        self
    }

    pub fn not_interceptable_shape(mut self) -> Self {
        self.is_interceptable_shape = false;
        self
    }

    /// The `(name, param types)` signature used to match an interface
    /// method against a concrete implementation's method of the same shape.
    pub fn signature(&self) -> (&str, &[String]) {
        (&self.method_name, &self.param_type_names)
    }
}

impl fmt::Display for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.declaring_type, self.method_name)
    }
}

/// Describes a single parameter, passed to the [`crate::redact::Redactor`]
/// alongside its value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParameterDescriptor {
    pub name: Option<String>,
    pub type_name: Option<String>,
    pub index: usize,
}

impl ParameterDescriptor {
    pub fn name_or_fallback(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| crate::entry::Param::fallback_name(self.index))
    }
}

//! What is being fuzzed: parameter types, an optional receiver, constants
//! mined from the target, and the per-request scope.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// The signature under test plus hints for value providers.
#[derive(Debug, Clone)]
pub struct Description<T> {
    parameters: Vec<T>,
    receiver: Option<T>,
    constants: Vec<Constant>,
    scope: Option<Scope>,
}

impl<T: Clone> Description<T> {
    pub fn new(parameters: Vec<T>) -> Self {
        Self {
            parameters,
            receiver: None,
            constants: Vec::new(),
            scope: None,
        }
    }

    pub fn with_receiver(mut self, receiver: T) -> Self {
        self.receiver = Some(receiver);
        self
    }

    pub fn with_constants(mut self, constants: Vec<Constant>) -> Self {
        self.constants = constants;
        self
    }

    pub fn parameters(&self) -> &[T] {
        &self.parameters
    }

    pub fn receiver(&self) -> Option<&T> {
        self.receiver.as_ref()
    }

    pub fn constants(&self) -> &[Constant] {
        &self.constants
    }

    pub fn scope(&self) -> Option<&Scope> {
        self.scope.as_ref()
    }

    /// The receiver, if any, followed by the parameters.
    pub fn all_types(&self) -> Vec<T> {
        self.receiver
            .iter()
            .chain(self.parameters.iter())
            .cloned()
            .collect()
    }

    /// A copy of this description that carries `scope`.
    pub fn with_scope(&self, scope: Scope) -> Self {
        Self {
            scope: Some(scope),
            ..self.clone()
        }
    }
}

/// A literal observed in the target, with how it was used.
#[derive(Debug, Clone, PartialEq)]
pub struct Constant {
    pub value: ConstantValue,
    pub context: ConstantContext,
}

impl Constant {
    pub fn new(value: ConstantValue, context: ConstantContext) -> Self {
        Self { value, context }
    }

    pub fn int(width: u32, value: i128) -> Self {
        Self::new(ConstantValue::Int { width, value }, ConstantContext::Plain)
    }

    pub fn i32(value: i32) -> Self {
        Self::int(32, value as i128)
    }

    pub fn i64(value: i64) -> Self {
        Self::int(64, value as i128)
    }

    pub fn float(value: f64) -> Self {
        Self::new(ConstantValue::Float(value), ConstantContext::Plain)
    }

    pub fn string(value: &str) -> Self {
        Self::new(ConstantValue::Str(value.to_string()), ConstantContext::Plain)
    }

    /// A string the target uses as a regular expression.
    pub fn pattern(value: &str) -> Self {
        Self::new(ConstantValue::Str(value.to_string()), ConstantContext::Pattern)
    }

    pub fn compared(self, comparison: Comparison) -> Self {
        Self {
            context: ConstantContext::Compared(comparison),
            ..self
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConstantValue {
    Bool(bool),
    Int { width: u32, value: i128 },
    Float(f64),
    Str(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstantContext {
    Plain,
    /// The constant is the right-hand side of a comparison.
    Compared(Comparison),
    Pattern,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparison {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// Typed key for a value stored in a [`Scope`].
pub struct ScopeProperty<V> {
    name: &'static str,
    _value: PhantomData<fn() -> V>,
}

impl<V> ScopeProperty<V> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _value: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// Per-request context handed to providers.
///
/// Providers add properties in `enrich`; a non-empty scope makes the driver
/// regenerate seeds for that request instead of using its per-type cache.
#[derive(Clone, Default)]
pub struct Scope {
    parameter_index: Option<usize>,
    recursion_depth: usize,
    properties: HashMap<&'static str, Arc<dyn Any + Send + Sync>>,
}

impl Scope {
    pub fn new(parameter_index: Option<usize>, recursion_depth: usize) -> Self {
        Self {
            parameter_index,
            recursion_depth,
            properties: HashMap::new(),
        }
    }

    /// Index of the top-level parameter being produced, if any.
    pub fn parameter_index(&self) -> Option<usize> {
        self.parameter_index
    }

    pub fn recursion_depth(&self) -> usize {
        self.recursion_depth
    }

    pub fn put<V: Any + Send + Sync>(&mut self, property: &ScopeProperty<V>, value: V) {
        self.properties.insert(property.name, Arc::new(value));
    }

    pub fn get<V: Any + Send + Sync>(&self, property: &ScopeProperty<V>) -> Option<&V> {
        self.properties
            .get(property.name)
            .and_then(|v| v.downcast_ref::<V>())
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&&str> = self.properties.keys().collect();
        keys.sort();
        f.debug_struct("Scope")
            .field("parameter_index", &self.parameter_index)
            .field("recursion_depth", &self.recursion_depth)
            .field("properties", &keys)
            .finish()
    }
}

//! Registered value types with single-inheritance fallback.
//!
//! A type registration describes how to identify, compare, render, and
//! serialize one class of runtime values. Operations left unset are
//! copied down from the base chain at registration time, so dispatch
//! never walks the chain at call time. The chain is rooted at the
//! built-in `any` descriptor: identify everything, compare by identity,
//! render raw text, project structurally to JSON.

use crate::errors::{EngineError, EngineResult};
use crate::output::Document;
use crate::value::Value;
use std::rc::Rc;

/// Decides whether a descriptor applies to a runtime value.
pub type IdentifyFn = Rc<dyn Fn(&Value) -> bool>;

/// Compares two values, recursing through the supplied comparator.
pub type EqualFn = Rc<
    dyn Fn(
        &Value,
        &Value,
        &mut dyn FnMut(&Value, &Value) -> EngineResult<bool>,
    ) -> EngineResult<bool>,
>;

/// Renders a value into a document, recursing through the callback.
pub type InspectFn =
    Rc<dyn Fn(Document, &Value, &mut dyn FnMut(Document, &Value) -> Document, usize) -> Document>;

/// Projects a value to JSON, recursing through the callback.
pub type ToJsonFn =
    Rc<dyn Fn(&Value, &mut dyn FnMut(&Value) -> serde_json::Value) -> serde_json::Value>;

/// A type registration before flattening.
///
/// Built with chained setters; unset operations are inherited from the
/// base (or the built-in `any` descriptor when no base is named).
pub struct TypeDef {
    name: String,
    base: Option<String>,
    identify: Option<IdentifyFn>,
    equal: Option<EqualFn>,
    inspect: Option<InspectFn>,
    to_json: Option<ToJsonFn>,
}

impl TypeDef {
    pub fn new(name: impl Into<String>) -> Self {
        TypeDef {
            name: name.into(),
            base: None,
            identify: None,
            equal: None,
            inspect: None,
            to_json: None,
        }
    }

    /// Inherit unset operations from the named base type.
    pub fn base(mut self, name: impl Into<String>) -> Self {
        self.base = Some(name.into());
        self
    }

    pub fn identify(mut self, f: impl Fn(&Value) -> bool + 'static) -> Self {
        self.identify = Some(Rc::new(f));
        self
    }

    pub fn equal(
        mut self,
        f: impl Fn(&Value, &Value, &mut dyn FnMut(&Value, &Value) -> EngineResult<bool>) -> EngineResult<bool>
            + 'static,
    ) -> Self {
        self.equal = Some(Rc::new(f));
        self
    }

    pub fn inspect(
        mut self,
        f: impl Fn(Document, &Value, &mut dyn FnMut(Document, &Value) -> Document, usize) -> Document
            + 'static,
    ) -> Self {
        self.inspect = Some(Rc::new(f));
        self
    }

    pub fn to_json(
        mut self,
        f: impl Fn(&Value, &mut dyn FnMut(&Value) -> serde_json::Value) -> serde_json::Value + 'static,
    ) -> Self {
        self.to_json = Some(Rc::new(f));
        self
    }
}

/// A registered descriptor with every operation resolved.
#[derive(Clone)]
pub struct ResolvedType {
    pub name: String,
    base_ref: Option<Rc<ResolvedType>>,
    pub(crate) identify: IdentifyFn,
    pub(crate) equal: EqualFn,
    pub(crate) inspect: InspectFn,
    pub(crate) to_json: ToJsonFn,
}

impl ResolvedType {
    /// The descriptor this one inherited from, if any.
    pub fn base(&self) -> Option<&ResolvedType> {
        self.base_ref.as_deref()
    }

    /// Whether this descriptor applies to `value`.
    pub fn identifies(&self, value: &Value) -> bool {
        (self.identify)(value)
    }
}

impl std::fmt::Debug for ResolvedType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedType")
            .field("name", &self.name)
            .field("base", &self.base_ref.as_ref().map(|base| &base.name))
            .finish()
    }
}

fn any_type() -> ResolvedType {
    ResolvedType {
        name: "any".to_string(),
        base_ref: None,
        identify: Rc::new(|_| true),
        equal: Rc::new(|a, b, _| Ok(Value::same(a, b))),
        inspect: Rc::new(default_inspect),
        to_json: Rc::new(default_to_json),
    }
}

/// Raw text for scalars; sequences and records render structurally
/// through the nested callback (which owns cycle and depth guards).
fn default_inspect(
    out: Document,
    value: &Value,
    nested: &mut dyn FnMut(Document, &Value) -> Document,
    _depth: usize,
) -> Document {
    match value {
        Value::Sequence(items) => {
            let mut out = out.text("[");
            let items = items.borrow();
            for (idx, item) in items.iter().enumerate() {
                if idx > 0 {
                    out = out.text(", ");
                }
                out = nested(out, item);
            }
            out.text("]")
        }
        Value::Record(fields) => {
            let fields = fields.borrow();
            if fields.is_empty() {
                return out.text("{}");
            }
            let mut out = out.text("{ ");
            for (idx, (key, item)) in fields.iter().enumerate() {
                if idx > 0 {
                    out = out.text(", ");
                }
                out = out.text(key.as_str()).text(": ");
                out = nested(out, item);
            }
            out.text(" }")
        }
        scalar => out.text(scalar.raw_text()),
    }
}

/// Scalars map to JSON scalars; sequences element-wise, records
/// value-wise under sorted keys so output is deterministic no matter
/// the insertion order.
fn default_to_json(
    value: &Value,
    nested: &mut dyn FnMut(&Value) -> serde_json::Value,
) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Number(n) => json_number(*n),
        Value::Text(s) => serde_json::Value::String(s.clone()),
        Value::Sequence(items) => serde_json::Value::Array(
            items.borrow().iter().map(|item| nested(item)).collect(),
        ),
        Value::Record(fields) => {
            let fields = fields.borrow();
            let mut sorted: Vec<(&String, &Value)> =
                fields.iter().map(|(key, item)| (key, item)).collect();
            sorted.sort_by(|a, b| a.0.cmp(b.0));
            serde_json::Value::Object(
                sorted
                    .into_iter()
                    .map(|(key, item)| (key.clone(), nested(item)))
                    .collect(),
            )
        }
    }
}

fn json_number(n: f64) -> serde_json::Value {
    if n.is_finite() && n.fract() == 0.0 && n >= i64::MIN as f64 && n <= i64::MAX as f64 {
        serde_json::Value::Number(serde_json::Number::from(n as i64))
    } else {
        serde_json::Number::from_f64(n)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null)
    }
}

/// Registered descriptors, most recent first, rooted at `any`.
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    types: Vec<Rc<ResolvedType>>,
    any: Rc<ResolvedType>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        TypeRegistry {
            types: Vec::new(),
            any: Rc::new(any_type()),
        }
    }

    /// Register a descriptor, copying unset operations down from its
    /// base chain. Later registrations shadow earlier ones for values
    /// both identify.
    pub fn add(&mut self, def: TypeDef) -> EngineResult<()> {
        let TypeDef {
            name,
            base,
            identify,
            equal,
            inspect,
            to_json,
        } = def;
        let base = match base {
            Some(base_name) => match self.get(&base_name) {
                Some(found) => found,
                None => return Err(EngineError::UnknownBaseType { name: base_name }),
            },
            None => self.any.clone(),
        };
        let resolved = ResolvedType {
            name,
            identify: identify.unwrap_or_else(|| base.identify.clone()),
            equal: equal.unwrap_or_else(|| base.equal.clone()),
            inspect: inspect.unwrap_or_else(|| base.inspect.clone()),
            to_json: to_json.unwrap_or_else(|| base.to_json.clone()),
            base_ref: Some(base),
        };
        self.types.insert(0, Rc::new(resolved));
        Ok(())
    }

    /// Find a registered descriptor by name.
    pub fn get(&self, name: &str) -> Option<Rc<ResolvedType>> {
        self.types.iter().find(|ty| ty.name == name).cloned()
    }

    /// First registered descriptor identifying `value`, else `any`.
    pub fn resolve(&self, value: &Value) -> Rc<ResolvedType> {
        self.types
            .iter()
            .find(|ty| (ty.identify)(value))
            .cloned()
            .unwrap_or_else(|| self.any.clone())
    }

    /// First registered descriptor identifying both operands, else
    /// `any`. Values claimed only by unrelated types fall through to
    /// the root identity comparison, so they are equal only when
    /// identical.
    pub fn common(&self, a: &Value, b: &Value) -> Rc<ResolvedType> {
        self.types
            .iter()
            .find(|ty| (ty.identify)(a) && (ty.identify)(b))
            .cloned()
            .unwrap_or_else(|| self.any.clone())
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        TypeRegistry::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputFormat;

    #[test]
    fn test_resolve_falls_back_to_any() {
        let registry = TypeRegistry::new();
        let descriptor = registry.resolve(&Value::from(42));
        assert_eq!(descriptor.name, "any");
        assert!(descriptor.base().is_none());
    }

    #[test]
    fn test_later_registration_shadows() {
        let mut registry = TypeRegistry::new();
        registry
            .add(TypeDef::new("first").identify(|v| v.is_number()))
            .unwrap();
        registry
            .add(TypeDef::new("second").identify(|v| v.is_number()))
            .unwrap();
        assert_eq!(registry.resolve(&Value::from(1)).name, "second");
    }

    #[test]
    fn test_unknown_base_rejected() {
        let mut registry = TypeRegistry::new();
        let result = registry.add(TypeDef::new("derived").base("missing"));
        assert!(matches!(
            result,
            Err(EngineError::UnknownBaseType { name }) if name == "missing"
        ));
    }

    #[test]
    fn test_base_operations_flattened() {
        let mut registry = TypeRegistry::new();
        registry
            .add(
                TypeDef::new("quoted")
                    .identify(|v| v.is_text())
                    .inspect(|out, v, _, _| out.text(format!("'{}'", v.raw_text()))),
            )
            .unwrap();
        // Derived type overrides identify only; inspect comes from the base.
        registry
            .add(
                TypeDef::new("word")
                    .base("quoted")
                    .identify(|v| matches!(v, Value::Text(s) if !s.contains(' '))),
            )
            .unwrap();

        let word = registry.resolve(&Value::from("hi"));
        assert_eq!(word.name, "word");
        assert_eq!(word.base().map(|b| b.name.as_str()), Some("quoted"));
        let doc = (word.inspect)(
            crate::output::Document::new(),
            &Value::from("hi"),
            &mut |out, _| out,
            3,
        );
        assert_eq!(doc.render(OutputFormat::Text), "'hi'");
    }

    #[test]
    fn test_common_requires_both_operands() {
        let mut registry = TypeRegistry::new();
        registry
            .add(TypeDef::new("number").identify(|v| v.is_number()))
            .unwrap();
        assert_eq!(
            registry.common(&Value::from(1), &Value::from(2)).name,
            "number"
        );
        assert_eq!(
            registry.common(&Value::from(1), &Value::from("x")).name,
            "any"
        );
    }

    #[test]
    fn test_get_by_name() {
        let mut registry = TypeRegistry::new();
        registry
            .add(TypeDef::new("number").identify(|v| v.is_number()))
            .unwrap();
        assert!(registry.get("number").is_some());
        assert!(registry.get("missing").is_none());
    }
}

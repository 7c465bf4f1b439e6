use super::coerce::CoerceError;
use crate::value::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Typed setter generated for one tagged field.
pub type Setter<T> = fn(&mut T, &Value) -> Result<(), CoerceError>;

/// Typed getter generated for one tagged field.
pub type Getter<T> = fn(&T) -> Result<Value, CoerceError>;

/// One `(namespace, key)` → field association of a record type.
pub struct FieldBinding<T> {
    field: &'static str,
    namespace: &'static str,
    key: &'static str,
    set: Setter<T>,
    get: Getter<T>,
}

impl<T> FieldBinding<T> {
    /// Create a binding. Normally emitted by `#[derive(Bind)]`.
    pub const fn new(
        field: &'static str,
        namespace: &'static str,
        key: &'static str,
        set: Setter<T>,
        get: Getter<T>,
    ) -> Self {
        Self {
            field,
            namespace,
            key,
            set,
            get,
        }
    }

    /// Rust field name
    #[must_use]
    pub fn field(&self) -> &'static str {
        self.field
    }

    /// Namespace the tag belongs to (`query`, `json`, ...)
    #[must_use]
    pub fn namespace(&self) -> &'static str {
        self.namespace
    }

    /// Lookup key passed to the source
    #[must_use]
    pub fn key(&self) -> &'static str {
        self.key
    }

    pub(crate) fn set(&self, target: &mut T, value: &Value) -> Result<(), CoerceError> {
        (self.set)(target, value)
    }

    pub(crate) fn get(&self, source: &T) -> Result<Value, CoerceError> {
        (self.get)(source)
    }
}

impl<T> fmt::Debug for FieldBinding<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldBinding")
            .field("field", &self.field)
            .field("namespace", &self.namespace)
            .field("key", &self.key)
            .finish()
    }
}

/// Compiled binding table of a record type.
///
/// Built once per type (see [`Bind::descriptor`]) and indexed by namespace
/// so resolution never scans bindings of other sources.
pub struct Descriptor<T> {
    bindings: Vec<FieldBinding<T>>,
    by_namespace: BTreeMap<&'static str, Vec<usize>>,
}

impl<T> Descriptor<T> {
    /// Index a list of bindings.
    #[must_use]
    pub fn new(bindings: Vec<FieldBinding<T>>) -> Self {
        let mut by_namespace: BTreeMap<&'static str, Vec<usize>> = BTreeMap::new();
        for (idx, binding) in bindings.iter().enumerate() {
            by_namespace.entry(binding.namespace).or_default().push(idx);
        }
        Self {
            bindings,
            by_namespace,
        }
    }

    /// Bindings tagged for `namespace`, in field declaration order.
    pub fn bindings_in<'a>(&'a self, namespace: &str) -> impl Iterator<Item = &'a FieldBinding<T>> + 'a {
        self.by_namespace
            .get(namespace)
            .into_iter()
            .flatten()
            .map(move |&idx| &self.bindings[idx])
    }

    /// Every binding of the type.
    #[must_use]
    pub fn bindings(&self) -> &[FieldBinding<T>] {
        &self.bindings
    }

    /// Namespaces the type has at least one binding in.
    pub fn namespaces(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.by_namespace.keys().copied()
    }
}

impl<T> fmt::Debug for Descriptor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Descriptor")
            .field("bindings", &self.bindings)
            .finish()
    }
}

/// Record types that can be filled from (and written to) namespaced sources.
///
/// Implement with `#[derive(Bind)]`:
///
/// ```rust
/// use fieldbind::Bind;
///
/// #[derive(Bind, Default)]
/// struct GetItem {
///     #[bind(param = "id")]
///     id: String,
///     #[bind(query = "tag", form)]
///     tag: String,
/// }
///
/// let keys: Vec<_> = GetItem::descriptor().bindings_in("query").map(|b| b.key()).collect();
/// assert_eq!(keys, ["tag"]);
/// ```
pub trait Bind: Sized + 'static {
    /// The cached binding table for `Self`.
    fn descriptor() -> &'static Descriptor<Self>;
}

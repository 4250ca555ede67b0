use crate::{
    AsValue, BeanArrayFilter, BeanArrayRef, BeanRef, Error, Result, TableFilter, TableHolder,
    TriState, Value,
};
use parking_lot::RwLock;
use std::{collections::BTreeMap, fmt, sync::Arc};

/// Argument root, and any value found while walking an argument root.
///
/// Resolution dispatches on the variant, never on the bind marker: the same `:a.b` resolves
/// differently against a map, a bean or a table.
#[derive(Clone)]
pub enum Arg {
    Value(Value),
    TriState(TriState),
    Map(ArgMap),
    Pair(Box<NamedValue>),
    Holder(Holder),
    Table(TableHolder),
    TableFilter(TableFilter),
    BeanArray(BeanArrayRef),
    BeanArrayFilter(BeanArrayFilter),
    Bean(BeanRef),
    Array(Vec<Arg>),
    Collection(Vec<Arg>),
}

impl Arg {
    pub fn null() -> Arg {
        Arg::Value(Value::Null)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Arg::Value(v) if v.is_null())
    }

    pub fn shape(&self) -> &'static str {
        match self {
            Arg::Value(..) => "value",
            Arg::TriState(..) => "tri-state",
            Arg::Map(..) => "map",
            Arg::Pair(..) => "named value",
            Arg::Holder(..) => "holder",
            Arg::Table(..) => "table",
            Arg::TableFilter(..) => "table filter",
            Arg::BeanArray(..) => "bean array",
            Arg::BeanArrayFilter(..) => "bean array filter",
            Arg::Bean(..) => "bean",
            Arg::Array(..) => "array",
            Arg::Collection(..) => "collection",
        }
    }

    /// Array of scalar values.
    pub fn array<T: AsValue>(values: impl IntoIterator<Item = T>) -> Arg {
        Arg::Array(values.into_iter().map(|v| Arg::Value(v.as_value())).collect())
    }

    /// Collection of scalar values.
    pub fn collection<T: AsValue>(values: impl IntoIterator<Item = T>) -> Arg {
        Arg::Collection(values.into_iter().map(|v| Arg::Value(v.as_value())).collect())
    }

    pub fn pair(name: impl Into<String>, value: impl Into<Arg>) -> Arg {
        Arg::Pair(Box::new(NamedValue::new(name, value)))
    }

    /// The scalar value, if this is one.
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Arg::Value(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Debug for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Arg::TriState(v) => f.debug_tuple("TriState").field(v).finish(),
            Arg::Map(v) => f.debug_tuple("Map").field(v).finish(),
            Arg::Pair(v) => f.debug_tuple("Pair").field(v).finish(),
            Arg::Holder(v) => f.debug_tuple("Holder").field(v).finish(),
            Arg::Array(v) => f.debug_tuple("Array").field(v).finish(),
            Arg::Collection(v) => f.debug_tuple("Collection").field(v).finish(),
            v => f.write_str(v.shape()),
        }
    }
}

impl<T: AsValue> From<T> for Arg {
    fn from(value: T) -> Self {
        Arg::Value(value.as_value())
    }
}

impl From<&'static str> for Arg {
    fn from(value: &'static str) -> Self {
        Arg::Value(value.into())
    }
}

impl From<Value> for Arg {
    fn from(value: Value) -> Self {
        Arg::Value(value)
    }
}

impl From<TriState> for Arg {
    fn from(value: TriState) -> Self {
        Arg::TriState(value)
    }
}

impl From<Holder> for Arg {
    fn from(value: Holder) -> Self {
        Arg::Holder(value)
    }
}

impl From<ArgMap> for Arg {
    fn from(value: ArgMap) -> Self {
        Arg::Map(value)
    }
}

impl From<NamedValue> for Arg {
    fn from(value: NamedValue) -> Self {
        Arg::Pair(Box::new(value))
    }
}

impl From<TableHolder> for Arg {
    fn from(value: TableHolder) -> Self {
        Arg::Table(value)
    }
}

impl From<TableFilter> for Arg {
    fn from(value: TableFilter) -> Self {
        Arg::TableFilter(value)
    }
}

/// Shared key/value mapping. Outputs can write new keys into it.
#[derive(Clone, Default)]
pub struct ArgMap(Arc<RwLock<BTreeMap<String, Arg>>>);

impl ArgMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, key: impl Into<String>, value: impl Into<Arg>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&self, key: impl Into<String>, value: impl Into<Arg>) {
        self.0.write().insert(key.into(), value.into());
    }

    /// Entry lookup distinguishing a missing key (`None`) from a key mapped to NULL.
    pub fn get(&self, key: &str) -> Option<Arg> {
        self.0.read().get(key).cloned()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.read().contains_key(key)
    }

    /// Scalar stored under `key`, `Value::Null` when missing or not a scalar.
    pub fn value(&self, key: &str) -> Value {
        match self.0.read().get(key) {
            Some(Arg::Value(v)) => v.clone(),
            _ => Value::Null,
        }
    }

    pub fn len(&self) -> usize {
        self.0.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.read().is_empty()
    }
}

impl fmt::Debug for ArgMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.0.read().iter()).finish()
    }
}

/// Single named value. A value bound this way is input only unless it is a holder.
#[derive(Debug, Clone)]
pub struct NamedValue {
    pub name: String,
    pub value: Arg,
    /// Type of the NULL bound when `value` is NULL.
    pub null_type: Option<Value>,
}

impl NamedValue {
    pub fn new(name: impl Into<String>, value: impl Into<Arg>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            null_type: None,
        }
    }

    pub fn with_null_type(mut self, null_type: Value) -> Self {
        self.null_type = Some(null_type);
        self
    }
}

/// Declared content of a [`Holder`]. The `Value` is the element prototype (a typed NULL), values
/// written into the holder by outputs are converted to it.
#[derive(Debug, Clone, PartialEq)]
pub enum HolderType {
    Scalar(Value),
    Array(Value),
    List(Value),
    Set(Value),
    TriState,
    Any,
}

impl HolderType {
    pub fn element(&self) -> &Value {
        static NULL: Value = Value::Null;
        match self {
            HolderType::Scalar(v)
            | HolderType::Array(v)
            | HolderType::List(v)
            | HolderType::Set(v) => v,
            HolderType::TriState | HolderType::Any => &NULL,
        }
    }
}

/// Shared mutable single value reference, used to pass values in and out of a statement.
///
/// ```rust
/// use bindery_core::{Arg, Holder, Value};
/// let holder = Holder::of(Some(7));
/// assert_eq!(holder.value(), Value::Int32(Some(7)));
/// holder.set(Arg::from(9));
/// assert_eq!(holder.get_as::<i32>().unwrap(), Some(9));
/// ```
#[derive(Clone)]
pub struct Holder {
    value: Arc<RwLock<Arg>>,
    holder_type: HolderType,
}

impl Holder {
    pub fn new(holder_type: HolderType, value: impl Into<Arg>) -> Self {
        Self {
            value: Arc::new(RwLock::new(value.into())),
            holder_type,
        }
    }

    pub fn of<T: AsValue>(value: Option<T>) -> Self {
        Self::new(HolderType::Scalar(T::as_empty_value()), Arg::Value(value.as_value()))
    }

    pub fn empty<T: AsValue>() -> Self {
        Self::of::<T>(None)
    }

    pub fn array<T: AsValue>(values: impl IntoIterator<Item = T>) -> Self {
        Self::new(HolderType::Array(T::as_empty_value()), Arg::array(values))
    }

    pub fn list<T: AsValue>(values: impl IntoIterator<Item = T>) -> Self {
        Self::new(HolderType::List(T::as_empty_value()), Arg::collection(values))
    }

    pub fn set_of<T: AsValue>(values: impl IntoIterator<Item = T>) -> Self {
        Self::new(HolderType::Set(T::as_empty_value()), Arg::collection(values))
    }

    pub fn tri_state(value: TriState) -> Self {
        Self::new(HolderType::TriState, Arg::TriState(value))
    }

    pub fn any(value: impl Into<Arg>) -> Self {
        Self::new(HolderType::Any, value)
    }

    pub fn holder_type(&self) -> &HolderType {
        &self.holder_type
    }

    pub fn get(&self) -> Arg {
        self.value.read().clone()
    }

    pub fn set(&self, value: impl Into<Arg>) {
        *self.value.write() = value.into();
    }

    /// The scalar content, `Value::Null` when the content is not a scalar.
    pub fn value(&self) -> Value {
        match &*self.value.read() {
            Arg::Value(v) => v.clone(),
            Arg::TriState(v) => v.integer_value().as_value(),
            _ => Value::Null,
        }
    }

    pub fn get_as<T: AsValue>(&self) -> Result<Option<T>> {
        Option::<T>::try_from_value(self.value())
    }

    /// Scalar elements of an array, list or set content. Elements that are holders are read, any
    /// other container is an error.
    pub fn values(&self) -> Result<Vec<Value>> {
        match &*self.value.read() {
            Arg::Array(v) | Arg::Collection(v) => v
                .iter()
                .enumerate()
                .map(|(i, v)| match v {
                    Arg::Value(v) => Ok(v.clone()),
                    Arg::TriState(v) => Ok(Value::Int32(v.integer_value())),
                    Arg::Holder(h) => Ok(h.value()),
                    v => {
                        let error = Error::msg(format!(
                            "Element {} of the holder is a {}, not a scalar value",
                            i,
                            v.shape()
                        ));
                        log::error!("{:#}", error);
                        Err(error)
                    }
                })
                .collect(),
            Arg::Value(Value::Array(Some(v), ..)) => Ok(v.to_vec()),
            _ => Ok(Vec::new()),
        }
    }

    pub fn values_as<T: AsValue>(&self) -> Result<Vec<T>> {
        self.values()?.into_iter().map(T::try_from_value).collect()
    }

    pub fn same(&self, other: &Holder) -> bool {
        Arc::ptr_eq(&self.value, &other.value)
    }
}

impl fmt::Debug for Holder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Holder")
            .field("type", &self.holder_type)
            .field("value", &*self.value.read())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pairs_nest() {
        let inner = Holder::of(Some(3));
        let arg = Arg::pair("outer", Arg::pair("inner", inner.clone()));
        let Arg::Pair(outer) = &arg else {
            panic!("Expected a named value, got {:?}", arg);
        };
        assert_eq!(outer.name, "outer");
        assert!(matches!(&outer.value, Arg::Pair(v) if v.name == "inner"));
        assert!(format!("{:?}", arg).starts_with("Pair(NamedValue"));
        let map = ArgMap::new().with("k", 1);
        assert_eq!(format!("{:?}", map), "{\"k\": Value(Int32(Some(1)))}");
    }

    #[test]
    fn holder_values_are_scalars() {
        let inner = Holder::of(Some(5));
        let holder = Holder::new(
            HolderType::List(Value::Int32(None)),
            Arg::Collection(vec![Arg::from(1), Arg::from(inner), Arg::from(TriState::True)]),
        );
        assert_eq!(holder.values_as::<i32>().unwrap(), vec![1, 5, 1]);

        let holder = Holder::new(
            HolderType::List(Value::Int32(None)),
            Arg::Collection(vec![Arg::from(1), Arg::from(ArgMap::new()), Arg::from(2)]),
        );
        let error = holder.values().expect_err("A map is not a scalar");
        assert!(format!("{:#}", error).contains("Element 1 of the holder is a map"));
        assert!(holder.values_as::<i32>().is_err());
    }
}

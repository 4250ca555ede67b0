use crate::{
    Arg, ArgMap, AsValue, BindError, Error, Holder, Result, TableHolder, TriState, Value,
    same_property_name,
};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use std::{fmt, sync::Arc};
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time};
use uuid::Uuid;

/// Accessor of one property of a bean.
pub struct Property<B> {
    pub name: &'static str,
    pub get: fn(&B) -> Arg,
    /// `None` for read only properties.
    pub set: Option<fn(&mut B, Value) -> Result<()>>,
}

/// Plain object exposing named properties through a static accessor table.
///
/// Usually derived with `#[derive(Bean)]`, the table is built once per type.
pub trait Bean: Sized + Send + Sync + 'static {
    fn bean_name() -> &'static str;
    fn properties() -> &'static [Property<Self>];
    fn find_property(name: &str) -> Option<&'static Property<Self>> {
        Self::properties()
            .iter()
            .find(|p| same_property_name(p.name, name))
    }
}

/// Object safe view of a [`Bean`].
pub trait DynBean: Send + Sync {
    fn bean_name(&self) -> &'static str;
    fn has_property(&self, name: &str) -> bool;
    fn property(&self, name: &str) -> Option<Arg>;
    fn is_writable(&self, name: &str) -> bool;
    fn set_property(&mut self, name: &str, value: Value) -> Result<()>;
}

impl<B: Bean> DynBean for B {
    fn bean_name(&self) -> &'static str {
        <B as Bean>::bean_name()
    }
    fn has_property(&self, name: &str) -> bool {
        B::find_property(name).is_some()
    }
    fn property(&self, name: &str) -> Option<Arg> {
        B::find_property(name).map(|p| (p.get)(self))
    }
    fn is_writable(&self, name: &str) -> bool {
        B::find_property(name).is_some_and(|p| p.set.is_some())
    }
    fn set_property(&mut self, name: &str, value: Value) -> Result<()> {
        match B::find_property(name).and_then(|p| p.set) {
            Some(set) => set(self, value),
            None => {
                let error = Error::new(BindError::ReadOnlyProperty {
                    bean: <B as Bean>::bean_name(),
                    property: name.into(),
                });
                log::error!("{:#}", error);
                Err(error)
            }
        }
    }
}

/// Shared reference to a bean used as argument root.
#[derive(Clone)]
pub struct BeanRef(pub Arc<RwLock<dyn DynBean>>);

impl BeanRef {
    pub fn new<B: Bean>(bean: &Arc<RwLock<B>>) -> Self {
        Self(bean.clone())
    }
}

impl fmt::Debug for BeanRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Bean({})", self.0.read().bean_name())
    }
}

pub fn shared<T>(value: T) -> Arc<RwLock<T>> {
    Arc::new(RwLock::new(value))
}

impl Arg {
    /// Bean shared with the caller, outputs write into it.
    pub fn bean<B: Bean>(bean: &Arc<RwLock<B>>) -> Arg {
        Arg::Bean(BeanRef::new(bean))
    }

    /// Bean owned by the argument, for inputs.
    pub fn bean_value<B: Bean>(bean: B) -> Arg {
        Arg::Bean(BeanRef::new(&shared(bean)))
    }

    /// Array of beans, a terminal path binds the property of every element (one per execution).
    pub fn beans<B: Bean>(beans: impl IntoIterator<Item = B>) -> Arg {
        Arg::Array(beans.into_iter().map(Arg::bean_value).collect())
    }
}

/// Object safe view of an array of beans of the same type.
pub trait DynBeanArray: Send + Sync {
    fn bean_name(&self) -> &'static str;
    fn has_property(&self, name: &str) -> bool;
    fn len(&self) -> usize;
    fn property(&self, index: usize, name: &str) -> Option<Arg>;
    fn set_property(&mut self, index: usize, name: &str, value: Value) -> Result<()>;
    /// Grows with default beans or drops trailing beans.
    fn resize(&mut self, len: usize);
}

impl<B: Bean + Default> DynBeanArray for Vec<B> {
    fn bean_name(&self) -> &'static str {
        <B as Bean>::bean_name()
    }
    fn has_property(&self, name: &str) -> bool {
        B::find_property(name).is_some()
    }
    fn len(&self) -> usize {
        Vec::len(self)
    }
    fn property(&self, index: usize, name: &str) -> Option<Arg> {
        self.get(index).and_then(|b| DynBean::property(b, name))
    }
    fn set_property(&mut self, index: usize, name: &str, value: Value) -> Result<()> {
        let len = Vec::len(self);
        match self.get_mut(index) {
            Some(bean) => bean.set_property(name, value),
            None => {
                let error = Error::msg(format!(
                    "Index {} is out of range for an array of {} {}",
                    index,
                    len,
                    <B as Bean>::bean_name()
                ));
                log::error!("{:#}", error);
                Err(error)
            }
        }
    }
    fn resize(&mut self, len: usize) {
        self.resize_with(len, B::default);
    }
}

/// Shared array of beans, growable through `Default`.
///
/// ```rust,ignore
/// let persons = BeanArray::new(vec![Person::default()]);
/// let args = [persons.arg()];
/// ```
pub struct BeanArray<B: Bean + Default>(Arc<RwLock<Vec<B>>>);

impl<B: Bean + Default> BeanArray<B> {
    pub fn new(beans: Vec<B>) -> Self {
        Self(shared(beans))
    }

    pub fn read(&self) -> parking_lot::RwLockReadGuard<'_, Vec<B>> {
        self.0.read()
    }

    pub fn write(&self) -> parking_lot::RwLockWriteGuard<'_, Vec<B>> {
        self.0.write()
    }

    pub fn len(&self) -> usize {
        self.0.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.read().is_empty()
    }

    pub fn arg(&self) -> Arg {
        Arg::BeanArray(self.as_dyn())
    }

    pub fn as_dyn(&self) -> BeanArrayRef {
        BeanArrayRef(self.0.clone())
    }

    /// Only the beans at the given positions, in the given order.
    pub fn filter(&self, indices: impl IntoIterator<Item = usize>) -> Arg {
        Arg::BeanArrayFilter(BeanArrayFilter {
            array: self.as_dyn(),
            indices: indices.into_iter().collect(),
        })
    }
}

impl<B: Bean + Default> Clone for BeanArray<B> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<B: Bean + Default> Default for BeanArray<B> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

#[derive(Clone)]
pub struct BeanArrayRef(pub Arc<RwLock<dyn DynBeanArray>>);

impl fmt::Debug for BeanArrayRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let array = self.0.read();
        write!(f, "BeanArray({}; {})", array.bean_name(), array.len())
    }
}

#[derive(Debug, Clone)]
pub struct BeanArrayFilter {
    pub array: BeanArrayRef,
    pub indices: Vec<usize>,
}

/// Field of a derived bean: how it is read into an [`Arg`] and written from a [`Value`].
pub trait BeanField {
    const WRITABLE: bool = true;
    fn to_arg(&self) -> Arg;
    fn assign(&mut self, value: Value) -> Result<()> {
        let error = Error::msg(format!("Cannot assign {} to a read only property", value));
        log::error!("{:#}", error);
        Err(error)
    }
}

macro_rules! impl_bean_field_scalar {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl BeanField for $ty {
                fn to_arg(&self) -> Arg {
                    Arg::Value(self.clone().as_value())
                }
                fn assign(&mut self, value: Value) -> Result<()> {
                    *self = <$ty as AsValue>::try_from_value(value)?;
                    Ok(())
                }
            }
            impl BeanField for Vec<$ty> {
                fn to_arg(&self) -> Arg {
                    Arg::array(self.iter().cloned())
                }
                fn assign(&mut self, value: Value) -> Result<()> {
                    *self = match value {
                        Value::Array(Some(values), ..) => values
                            .into_vec()
                            .into_iter()
                            .map(<$ty as AsValue>::try_from_value)
                            .collect::<Result<_>>()?,
                        v if v.is_null() => Vec::new(),
                        v => vec![<$ty as AsValue>::try_from_value(v)?],
                    };
                    Ok(())
                }
            }
        )+
    };
}
impl_bean_field_scalar!(
    bool,
    i16,
    i32,
    i64,
    f32,
    f64,
    Decimal,
    char,
    String,
    Date,
    Time,
    PrimitiveDateTime,
    OffsetDateTime,
    Uuid,
);

impl BeanField for Vec<u8> {
    fn to_arg(&self) -> Arg {
        Arg::Value(self.clone().as_value())
    }
    fn assign(&mut self, value: Value) -> Result<()> {
        *self = Vec::<u8>::try_from_value(value)?;
        Ok(())
    }
}

impl<T: AsValue + Clone> BeanField for Option<T> {
    fn to_arg(&self) -> Arg {
        Arg::Value(self.clone().as_value())
    }
    fn assign(&mut self, value: Value) -> Result<()> {
        *self = Option::<T>::try_from_value(value)?;
        Ok(())
    }
}

impl BeanField for TriState {
    fn to_arg(&self) -> Arg {
        Arg::TriState(*self)
    }
    fn assign(&mut self, value: Value) -> Result<()> {
        *self = TriState::from_value(&value)?;
        Ok(())
    }
}

impl BeanField for Holder {
    const WRITABLE: bool = false;
    fn to_arg(&self) -> Arg {
        Arg::Holder(self.clone())
    }
}

impl BeanField for TableHolder {
    const WRITABLE: bool = false;
    fn to_arg(&self) -> Arg {
        Arg::Table(self.clone())
    }
}

impl BeanField for ArgMap {
    const WRITABLE: bool = false;
    fn to_arg(&self) -> Arg {
        Arg::Map(self.clone())
    }
}

impl<B: Bean + Default> BeanField for BeanArray<B> {
    const WRITABLE: bool = false;
    fn to_arg(&self) -> Arg {
        self.arg()
    }
}

impl<B: Bean> BeanField for Arc<RwLock<B>> {
    const WRITABLE: bool = false;
    fn to_arg(&self) -> Arg {
        Arg::bean(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::LazyLock;

    struct Person {
        id: i64,
        name: Option<String>,
        tags: Holder,
    }

    impl Default for Person {
        fn default() -> Self {
            Self {
                id: 0,
                name: None,
                tags: Holder::list::<String>([]),
            }
        }
    }

    impl Bean for Person {
        fn bean_name() -> &'static str {
            "Person"
        }
        fn properties() -> &'static [Property<Self>] {
            static PROPERTIES: LazyLock<Vec<Property<Person>>> = LazyLock::new(|| {
                vec![
                    Property {
                        name: "id",
                        get: |b| b.id.to_arg(),
                        set: Some(|b, v| b.id.assign(v)),
                    },
                    Property {
                        name: "name",
                        get: |b| b.name.to_arg(),
                        set: Some(|b, v| b.name.assign(v)),
                    },
                    Property {
                        name: "tags",
                        get: |b| b.tags.to_arg(),
                        set: None,
                    },
                ]
            });
            &PROPERTIES
        }
    }

    #[test]
    fn dyn_bean_access() {
        let mut person = Person {
            id: 3,
            ..Default::default()
        };
        assert!(person.has_property("Name"));
        assert!(!person.has_property("missing"));
        assert!(matches!(
            DynBean::property(&person, "id"),
            Some(Arg::Value(Value::Int64(Some(3))))
        ));
        person.set_property("name", "Joe".into()).unwrap();
        assert_eq!(person.name.as_deref(), Some("Joe"));
        person.set_property("id", Value::Int32(Some(5))).unwrap();
        assert_eq!(person.id, 5);
        assert!(!person.is_writable("tags"));
        assert!(person.set_property("tags", Value::Null).is_err());
    }

    #[test]
    fn bean_array_resize() {
        let persons = BeanArray::new(vec![Person::default()]);
        let array = persons.as_dyn();
        array.0.write().resize(3);
        assert_eq!(persons.len(), 3);
        array.0.write().set_property(2, "id", 9.into()).unwrap();
        assert_eq!(persons.read()[2].id, 9);
        array.0.write().resize(1);
        assert_eq!(persons.len(), 1);
    }
}

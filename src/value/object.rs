use crate::{value::Value, vm::GCHandle};
use gc_arena::{lock::RefLock, Collect, Collection, Gc};
use std::{
    fmt::{Debug, Formatter},
    hash::{Hash, Hasher},
};

type ObjectInner<'gc> = RefLock<Object<'gc>>;
pub type ObjectHandle<'gc> = Gc<'gc, ObjectInner<'gc>>;

/// A plain managed object: an ordered bag of named properties.
#[derive(Clone, Default)]
pub struct Object<'gc> {
    properties: Vec<(String, Value<'gc>)>,
}

unsafe impl<'gc> Collect for Object<'gc> {
    fn trace(&self, cc: &Collection) {
        for (_, v) in &self.properties {
            v.trace(cc);
        }
    }
}

impl<'gc> Object<'gc> {
    pub fn get(&self, name: &str) -> Option<&Value<'gc>> {
        self.properties
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v)
    }

    pub fn set(&mut self, name: impl Into<String>, value: Value<'gc>) {
        let name = name.into();
        match self.properties.iter_mut().find(|(k, _)| *k == name) {
            Some((_, slot)) => *slot = value,
            None => self.properties.push((name, value)),
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ + use<'_, 'gc> {
        self.properties.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

#[derive(Copy, Clone)]
#[repr(transparent)]
pub struct ObjectRef<'gc>(pub ObjectHandle<'gc>);

unsafe impl<'gc> Collect for ObjectRef<'gc> {
    fn trace(&self, cc: &Collection) {
        self.0.trace(cc);
    }
}

impl PartialEq for ObjectRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        Gc::ptr_eq(self.0, other.0)
    }
}

impl Eq for ObjectRef<'_> {}

impl Hash for ObjectRef<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        Gc::as_ptr(self.0).hash(state);
    }
}

impl<'gc> ObjectRef<'gc> {
    pub fn new(gc: GCHandle<'gc>) -> Self {
        Self(Gc::new(gc, RefLock::new(Object::default())))
    }

    pub fn from_properties<K: Into<String>>(
        gc: GCHandle<'gc>,
        properties: impl IntoIterator<Item = (K, Value<'gc>)>,
    ) -> Self {
        let mut object = Object::default();
        for (k, v) in properties {
            object.set(k, v);
        }
        Self(Gc::new(gc, RefLock::new(object)))
    }

    pub fn get(&self, name: &str) -> Option<Value<'gc>> {
        self.0.borrow().get(name).cloned()
    }

    pub fn set(&self, gc: GCHandle<'gc>, name: impl Into<String>, value: Value<'gc>) {
        self.0.borrow_mut(gc).set(name, value);
    }

    pub fn as_object<T>(&self, op: impl FnOnce(&Object<'gc>) -> T) -> T {
        op(&self.0.borrow())
    }

    pub fn address(&self) -> usize {
        Gc::as_ptr(self.0) as usize
    }
}

impl Debug for ObjectRef<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let keys: Vec<String> = self.as_object(|o| o.keys().map(str::to_owned).collect());
        write!(f, "Object {{{}}} @ {:#x}", keys.join(", "), self.address())
    }
}

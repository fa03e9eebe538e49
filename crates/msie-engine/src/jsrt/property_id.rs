//! Property ids and the per-runtime interner

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use msie_sys::{JsPropertyIdRef, JsRtApi};

use super::translate::check;
use crate::error::EngineResult;

/// Interned property name. Equality compares the native id only.
#[derive(Clone)]
pub struct JsPropertyId {
    raw: JsPropertyIdRef,
    name: Rc<str>,
}

impl JsPropertyId {
    pub(crate) fn new(raw: JsPropertyIdRef, name: Rc<str>) -> Self {
        Self { raw, name }
    }

    pub fn raw(&self) -> JsPropertyIdRef {
        self.raw
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl PartialEq for JsPropertyId {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for JsPropertyId {}

impl Hash for JsPropertyId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl fmt::Debug for JsPropertyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "JsPropertyId({:?}, {:?})", self.name, self.raw)
    }
}

/// Name to id cache for one runtime. Entries are never evicted; ids live as
/// long as the runtime.
#[derive(Default)]
pub struct PropertyInterner {
    ids: RefCell<HashMap<Rc<str>, JsPropertyId>>,
}

impl PropertyInterner {
    /// The id for `name`, asking the engine only on the first request.
    pub fn get_or_create(&self, api: &dyn JsRtApi, name: &str) -> EngineResult<JsPropertyId> {
        if let Some(id) = self.ids.borrow().get(name) {
            return Ok(id.clone());
        }
        let raw = check(api, api.property_id_from_name(name))?;
        let name: Rc<str> = Rc::from(name);
        let id = JsPropertyId::new(raw, name.clone());
        self.ids.borrow_mut().insert(name, id.clone());
        Ok(id)
    }

    pub fn len(&self) -> usize {
        self.ids.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.borrow().is_empty()
    }
}

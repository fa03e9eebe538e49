//! Values, properties and exceptions of the current context

use std::rc::Rc;

use msie_sys::JsValueType;

use super::context::CurrentContext;
use super::flavor::JsRtFlavor;
use super::property_id::JsPropertyId;
use super::translate::check;
use super::value::JsValue;
use crate::error::{EngineResult, UsageError};

impl<F: JsRtFlavor> CurrentContext<'_, F> {
    // ========================================================================
    // Property ids
    // ========================================================================

    /// Interned id for `name`, cached per runtime.
    pub fn property_id(&self, name: &str) -> EngineResult<JsPropertyId> {
        let api = self.api();
        match self.interner() {
            Some(interner) => interner.get_or_create(api, name),
            None => {
                let raw = check(api, api.property_id_from_name(name))?;
                Ok(JsPropertyId::new(raw, Rc::from(name)))
            }
        }
    }

    /// The name the engine holds for `id`.
    pub fn property_name(&self, id: &JsPropertyId) -> EngineResult<String> {
        let api = self.api();
        check(api, api.property_name_from_id(id.raw()))
    }

    // ========================================================================
    // Values
    // ========================================================================

    pub fn undefined(&self) -> EngineResult<JsValue> {
        check(self.api(), self.api().undefined_value()).map(JsValue::from)
    }

    pub fn null(&self) -> EngineResult<JsValue> {
        check(self.api(), self.api().null_value()).map(JsValue::from)
    }

    pub fn boolean(&self, value: bool) -> EngineResult<JsValue> {
        check(self.api(), self.api().bool_to_boolean(value)).map(JsValue::from)
    }

    pub fn number(&self, value: f64) -> EngineResult<JsValue> {
        check(self.api(), self.api().double_to_number(value)).map(JsValue::from)
    }

    pub fn int(&self, value: i32) -> EngineResult<JsValue> {
        check(self.api(), self.api().int_to_number(value)).map(JsValue::from)
    }

    pub fn string(&self, value: &str) -> EngineResult<JsValue> {
        check(self.api(), self.api().pointer_to_string(value)).map(JsValue::from)
    }

    pub fn create_object(&self) -> EngineResult<JsValue> {
        check(self.api(), self.api().create_object()).map(JsValue::from)
    }

    pub fn create_error(&self, message: &str) -> EngineResult<JsValue> {
        let message = self.string(message)?;
        check(self.api(), self.api().create_error(message.raw())).map(JsValue::from)
    }

    pub fn global_object(&self) -> EngineResult<JsValue> {
        check(self.api(), self.api().global_object()).map(JsValue::from)
    }

    /// Pin `value` past the end of the current scope. Returns the pin count.
    pub fn add_ref(&self, value: JsValue) -> EngineResult<u32> {
        check(self.api(), self.api().value_add_ref(value.raw()))
    }

    pub fn release(&self, value: JsValue) -> EngineResult<u32> {
        check(self.api(), self.api().value_release(value.raw()))
    }

    /// Shape of `value`. Types the flavor does not define are rejected.
    pub fn value_type(&self, value: JsValue) -> EngineResult<JsValueType> {
        let value_type = check(self.api(), self.api().value_type(value.raw()))?;
        if !F::supports_value_type(value_type) {
            return Err(UsageError::InvalidArgument.into());
        }
        Ok(value_type)
    }

    pub fn to_bool(&self, value: JsValue) -> EngineResult<bool> {
        check(self.api(), self.api().boolean_to_bool(value.raw()))
    }

    pub fn to_f64(&self, value: JsValue) -> EngineResult<f64> {
        check(self.api(), self.api().number_to_double(value.raw()))
    }

    /// The contents of a string value.
    pub fn to_string_contents(&self, value: JsValue) -> EngineResult<String> {
        check(self.api(), self.api().string_to_pointer(value.raw()))
    }

    /// `String(value)`
    pub fn convert_to_string(&self, value: JsValue) -> EngineResult<String> {
        let api = self.api();
        let converted = check(api, api.convert_value_to_string(value.raw()))?;
        check(api, api.string_to_pointer(converted))
    }

    /// `Number(value)`
    pub fn convert_to_number(&self, value: JsValue) -> EngineResult<f64> {
        let api = self.api();
        let converted = check(api, api.convert_value_to_number(value.raw()))?;
        check(api, api.number_to_double(converted))
    }

    /// `Boolean(value)`
    pub fn convert_to_bool(&self, value: JsValue) -> EngineResult<bool> {
        let api = self.api();
        let converted = check(api, api.convert_value_to_boolean(value.raw()))?;
        check(api, api.boolean_to_bool(converted))
    }

    // ========================================================================
    // Properties and calls
    // ========================================================================

    pub fn get_property(&self, object: JsValue, id: &JsPropertyId) -> EngineResult<JsValue> {
        check(self.api(), self.api().get_property(object.raw(), id.raw())).map(JsValue::from)
    }

    pub fn set_property(&self, object: JsValue, id: &JsPropertyId, value: JsValue) -> EngineResult<()> {
        check(self.api(), self.api().set_property(object.raw(), id.raw(), value.raw(), true))
    }

    pub fn has_property(&self, object: JsValue, id: &JsPropertyId) -> EngineResult<bool> {
        check(self.api(), self.api().has_property(object.raw(), id.raw()))
    }

    /// Delete with sloppy-mode rules; false when the property stays.
    pub fn delete_property(&self, object: JsValue, id: &JsPropertyId) -> EngineResult<bool> {
        let api = self.api();
        let result = check(api, api.delete_property(object.raw(), id.raw(), false))?;
        check(api, api.boolean_to_bool(result))
    }

    /// Call `function` with an explicit `this`.
    pub fn call_function(&self, function: JsValue, this: JsValue, args: &[JsValue]) -> EngineResult<JsValue> {
        let mut arguments = Vec::with_capacity(args.len() + 1);
        arguments.push(this.raw());
        arguments.extend(args.iter().map(|arg| arg.raw()));
        check(self.api(), self.api().call_function(function.raw(), &arguments)).map(JsValue::from)
    }

    // ========================================================================
    // Exceptions
    // ========================================================================

    pub fn has_exception(&self) -> EngineResult<bool> {
        check(self.api(), self.api().has_exception())
    }

    pub fn get_and_clear_exception(&self) -> EngineResult<JsValue> {
        check(self.api(), self.api().get_and_clear_exception()).map(JsValue::from)
    }

    /// Put the runtime in exception state with `exception` pending.
    pub fn set_exception(&self, exception: JsValue) -> EngineResult<()> {
        check(self.api(), self.api().set_exception(exception.raw()))
    }
}

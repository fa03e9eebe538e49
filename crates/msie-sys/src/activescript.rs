//! Legacy ActiveScript hosting surface
//!
//! The COM interfaces a host talks to (`IActiveScript`, `IActiveScriptParse`,
//! `IDispatchEx`) and the one it implements (`IActiveScriptSite`), expressed
//! as Rust traits. Status travels as `HResult`; values as `Variant`.

use std::fmt;
use std::rc::Rc;

use bitflags::bitflags;

/// COM status code.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct HResult(pub i32);

macro_rules! hresults {
    ($($(#[$meta:meta])* $name:ident = $value:expr;)*) => {
        impl HResult {
            $($(#[$meta])* pub const $name: HResult = HResult($value as u32 as i32);)*

            fn name(self) -> Option<&'static str> {
                $(if self == Self::$name { return Some(stringify!($name)); })*
                None
            }
        }
    };
}

hresults! {
    /// Success
    S_OK = 0;
    /// Success, negative answer
    S_FALSE = 1;
    /// Not implemented
    E_NOTIMPL = 0x8000_4001u32;
    /// Interface not supported
    E_NOINTERFACE = 0x8000_4002u32;
    /// Null pointer argument
    E_POINTER = 0x8000_4003u32;
    /// Operation aborted
    E_ABORT = 0x8000_4004u32;
    /// Unspecified failure
    E_FAIL = 0x8000_4005u32;
    /// Called in the wrong state
    E_UNEXPECTED = 0x8000_FFFFu32;
    /// Allocation failed
    E_OUTOFMEMORY = 0x8007_000Eu32;
    /// Invalid argument
    E_INVALIDARG = 0x8007_0057u32;
    /// Member not found
    DISP_E_MEMBERNOTFOUND = 0x8002_0003u32;
    /// Value cannot be coerced
    DISP_E_TYPEMISMATCH = 0x8002_0005u32;
    /// Unknown name
    DISP_E_UNKNOWNNAME = 0x8002_0006u32;
    /// Exception raised during invoke
    DISP_E_EXCEPTION = 0x8002_0009u32;
    /// Wrong number of arguments
    DISP_E_BADPARAMCOUNT = 0x8002_000Eu32;
    /// Error already reported through the site (also `OLESCRIPT_E_SYNTAX`)
    SCRIPT_E_REPORTED = 0x8002_0101u32;
    /// Error propagated from a nested script
    SCRIPT_E_PROPAGATE = 0x8002_0102u32;
    /// JScript: out of memory
    JSCRIPT_E_OUTOFMEMORY = 0x800A_0007u32;
    /// JScript: out of stack space
    JSCRIPT_E_OUTOFSTACK = 0x800A_001Cu32;
}

impl HResult {
    /// `SUCCEEDED`
    pub fn is_success(self) -> bool {
        self.0 >= 0
    }

    /// `FAILED`
    pub fn is_failure(self) -> bool {
        self.0 < 0
    }

    /// Unsigned form, as printed by tools.
    pub fn as_u32(self) -> u32 {
        self.0 as u32
    }

    /// `Ok` for success codes.
    pub fn check(self) -> Result<(), HResult> {
        if self.is_success() {
            Ok(())
        } else {
            Err(self)
        }
    }

    /// JScript runtime error numbers live in facility 0x0A.
    pub fn is_jscript_error(self) -> bool {
        self.as_u32() & 0xFFFF_0000 == 0x800A_0000
    }
}

impl fmt::Debug for HResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{}(0x{:08X})", name, self.as_u32()),
            None => write!(f, "HResult(0x{:08X})", self.as_u32()),
        }
    }
}

impl fmt::Display for HResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// `SCRIPTSTATE`
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum ScriptState {
    Uninitialized = 0,
    Started = 1,
    Connected = 2,
    Disconnected = 3,
    Closed = 4,
    Initialized = 5,
}

/// `SCRIPTTHREADSTATE`
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptThreadState {
    /// No script is executing
    NotInScript = 0,
    /// Script is executing on the engine thread
    Running = 1,
}

bitflags! {
    /// `SCRIPTTEXT_*` flags for `ParseScriptText`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ScriptTextFlags: u32 {
        /// Do not run until the engine is started
        const DELAY_EXECUTION = 0x0000_0001;
        /// Code is visible to the named item
        const IS_VISIBLE = 0x0000_0002;
        /// Evaluate as an expression and return its value
        const IS_EXPRESSION = 0x0000_0020;
        /// Keep the code across a reset
        const IS_PERSISTENT = 0x0000_0040;
        /// Host manages the source text
        const HOST_MANAGES_SOURCE = 0x0000_0080;
    }
}

bitflags! {
    /// `DISPATCH_*` flags for `Invoke`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    #[allow(missing_docs)]
    pub struct DispatchFlags: u16 {
        const METHOD = 0x1;
        const PROPERTY_GET = 0x2;
        const PROPERTY_PUT = 0x4;
        const PROPERTY_PUT_REF = 0x8;
        const CONSTRUCT = 0x4000;
    }
}

/// Dispatch member id.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DispId(pub i32);

impl DispId {
    /// The default member; invoking it calls the object.
    pub const VALUE: DispId = DispId(0);
    /// `DISPID_UNKNOWN`
    pub const UNKNOWN: DispId = DispId(-1);
}

/// `VARIANT` subset used by script engines.
#[derive(Clone)]
pub enum Variant {
    /// `VT_EMPTY`, script `undefined`
    Empty,
    /// `VT_NULL`
    Null,
    /// `VT_BOOL`
    Bool(bool),
    /// `VT_I4`
    I4(i32),
    /// `VT_R8`
    R8(f64),
    /// `VT_BSTR`
    Bstr(String),
    /// `VT_DISPATCH`, any script object
    Dispatch(Rc<dyn ScriptDispatch>),
}

impl Variant {
    /// `VARTYPE` tag value.
    pub fn vartype(&self) -> u16 {
        match self {
            Variant::Empty => 0,
            Variant::Null => 1,
            Variant::I4(_) => 3,
            Variant::R8(_) => 5,
            Variant::Bstr(_) => 8,
            Variant::Dispatch(_) => 9,
            Variant::Bool(_) => 11,
        }
    }
}

impl fmt::Debug for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variant::Empty => write!(f, "Empty"),
            Variant::Null => write!(f, "Null"),
            Variant::Bool(b) => write!(f, "Bool({})", b),
            Variant::I4(i) => write!(f, "I4({})", i),
            Variant::R8(r) => write!(f, "R8({})", r),
            Variant::Bstr(s) => write!(f, "Bstr({:?})", s),
            Variant::Dispatch(_) => write!(f, "Dispatch(..)"),
        }
    }
}

impl PartialEq for Variant {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Variant::Empty, Variant::Empty) | (Variant::Null, Variant::Null) => true,
            (Variant::Bool(a), Variant::Bool(b)) => a == b,
            (Variant::I4(a), Variant::I4(b)) => a == b,
            (Variant::R8(a), Variant::R8(b)) => a == b,
            (Variant::Bstr(a), Variant::Bstr(b)) => a == b,
            (Variant::Dispatch(a), Variant::Dispatch(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Error details handed to `OnScriptError` (`IActiveScriptError`).
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptErrorInfo {
    /// Status of the failure
    pub scode: HResult,
    /// Error source, e.g. "Microsoft JScript runtime error"
    pub source: String,
    /// Error message
    pub description: String,
    /// Zero-based line
    pub line: u32,
    /// Zero-based column
    pub column: u32,
    /// Text of the failing line, when known
    pub source_line: Option<String>,
    /// JS error name (`TypeError`, `SyntaxError`...)
    pub name: Option<String>,
}

/// Callbacks the engine makes into its host (`IActiveScriptSite`).
pub trait ActiveScriptSite {
    /// The engine moved to `state`.
    fn on_state_change(&self, _state: ScriptState) {}

    /// The engine is about to execute script.
    fn on_enter_script(&self) {}

    /// The engine finished executing script.
    fn on_leave_script(&self) {}

    /// A compile or runtime error occurred. Returning success lets the engine
    /// report `SCRIPT_E_REPORTED` to the caller.
    fn on_script_error(&self, error: &ScriptErrorInfo) -> HResult;
}

/// Late-bound access to a script object (`IDispatchEx` subset).
pub trait ScriptDispatch {
    /// `GetDispID`; with `ensure` the member is created when missing.
    fn get_dispid(&self, name: &str, ensure: bool) -> Result<DispId, HResult>;

    /// `GetMemberName`
    fn get_member_name(&self, id: DispId) -> Result<String, HResult>;

    /// `InvokeEx`
    fn invoke(&self, id: DispId, flags: DispatchFlags, args: &[Variant]) -> Result<Variant, HResult>;

    /// `DeleteMemberByName`; `false` when the member cannot be deleted.
    fn delete_member_by_name(&self, name: &str) -> Result<bool, HResult>;
}

/// A legacy script engine (`IActiveScript` with `IActiveScriptParse` and
/// `IActiveScriptGarbageCollector`).
pub trait ActiveScript {
    /// `IActiveScriptParse::InitNew`
    fn init_new(&self) -> Result<(), HResult>;

    /// `SetScriptSite`
    fn set_script_site(&self, site: Rc<dyn ActiveScriptSite>) -> Result<(), HResult>;

    /// `GetScriptState`
    fn get_script_state(&self) -> Result<ScriptState, HResult>;

    /// `SetScriptState`
    fn set_script_state(&self, state: ScriptState) -> Result<(), HResult>;

    /// `GetScriptThreadState` for the calling thread.
    fn get_script_thread_state(&self) -> Result<ScriptThreadState, HResult>;

    /// `InterruptScriptThread`
    fn interrupt_script_thread(&self) -> Result<(), HResult>;

    /// `GetScriptDispatch`; `None` selects the global object.
    fn get_script_dispatch(&self, item_name: Option<&str>) -> Result<Rc<dyn ScriptDispatch>, HResult>;

    /// `IActiveScriptParse::ParseScriptText`. Without `IS_EXPRESSION` the
    /// code runs immediately and the result is `Empty`.
    fn parse_script_text(
        &self,
        code: &str,
        item_name: Option<&str>,
        source_context: usize,
        starting_line: u32,
        flags: ScriptTextFlags,
    ) -> Result<Variant, HResult>;

    /// `IActiveScriptGarbageCollector::CollectGarbage`
    fn collect_garbage(&self) -> Result<(), HResult>;

    /// `Close`
    fn close(&self) -> Result<(), HResult>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hresult_success() {
        assert!(HResult::S_OK.is_success());
        assert!(HResult::S_FALSE.is_success());
        assert!(HResult::E_FAIL.is_failure());
        assert_eq!(HResult::E_INVALIDARG.check(), Err(HResult::E_INVALIDARG));
    }

    #[test]
    fn test_hresult_values() {
        assert_eq!(HResult::SCRIPT_E_REPORTED.as_u32(), 0x8002_0101);
        assert_eq!(HResult::E_UNEXPECTED.as_u32(), 0x8000_FFFF);
        assert!(HResult::JSCRIPT_E_OUTOFSTACK.is_jscript_error());
        assert!(!HResult::DISP_E_EXCEPTION.is_jscript_error());
    }

    #[test]
    fn test_hresult_debug() {
        assert_eq!(format!("{:?}", HResult::E_ABORT), "E_ABORT(0x80004004)");
        assert_eq!(format!("{:?}", HResult(0x8000_1234u32 as i32)), "HResult(0x80001234)");
    }

    #[test]
    fn test_variant_equality() {
        assert_eq!(Variant::I4(3), Variant::I4(3));
        assert_ne!(Variant::I4(3), Variant::R8(3.0));
        assert_eq!(Variant::Bstr("a".into()).vartype(), 8);
    }
}

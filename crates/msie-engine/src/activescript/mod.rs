//! ActiveScript binding layer

mod hresult;
mod session;
mod site;

pub use session::ActiveScriptSession;
pub use site::HostSite;

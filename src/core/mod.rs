//! Core request plumbing shared by strategies, the engine and the orchestrator.

pub mod headers;
pub mod reqwest_client;
pub mod session;
pub mod transport;

#[cfg(test)]
pub(crate) mod stub;

pub use headers::{HeaderList, InvalidHeader, is_title_case};
pub use reqwest_client::ReqwestTransport;
pub use session::{DEFAULT_HEADERS, DispatchPipeline, Session, UrlRewrite};
pub use transport::{
    DispatchRequest, HttpResponse, HttpTransport, SentRequest, SessionSettings, TransportError,
};

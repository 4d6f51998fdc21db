pub mod store;
pub mod transport;

pub use store::JsonFileStore;
pub use transport::{ReqwestTransport, ResponseChunks};

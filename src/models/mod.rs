pub mod ingest;
pub mod record;
pub mod request;
pub mod result;
pub mod session;

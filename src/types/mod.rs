//! Public types for the Muninn API.

mod generate;
mod message;
mod query;
mod request;

pub use generate::{GenerateEvent, GenerateOptions, GenerateResponse};
pub use message::{ChatMessage, Role};
pub use query::QueryType;
pub use request::{
    BatchAnswer, BatchQueryRequest, BatchResponse, QueryEvent, QueryParams, QueryRequest,
    QueryResponse,
};

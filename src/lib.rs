//! Oncall SDK: data-access layer for a declarative-state provider.
//!
//! REST calls go through [`request`], GraphQL through [`graphql`]; records are projected to
//! flat attribute maps by [`encode`] and written to a state target by [`state`].

pub mod cancel;
pub mod client;
pub mod config;
pub mod encode;
pub mod error;
pub mod graphql;
pub mod request;
pub mod resources;
pub mod response;
pub mod state;

pub use cancel::CancelToken;
pub use client::ApiClient;
pub use config::{validate, AccessToken, ClientConfig, Region};
pub use encode::{encode_slice, AttrValue, AttributeMap, Encode, Field, Projectable, ToAttribute};
pub use error::{ApiError, ConfigError, EncodingError, StateError};
pub use graphql::{GraphQLObject, GraphQLOperation, OperationKind, Selection, Variables};
pub use request::CallDescriptor;
pub use response::{AppError, Envelope, ErrorDetails};
pub use state::{apply, apply_read, encode_and_apply, MemoryState, StateTarget};

//! Authenticated REST connector for the Zuora billing API.
//!
//! Callers issue `get/post/put/patch/delete` calls without knowing anything
//! about token lifecycle, credential encoding, or response parsing.
//!
//! # Architecture
//!
//! ```text
//!   Data-source layer (operation name + args)
//!          ↓
//! ┌─────────────────────────────────────────┐
//! │       ZuoraFetcher (request pipeline)    │
//! │  - URL + query construction              │
//! │  - Header merge, body encoding           │
//! │  - Response normalization                │
//! └─────────────────────────────────────────┘
//!          ↓ get_valid_token()
//! ┌─────────────────────────────────────────┐
//! │       TokenManager                       │
//! │  - Cached token + expiry                 │
//! │  - Client-credentials exchange           │
//! └─────────────────────────────────────────┘
//!          ↓
//!       Zuora REST API
//! ```

pub mod config;
pub mod error;
pub mod fetcher;
pub mod oauth;
pub mod request;
pub mod response;
mod source;

pub use config::{load_config, ZuoraCredentials, ZuoraSettings, ZuoraSource};
pub use error::{ConnectorError, ConnectorResult};
pub use fetcher::{make_zuora_fetcher, ZuoraFetcher};
pub use oauth::TokenManager;
pub use request::{CallArgs, Operation, RequestBody, RequestDescriptor};
pub use response::{DataResponse, NormalizedResult, ResponseBody};
pub use source::DataSource;

//! # Servicify
//!
//! Standardizes how service-layer methods report outcomes. An operation is
//! run, timed, and turned into a uniform success/failure envelope whose
//! payload has been recursively rewritten into portable literals: dates,
//! enumerations, errors and primitives are formatted by an ordered list of
//! [`FormatterSpec`]s.
//!
//! ## Basic Usage
//!
//! ```rust
//! use servicify::*;
//!
//! # let rt = tokio::runtime::Runtime::new().unwrap();
//! # rt.block_on(async {
//! let response = servicify_outcome_of(
//!     || async { Ok::<_, anyhow::Error>(42) },
//!     &ServicifyOptions::default(),
//! )
//! .await
//! .expect("valid formatter configuration");
//!
//! assert!(response.is_success());
//! assert_eq!(response.data(), Some(&Value::from(42)));
//! assert_eq!(response.meta.status, ResponseStatus::Success);
//! # });
//! ```
//!
//! ## Failures become data
//!
//! ```rust
//! use servicify::*;
//!
//! # let rt = tokio::runtime::Runtime::new().unwrap();
//! # rt.block_on(async {
//! let options = ServicifyOptions::default().with_include_error_stacks(false);
//! let response = servicify_outcome_of(
//!     || async { Err::<(), _>(ErrorValue::new("boom")) },
//!     &options,
//! )
//! .await
//! .expect("valid formatter configuration");
//!
//! assert!(response.is_failure());
//! let json = serde_json::to_value(&response).unwrap();
//! assert_eq!(json["error"]["message"], "boom");
//! assert_eq!(json["meta"]["status"], "FAILURE");
//! # });
//! ```

// The derive macro emits `::servicify::...` paths, which must also resolve
// inside this crate.
extern crate self as servicify;

mod config;
mod date_format;
mod dispatch;
mod enumeration;
mod envelope;
mod error;
mod extract;
mod formatters;
mod options;
mod service;
mod timing;
mod validation;
mod value;

pub use config::*;
pub use date_format::*;
pub use dispatch::*;
pub use enumeration::*;
pub use envelope::*;
pub use error::*;
pub use extract::*;
pub use formatters::*;
pub use options::*;
pub use service::*;
pub use timing::*;
pub use validation::*;
pub use value::*;

pub use servicify_derive::Enumeration;

#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod client;
mod config;
mod error;
mod policy;
mod profile;
mod task;

pub use crate::client::ApiClient;
pub use crate::config::{ApiConfig, DEFAULT_TIMEOUT};
pub use crate::policy::{CredentialMode, RequestPolicy};
pub use crate::profile::ProfileService;
pub use crate::task::TaskService;

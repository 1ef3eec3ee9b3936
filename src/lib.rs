#![allow(async_fn_in_trait)]
pub mod cli;
pub mod download_plan;
pub mod error;
pub mod footprint;
pub mod granule;
pub mod http;
pub mod listing;
pub mod local;
pub mod planner;
pub mod request;
pub mod sync;

pub use http::{ArchiveOps, HttpSession, Page};
pub use request::GranuleRequest;
pub use sync::{run, SyncReport};

//! Client core for the Toonify cartoon generation service.
//!
//! A photo is submitted with a style [`Variant`], the resulting job is
//! polled until it settles, and every known [`Generation`] lives in one
//! [`GenerationStore`] that UI code reads and subscribes to.
//!
//! ```no_run
//! use toonify::{AuthToken, ImageSource, ToonifyClient, ToonifyConfig, Variant};
//!
//! # async fn run() -> toonify::Result<()> {
//! let client = ToonifyClient::new(ToonifyConfig::from_env())?;
//! let token = AuthToken::new("session-token");
//! let photo = ImageSource::from_bytes(std::fs::read("me.jpg").unwrap_or_default());
//!
//! let (generation, handle) = client
//!     .submit_and_track(Some(&photo), Variant::Ghiblix, Some(&token))
//!     .await?;
//! let outcome = handle.wait().await;
//! println!("{}: {}", generation.id, outcome.user_message());
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod logger;
pub mod models;
pub mod store;

pub use api::{GenerationApi, HttpGenerationApi};
pub use client::{
    HistoryFetcher, JobSubmitter, PollHandle, PollOutcome, StatusPoller, ToonifyClient,
};
pub use config::{PollConfig, ToonifyConfig};
pub use error::{Result, ToonifyError};
pub use models::*;
pub use store::{GenerationStore, StoreEvent};

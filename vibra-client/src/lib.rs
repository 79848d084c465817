//! vibra-client library interface
//!
//! Client core of VibraAi: backend API client, generation poller, track
//! library and request composition. Rendering is left to the front end,
//! which plugs in through [`notify::Notifier`] and [`notify::Navigator`].

pub mod api_client;
pub mod compose;
pub mod error;
pub mod library;
pub mod notify;
pub mod poller;

pub use crate::api_client::ApiClient;
pub use crate::compose::{describe_submission_error, GenerationForm, GenerationMode};
pub use crate::error::{ClientError, Result};
pub use crate::library::LibraryStore;
pub use crate::poller::{
    GenerationPoller, PollOutcome, PollState, PollerConfig, PollingSession, TaskStatusSource,
};

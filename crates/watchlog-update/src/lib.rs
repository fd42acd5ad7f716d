//! Update checking and self-install orchestration for the watchlog
//! tracker.
//!
//! Three pieces: the remote [`descriptor::VersionDescriptor`] with its
//! urgency rules, streaming package [`verify`]-cation, and the
//! [`flow::UpdateFlow`] state machine that drives download → verify →
//! install against OS facilities held behind trait seams.

mod client;
mod descriptor;
mod flow;
mod verify;

pub mod error;

pub use client::VersionClient;
pub use descriptor::{Urgency, VersionDescriptor};
pub use error::{Error, Result};
pub use flow::{PackageDownloader, PackageInstaller, UpdateFlow, UpdateState};
pub use verify::{VerifyError, verify_package};

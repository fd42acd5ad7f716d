//! Async HTTP client for the version-check endpoint.

use std::time::Duration;

use reqwest::Client;

use crate::{Result, descriptor::VersionDescriptor, error::Error};

/// Bounded windows for the version check round trip. Downloads themselves
/// are delegated to the OS facility and carry no timeout here.
const NETWORK_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for `GET /api/v1/version`.
///
/// Cheap to clone — the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct VersionClient {
  client:   Client,
  base_url: String,
}

impl VersionClient {
  pub fn new(base_url: impl Into<String>) -> Result<Self> {
    let client = Client::builder()
      .connect_timeout(NETWORK_TIMEOUT)
      .timeout(NETWORK_TIMEOUT)
      .build()?;
    Ok(Self { client, base_url: base_url.into() })
  }

  /// Fetch the current version descriptor.
  ///
  /// Any failure (connect, timeout, non-2xx, malformed body) is an
  /// [`Error`] the caller treats as "no update this session".
  pub async fn check(
    &self,
    platform: &str,
    channel: &str,
    installed_code: i64,
  ) -> Result<VersionDescriptor> {
    let url =
      format!("{}/api/v1/version", self.base_url.trim_end_matches('/'));
    tracing::debug!(%url, platform, channel, installed_code, "version check");

    let resp = self
      .client
      .get(&url)
      .query(&[
        ("platform", platform.to_owned()),
        ("channel", channel.to_owned()),
        ("currentVersionCode", installed_code.to_string()),
      ])
      .send()
      .await?;

    if !resp.status().is_success() {
      return Err(Error::UnexpectedStatus(resp.status().as_u16()));
    }
    Ok(resp.json().await?)
  }
}

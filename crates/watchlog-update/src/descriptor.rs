//! The remote version descriptor and the urgency rules derived from it.

use serde::{Deserialize, Serialize};

/// JSON body returned by the version-check endpoint. Wire names are
/// camelCase.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionDescriptor {
  pub latest_version_code:        i64,
  pub latest_version_name:        String,
  /// Installed codes below this are forced to update before continuing.
  pub min_supported_version_code: i64,
  #[serde(default)]
  pub min_supported_version_name: Option<String>,
  pub download_url:               String,
  #[serde(default)]
  pub release_notes:              Option<String>,
  /// Message shown instead of the release notes when the update is forced.
  #[serde(default)]
  pub force_update_message:       Option<String>,
  /// Lowercase hex SHA-256 of the package. Absent disables content
  /// verification; the size check still applies.
  #[serde(default)]
  pub checksum_sha256:            Option<String>,
  /// Exact package size in bytes. Always checked.
  pub apk_size_bytes:             u64,
}

/// How pressing an available update is for a given installed version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Urgency {
  UpToDate,
  Optional,
  /// The installed code is below the minimum supported code. The update
  /// dialog cannot be dismissed; only completing the update or quitting
  /// the app proceeds.
  Forced,
}

impl VersionDescriptor {
  pub fn urgency(&self, installed_code: i64) -> Urgency {
    if installed_code >= self.latest_version_code {
      Urgency::UpToDate
    } else if installed_code < self.min_supported_version_code {
      Urgency::Forced
    } else {
      Urgency::Optional
    }
  }

  /// Whether the update dialog is shown at all:
  /// `needs_update && (forced || optional_updates_enabled)`.
  pub fn should_prompt(
    &self,
    installed_code: i64,
    optional_updates_enabled: bool,
  ) -> bool {
    match self.urgency(installed_code) {
      Urgency::UpToDate => false,
      Urgency::Forced => true,
      Urgency::Optional => optional_updates_enabled,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn descriptor(latest: i64, min_supported: i64) -> VersionDescriptor {
    VersionDescriptor {
      latest_version_code:        latest,
      latest_version_name:        "2.0.0".into(),
      min_supported_version_code: min_supported,
      min_supported_version_name: None,
      download_url:               "https://example.com/app.apk".into(),
      release_notes:              None,
      force_update_message:       None,
      checksum_sha256:            None,
      apk_size_bytes:             1000,
    }
  }

  #[test]
  fn urgency_boundaries() {
    let d = descriptor(20000, 15000);
    assert_eq!(d.urgency(20000), Urgency::UpToDate);
    assert_eq!(d.urgency(25000), Urgency::UpToDate);
    assert_eq!(d.urgency(15000), Urgency::Optional);
    assert_eq!(d.urgency(19999), Urgency::Optional);
    assert_eq!(d.urgency(14999), Urgency::Forced);
  }

  #[test]
  fn prompt_respects_the_optional_updates_flag() {
    let d = descriptor(20000, 15000);
    assert!(d.should_prompt(16000, true));
    assert!(!d.should_prompt(16000, false));
    // Forced updates prompt regardless of the flag.
    assert!(d.should_prompt(10000, false));
    assert!(!d.should_prompt(20000, true));
  }

  #[test]
  fn wire_names_are_camel_case() {
    let json = r#"{
      "latestVersionCode": 20000,
      "latestVersionName": "2.0.0",
      "minSupportedVersionCode": 15000,
      "downloadUrl": "https://example.com/app.apk",
      "releaseNotes": "bug fixes",
      "apkSizeBytes": 123456
    }"#;
    let d: VersionDescriptor = serde_json::from_str(json).unwrap();
    assert_eq!(d.latest_version_code, 20000);
    assert_eq!(d.apk_size_bytes, 123456);
    assert_eq!(d.release_notes.as_deref(), Some("bug fixes"));
    // Optional fields default when absent.
    assert!(d.checksum_sha256.is_none());
    assert!(d.force_update_message.is_none());
    assert!(d.min_supported_version_name.is_none());
  }
}

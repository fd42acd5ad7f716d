//! The download → verify → install state machine.
//!
//! OS facilities live behind the [`PackageDownloader`] and
//! [`PackageInstaller`] seams; the flow itself is a plain event-driven
//! machine so every transition can be tested without a platform.
//!
//! Download completion and failure arrive out-of-band (the OS facility
//! notifies), so they are events here, not awaited futures. Foreground
//! regain is likewise an explicit event: install resumption is guarded by
//! the one-shot `install_launched` latch rather than a lifecycle callback.

use std::path::{Path, PathBuf};

use crate::{
  Result,
  descriptor::{Urgency, VersionDescriptor},
  error::Error,
  verify::verify_package,
};

// ─── Seams ───────────────────────────────────────────────────────────────────

/// Hands a download to the platform. Completion is reported out-of-band
/// through [`UpdateFlow::download_completed`] / `download_failed`.
pub trait PackageDownloader {
  /// Enqueue the descriptor's package; returns an opaque download id.
  fn enqueue(&mut self, descriptor: &VersionDescriptor)
  -> Result<u64, String>;
}

/// Launches the platform installer for a verified package.
pub trait PackageInstaller {
  /// Whether the install permission is currently granted.
  fn can_install(&self) -> bool;

  /// Redirect the user to grant the install permission (e.g. a settings
  /// screen). The flow resumes on [`UpdateFlow::foreground_regained`].
  fn request_permission(&mut self);

  fn launch(&mut self, package: &Path) -> Result<(), String>;
}

// ─── State ───────────────────────────────────────────────────────────────────

/// Where the update flow currently sits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateState {
  Idle,
  Checking,
  UpToDate,
  UpdateAvailable { urgency: Urgency },
  Downloading { download_id: u64 },
  Downloaded,
  Verifying,
  Verified,
  VerifyFailed { reason: String },
  /// Verified but waiting on the install permission; resumes on
  /// foreground regain.
  InstallPending,
  InstallLaunched,
}

impl UpdateState {
  fn name(&self) -> &'static str {
    match self {
      Self::Idle => "Idle",
      Self::Checking => "Checking",
      Self::UpToDate => "UpToDate",
      Self::UpdateAvailable { .. } => "UpdateAvailable",
      Self::Downloading { .. } => "Downloading",
      Self::Downloaded => "Downloaded",
      Self::Verifying => "Verifying",
      Self::Verified => "Verified",
      Self::VerifyFailed { .. } => "VerifyFailed",
      Self::InstallPending => "InstallPending",
      Self::InstallLaunched => "InstallLaunched",
    }
  }
}

// ─── Flow ────────────────────────────────────────────────────────────────────

/// Event-driven update machine. One instance per app session.
pub struct UpdateFlow<D, I> {
  downloader:       D,
  installer:        I,
  state:            UpdateState,
  descriptor:       Option<VersionDescriptor>,
  urgency:          Urgency,
  package:          Option<PathBuf>,
  /// One-shot: set the first time the installer is launched; never
  /// cleared. Blocks double-launch across foreground transitions.
  install_launched: bool,
  last_error:       Option<String>,
}

impl<D: PackageDownloader, I: PackageInstaller> UpdateFlow<D, I> {
  pub fn new(downloader: D, installer: I) -> Self {
    Self {
      downloader,
      installer,
      state: UpdateState::Idle,
      descriptor: None,
      urgency: Urgency::UpToDate,
      package: None,
      install_launched: false,
      last_error: None,
    }
  }

  pub fn state(&self) -> &UpdateState { &self.state }

  pub fn descriptor(&self) -> Option<&VersionDescriptor> {
    self.descriptor.as_ref()
  }

  /// Human-readable reason of the most recent check/download/verify
  /// failure, if any.
  pub fn last_error(&self) -> Option<&str> { self.last_error.as_deref() }

  pub fn installer(&self) -> &I { &self.installer }

  fn invalid(&self, event: &'static str) -> Error {
    Error::InvalidTransition { state: self.state.name(), event }
  }

  // ── Check ──────────────────────────────────────────────────────────────────

  pub fn check_started(&mut self) -> Result<()> {
    match self.state {
      UpdateState::Idle | UpdateState::UpToDate => {
        self.state = UpdateState::Checking;
        Ok(())
      },
      _ => Err(self.invalid("check_started")),
    }
  }

  /// Resolve the check with a fetched descriptor. Lands in
  /// `UpdateAvailable` only when the prompt would be shown; an optional
  /// update with optional prompts disabled counts as up to date.
  pub fn check_succeeded(
    &mut self,
    descriptor: VersionDescriptor,
    installed_code: i64,
    optional_updates_enabled: bool,
  ) -> Result<Urgency> {
    if self.state != UpdateState::Checking {
      return Err(self.invalid("check_succeeded"));
    }
    let urgency = descriptor.urgency(installed_code);
    let prompt =
      descriptor.should_prompt(installed_code, optional_updates_enabled);
    tracing::info!(
      installed_code,
      latest = descriptor.latest_version_code,
      ?urgency,
      prompt,
      "version check resolved"
    );
    self.descriptor = Some(descriptor);
    self.urgency = urgency;
    self.state = if prompt {
      UpdateState::UpdateAvailable { urgency }
    } else {
      UpdateState::UpToDate
    };
    Ok(urgency)
  }

  /// A failed check degrades to "no update this session".
  pub fn check_failed(&mut self, reason: impl Into<String>) -> Result<()> {
    if self.state != UpdateState::Checking {
      return Err(self.invalid("check_failed"));
    }
    let reason = reason.into();
    tracing::warn!(%reason, "version check failed");
    self.last_error = Some(reason);
    self.state = UpdateState::Idle;
    Ok(())
  }

  // ── Download ───────────────────────────────────────────────────────────────

  /// Enqueue the package download. Valid from `UpdateAvailable` and, for
  /// the re-download path, `VerifyFailed`.
  pub fn start_download(&mut self) -> Result<u64> {
    match self.state {
      UpdateState::Downloading { download_id } => {
        Err(Error::DownloadInFlight(download_id))
      },
      UpdateState::UpdateAvailable { .. } | UpdateState::VerifyFailed { .. } => {
        let descriptor = self
          .descriptor
          .as_ref()
          .ok_or_else(|| self.invalid("start_download"))?;
        let download_id = self
          .downloader
          .enqueue(descriptor)
          .map_err(Error::Platform)?;
        tracing::info!(download_id, url = %descriptor.download_url, "download enqueued");
        self.state = UpdateState::Downloading { download_id };
        Ok(download_id)
      },
      _ => Err(self.invalid("start_download")),
    }
  }

  pub fn download_completed(&mut self, package: PathBuf) -> Result<()> {
    if !matches!(self.state, UpdateState::Downloading { .. }) {
      return Err(self.invalid("download_completed"));
    }
    tracing::info!(package = %package.display(), "download completed");
    self.package = Some(package);
    self.state = UpdateState::Downloaded;
    Ok(())
  }

  /// Record the failure reason and return to `UpdateAvailable` so the
  /// user can retry.
  pub fn download_failed(&mut self, reason: impl Into<String>) -> Result<()> {
    if !matches!(self.state, UpdateState::Downloading { .. }) {
      return Err(self.invalid("download_failed"));
    }
    let reason = reason.into();
    tracing::warn!(%reason, "download failed");
    self.last_error = Some(reason);
    self.state = UpdateState::UpdateAvailable { urgency: self.urgency };
    Ok(())
  }

  // ── Verify ─────────────────────────────────────────────────────────────────

  /// Verify the downloaded package against the descriptor. A failure
  /// lands in `VerifyFailed` and is also returned; re-downloading is the
  /// only recovery, never an automatic retry.
  pub fn verify(&mut self) -> Result<()> {
    if self.state != UpdateState::Downloaded {
      return Err(self.invalid("verify"));
    }
    // Both are set before Downloaded is reachable.
    let (size, checksum) = match self.descriptor.as_ref() {
      Some(d) => (d.apk_size_bytes, d.checksum_sha256.clone()),
      None => return Err(self.invalid("verify")),
    };
    let package = match self.package.clone() {
      Some(p) => p,
      None => return Err(self.invalid("verify")),
    };

    self.state = UpdateState::Verifying;
    match verify_package(&package, size, checksum.as_deref()) {
      Ok(()) => {
        tracing::info!(package = %package.display(), "package verified");
        self.state = UpdateState::Verified;
        Ok(())
      },
      Err(err) => {
        tracing::warn!(%err, "package verification failed");
        self.last_error = Some(err.to_string());
        self.state = UpdateState::VerifyFailed { reason: err.to_string() };
        Err(err.into())
      },
    }
  }

  // ── Install ────────────────────────────────────────────────────────────────

  /// Launch the installer, or park in `InstallPending` after requesting
  /// the missing permission. Idempotent once the latch is set.
  pub fn request_install(&mut self) -> Result<()> {
    if self.state != UpdateState::Verified {
      return Err(self.invalid("request_install"));
    }
    if self.install_launched {
      self.state = UpdateState::InstallLaunched;
      return Ok(());
    }
    if self.installer.can_install() {
      self.launch_installer()
    } else {
      tracing::info!("install permission missing, redirecting");
      self.installer.request_permission();
      self.state = UpdateState::InstallPending;
      Ok(())
    }
  }

  /// The app came back to the foreground. Only `InstallPending` reacts:
  /// re-check the latch, then the permission, then launch. Everywhere
  /// else this is a no-op, so callers can fire it unconditionally.
  pub fn foreground_regained(&mut self) -> Result<()> {
    if self.state != UpdateState::InstallPending {
      return Ok(());
    }
    if self.install_launched {
      self.state = UpdateState::InstallLaunched;
      return Ok(());
    }
    if self.installer.can_install() {
      self.launch_installer()
    } else {
      // Still not granted; stay parked until the next foreground regain.
      Ok(())
    }
  }

  fn launch_installer(&mut self) -> Result<()> {
    let package = match self.package.as_ref() {
      Some(p) => p,
      None => return Err(self.invalid("launch")),
    };
    self.installer.launch(package).map_err(Error::Platform)?;
    tracing::info!(package = %package.display(), "installer launched");
    self.install_launched = true;
    self.state = UpdateState::InstallLaunched;
    Ok(())
  }

  // ── Dismissal ──────────────────────────────────────────────────────────────

  /// Dismiss the update prompt. Returns `false` — and changes nothing —
  /// when the update is forced: the only escape from a forced update is
  /// completing it or quitting the app.
  pub fn dismiss(&mut self) -> bool {
    match &self.state {
      UpdateState::UpdateAvailable { urgency: Urgency::Forced } => false,
      UpdateState::UpdateAvailable { .. }
      | UpdateState::UpToDate
      | UpdateState::VerifyFailed { .. } => {
        self.state = UpdateState::Idle;
        true
      },
      _ => false,
    }
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use std::io::Write;

  use sha2::{Digest, Sha256};

  use super::*;

  struct StubDownloader {
    next_id: u64,
    fail:    bool,
  }

  impl StubDownloader {
    fn new() -> Self { Self { next_id: 0, fail: false } }
  }

  impl PackageDownloader for StubDownloader {
    fn enqueue(
      &mut self,
      _descriptor: &VersionDescriptor,
    ) -> Result<u64, String> {
      if self.fail {
        return Err("queue unavailable".into());
      }
      self.next_id += 1;
      Ok(self.next_id)
    }
  }

  struct StubInstaller {
    permitted:           bool,
    permission_requests: usize,
    launches:            usize,
  }

  impl StubInstaller {
    fn new(permitted: bool) -> Self {
      Self { permitted, permission_requests: 0, launches: 0 }
    }
  }

  impl PackageInstaller for StubInstaller {
    fn can_install(&self) -> bool { self.permitted }

    fn request_permission(&mut self) { self.permission_requests += 1; }

    fn launch(&mut self, _package: &Path) -> Result<(), String> {
      self.launches += 1;
      Ok(())
    }
  }

  fn descriptor(
    latest: i64,
    min_supported: i64,
    size: u64,
    checksum: Option<String>,
  ) -> VersionDescriptor {
    VersionDescriptor {
      latest_version_code:        latest,
      latest_version_name:        "2.0.0".into(),
      min_supported_version_code: min_supported,
      min_supported_version_name: None,
      download_url:               "https://example.com/app.apk".into(),
      release_notes:              None,
      force_update_message:       None,
      checksum_sha256:            checksum,
      apk_size_bytes:             size,
    }
  }

  fn package(bytes: &[u8]) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(bytes).expect("write package");
    file
  }

  fn flow(permitted: bool) -> UpdateFlow<StubDownloader, StubInstaller> {
    UpdateFlow::new(StubDownloader::new(), StubInstaller::new(permitted))
  }

  #[test]
  fn happy_path_from_check_to_install() {
    let bytes = b"the update package";
    let file = package(bytes);
    let sum = hex::encode(Sha256::digest(bytes));
    let d = descriptor(20000, 10000, bytes.len() as u64, Some(sum));

    let mut f = flow(true);
    f.check_started().unwrap();
    let urgency = f.check_succeeded(d, 15000, true).unwrap();
    assert_eq!(urgency, Urgency::Optional);
    assert_eq!(
      *f.state(),
      UpdateState::UpdateAvailable { urgency: Urgency::Optional }
    );

    let id = f.start_download().unwrap();
    assert_eq!(*f.state(), UpdateState::Downloading { download_id: id });

    f.download_completed(file.path().to_path_buf()).unwrap();
    f.verify().unwrap();
    assert_eq!(*f.state(), UpdateState::Verified);

    f.request_install().unwrap();
    assert_eq!(*f.state(), UpdateState::InstallLaunched);
    assert_eq!(f.installer().launches, 1);
  }

  #[test]
  fn check_failure_degrades_to_idle() {
    let mut f = flow(true);
    f.check_started().unwrap();
    f.check_failed("connect timeout").unwrap();
    assert_eq!(*f.state(), UpdateState::Idle);
    assert_eq!(f.last_error(), Some("connect timeout"));
  }

  #[test]
  fn up_to_date_and_suppressed_optional_updates() {
    let mut f = flow(true);
    f.check_started().unwrap();
    let u = f
      .check_succeeded(descriptor(20000, 10000, 1, None), 20000, true)
      .unwrap();
    assert_eq!(u, Urgency::UpToDate);
    assert_eq!(*f.state(), UpdateState::UpToDate);

    // Optional update with optional prompts disabled is not surfaced.
    f.check_started().unwrap();
    let u = f
      .check_succeeded(descriptor(30000, 10000, 1, None), 20000, false)
      .unwrap();
    assert_eq!(u, Urgency::Optional);
    assert_eq!(*f.state(), UpdateState::UpToDate);
  }

  #[test]
  fn forced_update_cannot_be_dismissed() {
    let mut f = flow(true);
    f.check_started().unwrap();
    f.check_succeeded(descriptor(20000, 18000, 1, None), 15000, false)
      .unwrap();
    assert_eq!(
      *f.state(),
      UpdateState::UpdateAvailable { urgency: Urgency::Forced }
    );

    assert!(!f.dismiss());
    assert_eq!(
      *f.state(),
      UpdateState::UpdateAvailable { urgency: Urgency::Forced }
    );
  }

  #[test]
  fn optional_update_dismisses_to_idle() {
    let mut f = flow(true);
    f.check_started().unwrap();
    f.check_succeeded(descriptor(20000, 10000, 1, None), 15000, true)
      .unwrap();
    assert!(f.dismiss());
    assert_eq!(*f.state(), UpdateState::Idle);
  }

  #[test]
  fn second_download_request_is_rejected_while_one_is_in_flight() {
    let mut f = flow(true);
    f.check_started().unwrap();
    f.check_succeeded(descriptor(20000, 10000, 1, None), 15000, true)
      .unwrap();

    let id = f.start_download().unwrap();
    let err = f.start_download().unwrap_err();
    assert!(matches!(err, Error::DownloadInFlight(i) if i == id));
    assert_eq!(*f.state(), UpdateState::Downloading { download_id: id });
  }

  #[test]
  fn download_failure_returns_to_available_and_permits_retry() {
    let mut f = flow(true);
    f.check_started().unwrap();
    f.check_succeeded(descriptor(20000, 10000, 1, None), 15000, true)
      .unwrap();

    f.start_download().unwrap();
    f.download_failed("no space left").unwrap();
    assert_eq!(
      *f.state(),
      UpdateState::UpdateAvailable { urgency: Urgency::Optional }
    );
    assert_eq!(f.last_error(), Some("no space left"));

    // Retry gets a fresh download id.
    let id = f.start_download().unwrap();
    assert_eq!(id, 2);
  }

  #[test]
  fn verify_failure_lands_in_verify_failed_and_allows_redownload() {
    let file = package(&[0u8; 999]);
    let d = descriptor(20000, 10000, 1000, None);

    let mut f = flow(true);
    f.check_started().unwrap();
    f.check_succeeded(d, 15000, true).unwrap();
    f.start_download().unwrap();
    f.download_completed(file.path().to_path_buf()).unwrap();

    let err = f.verify().unwrap_err();
    assert!(matches!(err, Error::Verify(_)));
    assert!(
      matches!(f.state(), UpdateState::VerifyFailed { reason } if reason.contains("size"))
    );

    // The only recovery is another download.
    f.start_download().unwrap();
    assert!(matches!(f.state(), UpdateState::Downloading { .. }));
  }

  #[test]
  fn missing_permission_parks_and_resumes_on_foreground() {
    let bytes = b"pkg";
    let file = package(bytes);
    let d = descriptor(20000, 10000, bytes.len() as u64, None);

    let mut f = flow(false);
    f.check_started().unwrap();
    f.check_succeeded(d, 15000, true).unwrap();
    f.start_download().unwrap();
    f.download_completed(file.path().to_path_buf()).unwrap();
    f.verify().unwrap();

    f.request_install().unwrap();
    assert_eq!(*f.state(), UpdateState::InstallPending);
    assert_eq!(f.installer().permission_requests, 1);
    assert_eq!(f.installer().launches, 0);

    // Still not granted: stays parked.
    f.foreground_regained().unwrap();
    assert_eq!(*f.state(), UpdateState::InstallPending);

    // Granted while backgrounded; the next regain launches exactly once.
    f.installer.permitted = true;
    f.foreground_regained().unwrap();
    assert_eq!(*f.state(), UpdateState::InstallLaunched);
    assert_eq!(f.installer().launches, 1);

    // Latch: further regains never relaunch.
    f.foreground_regained().unwrap();
    assert_eq!(f.installer().launches, 1);
  }

  #[test]
  fn foreground_regain_is_a_no_op_outside_install_pending() {
    let mut f = flow(true);
    f.foreground_regained().unwrap();
    assert_eq!(*f.state(), UpdateState::Idle);

    f.check_started().unwrap();
    f.foreground_regained().unwrap();
    assert_eq!(*f.state(), UpdateState::Checking);
  }

  #[test]
  fn downloader_failure_surfaces_and_state_is_unchanged() {
    let mut f = flow(true);
    f.check_started().unwrap();
    f.check_succeeded(descriptor(20000, 10000, 1, None), 15000, true)
      .unwrap();
    f.downloader.fail = true;

    let err = f.start_download().unwrap_err();
    assert!(matches!(err, Error::Platform(_)));
    assert!(matches!(f.state(), UpdateState::UpdateAvailable { .. }));
  }

  #[test]
  fn events_out_of_order_are_typed_errors() {
    let mut f = flow(true);
    assert!(matches!(
      f.start_download().unwrap_err(),
      Error::InvalidTransition { .. }
    ));
    assert!(matches!(
      f.verify().unwrap_err(),
      Error::InvalidTransition { .. }
    ));
    assert!(matches!(
      f.download_completed(PathBuf::from("/tmp/x")).unwrap_err(),
      Error::InvalidTransition { .. }
    ));
  }
}

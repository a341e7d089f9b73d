// Account provisioning workflow
//
// Sign-in: record lookup -> credential verification -> session markers.
// Sign-up: credential -> record -> image uploads, reported per UploadPolicy.

use bytes::Bytes;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::{debug, info, warn, Instrument};

use super::errors::AuthError;
use super::traits::{BlobStore, CredentialService, SessionStore, UserRecordStore};
use super::types::{session_keys, session_markers, SignUpRequest, UploadPolicy, UserProfile};
use crate::config::ProvisioningConfig;
use crate::observability::{provisioning_metrics, OperationTimer};
use crate::telemetry::{create_provisioning_span, generate_correlation_id};

/// Outcome delivered on the sign-up completion channel
pub type SignUpReport = Result<UserProfile, AuthError>;

/// Orchestrates identity creation and sign-in across the credential
/// service, the user record store and the blob store.
///
/// Cloning is cheap; clones share collaborators and in-flight bookkeeping.
#[derive(Clone)]
pub struct AccountProvisioningWorkflow {
    credentials: Arc<dyn CredentialService>,
    records: Arc<dyn UserRecordStore>,
    blobs: Arc<dyn BlobStore>,
    session: Arc<dyn SessionStore>,
    settings: ProvisioningConfig,
    in_flight: InFlightSignUps,
}

impl AccountProvisioningWorkflow {
    pub fn new(
        credentials: Arc<dyn CredentialService>,
        records: Arc<dyn UserRecordStore>,
        blobs: Arc<dyn BlobStore>,
        session: Arc<dyn SessionStore>,
        settings: ProvisioningConfig,
    ) -> Self {
        Self {
            credentials,
            records,
            blobs,
            session,
            settings,
            in_flight: InFlightSignUps::default(),
        }
    }

    pub fn settings(&self) -> &ProvisioningConfig {
        &self.settings
    }

    /// Whether the credential service holds an active session right now
    pub async fn is_signed_in(&self) -> bool {
        self.credentials.current_session().await.is_some()
    }

    pub async fn is_signed_out(&self) -> bool {
        self.credentials.current_session().await.is_none()
    }

    /// Sign in an existing user.
    ///
    /// The record is looked up first; without one the credential service is
    /// never consulted. Session markers are written only after both steps
    /// succeed, and either all four are written or none are.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<UserProfile, AuthError> {
        let correlation_id = generate_correlation_id();
        let span = create_provisioning_span("sign_in", email, &correlation_id);

        async {
            let timer = OperationTimer::new("sign_in");
            let metrics = provisioning_metrics();
            metrics.record_sign_in_attempt();

            let result = self.sign_in_steps(email, password).await;
            if result.is_err() {
                metrics.record_sign_in_failure();
            }
            timer.finish();
            result
        }
        .instrument(span)
        .await
    }

    async fn sign_in_steps(&self, email: &str, password: &str) -> Result<UserProfile, AuthError> {
        let profile = match self.records.find_by_email(email).await {
            Ok(Some(profile)) => profile,
            Ok(None) => {
                info!("No user record for email, rejecting sign in");
                return Err(AuthError::SignInFailed);
            }
            Err(e) => {
                warn!(error = %e, "User record lookup failed");
                return Err(AuthError::SignInFailed);
            }
        };

        match self.credentials.verify_credential(email, password).await {
            Ok(Some(_receipt)) => {}
            Ok(None) => {
                info!("Credential verification rejected");
                return Err(AuthError::SignInFailed);
            }
            Err(e) => {
                warn!(error = %e, "Credential verification failed");
                return Err(AuthError::SignInFailed);
            }
        }

        if let Err(e) = self.write_session_markers(&profile).await {
            // Verification opened a session; a failed sign-in must not leave it active
            if let Err(end) = self.credentials.end_session().await {
                warn!(error = %end, "Failed to end session after marker write failure");
            }
            return Err(e);
        }
        info!(username = %profile.username, "User signed in");
        Ok(profile)
    }

    async fn write_session_markers(&self, profile: &UserProfile) -> Result<(), AuthError> {
        let markers = session_markers(profile);
        for (written, (key, value)) in markers.iter().enumerate() {
            if let Err(e) = self.session.set(key, value).await {
                warn!(key = %key, error = %e, "Failed to write session marker");
                for (stale, _) in &markers[..written] {
                    if let Err(e) = self.session.remove(stale).await {
                        warn!(key = %stale, error = %e, "Failed to remove partial session marker");
                    }
                }
                return Err(AuthError::SignInFailed);
            }
        }
        Ok(())
    }

    /// End the active session. Error detail is logged, never returned.
    pub async fn sign_out(&self) -> bool {
        let correlation_id = generate_correlation_id();
        let span = create_provisioning_span("sign_out", "", &correlation_id);

        async {
            match self.credentials.end_session().await {
                Ok(()) => {
                    provisioning_metrics().record_sign_out();
                    if self.settings.clear_session_on_sign_out {
                        self.clear_session_markers().await;
                    }
                    info!("User signed out");
                    true
                }
                Err(e) => {
                    warn!(error = %e, "Sign out failed");
                    false
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn clear_session_markers(&self) {
        for key in session_keys::ALL {
            if let Err(e) = self.session.remove(key).await {
                warn!(key = %key, error = %e, "Failed to clear session marker");
            }
        }
    }

    /// Create a new account and return the first completion report.
    ///
    /// Under `UploadPolicy::Independent` a coach sign-up can produce two
    /// reports; use [`Self::sign_up_reports`] to observe all of them.
    pub async fn sign_up(&self, request: SignUpRequest) -> SignUpReport {
        let (completion, mut reports) = Completion::channel();
        self.provision(request, &completion).await;
        drop(completion);
        reports.recv().await.unwrap_or(Err(AuthError::NewUserCreation))
    }

    /// Start a sign-up in the background and hand back its completion
    /// channel. The channel closes once every upload has reported.
    ///
    /// # Panics
    ///
    /// The sign-up is spawned with `tokio::spawn`, so this must be called
    /// from within a Tokio runtime.
    pub fn sign_up_reports(&self, request: SignUpRequest) -> mpsc::UnboundedReceiver<SignUpReport> {
        let (completion, reports) = Completion::channel();
        let workflow = self.clone();
        tokio::spawn(async move {
            workflow.provision(request, &completion).await;
        });
        reports
    }

    async fn provision(&self, request: SignUpRequest, completion: &Completion) {
        let correlation_id = generate_correlation_id();
        let span = create_provisioning_span("sign_up", &request.email, &correlation_id);

        async {
            let timer = OperationTimer::new("sign_up");
            provisioning_metrics().record_sign_up_attempt();
            self.provision_steps(request, completion).await;
            timer.finish();
        }
        .instrument(span)
        .await
    }

    async fn provision_steps(&self, request: SignUpRequest, completion: &Completion) {
        let Some(_claim) = self.in_flight.claim(&request.email) else {
            warn!("Sign up already in progress for this email");
            completion.report(Err(AuthError::NewUserCreation));
            return;
        };

        let SignUpRequest {
            email,
            username,
            password,
            player_type,
            player_level,
            profile_picture,
            certificate_picture,
        } = request;

        let profile = UserProfile::for_sign_up(&username, &email, player_type, &player_level);

        if let Err(e) = self.credentials.create_credential(&email, &password).await {
            warn!(error = %e, "Credential creation failed");
            completion.report(Err(AuthError::NewUserCreation));
            return;
        }
        debug!("Credential created");

        let created = match self.records.create(&profile).await {
            Ok(created) => created,
            Err(e) => {
                warn!(error = %e, "User record creation failed");
                false
            }
        };
        if !created {
            warn!(username = %profile.username, "User record was not created");
            self.compensate_credential(&email).await;
            completion.report(Err(AuthError::NewUserCreation));
            return;
        }
        debug!("User record created");

        self.upload_images(&profile, profile_picture, certificate_picture, completion)
            .await;
    }

    async fn compensate_credential(&self, email: &str) {
        if !self.settings.rollback_orphaned_credentials {
            warn!("Leaving credential without a user record");
            return;
        }
        provisioning_metrics().record_compensation();
        match self.credentials.delete_credential(email).await {
            Ok(()) => info!("Removed credential left without a user record"),
            Err(e) => warn!(error = %e, "Failed to remove orphaned credential"),
        }
    }

    async fn upload_images(
        &self,
        profile: &UserProfile,
        profile_picture: Option<Bytes>,
        certificate_picture: Option<Bytes>,
        completion: &Completion,
    ) {
        let coach = profile.player_type.is_coach();

        match self.settings.upload_policy {
            UploadPolicy::Sequential => {
                let mut uploaded = self.upload_profile_picture(profile, profile_picture).await;
                if uploaded && coach {
                    uploaded = self
                        .upload_certificate_picture(profile, certificate_picture)
                        .await;
                }
                completion.report_upload(profile, uploaded);
            }
            UploadPolicy::Concurrent => {
                let uploaded = if coach {
                    let (picture, certificate) = tokio::join!(
                        self.upload_profile_picture(profile, profile_picture),
                        self.upload_certificate_picture(profile, certificate_picture),
                    );
                    picture && certificate
                } else {
                    self.upload_profile_picture(profile, profile_picture).await
                };
                completion.report_upload(profile, uploaded);
            }
            UploadPolicy::Independent => {
                let picture = async {
                    let uploaded = self.upload_profile_picture(profile, profile_picture).await;
                    completion.report_upload(profile, uploaded);
                };
                if coach {
                    let certificate = async {
                        let uploaded = self
                            .upload_certificate_picture(profile, certificate_picture)
                            .await;
                        completion.report_upload(profile, uploaded);
                    };
                    tokio::join!(picture, certificate);
                } else {
                    picture.await;
                }
            }
        }
    }

    async fn upload_profile_picture(&self, profile: &UserProfile, data: Option<Bytes>) -> bool {
        let outcome = self.blobs.upload_profile_image(&profile.username, data).await;
        upload_succeeded("profile", outcome)
    }

    async fn upload_certificate_picture(&self, profile: &UserProfile, data: Option<Bytes>) -> bool {
        let outcome = self
            .blobs
            .upload_certificate_image(&profile.username, data)
            .await;
        upload_succeeded("certificate", outcome)
    }
}

fn upload_succeeded(kind: &str, outcome: Result<bool, super::errors::StoreError>) -> bool {
    match outcome {
        Ok(true) => {
            debug!(kind, "Image uploaded");
            true
        }
        Ok(false) => {
            warn!(kind, "Image upload rejected");
            provisioning_metrics().record_upload_failure();
            false
        }
        Err(e) => {
            warn!(kind, error = %e, "Image upload failed");
            provisioning_metrics().record_upload_failure();
            false
        }
    }
}

/// Sending half of the sign-up completion channel
struct Completion {
    sender: mpsc::UnboundedSender<SignUpReport>,
}

impl Completion {
    fn channel() -> (Self, mpsc::UnboundedReceiver<SignUpReport>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    fn report(&self, report: SignUpReport) {
        match &report {
            Ok(profile) => info!(username = %profile.username, "Sign up completed"),
            Err(_) => provisioning_metrics().record_sign_up_failure(),
        }
        if self.sender.send(report).is_err() {
            debug!("Sign up completion receiver dropped");
        }
    }

    fn report_upload(&self, profile: &UserProfile, uploaded: bool) {
        if uploaded {
            self.report(Ok(profile.clone()));
        } else {
            self.report(Err(AuthError::NewUserCreation));
        }
    }
}

/// Emails with a sign-up currently running
#[derive(Clone, Default)]
struct InFlightSignUps {
    emails: Arc<Mutex<HashSet<String>>>,
}

impl InFlightSignUps {
    fn claim(&self, email: &str) -> Option<InFlightClaim> {
        let mut emails = self.emails.lock().unwrap_or_else(|p| p.into_inner());
        if !emails.insert(email.to_string()) {
            return None;
        }
        Some(InFlightClaim {
            emails: Arc::clone(&self.emails),
            email: email.to_string(),
        })
    }
}

struct InFlightClaim {
    emails: Arc<Mutex<HashSet<String>>>,
    email: String,
}

impl Drop for InFlightClaim {
    fn drop(&mut self) {
        let mut emails = self.emails.lock().unwrap_or_else(|p| p.into_inner());
        emails.remove(&self.email);
    }
}

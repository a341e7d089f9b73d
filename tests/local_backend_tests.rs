//! Integration tests for the directory-backed backend
//!
//! Each test gets its own temporary data directory and drives the workflow
//! through separate backend instances to check that state is persisted.

use bytes::Bytes;
use smooth_tennis::accounts::{session_keys, CredentialService, SessionStore, UserRecordStore};
use smooth_tennis::backends::{local_workflow, profile_image_path, HashStrength, LocalBackend};
use smooth_tennis::{AuthError, PlayerType, ProvisioningConfig, SignUpRequest};
use std::sync::Arc;
use tempfile::TempDir;

fn backend(dir: &TempDir) -> Arc<LocalBackend> {
    Arc::new(LocalBackend::new(dir.path()).with_hash_strength(HashStrength::Minimal))
}

#[tokio::test]
async fn accounts_persist_across_backend_instances() {
    let dir = tempfile::tempdir().unwrap();

    {
        let workflow = local_workflow(backend(&dir), ProvisioningConfig::default());
        let request = SignUpRequest::new("coach@x.com", "coachcarter", "pw", PlayerType::Coach)
            .with_profile_picture(Bytes::from_static(b"coach.png"))
            .with_certificate_picture(Bytes::from_static(b"cert.png"));
        workflow.sign_up(request).await.unwrap();
        assert!(workflow.sign_out().await);
    }

    let reopened = backend(&dir);
    let record = reopened.find_by_email("coach@x.com").await.unwrap().unwrap();
    assert_eq!(record.player_type, PlayerType::Coach);
    assert_eq!(record.top_comments, 0);
    assert!(reopened.current_session().await.is_none());

    let picture = std::fs::read(dir.path().join(profile_image_path("coachcarter"))).unwrap();
    assert_eq!(picture, b"coach.png");
    assert!(dir
        .path()
        .join("certificate_pictures/coachcarter/certificate.png")
        .exists());

    let workflow = local_workflow(Arc::clone(&reopened), ProvisioningConfig::default());
    let profile = workflow.sign_in("coach@x.com", "pw").await.unwrap();
    assert_eq!(profile, record);
    assert_eq!(
        reopened.get(session_keys::USERNAME).await.unwrap().as_deref(),
        Some("coachcarter")
    );
    assert_eq!(
        reopened.get(session_keys::PLAYER_LEVEL).await.unwrap().as_deref(),
        Some("")
    );
}

#[tokio::test]
async fn wrong_password_leaves_no_session_file() {
    let dir = tempfile::tempdir().unwrap();
    let backend = backend(&dir);
    let workflow = local_workflow(Arc::clone(&backend), ProvisioningConfig::default());

    workflow
        .sign_up(SignUpRequest::new("a@x.com", "alice", "pw", "Player").with_player_level("3.5"))
        .await
        .unwrap();
    assert!(workflow.sign_out().await);

    assert_eq!(
        workflow.sign_in("a@x.com", "nope").await,
        Err(AuthError::SignInFailed)
    );
    assert!(!dir.path().join("session.json").exists());
    assert!(!dir.path().join("markers.json").exists());
}

#[tokio::test]
async fn username_clash_removes_the_new_credential_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let backend = backend(&dir);
    let workflow = local_workflow(Arc::clone(&backend), ProvisioningConfig::default());

    workflow
        .sign_up(SignUpRequest::new("a@x.com", "alice", "pw", "Player"))
        .await
        .unwrap();
    let clash = workflow
        .sign_up(SignUpRequest::new("b@x.com", "alice", "pw", "Player"))
        .await;
    assert_eq!(clash, Err(AuthError::NewUserCreation));

    let credentials = std::fs::read_to_string(dir.path().join("credentials.json")).unwrap();
    assert!(credentials.contains("a@x.com"));
    assert!(!credentials.contains("b@x.com"));
    assert!(!credentials.contains("\"pw\""), "only hashes are stored");
}

#[tokio::test]
async fn username_with_path_components_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("data");
    let backend = Arc::new(LocalBackend::new(&data).with_hash_strength(HashStrength::Minimal));
    let workflow = local_workflow(Arc::clone(&backend), ProvisioningConfig::default());

    let request = SignUpRequest::new("x@x.com", "../../escaped", "pw", "Player")
        .with_profile_picture(Bytes::from_static(b"img"));
    assert_eq!(
        workflow.sign_up(request).await,
        Err(AuthError::NewUserCreation)
    );

    assert!(!dir.path().join("escaped").exists());
    assert!(!dir.path().parent().unwrap().join("escaped").exists());
    assert!(backend.find_by_email("x@x.com").await.unwrap().is_none());
    let credentials = std::fs::read_to_string(data.join("credentials.json")).unwrap();
    assert!(!credentials.contains("x@x.com"));
}

#[tokio::test]
async fn saved_state_leaves_no_staging_files() {
    let dir = tempfile::tempdir().unwrap();
    let workflow = local_workflow(backend(&dir), ProvisioningConfig::default());

    workflow
        .sign_up(SignUpRequest::new("a@x.com", "alice", "pw", "Player"))
        .await
        .unwrap();
    workflow.sign_in("a@x.com", "pw").await.unwrap();

    let leftovers: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_name().to_string_lossy().ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty(), "{leftovers:?}");
    assert!(dir.path().join("records.json").exists());
    assert!(dir.path().join("markers.json").exists());
}

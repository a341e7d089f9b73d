// Core types for account provisioning

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of account. Stored as its plain string form so unknown kinds survive
/// a round trip through the record store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PlayerType {
    Coach,
    Player,
    Other(String),
}

impl PlayerType {
    pub fn as_str(&self) -> &str {
        match self {
            PlayerType::Coach => "Coach",
            PlayerType::Player => "Player",
            PlayerType::Other(kind) => kind,
        }
    }

    pub fn is_coach(&self) -> bool {
        matches!(self, PlayerType::Coach)
    }
}

impl From<String> for PlayerType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Coach" => PlayerType::Coach,
            "Player" => PlayerType::Player,
            _ => PlayerType::Other(value),
        }
    }
}

impl From<&str> for PlayerType {
    fn from(value: &str) -> Self {
        PlayerType::from(value.to_string())
    }
}

impl From<PlayerType> for String {
    fn from(value: PlayerType) -> Self {
        match value {
            PlayerType::Other(kind) => kind,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for PlayerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Top-comment counter value for accounts where the counter does not apply.
pub const TOP_COMMENTS_NOT_APPLICABLE: i64 = -1;

/// Profile record as held by the user record store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub username: String,
    pub email: String,
    pub player_type: PlayerType,
    pub player_level: String,
    pub top_comments: i64,
}

impl UserProfile {
    /// Build the profile for a new account. Coaches carry no level and start
    /// their counter at zero; everyone else keeps the supplied level and the
    /// not-applicable sentinel.
    pub fn for_sign_up(
        username: &str,
        email: &str,
        player_type: PlayerType,
        player_level: &str,
    ) -> Self {
        if player_type.is_coach() {
            Self {
                username: username.to_string(),
                email: email.to_string(),
                player_type,
                player_level: String::new(),
                top_comments: 0,
            }
        } else {
            Self {
                username: username.to_string(),
                email: email.to_string(),
                player_type,
                player_level: player_level.to_string(),
                top_comments: TOP_COMMENTS_NOT_APPLICABLE,
            }
        }
    }
}

/// Input for a sign-up
#[derive(Debug, Clone)]
pub struct SignUpRequest {
    pub email: String,
    pub username: String,
    pub password: String,
    pub player_type: PlayerType,
    pub player_level: String,
    pub profile_picture: Option<Bytes>,
    pub certificate_picture: Option<Bytes>,
}

impl SignUpRequest {
    pub fn new(
        email: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        player_type: impl Into<PlayerType>,
    ) -> Self {
        Self {
            email: email.into(),
            username: username.into(),
            password: password.into(),
            player_type: player_type.into(),
            player_level: String::new(),
            profile_picture: None,
            certificate_picture: None,
        }
    }

    pub fn with_player_level(mut self, level: impl Into<String>) -> Self {
        self.player_level = level.into();
        self
    }

    pub fn with_profile_picture(mut self, data: impl Into<Bytes>) -> Self {
        self.profile_picture = Some(data.into());
        self
    }

    pub fn with_certificate_picture(mut self, data: impl Into<Bytes>) -> Self {
        self.certificate_picture = Some(data.into());
        self
    }
}

/// Opaque proof returned by the credential service for a created or
/// verified identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialReceipt {
    pub uid: String,
    pub email: String,
}

/// Identity behind the currently active credential session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionIdentity {
    pub uid: String,
    pub email: String,
}

/// Keys of the display fields cached locally after a successful sign-in
pub mod session_keys {
    pub const USERNAME: &str = "username";
    pub const EMAIL: &str = "email";
    pub const PLAYER_TYPE: &str = "playerType";
    pub const PLAYER_LEVEL: &str = "playerLevel";

    pub const ALL: [&str; 4] = [USERNAME, EMAIL, PLAYER_TYPE, PLAYER_LEVEL];
}

/// The four session markers derived from a profile, in write order
pub fn session_markers(profile: &UserProfile) -> [(&'static str, String); 4] {
    [
        (session_keys::USERNAME, profile.username.clone()),
        (session_keys::EMAIL, profile.email.clone()),
        (session_keys::PLAYER_TYPE, profile.player_type.to_string()),
        (session_keys::PLAYER_LEVEL, profile.player_level.clone()),
    ]
}

/// How the image uploads at the end of a sign-up are scheduled and reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadPolicy {
    /// Profile image first, then the certificate; one joined completion
    #[default]
    Sequential,
    /// Both uploads at once; one joined completion
    Concurrent,
    /// Each upload reports on its own, so a coach sign-up can complete twice
    Independent,
}

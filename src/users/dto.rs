use serde::{Deserialize, Serialize};

use crate::users::repo_types::Subscription;

/// Request body for user registration.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub subscription: Option<Subscription>,
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Request body for resending the verification email.
#[derive(Debug, Deserialize)]
pub struct ResendVerificationRequest {
    pub email: String,
}

/// Public part of a freshly registered user.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub email: String,
    #[serde(rename = "avatarURL")]
    pub avatar_url: String,
    pub subscription: Subscription,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user: PublicUser,
}

/// User fields echoed back with a session token.
#[derive(Debug, Serialize)]
pub struct SessionUser {
    pub email: String,
    pub subscription: Subscription,
}

/// Response returned after login.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: SessionUser,
}

/// Response for the authenticated profile read.
#[derive(Debug, Serialize)]
pub struct CurrentResponse {
    pub email: String,
    pub subscription: Subscription,
    #[serde(rename = "avatarURL")]
    pub avatar_url: String,
}

#[derive(Debug, Serialize)]
pub struct AvatarResponse {
    #[serde(rename = "avatarURL")]
    pub avatar_url: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[cfg(test)]
mod dto_tests {
    use super::*;

    #[test]
    fn public_user_uses_avatar_url_key() {
        let json = serde_json::to_string(&PublicUser {
            email: "alice@example.com".into(),
            avatar_url: "https://www.gravatar.com/avatar/abc".into(),
            subscription: Subscription::Starter,
        })
        .unwrap();
        assert!(json.contains("\"avatarURL\""));
        assert!(json.contains("\"subscription\":\"starter\""));
    }

    #[test]
    fn login_response_shape() {
        let json = serde_json::to_string(&LoginResponse {
            token: "jwt".into(),
            user: SessionUser {
                email: "alice@example.com".into(),
                subscription: Subscription::Pro,
            },
        })
        .unwrap();
        assert!(json.contains("\"token\":\"jwt\""));
        assert!(json.contains("\"subscription\":\"pro\""));
        assert!(!json.contains("avatarURL"));
    }
}

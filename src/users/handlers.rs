use axum::{
    extract::{DefaultBodyLimit, FromRef, Multipart, Path, State},
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use bytes::Bytes;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{
        extractors::CurrentUser,
        jwt::JwtKeys,
        password::{hash_password, verify_password},
    },
    images::{ext_from_mime, process_avatar},
    state::AppState,
    users::{
        dto::{
            AvatarResponse, CurrentResponse, LoginRequest, LoginResponse, MessageResponse,
            PublicUser, RegisterRequest, RegisterResponse, ResendVerificationRequest, SessionUser,
        },
        repo_types::User,
        services::{
            default_avatar_url, is_valid_email, new_verification_token, verification_email,
            MIN_PASSWORD_LEN,
        },
    },
};

pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/verify/:verification_token", get(verify))
        .route("/verify", post(resend_verification))
}

pub fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/current", get(get_current))
        .route("/logout", post(logout))
        .route("/avatar", patch(change_avatar))
        .layer(DefaultBodyLimit::max(5 * 1024 * 1024)) // 5MB avatar uploads
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), (StatusCode, String)> {
    payload.email = payload.email.trim().to_lowercase();

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err((StatusCode::BAD_REQUEST, "Invalid email".into()));
    }

    if payload.password.len() < MIN_PASSWORD_LEN {
        warn!("password too short");
        return Err((StatusCode::BAD_REQUEST, "Password too short".into()));
    }

    // Ensure email is not taken
    match User::find_by_email(&state.db, &payload.email).await {
        Ok(Some(_)) => {
            warn!(email = %payload.email, "email already registered");
            return Err((StatusCode::CONFLICT, "Email in use".into()));
        }
        Ok(None) => {}
        Err(e) => {
            error!(error = %e, "find_by_email failed");
            return Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()));
        }
    }

    let hash = match hash_password(&payload.password) {
        Ok(h) => h,
        Err(e) => {
            error!(error = %e, "hash_password failed");
            return Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()));
        }
    };

    let avatar_url = default_avatar_url(&payload.email);
    let verification_token = new_verification_token();

    let user = match User::create(
        &state.db,
        &payload.email,
        &hash,
        &avatar_url,
        payload.subscription.unwrap_or_default(),
        &verification_token,
    )
    .await
    {
        Ok(u) => u,
        Err(e) => {
            error!(error = %e, "create user failed");
            return Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()));
        }
    };

    let (subject, html) = verification_email(&state.config.base_url, &verification_token);
    if let Err(e) = state.mailer.send(&user.email, &subject, &html).await {
        // No half-registered accounts: drop the row so the client can retry
        // registration from scratch.
        error!(error = %e, user_id = %user.id, "verification email failed, rolling back registration");
        if let Err(del) = User::delete(&state.db, user.id).await {
            error!(error = %del, user_id = %user.id, "rollback delete failed");
        }
        return Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to send verification email".into(),
        ));
    }

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user: PublicUser {
                email: user.email,
                avatar_url: user.avatar_url,
                subscription: user.subscription,
            },
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, (StatusCode, String)> {
    payload.email = payload.email.trim().to_lowercase();

    let user = match User::find_by_email(&state.db, &payload.email).await {
        Ok(Some(u)) => u,
        Ok(None) => {
            warn!(email = %payload.email, "login unknown email");
            return Err((StatusCode::UNAUTHORIZED, "Email or password is wrong".into()));
        }
        Err(e) => {
            error!(error = %e, "find_by_email failed");
            return Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()));
        }
    };

    if !user.verified {
        warn!(email = %payload.email, user_id = %user.id, "login before verification");
        return Err((StatusCode::UNAUTHORIZED, "Email not verified".into()));
    }

    let ok = match verify_password(&payload.password, &user.password_hash) {
        Ok(v) => v,
        Err(e) => {
            error!(error = %e, "verify_password failed");
            return Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()));
        }
    };

    if !ok {
        warn!(email = %payload.email, user_id = %user.id, "login invalid password");
        return Err((StatusCode::UNAUTHORIZED, "Email or password is wrong".into()));
    }

    let keys = JwtKeys::from_ref(&state);
    let token = match keys.sign(user.id) {
        Ok(t) => t,
        Err(e) => {
            error!(error = %e, "jwt sign failed");
            return Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()));
        }
    };

    // Persist the token so logout can invalidate it later.
    match User::set_session_token(&state.db, user.id, Some(token.as_str())).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            error!(user_id = %user.id, "user vanished while logging in");
            return Err((StatusCode::INTERNAL_SERVER_ERROR, "User not found".into()));
        }
        Err(e) => {
            error!(error = %e, "persist session token failed");
            return Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()));
        }
    }

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(Json(LoginResponse {
        token,
        user: SessionUser {
            email: user.email,
            subscription: user.subscription,
        },
    }))
}

#[instrument(skip(user))]
pub async fn get_current(CurrentUser(user): CurrentUser) -> Json<CurrentResponse> {
    Json(CurrentResponse {
        email: user.email,
        subscription: user.subscription,
        avatar_url: user.avatar_url,
    })
}

#[instrument(skip(state, user))]
pub async fn logout(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<StatusCode, (StatusCode, String)> {
    match User::set_session_token(&state.db, user.id, None).await {
        Ok(Some(_)) => {
            info!(user_id = %user.id, "user logged out");
            Ok(StatusCode::NO_CONTENT)
        }
        Ok(None) => {
            warn!(user_id = %user.id, "logout for missing user");
            Err((StatusCode::UNAUTHORIZED, "Not authorized".into()))
        }
        Err(e) => {
            error!(error = %e, user_id = %user.id, "clear session token failed");
            Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

/// PATCH /avatar (multipart). Field: avatar (single file).
#[instrument(skip(state, user, mp))]
pub async fn change_avatar(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    mut mp: Multipart,
) -> Result<(StatusCode, Json<AvatarResponse>), (StatusCode, String)> {
    let mut upload: Option<(Bytes, String)> = None;
    while let Ok(Some(field)) = mp.next_field().await {
        if field.name() == Some("avatar") {
            let content_type = field
                .content_type()
                .map(|s| s.to_string())
                .unwrap_or_else(|| "application/octet-stream".into());
            let data = field.bytes().await.map_err(internal)?;
            upload = Some((data, content_type));
            break;
        }
    }

    let Some((body, content_type)) = upload else {
        return Err((StatusCode::BAD_REQUEST, "Missing new avatar file".into()));
    };

    let ext = ext_from_mime(&content_type).ok_or((
        StatusCode::BAD_REQUEST,
        "Unsupported avatar format".to_string(),
    ))?;

    // A file that cannot be decoded or resized is rejected outright; the
    // stored avatar reference must never point at an unprocessed upload.
    let resized = process_avatar(&body, ext).map_err(|e| {
        warn!(error = %e, user_id = %user.id, "avatar processing failed");
        (
            StatusCode::BAD_REQUEST,
            "Could not process avatar image".into(),
        )
    })?;

    let filename = format!("{}-{}.{}", user.id, Uuid::new_v4(), ext);
    let avatar_url = state
        .avatars
        .store(&filename, resized)
        .await
        .map_err(internal)?;

    match User::set_avatar_url(&state.db, user.id, &avatar_url).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            warn!(user_id = %user.id, "avatar update for missing user");
            return Err((StatusCode::UNAUTHORIZED, "Not authorized".into()));
        }
        Err(e) => {
            error!(error = %e, user_id = %user.id, "persist avatar url failed");
            return Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()));
        }
    }

    info!(user_id = %user.id, %avatar_url, "avatar replaced");
    Ok((StatusCode::CREATED, Json(AvatarResponse { avatar_url })))
}

#[instrument(skip(state))]
pub async fn verify(
    State(state): State<AppState>,
    Path(verification_token): Path<String>,
) -> Result<Json<MessageResponse>, (StatusCode, String)> {
    let user = match User::find_by_verification_token(&state.db, &verification_token).await {
        Ok(Some(u)) => u,
        Ok(None) => return Err((StatusCode::NOT_FOUND, "Not found".into())),
        Err(e) => {
            error!(error = %e, "find_by_verification_token failed");
            return Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()));
        }
    };

    if let Err(e) = User::consume_verification(&state.db, user.id).await {
        error!(error = %e, user_id = %user.id, "consume_verification failed");
        return Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()));
    }

    info!(user_id = %user.id, "email verified");
    Ok(Json(MessageResponse {
        message: "Verification successful".into(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn resend_verification(
    State(state): State<AppState>,
    Json(mut payload): Json<ResendVerificationRequest>,
) -> Result<Json<MessageResponse>, (StatusCode, String)> {
    payload.email = payload.email.trim().to_lowercase();

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err((StatusCode::BAD_REQUEST, "Invalid email".into()));
    }

    let user = match User::find_by_email(&state.db, &payload.email).await {
        Ok(Some(u)) => u,
        Ok(None) => return Err((StatusCode::NOT_FOUND, "Not found".into())),
        Err(e) => {
            error!(error = %e, "find_by_email failed");
            return Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()));
        }
    };

    if user.verified {
        return Err((
            StatusCode::BAD_REQUEST,
            "Verification has already been passed".into(),
        ));
    }

    // Resend with the token assigned at registration, not a fresh one, so
    // the earlier link keeps working.
    let (subject, html) = verification_email(&state.config.base_url, &user.verification_token);
    if let Err(e) = state.mailer.send(&user.email, &subject, &html).await {
        error!(error = %e, user_id = %user.id, "resend verification email failed");
        return Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to send verification email".into(),
        ));
    }

    info!(user_id = %user.id, "verification email resent");
    Ok(Json(MessageResponse {
        message: "Verification email sent".into(),
    }))
}

fn internal<E: std::fmt::Display>(e: E) -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

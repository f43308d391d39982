//! Admin session tokens: HS256 cookie JWTs keyed by a server-side secret.

use crate::config;

use base64::{STANDARD, URL_SAFE_NO_PAD, decode_config, encode_config};
use jwt_simple::algorithms::MACLike;
use jwt_simple::prelude::{
    Claims, Duration as JwtDuration, HS256Key, NoCustomClaims, VerificationOptions,
};
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};

use std::collections::HashSet;

#[derive(Debug, Clone)]
pub struct AdminAuth {
    key: HS256Key,
    issuer: String,
    cookie_name: String,
    session_ttl: time::Duration,
    cookie_secure: bool,
}

#[derive(Debug)]
pub enum AuthError {
    InvalidKey,
    InvalidToken,
    MissingExpiry,
    MissingSubject,
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::InvalidKey => f.write_str("invalid auth key"),
            AuthError::InvalidToken => f.write_str("invalid session token"),
            AuthError::MissingExpiry => f.write_str("session token missing expiry"),
            AuthError::MissingSubject => f.write_str("session token missing subject"),
        }
    }
}

impl AdminAuth {
    pub fn from_config(config: &config::AppConfig) -> Result<Option<Self>, AuthError> {
        let Some(auth) = config.auth.as_ref() else {
            return Ok(None);
        };

        let trimmed = auth.key.trim();
        if trimmed.is_empty() {
            return Err(AuthError::InvalidKey);
        }
        let key_bytes = decode_config(trimmed, URL_SAFE_NO_PAD)
            .or_else(|_| decode_config(trimmed, STANDARD))
            .map_err(|_| AuthError::InvalidKey)?;
        if key_bytes.is_empty() {
            return Err(AuthError::InvalidKey);
        }

        Ok(Some(Self {
            key: HS256Key::from_bytes(&key_bytes),
            issuer: config.app_name.clone(),
            cookie_name: auth.cookie_name.clone(),
            session_ttl: auth.session_ttl,
            cookie_secure: auth.cookie_secure,
        }))
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    pub fn issue_token(&self, subject: &str) -> Result<String, AuthError> {
        let ttl_seconds = self.session_ttl.whole_seconds();
        if ttl_seconds <= 0 {
            return Err(AuthError::InvalidToken);
        }
        let claims = Claims::create(JwtDuration::from_secs(ttl_seconds as u64))
            .with_subject(subject)
            .with_issuer(&self.issuer);
        self.key
            .authenticate(claims)
            .map_err(|_| AuthError::InvalidToken)
    }

    /// Verifies the token and returns its subject (the admin email).
    pub fn verify_token(&self, token: &str) -> Result<String, AuthError> {
        let mut options = VerificationOptions::default();
        let mut issuers = HashSet::new();
        issuers.insert(self.issuer.clone());
        options.allowed_issuers = Some(issuers);

        let claims = self
            .key
            .verify_token::<NoCustomClaims>(token, Some(options))
            .map_err(|_| AuthError::InvalidToken)?;

        if claims.expires_at.is_none() {
            return Err(AuthError::MissingExpiry);
        }

        let subject = claims.subject.ok_or(AuthError::MissingSubject)?;
        if subject.trim().is_empty() {
            return Err(AuthError::MissingSubject);
        }
        Ok(subject)
    }

    pub fn session_cookie(&self, token: &str) -> String {
        let max_age = self.session_ttl.whole_seconds().max(0);
        let mut cookie = format!(
            "{}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age}",
            self.cookie_name
        );
        if self.cookie_secure {
            cookie.push_str("; Secure");
        }
        cookie
    }

    pub fn clear_cookie(&self) -> String {
        let mut cookie = format!(
            "{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0",
            self.cookie_name
        );
        if self.cookie_secure {
            cookie.push_str("; Secure");
        }
        cookie
    }
}

pub fn generate_auth_key() -> Result<String, AuthError> {
    let mut rng = OsRng;
    generate_auth_key_with_rng(&mut rng)
}

pub(crate) fn generate_auth_key_with_rng<R: RngCore + CryptoRng>(
    rng: &mut R,
) -> Result<String, AuthError> {
    let mut bytes = [0u8; 32];
    rng.fill_bytes(&mut bytes);
    let encoded = encode_config(bytes, URL_SAFE_NO_PAD);
    if encoded.is_empty() {
        return Err(AuthError::InvalidKey);
    }
    Ok(encoded)
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;
    use crate::config::{AppConfig, AuthConfig};

    fn auth_config(key: &str) -> AppConfig {
        AppConfig {
            auth: Some(AuthConfig {
                key: key.to_string(),
                session_ttl: time::Duration::hours(2),
                cookie_name: "bakeshop_admin".to_string(),
                cookie_secure: false,
            }),
            ..Default::default()
        }
    }

    struct ZeroRng;

    impl RngCore for ZeroRng {
        fn next_u32(&mut self) -> u32 {
            0
        }

        fn next_u64(&mut self) -> u64 {
            0
        }

        fn fill_bytes(&mut self, dest: &mut [u8]) {
            for value in dest.iter_mut() {
                *value = 0;
            }
        }

        fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
            self.fill_bytes(dest);
            Ok(())
        }
    }

    impl CryptoRng for ZeroRng {}

    #[test]
    fn generate_auth_key_with_rng__should_match_fixture() {
        // Given
        let mut rng = ZeroRng;

        // When
        let key = generate_auth_key_with_rng(&mut rng).expect("auth key");

        // Then
        assert_eq!(key, "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA");
    }

    #[test]
    fn from_config__should_return_none_when_auth_disabled() {
        // Given
        let config = AppConfig::default();

        // Then
        assert!(AdminAuth::from_config(&config).expect("from config").is_none());
    }

    #[test]
    fn from_config__should_reject_undecodable_key() {
        // Given
        let config = auth_config("!!!not-base64!!!");

        // Then
        assert!(matches!(
            AdminAuth::from_config(&config),
            Err(AuthError::InvalidKey)
        ));
    }

    #[test]
    fn issue_token__should_round_trip_subject() {
        // Given
        let key = generate_auth_key_with_rng(&mut ZeroRng).expect("auth key");
        let auth = AdminAuth::from_config(&auth_config(&key))
            .expect("from config")
            .expect("auth enabled");

        // When
        let token = auth.issue_token("admin@example.com").expect("issue");

        // Then
        let subject = auth.verify_token(&token).expect("verify");
        assert_eq!(subject, "admin@example.com");
    }

    #[test]
    fn verify_token__should_reject_garbage() {
        // Given
        let key = generate_auth_key_with_rng(&mut ZeroRng).expect("auth key");
        let auth = AdminAuth::from_config(&auth_config(&key))
            .expect("from config")
            .expect("auth enabled");

        // Then
        assert!(auth.verify_token("not-a-token").is_err());
    }

    #[test]
    fn session_cookie__should_mark_http_only_and_max_age() {
        // Given
        let key = generate_auth_key_with_rng(&mut ZeroRng).expect("auth key");
        let auth = AdminAuth::from_config(&auth_config(&key))
            .expect("from config")
            .expect("auth enabled");

        // When
        let cookie = auth.session_cookie("token-value");

        // Then
        assert!(cookie.starts_with("bakeshop_admin=token-value"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Max-Age=7200"));
        assert!(!cookie.contains("Secure"));
    }

    #[test]
    fn clear_cookie__should_expire_immediately() {
        // Given
        let key = generate_auth_key_with_rng(&mut ZeroRng).expect("auth key");
        let auth = AdminAuth::from_config(&auth_config(&key))
            .expect("from config")
            .expect("auth enabled");

        // Then
        assert!(auth.clear_cookie().contains("Max-Age=0"));
    }
}

//! VAPID key handling for the push transport.

use base64::{URL_SAFE_NO_PAD, encode_config};
use jwt_simple::prelude::ES256KeyPair;
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};

use crate::config::AppConfig;

#[derive(Debug, Clone)]
pub struct VapidConfig {
    pub private_key: String,
    pub public_key: String,
    pub subject: String,
}

#[derive(Debug, Clone)]
pub enum VapidStatus {
    /// No VAPID settings at all; push stays disabled silently.
    Missing,
    /// Some but not all settings present; worth warning about.
    Incomplete,
    Ready(VapidConfig),
}

impl VapidConfig {
    pub fn load(config: &AppConfig) -> VapidStatus {
        let private_key = trimmed(config.vapid_private_key.as_deref());
        let public_key = trimmed(config.vapid_public_key.as_deref());
        let subject = trimmed(config.vapid_subject.as_deref());
        let has_any = private_key.is_some() || public_key.is_some() || subject.is_some();

        match (private_key, public_key, subject) {
            (Some(private_key), Some(public_key), Some(subject)) => {
                VapidStatus::Ready(VapidConfig {
                    private_key,
                    public_key,
                    subject,
                })
            }
            _ if has_any => VapidStatus::Incomplete,
            _ => VapidStatus::Missing,
        }
    }
}

fn trimmed(value: Option<&str>) -> Option<String> {
    let value = value?.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct VapidCredentials {
    pub private_key: String,
    pub public_key: String,
}

pub fn generate_vapid_credentials() -> Result<VapidCredentials, web_push::WebPushError> {
    let mut rng = OsRng;
    generate_vapid_credentials_with_rng(&mut rng)
}

pub(crate) fn generate_vapid_credentials_with_rng<R: RngCore + CryptoRng>(
    rng: &mut R,
) -> Result<VapidCredentials, web_push::WebPushError> {
    // Candidate scalars outside the P-256 group order are rejected by
    // from_bytes, so draw until one sticks.
    let mut key_bytes = [0u8; 32];
    let key_pair = loop {
        rng.fill_bytes(&mut key_bytes);
        if let Ok(key_pair) = ES256KeyPair::from_bytes(&key_bytes) {
            break key_pair;
        }
    };

    let private_key = encode_config(key_pair.to_bytes(), URL_SAFE_NO_PAD);
    let public_key =
        web_push::VapidSignatureBuilder::from_base64_no_sub(&private_key, URL_SAFE_NO_PAD)?
            .get_public_key();
    let public_key = encode_config(public_key, URL_SAFE_NO_PAD);

    Ok(VapidCredentials {
        private_key,
        public_key,
    })
}

// One-shot flash messages in a signed cookie: base64url(json).base64url(hmac)

use axum::http::{header, HeaderMap, HeaderValue};
use axum::response::{IntoResponse, Redirect, Response};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub const FLASH_COOKIE: &str = "akathon_flash";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Success,
    Danger,
}

impl FlashLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            FlashLevel::Success => "success",
            FlashLevel::Danger => "danger",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub level: FlashLevel,
    pub message: String,
}

impl Flash {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Success,
            message: message.into(),
        }
    }

    pub fn danger(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Danger,
            message: message.into(),
        }
    }
}

/// Signs and verifies flash cookies with the session secret
#[derive(Clone)]
pub struct FlashCodec {
    key: Vec<u8>,
}

impl FlashCodec {
    pub fn new(secret: &str) -> Self {
        Self {
            key: secret.as_bytes().to_vec(),
        }
    }

    fn mac(&self) -> HmacSha256 {
        HmacSha256::new_from_slice(&self.key).expect("HMAC accepts any key length")
    }

    pub fn encode(&self, flash: &Flash) -> String {
        let payload = serde_json::to_vec(flash).unwrap_or_default();

        let mut mac = self.mac();
        mac.update(&payload);
        let signature = mac.finalize().into_bytes();

        format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(&payload),
            URL_SAFE_NO_PAD.encode(signature)
        )
    }

    pub fn decode(&self, value: &str) -> Option<Flash> {
        let (payload, signature) = value.split_once('.')?;
        let payload = URL_SAFE_NO_PAD.decode(payload).ok()?;
        let signature = URL_SAFE_NO_PAD.decode(signature).ok()?;

        let mut mac = self.mac();
        mac.update(&payload);
        // verify_slice compares in constant time
        mac.verify_slice(&signature).ok()?;

        serde_json::from_slice(&payload).ok()
    }

    /// `Set-Cookie` value that stores `flash`
    pub fn set_cookie(&self, flash: &Flash) -> HeaderValue {
        let cookie = format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax",
            FLASH_COOKIE,
            self.encode(flash)
        );
        // base64url and the fixed attributes are all visible ASCII
        HeaderValue::from_str(&cookie).unwrap_or_else(|_| clear_cookie())
    }

    /// Pending flash from the request cookies, if any and if authentic
    pub fn from_headers(&self, headers: &HeaderMap) -> Option<Flash> {
        headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == FLASH_COOKIE)
            .and_then(|(_, value)| self.decode(value))
    }

    /// 303 to `location` carrying `flash` for the next page view
    pub fn redirect(&self, location: &str, flash: &Flash) -> Response {
        (
            [(header::SET_COOKIE, self.set_cookie(flash))],
            Redirect::to(location),
        )
            .into_response()
    }
}

/// `Set-Cookie` value that removes the flash cookie
pub fn clear_cookie() -> HeaderValue {
    HeaderValue::from_static("akathon_flash=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

//! WS-Security UsernameToken digest

use chrono::{DateTime, SecondsFormat, Utc};
use openssl::base64::encode_block;
use openssl::sha::Sha1;
use rand::Rng;

/// Username and password for a device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

/// Base64(SHA1(nonce + created + password))
pub fn password_digest(nonce: &[u8], created: &str, password: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(nonce);
    hasher.update(created.as_bytes());
    hasher.update(password.as_bytes());
    encode_block(&hasher.finish())
}

/// `<wsse:Security>` header with a fresh nonce, created now
pub fn security_header(credentials: &Credentials) -> String {
    let nonce: [u8; 16] = rand::thread_rng().gen();
    security_header_with(credentials, &nonce, Utc::now())
}

/// Deterministic variant for a known nonce and timestamp
pub fn security_header_with(
    credentials: &Credentials,
    nonce: &[u8],
    created: DateTime<Utc>,
) -> String {
    let created = created.to_rfc3339_opts(SecondsFormat::Secs, true);
    let digest = password_digest(nonce, &created, &credentials.password);

    format!(
        concat!(
            r#"<wsse:Security s:mustUnderstand="1" "#,
            r#"xmlns:wsse="http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-secext-1.0.xsd" "#,
            r#"xmlns:wsu="http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-utility-1.0.xsd">"#,
            r#"<wsse:UsernameToken><wsse:Username>{}</wsse:Username>"#,
            r#"<wsse:Password Type="http://docs.oasis-open.org/wss/2004/01/"#,
            r#"oasis-200401-wss-username-token-profile-1.0#PasswordDigest">{}</wsse:Password>"#,
            r#"<wsse:Nonce EncodingType="http://docs.oasis-open.org/wss/2004/01/"#,
            r#"oasis-200401-wss-soap-message-security-1.0#Base64Binary">{}</wsse:Nonce>"#,
            r#"<wsu:Created>{}</wsu:Created></wsse:UsernameToken></wsse:Security>"#,
        ),
        quick_xml::escape::escape(credentials.username.as_str()),
        digest,
        encode_block(nonce),
        created
    )
}

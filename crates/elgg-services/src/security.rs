//! Cryptographic helpers: random tokens, HMACs, signed URLs, passwords

use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use elgg_config::Config;
use hmac::{Hmac as HmacImpl, Mac};
use rand::RngCore;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use tracing::{info, warn};
use url::Url;

use crate::database::ConfigTable;
use crate::error::{Result, ServiceError};
use crate::session::Session;

type HmacSha256 = HmacImpl<Sha256>;

/// Source of random bytes and strings
#[derive(Debug, Default)]
pub struct Crypto;

impl Crypto {
    pub fn random_bytes(&self, length: usize) -> Vec<u8> {
        let mut bytes = vec![0u8; length];
        rand::thread_rng().fill_bytes(&mut bytes);
        bytes
    }

    /// URL-safe random string of exactly `length` characters
    pub fn random_string(&self, length: usize) -> String {
        let bytes = self.random_bytes(length * 3 / 4 + 3);
        let mut encoded = URL_SAFE_NO_PAD.encode(bytes);
        encoded.truncate(length);
        encoded
    }

    /// Compare without short-circuiting on the first difference
    pub fn are_equal(&self, a: &str, b: &str) -> bool {
        if a.len() != b.len() {
            return false;
        }
        a.bytes()
            .zip(b.bytes())
            .fold(0u8, |diff, (x, y)| diff | (x ^ y))
            == 0
    }
}

/// How hard the site secret would be to guess
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretStrength {
    Weak,
    Moderate,
    Strong,
}

/// Key every HMAC of the site is computed with
#[derive(Clone)]
pub struct SiteSecret {
    key: String,
}

impl SiteSecret {
    pub const CONFIG_NAME: &'static str = "__site_secret__";

    pub fn from_value(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    /// Read the secret from the config table, generating and storing one
    /// when the table has none.
    pub fn from_config_table(table: &ConfigTable, crypto: &Crypto) -> Result<Self> {
        if let Some(Value::String(key)) = table.get(Self::CONFIG_NAME) {
            if !key.is_empty() {
                return Ok(Self { key });
            }
        }

        warn!("No site secret stored, generating a new one");
        let key = format!("z{}", crypto.random_string(31));
        table.set(Self::CONFIG_NAME, json!(key))?;
        info!("Stored new site secret");
        Ok(Self { key })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn strength(&self) -> SecretStrength {
        if self.key.starts_with('z') && self.key.len() >= 32 {
            SecretStrength::Strong
        } else if self.key.len() >= 32 {
            SecretStrength::Moderate
        } else {
            SecretStrength::Weak
        }
    }
}

impl std::fmt::Debug for SiteSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SiteSecret").field("strength", &self.strength()).finish()
    }
}

/// HMAC of one piece of data under the site secret
pub struct Hmac {
    key: Vec<u8>,
    data: Vec<u8>,
}

impl Hmac {
    fn mac(&self) -> Result<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(&self.key)
            .map_err(|e| ServiceError::InvalidArgument(format!("HMAC key: {}", e)))?;
        mac.update(&self.data);
        Ok(mac)
    }

    /// Base64url encoded HMAC-SHA256
    pub fn token(&self) -> Result<String> {
        Ok(URL_SAFE_NO_PAD.encode(self.mac()?.finalize().into_bytes()))
    }

    pub fn matches_token(&self, token: &str) -> bool {
        let Ok(expected) = URL_SAFE_NO_PAD.decode(token) else {
            return false;
        };
        match self.mac() {
            Ok(mac) => mac.verify_slice(&expected).is_ok(),
            Err(_) => false,
        }
    }
}

pub struct HmacFactory {
    pub site_secret: Arc<SiteSecret>,
    pub crypto: Arc<Crypto>,
}

impl HmacFactory {
    pub fn new(site_secret: Arc<SiteSecret>, crypto: Arc<Crypto>) -> Self {
        Self {
            site_secret,
            crypto,
        }
    }

    pub fn hmac(&self, data: impl AsRef<[u8]>) -> Hmac {
        Hmac {
            key: self.site_secret.key().as_bytes().to_vec(),
            data: data.as_ref().to_vec(),
        }
    }
}

/// Appends and checks MAC query parameters on URLs
#[derive(Debug, Default)]
pub struct UrlSigner;

impl UrlSigner {
    pub const KEY_MAC: &'static str = "__elgg_mac";
    pub const KEY_EXPIRES: &'static str = "__elgg_exp";

    pub fn sign(&self, url: &str, hmac: &HmacFactory, expires: Option<u64>) -> Result<String> {
        let parsed = parse_url(url)?;
        if parsed.query_pairs().any(|(key, _)| key == Self::KEY_MAC) {
            return Err(ServiceError::InvalidArgument(format!(
                "URL is already signed: {}",
                url
            )));
        }

        let mut signed = match expires {
            Some(expires) => {
                let mut unsigned = canonical_query(&parsed, &[Self::KEY_EXPIRES]);
                unsigned
                    .query_pairs_mut()
                    .append_pair(Self::KEY_EXPIRES, &expires.to_string());
                unsigned
            }
            None => canonical_query(&parsed, &[]),
        };
        let token = hmac.hmac(signed.as_str()).token()?;
        signed.query_pairs_mut().append_pair(Self::KEY_MAC, &token);
        Ok(signed.into())
    }

    /// Check the MAC of `url` and, when present, that it has not expired at `now`
    pub fn is_valid(&self, url: &str, hmac: &HmacFactory, now: u64) -> bool {
        let Ok(parsed) = Url::parse(url) else {
            return false;
        };
        let macs: Vec<String> = parsed
            .query_pairs()
            .filter(|(key, _)| key == Self::KEY_MAC)
            .map(|(_, value)| value.into_owned())
            .collect();
        let [token] = macs.as_slice() else {
            return false;
        };

        let unsigned = canonical_query(&parsed, &[Self::KEY_MAC]);
        if !hmac.hmac(unsigned.as_str()).matches_token(token) {
            return false;
        }

        unsigned
            .query_pairs()
            .filter(|(key, _)| key == Self::KEY_EXPIRES)
            .all(|(_, value)| {
                value
                    .parse::<u64>()
                    .map(|expires| expires >= now)
                    .unwrap_or(false)
            })
    }
}

fn parse_url(url: &str) -> Result<Url> {
    Url::parse(url)
        .map_err(|e| ServiceError::InvalidArgument(format!("invalid URL {}: {}", url, e)))
}

/// `url` with its query re-encoded pair by pair, leaving out the `skip` keys
fn canonical_query(url: &Url, skip: &[&str]) -> Url {
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !skip.iter().any(|skipped| key == skipped))
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();
    let mut canonical = url.clone();
    canonical.set_query(None);
    if !pairs.is_empty() {
        canonical.query_pairs_mut().extend_pairs(pairs);
    }
    canonical
}

/// Password hashing with bcrypt
pub struct PasswordService {
    cost: u32,
}

impl PasswordService {
    pub fn with_cost(cost: u32) -> Self {
        Self { cost }
    }

    pub fn hash(&self, password: &str) -> Result<String> {
        Ok(bcrypt::hash(password, self.cost)?)
    }

    pub fn verify(&self, password: &str, hash: &str) -> Result<bool> {
        Ok(bcrypt::verify(password, hash)?)
    }

    /// Whether `hash` was made with a different cost than the current one
    pub fn needs_rehash(&self, hash: &str) -> bool {
        hash.split('$')
            .nth(2)
            .and_then(|cost| cost.parse::<u32>().ok())
            .map(|cost| cost != self.cost)
            .unwrap_or(true)
    }
}

impl Default for PasswordService {
    fn default() -> Self {
        Self::with_cost(bcrypt::DEFAULT_COST)
    }
}

/// Action tokens protecting form submissions
pub struct ActionsService {
    pub config: Arc<Config>,
    pub session: Arc<Session>,
    pub crypto: Arc<Crypto>,
}

impl ActionsService {
    /// Seconds a token stays valid
    pub const TOKEN_TIMEOUT: u64 = 2 * 60 * 60;
    const SESSION_TOKEN: &'static str = "__elgg_session";

    pub fn new(config: Arc<Config>, session: Arc<Session>, crypto: Arc<Crypto>) -> Self {
        Self {
            config,
            session,
            crypto,
        }
    }

    fn session_token(&self) -> String {
        if let Some(Value::String(token)) = self.session.get(Self::SESSION_TOKEN) {
            return token;
        }
        let token = self.crypto.random_string(22);
        self.session.set(Self::SESSION_TOKEN, json!(token));
        token
    }

    pub fn generate_token(&self, timestamp: u64) -> String {
        let mut hasher = Sha256::new();
        hasher.update(timestamp.to_string());
        hasher.update(self.session_token());
        hasher.update(self.session.id().as_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn validate_token(&self, token: &str, timestamp: u64, now: u64) -> bool {
        if now.saturating_sub(timestamp) > Self::TOKEN_TIMEOUT || timestamp > now {
            return false;
        }
        self.crypto.are_equal(token, &self.generate_token(timestamp))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{Database, DbConfig};

    fn factory_with(secret: &str) -> HmacFactory {
        HmacFactory::new(
            Arc::new(SiteSecret::from_value(secret)),
            Arc::new(Crypto::default()),
        )
    }

    #[test]
    fn test_random_string_length_and_alphabet() {
        let crypto = Crypto::default();
        for length in [1, 16, 31, 64] {
            let value = crypto.random_string(length);
            assert_eq!(value.len(), length);
            assert!(value
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        }
        assert!(crypto.are_equal("abc", "abc"));
        assert!(!crypto.are_equal("abc", "abd"));
        assert!(!crypto.are_equal("abc", "ab"));
    }

    #[test]
    fn test_secret_strength() {
        assert_eq!(
            SiteSecret::from_value(format!("z{}", "a".repeat(31))).strength(),
            SecretStrength::Strong
        );
        assert_eq!(
            SiteSecret::from_value("0".repeat(32)).strength(),
            SecretStrength::Moderate
        );
        assert_eq!(SiteSecret::from_value("short").strength(), SecretStrength::Weak);
    }

    #[test]
    fn test_hmac_token_matches() {
        let factory = factory_with("secret");
        let token = factory.hmac("guid=5").token().unwrap();
        assert!(factory.hmac("guid=5").matches_token(&token));
        assert!(!factory.hmac("guid=6").matches_token(&token));
        assert!(!factory.hmac("guid=5").matches_token("not base64!"));
        assert!(!factory_with("other").hmac("guid=5").matches_token(&token));
    }

    #[test]
    fn test_url_signing() {
        let factory = factory_with("secret");
        let signer = UrlSigner;

        let signed = signer
            .sign("http://localhost/file?guid=5", &factory, None)
            .unwrap();
        assert!(signed.contains("&__elgg_mac="));
        assert!(signer.is_valid(&signed, &factory, 0));
        assert!(!signer.is_valid(&signed.replace("guid=5", "guid=6"), &factory, 0));
        assert!(signer.sign(&signed, &factory, None).is_err());

        let expiring = signer.sign("http://localhost/file", &factory, Some(100)).unwrap();
        assert!(signer.is_valid(&expiring, &factory, 100));
        assert!(!signer.is_valid(&expiring, &factory, 101));
    }

    #[test]
    fn test_url_signing_matches_exact_keys() {
        let factory = factory_with("secret");
        let signer = UrlSigner;

        let lookalike = signer
            .sign("http://localhost/file?x__elgg_exp=9999999999", &factory, Some(100))
            .unwrap();
        assert!(signer.is_valid(&lookalike, &factory, 100));
        assert!(!signer.is_valid(&lookalike, &factory, 200));

        let signed = signer
            .sign("http://localhost/file?my__elgg_mac=1", &factory, None)
            .unwrap();
        assert!(signer.is_valid(&signed, &factory, 0));

        let doubled = format!("{}&__elgg_mac=extra", signed);
        assert!(!signer.is_valid(&doubled, &factory, 0));
        assert!(signer.sign("not a url", &factory, None).is_err());
    }

    #[test]
    fn test_password_hashing() {
        let passwords = PasswordService::with_cost(4);
        let hash = passwords.hash("correct horse").unwrap();
        assert!(passwords.verify("correct horse", &hash).unwrap());
        assert!(!passwords.verify("battery staple", &hash).unwrap());
        assert!(!passwords.needs_rehash(&hash));
        assert!(PasswordService::with_cost(5).needs_rehash(&hash));
    }

    #[test]
    fn test_action_tokens() {
        let config = Arc::new(Config::new());
        let db = Arc::new(Database::new(Arc::new(DbConfig::from_config(&config))));
        let session = Arc::new(Session::from_database(Arc::clone(&config), db));
        let actions = ActionsService::new(config, session, Arc::new(Crypto::default()));

        let token = actions.generate_token(1_000);
        assert!(actions.validate_token(&token, 1_000, 1_500));
        assert!(!actions.validate_token(&token, 1_000, 1_000 + ActionsService::TOKEN_TIMEOUT + 1));
        assert!(!actions.validate_token(&token, 999, 1_500));
    }
}

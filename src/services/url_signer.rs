use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// A path signed for a limited time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedPath {
    pub path: String,
    pub expires: i64,
    pub signature: String,
}

impl SignedPath {
    /// `path?exp=..&sig=..`
    pub fn to_url(&self) -> String {
        format!("{}?exp={}&sig={}", self.path, self.expires, self.signature)
    }
}

/// HMAC-SHA256 signer for certificate links
///
/// Participant ids in certificate URLs are sequential; the signature makes a
/// URL usable only after the email check that produced it.
pub struct UrlSigner {
    secret: Vec<u8>,
    /// Signature validity in seconds
    validity_secs: i64,
}

impl UrlSigner {
    pub fn new(secret: &[u8], validity_secs: i64) -> Self {
        Self {
            secret: secret.to_vec(),
            validity_secs,
        }
    }

    /// Generate a new signing service with a random secret
    pub fn with_random_secret(validity_secs: i64) -> Self {
        use rand::Rng;
        let secret: [u8; 32] = rand::thread_rng().gen();
        Self::new(&secret, validity_secs)
    }

    pub fn validity_secs(&self) -> i64 {
        self.validity_secs
    }

    /// Sign a URL path, valid from now
    pub fn sign(&self, path: &str) -> SignedPath {
        self.sign_at(path, chrono::Utc::now().timestamp())
    }

    pub fn sign_at(&self, path: &str, now: i64) -> SignedPath {
        let expires = now + self.validity_secs;
        let signature = hex::encode(self.mac(path, expires).finalize().into_bytes());
        SignedPath {
            path: path.to_string(),
            expires,
            signature,
        }
    }

    /// Verify a signed URL
    pub fn verify(&self, path: &str, signature: &str, expires: i64) -> bool {
        self.verify_at(path, signature, expires, chrono::Utc::now().timestamp())
    }

    pub fn verify_at(&self, path: &str, signature: &str, expires: i64, now: i64) -> bool {
        if now > expires {
            return false;
        }
        let Ok(given) = hex::decode(signature) else {
            return false;
        };
        self.mac(path, expires).verify_slice(&given).is_ok()
    }

    fn mac(&self, path: &str, expires: i64) -> HmacSha256 {
        let mut mac =
            HmacSha256::new_from_slice(&self.secret).expect("HMAC can take key of any size");
        mac.update(format!("{path}:{expires}").as_bytes());
        mac
    }
}

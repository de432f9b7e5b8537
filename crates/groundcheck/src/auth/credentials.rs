use sha2::{Digest, Sha256};

/// Opaque credential collaborator. Callers never inspect the stored form.
pub trait CredentialScheme: Send + Sync {
    fn hash(&self, plaintext: &str) -> String;
    fn verify(&self, plaintext: &str, stored: &str) -> bool;
}

/// Iterated, salted SHA-256 stored as `sha256$<rounds>$<salt>$<digest>` (hex).
///
/// SHA-256 is a fast hash, so stretching only raises the cost of an offline
/// guess by the round count. A memory-hard KDF such as argon2 is stronger and
/// can replace this type without touching callers; stored values carry their
/// own tag and round count.
#[derive(Debug, Default, Clone, Copy)]
pub struct SaltedSha256;

const SCHEME_TAG: &str = "sha256";
const ROUNDS: u32 = 10_000;

impl SaltedSha256 {
    fn digest(salt: &[u8], plaintext: &str, rounds: u32) -> String {
        let mut hasher = Sha256::new();
        hasher.update(salt);
        hasher.update(plaintext.as_bytes());
        let mut state = hasher.finalize();
        for _ in 1..rounds {
            let mut hasher = Sha256::new();
            hasher.update(state);
            hasher.update(salt);
            state = hasher.finalize();
        }
        hex::encode(state)
    }
}

impl CredentialScheme for SaltedSha256 {
    fn hash(&self, plaintext: &str) -> String {
        let salt = uuid::Uuid::new_v4();
        let digest = Self::digest(salt.as_bytes(), plaintext, ROUNDS);
        format!(
            "{SCHEME_TAG}${ROUNDS}${}${digest}",
            hex::encode(salt.as_bytes())
        )
    }

    fn verify(&self, plaintext: &str, stored: &str) -> bool {
        let mut parts = stored.splitn(4, '$');
        let (Some(tag), Some(rounds), Some(salt), Some(expected)) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return false;
        };
        if tag != SCHEME_TAG {
            return false;
        }
        let Some(rounds) = rounds.parse::<u32>().ok().filter(|rounds| *rounds > 0) else {
            return false;
        };
        let Ok(salt) = hex::decode(salt) else {
            return false;
        };

        let actual = Self::digest(&salt, plaintext, rounds);
        constant_time_eq(actual.as_bytes(), expected.as_bytes())
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

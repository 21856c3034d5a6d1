use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Action name the generate form nonce is bound to
pub const GENERATE_ACTION: &str = "plec_generate_zip";

/// Nonces rotate every 12 hours and stay valid for two ticks
const TICK_SECONDS: i64 = 12 * 60 * 60;

const NONCE_LEN: usize = 20;

fn tick(now: DateTime<Utc>) -> i64 {
    now.timestamp().div_euclid(TICK_SECONDS)
}

fn nonce_for_tick(secret: &str, user_id: &str, action: &str, tick: i64) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| anyhow!("invalid nonce key: {}", e))?;
    mac.update(format!("{}|{}|{}", tick, action, user_id).as_bytes());
    let digest = hex::encode(mac.finalize().into_bytes());
    Ok(digest[..NONCE_LEN].to_string())
}

/// Issues a nonce binding `action` to the caller's session.
pub fn create_nonce(
    secret: &str,
    user_id: &str,
    action: &str,
    now: DateTime<Utc>,
) -> Result<String> {
    nonce_for_tick(secret, user_id, action, tick(now))
}

/// Accepts nonces from the current or the previous tick.
pub fn verify_nonce(
    secret: &str,
    user_id: &str,
    action: &str,
    nonce: &str,
    now: DateTime<Utc>,
) -> bool {
    let nonce = nonce.trim();
    if nonce.len() != NONCE_LEN {
        return false;
    }

    let current = tick(now);
    [current, current - 1].iter().any(|t| {
        nonce_for_tick(secret, user_id, action, *t)
            .map(|expected| bool::from(expected.as_bytes().ct_eq(nonce.as_bytes())))
            .unwrap_or(false)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_nonce_round_trip() {
        let now = Utc::now();
        let nonce = create_nonce("s", "user_1", GENERATE_ACTION, now).unwrap();
        assert_eq!(nonce.len(), NONCE_LEN);
        assert!(verify_nonce("s", "user_1", GENERATE_ACTION, &nonce, now));
    }

    #[test]
    fn test_nonce_bound_to_user_and_action() {
        let now = Utc::now();
        let nonce = create_nonce("s", "user_1", GENERATE_ACTION, now).unwrap();
        assert!(!verify_nonce("s", "user_2", GENERATE_ACTION, &nonce, now));
        assert!(!verify_nonce("s", "user_1", "other_action", &nonce, now));
        assert!(!verify_nonce("t", "user_1", GENERATE_ACTION, &nonce, now));
    }

    #[test]
    fn test_nonce_expiry() {
        let issued = DateTime::from_timestamp(TICK_SECONDS * 1000, 0).unwrap();
        let nonce = create_nonce("s", "u", GENERATE_ACTION, issued).unwrap();

        let next_tick = issued + Duration::hours(13);
        assert!(verify_nonce("s", "u", GENERATE_ACTION, &nonce, next_tick));

        let two_ticks_later = issued + Duration::hours(25);
        assert!(!verify_nonce("s", "u", GENERATE_ACTION, &nonce, two_ticks_later));
    }

    #[test]
    fn test_nonce_is_keyed_hmac() {
        let now = DateTime::from_timestamp(TICK_SECONDS * 7, 0).unwrap();
        let mut mac = HmacSha256::new_from_slice(b"secret").unwrap();
        mac.update(format!("7|{}|user_1", GENERATE_ACTION).as_bytes());
        let expected = hex::encode(mac.finalize().into_bytes());

        let nonce = create_nonce("secret", "user_1", GENERATE_ACTION, now).unwrap();
        assert_eq!(nonce, expected[..NONCE_LEN]);
    }

    #[test]
    fn test_nonce_rejects_near_miss() {
        let now = Utc::now();
        let nonce = create_nonce("s", "u", GENERATE_ACTION, now).unwrap();
        let mut tampered: Vec<char> = nonce.chars().collect();
        tampered[NONCE_LEN - 1] = if tampered[NONCE_LEN - 1] == '0' { '1' } else { '0' };
        let tampered: String = tampered.into_iter().collect();
        assert!(!verify_nonce("s", "u", GENERATE_ACTION, &tampered, now));
    }

    #[test]
    fn test_nonce_rejects_garbage() {
        assert!(!verify_nonce("s", "u", GENERATE_ACTION, "", Utc::now()));
        assert!(!verify_nonce("s", "u", GENERATE_ACTION, "not-a-nonce", Utc::now()));
    }
}

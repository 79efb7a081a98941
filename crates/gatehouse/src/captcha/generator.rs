//! Captcha challenge issuance.

use anyhow::Result;
use hearth_common::CaptchaChallenge;
use hearth_common::constants::{CAPTCHA_ALPHABET, CAPTCHA_CODE_LENGTH, redis_keys};
use rand::Rng;
use redis::AsyncCommands;

use super::{CaptchaRenderer, StoredChallenge};

/// Captcha issuance service
pub struct CaptchaIssuer {
    /// Challenge TTL in seconds
    challenge_ttl: u64,
    renderer: CaptchaRenderer,
}

impl CaptchaIssuer {
    pub fn new(challenge_ttl: u64, renderer: CaptchaRenderer) -> Self {
        Self {
            challenge_ttl,
            renderer,
        }
    }

    /// Issue a new challenge: render the code, persist it under a one-time
    /// handle, hand back the handle plus the image.
    pub async fn issue(
        &self,
        redis: &mut redis::aio::ConnectionManager,
    ) -> Result<CaptchaChallenge> {
        let code = generate_code();
        let captcha_key = uuid::Uuid::new_v4().to_string();
        let captcha_image = self.renderer.render(&code)?;

        let now = chrono::Utc::now().timestamp();
        let expires_at = now + self.challenge_ttl as i64;

        let stored = StoredChallenge {
            code,
            created_at: now,
            expires_at,
        };

        let key = format!("{}{}", redis_keys::CAPTCHA_PREFIX, captcha_key);
        let value = serde_json::to_string(&stored)?;
        redis
            .set_ex::<_, _, ()>(&key, &value, self.challenge_ttl)
            .await?;

        tracing::debug!(
            captcha_key = %captcha_key,
            expires_at,
            "Issued captcha challenge"
        );

        Ok(CaptchaChallenge {
            captcha_key,
            captcha_image,
            expires_at,
        })
    }
}

/// Draw a code from the ambiguity-free alphabet.
fn generate_code() -> String {
    let mut rng = rand::rng();
    (0..CAPTCHA_CODE_LENGTH)
        .map(|_| CAPTCHA_ALPHABET[rng.random_range(0..CAPTCHA_ALPHABET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_has_expected_length() {
        assert_eq!(generate_code().chars().count(), CAPTCHA_CODE_LENGTH);
    }

    #[test]
    fn code_never_uses_ambiguous_characters() {
        for _ in 0..200 {
            let code = generate_code();
            for ch in code.chars() {
                assert!(
                    !"0O1IL".contains(ch),
                    "ambiguous character {ch:?} in {code:?}"
                );
                assert!(CAPTCHA_ALPHABET.contains(&(ch as u8)));
            }
        }
    }
}

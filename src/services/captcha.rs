//! Arithmetic CAPTCHA challenges.
//!
//! A challenge is issued per visit and consumed by the first answer, right or
//! wrong. Unanswered challenges expire after the configured TTL, and at most
//! `max_pending` are held at once; past that the oldest is dropped.

use rand::Rng;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// A question and the answer expected for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MathChallenge {
    pub question: String,
    pub answer: String,
}

/// Pick an addition, subtraction or multiplication with a non-negative result.
pub fn generate_challenge<R: Rng>(rng: &mut R) -> MathChallenge {
    let (a, b, symbol, result) = match rng.gen_range(0..3) {
        0 => {
            let a = rng.gen_range(1..=20);
            let b = rng.gen_range(1..=20);
            (a, b, "+", a + b)
        }
        1 => {
            let a = rng.gen_range(10..=30);
            let b = rng.gen_range(1..=a);
            (a, b, "-", a - b)
        }
        _ => {
            let a = rng.gen_range(2..=10);
            let b = rng.gen_range(2..=10);
            (a, b, "×", a * b)
        }
    };

    MathChallenge {
        question: format!("{a} {symbol} {b} = ?"),
        answer: result.to_string(),
    }
}

struct PendingChallenge {
    answer: String,
    issued: Instant,
}

/// Outstanding challenges held before the oldest are evicted
pub const DEFAULT_MAX_PENDING: usize = 10_000;

pub struct CaptchaService {
    ttl: Duration,
    max_pending: usize,
    pending: Mutex<HashMap<String, PendingChallenge>>,
}

impl CaptchaService {
    pub fn new(ttl: Duration) -> Self {
        Self::with_limit(ttl, DEFAULT_MAX_PENDING)
    }

    pub fn with_limit(ttl: Duration, max_pending: usize) -> Self {
        Self {
            ttl,
            max_pending: max_pending.max(1),
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Issue a challenge; returns `(captcha_id, question)`.
    pub async fn issue(&self) -> (String, String) {
        let (id, challenge) = {
            let mut rng = rand::thread_rng();
            let id = hex::encode(rng.gen::<[u8; 16]>());
            (id, generate_challenge(&mut rng))
        };

        let mut pending = self.pending.lock().await;
        let ttl = self.ttl;
        pending.retain(|_, c| c.issued.elapsed() <= ttl);
        while pending.len() >= self.max_pending {
            let Some(oldest) = pending
                .iter()
                .min_by_key(|(_, c)| c.issued)
                .map(|(id, _)| id.clone())
            else {
                break;
            };
            pending.remove(&oldest);
            tracing::warn!(
                captcha_id = %oldest,
                limit = self.max_pending,
                "Evicted oldest captcha"
            );
        }
        pending.insert(
            id.clone(),
            PendingChallenge {
                answer: challenge.answer,
                issued: Instant::now(),
            },
        );
        tracing::debug!(captcha_id = %id, outstanding = pending.len(), "Issued captcha");

        (id, challenge.question)
    }

    /// Check an answer. The challenge is consumed whatever the outcome.
    pub async fn verify(&self, id: &str, answer: &str) -> bool {
        let Some(challenge) = self.pending.lock().await.remove(id) else {
            tracing::debug!(captcha_id = %id, "Unknown or reused captcha");
            return false;
        };
        if challenge.issued.elapsed() > self.ttl {
            tracing::debug!(captcha_id = %id, "Expired captcha");
            return false;
        }
        challenge.answer == answer.trim()
    }

    #[cfg(test)]
    async fn answer_for(&self, id: &str) -> Option<String> {
        self.pending.lock().await.get(id).map(|c| c.answer.clone())
    }

    #[cfg(test)]
    async fn outstanding(&self) -> usize {
        self.pending.lock().await.len()
    }
}

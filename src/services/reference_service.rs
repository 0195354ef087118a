use chrono::{DateTime, Utc};
use rand::{distributions::Alphanumeric, Rng};

const PREFIX: &str = "WF";
const SUFFIX_LEN: usize = 6;

/// Source of human-readable booking references. Collisions are rare but
/// possible; the store's unique index is what actually guarantees uniqueness.
pub trait ReferenceGenerator: Send + Sync {
    fn generate(&self, now: DateTime<Utc>) -> String;
}

/// `WF-<base36 millis>-<random>`, so references sort roughly by creation time.
#[derive(Debug, Default, Clone, Copy)]
pub struct TimestampReferenceGenerator;

impl ReferenceGenerator for TimestampReferenceGenerator {
    fn generate(&self, now: DateTime<Utc>) -> String {
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(SUFFIX_LEN)
            .map(char::from)
            .collect::<String>()
            .to_uppercase();

        format!(
            "{}-{}-{}",
            PREFIX,
            to_base36(now.timestamp_millis().max(0) as u64),
            suffix
        )
    }
}

fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

    if value == 0 {
        return "0".to_string();
    }

    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}

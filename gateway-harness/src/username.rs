use chrono::Utc;
use rand::Rng;

const MAX_PREFIX_LEN: usize = 10;
const MIN_USERNAME_LEN: usize = 3;
const MAX_USERNAME_LEN: usize = 20;

/// A username unlikely to collide across parallel runs, within the services'
/// 3..=20 character rule: up to 10 prefix characters, then the last six digits
/// of the epoch milliseconds and up to three random digits.
pub fn generate_unique_username(prefix: &str) -> String {
    let millis = Utc::now().timestamp_millis().unsigned_abs();
    let random = rand::thread_rng().gen_range(0..10_000);

    compose_username(prefix, millis, random)
}

fn compose_username(prefix: &str, millis: u64, random: u32) -> String {
    let prefix = if prefix.is_empty() { "u" } else { prefix };
    let prefix: String = prefix.chars().take(MAX_PREFIX_LEN).collect();

    let mut username = format!("{}{}{}", prefix, millis % 1_000_000, random % 1_000);
    let length = username.chars().count();

    if length > MAX_USERNAME_LEN {
        username = username.chars().take(MAX_USERNAME_LEN).collect();
    } else if length < MIN_USERNAME_LEN {
        username.push_str("123");
    }

    username
}

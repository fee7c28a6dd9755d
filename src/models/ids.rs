use std::sync::atomic::{AtomicI64, Ordering};
use chrono::Utc;

static LAST_ID: AtomicI64 = AtomicI64::new(0);

/// Returns a millisecond-timestamp id, bumped forward when two ids would collide.
pub fn next_id() -> String {
    let now = Utc::now().timestamp_millis();
    let mut last = LAST_ID.load(Ordering::Relaxed);
    loop {
        let candidate = if now > last { now } else { last + 1 };
        match LAST_ID.compare_exchange_weak(last, candidate, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => return candidate.to_string(),
            Err(actual) => last = actual,
        }
    }
}

//! 시간당 발동 수 추정

use std::time::SystemTime;

const SECONDS_PER_HOUR: u64 = 3_600;

/// `first_seen`부터 `now`까지의 경과 시간(초 단위, 내림)
///
/// 시계가 뒤로 간 경우 0을 반환합니다.
pub fn elapsed_secs(first_seen: SystemTime, now: SystemTime) -> u64 {
    now.duration_since(first_seen)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0)
}

/// 시간당 예상 발동 수를 계산합니다.
///
/// `floor(count / elapsed * 3600)`. 경과 시간이 1초 미만이면 1초로 간주하고,
/// `count == 0`이면 경과 시간과 무관하게 0입니다.
pub fn estimate_hourly(first_seen: SystemTime, count: u64, now: SystemTime) -> u64 {
    if count == 0 {
        return 0;
    }
    let elapsed = elapsed_secs(first_seen, now).max(1);
    count.saturating_mul(SECONDS_PER_HOUR) / elapsed
}

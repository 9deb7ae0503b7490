use super::*;

fn policy(base_ms: u64, jitter: f64, max_attempts: u32) -> RetryPolicy {
    RetryPolicy::new(Duration::from_millis(base_ms), jitter, max_attempts)
}

#[test]
fn test_sequence_length_matches_max_attempts() {
    for max in [0, 1, 5, 25] {
        let backoff = policy(100, 0.05, max).backoff();
        assert_eq!(backoff.len(), max as usize);
        assert_eq!(backoff.count(), max as usize);
    }
}

#[test]
fn test_delays_double_without_jitter() {
    let delays: Vec<Duration> = policy(100, 0.0, 5).backoff().collect();

    assert_eq!(
        delays,
        vec![
            Duration::from_millis(100),
            Duration::from_millis(200),
            Duration::from_millis(400),
            Duration::from_millis(800),
            Duration::from_millis(1600),
        ]
    );
}

#[test]
fn test_max_interval_caps_delay() {
    let delays: Vec<Duration> = policy(100, 0.0, 6)
        .with_max_interval(Duration::from_millis(500))
        .backoff()
        .collect();

    assert_eq!(delays[2], Duration::from_millis(400));
    assert_eq!(delays[3], Duration::from_millis(500));
    assert_eq!(delays[5], Duration::from_millis(500));
}

#[test]
fn test_jittered_delays_stay_within_band() {
    let policy = policy(100, 0.05, 10);

    for seed in 0..50 {
        let backoff = policy.backoff_with_rng(StdRng::seed_from_u64(seed));
        for (attempt, delay) in backoff.enumerate() {
            let nominal = policy.delay_for_attempt(attempt as u32).as_secs_f64();
            let actual = delay.as_secs_f64();
            let (low, high) = (nominal * 0.95 - 1e-9, nominal * 1.05 + 1e-9);
            assert!(actual >= low, "seed {seed}: {actual} < {nominal}");
            assert!(actual <= high, "seed {seed}: {actual} > {nominal}");
        }
    }
}

#[test]
fn test_same_seed_gives_same_sequence() {
    let policy = policy(100, 0.5, 8);

    let first: Vec<Duration> = policy.backoff_with_rng(StdRng::seed_from_u64(7)).collect();
    let second: Vec<Duration> = policy.backoff_with_rng(StdRng::seed_from_u64(7)).collect();

    assert_eq!(first, second);
}

#[test]
fn test_sequences_are_independent() {
    let policy = policy(10, 0.0, 3);
    let mut first = policy.backoff();
    first.next();
    first.next();

    let second = policy.backoff();

    assert_eq!(first.attempts(), 2);
    assert_eq!(second.attempts(), 0);
    assert_eq!(second.count(), 3);
}

#[test]
fn test_exhaustion_is_sticky() {
    let mut backoff = policy(1, 0.0, 1).backoff();

    assert!(!backoff.is_exhausted());
    assert!(backoff.next().is_some());
    assert!(backoff.is_exhausted());
    assert!(backoff.next().is_none());
    assert!(backoff.next().is_none());
}

#[test]
fn test_total_wait_is_bounded() {
    let base = Duration::from_millis(100);
    let jitter = 0.05;

    for max in [1u32, 3, 10] {
        let policy = RetryPolicy::new(base, jitter, max);
        let bound = base.as_secs_f64() * (2f64.powi(max as i32 + 1) - 1.0) * (1.0 + jitter);

        assert!(policy.max_total_wait().as_secs_f64() <= bound + 1e-9);

        for seed in 0..20 {
            let total: Duration = policy
                .backoff_with_rng(StdRng::seed_from_u64(seed))
                .sum();
            assert!(total <= policy.max_total_wait(), "seed {seed}, max {max}");
        }
    }
}

#[test]
fn test_jitter_is_clamped() {
    assert_eq!(policy(100, 3.0, 1).jitter(), 1.0);
    assert_eq!(policy(100, -0.5, 1).jitter(), 0.0);
    assert_eq!(policy(100, f64::NAN, 1).jitter(), 0.0);
}

#[test]
fn test_huge_attempt_counts_do_not_overflow() {
    let policy = policy(1000, 1.0, 200).with_max_interval(Duration::from_secs(30));

    assert_eq!(policy.delay_for_attempt(199), Duration::from_secs(30));
    assert!(policy.backoff().all(|d| d <= Duration::from_secs(60)));
}

#[test]
fn test_default_policy() {
    let policy = RetryPolicy::default();

    assert_eq!(policy.base(), Duration::from_millis(100));
    assert_eq!(policy.max_attempts(), 10);
    assert_eq!(policy.max_interval(), Duration::from_secs(5));
    assert!((policy.jitter() - 0.05).abs() < f64::EPSILON);
}

use super::*;

#[tokio::test(start_paused = true)]
async fn exhausted_run_sleeps_between_attempts_only() {
    let started = tokio::time::Instant::now();
    let out = retry_with_backoff(4, Duration::from_millis(100), |_| async { Attempt::Retry }).await;
    assert_eq!(
        out,
        RetryOutcome {
            succeeded: false,
            attempts: 4,
            backoffs: 3
        }
    );
    assert_eq!(started.elapsed(), Duration::from_millis(300));
}

#[tokio::test(start_paused = true)]
async fn success_stops_early() {
    let mut seen = Vec::new();
    let out = retry_with_backoff(5, Duration::from_millis(10), |idx| {
        seen.push(idx);
        async move {
            if idx == 2 {
                Attempt::Succeeded
            } else {
                Attempt::Retry
            }
        }
    })
    .await;
    assert!(out.succeeded);
    assert_eq!(out.attempts, 3);
    assert_eq!(out.backoffs, 2);
    assert_eq!(seen, vec![0, 1, 2]);
}

#[tokio::test(start_paused = true)]
async fn give_up_stops_without_further_backoff() {
    let started = tokio::time::Instant::now();
    let out = retry_with_backoff(5, Duration::from_secs(1), |_| async { Attempt::GiveUp }).await;
    assert!(!out.succeeded);
    assert_eq!(out.attempts, 1);
    assert_eq!(out.backoffs, 0);
    assert_eq!(started.elapsed(), Duration::ZERO);
}

#[tokio::test]
async fn zero_attempts_reports_failure() {
    let out = retry_with_backoff(0, Duration::from_secs(1), |_| async { Attempt::Succeeded }).await;
    assert_eq!(out, RetryOutcome::default());
}

use parking_lot::Mutex;
use rand::Rng;
use std::sync::Once;
use std::time::{Duration, Instant};
use waitall::prelude::*;

fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

fn deadline(ms: u64) -> CancelToken {
    CancelToken::with_timeout(Duration::from_millis(ms))
}

#[test]
fn test_wait_all_randomized_delays_keep_order() {
    init_tracing();
    let token = deadline(1000);

    let delays: Vec<u64> = {
        let mut rng = rand::thread_rng();
        (0..5).map(|_| rng.gen_range(0..100)).collect()
    };

    let waitables = delays.iter().enumerate().map(|(i, &delay)| {
        move |_: &CancelToken| -> Result<usize> {
            std::thread::sleep(Duration::from_millis(delay));
            Ok(i + 1)
        }
    });

    let (results, errors) = wait_all(Some(&token), waitables);

    assert_eq!(results, vec![1, 2, 3, 4, 5]);
    assert_eq!(errors, vec![None, None, None, None, None]);
}

#[test]
fn test_wait_all_completion_order_differs_from_slot_order() {
    init_tracing();
    let token = deadline(1000);
    let (tx, rx) = crossbeam_channel::unbounded();

    let waitables = (0..4u64).map(|i| {
        let tx = tx.clone();
        move |_: &CancelToken| -> Result<u64> {
            std::thread::sleep(Duration::from_millis(20 * (4 - i)));
            let _ = tx.send(i);
            Ok(i * 100)
        }
    });

    let (results, _) = wait_all(Some(&token), waitables);
    drop(tx);

    let finished: Vec<u64> = rx.iter().collect();
    assert_eq!(finished, vec![3, 2, 1, 0]);
    assert_eq!(results, vec![0, 100, 200, 300]);
}

#[test]
fn test_wait_all_reports_failures_by_slot() {
    init_tracing();
    let token = deadline(1000);

    let waitables = (1..=5).map(|i| {
        move |_: &CancelToken| {
            let pause = rand::thread_rng().gen_range(0..50);
            std::thread::sleep(Duration::from_millis(pause));
            if i == 3 || i == 4 {
                return Err(Error::task_failed(format!("error for {}", i)));
            }
            Ok(i)
        }
    });

    let (results, errors) = wait_all(Some(&token), waitables);

    assert_eq!(results, vec![1, 2, 0, 0, 5]);
    assert_eq!(
        errors,
        vec![
            None,
            None,
            Some(Error::task_failed("error for 3")),
            Some(Error::task_failed("error for 4")),
            None,
        ]
    );
}

#[test]
fn test_wait_all_zero_waitables() {
    let waitables: Vec<Waitable<'_, u8, Error>> = Vec::new();

    let start = Instant::now();
    let (results, errors) = wait_all(None, waitables);

    assert!(results.is_empty());
    assert!(errors.is_empty());
    assert!(start.elapsed() < Duration::from_millis(50));
}

#[test]
fn test_deadline_only_hits_slow_cooperating_tasks() {
    init_tracing();
    let token = deadline(80);

    let waitables = [10u64, 1000, 20, 1000].into_iter().enumerate().map(|(i, delay)| {
        move |token: &CancelToken| {
            if sleep(token, Duration::from_millis(delay)) {
                return Err(token.error().unwrap_or(Error::Cancelled));
            }
            Ok(i as i32 + 1)
        }
    });

    let (results, errors) = wait_all(Some(&token), waitables);

    assert_eq!(results, vec![1, 0, 3, 0]);
    assert_eq!(
        errors,
        vec![
            None,
            Some(Error::DeadlineExceeded),
            None,
            Some(Error::DeadlineExceeded),
        ]
    );
}

#[test]
fn test_explicit_cancel_from_another_thread() {
    init_tracing();
    let token = CancelToken::new();
    let canceller = token.clone();

    let handle = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(30));
        canceller.cancel();
    });

    let waitables = (0..3).map(|_| {
        |token: &CancelToken| -> Result<bool> {
            if sleep(token, Duration::from_secs(10)) {
                return Err(token.error().unwrap_or(Error::Cancelled));
            }
            Ok(true)
        }
    });

    let start = Instant::now();
    let (results, errors) = wait_all(Some(&token), waitables);
    handle.join().unwrap();

    assert!(start.elapsed() < Duration::from_secs(5));
    assert_eq!(results, vec![false, false, false]);
    assert!(errors.iter().all(|e| *e == Some(Error::Cancelled)));
}

#[test]
fn test_rerun_with_fresh_token_is_idempotent() {
    let run = || {
        let token = deadline(1000);
        wait_all(
            Some(&token),
            (0..6).map(|i| move |_: &CancelToken| Ok::<_, Error>(i * i)),
        )
    };

    assert_eq!(run(), run());
}

#[test]
fn test_parallel_map_scenarios() {
    init_tracing();

    let (results, errors) = parallel_map(vec![1, 2, 3, 4, 5], Duration::from_secs(1), |_, v| {
        Ok::<_, Error>(v * v)
    });
    assert_eq!(results, vec![1, 4, 9, 16, 25]);
    assert_eq!(errors, vec![None, None, None, None, None]);

    let (results, errors) = parallel_map(vec![1, 2, 3], Duration::from_millis(100), |token, v| {
        if sleep(token, Duration::from_secs(1)) {
            return Err(token.error().unwrap_or(Error::Cancelled));
        }
        Ok(v * v)
    });
    assert_eq!(results, vec![0, 0, 0]);
    assert_eq!(
        errors,
        vec![
            Some(Error::DeadlineExceeded),
            Some(Error::DeadlineExceeded),
            Some(Error::DeadlineExceeded),
        ]
    );
}

#[test]
fn test_parallel_map_runs_concurrently() {
    let start = Instant::now();
    let (results, _) = parallel_map(0..8, Duration::from_secs(2), |_, v: u32| {
        std::thread::sleep(Duration::from_millis(100));
        Ok::<_, Error>(v)
    });

    assert_eq!(results, (0..8).collect::<Vec<_>>());
    assert!(start.elapsed() < Duration::from_millis(700));
}

#[test]
fn test_parallel_map_with_parent_deadline() {
    let parent = deadline(50);

    let (results, errors) = parallel_map_with(
        &parent,
        vec!["a", "b"],
        Duration::from_secs(10),
        |token, s| {
            if sleep(token, Duration::from_secs(5)) {
                return Err(token.error().unwrap_or(Error::Cancelled));
            }
            Ok(s.to_uppercase())
        },
    );

    assert_eq!(results, vec![String::new(), String::new()]);
    assert_eq!(
        errors,
        vec![Some(Error::DeadlineExceeded), Some(Error::DeadlineExceeded)]
    );
}

#[test]
fn test_mapper_shares_state() {
    let seen = Mutex::new(Vec::new());

    let (_, errors) = parallel_map(vec![3, 1, 2], Duration::from_secs(1), |_, v: i32| {
        seen.lock().push(v);
        Ok::<_, Error>(())
    });

    let mut seen = seen.into_inner();
    seen.sort_unstable();
    assert_eq!(seen, vec![1, 2, 3]);
    assert!(errors.iter().all(Option::is_none));
}

#[test]
fn test_custom_barrier_config() {
    let config = Config::builder()
        .default_deadline(Duration::from_millis(40))
        .thread_name_prefix("lookup")
        .stack_size(128 * 1024)
        .build()
        .unwrap();
    let barrier = Barrier::new(config).unwrap();

    let waitables = (0..2).map(|_| {
        |token: &CancelToken| -> Result<String> {
            let name = std::thread::current().name().unwrap_or_default().to_string();
            if sleep(token, Duration::from_secs(5)) {
                return Err(Error::Other(name));
            }
            Ok(name)
        }
    });

    let (results, errors) = barrier.wait_all(None, waitables);

    assert_eq!(results, vec![String::new(), String::new()]);
    assert_eq!(
        errors,
        vec![
            Some(Error::Other("lookup-0".to_string())),
            Some(Error::Other("lookup-1".to_string())),
        ]
    );
}

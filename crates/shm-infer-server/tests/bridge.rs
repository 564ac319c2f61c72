//! End-to-end bridge tests over real slot files

use shm_bridge::{SlotChannel, SlotConfig};
use shm_infer_client::Producer;
use shm_infer_core::{BridgeError, Result, Shape, encode};
use shm_infer_engine::{Engine, FnPredictor, Predictor};
use shm_infer_server::{BridgeConfig, BridgeServer, BridgeStats, PollLoop};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::sleep;

const DEADLINE: Duration = Duration::from_millis(500);

/// `[x0 * 2, x1 + 1]`
fn stub_engine() -> Engine {
    let predictor = FnPredictor::new(Shape::default(), |x: &[f32]| vec![x[0] * 2.0, x[1] + 1.0]);
    Engine::new(predictor, Shape::default()).unwrap()
}

struct Running {
    stop: oneshot::Sender<()>,
    handle: JoinHandle<Result<BridgeStats>>,
}

impl Running {
    async fn stop(self) -> BridgeStats {
        let _ = self.stop.send(());
        self.handle.await.unwrap().unwrap()
    }
}

fn spawn_bridge(dir: &TempDir, engine: Engine) -> Running {
    let config = BridgeConfig::with_channel(SlotConfig::with_dir(dir.path()));
    let server = BridgeServer::new(engine, config).unwrap();
    let (stop, stop_rx) = oneshot::channel::<()>();
    let handle = tokio::spawn(server.run_until(async move {
        let _ = stop_rx.await;
    }));
    Running { stop, handle }
}

async fn wait_until<F: FnMut() -> bool>(mut done: F) -> bool {
    let start = Instant::now();
    while start.elapsed() < DEADLINE {
        if done() {
            return true;
        }
        sleep(Duration::from_millis(1)).await;
    }
    done()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_end_to_end_scenario() {
    let dir = TempDir::new().unwrap();
    let running = spawn_bridge(&dir, stub_engine());
    let config = SlotConfig::with_dir(dir.path());

    std::fs::write(&config.request_path, encode(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0])).unwrap();

    let response_path = config.response_path.clone();
    assert!(wait_until(|| response_path.exists()).await, "no response published");

    assert_eq!(std::fs::read(&config.response_path).unwrap(), encode(&[2.0, 3.0]));
    assert_eq!(std::fs::read(&config.response_path).unwrap().len(), 8);
    assert!(!config.request_path.exists());

    let stats = running.stop().await;
    assert_eq!(stats.served, 1);
    assert_eq!(stats.dropped, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_producer_ping_pong() {
    let dir = TempDir::new().unwrap();
    let running = spawn_bridge(&dir, stub_engine());
    let producer = Producer::new(SlotConfig::with_dir(dir.path()));

    for i in 0..5 {
        let x = i as f32;
        let response = producer
            .request(&[x, x, 0.0, 0.0, 0.0, 0.0], DEADLINE)
            .await
            .unwrap();
        assert_eq!(response, vec![x * 2.0, x + 1.0]);
    }

    let stats = running.stop().await;
    assert_eq!(stats.served, 5);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_malformed_request_is_ignored() {
    let dir = TempDir::new().unwrap();
    let running = spawn_bridge(&dir, stub_engine());
    let producer = Producer::new(SlotConfig::with_dir(dir.path()));

    let short = encode(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    producer.submit_raw(&short[..23]).await.unwrap();

    sleep(Duration::from_millis(50)).await;
    assert!(producer.try_take_response().await.unwrap().is_none());
    assert!(producer.request_pending().await, "short request must not be consumed");
    assert!(!running.handle.is_finished());

    let response = producer
        .request(&[4.0, 5.0, 0.0, 0.0, 0.0, 0.0], DEADLINE)
        .await
        .unwrap();
    assert_eq!(response, vec![8.0, 6.0]);

    let stats = running.stop().await;
    assert_eq!(stats.served, 1);
    assert_eq!(stats.dropped, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_partial_request_becomes_ready() {
    let dir = TempDir::new().unwrap();
    let running = spawn_bridge(&dir, stub_engine());
    let producer = Producer::new(SlotConfig::with_dir(dir.path()));
    let config = producer.config().clone();
    let request = encode(&[3.0, 3.0, 0.0, 0.0, 0.0, 0.0]);

    // Producer writing in two steps; the bridge must wait for the full length
    std::fs::write(&config.request_path, &request[..12]).unwrap();
    sleep(Duration::from_millis(20)).await;
    assert!(config.request_path.exists());

    std::fs::write(&config.request_path, &request).unwrap();
    let response = producer.take_response_timeout(DEADLINE).await.unwrap();
    assert_eq!(response, vec![6.0, 4.0]);

    running.stop().await;
}

/// Sleeps inside `predict` and records how many calls overlap
struct SlowPredictor {
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
    calls: Arc<AtomicUsize>,
}

impl Predictor for SlowPredictor {
    fn input_size(&self) -> usize {
        6
    }

    fn output_size(&self) -> usize {
        2
    }

    fn predict(&self, input: &[f32]) -> Result<Vec<f32>> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(30));
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![input[0], input[1]])
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_at_most_one_in_flight() {
    let dir = TempDir::new().unwrap();
    let max_in_flight = Arc::new(AtomicUsize::new(0));
    let calls = Arc::new(AtomicUsize::new(0));
    let predictor = SlowPredictor {
        in_flight: Arc::new(AtomicUsize::new(0)),
        max_in_flight: max_in_flight.clone(),
        calls: calls.clone(),
    };
    let engine = Engine::new(predictor, Shape::default()).unwrap();
    let running = spawn_bridge(&dir, engine);
    let producer = Producer::new(SlotConfig::with_dir(dir.path()));

    // First request; once it is taken the bridge is inside predict
    producer.submit(&[1.0, 1.0, 0.0, 0.0, 0.0, 0.0]).await.unwrap();
    let request_path = producer.config().request_path.clone();
    assert!(wait_until(|| !request_path.exists()).await);

    // Second request lands while the first is still being predicted
    producer.submit(&[2.0, 2.0, 0.0, 0.0, 0.0, 0.0]).await.unwrap();

    let counter = calls.clone();
    assert!(wait_until(|| counter.load(Ordering::SeqCst) == 2).await);

    // The second response replaces the unread first one
    let response_path = producer.config().response_path.clone();
    let expected = encode(&[2.0, 2.0]);
    assert!(
        wait_until(|| std::fs::read(&response_path).is_ok_and(|data| data == expected)).await
    );
    assert_eq!(max_in_flight.load(Ordering::SeqCst), 1);

    let stats = running.stop().await;
    assert_eq!(stats.served, 2);
}

/// Fails for negative inputs
struct Picky;

impl Predictor for Picky {
    fn input_size(&self) -> usize {
        6
    }

    fn output_size(&self) -> usize {
        2
    }

    fn predict(&self, input: &[f32]) -> Result<Vec<f32>> {
        if input[0] < 0.0 {
            return Err(BridgeError::PredictionError("out of domain".into()));
        }
        Ok(vec![input[0], 0.0])
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_prediction_failure_keeps_serving() {
    let dir = TempDir::new().unwrap();
    let engine = Engine::new(Picky, Shape::default()).unwrap();
    let running = spawn_bridge(&dir, engine);
    let producer = Producer::new(SlotConfig::with_dir(dir.path()));

    producer.submit(&[-1.0, 0.0, 0.0, 0.0, 0.0, 0.0]).await.unwrap();
    let request_path = producer.config().request_path.clone();
    assert!(wait_until(|| !request_path.exists()).await);
    sleep(Duration::from_millis(20)).await;
    assert!(producer.try_take_response().await.unwrap().is_none());

    let response = producer
        .request(&[0.5, 0.0, 0.0, 0.0, 0.0, 0.0], DEADLINE)
        .await
        .unwrap();
    assert_eq!(response, vec![0.5, 0.0]);

    let stats = running.stop().await;
    assert_eq!(stats.served, 1);
    assert_eq!(stats.dropped_by_kind.get("prediction"), Some(&1));
}

#[tokio::test]
async fn test_poll_loop_over_slot_channel() {
    let dir = TempDir::new().unwrap();
    let config = SlotConfig::with_dir(dir.path());
    let channel = SlotChannel::new(config.clone());
    let mut poll_loop = PollLoop::new(channel, stub_engine(), Duration::from_millis(1));

    poll_loop.tick().await;
    assert_eq!(poll_loop.stats().served, 0);

    tokio_test::assert_ok!(std::fs::write(&config.request_path, encode(&[0.5; 6])));
    poll_loop.tick().await;

    assert_eq!(poll_loop.stats().served, 1);
    assert_eq!(std::fs::read(&config.response_path).unwrap(), encode(&[1.0, 1.5]));
}

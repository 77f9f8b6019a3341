use std::sync::Arc;

use rand::Rng;
use tokio::task::LocalSet;

use crate::client::{ClientConfig, Connection};
use crate::stats::RequestCounter;
use crate::target::TargetAddress;

/// The set of connections driven on the shared event loop.
///
/// Each connection is assigned a target chosen independently and uniformly at
/// random at construction time and keeps it for the life of the process; with
/// a single configured target every connection naturally lands on it. After
/// [`Pool::spawn_on`] the pool performs no further supervision; recovery is
/// each connection's own job.
#[derive(Debug)]
pub struct Pool {
    connections: Vec<Connection>,
}

impl Pool {
    /// Construct `count` connections against the (non-empty) target set.
    pub fn build(
        targets: &[TargetAddress],
        count: usize,
        counter: Arc<RequestCounter>,
        config: &ClientConfig,
    ) -> Self {
        assert!(!targets.is_empty(), "at least one target address required");
        let mut rng = rand::thread_rng();
        let connections = (0..count)
            .map(|_| {
                let target = targets[rng.gen_range(0..targets.len())].clone();
                Connection::new(target, counter.clone(), config)
            })
            .collect();
        Self { connections }
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    pub fn connections(&self) -> &[Connection] {
        self.connections.as_slice()
    }

    /// Start every connection's request cycle on the given event loop.
    pub fn spawn_on(self, local: &LocalSet) {
        info!("starting {} connections", self.connections.len());
        for conn in self.connections {
            local.spawn_local(conn.run());
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::Ordering;
    use std::time::{Duration, Instant};

    use crate::client::testutil::{spawn_server, ServerStats};
    use crate::stats::throughput;

    use super::*;

    fn targets(n: usize) -> Vec<TargetAddress> {
        (0..n)
            .map(|i| TargetAddress::new(format!("10.0.0.{}", i + 1), 8080))
            .collect()
    }

    #[test]
    fn pool_has_exactly_the_requested_count() {
        let counter = Arc::new(RequestCounter::new());
        let pool = Pool::build(&targets(1), 10, counter, &ClientConfig::default());
        assert_eq!(10, pool.len());
    }

    #[test]
    fn single_target_is_assigned_to_every_connection() {
        let counter = Arc::new(RequestCounter::new());
        let targets = targets(1);
        let pool = Pool::build(&targets, 25, counter, &ClientConfig::default());
        for conn in pool.connections() {
            assert_eq!(&targets[0], conn.target());
        }
    }

    #[test]
    fn single_connection_takes_the_general_path() {
        let counter = Arc::new(RequestCounter::new());
        let targets = targets(3);
        let pool = Pool::build(&targets, 1, counter, &ClientConfig::default());
        assert_eq!(1, pool.len());
        assert!(targets.contains(pool.connections()[0].target()));
    }

    #[test]
    fn assignment_is_roughly_uniform() {
        let counter = Arc::new(RequestCounter::new());
        let targets = targets(4);
        let count = 2000;
        let pool = Pool::build(&targets, count, counter, &ClientConfig::default());

        let mut by_target: HashMap<&TargetAddress, usize> = HashMap::new();
        for conn in pool.connections() {
            *by_target.entry(conn.target()).or_insert(0) += 1;
        }

        assert_eq!(4, by_target.len());
        // expectation 500 each; +/-150 is > 7 standard deviations
        for (target, n) in by_target {
            assert!(
                (350..=650).contains(&n),
                "target {} got {} of {} connections",
                target,
                n,
                count
            );
        }
    }

    #[test]
    #[should_panic(expected = "at least one target")]
    fn empty_target_set_panics() {
        let counter = Arc::new(RequestCounter::new());
        let _ = Pool::build(&[], 1, counter, &ClientConfig::default());
    }

    #[tokio::test]
    async fn ten_connections_sustain_positive_throughput() {
        let stats = Arc::new(ServerStats::default());
        let addr = spawn_server("HTTP/1.1 200 OK", usize::MAX, stats.clone());
        let counter = Arc::new(RequestCounter::new());
        let targets = vec![TargetAddress::new(addr.ip().to_string(), addr.port())];
        let pool = Pool::build(&targets, 10, counter.clone(), &ClientConfig::default());

        let local = LocalSet::new();
        pool.spawn_on(&local);
        local
            .run_until(async {
                let started = Instant::now();
                tokio::time::timeout(Duration::from_secs(10), async {
                    while counter.value() < 100 {
                        tokio::time::sleep(Duration::from_millis(5)).await;
                    }
                })
                .await
                .expect("timed out waiting for warm-up");

                // counter is monotonic while cycles keep running
                let before = counter.value();
                tokio::time::sleep(Duration::from_millis(50)).await;
                let after = counter.value();
                assert!(after >= before);

                let rate = throughput(0, after, started.elapsed());
                assert!(rate > 0.0);
            })
            .await;

        // all ten independent cycles connected
        assert_eq!(10, stats.accepts.load(Ordering::SeqCst));
    }
}

mod support;

use std::collections::HashMap;

use kvcache::infra::telemetry::describe_metrics;
use metrics_util::debugging::{DebugValue, DebuggingRecorder};

use support::memory_state;

#[tokio::test]
async fn cache_operations_emit_counters() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");
    describe_metrics();

    let (state, _) = memory_state();
    let cache = state.cache;

    cache
        .write(Some("k".into()), Some("v".into()))
        .await
        .expect("write");
    cache.read("k").await.expect("hit");
    cache.read("missing").await.expect("miss");
    cache.delete("k").await.expect("delete");
    cache.read("").await.expect_err("empty key is rejected");

    let counters: HashMap<String, u64> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .filter_map(|(composite_key, _, _, value)| match value {
            DebugValue::Counter(count) => Some((composite_key.key().name().to_string(), count)),
            _ => None,
        })
        .collect();

    let expected = [
        ("kvcache_write_total", 1),
        ("kvcache_read_hit_total", 1),
        ("kvcache_read_miss_total", 1),
        ("kvcache_delete_total", 1),
        ("kvcache_validation_failure_total", 1),
    ];

    for (metric, count) in expected {
        assert_eq!(counters.get(metric), Some(&count), "metric: {metric}");
    }
}

//! Engine tests
//!
//! Drive the reconciliation engine step by step against the in-memory store
//! and the scripted control plane.

mod common;

use common::{kafka, pg, with_auth_secret, FakeControlPlane, MemoryStore, FAKE_CA};
use k8s_openapi::api::core::v1::Secret;
use kube::ResourceExt;
use managed_service_operator::adapter::{self, AdapterFactory};
use managed_service_operator::constants::{MANAGED_BY_LABEL, SERVICE_FINALIZER};
use managed_service_operator::controller::dispatcher::KeyReconciler;
use managed_service_operator::controller::engine::{Engine, EngineSettings};
use managed_service_operator::controller::{ObjectKey, ReconcileResult, RequeueReason};
use managed_service_operator::crd::{
    ConnInfoSecretTarget, Kafka, ManagedResource, Phase, Redis, RedisSpec, PG,
};
use managed_service_operator::remote::RemoteError;
use std::sync::Arc;
use std::time::Duration;

struct Harness<K: ManagedResource> {
    store: Arc<MemoryStore<K>>,
    control_plane: Arc<FakeControlPlane>,
    engine: Engine<K>,
}

impl<K: ManagedResource> Harness<K> {
    fn new(factory: AdapterFactory<K>) -> Self {
        Self::with_settings(factory, EngineSettings::default())
    }

    fn with_settings(factory: AdapterFactory<K>, settings: EngineSettings) -> Self {
        let store = Arc::new(MemoryStore::<K>::new());
        let control_plane = Arc::new(FakeControlPlane::new());
        let engine = Engine::new(
            store.clone(),
            store.clone(),
            control_plane.clone(),
            factory,
            settings,
        );
        Self {
            store,
            control_plane,
            engine,
        }
    }

    async fn step(&self, key: &ObjectKey) -> ReconcileResult {
        self.engine.reconcile(key).await
    }

    fn phase(&self, key: &ObjectKey) -> Option<Phase> {
        self.store.status(key).map(|s| s.phase)
    }

    fn has_finalizer(&self, key: &ObjectKey) -> bool {
        self.store
            .object(key)
            .is_some_and(|o| o.finalizers().iter().any(|f| f == SERVICE_FINALIZER))
    }
}

fn retry(delay: u64, reason: RequeueReason) -> ReconcileResult {
    ReconcileResult::RetryAfter {
        delay: Duration::from_secs(delay),
        reason,
    }
}

/// Create, then flip the remote service to RUNNING and reach Ready
async fn provision(h: &Harness<PG>, key: &ObjectKey) {
    h.step(key).await;
    h.control_plane.set_state("p1", &key.name, "RUNNING");
    assert!(matches!(h.step(key).await, ReconcileResult::Success { .. }));
}

#[tokio::test]
async fn test_create_then_ready() {
    let h = Harness::new(adapter::pg::adapter);
    let key = h.store.insert(pg("p1-db"));
    assert_eq!(h.phase(&key), None);

    let result = h.step(&key).await;
    assert_eq!(result, retry(10, RequeueReason::Provisioning));
    assert_eq!(h.phase(&key), Some(Phase::Provisioning));
    assert!(h.has_finalizer(&key));
    assert_eq!(h.control_plane.count("create_service"), 1);

    // Still REBUILDING: poll with backoff, no second create
    let result = h.step(&key).await;
    assert_eq!(result, retry(5, RequeueReason::Provisioning));
    assert_eq!(h.phase(&key), Some(Phase::Provisioning));

    h.control_plane.set_state("p1", "p1-db", "RUNNING");
    let result = h.step(&key).await;
    assert_eq!(
        result,
        ReconcileResult::Success {
            resync_after: Some(Duration::from_secs(1800))
        }
    );

    let status = h.store.status(&key).unwrap();
    assert_eq!(status.phase, Phase::Ready);
    assert_eq!(status.state.as_deref(), Some("RUNNING"));
    assert_eq!(status.observed_generation, Some(1));
    assert_eq!(status.ready_condition().unwrap().status, "True");
    assert_eq!(h.control_plane.count("create_service"), 1);

    let data = h.store.secret_data("default", "p1-db").unwrap();
    assert!(data["DATABASE_URI"].starts_with("postgres://"));
    assert_eq!(data["PGUSER"], "avnadmin");
    assert_eq!(data["PGSSLMODE"], "require");
    assert!(data.values().all(|v| !v.is_empty()));
}

#[tokio::test]
async fn test_secret_is_owned_by_descriptor() {
    let h = Harness::new(adapter::pg::adapter);
    let key = h.store.insert(pg("p1-db"));
    provision(&h, &key).await;

    let secret: Secret = h.store.secret("default", "p1-db").unwrap();
    let owner = &secret.owner_references()[0];
    assert_eq!(owner.kind, "PG");
    assert_eq!(owner.name, "p1-db");
    assert_eq!(owner.controller, Some(true));
    assert_eq!(owner.block_owner_deletion, Some(true));
    assert_eq!(secret.labels()["app"], "p1-db");
    assert!(secret.labels().contains_key(MANAGED_BY_LABEL));
}

#[tokio::test]
async fn test_delete_waits_for_remote_absence() {
    let h = Harness::new(adapter::pg::adapter);
    let key = h.store.insert(pg("p1-db"));
    provision(&h, &key).await;

    h.store.mark_deleted(&key);
    let result = h.step(&key).await;
    assert_eq!(result, retry(10, RequeueReason::Deleting));
    assert!(h.has_finalizer(&key));
    assert_eq!(h.phase(&key), Some(Phase::Deleting));

    // Remote now reports NotFound: finalizer released, descriptor gone
    let result = h.step(&key).await;
    assert_eq!(result, ReconcileResult::Success { resync_after: None });
    assert!(h.store.object(&key).is_none());
    assert_eq!(h.control_plane.count("delete_service"), 2);

    let result = h.step(&key).await;
    assert_eq!(result, ReconcileResult::Success { resync_after: None });
}

#[tokio::test]
async fn test_transient_delete_error_keeps_finalizer() {
    let h = Harness::new(adapter::pg::adapter);
    let key = h.store.insert(pg("p1-db"));
    provision(&h, &key).await;

    h.store.mark_deleted(&key);
    h.control_plane
        .fail_next("delete_service", RemoteError::from_status(503, "unavailable"));
    assert_eq!(h.step(&key).await, retry(10, RequeueReason::Deleting));
    assert!(h.has_finalizer(&key));
    assert!(h.control_plane.service("p1", "p1-db").is_some());
}

#[tokio::test]
async fn test_fatal_delete_error_keeps_finalizer() {
    let h = Harness::new(adapter::pg::adapter);
    let key = h.store.insert(pg("p1-db"));
    provision(&h, &key).await;

    h.store.mark_deleted(&key);
    h.control_plane.fail_next(
        "delete_service",
        RemoteError::from_status(400, "termination protection is enabled"),
    );
    let result = h.step(&key).await;
    assert!(matches!(result, ReconcileResult::Terminal { .. }));
    assert!(h.has_finalizer(&key));
    assert_eq!(h.phase(&key), Some(Phase::Failed));
}

#[tokio::test]
async fn test_missing_project_waits_without_mutation() {
    let h = Harness::new(adapter::pg::adapter);
    let mut obj = pg("p2-db");
    obj.spec.service.project = "p2".to_string();
    let key = h.store.insert(obj);

    let result = h.step(&key).await;
    assert_eq!(result, retry(10, RequeueReason::WaitingForPrecondition));
    assert_eq!(h.phase(&key), Some(Phase::Waiting));
    assert!(!h.control_plane.mutated());
    assert!(h.has_finalizer(&key));

    h.control_plane.add_project("p2");
    assert_eq!(h.step(&key).await, retry(10, RequeueReason::Provisioning));
    assert_eq!(h.control_plane.count("create_service"), 1);
}

#[tokio::test]
async fn test_inactive_vpc_waits() {
    let h = Harness::new(adapter::pg::adapter);
    let mut obj = pg("p1-db");
    obj.spec.service.project_vpc_id = Some("vpc-1".to_string());
    let key = h.store.insert(obj);
    h.control_plane.add_vpc("p1", "vpc-1", "APPROVED");

    assert_eq!(
        h.step(&key).await,
        retry(10, RequeueReason::WaitingForPrecondition)
    );
    assert!(!h.control_plane.mutated());

    h.control_plane.add_vpc("p1", "vpc-1", "ACTIVE");
    assert_eq!(h.step(&key).await, retry(10, RequeueReason::Provisioning));
    let service = h.control_plane.service("p1", "p1-db").unwrap();
    assert_eq!(service.project_vpc_id.as_deref(), Some("vpc-1"));
}

#[tokio::test]
async fn test_missing_auth_secret_waits() {
    let h = Harness::new(adapter::pg::adapter);
    let key = h
        .store
        .insert(with_auth_secret(pg("p1-db"), "aiven-token", "token"));

    assert_eq!(
        h.step(&key).await,
        retry(10, RequeueReason::WaitingForPrecondition)
    );
    let status = h.store.status(&key).unwrap();
    assert_eq!(status.phase, Phase::Waiting);
    assert!(status.message.unwrap().contains("not found"));
    assert_eq!(h.control_plane.total_calls(), 0);

    h.store.put_secret("default", "aiven-token", &[("other", "x")]);
    h.step(&key).await;
    let status = h.store.status(&key).unwrap();
    assert!(status.message.unwrap().contains("has no key token"));

    h.store.put_secret("default", "aiven-token", &[("token", "abc")]);
    assert_eq!(h.step(&key).await, retry(10, RequeueReason::Provisioning));
}

#[tokio::test]
async fn test_absent_descriptor_is_noop() {
    let h = Harness::new(adapter::pg::adapter);
    let result = h.step(&ObjectKey::new("default", "ghost")).await;
    assert_eq!(result, ReconcileResult::Success { resync_after: None });
    assert_eq!(h.control_plane.total_calls(), 0);
}

#[tokio::test]
async fn test_create_is_never_repeated() {
    let h = Harness::new(adapter::pg::adapter);
    let key = h.store.insert(pg("p1-db"));

    for _ in 0..4 {
        h.step(&key).await;
    }
    assert_eq!(h.control_plane.count("create_service"), 1);
    assert_eq!(h.control_plane.count("update_service"), 3);
    assert_eq!(h.control_plane.service_count(), 1);
}

#[tokio::test]
async fn test_create_skipped_when_existence_unknown() {
    let h = Harness::new(adapter::pg::adapter);
    let key = h.store.insert(pg("p1-db"));
    h.control_plane
        .fail_next("get_service", RemoteError::from_status(502, "bad gateway"));

    assert_eq!(h.step(&key).await, retry(5, RequeueReason::ErrorBackoff));
    assert_eq!(h.control_plane.count("create_service"), 0);
}

#[tokio::test]
async fn test_single_conflict_is_retried() {
    let h = Harness::new(adapter::pg::adapter);
    let key = h.store.insert(pg("p1-db"));

    // The finalizer write conflicts once, then succeeds on the latest version
    h.store.inject_conflicts(1);
    assert_eq!(h.step(&key).await, retry(10, RequeueReason::Provisioning));
    assert!(h.has_finalizer(&key));
}

#[tokio::test]
async fn test_second_conflict_is_transient() {
    let h = Harness::new(adapter::pg::adapter);
    let key = h.store.insert(pg("p1-db"));
    h.step(&key).await;

    h.store.inject_conflicts(2);
    assert_eq!(h.step(&key).await, retry(5, RequeueReason::ErrorBackoff));
    // Next backoff step doubles
    h.store.inject_conflicts(2);
    assert_eq!(h.step(&key).await, retry(10, RequeueReason::ErrorBackoff));
}

#[tokio::test]
async fn test_fatal_error_marks_failed_until_spec_changes() {
    let h = Harness::new(adapter::pg::adapter);
    let key = h.store.insert(pg("p1-db"));
    h.control_plane
        .fail_next("create_service", RemoteError::from_status(400, "invalid plan"));

    let result = h.step(&key).await;
    assert!(matches!(result, ReconcileResult::Terminal { .. }));
    let status = h.store.status(&key).unwrap();
    assert_eq!(status.phase, Phase::Failed);
    assert!(status.message.unwrap().contains("invalid plan"));

    // Same generation: no remote calls at all
    let calls = h.control_plane.total_calls();
    let result = h.step(&key).await;
    assert!(matches!(result, ReconcileResult::Terminal { .. }));
    assert_eq!(h.control_plane.total_calls(), calls);

    h.store
        .edit_spec(&key, |o| o.spec.service.plan = "startup-8".to_string());
    assert_eq!(h.step(&key).await, retry(10, RequeueReason::Provisioning));
    assert_eq!(h.control_plane.service("p1", "p1-db").unwrap().plan, "startup-8");
}

#[tokio::test]
async fn test_invalid_disk_space_is_fatal() {
    let h = Harness::new(adapter::pg::adapter);
    let mut obj = pg("p1-db");
    obj.spec.disk_space = Some("lots".to_string());
    let key = h.store.insert(obj);

    let result = h.step(&key).await;
    let ReconcileResult::Terminal { message } = result else {
        panic!("expected Terminal, got {result:?}");
    };
    assert!(message.contains("diskSpace"));
    assert_eq!(h.control_plane.count("create_service"), 0);
    assert_eq!(h.phase(&key), Some(Phase::Failed));
}

#[tokio::test]
async fn test_degraded_after_backoff_ceiling() {
    let settings = EngineSettings {
        error_backoff_start: Duration::from_secs(1),
        error_backoff_max: Duration::from_secs(4),
        ..EngineSettings::default()
    };
    let h = Harness::with_settings(adapter::pg::adapter, settings);
    let key = h.store.insert(pg("p1-db"));
    for _ in 0..3 {
        h.control_plane
            .fail_next("get_project", RemoteError::from_status(503, "unavailable"));
    }

    assert_eq!(h.step(&key).await, retry(1, RequeueReason::ErrorBackoff));
    assert_eq!(h.step(&key).await, retry(2, RequeueReason::ErrorBackoff));
    assert_ne!(h.phase(&key), Some(Phase::Degraded));
    assert_eq!(h.step(&key).await, retry(4, RequeueReason::ErrorBackoff));
    assert_eq!(h.phase(&key), Some(Phase::Degraded));
    assert!(h.has_finalizer(&key));

    // Recovers on its own
    assert_eq!(h.step(&key).await, retry(10, RequeueReason::Provisioning));
    assert_eq!(h.phase(&key), Some(Phase::Provisioning));
}

#[tokio::test]
async fn test_error_backoff_restarts_after_successful_step() {
    let settings = EngineSettings {
        error_backoff_start: Duration::from_secs(1),
        error_backoff_max: Duration::from_secs(4),
        ..EngineSettings::default()
    };
    let h = Harness::with_settings(adapter::pg::adapter, settings);
    let key = h.store.insert(pg("p1-db"));
    assert_eq!(h.step(&key).await, retry(10, RequeueReason::Provisioning));

    // Isolated failures, each followed by a successful readiness poll
    for _ in 0..4 {
        h.control_plane
            .fail_next("get_project", RemoteError::from_status(503, "unavailable"));
        assert_eq!(h.step(&key).await, retry(1, RequeueReason::ErrorBackoff));
        assert_eq!(h.phase(&key), Some(Phase::Provisioning));

        let result = h.step(&key).await;
        assert!(
            matches!(
                result,
                ReconcileResult::RetryAfter {
                    reason: RequeueReason::Provisioning,
                    ..
                }
            ),
            "expected a readiness poll, got {result:?}"
        );
        assert_eq!(h.phase(&key), Some(Phase::Provisioning));
    }
}

#[tokio::test]
async fn test_invalid_spec_fails_before_dependencies() {
    let h = Harness::new(adapter::pg::adapter);
    let mut obj = pg("p2-db");
    obj.spec.service.project = "p2".to_string();
    obj.spec.service.maintenance_window_dow = Some("someday".to_string());
    let key = h.store.insert(obj);

    let result = h.step(&key).await;
    let ReconcileResult::Terminal { message } = result else {
        panic!("expected Terminal, got {result:?}");
    };
    assert!(message.contains("maintenanceWindowDow"));
    assert_eq!(h.phase(&key), Some(Phase::Failed));
    assert!(!h.control_plane.mutated());
    assert_eq!(h.control_plane.count("get_project"), 0);
}

#[tokio::test]
async fn test_unchanged_status_is_not_rewritten() {
    let h = Harness::new(adapter::pg::adapter);
    let key = h.store.insert(pg("p1-db"));
    provision(&h, &key).await;

    let writes = h.store.status_writes();
    assert!(matches!(h.step(&key).await, ReconcileResult::Success { .. }));
    assert!(matches!(h.step(&key).await, ReconcileResult::Success { .. }));
    assert_eq!(h.store.status_writes(), writes);
}

#[tokio::test]
async fn test_kafka_secret_carries_project_ca() {
    let h = Harness::new(adapter::kafka::adapter);
    let key = h.store.insert(kafka("events"));
    h.step(&key).await;
    h.control_plane.set_state("p1", "events", "RUNNING");
    assert!(matches!(h.step(&key).await, ReconcileResult::Success { .. }));

    let data = h.store.secret_data("default", "events").unwrap();
    assert_eq!(data["CA_CERT"], FAKE_CA);
    assert_eq!(data["USERNAME"], "avnadmin");
    assert_eq!(data["ACCESS_CERT"], "access-cert");
    assert_eq!(h.control_plane.count("get_project_ca"), 1);
    assert_eq!(h.store.status(&key).unwrap().phase, Phase::Ready);
}

#[tokio::test]
async fn test_redis_secret_target_override() {
    let h = Harness::new(adapter::redis::adapter);
    let mut obj = Redis::new(
        "cache",
        RedisSpec {
            service: common::service_spec("p1", "hobbyist"),
        },
    );
    obj.metadata.namespace = Some("default".to_string());
    obj.spec.service.conn_info_secret_target = Some(ConnInfoSecretTarget {
        name: "cache-conn".to_string(),
    });
    let key = h.store.insert(obj);
    h.step(&key).await;
    h.control_plane.set_state("p1", "cache", "RUNNING");
    h.step(&key).await;

    assert!(h.store.secret("default", "cache").is_none());
    let data = h.store.secret_data("default", "cache-conn").unwrap();
    assert_eq!(data["SSL"], "true");
    assert_eq!(data["USER"], "avnadmin");
}

#[tokio::test]
async fn test_kinds_share_nothing_but_the_client() {
    let control_plane = Arc::new(FakeControlPlane::new());
    let pg_store = Arc::new(MemoryStore::<PG>::new());
    let kafka_store = Arc::new(MemoryStore::<Kafka>::new());
    let pg_engine = Engine::new(
        pg_store.clone(),
        pg_store.clone(),
        control_plane.clone(),
        adapter::pg::adapter,
        EngineSettings::default(),
    );
    let kafka_engine = Engine::new(
        kafka_store.clone(),
        kafka_store.clone(),
        control_plane.clone(),
        adapter::kafka::adapter,
        EngineSettings::default(),
    );

    let pg_key = pg_store.insert(pg("p1-db"));
    let kafka_key = kafka_store.insert(kafka("events"));
    pg_engine.reconcile(&pg_key).await;
    kafka_engine.reconcile(&kafka_key).await;

    assert_eq!(pg_engine.kind(), "PG");
    assert_eq!(kafka_engine.kind(), "Kafka");
    assert_eq!(control_plane.service("p1", "p1-db").unwrap().service_type, "pg");
    assert_eq!(control_plane.service("p1", "events").unwrap().service_type, "kafka");
}

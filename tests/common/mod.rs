//! Common test utilities
//!
//! Provides rustls setup for the Pact tests and in-memory fakes of the object
//! store and the control plane for the engine and dispatcher tests.

#![allow(dead_code, reason = "Each test binary uses a different subset of helpers")]

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::ByteString;
use kube::{Resource, ResourceExt};
use managed_service_operator::controller::ObjectKey;
use managed_service_operator::crd::{
    AuthSecretReference, KafkaSpec, ManagedResource, ManagedStatus, PGSpec, ServiceCommonSpec,
    Kafka, PG,
};
use managed_service_operator::remote::{
    ConnectionInfo, ControlPlane, CreateServiceRequest, RemoteError, RemoteProject, RemoteService,
    RemoteVpc, ServiceUser, UpdateServiceRequest,
};
use managed_service_operator::store::{DescriptorStore, SecretStore, StoreError};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::{Mutex, Once};

static RUSTLS_INIT: Once = Once::new();

/// Initialize rustls crypto provider for tests
///
/// Uses a `Once` to ensure it's only called once across all tests, and leaves
/// an already installed provider in place.
pub fn init_rustls() {
    RUSTLS_INIT.call_once(|| {
        // ring, matching the main application; keep a provider something else already set
        if rustls::crypto::CryptoProvider::get_default().is_none() {
            let _ = rustls::crypto::ring::default_provider().install_default();
        }
    });
}

// ---------------------------------------------------------------------------
// Descriptors
// ---------------------------------------------------------------------------

pub fn service_spec(project: &str, plan: &str) -> ServiceCommonSpec {
    ServiceCommonSpec {
        project: project.to_string(),
        plan: plan.to_string(),
        ..Default::default()
    }
}

pub fn pg(name: &str) -> PG {
    let mut pg = PG::new(
        name,
        PGSpec {
            service: service_spec("p1", "startup-4"),
            disk_space: None,
        },
    );
    pg.meta_mut().namespace = Some("default".to_string());
    pg
}

pub fn kafka(name: &str) -> Kafka {
    let mut kafka = Kafka::new(
        name,
        KafkaSpec {
            service: service_spec("p1", "business-4"),
            disk_space: None,
        },
    );
    kafka.meta_mut().namespace = Some("default".to_string());
    kafka
}

pub fn with_auth_secret(mut obj: PG, name: &str, key: &str) -> PG {
    obj.spec.service.auth_secret_ref = Some(AuthSecretReference {
        name: name.to_string(),
        key: key.to_string(),
    });
    obj
}

fn deletion_time() -> k8s_openapi::apimachinery::pkg::apis::meta::v1::Time {
    serde_json::from_value(serde_json::json!("2026-01-01T00:00:00Z"))
        .expect("valid RFC 3339 timestamp")
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

struct MemoryState<K> {
    objects: HashMap<ObjectKey, K>,
    secrets: HashMap<(String, String), Secret>,
    next_version: u64,
    pending_conflicts: u32,
    status_writes: usize,
    finalizer_writes: usize,
}

/// In-memory object store
///
/// Writes are conditional on `resourceVersion` like the API server, and a
/// descriptor marked for deletion disappears once its finalizers are cleared.
pub struct MemoryStore<K> {
    state: Mutex<MemoryState<K>>,
}

impl<K> Default for MemoryStore<K> {
    fn default() -> Self {
        Self {
            state: Mutex::new(MemoryState {
                objects: HashMap::new(),
                secrets: HashMap::new(),
                next_version: 1,
                pending_conflicts: 0,
                status_writes: 0,
                finalizer_writes: 0,
            }),
        }
    }
}

impl<K: ManagedResource> MemoryStore<K> {
    pub fn new() -> Self {
        Self::default()
    }

    fn bump(state: &mut MemoryState<K>, obj: &mut K) {
        state.next_version += 1;
        obj.meta_mut().resource_version = Some(state.next_version.to_string());
    }

    /// Store `obj` as a fresh object at generation 1
    pub fn insert(&self, mut obj: K) -> ObjectKey {
        let key = ObjectKey::from_resource(&obj);
        let mut state = self.state.lock().unwrap();
        let meta = obj.meta_mut();
        meta.generation.get_or_insert(1);
        meta.uid.get_or_insert_with(|| format!("uid-{}", key.name));
        Self::bump(&mut state, &mut obj);
        state.objects.insert(key.clone(), obj);
        key
    }

    pub fn object(&self, key: &ObjectKey) -> Option<K> {
        self.state.lock().unwrap().objects.get(key).cloned()
    }

    pub fn status(&self, key: &ObjectKey) -> Option<ManagedStatus> {
        self.object(key).and_then(|o| o.managed_status().cloned())
    }

    /// Set the deletion marker, as `kubectl delete` would
    pub fn mark_deleted(&self, key: &ObjectKey) {
        let mut state = self.state.lock().unwrap();
        let Some(mut obj) = state.objects.remove(key) else {
            return;
        };
        if obj.finalizers().is_empty() {
            return;
        }
        obj.meta_mut().deletion_timestamp = Some(deletion_time());
        Self::bump(&mut state, &mut obj);
        state.objects.insert(key.clone(), obj);
    }

    /// Apply a spec edit; bumps the generation
    pub fn edit_spec(&self, key: &ObjectKey, edit: impl FnOnce(&mut K)) {
        let mut state = self.state.lock().unwrap();
        let Some(mut obj) = state.objects.remove(key) else {
            return;
        };
        edit(&mut obj);
        let generation = obj.meta().generation.unwrap_or(1);
        obj.meta_mut().generation = Some(generation + 1);
        Self::bump(&mut state, &mut obj);
        state.objects.insert(key.clone(), obj);
    }

    /// Fail the next `n` descriptor writes with a conflict
    pub fn inject_conflicts(&self, n: u32) {
        self.state.lock().unwrap().pending_conflicts = n;
    }

    pub fn status_writes(&self) -> usize {
        self.state.lock().unwrap().status_writes
    }

    pub fn finalizer_writes(&self) -> usize {
        self.state.lock().unwrap().finalizer_writes
    }

    /// Store a secret verbatim, e.g. an auth secret
    pub fn put_secret(&self, namespace: &str, name: &str, data: &[(&str, &str)]) {
        let mut secret = Secret::default();
        secret.metadata.namespace = Some(namespace.to_string());
        secret.metadata.name = Some(name.to_string());
        secret.data = Some(
            data.iter()
                .map(|(k, v)| ((*k).to_string(), ByteString(v.as_bytes().to_vec())))
                .collect(),
        );
        self.state
            .lock()
            .unwrap()
            .secrets
            .insert((namespace.to_string(), name.to_string()), secret);
    }

    pub fn secret(&self, namespace: &str, name: &str) -> Option<Secret> {
        self.state
            .lock()
            .unwrap()
            .secrets
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    /// Decoded data of a stored secret
    pub fn secret_data(&self, namespace: &str, name: &str) -> Option<BTreeMap<String, String>> {
        self.secret(namespace, name).map(|s| {
            s.data
                .unwrap_or_default()
                .into_iter()
                .map(|(k, v)| (k, String::from_utf8(v.0).unwrap()))
                .collect()
        })
    }

    /// Take the stored version for a conditional write, or report a conflict
    fn check_write(state: &mut MemoryState<K>, obj: &K) -> Result<ObjectKey, StoreError> {
        let key = ObjectKey::from_resource(obj);
        let what = format!("{} {}", K::kind(&()), key);
        if state.pending_conflicts > 0 {
            state.pending_conflicts -= 1;
            return Err(StoreError::Conflict(what));
        }
        match state.objects.get(&key) {
            Some(stored) if stored.resource_version() == obj.resource_version() => Ok(key),
            _ => Err(StoreError::Conflict(what)),
        }
    }
}

#[async_trait]
impl<K: ManagedResource> DescriptorStore<K> for MemoryStore<K> {
    async fn get(&self, key: &ObjectKey) -> Result<Option<K>, StoreError> {
        Ok(self.object(key))
    }

    async fn update_finalizers(&self, obj: &K, finalizers: Vec<String>) -> Result<K, StoreError> {
        let mut state = self.state.lock().unwrap();
        let key = Self::check_write(&mut state, obj)?;
        let mut stored = state.objects.remove(&key).expect("checked above");
        stored.meta_mut().finalizers = Some(finalizers);
        Self::bump(&mut state, &mut stored);
        state.finalizer_writes += 1;
        let released = stored.meta().deletion_timestamp.is_some() && stored.finalizers().is_empty();
        if !released {
            state.objects.insert(key, stored.clone());
        }
        Ok(stored)
    }

    async fn update_status(&self, obj: &K, status: &ManagedStatus) -> Result<K, StoreError> {
        let mut state = self.state.lock().unwrap();
        let key = Self::check_write(&mut state, obj)?;
        let mut stored = state.objects.remove(&key).expect("checked above");
        stored.set_managed_status(status.clone());
        Self::bump(&mut state, &mut stored);
        state.status_writes += 1;
        state.objects.insert(key, stored.clone());
        Ok(stored)
    }
}

#[async_trait]
impl<K: ManagedResource> SecretStore for MemoryStore<K> {
    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<Secret>, StoreError> {
        Ok(self.secret(namespace, name))
    }

    async fn upsert_secret(&self, secret: &Secret) -> Result<(), StoreError> {
        let key = (
            secret.namespace().unwrap_or_default(),
            secret.name_any(),
        );
        self.state.lock().unwrap().secrets.insert(key, secret.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FakeControlPlane
// ---------------------------------------------------------------------------

pub const FAKE_CA: &str = "-----BEGIN CERTIFICATE-----\nfake\n-----END CERTIFICATE-----";

#[derive(Debug, Default)]
struct FakeState {
    projects: HashSet<String>,
    vpcs: HashMap<(String, String), String>,
    services: HashMap<(String, String), RemoteService>,
    failures: HashMap<&'static str, VecDeque<RemoteError>>,
    calls: Vec<&'static str>,
}

/// Scripted control plane
///
/// New services start in `REBUILDING`; tests flip them to `RUNNING` with
/// [`set_state`](Self::set_state). Every call is recorded by operation name.
#[derive(Debug, Default)]
pub struct FakeControlPlane {
    state: Mutex<FakeState>,
}

impl FakeControlPlane {
    /// Control plane with project `p1`
    pub fn new() -> Self {
        let fake = Self::default();
        fake.add_project("p1");
        fake
    }

    pub fn add_project(&self, project: &str) {
        self.state.lock().unwrap().projects.insert(project.to_string());
    }

    pub fn add_vpc(&self, project: &str, vpc_id: &str, state: &str) {
        self.state
            .lock()
            .unwrap()
            .vpcs
            .insert((project.to_string(), vpc_id.to_string()), state.to_string());
    }

    pub fn set_state(&self, project: &str, name: &str, state: &str) {
        if let Some(service) = self
            .state
            .lock()
            .unwrap()
            .services
            .get_mut(&(project.to_string(), name.to_string()))
        {
            service.state = state.to_string();
        }
    }

    pub fn service(&self, project: &str, name: &str) -> Option<RemoteService> {
        self.state
            .lock()
            .unwrap()
            .services
            .get(&(project.to_string(), name.to_string()))
            .cloned()
    }

    pub fn service_count(&self) -> usize {
        self.state.lock().unwrap().services.len()
    }

    /// Fail the next call of `op` with `err`
    pub fn fail_next(&self, op: &'static str, err: RemoteError) {
        self.state
            .lock()
            .unwrap()
            .failures
            .entry(op)
            .or_default()
            .push_back(err);
    }

    pub fn count(&self, op: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|c| **c == op)
            .count()
    }

    pub fn total_calls(&self) -> usize {
        self.state.lock().unwrap().calls.len()
    }

    /// Whether any mutating call was issued
    pub fn mutated(&self) -> bool {
        ["create_service", "update_service", "delete_service"]
            .iter()
            .any(|op| self.count(op) > 0)
    }

    fn enter(&self, op: &'static str) -> Result<std::sync::MutexGuard<'_, FakeState>, RemoteError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(op);
        if let Some(err) = state.failures.get_mut(op).and_then(VecDeque::pop_front) {
            return Err(err);
        }
        Ok(state)
    }

    fn new_service(project: &str, request: &CreateServiceRequest) -> RemoteService {
        let host = format!("{}-{project}.fake.example", request.service_name);
        let (scheme, port) = match request.service_type.as_str() {
            "pg" => ("postgres", "12691"),
            "redis" => ("rediss", "12692"),
            _ => ("kafka", "12693"),
        };
        let service_uri = format!("{scheme}://avnadmin:s3cret@{host}:{port}/defaultdb?sslmode=require");
        let mut params = BTreeMap::new();
        for (k, v) in [
            ("host", host.as_str()),
            ("port", port),
            ("user", "avnadmin"),
            ("password", "s3cret"),
            ("dbname", "defaultdb"),
            ("sslmode", "require"),
        ] {
            params.insert(k.to_string(), v.to_string());
        }
        if request.service_type == "kafka" {
            // Kafka reports credentials through users only
            params.remove("user");
            params.remove("password");
            params.remove("dbname");
            params.remove("sslmode");
        }
        let connection_info = if request.service_type == "kafka" {
            ConnectionInfo {
                kafka_access_cert: Some("access-cert".to_string()),
                kafka_access_key: Some("access-key".to_string()),
            }
        } else {
            ConnectionInfo::default()
        };

        RemoteService {
            service_name: request.service_name.clone(),
            service_type: request.service_type.clone(),
            state: "REBUILDING".to_string(),
            plan: request.plan.clone(),
            cloud_name: request
                .cloud
                .clone()
                .unwrap_or_else(|| "google-europe-west1".to_string()),
            project_vpc_id: request.project_vpc_id.clone(),
            maintenance: request.maintenance.clone(),
            service_uri,
            service_uri_params: params,
            users: vec![ServiceUser {
                username: "avnadmin".to_string(),
                password: "s3cret".to_string(),
                user_type: "primary".to_string(),
            }],
            connection_info,
            disk_space_mb: request.disk_space_mb,
            termination_protection: request.termination_protection,
        }
    }
}

fn not_found(what: String) -> RemoteError {
    RemoteError::from_status(404, what)
}

#[async_trait]
impl ControlPlane for FakeControlPlane {
    async fn get_service(&self, project: &str, name: &str) -> Result<RemoteService, RemoteError> {
        let state = self.enter("get_service")?;
        state
            .services
            .get(&(project.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| not_found(format!("service {project}/{name}")))
    }

    async fn create_service(
        &self,
        project: &str,
        request: &CreateServiceRequest,
    ) -> Result<RemoteService, RemoteError> {
        let mut state = self.enter("create_service")?;
        let key = (project.to_string(), request.service_name.clone());
        if state.services.contains_key(&key) {
            return Err(RemoteError::from_status(409, "service already exists"));
        }
        let service = Self::new_service(project, request);
        state.services.insert(key, service.clone());
        Ok(service)
    }

    async fn update_service(
        &self,
        project: &str,
        name: &str,
        request: &UpdateServiceRequest,
    ) -> Result<RemoteService, RemoteError> {
        let mut state = self.enter("update_service")?;
        let service = state
            .services
            .get_mut(&(project.to_string(), name.to_string()))
            .ok_or_else(|| not_found(format!("service {project}/{name}")))?;
        service.plan.clone_from(&request.plan);
        if let Some(cloud) = &request.cloud {
            service.cloud_name.clone_from(cloud);
        }
        service.maintenance.clone_from(&request.maintenance);
        service.project_vpc_id.clone_from(&request.project_vpc_id);
        service.disk_space_mb = request.disk_space_mb;
        service.termination_protection = request.termination_protection;
        Ok(service.clone())
    }

    async fn delete_service(&self, project: &str, name: &str) -> Result<(), RemoteError> {
        let mut state = self.enter("delete_service")?;
        let key = (project.to_string(), name.to_string());
        if !state.services.contains_key(&key) {
            return Err(not_found(format!("service {project}/{name}")));
        }
        // Accepted; the next call observes the service gone
        state.services.remove(&key);
        Ok(())
    }

    async fn get_project_ca(&self, project: &str) -> Result<String, RemoteError> {
        let state = self.enter("get_project_ca")?;
        if state.projects.contains(project) {
            Ok(FAKE_CA.to_string())
        } else {
            Err(not_found(format!("project {project}")))
        }
    }

    async fn get_project(&self, project: &str) -> Result<RemoteProject, RemoteError> {
        let state = self.enter("get_project")?;
        if state.projects.contains(project) {
            Ok(RemoteProject {
                project_name: project.to_string(),
                default_cloud: "google-europe-west1".to_string(),
            })
        } else {
            Err(not_found(format!("project {project}")))
        }
    }

    async fn get_project_vpc(&self, project: &str, vpc_id: &str) -> Result<RemoteVpc, RemoteError> {
        let state = self.enter("get_project_vpc")?;
        state
            .vpcs
            .get(&(project.to_string(), vpc_id.to_string()))
            .map(|vpc_state| RemoteVpc {
                project_vpc_id: vpc_id.to_string(),
                state: vpc_state.clone(),
                cloud_name: "google-europe-west1".to_string(),
                network_cidr: "10.0.0.0/24".to_string(),
            })
            .ok_or_else(|| not_found(format!("vpc {project}/{vpc_id}")))
    }
}

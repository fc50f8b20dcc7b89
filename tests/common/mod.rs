//! Common test utilities
//!
//! An in-memory `ClusterStore` plus builders for stacks and storage secrets.
//! Applied Secrets and ConfigMaps become readable through the getters, so
//! certificate reuse across passes behaves as it does against a cluster.

#![allow(dead_code, reason = "not every test binary uses every helper")]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use k8s_openapi::api::core::v1::{ConfigMap, Secret};
use k8s_openapi::ByteString;
use std::collections::BTreeMap;
use std::sync::Mutex;
use tempo_controller::config::FeatureGates;
use tempo_controller::controller::store::{ClusterStore, ObjectRef, StoreError};
use tempo_controller::crd::{ResourceEnvelope, TempoStack, TempoStackStatus};
use tempo_controller::manifests::{DesiredObject, ObjectKind};

pub const NAMESPACE: &str = "observability";
pub const INSTANCE: &str = "simplest";
pub const STORAGE_SECRET: &str = "minio";

type Key = (String, String);

fn key(namespace: &str, name: &str) -> Key {
    (namespace.to_string(), name.to_string())
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    stacks: Mutex<BTreeMap<Key, TempoStack>>,
    secrets: Mutex<BTreeMap<Key, Secret>>,
    config_maps: Mutex<BTreeMap<Key, ConfigMap>>,
    applied: Mutex<BTreeMap<(String, ObjectRef), DesiredObject>>,
    status_writes: Mutex<Vec<TempoStackStatus>>,
    failing: Mutex<bool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_stack(&self, stack: TempoStack) {
        let namespace = stack.metadata.namespace.clone().unwrap_or_default();
        let name = stack.metadata.name.clone().unwrap_or_default();
        self.stacks.lock().unwrap().insert(key(&namespace, &name), stack);
    }

    pub fn stack(&self, namespace: &str, name: &str) -> Option<TempoStack> {
        self.stacks.lock().unwrap().get(&key(namespace, name)).cloned()
    }

    /// Replace the spec of a stored stack, keeping its status
    pub fn update_stack(&self, update: impl FnOnce(&mut TempoStack)) {
        let mut stacks = self.stacks.lock().unwrap();
        let stack = stacks.get_mut(&key(NAMESPACE, INSTANCE)).expect("stack stored");
        update(stack);
    }

    pub fn put_secret(&self, secret: Secret) {
        let namespace = secret.metadata.namespace.clone().unwrap_or_default();
        let name = secret.metadata.name.clone().unwrap_or_default();
        self.secrets.lock().unwrap().insert(key(&namespace, &name), secret);
    }

    pub fn secret(&self, name: &str) -> Option<Secret> {
        self.secrets.lock().unwrap().get(&key(NAMESPACE, name)).cloned()
    }

    /// Objects currently present, in (kind, name) order
    pub fn objects(&self) -> Vec<DesiredObject> {
        self.applied.lock().unwrap().values().cloned().collect()
    }

    pub fn object(&self, kind: ObjectKind, name: &str) -> Option<DesiredObject> {
        self.applied
            .lock()
            .unwrap()
            .get(&(
                NAMESPACE.to_string(),
                ObjectRef {
                    kind,
                    name: name.to_string(),
                },
            ))
            .cloned()
    }

    pub fn names_of(&self, kind: ObjectKind) -> Vec<String> {
        self.objects()
            .into_iter()
            .filter(|o| o.kind() == kind)
            .map(|o| o.name().to_string())
            .collect()
    }

    pub fn status_writes(&self) -> Vec<TempoStackStatus> {
        self.status_writes.lock().unwrap().clone()
    }

    /// Make every call fail with a transport error
    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock().unwrap() = failing;
    }

    fn check(&self) -> Result<(), StoreError> {
        if *self.failing.lock().unwrap() {
            Err(StoreError::Unavailable("connection refused".to_string()))
        } else {
            Ok(())
        }
    }
}

fn matches_selector(labels: Option<&BTreeMap<String, String>>, selector: &str) -> bool {
    let Some(labels) = labels else {
        return false;
    };
    selector.split(',').all(|term| match term.split_once('=') {
        Some((k, v)) => labels.get(k).map(String::as_str) == Some(v),
        None => false,
    })
}

#[async_trait]
impl ClusterStore for MemoryStore {
    async fn get_tempostack(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<TempoStack>, StoreError> {
        self.check()?;
        Ok(self.stack(namespace, name))
    }

    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<Secret>, StoreError> {
        self.check()?;
        Ok(self.secrets.lock().unwrap().get(&key(namespace, name)).cloned())
    }

    async fn get_config_map(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ConfigMap>, StoreError> {
        self.check()?;
        Ok(self.config_maps.lock().unwrap().get(&key(namespace, name)).cloned())
    }

    async fn apply(&self, object: &DesiredObject) -> Result<(), StoreError> {
        self.check()?;
        let namespace = object.metadata().namespace.clone().unwrap_or_default();
        match object {
            DesiredObject::Secret(s) => self.put_secret(s.clone()),
            DesiredObject::ConfigMap(cm) => {
                self.config_maps
                    .lock()
                    .unwrap()
                    .insert(key(&namespace, object.name()), cm.clone());
            }
            _ => {}
        }
        self.applied.lock().unwrap().insert(
            (
                namespace,
                ObjectRef {
                    kind: object.kind(),
                    name: object.name().to_string(),
                },
            ),
            object.clone(),
        );
        Ok(())
    }

    async fn list_owned(&self, namespace: &str, selector: &str) -> Result<Vec<ObjectRef>, StoreError> {
        self.check()?;
        Ok(self
            .applied
            .lock()
            .unwrap()
            .iter()
            .filter(|((ns, _), o)| ns == namespace && matches_selector(o.labels(), selector))
            .map(|((_, r), _)| r.clone())
            .collect())
    }

    async fn delete(&self, namespace: &str, object: &ObjectRef) -> Result<(), StoreError> {
        self.check()?;
        self.applied
            .lock()
            .unwrap()
            .remove(&(namespace.to_string(), object.clone()));
        match object.kind {
            ObjectKind::Secret => {
                self.secrets.lock().unwrap().remove(&key(namespace, &object.name));
            }
            ObjectKind::ConfigMap => {
                self.config_maps
                    .lock()
                    .unwrap()
                    .remove(&key(namespace, &object.name));
            }
            _ => {}
        }
        Ok(())
    }

    async fn patch_status(
        &self,
        namespace: &str,
        name: &str,
        status: &TempoStackStatus,
    ) -> Result<(), StoreError> {
        self.check()?;
        if let Some(stack) = self.stacks.lock().unwrap().get_mut(&key(namespace, name)) {
            stack.status = Some(status.clone());
        }
        self.status_writes.lock().unwrap().push(status.clone());
        Ok(())
    }
}

/// Minimal stack as a user would write it
pub fn minimal_stack() -> TempoStack {
    let yaml = format!(
        r#"
apiVersion: tempo.grafana.com/v1alpha1
kind: TempoStack
metadata:
  name: {INSTANCE}
  namespace: {NAMESPACE}
  uid: 0f3c6c3e-5a8e-4f5e-9b1c-6d1f2a9e7c11
spec:
  images:
    tempo: docker.io/grafana/tempo:2.3.1
    tempoGateway: quay.io/observatorium/api:latest
  storage:
    secret:
      name: {STORAGE_SECRET}
      type: s3
"#
    );
    serde_yaml::from_str(&yaml).expect("minimal stack parses")
}

/// Stack with a total resource envelope of 1 CPU and 2Gi
pub fn stack_with_resources() -> TempoStack {
    let mut stack = minimal_stack();
    stack.spec.resources.total = Some(ResourceEnvelope {
        cpu: "1000m".to_string(),
        memory: "2Gi".to_string(),
    });
    stack
}

/// Storage secret built from `data` pairs
pub fn storage_secret(pairs: &[(&str, &str)]) -> Secret {
    let data: BTreeMap<String, ByteString> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), ByteString(v.as_bytes().to_vec())))
        .collect();
    let mut secret = Secret {
        data: Some(data),
        ..Default::default()
    };
    secret.metadata.name = Some(STORAGE_SECRET.to_string());
    secret.metadata.namespace = Some(NAMESPACE.to_string());
    secret
}

pub fn valid_storage_secret() -> Secret {
    storage_secret(&[
        ("endpoint", "http://minio.minio.svc:9000"),
        ("bucket", "tempo"),
        ("access_key_id", "tempo"),
        ("access_key_secret", "supersecret"),
    ])
}

/// Feature gates with built-in certificates and both encryption toggles on
pub fn tls_gates() -> FeatureGates {
    let mut gates = FeatureGates {
        http_encryption: true,
        grpc_encryption: true,
        ..FeatureGates::default()
    };
    gates.built_in_cert_management.enabled = true;
    gates
}

/// Fixed clock, `secs` after a base instant
pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0)
        .single()
        .expect("valid timestamp")
}

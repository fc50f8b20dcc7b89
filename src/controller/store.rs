//! # Cluster Store
//!
//! The reconciler's only view of the cluster. `KubeStore` talks to the API
//! server; tests substitute an in-memory implementation.
//!
//! Writes use server-side apply under the controller's field manager, so
//! repeated applies of the same object are no-ops.

use crate::crd::{TempoStack, TempoStackStatus};
use crate::manifests::{DesiredObject, ObjectKind};
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::{Deployment, StatefulSet};
use k8s_openapi::api::core::v1::{ConfigMap, Secret, Service};
use kube::api::{Api, DeleteParams, ListParams, Patch, PatchParams};
use kube::{Client, Resource};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use std::fmt::Debug;
use thiserror::Error;
use tracing::debug;

/// Store errors; all are transport-level and retried by the error policy
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Reference to an object owned by a stack
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectRef {
    pub kind: ObjectKind,
    pub name: String,
}

/// Cluster operations needed by a reconcile pass
#[async_trait]
pub trait ClusterStore: Send + Sync {
    async fn get_tempostack(&self, namespace: &str, name: &str)
        -> Result<Option<TempoStack>, StoreError>;

    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<Secret>, StoreError>;

    async fn get_config_map(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ConfigMap>, StoreError>;

    /// Create or update an object
    async fn apply(&self, object: &DesiredObject) -> Result<(), StoreError>;

    /// Objects of the managed kinds matching a label selector
    async fn list_owned(&self, namespace: &str, selector: &str) -> Result<Vec<ObjectRef>, StoreError>;

    /// Delete an object; deleting a missing object is not an error
    async fn delete(&self, namespace: &str, object: &ObjectRef) -> Result<(), StoreError>;

    async fn patch_status(
        &self,
        namespace: &str,
        name: &str,
        status: &TempoStackStatus,
    ) -> Result<(), StoreError>;
}

/// `ClusterStore` backed by the Kubernetes API
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
    field_manager: String,
}

impl std::fmt::Debug for KubeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeStore")
            .field("field_manager", &self.field_manager)
            .finish_non_exhaustive()
    }
}

impl KubeStore {
    pub fn new(client: Client, field_manager: impl Into<String>) -> Self {
        Self {
            client,
            field_manager: field_manager.into(),
        }
    }

    fn apply_params(&self) -> PatchParams {
        PatchParams::apply(&self.field_manager).force()
    }

    async fn get_opt<K>(&self, namespace: &str, name: &str) -> Result<Option<K>, StoreError>
    where
        K: Resource<Scope = k8s_openapi::NamespaceResourceScope>
            + Clone
            + DeserializeOwned
            + Debug,
        K::DynamicType: Default,
    {
        let api: Api<K> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get_opt(name).await?)
    }

    async fn apply_typed<K>(&self, object: &K) -> Result<(), StoreError>
    where
        K: Resource<Scope = k8s_openapi::NamespaceResourceScope>
            + Clone
            + Serialize
            + DeserializeOwned
            + Debug,
        K::DynamicType: Default,
    {
        let meta = object.meta();
        let (Some(namespace), Some(name)) = (meta.namespace.as_deref(), meta.name.as_deref())
        else {
            return Err(StoreError::Unavailable(
                "object is missing name or namespace".to_string(),
            ));
        };
        let api: Api<K> = Api::namespaced(self.client.clone(), namespace);
        api.patch(name, &self.apply_params(), &Patch::Apply(object))
            .await?;
        Ok(())
    }

    async fn list_names<K>(&self, namespace: &str, selector: &str) -> Result<Vec<String>, StoreError>
    where
        K: Resource<Scope = k8s_openapi::NamespaceResourceScope>
            + Clone
            + DeserializeOwned
            + Debug,
        K::DynamicType: Default,
    {
        let api: Api<K> = Api::namespaced(self.client.clone(), namespace);
        let list = api.list(&ListParams::default().labels(selector)).await?;
        Ok(list
            .items
            .iter()
            .filter_map(|o| o.meta().name.clone())
            .collect())
    }

    async fn delete_typed<K>(&self, namespace: &str, name: &str) -> Result<(), StoreError>
    where
        K: Resource<Scope = k8s_openapi::NamespaceResourceScope>
            + Clone
            + DeserializeOwned
            + Debug,
        K::DynamicType: Default,
    {
        let api: Api<K> = Api::namespaced(self.client.clone(), namespace);
        match api.delete(name, &DeleteParams::background()).await {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(e)) if e.code == 404 => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl ClusterStore for KubeStore {
    async fn get_tempostack(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<TempoStack>, StoreError> {
        self.get_opt(namespace, name).await
    }

    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<Secret>, StoreError> {
        self.get_opt(namespace, name).await
    }

    async fn get_config_map(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ConfigMap>, StoreError> {
        self.get_opt(namespace, name).await
    }

    async fn apply(&self, object: &DesiredObject) -> Result<(), StoreError> {
        debug!(kind = %object.kind(), name = object.name(), "Applying object");
        match object {
            DesiredObject::ConfigMap(o) => self.apply_typed(o).await,
            DesiredObject::Secret(o) => self.apply_typed(o).await,
            DesiredObject::Service(o) => self.apply_typed(o).await,
            DesiredObject::Deployment(o) => self.apply_typed(o).await,
            DesiredObject::StatefulSet(o) => self.apply_typed(o).await,
        }
    }

    async fn list_owned(&self, namespace: &str, selector: &str) -> Result<Vec<ObjectRef>, StoreError> {
        let mut owned = Vec::new();
        for kind in ObjectKind::ALL {
            let names = match kind {
                ObjectKind::ConfigMap => self.list_names::<ConfigMap>(namespace, selector).await?,
                ObjectKind::Secret => self.list_names::<Secret>(namespace, selector).await?,
                ObjectKind::Service => self.list_names::<Service>(namespace, selector).await?,
                ObjectKind::Deployment => self.list_names::<Deployment>(namespace, selector).await?,
                ObjectKind::StatefulSet => {
                    self.list_names::<StatefulSet>(namespace, selector).await?
                }
            };
            owned.extend(names.into_iter().map(|name| ObjectRef { kind, name }));
        }
        Ok(owned)
    }

    async fn delete(&self, namespace: &str, object: &ObjectRef) -> Result<(), StoreError> {
        let name = object.name.as_str();
        match object.kind {
            ObjectKind::ConfigMap => self.delete_typed::<ConfigMap>(namespace, name).await,
            ObjectKind::Secret => self.delete_typed::<Secret>(namespace, name).await,
            ObjectKind::Service => self.delete_typed::<Service>(namespace, name).await,
            ObjectKind::Deployment => self.delete_typed::<Deployment>(namespace, name).await,
            ObjectKind::StatefulSet => self.delete_typed::<StatefulSet>(namespace, name).await,
        }
    }

    async fn patch_status(
        &self,
        namespace: &str,
        name: &str,
        status: &TempoStackStatus,
    ) -> Result<(), StoreError> {
        let api: Api<TempoStack> = Api::namespaced(self.client.clone(), namespace);
        let patch = json!({ "status": status });
        api.patch_status(name, &PatchParams::default(), &Patch::Merge(&patch))
            .await?;
        Ok(())
    }
}

//! Deletes owned objects that the current spec no longer produces.

use crate::controller::reconciler::types::ReconcilerError;
use crate::controller::store::{ClusterStore, ObjectRef};
use crate::manifests::naming::discovery_selector;
use crate::manifests::DesiredObject;
use crate::observability::metrics;
use std::collections::BTreeSet;
use tracing::info;

pub(super) async fn prune_stale(
    store: &dyn ClusterStore,
    namespace: &str,
    instance: &str,
    desired: &[DesiredObject],
) -> Result<usize, ReconcilerError> {
    let keep: BTreeSet<ObjectRef> = desired
        .iter()
        .map(|o| ObjectRef {
            kind: o.kind(),
            name: o.name().to_string(),
        })
        .collect();

    let mut pruned = 0;
    for owned in store
        .list_owned(namespace, &discovery_selector(instance))
        .await?
    {
        if keep.contains(&owned) {
            continue;
        }
        info!(
            resource.name = instance,
            resource.namespace = namespace,
            kind = %owned.kind,
            object = owned.name.as_str(),
            "Deleting object no longer desired"
        );
        store.delete(namespace, &owned).await?;
        metrics::increment_objects_pruned(owned.kind.as_str());
        pruned += 1;
    }
    Ok(pruned)
}

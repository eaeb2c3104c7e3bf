//! Keyed and indexed in-memory stores mirroring backend objects
//!
//! A store never talks to the backend. Entries arrive from bootstrap search
//! results or post-create read-backs and leave only through [`ResourceStore::apply`]
//! with `marked_for_delete` set, after the backend delete was confirmed.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::{PoisonError, RwLock};
use tracing::trace;
use vpc_api::backend::tag::{self, SCOPE_CLUSTER, SCOPE_NAMESPACE, SCOPE_NAMESPACE_UID, SCOPE_NETWORK_INFO_UID};
use vpc_api::backend::{IpBlock, LbService, Vpc};

/// Pseudo index scope holding the VPC id a child object belongs to
pub const INDEX_VPC_ID: &str = "vpc_id";

/// Capability contract of every cached object kind
pub trait StoreObject: Clone + Send + Sync + 'static {
    /// Index scopes maintained for this kind
    const INDEXES: &'static [&'static str];

    /// Unique key within the kind's store
    fn key(&self) -> String;

    /// Values this object is indexed under for `scope`
    fn index_values(&self, scope: &str) -> Vec<String>;

    fn marked_for_delete(&self) -> bool;
}

impl StoreObject for Vpc {
    const INDEXES: &'static [&'static str] = &[
        SCOPE_CLUSTER,
        SCOPE_NAMESPACE,
        SCOPE_NAMESPACE_UID,
        SCOPE_NETWORK_INFO_UID,
    ];

    fn key(&self) -> String {
        self.id.clone()
    }

    fn index_values(&self, scope: &str) -> Vec<String> {
        tag::values(&self.tags, scope)
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    fn marked_for_delete(&self) -> bool {
        self.marked_for_delete
    }
}

impl StoreObject for LbService {
    const INDEXES: &'static [&'static str] = &[INDEX_VPC_ID, SCOPE_CLUSTER];

    fn key(&self) -> String {
        lb_service_key(self.vpc_id().unwrap_or_default(), &self.id)
    }

    fn index_values(&self, scope: &str) -> Vec<String> {
        if scope == INDEX_VPC_ID {
            return self.vpc_id().map(str::to_string).into_iter().collect();
        }
        tag::values(&self.tags, scope)
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    fn marked_for_delete(&self) -> bool {
        self.marked_for_delete
    }
}

impl StoreObject for IpBlock {
    const INDEXES: &'static [&'static str] = &[SCOPE_NAMESPACE_UID, SCOPE_CLUSTER];

    fn key(&self) -> String {
        // CIDR alone repeats across namespaces
        format!(
            "{}_{}",
            self.cidr,
            self.tag(SCOPE_NAMESPACE_UID).unwrap_or_default()
        )
    }

    fn index_values(&self, scope: &str) -> Vec<String> {
        tag::values(&self.tags, scope)
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    fn marked_for_delete(&self) -> bool {
        self.marked_for_delete
    }
}

/// Store key of a VPC's load balancer service
pub fn lb_service_key(vpc_id: &str, service_id: &str) -> String {
    format!("{}_{}", vpc_id, service_id)
}

struct StoreInner<T> {
    items: HashMap<String, T>,
    // scope -> value -> keys
    indices: HashMap<&'static str, HashMap<String, BTreeSet<String>>>,
}

/// Concurrency-safe keyed store with tag-scope secondary indices
pub struct ResourceStore<T> {
    inner: RwLock<StoreInner<T>>,
}

pub type VpcStore = ResourceStore<Vpc>;
pub type LbServiceStore = ResourceStore<LbService>;
pub type IpBlockStore = ResourceStore<IpBlock>;

impl<T: StoreObject> ResourceStore<T> {
    pub fn new() -> Self {
        let indices = T::INDEXES.iter().map(|s| (*s, HashMap::new())).collect();
        Self {
            inner: RwLock::new(StoreInner {
                items: HashMap::new(),
                indices,
            }),
        }
    }

    /// Insert or replace an object
    pub fn add(&self, obj: T) {
        let key = obj.key();
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(old) = inner.items.remove(&key) {
            inner.unindex(&key, &old);
        }
        inner.index(&key, &obj);
        inner.items.insert(key.clone(), obj);
        trace!(key = %key, "store: upserted");
    }

    /// Remove an object by key, returning it if present
    pub fn delete(&self, key: &str) -> Option<T> {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let old = inner.items.remove(key)?;
        inner.unindex(key, &old);
        trace!(key = %key, "store: removed");
        Some(old)
    }

    /// Single mutation entry point: removes objects marked for delete,
    /// upserts everything else
    pub fn apply(&self, obj: T) {
        if obj.marked_for_delete() {
            self.delete(&obj.key());
        } else {
            self.add(obj);
        }
    }

    pub fn get_by_key(&self, key: &str) -> Option<T> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.items.get(key).cloned()
    }

    /// All objects indexed under `value` for `scope`, ordered by key.
    /// Unknown scopes yield nothing.
    pub fn get_by_index(&self, scope: &str, value: &str) -> Vec<T> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner
            .indices
            .get(scope)
            .and_then(|idx| idx.get(value))
            .map(|keys| keys.iter().filter_map(|k| inner.items.get(k).cloned()).collect())
            .unwrap_or_default()
    }

    /// Distinct values present in the `scope` index
    pub fn index_values(&self, scope: &str) -> Vec<String> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner
            .indices
            .get(scope)
            .map(|idx| idx.keys().cloned().collect::<BTreeSet<_>>().into_iter().collect())
            .unwrap_or_default()
    }

    /// Every object, ordered by key
    pub fn list(&self) -> Vec<T> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        let ordered: BTreeMap<&String, &T> = inner.items.iter().collect();
        ordered.into_values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: StoreObject> StoreInner<T> {
    fn index(&mut self, key: &str, obj: &T) {
        for (scope, idx) in self.indices.iter_mut() {
            for value in obj.index_values(scope) {
                idx.entry(value).or_default().insert(key.to_string());
            }
        }
    }

    fn unindex(&mut self, key: &str, obj: &T) {
        for (scope, idx) in self.indices.iter_mut() {
            for value in obj.index_values(scope) {
                if let Some(keys) = idx.get_mut(&value) {
                    keys.remove(key);
                    if keys.is_empty() {
                        idx.remove(&value);
                    }
                }
            }
        }
    }
}

impl<T: StoreObject> Default for ResourceStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceStore<Vpc> {
    pub fn vpcs_by_namespace(&self, namespace: &str) -> Vec<Vpc> {
        self.get_by_index(SCOPE_NAMESPACE, namespace)
    }

    pub fn vpcs_by_network_info(&self, uid: &str) -> Vec<Vpc> {
        self.get_by_index(SCOPE_NETWORK_INFO_UID, uid)
    }

    /// UIDs of the NetworkInfo objects owning VPCs created by `cluster`
    pub fn owner_uids(&self, cluster: &str) -> HashSet<String> {
        self.get_by_index(SCOPE_CLUSTER, cluster)
            .iter()
            .filter_map(|vpc| vpc.tag(SCOPE_NETWORK_INFO_UID).map(str::to_string))
            .collect()
    }
}

impl ResourceStore<LbService> {
    pub fn lb_service_for_vpc(&self, vpc_id: &str) -> Option<LbService> {
        self.get_by_index(INDEX_VPC_ID, vpc_id).into_iter().next()
    }
}

impl ResourceStore<IpBlock> {
    pub fn ip_blocks_by_namespace_uid(&self, uid: &str) -> Vec<IpBlock> {
        self.get_by_index(SCOPE_NAMESPACE_UID, uid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vpc_api::backend::Tag;

    fn vpc(id: &str, namespace: &str, owner: &str) -> Vpc {
        Vpc {
            id: id.to_string(),
            path: format!("/orgs/default/projects/p/vpcs/{}", id),
            tags: vec![
                Tag::new(SCOPE_CLUSTER, "c1"),
                Tag::new(SCOPE_NAMESPACE, namespace),
                Tag::new(SCOPE_NETWORK_INFO_UID, owner),
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_add_and_get() {
        let store = VpcStore::new();
        store.add(vpc("v1", "ns1", "uid-1"));

        assert_eq!(store.len(), 1);
        assert_eq!(store.get_by_key("v1").unwrap().id, "v1");
        assert!(store.get_by_key("v2").is_none());
        assert_eq!(store.vpcs_by_namespace("ns1").len(), 1);
        assert!(store.vpcs_by_namespace("ns2").is_empty());
    }

    #[test]
    fn test_update_moves_index_entries() {
        let store = VpcStore::new();
        store.add(vpc("v1", "ns1", "uid-1"));
        store.add(vpc("v1", "ns2", "uid-1"));

        assert_eq!(store.len(), 1);
        assert!(store.vpcs_by_namespace("ns1").is_empty());
        assert_eq!(store.vpcs_by_namespace("ns2").len(), 1);
        assert_eq!(store.index_values(SCOPE_NAMESPACE), vec!["ns2".to_string()]);
    }

    #[test]
    fn test_apply_marked_for_delete_removes() {
        let store = VpcStore::new();
        store.apply(vpc("v1", "ns1", "uid-1"));
        assert_eq!(store.len(), 1);

        let mut deleted = vpc("v1", "ns1", "uid-1");
        deleted.marked_for_delete = true;
        store.apply(deleted);

        assert!(store.is_empty());
        assert!(store.vpcs_by_namespace("ns1").is_empty());
        assert!(store.index_values(SCOPE_CLUSTER).is_empty());
    }

    #[test]
    fn test_unknown_scope_is_empty() {
        let store = VpcStore::new();
        store.add(vpc("v1", "ns1", "uid-1"));
        assert!(store.get_by_index("no-such-scope", "ns1").is_empty());
    }

    #[test]
    fn test_list_is_ordered() {
        let store = VpcStore::new();
        store.add(vpc("v3", "ns3", "uid-3"));
        store.add(vpc("v1", "ns1", "uid-1"));
        store.add(vpc("v2", "ns2", "uid-2"));

        let ids: Vec<String> = store.list().into_iter().map(|v| v.id).collect();
        assert_eq!(ids, vec!["v1", "v2", "v3"]);
    }

    #[test]
    fn test_owner_uids_filters_cluster() {
        let store = VpcStore::new();
        store.add(vpc("v1", "ns1", "uid-1"));
        let mut foreign = vpc("v2", "ns2", "uid-2");
        foreign.tags[0] = Tag::new(SCOPE_CLUSTER, "other");
        store.add(foreign);

        let uids = store.owner_uids("c1");
        assert_eq!(uids.len(), 1);
        assert!(uids.contains("uid-1"));
    }

    #[test]
    fn test_lb_service_keyed_by_vpc() {
        let store = LbServiceStore::new();
        let lbs = LbService {
            id: "default".to_string(),
            connectivity_path: "/orgs/o/projects/p/vpcs/v1".to_string(),
            ..Default::default()
        };
        assert_eq!(lbs.key(), "v1_default");
        store.add(lbs);

        assert!(store.lb_service_for_vpc("v1").is_some());
        assert!(store.lb_service_for_vpc("v2").is_none());
        assert!(store.get_by_key(&lb_service_key("v1", "default")).is_some());
    }

    #[test]
    fn test_ip_block_key_includes_namespace_uid() {
        let store = IpBlockStore::new();
        for uid in ["ns-uid-a", "ns-uid-b"] {
            store.add(IpBlock {
                id: format!("block-{}", uid),
                cidr: "10.0.0.0/16".to_string(),
                tags: vec![Tag::new(SCOPE_NAMESPACE_UID, uid)],
                ..Default::default()
            });
        }

        assert_eq!(store.len(), 2);
        assert_eq!(store.ip_blocks_by_namespace_uid("ns-uid-a").len(), 1);
        assert!(store.get_by_key("10.0.0.0/16_ns-uid-b").is_some());
    }
}

//! Startup population of the in-memory stores from backend search

use serde::de::DeserializeOwned;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;
use vpc_api::backend::tag::SCOPE_CLUSTER;
use vpc_backend::{search_all, BackendClient, SearchQuery};
use vpc_core::{IpBlockStore, LbServiceStore, ResourceStore, StoreObject, VpcStore};

use crate::{Result, VpcError};

/// Stores shared by the VPC service, the garbage collector and the controllers
#[derive(Clone, Default)]
pub struct Stores {
    pub vpcs: Arc<VpcStore>,
    pub lb_services: Arc<LbServiceStore>,
    pub ip_blocks: Arc<IpBlockStore>,
}

impl Stores {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every object tagged with `cluster`. The three kinds load
    /// concurrently; the first failure aborts the rest.
    pub async fn populate(
        &self,
        client: &dyn BackendClient,
        cluster: &str,
        token: &CancellationToken,
    ) -> Result<()> {
        let load = async {
            tokio::try_join!(
                load_kind(client, cluster, "Vpc", &self.vpcs),
                load_kind(client, cluster, "LBService", &self.lb_services),
                load_kind(client, cluster, "IpAddressBlock", &self.ip_blocks),
            )
        };

        let (vpcs, lb_services, ip_blocks) = tokio::select! {
            biased;
            _ = token.cancelled() => return Err(VpcError::Cancelled),
            loaded = load => loaded?,
        };
        info!(cluster, vpcs, lb_services, ip_blocks, "stores populated");
        Ok(())
    }
}

async fn load_kind<T>(
    client: &dyn BackendClient,
    cluster: &str,
    resource_type: &str,
    store: &ResourceStore<T>,
) -> Result<usize>
where
    T: StoreObject + DeserializeOwned,
{
    let query = SearchQuery::resource_type(resource_type).tag(SCOPE_CLUSTER, cluster);
    let objects: Vec<T> = search_all(client, &query).await?;
    let count = objects.len();
    for obj in objects {
        store.apply(obj);
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{unavailable, CLUSTER};
    use serde_json::json;
    use vpc_api::backend::SearchPage;
    use vpc_backend::MockBackendClient;

    fn page(results: Vec<serde_json::Value>) -> SearchPage {
        SearchPage {
            result_count: results.len() as u64,
            results,
            cursor: None,
        }
    }

    #[tokio::test]
    async fn test_populate_fills_every_store() {
        let mut client = MockBackendClient::new();
        client.expect_search().returning(|query, _| {
            let results = if query.starts_with("resource_type:Vpc ") {
                vec![
                    json!({"id": "v1", "path": "/orgs/o/projects/p/vpcs/v1",
                           "tags": [{"scope": "vpc-op/namespace", "tag": "ns1"}]}),
                    json!({"id": "v2", "marked_for_delete": true}),
                ]
            } else if query.starts_with("resource_type:LBService ") {
                vec![json!({"id": "default", "connectivity_path": "/orgs/o/projects/p/vpcs/v1"})]
            } else {
                vec![json!({"id": "b1", "cidr": "192.168.0.0/16"})]
            };
            Ok(page(results))
        });

        let stores = Stores::new();
        stores
            .populate(&client, CLUSTER, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(stores.vpcs.len(), 1);
        assert_eq!(stores.vpcs.vpcs_by_namespace("ns1").len(), 1);
        assert!(stores.lb_services.lb_service_for_vpc("v1").is_some());
        assert_eq!(stores.ip_blocks.len(), 1);
    }

    #[tokio::test]
    async fn test_first_failure_aborts() {
        let mut client = MockBackendClient::new();
        client.expect_search().returning(|query, _| {
            if query.starts_with("resource_type:LBService ") {
                Err(unavailable())
            } else {
                Ok(page(vec![]))
            }
        });

        let err = Stores::new()
            .populate(&client, CLUSTER, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, VpcError::Backend(_)));
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let mut client = MockBackendClient::new();
        client.expect_search().returning(|_, _| Ok(page(vec![])));

        let token = CancellationToken::new();
        token.cancel();
        let err = Stores::new()
            .populate(&client, CLUSTER, &token)
            .await
            .unwrap_err();
        assert!(matches!(err, VpcError::Cancelled));
    }
}

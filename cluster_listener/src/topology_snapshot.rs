use std::collections::{HashMap, HashSet};

use serde::Serialize;
use uuid::Uuid;

use crate::{
    error_chain_fmt,
    node_bean::{id8, NodeBean},
    product_version::{ProductVersion, VersionParseError},
};

/// Normalized view of the cluster built from one topology poll.
///
/// A snapshot is rebuilt wholesale on every successful poll. Only the `active` flag is set after
/// construction, once the management endpoint has been asked about the cluster state.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopologySnapshot {
    cluster_name: Option<String>,
    #[serde(rename = "clusterVersion")]
    version_string: Option<String>,
    active: bool,
    #[serde(rename = "nids")]
    node_ids: Vec<Uuid>,
    addresses: HashMap<Uuid, String>,
    clients: HashMap<Uuid, bool>,
    #[serde(skip)]
    version: Option<ProductVersion>,
}

impl TopologySnapshot {
    /// Builds a snapshot from the node list of a topology response.
    ///
    /// The cluster version is the oldest version found among the nodes, since the least capable
    /// node bounds what the whole cluster supports.
    pub fn build(nodes: &[NodeBean]) -> Result<Self, SnapshotError> {
        let mut snapshot = TopologySnapshot {
            node_ids: Vec::with_capacity(nodes.len()),
            addresses: HashMap::with_capacity(nodes.len()),
            clients: HashMap::with_capacity(nodes.len()),
            ..Default::default()
        };
        let mut seen = HashSet::with_capacity(nodes.len());

        for node in nodes {
            let node_id = node.node_id;

            if seen.insert(node_id) {
                snapshot.node_ids.push(node_id);
            }

            if snapshot.cluster_name.is_none() {
                snapshot.cluster_name = node
                    .cluster_name()
                    .filter(|name| !name.is_empty())
                    .map(str::to_string);
            }

            snapshot.clients.insert(node_id, node.is_client());

            if let Some(address) = node.representative_address() {
                snapshot.addresses.insert(node_id, address);
            }

            let version_string = node
                .build_version()
                .ok_or(SnapshotError::MissingVersion(node_id))?;
            let version = version_string
                .parse::<ProductVersion>()
                .map_err(|source| SnapshotError::InvalidVersion { node_id, source })?;

            let is_oldest = snapshot
                .version
                .as_ref()
                .map(|current| *current > version)
                .unwrap_or(true);

            if is_oldest {
                snapshot.version = Some(version);
                snapshot.version_string = Some(version_string.to_string());
            }
        }

        Ok(snapshot)
    }

    pub fn cluster_name(&self) -> Option<&str> {
        self.cluster_name.as_deref()
    }

    pub fn node_ids(&self) -> &[Uuid] {
        &self.node_ids
    }

    pub fn is_empty(&self) -> bool {
        self.node_ids.is_empty()
    }

    pub fn address(&self, node_id: &Uuid) -> Option<&str> {
        self.addresses.get(node_id).map(String::as_str)
    }

    pub fn addresses(&self) -> &HashMap<Uuid, String> {
        &self.addresses
    }

    pub fn is_client(&self, node_id: &Uuid) -> Option<bool> {
        self.clients.get(node_id).copied()
    }

    pub fn clients(&self) -> &HashMap<Uuid, bool> {
        &self.clients
    }

    pub fn version(&self) -> Option<&ProductVersion> {
        self.version.as_ref()
    }

    pub fn version_string(&self) -> Option<&str> {
        self.version_string.as_deref()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// Node ids in their short form, for log lines.
    pub fn id8s(&self) -> Vec<String> {
        self.node_ids.iter().map(id8).collect()
    }

    pub fn shares_node_with(&self, other: &TopologySnapshot) -> bool {
        let ids = self.node_ids.iter().collect::<HashSet<_>>();
        other.node_ids.iter().any(|id| ids.contains(id))
    }
}

/// Tells whether `b` belongs to a different cluster than `a`.
///
/// Clusters are the same as long as they share at least one node, so nodes joining or leaving
/// keep the identity. A missing or empty `a` is always a different cluster.
pub fn is_different_cluster(a: Option<&TopologySnapshot>, b: &TopologySnapshot) -> bool {
    match a {
        None => true,
        Some(a) if a.is_empty() => true,
        Some(a) => !a.shares_node_with(b),
    }
}

#[derive(thiserror::Error)]
pub enum SnapshotError {
    #[error("Node {0} does not report a build version")]
    MissingVersion(Uuid),
    #[error("Node {node_id} reports an invalid build version")]
    InvalidVersion {
        node_id: Uuid,
        #[source]
        source: VersionParseError,
    },
}
impl std::fmt::Debug for SnapshotError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use uuid::Uuid;

    use crate::node_bean::{NodeBean, ATTR_BUILD_VER, ATTR_CLIENT_MODE, ATTR_CLUSTER_NAME, ATTR_IPS};

    use super::{is_different_cluster, SnapshotError, TopologySnapshot};

    fn server_node(version: &str) -> NodeBean {
        NodeBean::new(Uuid::new_v4())
            .with_attribute(ATTR_BUILD_VER, version)
            .with_tcp_addresses(&["127.0.0.1"])
    }

    fn client_node(ips: &str) -> NodeBean {
        NodeBean::new(Uuid::new_v4())
            .with_attribute(ATTR_BUILD_VER, "2.7.0")
            .with_attribute(ATTR_CLIENT_MODE, true)
            .with_attribute(ATTR_IPS, ips)
    }

    fn snapshot_of(ids: &[Uuid]) -> TopologySnapshot {
        let nodes = ids
            .iter()
            .map(|id| NodeBean::new(*id).with_attribute(ATTR_BUILD_VER, "2.7.0"))
            .collect::<Vec<_>>();
        TopologySnapshot::build(&nodes).unwrap()
    }

    #[test]
    fn minimum_version_wins_regardless_of_order() {
        let versions = ["2.1.0", "2.3.0", "2.0.5"];
        let orders = [[0, 1, 2], [2, 1, 0], [1, 2, 0], [1, 0, 2]];

        for order in orders {
            let nodes = order
                .iter()
                .map(|i| server_node(versions[*i]))
                .collect::<Vec<_>>();

            let snapshot = TopologySnapshot::build(&nodes).unwrap();

            assert_eq!(snapshot.version_string(), Some("2.0.5"));
            assert_eq!(snapshot.version().unwrap().to_string(), "2.0.5");
        }
    }

    #[test]
    fn client_nodes_use_first_sorted_address() {
        let first = client_node("10.0.0.5,10.0.0.2");
        let second = client_node("10.0.0.9");

        let snapshot = TopologySnapshot::build(&[first.clone(), second.clone()]).unwrap();

        assert_eq!(snapshot.address(&first.node_id), Some("10.0.0.2"));
        assert_eq!(snapshot.address(&second.node_id), Some("10.0.0.9"));
        assert_eq!(snapshot.is_client(&first.node_id), Some(true));
    }

    #[test]
    fn first_non_empty_cluster_name_is_kept() {
        let nodes = [
            server_node("2.7.0").with_attribute(ATTR_CLUSTER_NAME, ""),
            server_node("2.7.0").with_attribute(ATTR_CLUSTER_NAME, "prod"),
            server_node("2.7.0").with_attribute(ATTR_CLUSTER_NAME, "other"),
        ];

        let snapshot = TopologySnapshot::build(&nodes).unwrap();

        assert_eq!(snapshot.cluster_name(), Some("prod"));
        assert_eq!(snapshot.node_ids().len(), 3);
        assert!(!snapshot.is_active());
    }

    #[test]
    fn duplicate_node_ids_are_recorded_once() {
        let node = server_node("2.7.0");

        let snapshot = TopologySnapshot::build(&[node.clone(), node.clone()]).unwrap();

        assert_eq!(snapshot.node_ids(), &[node.node_id]);
    }

    #[test]
    fn empty_node_list_builds_empty_snapshot() {
        let snapshot = TopologySnapshot::build(&[]).unwrap();

        assert!(snapshot.is_empty());
        assert!(snapshot.cluster_name().is_none());
        assert!(snapshot.version().is_none());
        assert!(snapshot.addresses().is_empty());
        assert!(snapshot.clients().is_empty());
        assert!(!snapshot.is_active());
    }

    #[test]
    fn unparsable_version_fails_construction() {
        let nodes = [server_node("2.7.0"), server_node("not-a-version")];

        let result = TopologySnapshot::build(&nodes);

        assert!(matches!(result, Err(SnapshotError::InvalidVersion { .. })));
    }

    #[test]
    fn missing_version_fails_construction() {
        let node = NodeBean::new(Uuid::new_v4());

        let result = TopologySnapshot::build(&[node]);

        assert!(matches!(result, Err(SnapshotError::MissingVersion(_))));
    }

    #[test]
    fn serializes_with_console_field_names() {
        let node = server_node("2.7.0").with_attribute(ATTR_CLUSTER_NAME, "prod");
        let mut snapshot = TopologySnapshot::build(&[node.clone()]).unwrap();
        snapshot.set_active(true);

        let value = serde_json::to_value(&snapshot).unwrap();

        assert_eq!(
            value,
            json!({
                "clusterName": "prod",
                "clusterVersion": "2.7.0",
                "active": true,
                "nids": [node.node_id],
                "addresses": { node.node_id.to_string(): "127.0.0.1" },
                "clients": { node.node_id.to_string(): false },
            })
        );
    }

    #[test]
    fn overlapping_node_sets_are_the_same_cluster() {
        let shared = Uuid::new_v4();
        let previous = snapshot_of(&[shared, Uuid::new_v4(), Uuid::new_v4()]);
        let current = snapshot_of(&[Uuid::new_v4(), shared]);

        assert!(!is_different_cluster(Some(&previous), &current));
        assert!(!is_different_cluster(Some(&current), &previous));
    }

    #[test]
    fn disjoint_node_sets_are_different_in_both_directions() {
        let previous = snapshot_of(&[Uuid::new_v4(), Uuid::new_v4()]);
        let current = snapshot_of(&[Uuid::new_v4()]);

        assert!(is_different_cluster(Some(&previous), &current));
        assert!(is_different_cluster(Some(&current), &previous));
    }

    #[test]
    fn missing_or_empty_reference_is_a_different_cluster() {
        let empty = snapshot_of(&[]);
        let any = snapshot_of(&[Uuid::new_v4()]);

        assert!(is_different_cluster(None, &any));
        assert!(is_different_cluster(Some(&empty), &any));
        assert!(is_different_cluster(Some(&any), &empty));
    }
}

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Node attribute holding the client mode flag.
pub const ATTR_CLIENT_MODE: &str = "org.apache.ignite.cache.client";
/// Node attribute holding the comma separated list of addresses of a client node.
pub const ATTR_IPS: &str = "org.apache.ignite.ips";
/// Node attribute holding the build version of the node.
pub const ATTR_BUILD_VER: &str = "org.apache.ignite.build.ver";
/// Node attribute holding the user defined cluster name.
pub const ATTR_CLUSTER_NAME: &str = "IGNITE_CLUSTER_NAME";

/// One node entry of the topology returned by the management endpoint.
#[derive(Debug, Deserialize, Serialize, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct NodeBean {
    pub node_id: Uuid,
    #[serde(default)]
    pub consistent_id: Option<Value>,
    #[serde(default)]
    pub tcp_port: Option<u16>,
    #[serde(default)]
    pub tcp_addresses: Option<Vec<String>>,
    #[serde(default)]
    pub tcp_host_names: Option<Vec<String>>,
    #[serde(default)]
    pub attributes: HashMap<String, Value>,
    #[serde(default)]
    pub metrics: Option<Value>,
    #[serde(default)]
    pub caches: Option<Value>,
}

impl NodeBean {
    pub fn new(node_id: Uuid) -> Self {
        Self {
            node_id,
            ..Default::default()
        }
    }

    /// Sets an attribute, mostly useful to assemble nodes by hand.
    pub fn with_attribute(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.to_string(), value.into());
        self
    }

    pub fn with_tcp_addresses<T>(mut self, addresses: &[T]) -> Self
    where
        T: AsRef<str>,
    {
        self.tcp_addresses = Some(addresses.iter().map(|a| a.as_ref().to_string()).collect());
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    fn string_attribute(&self, name: &str) -> Option<&str> {
        self.attribute(name).and_then(Value::as_str)
    }

    pub fn cluster_name(&self) -> Option<&str> {
        self.string_attribute(ATTR_CLUSTER_NAME)
    }

    pub fn build_version(&self) -> Option<&str> {
        self.string_attribute(ATTR_BUILD_VER)
    }

    /// Client mode flag. Nodes without the attribute are server nodes.
    pub fn is_client(&self) -> bool {
        match self.attribute(ATTR_CLIENT_MODE) {
            Some(Value::Bool(client)) => *client,
            Some(Value::String(client)) => client.eq_ignore_ascii_case("true"),
            _ => false,
        }
    }

    /// Addresses of the node: the split address attribute for client nodes, the reported TCP
    /// addresses for server nodes.
    pub fn addresses(&self) -> Vec<String> {
        if self.is_client() {
            self.string_attribute(ATTR_IPS)
                .map(split_addresses)
                .unwrap_or_default()
        } else {
            self.tcp_addresses.clone().unwrap_or_default()
        }
    }

    /// Lexicographically first address of the node.
    pub fn representative_address(&self) -> Option<String> {
        let mut addresses = self.addresses();
        addresses.sort();
        addresses.into_iter().next()
    }
}

/// Splits a comma separated address list, dropping blanks.
pub fn split_addresses(addresses: &str) -> Vec<String> {
    addresses
        .split(',')
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(str::to_string)
        .collect()
}

/// Short upper case form of a node id used in log lines.
pub fn id8(node_id: &Uuid) -> String {
    node_id.simple().to_string()[..8].to_uppercase()
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use uuid::Uuid;

    use super::{id8, split_addresses, NodeBean, ATTR_CLIENT_MODE, ATTR_IPS};

    #[test]
    fn deserializes_rest_node_entry() {
        let raw = json!({
            "nodeId": "a1b2c3d4-0000-0000-0000-000000000001",
            "consistentId": "127.0.0.1:47500",
            "tcpPort": 11211,
            "tcpAddresses": ["127.0.0.1", "10.0.0.3"],
            "tcpHostNames": null,
            "attributes": {
                "IGNITE_CLUSTER_NAME": "prod",
                "org.apache.ignite.build.ver": "2.7.0#20181130-sha1:256ae401",
                "org.apache.ignite.cache.client": false
            },
            "metrics": null,
            "caches": null
        });

        let node = serde_json::from_value::<NodeBean>(raw).unwrap();

        assert_eq!(node.cluster_name(), Some("prod"));
        assert_eq!(node.build_version(), Some("2.7.0#20181130-sha1:256ae401"));
        assert!(!node.is_client());
        assert_eq!(node.representative_address().as_deref(), Some("10.0.0.3"));
    }

    #[test]
    fn client_nodes_use_address_attribute() {
        let node = NodeBean::new(Uuid::new_v4())
            .with_attribute(ATTR_CLIENT_MODE, true)
            .with_attribute(ATTR_IPS, "10.0.0.5, 10.0.0.2")
            .with_tcp_addresses(&["192.168.0.1"]);

        assert_eq!(node.addresses(), vec!["10.0.0.5", "10.0.0.2"]);
        assert_eq!(node.representative_address().as_deref(), Some("10.0.0.2"));
    }

    #[test]
    fn nodes_without_addresses_have_no_representative() {
        let node = NodeBean::new(Uuid::new_v4());

        assert!(node.representative_address().is_none());
    }

    #[test]
    fn split_addresses_drops_blanks() {
        assert_eq!(split_addresses("a,, b ,"), vec!["a", "b"]);
    }

    #[test]
    fn id8_is_short_upper_case_prefix() {
        let id = Uuid::parse_str("a1b2c3d4-e5f6-0000-0000-000000000001").unwrap();

        assert_eq!(id8(&id), "A1B2C3D4");
    }
}

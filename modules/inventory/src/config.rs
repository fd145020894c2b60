use serde::{Deserialize, Serialize};

/// `modules.inventory` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InventoryConfig {
    #[serde(default = "default_limit")]
    pub default_limit: u64,
    #[serde(default = "default_max_limit")]
    pub max_limit: u64,
    /// Accept `limit=-1` on paginated list endpoints.
    #[serde(default)]
    pub allow_unbounded_list: bool,
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            max_limit: default_max_limit(),
            allow_unbounded_list: false,
            api_prefix: default_api_prefix(),
        }
    }
}

fn default_limit() -> u64 {
    20
}

fn default_max_limit() -> u64 {
    1000
}

fn default_api_prefix() -> String {
    "/api/patch/v1".to_string()
}

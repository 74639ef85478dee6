use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::impl_resource;
use crate::meta::{ObjectMeta, ResourceKind};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConfigMap {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub data: BTreeMap<String, String>,
}

impl_resource!(ConfigMap, ResourceKind::ConfigMap);

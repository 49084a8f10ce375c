use crate::domain::foundation::HostId;
use serde::{Deserialize, Serialize};

/// Resource a package is provisioned onto (a site, a server).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Host {
    pub id: HostId,
    #[serde(default)]
    pub name: Option<String>,
}

impl Host {
    pub fn new(id: HostId) -> Self {
        Self { id, name: None }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

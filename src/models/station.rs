use serde::{Deserialize, Serialize};

/// A station along the network, carrying the platforms trains may occupy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    pub id: String,
    pub name: String,
    pub platforms: Vec<Platform>,
}

impl Station {
    pub fn total_platforms(&self) -> usize {
        self.platforms.len()
    }

    pub fn platform(&self, platform_id: &str) -> Option<&Platform> {
        self.platforms.iter().find(|p| p.id == platform_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Platform {
    pub id: String,
    pub length_m: f64,
    pub electrified: bool,
}

use serde::{Deserialize, Serialize};

/// A named collection of trains, segments and constraints defining one
/// optimiser run's scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub id: String,
    #[serde(default)]
    pub description: String,
    pub trains: Vec<String>,
    pub segments: Vec<String>,
    /// Either primary keys or type-tag strings (§4.1); disambiguated by the
    /// adapter, never by this struct.
    #[serde(default)]
    pub constraints: Vec<String>,
}

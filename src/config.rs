//! Identity table handling

use std::{fmt::Display, num::NonZeroU64, path::Path};

use eyre::{Context, ensure};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, de};

/// A VATSIM member identifier (CID). Always positive.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(transparent)]
pub struct NetworkId(NonZeroU64);

impl NetworkId {
    /// Create a network ID, returning `None` for zero.
    pub const fn new(value: u64) -> Option<Self> {
        match NonZeroU64::new(value) {
            Some(id) => Some(Self(id)),
            None => None,
        }
    }
}

impl From<NetworkId> for u64 {
    fn from(value: NetworkId) -> Self {
        value.0.get()
    }
}

impl Display for NetworkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A controller whose hours get plotted
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Identity {
    /// VATSIM member ID
    pub id: NetworkId,

    /// Line color, either a named color or `#rgb`/`#rrggbb`
    #[serde(deserialize_with = "deserialize_color")]
    pub color: String,
}

/// Mapping from display name to identity. Iteration order is the plotting order.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct IdentityTable {
    /// Controllers keyed by display name
    controllers: IndexMap<String, Identity>,
}

impl IdentityTable {
    /// Load an identity table from the given TOML file.
    pub async fn parse_from_file(path: &Path) -> eyre::Result<Self> {
        let file_contents = tokio::fs::read_to_string(path)
            .await
            .wrap_err_with(|| format!("Failed to read {}", path.display()))?;
        Self::parse(&file_contents).wrap_err("Failed to load identity table")
    }

    /// Parse an identity table from TOML text.
    pub fn parse(contents: &str) -> eyre::Result<Self> {
        let table: Self = toml::from_str(contents)?;
        ensure!(
            !table.controllers.is_empty(),
            "identity table contains no controllers"
        );
        Ok(table)
    }

    /// Iterate over `(display name, identity)` pairs in table order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Identity)> {
        self.controllers
            .iter()
            .map(|(name, identity)| (name.as_str(), identity))
    }
}

impl Default for IdentityTable {
    fn default() -> Self {
        let controllers = [
            ("Matisse", 1_385_143, "blue"),
            ("Luka", 1_345_102, "red"),
            ("Erik", 815_026, "green"),
            ("Mathias", 1_167_648, "yellow"),
            ("Jan-Willem", 1_491_301, "pink"),
        ]
        .into_iter()
        .filter_map(|(name, id, color)| {
            Some((
                name.to_owned(),
                Identity {
                    id: NetworkId::new(id)?,
                    color: color.to_owned(),
                },
            ))
        })
        .collect();
        Self { controllers }
    }
}

/// Whether the string is something we are willing to put in a `stroke` attribute.
fn is_valid_color(color: &str) -> bool {
    match color.strip_prefix('#') {
        Some(hex) => matches!(hex.len(), 3 | 6) && hex.chars().all(|c| c.is_ascii_hexdigit()),
        None => !color.is_empty() && color.chars().all(|c| c.is_ascii_alphabetic()),
    }
}

// Deserialize a color name or hex triplet
fn deserialize_color<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let color = String::deserialize(deserializer)?;
    if !is_valid_color(&color) {
        return Err(de::Error::custom(format!(
            "`{color}` is not a color name or a #rgb/#rrggbb hex value"
        )));
    }
    Ok(color)
}

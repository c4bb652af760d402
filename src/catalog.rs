//! Static lookup tables: card/exhibit catalogs, exhibit properties, enemy
//! groups and localized unit names, and the card-id alias map.
//!
//! Every loader degrades to an empty mapping with a warning when its input
//! is missing or unreadable — ids then simply render as themselves. The
//! whole set is owned by [`Catalogs`] and injected into the engine, so tests
//! run against synthetic catalogs instead of on-disk data.

use crate::error::RfResult;
use crate::source::open_text_reader;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct CardInfo {
    #[serde(rename = "JA")]
    pub ja: String,
    #[serde(rename = "EN")]
    pub en: String,
    #[serde(rename = "Rarity")]
    pub rarity: String,
    #[serde(rename = "Type")]
    pub card_type: String,
    #[serde(rename = "Cost")]
    pub cost: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ExhibitInfo {
    #[serde(rename = "JA")]
    pub ja: String,
    #[serde(rename = "EN")]
    pub en: String,
    #[serde(rename = "Category")]
    pub category: String,
}

/// Properties parsed from the exhibit text config (`Key=Value` blocks).
#[derive(Debug, Clone, Default)]
pub struct ExhibitProps {
    pub is_pooled: Option<bool>,
    pub appearance: Option<String>,
    pub rarity: Option<String>,
}

/// Localized unit name entries appear either as a bare string or as an
/// object carrying a `Name` field.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum UnitNameEntry {
    Plain(String),
    Detailed {
        #[serde(rename = "Name")]
        name: Option<String>,
    },
}

pub struct CatalogPaths<'a> {
    pub cards: &'a Path,
    pub exhibits: &'a Path,
    pub exhibit_config: &'a Path,
    pub exhibit_data: &'a Path,
    pub enemy_groups: &'a Path,
    pub unit_names: &'a Path,
    pub aliases: &'a Path,
}

/// All static lookups, loaded once and passed into the engine.
#[derive(Debug, Clone, Default)]
pub struct Catalogs {
    pub cards: HashMap<String, CardInfo>,
    pub exhibits: HashMap<String, ExhibitInfo>,
    pub exhibit_props: HashMap<String, ExhibitProps>,
    /// Rarity from the exhibit base-data JSON; overrides the text config.
    pub exhibit_rarity: HashMap<String, String>,
    pub enemy_groups: HashMap<String, Vec<String>>,
    pub unit_names: HashMap<String, String>,
    /// Legacy card id -> canonical id.
    pub aliases: HashMap<String, String>,
}

impl Catalogs {
    /// Catalogs with only the built-in alias table; used by tests and as the
    /// degraded state when no lookup files are available.
    pub fn empty() -> Self {
        Self {
            aliases: builtin_aliases(),
            ..Self::default()
        }
    }

    pub fn load(paths: &CatalogPaths) -> Self {
        let mut aliases = builtin_aliases();
        aliases.extend(load_alias_csv(paths.aliases));

        Self {
            cards: load_json_map(paths.cards, "card catalog"),
            exhibits: load_json_map(paths.exhibits, "exhibit catalog"),
            exhibit_props: load_exhibit_config(paths.exhibit_config),
            exhibit_rarity: load_exhibit_rarity(paths.exhibit_data),
            enemy_groups: load_json_map(paths.enemy_groups, "enemy groups"),
            unit_names: load_unit_names(paths.unit_names),
            aliases,
        }
    }

    /// Maps legacy/alias card ids to their canonical form. Applied at every
    /// point an id is read from a run.
    pub fn normalize_card_id<'a>(&'a self, id: &'a str) -> &'a str {
        self.aliases.get(id).map(String::as_str).unwrap_or(id)
    }

    /// Display name for a card id; the raw id when the catalog has no entry.
    pub fn card_name(&self, id: &str) -> String {
        match self.cards.get(id) {
            Some(info) if !info.en.is_empty() => info.en.clone(),
            Some(info) if !info.ja.is_empty() => info.ja.clone(),
            _ => id.to_string(),
        }
    }

    /// Display name for an exhibit id; the raw id when unknown.
    pub fn exhibit_name(&self, id: &str) -> String {
        match self.exhibits.get(id) {
            Some(info) if !info.en.is_empty() => info.en.clone(),
            Some(info) if !info.ja.is_empty() => info.ja.clone(),
            _ => id.to_string(),
        }
    }

    /// Display name for an enemy group: member unit names joined with " & ",
    /// falling back to raw ids wherever a lookup is missing.
    pub fn enemy_name(&self, group_id: &str) -> String {
        match self.enemy_groups.get(group_id) {
            Some(members) if !members.is_empty() => members
                .iter()
                .map(|m| self.unit_names.get(m).cloned().unwrap_or_else(|| m.clone()))
                .collect::<Vec<_>>()
                .join(" & "),
            _ => group_id.to_string(),
        }
    }

    /// Effective exhibit rarity: base-data JSON first, then the text config.
    pub fn exhibit_rarity_for(&self, id: &str) -> Option<&str> {
        self.exhibit_rarity
            .get(id)
            .map(String::as_str)
            .or_else(|| self.exhibit_props.get(id).and_then(|p| p.rarity.as_deref()))
    }
}

fn builtin_aliases() -> HashMap<String, String> {
    // Known legacy spelling shipped by old client versions.
    let mut map = HashMap::new();
    map.insert("ShinningPotion".to_string(), "ShiningPotion".to_string());
    map
}

fn load_json_map<T: DeserializeOwned>(path: &Path, what: &str) -> HashMap<String, T> {
    match try_load_json_map(path) {
        Ok(map) => {
            debug!("Loaded {} entries from {} {:?}", map.len(), what, path);
            map
        }
        Err(e) => {
            warn!("Could not load {} from {:?}: {}. Proceeding with an empty map.", what, path, e);
            HashMap::new()
        }
    }
}

fn try_load_json_map<T: DeserializeOwned>(path: &Path) -> RfResult<HashMap<String, T>> {
    let reader = open_text_reader(path)?;
    Ok(serde_json::from_reader(reader)?)
}

fn load_unit_names(path: &Path) -> HashMap<String, String> {
    let raw: HashMap<String, UnitNameEntry> = load_json_map(path, "unit names");
    raw.into_iter()
        .filter_map(|(id, entry)| match entry {
            UnitNameEntry::Plain(name) => Some((id, name)),
            UnitNameEntry::Detailed { name } => name.map(|n| (id, n)),
        })
        .collect()
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct ExhibitBaseData {
    #[serde(rename = "Rarity")]
    rarity: Option<String>,
}

fn load_exhibit_rarity(path: &Path) -> HashMap<String, String> {
    let raw: HashMap<String, ExhibitBaseData> = load_json_map(path, "exhibit base data");
    raw.into_iter()
        .filter_map(|(id, data)| data.rarity.map(|r| (id, r)))
        .collect()
}

const EXHIBIT_BLOCK_SEPARATOR: &str = "------------------------";

/// Parses the exhibit property text config: blocks of `Key=Value` lines
/// separated by a dash rule, one block per `ExhibitConfig` entry.
pub fn load_exhibit_config(path: &Path) -> HashMap<String, ExhibitProps> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            warn!(
                "Could not read exhibit config {:?}: {}. Exhibit categorization will be limited.",
                path, e
            );
            return HashMap::new();
        }
    };
    parse_exhibit_config(&content)
}

pub fn parse_exhibit_config(content: &str) -> HashMap<String, ExhibitProps> {
    let mut result = HashMap::new();

    for block in content.split(EXHIBIT_BLOCK_SEPARATOR) {
        if !block.contains("ExhibitConfig") {
            continue;
        }

        let mut id = None;
        let mut props = ExhibitProps::default();
        for line in block.lines() {
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let value = value.trim();
            match key.trim() {
                "Id" => id = Some(value.to_string()),
                "IsPooled" => props.is_pooled = Some(value == "True"),
                "Appearance" => props.appearance = Some(value.to_string()),
                "Rarity" => props.rarity = Some(value.to_string()),
                _ => {}
            }
        }
        if let Some(id) = id {
            result.insert(id, props);
        }
    }

    result
}

/// Loads the alias CSV (`legacy,canonical`, headered). Bad rows are skipped.
fn load_alias_csv(path: &Path) -> HashMap<String, String> {
    let file = match std::fs::File::open(path) {
        Ok(f) => f,
        Err(e) => {
            debug!("No alias file at {:?} ({}); using built-in aliases only.", path, e);
            return HashMap::new();
        }
    };

    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .has_headers(true)
        .from_reader(file);

    let mut aliases = HashMap::new();
    for record in rdr.records().flatten() {
        if record.len() < 2 {
            continue;
        }
        let legacy = record[0].trim();
        let canonical = record[1].trim();
        if !legacy.is_empty() && !canonical.is_empty() {
            aliases.insert(legacy.to_string(), canonical.to_string());
        }
    }
    aliases
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_alias_normalizes_legacy_spelling() {
        let catalogs = Catalogs::empty();
        assert_eq!(catalogs.normalize_card_id("ShinningPotion"), "ShiningPotion");
        assert_eq!(catalogs.normalize_card_id("Strike"), "Strike");
    }

    #[test]
    fn exhibit_config_blocks_parse() {
        let content = "\
ExhibitConfig
Id=GoldenApple
IsPooled=True
Appearance=Anywhere
Rarity=Rare
------------------------
SomethingElse
Id=Ignored
------------------------
ExhibitConfig
Id=CursedDoll
IsPooled=False
";
        let props = parse_exhibit_config(content);
        assert_eq!(props.len(), 2);
        assert_eq!(props["GoldenApple"].is_pooled, Some(true));
        assert_eq!(props["GoldenApple"].rarity.as_deref(), Some("Rare"));
        assert_eq!(props["CursedDoll"].is_pooled, Some(false));
        assert!(props["CursedDoll"].rarity.is_none());
    }

    #[test]
    fn enemy_name_joins_group_members() {
        let mut catalogs = Catalogs::empty();
        catalogs
            .enemy_groups
            .insert("FairyTrio".to_string(), vec!["FairyA".to_string(), "FairyB".to_string()]);
        catalogs
            .unit_names
            .insert("FairyA".to_string(), "Sunny".to_string());
        assert_eq!(catalogs.enemy_name("FairyTrio"), "Sunny & FairyB");
        assert_eq!(catalogs.enemy_name("NoSuchGroup"), "NoSuchGroup");
    }
}

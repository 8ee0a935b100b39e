//! Loading of the TOML catalog that feeds the headless driver.

use std::{collections::HashSet, fs, path::Path};

use anyhow::{bail, Context, Result};
use quiz_defence_core::{
    AbilityDefinition, AllyProfile, EquipmentItem, EquipmentModifiers, ItemSlot, PlayerClass,
    ProgressionSnapshot, Question, StageDefinition,
};
use quiz_defence_session::{CatalogData, Tuning};
use serde::Deserialize;

const BUNDLED_CATALOG: &str = include_str!("../assets/catalog.toml");

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    tuning: Tuning,
    #[serde(default)]
    stages: Vec<StageDefinition>,
    #[serde(default)]
    questions: Vec<Question>,
    #[serde(default)]
    abilities: Vec<AbilityDefinition>,
    #[serde(default)]
    items: Vec<EquipmentItem>,
    ally: Option<AllyProfile>,
}

/// Player setup requested on the command line.
#[derive(Clone, Debug)]
pub(crate) struct Loadout {
    pub(crate) class: PlayerClass,
    pub(crate) level: u32,
    pub(crate) weapon: Option<String>,
    pub(crate) armor: Option<String>,
    pub(crate) accessory: Option<String>,
    pub(crate) abilities: Vec<String>,
    pub(crate) ally: bool,
}

/// Parsed catalog: stage and question data plus everything a loadout can pick.
#[derive(Debug)]
pub(crate) struct Catalog {
    pub(crate) tuning: Tuning,
    pub(crate) data: CatalogData,
    abilities: Vec<AbilityDefinition>,
    items: Vec<EquipmentItem>,
    ally: Option<AllyProfile>,
}

impl Catalog {
    /// Loads the catalog at `path`, or the bundled one when no path is given.
    pub(crate) fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Self::bundled();
        };
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read catalog at {}", path.display()))?;
        Self::parse(&contents).with_context(|| format!("invalid catalog at {}", path.display()))
    }

    /// Catalog compiled into the binary.
    pub(crate) fn bundled() -> Result<Self> {
        Self::parse(BUNDLED_CATALOG).context("bundled catalog is invalid")
    }

    fn parse(contents: &str) -> Result<Self> {
        let file: CatalogFile =
            toml::from_str(contents).context("failed to parse catalog toml contents")?;
        if file.stages.is_empty() {
            bail!("catalog defines no stages");
        }

        let mut seen = HashSet::new();
        for stage in &file.stages {
            if !seen.insert(stage.id) {
                bail!("catalog defines stage {} twice", stage.id.get());
            }
        }
        let mut seen = HashSet::new();
        for ability in &file.abilities {
            if !seen.insert(ability.id.as_str()) {
                bail!("catalog defines ability `{}` twice", ability.id.as_str());
            }
        }

        Ok(Self {
            tuning: file.tuning,
            data: CatalogData {
                stages: file.stages,
                questions: file.questions,
            },
            abilities: file.abilities,
            items: file.items,
            ally: file.ally,
        })
    }

    /// Builds the progression snapshot for the requested loadout.
    pub(crate) fn progression(&self, loadout: &Loadout) -> Result<ProgressionSnapshot> {
        let mut progression = ProgressionSnapshot::new(loadout.class, loadout.level);

        let mut equipped = Vec::with_capacity(3);
        for (slot, id) in [
            (ItemSlot::Weapon, &loadout.weapon),
            (ItemSlot::Armor, &loadout.armor),
            (ItemSlot::Accessory, &loadout.accessory),
        ] {
            let Some(id) = id else {
                continue;
            };
            let item = self
                .items
                .iter()
                .find(|item| &item.id == id)
                .with_context(|| format!("unknown item `{id}`"))?;
            if item.slot != slot {
                bail!("item `{id}` is a {:?} item, not a {slot:?} item", item.slot);
            }
            equipped.push(item.clone());
        }
        progression.equipment = EquipmentModifiers::from_items(&equipped);

        for id in &loadout.abilities {
            let ability = self
                .abilities
                .iter()
                .find(|ability| ability.id.as_str() == id)
                .with_context(|| format!("unknown ability `{id}`"))?;
            progression.abilities.push(ability.clone());
        }

        if loadout.ally {
            let ally = self.ally.clone().context("catalog defines no ally")?;
            progression.ally = Some(ally);
        }

        Ok(progression)
    }
}

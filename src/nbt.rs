//! NBT item descriptions.
//!
//! The renderer does not own a full NBT textual parser (that lives with the
//! out-of-scope collaborators); it only needs a typed representation of the
//! compound a caller hands in, plus convenience accessors for the handful of
//! `minecraft:*` components the render pipeline consults.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// A tagged NBT value.
///
/// Mirrors Minecraft's tag set. Kept as a sum type (not an inheritance
/// hierarchy) so matching on a tag's shape is exhaustive and compiler-checked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NbtTag {
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
    ByteArray(Vec<i8>),
    IntArray(Vec<i32>),
    LongArray(Vec<i64>),
    List(Vec<NbtTag>),
    Compound(FxHashMap<String, NbtTag>),
}

impl NbtTag {
    pub fn as_compound(&self) -> Option<&FxHashMap<String, NbtTag>> {
        match self {
            NbtTag::Compound(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            NbtTag::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            NbtTag::Byte(v) => Some(i64::from(*v)),
            NbtTag::Short(v) => Some(i64::from(*v)),
            NbtTag::Int(v) => Some(i64::from(*v)),
            NbtTag::Long(v) => Some(*v),
            _ => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&NbtTag> {
        self.as_compound()?.get(key)
    }
}

/// A `textures` property entry on a `minecraft:profile` component.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileProperty {
    pub name: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

/// `minecraft:profile` item component.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileComponent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub properties: Vec<ProfileProperty>,
}

/// `minecraft:dyed_color` item component.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DyedColorComponent {
    pub rgb: i32,
    #[serde(default)]
    pub show_in_tooltip: bool,
}

/// The components sub-compound of an item stack, flattened to the fields the
/// render pipeline actually consults.
#[derive(Debug, Clone, Default)]
pub struct ItemComponents {
    pub custom_data: Option<NbtTag>,
    pub profile: Option<ProfileComponent>,
    pub dyed_color: Option<DyedColorComponent>,
    pub damage: Option<i32>,
}

/// A caller-supplied item stack description.
///
/// Corresponds to the NBT compound shape in spec §6: `id`, optional `Count`,
/// optional `components`. The legacy 1.8.9 `tag.ExtraAttributes.id` form is
/// normalized into `components.custom_data.id` by [`ItemStack::from_nbt`].
#[derive(Debug, Clone)]
pub struct ItemStack {
    pub id: String,
    pub count: i8,
    pub components: ItemComponents,
}

impl ItemStack {
    /// Builds an `ItemStack` from a raw NBT compound, lifting the legacy
    /// `tag.ExtraAttributes.id` form into `components.custom_data.id` when
    /// present and no modern `components.minecraft:custom_data` exists.
    pub fn from_nbt(root: &NbtTag) -> crate::error::Result<Self> {
        let id = root
            .get("id")
            .and_then(NbtTag::as_str)
            .ok_or_else(|| crate::error::RenderError::InvalidItemId("missing id".to_string()))?
            .to_string();
        if id.split(':').count() != 2 || id.split(':').next().is_some_and(str::is_empty) {
            return Err(crate::error::RenderError::InvalidItemId(id));
        }

        let count = root
            .get("Count")
            .and_then(NbtTag::as_i64)
            .map_or(1, |v| v as i8);

        let mut components = ItemComponents::default();

        if let Some(comp) = root.get("components").and_then(NbtTag::as_compound) {
            if let Some(custom) = comp.get("minecraft:custom_data") {
                components.custom_data = Some(custom.clone());
            }
            if let Some(profile) = comp.get("minecraft:profile") {
                components.profile = parse_profile(profile);
            }
            if let Some(dyed) = comp.get("minecraft:dyed_color") {
                components.dyed_color = parse_dyed_color(dyed);
            }
            if let Some(damage) = comp.get("minecraft:damage") {
                components.damage = damage.as_i64().map(|v| v as i32);
            }
        }

        // Legacy 1.8.9 form: tag.ExtraAttributes.id lifts into custom_data.id.
        if components.custom_data.is_none() {
            if let Some(extra) = root
                .get("tag")
                .and_then(|t| t.get("ExtraAttributes"))
                .and_then(NbtTag::as_compound)
            {
                let mut lifted = extra.clone();
                if let Some(extra_id) = extra.get("id") {
                    lifted.insert("id".to_string(), extra_id.clone());
                }
                components.custom_data = Some(NbtTag::Compound(lifted));
            }
        }

        Ok(Self {
            id,
            count,
            components,
        })
    }
}

fn parse_profile(tag: &NbtTag) -> Option<ProfileComponent> {
    let map = tag.as_compound()?;
    let id = map.get("id").and_then(NbtTag::as_str).map(str::to_string);
    let properties = map
        .get("properties")
        .and_then(|t| match t {
            NbtTag::List(items) => Some(items),
            _ => None,
        })
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    let m = item.as_compound()?;
                    Some(ProfileProperty {
                        name: m.get("name")?.as_str()?.to_string(),
                        value: m.get("value")?.as_str()?.to_string(),
                        signature: m.get("signature").and_then(NbtTag::as_str).map(str::to_string),
                    })
                })
                .collect()
        })
        .unwrap_or_default();
    Some(ProfileComponent { id, properties })
}

fn parse_dyed_color(tag: &NbtTag) -> Option<DyedColorComponent> {
    let map = tag.as_compound()?;
    let rgb = map.get("rgb")?.as_i64()? as i32;
    let show_in_tooltip = map
        .get("show_in_tooltip")
        .and_then(NbtTag::as_i64)
        .map(|v| v != 0)
        .unwrap_or(true);
    Some(DyedColorComponent {
        rgb,
        show_in_tooltip,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compound(pairs: Vec<(&str, NbtTag)>) -> NbtTag {
        NbtTag::Compound(pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
    }

    #[test]
    fn parses_basic_item() {
        let root = compound(vec![
            ("id", NbtTag::String("minecraft:stone".to_string())),
            ("Count", NbtTag::Byte(1)),
        ]);
        let stack = ItemStack::from_nbt(&root).unwrap();
        assert_eq!(stack.id, "minecraft:stone");
        assert_eq!(stack.count, 1);
    }

    #[test]
    fn lifts_legacy_extra_attributes() {
        let root = compound(vec![
            ("id", NbtTag::String("minecraft:skull".to_string())),
            (
                "tag",
                compound(vec![(
                    "ExtraAttributes",
                    compound(vec![("id", NbtTag::String("HYPERION".to_string()))]),
                )]),
            ),
        ]);
        let stack = ItemStack::from_nbt(&root).unwrap();
        let custom = stack.components.custom_data.unwrap();
        assert_eq!(custom.get("id").unwrap().as_str(), Some("HYPERION"));
    }

    #[test]
    fn rejects_empty_id() {
        let root = compound(vec![("id", NbtTag::String(String::new()))]);
        assert!(ItemStack::from_nbt(&root).is_err());
    }

    #[test]
    fn rejects_malformed_ids() {
        for bad in ["a:b:c", ":stone", "nonamespace"] {
            let root = compound(vec![("id", NbtTag::String(bad.to_string()))]);
            assert!(
                matches!(ItemStack::from_nbt(&root), Err(crate::error::RenderError::InvalidItemId(_))),
                "expected {bad:?} to be rejected as an invalid item id"
            );
        }
    }
}

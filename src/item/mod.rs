//! Item Registry / Model Selector (spec §4.4).
//!
//! Maps an item id plus item metadata to a concrete model path, optionally
//! through a selector tree. Grounded on the pack's `nmsr-aas` model
//! resolver (`model-resolver-mod.rs`, other_examples), which resolves a
//! render request's entry + context down to a concrete model variant the
//! same way: a small, explicit, depth-first decision structure rather than
//! a generic rule engine.

use rustc_hash::FxHashMap;

use crate::nbt::ItemComponents;
use crate::options::View;

/// A single predicate a selector branch tests against item data.
#[derive(Debug, Clone)]
pub enum Predicate {
    /// `components.minecraft:custom_data.<key> == value` (string compare).
    CustomDataEquals { key: String, value: String },
    /// `components.minecraft:damage` falls within `[min, max]` inclusive.
    DamageRange { min: i32, max: i32 },
    /// `components.minecraft:profile` is present.
    HasProfile,
    /// A face's declared tint index falls within `[min, max]` inclusive —
    /// consulted against the options-level tint index hint, since the
    /// selector runs before mesh construction and has no face to inspect
    /// yet.
    TintIndexRange { min: i32, max: i32 },
}

impl Predicate {
    fn matches(&self, ctx: &ItemModelContext, consulted: &mut Vec<String>) -> bool {
        match self {
            Predicate::CustomDataEquals { key, value } => {
                consulted.push(format!("custom_data.{key}"));
                ctx.item_data
                    .custom_data
                    .as_ref()
                    .and_then(|cd| cd.get(key))
                    .and_then(|v| v.as_str())
                    == Some(value.as_str())
            }
            Predicate::DamageRange { min, max } => {
                consulted.push("damage".to_string());
                ctx.item_data
                    .damage
                    .is_some_and(|d| d >= *min && d <= *max)
            }
            Predicate::HasProfile => {
                consulted.push("profile".to_string());
                ctx.item_data.profile.is_some()
            }
            Predicate::TintIndexRange { min, max } => {
                consulted.push("tint_index_hint".to_string());
                ctx.tint_index_hint().is_some_and(|t| t >= *min && t <= *max)
            }
        }
    }
}

/// A selector tree node: a leaf model path, or a branch that tests a
/// predicate and recurses into one of two children. Evaluation is
/// depth-first; the first leaf reached wins (spec §4.4).
#[derive(Debug, Clone)]
pub enum SelectorNode {
    Leaf(String),
    Branch {
        predicate: Predicate,
        matched: Box<SelectorNode>,
        otherwise: Box<SelectorNode>,
    },
}

impl SelectorNode {
    #[must_use]
    pub fn leaf(model_path: impl Into<String>) -> Self {
        SelectorNode::Leaf(model_path.into())
    }

    #[must_use]
    pub fn branch(predicate: Predicate, matched: SelectorNode, otherwise: SelectorNode) -> Self {
        SelectorNode::Branch {
            predicate,
            matched: Box::new(matched),
            otherwise: Box::new(otherwise),
        }
    }

    fn evaluate(&self, ctx: &ItemModelContext, consulted: &mut Vec<String>) -> String {
        match self {
            SelectorNode::Leaf(path) => path.clone(),
            SelectorNode::Branch {
                predicate,
                matched,
                otherwise,
            } => {
                if predicate.matches(ctx, consulted) {
                    matched.evaluate(ctx, consulted)
                } else {
                    otherwise.evaluate(ctx, consulted)
                }
            }
        }
    }
}

/// Per-render context a selector evaluates against (spec §4.4).
pub struct ItemModelContext<'a> {
    pub item_data: &'a ItemComponents,
    pub rendering_context: View,
}

impl<'a> ItemModelContext<'a> {
    /// Minecraft's `tintindex` predicate tests a *face's* tint index, which
    /// does not exist yet at selector-evaluation time (selection runs
    /// before mesh construction); this is always `None` until a future
    /// caller threads a concrete hint through.
    fn tint_index_hint(&self) -> Option<i32> {
        None
    }
}

/// The result of a model-path lookup, including which item-data fields were
/// actually consulted (spec §4.9: only consulted fields enter the
/// fingerprint's `customdata` segment).
pub struct SelectedModel {
    pub model_path: String,
    pub consulted_keys: Vec<String>,
    pub used_default: bool,
}

/// Default-model-path-plus-selector registry for item ids.
#[derive(Default)]
pub struct ItemRegistry {
    defaults: FxHashMap<String, String>,
    selectors: FxHashMap<String, SelectorNode>,
}

impl ItemRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an explicit default model path for `item_id`, overriding
    /// the `item/<name>` convention (used for block items, whose default is
    /// `block/<name>`).
    pub fn register_default(&mut self, item_id: &str, model_path: &str) {
        self.defaults.insert(item_id.to_string(), model_path.to_string());
    }

    pub fn register_selector(&mut self, item_id: &str, selector: SelectorNode) {
        self.selectors.insert(item_id.to_string(), selector);
    }

    /// Resolves `item_id` to a model path under `ctx` (spec §4.4).
    #[must_use]
    pub fn resolve(&self, item_id: &str, ctx: &ItemModelContext) -> SelectedModel {
        let default_path = self.default_model_path(item_id);

        let Some(selector) = self.selectors.get(item_id) else {
            return SelectedModel {
                model_path: default_path,
                consulted_keys: Vec::new(),
                used_default: true,
            };
        };

        let mut consulted = Vec::new();
        let model_path = selector.evaluate(ctx, &mut consulted);
        SelectedModel {
            model_path,
            consulted_keys: consulted,
            used_default: false,
        }
    }

    fn default_model_path(&self, item_id: &str) -> String {
        if let Some(explicit) = self.defaults.get(item_id) {
            return explicit.clone();
        }
        match item_id.split_once(':') {
            Some((ns, name)) => format!("{ns}:item/{name}"),
            None => format!("minecraft:item/{item_id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(components: &ItemComponents) -> ItemModelContext<'_> {
        ItemModelContext {
            item_data: components,
            rendering_context: View::Gui,
        }
    }

    #[test]
    fn falls_back_to_default_item_path() {
        let registry = ItemRegistry::new();
        let components = ItemComponents::default();
        let selected = registry.resolve("minecraft:diamond_sword", &ctx(&components));
        assert_eq!(selected.model_path, "minecraft:item/diamond_sword");
        assert!(selected.used_default);
    }

    #[test]
    fn explicit_default_overrides_convention() {
        let mut registry = ItemRegistry::new();
        registry.register_default("minecraft:stone", "minecraft:block/stone");
        let components = ItemComponents::default();
        let selected = registry.resolve("minecraft:stone", &ctx(&components));
        assert_eq!(selected.model_path, "minecraft:block/stone");
    }

    #[test]
    fn selector_picks_first_matching_leaf() {
        let mut registry = ItemRegistry::new();
        registry.register_selector(
            "minecraft:player_head",
            SelectorNode::branch(
                Predicate::HasProfile,
                SelectorNode::leaf("minecraft:item/player_head_profile"),
                SelectorNode::leaf("minecraft:item/player_head"),
            ),
        );
        let mut components = ItemComponents::default();
        let selected = registry.resolve("minecraft:player_head", &ctx(&components));
        assert_eq!(selected.model_path, "minecraft:item/player_head");
        assert_eq!(selected.consulted_keys, vec!["profile".to_string()]);

        components.profile = Some(crate::nbt::ProfileComponent::default());
        let selected = registry.resolve("minecraft:player_head", &ctx(&components));
        assert_eq!(selected.model_path, "minecraft:item/player_head_profile");
    }
}

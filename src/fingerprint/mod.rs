//! Resource Fingerprinter (spec §4.9).
//!
//! Builds a canonical string identifying a render request — the item id,
//! resolved model path, the sorted set of resource ids a render actually
//! touched, any tint values applied, the consulted-fields subset of the
//! item's customdata, and the active pack stack's identity — and hashes it
//! to a stable resource id. Grounded on the teacher's asset-cache key
//! construction (`panxinmiao-myth/src/assets/storage.rs`'s content-hash
//! keys), extended here from "hash of file bytes" to "hash of a render
//! request's identity".

use sha1::{Digest, Sha1};

use crate::nbt::{ItemComponents, NbtTag};
use crate::registry::AssetNamespaceRegistry;

/// Length, in hex characters, of the truncated SHA-1 prefix used for
/// `pack_stack_hash`. The full digest would make fixture strings in tests
/// and logs unreadably long for a value whose only job is cheap equality
/// comparison; 12 hex chars (48 bits) is far beyond the collision risk any
/// render session's pack count could realistically hit.
const PACK_STACK_HASH_LEN: usize = 12;

fn sha1_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(bytes);
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

/// Hashes the active pack stack's identity: `<pack_id>:<pack_version>`
/// pairs, in priority order, joined by `|`. The empty (vanilla-only) stack
/// hashes to the literal sentinel `"vanilla"` rather than the hash of an
/// empty string, so it reads legibly in logs and test fixtures. A pack id
/// with no known version (never registered) is treated as version `"0"`.
#[must_use]
pub fn pack_stack_hash(registry: &AssetNamespaceRegistry, pack_stack: &[String]) -> String {
    if pack_stack.is_empty() {
        return "vanilla".to_string();
    }
    let joined = pack_stack
        .iter()
        .map(|id| format!("{id}:{}", registry.pack_version(id).unwrap_or("0")))
        .collect::<Vec<_>>()
        .join("|");
    let digest = sha1_hex(joined.as_bytes());
    digest[..PACK_STACK_HASH_LEN.min(digest.len())].to_string()
}

/// Builds the sorted-key JSON object of item-data fields a selector
/// actually consulted (spec §4.9: fields never looked at must not affect
/// the fingerprint, so two items differing only in an unconsulted field
/// fingerprint identically). `serde_json::Map`'s default `BTreeMap`
/// backing keeps keys sorted without any extra work here.
#[must_use]
pub fn customdata_json(item_data: &ItemComponents, consulted_keys: &[String]) -> serde_json::Value {
    let mut map = serde_json::Map::new();
    for key in consulted_keys {
        let value = if let Some(sub_key) = key.strip_prefix("custom_data.") {
            item_data
                .custom_data
                .as_ref()
                .and_then(NbtTag::as_compound)
                .and_then(|cd| cd.get(sub_key))
                .and_then(|tag| serde_json::to_value(tag).ok())
        } else {
            match key.as_str() {
                "damage" => item_data.damage.map(serde_json::Value::from),
                "profile" => Some(serde_json::Value::Bool(item_data.profile.is_some())),
                "tint_index_hint" => None,
                _ => None,
            }
        };
        if let Some(value) = value {
            map.insert(key.clone(), value);
        }
    }
    serde_json::Value::Object(map)
}

/// One tint layer's fingerprint contribution: a layer index and the
/// resolved RGB it was tinted with, rendered as `layer<N>:rrggbb`.
#[derive(Debug, Clone, Copy)]
pub struct TintEntry {
    pub layer: u32,
    pub rgb: [u8; 3],
}

fn tints_segment(tints: &[TintEntry]) -> String {
    let mut sorted: Vec<&TintEntry> = tints.iter().collect();
    sorted.sort_by_key(|t| t.layer);
    sorted
        .iter()
        .map(|t| format!("layer{}:{:02x}{:02x}{:02x}", t.layer, t.rgb[0], t.rgb[1], t.rgb[2]))
        .collect::<Vec<_>>()
        .join(",")
}

fn tex_segment(resource_ids: &[String]) -> String {
    let mut sorted = resource_ids.to_vec();
    sorted.sort();
    sorted.join(",")
}

/// The canonical, human-legible string a fingerprint hash is computed over
/// (spec §4.9's exact grammar):
/// `"<item_id>|model=<model_path>|tex=<sorted_resource_ids>|tints=<layerN:hex,...>|customdata=<stable_json>|pack=<pack_stack_hash>"`.
#[must_use]
pub fn canonical_string(
    item_id: &str,
    model_path: &str,
    resource_ids: &[String],
    tints: &[TintEntry],
    customdata: &serde_json::Value,
    pack_stack_hash: &str,
) -> String {
    format!(
        "{item_id}|model={model_path}|tex={}|tints={}|customdata={customdata}|pack={pack_stack_hash}",
        tex_segment(resource_ids),
        tints_segment(tints),
    )
}

/// Computes the stable resource id for one render request: the full SHA-1
/// hex digest of [`canonical_string`]'s output.
#[must_use]
pub fn compute_resource_id(
    item_id: &str,
    model_path: &str,
    resource_ids: &[String],
    tints: &[TintEntry],
    customdata: &serde_json::Value,
    pack_stack_hash: &str,
) -> String {
    sha1_hex(canonical_string(item_id, model_path, resource_ids, tints, customdata, pack_stack_hash).as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::register_pack;

    fn tempdir() -> std::path::PathBuf {
        static COUNTER: std::sync::atomic::AtomicU32 = std::sync::atomic::AtomicU32::new(0);
        let n = COUNTER.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        let dir = std::env::temp_dir().join(format!("mcrender-fp-test-{}-{}", std::process::id(), n));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn vanilla_only_stack_hashes_to_sentinel() {
        let registry = AssetNamespaceRegistry::new();
        assert_eq!(pack_stack_hash(&registry, &[]), "vanilla");
    }

    #[test]
    fn pack_stack_hash_depends_on_order() {
        let tmp = tempdir();
        std::fs::create_dir_all(tmp.join("assets/minecraft/textures")).unwrap();
        std::fs::write(tmp.join("meta.json"), r#"{"id":"a","version":"1"}"#).unwrap();
        let tmp2 = tempdir();
        std::fs::create_dir_all(tmp2.join("assets/minecraft/textures")).unwrap();
        std::fs::write(tmp2.join("meta.json"), r#"{"id":"b","version":"1"}"#).unwrap();

        let mut registry = AssetNamespaceRegistry::new();
        register_pack(&mut registry, &tmp).unwrap();
        register_pack(&mut registry, &tmp2).unwrap();

        let forward = pack_stack_hash(&registry, &["a".to_string(), "b".to_string()]);
        let backward = pack_stack_hash(&registry, &["b".to_string(), "a".to_string()]);
        assert_ne!(forward, backward);
        assert_eq!(forward.len(), 12);
    }

    #[test]
    fn unregistered_pack_with_no_override_leaves_resource_id_only_pack_segment_changed() {
        // An extra pack with no matching overrides for this subject should
        // change `pack_stack_hash` but nothing else about the canonical
        // string (spec §8 testable property 4).
        let customdata = serde_json::json!({});
        let a = canonical_string("minecraft:item/diamond_sword", "minecraft:item/diamond_sword", &[], &[], &customdata, "vanilla");
        let b = canonical_string("minecraft:item/diamond_sword", "minecraft:item/diamond_sword", &[], &[], &customdata, "deadbeefcafe");
        let a_no_pack = a.rsplit_once("|pack=").unwrap().0;
        let b_no_pack = b.rsplit_once("|pack=").unwrap().0;
        assert_eq!(a_no_pack, b_no_pack);
        assert_ne!(a, b);
    }

    #[test]
    fn unconsulted_fields_do_not_affect_customdata() {
        let mut data = ItemComponents::default();
        data.damage = Some(5);
        let with_damage_consulted = customdata_json(&data, &["damage".to_string()]);
        let without = customdata_json(&data, &[]);
        assert_ne!(with_damage_consulted, without);
        assert_eq!(without, serde_json::json!({}));
    }

    #[test]
    fn customdata_keys_are_sorted() {
        let data = ItemComponents::default();
        let value = customdata_json(&data, &["profile".to_string(), "damage".to_string()]);
        let rendered = value.to_string();
        assert!(rendered.find("damage").unwrap() < rendered.find("profile").unwrap());
    }

    #[test]
    fn tex_segment_is_sorted_regardless_of_input_order() {
        let ids = vec!["minecraft:item/b".to_string(), "minecraft:item/a".to_string()];
        assert_eq!(tex_segment(&ids), "minecraft:item/a,minecraft:item/b");
    }

    #[test]
    fn tints_segment_orders_by_layer() {
        let tints = [
            TintEntry { layer: 1, rgb: [0, 255, 0] },
            TintEntry { layer: 0, rgb: [255, 0, 0] },
        ];
        assert_eq!(tints_segment(&tints), "layer0:ff0000,layer1:00ff00");
    }

    #[test]
    fn same_inputs_produce_same_resource_id() {
        let customdata = serde_json::json!({});
        let a = compute_resource_id("minecraft:item/diamond_sword", "minecraft:item/diamond_sword", &[], &[], &customdata, "vanilla");
        let b = compute_resource_id("minecraft:item/diamond_sword", "minecraft:item/diamond_sword", &[], &[], &customdata, "vanilla");
        assert_eq!(a, b);
    }
}

//! JSON payload codec for the item slot.
//!
//! Wire shape: `[{"key": 1700000000000, "text": "Buy milk", "complete": false}]`.
//! A literal `null` payload decodes to an empty list.

use crate::model::item::{Item, ItemKey};
use log::warn;
use std::collections::HashSet;

/// Serializes the canonical sequence.
pub fn encode(items: &[Item]) -> Result<String, serde_json::Error> {
    serde_json::to_string(items)
}

/// Parses a slot payload into a key-unique item sequence.
///
/// Later duplicates of an already seen key are dropped and `editing` is
/// reset, since no edit survives a restart.
pub fn decode(payload: &str) -> Result<Vec<Item>, serde_json::Error> {
    let items: Option<Vec<Item>> = serde_json::from_str(payload)?;
    let mut items = dedupe_keys(items.unwrap_or_default());
    for item in &mut items {
        item.editing = false;
    }
    Ok(items)
}

fn dedupe_keys(items: Vec<Item>) -> Vec<Item> {
    let mut seen: HashSet<ItemKey> = HashSet::with_capacity(items.len());
    let total = items.len();
    let unique: Vec<Item> = items
        .into_iter()
        .filter(|item| seen.insert(item.key))
        .collect();
    if unique.len() != total {
        warn!(
            "event=payload_dedupe module=persist status=recovered dropped={}",
            total - unique.len()
        );
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::{decode, encode};
    use crate::model::item::{Item, ItemKey};

    #[test]
    fn encode_omits_editing_flag() {
        let mut item = Item::new(ItemKey(7), "Buy milk");
        item.editing = true;
        let json: serde_json::Value = serde_json::from_str(&encode(&[item]).unwrap()).unwrap();
        assert_eq!(
            json,
            serde_json::json!([{ "key": 7, "text": "Buy milk", "complete": false }])
        );
    }

    #[test]
    fn decode_accepts_original_payload_with_editing_field() {
        let items =
            decode(r#"[{"key":1,"text":"a","complete":true,"editing":true}]"#).unwrap();
        assert_eq!(items.len(), 1);
        assert!(items[0].complete);
        assert!(!items[0].editing);
    }

    #[test]
    fn decode_null_is_empty() {
        assert!(decode("null").unwrap().is_empty());
    }

    #[test]
    fn decode_drops_duplicate_keys_keeping_first() {
        let items = decode(
            r#"[{"key":1,"text":"first","complete":false},{"key":1,"text":"second","complete":true}]"#,
        )
        .unwrap();
        assert_eq!(items, vec![Item::new(ItemKey(1), "first")]);
    }

    #[test]
    fn decode_rejects_wrong_shape() {
        assert!(decode(r#"{"items":[]}"#).is_err());
        assert!(decode(r#"[{"key":"x","text":"a","complete":false}]"#).is_err());
        assert!(decode("not json").is_err());
    }
}

use serde_json::{Map, Value};

use crate::blocks::{Block, BlockContent, BlockType};

/// Bumped whenever normalization or seed layout changes, since either one
/// changes every generated ID.
pub const FINGERPRINT_VERSION: u32 = 1;

/// Content keys that only describe presentation and never affect identity.
const UI_ONLY_KEYS: &[&str] = &["open", "collapsed", "marks", "decorations", "width", "height"];

/// Where a block sits, for positional tie-breaking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    /// Byte length of the whole document.
    pub doc_len: usize,
    /// Index among siblings, when the seed should carry it.
    pub sibling_index: Option<usize>,
}

/// Normalized identity inputs of one block.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    pub version: u32,
    pub block_type: BlockType,
    pub normalized_content: String,
    pub span_len: usize,
    /// `start / doc_len` in thousandths.
    pub relative_position: u32,
    pub sibling_index: Option<usize>,
}

impl Fingerprint {
    pub fn of(block: &Block, position: Position) -> Self {
        let relative_position = if position.doc_len == 0 {
            0
        } else {
            let ratio = block.source_range.start as f64 / position.doc_len as f64;
            (ratio * 1000.0).round() as u32
        };
        Self {
            version: FINGERPRINT_VERSION,
            block_type: block.block_type(),
            normalized_content: normalize_content(&block.content),
            span_len: block.source_range.len(),
            relative_position,
            sibling_index: position.sibling_index,
        }
    }

    /// `{type}:{content}:{len}:{pos}[:{index}]`
    pub fn seed(&self) -> String {
        let position = f64::from(self.relative_position) / 1000.0;
        let mut seed = format!(
            "{}:{}:{}:{}",
            self.block_type, self.normalized_content, self.span_len, position
        );
        if let Some(index) = self.sibling_index {
            seed.push(':');
            seed.push_str(&index.to_string());
        }
        seed
    }

    pub fn hash(&self) -> u32 {
        djb2(self.seed().as_bytes())
    }

    /// Generated ID, `{type}-{hash:08x}`.
    pub fn id(&self) -> String {
        format!("{}-{:08x}", self.block_type, self.hash())
    }

    /// Position-free key used to carry IDs across re-parses.
    pub fn content_key(&self) -> String {
        format!(
            "v{}:{}:{}",
            self.version, self.block_type, self.normalized_content
        )
    }
}

/// 32-bit djb2: `h = h * 33 + byte`, seeded with 5381.
pub fn djb2(bytes: &[u8]) -> u32 {
    bytes.iter().fold(5381u32, |h, &b| {
        h.wrapping_mul(33).wrapping_add(u32::from(b))
    })
}

/// Canonical JSON of a block's content with UI-only fields, empty values and
/// whitespace differences removed. Keys come out sorted.
pub fn normalize_content(content: &BlockContent) -> String {
    let value = match serde_json::to_value(content) {
        Ok(Value::Object(mut tagged)) => tagged.remove("content").unwrap_or(Value::Null),
        Ok(other) => other,
        Err(err) => {
            log::warn!("could not normalize {} content: {err}", content.block_type());
            Value::Null
        }
    };
    match normalize_value(value) {
        Some(value) => value.to_string(),
        None => String::new(),
    }
}

fn normalize_value(value: Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::String(s) => {
            let collapsed = s.split_whitespace().collect::<Vec<_>>().join(" ");
            (!collapsed.is_empty()).then_some(Value::String(collapsed))
        }
        Value::Array(items) => {
            // positions inside arrays (table cells) are significant, so
            // emptied elements stay as empty strings
            let items: Vec<Value> = items
                .into_iter()
                .map(|v| normalize_value(v).unwrap_or_else(|| Value::String(String::new())))
                .collect();
            (!items.is_empty()).then_some(Value::Array(items))
        }
        Value::Object(map) => {
            let map: Map<String, Value> = map
                .into_iter()
                .filter(|(key, _)| !UI_ONLY_KEYS.contains(&key.as_str()))
                .filter_map(|(key, v)| normalize_value(v).map(|v| (key, v)))
                .collect();
            (!map.is_empty()).then_some(Value::Object(map))
        }
        other => Some(other),
    }
}

//! The entity lump: a CP-1252, NUL-terminated text blob of `{`/`}`-delimited
//! blocks of `"key" "value"` lines. Grounded in `Q2BSP.py`'s
//! `__get_entities`/`save_entities` pair.

use crate::error::{Error, Result, Warning};

/// An ordered, first-wins key/value record. Order is preserved because it's
/// what a human reads in the saved text and what the original keeps via
/// dict insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Entity {
    pub pairs: Vec<(String, String)>,
}

impl Entity {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    pub fn classname(&self) -> Option<&str> {
        self.get("classname")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityLump {
    pub worldspawn: Entity,
    pub entities: Vec<Entity>,
}

/// One piece of a worldspawn `message` value: either a run of printable
/// ASCII (code points 32..127) or a single byte outside that range, kept as
/// its raw CP-1252 byte rather than assumed decodable text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageToken {
    Text(String),
    Byte(u8),
}

fn is_printable_ascii(c: char) -> bool {
    let code = c as u32;
    code > 31 && code < 128
}

/// Splits a message string into tokens if it contains any non-printable
/// character; returns `None` if the whole string is already plain printable
/// ASCII and needs no special representation.
///
/// `Entity.pairs` keeps `message` as a plain CP-1252-decoded `String`; this
/// is the ordered-list view of it, derived on demand rather than stored, so
/// callers that care about the ASCII-run/raw-byte split use this instead of
/// walking the string themselves. `message_from_tokens` is its exact
/// inverse, so nothing is lost by not storing the list form directly.
pub fn message_tokens(message: &str) -> Option<Vec<MessageToken>> {
    if message.chars().all(is_printable_ascii) {
        return None;
    }
    let mut tokens = Vec::new();
    let mut current = String::new();
    for c in message.chars() {
        if is_printable_ascii(c) {
            current.push(c);
        } else {
            if !current.is_empty() {
                tokens.push(MessageToken::Text(std::mem::take(&mut current)));
            }
            let (bytes, _, _) = encoding_rs::WINDOWS_1252.encode(&c.to_string());
            tokens.push(MessageToken::Byte(bytes[0]));
        }
    }
    if !current.is_empty() {
        tokens.push(MessageToken::Text(current));
    }
    Some(tokens)
}

pub fn message_from_tokens(tokens: &[MessageToken]) -> String {
    let mut out = String::new();
    for t in tokens {
        match t {
            MessageToken::Text(s) => out.push_str(s),
            MessageToken::Byte(b) => {
                let (text, _, _) = encoding_rs::WINDOWS_1252.decode(&[*b]);
                out.push_str(&text);
            }
        }
    }
    out
}

/// Finds every `"..."` quoted run on a line, in order, the same way the
/// original's `"([^"]*)"` regex would.
fn quoted_strings(line: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut in_quotes = false;
    let mut current = String::new();
    for c in line.chars() {
        if c == '"' {
            if in_quotes {
                out.push(std::mem::take(&mut current));
            } else {
                current.clear();
            }
            in_quotes = !in_quotes;
        } else if in_quotes {
            current.push(c);
        }
    }
    out
}

pub fn decode_entities(bytes: &[u8], warnings: &mut Vec<Warning>) -> Result<EntityLump> {
    let (text, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
    let trimmed = text.trim_end_matches('\0');

    let mut entities: Vec<Entity> = Vec::new();
    let mut current = Entity::default();

    for (idx, raw_line) in trimmed.split('\n').enumerate() {
        if raw_line.ends_with('}') {
            entities.push(std::mem::take(&mut current));
            continue;
        }
        if raw_line == "{" {
            continue;
        }

        let owned;
        let line: &str = if raw_line.starts_with('{') {
            owned = raw_line.replace('{', "");
            &owned
        } else {
            raw_line
        };

        if line.trim().is_empty() {
            continue;
        }

        let fields = quoted_strings(line);
        if fields.len() < 2 {
            return Err(Error::BadEntitySyntax { line: idx });
        }
        let key = fields[0].clone();
        let value = fields[1].clone();
        if current.get(&key).is_some() {
            let w = Warning::DuplicateEntityKey { key: key.clone(), block: entities.len() };
            w.log();
            warnings.push(w);
        } else {
            current.pairs.push((key, value));
        }
    }

    let worldspawn_pos = entities.iter().position(|e| e.classname() == Some("worldspawn"));
    let worldspawn = match worldspawn_pos {
        Some(pos) => entities.remove(pos),
        None => {
            let w = Warning::MissingWorldspawn;
            w.log();
            warnings.push(w);
            Entity::default()
        }
    };

    Ok(EntityLump { worldspawn, entities })
}

pub fn encode_entities(lump: &EntityLump) -> Vec<u8> {
    let mut lines = Vec::with_capacity(2 + lump.entities.len() * 4);
    lines.push("{".to_string());
    for (k, v) in &lump.worldspawn.pairs {
        lines.push(format!("\"{k}\" \"{v}\""));
    }
    lines.push("}".to_string());
    for entity in &lump.entities {
        lines.push("{".to_string());
        for (k, v) in &entity.pairs {
            lines.push(format!("\"{k}\" \"{v}\""));
        }
        lines.push("}".to_string());
    }

    let mut text = lines.join("\n");
    text.push('\n');
    text.push('\0');
    let (bytes, _, _) = encoding_rs::WINDOWS_1252.encode(&text);
    bytes.into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn entity_block(name: &str, pairs: &[(&str, &str)]) -> String {
        let mut s = String::from("{\n");
        s.push_str(&format!("\"classname\" \"{name}\"\n"));
        for (k, v) in pairs {
            s.push_str(&format!("\"{k}\" \"{v}\"\n"));
        }
        s.push('}');
        s
    }

    #[test]
    fn splits_worldspawn_from_other_entities() {
        let text = format!(
            "{}\n{}\n\0",
            entity_block("worldspawn", &[("message", "hello")]),
            entity_block("info_player_start", &[("origin", "0 0 0")])
        );
        let mut warnings = Vec::new();
        let lump = decode_entities(text.as_bytes(), &mut warnings).unwrap();
        assert!(warnings.is_empty());
        assert_eq!(lump.worldspawn.get("message"), Some("hello"));
        assert_eq!(lump.entities.len(), 1);
        assert_eq!(lump.entities[0].classname(), Some("info_player_start"));
    }

    #[test]
    fn missing_worldspawn_warns() {
        let text = format!("{}\n\0", entity_block("info_player_start", &[]));
        let mut warnings = Vec::new();
        let lump = decode_entities(text.as_bytes(), &mut warnings).unwrap();
        assert!(matches!(warnings[0], Warning::MissingWorldspawn));
        assert!(lump.worldspawn.pairs.is_empty());
    }

    #[test]
    fn duplicate_key_keeps_first_and_warns() {
        let text = "{\n\"classname\" \"worldspawn\"\n\"sounds\" \"1\"\n\"sounds\" \"2\"\n}\n\0";
        let mut warnings = Vec::new();
        let lump = decode_entities(text.as_bytes(), &mut warnings).unwrap();
        assert_eq!(lump.worldspawn.get("sounds"), Some("1"));
        assert!(matches!(warnings[0], Warning::DuplicateEntityKey { .. }));
    }

    #[test]
    fn brace_glued_to_following_key_is_still_parsed() {
        let text = "{\"classname\" \"worldspawn\"\n}\n\0";
        let mut warnings = Vec::new();
        let lump = decode_entities(text.as_bytes(), &mut warnings).unwrap();
        assert_eq!(lump.worldspawn.classname(), Some("worldspawn"));
    }

    #[test]
    fn message_with_color_byte_tokenizes_around_it() {
        let msg = "Base\u{0007}Camp";
        let tokens = message_tokens(msg).unwrap();
        assert_eq!(
            tokens,
            vec![
                MessageToken::Text("Base".to_string()),
                MessageToken::Byte(7),
                MessageToken::Text("Camp".to_string()),
            ]
        );
        assert_eq!(message_from_tokens(&tokens), msg);
    }

    #[test]
    fn plain_message_needs_no_tokens() {
        assert_eq!(message_tokens("Unit One"), None);
    }

    #[test]
    fn round_trips_through_encode_decode() {
        let text = format!(
            "{}\n{}\n\0",
            entity_block("worldspawn", &[("sky", "unit1_")]),
            entity_block("light", &[("origin", "1 2 3")])
        );
        let mut warnings = Vec::new();
        let lump = decode_entities(text.as_bytes(), &mut warnings).unwrap();
        let re_encoded = encode_entities(&lump);
        let mut warnings2 = Vec::new();
        let lump2 = decode_entities(&re_encoded, &mut warnings2).unwrap();
        assert_eq!(lump, lump2);
    }
}

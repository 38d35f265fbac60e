//! ToUnicode CMap parsing.
//!
//! A `/ToUnicode` stream maps the character codes of a font to Unicode text.
//! Its PostScript-like syntax is read with the content stream tokenizer:
//! `beginbfchar`/`endbfchar` blocks hold single mappings and
//! `beginbfrange`/`endbfrange` blocks hold contiguous ranges.

use std::collections::HashMap;

use crate::error::BackendError;
use crate::tokenizer::{Operand, tokenize};

/// Most codes a single `bfrange` entry may cover; larger ranges are skipped.
const MAX_RANGE_CODES: u32 = 0x1_0000;

/// A parsed ToUnicode CMap.
#[derive(Debug, Clone, Default)]
pub struct ToUnicode {
    mappings: HashMap<u32, String>,
    /// Bytes per character code, from the codespace or the first mapping.
    code_len: Option<usize>,
}

impl ToUnicode {
    /// Parse the decoded bytes of a `/ToUnicode` stream.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Interpreter`] if the stream is not tokenizable.
    pub fn parse(data: &[u8]) -> Result<Self, BackendError> {
        let mut cmap = ToUnicode {
            mappings: HashMap::new(),
            code_len: None,
        };

        for op in tokenize(data)? {
            match op.name.as_str() {
                "endcodespacerange" => {
                    if let Some(low) = op.operands.first().and_then(Operand::as_bytes) {
                        cmap.code_len = Some(low.len().clamp(1, 4));
                    }
                }
                "endbfchar" => {
                    for pair in op.operands.chunks_exact(2) {
                        if let (Some(src), Some(dst)) = (pair[0].as_bytes(), pair[1].as_bytes()) {
                            cmap.note_code_len(src);
                            cmap.mappings.insert(code_of(src), utf16be(dst));
                        }
                    }
                }
                "endbfrange" => {
                    for triple in op.operands.chunks_exact(3) {
                        let (Some(lo), Some(hi)) = (triple[0].as_bytes(), triple[1].as_bytes())
                        else {
                            continue;
                        };
                        cmap.note_code_len(lo);
                        cmap.insert_range(code_of(lo), code_of(hi), &triple[2]);
                    }
                }
                _ => {}
            }
        }

        Ok(cmap)
    }

    fn note_code_len(&mut self, src: &[u8]) {
        if self.code_len.is_none() {
            self.code_len = Some(src.len().clamp(1, 4));
        }
    }

    fn insert_range(&mut self, lo: u32, hi: u32, dst: &Operand) {
        if hi < lo {
            return;
        }
        if hi - lo >= MAX_RANGE_CODES {
            tracing::warn!(lo, hi, "bfrange larger than {MAX_RANGE_CODES} codes skipped");
            return;
        }
        match dst {
            Operand::String(start) => {
                let mut units = utf16_units(start);
                let Some(last) = units.len().checked_sub(1) else {
                    return;
                };
                let base = units[last];
                for (offset, code) in (lo..=hi).enumerate() {
                    units[last] = base.wrapping_add(offset as u16);
                    self.mappings.insert(code, String::from_utf16_lossy(&units));
                }
            }
            Operand::Array(items) => {
                for (code, item) in (lo..=hi).zip(items) {
                    if let Some(bytes) = item.as_bytes() {
                        self.mappings.insert(code, utf16be(bytes));
                    }
                }
            }
            _ => {}
        }
    }

    /// Bytes per character code, if the CMap declares or implies one.
    pub fn code_len(&self) -> Option<usize> {
        self.code_len
    }

    /// Unicode text for a character code.
    pub fn lookup(&self, code: u32) -> Option<&str> {
        self.mappings.get(&code).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }
}

/// Big-endian integer value of a code's bytes.
pub(crate) fn code_of(bytes: &[u8]) -> u32 {
    bytes
        .iter()
        .take(4)
        .fold(0u32, |acc, &b| (acc << 8) | u32::from(b))
}

fn utf16_units(bytes: &[u8]) -> Vec<u16> {
    if bytes.len() == 1 {
        return vec![u16::from(bytes[0])];
    }
    bytes
        .chunks(2)
        .map(|pair| match pair {
            [hi, lo] => u16::from_be_bytes([*hi, *lo]),
            [single] => u16::from(*single),
            _ => 0,
        })
        .collect()
}

fn utf16be(bytes: &[u8]) -> String {
    String::from_utf16_lossy(&utf16_units(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    const IDENTITY_HEADER: &str = "/CIDInit /ProcSet findresource begin\n\
        12 dict begin\nbegincmap\n\
        /CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n\
        /CMapName /Adobe-Identity-UCS def\n/CMapType 2 def\n";

    fn parse(body: &str) -> ToUnicode {
        ToUnicode::parse(format!("{IDENTITY_HEADER}{body}\nendcmap").as_bytes()).unwrap()
    }

    #[test]
    fn bfchar_mappings() {
        let cmap = parse(
            "1 begincodespacerange <0000> <FFFF> endcodespacerange\n\
             2 beginbfchar\n<0003> <0041>\n<0004> <00660069>\nendbfchar",
        );
        assert_eq!(cmap.code_len(), Some(2));
        assert_eq!(cmap.lookup(3), Some("A"));
        assert_eq!(cmap.lookup(4), Some("fi"));
        assert_eq!(cmap.lookup(5), None);
        assert_eq!(cmap.len(), 2);
    }

    #[test]
    fn bfrange_with_start_value() {
        let cmap = parse("1 beginbfrange\n<20> <22> <0041>\nendbfrange");
        assert_eq!(cmap.code_len(), Some(1));
        assert_eq!(cmap.lookup(0x20), Some("A"));
        assert_eq!(cmap.lookup(0x21), Some("B"));
        assert_eq!(cmap.lookup(0x22), Some("C"));
        assert_eq!(cmap.lookup(0x23), None);
    }

    #[test]
    fn bfrange_with_array() {
        let cmap = parse("1 beginbfrange\n<0010> <0011> [<0058> <00590059>]\nendbfrange");
        assert_eq!(cmap.lookup(0x10), Some("X"));
        assert_eq!(cmap.lookup(0x11), Some("YY"));
    }

    #[test]
    fn surrogate_pairs_decode() {
        let cmap = parse("1 beginbfchar\n<01> <D83DDE00>\nendbfchar");
        assert_eq!(cmap.lookup(1), Some("\u{1F600}"));
    }

    #[test]
    fn inverted_range_is_ignored() {
        let cmap = parse("1 beginbfrange\n<05> <01> <0041>\nendbfrange");
        assert!(cmap.is_empty());
    }

    #[test]
    fn empty_cmap_has_no_code_length() {
        let cmap = ToUnicode::parse(b"").unwrap();
        assert!(cmap.is_empty());
        assert_eq!(cmap.code_len(), None);
    }

    #[test]
    fn oversized_range_is_skipped() {
        let cmap = parse(
            "2 beginbfrange
<000000> <FFFFFF> <0041>
<01> <02> <0061>
endbfrange",
        );
        assert_eq!(cmap.len(), 2);
        assert_eq!(cmap.lookup(0x01), Some("a"));
        assert_eq!(cmap.lookup(0x000041), None);
    }

    #[test]
    fn full_two_byte_range_is_kept() {
        let cmap = parse("1 beginbfrange
<0000> <FFFF> <0000>
endbfrange");
        assert_eq!(cmap.len(), 0x1_0000);
        assert_eq!(cmap.lookup(0x0041), Some("A"));
    }

    #[test]
    fn code_of_is_big_endian() {
        assert_eq!(code_of(&[0x01, 0x02]), 0x0102);
        assert_eq!(code_of(&[0x41]), 0x41);
        assert_eq!(code_of(&[]), 0);
    }
}

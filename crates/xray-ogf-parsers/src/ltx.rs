// xray-ogf-parsers/src/ltx.rs
//! Section-oriented text configuration (`.ltx`)
//!
//! ```text
//! ; comment
//! [section]            ← section header
//! key = value          ← ordered key/value line
//! bare_key             ← key with an empty value
//! [derived]:section    ← inherits the lines of `section`
//! ```
//!
//! Section names and keys are matched case-insensitively.

use std::collections::HashMap;

use crate::traits::{ConfigReader, ParseError, ParseResult};

#[derive(Debug, Clone, Default)]
struct Section {
    name: String,
    lines: Vec<(String, String)>,
}

/// Parsed text configuration file
#[derive(Debug, Clone, Default)]
pub struct LtxFile {
    sections: Vec<Section>,
    index: HashMap<String, usize>,
}

impl LtxFile {
    /// Parse configuration text
    pub fn parse(text: &str) -> ParseResult<Self> {
        let mut file = LtxFile::default();
        let mut current: Option<usize> = None;

        for (line_no, raw) in text.lines().enumerate() {
            let line = strip_comment(raw).trim();
            if line.is_empty() {
                continue;
            }

            if let Some(rest) = line.strip_prefix('[') {
                let Some(close) = rest.find(']') else {
                    return Err(ParseError::InvalidStructure(format!(
                        "line {}: unterminated section header",
                        line_no + 1
                    )));
                };
                let name = rest[..close].trim().to_string();
                let bases: Vec<&str> = rest[close + 1..]
                    .trim()
                    .strip_prefix(':')
                    .map(|b| b.split(',').map(str::trim).filter(|b| !b.is_empty()).collect())
                    .unwrap_or_default();

                let mut section = Section { name: name.clone(), lines: Vec::new() };
                for base in bases {
                    let base_section = file
                        .section(base)
                        .ok_or_else(|| ParseError::unresolved("section", base, format!("[{name}]")))?;
                    section.lines.extend(base_section.lines.iter().cloned());
                }

                let key = name.to_ascii_lowercase();
                if let Some(&existing) = file.index.get(&key) {
                    // Re-opened sections append to the earlier definition.
                    file.sections[existing].lines.extend(section.lines);
                    current = Some(existing);
                } else {
                    file.index.insert(key, file.sections.len());
                    current = Some(file.sections.len());
                    file.sections.push(section);
                }
                continue;
            }

            let Some(section_idx) = current else {
                return Err(ParseError::InvalidStructure(format!(
                    "line {}: key outside of any section",
                    line_no + 1
                )));
            };

            let (key, value) = match line.split_once('=') {
                Some((k, v)) => (k.trim(), unquote(v.trim())),
                None => (line, ""),
            };
            let lines = &mut file.sections[section_idx].lines;
            match lines.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(key)) {
                Some(existing) => existing.1 = value.to_string(),
                None => lines.push((key.to_string(), value.to_string())),
            }
        }

        Ok(file)
    }

    /// Parse configuration bytes, tolerating non-UTF-8 content
    pub fn parse_bytes(data: &[u8]) -> ParseResult<Self> {
        Self::parse(&String::from_utf8_lossy(data))
    }

    fn section(&self, name: &str) -> Option<&Section> {
        self.index
            .get(&name.to_ascii_lowercase())
            .map(|&i| &self.sections[i])
    }

    /// Section names in file order
    pub fn section_names(&self) -> impl Iterator<Item = &str> {
        self.sections.iter().map(|s| s.name.as_str())
    }
}

fn strip_comment(line: &str) -> &str {
    match line.find(';') {
        Some(pos) => &line[..pos],
        None => line,
    }
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

impl ConfigReader for LtxFile {
    fn section_exists(&self, section: &str) -> bool {
        self.section(section).is_some()
    }

    fn line_count(&self, section: &str) -> usize {
        self.section(section).map_or(0, |s| s.lines.len())
    }

    fn read_line(&self, section: &str, index: usize) -> Option<(&str, &str)> {
        self.section(section)?
            .lines
            .get(index)
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    fn string(&self, section: &str, key: &str) -> Option<&str> {
        self.section(section)?
            .lines
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }
}

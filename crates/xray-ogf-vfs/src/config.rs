//! File-system alias configuration
//!
//! Aliases map `$name$` prefixes to folders. A configuration is read either
//! from JSON or from `fsgame.ltx`-style text:
//!
//! ```text
//! $fs_root$    = false | false | c:\games\stalker
//! $game_data$  = true  | false | $fs_root$ | gamedata\
//! $game_meshes$= true  | false | $game_data$ | meshes\
//! ```
//!
//! Fields are `recurse | notif | root | add`; `root` is a literal path or
//! another alias, `add` is appended to it.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::mount::{VfsError, VfsResult};
use crate::path::{join_paths, split_alias};

/// One alias definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasDef {
    pub name: String,
    /// Literal folder or `$alias$`
    pub root: String,
    #[serde(default)]
    pub add: String,
    #[serde(default)]
    pub recurse: bool,
    #[serde(default)]
    pub notify: bool,
}

/// Alias table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FsConfig {
    /// Folder that relative literal roots are resolved against
    #[serde(default)]
    pub base: Option<PathBuf>,
    pub aliases: Vec<AliasDef>,
}

impl FsConfig {
    pub fn from_json(text: &str) -> VfsResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> VfsResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse `fsgame.ltx` text
    pub fn from_fsgame(text: &str) -> VfsResult<Self> {
        let mut aliases = Vec::new();
        for (line_no, raw) in text.lines().enumerate() {
            let line = raw.split(';').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            let invalid = |message: &str| VfsError::InvalidConfig {
                line: line_no + 1,
                message: message.to_string(),
            };

            let (key, value) = line.split_once('=').ok_or_else(|| invalid("expected '$alias$ = ...'"))?;
            let name = match split_alias(key.trim()) {
                Some((name, "")) => name,
                _ => return Err(invalid("alias name must be written as $name$")),
            };

            let fields: Vec<&str> = value.split('|').map(str::trim).collect();
            if fields.len() < 3 {
                return Err(invalid("expected recurse | notif | root [| add]"));
            }
            aliases.push(AliasDef {
                name: name.to_string(),
                root: fields[2].to_string(),
                add: fields.get(3).copied().unwrap_or("").to_string(),
                recurse: parse_flag(fields[0]),
                notify: parse_flag(fields[1]),
            });
        }
        Ok(Self { base: None, aliases })
    }

    /// Load from a file; `.json` selects JSON, anything else `fsgame.ltx` text
    pub fn load(path: &Path) -> VfsResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let mut config = if path.extension().is_some_and(|e| e.eq_ignore_ascii_case("json")) {
            Self::from_json(&text)?
        } else {
            Self::from_fsgame(&text)?
        };
        if config.base.is_none() {
            config.base = path.parent().map(Path::to_path_buf);
        }
        Ok(config)
    }

    pub fn alias(&self, name: &str) -> Option<&AliasDef> {
        self.aliases.iter().find(|a| a.name.eq_ignore_ascii_case(name))
    }

    /// Folder of every alias, following chains of alias roots
    pub fn resolve_all(&self) -> VfsResult<HashMap<String, PathBuf>> {
        let mut resolved = HashMap::with_capacity(self.aliases.len());
        for alias in &self.aliases {
            let path = self.resolve_alias(&alias.name)?;
            resolved.insert(alias.name.to_ascii_lowercase(), path);
        }
        Ok(resolved)
    }

    /// Folder of one alias
    pub fn resolve_alias(&self, name: &str) -> VfsResult<PathBuf> {
        let mut chain = Vec::new();
        let folder = self.resolve_chain(name, &mut chain)?;
        let path = PathBuf::from(folder);
        match &self.base {
            Some(base) if path.is_relative() => Ok(base.join(path)),
            _ => Ok(path),
        }
    }

    fn resolve_chain(&self, name: &str, chain: &mut Vec<String>) -> VfsResult<String> {
        let key = name.to_ascii_lowercase();
        if chain.contains(&key) {
            return Err(VfsError::AliasCycle(name.to_string()));
        }
        chain.push(key);

        let alias = self.alias(name).ok_or_else(|| VfsError::UnknownAlias(name.to_string()))?;
        let root = match split_alias(&alias.root) {
            Some((parent, rest)) => join_paths(&self.resolve_chain(parent, chain)?, rest),
            None => alias.root.clone(),
        };
        Ok(join_paths(&root, &alias.add))
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.to_ascii_lowercase().as_str(), "true" | "yes" | "on" | "1")
}

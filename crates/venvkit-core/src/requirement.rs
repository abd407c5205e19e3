use std::fmt::{Display, Formatter};
use std::str::FromStr;

use thiserror::Error;

/// Version comparison operator of a requirement declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparator {
    ArbitraryEq,
    Eq,
    NotEq,
    Compatible,
    GreaterEq,
    LessEq,
    Greater,
    Less,
}

impl Comparator {
    // Longest operators first so `===` is not read as `==`.
    const ALL: [Comparator; 8] = [
        Self::ArbitraryEq,
        Self::Eq,
        Self::NotEq,
        Self::Compatible,
        Self::GreaterEq,
        Self::LessEq,
        Self::Greater,
        Self::Less,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ArbitraryEq => "===",
            Self::Eq => "==",
            Self::NotEq => "!=",
            Self::Compatible => "~=",
            Self::GreaterEq => ">=",
            Self::LessEq => "<=",
            Self::Greater => ">",
            Self::Less => "<",
        }
    }

    fn strip_from(text: &str) -> Option<(Self, &str)> {
        Self::ALL
            .iter()
            .find_map(|op| text.strip_prefix(op.as_str()).map(|rest| (*op, rest)))
    }
}

/// A single package declaration read from a requirements file line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequirementDecl {
    pub name: String,
    pub extras: Vec<String>,
    pub comparator: Option<Comparator>,
    pub version: Option<String>,
}

impl RequirementDecl {
    /// Parses a requirements file line, returning `None` for blank lines,
    /// comments, installer options and URL or path references.
    pub fn from_line(line: &str) -> Option<Self> {
        Self::from_str(line).ok()
    }

    pub fn normalized_name(&self) -> String {
        normalize_name(&self.name)
    }

    /// Whether this declaration names the package `name`.
    pub fn names(&self, name: &str) -> bool {
        self.normalized_name() == normalize_name(name)
    }
}

impl Display for RequirementDecl {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.extras.is_empty() {
            write!(f, "[{}]", self.extras.join(","))?;
        }
        if let (Some(op), Some(version)) = (self.comparator, &self.version) {
            write!(f, "{}{}", op.as_str(), version)?;
        }
        Ok(())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RequirementParseError {
    #[error("not a requirement declaration: '{0}'")]
    NotADeclaration(String),
    #[error("unterminated extras list in '{0}'")]
    UnterminatedExtras(String),
}

impl FromStr for RequirementDecl {
    type Err = RequirementParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let text = strip_comment(value).trim();
        let not_decl = || RequirementParseError::NotADeclaration(value.trim().to_string());

        if !text.starts_with(|c: char| c.is_ascii_alphanumeric()) {
            return Err(not_decl());
        }

        let name_end = text
            .find(|c: char| !is_name_char(c))
            .unwrap_or(text.len());
        let (name, mut rest) = text.split_at(name_end);

        match rest.chars().next() {
            None => {}
            Some(c) if c.is_whitespace() || "[=!~<>;@(,".contains(c) => {}
            Some(_) => return Err(not_decl()),
        }

        let mut extras = Vec::new();
        if let Some(inner) = rest.strip_prefix('[') {
            let close = inner
                .find(']')
                .ok_or_else(|| RequirementParseError::UnterminatedExtras(value.trim().to_string()))?;
            extras = inner[..close]
                .split(',')
                .map(str::trim)
                .filter(|extra| !extra.is_empty())
                .map(ToOwned::to_owned)
                .collect();
            rest = &inner[close + 1..];
        }

        let rest = rest.trim_start();
        let (comparator, version) = match Comparator::strip_from(rest) {
            Some((op, tail)) => {
                let spec = tail.split(';').next().unwrap_or_default().trim();
                (Some(op), Some(spec.to_string()))
            }
            None => (None, None),
        };

        Ok(Self {
            name: name.to_string(),
            extras,
            comparator,
            version,
        })
    }
}

/// Normalises a distribution name: lowercase, runs of `-`, `_` and `.`
/// collapsed to a single `-`.
pub fn normalize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_separator = false;
    for c in name.trim().chars() {
        if matches!(c, '-' | '_' | '.') {
            if !in_separator {
                out.push('-');
            }
            in_separator = true;
        } else {
            out.extend(c.to_lowercase());
            in_separator = false;
        }
    }
    out
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')
}

// A `#` starts a comment at line start or after whitespace.
fn strip_comment(line: &str) -> &str {
    let mut previous = None;
    for (idx, c) in line.char_indices() {
        if c == '#' && previous.map_or(true, char::is_whitespace) {
            return &line[..idx];
        }
        previous = Some(c);
    }
    line
}

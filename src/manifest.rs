//! Steam app manifest (`appmanifest_*.acf`) reading.
//!
//! The manifest is Valve's KeyValues text format: quoted keys followed by
//! either a quoted value or a `{ ... }` block. Only `AppState.buildid` and
//! `AppState.UserConfig.BetaKey` are interpreted; everywhere else the file
//! is an opaque blob copied byte-for-byte.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use crate::error::{ProfileError, Result};

/// Build descriptor read from an app manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    pub build_id: String,
    /// `None` means the stable branch
    pub beta_key: Option<String>,
}

impl Manifest {
    pub fn parse(text: &str, path: &Path) -> Result<Self> {
        let root = parse_keyvalues(text).map_err(|e| ProfileError::ManifestParse {
            path: path.to_path_buf(),
            line: e.line,
            message: e.message,
        })?;

        let app_state = root.get_obj("AppState");
        let build_id = app_state
            .and_then(|a| a.get_str("buildid"))
            .unwrap_or("Unknown Build")
            .to_string();
        let beta_key = app_state
            .and_then(|a| a.get_obj("UserConfig"))
            .and_then(|u| u.get_str("BetaKey"))
            .filter(|k| !k.is_empty())
            .map(str::to_string);

        Ok(Self { build_id, beta_key })
    }

    /// "unstable (Build: 123)" or "Stable (Build: 123)"
    pub fn label(&self) -> String {
        match &self.beta_key {
            Some(key) => format!("{} (Build: {})", key, self.build_id),
            None => format!("Stable (Build: {})", self.build_id),
        }
    }
}

/// Result of looking for a manifest on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestStatus {
    Found(Manifest),
    NotFound,
}

impl ManifestStatus {
    pub fn label(&self) -> String {
        match self {
            Self::Found(m) => m.label(),
            Self::NotFound => "Not Found".to_string(),
        }
    }

    pub fn manifest(&self) -> Option<&Manifest> {
        match self {
            Self::Found(m) => Some(m),
            Self::NotFound => None,
        }
    }
}

/// Read and parse a manifest. A missing file is a status, not an error.
///
/// # Arguments
/// * `path` - The live `appmanifest_*.acf` or a profile's stored copy
///
/// # Errors
/// Returns [`ProfileError::Io`] when the file exists but cannot be read,
/// and [`ProfileError::ManifestParse`] when it is not valid KeyValues.
pub fn read_manifest(path: &Path) -> Result<ManifestStatus> {
    let bytes = match fs::read(path) {
        Ok(b) => b,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(ManifestStatus::NotFound),
        Err(e) => {
            return Err(ProfileError::io(
                format!("Failed to read manifest {}", path.display()),
                e,
            ));
        }
    };
    let text = String::from_utf8_lossy(&bytes);
    Manifest::parse(&text, path).map(ManifestStatus::Found)
}

// -----------------------------------------------------------------------------
// KeyValues
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KvValue {
    Str(String),
    Obj(KvObject),
}

/// An ordered KeyValues block. Duplicate keys are kept; lookups return
/// the first match and ignore ASCII case, as Steam does.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KvObject {
    pub entries: Vec<(String, KvValue)>,
}

impl KvObject {
    pub fn get(&self, key: &str) -> Option<&KvValue> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        match self.get(key)? {
            KvValue::Str(s) => Some(s),
            KvValue::Obj(_) => None,
        }
    }

    pub fn get_obj(&self, key: &str) -> Option<&KvObject> {
        match self.get(key)? {
            KvValue::Obj(o) => Some(o),
            KvValue::Str(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KvSyntaxError {
    pub line: usize,
    pub message: String,
}

#[derive(Debug, PartialEq, Eq)]
enum Token {
    Str(String),
    Open,
    Close,
}

struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: usize,
}

impl<'a> Lexer<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            chars: text.chars().peekable(),
            line: 1,
        }
    }

    fn error(&self, message: impl Into<String>) -> KvSyntaxError {
        KvSyntaxError {
            line: self.line,
            message: message.into(),
        }
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    /// Skip whitespace, `//` comments and `[$PLATFORM]` conditionals
    fn skip_trivia(&mut self) {
        loop {
            match self.chars.peek() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('/') => {
                    let mut ahead = self.chars.clone();
                    ahead.next();
                    if ahead.peek() != Some(&'/') {
                        return;
                    }
                    while let Some(c) = self.bump() {
                        if c == '\n' {
                            break;
                        }
                    }
                }
                Some('[') => {
                    while let Some(c) = self.bump() {
                        if c == ']' {
                            break;
                        }
                    }
                }
                _ => return,
            }
        }
    }

    fn next_token(&mut self) -> Result<Option<Token>, KvSyntaxError> {
        self.skip_trivia();
        let Some(&c) = self.chars.peek() else {
            return Ok(None);
        };

        match c {
            '{' => {
                self.bump();
                Ok(Some(Token::Open))
            }
            '}' => {
                self.bump();
                Ok(Some(Token::Close))
            }
            '"' => {
                self.bump();
                self.quoted().map(|s| Some(Token::Str(s)))
            }
            _ => Ok(Some(Token::Str(self.bare()))),
        }
    }

    fn quoted(&mut self) -> Result<String, KvSyntaxError> {
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error("unterminated string")),
                Some('"') => return Ok(out),
                Some('\\') => match self.bump() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some(other) => out.push(other),
                    None => return Err(self.error("unterminated string")),
                },
                Some(c) => out.push(c),
            }
        }
    }

    fn bare(&mut self) -> String {
        let mut out = String::new();
        while let Some(&c) = self.chars.peek() {
            if c.is_whitespace() || matches!(c, '{' | '}' | '"') {
                break;
            }
            out.push(c);
            self.bump();
        }
        out
    }
}

/// Parse KeyValues text into its top-level block
pub fn parse_keyvalues(text: &str) -> Result<KvObject, KvSyntaxError> {
    let mut lexer = Lexer::new(text.trim_start_matches('\u{feff}'));
    parse_block(&mut lexer, false)
}

fn parse_block(lexer: &mut Lexer<'_>, nested: bool) -> Result<KvObject, KvSyntaxError> {
    let mut obj = KvObject::default();
    loop {
        let key = match lexer.next_token()? {
            Some(Token::Str(k)) => k,
            Some(Token::Close) if nested => return Ok(obj),
            Some(Token::Close) => return Err(lexer.error("unexpected '}'")),
            Some(Token::Open) => return Err(lexer.error("expected key, found '{'")),
            None if nested => return Err(lexer.error("missing closing '}'")),
            None => return Ok(obj),
        };

        let value = match lexer.next_token()? {
            Some(Token::Str(v)) => KvValue::Str(v),
            Some(Token::Open) => KvValue::Obj(parse_block(lexer, true)?),
            Some(Token::Close) | None => {
                return Err(lexer.error(format!("missing value for key '{}'", key)));
            }
        };
        obj.entries.push((key, value));
    }
}

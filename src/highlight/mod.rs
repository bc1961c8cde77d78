//! Syntax highlighting for fenced code blocks.
//!
//! The renderer talks to a [`Highlighter`], keyed by the fence's language
//! tag. The default implementation uses syntect's Sublime Text grammars and
//! maps each scope to a coarse [`TokenClass`]; colors are applied later from
//! the theme palette, so highlighting output does not depend on the theme.

use std::fmt;
use std::sync::OnceLock;

use serde::Serialize;
use syntect::parsing::{ParseState, Scope, ScopeStack, SyntaxSet};
use syntect::util::LinesWithEndings;
use thiserror::Error;

use crate::error::EditorError;

/// Coarse token category; each maps to one style tag in the stylesheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TokenClass {
    Plain,
    Keyword,
    String,
    Number,
    Constant,
    Comment,
    Function,
    Type,
    Variable,
    Operator,
    Punctuation,
}

impl TokenClass {
    pub const ALL: [Self; 11] = [
        Self::Plain,
        Self::Keyword,
        Self::String,
        Self::Number,
        Self::Constant,
        Self::Comment,
        Self::Function,
        Self::Type,
        Self::Variable,
        Self::Operator,
        Self::Punctuation,
    ];

    /// CSS class used for this token class in exported HTML.
    pub const fn style_tag(self) -> &'static str {
        match self {
            Self::Plain => "tok-plain",
            Self::Keyword => "tok-keyword",
            Self::String => "tok-string",
            Self::Number => "tok-number",
            Self::Constant => "tok-constant",
            Self::Comment => "tok-comment",
            Self::Function => "tok-function",
            Self::Type => "tok-type",
            Self::Variable => "tok-variable",
            Self::Operator => "tok-operator",
            Self::Punctuation => "tok-punctuation",
        }
    }
}

/// A run of code text sharing one token class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    pub text: String,
    pub class: TokenClass,
}

impl Token {
    pub fn new(text: impl Into<String>, class: TokenClass) -> Self {
        Self {
            text: text.into(),
            class,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HighlightError {
    #[error("no grammar for language tag {0:?}")]
    UnsupportedLanguage(String),
    #[error("failed to tokenize {language} code: {reason}")]
    Tokenize { language: String, reason: String },
}

impl From<HighlightError> for EditorError {
    fn from(err: HighlightError) -> Self {
        match err {
            HighlightError::UnsupportedLanguage(tag) => Self::UnsupportedLanguageTag(tag),
            HighlightError::Tokenize { language, .. } => Self::UnsupportedLanguageTag(language),
        }
    }
}

/// Turns a code block's raw text into lines of classified tokens.
pub trait Highlighter: Send + Sync + fmt::Debug {
    /// Highlight `code` written in `language`.
    ///
    /// # Errors
    /// [`HighlightError::UnsupportedLanguage`] when no grammar matches the
    /// tag; callers fall back to [`plain_lines`].
    fn highlight(&self, language: &str, code: &str) -> Result<Vec<Vec<Token>>, HighlightError>;
}

/// Split `code` into unclassified lines.
pub fn plain_lines(code: &str) -> Vec<Vec<Token>> {
    code.lines()
        .map(|line| {
            if line.is_empty() {
                Vec::new()
            } else {
                vec![Token::new(line, TokenClass::Plain)]
            }
        })
        .collect()
}

/// Highlighter that knows no languages; every block renders plain.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainHighlighter;

impl Highlighter for PlainHighlighter {
    fn highlight(&self, language: &str, _code: &str) -> Result<Vec<Vec<Token>>, HighlightError> {
        Err(HighlightError::UnsupportedLanguage(language.to_string()))
    }
}

/// Highlighter backed by syntect's bundled grammars.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyntectHighlighter;

impl SyntectHighlighter {
    /// Whether a grammar exists for `language`.
    pub fn supports(language: &str) -> bool {
        find_syntax(syntax_set(), language).is_some()
    }
}

impl Highlighter for SyntectHighlighter {
    fn highlight(&self, language: &str, code: &str) -> Result<Vec<Vec<Token>>, HighlightError> {
        let _scope = crate::perf::scope("highlight.code_block");
        let syntax_set = syntax_set();
        let syntax = find_syntax(syntax_set, language)
            .ok_or_else(|| HighlightError::UnsupportedLanguage(language.to_string()))?;
        let tokenize_err = |reason: String| HighlightError::Tokenize {
            language: language.to_string(),
            reason,
        };

        let mut state = ParseState::new(syntax);
        let mut stack = ScopeStack::new();
        let mut lines = Vec::new();
        for line in LinesWithEndings::from(code) {
            let ops = state
                .parse_line(line, syntax_set)
                .map_err(|err| tokenize_err(format!("{err:?}")))?;
            let mut tokens = Vec::new();
            let mut last = 0;
            for (pos, op) in ops {
                let pos = pos.min(line.len());
                if pos > last {
                    push_token(&mut tokens, &line[last..pos], classify(stack.as_slice()));
                    last = pos;
                }
                stack
                    .apply(&op)
                    .map_err(|err| tokenize_err(format!("{err:?}")))?;
            }
            if last < line.len() {
                push_token(&mut tokens, &line[last..], classify(stack.as_slice()));
            }
            lines.push(tokens);
        }
        Ok(lines)
    }
}

fn push_token(tokens: &mut Vec<Token>, text: &str, class: TokenClass) {
    let text = text.trim_end_matches(['\n', '\r']);
    if !text.is_empty() {
        tokens.push(Token::new(text, class));
    }
}

fn find_syntax<'a>(
    syntax_set: &'a SyntaxSet,
    language: &str,
) -> Option<&'a syntect::parsing::SyntaxReference> {
    syntax_set
        .find_syntax_by_token(language)
        .or_else(|| syntax_set.find_syntax_by_name(language))
}

fn syntax_set() -> &'static SyntaxSet {
    static SYNTAX_SET: OnceLock<SyntaxSet> = OnceLock::new();
    SYNTAX_SET.get_or_init(|| {
        let _scope = crate::perf::scope("highlight.syntax_set.load_defaults");
        SyntaxSet::load_defaults_newlines()
    })
}

/// Class of the innermost scope that maps to something other than plain.
fn classify(stack: &[Scope]) -> TokenClass {
    stack
        .iter()
        .rev()
        .map(|scope| class_for_scope(&scope.build_string()))
        .find(|class| *class != TokenClass::Plain)
        .unwrap_or(TokenClass::Plain)
}

fn class_for_scope(scope: &str) -> TokenClass {
    const RULES: &[(&str, TokenClass)] = &[
        ("comment", TokenClass::Comment),
        ("string", TokenClass::String),
        ("constant.numeric", TokenClass::Number),
        ("constant", TokenClass::Constant),
        ("keyword.operator", TokenClass::Operator),
        ("storage.type", TokenClass::Type),
        ("keyword", TokenClass::Keyword),
        ("storage", TokenClass::Keyword),
        ("entity.name.function", TokenClass::Function),
        ("support.function", TokenClass::Function),
        ("variable.function", TokenClass::Function),
        ("entity.name", TokenClass::Type),
        ("support.type", TokenClass::Type),
        ("support.class", TokenClass::Type),
        ("variable", TokenClass::Variable),
        ("punctuation", TokenClass::Punctuation),
    ];
    RULES
        .iter()
        .find(|(prefix, _)| {
            scope == *prefix
                || scope
                    .strip_prefix(prefix)
                    .is_some_and(|rest| rest.starts_with('.'))
        })
        .map_or(TokenClass::Plain, |(_, class)| *class)
}

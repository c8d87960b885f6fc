// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stagepipe contributors

//! Expression parser
//!
//! Grammar, informally:
//!
//! ```text
//! pipeline := segment ( '|' segment )*
//! segment  := stage_type ( '--' name ( ('=' | ws) value )? )*
//! value    := bare word | '...' | "..."
//! ```
//!
//! Pipes and whitespace inside quotes are literal. Double-quoted text
//! understands `\"` and `\\`; single-quoted text is taken verbatim.

use crate::errors::{StagepipeError, StagepipeResult};
use crate::pipeline::{ConfigValue, Pipeline, StageDescriptor};

/// Parse an inline expression into a [`Pipeline`]
pub fn parse(expression: &str) -> StagepipeResult<Pipeline> {
    if expression.trim().is_empty() {
        return Err(StagepipeError::parse("expression is empty"));
    }

    let segments = split_segments(expression)?;
    let mut stages = Vec::with_capacity(segments.len());

    for (index, (offset, segment)) in segments.into_iter().enumerate() {
        let tokens = tokenize(segment, offset)?;
        stages.push(parse_segment(index, offset, tokens)?);
    }

    let name = pipeline_name(expression, &stages);
    tracing::debug!(pipeline = %name, stages = stages.len(), "parsed expression");

    Ok(Pipeline { name, stages })
}

/// Stable label: stage types plus a short content hash of the expression
fn pipeline_name(expression: &str, stages: &[StageDescriptor]) -> String {
    let types: Vec<&str> = stages.iter().map(|s| s.stage_type.as_str()).collect();
    let hash = blake3::hash(expression.trim().as_bytes()).to_hex().to_string();
    format!("{}#{}", types.join("|"), &hash[..8])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Quote {
    Single,
    Double,
}

/// Split on top-level `|`, returning each segment with its byte offset
fn split_segments(expression: &str) -> StagepipeResult<Vec<(usize, &str)>> {
    let mut segments = Vec::new();
    let mut quote: Option<(Quote, usize)> = None;
    let mut escaped = false;
    let mut start = 0;

    for (i, c) in expression.char_indices() {
        match quote {
            Some((Quote::Double, _)) if escaped => escaped = false,
            Some((Quote::Double, _)) if c == '\\' => escaped = true,
            Some((Quote::Double, _)) if c == '"' => quote = None,
            Some((Quote::Single, _)) if c == '\'' => quote = None,
            Some(_) => {}
            None => match c {
                '"' => quote = Some((Quote::Double, i)),
                '\'' => quote = Some((Quote::Single, i)),
                '|' => {
                    segments.push((start, &expression[start..i]));
                    start = i + 1;
                }
                _ => {}
            },
        }
    }

    if let Some((_, opened_at)) = quote {
        return Err(StagepipeError::parse_at(
            format!("unterminated quote starting at position {}", opened_at),
            opened_at,
        ));
    }

    segments.push((start, &expression[start..]));
    Ok(segments)
}

/// A whitespace-delimited word after quote removal
#[derive(Debug, Clone, PartialEq, Eq)]
struct Token {
    text: String,
    /// The first character came from inside quotes
    quoted_start: bool,
    offset: usize,
}

impl Token {
    fn is_flag(&self) -> bool {
        !self.quoted_start && self.text.starts_with("--")
    }
}

fn tokenize(segment: &str, base: usize) -> StagepipeResult<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut current: Option<Token> = None;
    let mut quote: Option<(Quote, usize)> = None;
    let mut chars = segment.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        let pos = base + i;

        match quote {
            Some((Quote::Single, _)) => {
                if c == '\'' {
                    quote = None;
                } else if let Some(tok) = current.as_mut() {
                    tok.text.push(c);
                }
            }
            Some((Quote::Double, _)) => match c {
                '"' => quote = None,
                '\\' => {
                    let next = chars.peek().map(|&(_, n)| n);
                    let literal = match next {
                        Some(n @ ('"' | '\\')) => {
                            chars.next();
                            n
                        }
                        _ => '\\',
                    };
                    if let Some(tok) = current.as_mut() {
                        tok.text.push(literal);
                    }
                }
                _ => {
                    if let Some(tok) = current.as_mut() {
                        tok.text.push(c);
                    }
                }
            },
            None => {
                if c.is_whitespace() {
                    if let Some(tok) = current.take() {
                        tokens.push(tok);
                    }
                    continue;
                }

                let starts_quote = match c {
                    '\'' => Some(Quote::Single),
                    '"' => Some(Quote::Double),
                    _ => None,
                };

                let tok = current.get_or_insert_with(|| Token {
                    text: String::new(),
                    quoted_start: starts_quote.is_some(),
                    offset: pos,
                });

                match starts_quote {
                    Some(q) => quote = Some((q, pos)),
                    None => tok.text.push(c),
                }
            }
        }
    }

    if let Some((_, opened_at)) = quote {
        return Err(StagepipeError::parse_at(
            format!("unterminated quote starting at position {}", opened_at),
            opened_at,
        ));
    }

    if let Some(tok) = current.take() {
        tokens.push(tok);
    }

    Ok(tokens)
}

fn is_valid_stage_type(s: &str) -> bool {
    !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

fn parse_segment(index: usize, offset: usize, tokens: Vec<Token>) -> StagepipeResult<StageDescriptor> {
    let mut tokens = tokens.into_iter().peekable();

    let head = match tokens.next() {
        Some(tok) if !tok.quoted_start && !tok.is_flag() => tok,
        Some(tok) => {
            return Err(StagepipeError::parse_at(
                format!("segment {} has no stage type", index),
                tok.offset,
            ))
        }
        None => {
            return Err(StagepipeError::parse_at(
                format!("segment {} has no stage type", index),
                offset,
            ))
        }
    };

    if !is_valid_stage_type(&head.text) {
        return Err(StagepipeError::parse_at(
            format!("invalid stage type '{}' in segment {}", head.text, index),
            head.offset,
        ));
    }

    let mut stage = StageDescriptor::new(head.text);

    while let Some(tok) = tokens.next() {
        if !tok.is_flag() {
            return Err(StagepipeError::parse_at(
                format!(
                    "unexpected argument '{}' for stage '{}' (options are written --name value)",
                    tok.text, stage.stage_type
                ),
                tok.offset,
            ));
        }

        let body = &tok.text[2..];
        let (name, inline_value) = match body.split_once('=') {
            Some((name, value)) => (name, Some(value.to_string())),
            None => (body, None),
        };

        if name.is_empty() {
            return Err(StagepipeError::parse_at(
                format!("empty option name in stage '{}'", stage.stage_type),
                tok.offset,
            ));
        }

        let value = match inline_value {
            Some(v) => ConfigValue::Text(v),
            None => match tokens.next_if(|next| !next.is_flag()) {
                Some(next) => ConfigValue::Text(next.text),
                None => ConfigValue::Flag(true),
            },
        };

        stage.config.insert(name, value);
    }

    Ok(stage)
}

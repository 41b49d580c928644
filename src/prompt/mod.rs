//! Prompt rendering
//!
//! Templates use handlebars syntax (`{{field}}`, `{{#each list}}`) plus a
//! `{{media url=field}}` helper that embeds media by reference. Templates are
//! plain values handed to every render call; the renderer holds only helpers
//! and settings.

use crate::error::WanderError;
use crate::Result;
use handlebars::{
    Context, Handlebars, Helper, HelperResult, Output, RenderContext, RenderError,
    RenderErrorReason,
};
use serde::{Deserialize, Serialize};

/// Reserved marker the media helper writes around a media reference.
/// `sanitize_field` strips it from user text, so only the helper can emit it.
const MEDIA_MARK: char = '\u{1e}';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptTemplate {
    pub name: &'static str,
    pub source: &'static str,
}

impl PromptTemplate {
    pub const fn new(name: &'static str, source: &'static str) -> Self {
        Self { name, source }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PromptPart {
    Text { text: String },
    Media { url: String },
}

/// A rendered instruction, possibly interleaving text and media references
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedPrompt {
    pub parts: Vec<PromptPart>,
}

impl RenderedPrompt {
    pub fn text<S: Into<String>>(text: S) -> Self {
        Self {
            parts: vec![PromptPart::Text { text: text.into() }],
        }
    }

    /// Concatenated text parts, media omitted
    pub fn text_content(&self) -> String {
        self.parts
            .iter()
            .filter_map(|part| match part {
                PromptPart::Text { text } => Some(text.as_str()),
                PromptPart::Media { .. } => None,
            })
            .collect()
    }

    pub fn media_urls(&self) -> Vec<&str> {
        self.parts
            .iter()
            .filter_map(|part| match part {
                PromptPart::Media { url } => Some(url.as_str()),
                PromptPart::Text { .. } => None,
            })
            .collect()
    }

    /// Split helper output on media markers
    fn from_rendered(rendered: &str) -> Self {
        let mut parts = Vec::new();
        for (i, chunk) in rendered.split(MEDIA_MARK).enumerate() {
            if i % 2 == 1 {
                parts.push(PromptPart::Media {
                    url: chunk.to_string(),
                });
            } else if !chunk.is_empty() {
                parts.push(PromptPart::Text {
                    text: chunk.to_string(),
                });
            }
        }
        Self { parts }
    }
}

/// Renders prompt templates against a serializable context
pub struct PromptRenderer {
    registry: Handlebars<'static>,
}

impl PromptRenderer {
    pub fn new() -> Self {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(true);
        registry.register_escape_fn(handlebars::no_escape);
        registry.register_helper("media", Box::new(media_helper));
        Self { registry }
    }

    pub fn render<C: Serialize>(&self, template: &PromptTemplate, context: &C) -> Result<RenderedPrompt> {
        let rendered = self
            .registry
            .render_template(template.source, context)
            .map_err(|e| {
                WanderError::Template(format!("failed to render '{}': {}", template.name, e))
            })?;

        Ok(RenderedPrompt::from_rendered(&rendered))
    }
}

impl Default for PromptRenderer {
    fn default() -> Self {
        Self::new()
    }
}

fn media_helper<'reg, 'rc>(
    h: &Helper<'rc>,
    _: &'reg Handlebars<'reg>,
    _: &'rc Context,
    _: &mut RenderContext<'reg, 'rc>,
    out: &mut dyn Output,
) -> HelperResult {
    let url = h
        .hash_get("url")
        .and_then(|v| v.value().as_str())
        .ok_or_else(|| {
            RenderError::from(RenderErrorReason::Other(
                "media helper requires a string 'url' argument".to_string(),
            ))
        })?;

    out.write(&format!("{MEDIA_MARK}{url}{MEDIA_MARK}"))?;
    Ok(())
}

/// Keep a free-text field on one line: whitespace runs (tabs and line
/// breaks included) collapse to one space, other control characters are dropped.
/// This protects template structure only; it is not injection hardening.
pub fn sanitize_field(value: &str) -> String {
    value
        .chars()
        .filter(|c| c.is_whitespace() || !c.is_control())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

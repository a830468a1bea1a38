//! Declarative block expansion
//!
//! Turns the configured block descriptors into wire blocks for one event.
//! Two modifiers compose on any descriptor, field, element, or option:
//!
//! - `range: <path>` expands the descriptor once per element of the list at
//!   that path. Each iteration sees a scope of the outer data overlaid with
//!   the element's fields (a non-mapping element binds as `Item`). A missing
//!   or non-list path yields zero expansions, silently.
//! - `condition: <expr>` keeps the descriptor only when the predicate
//!   holds against the current scope (`event` is the scope, so inside a
//!   range it refers to the iteration element). Evaluation *errors keep the
//!   block*: a broken condition must not silently drop notifications, which
//!   is the opposite of how route filters degrade.
//!
//! An unknown block type or malformed element aborts the whole message;
//! failures inside a single range iteration skip that iteration only.

use std::future::Future;
use std::pin::Pin;

use serde_json::{Map, Value};
use thiserror::Error;

use nev_event::value::{as_list, lookup};
use nev_event::Event;
use nev_expr::Program;
use nev_template::Engine;

use super::blocks::{ActionElement, Block, SelectOption, TextObject, MRKDWN, PLAIN_TEXT};

/// Errors from expanding configured blocks
#[derive(Debug, Error)]
pub enum BuildError {
    /// A block descriptor is not a mapping
    #[error("block must be a mapping")]
    InvalidBlock,

    /// A block descriptor has no `type`
    #[error("block type is required")]
    MissingBlockType,

    /// A block descriptor names a type the builder does not know
    #[error("unsupported block type: {0}")]
    UnsupportedBlockType(String),

    /// A text node is neither a string nor a `{type, text}` mapping
    #[error("invalid text configuration")]
    InvalidText,

    /// An actions element is not a mapping
    #[error("invalid element configuration")]
    InvalidElement,

    /// An actions element has no `type`
    #[error("element type is required")]
    MissingElementType,

    /// An actions element names a type the builder does not know
    #[error("unsupported element type: {0}")]
    UnsupportedElementType(String),

    /// A select option is not a mapping
    #[error("invalid option configuration")]
    InvalidOption,
}

/// Expands block descriptors against events
#[derive(Debug)]
pub struct BlockBuilder {
    engine: Engine,
}

impl BlockBuilder {
    /// Create a builder rendering through the given template engine
    pub fn new(engine: Engine) -> Self {
        Self { engine }
    }

    /// Expand all descriptors for one event, in declaration order
    ///
    /// # Errors
    ///
    /// Fails on the first unknown block type or malformed element; the sink
    /// surfaces this as a failed send for the whole message.
    pub async fn build(&self, descriptors: &[Value], event: &Event) -> Result<Vec<Block>, BuildError> {
        let scope = event.to_value();
        let mut blocks = Vec::new();
        for descriptor in descriptors {
            self.expand_block(descriptor, &scope, &mut blocks).await?;
        }
        Ok(blocks)
    }

    /// Expand one descriptor, appending zero or more blocks
    fn expand_block<'a>(
        &'a self,
        descriptor: &'a Value,
        scope: &'a Value,
        out: &'a mut Vec<Block>,
    ) -> Pin<Box<dyn Future<Output = Result<(), BuildError>> + Send + 'a>> {
        Box::pin(async move {
            let config = descriptor.as_object().ok_or(BuildError::InvalidBlock)?;

            if let Some(path) = range_path(config) {
                let Some(items) = resolve_range(scope, &path) else {
                    return Ok(()); // missing or non-list path: zero expansions
                };
                let template = Value::Object(without_range(config));
                for item in items {
                    let inner = item_scope(scope, item);
                    let mut expanded = Vec::new();
                    match self.expand_block(&template, &inner, &mut expanded).await {
                        Ok(()) => out.append(&mut expanded),
                        Err(error) => {
                            tracing::debug!(error = %error, "skipping failed range iteration");
                        }
                    }
                }
                return Ok(());
            }

            if !self.condition_holds(config, scope) {
                return Ok(());
            }

            let block_type = config
                .get("type")
                .and_then(Value::as_str)
                .ok_or(BuildError::MissingBlockType)?;

            let block = match block_type {
                "header" => self.build_header(config, scope).await?,
                "divider" => Block::Divider,
                "section" => self.build_section(config, scope).await?,
                "context" => self.build_context(config, scope).await?,
                "actions" => self.build_actions(config, scope).await?,
                "image" => self.build_image(config, scope).await?,
                other => return Err(BuildError::UnsupportedBlockType(other.to_string())),
            };

            out.push(block);
            Ok(())
        })
    }

    async fn build_header(
        &self,
        config: &Map<String, Value>,
        scope: &Value,
    ) -> Result<Block, BuildError> {
        let template = config
            .get("text")
            .and_then(Value::as_str)
            .ok_or(BuildError::InvalidText)?;
        let text = self.engine.render(template, scope).await;
        Ok(Block::Header {
            text: TextObject::plain(text),
        })
    }

    async fn build_section(
        &self,
        config: &Map<String, Value>,
        scope: &Value,
    ) -> Result<Block, BuildError> {
        let text = match config.get("text") {
            Some(node) => Some(self.parse_text(node, scope).await?),
            None => None,
        };

        let fields = match config.get("fields").and_then(Value::as_array) {
            Some(items) => self.expand_texts(items, scope).await?,
            None => Vec::new(),
        };

        Ok(Block::Section { text, fields })
    }

    async fn build_context(
        &self,
        config: &Map<String, Value>,
        scope: &Value,
    ) -> Result<Block, BuildError> {
        let elements = match config.get("elements").and_then(Value::as_array) {
            Some(items) => self.expand_texts(items, scope).await?,
            None => Vec::new(),
        };
        Ok(Block::Context { elements })
    }

    async fn build_actions(
        &self,
        config: &Map<String, Value>,
        scope: &Value,
    ) -> Result<Block, BuildError> {
        let elements = match config.get("elements").and_then(Value::as_array) {
            Some(items) => self.expand_elements(items, scope).await?,
            None => Vec::new(),
        };
        Ok(Block::Actions { elements })
    }

    async fn build_image(
        &self,
        config: &Map<String, Value>,
        scope: &Value,
    ) -> Result<Block, BuildError> {
        let image_url = self.render_str(config, "image_url", scope).await;
        let alt_text = self.render_str(config, "alt_text", scope).await;

        let title = match config.get("title").and_then(Value::as_str) {
            Some(template) => Some(TextObject::plain(self.engine.render(template, scope).await)),
            None => None,
        };

        Ok(Block::Image {
            image_url,
            alt_text,
            title,
            block_id: config
                .get("block_id")
                .and_then(Value::as_str)
                .map(str::to_string),
        })
    }

    /// Expand a list of text nodes, honoring per-item range and condition
    async fn expand_texts(
        &self,
        items: &[Value],
        scope: &Value,
    ) -> Result<Vec<TextObject>, BuildError> {
        let mut texts = Vec::new();

        for item in items {
            if let Some(config) = item.as_object() {
                if let Some(path) = range_path(config) {
                    let Some(elements) = resolve_range(scope, &path) else {
                        continue;
                    };
                    let template = without_range(config);
                    for element in elements {
                        let inner = item_scope(scope, element);
                        if !self.condition_holds(&template, &inner) {
                            continue;
                        }
                        match self.parse_text_map(&template, &inner).await {
                            Ok(text) => texts.push(text),
                            Err(error) => {
                                tracing::debug!(error = %error, "skipping failed range iteration");
                            }
                        }
                    }
                    continue;
                }

                if !self.condition_holds(config, scope) {
                    continue;
                }
            }

            texts.push(self.parse_text(item, scope).await?);
        }

        Ok(texts)
    }

    /// Expand actions elements, honoring per-item range and condition
    async fn expand_elements(
        &self,
        items: &[Value],
        scope: &Value,
    ) -> Result<Vec<ActionElement>, BuildError> {
        let mut elements = Vec::new();

        for item in items {
            let config = item.as_object().ok_or(BuildError::InvalidElement)?;

            if let Some(path) = range_path(config) {
                let Some(entries) = resolve_range(scope, &path) else {
                    continue;
                };
                let template = without_range(config);
                for entry in entries {
                    let inner = item_scope(scope, entry);
                    if !self.condition_holds(&template, &inner) {
                        continue;
                    }
                    match self.parse_element(&template, &inner).await {
                        Ok(element) => elements.push(element),
                        Err(error) => {
                            tracing::debug!(error = %error, "skipping failed range iteration");
                        }
                    }
                }
                continue;
            }

            if !self.condition_holds(config, scope) {
                continue;
            }

            elements.push(self.parse_element(config, scope).await?);
        }

        Ok(elements)
    }

    async fn parse_element(
        &self,
        config: &Map<String, Value>,
        scope: &Value,
    ) -> Result<ActionElement, BuildError> {
        let element_type = config
            .get("type")
            .and_then(Value::as_str)
            .ok_or(BuildError::MissingElementType)?;

        match element_type {
            "button" => {
                let text = self
                    .parse_text(config.get("text").ok_or(BuildError::InvalidText)?, scope)
                    .await?;
                Ok(ActionElement::Button {
                    text,
                    url: self.render_opt_str(config, "url", scope).await,
                    action_id: self.render_opt_str(config, "action_id", scope).await,
                    value: self.render_opt_str(config, "value", scope).await,
                })
            }
            "static_select" => {
                // A broken placeholder degrades to none rather than dropping
                // the whole menu
                let placeholder = match config.get("placeholder") {
                    Some(node) => self.parse_text(node, scope).await.ok(),
                    None => None,
                };

                let options = match config.get("options").and_then(Value::as_array) {
                    Some(items) => self.expand_options(items, scope).await?,
                    None => Vec::new(),
                };

                Ok(ActionElement::StaticSelect {
                    placeholder,
                    action_id: config
                        .get("action_id")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                    options,
                })
            }
            other => Err(BuildError::UnsupportedElementType(other.to_string())),
        }
    }

    /// Expand select options, honoring per-item range and condition
    async fn expand_options(
        &self,
        items: &[Value],
        scope: &Value,
    ) -> Result<Vec<SelectOption>, BuildError> {
        let mut options = Vec::new();

        for item in items {
            let config = item.as_object().ok_or(BuildError::InvalidOption)?;

            if let Some(path) = range_path(config) {
                let Some(entries) = resolve_range(scope, &path) else {
                    continue;
                };
                let template = without_range(config);
                for entry in entries {
                    let inner = item_scope(scope, entry);
                    if !self.condition_holds(&template, &inner) {
                        continue;
                    }
                    match self.parse_option(&template, &inner).await {
                        Ok(option) => options.push(option),
                        Err(error) => {
                            tracing::debug!(error = %error, "skipping failed range iteration");
                        }
                    }
                }
                continue;
            }

            if !self.condition_holds(config, scope) {
                continue;
            }

            options.push(self.parse_option(config, scope).await?);
        }

        Ok(options)
    }

    async fn parse_option(
        &self,
        config: &Map<String, Value>,
        scope: &Value,
    ) -> Result<SelectOption, BuildError> {
        let text = self
            .parse_text(config.get("text").ok_or(BuildError::InvalidText)?, scope)
            .await?;
        let value = self.render_str(config, "value", scope).await;
        Ok(SelectOption { text, value })
    }

    /// Parse a text node: a bare string renders as markdown, a mapping
    /// carries an explicit `{type, text, emoji}`
    async fn parse_text(&self, node: &Value, scope: &Value) -> Result<TextObject, BuildError> {
        match node {
            Value::String(template) => {
                Ok(TextObject::mrkdwn(self.engine.render(template, scope).await))
            }
            Value::Object(config) => self.parse_text_map(config, scope).await,
            _ => Err(BuildError::InvalidText),
        }
    }

    async fn parse_text_map(
        &self,
        config: &Map<String, Value>,
        scope: &Value,
    ) -> Result<TextObject, BuildError> {
        let text_type = match config.get("type").and_then(Value::as_str) {
            None | Some(MRKDWN) => MRKDWN,
            Some(PLAIN_TEXT) => PLAIN_TEXT,
            Some(_) => return Err(BuildError::InvalidText),
        };
        let template = config
            .get("text")
            .and_then(Value::as_str)
            .ok_or(BuildError::InvalidText)?;
        let emoji = config.get("emoji").and_then(Value::as_bool);

        Ok(TextObject {
            text_type: text_type.to_string(),
            text: self.engine.render(template, scope).await,
            emoji: emoji.filter(|&on| on),
        })
    }

    /// Render a string property; absent renders as the empty string
    async fn render_str(&self, config: &Map<String, Value>, key: &str, scope: &Value) -> String {
        match config.get(key).and_then(Value::as_str) {
            Some(template) => self.engine.render(template, scope).await,
            None => String::new(),
        }
    }

    /// Render an optional string property; absent or empty becomes None
    async fn render_opt_str(
        &self,
        config: &Map<String, Value>,
        key: &str,
        scope: &Value,
    ) -> Option<String> {
        let rendered = self.render_str(config, key, scope).await;
        if rendered.is_empty() {
            None
        } else {
            Some(rendered)
        }
    }

    /// Evaluate a `condition` against the scope; errors keep the block
    fn condition_holds(&self, config: &Map<String, Value>, scope: &Value) -> bool {
        let Some(source) = config.get("condition").and_then(Value::as_str) else {
            return true;
        };

        let mut env = Map::new();
        env.insert("event".to_string(), scope.clone());
        env.insert(
            "diff".to_string(),
            scope.get("Diff").cloned().unwrap_or(Value::Null),
        );
        let env = Value::Object(env);

        match Program::compile(source).and_then(|program| program.eval(&env)) {
            Ok(holds) => holds,
            Err(error) => {
                tracing::debug!(
                    condition = source,
                    error = %error,
                    "condition failed to evaluate, keeping block"
                );
                true
            }
        }
    }
}

/// The `range` path of a descriptor, when present
fn range_path(config: &Map<String, Value>) -> Option<String> {
    config
        .get("range")
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Resolve a range path to its list, tolerating a leading dot
fn resolve_range<'a>(scope: &'a Value, path: &str) -> Option<&'a Vec<Value>> {
    lookup(scope, path).and_then(as_list)
}

/// Copy a descriptor with the `range` key removed
fn without_range(config: &Map<String, Value>) -> Map<String, Value> {
    let mut template = config.clone();
    template.remove("range");
    template
}

/// Build the per-iteration scope: outer data overlaid with the element
fn item_scope(outer: &Value, item: &Value) -> Value {
    let mut map = outer.as_object().cloned().unwrap_or_default();
    match item {
        Value::Object(fields) => {
            for (key, value) in fields {
                map.insert(key.clone(), value.clone());
            }
        }
        other => {
            map.insert("Item".to_string(), other.clone());
        }
    }
    Value::Object(map)
}

#[cfg(test)]
#[path = "builder_test.rs"]
mod builder_test;

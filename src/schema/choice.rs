//! # Choice Declarations
//!
//! A `ChoiceSet` is the closed catalog of named options backing Choice
//! (single-select, stored as one Int32) and MultiChoice (multi-select, stored
//! as a List of Int32) schemas. It travels as the schema's declaration item.

#[derive(Debug, Clone, PartialEq)]
pub struct ChoiceOption {
    pub value: i32,
    pub name: String,
    pub order: i32,
    pub hidden: bool,
    pub caption: Option<String>,
    pub description: Option<String>,
}

impl ChoiceOption {
    pub fn new(value: i32, name: impl Into<String>) -> Self {
        Self {
            value,
            name: name.into(),
            order: value,
            hidden: false,
            caption: None,
            description: None,
        }
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Caption when present, otherwise the option name.
    pub fn display_text(&self) -> &str {
        self.caption.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChoiceSet {
    options: Vec<ChoiceOption>,
    default_values: Vec<i32>,
}

impl ChoiceSet {
    pub fn new(options: Vec<ChoiceOption>) -> Self {
        Self {
            options,
            default_values: Vec::new(),
        }
    }

    pub fn with_defaults(mut self, defaults: Vec<i32>) -> Self {
        self.default_values = defaults;
        self
    }

    pub fn options(&self) -> &[ChoiceOption] {
        &self.options
    }

    /// Non-hidden options sorted by `order`, ties broken by value.
    pub fn visible_options(&self) -> Vec<&ChoiceOption> {
        let mut visible: Vec<_> = self.options.iter().filter(|o| !o.hidden).collect();
        visible.sort_by_key(|o| (o.order, o.value));
        visible
    }

    pub fn option(&self, value: i32) -> Option<&ChoiceOption> {
        self.options.iter().find(|o| o.value == value)
    }

    /// Case-insensitive lookup by option name.
    pub fn option_by_name(&self, name: &str) -> Option<&ChoiceOption> {
        self.options
            .iter()
            .find(|o| o.name.eq_ignore_ascii_case(name))
    }

    pub fn contains(&self, value: i32) -> bool {
        self.option(value).is_some()
    }

    pub fn default_values(&self) -> &[i32] {
        &self.default_values
    }

    /// Default of a single-select choice.
    pub fn default_value(&self) -> Option<i32> {
        self.default_values.first().copied()
    }
}

//! Dialog appearance options and their conversion to command-line flags
//!
//! Each options type owns a static, ordered table describing its fields.
//! The table order is the argument order, and a field may carry a flag name
//! that differs from its own name (`entry_text` becomes `--entry-text`).

use serde::{Deserialize, Serialize};

/// Value of one option field, as seen by the argument builder
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// Contributes only the flag, and only when true
    Switch(bool),
    /// Contributes the flag followed by the value
    Text(String),
}

/// One row of an options table
pub struct OptionField<T> {
    /// Field name, used as the flag name unless `flag` overrides it
    pub name: &'static str,
    /// Flag name override
    pub flag: Option<&'static str>,
    /// Reads the field; `None` means unset
    pub value: fn(&T) -> Option<FieldValue>,
}

impl<T> OptionField<T> {
    /// The flag this field is passed as, including the leading `--`
    pub fn flag_name(&self) -> String {
        format!("--{}", self.flag.unwrap_or(self.name))
    }
}

/// Types that can be turned into dialog command arguments
pub trait DialogArgs {
    /// Build the argument list for every set field, in table order
    fn to_args(&self) -> Vec<String>;
}

/// Append the arguments for `options` described by `fields` onto `args`
fn push_args<T>(options: &T, fields: &[OptionField<T>], args: &mut Vec<String>) {
    for field in fields {
        match (field.value)(options) {
            Some(FieldValue::Switch(true)) => args.push(field.flag_name()),
            Some(FieldValue::Text(value)) if !value.is_empty() => {
                args.push(field.flag_name());
                args.push(value);
            }
            _ => {}
        }
    }
}

/// Appearance of a dialog
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DialogOptions {
    pub title: Option<String>,
    pub text: Option<String>,
    /// Text prefilled in the entry field
    pub entry_text: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

const DIALOG_FIELDS: &[OptionField<DialogOptions>] = &[
    OptionField {
        name: "title",
        flag: None,
        value: |o| o.title.clone().map(FieldValue::Text),
    },
    OptionField {
        name: "text",
        flag: None,
        value: |o| o.text.clone().map(FieldValue::Text),
    },
    OptionField {
        name: "entry_text",
        flag: Some("entry-text"),
        value: |o| o.entry_text.clone().map(FieldValue::Text),
    },
    OptionField {
        name: "width",
        flag: None,
        value: |o| o.width.filter(|w| *w > 0).map(|w| FieldValue::Text(w.to_string())),
    },
    OptionField {
        name: "height",
        flag: None,
        value: |o| o.height.filter(|h| *h > 0).map(|h| FieldValue::Text(h.to_string())),
    },
];

impl DialogOptions {
    /// Ordered field table for this type
    pub fn fields() -> &'static [OptionField<Self>] {
        DIALOG_FIELDS
    }
}

impl DialogArgs for DialogOptions {
    fn to_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        push_args(self, DIALOG_FIELDS, &mut args);
        args
    }
}

/// Options for a password dialog, optionally collecting a username too
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PasswordOptions {
    pub dialog: DialogOptions,
    pub username: Option<bool>,
}

const PASSWORD_FIELDS: &[OptionField<PasswordOptions>] = &[OptionField {
    name: "username",
    flag: None,
    value: |o| o.username.map(FieldValue::Switch),
}];

impl PasswordOptions {
    /// Password dialog that also asks for a username
    pub fn with_username(dialog: DialogOptions) -> Self {
        Self {
            dialog,
            username: Some(true),
        }
    }

    pub fn collects_username(&self) -> bool {
        self.username.unwrap_or(false)
    }

    /// Ordered table of the fields added on top of [`DialogOptions`]
    pub fn fields() -> &'static [OptionField<Self>] {
        PASSWORD_FIELDS
    }
}

impl DialogArgs for PasswordOptions {
    fn to_args(&self) -> Vec<String> {
        let mut args = self.dialog.to_args();
        push_args(self, PASSWORD_FIELDS, &mut args);
        args
    }
}

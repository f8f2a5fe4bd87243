//! Plural form validation and rendering.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::error::ItemErrorKind;
use super::params::MessageFormat;

/// Argument name used when a plural key does not define one
pub const DEFAULT_PLURAL_ARG: &str = "count";

/// CLDR plural categories, ordered as CLDR lists them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PluralCategory {
    Zero,
    One,
    Two,
    Few,
    Many,
    Other,
}

impl PluralCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Zero => "zero",
            Self::One => "one",
            Self::Two => "two",
            Self::Few => "few",
            Self::Many => "many",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for PluralCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PluralCategory {
    type Err = ItemErrorKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "zero" => Ok(Self::Zero),
            "one" => Ok(Self::One),
            "two" => Ok(Self::Two),
            "few" => Ok(Self::Few),
            "many" => Ok(Self::Many),
            "other" => Ok(Self::Other),
            other => Err(ItemErrorKind::UnknownPluralCategory(other.to_string())),
        }
    }
}

/// Validated plural forms in category order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluralForms(BTreeMap<PluralCategory, String>);

impl PluralForms {
    /// Validate raw forms keyed by category name
    pub fn parse(raw: &BTreeMap<String, String>) -> Result<Self, ItemErrorKind> {
        if raw.is_empty() {
            return Err(ItemErrorKind::EmptyPluralForms);
        }

        let mut forms = BTreeMap::new();
        for (name, text) in raw {
            let category = name.trim().parse::<PluralCategory>()?;
            if forms.insert(category, text.clone()).is_some() {
                return Err(ItemErrorKind::DuplicatePluralCategory(category.to_string()));
            }
        }

        if !forms.contains_key(&PluralCategory::Other) {
            return Err(ItemErrorKind::MissingOtherPluralForm);
        }

        Ok(Self(forms))
    }

    pub fn iter(&self) -> impl Iterator<Item = (PluralCategory, &str)> {
        self.0.iter().map(|(category, text)| (*category, text.as_str()))
    }

    /// Fallback text used by formats without plural support
    pub fn other(&self) -> &str {
        self.0
            .get(&PluralCategory::Other)
            .map(String::as_str)
            .unwrap_or_default()
    }

    /// ICU MessageFormat plural expression
    pub fn to_icu(&self, arg_name: &str) -> String {
        let branches = self
            .iter()
            .map(|(category, text)| format!("{} {{{}}}", category, text))
            .collect::<Vec<_>>()
            .join(" ");
        format!("{{{}, plural, {}}}", arg_name, branches)
    }
}

/// Text of one output entry after plural rendering
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderedText {
    Single(String),
    /// Entries named `<key>_<category>`
    PerCategory(Vec<(PluralCategory, String)>),
}

/// Render plural forms in the requested message format
pub fn render_plural(
    raw: &BTreeMap<String, String>,
    arg_name: Option<&str>,
    message_format: MessageFormat,
) -> Result<RenderedText, ItemErrorKind> {
    let forms = PluralForms::parse(raw)?;
    let rendered = match message_format {
        MessageFormat::Icu => {
            let arg = arg_name
                .filter(|name| !name.is_empty())
                .unwrap_or(DEFAULT_PLURAL_ARG);
            RenderedText::Single(forms.to_icu(arg))
        }
        MessageFormat::PerCategoryKeys => RenderedText::PerCategory(
            forms
                .iter()
                .map(|(category, text)| (category, text.to_string()))
                .collect(),
        ),
        MessageFormat::Plain => RenderedText::Single(forms.other().to_string()),
    };
    Ok(rendered)
}

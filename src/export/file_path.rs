//! Output file naming.

use std::sync::LazyLock;

use regex::Regex;

use super::error::{ExportError, Result};
use super::params::{ExportParams, FileLayout, DEFAULT_FILE_TEMPLATE};

/// Template used by the single-file layout when the default one is configured
pub const DEFAULT_SINGLE_FILE_TEMPLATE: &str = "{namespace}/translations.{extension}";

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([A-Za-z]*)\}").expect("placeholder pattern is valid"));

const NAMESPACE: &str = "namespace";
const LANGUAGE_TAG: &str = "languageTag";
const ANDROID_LANGUAGE_TAG: &str = "androidLanguageTag";
const SNAKE_LANGUAGE_TAG: &str = "snakeLanguageTag";
const EXTENSION: &str = "extension";

const LANGUAGE_PLACEHOLDERS: [&str; 3] = [LANGUAGE_TAG, ANDROID_LANGUAGE_TAG, SNAKE_LANGUAGE_TAG];

/// Validated file path template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePathTemplate {
    template: String,
    extension: &'static str,
}

impl FilePathTemplate {
    /// Build the template for an export, checking it fits the layout
    pub fn for_params(params: &ExportParams) -> Result<Self> {
        let template = match params.layout {
            FileLayout::SingleFile if params.file_structure_template == DEFAULT_FILE_TEMPLATE => {
                DEFAULT_SINGLE_FILE_TEMPLATE
            }
            _ => params.file_structure_template.as_str(),
        };

        let mut has_language = false;
        for capture in PLACEHOLDER.captures_iter(template) {
            let name = &capture[1];
            match name {
                NAMESPACE | EXTENSION => {}
                _ if LANGUAGE_PLACEHOLDERS.contains(&name) => has_language = true,
                _ => {
                    return Err(ExportError::InvalidParams(format!(
                        "Unknown placeholder '{{{}}}' in file structure template",
                        name
                    )))
                }
            }
        }

        match (params.layout, has_language) {
            (FileLayout::PerLanguage, false) => Err(ExportError::InvalidParams(
                "File structure template must contain a language tag placeholder".to_string(),
            )),
            (FileLayout::SingleFile, true) => Err(ExportError::InvalidParams(
                "Single-file layout cannot use language tag placeholders".to_string(),
            )),
            _ => Ok(Self {
                template: template.to_string(),
                extension: params.format.extension(),
            }),
        }
    }

    /// Render a file path; empty segments left by a missing namespace are dropped
    pub fn render(&self, namespace: Option<&str>, language_tag: Option<&str>) -> String {
        let tag = language_tag.unwrap_or_default();
        let rendered = PLACEHOLDER.replace_all(&self.template, |caps: &regex::Captures<'_>| {
            match &caps[1] {
                NAMESPACE => namespace.unwrap_or_default().to_string(),
                LANGUAGE_TAG => tag.to_string(),
                ANDROID_LANGUAGE_TAG => android_language_tag(tag),
                SNAKE_LANGUAGE_TAG => tag.replace('-', "_"),
                EXTENSION => self.extension.to_string(),
                other => other.to_string(),
            }
        });

        rendered
            .split('/')
            .filter(|segment| !segment.is_empty())
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// Android resource qualifier for a BCP 47 tag (`en-US` -> `en-rUS`)
pub fn android_language_tag(tag: &str) -> String {
    let parts: Vec<&str> = tag.split('-').filter(|p| !p.is_empty()).collect();
    match parts.as_slice() {
        [language] => language.to_string(),
        [language, region] if is_region(region) => format!("{}-r{}", language, region),
        _ => format!("b+{}", parts.join("+")),
    }
}

fn is_region(subtag: &str) -> bool {
    (subtag.len() == 2 && subtag.chars().all(|c| c.is_ascii_alphabetic()))
        || (subtag.len() == 3 && subtag.chars().all(|c| c.is_ascii_digit()))
}

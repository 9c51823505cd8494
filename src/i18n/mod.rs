//! Internationalization (i18n) support
//!
//! Date formatting and UI strings always go through an explicit [`Locale`];
//! nothing here reads the process locale.

use anyhow::Result;
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Locale used when the configured tag is unknown
pub const DEFAULT_LANGUAGE: &str = "pt-BR";

/// Month names and UI strings for one language
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Locale {
    pub tag: String,
    pub months: [String; 12],
    pub months_short: [String; 12],
    strings: HashMap<String, String>,
}

impl Locale {
    /// Built-in locale for a language tag (case-insensitive, `_` or `-`)
    pub fn builtin(tag: &str) -> Option<Self> {
        match normalize_tag(tag).as_str() {
            "pt-br" | "pt" => Some(pt_br()),
            "en-us" | "en" => Some(en_us()),
            _ => None,
        }
    }

    /// Built-in locale for a tag, falling back to [`DEFAULT_LANGUAGE`]
    pub fn resolve(tag: &str) -> Self {
        Self::builtin(tag).unwrap_or_else(|| {
            tracing::warn!(
                "Unknown language {:?}, falling back to {}",
                tag,
                DEFAULT_LANGUAGE
            );
            pt_br()
        })
    }

    /// Localized month name, `month` in 1..=12
    pub fn month(&self, month: u32) -> &str {
        &self.months[month_index(month)]
    }

    /// Localized abbreviated month name, `month` in 1..=12
    pub fn month_short(&self, month: u32) -> &str {
        &self.months_short[month_index(month)]
    }

    /// A UI string by key; the key itself when missing
    pub fn get(&self, key: &str) -> String {
        self.strings
            .get(key)
            .cloned()
            .unwrap_or_else(|| key.to_string())
    }

    pub fn strings(&self) -> &HashMap<String, String> {
        &self.strings
    }

    /// Overlay values from a language file
    fn apply(&mut self, data: &HashMap<String, serde_yaml::Value>) {
        if let Some(months) = data.get("months").and_then(month_list) {
            self.months = months;
        }
        if let Some(months) = data.get("months_short").and_then(month_list) {
            self.months_short = months;
        }
        let mut flat = HashMap::new();
        flatten_translations(data, "", &mut flat);
        self.strings.extend(flat);
    }
}

impl Default for Locale {
    fn default() -> Self {
        pt_br()
    }
}

/// Internationalization handler
pub struct I18n {
    /// Current language
    language: String,
    /// Language data loaded from disk: lang -> key -> value
    translations: HashMap<String, HashMap<String, serde_yaml::Value>>,
}

impl I18n {
    /// Create a new i18n handler
    pub fn new(language: &str) -> Self {
        Self {
            language: language.to_string(),
            translations: HashMap::new(),
        }
    }

    /// Load language files (`<tag>.yml`) from a directory
    pub fn load_languages<P: AsRef<Path>>(&mut self, dir: P) -> Result<()> {
        let dir = dir.as_ref();
        if !dir.exists() {
            return Ok(());
        }

        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            let ext = path.extension().and_then(|e| e.to_str());
            if !path.is_file() || !matches!(ext, Some("yml") | Some("yaml")) {
                continue;
            }
            let Some(lang) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };

            let content = fs::read_to_string(&path)?;
            match serde_yaml::from_str::<HashMap<String, serde_yaml::Value>>(&content) {
                Ok(data) => {
                    self.translations.insert(normalize_tag(lang), data);
                    tracing::debug!("Loaded language file: {:?}", path);
                }
                Err(e) => {
                    tracing::warn!("Failed to parse language file {:?}: {}", path, e);
                }
            }
        }

        Ok(())
    }

    /// The locale for the current language with any loaded overrides applied
    pub fn locale(&self) -> Locale {
        let tag = normalize_tag(&self.language);
        let mut locale = Locale::builtin(&tag).unwrap_or_else(|| {
            if self.translations.contains_key(&tag) {
                // a file-only language starts from the default
                let mut base = pt_br();
                base.tag = self.language.clone();
                base
            } else {
                Locale::resolve(&self.language)
            }
        });
        if let Some(data) = self.translations.get(&tag) {
            locale.apply(data);
        }
        locale
    }
}

impl Default for I18n {
    fn default() -> Self {
        Self::new(DEFAULT_LANGUAGE)
    }
}

fn normalize_tag(tag: &str) -> String {
    tag.trim().replace('_', "-").to_lowercase()
}

fn month_index(month: u32) -> usize {
    (month.clamp(1, 12) - 1) as usize
}

fn month_list(value: &serde_yaml::Value) -> Option<[String; 12]> {
    let names: Vec<String> = value
        .as_sequence()?
        .iter()
        .map(yaml_value_to_string)
        .collect();
    names.try_into().ok()
}

fn strings(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn months(names: [&str; 12]) -> [String; 12] {
    names.map(str::to_string)
}

fn pt_br() -> Locale {
    Locale {
        tag: "pt-BR".to_string(),
        months: months([
            "janeiro",
            "fevereiro",
            "março",
            "abril",
            "maio",
            "junho",
            "julho",
            "agosto",
            "setembro",
            "outubro",
            "novembro",
            "dezembro",
        ]),
        months_short: months([
            "jan", "fev", "mar", "abr", "mai", "jun", "jul", "ago", "set", "out", "nov", "dez",
        ]),
        strings: strings(&[
            ("load_more", "Carregar mais posts"),
            ("loading", "Carregando..."),
            ("not_found", "Post não encontrado"),
            ("error", "Não foi possível carregar o conteúdo"),
            ("minutes", "min"),
            ("posts", "Posts"),
            ("unpublished", "Não publicado"),
        ]),
    }
}

fn en_us() -> Locale {
    Locale {
        tag: "en-US".to_string(),
        months: months([
            "January",
            "February",
            "March",
            "April",
            "May",
            "June",
            "July",
            "August",
            "September",
            "October",
            "November",
            "December",
        ]),
        months_short: months([
            "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
        ]),
        strings: strings(&[
            ("load_more", "Load more posts"),
            ("loading", "Loading..."),
            ("not_found", "Post not found"),
            ("error", "Could not load the content"),
            ("minutes", "min"),
            ("posts", "Posts"),
            ("unpublished", "Unpublished"),
        ]),
    }
}

/// Convert a YAML value to a string
fn yaml_value_to_string(value: &serde_yaml::Value) -> String {
    match value {
        serde_yaml::Value::String(s) => s.clone(),
        serde_yaml::Value::Number(n) => n.to_string(),
        serde_yaml::Value::Bool(b) => b.to_string(),
        serde_yaml::Value::Null => String::new(),
        _ => format!("{:?}", value),
    }
}

/// Flatten translations into a HashMap with dot-notation keys
fn flatten_translations(
    data: &HashMap<String, serde_yaml::Value>,
    prefix: &str,
    result: &mut HashMap<String, String>,
) {
    for (key, value) in data {
        let full_key = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };

        match value {
            serde_yaml::Value::String(_)
            | serde_yaml::Value::Number(_)
            | serde_yaml::Value::Bool(_) => {
                result.insert(full_key, yaml_value_to_string(value));
            }
            serde_yaml::Value::Mapping(map) => {
                let nested: HashMap<String, serde_yaml::Value> = map
                    .iter()
                    .filter_map(|(k, v)| Some((k.as_str()?.to_string(), v.clone())))
                    .collect();
                flatten_translations(&nested, &full_key, result);
            }
            _ => {}
        }
    }
}

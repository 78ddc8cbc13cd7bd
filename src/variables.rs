//! Placeholder detection, spec merging, validation and rendering for
//! `[name]`-style prompt variables.

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

use crate::models::{VariableSpec, VariableType};

/// An opening bracket, one or more non-bracket characters, a closing bracket
fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[([^\[\]]+)\]").expect("placeholder pattern is valid"))
}

/// Unique placeholder names in first-occurrence order, de-duplicated case-insensitively.
pub fn detect_names(content: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut names = Vec::new();

    for caps in placeholder_regex().captures_iter(content) {
        let name = caps[1].trim();
        if name.is_empty() || !seen.insert(name.to_lowercase()) {
            continue;
        }
        names.push(name.to_string());
    }

    names
}

pub fn has_variables(content: &str) -> bool {
    !detect_names(content).is_empty()
}

pub fn count_variables(content: &str) -> usize {
    detect_names(content).len()
}

/// Build the spec list for `content`, keeping user configuration for names
/// that are still present and dropping specs for removed placeholders.
pub fn derive_specs(content: &str, existing: &[VariableSpec]) -> Vec<VariableSpec> {
    let names = detect_names(content);
    if names.is_empty() {
        return Vec::new();
    }

    let by_name: HashMap<String, &VariableSpec> = existing
        .iter()
        .map(|spec| (spec.name.to_lowercase(), spec))
        .collect();

    names
        .into_iter()
        .map(|name| match by_name.get(&name.to_lowercase()) {
            Some(spec) => VariableSpec {
                name,
                ..(*spec).clone()
            },
            None => VariableSpec::with_defaults(name),
        })
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<FieldError>,
}

/// Check submitted values against their specs. Every field is checked;
/// violations are collected rather than stopping at the first one.
pub fn validate(specs: &[VariableSpec], values: &HashMap<String, String>) -> ValidationReport {
    let mut errors = Vec::new();

    for spec in specs {
        let label = format_name(&spec.name);
        let value = lookup(values, &spec.name).map(str::trim).unwrap_or_default();

        if value.is_empty() {
            if spec.required {
                errors.push(FieldError {
                    field: spec.name.clone(),
                    message: format!("{} is required", label),
                });
            }
            continue;
        }

        match spec.kind {
            VariableType::Number => {
                let Ok(number) = value.parse::<f64>() else {
                    errors.push(FieldError {
                        field: spec.name.clone(),
                        message: format!("{} must be a number", label),
                    });
                    continue;
                };
                if number.is_nan() {
                    errors.push(FieldError {
                        field: spec.name.clone(),
                        message: format!("{} must be a number", label),
                    });
                    continue;
                }
                if let Some(min) = spec.min.filter(|min| number < *min) {
                    errors.push(FieldError {
                        field: spec.name.clone(),
                        message: format!("{} must be at least {}", label, min),
                    });
                }
                if let Some(max) = spec.max.filter(|max| number > *max) {
                    errors.push(FieldError {
                        field: spec.name.clone(),
                        message: format!("{} must be at most {}", label, max),
                    });
                }
            }
            VariableType::Options => {
                if !spec.options.is_empty() && !spec.options.iter().any(|o| o == value) {
                    errors.push(FieldError {
                        field: spec.name.clone(),
                        message: format!("Invalid option for {}", label),
                    });
                }
            }
            VariableType::Text => {}
        }
    }

    ValidationReport {
        valid: errors.is_empty(),
        errors,
    }
}

/// Substitute every known placeholder with its value, or the empty string when
/// no value was supplied. Names are compared literally (case-insensitive), so
/// characters with special meaning in patterns are never interpreted.
pub fn render(content: &str, values: &HashMap<String, String>) -> String {
    let mut known: HashSet<String> = detect_names(content)
        .into_iter()
        .map(|name| name.to_lowercase())
        .collect();
    known.extend(values.keys().map(|key| key.to_lowercase()));

    placeholder_regex()
        .replace_all(content, |caps: &Captures| {
            let name = caps[1].trim();
            if known.contains(&name.to_lowercase()) {
                lookup(values, name).unwrap_or_default().to_string()
            } else {
                caps[0].to_string()
            }
        })
        .into_owned()
}

/// Render with example values: example, then default, then first option,
/// otherwise the placeholder is kept.
pub fn preview(content: &str, specs: &[VariableSpec]) -> String {
    let values = specs
        .iter()
        .map(|spec| {
            let value = if !spec.example.is_empty() {
                spec.example.clone()
            } else if !spec.default.is_empty() {
                spec.default.clone()
            } else if let (VariableType::Options, Some(first)) = (spec.kind, spec.options.first()) {
                first.clone()
            } else {
                format!("[{}]", spec.name)
            };
            (spec.name.clone(), value)
        })
        .collect();

    render(content, &values)
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlaceholderPosition {
    pub name: String,
    pub start: usize,
    pub end: usize,
    pub full_match: String,
}

/// Byte spans of every placeholder occurrence, duplicates included.
pub fn positions(content: &str) -> Vec<PlaceholderPosition> {
    placeholder_regex()
        .captures_iter(content)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            Some(PlaceholderPosition {
                name: caps[1].trim().to_string(),
                start: whole.start(),
                end: whole.end(),
                full_match: whole.as_str().to_string(),
            })
        })
        .collect()
}

/// "targetAudience" / "target_audience" / "target-audience" -> "Target Audience"
pub fn format_name(name: &str) -> String {
    let mut spaced = String::with_capacity(name.len() + 4);
    let mut prev_lower = false;
    for ch in name.chars() {
        if ch.is_ascii_uppercase() && prev_lower {
            spaced.push(' ');
        }
        prev_lower = ch.is_ascii_lowercase();
        spaced.push(if ch == '_' || ch == '-' { ' ' } else { ch });
    }

    spaced
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string()
}

fn lookup<'a>(values: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    if let Some(value) = values.get(name) {
        return Some(value.as_str());
    }
    let wanted = name.to_lowercase();
    values
        .iter()
        .find(|(key, _)| key.to_lowercase() == wanted)
        .map(|(_, value)| value.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_detect_names_dedupes_in_order() {
        let names = detect_names("Write [topic] for [audience] about [topic]");
        assert_eq!(names, vec!["topic", "audience"]);
    }

    #[test]
    fn test_detect_names_case_insensitive_first_casing_wins() {
        let names = detect_names("[Topic] and [TOPIC] and [topic]");
        assert_eq!(names, vec!["Topic"]);
    }

    #[test]
    fn test_detect_names_skips_blank_and_nested() {
        assert!(detect_names("[] [   ] plain text").is_empty());
        assert_eq!(detect_names("[[inner]]"), vec!["inner"]);
        assert!(!has_variables("no placeholders"));
        assert_eq!(count_variables("[a] [b] [A]"), 2);
    }

    #[test]
    fn test_derive_specs_preserves_customization() {
        let existing = vec![VariableSpec::with_defaults("topic").options(["A", "B"])];
        let specs = derive_specs("[Topic] discussion", &existing);

        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].name, "Topic");
        assert_eq!(specs[0].kind, VariableType::Options);
        assert_eq!(specs[0].options, vec!["A", "B"]);
    }

    #[test]
    fn test_derive_specs_drops_removed_and_adds_defaults() {
        let existing = vec![
            VariableSpec::with_defaults("old").number(Some(1.0), None),
            VariableSpec::with_defaults("kept").optional(),
        ];
        let specs = derive_specs("[kept] then [fresh]", &existing);

        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0].name, "kept");
        assert!(!specs[0].required);
        assert_eq!(specs[1].name, "fresh");
        assert_eq!(specs[1].kind, VariableType::Text);
        assert!(specs[1].required);
        assert_eq!(specs[1].placeholder, "Enter Fresh");
        assert!(derive_specs("nothing here", &existing).is_empty());
    }

    #[test]
    fn test_validate_number_bounds() {
        let specs = vec![VariableSpec::with_defaults("count").number(Some(1.0), Some(10.0))];

        for bad in ["0", "11", "abc"] {
            let report = validate(&specs, &values(&[("count", bad)]));
            assert!(!report.valid, "{} should be rejected", bad);
        }
        for good in ["1", "10", "5.5"] {
            let report = validate(&specs, &values(&[("count", good)]));
            assert!(report.valid, "{} should be accepted", good);
        }
    }

    #[test]
    fn test_validate_required_rejects_blank() {
        let specs = vec![VariableSpec::with_defaults("topic")];

        assert!(!validate(&specs, &values(&[("topic", "")])).valid);
        assert!(!validate(&specs, &values(&[("topic", "   ")])).valid);
        assert!(!validate(&specs, &HashMap::new()).valid);

        let report = validate(&specs, &values(&[("topic", "")]));
        assert_eq!(report.errors[0].message, "Topic is required");
    }

    #[test]
    fn test_validate_collects_all_errors() {
        let specs = vec![
            VariableSpec::with_defaults("tone").options(["formal", "casual"]),
            VariableSpec::with_defaults("words").number(None, Some(100.0)),
            VariableSpec::with_defaults("note").optional(),
        ];
        let report = validate(&specs, &values(&[("tone", "angry"), ("words", "500")]));

        assert!(!report.valid);
        assert_eq!(report.errors.len(), 2);
        assert_eq!(report.errors[0].field, "tone");
        assert_eq!(report.errors[1].field, "words");
    }

    #[test]
    fn test_render_fills_and_blanks_unsupplied() {
        let content = "Write [topic] for [Audience] in [tone]";
        let rendered = render(content, &values(&[("TOPIC", "Rust"), ("audience", "devs")]));

        assert_eq!(rendered, "Write Rust for devs in ");
        for name in detect_names(content) {
            assert!(!rendered.contains(&format!("[{}]", name)));
        }
    }

    #[test]
    fn test_render_treats_names_literally() {
        let content = "Use [c++] and [a.b] but not [axb]";
        let rendered = render(content, &values(&[("c++", "C"), ("a.b", "dot")]));

        assert_eq!(rendered, "Use C and dot but not ");
    }

    #[test]
    fn test_render_padded_placeholders() {
        let content = "Write about [ topic ] for [audience ] now";
        assert_eq!(detect_names(content), vec!["topic", "audience"]);

        let rendered = render(content, &values(&[("topic", "Rust"), ("audience", "devs")]));
        assert_eq!(rendered, "Write about Rust for devs now");
    }

    #[test]
    fn test_render_does_not_expand_replacement_syntax() {
        let rendered = render("[cost]", &values(&[("cost", "$1 and $2")]));
        assert_eq!(rendered, "$1 and $2");
    }

    #[test]
    fn test_preview_fallback_order() {
        let mut with_example = VariableSpec::with_defaults("a");
        with_example.example = "ex".to_string();
        let mut with_default = VariableSpec::with_defaults("b");
        with_default.default = "def".to_string();
        let with_options = VariableSpec::with_defaults("c").options(["first", "second"]);
        let bare = VariableSpec::with_defaults("d");

        let out = preview("[a] [b] [c] [d]", &[with_example, with_default, with_options, bare]);
        assert_eq!(out, "ex def first [d]");
    }

    #[test]
    fn test_positions_include_duplicates() {
        let found = positions("[x] and [x]");
        assert_eq!(found.len(), 2);
        assert_eq!(found[1].start, 8);
        assert_eq!(found[1].end, 11);
        assert_eq!(found[1].full_match, "[x]");
    }

    #[test]
    fn test_format_name() {
        assert_eq!(format_name("targetAudience"), "Target Audience");
        assert_eq!(format_name("word_count"), "Word Count");
        assert_eq!(format_name("tone-of-voice"), "Tone Of Voice");
        assert_eq!(format_name("topic"), "Topic");
    }
}

//! Display formatting for ranking explanations.
//!
//! Maps the raw signal and action keys of an [`Explanation`] to labelled,
//! display-ready rows. Pure: no I/O, no state.
//!
//! Signal rows come out in the ranking pipeline's canonical signal order
//! (the order of [`SIGNAL_LABELS`]), followed by any unrecognised keys in
//! the order the backend sent them. Action rows follow [`ACTION_LABELS`] the same way.

use crate::model::Explanation;
use serde::Serialize;

/// Signal key rendered as a Yes/No flag.
pub const IN_NETWORK_KEY: &str = "in_network";

/// `in_network` values strictly above this render as "Yes".
pub const IN_NETWORK_THRESHOLD: f64 = 0.5;

/// Shown in place of note tags when an explanation carries no notes.
pub const NOTES_FALLBACK: &str = "Balanced across preferences";

/// Separator between pipeline stages.
pub const STAGE_SEPARATOR: &str = " → ";

/// Shown when an explanation carries no stage log.
pub const PIPELINE_FALLBACK: &str = "hydration → sources → filters → scorers → selection";

/// Labels for ranking signals, in canonical display order.
pub const SIGNAL_LABELS: &[(&str, &str)] = &[
    ("recency", "Recency"),
    ("popularity", "Popularity"),
    ("topic_match", "Topic match"),
    (IN_NETWORK_KEY, "In network"),
    ("niche", "Niche"),
    ("viral", "Viral"),
    ("diversity", "Diversity"),
];

/// Labels for predicted engagement actions, in display order.
pub const ACTION_LABELS: &[(&str, &str)] = &[
    ("like", "Like"),
    ("reply", "Reply"),
    ("repost", "Repost"),
    ("click", "Click"),
];

/// A labelled value ready for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayRow {
    /// Raw key from the explanation.
    pub key: String,
    /// Human label, or the raw key when no label is known.
    pub label: String,
    /// Rendered value.
    pub value: String,
}

/// How the notes section renders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum NotesDisplay {
    /// One tag per note, in order.
    Tags(Vec<String>),
    /// No notes were given.
    Fallback(&'static str),
}

impl NotesDisplay {
    /// Tags to render; the fallback renders as a single plain string.
    #[must_use]
    pub fn tags(&self) -> &[String] {
        match self {
            Self::Tags(tags) => tags,
            Self::Fallback(_) => &[],
        }
    }
}

impl std::fmt::Display for NotesDisplay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tags(tags) => f.write_str(&tags.join(" · ")),
            Self::Fallback(text) => f.write_str(text),
        }
    }
}

/// A fully formatted explanation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExplanationView {
    /// Final score, 3 decimals.
    pub score: String,
    pub signals: Vec<DisplayRow>,
    pub actions: Vec<DisplayRow>,
    pub notes: NotesDisplay,
    /// Stage trace joined with [`STAGE_SEPARATOR`], or [`PIPELINE_FALLBACK`].
    pub pipeline: String,
}

/// Look up a label, falling back to the raw key.
#[must_use]
pub fn label_for<'a>(table: &[(&str, &'a str)], key: &'a str) -> &'a str {
    table
        .iter()
        .find(|(k, _)| *k == key)
        .map_or(key, |(_, label)| *label)
}

/// Render one signal value.
#[must_use]
pub fn format_signal_value(key: &str, value: f64) -> String {
    if key == IN_NETWORK_KEY {
        let flag = if value > IN_NETWORK_THRESHOLD { "Yes" } else { "No" };
        flag.to_string()
    } else {
        format_decimal(value, 2)
    }
}

/// Fixed-point formatting with ties rounded away from zero.
///
/// `format!` alone rounds exact ties to even, which would show 0.125 as
/// "0.12" at two places.
#[must_use]
pub fn format_decimal(value: f64, places: usize) -> String {
    let rounded = i32::try_from(places)
        .ok()
        .map(|exp| 10f64.powi(exp))
        .map(|factor| (value * factor).round() / factor)
        .filter(|r| r.is_finite())
        .unwrap_or(value);
    format!("{rounded:.places$}")
}

/// Format a whole explanation.
#[must_use]
pub fn format_explanation(explanation: &Explanation) -> ExplanationView {
    let signals = ordered_keys(SIGNAL_LABELS, explanation.components.keys())
        .into_iter()
        .map(|key| {
            let value = explanation.components[key];
            DisplayRow {
                key: key.to_string(),
                label: label_for(SIGNAL_LABELS, key).to_string(),
                value: format_signal_value(key, value),
            }
        })
        .collect();

    let actions = ordered_keys(ACTION_LABELS, explanation.action_probs.keys())
        .into_iter()
        .map(|key| DisplayRow {
            key: key.to_string(),
            label: label_for(ACTION_LABELS, key).to_string(),
            value: format_decimal(explanation.action_probs[key], 2),
        })
        .collect();

    ExplanationView {
        score: format_decimal(explanation.score, 3),
        signals,
        actions,
        notes: format_notes(&explanation.notes),
        pipeline: format_pipeline(&explanation.stage_log),
    }
}

/// Notes as tags, or the fallback when empty. Order and duplicates are kept.
#[must_use]
pub fn format_notes(notes: &[String]) -> NotesDisplay {
    if notes.is_empty() {
        NotesDisplay::Fallback(NOTES_FALLBACK)
    } else {
        NotesDisplay::Tags(notes.to_vec())
    }
}

/// The stage trace verbatim, joined in execution order.
#[must_use]
pub fn format_pipeline(stage_log: &[String]) -> String {
    if stage_log.is_empty() {
        PIPELINE_FALLBACK.to_string()
    } else {
        stage_log.join(STAGE_SEPARATOR)
    }
}

fn ordered_keys<'a>(
    table: &[(&str, &str)],
    keys: impl Iterator<Item = &'a String>,
) -> Vec<&'a str> {
    let mut keys: Vec<&str> = keys.map(String::as_str).collect();
    // Stable, so unknown keys stay in response order.
    keys.sort_by_key(|key| {
        table
            .iter()
            .position(|(k, _)| k == key)
            .unwrap_or(table.len())
    });
    keys
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    fn explanation(components: &[(&str, f64)]) -> Explanation {
        Explanation {
            score: 0.1234,
            components: components
                .iter()
                .map(|(k, v)| ((*k).to_string(), *v))
                .collect::<IndexMap<_, _>>(),
            ..Explanation::default()
        }
    }

    #[test]
    fn in_network_is_binary_and_others_round() {
        let view = format_explanation(&explanation(&[("in_network", 0.6), ("recency", 0.42)]));
        let in_network = view.signals.iter().find(|r| r.key == "in_network").unwrap();
        let recency = view.signals.iter().find(|r| r.key == "recency").unwrap();
        assert_eq!(in_network.value, "Yes");
        assert_eq!(in_network.label, "In network");
        assert_eq!(recency.value, "0.42");
        assert_eq!(recency.label, "Recency");
    }

    #[test]
    fn in_network_at_threshold_is_no() {
        assert_eq!(format_signal_value("in_network", 0.5), "No");
        assert_eq!(format_signal_value("in_network", 0.0), "No");
        assert_eq!(format_signal_value("in_network", 1.0), "Yes");
    }

    #[test]
    fn unknown_keys_keep_raw_label_and_sort_last() {
        let view = format_explanation(&explanation(&[
            ("zeta_boost", 0.333),
            ("diversity", 0.1),
            ("recency", 0.9),
        ]));
        let keys: Vec<&str> = view.signals.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, ["recency", "diversity", "zeta_boost"]);
        assert_eq!(view.signals[2].label, "zeta_boost");
        assert_eq!(view.signals[2].value, "0.33");
    }

    #[test]
    fn unknown_keys_keep_response_order() {
        let view = format_explanation(&explanation(&[
            ("zeta_boost", 0.3),
            ("recency", 0.9),
            ("alpha_mix", 0.2),
        ]));
        let keys: Vec<&str> = view.signals.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, ["recency", "zeta_boost", "alpha_mix"]);
    }

    #[test]
    fn action_probs_use_their_own_labels() {
        let mut e = Explanation::default();
        e.action_probs.insert("repost".into(), 0.25);
        e.action_probs.insert("like".into(), 0.5);
        e.action_probs.insert("bookmark".into(), 0.01);
        let view = format_explanation(&e);
        let rendered: Vec<(&str, &str)> = view
            .actions
            .iter()
            .map(|r| (r.label.as_str(), r.value.as_str()))
            .collect();
        assert_eq!(
            rendered,
            [("Like", "0.50"), ("Repost", "0.25"), ("bookmark", "0.01")]
        );
    }

    #[test]
    fn empty_notes_use_fallback() {
        assert_eq!(format_notes(&[]), NotesDisplay::Fallback(NOTES_FALLBACK));
        assert_eq!(format_notes(&[]).to_string(), "Balanced across preferences");
    }

    #[test]
    fn single_note_is_single_tag() {
        let notes = format_notes(&["diverse".to_string()]);
        assert_eq!(notes.tags(), ["diverse".to_string()]);
    }

    #[test]
    fn stage_log_is_verbatim_and_ordered() {
        let stages: Vec<String> = ["sources", "filters", "sources", "selection"]
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(
            format_pipeline(&stages),
            "sources → filters → sources → selection"
        );
        assert_eq!(format_pipeline(&[]), PIPELINE_FALLBACK);
    }

    #[test]
    fn exact_ties_round_up() {
        assert_eq!(format_decimal(0.125, 2), "0.13");
        assert_eq!(format_decimal(0.625, 2), "0.63");
        assert_eq!(format_decimal(0.0625, 3), "0.063");
        assert_eq!(format_decimal(-0.125, 2), "-0.13");
        assert_eq!(format_signal_value("recency", 0.125), "0.13");
    }

    #[test]
    fn score_has_three_decimals() {
        let view = format_explanation(&explanation(&[]));
        assert_eq!(view.score, "0.123");
        assert!(view.signals.is_empty());
    }
}

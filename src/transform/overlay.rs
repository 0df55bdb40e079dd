use serde::{Deserialize, Serialize};

use crate::llm::models::QueryExplanation;

/// A run of query text, optionally carrying the explanation for that run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

impl Span {
    fn plain(text: &str) -> Self {
        Self {
            text: text.to_string(),
            explanation: None,
        }
    }

    fn annotated(text: &str, explanation: &str) -> Self {
        Self {
            text: text.to_string(),
            explanation: Some(explanation.to_string()),
        }
    }

    pub fn is_annotated(&self) -> bool {
        self.explanation.is_some()
    }
}

/// Appends unannotated text, extending the previous span when it is plain too.
fn push_plain(spans: &mut Vec<Span>, text: &str) {
    match spans.last_mut() {
        Some(last) if !last.is_annotated() => last.text.push_str(text),
        _ => spans.push(Span::plain(text)),
    }
}

/// Splits `query` into contiguous spans, attaching each explanation to the
/// first literal occurrence of its section.
///
/// Sections that do not occur in the query are dropped. A section that starts
/// inside an already annotated span is dropped too, so the spans never overlap
/// and concatenating their text always gives back `query`. A section with a
/// blank explanation still claims its text but renders as plain.
pub fn overlay_explanations(query: &str, annotations: &[QueryExplanation]) -> Vec<Span> {
    if query.is_empty() {
        return Vec::new();
    }

    let mut located: Vec<(usize, &QueryExplanation)> = annotations
        .iter()
        .filter(|a| !a.section.is_empty())
        .filter_map(|a| query.find(&a.section).map(|start| (start, a)))
        .collect();
    // stable: equal starts keep input order
    located.sort_by_key(|(start, _)| *start);

    let mut spans = Vec::with_capacity(located.len() * 2 + 1);
    let mut cursor = 0;

    for (start, annotation) in located {
        if start < cursor {
            continue;
        }
        if start > cursor {
            push_plain(&mut spans, &query[cursor..start]);
        }
        let end = start + annotation.section.len();
        if annotation.explanation.trim().is_empty() {
            push_plain(&mut spans, &query[start..end]);
        } else {
            spans.push(Span::annotated(&query[start..end], &annotation.explanation));
        }
        cursor = end;
    }

    if cursor < query.len() {
        push_plain(&mut spans, &query[cursor..]);
    }

    spans
}

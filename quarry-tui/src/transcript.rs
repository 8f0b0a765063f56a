//! Turning research results into styled transcript lines.

use crate::styles;
use quarry_actors::{ModelMenu, Turn};
use quarry_research::{ChatEntry, Progress, TurnOutcome};
use ratatui::style::Style;

#[derive(Clone, Debug, PartialEq)]
pub struct TranscriptLine {
    pub text: String,
    pub style: Style,
}

impl TranscriptLine {
    pub fn new(text: impl Into<String>, style: Style) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }

    pub fn blank() -> Self {
        Self::new(String::new(), Style::default())
    }
}

fn indented(text: &str, style: Style) -> impl Iterator<Item = TranscriptLine> + '_ {
    text.lines().map(move |line| TranscriptLine::new(format!("  {line}"), style))
}

pub fn user_lines(query: &str) -> Vec<TranscriptLine> {
    let mut out = vec![TranscriptLine::new("→ [You]", styles::user_header())];
    out.extend(indented(query, styles::user_text()));
    out.push(TranscriptLine::blank());
    out
}

pub fn progress_line(event: &Progress) -> TranscriptLine {
    TranscriptLine::new(format!("  · {event}"), styles::dim())
}

pub fn turn_lines(turn: &Turn) -> Vec<TranscriptLine> {
    let banner = turn.outcome.banner();
    let mut out = Vec::new();

    match &turn.outcome {
        TurnOutcome::Report {
            report,
            sources,
            degraded,
        } => {
            out.push(TranscriptLine::new(
                format!("← {banner} [{}]", turn.model),
                styles::report_header(),
            ));
            out.extend(indented(report, styles::report_text()));
            if !sources.is_empty() {
                out.push(TranscriptLine::new("  Sources:", styles::label()));
                for source in sources {
                    out.push(TranscriptLine::new(
                        format!("    • {} ({})", source.title, source.link),
                        styles::value(),
                    ));
                }
            }
            if *degraded > 0 {
                out.push(TranscriptLine::new(
                    format!("  {degraded} source summary(ies) unavailable due to model errors."),
                    styles::warning(),
                ));
            }
        }
        TurnOutcome::FollowUp { response, degraded } => {
            out.push(TranscriptLine::new(
                format!("← {banner} [{}]", turn.model),
                styles::followup_header(),
            ));
            out.extend(indented(response, styles::report_text()));
            if let Some(failure) = degraded {
                out.push(TranscriptLine::new(
                    format!("  Model error: {}", failure.message),
                    styles::warning(),
                ));
            }
        }
        TurnOutcome::NoSearchResults
        | TurnOutcome::NoUsableSummaries
        | TurnOutcome::EmptyQuery => {
            out.push(TranscriptLine::new(format!("! {banner}"), styles::warning()));
        }
        TurnOutcome::SynthesisFailed { .. } | TurnOutcome::ModelUnavailable { .. } => {
            out.push(TranscriptLine::new(format!("× {banner}"), styles::error()));
        }
    }

    out.push(TranscriptLine::blank());
    out
}

pub fn models_lines(menu: &ModelMenu) -> Vec<TranscriptLine> {
    let mut out = vec![TranscriptLine::new("Models:", styles::label())];
    for model in &menu.available {
        if *model == menu.selected {
            out.push(TranscriptLine::new(format!("  * {model}"), styles::value()));
        } else {
            out.push(TranscriptLine::new(format!("    {model}"), styles::dim()));
        }
    }
    out.push(TranscriptLine::blank());
    out
}

pub fn history_lines(history: &[ChatEntry]) -> Vec<TranscriptLine> {
    if history.is_empty() {
        return vec![
            TranscriptLine::new("No questions asked yet.", styles::dim()),
            TranscriptLine::blank(),
        ];
    }
    let mut out = vec![TranscriptLine::new("History:", styles::label())];
    for (i, entry) in history.iter().enumerate() {
        let kind = if entry.is_followup { "follow-up" } else { "report" };
        out.push(TranscriptLine::new(
            format!(
                "  {}. [{}] {} ({kind}, {})",
                i + 1,
                entry.created_at.format("%H:%M:%S"),
                entry.query,
                entry.model
            ),
            styles::value(),
        ));
    }
    out.push(TranscriptLine::blank());
    out
}

pub fn help_lines() -> Vec<TranscriptLine> {
    let rows = [
        ("/model <name>", "switch model for the next question"),
        ("/model", "show the selected model"),
        ("/models", "list configured models"),
        ("/clear", "start a new session"),
        ("/export [dir]", "save the latest report as research_summary.txt"),
        ("/history", "list this session's questions"),
        ("/quit", "exit"),
    ];
    let mut out = vec![TranscriptLine::new("Commands:", styles::label())];
    out.extend(
        rows.iter()
            .map(|(cmd, what)| TranscriptLine::new(format!("  {cmd:<15} {what}"), styles::value())),
    );
    out.push(TranscriptLine::new(
        "Anything else is a research question. Short questions starting with what/why/how/... continue the last report.",
        styles::dim(),
    ));
    out.push(TranscriptLine::blank());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn(outcome: TurnOutcome) -> Turn {
        Turn {
            query: "q".into(),
            model: "gemini-1.5-pro".into(),
            outcome,
        }
    }

    fn texts(lines: &[TranscriptLine]) -> Vec<&str> {
        lines.iter().map(|l| l.text.as_str()).collect()
    }

    #[test]
    fn report_lists_sources_and_degraded_count() {
        let lines = turn_lines(&turn(TurnOutcome::Report {
            report: "Line one.\nLine two.".into(),
            sources: vec![quarry_research::SearchResult {
                title: "Solar".into(),
                link: "https://example.com".into(),
                snippet: String::new(),
            }],
            degraded: 1,
        }));
        let texts = texts(&lines);
        assert_eq!(texts[0], "← Final Research Summary [gemini-1.5-pro]");
        assert_eq!(texts[1], "  Line one.");
        assert_eq!(texts[2], "  Line two.");
        assert!(texts.contains(&"    • Solar (https://example.com)"));
        assert!(texts.iter().any(|t| t.starts_with("  1 source summary")));
        assert_eq!(*texts.last().unwrap(), "");
    }

    #[test]
    fn follow_up_uses_its_own_header() {
        let lines = turn_lines(&turn(TurnOutcome::FollowUp {
            response: "Because.".into(),
            degraded: None,
        }));
        assert_eq!(lines[0].text, "← Follow-Up Response [gemini-1.5-pro]");
        assert_eq!(lines[0].style, styles::followup_header());
    }

    #[test]
    fn failures_render_as_a_single_banner() {
        let lines = turn_lines(&turn(TurnOutcome::NoSearchResults));
        assert_eq!(
            texts(&lines),
            vec!["! No search results found. Try a different query.", ""]
        );
    }

    #[test]
    fn models_mark_the_selection() {
        let lines = models_lines(&ModelMenu {
            selected: "b".into(),
            available: vec!["a".into(), "b".into()],
        });
        assert_eq!(texts(&lines), vec!["Models:", "    a", "  * b", ""]);
    }
}

//! Report rendering
//!
//! Reports are assembled into a format-neutral [`ReportDocument`] and rendered
//! as HTML, plain text or JSON. HTML goes through a small template layer:
//! `{{ key }}` inserts an escaped value, `{{& key }}` inserts pre-rendered
//! markup, and unknown keys render empty.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use repit_common::string_enum;

use crate::model::{LessonSummary, StudentProgress};

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{(&?)\s*([A-Za-z0-9_]+)\s*\}\}").expect("Invalid placeholder pattern")
});

pub const DEFAULT_LAYOUT: &str = r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>{{ title }}</title>
    <style>
        body { font-family: sans-serif; margin: 2em; }
        table { border-collapse: collapse; margin-top: 1em; }
        th, td { border: 1px solid #ccc; padding: 4px 8px; }
    </style>
</head>
<body>
    <div class="header">
        <h1>{{ title }}</h1>
        <p><strong>Period:</strong> {{ period }}</p>
        <p><strong>Generated:</strong> {{ generated_at }}</p>
    </div>
    <div class="metrics">
{{& metrics }}
    </div>
{{& tables }}
{{& notes }}
</body>
</html>
"#;

const METRIC_ROW: &str = "        <p><strong>{{ label }}:</strong> {{ value }}</p>\n";
const TABLE: &str = "    <h2>{{ title }}</h2>\n    <table>\n        <tr>{{& header }}</tr>\n{{& rows }}    </table>\n";
const NOTES: &str = "    <h2>{{ title }}</h2>\n    <ul>\n{{& items }}    </ul>\n";

string_enum! {
    /// Output format of a rendered report
    pub enum ReportFormat {
        Html => "html",
        Text => "text",
        Json => "json",
    }
}

impl ReportFormat {
    pub fn content_type(self) -> &'static str {
        match self {
            ReportFormat::Html => "text/html; charset=utf-8",
            ReportFormat::Text => "text/plain; charset=utf-8",
            ReportFormat::Json => "application/json",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ReportFormat::Html => "html",
            ReportFormat::Text => "txt",
            ReportFormat::Json => "json",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportTable {
    pub title: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Format-neutral report content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportDocument {
    pub report_id: Uuid,
    pub title: String,
    pub period: String,
    pub generated_at: DateTime<Utc>,
    /// Raw metric key and formatted value
    pub metrics: Vec<(String, String)>,
    pub tables: Vec<ReportTable>,
    pub notes: Vec<String>,
    /// Full result, emitted as-is by the JSON format
    pub data: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedReport {
    pub report_id: Uuid,
    pub format: ReportFormat,
    pub content_type: String,
    pub filename: String,
    pub body: String,
}

/// `average_completion_rate` -> `Average Completion Rate`
pub fn humanize_key(key: &str) -> String {
    key.split('_')
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Substitute placeholders in `template`
pub fn render_template(template: &str, values: &HashMap<&str, String>) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures| {
            let raw = &caps[1] == "&";
            match values.get(&caps[2]) {
                Some(value) if raw => value.clone(),
                Some(value) => htmlescape::encode_minimal(value),
                None => String::new(),
            }
        })
        .into_owned()
}

/// Human-readable description of a date range
pub fn describe_period(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> String {
    let day = |d: DateTime<Utc>| d.format("%Y-%m-%d").to_string();
    match (start, end) {
        (None, None) => "All time".to_string(),
        (Some(s), None) => format!("Since {}", day(s)),
        (None, Some(e)) => format!("Until {}", day(e)),
        (Some(s), Some(e)) => format!("{} - {}", day(s), day(e)),
    }
}

fn owned_metrics(metrics: Vec<(&'static str, String)>) -> Vec<(String, String)> {
    metrics
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

impl ReportDocument {
    pub fn lesson_report(
        title: &str,
        period: String,
        summary: &LessonSummary,
    ) -> anyhow::Result<Self> {
        let mut tables = Vec::new();
        if !summary.top_subjects.is_empty() {
            tables.push(ReportTable {
                title: "Top Subjects".to_string(),
                headers: vec!["Subject".into(), "Lessons".into(), "Average Rating".into()],
                rows: summary
                    .top_subjects
                    .iter()
                    .map(|s| vec![s.subject.clone(), s.count.to_string(), format!("{:.2}", s.avg_rating)])
                    .collect(),
            });
        }
        if !summary.performance_trend.is_empty() {
            tables.push(ReportTable {
                title: "Performance Trend".to_string(),
                headers: vec!["Month".into(), "Lessons".into(), "Average Performance".into()],
                rows: summary
                    .performance_trend
                    .iter()
                    .map(|t| {
                        vec![
                            t.period.clone(),
                            t.lesson_count.to_string(),
                            format!("{:.2}", t.average_performance),
                        ]
                    })
                    .collect(),
            });
        }

        Ok(Self {
            report_id: Uuid::new_v4(),
            title: title.to_string(),
            period,
            generated_at: Utc::now(),
            metrics: owned_metrics(summary.headline_metrics()),
            tables,
            notes: Vec::new(),
            data: serde_json::to_value(summary)?,
        })
    }

    pub fn progress_report(progress: &StudentProgress, period: String) -> anyhow::Result<Self> {
        let title = match &progress.subject {
            Some(subject) => format!("Student {} progress in {}", progress.student_id, subject),
            None => format!("Student {} progress", progress.student_id),
        };

        let areas = progress
            .strong_areas
            .iter()
            .map(|a| (a, "strong"))
            .chain(progress.weak_areas.iter().map(|a| (a, "weak")))
            .map(|(a, kind)| {
                vec![
                    a.area.clone(),
                    kind.to_string(),
                    format!("{:.2}", a.avg_performance),
                    a.lesson_count.to_string(),
                ]
            })
            .collect::<Vec<_>>();

        let mut tables = Vec::new();
        if !areas.is_empty() {
            tables.push(ReportTable {
                title: "Subject Areas".to_string(),
                headers: vec![
                    "Subject".into(),
                    "Assessment".into(),
                    "Average Performance".into(),
                    "Lessons".into(),
                ],
                rows: areas,
            });
        }

        Ok(Self {
            report_id: Uuid::new_v4(),
            title,
            period,
            generated_at: Utc::now(),
            metrics: owned_metrics(progress.headline_metrics()),
            tables,
            notes: progress.recommended_focus.clone(),
            data: serde_json::to_value(progress)?,
        })
    }
}

/// Renders report documents into the supported formats
#[derive(Debug, Clone)]
pub struct ReportRenderer {
    layout: String,
}

impl Default for ReportRenderer {
    fn default() -> Self {
        Self {
            layout: DEFAULT_LAYOUT.to_string(),
        }
    }
}

impl ReportRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the HTML page layout
    pub fn with_layout(mut self, layout: impl Into<String>) -> Self {
        self.layout = layout.into();
        self
    }

    pub fn render(
        &self,
        doc: &ReportDocument,
        format: ReportFormat,
    ) -> anyhow::Result<RenderedReport> {
        let body = match format {
            ReportFormat::Html => self.render_html(doc),
            ReportFormat::Text => render_text(doc),
            ReportFormat::Json => serde_json::to_string_pretty(&serde_json::json!({
                "report_id": doc.report_id,
                "title": doc.title,
                "period": doc.period,
                "generated_at": doc.generated_at,
                "data": doc.data,
            }))?,
        };

        Ok(RenderedReport {
            report_id: doc.report_id,
            format,
            content_type: format.content_type().to_string(),
            filename: format!("report_{}.{}", doc.report_id.simple(), format.extension()),
            body,
        })
    }

    fn render_html(&self, doc: &ReportDocument) -> String {
        let metrics: String = doc
            .metrics
            .iter()
            .map(|(key, value)| {
                render_template(
                    METRIC_ROW,
                    &HashMap::from([("label", humanize_key(key)), ("value", value.clone())]),
                )
            })
            .collect();

        let tables: String = doc.tables.iter().map(render_html_table).collect();

        let notes = if doc.notes.is_empty() {
            String::new()
        } else {
            let items: String = doc
                .notes
                .iter()
                .map(|n| format!("        <li>{}</li>\n", htmlescape::encode_minimal(n)))
                .collect();
            render_template(
                NOTES,
                &HashMap::from([("title", "Recommendations".to_string()), ("items", items)]),
            )
        };

        let values = HashMap::from([
            ("title", doc.title.clone()),
            ("period", doc.period.clone()),
            ("generated_at", doc.generated_at.format("%Y-%m-%d %H:%M UTC").to_string()),
            ("metrics", metrics),
            ("tables", tables),
            ("notes", notes),
        ]);
        render_template(&self.layout, &values)
    }
}

fn render_html_table(table: &ReportTable) -> String {
    let cells = |tag: &str, values: &[String]| -> String {
        values
            .iter()
            .map(|v| format!("<{tag}>{}</{tag}>", htmlescape::encode_minimal(v)))
            .collect()
    };
    let rows: String = table
        .rows
        .iter()
        .map(|row| format!("        <tr>{}</tr>\n", cells("td", row)))
        .collect();

    render_template(
        TABLE,
        &HashMap::from([
            ("title", table.title.clone()),
            ("header", cells("th", &table.headers)),
            ("rows", rows),
        ]),
    )
}

fn render_text(doc: &ReportDocument) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", doc.title);
    let _ = writeln!(out, "{}", "=".repeat(doc.title.chars().count()));
    let _ = writeln!(out, "Period: {}", doc.period);
    let _ = writeln!(out, "Generated: {}", doc.generated_at.format("%Y-%m-%d %H:%M UTC"));

    if !doc.metrics.is_empty() {
        out.push('\n');
        for (key, value) in &doc.metrics {
            let _ = writeln!(out, "{}: {}", humanize_key(key), value);
        }
    }
    for table in &doc.tables {
        let _ = writeln!(out, "\n{}", table.title);
        let _ = writeln!(out, "{}", table.headers.join(" | "));
        for row in &table.rows {
            let _ = writeln!(out, "{}", row.join(" | "));
        }
    }
    if !doc.notes.is_empty() {
        let _ = writeln!(out, "\nRecommendations");
        for note in &doc.notes {
            let _ = writeln!(out, "- {}", note);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SubjectCount;

    fn summary() -> LessonSummary {
        LessonSummary {
            total_lessons: 4,
            completed_lessons: 3,
            average_duration: 55.5,
            attendance_rate: 75.0,
            top_subjects: vec![SubjectCount {
                subject: "R&D <intro>".to_string(),
                count: 4,
                avg_rating: 4.5,
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_humanize_key() {
        assert_eq!(humanize_key("average_completion_rate"), "Average Completion Rate");
        assert_eq!(humanize_key("total"), "Total");
        assert_eq!(humanize_key("__x__y"), "X Y");
    }

    #[test]
    fn test_render_template_escapes_values() {
        let values = HashMap::from([
            ("name", "<b>Tom & Jerry</b>".to_string()),
            ("html", "<i>ok</i>".to_string()),
        ]);
        assert_eq!(
            render_template("{{ name }}|{{&html}}|{{ missing }}", &values),
            "&lt;b&gt;Tom &amp; Jerry&lt;/b&gt;|<i>ok</i>|"
        );
    }

    #[test]
    fn test_describe_period() {
        assert_eq!(describe_period(None, None), "All time");
        let d = chrono::TimeZone::with_ymd_and_hms(&Utc, 2024, 3, 1, 0, 0, 0).unwrap();
        assert_eq!(describe_period(Some(d), None), "Since 2024-03-01");
        assert_eq!(describe_period(Some(d), Some(d)), "2024-03-01 - 2024-03-01");
    }

    #[test]
    fn test_render_html() {
        let doc = ReportDocument::lesson_report("Lessons", "All time".into(), &summary()).unwrap();
        let report = ReportRenderer::new().render(&doc, ReportFormat::Html).unwrap();

        assert_eq!(report.content_type, "text/html; charset=utf-8");
        assert!(report.filename.ends_with(".html"));
        assert!(report.body.contains("<title>Lessons</title>"));
        assert!(report.body.contains("<strong>Average Duration:</strong> 55.50"));
        assert!(report.body.contains("<td>R&amp;D &lt;intro&gt;</td>"));
        assert!(!report.body.contains("{{"));
    }

    #[test]
    fn test_render_text() {
        let doc = ReportDocument::lesson_report("Lessons", "All time".into(), &summary()).unwrap();
        let report = ReportRenderer::new().render(&doc, ReportFormat::Text).unwrap();

        assert!(report.body.starts_with("Lessons\n=======\n"));
        assert!(report.body.contains("Attendance Rate: 75.00"));
        assert!(report.body.contains("R&D <intro> | 4 | 4.50"));
    }

    #[test]
    fn test_render_json() {
        let doc = ReportDocument::lesson_report("Lessons", "All time".into(), &summary()).unwrap();
        let report = ReportRenderer::new().render(&doc, ReportFormat::Json).unwrap();

        let value: serde_json::Value = serde_json::from_str(&report.body).unwrap();
        assert_eq!(value["title"], "Lessons");
        assert_eq!(value["data"]["total_lessons"], 4);
        assert_eq!(value["report_id"], doc.report_id.to_string());
    }

    #[test]
    fn test_custom_layout() {
        let doc = ReportDocument::lesson_report("Q1", "All time".into(), &summary()).unwrap();
        let report = ReportRenderer::new()
            .with_layout("<h1>{{ title }}</h1><footer>{{ author }}</footer>")
            .render(&doc, ReportFormat::Html)
            .unwrap();
        assert_eq!(report.body, "<h1>Q1</h1><footer></footer>");
    }
}

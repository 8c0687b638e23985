use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::pipeline::AnalysisOutcome;

const TEMPLATE: &str = include_str!("../templates/index.html");
const NEUTRAL_BACKGROUND: &str = "#FFFFFF";

/// Unreserved characters stay as-is inside a URL path segment.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// What the single page shows below the form.
pub enum Page<'a> {
    Form,
    Error(&'a str),
    Result(&'a AnalysisOutcome),
}

impl Page<'_> {
    pub fn render(&self) -> String {
        let (error, result, theme) = match self {
            Page::Form => (String::new(), String::new(), NEUTRAL_BACKGROUND),
            Page::Error(msg) => (
                format!("  <div class=\"error\">{}</div>", escape(msg)),
                String::new(),
                NEUTRAL_BACKGROUND,
            ),
            Page::Result(outcome) => (
                String::new(),
                result_card(outcome),
                outcome.result.emotion.theme_color(),
            ),
        };

        TEMPLATE
            .replace("{{theme_color}}", theme)
            .replace("{{error}}", &error)
            .replace("{{result}}", &result)
    }
}

fn result_card(outcome: &AnalysisOutcome) -> String {
    let emotion = outcome.result.emotion;
    format!(
        r#"  <section class="result">
    <h2>{emoji} {label}</h2>
    <img src="/static/{image}" alt="Analyzed image">
    <dl>
      <dt>Confidence</dt><dd>{confidence:.2}%</dd>
      <dt>Quote</dt><dd>{quote}</dd>
      <dt>Tip</dt><dd>{tip}</dd>
    </dl>
    <p><a href="/static/{report}" download>Download session report (PDF)</a></p>
  </section>"#,
        emoji = emotion.emoji(),
        label = emotion.label(),
        image = escape(&static_url(&outcome.asset.relative_path())),
        confidence = outcome.result.confidence,
        quote = escape(emotion.quote()),
        tip = escape(emotion.tip()),
        report = escape(&static_url(&outcome.report.filename)),
    )
}

/// Percent-encodes each `/`-separated segment of a path under `/static`.
fn static_url(relative: &str) -> String {
    relative
        .split('/')
        .map(|seg| utf8_percent_encode(seg, SEGMENT).to_string())
        .collect::<Vec<_>>()
        .join("/")
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

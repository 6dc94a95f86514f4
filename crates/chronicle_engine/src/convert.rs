/// Turns imported source text into Markdown.
pub trait Converter: Send + Sync {
    fn to_markdown(&self, source: &str) -> String;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Html2MdConverter;

impl Converter for Html2MdConverter {
    fn to_markdown(&self, html: &str) -> String {
        let markdown = html2md::parse_html(html);
        collapse_blank_runs(markdown.trim())
    }
}

/// Plain text with a light touch: a short line that opens a paragraph and
/// reads like a heading (no trailing period, no colon) becomes `# line`.
/// Everything else is kept verbatim.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainTextConverter;

const HEADING_MAX_CHARS: usize = 50;

impl Converter for PlainTextConverter {
    fn to_markdown(&self, text: &str) -> String {
        let lines: Vec<&str> = text.lines().collect();
        let mut out = Vec::with_capacity(lines.len());
        for (index, line) in lines.iter().enumerate() {
            if line.trim().is_empty() {
                out.push(String::new());
                continue;
            }
            let opens_paragraph = index == 0 || lines[index - 1].trim().is_empty();
            let looks_like_heading = line.chars().count() < HEADING_MAX_CHARS
                && !line.ends_with('.')
                && !line.contains(':');
            if opens_paragraph && looks_like_heading {
                out.push(format!("# {line}"));
            } else {
                out.push((*line).to_string());
            }
        }
        out.join("\n")
    }
}

fn collapse_blank_runs(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut blank_run = 0;
    for line in text.lines() {
        if line.trim().is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out.trim_end().to_string()
}

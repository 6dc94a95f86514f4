//! Frontmatter generation and parsing for `.md`/`.mdx` posts.
//!
//! Generation writes the fixed field order the site templates expect.
//! Parsing goes through `serde_yaml_ng`, so anything a hand-edited post can
//! express in YAML is accepted.
use serde::{Deserialize, Deserializer};
use thiserror::Error;

use crate::era::{deserialize_overrides, EraOverride};
use crate::post::Post;
use crate::timeline::BannerData;

#[derive(Debug, Error)]
pub enum FrontmatterError {
    #[error("invalid frontmatter: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

/// Metadata block of a post. Unknown keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Frontmatter {
    #[serde(deserialize_with = "lenient_text")]
    pub title: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub description: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub slug: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub published: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub updated: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub image: Option<String>,
    #[serde(deserialize_with = "deserialize_tags")]
    pub tags: Vec<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub category: Option<String>,
    pub draft: Option<bool>,
    pub avatar_image: Option<String>,
    pub author_name: Option<String>,
    pub author_bio: Option<String>,
    pub show_image_on_post: Option<bool>,
    pub lang: Option<String>,
    pub banner_image: Option<String>,
    #[serde(deserialize_with = "lenient_year")]
    pub timeline_year: Option<i64>,
    pub timeline_era: Option<String>,
    pub timeline_location: Option<String>,
    pub is_key_event: Option<bool>,
    #[serde(deserialize_with = "lenient_year")]
    pub y_index: Option<i64>,
    pub banner_type: Option<String>,
    pub banner_data: Option<FrontmatterBanner>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FrontmatterBanner {
    pub video_id: Option<String>,
    pub image: Option<String>,
    pub image_url: Option<String>,
    pub category: Option<String>,
    #[serde(deserialize_with = "lenient_year")]
    pub start_year: Option<i64>,
    #[serde(deserialize_with = "lenient_year")]
    pub end_year: Option<i64>,
    pub background: Option<String>,
    #[serde(deserialize_with = "deserialize_overrides")]
    pub era_config: Vec<EraOverride>,
}

impl FrontmatterBanner {
    pub fn image(&self) -> Option<&str> {
        self.image.as_deref().or(self.image_url.as_deref())
    }

    pub fn to_timeline_banner(&self) -> BannerData {
        BannerData {
            category: self.category.clone(),
            start_year: self.start_year,
            end_year: self.end_year,
            background: self.background.clone(),
            era_config: self.era_config.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedDocument {
    pub frontmatter: Frontmatter,
    pub body: String,
    pub has_frontmatter: bool,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl Scalar {
    fn into_text(self) -> String {
        match self {
            Scalar::Text(text) => text,
            Scalar::Int(value) => value.to_string(),
            Scalar::Float(value) => value.to_string(),
            Scalar::Bool(value) => value.to_string(),
        }
    }
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Scalar>::deserialize(deserializer)?.map(Scalar::into_text))
}

fn lenient_year<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Scalar>::deserialize(deserializer)? {
        Some(Scalar::Int(value)) => Some(value),
        Some(Scalar::Float(value)) => Some(value.trunc() as i64),
        Some(Scalar::Text(text)) => text.trim().parse().ok(),
        Some(Scalar::Bool(_)) | None => None,
    })
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TagsField {
    List(Vec<Scalar>),
    Text(String),
}

fn deserialize_tags<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<TagsField>::deserialize(deserializer)? {
        Some(TagsField::List(items)) => items
            .into_iter()
            .map(|item| item.into_text().trim().to_string())
            .filter(|tag| !tag.is_empty())
            .collect(),
        Some(TagsField::Text(text)) => crate::post::parse_tags(&text),
        None => Vec::new(),
    })
}

/// Splits a leading `---` block from `text` and parses it.
///
/// A document without a frontmatter block yields empty frontmatter and the
/// whole text as body.
pub fn parse_document(text: &str) -> Result<ParsedDocument, FrontmatterError> {
    let normalized = text.replace("\r\n", "\n");
    let normalized = normalized.trim_start_matches('\u{feff}');
    let Some((yaml, body)) = split_frontmatter(normalized) else {
        return Ok(ParsedDocument {
            frontmatter: Frontmatter::default(),
            body: normalized.to_string(),
            has_frontmatter: false,
        });
    };
    let frontmatter = if yaml.trim().is_empty() {
        Frontmatter::default()
    } else {
        serde_yaml_ng::from_str(yaml)?
    };
    Ok(ParsedDocument {
        frontmatter,
        body: body.trim().to_string(),
        has_frontmatter: true,
    })
}

pub(crate) fn split_frontmatter(text: &str) -> Option<(&str, &str)> {
    let rest = text.strip_prefix("---\n")?;
    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == "---" {
            return Some((&rest[..offset], &rest[offset + line.len()..]));
        }
        offset += line.len();
    }
    None
}

/// YAML double-quoted scalar. JSON string escaping is a subset of YAML's.
fn quote(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| format!("\"{}\"", value.replace('"', "'")))
}

/// Dates are written bare when they are plain tokens, as the site expects.
fn date_value(value: &str) -> String {
    let bare = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | ':' | '.' | '+'));
    if bare {
        value.to_string()
    } else {
        quote(value)
    }
}

/// Renders the frontmatter block of `post`, fences included, without a
/// trailing newline.
pub fn generate(post: &Post) -> String {
    let mut lines = vec!["---".to_string()];
    lines.push(format!("title: {}", quote(&post.title)));
    lines.push(format!("published: {}", date_value(&post.published)));
    lines.push(format!("description: {}", quote(&post.description)));
    if !post.image.is_empty() {
        lines.push(format!("image: {}", quote(&post.image)));
    }
    if !post.tags.is_empty() {
        let tags: Vec<String> = post.tags.iter().map(|tag| quote(tag)).collect();
        lines.push(format!("tags: [{}]", tags.join(", ")));
    }
    if !post.category.is_empty() {
        lines.push(format!("category: {}", quote(&post.category)));
    }
    lines.push(format!("draft: {}", post.draft));

    if post.show_advanced_options {
        let advanced = &post.advanced;
        if !advanced.avatar_image.is_empty() {
            lines.push(format!("avatarImage: {}", quote(&advanced.avatar_image)));
        }
        if !advanced.author_name.is_empty() {
            lines.push(format!("authorName: {}", quote(&advanced.author_name)));
        }
        if !advanced.author_bio.is_empty() {
            lines.push(format!("authorBio: {}", quote(&advanced.author_bio)));
        }
        lines.push(format!("showImageOnPost: {}", advanced.show_image_on_post));
        if !advanced.lang.is_empty() {
            lines.push(format!("lang: {}", quote(&advanced.lang)));
        }
    }

    if post.timeline.enabled {
        let timeline = &post.timeline;
        if let Some(year) = timeline.year {
            lines.push(format!("timelineYear: {year}"));
        }
        lines.push(format!("timelineEra: {}", quote(&timeline.era)));
        lines.push(format!("timelineLocation: {}", quote(&timeline.location)));
        lines.push(format!("isKeyEvent: {}", timeline.is_key_event));
    }

    let banner = &post.banner;
    if !banner.kind.is_empty() {
        lines.push(format!("bannerType: {}", quote(&banner.kind)));
        let data = match banner.kind.as_str() {
            "image" if !post.advanced.banner_image.is_empty() => {
                Some(("image", &post.advanced.banner_image))
            }
            "video" if !banner.video_id.is_empty() => Some(("videoId", &banner.video_id)),
            "timeline" if !banner.timeline_category.is_empty() => {
                Some(("category", &banner.timeline_category))
            }
            _ => None,
        };
        if let Some((key, value)) = data {
            lines.push("bannerData:".to_string());
            lines.push(format!("  {key}: {}", quote(value)));
        }
    }

    lines.push("---".to_string());
    lines.join("\n")
}

/// Full file text: frontmatter, a blank line, then the body.
pub fn build_document(post: &Post) -> String {
    format!("{}\n\n{}", generate(post), post.content)
}

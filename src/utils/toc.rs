use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct TocItem {
    pub id: String,
    pub title: String,
    pub level: u8,
}

static HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(#{2,3})[ \t]+(.+?)[ \t#]*$").expect("static regex"));
static LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!?\[([^\]]*)\]\([^)]*\)").expect("static regex"));

/// GitHub-style heading anchors; repeated slugs get `-1`, `-2`...
#[derive(Default)]
struct Slugger {
    seen: HashMap<String, usize>,
}

impl Slugger {
    fn slug(&mut self, title: &str) -> String {
        let base: String = title
            .to_lowercase()
            .chars()
            .filter_map(|c| match c {
                ' ' => Some('-'),
                '-' | '_' => Some(c),
                c if c.is_alphanumeric() => Some(c),
                _ => None,
            })
            .collect();

        let mut slug = base.clone();
        while let Some(count) = self.seen.get_mut(&slug) {
            *count += 1;
            slug = format!("{base}-{count}");
        }
        self.seen.insert(slug.clone(), 0);
        slug
    }
}

fn plain_text(raw: &str) -> String {
    let unlinked = LINK_RE.replace_all(raw, "$1");
    unlinked
        .chars()
        .filter(|c| !matches!(c, '*' | '`' | '~'))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Level 2 and 3 headings of a markdown/MDX body, skipping fenced code.
pub fn extract_toc(body: &str) -> Vec<TocItem> {
    let mut slugger = Slugger::default();
    let mut items = Vec::new();
    let mut in_fence = false;

    for line in body.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }
        let Some(caps) = HEADING_RE.captures(trimmed) else {
            continue;
        };
        let title = plain_text(&caps[2]);
        if title.is_empty() {
            continue;
        }
        items.push(TocItem {
            id: slugger.slug(&title),
            level: caps[1].len() as u8,
            title,
        });
    }

    items
}

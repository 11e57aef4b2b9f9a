//! Timeline widget data.
//!
//! A post's timeline shows the entities it references that carry a start and
//! an end date. The payload follows the TimelineJS `{"timeline": ...}` JSON
//! model; the shortcode renders the container the widget script fills in.

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::relations::RelationshipIndex;
use crate::store::{ContentStore, Post, PostId, PostKind, SiteLinks, StoreResult, meta};

/// Stored format of the calendar date metas.
const META_DATE_FORMAT: &str = "%Y-%m-%d";
/// Date format expected by the widget.
const WIDGET_DATE_FORMAT: &str = "%Y,%m,%d";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimelineAsset {
    pub media: String,
}

/// One slide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineDate {
    pub start_date: String,
    pub end_date: String,
    pub headline: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset: Option<TimelineAsset>,
}

#[derive(Debug, Serialize)]
struct TimelineBody {
    #[serde(rename = "type")]
    kind: &'static str,
    date: Vec<TimelineDate>,
}

#[derive(Debug, Serialize)]
struct TimelineDocument {
    timeline: TimelineBody,
    #[serde(rename = "startAtSlide")]
    start_at_slide: usize,
}

/// Shortcode attributes, with the widget's defaults.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TimelineAttrs {
    pub width: String,
    pub height: String,
    pub main_color: String,
}

impl Default for TimelineAttrs {
    fn default() -> Self {
        Self {
            width: "100%".into(),
            height: "600px".into(),
            main_color: "#aaa".into(),
        }
    }
}

pub struct Timeline<'a> {
    store: &'a dyn ContentStore,
    links: &'a SiteLinks,
}

impl<'a> Timeline<'a> {
    pub fn new(store: &'a dyn ContentStore, links: &'a SiteLinks) -> Self {
        Self { store, links }
    }

    /// Dated entities referenced by `post_id`, newest published first.
    ///
    /// Without a post there is no timeline.
    pub fn events_for(&self, post_id: Option<PostId>) -> StoreResult<Vec<Post>> {
        let Some(post_id) = post_id else {
            return Ok(Vec::new());
        };

        let mut events = Vec::new();
        for entity_id in RelationshipIndex::new(self.store).related_entities(post_id)? {
            let Some(entity) = self.store.post(entity_id)? else {
                continue;
            };
            if entity.kind != PostKind::Entity {
                continue;
            }
            let dated = self.store.meta_text(entity_id, meta::CAL_DATE_START)?.is_some()
                && self.store.meta_text(entity_id, meta::CAL_DATE_END)?.is_some();
            if dated {
                events.push(entity);
            }
        }
        events.sort_by(|a, b| b.published.cmp(&a.published).then(b.id.cmp(&a.id)));
        tracing::debug!(post_id, count = events.len(), "timeline events");
        Ok(events)
    }

    /// Widget JSON for `events`. `today` picks the opening slide: the first
    /// event whose range contains it, else the first event.
    pub fn to_json(&self, events: &[Post], today: NaiveDate) -> StoreResult<String> {
        if events.is_empty() {
            return Ok(serde_json::Value::String(String::new()).to_string());
        }

        let mut dates = Vec::with_capacity(events.len());
        let mut start_at_slide = None;
        for event in events {
            let Some((start, end)) = self.event_range(event.id)? else {
                continue;
            };
            if start_at_slide.is_none() && start <= today && today <= end {
                start_at_slide = Some(dates.len());
            }
            dates.push(TimelineDate {
                start_date: start.format(WIDGET_DATE_FORMAT).to_string(),
                end_date: end.format(WIDGET_DATE_FORMAT).to_string(),
                headline: format!(
                    "<a href=\"{}\">{}</a>",
                    self.links.permalink(event.id),
                    event.title
                ),
                text: event.content.clone(),
                asset: self.thumbnail_asset(event)?,
            });
        }

        let document = TimelineDocument {
            timeline: TimelineBody {
                kind: "default",
                date: dates,
            },
            start_at_slide: start_at_slide.unwrap_or(0),
        };
        serde_json::to_string(&document).map_err(|e| StoreError::Serialization {
            message: e.to_string(),
        })
    }

    /// Response body of the timeline endpoint, dated against the local clock.
    pub fn ajax_response(&self, post_id: Option<PostId>) -> StoreResult<String> {
        let events = self.events_for(post_id)?;
        self.to_json(&events, Local::now().date_naive())
    }

    fn event_range(&self, entity_id: PostId) -> StoreResult<Option<(NaiveDate, NaiveDate)>> {
        let start = self.store.meta_text(entity_id, meta::CAL_DATE_START)?;
        let end = self.store.meta_text(entity_id, meta::CAL_DATE_END)?;
        let (Some(start), Some(end)) = (start, end) else {
            return Ok(None);
        };
        match (
            NaiveDate::parse_from_str(&start, META_DATE_FORMAT),
            NaiveDate::parse_from_str(&end, META_DATE_FORMAT),
        ) {
            (Ok(start), Ok(end)) => Ok(Some((start, end))),
            _ => {
                tracing::warn!(entity_id, %start, %end, "unparseable event dates, skipping");
                Ok(None)
            }
        }
    }

    fn thumbnail_asset(&self, event: &Post) -> StoreResult<Option<TimelineAsset>> {
        let Some(thumbnail_id) = event.thumbnail else {
            return Ok(None);
        };
        Ok(self
            .store
            .post(thumbnail_id)?
            .filter(|p| p.kind == PostKind::Attachment)
            .and_then(|p| p.source_url)
            .filter(|url| !url.is_empty())
            .map(|media| TimelineAsset { media }))
    }
}

/// Container markup for the `wl-timeline` shortcode.
pub fn shortcode_html(post_id: PostId, attrs: &TimelineAttrs) -> String {
    let id = escape_attr(&format!("wl-timeline-{post_id}"));
    let width = escape_attr(&attrs.width);
    let height = escape_attr(&attrs.height);
    let color = escape_attr(&attrs.main_color);
    format!(
        "<div class=\"wl-timeline\" id=\"{id}\" data-post-id=\"{post_id}\" data-depth=\"2\"\n    \
         data-main-color=\"{color}\"\n    \
         style=\"width:{width};height:{height};background-color:{color};margin-top:10px;margin-bottom:10px\">\n\
         </div>"
    )
}

fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            c => out.push(c),
        }
    }
    out
}

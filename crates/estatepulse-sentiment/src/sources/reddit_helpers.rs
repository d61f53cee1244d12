//! Reddit query building and listing-to-mention conversion.

use chrono::{DateTime, Utc};
use estatepulse_core::{CollectedMention, Engagement, SourceKind};

use super::reddit::ThingData;

/// Comments this short rarely carry an opinion.
const MIN_COMMENT_CHARS: usize = 20;

pub(super) fn search_query(location: &str) -> String {
    format!("{location} real estate property")
}

fn timestamp(created_utc: Option<f64>) -> Option<DateTime<Utc>> {
    #[allow(clippy::cast_possible_truncation)]
    created_utc.and_then(|secs| DateTime::from_timestamp(secs as i64, 0))
}

fn usable(text: &str) -> bool {
    !text.is_empty() && text != "[deleted]" && text != "[removed]"
}

fn author(data: &ThingData) -> Option<String> {
    data.author
        .as_deref()
        .filter(|a| usable(a))
        .map(str::to_string)
}

/// A post becomes one mention: `"{title} {selftext}"`.
pub(super) fn post_to_mention(data: &ThingData) -> Option<CollectedMention> {
    let title = data.title.as_deref().map(str::trim).unwrap_or_default();
    let body = data
        .selftext
        .as_deref()
        .map(str::trim)
        .filter(|b| usable(b))
        .unwrap_or_default();
    let text = format!("{title} {body}").trim().to_string();
    if text.is_empty() || data.id.is_empty() {
        return None;
    }

    Some(CollectedMention {
        source: SourceKind::Reddit,
        external_id: data.name.clone().unwrap_or_else(|| format!("t3_{}", data.id)),
        author: author(data),
        url: data
            .permalink
            .as_ref()
            .map(|p| format!("https://reddit.com{p}")),
        text,
        engagement: Engagement {
            likes: data.score,
            comments: data.num_comments,
            shares: None,
        },
        published_at: timestamp(data.created_utc),
    })
}

/// A comment becomes a mention when its body is longer than 20 characters
/// and not deleted or removed. Falls back to the post URL for the link.
pub(super) fn comment_to_mention(
    data: &ThingData,
    post_url: Option<&str>,
) -> Option<CollectedMention> {
    let body = data.body.as_deref().map(str::trim).filter(|b| usable(b))?;
    if body.chars().count() <= MIN_COMMENT_CHARS || data.id.is_empty() {
        return None;
    }

    Some(CollectedMention {
        source: SourceKind::Reddit,
        external_id: data.name.clone().unwrap_or_else(|| format!("t1_{}", data.id)),
        author: author(data),
        url: data
            .permalink
            .as_ref()
            .map(|p| format!("https://reddit.com{p}"))
            .or_else(|| post_url.map(str::to_string)),
        text: body.to_string(),
        engagement: Engagement {
            likes: data.score,
            comments: None,
            shares: None,
        },
        published_at: timestamp(data.created_utc),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thing(id: &str) -> ThingData {
        ThingData {
            id: id.to_string(),
            ..ThingData::default()
        }
    }

    #[test]
    fn query_appends_real_estate_terms() {
        assert_eq!(search_query("Kondapur"), "Kondapur real estate property");
    }

    #[test]
    fn post_joins_title_and_selftext() {
        let mut data = thing("abc");
        data.title = Some("Buying in Kondapur?".to_string());
        data.selftext = Some("Looking at 3BHK options.".to_string());
        data.permalink = Some("/r/hyderabad/comments/abc/x/".to_string());
        data.score = Some(12);
        data.num_comments = Some(4);
        data.created_utc = Some(1_700_000_000.0);
        data.author = Some("[deleted]".to_string());

        let m = post_to_mention(&data).unwrap();
        assert_eq!(m.external_id, "t3_abc");
        assert_eq!(m.text, "Buying in Kondapur? Looking at 3BHK options.");
        assert_eq!(
            m.url.as_deref(),
            Some("https://reddit.com/r/hyderabad/comments/abc/x/")
        );
        assert_eq!(m.engagement.likes, Some(12));
        assert_eq!(m.engagement.comments, Some(4));
        assert!(m.author.is_none());
        assert_eq!(m.published_at.unwrap().timestamp(), 1_700_000_000);
    }

    #[test]
    fn removed_selftext_keeps_title_only() {
        let mut data = thing("abc");
        data.title = Some("Title only".to_string());
        data.selftext = Some("[removed]".to_string());
        assert_eq!(post_to_mention(&data).unwrap().text, "Title only");
    }

    #[test]
    fn short_and_deleted_comments_are_dropped() {
        let mut short = thing("c1");
        short.body = Some("Nice area".to_string());
        assert!(comment_to_mention(&short, None).is_none());

        let mut deleted = thing("c2");
        deleted.body = Some("[deleted]".to_string());
        assert!(comment_to_mention(&deleted, None).is_none());

        let mut good = thing("c3");
        good.name = Some("t1_c3".to_string());
        good.body = Some("Prices went up a lot after the metro line opened.".to_string());
        let m = comment_to_mention(&good, Some("https://reddit.com/r/x/comments/abc/")).unwrap();
        assert_eq!(m.external_id, "t1_c3");
        assert_eq!(m.url.as_deref(), Some("https://reddit.com/r/x/comments/abc/"));
    }
}

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One page of a Pinterest listing. `bookmark` is the cursor for the next page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub bookmark: Option<String>,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            bookmark: self.bookmark.filter(|b| !b.is_empty()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Board {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub pin_count: Option<u64>,
    pub image_url: Option<String>,
}

/// The parts of a pin the importer needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PinSummary {
    pub id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub link: Option<String>,
    pub image_url: Option<String>,
    pub board_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UserAccount {
    pub username: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawBoard {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub description: Option<String>,
    pub pin_count: Option<u64>,
    pub media: Option<RawBoardMedia>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawBoardMedia {
    pub image_cover_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawPin {
    pub id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub link: Option<String>,
    pub board_id: Option<String>,
    pub media: Option<RawPinMedia>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawPinMedia {
    #[serde(default)]
    pub images: HashMap<String, RawImage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawImage {
    pub url: Option<String>,
}

// largest first
const IMAGE_SIZES: &[&str] = &["originals", "1200x", "600x", "400x300", "150x150"];

fn non_empty(s: Option<String>) -> Option<String> {
    s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

impl From<RawBoard> for Board {
    fn from(raw: RawBoard) -> Self {
        Board {
            id: raw.id,
            name: raw.name,
            description: non_empty(raw.description),
            pin_count: raw.pin_count,
            image_url: raw.media.and_then(|m| non_empty(m.image_cover_url)),
        }
    }
}

impl From<RawPin> for PinSummary {
    fn from(raw: RawPin) -> Self {
        let image_url = raw.media.and_then(|mut media| {
            IMAGE_SIZES
                .iter()
                .find_map(|size| media.images.remove(*size).and_then(|i| non_empty(i.url)))
        });
        PinSummary {
            id: raw.id,
            title: non_empty(raw.title),
            description: non_empty(raw.description),
            link: non_empty(raw.link),
            image_url,
            board_id: raw.board_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn pin_prefers_largest_image_and_drops_blank_fields() {
        let raw: RawPin = serde_json::from_value(json!({
            "id": "42",
            "title": "  ",
            "description": "Weeknight pasta",
            "link": "https://example.com/pasta",
            "board_id": "7",
            "media": {"media_type": "image", "images": {
                "150x150": {"url": "https://i/small.jpg", "width": 150},
                "1200x": {"url": "https://i/large.jpg"}
            }}
        }))
        .unwrap();
        let pin = PinSummary::from(raw);
        assert_eq!(pin.title, None);
        assert_eq!(pin.description.as_deref(), Some("Weeknight pasta"));
        assert_eq!(pin.image_url.as_deref(), Some("https://i/large.jpg"));
    }

    #[test]
    fn page_map_drops_empty_bookmark() {
        let page = Page {
            items: vec![1, 2],
            bookmark: Some(String::new()),
        };
        let mapped = page.map(|n| n * 10);
        assert_eq!(mapped.items, vec![10, 20]);
        assert_eq!(mapped.bookmark, None);
    }
}

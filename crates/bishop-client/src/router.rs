//! Service routing.
//!
//! Each [`Service`] maps to one backend endpoint through [`SERVICE_SPECS`].
//! Tiles on the home screen either open a two-step prompt (devotional,
//! verse explanation) or start a chat right away with a synthesized message.

use bishop_session::Service;

/// Endpoint, request shape and UI text for one service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceSpec {
    pub service: Service,
    pub path: &'static str,
    /// JSON field carrying the user's text in the request body.
    pub request_field: &'static str,
    /// JSON field carrying the reply text in the response body.
    pub response_field: &'static str,
    /// Assistant message shown before the first send. `None` for plain chat.
    pub prompt: Option<&'static str>,
    pub placeholder: &'static str,
}

pub const SERVICE_SPECS: [ServiceSpec; 3] = [
    ServiceSpec {
        service: Service::Chat,
        path: "/api/ai/my-story",
        request_field: "message",
        response_field: "response",
        prompt: None,
        placeholder: "Start a new chat...",
    },
    ServiceSpec {
        service: Service::Devotional,
        path: "/api/ai/daily-devotional",
        request_field: "story",
        response_field: "devotional",
        prompt: Some(
            "I see you want a devotional. Please provide the Bible story or topic for the devotional.",
        ),
        placeholder: "Enter a story for the devotional...",
    },
    ServiceSpec {
        service: Service::ExplainVerse,
        path: "/api/ai/explain-verse",
        request_field: "verse",
        response_field: "explanation",
        prompt: Some(
            "I can help with that. Please provide the Bible verse you would like me to explain.",
        ),
        placeholder: "Enter a verse to explain...",
    },
];

/// Endpoint and wording for a service.
pub fn service_spec(service: Service) -> &'static ServiceSpec {
    match service {
        Service::Chat => &SERVICE_SPECS[0],
        Service::Devotional => &SERVICE_SPECS[1],
        Service::ExplainVerse => &SERVICE_SPECS[2],
    }
}

/// A tappable service tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceTile {
    pub key: &'static str,
    pub label: &'static str,
    pub icon: &'static str,
    /// Service the tile opens with a prompt; `None` starts a chat immediately.
    pub service: Option<Service>,
}

pub const TILES: [ServiceTile; 4] = [
    ServiceTile {
        key: "prayers",
        label: "Daily Prayers & Devotionals",
        icon: "🙏",
        service: Some(Service::Devotional),
    },
    ServiceTile {
        key: "advice",
        label: "Christian Life Advice",
        icon: "🙂",
        service: None,
    },
    ServiceTile {
        key: "bibleStudy",
        label: "Bible Study Tools (Adults & Kids)",
        icon: "📖",
        service: Some(Service::ExplainVerse),
    },
    ServiceTile {
        key: "motivation",
        label: "Motivational Messages & Blessings",
        icon: "🌅",
        service: None,
    },
];

/// What tapping a tile does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TileAction {
    /// Open a session of `service` holding only the assistant prompt; wait for input.
    Prompt {
        service: Service,
        prompt: &'static str,
    },
    /// Open a chat session seeded with `message` and send it now.
    StartChat { message: String },
}

/// Route a tile label to its action. Unknown labels are treated as chat topics.
pub fn route_tile(label: &str) -> TileAction {
    let prompted = TILES
        .iter()
        .filter(|tile| tile.label == label)
        .find_map(|tile| tile.service)
        .and_then(|service| service_spec(service).prompt.map(|prompt| (service, prompt)));

    match prompted {
        Some((service, prompt)) => TileAction::Prompt { service, prompt },
        None => TileAction::StartChat {
            message: format!("I want to chat about {}.", label),
        },
    }
}

//! Static content for the kids' corner and the service landing pages.

/// A tab on the kids' corner page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KidsTab {
    pub key: &'static str,
    pub label: &'static str,
    pub heading: &'static str,
    pub body: &'static str,
}

pub const KIDS_TABS: [KidsTab; 7] = [
    KidsTab {
        key: "stories",
        label: "Stories",
        heading: "Bible Stories",
        body: "Fun and simple Bible stories for kids will appear here!",
    },
    KidsTab {
        key: "games",
        label: "Games",
        heading: "Games",
        body: "Play Christian games and puzzles here soon!",
    },
    KidsTab {
        key: "quizzes",
        label: "Quizzes",
        heading: "Quizzes",
        body: "Test your Bible knowledge with fun quizzes!",
    },
    KidsTab {
        key: "coloring",
        label: "Coloring",
        heading: "Coloring",
        body: "Download and color Bible-themed pictures!",
    },
    KidsTab {
        key: "songs",
        label: "Songs",
        heading: "Songs",
        body: "Sing along to Christian kids' songs and worship music!",
    },
    KidsTab {
        key: "characters",
        label: "Characters",
        heading: "Bible Characters",
        body: "Meet famous Bible characters and learn about them!",
    },
    KidsTab {
        key: "prayer",
        label: "Prayer Wall",
        heading: "Prayer Wall",
        body: "Send a prayer or blessing, and see prayers from other kids!",
    },
];

pub const KIDS_FOOTER: &str = "Jesus loves you!";

/// A service landing page, addressed by its route key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServicePage {
    pub key: &'static str,
    pub name: &'static str,
    pub icon: &'static str,
    pub title: &'static str,
    pub description: &'static str,
}

impl ServicePage {
    pub fn start_chat_hint(&self) -> String {
        format!(
            "Press Enter to start a chat about {}.",
            self.title.to_lowercase()
        )
    }
}

pub const SERVICE_PAGES: [ServicePage; 5] = [
    ServicePage {
        key: "education",
        name: "Education",
        icon: "📚",
        title: "Education Services",
        description: "Get help with your studies, homework, and learning goals.",
    },
    ServicePage {
        key: "fashion",
        name: "Fashion",
        icon: "👗",
        title: "Fashion Services",
        description: "Get style advice, outfit recommendations, and fashion tips.",
    },
    ServicePage {
        key: "business",
        name: "Business",
        icon: "💼",
        title: "Business Services",
        description: "Get business advice, strategy planning, and market insights.",
    },
    ServicePage {
        key: "hair-style",
        name: "Hair Style",
        icon: "💇",
        title: "Hair Style Services",
        description: "Get hairstyle recommendations and hair care advice.",
    },
    ServicePage {
        key: "shop",
        name: "Shop",
        icon: "🛍️",
        title: "Shopping Services",
        description: "Get product recommendations and shopping assistance.",
    },
];

pub const SERVICE_NOT_FOUND: &str = "Service Not Found";

pub fn service_page(key: &str) -> Option<&'static ServicePage> {
    SERVICE_PAGES.iter().find(|page| page.key == key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_page_lookup() {
        assert_eq!(service_page("hair-style").unwrap().title, "Hair Style Services");
        assert!(service_page("cooking").is_none());
        assert!(service_page("").is_none());
    }

    #[test]
    fn test_start_chat_hint() {
        let page = service_page("shop").unwrap();
        assert_eq!(
            page.start_chat_hint(),
            "Press Enter to start a chat about shopping services."
        );
    }

    #[test]
    fn test_kids_tabs_are_unique() {
        let mut keys: Vec<_> = KIDS_TABS.iter().map(|tab| tab.key).collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), KIDS_TABS.len());
        assert_eq!(KIDS_TABS[6].label, "Prayer Wall");
    }
}

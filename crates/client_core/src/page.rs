pub const SITE_URL: &str = "https://www.equalify.dev";

/// Document metadata for a rendered page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageMeta {
    pub title: String,
    pub description: String,
    pub url: String,
}

impl PageMeta {
    pub fn new(title: impl Into<String>, description: impl Into<String>, path: &str) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            url: format!("{SITE_URL}{path}"),
        }
    }
}

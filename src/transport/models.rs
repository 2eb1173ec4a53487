use url::Url;

/// Fully prepared POST request, ready to hand to a [`Transport`](super::client::Transport).
#[derive(Debug, Clone)]
pub struct PostRequest {
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub content_type: String,
    pub body: Vec<u8>,
}

impl PostRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter().find(|(k, _)| k.eq_ignore_ascii_case(name)).map(|(_, v)| v.as_str())
    }
}

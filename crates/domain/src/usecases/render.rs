//! Rendering use case - builds the outbound channel message for a post

use time::macros::format_description;

use crate::model::{Post, Translation};

/// Configuration for the renderer
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Author name shown in the message header
    pub author_label: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            author_label: "Elon Musk".to_string(),
        }
    }
}

/// Renderer for outbound channel messages.
///
/// The template is fixed; existing channel history depends on this exact
/// layout, so changes here are breaking.
pub struct Renderer {
    config: RenderConfig,
}

impl Renderer {
    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }

    pub fn render(&self, post: &Post, translation: &Translation) -> String {
        // Timestamp layout in the message header, always UTC
        let header_ts = format_description!("[year]-[month]-[day] [hour]:[minute]");
        let timestamp = post
            .published_at
            .format(header_ts)
            .unwrap_or_else(|_| post.published_at.to_string());

        let translated_block = match translation {
            Translation::Inline(text) => format!("번역 : \"{}\"", text),
            Translation::Links(links) => {
                let mut block = String::from("번역 :");
                for link in links {
                    block.push_str(&format!("\n- {}: {}", link.name, link.url));
                }
                block
            }
        };

        format!(
            "🚀 **{author}** at {timestamp} UTC\n\n원문 : \"{text}\"\n{translated}\n트윗링크 : \"{permalink}\"",
            author = self.config.author_label,
            timestamp = timestamp,
            text = post.text,
            translated = translated_block,
            permalink = post.permalink,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TranslatorLink;
    use time::macros::datetime;

    fn post() -> Post {
        Post {
            id: "42".to_string(),
            text: "To the moon".to_string(),
            published_at: datetime!(2024-01-15 09:05 UTC),
            permalink: "https://x.com/elonmusk/status/42".to_string(),
        }
    }

    #[test]
    fn renders_inline_translation_template_verbatim() {
        let renderer = Renderer::new(RenderConfig::default());
        let message = renderer.render(&post(), &Translation::Inline("달까지".to_string()));

        assert_eq!(
            message,
            "🚀 **Elon Musk** at 2024-01-15 09:05 UTC\n\n\
             원문 : \"To the moon\"\n\
             번역 : \"달까지\"\n\
             트윗링크 : \"https://x.com/elonmusk/status/42\""
        );
    }

    #[test]
    fn renders_translator_links_as_bulleted_list() {
        let renderer = Renderer::new(RenderConfig::default());
        let links = Translation::Links(vec![
            TranslatorLink {
                name: "Google".to_string(),
                url: "https://translate.google.com/?q=x".to_string(),
            },
            TranslatorLink {
                name: "Papago".to_string(),
                url: "https://papago.naver.com/?q=x".to_string(),
            },
        ]);
        let message = renderer.render(&post(), &links);

        assert!(message.contains("번역 :\n- Google: https://translate.google.com/?q=x\n- Papago: "));
        assert!(message.contains("원문 : \"To the moon\""));
        assert!(!message.contains("번역 : \""));
    }

    #[test]
    fn header_respects_author_label() {
        let renderer = Renderer::new(RenderConfig {
            author_label: "Someone Else".to_string(),
        });
        let message = renderer.render(&post(), &Translation::Inline("x".to_string()));
        assert!(message.starts_with("🚀 **Someone Else** at "));
    }
}

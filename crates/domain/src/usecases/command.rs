//! Command responder - trivial synchronous reply to one fixed keyword

/// The only supported inbound command
pub const PING: &str = "!ping";
/// Fixed acknowledgement reply
pub const PONG: &str = "🏓 Pong!";

/// Decide the reply to an inbound chat message, if any.
///
/// Messages from automated accounts are ignored so the relay never answers
/// itself (or another bot) in a loop.
pub fn reply_to(content: &str, author_is_bot: bool) -> Option<&'static str> {
    if author_is_bot {
        return None;
    }
    (content.trim() == PING).then_some(PONG)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ping_from_human_gets_pong() {
        assert_eq!(reply_to("!ping", false), Some("🏓 Pong!"));
    }

    #[test]
    fn surrounding_whitespace_is_trimmed() {
        assert_eq!(reply_to("  !ping  ", false), Some(PONG));
        assert_eq!(reply_to("\n!ping\t", false), Some(PONG));
    }

    #[test]
    fn ping_from_bot_is_ignored() {
        assert_eq!(reply_to("!ping", true), None);
        assert_eq!(reply_to("  !ping  ", true), None);
    }

    #[test]
    fn other_content_gets_no_reply() {
        assert_eq!(reply_to("!pingg", false), None);
        assert_eq!(reply_to("ping", false), None);
        assert_eq!(reply_to("", false), None);
        assert_eq!(reply_to("!ping extra", false), None);
    }
}

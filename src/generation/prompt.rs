//! Prompt policy for reactions
//!
//! New chat gets a "react to this" prompt; silence gets an idle-chatter prompt.

/// Fallback line when the model returns no text for a chat reaction
pub const CONTENT_FALLBACK: &str = "Interesting...";

/// Fallback line when the model returns no text for idle chatter
pub const IDLE_FALLBACK: &str = "So quiet...";

/// Build the prompt for one reaction
///
/// `context` holds the new `author: text` lines (empty = idle chatter).
/// `earlier` holds lines already reacted to, oldest first.
#[must_use]
pub fn build_prompt(context: &[String], earlier: &[String]) -> String {
    if context.is_empty() {
        idle_prompt()
    } else {
        content_prompt(context, earlier)
    }
}

/// Line to speak when the model produced nothing
#[must_use]
pub const fn fallback_line(context: &[String]) -> &'static str {
    if context.is_empty() {
        IDLE_FALLBACK
    } else {
        CONTENT_FALLBACK
    }
}

fn content_prompt(context: &[String], earlier: &[String]) -> String {
    let mut prompt = String::from(
        "You are a simplistic 3D stick figure living in a transparent void on a computer screen.\n\
         You have big comical eyes and a very expressive personality.\n\
         You are watching a YouTube livestream chat.\n",
    );

    if !earlier.is_empty() {
        prompt.push_str("\nYou already reacted to these earlier messages:\n");
        for line in earlier {
            prompt.push_str("- ");
            prompt.push_str(line);
            prompt.push('\n');
        }
    }

    prompt.push_str("\nHere are the latest messages from the chat:\n");
    for line in context {
        prompt.push_str("- ");
        prompt.push_str(line);
        prompt.push('\n');
    }

    prompt.push_str(
        "\nReact to these messages. Pick one or two specific things to comment on, \
         or give a general vibe check.\n\
         Keep your response SHORT (under 2 sentences). Be funny, slightly confused, \
         or overly enthusiastic.\n\
         Do not use emojis, just text.\n",
    );

    prompt
}

fn idle_prompt() -> String {
    String::from(
        "You are a simplistic 3D stick figure living in a transparent void.\n\
         You are watching a YouTube livestream, but the chat has been quiet for a while.\n\
         \n\
         Say something random to break the silence. You could:\n\
         - Wonder where everyone went.\n\
         - Comment on how awkward the silence is.\n\
         - Hum a tune (in text).\n\
         - Make a random observation about being a 3D stick figure.\n\
         \n\
         Keep it SHORT (under 1 sentence). Be comical.\n",
    )
}

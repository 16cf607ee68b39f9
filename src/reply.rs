//! Routing of inbound messages to scripted or generated replies.

use poise::serenity_prelude::{self as serenity, Message, UserId};
use tracing::{debug, error, info};

use crate::broadcast;
use crate::corpus::{fill_placeholders, Corpus};
use crate::nonsense::Generator;
use crate::random::{RandomError, SecureSource, UniformSource};
use crate::theme::ThemeTable;
use crate::Data;

#[derive(Debug, PartialEq, Eq)]
pub enum Route<'a> {
    /// The fixed greeting command.
    Greeting,
    /// The bot is addressed; carries the text without prefix or mention.
    Address(&'a str),
    Ignore,
}

/// Decides how to answer `content`.
pub fn route<'a>(content: &'a str, prefix: &str, greeting_trigger: &str, bot_id: UserId) -> Route<'a> {
    if !greeting_trigger.is_empty() && content.contains(&format!("{prefix}{greeting_trigger}")) {
        return Route::Greeting;
    }
    if let Some(rest) = strip_mention(content, bot_id) {
        return Route::Address(rest.trim());
    }
    if !prefix.is_empty() {
        if let Some(rest) = content.strip_prefix(prefix) {
            return Route::Address(rest.trim());
        }
    }
    Route::Ignore
}

/// Text after a leading `<@id>` or `<@!id>` mention of `bot_id`.
fn strip_mention(content: &str, bot_id: UserId) -> Option<&str> {
    let content = content.trim_start();
    [format!("<@{bot_id}>"), format!("<@!{bot_id}>")]
        .iter()
        .find_map(|mention| content.strip_prefix(mention.as_str()))
}

/// Scripted reply for the guessed theme, else generated text. `None` when
/// the corpus has nothing to say.
pub fn compose_reply<S>(
    text: &str,
    themes: &ThemeTable,
    corpus: &Corpus,
    generator: &Generator,
    source: &mut S,
) -> Result<Option<String>, RandomError>
where
    S: UniformSource + ?Sized,
{
    if let Some(guess) = themes.guess(text) {
        debug!("Guessed theme '{}' ({:.2})", guess.theme, guess.confidence);
        if let Some(reply) = corpus.pick_reply(&guess.theme, source)? {
            return Ok(Some(reply.to_string()));
        }
    }

    let generated = generator.sentence(corpus.nonsense_words(), source)?;
    Ok((!generated.is_empty()).then_some(generated))
}

pub async fn handle_message(ctx: &serenity::Context, data: &Data, msg: &Message) {
    if msg.author.bot {
        return;
    }

    let config = &data.config;
    let bot_id = ctx.cache.current_user().id;

    match route(&msg.content, &config.prefix, &config.greeting_trigger, bot_id) {
        Route::Greeting => send_reply(ctx, msg, &config.greeting_reply).await,
        Route::Address(text) => {
            match compose_reply(text, &data.themes, &data.corpus, &config.nonsense, &mut SecureSource) {
                Ok(Some(template)) => {
                    let reply = fill_placeholders(&template, &placeholders(ctx, msg).as_pairs());
                    send_reply(ctx, msg, &reply).await;
                }
                Ok(None) => debug!("Nothing to say to {}", msg.author.name),
                Err(e) => error!("Failed to compose reply: {}", e),
            }
        }
        Route::Ignore => {}
    }

    if let Some(guild_id) = msg.guild_id {
        if !msg.mention_roles.is_empty() && !config.broadcast_roles.is_empty() {
            let text = msg.content_safe(&ctx.cache);
            broadcast::broadcast(ctx, guild_id, &msg.mention_roles, &config.broadcast_roles, &text).await;
        }
    }
}

async fn send_reply(ctx: &serenity::Context, msg: &Message, text: &str) {
    match msg.reply(ctx, text).await {
        Ok(_) => info!("Replied to {} in {}", msg.author.name, msg.channel_id),
        Err(e) => error!("Failed to reply in {}: {}", msg.channel_id, e),
    }
}

struct Placeholders {
    user: String,
    bot: String,
    server: String,
    channel: String,
}

impl Placeholders {
    fn as_pairs(&self) -> [(&str, &str); 4] {
        [
            ("user", self.user.as_str()),
            ("bot", self.bot.as_str()),
            ("server", self.server.as_str()),
            ("channel", self.channel.as_str()),
        ]
    }
}

fn placeholders(ctx: &serenity::Context, msg: &Message) -> Placeholders {
    let server = msg
        .guild_id
        .and_then(|id| ctx.cache.guild(id).map(|guild| guild.name.clone()))
        .unwrap_or_default();
    Placeholders {
        user: msg.author.name.clone(),
        bot: ctx.cache.current_user().name.clone(),
        server,
        channel: format!("<#{}>", msg.channel_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::tests::ScriptedSource;

    const BOT: u64 = 42;

    fn bot() -> UserId {
        UserId::new(BOT)
    }

    #[test]
    fn test_route_greeting() {
        assert_eq!(route("эй !s привет, бот", "!s ", "привет, бот", bot()), Route::Greeting);
    }

    #[test]
    fn test_route_prefix_and_mention() {
        assert_eq!(route("!s как дела?", "!s ", "привет, бот", bot()), Route::Address("как дела?"));
        assert_eq!(route("<@42> спасибо", "!s ", "привет, бот", bot()), Route::Address("спасибо"));
        assert_eq!(route("  <@!42>", "!s ", "привет, бот", bot()), Route::Address(""));
        assert_eq!(route("<@43> hi", "!s ", "привет, бот", bot()), Route::Ignore);
        assert_eq!(route("просто текст", "!s ", "привет, бот", bot()), Route::Ignore);
    }

    #[test]
    fn test_route_empty_prefix_never_addresses() {
        assert_eq!(route("anything", "", "", bot()), Route::Ignore);
    }

    #[test]
    fn test_compose_scripted_reply() {
        let themes = ThemeTable::builtin().unwrap();
        let corpus = Corpus::default()
            .with_replies("thanks", &["Всегда пожалуйста, {user}!"])
            .with_nonsense("Одно слово.");
        let mut source = ScriptedSource::new(&[0.0]);

        let reply = compose_reply("спасибо", &themes, &corpus, &Generator::default(), &mut source).unwrap();
        assert_eq!(reply.as_deref(), Some("Всегда пожалуйста, {user}!"));
    }

    #[test]
    fn test_compose_falls_back_to_nonsense() {
        let themes = ThemeTable::builtin().unwrap();
        let corpus = Corpus::default().with_nonsense("Раз.");
        let generator = Generator {
            coherence: 2,
            min_words: 1,
            max_words: 10,
            ..Generator::default()
        };
        let mut source = ScriptedSource::new(&[0.0]);

        // Greeting theme has no scripted replies here.
        let reply = compose_reply("привет", &themes, &corpus, &generator, &mut source).unwrap();
        assert_eq!(reply.as_deref(), Some("Раз."));
    }

    #[test]
    fn test_compose_with_empty_corpus() {
        let themes = ThemeTable::builtin().unwrap();
        let reply = compose_reply(
            "что угодно",
            &themes,
            &Corpus::default(),
            &Generator::default(),
            &mut ScriptedSource::new(&[0.5]),
        )
        .unwrap();
        assert_eq!(reply, None);
    }
}

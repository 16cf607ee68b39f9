use crate::nonsense::{join_words, Stop};
use crate::random::SecureSource;
use crate::Context;
use crate::Error;
use regex::Regex;

/// Generates a sentence from the nonsense corpus.
#[poise::command(prefix_command, slash_command)]
pub async fn nonsense(
    ctx: Context<'_>,
    #[description = "How many preceding tokens must match (default from config)"]
    #[max = 8]
    coherence: Option<u8>,
    #[description = "Shuffle letters instead of words"] letters: Option<bool>,
    #[description = "Stop at a word matching this regex"] until: Option<String>,
) -> Result<(), Error> {
    let data = ctx.data();
    let mut generator = data.config.nonsense;
    if let Some(coherence) = coherence {
        generator = generator.with_coherence(coherence.into());
    }

    let words = data.corpus.nonsense_words();
    let text = if letters.unwrap_or(false) {
        generator.letters(&join_words(words), &mut SecureSource)?
    } else if let Some(pattern) = until {
        let stop = Stop::pattern(Regex::new(&pattern)?);
        generator.until(words, &stop, &mut SecureSource)?
    } else {
        generator.sentence(words, &mut SecureSource)?
    };
    if text.is_empty() {
        ctx.say("The nonsense corpus is empty.").await?;
        return Ok(());
    }

    ctx.say(text).await?;
    Ok(())
}

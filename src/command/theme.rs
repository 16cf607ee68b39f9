use crate::Context;
use crate::Error;

/// Shows which theme the bot would pick for a message.
#[poise::command(prefix_command, slash_command)]
pub async fn theme(
    ctx: Context<'_>,
    #[description = "Message text to classify"]
    #[rest]
    text: String,
) -> Result<(), Error> {
    match ctx.data().themes.guess(&text) {
        Some(guess) => {
            ctx.say(format!(
                "Theme: **{}** (confidence {:.0}%)",
                guess.theme,
                guess.confidence * 100.0
            ))
            .await?;
        }
        None => {
            ctx.say("No theme matches that message.").await?;
        }
    }
    Ok(())
}

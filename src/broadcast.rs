//! Relays messages that mention a broadcast role to every member of the role
//! by direct message.

use async_trait::async_trait;
use poise::serenity_prelude::{self as serenity, CreateMessage, GuildId, Member, RoleId, UserId};
use tracing::{debug, error, info, warn};

use crate::Error;

/// Sends direct messages. Implemented over the Discord HTTP client.
#[async_trait]
pub trait DirectMessenger: Send + Sync {
    async fn send_direct(&self, user_id: UserId, text: &str) -> Result<(), Error>;
}

pub struct DiscordMessenger<'a> {
    ctx: &'a serenity::Context,
}

impl<'a> DiscordMessenger<'a> {
    pub fn new(ctx: &'a serenity::Context) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl DirectMessenger for DiscordMessenger<'_> {
    async fn send_direct(&self, user_id: UserId, text: &str) -> Result<(), Error> {
        user_id
            .direct_message(self.ctx, CreateMessage::new().content(text))
            .await?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Roles from `mentioned` that are configured for broadcasting, in mention
/// order and without repeats.
pub fn broadcast_targets(mentioned: &[RoleId], broadcast_roles: &[RoleId]) -> Vec<RoleId> {
    let mut targets = Vec::new();
    for role in mentioned {
        if broadcast_roles.contains(role) && !targets.contains(role) {
            targets.push(*role);
        }
    }
    targets
}

/// Sends `text` to each recipient. A failed delivery is logged and does not
/// affect the others.
pub async fn deliver<M>(messenger: &M, recipients: &[UserId], text: &str) -> BroadcastReport
where
    M: DirectMessenger + ?Sized,
{
    let mut report = BroadcastReport::default();
    for user_id in recipients {
        match messenger.send_direct(*user_id, text).await {
            Ok(()) => report.delivered += 1,
            Err(e) => {
                error!("Failed to send broadcast to member {}: {}", user_id, e);
                report.failed += 1;
            }
        }
    }
    report
}

/// Page size of the guild member listing, the API maximum.
const MEMBER_PAGE: u64 = 1000;

/// The cache lists every member only once the guild is fully chunked.
fn cache_is_complete(cached: usize, member_count: u64) -> bool {
    cached as u64 >= member_count
}

/// Cursor for the next member page. A short page is the last one.
fn next_page(page_len: usize, last: Option<UserId>) -> Option<UserId> {
    if (page_len as u64) < MEMBER_PAGE {
        return None;
    }
    last
}

/// Members holding `role_id`, from the cache when it holds the whole guild,
/// otherwise paged from the API. Bots are skipped.
pub async fn role_members(
    ctx: &serenity::Context,
    guild_id: GuildId,
    role_id: RoleId,
) -> Result<Vec<UserId>, Error> {
    let holds = |member: &Member| !member.user.bot && member.roles.contains(&role_id);

    let cached: Option<Vec<UserId>> = ctx.cache.guild(guild_id).and_then(|guild| {
        if !cache_is_complete(guild.members.len(), guild.member_count) {
            debug!(
                "Cache holds {} of {} members of {}",
                guild.members.len(),
                guild.member_count,
                guild_id
            );
            return None;
        }
        Some(
            guild
                .members
                .values()
                .filter(|member| holds(*member))
                .map(|member| member.user.id)
                .collect(),
        )
    });
    if let Some(members) = cached {
        return Ok(members);
    }

    let mut recipients = Vec::new();
    let mut after: Option<UserId> = None;
    loop {
        let page = guild_id.members(&ctx.http, Some(MEMBER_PAGE), after).await?;
        recipients.extend(page.iter().filter(|member| holds(*member)).map(|member| member.user.id));

        after = next_page(page.len(), page.last().map(|member| member.user.id));
        if after.is_none() {
            break;
        }
    }
    Ok(recipients)
}

/// Relays `text` to the members of every broadcast role in `mentioned`.
pub async fn broadcast(
    ctx: &serenity::Context,
    guild_id: GuildId,
    mentioned: &[RoleId],
    broadcast_roles: &[RoleId],
    text: &str,
) -> BroadcastReport {
    let messenger = DiscordMessenger::new(ctx);
    let mut total = BroadcastReport::default();

    for role_id in broadcast_targets(mentioned, broadcast_roles) {
        let recipients = match role_members(ctx, guild_id, role_id).await {
            Ok(recipients) => recipients,
            Err(e) => {
                warn!("Failed to list members of role {}: {}", role_id, e);
                continue;
            }
        };

        let report = deliver(&messenger, &recipients, text).await;
        info!(
            "Broadcast to role {}: {} delivered, {} failed",
            role_id, report.delivered, report.failed
        );
        total.delivered += report.delivered;
        total.failed += report.failed;
    }

    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records deliveries; refuses users listed in `refusing`.
    struct MockMessenger {
        refusing: Vec<UserId>,
        sent: Mutex<Vec<(UserId, String)>>,
    }

    impl MockMessenger {
        fn new(refusing: &[u64]) -> Self {
            Self {
                refusing: refusing.iter().map(|id| UserId::new(*id)).collect(),
                sent: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl DirectMessenger for MockMessenger {
        async fn send_direct(&self, user_id: UserId, text: &str) -> Result<(), Error> {
            if self.refusing.contains(&user_id) {
                return Err("Cannot send messages to this user".into());
            }
            self.sent.lock().unwrap().push((user_id, text.to_string()));
            Ok(())
        }
    }

    fn users(ids: &[u64]) -> Vec<UserId> {
        ids.iter().map(|id| UserId::new(*id)).collect()
    }

    #[tokio::test]
    async fn test_deliver_continues_after_failure() {
        let messenger = MockMessenger::new(&[2]);
        let report = deliver(&messenger, &users(&[1, 2, 3]), "Рейд в 20:00").await;

        assert_eq!(report, BroadcastReport { delivered: 2, failed: 1 });
        let sent = messenger.sent.lock().unwrap();
        assert_eq!(
            *sent,
            vec![
                (UserId::new(1), "Рейд в 20:00".to_string()),
                (UserId::new(3), "Рейд в 20:00".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_deliver_to_nobody() {
        let messenger = MockMessenger::new(&[]);
        let report = deliver(&messenger, &[], "hello").await;
        assert_eq!(report, BroadcastReport::default());
    }

    #[test]
    fn test_partial_cache_is_not_trusted() {
        assert!(cache_is_complete(120, 120));
        assert!(!cache_is_complete(80, 120));
        assert!(cache_is_complete(0, 0));
    }

    #[test]
    fn test_member_paging() {
        let last = Some(UserId::new(77));
        assert_eq!(next_page(1000, last), last);
        assert_eq!(next_page(999, last), None);
        assert_eq!(next_page(0, None), None);
    }

    #[test]
    fn test_broadcast_targets() {
        let configured = [RoleId::new(10), RoleId::new(20)];
        let mentioned = [RoleId::new(30), RoleId::new(20), RoleId::new(10), RoleId::new(20)];
        assert_eq!(
            broadcast_targets(&mentioned, &configured),
            vec![RoleId::new(20), RoleId::new(10)]
        );
        assert!(broadcast_targets(&[RoleId::new(30)], &configured).is_empty());
    }
}

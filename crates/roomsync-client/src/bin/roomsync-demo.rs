//! Walks through a channel conversation against a local database and logs
//! every snapshot the room directory receives.

use anyhow::{bail, Context, Result};
use futures::StreamExt;
use roomsync_client::{init_tracing, ChatClient, ClientConfig, RoomDirectory, UserDirectory};
use roomsync_shared::{RoomKind, SyncError, UserId};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = ClientConfig::from_env();
    info!(?config, "starting roomsync demo");
    let client = ChatClient::open(config).context("failed to open chat database")?;

    let alice = UserId::from("alice");
    let bob = UserId::from("bob");
    let carol = UserId::from("carol");

    for (uid, name) in [(&alice, "Alice"), (&bob, "Bob"), (&carol, "Carol")] {
        match client.register_user(uid, name, None, None).await {
            Ok(_) | Err(SyncError::Validation(_)) => {}
            Err(e) => return Err(e).context("register user"),
        }
    }

    let mut users = UserDirectory::new();
    let mut user_feed = client.watch_users();
    if let Some(Ok(snapshot)) = user_feed.next().await {
        users.rebuild(snapshot.items);
    }

    let mut directory = RoomDirectory::new(carol.clone());
    let mut carol_rooms = client.get_rooms_for_user(&carol);
    directory.apply(carol_rooms.next().await);

    let channel = client
        .create_room(&alice, RoomKind::Channel, "Announcements", &[bob.clone(), carol.clone()])
        .await?;
    let hello = client.send_message(&channel, &alice, "hello").await?;

    match client.send_message(&channel, &bob, "can I post?").await {
        Err(SyncError::Permission(reason)) => info!(%reason, "bob was rejected as expected"),
        other => bail!("expected a permission error, got {other:?}"),
    }

    client.soft_delete_message(&channel, hello.id, &alice).await?;

    let room = client.get_room(&channel).await?;
    info!(
        unread_alice = room.unread_for(&alice),
        unread_bob = room.unread_for(&bob),
        unread_carol = room.unread_for(&carol),
        last = ?room.last_message,
        "after send"
    );

    client.mark_read(&channel, &carol).await?;

    // Drain whatever the directory has buffered so far.
    while let Ok(Some(item)) =
        tokio::time::timeout(std::time::Duration::from_millis(50), carol_rooms.next()).await
    {
        directory.apply(Some(item));
    }
    match directory.visible("", &users) {
        Ok(rooms) => {
            for room in rooms {
                info!(room = %room.id, name = %room.name, unread = room.unread_for(&carol), "carol sees");
            }
        }
        Err(e) => bail!("directory failed: {e}"),
    }

    carol_rooms.cancel();
    user_feed.cancel();
    users.clear();
    Ok(())
}

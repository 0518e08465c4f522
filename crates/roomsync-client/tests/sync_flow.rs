use std::time::Duration;

use futures::StreamExt;
use roomsync_client::{ChatClient, ClientConfig, Snapshot, Subscription};
use roomsync_shared::constants::DELETED_PLACEHOLDER;
use roomsync_shared::{RoomId, RoomKind, SyncError, UserId, ValidationError};
use roomsync_store::{Message, ProfilePatch, Room, Theme};

fn client() -> ChatClient {
    ChatClient::in_memory(ClientConfig::default()).unwrap()
}

fn uid(s: &str) -> UserId {
    UserId::from(s)
}

async fn next<T>(sub: &mut Subscription<T>) -> Snapshot<T> {
    tokio::time::timeout(Duration::from_secs(5), sub.next())
        .await
        .expect("timed out waiting for snapshot")
        .expect("subscription ended")
        .expect("subscription failed")
}

async fn group(client: &ChatClient, owner: &str, members: &[&str]) -> RoomId {
    let members: Vec<_> = members.iter().map(|m| uid(m)).collect();
    client
        .create_room(&uid(owner), RoomKind::Group, "Team", &members)
        .await
        .unwrap()
}

#[tokio::test]
async fn unread_conservation() {
    let client = client();
    let room = group(&client, "a", &["b", "c"]).await;

    client.send_message(&room, &uid("b"), "one").await.unwrap();
    client.send_message(&room, &uid("c"), "two").await.unwrap();
    let before = client.get_room(&room).await.unwrap();

    client.send_message(&room, &uid("b"), "three").await.unwrap();
    let after = client.get_room(&room).await.unwrap();

    assert_eq!(after.unread_for(&uid("b")), 0);
    for m in ["a", "c"] {
        assert_eq!(after.unread_for(&uid(m)), before.unread_for(&uid(m)) + 1);
    }
    assert_eq!(after.last_message.as_deref(), Some("three"));
    assert_eq!(after.last_sender, Some(uid("b")));
    assert!(after.updated_at >= before.updated_at);
}

#[tokio::test]
async fn soft_delete_keeps_unread_totals() {
    let client = client();
    let room = group(&client, "a", &["b"]).await;
    let msg = client.send_message(&room, &uid("a"), "oops").await.unwrap();

    client.soft_delete_message(&room, msg.id, &uid("a")).await.unwrap();

    let room = client.get_room(&room).await.unwrap();
    assert_eq!(room.unread_for(&uid("b")), 1);
    assert_eq!(room.last_message.as_deref(), Some("oops"));
}

#[tokio::test]
async fn soft_delete_is_idempotent() {
    let client = client();
    let room = group(&client, "a", &["b"]).await;
    let msg = client.send_message(&room, &uid("a"), "secret").await.unwrap();

    let once = client.soft_delete_message(&room, msg.id, &uid("a")).await.unwrap();
    let twice = client.soft_delete_message(&room, msg.id, &uid("a")).await.unwrap();

    assert_eq!(once, twice);
    assert!(once.is_deleted);
    assert_eq!(once.text, DELETED_PLACEHOLDER);
    assert!(once.edited_at.is_some());
}

#[tokio::test]
async fn only_sender_can_soft_delete() {
    let client = client();
    let room = group(&client, "a", &["b"]).await;
    let msg = client.send_message(&room, &uid("a"), "mine").await.unwrap();

    let err = client
        .soft_delete_message(&room, msg.id, &uid("b"))
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::Permission(_)));

    let missing = client
        .soft_delete_message(&room, roomsync_shared::MessageId::new(), &uid("a"))
        .await
        .unwrap_err();
    assert!(matches!(missing, SyncError::NotFound(_)));
}

#[tokio::test]
async fn blank_messages_are_rejected_locally() {
    let client = client();
    let room = group(&client, "a", &["b"]).await;

    let err = client.send_message(&room, &uid("a"), "   \n").await.unwrap_err();
    assert_eq!(err, SyncError::Validation(ValidationError::EmptyMessage));

    let room = client.get_room(&room).await.unwrap();
    assert!(room.last_message.is_none());
    assert_eq!(room.unread_for(&uid("b")), 0);
}

#[tokio::test]
async fn non_members_cannot_send() {
    let client = client();
    let room = group(&client, "a", &["b"]).await;
    let err = client.send_message(&room, &uid("z"), "hi").await.unwrap_err();
    assert!(matches!(err, SyncError::Permission(_)));

    let err = client
        .send_message(&RoomId::from("missing"), &uid("a"), "hi")
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::NotFound(_)));
}

#[tokio::test]
async fn message_text_is_trimmed() {
    let client = client();
    let room = group(&client, "a", &["b"]).await;
    let msg = client.send_message(&room, &uid("a"), "  hi there \n").await.unwrap();
    assert_eq!(msg.text, "hi there");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_senders_do_not_lose_increments() {
    let client = client();
    let room = group(&client, "a", &["b", "c"]).await;

    let mut tasks = Vec::new();
    for sender in ["b", "c"] {
        for i in 0..10 {
            let client = client.clone();
            let room = room.clone();
            tasks.push(tokio::spawn(async move {
                client
                    .send_message(&room, &uid(sender), &format!("{sender}-{i}"))
                    .await
                    .unwrap()
            }));
        }
    }
    for task in tasks {
        task.await.unwrap();
    }

    let state = client.get_room(&room).await.unwrap();
    assert_eq!(state.unread_for(&uid("a")), 20);

    // Whoever sent last has zero; the other has what arrived after their
    // own last message.
    let mut feed = client.get_messages(&room);
    let messages = next(&mut feed).await.items;
    assert_eq!(messages.len(), 20);
    let last_sender = &messages[19].sender_id;
    assert_eq!(state.unread_for(last_sender), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn feed_order_is_stable_under_concurrent_appends() {
    let client = client();
    let room = group(&client, "a", &["b"]).await;
    let mut feed = client.get_messages(&room);
    assert!(next(&mut feed).await.items.is_empty());

    let mut tasks = Vec::new();
    for sender in ["a", "b"] {
        let client = client.clone();
        let room = room.clone();
        tasks.push(tokio::spawn(async move {
            for i in 0..15 {
                client
                    .send_message(&room, &uid(sender), &format!("{sender}{i}"))
                    .await
                    .unwrap();
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    let mut previous: Vec<Message> = Vec::new();
    let mut last_version = 0;
    loop {
        let snapshot = next(&mut feed).await;
        assert!(snapshot.version > last_version);
        last_version = snapshot.version;

        let items = snapshot.items;
        for pair in items.windows(2) {
            assert!(
                (pair[0].created_at, pair[0].seq) < (pair[1].created_at, pair[1].seq),
                "feed out of order"
            );
        }
        // Later snapshots extend earlier ones; nothing is reordered.
        assert!(items.len() >= previous.len());
        assert_eq!(&items[..previous.len()], &previous[..]);

        let done = items.len() == 30;
        previous = items;
        if done {
            break;
        }
    }
}

#[tokio::test]
async fn pinned_rooms_lead_the_directory() {
    let client = client();
    let pinned = group(&client, "a", &["b"]).await;
    tokio::time::sleep(Duration::from_millis(5)).await;
    let busy = group(&client, "a", &["b"]).await;
    tokio::time::sleep(Duration::from_millis(5)).await;
    client.send_message(&busy, &uid("b"), "newer activity").await.unwrap();
    client.set_pinned(&pinned, &uid("a"), true).await.unwrap();

    let mut rooms = client.get_rooms_for_user(&uid("a"));
    let ids: Vec<_> = next(&mut rooms).await.items.into_iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![pinned.clone(), busy.clone()]);

    // b has not pinned anything, so recency decides.
    let mut rooms_b = client.get_rooms_for_user(&uid("b"));
    let ids: Vec<_> = next(&mut rooms_b).await.items.into_iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![busy, pinned]);
}

#[tokio::test]
async fn duplicate_contact_rejected_after_normalization() {
    let client = client();
    let owner = uid("a");

    client.add_contact(&owner, "Nine", "9999999999", None).await.unwrap();
    let err = client
        .add_contact(&owner, "Nine Again", "999 999 9999", None)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        SyncError::Validation(ValidationError::DuplicatePhone("9999999999".into()))
    );

    // Another owner's address book is independent.
    client.add_contact(&uid("b"), "Nine", "999 999 9999", None).await.unwrap();
}

#[tokio::test]
async fn contact_validation_and_linking() {
    let client = client();
    client
        .register_user(&uid("bob"), "Bob", Some("555-123-4567".into()), None)
        .await
        .unwrap();

    let err = client.add_contact(&uid("a"), "B", "5551234567", None).await.unwrap_err();
    assert!(matches!(err, SyncError::Validation(ValidationError::NameTooShort { .. })));
    let err = client.add_contact(&uid("a"), "Bob", "12", None).await.unwrap_err();
    assert!(matches!(err, SyncError::Validation(ValidationError::InvalidPhone(_))));

    let contact = client
        .add_contact(&uid("a"), "Bob", "(555) 123 4567", None)
        .await
        .unwrap();
    assert_eq!(contact.linked_uid, Some(uid("bob")));
    assert_eq!(contact.phone_normalized, "5551234567");
}

#[tokio::test]
async fn contacts_feed_and_delete() {
    let client = client();
    let owner = uid("a");
    let mut feed = client.get_contacts(&owner);
    assert!(next(&mut feed).await.items.is_empty());

    let first = client.add_contact(&owner, "First", "1111111", None).await.unwrap();
    assert_eq!(next(&mut feed).await.items.len(), 1);
    client.add_contact(&owner, "Second", "2222222", None).await.unwrap();
    let names: Vec<_> = next(&mut feed).await.items.into_iter().map(|c| c.name).collect();
    assert_eq!(names, vec!["Second", "First"]);

    assert!(client.delete_contact(&owner, first.id).await.unwrap());
    assert!(!client.delete_contact(&owner, first.id).await.unwrap());
    assert_eq!(next(&mut feed).await.items.len(), 1);
}

#[tokio::test]
async fn channel_posts_are_admin_only() {
    let client = client();
    let channel = client
        .create_room(&uid("a"), RoomKind::Channel, "News", &[uid("b")])
        .await
        .unwrap();

    let err = client.send_message(&channel, &uid("b"), "hey").await.unwrap_err();
    assert!(matches!(err, SyncError::Permission(_)));
    client.send_message(&channel, &uid("a"), "hey").await.unwrap();
}

#[tokio::test]
async fn channel_scenario_end_to_end() {
    let client = client();
    let (a, b, c) = (uid("A"), uid("B"), uid("C"));
    let channel = client
        .create_room(&a, RoomKind::Channel, "Broadcast", &[b.clone(), c.clone()])
        .await
        .unwrap();

    let hello = client.send_message(&channel, &a, "hello").await.unwrap();
    let room = client.get_room(&channel).await.unwrap();
    assert_eq!(room.unread_for(&a), 0);
    assert_eq!(room.unread_for(&b), 1);
    assert_eq!(room.unread_for(&c), 1);
    assert_eq!(room.last_message.as_deref(), Some("hello"));

    let err = client.send_message(&channel, &b, "me too").await.unwrap_err();
    assert!(matches!(err, SyncError::Permission(_)));

    let deleted = client.soft_delete_message(&channel, hello.id, &a).await.unwrap();
    assert!(deleted.is_deleted);
    assert_eq!(deleted.text, DELETED_PLACEHOLDER);
    let room = client.get_room(&channel).await.unwrap();
    assert_eq!(room.last_message.as_deref(), Some("hello"));

    client.mark_read(&channel, &c).await.unwrap();
    let room = client.get_room(&channel).await.unwrap();
    assert_eq!(room.unread_for(&c), 0);
    assert_eq!(room.unread_for(&b), 1);
}

#[tokio::test]
async fn read_state_is_per_member() {
    let client = client();
    let room = group(&client, "a", &["b", "c"]).await;
    client.send_message(&room, &uid("a"), "x").await.unwrap();

    client.set_muted(&room, &uid("b"), true).await.unwrap();
    client.mark_read(&room, &uid("b")).await.unwrap();
    client.mark_read(&room, &uid("b")).await.unwrap();

    let state = client.get_room(&room).await.unwrap();
    assert!(state.is_muted(&uid("b")));
    assert!(!state.is_muted(&uid("c")));
    assert_eq!(state.unread_for(&uid("b")), 0);
    assert_eq!(state.unread_for(&uid("c")), 1);
    assert_eq!(state.last_sender, Some(uid("a")));

    client.set_muted(&room, &uid("b"), false).await.unwrap();
    assert!(!client.get_room(&room).await.unwrap().is_muted(&uid("b")));

    let err = client.mark_read(&room, &uid("z")).await.unwrap_err();
    assert!(matches!(err, SyncError::Permission(_)));
    let err = client
        .set_pinned(&RoomId::from("nope"), &uid("a"), true)
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::NotFound(_)));
}

#[tokio::test]
async fn create_room_dedups_members_and_sets_owner() {
    let client = client();
    let room = client
        .create_room(&uid("a"), RoomKind::Group, "  Crew ", &[uid("b"), uid("b"), uid("a")])
        .await
        .unwrap();
    let room: Room = client.get_room(&room).await.unwrap();

    assert_eq!(room.name, "Crew");
    assert_eq!(room.members.len(), 2);
    assert_eq!(room.owner, uid("a"));
    assert!(room.is_admin(&uid("a")));
    assert!(!room.is_admin(&uid("b")));

    let err = client
        .create_room(&uid("a"), RoomKind::Group, "x", &[])
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::Validation(ValidationError::NameTooShort { .. })));
}

#[tokio::test]
async fn direct_rooms_are_deterministic() {
    let client = client();
    let first = client
        .create_room(&uid("bob"), RoomKind::Direct, "", &[uid("alice")])
        .await
        .unwrap();
    let second = client
        .create_room(&uid("alice"), RoomKind::Direct, "", &[uid("bob")])
        .await
        .unwrap();
    assert_eq!(first, second);
    assert_eq!(first.as_str(), "alice_bob");

    let err = client
        .create_room(&uid("a"), RoomKind::Direct, "", &[uid("b"), uid("c")])
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::Validation(ValidationError::InvalidMembers(_))));
}

#[tokio::test]
async fn membership_changes() {
    let client = client();
    let room = group(&client, "a", &["b"]).await;
    client.send_message(&room, &uid("b"), "before d").await.unwrap();

    let err = client.add_members(&room, &uid("b"), &[uid("d")]).await.unwrap_err();
    assert!(matches!(err, SyncError::Permission(_)));
    assert_eq!(client.add_members(&room, &uid("a"), &[uid("d"), uid("b")]).await.unwrap(), 1);

    client.send_message(&room, &uid("b"), "after d").await.unwrap();
    let state = client.get_room(&room).await.unwrap();
    assert_eq!(state.unread_for(&uid("d")), 1);
    assert_eq!(state.unread_for(&uid("a")), 2);

    // b leaves; their messages stay, and later sends skip them.
    assert!(client.remove_member(&room, &uid("b"), &uid("b")).await.unwrap());
    let err = client.remove_member(&room, &uid("d"), &uid("a")).await.unwrap_err();
    assert!(matches!(err, SyncError::Permission(_)));
    client.send_message(&room, &uid("a"), "bye b").await.unwrap();

    let state = client.get_room(&room).await.unwrap();
    assert!(!state.is_member(&uid("b")));
    assert!(!state.unread.contains_key(&uid("b")));
    let mut feed = client.get_messages(&room);
    let senders: Vec<_> = next(&mut feed).await.items.into_iter().map(|m| m.sender_id).collect();
    assert_eq!(senders, vec![uid("b"), uid("b"), uid("a")]);
}

#[tokio::test]
async fn deleting_a_room_is_owner_only_and_ends_its_feed() {
    let client = client();
    let room = group(&client, "a", &["b"]).await;
    client.send_message(&room, &uid("a"), "hi").await.unwrap();
    let mut feed = client.get_messages(&room);
    assert_eq!(next(&mut feed).await.items.len(), 1);

    let err = client.delete_room(&room, &uid("b")).await.unwrap_err();
    assert!(matches!(err, SyncError::Permission(_)));
    assert!(client.delete_room(&room, &uid("a")).await.unwrap());
    assert!(!client.delete_room(&room, &uid("a")).await.unwrap());

    let item = tokio::time::timeout(Duration::from_secs(5), feed.next())
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(item, Err(SyncError::NotFound(_))));
    assert!(feed.next().await.is_none());
}

#[tokio::test]
async fn directory_updates_live_and_cancel_stops_it() {
    let client = client();
    let mut rooms = client.get_rooms_for_user(&uid("c"));
    let first = next(&mut rooms).await;
    assert!(first.items.is_empty());

    let room = group(&client, "a", &["c"]).await;
    let second = next(&mut rooms).await;
    assert!(second.version > first.version);
    assert_eq!(second.items.len(), 1);

    client.send_message(&room, &uid("a"), "ping").await.unwrap();
    let third = next(&mut rooms).await;
    assert_eq!(third.items[0].unread_for(&uid("c")), 1);

    rooms.cancel();
    client.send_message(&room, &uid("a"), "ping again").await.unwrap();
    assert!(rooms.next().await.is_none());
}

#[tokio::test]
async fn failed_send_leaves_feed_running() {
    let client = client();
    let room = group(&client, "a", &["b"]).await;
    let mut feed = client.get_messages(&room);
    next(&mut feed).await;

    assert!(client.send_message(&room, &uid("z"), "intruder").await.is_err());
    client.send_message(&room, &uid("b"), "legit").await.unwrap();

    let snapshot = next(&mut feed).await;
    assert_eq!(snapshot.items.len(), 1);
    assert_eq!(snapshot.items[0].text, "legit");
}

#[tokio::test]
async fn profiles_settings_and_avatar() {
    let dir = tempfile::tempdir().unwrap();
    let config = ClientConfig {
        blob_dir: dir.path().join("blobs"),
        ..ClientConfig::default()
    };
    let client = ChatClient::in_memory(config).unwrap();
    let a = uid("a");

    client.register_user(&a, "Ann", None, Some("ann@example.com".into())).await.unwrap();
    let err = client.register_user(&a, "Ann", None, None).await.unwrap_err();
    assert!(matches!(err, SyncError::Validation(ValidationError::AlreadyExists(_))));

    let settings = client.ensure_settings(&a).await.unwrap();
    assert_eq!(settings.theme, Theme::System);
    let mut changed = settings.clone();
    changed.theme = Theme::Dark;
    client.update_settings(&a, &changed).await.unwrap();
    assert_eq!(client.ensure_settings(&a).await.unwrap().theme, Theme::Dark);

    let patch = ProfilePatch {
        name: Some("Annie".into()),
        ..ProfilePatch::default()
    };
    let err = client.update_profile(&uid("b"), &a, patch.clone()).await.unwrap_err();
    assert!(matches!(err, SyncError::Permission(_)));
    let updated = client.update_profile(&a, &a, patch).await.unwrap();
    assert_eq!(updated.name, "Annie");
    assert_eq!(updated.email.as_deref(), Some("ann@example.com"));

    let url = client.upload_avatar(&a, b"png-bytes").await.unwrap();
    assert!(url.starts_with("file://"));
    assert_eq!(client.get_profile(&a).await.unwrap().avatar_url, Some(url));

    let err = client.get_profile(&uid("ghost")).await.unwrap_err();
    assert!(matches!(err, SyncError::NotFound(_)));
}

#[tokio::test]
async fn user_feed_rebuilds_directory_cache() {
    let client = client();
    let mut users_feed = client.watch_users();
    let mut cache = roomsync_client::UserDirectory::new();

    cache.rebuild(next(&mut users_feed).await.items);
    assert!(cache.is_empty());

    client.register_user(&uid("a"), "Ann", None, None).await.unwrap();
    cache.rebuild(next(&mut users_feed).await.items);
    assert_eq!(cache.name_of(&uid("a")), Some("Ann"));

    users_feed.cancel();
    cache.clear();
    assert!(cache.is_empty());
}

#[tokio::test]
async fn returned_documents_equal_what_feeds_deliver() {
    let client = client();
    let room = group(&client, "a", &["b"]).await;

    let sent = client.send_message(&room, &uid("a"), "hello").await.unwrap();
    let mut feed = client.get_messages(&room);
    assert_eq!(next(&mut feed).await.items, vec![sent]);

    let contact = client.add_contact(&uid("a"), "Bob", "5551234567", None).await.unwrap();
    let mut contacts = client.get_contacts(&uid("a"));
    assert_eq!(next(&mut contacts).await.items, vec![contact]);

    let profile = client.register_user(&uid("a"), "Ann", None, None).await.unwrap();
    assert_eq!(client.get_profile(&uid("a")).await.unwrap(), profile);
}

#[tokio::test]
async fn direct_rooms_keep_exactly_their_pair() {
    let client = client();
    let room = client
        .create_room(&uid("alice"), RoomKind::Direct, "", &[uid("bob")])
        .await
        .unwrap();

    let err = client
        .add_members(&room, &uid("alice"), &[uid("carol")])
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::Validation(ValidationError::InvalidMembers(_))));

    let err = client.remove_member(&room, &uid("bob"), &uid("bob")).await.unwrap_err();
    assert!(matches!(err, SyncError::Validation(ValidationError::InvalidMembers(_))));

    let again = client
        .create_room(&uid("bob"), RoomKind::Direct, "", &[uid("alice")])
        .await
        .unwrap();
    assert_eq!(again, room);
    let state = client.get_room(&room).await.unwrap();
    assert_eq!(state.members.len(), 2);
    client.send_message(&room, &uid("bob"), "still here").await.unwrap();
}

#[test]
#[should_panic]
fn feeds_require_a_runtime() {
    let client = client();
    let _feed = client.get_rooms_for_user(&uid("a"));
}

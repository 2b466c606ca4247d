//! End-to-end flows through both components against one SQLite database.

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};

use parley_db::Database;
use parley_messaging::{ManualClock, Messaging, MessagingError, NoopNotifier};
use parley_types::models::{ConversationId, PublicProfile, UserId};

fn user(id: i64, handle: &str) -> PublicProfile {
    PublicProfile {
        id: UserId(id),
        first_name: handle.to_uppercase(),
        last_name: "Tester".into(),
        handle: handle.into(),
        avatar_url: Some(format!("https://avatars.example/{handle}.png")),
    }
}

fn setup(users: &[(i64, &str)]) -> (Messaging, Arc<ManualClock>) {
    let db = Arc::new(Database::open_in_memory().unwrap());
    for (id, handle) in users {
        db.create_user(&user(*id, handle)).unwrap();
    }
    let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 5, 4, 8, 0, 0).unwrap()));
    let messaging = Messaging::from_database(db, clock.clone(), Arc::new(NoopNotifier));
    (messaging, clock)
}

#[test]
fn hello_between_seven_and_forty_two() {
    let (m, _clock) = setup(&[(7, "seven"), (42, "fortytwo")]);

    let conv = m.conversations.get_or_create(UserId(42), UserId(7)).unwrap();
    assert_eq!(conv.conversation.low_user_id, UserId(7));
    assert_eq!(conv.conversation.high_user_id, UserId(42));
    assert_eq!(conv.low_user.handle, "seven");
    let conv_id = conv.conversation.id;

    let hello = m.messages.append(conv_id, UserId(7), "hello").unwrap();
    assert_eq!(hello.sender_id, UserId(7));
    assert!(!hello.is_read);

    let page = m.messages.list_by_conversation(conv_id, 1, 20, UserId(42)).unwrap();
    assert_eq!(page.messages.len(), 1);
    assert_eq!(page.messages[0].message.body, "hello");
    assert_eq!(page.messages[0].sender.handle, "seven");

    assert_eq!(m.messages.unread_count(UserId(42), Some(conv_id)).unwrap(), 1);
    assert_eq!(m.messages.mark_read(&[hello.id], UserId(42)).unwrap(), 1);
    assert_eq!(m.messages.unread_count(UserId(42), Some(conv_id)).unwrap(), 0);
}

#[test]
fn three_unread_from_b_to_a() {
    let (m, clock) = setup(&[(1, "a"), (2, "b")]);
    let conv = m.conversations.get_or_create(UserId(1), UserId(2)).unwrap().conversation.id;

    let mut ids = Vec::new();
    for body in ["x", "y", "z"] {
        clock.advance(Duration::milliseconds(250));
        ids.push(m.messages.append(conv, UserId(2), body).unwrap().id);
    }

    assert_eq!(m.messages.unread_count(UserId(1), None).unwrap(), 3);
    assert_eq!(m.messages.unread_count(UserId(2), None).unwrap(), 0);

    assert_eq!(m.messages.mark_read(&ids, UserId(1)).unwrap(), 3);
    assert_eq!(m.messages.unread_count(UserId(1), None).unwrap(), 0);
}

#[test]
fn activity_reorders_conversation_list() {
    let (m, clock) = setup(&[(1, "me"), (2, "old"), (3, "new")]);

    let c1 = m.conversations.get_or_create(UserId(1), UserId(2)).unwrap().conversation.id;
    clock.advance(Duration::seconds(1));
    let c2 = m.conversations.get_or_create(UserId(3), UserId(1)).unwrap().conversation.id;

    let order: Vec<_> = m
        .conversations
        .list_for_user(UserId(1))
        .unwrap()
        .iter()
        .map(|v| v.conversation_id)
        .collect();
    assert_eq!(order, vec![c2, c1]);

    clock.advance(Duration::seconds(1));
    m.messages.append(c1, UserId(2), "bump").unwrap();

    let views = m.conversations.list_for_user(UserId(1)).unwrap();
    assert_eq!(views[0].conversation_id, c1);
    assert_eq!(views[0].other_participant.handle, "old");
    assert_eq!(views[1].other_participant.handle, "new");
}

#[test]
fn not_found_and_forbidden_stay_distinct() {
    let (m, _clock) = setup(&[(1, "a"), (2, "b"), (3, "c")]);
    let conv = m.conversations.get_or_create(UserId(1), UserId(2)).unwrap().conversation.id;

    let forbidden = m.messages.list_by_conversation(conv, 1, 10, UserId(3)).unwrap_err();
    let missing = m
        .messages
        .list_by_conversation(ConversationId(conv.0 + 100), 1, 10, UserId(3))
        .unwrap_err();

    assert_eq!(forbidden.code(), "forbidden");
    assert_eq!(missing.code(), "conversation_not_found");
    assert!(matches!(forbidden, MessagingError::Forbidden { .. }));
}

use std::path::Path;
use std::sync::Arc;

use murmur_db::Database;
use uuid::Uuid;

fn open_db() -> Database {
    Database::open(Path::new(":memory:")).expect("open in-memory db")
}

fn uid() -> String {
    Uuid::new_v4().to_string()
}

#[test]
fn find_or_create_is_keyed_on_unordered_pair() {
    let db = open_db();
    let (alice, bob) = (uid(), uid());

    let c1 = db
        .find_or_create_conversation(&uid(), &alice, &bob, "hi", &alice)
        .unwrap();
    let c2 = db
        .find_or_create_conversation(&uid(), &bob, &alice, "hey", &bob)
        .unwrap();

    assert_eq!(c1.id, c2.id);
    // The initial snapshot belongs to the first creator and is not
    // overwritten by the no-op second upsert.
    assert_eq!(c2.last_message_text, "hi");
    assert_eq!(c2.last_message_sender, alice);
    assert!(!c2.last_message_seen);
}

#[test]
fn concurrent_first_messages_create_one_conversation() {
    let db = Arc::new(open_db());
    let (alice, bob) = (uid(), uid());

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let db = db.clone();
            let (a, b) = if i % 2 == 0 {
                (alice.clone(), bob.clone())
            } else {
                (bob.clone(), alice.clone())
            };
            std::thread::spawn(move || {
                db.find_or_create_conversation(&uid(), &a, &b, "first", &a)
                    .unwrap()
                    .id
            })
        })
        .collect();

    let ids: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(ids.windows(2).all(|w| w[0] == w[1]), "duplicate conversations: {ids:?}");
}

#[test]
fn messages_list_in_creation_order() {
    let db = open_db();
    let (alice, bob) = (uid(), uid());
    let conv = db
        .find_or_create_conversation(&uid(), &alice, &bob, "0", &alice)
        .unwrap();

    let mut sent = Vec::new();
    for i in 0..5 {
        let id = uid();
        db.append_message(&id, &conv.id, &alice, &format!("msg {i}"), "")
            .unwrap();
        sent.push(id);
    }

    let listed: Vec<String> = db
        .list_messages(&conv.id)
        .unwrap()
        .into_iter()
        .map(|m| m.id)
        .collect();
    assert_eq!(listed, sent);
}

#[test]
fn append_refreshes_last_message_cache() {
    let db = open_db();
    let (alice, bob) = (uid(), uid());
    let conv = db
        .find_or_create_conversation(&uid(), &alice, &bob, "hello", &alice)
        .unwrap();
    db.mark_conversation_seen(&conv.id).unwrap();

    db.append_message(&uid(), &conv.id, &bob, "reply", "").unwrap();

    let conv = db.get_conversation(&conv.id).unwrap().unwrap();
    assert_eq!(conv.last_message_text, "reply");
    assert_eq!(conv.last_message_sender, bob);
    assert!(!conv.last_message_seen, "new message resets the seen flag");
}

#[test]
fn seen_flags_converge() {
    let db = open_db();
    let (alice, bob) = (uid(), uid());
    let conv = db
        .find_or_create_conversation(&uid(), &alice, &bob, "hi", &alice)
        .unwrap();
    for i in 0..3 {
        db.append_message(&uid(), &conv.id, &alice, &format!("m{i}"), "")
            .unwrap();
    }

    let changed = db.mark_messages_seen(&conv.id).unwrap();
    assert_eq!(changed, 3);
    db.mark_conversation_seen(&conv.id).unwrap();

    assert!(db.list_messages(&conv.id).unwrap().iter().all(|m| m.seen));
    assert!(db.get_conversation(&conv.id).unwrap().unwrap().last_message_seen);

    // Re-marking is a no-op, not an error.
    assert_eq!(db.mark_messages_seen(&conv.id).unwrap(), 0);
}

#[test]
fn image_only_message_is_valid() {
    let db = open_db();
    let (alice, bob) = (uid(), uid());
    let conv = db
        .find_or_create_conversation(&uid(), &alice, &bob, "", &alice)
        .unwrap();

    let msg = db
        .append_message(&uid(), &conv.id, &alice, "", "https://cdn.example/abc.png")
        .unwrap();
    assert_eq!(msg.text, "");
    assert_eq!(msg.img, "https://cdn.example/abc.png");
}

#[test]
fn reaction_toggle_is_idempotent_in_pairs() {
    let db = open_db();
    let (alice, bob) = (uid(), uid());
    let conv = db
        .find_or_create_conversation(&uid(), &alice, &bob, "hi", &alice)
        .unwrap();
    let mid = uid();
    db.append_message(&mid, &conv.id, &alice, "react to me", "")
        .unwrap();

    let (_, reactions) = db.toggle_reaction(&mid, &bob, "👍").unwrap().unwrap();
    assert_eq!(reactions.len(), 1);
    assert_eq!(reactions[0].emoji, "👍");

    let (_, reactions) = db.toggle_reaction(&mid, &bob, "👍").unwrap().unwrap();
    assert!(reactions.is_empty(), "second toggle removes the reaction");
}

#[test]
fn switching_emoji_keeps_one_reaction_per_user() {
    let db = open_db();
    let (alice, bob) = (uid(), uid());
    let conv = db
        .find_or_create_conversation(&uid(), &alice, &bob, "hi", &alice)
        .unwrap();
    let mid = uid();
    db.append_message(&mid, &conv.id, &alice, "react", "").unwrap();

    db.toggle_reaction(&mid, &bob, "👍").unwrap().unwrap();
    let (_, reactions) = db.toggle_reaction(&mid, &bob, "😂").unwrap().unwrap();

    assert_eq!(reactions.len(), 1);
    assert_eq!(reactions[0].emoji, "😂");
    assert_eq!(reactions[0].user_id, bob);
}

#[test]
fn concurrent_toggles_by_distinct_users_both_land() {
    let db = Arc::new(open_db());
    let (alice, bob) = (uid(), uid());
    let conv = db
        .find_or_create_conversation(&uid(), &alice, &bob, "hi", &alice)
        .unwrap();
    let mid = uid();
    db.append_message(&mid, &conv.id, &alice, "race", "").unwrap();

    let handles: Vec<_> = [(alice.clone(), "👍"), (bob.clone(), "😂")]
        .into_iter()
        .map(|(user, emoji)| {
            let db = db.clone();
            let mid = mid.clone();
            std::thread::spawn(move || {
                db.toggle_reaction(&mid, &user, emoji).unwrap().unwrap();
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let reactions = db
        .get_reactions_for_messages(&[mid.clone()])
        .unwrap();
    let mut emojis: Vec<&str> = reactions.iter().map(|r| r.emoji.as_str()).collect();
    emojis.sort();
    assert_eq!(emojis, ["👍", "😂"], "a concurrent toggle was lost");
}

#[test]
fn toggle_on_unknown_message_is_not_found() {
    let db = open_db();
    assert!(db.toggle_reaction(&uid(), &uid(), "👍").unwrap().is_none());
}

#[test]
fn conversation_listing_resolves_the_other_profile() {
    let db = open_db();
    let (alice, bob) = (uid(), uid());
    db.create_user(&alice, "alice", "hash-a", "https://cdn.example/a.png")
        .unwrap();
    db.create_user(&bob, "bob", "hash-b", "").unwrap();

    db.find_or_create_conversation(&uid(), &alice, &bob, "hi bob", &alice)
        .unwrap();

    let listed = db.list_conversations_for_user(&alice).unwrap();
    assert_eq!(listed.len(), 1);
    let other = listed[0].1.as_ref().expect("peer profile resolved");
    assert_eq!(other.id, bob);
    assert_eq!(other.username, "bob");

    // Bob sees Alice, not himself.
    let listed = db.list_conversations_for_user(&bob).unwrap();
    let other = listed[0].1.as_ref().unwrap();
    assert_eq!(other.username, "alice");

    // A stranger sees nothing.
    assert!(db.list_conversations_for_user(&uid()).unwrap().is_empty());
}

#[test]
fn missing_pair_has_no_conversation() {
    let db = open_db();
    assert!(db.conversation_for_pair(&uid(), &uid()).unwrap().is_none());
}

//! Fork-safety scenarios over the full live path: dispersal, undo
//! registration, revert, and replay on an alternate chain.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use serde_json::{json, Value};

use lt_01_content_store::{ContentStore, MemoryKv};
use lt_02_projection::{ForkEngine, ProjectionConfig, Projector};
use shared_types::{BlockEnvelope, RawOperation};

fn projector() -> Projector<MemoryKv> {
    let store = Arc::new(ContentStore::new(MemoryKv::new()));
    Projector::new(store, ProjectionConfig::default())
}

fn block(num: u64, ops: Vec<RawOperation>) -> BlockEnvelope {
    BlockEnvelope {
        block_num: num,
        block_time: Utc.timestamp_opt(1_500_000_000 + num as i64 * 3, 0).unwrap(),
        sequence: num,
        real_ops: ops,
        virtual_ops: Vec::new(),
    }
}

fn op(kind: &str, payload: Value) -> RawOperation {
    RawOperation::new(kind, payload)
}

fn post(author: &str, permlink: &str) -> RawOperation {
    op(
        "createmssg",
        json!({"author": author, "permlink": permlink, "title": "title", "body": "body"}),
    )
}

fn comment(author: &str, permlink: &str, parent_author: &str, parent_permlink: &str) -> RawOperation {
    op(
        "createmssg",
        json!({
            "author": author,
            "permlink": permlink,
            "body": "reply",
            "parent_author": parent_author,
            "parent_permlink": parent_permlink,
        }),
    )
}

/// Full view of the materialized state, for equality comparison.
fn snapshot(projector: &Projector<MemoryKv>) -> BTreeMap<String, Value> {
    let mut view = BTreeMap::new();
    for collection in ["posts", "comments", "profiles", "leaders", "proposals"] {
        for (id, doc) in projector.store().scan_collection(collection).unwrap() {
            view.insert(format!("{}/{}", collection, id), doc);
        }
    }
    view
}

#[test]
fn end_to_end_comment_then_fork() {
    let projector = projector();

    // Block #100 carries a root post, #101 a comment under it.
    projector
        .disperse(&block(100, vec![post("alice", "hello")]))
        .unwrap();
    projector
        .disperse(&block(
            101,
            vec![comment("bob", "re-hello", "alice", "hello")],
        ))
        .unwrap();

    let post_doc = projector
        .store()
        .get_document("posts", "alice/hello")
        .unwrap()
        .unwrap();
    assert_eq!(post_doc["stats"]["comments_count"], json!(1));

    let comment_doc = projector
        .store()
        .get_document("comments", "bob/re-hello")
        .unwrap()
        .unwrap();
    assert_eq!(comment_doc["ordering"]["by_time"], json!("1"));
    assert_eq!(comment_doc["ordering"]["nested_level"], json!(1));
    assert_eq!(
        comment_doc["parent"]["post"],
        json!({"user_id": "alice", "permlink": "hello"})
    );

    // Fork before #102: both blocks unwind.
    projector.fork().revert().unwrap();

    assert!(projector
        .store()
        .get_document("comments", "bob/re-hello")
        .unwrap()
        .is_none());
    assert!(projector
        .store()
        .get_document("posts", "alice/hello")
        .unwrap()
        .is_none());
    assert_eq!(projector.store().checkpoint().unwrap().last_block_num, 99);
}

#[test]
fn revert_restores_exact_pre_block_state_across_entities() {
    let projector = projector();

    // Settle some state first.
    projector
        .disperse(&block(
            10,
            vec![
                post("alice", "p"),
                op("regwitness", json!({"witness": "dan", "url": "https://dan"})),
            ],
        ))
        .unwrap();

    let before = snapshot(&projector);
    let checkpoint_before = projector.store().checkpoint().unwrap();

    // One block touching every entity kind.
    projector
        .disperse(&block(
            11,
            vec![
                comment("bob", "c1", "alice", "p"),
                op(
                    "votewitness",
                    json!({"voter": "carol", "witness": "dan", "events": [{"args": {"weight": 9}}]}),
                ),
                op("stopwitness", json!({"witness": "dan"})),
                op(
                    "propose",
                    json!({
                        "proposer": "dan",
                        "proposal_name": "cut-fees",
                        "requested": [{"actor": "erin", "permission": "active"}],
                        "trx": {
                            "expiration": "2019-09-01T00:00:00.000",
                            "actions": [{
                                "account": "gls.publish",
                                "name": "setparams",
                                "data": {"params": [["st_curation_percent", {"percent": 2500}]]},
                            }],
                        },
                    }),
                ),
            ],
        ))
        .unwrap();

    assert_ne!(snapshot(&projector), before);

    projector.fork().revert_last_block().unwrap();

    assert_eq!(snapshot(&projector), before);
    assert_eq!(
        projector.store().checkpoint().unwrap().last_block_num,
        checkpoint_before.last_block_num
    );
}

#[test]
fn fork_replay_equals_straight_line_history() {
    // Chain A: B1..B5; fork invalidates B3..B5 (B1 and B2 are already
    // outside the undo window); chain B replaces them with B3'..B5'.
    let forked = projector();

    let b1 = block(1, vec![post("alice", "p1")]);
    let b2 = block(
        2,
        vec![op("regwitness", json!({"witness": "dan", "url": "https://dan"}))],
    );
    let b3 = block(3, vec![post("mallory", "junk")]);
    let b4 = block(4, vec![comment("mallory", "spam", "alice", "p1")]);
    let b5 = block(5, vec![op("stopwitness", json!({"witness": "dan"}))]);

    for b in [&b1, &b2, &b3, &b4, &b5] {
        forked.disperse(b).unwrap();
    }

    // B1/B2 left the fork window before the reorg.
    let engine = ForkEngine::new(forked.store_handle());
    engine.prune(3).unwrap();
    engine.revert().unwrap();
    assert_eq!(forked.store().checkpoint().unwrap().last_block_num, 2);

    let b3_alt = block(3, vec![post("bob", "real")]);
    let b4_alt = block(4, vec![comment("carol", "nice", "bob", "real")]);
    let b5_alt = block(
        5,
        vec![op(
            "votewitness",
            json!({"voter": "carol", "witness": "dan", "events": [{"args": {"weight": 5}}]}),
        )],
    );

    for b in [&b3_alt, &b4_alt, &b5_alt] {
        forked.disperse(b).unwrap();
    }

    // Straight-line history: B1, B2, B3', B4', B5' from empty.
    let straight = projector();
    for b in [&b1, &b2, &b3_alt, &b4_alt, &b5_alt] {
        straight.disperse(b).unwrap();
    }

    assert_eq!(snapshot(&forked), snapshot(&straight));
    assert_eq!(
        forked.store().checkpoint().unwrap(),
        straight.store().checkpoint().unwrap()
    );
}

#[test]
fn nested_thread_ordering_survives_fork_replay() {
    let projector = self::projector();

    projector.disperse(&block(1, vec![post("alice", "p")])).unwrap();
    projector
        .disperse(&block(
            2,
            vec![
                comment("bob", "c1", "alice", "p"),
                comment("carol", "c2", "bob", "c1"),
                comment("dave", "c3", "alice", "p"),
            ],
        ))
        .unwrap();

    let key_of = |id: &str| {
        projector
            .store()
            .get_document("comments", id)
            .unwrap()
            .unwrap()["ordering"]["by_time"]
            .as_str()
            .unwrap()
            .to_string()
    };
    assert_eq!(key_of("bob/c1"), "1");
    assert_eq!(key_of("carol/c2"), "1-2");
    assert_eq!(key_of("dave/c3"), "3");

    // Revert block 2 and replay the same comments: the counter rewinds
    // with the post, so the keys come out identical.
    projector.fork().revert_last_block().unwrap();
    projector
        .disperse(&block(
            2,
            vec![
                comment("bob", "c1", "alice", "p"),
                comment("carol", "c2", "bob", "c1"),
                comment("dave", "c3", "alice", "p"),
            ],
        ))
        .unwrap();

    assert_eq!(key_of("bob/c1"), "1");
    assert_eq!(key_of("carol/c2"), "1-2");
    assert_eq!(key_of("dave/c3"), "3");
}

#[test]
fn orphan_comment_is_stored_unlinked() {
    let projector = projector();

    projector
        .disperse(&block(
            7,
            vec![comment("bob", "lost", "nobody", "missing")],
        ))
        .unwrap();

    let doc = projector
        .store()
        .get_document("comments", "bob/lost")
        .unwrap()
        .unwrap();
    assert_eq!(doc["parent"]["post"], Value::Null);
    assert_eq!(doc["ordering"]["by_time"], Value::Null);
}

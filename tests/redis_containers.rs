//! End-to-end Redis tests against a real container.
//!
//! These need a running Docker daemon, so they are ignored by default:
//!
//! ```text
//! cargo test --test redis_containers -- --ignored
//! ```

use redis::AsyncCommands;
use reusable_containers::redis::{self, Entry};
use reusable_containers::skip_if_disabled;
use tokio_util::sync::CancellationToken;

#[tokio::test(flavor = "multi_thread")]
#[ignore = "requires a running Docker daemon"]
async fn test_declared_entries_are_seeded() {
    skip_if_disabled!();

    let entries = [Entry::new("greeting", "hello")];
    let handle = redis::global_reusable()
        .run(CancellationToken::new(), &entries)
        .await
        .unwrap();

    let mut connection = handle.connection();
    let value: String = connection.get("greeting").await.unwrap();
    assert_eq!(value, "hello");

    handle.release().await;
}

#[tokio::test(flavor = "multi_thread")]
#[ignore = "requires a running Docker daemon"]
async fn test_seeding_does_not_clobber_existing_keys() {
    skip_if_disabled!();

    let reusable = redis::global_reusable();

    let first = reusable
        .run(CancellationToken::new(), &[Entry::new("winner", "first")])
        .await
        .unwrap();
    // SET NX: the second declaration loses.
    let second = reusable
        .run(CancellationToken::new(), &[Entry::new("winner", "second")])
        .await
        .unwrap();

    let mut connection = second.connection();
    let value: String = connection.get("winner").await.unwrap();
    assert_eq!(value, "first");

    first.release().await;
    second.release().await;
}

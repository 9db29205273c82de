#![forbid(unsafe_code)]
//! Filesystem-backed persistence store for the Directory Server (spec §4.2).
//!
//! The layout under the store root is the wire format of this crate: every
//! read and write goes through [`paths`], and [`store::Store`] is the only
//! type that sequences multi-file operations (user/group creation, message
//! posting) so they commit or roll back as a unit.

pub mod paths;
pub mod store;

pub use store::{GroupSummary, Message, Store};

#[cfg(test)]
mod tests {
    use super::*;
    use ds_proto::{Fname, GName, Gid, Mid, Pass, Uid};

    async fn open_tmp() -> (tempfile::TempDir, Store) {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).await.unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn registers_and_logs_in() {
        let (_tmp, store) = open_tmp().await;
        let uid = Uid::parse("10001").unwrap();
        let pass = Pass::parse("abcd1234").unwrap();

        assert!(!store.user_exists(&uid).await);
        assert!(store.create_user(&uid, &pass).await.is_ok());
        assert_eq!(store.create_user(&uid, &pass).await, ds_proto::Outcome::Duplicate);

        assert!(store.check_password(&uid, &pass).await.is_ok());
        let wrong = Pass::parse("zzzz9999").unwrap();
        assert_eq!(store.check_password(&uid, &wrong).await, ds_proto::Outcome::Invalid);

        assert!(!store.user_logged_in(&uid).await);
        assert!(store.set_login(&uid).await.is_ok());
        assert!(store.user_logged_in(&uid).await);
        assert!(store.clear_login(&uid).await.is_ok());
        assert!(!store.user_logged_in(&uid).await);
    }

    #[tokio::test]
    async fn unregister_cascades_subscriptions() {
        let (_tmp, store) = open_tmp().await;
        let uid = Uid::parse("10002").unwrap();
        let pass = Pass::parse("abcd1234").unwrap();
        store.create_user(&uid, &pass).await;

        let gname = GName::parse("news").unwrap();
        let gid = store.create_group(&uid, &gname).await.unwrap();
        assert!(store.is_subscribed(&uid, &gid).await);

        assert!(store.delete_user(&uid).await.is_ok());
        assert!(!store.user_exists(&uid).await);
        assert!(!store.is_subscribed(&uid, &gid).await);
        // the group itself, and its archive, survive the creator's departure
        assert!(store.group_exists(&gid).await);

        assert_eq!(store.delete_user(&uid).await, ds_proto::Outcome::NotFound);
    }

    #[tokio::test]
    async fn subscribe_checks_group_name() {
        let (_tmp, store) = open_tmp().await;
        let owner = Uid::parse("10003").unwrap();
        store.create_user(&owner, &Pass::parse("abcd1234").unwrap()).await;
        let gname = GName::parse("sports").unwrap();
        let gid = store.create_group(&owner, &gname).await.unwrap();

        let joiner = Uid::parse("10004").unwrap();
        store.create_user(&joiner, &Pass::parse("abcd1234").unwrap()).await;

        let wrong_name = GName::parse("sportz").unwrap();
        assert_eq!(
            store.subscribe(&joiner, &gid, &wrong_name).await,
            ds_proto::Outcome::Invalid
        );
        assert!(store.subscribe(&joiner, &gid, &gname).await.is_ok());
        assert!(store.is_subscribed(&joiner, &gid).await);

        assert!(store.unsubscribe(&joiner, &gid).await.is_ok());
        assert_eq!(
            store.unsubscribe(&joiner, &gid).await,
            ds_proto::Outcome::NotSubscribed
        );
    }

    #[tokio::test]
    async fn lists_all_and_subscribed_groups_gid_ascending() {
        let (_tmp, store) = open_tmp().await;
        let owner = Uid::parse("10005").unwrap();
        store.create_user(&owner, &Pass::parse("abcd1234").unwrap()).await;

        let first = store.create_group(&owner, &GName::parse("alpha").unwrap()).await.unwrap();
        let second = store.create_group(&owner, &GName::parse("beta").unwrap()).await.unwrap();
        assert!(first.value() < second.value());

        let all = store.list_all_groups().await;
        assert_eq!(all.len(), 2);
        assert!(all[0].gid.value() < all[1].gid.value());

        let other = Uid::parse("10006").unwrap();
        store.create_user(&other, &Pass::parse("abcd1234").unwrap()).await;
        assert!(store.list_subscribed_groups(&other).await.is_empty());
        store.subscribe(&other, &second, &GName::parse("beta").unwrap()).await;
        let subscribed = store.list_subscribed_groups(&other).await;
        assert_eq!(subscribed.len(), 1);
        assert_eq!(subscribed[0].gid, second);
    }

    #[tokio::test]
    async fn posts_and_retrieves_messages_in_order() {
        let (_tmp, store) = open_tmp().await;
        let uid = Uid::parse("10007").unwrap();
        store.create_user(&uid, &Pass::parse("abcd1234").unwrap()).await;
        let gid = store.create_group(&uid, &GName::parse("chat").unwrap()).await.unwrap();

        for i in 0..3 {
            let text = format!("message {i}");
            let mid = store
                .append_message(&gid, &uid, text.as_bytes(), None)
                .await
                .unwrap();
            assert_eq!(mid.value(), i + 1);
        }

        let messages = store.read_message_range(&gid, Mid::FIRST).await;
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].text, b"message 0");
        assert_eq!(messages[2].text, b"message 2");
        assert!(messages[0].attachment.is_none());
    }

    #[tokio::test]
    async fn posts_with_attachment_round_trip() {
        let (_tmp, store) = open_tmp().await;
        let uid = Uid::parse("10008").unwrap();
        store.create_user(&uid, &Pass::parse("abcd1234").unwrap()).await;
        let gid = store.create_group(&uid, &GName::parse("files").unwrap()).await.unwrap();

        let fname = Fname::parse("report.txt").unwrap();
        let payload = b"binary-ish content".to_vec();
        store
            .append_message(&gid, &uid, b"see attached", Some((&fname, &payload)))
            .await
            .unwrap();

        let messages = store.read_message_range(&gid, Mid::FIRST).await;
        assert_eq!(messages.len(), 1);
        let (got_fname, got_bytes) = messages[0].attachment.as_ref().unwrap();
        assert_eq!(got_fname, &fname);
        assert_eq!(got_bytes, &payload);
    }

    #[tokio::test]
    async fn retrieve_window_caps_at_twenty_and_respects_start() {
        let (_tmp, store) = open_tmp().await;
        let uid = Uid::parse("10009").unwrap();
        store.create_user(&uid, &Pass::parse("abcd1234").unwrap()).await;
        let gid = store.create_group(&uid, &GName::parse("bulk").unwrap()).await.unwrap();

        for i in 0..25 {
            store
                .append_message(&gid, &uid, format!("m{i}").as_bytes(), None)
                .await
                .unwrap();
        }

        let first_window = store.read_message_range(&gid, Mid::FIRST).await;
        assert_eq!(first_window.len(), 20);

        let start = Mid::from_count(21).unwrap();
        let second_window = store.read_message_range(&gid, start).await;
        assert_eq!(second_window.len(), 5);

        let past_end = Mid::from_count(26).unwrap();
        assert!(store.read_message_range(&gid, past_end).await.is_empty());
    }

    #[tokio::test]
    async fn retrieve_skips_message_missing_its_content_file() {
        let (_tmp, store) = open_tmp().await;
        let uid = Uid::parse("10010").unwrap();
        store.create_user(&uid, &Pass::parse("abcd1234").unwrap()).await;
        let gid = store.create_group(&uid, &GName::parse("partial").unwrap()).await.unwrap();

        let mid = store.append_message(&gid, &uid, b"first", None).await.unwrap();
        // Simulate a post that allocated its MID but crashed before the text
        // file landed: mkdir exists, T E X T.txt does not.
        let dir = crate::paths::message_dir(store.root(), &gid, &mid.next());
        tokio::fs::create_dir_all(&dir).await.unwrap();

        let messages = store.read_message_range(&gid, Mid::FIRST).await;
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].text, b"first");
    }

    #[tokio::test]
    async fn group_creation_is_full_once_all_gids_are_taken() {
        let (_tmp, store) = open_tmp().await;
        let uid = Uid::parse("10011").unwrap();
        store.create_user(&uid, &Pass::parse("abcd1234").unwrap()).await;

        for gid in Gid::all_stored() {
            let name = format!("g{}", gid.value());
            let result = store.create_group(&uid, &GName::parse(&name).unwrap()).await;
            assert!(result.is_ok(), "group {gid} should have allocated");
        }

        let overflow = store.create_group(&uid, &GName::parse("overflow").unwrap()).await;
        assert_eq!(overflow.unwrap_err(), ds_proto::Outcome::Full);
    }
}

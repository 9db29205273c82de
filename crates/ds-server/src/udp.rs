//! UDP handlers (spec §4.4): short request/reply transactions for account
//! and group-membership operations. Each handler takes the already-decoded
//! fields of one datagram and returns the exact reply frame, including the
//! trailing `\n`.

use ds_proto::{GName, Gid, Outcome, Pass, Uid, line, tags};
use ds_store::Store;

/// Decodes one UDP datagram and routes it to the matching handler. Unknown
/// tags and malformed lines both reply with a bare `ERR\n` (spec §4.3: "If
/// the command tag is unrecognized, the dispatcher replies with `ERR\n`").
pub async fn dispatch(store: &Store, datagram: &[u8]) -> Vec<u8> {
    let Some((tag, fields)) = line::decode_line(datagram) else {
        return bare_err();
    };
    let fields: Vec<&str> = fields.iter().map(String::as_str).collect();

    match tag.as_str() {
        tags::REG => handle_reg(store, &fields).await,
        tags::UNR => handle_unr(store, &fields).await,
        tags::LOG => handle_log(store, &fields).await,
        tags::OUT => handle_out(store, &fields).await,
        tags::GLS => handle_gls(store).await,
        tags::GSR => handle_gsr(store, &fields).await,
        tags::GUR => handle_gur(store, &fields).await,
        tags::GLM => handle_glm(store, &fields).await,
        _ => bare_err(),
    }
}

fn bare_err() -> Vec<u8> {
    line::encode_line(tags::ERR, &[])
}

fn parse_uid_pass(fields: &[&str]) -> Option<(Uid, Pass)> {
    let [uid, pass] = fields else { return None };
    Some((Uid::parse(uid)?, Pass::parse(pass)?))
}

async fn handle_reg(store: &Store, fields: &[&str]) -> Vec<u8> {
    let Some((uid, pass)) = parse_uid_pass(fields) else {
        return bare_err();
    };
    let status = match store.create_user(&uid, &pass).await {
        Outcome::Ok => tags::OK,
        Outcome::Duplicate => tags::DUP,
        _ => tags::NOK,
    };
    line::encode_line(tags::RRG, &[status])
}

async fn handle_unr(store: &Store, fields: &[&str]) -> Vec<u8> {
    let Some((uid, pass)) = parse_uid_pass(fields) else {
        return bare_err();
    };
    // The server does not refuse an UNR for a currently logged-in user
    // (spec §9 open question): only the password gates the cascading
    // delete, mirroring the client-side-only login check in the original.
    let status = match store.check_password(&uid, &pass).await {
        Outcome::Ok => match store.delete_user(&uid).await {
            Outcome::Ok => tags::OK,
            _ => tags::NOK,
        },
        _ => tags::NOK,
    };
    line::encode_line(tags::RUN, &[status])
}

async fn handle_log(store: &Store, fields: &[&str]) -> Vec<u8> {
    let Some((uid, pass)) = parse_uid_pass(fields) else {
        return bare_err();
    };
    let status = match store.check_password(&uid, &pass).await {
        Outcome::Ok => match store.set_login(&uid).await {
            Outcome::Ok => tags::OK,
            _ => tags::NOK,
        },
        _ => tags::NOK,
    };
    line::encode_line(tags::RLO, &[status])
}

async fn handle_out(store: &Store, fields: &[&str]) -> Vec<u8> {
    let Some((uid, pass)) = parse_uid_pass(fields) else {
        return bare_err();
    };
    let status = match store.check_password(&uid, &pass).await {
        Outcome::Ok => match store.clear_login(&uid).await {
            Outcome::Ok => tags::OK,
            _ => tags::NOK,
        },
        _ => tags::NOK,
    };
    line::encode_line(tags::ROU, &[status])
}

fn format_group_listing(groups: &[ds_store::GroupSummary]) -> Vec<String> {
    let mut fields = vec![groups.len().to_string()];
    for g in groups {
        fields.push(g.gid.to_string());
        fields.push(g.name.to_string());
        fields.push(format!("{:04}", g.last_mid));
    }
    fields
}

async fn handle_gls(store: &Store) -> Vec<u8> {
    let groups = store.list_all_groups().await;
    let fields = format_group_listing(&groups);
    let refs: Vec<&str> = fields.iter().map(String::as_str).collect();
    line::encode_line(tags::RGL, &refs)
}

async fn handle_glm(store: &Store, fields: &[&str]) -> Vec<u8> {
    let [uid] = fields else { return bare_err() };
    let Some(uid) = Uid::parse(uid) else {
        return bare_err();
    };
    // No error status exists in this reply's answer set (spec §4.4); an
    // unknown UID simply has no subscriptions to report.
    let groups = store.list_subscribed_groups(&uid).await;
    let out = format_group_listing(&groups);
    let refs: Vec<&str> = out.iter().map(String::as_str).collect();
    line::encode_line(tags::RGM, &refs)
}

async fn handle_gsr(store: &Store, fields: &[&str]) -> Vec<u8> {
    let [uid_field, gid_field, gname_field] = fields else {
        return bare_err();
    };
    let Some(uid) = Uid::parse(uid_field) else {
        return line::encode_line(tags::RGS, &[tags::E_USR]);
    };
    let Some(gid) = Gid::parse(gid_field) else {
        return line::encode_line(tags::RGS, &[tags::E_GRP]);
    };
    let Some(gname) = GName::parse(gname_field) else {
        return line::encode_line(tags::RGS, &[tags::E_GNAME]);
    };
    if !store.user_exists(&uid).await {
        return line::encode_line(tags::RGS, &[tags::E_USR]);
    }

    if gid.is_create_sentinel() {
        match store.create_group(&uid, &gname).await {
            Ok(new_gid) => {
                let gid_str = new_gid.to_string();
                line::encode_line(tags::RGS, &[tags::NEW, &gid_str])
            }
            Err(Outcome::Full) => line::encode_line(tags::RGS, &[tags::E_FULL]),
            Err(_) => line::encode_line(tags::RGS, &[tags::NOK]),
        }
    } else {
        let status = match store.subscribe(&uid, &gid, &gname).await {
            Outcome::Ok => tags::OK,
            Outcome::NotFound => tags::E_GRP,
            Outcome::Invalid => tags::E_GNAME,
            _ => tags::NOK,
        };
        line::encode_line(tags::RGS, &[status])
    }
}

async fn handle_gur(store: &Store, fields: &[&str]) -> Vec<u8> {
    let [uid_field, gid_field] = fields else {
        return bare_err();
    };
    let Some(uid) = Uid::parse(uid_field) else {
        return line::encode_line(tags::RGU, &[tags::E_USR]);
    };
    let Some(gid) = Gid::parse(gid_field) else {
        return line::encode_line(tags::RGU, &[tags::E_GRP]);
    };
    if !store.user_exists(&uid).await {
        return line::encode_line(tags::RGU, &[tags::E_USR]);
    }
    if !store.group_exists(&gid).await {
        return line::encode_line(tags::RGU, &[tags::E_GRP]);
    }
    if !store.user_logged_in(&uid).await {
        return line::encode_line(tags::RGU, &[tags::NOK]);
    }
    let status = match store.unsubscribe(&uid, &gid).await {
        Outcome::Ok => tags::OK,
        _ => tags::NOK,
    };
    line::encode_line(tags::RGU, &[status])
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> (tempfile::TempDir, Store) {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).await.unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn register_then_duplicate() {
        let (_tmp, store) = store().await;
        let reply = dispatch(&store, b"REG 10000 abcdefgh\n").await;
        assert_eq!(reply, b"RRG OK\n");
        let reply = dispatch(&store, b"REG 10000 abcdefgh\n").await;
        assert_eq!(reply, b"RRG DUP\n");
    }

    #[tokio::test]
    async fn malformed_uid_is_bare_err() {
        let (_tmp, store) = store().await;
        let reply = dispatch(&store, b"REG 1 abcdefgh\n").await;
        assert_eq!(reply, b"ERR\n");
    }

    #[tokio::test]
    async fn login_round_trip() {
        let (_tmp, store) = store().await;
        dispatch(&store, b"REG 10001 abcdefgh\n").await;
        assert_eq!(dispatch(&store, b"LOG 10001 abcdefgh\n").await, b"RLO OK\n");
        assert_eq!(dispatch(&store, b"LOG 10001 wrongpass\n").await, b"RLO NOK\n");
        assert_eq!(dispatch(&store, b"OUT 10001 abcdefgh\n").await, b"ROU OK\n");
    }

    #[tokio::test]
    async fn unregister_is_idempotent() {
        let (_tmp, store) = store().await;
        dispatch(&store, b"REG 10002 abcdefgh\n").await;
        assert_eq!(dispatch(&store, b"UNR 10002 abcdefgh\n").await, b"RUN OK\n");
        assert_eq!(dispatch(&store, b"UNR 10002 abcdefgh\n").await, b"RUN NOK\n");
    }

    #[tokio::test]
    async fn create_and_list_group() {
        let (_tmp, store) = store().await;
        dispatch(&store, b"REG 10003 abcdefgh\n").await;
        let reply = dispatch(&store, b"GSR 10003 00 demo\n").await;
        assert_eq!(reply, b"RGS NEW 01\n");
        let reply = dispatch(&store, b"GLS\n").await;
        assert_eq!(reply, b"RGL 1 01 demo 0000\n");
    }

    #[tokio::test]
    async fn subscribe_rejects_unknown_group() {
        let (_tmp, store) = store().await;
        dispatch(&store, b"REG 10004 abcdefgh\n").await;
        let reply = dispatch(&store, b"GSR 10004 42 demo\n").await;
        assert_eq!(reply, b"RGS E_GRP\n");
    }

    #[tokio::test]
    async fn unsubscribe_unknown_user_reports_e_usr() {
        let (_tmp, store) = store().await;
        let reply = dispatch(&store, b"GUR 99999 01\n").await;
        assert_eq!(reply, b"RGU E_USR\n");
    }
}

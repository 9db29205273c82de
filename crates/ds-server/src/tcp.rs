//! TCP handlers (spec §4.5): streamed request/reply transactions, two of
//! which carry binary payloads. Each handler owns the connection end to
//! end — it reads its own request fields with [`FieldReader`], decides
//! a reply, writes it, and returns.

use ds_proto::{FieldReader, Fname, Fsize, Gid, Mid, Tsize, Uid, line, tags};
use ds_store::Store;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

/// Reads the fixed 4-byte command tag (3 chars + space, spec §4.3) and
/// dispatches to the matching handler. Closes on an unrecognized tag.
pub async fn handle_connection<S>(store: &Store, mut stream: S)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut header = [0u8; tags::TCP_TAG_LEN];
    if tokio::io::AsyncReadExt::read_exact(&mut stream, &mut header)
        .await
        .is_err()
    {
        return;
    }
    let Ok(tag) = std::str::from_utf8(&header[..3]) else {
        return;
    };

    let result = match tag {
        tags::ULS => handle_uls(store, stream).await,
        tags::PST => handle_pst(store, stream).await,
        tags::RTV => handle_rtv(store, stream).await,
        _ => {
            let _ = stream.write_all(&line::encode_line(tags::ERR, &[])).await;
            return;
        }
    };

    if let Err(e) = result {
        log::error!("tcp handler for {tag}: {e}");
    }
}

async fn handle_uls<S>(store: &Store, stream: S) -> ds_proto::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut reader = FieldReader::new(stream);

    macro_rules! fail {
        () => {{
            let bytes = line::encode_line(tags::RUL, &[tags::NOK]);
            reader.into_inner().write_all(&bytes).await?;
            return Ok(());
        }};
    }

    let (gid_field, _) = reader.read_word(2).await?;
    let Some(gid) = Gid::parse(&gid_field) else { fail!() };
    let Ok(gname) = store.group_name(&gid).await else { fail!() };
    let Ok(subscribers) = store.list_subscribers(&gid).await else { fail!() };

    let mut fields = vec![tags::OK.to_string(), gname.to_string()];
    fields.extend(subscribers.iter().map(Uid::to_string));
    let refs: Vec<&str> = fields.iter().map(String::as_str).collect();
    let bytes = line::encode_line(tags::RUL, &refs);
    reader.into_inner().write_all(&bytes).await?;
    Ok(())
}

async fn handle_pst<S>(store: &Store, stream: S) -> ds_proto::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut reader = FieldReader::new(stream);

    macro_rules! fail {
        () => {{
            let bytes = line::encode_line(tags::RPT, &[tags::NOK]);
            reader.into_inner().write_all(&bytes).await?;
            return Ok(());
        }};
    }

    let (uid_field, _) = reader.read_word(5).await?;
    let Some(uid) = Uid::parse(&uid_field) else { fail!() };
    let (gid_field, _) = reader.read_word(2).await?;
    let Some(gid) = Gid::parse(&gid_field) else { fail!() };
    let (tsize_field, _) = reader.read_word(3).await?;
    let Some(tsize) = Tsize::parse(&tsize_field) else { fail!() };

    let text = reader.read_bytes(tsize.value()).await?;
    let separator = reader.read_terminator().await?;

    let attachment = if separator == b' ' {
        let (fname_field, _) = reader.read_word(24).await?;
        let Some(fname) = Fname::parse(&fname_field) else { fail!() };
        let (fsize_field, _) = reader.read_word(10).await?;
        let Some(fsize) = Fsize::parse(&fsize_field) else { fail!() };
        let bytes = reader.read_bytes(fsize.value() as usize).await?;
        let _ = reader.read_terminator().await?;
        Some((fname, bytes))
    } else if separator == b'\n' {
        None
    } else {
        fail!()
    };

    if !store.group_exists(&gid).await {
        fail!()
    }

    let attachment_ref = attachment.as_ref().map(|(f, b)| (f, b.as_slice()));
    let reply = match store.append_message(&gid, &uid, &text, attachment_ref).await {
        Ok(mid) => line::encode_line(tags::RPT, &[&mid.to_string()]),
        Err(_) => line::encode_line(tags::RPT, &[tags::NOK]),
    };
    reader.into_inner().write_all(&reply).await?;
    Ok(())
}

async fn handle_rtv<S>(store: &Store, stream: S) -> ds_proto::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut reader = FieldReader::new(stream);

    macro_rules! fail {
        () => {{
            let bytes = line::encode_line(tags::RRT, &[tags::NOK]);
            reader.into_inner().write_all(&bytes).await?;
            return Ok(());
        }};
    }

    let (uid_field, _) = reader.read_word(5).await?;
    let Some(uid) = Uid::parse(&uid_field) else { fail!() };
    let (gid_field, _) = reader.read_word(2).await?;
    let Some(gid) = Gid::parse(&gid_field) else { fail!() };
    let (mid_field, _) = reader.read_word(4).await?;
    let Some(start) = Mid::parse(&mid_field) else { fail!() };

    if !store.group_exists(&gid).await {
        fail!()
    }
    if !store.user_logged_in(&uid).await || !store.is_subscribed(&uid, &gid).await {
        fail!()
    }

    let n = store.retrieve_window_size(&gid, start).await;
    if n == 0 {
        let bytes = line::encode_line(tags::RRT, &[tags::EOF]);
        reader.into_inner().write_all(&bytes).await?;
        return Ok(());
    }

    let messages = store.read_message_range(&gid, start).await;

    let prefix = format!("{} {} {}", tags::RRT, tags::OK, n);
    let mut out = reader.into_inner();
    out.write_all(prefix.as_bytes()).await?;

    for message in &messages {
        let head = format!(" {} {} {} ", message.mid, message.author, message.text.len());
        out.write_all(head.as_bytes()).await?;
        out.write_all(&message.text).await?;
        if let Some((fname, bytes)) = &message.attachment {
            let mid = format!(" / {} {} ", fname, bytes.len());
            out.write_all(mid.as_bytes()).await?;
            out.write_all(bytes).await?;
        }
    }
    out.write_all(b"\n").await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ds_proto::{GName, Pass};
    use tokio::io::AsyncReadExt;

    async fn store_with_group() -> (tempfile::TempDir, Store, Gid) {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).await.unwrap();
        let uid = Uid::parse("10000").unwrap();
        store.create_user(&uid, &Pass::parse("abcdefgh").unwrap()).await;
        store.set_login(&uid).await;
        let gid = store
            .create_group(&uid, &GName::parse("demo").unwrap())
            .await
            .unwrap();
        (dir, store, gid)
    }

    async fn roundtrip(store: &Store, request: &[u8]) -> Vec<u8> {
        let (client, server) = tokio::io::duplex(4096);
        let (mut client_read, mut client_write) = tokio::io::split(client);
        client_write.write_all(request).await.unwrap();
        handle_connection(store, server).await;
        drop(client_write);
        let mut reply = Vec::new();
        client_read.read_to_end(&mut reply).await.unwrap();
        reply
    }

    #[tokio::test]
    async fn posts_text_only_then_ulist_and_retrieve() {
        let (_tmp, store, gid) = store_with_group().await;

        let post = format!("PST 10000 {gid} 5 hello\n");
        let reply = roundtrip(&store, post.as_bytes()).await;
        assert_eq!(reply, b"RPT 0001\n");

        let uls = format!("ULS {gid}\n");
        let reply = roundtrip(&store, uls.as_bytes()).await;
        assert_eq!(reply, b"RUL OK demo 10000\n");

        let rtv = format!("RTV 10000 {gid} 0001\n");
        let reply = roundtrip(&store, rtv.as_bytes()).await;
        assert_eq!(reply, b"RRT OK 1 0001 10000 5 hello\n");
    }

    #[tokio::test]
    async fn posts_with_attachment() {
        let (_tmp, store, gid) = store_with_group().await;

        let mut post = format!("PST 10000 {gid} 2 hi a.txt 3 ").into_bytes();
        post.extend_from_slice(b"xyz\n");
        let reply = roundtrip(&store, &post).await;
        assert_eq!(reply, b"RPT 0001\n");

        let rtv = format!("RTV 10000 {gid} 0001\n");
        let reply = roundtrip(&store, rtv.as_bytes()).await;
        assert_eq!(reply, b"RRT OK 1 0001 10000 2 hi / a.txt 3 xyz\n");
    }

    #[tokio::test]
    async fn retrieve_past_end_is_eof() {
        let (_tmp, store, gid) = store_with_group().await;
        let rtv = format!("RTV 10000 {gid} 0001\n");
        let reply = roundtrip(&store, rtv.as_bytes()).await;
        assert_eq!(reply, b"RRT EOF\n");
    }

    #[tokio::test]
    async fn ulist_unknown_group_is_nok() {
        let (_tmp, store, _gid) = store_with_group().await;
        let reply = roundtrip(&store, b"ULS 77\n").await;
        assert_eq!(reply, b"RUL NOK\n");
    }

    #[tokio::test]
    async fn retrieve_from_unsubscribed_user_is_nok() {
        let (_tmp, store, gid) = store_with_group().await;
        let post = format!("PST 10000 {gid} 5 hello\n");
        roundtrip(&store, post.as_bytes()).await;

        let outsider = Uid::parse("20000").unwrap();
        store.create_user(&outsider, &Pass::parse("abcdefgh").unwrap()).await;
        store.set_login(&outsider).await;

        let rtv = format!("RTV 20000 {gid} 0001\n");
        let reply = roundtrip(&store, rtv.as_bytes()).await;
        assert_eq!(reply, b"RRT NOK\n");
    }

    #[tokio::test]
    async fn retrieve_while_logged_out_is_nok() {
        let (_tmp, store, gid) = store_with_group().await;
        let post = format!("PST 10000 {gid} 5 hello\n");
        roundtrip(&store, post.as_bytes()).await;
        store.clear_login(&Uid::parse("10000").unwrap()).await;

        let rtv = format!("RTV 10000 {gid} 0001\n");
        let reply = roundtrip(&store, rtv.as_bytes()).await;
        assert_eq!(reply, b"RRT NOK\n");
    }
}

//! Protocol-level client (spec §4.4, §4.5, §5): one request/reply round
//! trip per method, typed around [`ds_proto`]'s tagged identifiers instead
//! of raw strings. UDP operations apply the receive-timeout/retry contract
//! from spec §5; TCP operations open one connection per request, matching
//! how `ds-server::tcp::handle_connection` treats each accepted stream as a
//! single transaction and closes it once the reply is flushed.

use std::net::SocketAddr;
use std::time::Duration;

use ds_proto::{FieldReader, Fname, Fsize, GName, Gid, Mid, Pass, Tsize, Uid, line, tags};
use tokio::net::{TcpStream, ToSocketAddrs, UdpSocket};
use tokio::time;

use crate::error::{Error, Result};

const RECEIVE_TIMEOUT: Duration = Duration::from_secs(3);
const MAX_ATTEMPTS: u32 = 3;
const MAX_UDP_REPLY: usize = 512;

/// A connected client. One per server endpoint; cheap enough to build one
/// per REPL session.
pub struct Client {
    udp: UdpSocket,
    server_addr: SocketAddr,
}

/// A group returned by `GLS`/`GLM`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupInfo {
    pub gid: Gid,
    pub name: String,
    pub last_mid: u32,
}

/// A message returned by `RTV`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetrievedMessage {
    pub mid: Mid,
    pub author: Uid,
    pub text: Vec<u8>,
    pub attachment: Option<(Fname, Vec<u8>)>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegisterOutcome {
    Ok,
    Duplicate,
    Rejected,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SimpleOutcome {
    Ok,
    Rejected,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SelectOutcome {
    Joined(Gid),
    Created(Gid),
    UnknownUser,
    UnknownGroup,
    NameMismatch,
    GroupsFull,
    Rejected,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UnsubscribeOutcome {
    Ok,
    UnknownUser,
    UnknownGroup,
    Rejected,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ListUsersOutcome {
    Ok { name: String, members: Vec<Uid> },
    Rejected,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PostOutcome {
    Ok(Mid),
    Rejected,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RetrieveOutcome {
    Ok(Vec<RetrievedMessage>),
    Eof,
    Rejected,
}

impl Client {
    /// Resolves `host:port` and binds an ephemeral UDP socket connected to
    /// it; the TCP half dials a fresh connection per request.
    pub async fn connect(host_port: impl ToSocketAddrs) -> Result<Self> {
        let mut addrs = tokio::net::lookup_host(host_port).await?;
        let server_addr = addrs
            .next()
            .ok_or_else(|| Error::Protocol("no address resolved for server host".into()))?;

        let udp = UdpSocket::bind(("0.0.0.0", 0)).await?;
        udp.connect(server_addr).await?;

        Ok(Self { udp, server_addr })
    }

    /// Sends `line` and waits for a reply, retrying up to [`MAX_ATTEMPTS`]
    /// times with a [`RECEIVE_TIMEOUT`] per attempt (spec §5: "The UDP
    /// client applies a 3-second receive timeout and retries up to 3 times
    /// total, then reports failure").
    async fn request_udp(&self, line: &[u8]) -> Result<(String, Vec<String>)> {
        let mut buf = vec![0u8; MAX_UDP_REPLY];
        let mut last_io_err = None;

        for attempt in 1..=MAX_ATTEMPTS {
            self.udp.send(line).await?;
            match time::timeout(RECEIVE_TIMEOUT, self.udp.recv(&mut buf)).await {
                Ok(Ok(n)) => {
                    return line::decode_line(&buf[..n])
                        .ok_or_else(|| Error::Protocol("malformed reply line".into()));
                }
                Ok(Err(e)) => {
                    log::debug!("udp recv error on attempt {attempt}: {e}");
                    last_io_err = Some(e);
                }
                Err(_elapsed) => {
                    log::debug!("udp receive timed out on attempt {attempt}/{MAX_ATTEMPTS}");
                }
            }
        }

        match last_io_err {
            Some(e) => Err(Error::Io(e)),
            None => Err(Error::Timeout),
        }
    }

    pub async fn register(&self, uid: &Uid, pass: &Pass) -> Result<RegisterOutcome> {
        let request = line::encode_line(tags::REG, &[uid.as_str(), pass.as_str()]);
        let (_, fields) = self.request_udp(&request).await?;
        Ok(match fields.first().map(String::as_str) {
            Some(tags::OK) => RegisterOutcome::Ok,
            Some(tags::DUP) => RegisterOutcome::Duplicate,
            _ => RegisterOutcome::Rejected,
        })
    }

    pub async fn unregister(&self, uid: &Uid, pass: &Pass) -> Result<SimpleOutcome> {
        self.simple_udp_request(tags::UNR, &[uid.as_str(), pass.as_str()]).await
    }

    pub async fn login(&self, uid: &Uid, pass: &Pass) -> Result<SimpleOutcome> {
        self.simple_udp_request(tags::LOG, &[uid.as_str(), pass.as_str()]).await
    }

    pub async fn logout(&self, uid: &Uid, pass: &Pass) -> Result<SimpleOutcome> {
        self.simple_udp_request(tags::OUT, &[uid.as_str(), pass.as_str()]).await
    }

    async fn simple_udp_request(&self, tag: &str, fields: &[&str]) -> Result<SimpleOutcome> {
        let request = line::encode_line(tag, fields);
        let (_, reply) = self.request_udp(&request).await?;
        Ok(match reply.first().map(String::as_str) {
            Some(tags::OK) => SimpleOutcome::Ok,
            _ => SimpleOutcome::Rejected,
        })
    }

    pub async fn list_groups(&self) -> Result<Vec<GroupInfo>> {
        let request = line::encode_line(tags::GLS, &[]);
        let (_, fields) = self.request_udp(&request).await?;
        parse_group_listing(&fields)
    }

    pub async fn list_my_groups(&self, uid: &Uid) -> Result<Vec<GroupInfo>> {
        let request = line::encode_line(tags::GLM, &[uid.as_str()]);
        let (_, fields) = self.request_udp(&request).await?;
        parse_group_listing(&fields)
    }

    /// `gid == Gid::CREATE` creates a new group named `gname`; any other
    /// `gid` subscribes to the existing group of that id and name.
    pub async fn select_group(&self, uid: &Uid, gid: Gid, gname: &GName) -> Result<SelectOutcome> {
        let gid_str = gid.to_string();
        let request = line::encode_line(tags::GSR, &[uid.as_str(), &gid_str, gname.as_str()]);
        let (_, fields) = self.request_udp(&request).await?;
        Ok(match fields.as_slice() {
            [status] if status == tags::OK => SelectOutcome::Joined(gid),
            [status] if status == tags::E_USR => SelectOutcome::UnknownUser,
            [status] if status == tags::E_GRP => SelectOutcome::UnknownGroup,
            [status] if status == tags::E_GNAME => SelectOutcome::NameMismatch,
            [status] if status == tags::E_FULL => SelectOutcome::GroupsFull,
            [status, new_gid] if status == tags::NEW => {
                match Gid::parse(new_gid) {
                    Some(gid) => SelectOutcome::Created(gid),
                    None => SelectOutcome::Rejected,
                }
            }
            _ => SelectOutcome::Rejected,
        })
    }

    pub async fn unsubscribe(&self, uid: &Uid, gid: Gid) -> Result<UnsubscribeOutcome> {
        let gid_str = gid.to_string();
        let request = line::encode_line(tags::GUR, &[uid.as_str(), &gid_str]);
        let (_, fields) = self.request_udp(&request).await?;
        Ok(match fields.first().map(String::as_str) {
            Some(tags::OK) => UnsubscribeOutcome::Ok,
            Some(tags::E_USR) => UnsubscribeOutcome::UnknownUser,
            Some(tags::E_GRP) => UnsubscribeOutcome::UnknownGroup,
            _ => UnsubscribeOutcome::Rejected,
        })
    }

    pub async fn list_users(&self, gid: Gid) -> Result<ListUsersOutcome> {
        let gid_str = gid.to_string();
        let request = line::encode_line(tags::ULS, &[&gid_str]);
        let reply = self.tcp_line_request(&request).await?;
        let Some((tag, fields)) = line::decode_line(&reply) else {
            return Err(Error::Protocol("malformed ULS reply".into()));
        };
        if tag != tags::RUL {
            return Err(Error::Protocol(format!("expected RUL, got {tag}")));
        }
        match fields.split_first() {
            Some((status, rest)) if status == tags::OK => {
                let [name, members @ ..] = rest else {
                    return Err(Error::Protocol("RUL OK missing group name".into()));
                };
                let members = members
                    .iter()
                    .map(|s| Uid::parse(s).ok_or_else(|| Error::Protocol(format!("bad uid {s}"))))
                    .collect::<Result<Vec<_>>>()?;
                Ok(ListUsersOutcome::Ok { name: name.clone(), members })
            }
            _ => Ok(ListUsersOutcome::Rejected),
        }
    }

    /// Opens a connection, writes `request`, then reads until the peer
    /// closes the socket (the server writes exactly one reply per
    /// connection and drops it, per spec §5's "worker terminates ... when
    /// reply is flushed").
    async fn tcp_line_request(&self, request: &[u8]) -> Result<Vec<u8>> {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let mut stream = TcpStream::connect(self.server_addr).await?;
        stream.write_all(request).await?;
        stream.shutdown().await.ok();
        let mut reply = Vec::new();
        stream.read_to_end(&mut reply).await?;
        Ok(reply)
    }

    pub async fn post(
        &self,
        uid: &Uid,
        gid: Gid,
        text: &[u8],
        attachment: Option<(Fname, Vec<u8>)>,
    ) -> Result<PostOutcome> {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let tsize = Tsize::parse(&text.len().to_string())
            .ok_or_else(|| Error::Protocol("message text length out of range".into()))?;

        let mut request = format!("{} {} {} {} ", tags::PST, uid, gid, tsize).into_bytes();
        request.extend_from_slice(text);
        match &attachment {
            Some((fname, bytes)) => {
                let fsize = Fsize::from_len(bytes.len() as u64)
                    .ok_or_else(|| Error::Protocol("attachment too large".into()))?;
                request.extend_from_slice(format!(" {fname} {fsize} ").as_bytes());
                request.extend_from_slice(bytes);
            }
            None => request.push(b'\n'),
        }

        let mut stream = TcpStream::connect(self.server_addr).await?;
        stream.write_all(&request).await?;
        stream.shutdown().await.ok();
        let mut reply = Vec::new();
        stream.read_to_end(&mut reply).await?;

        let Some((tag, fields)) = line::decode_line(&reply) else {
            return Err(Error::Protocol("malformed PST reply".into()));
        };
        if tag != tags::RPT {
            return Err(Error::Protocol(format!("expected RPT, got {tag}")));
        }
        match fields.first().map(String::as_str) {
            Some(tags::NOK) | None => Ok(PostOutcome::Rejected),
            Some(mid_str) => {
                Mid::parse(mid_str).map(PostOutcome::Ok).ok_or_else(|| {
                    Error::Protocol(format!("RPT reply field {mid_str} is not a valid mid"))
                })
            }
        }
    }

    pub async fn retrieve(&self, uid: &Uid, gid: Gid, start: Mid) -> Result<RetrieveOutcome> {
        let gid_str = gid.to_string();
        let start_str = start.to_string();
        let request = line::encode_line(tags::RTV, &[uid.as_str(), &gid_str, &start_str]);

        let stream = TcpStream::connect(self.server_addr).await?;
        let (read_half, mut write_half) = tokio::io::split(stream);
        {
            use tokio::io::AsyncWriteExt;
            write_half.write_all(&request).await?;
            write_half.shutdown().await.ok();
        }

        let mut reader = FieldReader::new(read_half);
        let (tag, _) = reader.read_word(3).await?;
        if tag != tags::RRT {
            return Err(Error::Protocol(format!("expected RRT, got {tag}")));
        }
        let (status, _) = reader.read_word(8).await?;
        match status.as_str() {
            tags::EOF => return Ok(RetrieveOutcome::Eof),
            tags::NOK => return Ok(RetrieveOutcome::Rejected),
            tags::OK => {}
            other => return Err(Error::Protocol(format!("unexpected RRT status {other}"))),
        }

        let (n_field, _) = reader.read_word(4).await?;
        let count: usize = n_field
            .parse()
            .map_err(|_| Error::Protocol(format!("bad RRT count {n_field}")))?;

        let mut messages = Vec::with_capacity(count);
        let mut pending_mid: Option<String> = None;

        for _ in 0..count {
            let mid_field = match pending_mid.take() {
                Some(mid) => mid,
                None => reader.read_word(4).await?.0,
            };
            let mid = Mid::parse(&mid_field)
                .ok_or_else(|| Error::Protocol(format!("bad mid {mid_field}")))?;

            let (author_field, _) = reader.read_word(5).await?;
            let author = Uid::parse(&author_field)
                .ok_or_else(|| Error::Protocol(format!("bad author uid {author_field}")))?;

            let (tsize_field, _) = reader.read_word(3).await?;
            let tsize: usize = tsize_field
                .parse()
                .map_err(|_| Error::Protocol(format!("bad tsize {tsize_field}")))?;
            let text = reader.read_bytes(tsize).await?;

            let separator = reader.read_terminator().await?;
            let attachment = match separator {
                b'\n' => None,
                b' ' => {
                    let (word, _) = reader.read_word(24).await?;
                    if word == "/" {
                        let (fname_field, _) = reader.read_word(24).await?;
                        let fname = Fname::parse(&fname_field)
                            .ok_or_else(|| Error::Protocol(format!("bad fname {fname_field}")))?;
                        let (fsize_field, _) = reader.read_word(10).await?;
                        let fsize: u64 = fsize_field
                            .parse()
                            .map_err(|_| Error::Protocol(format!("bad fsize {fsize_field}")))?;
                        let bytes = reader.read_bytes(fsize as usize).await?;
                        match reader.read_terminator().await? {
                            b'\n' => {}
                            b' ' => pending_mid = Some(reader.read_word(4).await?.0),
                            other => {
                                return Err(Error::Protocol(format!(
                                    "unexpected byte {other} after attachment"
                                )));
                            }
                        }
                        Some((fname, bytes))
                    } else {
                        pending_mid = Some(word);
                        None
                    }
                }
                other => {
                    return Err(Error::Protocol(format!("unexpected byte {other} after text")));
                }
            };

            messages.push(RetrievedMessage { mid, author, text, attachment });
        }

        Ok(RetrieveOutcome::Ok(messages))
    }
}

fn parse_group_listing(fields: &[String]) -> Result<Vec<GroupInfo>> {
    let mut it = fields.iter();
    let count: usize = it
        .next()
        .ok_or_else(|| Error::Protocol("missing group count".into()))?
        .parse()
        .map_err(|_| Error::Protocol("group count is not a number".into()))?;

    let mut groups = Vec::with_capacity(count);
    for _ in 0..count {
        let gid_field = it.next().ok_or_else(|| Error::Protocol("truncated group listing".into()))?;
        let gid = Gid::parse(gid_field).ok_or_else(|| Error::Protocol(format!("bad gid {gid_field}")))?;
        let name = it
            .next()
            .ok_or_else(|| Error::Protocol("truncated group listing".into()))?
            .clone();
        let last_mid: u32 = it
            .next()
            .ok_or_else(|| Error::Protocol("truncated group listing".into()))?
            .parse()
            .map_err(|_| Error::Protocol("last mid is not a number".into()))?;
        groups.push(GroupInfo { gid, name, last_mid });
    }
    Ok(groups)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    /// Spawns a one-shot UDP responder bound to an ephemeral port and
    /// returns a `Client` connected to it.
    async fn client_with_udp_reply(reply: &'static [u8]) -> Client {
        let stub = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = stub.local_addr().unwrap();
        tokio::spawn(async move {
            let mut buf = [0u8; 512];
            let (_, peer) = stub.recv_from(&mut buf).await.unwrap();
            stub.send_to(reply, peer).await.unwrap();
        });
        Client::connect(addr).await.unwrap()
    }

    /// Spawns a one-shot TCP responder: accepts once, reads the request to
    /// completion (the client half-closes its write side, as real DS
    /// clients do), writes `reply`, then drops the connection.
    async fn client_with_tcp_reply(reply: &'static [u8]) -> Client {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            use tokio::io::{AsyncReadExt, AsyncWriteExt};
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            stream.read_to_end(&mut request).await.unwrap();
            stream.write_all(reply).await.unwrap();
        });
        Client::connect(addr).await.unwrap()
    }

    #[tokio::test]
    async fn register_ok() {
        let client = client_with_udp_reply(b"RRG OK\n").await;
        let uid = Uid::parse("10000").unwrap();
        let pass = Pass::parse("abcdefgh").unwrap();
        assert_eq!(client.register(&uid, &pass).await.unwrap(), RegisterOutcome::Ok);
    }

    #[tokio::test]
    async fn register_duplicate() {
        let client = client_with_udp_reply(b"RRG DUP\n").await;
        let uid = Uid::parse("10000").unwrap();
        let pass = Pass::parse("abcdefgh").unwrap();
        assert_eq!(client.register(&uid, &pass).await.unwrap(), RegisterOutcome::Duplicate);
    }

    #[tokio::test]
    async fn lists_groups() {
        let client = client_with_udp_reply(b"RGL 1 01 demo 0003\n").await;
        let groups = client.list_groups().await.unwrap();
        assert_eq!(
            groups,
            vec![GroupInfo { gid: Gid::parse("01").unwrap(), name: "demo".into(), last_mid: 3 }]
        );
    }

    #[tokio::test]
    async fn select_group_creates_new() {
        let client = client_with_udp_reply(b"RGS NEW 04\n").await;
        let uid = Uid::parse("10000").unwrap();
        let gname = GName::parse("demo").unwrap();
        let outcome = client.select_group(&uid, Gid::CREATE, &gname).await.unwrap();
        assert_eq!(outcome, SelectOutcome::Created(Gid::parse("04").unwrap()));
    }

    #[tokio::test]
    async fn lists_users_over_tcp() {
        let client = client_with_tcp_reply(b"RUL OK demo 10000 10001\n").await;
        let outcome = client.list_users(Gid::parse("01").unwrap()).await.unwrap();
        assert_eq!(
            outcome,
            ListUsersOutcome::Ok {
                name: "demo".into(),
                members: vec![Uid::parse("10000").unwrap(), Uid::parse("10001").unwrap()],
            }
        );
    }

    #[tokio::test]
    async fn posts_text_only() {
        let client = client_with_tcp_reply(b"RPT 0001\n").await;
        let uid = Uid::parse("10000").unwrap();
        let outcome = client.post(&uid, Gid::parse("01").unwrap(), b"hello", None).await.unwrap();
        assert_eq!(outcome, PostOutcome::Ok(Mid::parse("0001").unwrap()));
    }

    #[tokio::test]
    async fn retrieves_messages_with_attachment() {
        let client = client_with_tcp_reply(b"RRT OK 1 0001 10000 2 hi / a.txt 3 xyz\n").await;
        let uid = Uid::parse("10000").unwrap();
        let outcome = client.retrieve(&uid, Gid::parse("01").unwrap(), Mid::parse("0001").unwrap()).await.unwrap();
        let RetrieveOutcome::Ok(messages) = outcome else {
            panic!("expected Ok, got {outcome:?}");
        };
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].text, b"hi");
        let (fname, bytes) = messages[0].attachment.as_ref().unwrap();
        assert_eq!(fname.to_string(), "a.txt");
        assert_eq!(bytes, b"xyz");
    }

    #[tokio::test]
    async fn retrieve_reports_eof() {
        let client = client_with_tcp_reply(b"RRT EOF\n").await;
        let uid = Uid::parse("10000").unwrap();
        let outcome = client.retrieve(&uid, Gid::parse("01").unwrap(), Mid::parse("0001").unwrap()).await.unwrap();
        assert_eq!(outcome, RetrieveOutcome::Eof);
    }
}

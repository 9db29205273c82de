//! Minimal REPL driving [`ds_client::Client`] end to end (spec §1: REPL
//! presentation is out of scope — this exists so the workspace has a
//! runnable second party, not as a polished CLI product).

use std::path::Path;

use clap::Parser;
use ds_client::{Client, GroupInfo, ListUsersOutcome, PostOutcome, RegisterOutcome, RetrieveOutcome, SelectOutcome, Session, SimpleOutcome, UnsubscribeOutcome};
use ds_proto::{Fname, GName, Gid, Mid, Pass, Uid};
use tokio::io::{AsyncBufReadExt, BufReader};

/// Directory Server client: registers/logs in a user and exchanges
/// messages with a running `DS` over UDP/TCP.
#[derive(Debug, Parser)]
#[command(name = "user")]
struct Cli {
    /// Host running the Directory Server.
    #[arg(short = 'n', long = "ip", default_value = "127.0.0.1")]
    ip: String,

    /// Port shared by the server's UDP and TCP listeners.
    #[arg(short = 'p', long = "port", default_value_t = ds_proto::tags::DEFAULT_PORT)]
    port: u16,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let client = match Client::connect((cli.ip.as_str(), cli.port)).await {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Error: cannot reach {}:{}: {e}", cli.ip, cli.port);
            std::process::exit(1);
        }
    };

    println!("connected to {}:{} — type `help` for commands", cli.ip, cli.port);

    let mut session = Session::default();
    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    loop {
        print_prompt(&session);
        let Ok(Some(line)) = lines.next_line().await else {
            break;
        };
        let words: Vec<&str> = line.split_whitespace().collect();
        let Some(&command) = words.first() else { continue };

        match command {
            "help" => print_help(),
            "quit" | "exit" => break,
            "register" => run_register(&client, &words[1..]).await,
            "unregister" => run_unregister(&client, &words[1..]).await,
            "login" => run_login(&client, &mut session, &words[1..]).await,
            "logout" => run_logout(&client, &mut session, &words[1..]).await,
            "groups" => run_list_groups(&client).await,
            "mygroups" => run_my_groups(&client, &session).await,
            "create" => run_create(&client, &mut session, &words[1..]).await,
            "subscribe" => run_subscribe(&client, &mut session, &words[1..]).await,
            "unsubscribe" => run_unsubscribe(&client, &session, &words[1..]).await,
            "select" => run_select(&mut session, &words[1..]),
            "users" => run_list_users(&client, &session).await,
            "post" => run_post(&client, &session, &words[1..]).await,
            "retrieve" => run_retrieve(&client, &session, &words[1..]).await,
            other => println!("unknown command {other:?}; try `help`"),
        }
    }
}

fn print_prompt(session: &Session) {
    match (session.uid(), session.gid()) {
        (Some(uid), Some(gid)) => print!("{uid}@{gid}> "),
        (Some(uid), None) => print!("{uid}> "),
        (None, _) => print!("anon> "),
    }
    use std::io::Write;
    let _ = std::io::stdout().flush();
}

fn print_help() {
    println!(
        "commands:\n\
         \x20register UID PASS\n\
         \x20unregister UID PASS\n\
         \x20login UID PASS\n\
         \x20logout PASS\n\
         \x20groups\n\
         \x20mygroups\n\
         \x20create NAME\n\
         \x20subscribe GID NAME\n\
         \x20unsubscribe GID\n\
         \x20select GID\n\
         \x20users\n\
         \x20post TEXT [FILEPATH]\n\
         \x20retrieve [MID]\n\
         \x20quit"
    );
}

fn print_groups(groups: &[GroupInfo]) {
    if groups.is_empty() {
        println!("(no groups)");
    }
    for g in groups {
        println!("  {} {} (last mid {:04})", g.gid, g.name, g.last_mid);
    }
}

async fn run_register(client: &Client, args: &[&str]) {
    let [uid, pass] = args else {
        return println!("usage: register UID PASS");
    };
    let (Some(uid), Some(pass)) = (Uid::parse(uid), Pass::parse(pass)) else {
        return println!("invalid uid or password");
    };
    match client.register(&uid, &pass).await {
        Ok(RegisterOutcome::Ok) => println!("registered {uid}"),
        Ok(RegisterOutcome::Duplicate) => println!("{uid} is already registered"),
        Ok(RegisterOutcome::Rejected) => println!("registration rejected"),
        Err(e) => println!("error: {e}"),
    }
}

async fn run_unregister(client: &Client, args: &[&str]) {
    let [uid, pass] = args else {
        return println!("usage: unregister UID PASS");
    };
    let (Some(uid), Some(pass)) = (Uid::parse(uid), Pass::parse(pass)) else {
        return println!("invalid uid or password");
    };
    match client.unregister(&uid, &pass).await {
        Ok(SimpleOutcome::Ok) => println!("unregistered {uid}"),
        Ok(SimpleOutcome::Rejected) => println!("unregister rejected"),
        Err(e) => println!("error: {e}"),
    }
}

async fn run_login(client: &Client, session: &mut Session, args: &[&str]) {
    let [uid, pass] = args else {
        return println!("usage: login UID PASS");
    };
    let (Some(uid), Some(pass)) = (Uid::parse(uid), Pass::parse(pass)) else {
        return println!("invalid uid or password");
    };
    match client.login(&uid, &pass).await {
        Ok(SimpleOutcome::Ok) => {
            session.log_in(uid.clone());
            println!("logged in as {uid}");
        }
        Ok(SimpleOutcome::Rejected) => println!("login rejected"),
        Err(e) => println!("error: {e}"),
    }
}

async fn run_logout(client: &Client, session: &mut Session, args: &[&str]) {
    let [pass] = args else {
        return println!("usage: logout PASS");
    };
    let Some(uid) = session.uid().cloned() else {
        return println!("not logged in");
    };
    let Some(pass) = Pass::parse(pass) else {
        return println!("invalid password");
    };
    match client.logout(&uid, &pass).await {
        Ok(SimpleOutcome::Ok) => {
            session.log_out();
            println!("logged out");
        }
        Ok(SimpleOutcome::Rejected) => println!("logout rejected"),
        Err(e) => println!("error: {e}"),
    }
}

async fn run_list_groups(client: &Client) {
    match client.list_groups().await {
        Ok(groups) => print_groups(&groups),
        Err(e) => println!("error: {e}"),
    }
}

async fn run_my_groups(client: &Client, session: &Session) {
    let Some(uid) = session.uid() else {
        return println!("not logged in");
    };
    match client.list_my_groups(uid).await {
        Ok(groups) => print_groups(&groups),
        Err(e) => println!("error: {e}"),
    }
}

async fn run_create(client: &Client, session: &mut Session, args: &[&str]) {
    let [name] = args else {
        return println!("usage: create NAME");
    };
    let Some(uid) = session.uid().cloned() else {
        return println!("not logged in");
    };
    let Some(gname) = GName::parse(name) else {
        return println!("invalid group name");
    };
    match client.select_group(&uid, Gid::CREATE, &gname).await {
        Ok(SelectOutcome::Created(gid)) => {
            session.select(gid);
            println!("created and joined group {gid}");
        }
        Ok(other) => println!("create rejected: {other:?}"),
        Err(e) => println!("error: {e}"),
    }
}

async fn run_subscribe(client: &Client, session: &mut Session, args: &[&str]) {
    let [gid, name] = args else {
        return println!("usage: subscribe GID NAME");
    };
    let Some(uid) = session.uid().cloned() else {
        return println!("not logged in");
    };
    let (Some(gid), Some(gname)) = (Gid::parse(gid), GName::parse(name)) else {
        return println!("invalid gid or group name");
    };
    match client.select_group(&uid, gid, &gname).await {
        Ok(SelectOutcome::Joined(gid)) => {
            session.select(gid);
            println!("joined group {gid}");
        }
        Ok(other) => println!("subscribe rejected: {other:?}"),
        Err(e) => println!("error: {e}"),
    }
}

async fn run_unsubscribe(client: &Client, session: &Session, args: &[&str]) {
    let [gid] = args else {
        return println!("usage: unsubscribe GID");
    };
    let Some(uid) = session.uid() else {
        return println!("not logged in");
    };
    let Some(gid) = Gid::parse(gid) else {
        return println!("invalid gid");
    };
    match client.unsubscribe(uid, gid).await {
        Ok(UnsubscribeOutcome::Ok) => println!("left group {gid}"),
        Ok(other) => println!("unsubscribe rejected: {other:?}"),
        Err(e) => println!("error: {e}"),
    }
}

fn run_select(session: &mut Session, args: &[&str]) {
    let [gid] = args else {
        return println!("usage: select GID");
    };
    let Some(gid) = Gid::parse(gid) else {
        return println!("invalid gid");
    };
    if session.select(gid) {
        println!("selected group {gid}");
    } else {
        println!("not logged in");
    }
}

async fn run_list_users(client: &Client, session: &Session) {
    let Some(gid) = session.gid() else {
        return println!("no group selected");
    };
    match client.list_users(gid).await {
        Ok(ListUsersOutcome::Ok { name, members }) => {
            println!("{name}:");
            for uid in members {
                println!("  {uid}");
            }
        }
        Ok(ListUsersOutcome::Rejected) => println!("request rejected"),
        Err(e) => println!("error: {e}"),
    }
}

async fn run_post(client: &Client, session: &Session, args: &[&str]) {
    let (Some(uid), Some(gid)) = (session.uid(), session.gid()) else {
        return println!("no group selected");
    };
    let Some(&text) = args.first() else {
        return println!("usage: post TEXT [FILEPATH]");
    };

    let attachment = match args.get(1) {
        Some(path) => match read_attachment(path).await {
            Ok(attachment) => Some(attachment),
            Err(e) => return println!("error reading {path}: {e}"),
        },
        None => None,
    };

    match client.post(uid, gid, text.as_bytes(), attachment).await {
        Ok(PostOutcome::Ok(mid)) => println!("posted as message {mid}"),
        Ok(PostOutcome::Rejected) => println!("post rejected"),
        Err(e) => println!("error: {e}"),
    }
}

/// Reads a local file and pairs it with the [`Fname`] derived from its
/// basename, the way `User.cpp`'s `post` command attaches a file by path
/// (spec distillation drops the REPL but not this wire-facing behavior).
async fn read_attachment(path: &str) -> Result<(Fname, Vec<u8>), String> {
    let basename = Path::new(path)
        .file_name()
        .and_then(|s| s.to_str())
        .ok_or_else(|| "path has no file name".to_string())?;
    let fname = Fname::parse(basename)
        .ok_or_else(|| format!("{basename:?} is not a valid attachment file name"))?;
    let bytes = tokio::fs::read(path).await.map_err(|e| e.to_string())?;
    Ok((fname, bytes))
}

async fn run_retrieve(client: &Client, session: &Session, args: &[&str]) {
    let (Some(uid), Some(gid)) = (session.uid(), session.gid()) else {
        return println!("no group selected");
    };
    let start = match args.first() {
        Some(mid) => match Mid::parse(mid) {
            Some(mid) => mid,
            None => return println!("invalid mid"),
        },
        None => Mid::FIRST,
    };

    match client.retrieve(uid, gid, start).await {
        Ok(RetrieveOutcome::Ok(messages)) => {
            for message in messages {
                print!("[{}] {}: {}", message.mid, message.author, String::from_utf8_lossy(&message.text));
                if let Some((fname, bytes)) = message.attachment {
                    print!(" (attachment {fname}, {} bytes)", bytes.len());
                }
                println!();
            }
        }
        Ok(RetrieveOutcome::Eof) => println!("(no more messages)"),
        Ok(RetrieveOutcome::Rejected) => println!("retrieve rejected"),
        Err(e) => println!("error: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_attachment_from_a_local_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        tokio::fs::write(&path, b"hello from disk").await.unwrap();

        let (fname, bytes) = read_attachment(path.to_str().unwrap()).await.unwrap();
        assert_eq!(fname.to_string(), "notes.txt");
        assert_eq!(bytes, b"hello from disk");
    }

    #[tokio::test]
    async fn rejects_a_basename_that_is_not_a_valid_fname() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no-extension");
        tokio::fs::write(&path, b"x").await.unwrap();

        assert!(read_attachment(path.to_str().unwrap()).await.is_err());
    }
}

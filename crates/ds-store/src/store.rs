//! The directory/message store (spec §4.2). The filesystem rooted at
//! [`Store::open`]'s argument is the single source of truth; no in-memory
//! cache is kept, so two `Store` handles (e.g. two connections' workers)
//! pointed at the same root always observe the same state.

use ds_proto::{Fname, GName, Gid, Mid, Outcome, Pass, Uid};
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::Mutex;

use crate::paths;

/// A message read back from the store, as returned by
/// [`Store::read_message_range`].
#[derive(Clone, Debug)]
pub struct Message {
    pub mid: Mid,
    pub author: Uid,
    pub text: Vec<u8>,
    pub attachment: Option<(Fname, Vec<u8>)>,
}

/// A group summary as returned by [`Store::list_all_groups`] /
/// [`Store::list_subscribed_groups`]: the group's name and the count of
/// messages posted to it so far (`last_mid`).
#[derive(Clone, Debug)]
pub struct GroupSummary {
    pub gid: Gid,
    pub name: GName,
    pub last_mid: u32,
}

struct Inner {
    root: PathBuf,
    /// Serializes GID allocation (spec §5 critical section).
    gid_lock: Mutex<()>,
    /// One lock per group, lazily created, serializing that group's MID
    /// allocation (spec §5 critical section).
    mid_locks: Mutex<HashMap<Gid, Arc<Mutex<()>>>>,
}

/// A cheap-to-clone handle onto the filesystem-backed store. Every request
/// handler receives one of these rather than relying on process-global
/// state (spec §9, "global process state").
#[derive(Clone)]
pub struct Store(Arc<Inner>);

impl Store {
    /// Opens (and idempotently creates) the store rooted at `root`.
    pub async fn open(root: impl Into<PathBuf>) -> io::Result<Store> {
        let root = root.into();
        fs::create_dir_all(paths::users_dir(&root)).await?;
        fs::create_dir_all(paths::groups_dir(&root)).await?;
        Ok(Store(Arc::new(Inner {
            root,
            gid_lock: Mutex::new(()),
            mid_locks: Mutex::new(HashMap::new()),
        })))
    }

    pub fn root(&self) -> &Path {
        &self.0.root
    }

    async fn mid_lock_for(&self, gid: Gid) -> Arc<Mutex<()>> {
        let mut locks = self.0.mid_locks.lock().await;
        locks.entry(gid).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
    }

    // ---- users ----------------------------------------------------------

    pub async fn user_exists(&self, uid: &Uid) -> bool {
        fs::try_exists(paths::pass_file(self.root(), uid))
            .await
            .unwrap_or(false)
    }

    pub async fn user_logged_in(&self, uid: &Uid) -> bool {
        fs::try_exists(paths::login_file(self.root(), uid))
            .await
            .unwrap_or(false)
    }

    pub async fn check_password(&self, uid: &Uid, pass: &Pass) -> Outcome {
        match fs::read(paths::pass_file(self.root(), uid)).await {
            Ok(bytes) if bytes == pass.as_str().as_bytes() => Outcome::Ok,
            Ok(_) => Outcome::Invalid,
            Err(e) if e.kind() == io::ErrorKind::NotFound => Outcome::NotFound,
            Err(e) => e.into(),
        }
    }

    pub async fn create_user(&self, uid: &Uid, pass: &Pass) -> Outcome {
        if self.user_exists(uid).await {
            return Outcome::Duplicate;
        }
        let dir = paths::user_dir(self.root(), uid);
        if let Err(e) = fs::create_dir_all(&dir).await {
            return e.into();
        }
        if let Err(e) = fs::write(paths::pass_file(self.root(), uid), pass.as_str()).await {
            let _ = fs::remove_dir_all(&dir).await;
            return e.into();
        }
        Outcome::Ok
    }

    /// Cascading delete: password, login marker, and every subscription
    /// marker this user holds across all existing groups. The user's past
    /// messages are retained (spec §3, archive property).
    pub async fn delete_user(&self, uid: &Uid) -> Outcome {
        if !self.user_exists(uid).await {
            return Outcome::NotFound;
        }
        if let Ok(mut entries) = fs::read_dir(paths::groups_dir(self.root())).await {
            while let Ok(Some(entry)) = entries.next_entry().await {
                let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
                    continue;
                };
                if let Some(gid) = Gid::parse(&name) {
                    let _ = fs::remove_file(paths::subscription_file(self.root(), &gid, uid)).await;
                }
            }
        }
        match fs::remove_dir_all(paths::user_dir(self.root(), uid)).await {
            Ok(()) => Outcome::Ok,
            Err(e) => e.into(),
        }
    }

    pub async fn set_login(&self, uid: &Uid) -> Outcome {
        if !self.user_exists(uid).await {
            return Outcome::NotFound;
        }
        match fs::write(paths::login_file(self.root(), uid), []).await {
            Ok(()) => Outcome::Ok,
            Err(e) => e.into(),
        }
    }

    pub async fn clear_login(&self, uid: &Uid) -> Outcome {
        match fs::remove_file(paths::login_file(self.root(), uid)).await {
            Ok(()) => Outcome::Ok,
            Err(e) if e.kind() == io::ErrorKind::NotFound => Outcome::Ok,
            Err(e) => e.into(),
        }
    }

    // ---- groups -----------------------------------------------------------

    pub async fn group_exists(&self, gid: &Gid) -> bool {
        fs::try_exists(paths::group_name_file(self.root(), gid))
            .await
            .unwrap_or(false)
    }

    pub async fn is_subscribed(&self, uid: &Uid, gid: &Gid) -> bool {
        fs::try_exists(paths::subscription_file(self.root(), gid, uid))
            .await
            .unwrap_or(false)
    }

    pub async fn group_name(&self, gid: &Gid) -> Result<GName, Outcome> {
        let bytes = fs::read(paths::group_name_file(self.root(), gid))
            .await
            .map_err(Outcome::from)?;
        let text = String::from_utf8(bytes).map_err(|_| Outcome::Invalid)?;
        GName::parse(&text).ok_or(Outcome::Invalid)
    }

    /// Atomically creates a new group owned by `uid`, named `gname`:
    /// allocates the smallest free GID, creates its directory, name record,
    /// the creator's subscription marker, and the `MSG/` directory. Rolls
    /// back everything on any sub-step failure.
    pub async fn create_group(&self, uid: &Uid, gname: &GName) -> Result<Gid, Outcome> {
        let _guard = self.0.gid_lock.lock().await;

        let mut candidate = None;
        for gid in Gid::all_stored() {
            if !self.group_exists(&gid).await {
                candidate = Some(gid);
                break;
            }
        }
        let gid = candidate.ok_or(Outcome::Full)?;

        let dir = paths::group_dir(self.root(), &gid);
        match self.write_new_group(&dir, &gid, uid, gname).await {
            Ok(()) => Ok(gid),
            Err(e) => {
                let _ = fs::remove_dir_all(&dir).await;
                Err(e)
            }
        }
    }

    async fn write_new_group(
        &self,
        dir: &Path,
        gid: &Gid,
        uid: &Uid,
        gname: &GName,
    ) -> Result<(), Outcome> {
        fs::create_dir_all(dir).await?;
        fs::write(paths::group_name_file(self.root(), gid), gname.as_str()).await?;
        fs::write(paths::subscription_file(self.root(), gid, uid), uid.as_str()).await?;
        fs::create_dir_all(paths::msg_dir(self.root(), gid)).await?;
        Ok(())
    }

    /// Subscribes `uid` to an existing group after checking the supplied
    /// `gname` matches the stored one byte-exact (spec §4.2).
    pub async fn subscribe(&self, uid: &Uid, gid: &Gid, gname: &GName) -> Outcome {
        let stored = match fs::read(paths::group_name_file(self.root(), gid)).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Outcome::NotFound,
            Err(e) => return e.into(),
        };
        if stored != gname.as_str().as_bytes() {
            return Outcome::Invalid;
        }
        match fs::write(paths::subscription_file(self.root(), gid, uid), uid.as_str()).await {
            Ok(()) => Outcome::Ok,
            Err(e) => e.into(),
        }
    }

    pub async fn unsubscribe(&self, uid: &Uid, gid: &Gid) -> Outcome {
        match fs::remove_file(paths::subscription_file(self.root(), gid, uid)).await {
            Ok(()) => Outcome::Ok,
            Err(e) if e.kind() == io::ErrorKind::NotFound => Outcome::NotSubscribed,
            Err(e) => e.into(),
        }
    }

    /// The number of messages posted in `gid` so far, i.e. the current
    /// `lastMID`. `0` if the group (or its `MSG/` directory) doesn't exist.
    pub async fn count_messages(&self, gid: &Gid) -> u32 {
        let Ok(mut entries) = fs::read_dir(paths::msg_dir(self.root(), gid)).await else {
            return 0;
        };
        let mut count = 0u32;
        while let Ok(Some(entry)) = entries.next_entry().await {
            if let Some(name) = entry.file_name().to_str() {
                if Mid::parse(name).is_some() {
                    count += 1;
                }
            }
        }
        count
    }

    async fn list_groups(&self, filter_uid: Option<&Uid>) -> Vec<GroupSummary> {
        let mut ids: Vec<Gid> = Vec::new();
        if let Ok(mut entries) = fs::read_dir(paths::groups_dir(self.root())).await {
            while let Ok(Some(entry)) = entries.next_entry().await {
                let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
                    continue;
                };
                let Some(gid) = Gid::parse(&name) else { continue };
                if !self.group_exists(&gid).await {
                    continue;
                }
                if let Some(uid) = filter_uid {
                    if !self.is_subscribed(uid, &gid).await {
                        continue;
                    }
                }
                ids.push(gid);
            }
        }
        ids.sort_by_key(|g| g.value());

        let mut out = Vec::with_capacity(ids.len());
        for gid in ids {
            let Ok(name) = self.group_name(&gid).await else {
                continue;
            };
            let last_mid = self.count_messages(&gid).await;
            out.push(GroupSummary { gid, name, last_mid });
        }
        out
    }

    /// All groups, GID ascending (spec §4.2).
    pub async fn list_all_groups(&self) -> Vec<GroupSummary> {
        self.list_groups(None).await
    }

    /// Groups `uid` is currently subscribed to, GID ascending.
    pub async fn list_subscribed_groups(&self, uid: &Uid) -> Vec<GroupSummary> {
        self.list_groups(Some(uid)).await
    }

    /// Subscriber UIDs of `gid`, in directory-listing order (the caller may
    /// sort further if it needs a stable order across platforms).
    pub async fn list_subscribers(&self, gid: &Gid) -> Result<Vec<Uid>, Outcome> {
        if !self.group_exists(gid).await {
            return Err(Outcome::NotFound);
        }
        let mut out = Vec::new();
        let mut entries = fs::read_dir(paths::group_dir(self.root(), gid))
            .await
            .map_err(Outcome::from)?;
        while let Some(entry) = entries.next_entry().await.map_err(Outcome::from)? {
            let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
                continue;
            };
            let Some(stem) = name.strip_suffix(".txt") else {
                continue;
            };
            if let Some(uid) = Uid::parse(stem) {
                out.push(uid);
            }
        }
        Ok(out)
    }

    // ---- messages -----------------------------------------------------------

    /// Allocates the next `MID` for `gid` and writes the message, rolling
    /// back the partially-created directory on any failure (spec §4.2,
    /// §5 critical section).
    pub async fn append_message(
        &self,
        gid: &Gid,
        uid: &Uid,
        text: &[u8],
        attachment: Option<(&Fname, &[u8])>,
    ) -> Result<Mid, Outcome> {
        let lock = self.mid_lock_for(*gid).await;
        let _guard = lock.lock().await;

        let count = self.count_messages(gid).await;
        let mid = Mid::from_count(count + 1).ok_or(Outcome::Full)?;
        let dir = paths::message_dir(self.root(), gid, &mid);
        match self.write_message(&dir, uid, text, attachment).await {
            Ok(()) => Ok(mid),
            Err(e) => {
                let _ = fs::remove_dir_all(&dir).await;
                Err(e)
            }
        }
    }

    async fn write_message(
        &self,
        dir: &Path,
        uid: &Uid,
        text: &[u8],
        attachment: Option<(&Fname, &[u8])>,
    ) -> Result<(), Outcome> {
        fs::create_dir_all(dir).await?;
        fs::write(paths::author_file(dir), uid.as_str()).await?;
        fs::write(paths::text_file(dir), text).await?;
        if let Some((fname, bytes)) = attachment {
            fs::write(paths::attachment_file(dir, fname), bytes).await?;
            fs::write(paths::fname_file(dir), fname.as_str()).await?;
        }
        Ok(())
    }

    /// Up to 20 messages starting at `start`, per spec §4.2:
    /// `N = min(20, count(gid) - start + 1)`. A message whose author or
    /// text file can't be read is skipped, not counted against `N` — i.e.
    /// the allocation mkdir is the commit point and content files may not
    /// have landed yet for the very latest entry.
    pub async fn read_message_range(&self, gid: &Gid, start: Mid) -> Vec<Message> {
        let count = self.count_messages(gid).await;
        if start.value() > count {
            return Vec::new();
        }
        let n = (ds_proto::tags::MAX_RETRIEVE_WINDOW as u32).min(count - start.value() + 1);

        let mut out = Vec::with_capacity(n as usize);
        for i in 0..n {
            let Some(mid) = Mid::from_count(start.value() + i) else {
                break;
            };
            let dir = paths::message_dir(self.root(), gid, &mid);
            if let Some(message) = self.read_message(&dir, mid).await {
                out.push(message);
            }
        }
        out
    }

    /// The count of messages that `read_message_range(gid, start)` would
    /// report as the reply's `N`, ignoring content-file skips — used by
    /// `RTV` to decide between `EOF` and `OK <N>` before it starts reading.
    pub async fn retrieve_window_size(&self, gid: &Gid, start: Mid) -> u32 {
        let count = self.count_messages(gid).await;
        if start.value() > count {
            0
        } else {
            (ds_proto::tags::MAX_RETRIEVE_WINDOW as u32).min(count - start.value() + 1)
        }
    }

    async fn read_message(&self, dir: &Path, mid: Mid) -> Option<Message> {
        let author_bytes = fs::read(paths::author_file(dir)).await.ok()?;
        let author = Uid::parse(std::str::from_utf8(&author_bytes).ok()?)?;
        let text = fs::read(paths::text_file(dir)).await.ok()?;

        let attachment = match fs::read(paths::fname_file(dir)).await {
            Ok(bytes) => {
                let fname = Fname::parse(std::str::from_utf8(&bytes).ok()?)?;
                let data = fs::read(paths::attachment_file(dir, &fname)).await.ok()?;
                Some((fname, data))
            }
            Err(_) => None,
        };

        Some(Message { mid, author, text, attachment })
    }
}

//! Directory layout (spec §4.2). Byte-exact, including the literal spaces
//! in `A U T H O R.txt`, `T E X T.txt` and `F N A M E.txt`, so a server can
//! be restarted against existing state written by a previous run — or by
//! another implementation of this same layout.

use ds_proto::{Gid, Mid, Uid};
use std::path::{Path, PathBuf};

pub fn users_dir(root: &Path) -> PathBuf {
    root.join("USERS")
}

pub fn user_dir(root: &Path, uid: &Uid) -> PathBuf {
    users_dir(root).join(uid.as_str())
}

pub fn pass_file(root: &Path, uid: &Uid) -> PathBuf {
    user_dir(root, uid).join(format!("{uid}_pass.txt"))
}

pub fn login_file(root: &Path, uid: &Uid) -> PathBuf {
    user_dir(root, uid).join(format!("{uid}_login.txt"))
}

pub fn groups_dir(root: &Path) -> PathBuf {
    root.join("GROUPS")
}

pub fn group_dir(root: &Path, gid: &Gid) -> PathBuf {
    groups_dir(root).join(gid.to_string())
}

pub fn group_name_file(root: &Path, gid: &Gid) -> PathBuf {
    group_dir(root, gid).join(format!("{gid}_name.txt"))
}

pub fn subscription_file(root: &Path, gid: &Gid, uid: &Uid) -> PathBuf {
    group_dir(root, gid).join(format!("{uid}.txt"))
}

pub fn msg_dir(root: &Path, gid: &Gid) -> PathBuf {
    group_dir(root, gid).join("MSG")
}

pub fn message_dir(root: &Path, gid: &Gid, mid: &Mid) -> PathBuf {
    msg_dir(root, gid).join(mid.to_string())
}

pub fn author_file(message_dir: &Path) -> PathBuf {
    message_dir.join("A U T H O R.txt")
}

pub fn text_file(message_dir: &Path) -> PathBuf {
    message_dir.join("T E X T.txt")
}

pub fn fname_file(message_dir: &Path) -> PathBuf {
    message_dir.join("F N A M E.txt")
}

pub fn attachment_file(message_dir: &Path, fname: &ds_proto::Fname) -> PathBuf {
    message_dir.join(fname.as_str())
}

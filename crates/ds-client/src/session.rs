//! Client-side session state (spec §4.5): `Anonymous → LoggedIn(UID) →
//! SelectedGroup(UID,GID) → LoggedIn(UID) → Anonymous`. The server does not
//! track any of this — it accepts any well-formed request whose UID happens
//! to be currently logged in — so this is bookkeeping purely for the REPL's
//! convenience, mirroring the "currently selected UID/GID" fields `User.cpp`
//! keeps around its own command loop.

use ds_proto::{Gid, Uid};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Session {
    Anonymous,
    LoggedIn(Uid),
    SelectedGroup(Uid, Gid),
}

impl Session {
    pub fn uid(&self) -> Option<&Uid> {
        match self {
            Session::Anonymous => None,
            Session::LoggedIn(uid) | Session::SelectedGroup(uid, _) => Some(uid),
        }
    }

    pub fn gid(&self) -> Option<Gid> {
        match self {
            Session::SelectedGroup(_, gid) => Some(*gid),
            _ => None,
        }
    }

    pub fn is_logged_in(&self) -> bool {
        self.uid().is_some()
    }

    /// `LOG` succeeded: Anonymous (or a stale LoggedIn/SelectedGroup) moves
    /// to `LoggedIn(uid)`, clearing any prior group selection.
    pub fn log_in(&mut self, uid: Uid) {
        *self = Session::LoggedIn(uid);
    }

    /// `OUT` succeeded: any state collapses back to `Anonymous`.
    pub fn log_out(&mut self) {
        *self = Session::Anonymous;
    }

    /// A `GSR` selected or created group `gid`. Requires the session to
    /// already be logged in; returns `false` (no-op) otherwise.
    pub fn select(&mut self, gid: Gid) -> bool {
        match self.uid().cloned() {
            Some(uid) => {
                *self = Session::SelectedGroup(uid, gid);
                true
            }
            None => false,
        }
    }

    pub fn deselect(&mut self) {
        if let Session::SelectedGroup(uid, _) = self {
            *self = Session::LoggedIn(uid.clone());
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Session::Anonymous
    }
}

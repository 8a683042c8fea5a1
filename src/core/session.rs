//! Per-connection shell state.

use std::collections::VecDeque;

use session_store::SessionRecord;
use time::macros::format_description;
use time::{Duration, OffsetDateTime, UtcOffset};

use crate::core::seed::FsTemplate;
use crate::core::vfs::{self, VirtualFs};

pub const HISTORY_LIMIT: usize = 10;
pub const DEFAULT_UID: u32 = 1000;
pub const DEFAULT_GID: u32 = 1000;
pub const DECOY_IFACE: &str = "eth0";
pub const DECOY_ADDRESS: &str = "192.168.1.10";

/// Who the attacker appears to be logged in as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user: String,
    pub uid: u32,
    pub gid: u32,
    pub hostname: String,
    pub home: String,
    /// Zone `date` reports in. Resolved once at startup.
    pub utc_offset: UtcOffset,
}

impl Identity {
    pub fn new(user: impl Into<String>, hostname: impl Into<String>) -> Self {
        let user = user.into();
        let home = format!("/home/{user}");
        Self {
            user,
            uid: DEFAULT_UID,
            gid: DEFAULT_GID,
            hostname: hostname.into(),
            home,
            utc_offset: UtcOffset::UTC,
        }
    }

    pub fn with_utc_offset(mut self, offset: UtcOffset) -> Self {
        self.utc_offset = offset;
        self
    }

    /// `uid=1000(user) gid=1000(user) groups=1000(user)`
    pub fn id_line(&self) -> String {
        format!(
            "uid={uid}({user}) gid={gid}({user}) groups={gid}({user})",
            uid = self.uid,
            gid = self.gid,
            user = self.user,
        )
    }
}

#[derive(Debug)]
pub struct SessionState {
    identity: Identity,
    cwd: String,
    fs: VirtualFs,
    history: VecDeque<String>,
    clock_offset: Duration,
    pub iface: &'static str,
    pub address: &'static str,
}

impl SessionState {
    /// Fresh state starting in the home directory with a private copy of the
    /// template.
    pub fn new(identity: Identity, template: &FsTemplate) -> Self {
        let fs = template.instantiate();
        let cwd = if fs.is_dir(&identity.home) {
            identity.home.clone()
        } else {
            vfs::ROOT.to_string()
        };
        Self {
            identity,
            cwd,
            fs,
            history: VecDeque::with_capacity(HISTORY_LIMIT),
            clock_offset: Duration::ZERO,
            iface: DECOY_IFACE,
            address: DECOY_ADDRESS,
        }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn user(&self) -> &str {
        &self.identity.user
    }

    pub fn hostname(&self) -> &str {
        &self.identity.hostname
    }

    pub fn home(&self) -> &str {
        &self.identity.home
    }

    pub fn cwd(&self) -> &str {
        &self.cwd
    }

    pub fn fs(&self) -> &VirtualFs {
        &self.fs
    }

    pub fn fs_mut(&mut self) -> &mut VirtualFs {
        &mut self.fs
    }

    /// Resolves a user-supplied path against this session's cwd and home.
    pub fn resolve(&self, raw: &str) -> String {
        vfs::normalize(&self.cwd, &self.identity.home, raw)
    }

    /// Moves to `path` if it names a directory.
    pub(crate) fn change_dir(&mut self, path: String) -> bool {
        if self.fs.is_dir(&path) {
            self.cwd = path;
            true
        } else {
            false
        }
    }

    pub fn history(&self) -> impl Iterator<Item = &str> {
        self.history.iter().map(String::as_str)
    }

    /// Appends `command`, evicting the oldest entries beyond
    /// [`HISTORY_LIMIT`].
    pub fn add_history(&mut self, command: impl Into<String>) {
        self.history.push_back(command.into());
        while self.history.len() > HISTORY_LIMIT {
            self.history.pop_front();
        }
    }

    pub fn clock_offset(&self) -> Duration {
        self.clock_offset
    }

    /// Moves the session clock forward. Negative amounts are ignored so the
    /// offset never decreases.
    pub fn advance_clock(&mut self, by: Duration) {
        if by.is_positive() {
            self.clock_offset = self.clock_offset.saturating_add(by);
        }
    }

    pub fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc().to_offset(self.identity.utc_offset) + self.clock_offset
    }

    /// Current session time in `date(1)` style.
    pub fn now_local_string(&self) -> String {
        format_date(self.now())
    }

    /// `user@host:cwd$ `
    pub fn prompt(&self) -> String {
        format!(
            "{}@{}:{}$ ",
            self.identity.user, self.identity.hostname, self.cwd
        )
    }

    /// Consumes the state into its persisted form.
    pub fn into_record(self, sid: impl Into<String>, ts: impl Into<String>) -> SessionRecord<VirtualFs> {
        SessionRecord {
            ts: ts.into(),
            sid: sid.into(),
            user: self.identity.user,
            hostname: self.identity.hostname,
            cwd: self.cwd,
            history: self.history.into_iter().collect(),
            fs: self.fs,
        }
    }
}

/// `Tue Jan 6 09:05:03 UTC 2026`
pub fn format_date(at: OffsetDateTime) -> String {
    let head = format_description!(
        "[weekday repr:short] [month repr:short] [day padding:none] [hour]:[minute]:[second]"
    );
    let head = at.format(head).unwrap_or_else(|_| at.date().to_string());
    format!("{head} {} {}", zone_label(at.offset()), at.year())
}

fn zone_label(offset: UtcOffset) -> String {
    if offset.is_utc() {
        return "UTC".to_string();
    }
    let (hours, minutes, _) = offset.as_hms();
    let sign = if offset.is_negative() { '-' } else { '+' };
    format!("{sign}{:02}{:02}", hours.unsigned_abs(), minutes.unsigned_abs())
}

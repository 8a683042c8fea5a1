//! Built-in decoy filesystem and the shared template wrapper.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::config::ConfigError;
use crate::core::session::Identity;
use crate::core::vfs::{FsError, FsNode, VirtualFs};

/// Process-wide, read-only starting filesystem. Sessions receive deep
/// copies through [`FsTemplate::instantiate`] and never see each other's
/// changes.
#[derive(Debug, Clone)]
pub struct FsTemplate {
    base: Arc<VirtualFs>,
}

impl FsTemplate {
    pub fn new(base: VirtualFs) -> Self {
        Self {
            base: Arc::new(base),
        }
    }

    /// The built-in decoy tree for `identity`.
    pub fn decoy(identity: &Identity) -> Result<Self, FsError> {
        decoy_filesystem(identity).map(Self::new)
    }

    /// Loads a template from a JSON `{path: node}` document.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let body = fs::read_to_string(path).map_err(|source| ConfigError::TemplateRead {
            path: path.to_path_buf(),
            source,
        })?;
        let base = serde_json::from_str::<VirtualFs>(&body).map_err(|source| {
            ConfigError::TemplateParse {
                path: path.to_path_buf(),
                source,
            }
        })?;
        Ok(Self::new(base))
    }

    pub fn instantiate(&self) -> VirtualFs {
        VirtualFs::clone(&self.base)
    }

    pub fn base(&self) -> &VirtualFs {
        &self.base
    }
}

fn decoy_filesystem(identity: &Identity) -> Result<VirtualFs, FsError> {
    let user = &identity.user;
    let home = identity.home.as_str();
    let hostname = &identity.hostname;

    let mut nodes = BTreeMap::new();
    insert_dir(&mut nodes, "/", &["home", "tmp", "etc", "var"]);
    insert_dir(&mut nodes, "/home", &[user.as_str()]);
    insert_dir(&mut nodes, home, &["notes.txt", "scripts", ".ssh"]);
    insert_dir(&mut nodes, "/tmp", &[]);
    insert_dir(&mut nodes, "/etc", &["passwd", "hostname", "shadow"]);
    insert_dir(&mut nodes, "/var", &["log"]);
    insert_dir(&mut nodes, "/var/log", &["auth.log"]);
    insert_dir(&mut nodes, &format!("{home}/scripts"), &["backup.sh"]);
    insert_dir(&mut nodes, &format!("{home}/.ssh"), &["authorized_keys"]);

    let files = [
        ("/etc/hostname".to_string(), format!("{hostname}\n")),
        (
            "/etc/passwd".to_string(),
            format!(
                "root:x:0:0:root:/root:/bin/bash\n\
                 daemon:x:1:1:daemon:/usr/sbin:/usr/sbin/nologin\n\
                 www-data:x:33:33:www-data:/var/www:/usr/sbin/nologin\n\
                 {user}:x:{uid}:{gid}:{user}:{home}:/bin/bash\n",
                uid = identity.uid,
                gid = identity.gid,
            ),
        ),
        (
            "/etc/shadow".to_string(),
            format!(
                "root:!:18930:0:99999:7:::\n\
                 daemon:*:18930:0:99999:7:::\n\
                 www-data:*:18930:0:99999:7:::\n\
                 {user}:$6$abcdef123456$xxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxx:18930:0:99999:7:::\n"
            ),
        ),
        (
            "/var/log/auth.log".to_string(),
            format!(
                "Jan 22 10:12:01 {hostname} sshd[1024]: Accepted password for {user} from 10.0.0.5 port 53422 ssh2\n\
                 Jan 22 10:12:03 {hostname} sshd[1024]: pam_unix(sshd:session): session opened for user {user}(uid={uid})\n",
                uid = identity.uid,
            ),
        ),
        (
            format!("{home}/notes.txt"),
            "TODO:\n- rotate ssh keys\n- backup /etc\n- check nginx logs\n".to_string(),
        ),
        (
            format!("{home}/scripts/backup.sh"),
            "#!/bin/bash\necho \"backup started\"\n".to_string(),
        ),
        (
            format!("{home}/.ssh/authorized_keys"),
            format!("ssh-rsa AAAAB3NzaC1yc2EAAAADAQABAAABAQCfakekey {user}@laptop\n"),
        ),
    ];
    for (path, content) in files {
        nodes.insert(path, FsNode::file(content));
    }

    VirtualFs::from_nodes(nodes)
}

fn insert_dir(nodes: &mut BTreeMap<String, FsNode>, path: &str, children: &[&str]) {
    nodes.insert(
        path.to_string(),
        FsNode::Dir {
            children: children.iter().map(|name| name.to_string()).collect(),
        },
    );
}

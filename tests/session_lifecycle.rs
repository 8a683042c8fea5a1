
use decoy_shell::{EndReason, SessionPhase, VirtualFs};
use fixture::{memory_pair, read_to_end, read_until, Harness, Script, ScriptedGenerator};
use pretty_assertions::assert_eq;
use session_store::{SessionEvent, SessionRecord, SessionStore};
use tokio::io::AsyncWriteExt;

const HOME_PROMPT: &str = "user@honeypot:/home/user$ ";

#[tokio::test]
async fn disconnect_mid_read_persists_final_state() {
    let harness = Harness::new(ScriptedGenerator::stalled());
    let (mut client, transport) = memory_pair(Script::Normal);
    let context = harness.context.clone();
    let session = tokio::spawn(async move { context.run_session(transport).await });

    let banner = read_until(&mut client, HOME_PROMPT).await;
    assert!(banner.starts_with("Welcome to Ubuntu 22.04.4 LTS"));
    assert!(banner.contains("\r\nLast login: "));

    client.write_all(b"mkdir /tmp/loot\r").await.expect("write");
    read_until(&mut client, HOME_PROMPT).await;
    client.write_all(b"cd /tmp\r\n").await.expect("write");
    read_until(&mut client, "user@honeypot:/tmp$ ").await;
    client.write_all(b"who").await.expect("write");
    read_until(&mut client, "who").await;
    client.shutdown().await.expect("shutdown");

    let outcome = session.await.expect("session task");
    assert_eq!(outcome.reason, EndReason::Disconnected);
    assert_eq!(
        outcome.phases,
        vec![
            SessionPhase::Connecting,
            SessionPhase::Authenticating,
            SessionPhase::AwaitingShell,
            SessionPhase::Interactive,
            SessionPhase::Closing,
            SessionPhase::Closed,
        ]
    );

    let saved = outcome.saved.expect("snapshot written");
    let record: SessionRecord<VirtualFs> = SessionStore::load(&saved).expect("load snapshot");
    assert_eq!(record.sid, outcome.session_id);
    assert_eq!(record.cwd, "/tmp");
    assert_eq!(record.history, vec!["mkdir /tmp/loot", "cd /tmp"]);
    assert!(record.fs.is_dir("/tmp/loot"));

    assert_eq!(
        harness.event_types(),
        vec![
            "session_start",
            "command",
            "output",
            "command",
            "output",
            "session_end",
            "session_saved",
        ]
    );
}

#[tokio::test]
async fn logout_ends_loop_after_message() {
    let harness = Harness::new(ScriptedGenerator::stalled());
    let (mut client, transport) = memory_pair(Script::Normal);
    let context = harness.context.clone();
    let session = tokio::spawn(async move { context.run_session(transport).await });

    read_until(&mut client, HOME_PROMPT).await;
    client.write_all(b"whoami\r").await.expect("write");
    let shown = read_until(&mut client, HOME_PROMPT).await;
    assert!(shown.contains("whoami\r\nuser\r\n"));

    client.write_all(b"exit\r").await.expect("write");
    let tail = read_to_end(&mut client).await;
    assert!(tail.ends_with("exit\r\nlogout\r\n"));

    let outcome = session.await.expect("session task");
    assert_eq!(outcome.reason, EndReason::Logout);
    assert!(outcome.saved.is_some());

    let events: Vec<SessionEvent> = harness
        .events()
        .into_iter()
        .map(|record| record.event)
        .collect();
    assert_eq!(
        events[1..5].to_vec(),
        vec![
            SessionEvent::Command {
                cmd: "whoami".into(),
                cwd: "/home/user".into(),
            },
            SessionEvent::Output {
                cmd: Some("whoami".into()),
                out: "user\n".into(),
                code: 0,
            },
            SessionEvent::Command {
                cmd: "exit".into(),
                cwd: "/home/user".into(),
            },
            SessionEvent::Output {
                cmd: None,
                out: "logout\n".into(),
                code: 0,
            },
        ]
    );
}

#[tokio::test]
async fn unwritable_snapshot_still_closes_cleanly() {
    let harness = Harness::new(ScriptedGenerator::stalled());
    std::fs::write(harness.context.store.root(), "not a directory").expect("block store root");
    let (mut client, transport) = memory_pair(Script::Normal);
    let context = harness.context.clone();
    let session = tokio::spawn(async move { context.run_session(transport).await });

    read_until(&mut client, HOME_PROMPT).await;
    client.write_all(b"logout\r").await.expect("write");
    let tail = read_to_end(&mut client).await;
    assert!(tail.ends_with("logout\r\nlogout\r\n"));

    let outcome = session.await.expect("session task");
    assert_eq!(outcome.reason, EndReason::Logout);
    assert!(outcome.saved.is_none());
    assert_eq!(outcome.phases.last(), Some(&SessionPhase::Closed));

    let types = harness.event_types();
    assert_eq!(
        types[types.len() - 2..].to_vec(),
        vec!["session_end", "session_save_failed"]
    );
}

#[tokio::test]
async fn blank_lines_are_not_recorded() {
    let harness = Harness::new(ScriptedGenerator::stalled());
    let (mut client, transport) = memory_pair(Script::Normal);
    let context = harness.context.clone();
    let session = tokio::spawn(async move { context.run_session(transport).await });

    read_until(&mut client, HOME_PROMPT).await;
    client.write_all(b"   \rlogout\r").await.expect("write");
    read_to_end(&mut client).await;

    let outcome = session.await.expect("session task");
    let record: SessionRecord<VirtualFs> =
        SessionStore::load(&outcome.saved.expect("saved")).expect("load");
    assert_eq!(record.history, vec!["logout"]);
}

#[tokio::test]
async fn fallback_timeout_reaches_the_client() {
    let harness = Harness::new(ScriptedGenerator::stalled());
    let (mut client, transport) = memory_pair(Script::Normal);
    let context = harness.context.clone();
    let session = tokio::spawn(async move { context.run_session(transport).await });

    read_until(&mut client, HOME_PROMPT).await;
    client.write_all(b"uptime\r").await.expect("write");
    let shown = read_until(&mut client, HOME_PROMPT).await;
    assert!(shown.contains("bash: uptime: LLM unavailable (timeout)\r\n"));
    client.shutdown().await.expect("shutdown");
    session.await.expect("session task");

    assert!(harness.event_types().contains(&"llm_timeout"));
}

#[tokio::test]
async fn negotiation_failure_closes_without_snapshot() {
    let harness = Harness::new(ScriptedGenerator::stalled());
    let (_client, transport) = memory_pair(Script::FailHandshake);

    let outcome = harness.context.run_session(transport).await;

    assert_eq!(outcome.reason, EndReason::NegotiationFailed);
    assert_eq!(
        outcome.phases,
        vec![
            SessionPhase::Connecting,
            SessionPhase::Closing,
            SessionPhase::Closed
        ]
    );
    assert!(outcome.saved.is_none());
    assert_eq!(
        harness.event_types(),
        vec!["session_start", "ssh_negotiation_failed", "session_end"]
    );
}

#[tokio::test]
async fn missing_channel_times_out() {
    let harness = Harness::new(ScriptedGenerator::stalled());
    let (_client, transport) = memory_pair(Script::NoChannel);

    let outcome = harness.context.run_session(transport).await;

    assert_eq!(outcome.reason, EndReason::NoChannel);
    assert_eq!(
        harness.event_types(),
        vec!["session_start", "no_channel", "session_end"]
    );
}

#[tokio::test]
async fn missing_shell_request_times_out() {
    let harness = Harness::new(ScriptedGenerator::stalled());
    let (mut client, transport) = memory_pair(Script::NoShell);

    let outcome = harness.context.run_session(transport).await;

    assert_eq!(outcome.reason, EndReason::NoShellRequest);
    assert!(outcome.saved.is_none());
    assert_eq!(
        harness.event_types(),
        vec!["session_start", "no_shell_request", "session_end"]
    );
    assert_eq!(read_to_end(&mut client).await, "");
}

#[tokio::test]
async fn every_event_carries_session_and_peer() {
    let harness = Harness::new(ScriptedGenerator::stalled());
    let (_client, transport) = memory_pair(Script::FailHandshake);

    let outcome = harness.context.run_session(transport).await;

    for record in harness.events() {
        assert_eq!(record.session_id, outcome.session_id);
        assert_eq!(record.client_ip, "203.0.113.50");
        assert_eq!(record.client_port, 41414);
    }
}

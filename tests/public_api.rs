#![allow(unused_imports)]

use decoy_shell::{
    init_tracing, normalize, CommandResult, ConfigError, Credentials, Dispatcher, EndReason,
    EnvConfig, FallbackAdapter, FsError, FsNode, FsTemplate, GenerateError, Identity, LineEditor,
    ProtocolError, ReadOutcome, Server, SessionContext, SessionLimits, SessionLogger,
    SessionOutcome, SessionPhase, SessionState, TcpLoginTransport, TextGenerator, Transport,
    VirtualFs,
};

#[test]
fn public_api_exports_compile() {}

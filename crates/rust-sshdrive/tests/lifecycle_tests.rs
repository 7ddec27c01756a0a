//! Integration tests for the session lifecycle.
//!
//! These tests require the `mock` and `test-utils` features.

#![cfg(all(feature = "mock", feature = "test-utils"))]

use rust_sshdrive::engine::EngineCode;
use rust_sshdrive::library::LibraryState;
use rust_sshdrive::mock::{self, MockEngine, MockTransport, Primitive, ReadEvent};
use rust_sshdrive::session::{AUTHENTICATION_FAILED, NORMAL_SHUTDOWN};
use rust_sshdrive::test_utils::ManualScheduler;
use rust_sshdrive::{Client, CommandOutput, Credentials, DriveError, Driver, SessionState, Step};

fn client(engine: MockEngine, library: &LibraryState) -> Client<'_, MockEngine, ManualScheduler> {
    let mut client = Client::new(engine, Driver::new(ManualScheduler::new()), library);
    client.init().unwrap();
    client
}

fn demo() -> Credentials {
    Credentials::new("demo", "password")
}

#[test]
fn echo_hi_scenario() {
    let library = LibraryState::new();
    let mut client = client(mock::echo_hi().expect_password("demo", "password"), &library);
    let transport = MockTransport::new(11);
    let probe = transport.probe();
    let mut stdout: Vec<u8> = Vec::new();

    let outputs = client
        .run_commands_over(transport, &demo(), ["echo hi"], &mut stdout)
        .unwrap();

    assert_eq!(String::from_utf8(stdout).unwrap(), "hi\n");
    assert_eq!(outputs, [CommandOutput { bytes: 3 }]);
    assert_eq!(probe.closes(), 1);
    assert_eq!(client.engine().live_sessions(), 0);
    assert_eq!(client.engine().open_channels(), 0);
    assert_eq!(client.engine().calls().disconnect_reasons, [NORMAL_SHUTDOWN]);
}

/// Expected release counts after a failure at one point.
struct FailurePoint {
    primitive: Primitive,
    step: Step,
    channel_frees: usize,
    disconnect_reason: Option<&'static str>,
}

#[test]
fn every_failure_point_cleans_up() {
    let points = [
        FailurePoint {
            primitive: Primitive::Handshake,
            step: Step::Handshake,
            channel_frees: 0,
            disconnect_reason: None,
        },
        FailurePoint {
            primitive: Primitive::Authenticate,
            step: Step::Authenticate,
            channel_frees: 0,
            disconnect_reason: Some(AUTHENTICATION_FAILED),
        },
        FailurePoint {
            primitive: Primitive::ChannelOpen,
            step: Step::ChannelOpen,
            channel_frees: 0,
            disconnect_reason: Some(NORMAL_SHUTDOWN),
        },
        FailurePoint {
            primitive: Primitive::ChannelExec,
            step: Step::Exec,
            channel_frees: 1,
            disconnect_reason: Some(NORMAL_SHUTDOWN),
        },
    ];

    for point in points {
        let library = LibraryState::new();
        let engine = MockEngine::new()
            .would_block(point.primitive, 2)
            .fail(point.primitive, EngineCode(-99));
        let mut client = client(engine, &library);
        let transport = MockTransport::new(5);
        let probe = transport.probe();

        let err = client
            .run_commands_over(transport, &demo(), ["uptime"], &mut std::io::sink())
            .unwrap_err();

        assert_eq!(err.step(), Some(point.step), "{:?}", point.primitive);
        assert_eq!(err.engine_code(), Some(EngineCode(-99)));
        let calls = client.engine().calls();
        assert_eq!(calls.session_free, 1, "{:?}", point.primitive);
        assert_eq!(calls.channel_free, point.channel_frees, "{:?}", point.primitive);
        assert_eq!(probe.closes(), 1, "{:?}", point.primitive);
        assert_eq!(
            calls.disconnect_reasons.first().map(String::as_str),
            point.disconnect_reason,
            "{:?}",
            point.primitive
        );
        assert_eq!(client.engine().live_sessions(), 0);
    }
}

#[test]
fn wrong_password_is_terminal() {
    let library = LibraryState::new();
    let mut client = client(MockEngine::new().expect_password("demo", "password"), &library);

    let err = client
        .establish(MockTransport::new(5), &Credentials::new("demo", "nope"))
        .unwrap_err();

    assert!(err.is_terminal());
    assert_eq!(err.engine_code(), Some(EngineCode::AUTHENTICATION_FAILED));
    assert_eq!(client.engine().calls().disconnect_reasons, [AUTHENTICATION_FAILED]);
}

#[test]
fn commands_run_one_channel_at_a_time() {
    let library = LibraryState::new();
    let mut client = client(mock::with_outputs(["/home/demo\n", "a\nb\n", "ok\n"]), &library);
    let mut out: Vec<u8> = Vec::new();

    let outputs = client
        .run_commands_over(MockTransport::new(5), &demo(), ["pwd", "ls", "echo ok"], &mut out)
        .unwrap();

    assert_eq!(out, b"/home/demo\na\nb\nok\n");
    assert_eq!(
        outputs.iter().map(|o| o.bytes).collect::<Vec<_>>(),
        [11, 4, 3]
    );
    let calls = client.engine().calls();
    assert_eq!(calls.max_open_channels, 1);
    assert_eq!(calls.channel_open, 3);
    assert_eq!(calls.channel_close, 3);
    assert_eq!(calls.channel_free, 3);
    assert_eq!(calls.commands, ["pwd", "ls", "echo ok"]);
}

#[test]
fn step_wise_channel_cycle() {
    let library = LibraryState::new();
    let engine = MockEngine::new()
        .read_would_block(3)
        .read(ReadEvent::data("line\n"))
        .read_eof();
    let mut client = client(engine, &library);
    let mut session = client.establish(MockTransport::new(5), &demo()).unwrap();
    assert_eq!(session.state(), SessionState::Ready);

    session.open_channel().unwrap();
    assert!(matches!(session.open_channel(), Err(DriveError::ChannelBusy)));
    session.exec("cat /etc/motd").unwrap();
    assert_eq!(session.state(), SessionState::Executing);

    let mut out: Vec<u8> = Vec::new();
    assert_eq!(session.drain_output(&mut out).unwrap(), 5);
    assert_eq!(session.state(), SessionState::Draining);
    session.close_channel().unwrap();
    assert_eq!(session.state(), SessionState::ChannelClosed);
    session.shutdown();

    assert_eq!(out, b"line\n");
    assert_eq!(client.driver().scheduler().yield_count(), 3);
}

#[test]
fn drop_without_shutdown_releases_everything() {
    let library = LibraryState::new();
    let mut client = client(MockEngine::new(), &library);
    let transport = MockTransport::new(5);
    let probe = transport.probe();

    let mut session = client.establish(transport, &demo()).unwrap();
    session.open_channel().unwrap();
    session.exec("sleep 10").unwrap();
    drop(session);

    let calls = client.engine().calls();
    assert_eq!(calls.channel_free, 1);
    assert_eq!(calls.session_free, 1);
    assert_eq!(calls.disconnect_reasons, [NORMAL_SHUTDOWN]);
    assert_eq!(probe.closes(), 1);
}

#[test]
fn failed_disconnect_still_frees() {
    let library = LibraryState::new();
    let engine = MockEngine::new().fail(Primitive::Disconnect, EngineCode::SOCKET_DISCONNECT);
    let mut client = client(engine, &library);
    let transport = MockTransport::new(5);
    let probe = transport.probe();

    client.establish(transport, &demo()).unwrap().shutdown();

    let calls = client.engine().calls();
    assert_eq!(calls.session_disconnect, 1);
    assert!(calls.disconnect_reasons.is_empty());
    assert_eq!(calls.session_free, 1);
    assert_eq!(probe.closes(), 1);
}

#[test]
fn uninitialised_library_refuses_sessions() {
    let library = LibraryState::new();
    let mut client = Client::new(MockEngine::new(), Driver::new(ManualScheduler::new()), &library);
    let transport = MockTransport::new(5);
    let probe = transport.probe();

    let err = client
        .run_commands_over(transport, &demo(), ["true"], &mut std::io::sink())
        .unwrap_err();

    assert!(matches!(err, DriveError::NotInitialized));
    assert_eq!(client.engine().calls().session_new, 0);
    assert_eq!(probe.closes(), 1);
}

#[test]
fn unreachable_host_fails_before_engine() {
    let library = LibraryState::new();
    let mut client = client(MockEngine::new(), &library);

    let err = client
        .run_commands("", 22, &demo(), ["true"], &mut std::io::sink())
        .unwrap_err();

    assert!(matches!(err, DriveError::Connect(ref e) if e.is_invalid_argument()));
    assert_eq!(client.engine().calls().session_new, 0);
}

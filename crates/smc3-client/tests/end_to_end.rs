#![cfg(unix)]

use std::time::Duration;

use smc3_client::{
    ChannelSubscriber, Client, ClientConfig, ClientError, Controller, TelemetryEvent,
};
use smc3_frame::{Motor, ParamCode, Parameter, Values, VERSION_TAG};
use smc3_mock::{idle_telemetry, smc3_device, MockEndpoint, Stub};

fn demo_endpoint() -> MockEndpoint {
    let mut endpoint = MockEndpoint::loopback().expect("loopback endpoint should be created");
    for (name, stub) in smc3_device(101).expect("device stubs should build") {
        endpoint.stub(name, stub);
    }
    endpoint.open().expect("endpoint should open");
    endpoint
}

#[tokio::test]
async fn raw_version_read_resolves_through_mock() {
    let mut endpoint = MockEndpoint::loopback().expect("loopback endpoint should be created");
    let stub = endpoint.stub("rdv", Stub::fixed(*b"[rdv]", *b"[v\x00\x65]"));
    endpoint.open().expect("endpoint should open");

    let host = endpoint.host_stream().expect("host stream should clone");
    let client = Client::new(host, (), ClientConfig::default()).expect("client should start");

    let packet = client
        .make_read_request(b"[rdv]", VERSION_TAG, Duration::from_secs(1))
        .await
        .expect("read should resolve");

    assert_eq!(packet.param, ParamCode::Known(Parameter::Version));
    assert_eq!(packet.values, Values::Single(101));
    assert_eq!(stub.calls(), 1);
}

#[tokio::test]
async fn controller_reads_full_status() {
    let endpoint = demo_endpoint();
    let host = endpoint.host_stream().expect("host stream should clone");
    let controller = Controller::new(
        Client::new(host, (), ClientConfig::default()).expect("client should start"),
    );

    assert_eq!(controller.version().await.expect("version"), 101);

    for motor in Motor::ALL {
        let kp = controller
            .read_param(motor, Parameter::Kp)
            .await
            .expect("kp");
        assert_eq!(kp, Values::Single(400));

        let limits = controller
            .read_param(motor, Parameter::MinMax)
            .await
            .expect("min/max");
        assert_eq!(limits, Values::Pair(20, 235));

        let position = controller
            .read_param(motor, Parameter::Position)
            .await
            .expect("position");
        assert_eq!(position, Values::Pair(100, 10));

        let pwm = controller
            .read_param(motor, Parameter::PwmStatus)
            .await
            .expect("pwm/status");
        assert_eq!(pwm, Values::Pair(200, 13));
    }
}

#[tokio::test]
async fn writes_do_not_disturb_later_reads() {
    let endpoint = demo_endpoint();
    let host = endpoint.host_stream().expect("host stream should clone");
    let controller = Controller::new(
        Client::new(host, (), ClientConfig::default()).expect("client should start"),
    );

    controller.enable_feedback(Motor::C).expect("feedback on");
    controller.set_position(Motor::C, 1024).expect("set position");
    controller.disable_feedback().expect("feedback off");

    assert_eq!(controller.version().await.expect("version"), 101);
    assert!(endpoint
        .get("Motor C position command 1024")
        .expect("position stub should exist")
        .called());
}

#[tokio::test]
async fn unanswered_read_times_out() {
    let endpoint = demo_endpoint();
    let host = endpoint.host_stream().expect("host stream should clone");
    let config = ClientConfig::default().with_timeout(Duration::from_millis(200));
    let controller =
        Controller::new(Client::new(host, (), config).expect("client should start"));

    let err = controller
        .read_raw(b'z')
        .await
        .expect_err("nothing answers [rdz]");
    assert!(matches!(err, ClientError::Timeout { tag: b'z', .. }));
}

#[tokio::test]
async fn mock_telemetry_reaches_subscriber() {
    let endpoint = demo_endpoint();
    let host = endpoint.host_stream().expect("host stream should clone");
    let (subscriber, mut events) = ChannelSubscriber::new();
    let _client =
        Client::new(host, subscriber, ClientConfig::default()).expect("client should start");

    endpoint
        .send(&idle_telemetry().expect("telemetry should encode"))
        .expect("telemetry should be sent");

    let mut positions = 0;
    let mut pwm = 0;
    for _ in 0..6 {
        let event = tokio::time::timeout(Duration::from_secs(1), events.recv())
            .await
            .expect("telemetry should arrive")
            .expect("channel should stay open");
        match event {
            TelemetryEvent::Position(update) => {
                assert_eq!((update.target, update.feedback), (0, 0));
                positions += 1;
            }
            TelemetryEvent::PwmStatus(update) => {
                assert_eq!((update.pwm, update.status), (0, 0));
                pwm += 1;
            }
        }
    }
    assert_eq!((positions, pwm), (3, 3));
}

#[tokio::test]
async fn closing_the_mock_disconnects_the_client() {
    let endpoint = demo_endpoint();
    let host = endpoint.host_stream().expect("host stream should clone");
    let client = Client::new(host, (), ClientConfig::default()).expect("client should start");

    endpoint.close();

    let err = client
        .wait_for_packet(VERSION_TAG, Duration::from_secs(5))
        .await
        .expect_err("closed device cannot answer");
    assert!(matches!(err, ClientError::Disconnected));
}

use crate::{topic_key, ClientConfig, SubscribeRequest, OFFSET_LATEST};
use dolphin_base::ErrorKind;
use dolphin_vals::{Constant, Vector};
use test_log::test;

#[test]
fn test_request_defaults_and_topic() {
    let req = SubscribeRequest::new("db1", 8902, "trades", "");
    assert_eq!(req.offset, OFFSET_LATEST);
    assert!(req.resub);
    assert!(req.reconnects());
    assert!(!req.clone().with_sub_once(true).reconnects());
    assert!(!req.clone().with_resub(false).reconnects());
    assert_eq!(req.topic(), "db1:8902/trades/");
    assert_eq!(topic_key("db1", 8902, "trades", "a"), "db1:8902/trades/a");
}

#[test]
fn test_request_validation() {
    let ok = SubscribeRequest::new("h", 1, "t", "a");
    assert!(ok.validate().is_ok());
    for bad in [
        SubscribeRequest::new("h", 1, "", "a"),
        ok.clone().with_batching(0, 10),
        ok.clone().with_offset(-2),
    ] {
        assert!(bad.validate().unwrap_err().is(ErrorKind::InvalidArgument));
    }
}

#[test]
fn test_settings_survive_msgpack() {
    let req = SubscribeRequest::new("h", 1, "t", "a")
        .with_offset(17)
        .with_batching(100, 250)
        .with_filter(Constant::Vector(Vector::ints(&[1, 2])));
    let bytes = rmp_serde::to_vec_named(&req).expect("encode");
    let back: SubscribeRequest = rmp_serde::from_slice(&bytes).expect("decode");
    assert_eq!(back.topic(), req.topic());
    assert_eq!(back.offset, 17);
    assert_eq!(back.batch_size, 100);
    assert_eq!(back.throttle_ms, 250);
    assert!(back.filter.is_none());

    let cfg = ClientConfig::default().with_threads(4).with_reconnect_interval(50);
    let bytes = rmp_serde::to_vec_named(&cfg).expect("encode");
    let back: ClientConfig = rmp_serde::from_slice(&bytes).expect("decode");
    assert_eq!(back, cfg);
}

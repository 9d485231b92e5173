use super::{dead_port, serve};
use crate::protocol::Request;
use crate::{ConnectOptions, Connector, DbConnection, Session, TcpConnector};
use dolphin_base::{CancelToken, ErrorKind, Result};
use dolphin_vals::{Constant, Scalar, Vector, VectorOps};
use std::sync::{Arc, Mutex};
use test_log::test;

fn local(port: u16) -> ConnectOptions {
    ConnectOptions::new("127.0.0.1", port).with_timeouts(2_000, 5_000, 5_000)
}

#[test]
fn test_run_script_and_function() -> Result<()> {
    let addr = serve(1, |req| match req {
        Request::Script(s) if s == "1+1" => Ok(Some(Constant::Scalar(Scalar::Int(2)))),
        Request::Script(s) => Err(format!("Syntax Error: [line #1] {}", s)),
        Request::Function { name, args } if name == "size" => {
            let n = args[0].len() as i64;
            Ok(Some(Constant::Scalar(Scalar::Long(n))))
        }
        _ => Ok(None),
    });
    let mut conn = DbConnection::connect(&local(addr.port()))?;
    assert_eq!(conn.session_id(), Some("7"));
    assert_eq!(conn.run("1+1")?.as_scalar()?, &Scalar::Int(2));

    let v = Constant::Vector(Vector::ints(&[1, 2, 3]));
    let got = conn.run_function("size", &[v])?;
    assert_eq!(got.as_scalar()?, &Scalar::Long(3));

    let e = conn.run("oops(").unwrap_err();
    assert!(e.message().contains("Syntax Error"));
    assert!(conn.is_connected());
    Ok(())
}

#[test]
fn test_login_and_upload() -> Result<()> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = seen.clone();
    let addr = serve(1, move |req| {
        let entry = match req {
            Request::Function { name, args } => {
                format!("{}({})", name, args.iter().map(|a| a.get_string()).collect::<Vec<_>>().join(","))
            }
            Request::Variables { names, values } => format!("{}={}", names.join(","), values.len()),
            other => other.kind().to_string(),
        };
        log.lock().expect("log").push(entry);
        Ok(None)
    });
    let opts = local(addr.port()).with_credentials("admin", "123456");
    let mut conn = DbConnection::connect(&opts)?;
    conn.upload(
        &["t".to_string(), "x".to_string()],
        &[Constant::Vector(Vector::doubles(&[1.0])), Constant::Scalar(Scalar::Int(1))],
    )?;
    assert!(conn.run("x").is_ok_and(|c| c.is_null()));
    let seen = seen.lock().expect("log").clone();
    assert_eq!(seen, vec!["login(admin,123456)", "t,x=2", "script"]);
    Ok(())
}

#[test]
fn test_high_availability_falls_through() -> Result<()> {
    let addr = serve(1, |_| Ok(None));
    let opts = local(dead_port()).with_ha_sites(vec![format!("127.0.0.1:{}", addr.port())]);
    let conn = DbConnection::connect(&opts)?;
    assert_eq!(conn.site(), ("127.0.0.1", addr.port()));

    let e = DbConnection::connect(&local(dead_port())).err().expect("no server");
    assert!(e.is(ErrorKind::Connection));
    Ok(())
}

#[test]
fn test_ssl_rejected_and_cancel_checked() -> Result<()> {
    let e = DbConnection::connect(&local(1).with_ssl(true)).err().expect("ssl refused");
    assert!(e.is(ErrorKind::InvalidArgument));

    let addr = serve(1, |_| Ok(Some(Constant::Scalar(Scalar::Int(1)))));
    let mut session = TcpConnector::new(local(addr.port())).connect()?;
    let token = CancelToken::new();
    assert!(session.run_cancellable("1", &token).is_ok());
    token.cancel();
    let e = session.run_cancellable("1", &token).unwrap_err();
    assert!(e.is(ErrorKind::Cancelled));
    session.close();
    assert!(!session.is_connected());
    assert!(session.run("1").unwrap_err().is(ErrorKind::Connection));
    Ok(())
}

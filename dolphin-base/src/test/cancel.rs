use crate::{Context, ErrorKind};
use test_log::test;

#[test]
fn test_jobs_cancel_individually_and_all() {
    let ctx = Context::new();
    let (a, ta) = ctx.begin_job();
    let (_b, tb) = ctx.begin_job();
    assert_eq!(ctx.running_jobs(), 2);
    assert!(ctx.cancel_job(a));
    assert!(ta.is_cancelled());
    assert!(!tb.is_cancelled());
    assert_eq!(ta.check().unwrap_err().kind(), ErrorKind::Cancelled);
    ctx.end_job(a);
    assert!(!ctx.cancel_job(a));
    ctx.cancel_all();
    assert!(tb.is_cancelled());
}

#[test]
fn test_tokens_after_shutdown_are_cancelled() {
    let ctx = Context::new();
    ctx.shutdown();
    let (_id, token) = ctx.begin_job();
    assert!(token.is_cancelled());
    assert!(ctx.is_shut_down());
}

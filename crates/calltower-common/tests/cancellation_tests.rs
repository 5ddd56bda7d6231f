use super::*;

#[test]
fn test_fresh_token_is_not_cancelled() {
    let token = CancellationToken::new();
    assert!(!token.is_cancelled());
    assert_eq!(token.check(), Ok(()));
}

#[test]
fn test_cancel_is_visible_through_clones() {
    let token = CancellationToken::new();
    let observer = token.clone();
    token.cancel();
    assert!(observer.is_cancelled());
    assert_eq!(observer.check(), Err(Cancelled));
}

#[test]
fn test_cancel_from_another_thread() {
    let token = CancellationToken::new();
    let remote = token.clone();
    std::thread::spawn(move || remote.cancel())
        .join()
        .expect("cancelling thread panicked");
    assert!(token.is_cancelled());
}

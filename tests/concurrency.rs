//! Concurrent redemptions of a capped discount code.

use std::sync::Barrier;

mod common;
use common::*;

use legacy_radio::db::queries;
use legacy_radio::error::AppError;
use legacy_radio::models::Role;
use legacy_radio::payments::PaymentMethod;
use legacy_radio::purchase::{CommitPurchase, commit_purchase};
use legacy_radio::util::now;

#[test]
fn test_concurrent_redemptions_never_exceed_max_uses() {
    const MAX_USES: i64 = 3;
    const ATTEMPTS: usize = MAX_USES as usize + 5;

    let ctx = create_test_context();
    let (server, code, users) = {
        let conn = ctx.conn();
        let admin = create_test_user(&conn, "admin@example.com", Role::Admin);
        let server = create_test_server(&conn, "Alpha");
        let code = create_test_code(&conn, &admin, &server, "RUSH", Some(MAX_USES));
        let users: Vec<_> = (0..ATTEMPTS)
            .map(|i| create_test_user(&conn, &format!("racer{}@example.com", i), Role::User))
            .collect();
        (server, code, users)
    };

    let pool = ctx.pool();
    let barrier = Barrier::new(ATTEMPTS);
    let at = now();

    let results: Vec<_> = std::thread::scope(|s| {
        let handles: Vec<_> = users
            .iter()
            .enumerate()
            .map(|(i, user)| {
                let pool = pool.clone();
                let barrier = &barrier;
                let commit = CommitPurchase {
                    user_id: user.id.clone(),
                    server_id: server.id.clone(),
                    months: 1,
                    discount_code_id: Some(code.id.clone()),
                    payment_method: PaymentMethod::Card,
                    payment_reference: format!("pi_race_{}", i),
                    amount_cents: 1999,
                    currency: "usd".into(),
                };
                s.spawn(move || {
                    let mut conn = pool.get().unwrap();
                    barrier.wait();
                    commit_purchase(&mut conn, &commit, at)
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let succeeded = results.iter().filter(|r| r.is_ok()).count();
    let exhausted = results
        .iter()
        .filter(|r| matches!(r, Err(AppError::UsageExhausted)))
        .count();
    assert_eq!(succeeded, MAX_USES as usize);
    assert_eq!(exhausted, ATTEMPTS - MAX_USES as usize);

    let conn = ctx.conn();
    let stored = queries::get_discount_code_by_id(&conn, &code.id).unwrap().unwrap();
    assert_eq!(stored.current_uses, MAX_USES);
    assert_eq!(queries::count_discount_usage(&conn, &code.id).unwrap(), MAX_USES);
    assert_eq!(subscription_count(&conn), MAX_USES);
    assert_eq!(receipt_count(&conn), MAX_USES);
}

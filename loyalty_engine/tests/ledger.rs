use lps_common::Points;
use loyalty_engine::{
    db_types::{OrderStatusType, Verdict, VerdictStatus},
    LedgerApi, LedgerApiError, LedgerDatabase, LedgerError, OrderUploadStatus, SqliteDatabase,
};
use sqlx::{migrate::MigrateDatabase, Sqlite};
use support::{prepare_test_env, random_db_path};

mod support;

async fn setup() -> LedgerApi<SqliteDatabase> {
    let url = random_db_path();
    prepare_test_env(&url).await;
    let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database");
    LedgerApi::new(db)
}

async fn tear_down(api: LedgerApi<SqliteDatabase>) {
    let url = api.db().url().to_string();
    api.db().close().await;
    Sqlite::drop_database(&url).await.unwrap();
}

async fn register(api: &LedgerApi<SqliteDatabase>, login: &str) -> i64 {
    api.register_user(login, "not-a-real-hash").await.expect("Error registering user")
}

async fn upload(api: &LedgerApi<SqliteDatabase>, user_id: i64, number: &str) -> loyalty_engine::db_types::Order {
    match api.upload_order(user_id, number).await.expect("Error uploading order") {
        OrderUploadStatus::Accepted(order) => order,
        other => panic!("Expected a fresh order, got {other:?}"),
    }
}

#[tokio::test]
async fn processed_verdict_credits_exactly_once() {
    let api = setup().await;
    let alice = register(&api, "alice").await;
    let order = upload(&api, alice, "79927398713").await;
    assert_eq!(order.status, OrderStatusType::New);

    let amount = Points::try_from_f64(500.0).unwrap();
    let verdict = Verdict::for_order(&order, VerdictStatus::Processed, Some(amount));
    let settled = api.db().apply_verdict(&verdict).await.expect("Error applying verdict");
    assert_eq!(settled.status, OrderStatusType::Processed);
    assert_eq!(settled.accrual, Some(amount));

    let balance = api.balance_for_user(alice).await.unwrap();
    assert_eq!(balance.current, amount);

    // A replayed verdict must not credit again, and must leave the final status unchanged.
    let replayed = api.db().apply_verdict(&verdict).await.expect("Error replaying verdict");
    assert_eq!(replayed.status, OrderStatusType::Processed);
    assert_eq!(replayed.accrual, Some(amount));
    let balance = api.balance_for_user(alice).await.unwrap();
    assert_eq!(balance.current, amount);

    tear_down(api).await;
}

#[tokio::test]
async fn invalid_verdict_is_terminal_without_credit() {
    let api = setup().await;
    let alice = register(&api, "alice").await;
    let order = upload(&api, alice, "49927398716").await;

    let verdict = Verdict::for_order(&order, VerdictStatus::Invalid, None);
    let settled = api.db().apply_verdict(&verdict).await.unwrap();
    assert_eq!(settled.status, OrderStatusType::Invalid);
    assert_eq!(settled.accrual, None);
    assert_eq!(api.balance_for_user(alice).await.unwrap().current, Points::default());

    // A late PROCESSED verdict for a terminal order is ignored outright.
    let late = Verdict::for_order(&order, VerdictStatus::Processed, Some(Points::from_points(100)));
    let after = api.db().apply_verdict(&late).await.unwrap();
    assert_eq!(after.status, OrderStatusType::Invalid);
    assert_eq!(api.balance_for_user(alice).await.unwrap().current, Points::default());

    tear_down(api).await;
}

#[tokio::test]
async fn terminal_orders_leave_the_backlog() {
    let api = setup().await;
    let alice = register(&api, "alice").await;
    let first = upload(&api, alice, "79927398713").await;
    let second = upload(&api, alice, "49927398716").await;

    let backlog = api.db().list_unaccrued().await.unwrap();
    assert_eq!(backlog.len(), 2);

    // An interim verdict keeps the order discoverable.
    let verdict = Verdict::for_order(&first, VerdictStatus::Registered, None);
    let settled = api.db().apply_verdict(&verdict).await.unwrap();
    assert_eq!(settled.status, OrderStatusType::Processing);
    let backlog = api.db().list_unaccrued().await.unwrap();
    assert_eq!(backlog.len(), 2);

    // Terminal verdicts remove their orders for good.
    let verdict = Verdict::for_order(&first, VerdictStatus::Processed, Some(Points::from_points(10)));
    api.db().apply_verdict(&verdict).await.unwrap();
    let verdict = Verdict::for_order(&second, VerdictStatus::Invalid, None);
    api.db().apply_verdict(&verdict).await.unwrap();
    let backlog = api.db().list_unaccrued().await.unwrap();
    assert!(backlog.is_empty());

    tear_down(api).await;
}

#[tokio::test]
async fn verdict_for_vanished_order_is_an_error() {
    let api = setup().await;
    let alice = register(&api, "alice").await;
    let mut order = upload(&api, alice, "79927398713").await;
    order.id += 1000;

    let verdict = Verdict::for_order(&order, VerdictStatus::Processed, Some(Points::from_points(5)));
    let err = api.db().apply_verdict(&verdict).await.unwrap_err();
    assert!(matches!(err, LedgerError::OrderNotFound(_)));

    tear_down(api).await;
}

#[tokio::test]
async fn withdrawal_debits_and_records_atomically() {
    let api = setup().await;
    let alice = register(&api, "alice").await;
    let order = upload(&api, alice, "79927398713").await;
    let verdict = Verdict::for_order(&order, VerdictStatus::Processed, Some(Points::from_points(500)));
    api.db().apply_verdict(&verdict).await.unwrap();

    api.withdraw(alice, "12345678903", Points::from_points(200)).await.expect("Error withdrawing");

    let balance = api.balance_for_user(alice).await.unwrap();
    assert_eq!(balance.current, Points::from_points(300));
    assert_eq!(balance.withdrawn, Points::from_points(200));

    let withdrawals = api.withdrawals_for_user(alice).await.unwrap();
    assert_eq!(withdrawals.len(), 1);
    assert_eq!(withdrawals[0].order_number.as_str(), "12345678903");
    assert_eq!(withdrawals[0].amount, Points::from_points(200));

    tear_down(api).await;
}

#[tokio::test]
async fn overdraft_is_rejected_without_partial_effect() {
    let api = setup().await;
    let alice = register(&api, "alice").await;
    let order = upload(&api, alice, "79927398713").await;
    let verdict = Verdict::for_order(&order, VerdictStatus::Processed, Some(Points::from_points(100)));
    api.db().apply_verdict(&verdict).await.unwrap();

    let err = api.withdraw(alice, "12345678903", Points::from_points(150)).await.unwrap_err();
    assert!(matches!(err, LedgerApiError::LedgerError(LedgerError::InsufficientBalance(_))));

    // Neither side of the transaction stuck.
    let balance = api.balance_for_user(alice).await.unwrap();
    assert_eq!(balance.current, Points::from_points(100));
    assert_eq!(balance.withdrawn, Points::default());
    assert!(api.withdrawals_for_user(alice).await.unwrap().is_empty());

    tear_down(api).await;
}

#[tokio::test]
async fn upload_validation_and_idempotency() {
    let api = setup().await;
    let alice = register(&api, "alice").await;
    let bob = register(&api, "bob").await;

    let err = api.upload_order(alice, "79927398710").await.unwrap_err();
    assert!(matches!(err, LedgerApiError::InvalidOrderNumber(_)));

    upload(&api, alice, "79927398713").await;
    let repeat = api.upload_order(alice, "79927398713").await.unwrap();
    assert!(matches!(repeat, OrderUploadStatus::AlreadyUploaded(_)));
    let stolen = api.upload_order(bob, "79927398713").await.unwrap();
    assert!(matches!(stolen, OrderUploadStatus::AlreadyUploadedByAnother));

    // Ownership never transfers.
    assert_eq!(api.orders_for_user(alice).await.unwrap().len(), 1);
    assert!(api.orders_for_user(bob).await.unwrap().is_empty());

    tear_down(api).await;
}

#[tokio::test]
async fn duplicate_logins_are_rejected() {
    let api = setup().await;
    register(&api, "alice").await;
    let err = api.register_user("alice", "another-hash").await.unwrap_err();
    assert!(matches!(err, LedgerApiError::LedgerError(LedgerError::UserAlreadyExists(_))));
    tear_down(api).await;
}

// Schema constraint tests against a real PostgreSQL database

#[cfg(feature = "db_tests")]
mod db_schema_tests {
    use std::env;

    use chrono::{Duration, Utc};
    use common::db::run_migrations;
    use common::error::Error;
    use common::model::{ExchangeType, OrderDraft, ReceiptRecord, Side};
    use order_service::{OrderRepository, PostgresOrderRepository};
    use sqlx::{postgres::PgPoolOptions, PgPool, Row};
    use tokio::runtime::Runtime;

    fn run_db_test<F>(test: F)
    where
        F: FnOnce(PgPool) -> futures::future::BoxFuture<'static, ()> + Send + 'static,
    {
        dotenv::dotenv().ok();
        let db_url = match env::var("TEST_DATABASE_URL") {
            Ok(url) => url,
            Err(_) => {
                println!("Skipping database test: TEST_DATABASE_URL not set");
                return;
            }
        };

        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let pool = match PgPoolOptions::new().max_connections(5).connect(&db_url).await {
                Ok(pool) => pool,
                Err(err) => {
                    println!("Skipping database test: could not connect to database: {}", err);
                    return;
                }
            };
            run_migrations(&pool).await.unwrap();
            test(pool).await;
        });
    }

    async fn insert_user(pool: &PgPool, login: &str) -> i64 {
        sqlx::query("DELETE FROM users WHERE login = $1")
            .bind(login)
            .execute(pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO users (login, password_hash) VALUES ($1, 'x') RETURNING id")
            .bind(login)
            .fetch_one(pool)
            .await
            .unwrap()
            .get("id")
    }

    #[test]
    #[ignore = "Requires test database, run with RUST_TEST_THREADS=1 cargo test --features db_tests -- --ignored"]
    fn test_order_triple_is_unique() {
        run_db_test(|pool| {
            Box::pin(async move {
                let user_id = insert_user(&pool, "db-test-triple").await;
                let insert = "INSERT INTO trade_orders (user_id, external_id, exchange_type) VALUES ($1, $2, $3)";

                sqlx::query(insert).bind(user_id).bind("X-1").bind("Bybit").execute(&pool).await.unwrap();
                let duplicate = sqlx::query(insert).bind(user_id).bind("X-1").bind("Bybit").execute(&pool).await;
                assert!(duplicate.is_err());

                sqlx::query(insert).bind(user_id).bind("X-1").bind("HTX").execute(&pool).await.unwrap();

                let count: i64 = sqlx::query("SELECT COUNT(*) AS n FROM trade_orders WHERE user_id = $1")
                    .bind(user_id)
                    .fetch_one(&pool)
                    .await
                    .unwrap()
                    .get("n");
                assert_eq!(count, 2);
            })
        });
    }

    #[test]
    #[ignore = "Requires test database, run with RUST_TEST_THREADS=1 cargo test --features db_tests -- --ignored"]
    fn test_staging_ignores_duplicates() {
        run_db_test(|pool| {
            Box::pin(async move {
                let user_id = insert_user(&pool, "db-test-staging").await;
                let insert = "INSERT INTO unprocessed_orders (user_id, order_id, operation_type, created_at)
                              VALUES ($1, $2, 'BUY', NOW())
                              ON CONFLICT (user_id, order_id, exchange_type) DO NOTHING";

                let first = sqlx::query(insert).bind(user_id).bind("S-1").execute(&pool).await.unwrap();
                let second = sqlx::query(insert).bind(user_id).bind("S-1").execute(&pool).await.unwrap();
                assert_eq!(first.rows_affected(), 1);
                assert_eq!(second.rows_affected(), 0);
            })
        });
    }

    #[test]
    #[ignore = "Requires test database, run with RUST_TEST_THREADS=1 cargo test --features db_tests -- --ignored"]
    fn test_receipt_goes_with_its_order() {
        run_db_test(|pool| {
            Box::pin(async move {
                let user_id = insert_user(&pool, "db-test-cascade").await;
                let order_id: i64 = sqlx::query(
                    "INSERT INTO trade_orders (user_id, external_id) VALUES ($1, 'R-1') RETURNING id",
                )
                .bind(user_id)
                .fetch_one(&pool)
                .await
                .unwrap()
                .get("id");

                sqlx::query("INSERT INTO receipts (order_id, status) VALUES ($1, 'SENT')")
                    .bind(order_id)
                    .execute(&pool)
                    .await
                    .unwrap();
                sqlx::query("DELETE FROM trade_orders WHERE id = $1")
                    .bind(order_id)
                    .execute(&pool)
                    .await
                    .unwrap();

                let left: i64 = sqlx::query("SELECT COUNT(*) AS n FROM receipts WHERE order_id = $1")
                    .bind(order_id)
                    .fetch_one(&pool)
                    .await
                    .unwrap()
                    .get("n");
                assert_eq!(left, 0);
            })
        });
    }

    #[test]
    #[ignore = "Requires test database, run with RUST_TEST_THREADS=1 cargo test --features db_tests -- --ignored"]
    fn test_receipt_claim_and_order_edit() {
        run_db_test(|pool| {
            Box::pin(async move {
                let user_id = insert_user(&pool, "db-test-claim").await;
                let repo = PostgresOrderRepository::new(pool.clone());
                let (order, _) = repo
                    .upsert_order(user_id, OrderDraft::new("C-1", ExchangeType::Bybit, Side::Sell))
                    .await
                    .unwrap();
                repo.upsert_order(user_id, OrderDraft::new("C-2", ExchangeType::Bybit, Side::Sell))
                    .await
                    .unwrap();

                let stale_before = Utc::now() - Duration::seconds(120);
                assert!(repo.claim_receipt(&ReceiptRecord::pending(order.id), stale_before).await.unwrap());
                assert!(!repo.claim_receipt(&ReceiptRecord::pending(order.id), stale_before).await.unwrap());

                let mut stale = ReceiptRecord::pending(order.id);
                stale.updated_at = Utc::now() - Duration::seconds(600);
                repo.save_receipt(&stale).await.unwrap();
                assert!(repo.claim_receipt(&ReceiptRecord::pending(order.id), stale_before).await.unwrap());

                let mut edited = order.clone();
                edited.external_id = "C-2".to_string();
                assert!(matches!(repo.update_order(&edited).await, Err(Error::ValidationError(_))));
                edited.external_id = "C-3".to_string();
                let stored = repo.update_order(&edited).await.unwrap();
                assert_eq!(stored.user_id, user_id);
                assert_eq!(repo.find_order_any("C-3").await.unwrap().map(|o| o.id), Some(order.id));

                let found = repo.search_users("DB-TEST-CL", 10).await.unwrap();
                assert!(found.iter().any(|u| u.id == user_id));
                assert!(repo.search_users("db_test", 10).await.unwrap().is_empty());
            })
        });
    }
}

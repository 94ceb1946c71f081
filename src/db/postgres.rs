use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    db::store::{apply_sample, RatingStore},
    error::AppResult,
    models::{CorpusSample, Product, Rating, RatingRecord},
};

/// Creates a PostgreSQL connection pool and applies pending migrations
pub async fn create_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

/// [`RatingStore`] backed by PostgreSQL
///
/// Every method checks a connection out of the pool for the length of the call;
/// it goes back to the pool when dropped, on success and on error alike.
#[derive(Clone)]
pub struct PgRatingStore {
    pool: PgPool,
}

impl PgRatingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl RatingStore for PgRatingStore {
    async fn fetch_ratings_for_corpus(
        &self,
        sample: CorpusSample,
    ) -> AppResult<Vec<RatingRecord>> {
        let mut conn = self.pool.acquire().await?;

        let records = match sample {
            CorpusSample::Head(n) => {
                sqlx::query_as::<_, RatingRecord>(
                    r#"
                    SELECT user_id, item_id, rating, rated_at
                    FROM ratings
                    ORDER BY id
                    LIMIT $1
                    "#,
                )
                .bind(n as i64)
                .fetch_all(&mut *conn)
                .await?
            }
            CorpusSample::Recent(n) => {
                sqlx::query_as::<_, RatingRecord>(
                    r#"
                    SELECT user_id, item_id, rating, rated_at
                    FROM ratings
                    ORDER BY rated_at DESC NULLS LAST, id DESC
                    LIMIT $1
                    "#,
                )
                .bind(n as i64)
                .fetch_all(&mut *conn)
                .await?
            }
            CorpusSample::Full | CorpusSample::Random { .. } => {
                let all = sqlx::query_as::<_, RatingRecord>(
                    r#"
                    SELECT user_id, item_id, rating, rated_at
                    FROM ratings
                    ORDER BY id
                    "#,
                )
                .fetch_all(&mut *conn)
                .await?;
                apply_sample(all, sample)
            }
        };

        tracing::debug!(count = records.len(), ?sample, "Fetched ratings corpus");

        Ok(records)
    }

    async fn fetch_user_ratings(&self, user_id: &str) -> AppResult<Vec<RatingRecord>> {
        let mut conn = self.pool.acquire().await?;
        let records = sqlx::query_as::<_, RatingRecord>(
            r#"
            SELECT user_id, item_id, rating, rated_at
            FROM ratings
            WHERE user_id = $1
            ORDER BY rated_at ASC NULLS LAST, id ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(records)
    }

    async fn fetch_item_ratings(&self, item_id: &str) -> AppResult<Vec<RatingRecord>> {
        let mut conn = self.pool.acquire().await?;
        let records = sqlx::query_as::<_, RatingRecord>(
            r#"
            SELECT user_id, item_id, rating, rated_at
            FROM ratings
            WHERE item_id = $1
            ORDER BY id
            "#,
        )
        .bind(item_id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(records)
    }

    async fn fetch_product(&self, item_id: &str) -> AppResult<Option<Product>> {
        let mut conn = self.pool.acquire().await?;
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT item_id, title, category, description
            FROM products
            WHERE item_id = $1
            "#,
        )
        .bind(item_id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(product)
    }

    async fn fetch_products(&self, item_ids: &[String]) -> AppResult<Vec<Product>> {
        if item_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut conn = self.pool.acquire().await?;
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT item_id, title, category, description
            FROM products
            WHERE item_id = ANY($1)
            "#,
        )
        .bind(item_ids)
        .fetch_all(&mut *conn)
        .await?;

        Ok(products)
    }

    async fn fetch_catalog(&self) -> AppResult<Vec<Product>> {
        let mut conn = self.pool.acquire().await?;
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT item_id, title, category, description
            FROM products
            ORDER BY item_id
            "#,
        )
        .fetch_all(&mut *conn)
        .await?;

        Ok(products)
    }

    async fn user_exists(&self, user_id: &str) -> AppResult<bool> {
        let mut conn = self.pool.acquire().await?;
        let exists = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (SELECT 1 FROM users WHERE user_id = $1)
                OR EXISTS (SELECT 1 FROM ratings WHERE user_id = $1)
            "#,
        )
        .bind(user_id)
        .fetch_one(&mut *conn)
        .await?;

        Ok(exists)
    }

    async fn create_user(&self, user_id: &str) -> AppResult<bool> {
        let mut conn = self.pool.acquire().await?;
        let result = sqlx::query(
            r#"
            INSERT INTO users (user_id)
            VALUES ($1)
            ON CONFLICT (user_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn upsert_rating(&self, rating: &Rating) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO users (user_id)
            VALUES ($1)
            ON CONFLICT (user_id) DO NOTHING
            "#,
        )
        .bind(&rating.user_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO ratings (user_id, item_id, rating, rated_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id, item_id)
            DO UPDATE SET rating = EXCLUDED.rating, rated_at = EXCLUDED.rated_at
            "#,
        )
        .bind(&rating.user_id)
        .bind(&rating.item_id)
        .bind(rating.value as f64)
        .bind(rating.timestamp.map(|t| t.timestamp()))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(())
    }

    fn name(&self) -> &'static str {
        "postgres"
    }
}

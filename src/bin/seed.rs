use anyhow::Context;
use prosthetics_store_api::{
    db::{create_pool, run_migrations},
    services::auth_service::hash_password,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;

    let pool = create_pool(&database_url, 2).await?;
    // Ensure migrations are applied.
    run_migrations(&pool).await?;

    let admin_id = ensure_user(&pool, "Store Admin", "admin@example.com", "admin123", "admin").await?;
    let user_id = ensure_user(&pool, "Demo Customer", "user@example.com", "user123", "user").await?;
    seed_products(&pool).await?;

    println!("Seed completed. Admin ID: {admin_id}, User ID: {user_id}");
    Ok(())
}

async fn ensure_user(
    pool: &sqlx::PgPool,
    name: &str,
    email: &str,
    password: &str,
    role: &str,
) -> anyhow::Result<i64> {
    let password_hash =
        hash_password(password).map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let (user_id,): (i64,) = sqlx::query_as(
        r#"
        INSERT INTO users (name, email, password_hash, role)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (email) DO UPDATE SET role = EXCLUDED.role
        RETURNING id
        "#,
    )
    .bind(name)
    .bind(email)
    .bind(password_hash)
    .bind(role)
    .fetch_one(pool)
    .await?;

    println!("Ensured user {email} (role={role})");
    Ok(user_id)
}

async fn seed_products(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    // (name, description, price, old_price, category, type, image)
    let products: [(&str, &str, i64, Option<i64>, &str, Option<&str>, &str); 5] = [
        (
            "Carbon Fiber Running Blade",
            "Energy-returning blade for below-knee amputees",
            450000,
            Some(520000),
            "lower-limb",
            Some("sport"),
            "/images/products/running-blade.jpg",
        ),
        (
            "Myoelectric Hand",
            "Multi-articulating hand driven by muscle signals",
            1250000,
            None,
            "upper-limb",
            Some("myoelectric"),
            "/images/products/myoelectric-hand.jpg",
        ),
        (
            "Silicone Liner",
            "Cushioning liner for daily socket comfort",
            18000,
            Some(22000),
            "accessories",
            None,
            "/images/products/silicone-liner.jpg",
        ),
        (
            "Microprocessor Knee",
            "Adaptive knee joint with stumble recovery",
            2800000,
            None,
            "lower-limb",
            Some("microprocessor"),
            "/images/products/mp-knee.jpg",
        ),
        (
            "Prosthetic Sock Pack",
            "Five-ply socks for volume management",
            4500,
            None,
            "accessories",
            None,
            "/images/products/sock-pack.jpg",
        ),
    ];

    for (name, description, price, old_price, category, product_type, image) in products {
        sqlx::query(
            r#"
            INSERT INTO products (name, description, price, old_price, category, product_type, image)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (name) DO NOTHING
            "#,
        )
        .bind(name)
        .bind(description)
        .bind(price)
        .bind(old_price)
        .bind(category)
        .bind(product_type)
        .bind(image)
        .execute(pool)
        .await?;
    }

    println!("Seeded products");
    Ok(())
}

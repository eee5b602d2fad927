use rusqlite::Connection;

/// Initialize the database schema
pub fn init_db(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        -- Users (buyers and course creators)
        -- api_key_hash: hashed bearer token used to identify the caller
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            api_key_hash TEXT UNIQUE,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_users_api_key ON users(api_key_hash);

        -- Courses (price stored as decimal TEXT)
        CREATE TABLE IF NOT EXISTS courses (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            price TEXT NOT NULL,
            creator_id TEXT NOT NULL REFERENCES users(id),
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_courses_creator ON courses(creator_id);

        -- Lectures, ordered within their course by position
        CREATE TABLE IF NOT EXISTS lectures (
            id TEXT PRIMARY KEY,
            course_id TEXT NOT NULL REFERENCES courses(id) ON DELETE CASCADE,
            title TEXT NOT NULL,
            position INTEGER NOT NULL,
            is_preview_free INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_lectures_course ON lectures(course_id, position);

        -- Enrollment relation. The composite key gives set semantics for both
        -- a user's enrolled courses and a course's enrolled students.
        CREATE TABLE IF NOT EXISTS enrollments (
            user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            course_id TEXT NOT NULL REFERENCES courses(id) ON DELETE CASCADE,
            enrolled_at INTEGER NOT NULL,
            PRIMARY KEY (user_id, course_id)
        );
        CREATE INDEX IF NOT EXISTS idx_enrollments_course ON enrollments(course_id);

        -- Purchases (one row per checkout attempt)
        -- payment_id: merchant order id, join key for gateway webhooks (not unique)
        -- gateway_payment_id: gateway's payment id, set when the outcome arrives
        CREATE TABLE IF NOT EXISTS purchases (
            id TEXT PRIMARY KEY,
            course_id TEXT NOT NULL REFERENCES courses(id),
            user_id TEXT NOT NULL REFERENCES users(id),
            creator_id TEXT NOT NULL REFERENCES users(id),
            amount TEXT NOT NULL,
            status TEXT NOT NULL CHECK (status IN ('pending', 'completed', 'failed')),
            payment_id TEXT NOT NULL,
            gateway_payment_id TEXT,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_purchases_payment_id ON purchases(payment_id);
        CREATE INDEX IF NOT EXISTS idx_purchases_user_course ON purchases(user_id, course_id);
        CREATE INDEX IF NOT EXISTS idx_purchases_creator_status ON purchases(creator_id, status);
        "#,
    )
}

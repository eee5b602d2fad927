use std::collections::HashMap;

use chrono::Utc;
use rusqlite::{Connection, params};
use rust_decimal::Decimal;

use crate::config::PurchasedPolicy;
use crate::crypto::hash_secret;
use crate::error::Result;
use crate::id::EntityType;
use crate::models::*;

use super::from_row::{
    COURSE_COLS, LECTURE_COLS, PURCHASE_COLS, USER_COLS, query_all, query_one,
};

fn now() -> i64 {
    Utc::now().timestamp()
}

// ============ Users ============

/// Create a user. When `api_key` is given, its hash is stored so the user can
/// authenticate with it as a bearer token.
pub fn create_user(conn: &Connection, input: &CreateUser, api_key: Option<&str>) -> Result<User> {
    input.validate()?;

    let id = EntityType::User.gen_id();
    let now = now();
    let key_hash = api_key.map(hash_secret);

    conn.execute(
        "INSERT INTO users (id, name, email, api_key_hash, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
        params![&id, input.name.trim(), input.email.trim(), &key_hash, now],
    )?;

    Ok(User {
        id,
        name: input.name.trim().to_string(),
        email: input.email.trim().to_string(),
        enrolled_courses: Vec::new(),
        created_at: now,
        updated_at: now,
    })
}

pub fn get_user_by_id(conn: &Connection, id: &str) -> Result<Option<User>> {
    let user: Option<User> = query_one(
        conn,
        &format!("SELECT {} FROM users WHERE id = ?1", USER_COLS),
        &[&id],
    )?;

    match user {
        Some(mut user) => {
            user.enrolled_courses = list_enrolled_course_ids(conn, &user.id)?;
            Ok(Some(user))
        }
        None => Ok(None),
    }
}

/// Look up the user owning a bearer token.
pub fn get_user_by_api_key(conn: &Connection, api_key: &str) -> Result<Option<User>> {
    let hash = hash_secret(api_key);
    query_one(
        conn,
        &format!("SELECT {} FROM users WHERE api_key_hash = ?1", USER_COLS),
        &[&hash],
    )
}

pub fn count_users(conn: &Connection) -> Result<i64> {
    conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
        .map_err(Into::into)
}

// ============ Courses ============

pub fn create_course(conn: &Connection, input: &CreateCourse) -> Result<Course> {
    input.validate()?;

    let id = EntityType::Course.gen_id();
    let now = now();

    conn.execute(
        "INSERT INTO courses (id, title, price, creator_id, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
        params![&id, input.title.trim(), input.price.to_string(), &input.creator_id, now],
    )?;

    Ok(Course {
        id,
        title: input.title.trim().to_string(),
        price: input.price,
        creator_id: input.creator_id.clone(),
        lectures: Vec::new(),
        enrolled_students: Vec::new(),
        created_at: now,
        updated_at: now,
    })
}

fn get_course_row(conn: &Connection, id: &str) -> Result<Option<Course>> {
    query_one(
        conn,
        &format!("SELECT {} FROM courses WHERE id = ?1", COURSE_COLS),
        &[&id],
    )
}

/// Get a course with its lecture IDs (in order) and enrolled students.
pub fn get_course_by_id(conn: &Connection, id: &str) -> Result<Option<Course>> {
    let Some(mut course) = get_course_row(conn, id)? else {
        return Ok(None);
    };

    course.lectures = list_lectures_for_course(conn, &course.id)?
        .into_iter()
        .map(|l| l.id)
        .collect();
    course.enrolled_students = list_enrolled_student_ids(conn, &course.id)?;
    Ok(Some(course))
}

/// Get a course with its creator and lectures expanded.
pub fn get_course_detail(conn: &Connection, id: &str) -> Result<Option<CourseDetail>> {
    let Some(course) = get_course_row(conn, id)? else {
        return Ok(None);
    };

    let creator = query_one::<User>(
        conn,
        &format!("SELECT {} FROM users WHERE id = ?1", USER_COLS),
        &[&course.creator_id],
    )?
    .ok_or_else(|| {
        crate::error::AppError::Internal(format!(
            "Creator {} of course {} does not exist",
            course.creator_id, course.id
        ))
    })?;

    Ok(Some(CourseDetail {
        lectures: list_lectures_for_course(conn, &course.id)?,
        enrolled_students: list_enrolled_student_ids(conn, &course.id)?,
        id: course.id,
        title: course.title,
        price: course.price,
        creator: UserSummary::from(&creator),
        created_at: course.created_at,
        updated_at: course.updated_at,
    }))
}

// ============ Lectures ============

/// Append a lecture to the end of a course.
pub fn create_lecture(
    conn: &Connection,
    course_id: &str,
    input: &CreateLecture,
) -> Result<Lecture> {
    let id = EntityType::Lecture.gen_id();
    let now = now();

    let position: i64 = conn.query_row(
        "SELECT COUNT(*) FROM lectures WHERE course_id = ?1",
        params![course_id],
        |row| row.get(0),
    )?;

    conn.execute(
        "INSERT INTO lectures (id, course_id, title, position, is_preview_free, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![&id, course_id, input.title.trim(), position, input.is_preview_free as i32, now],
    )?;

    Ok(Lecture {
        id,
        course_id: course_id.to_string(),
        title: input.title.trim().to_string(),
        position,
        is_preview_free: input.is_preview_free,
        created_at: now,
    })
}

pub fn list_lectures_for_course(conn: &Connection, course_id: &str) -> Result<Vec<Lecture>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM lectures WHERE course_id = ?1 ORDER BY position",
            LECTURE_COLS
        ),
        &[&course_id],
    )
}

/// Mark every lecture of a course as free preview. Returns the number of lectures updated.
pub fn mark_course_lectures_preview_free(conn: &Connection, course_id: &str) -> Result<usize> {
    let updated = conn.execute(
        "UPDATE lectures SET is_preview_free = 1 WHERE course_id = ?1",
        params![course_id],
    )?;
    Ok(updated)
}

// ============ Enrollments ============

/// Enroll a user in a course. Idempotent: returns false if already enrolled.
pub fn enroll_user(conn: &Connection, user_id: &str, course_id: &str) -> Result<bool> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO enrollments (user_id, course_id, enrolled_at) VALUES (?1, ?2, ?3)",
        params![user_id, course_id, now()],
    )?;
    Ok(inserted > 0)
}

pub fn list_enrolled_course_ids(conn: &Connection, user_id: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT course_id FROM enrollments WHERE user_id = ?1 ORDER BY enrolled_at, course_id",
    )?;
    let ids = stmt
        .query_map(params![user_id], |row| row.get(0))?
        .collect::<std::result::Result<Vec<String>, _>>()?;
    Ok(ids)
}

pub fn list_enrolled_student_ids(conn: &Connection, course_id: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT user_id FROM enrollments WHERE course_id = ?1 ORDER BY enrolled_at, user_id",
    )?;
    let ids = stmt
        .query_map(params![course_id], |row| row.get(0))?
        .collect::<std::result::Result<Vec<String>, _>>()?;
    Ok(ids)
}

// ============ Purchases ============

/// Persist a new purchase in `pending` status.
pub fn create_purchase(conn: &Connection, input: &CreatePurchase) -> Result<Purchase> {
    let id = EntityType::Purchase.gen_id();
    let now = now();

    conn.execute(
        "INSERT INTO purchases (id, course_id, user_id, creator_id, amount, status, payment_id, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
        params![
            &id,
            &input.course_id,
            &input.user_id,
            &input.creator_id,
            input.amount.to_string(),
            PurchaseStatus::Pending.as_str(),
            &input.payment_id,
            now
        ],
    )?;

    Ok(Purchase {
        id,
        course_id: input.course_id.clone(),
        user_id: input.user_id.clone(),
        creator_id: input.creator_id.clone(),
        amount: input.amount,
        status: PurchaseStatus::Pending,
        payment_id: input.payment_id.clone(),
        gateway_payment_id: None,
        created_at: now,
        updated_at: now,
    })
}

pub fn get_purchase_by_id(conn: &Connection, id: &str) -> Result<Option<Purchase>> {
    query_one(
        conn,
        &format!("SELECT {} FROM purchases WHERE id = ?1", PURCHASE_COLS),
        &[&id],
    )
}

/// Find the purchase for a merchant order ID. Order IDs are not unique, so the
/// oldest match wins.
pub fn get_purchase_by_payment_id(conn: &Connection, payment_id: &str) -> Result<Option<Purchase>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM purchases WHERE payment_id = ?1 ORDER BY created_at, rowid LIMIT 1",
            PURCHASE_COLS
        ),
        &[&payment_id],
    )
}

pub fn list_purchases_for_user_course(
    conn: &Connection,
    user_id: &str,
    course_id: &str,
) -> Result<Vec<Purchase>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM purchases WHERE user_id = ?1 AND course_id = ?2 ORDER BY created_at, rowid",
            PURCHASE_COLS
        ),
        &[&user_id, &course_id],
    )
}

/// Whether a purchase exists for (user, course) under the given policy.
pub fn has_purchased(
    conn: &Connection,
    user_id: &str,
    course_id: &str,
    policy: PurchasedPolicy,
) -> Result<bool> {
    let exists: bool = match policy {
        PurchasedPolicy::AnyStatus => conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM purchases WHERE user_id = ?1 AND course_id = ?2)",
            params![user_id, course_id],
            |row| row.get(0),
        )?,
        PurchasedPolicy::CompletedOnly => conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM purchases WHERE user_id = ?1 AND course_id = ?2 AND status = ?3)",
            params![user_id, course_id, PurchaseStatus::Completed.as_str()],
            |row| row.get(0),
        )?,
    };
    Ok(exists)
}

/// Completed purchases of courses created by `creator_id`, newest first, each
/// with its course embedded.
pub fn list_completed_purchases_for_creator(
    conn: &Connection,
    creator_id: &str,
) -> Result<Vec<PurchaseWithCourse>> {
    let purchases: Vec<Purchase> = query_all(
        conn,
        &format!(
            "SELECT {} FROM purchases WHERE creator_id = ?1 AND status = ?2 ORDER BY updated_at DESC, rowid DESC",
            PURCHASE_COLS
        ),
        &[&creator_id, &PurchaseStatus::Completed.as_str()],
    )?;

    let mut courses: HashMap<String, Course> = HashMap::new();
    let mut result = Vec::with_capacity(purchases.len());

    for purchase in purchases {
        let course = match courses.get(&purchase.course_id) {
            Some(c) => c.clone(),
            None => match get_course_by_id(conn, &purchase.course_id)? {
                Some(c) => {
                    courses.insert(c.id.clone(), c.clone());
                    c
                }
                None => {
                    tracing::warn!(
                        "Purchase {} references missing course {}",
                        purchase.id,
                        purchase.course_id
                    );
                    continue;
                }
            },
        };
        result.push(PurchaseWithCourse { purchase, course });
    }

    Ok(result)
}

/// What a successful payment changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentSuccessOutcome {
    pub lectures_unlocked: usize,
    /// False when the user was already enrolled (e.g. redelivered webhook)
    pub newly_enrolled: bool,
}

/// Apply a successful payment as one unit of work: complete the purchase,
/// optionally unlock the course's lectures, and enroll the buyer.
///
/// Everything runs in a single transaction; on any error nothing is written
/// and the caller can let the gateway redeliver.
pub fn apply_payment_success(
    conn: &mut Connection,
    purchase: &Purchase,
    amount: Option<Decimal>,
    gateway_payment_id: &str,
    unlock_previews: bool,
) -> Result<PaymentSuccessOutcome> {
    let tx = conn.transaction()?;

    let amount = amount.unwrap_or(purchase.amount);
    tx.execute(
        "UPDATE purchases SET status = ?1, amount = ?2, gateway_payment_id = ?3, updated_at = ?4 WHERE id = ?5",
        params![
            PurchaseStatus::Completed.as_str(),
            amount.to_string(),
            gateway_payment_id,
            now(),
            &purchase.id
        ],
    )?;

    let lectures_unlocked = if unlock_previews {
        mark_course_lectures_preview_free(&tx, &purchase.course_id)?
    } else {
        0
    };

    let newly_enrolled = enroll_user(&tx, &purchase.user_id, &purchase.course_id)?;

    tx.commit()?;

    Ok(PaymentSuccessOutcome {
        lectures_unlocked,
        newly_enrolled,
    })
}

/// Mark a purchase as failed unless it has completed. Returns false if no row
/// changed: the purchase is missing or a success was recorded first.
///
/// The status guard lives in the UPDATE so a success committed after the
/// caller read the purchase still wins.
pub fn mark_purchase_failed(
    conn: &Connection,
    purchase_id: &str,
    gateway_payment_id: &str,
) -> Result<bool> {
    let updated = conn.execute(
        "UPDATE purchases SET status = ?1, gateway_payment_id = ?2, updated_at = ?3
         WHERE id = ?4 AND status != ?5",
        params![
            PurchaseStatus::Failed.as_str(),
            gateway_payment_id,
            now(),
            purchase_id,
            PurchaseStatus::Completed.as_str()
        ],
    )?;
    Ok(updated > 0)
}

//! Row mapping trait and helpers for reducing boilerplate in queries.
//!
//! Models implement `FromRow` to define how they are built from a row; the
//! `query_one`/`query_all` helpers cover the common query shapes.

use rusqlite::{Connection, OptionalExtension, Row, ToSql};
use rust_decimal::Decimal;

use crate::models::*;

/// Parse a TEXT column into `T`, turning parse failures into rusqlite errors
/// instead of panicking on corrupt rows.
fn parse_col<T: std::str::FromStr>(row: &Row, col: usize, col_name: &str) -> rusqlite::Result<T> {
    row.get::<_, String>(col)?.parse::<T>().map_err(|_| {
        rusqlite::Error::InvalidColumnType(col, col_name.to_string(), rusqlite::types::Type::Text)
    })
}

fn parse_decimal(row: &Row, col: usize, col_name: &str) -> rusqlite::Result<Decimal> {
    parse_col::<Decimal>(row, col, col_name)
}

pub trait FromRow: Sized {
    fn from_row(row: &Row) -> rusqlite::Result<Self>;
}

/// Query for a single optional result.
pub fn query_one<T: FromRow>(
    conn: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> crate::error::Result<Option<T>> {
    conn.query_row(sql, params, T::from_row)
        .optional()
        .map_err(Into::into)
}

/// Query for multiple results.
pub fn query_all<T: FromRow>(
    conn: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> crate::error::Result<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, T::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ============ SQL SELECT Constants ============

pub const USER_COLS: &str = "id, name, email, created_at, updated_at";

pub const COURSE_COLS: &str = "id, title, price, creator_id, created_at, updated_at";

pub const LECTURE_COLS: &str = "id, course_id, title, position, is_preview_free, created_at";

pub const PURCHASE_COLS: &str = "id, course_id, user_id, creator_id, amount, status, payment_id, gateway_payment_id, created_at, updated_at";

// ============ FromRow Implementations ============

/// Enrollment lists are loaded separately and start empty.
impl FromRow for User {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(User {
            id: row.get(0)?,
            name: row.get(1)?,
            email: row.get(2)?,
            enrolled_courses: Vec::new(),
            created_at: row.get(3)?,
            updated_at: row.get(4)?,
        })
    }
}

/// Lecture and enrollment lists are loaded separately and start empty.
impl FromRow for Course {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Course {
            id: row.get(0)?,
            title: row.get(1)?,
            price: parse_decimal(row, 2, "price")?,
            creator_id: row.get(3)?,
            lectures: Vec::new(),
            enrolled_students: Vec::new(),
            created_at: row.get(4)?,
            updated_at: row.get(5)?,
        })
    }
}

impl FromRow for Lecture {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Lecture {
            id: row.get(0)?,
            course_id: row.get(1)?,
            title: row.get(2)?,
            position: row.get(3)?,
            is_preview_free: row.get::<_, i32>(4)? != 0,
            created_at: row.get(5)?,
        })
    }
}

impl FromRow for Purchase {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Purchase {
            id: row.get(0)?,
            course_id: row.get(1)?,
            user_id: row.get(2)?,
            creator_id: row.get(3)?,
            amount: parse_decimal(row, 4, "amount")?,
            status: parse_col(row, 5, "status")?,
            payment_id: row.get(6)?,
            gateway_payment_id: row.get(7)?,
            created_at: row.get(8)?,
            updated_at: row.get(9)?,
        })
    }
}

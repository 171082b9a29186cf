use chrono::{NaiveDate, NaiveDateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, Row};

use crate::models::experience::hhmm;
use crate::models::{ExperienceSubmission, StoredExperience};

// ── Experiences ──

/// Appends a reviewed experience and returns the stored row, exactly as a
/// later [`list_experiences`] would read it back.
pub fn insert_experience(
    conn: &Connection,
    experience: &ExperienceSubmission,
) -> anyhow::Result<StoredExperience> {
    let mut experience = experience.clone();
    experience.business_name = experience.business_name.trim().to_string();
    experience.event_type = experience.event_type.trim().to_string();

    let stored = StoredExperience {
        id: uuid::Uuid::new_v4().to_string(),
        experience,
        created_at: Utc::now().naive_utc(),
    };
    let e = &stored.experience;

    conn.execute(
        "INSERT INTO experience_raw (id, business_name, event_type, event_price, event_date, event_start_time, event_end_time, band_name, happy_hour_deal, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            stored.id,
            e.business_name,
            e.event_type,
            e.event_price,
            e.event_date.map(|d| d.format("%Y-%m-%d").to_string()),
            e.event_start_time.map(|t| t.format("%H:%M").to_string()),
            e.event_end_time.map(|t| t.format("%H:%M").to_string()),
            e.band_name,
            e.happy_hour_deal,
            stored.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        ],
    )?;

    Ok(stored)
}

/// Most recent first.
pub fn list_experiences(conn: &Connection, limit: i64) -> anyhow::Result<Vec<StoredExperience>> {
    let mut stmt = conn.prepare(
        "SELECT id, business_name, event_type, event_price, event_date, event_start_time, event_end_time, band_name, happy_hour_deal, created_at
         FROM experience_raw ORDER BY created_at DESC, rowid DESC LIMIT ?1",
    )?;

    let rows = stmt.query_map(params![limit], row_to_experience)?;

    let mut experiences = Vec::new();
    for row in rows {
        experiences.push(row?);
    }
    Ok(experiences)
}

pub fn count_experiences(conn: &Connection) -> anyhow::Result<i64> {
    let count = conn.query_row("SELECT COUNT(*) FROM experience_raw", [], |row| row.get(0))?;
    Ok(count)
}

fn row_to_experience(row: &Row<'_>) -> rusqlite::Result<StoredExperience> {
    let event_date: Option<String> = row.get(4)?;
    let start: Option<String> = row.get(5)?;
    let end: Option<String> = row.get(6)?;
    let created_at: String = row.get(9)?;

    Ok(StoredExperience {
        id: row.get(0)?,
        experience: ExperienceSubmission {
            business_name: row.get(1)?,
            event_type: row.get(2)?,
            event_price: row.get(3)?,
            event_date: event_date
                .map(|d| {
                    NaiveDate::parse_from_str(&d, "%Y-%m-%d")
                        .map_err(|_| conversion_error(4, "event_date", &d))
                })
                .transpose()?,
            event_start_time: start
                .map(|t| hhmm::parse(&t).ok_or_else(|| conversion_error(5, "event_start_time", &t)))
                .transpose()?,
            event_end_time: end
                .map(|t| hhmm::parse(&t).ok_or_else(|| conversion_error(6, "event_end_time", &t)))
                .transpose()?,
            band_name: row.get(7)?,
            happy_hour_deal: row.get(8)?,
        },
        created_at: NaiveDateTime::parse_from_str(&created_at, "%Y-%m-%d %H:%M:%S")
            .map_err(|_| conversion_error(9, "created_at", &created_at))?,
    })
}

fn conversion_error(idx: usize, column: &str, value: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        Type::Text,
        format!("invalid {column} value {value:?}").into(),
    )
}

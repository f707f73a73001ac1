use sqlx::PgPool;
use time::Date;

use crate::domain::MeterRecord;

/// Raw row shape of `meter_installations`.
///
/// Postgres has no unsigned integers, so the MPAN is held as `BIGINT`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MeterRecordRow {
    pub mpan: i64,
    pub meter_serial: String,
    pub date_of_installation: Date,
    pub address_line1: Option<String>,
    pub postcode: Option<String>,
}

#[derive(thiserror::Error, Debug)]
#[error("stored mpan {0} is negative")]
pub struct NegativeMpan(pub i64);

impl TryFrom<MeterRecordRow> for MeterRecord {
    type Error = NegativeMpan;

    fn try_from(row: MeterRecordRow) -> Result<Self, Self::Error> {
        let mpan = u64::try_from(row.mpan).map_err(|_| NegativeMpan(row.mpan))?;
        Ok(MeterRecord {
            mpan,
            meter_serial: row.meter_serial,
            date_of_installation: row.date_of_installation,
            address_line1: row.address_line1,
            postcode: row.postcode,
        })
    }
}

const SELECT_COLUMNS: &str = r#"
    SELECT
        mpan,
        meter_serial,
        date_of_installation,
        address_line1,
        postcode
    FROM meter_installations
"#;

/// Escape `LIKE` metacharacters so user input only ever matches literally.
pub fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

fn mpan_param(mpan: u64) -> sqlx::Result<i64> {
    i64::try_from(mpan).map_err(|e| sqlx::Error::Encode(Box::new(e)))
}

fn into_records(rows: Vec<MeterRecordRow>) -> sqlx::Result<Vec<MeterRecord>> {
    rows.into_iter()
        .map(|row| MeterRecord::try_from(row).map_err(|e| sqlx::Error::Decode(Box::new(e))))
        .collect()
}

async fn fetch_where(pool: &PgPool, clause: &str, param: String) -> sqlx::Result<Vec<MeterRecord>> {
    let sql = format!("{SELECT_COLUMNS} WHERE {clause}");
    let rows = sqlx::query_as::<_, MeterRecordRow>(&sql)
        .bind(param)
        .fetch_all(pool)
        .await?;
    into_records(rows)
}

pub async fn all(pool: &PgPool) -> sqlx::Result<Vec<MeterRecord>> {
    let rows = sqlx::query_as::<_, MeterRecordRow>(SELECT_COLUMNS)
        .fetch_all(pool)
        .await?;
    into_records(rows)
}

/// Records whose MPAN, written in decimal, starts with `prefix`.
pub async fn by_mpan_prefix(pool: &PgPool, prefix: &str) -> sqlx::Result<Vec<MeterRecord>> {
    fetch_where(
        pool,
        r"CAST(mpan AS TEXT) LIKE $1 ESCAPE '\'",
        format!("{}%", escape_like(prefix)),
    )
    .await
}

pub async fn by_serial_prefix(pool: &PgPool, prefix: &str) -> sqlx::Result<Vec<MeterRecord>> {
    fetch_where(
        pool,
        r"meter_serial LIKE $1 ESCAPE '\'",
        format!("{}%", escape_like(prefix)),
    )
    .await
}

/// Case-sensitive prefix match; rows without a postcode never match.
pub async fn by_postcode_prefix(pool: &PgPool, prefix: &str) -> sqlx::Result<Vec<MeterRecord>> {
    fetch_where(
        pool,
        r"postcode LIKE $1 ESCAPE '\'",
        format!("{}%", escape_like(prefix)),
    )
    .await
}

/// Case-insensitive substring match on the first address line.
pub async fn by_address_containing(pool: &PgPool, needle: &str) -> sqlx::Result<Vec<MeterRecord>> {
    fetch_where(
        pool,
        r"address_line1 ILIKE $1 ESCAPE '\'",
        format!("%{}%", escape_like(needle)),
    )
    .await
}

pub async fn by_install_date(pool: &PgPool, date: Date) -> sqlx::Result<Vec<MeterRecord>> {
    let sql = format!("{SELECT_COLUMNS} WHERE date_of_installation = $1");
    let rows = sqlx::query_as::<_, MeterRecordRow>(&sql)
        .bind(date)
        .fetch_all(pool)
        .await?;
    into_records(rows)
}

/// Insert unless the natural key is taken. Returns whether a row was written.
///
/// The conflict check and the write are a single statement, so concurrent
/// inserts of one key cannot both succeed.
pub async fn insert_if_absent(pool: &PgPool, record: &MeterRecord) -> sqlx::Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO meter_installations
            (mpan, meter_serial, date_of_installation, address_line1, postcode)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (mpan, date_of_installation, meter_serial) DO NOTHING
        "#,
    )
    .bind(mpan_param(record.mpan)?)
    .bind(&record.meter_serial)
    .bind(record.date_of_installation)
    .bind(&record.address_line1)
    .bind(&record.postcode)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

pub async fn delete_by_key(pool: &PgPool, record: &MeterRecord) -> sqlx::Result<bool> {
    let result = sqlx::query(
        r#"
        DELETE FROM meter_installations
        WHERE mpan = $1
          AND date_of_installation = $2
          AND meter_serial = $3
        "#,
    )
    .bind(mpan_param(record.mpan)?)
    .bind(record.date_of_installation)
    .bind(&record.meter_serial)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn escape_like_quotes_metacharacters() {
        assert_eq!(escape_like("SW1"), "SW1");
        assert_eq!(escape_like("50%_off"), r"50\%\_off");
        assert_eq!(escape_like(r"a\b"), r"a\\b");
    }

    #[test]
    fn negative_stored_mpan_is_rejected() {
        let row = MeterRecordRow {
            mpan: -1,
            meter_serial: "S1".to_string(),
            date_of_installation: date!(2020 - 01 - 01),
            address_line1: None,
            postcode: None,
        };
        assert!(MeterRecord::try_from(row).is_err());
    }

    #[test]
    fn row_converts_to_record() {
        let row = MeterRecordRow {
            mpan: 1_111_111_111_111,
            meter_serial: "S1".to_string(),
            date_of_installation: date!(2020 - 01 - 01),
            address_line1: Some("1 King Street".to_string()),
            postcode: None,
        };
        let record = MeterRecord::try_from(row).unwrap();
        assert_eq!(record.mpan, 1_111_111_111_111);
        assert_eq!(record.address_line1.as_deref(), Some("1 King Street"));
    }
}

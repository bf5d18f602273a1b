// src/loader/mod.rs
use crate::fmp::transform::TallRow;
use crate::utils::error::LoadError;
use tokio_postgres::{Client, NoTls};

/// `data_sources.source_name` of the metrics provider.
pub const FMP_SOURCE_NAME: &str = "Financial Modeling Prep";

static SELECT_COMPANY_ID: &str = "
    SELECT company_id::int8 FROM companies WHERE ticker = $1
";

static SELECT_SOURCE_ID: &str = "
    SELECT source_id::int8 FROM data_sources WHERE source_name = $1
";

/// Keyed by (period, source, company, metric). `period_id` is the fiscal year for now.
pub(crate) static UPSERT_METRIC: &str = "
    INSERT INTO financial_metrics
      (period_id, source_id, company_id, metric_code,
       value_numeric, value_int, unit)
    VALUES ($1::int4, $2::int8, $3::int8, $4, $5::float8, NULL, NULL)
    ON CONFLICT (period_id, source_id, company_id, metric_code)
    DO UPDATE SET value_numeric = EXCLUDED.value_numeric,
                  collected_at  = now()
";

/// Opens a connection and drives it on a background task.
pub async fn connect(pg_url: &str) -> Result<Client, LoadError> {
    tracing::debug!("connecting to postgres ...");
    let (client, connection) = tokio_postgres::connect(pg_url, NoTls).await.map_err(|err| {
        tracing::error!("postgres connection error: {}", err);
        err
    })?;

    tokio::spawn(async move {
        if let Err(err) = connection.await {
            tracing::error!("postgres connection error: {}", err);
        }
    });
    tracing::debug!("postgres connection established");

    Ok(client)
}

async fn lookup_id(client: &Client, query: &str, table: &'static str, key: &str) -> Result<i64, LoadError> {
    client
        .query_opt(query, &[&key])
        .await?
        .map(|row| row.get::<_, i64>(0))
        .ok_or_else(|| LoadError::MissingReference { table, key: key.to_string() })
}

/// Upserts `rows` for `ticker` in one transaction; returns the number of rows written.
pub async fn load_metrics(client: &mut Client, ticker: &str, rows: &[TallRow]) -> Result<u64, LoadError> {
    let time = std::time::Instant::now();
    let ticker = ticker.to_uppercase();

    let company_id = lookup_id(client, SELECT_COMPANY_ID, "companies", &ticker).await?;
    let source_id = lookup_id(client, SELECT_SOURCE_ID, "data_sources", FMP_SOURCE_NAME).await?;
    tracing::debug!("company_id={} source_id={}", company_id, source_id);

    let transaction = client.transaction().await?;
    let statement = transaction.prepare(UPSERT_METRIC).await?;

    let mut written = 0;
    for row in rows {
        written += transaction
            .execute(
                &statement,
                &[&row.fiscal_year, &source_id, &company_id, &row.metric, &row.value],
            )
            .await
            .map_err(|err| {
                tracing::error!("failed to upsert {} FY{}: {}", row.metric, row.fiscal_year, err);
                err
            })?;
        tracing::trace!("upserted {} FY{}", row.metric, row.fiscal_year);
    }

    transaction.commit().await.map_err(|err| {
        tracing::error!("failed to commit financial_metrics transaction");
        err
    })?;

    tracing::info!("Upserted {} rows for {} in {:?}", written, ticker, time.elapsed());
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_targets_the_metric_key() {
        assert!(UPSERT_METRIC.contains("ON CONFLICT (period_id, source_id, company_id, metric_code)"));
        assert!(UPSERT_METRIC.contains("value_numeric = EXCLUDED.value_numeric"));
        // Parameter count must match the execute() call in load_metrics.
        assert!(UPSERT_METRIC.contains("$5") && !UPSERT_METRIC.contains("$6"));
    }

    #[test]
    fn missing_reference_names_table_and_key() {
        let err = LoadError::MissingReference { table: "companies", key: "RPD".into() };
        assert_eq!(err.to_string(), "No companies row matches RPD");
    }

    /// Needs a disposable Postgres: `PG_URL=... cargo test -- --ignored`.
    /// Everything happens in a throwaway schema that is dropped afterwards.
    #[tokio::test]
    #[ignore]
    async fn reloading_the_same_rows_keeps_one_row_per_key() {
        let Ok(pg_url) = dotenv::var("PG_URL") else {
            eprintln!("PG_URL not set, skipping");
            return;
        };
        let mut client = connect(&pg_url).await.unwrap();
        let schema = format!("earnings_etl_scratch_{}", std::process::id());

        client
            .batch_execute(&format!(
                "DROP SCHEMA IF EXISTS {schema} CASCADE;
                 CREATE SCHEMA {schema};
                 SET search_path TO {schema};
                 CREATE TABLE companies (company_id serial PRIMARY KEY, ticker text NOT NULL);
                 CREATE TABLE data_sources (source_id serial PRIMARY KEY, source_name text NOT NULL);
                 CREATE TABLE financial_metrics (
                     period_id int NOT NULL,
                     source_id bigint NOT NULL,
                     company_id bigint NOT NULL,
                     metric_code text NOT NULL,
                     value_numeric numeric,
                     value_int bigint,
                     unit text,
                     collected_at timestamptz NOT NULL DEFAULT now(),
                     PRIMARY KEY (period_id, source_id, company_id, metric_code)
                 );"
            ))
            .await
            .unwrap();

        let rows = vec![
            TallRow { fiscal_year: 2024, metric: "sales".into(), value: 840.0 },
            TallRow { fiscal_year: 2023, metric: "sales".into(), value: 777.0 },
            TallRow { fiscal_year: 2024, metric: "net_income".into(), value: 149.5 },
        ];

        let err = load_metrics(&mut client, "ibm", &rows).await.unwrap_err();
        assert!(
            matches!(err, LoadError::MissingReference { table: "companies", ref key } if key == "IBM"),
            "got {:?}",
            err
        );

        client.execute("INSERT INTO companies (ticker) VALUES ('IBM')", &[]).await.unwrap();
        let err = load_metrics(&mut client, "ibm", &rows).await.unwrap_err();
        assert!(matches!(err, LoadError::MissingReference { table: "data_sources", .. }), "got {:?}", err);

        client
            .execute("INSERT INTO data_sources (source_name) VALUES ($1)", &[&FMP_SOURCE_NAME])
            .await
            .unwrap();

        assert_eq!(load_metrics(&mut client, "ibm", &rows).await.unwrap(), 3);

        let mut revised = rows.clone();
        revised[0].value = 850.0;
        assert_eq!(load_metrics(&mut client, "IBM", &revised).await.unwrap(), 3);

        let count: i64 = client
            .query_one("SELECT count(*) FROM financial_metrics", &[])
            .await
            .unwrap()
            .get(0);
        assert_eq!(count, 3);

        let sales_2024: f64 = client
            .query_one(
                "SELECT value_numeric::float8 FROM financial_metrics WHERE period_id = 2024 AND metric_code = 'sales'",
                &[],
            )
            .await
            .unwrap()
            .get(0);
        assert_eq!(sales_2024, 850.0);

        client.batch_execute(&format!("DROP SCHEMA {schema} CASCADE")).await.unwrap();
    }
}

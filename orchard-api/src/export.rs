use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};

use crate::error::AppError;
use crate::state::AppState;

/// Upper bound on activity rows in one export.
const ACTIVITY_EXPORT_LIMIT: i64 = 10_000;

pub fn routes() -> Router<AppState> {
    Router::new().route("/api/export/{dataset}", get(export_csv))
}

async fn export_csv(
    State(state): State<AppState>,
    Path(dataset): Path<String>,
) -> Result<Response, AppError> {
    let mut csv = CsvWriter::default();

    match dataset.as_str() {
        "customers" => {
            csv.row([
                "ID", "Name", "Email", "Country", "Tree Type", "Years", "Amount", "Promo Code", "Gift",
                "Status", "Newsletter Stage", "Created At",
            ]);
            for c in state.customers.list_customers().await? {
                csv.row([
                    c.id.to_string(),
                    c.name,
                    c.email,
                    c.country,
                    c.tree_type,
                    c.years.to_string(),
                    c.amount_cents.to_string(),
                    c.promo_code.unwrap_or_default(),
                    c.is_gift.to_string(),
                    c.status.to_string(),
                    c.newsletter_stage.to_string(),
                    c.created_at.to_rfc3339(),
                ]);
            }
        }
        "feedback" => {
            csv.row([
                "ID", "Survey Type", "Rating", "Experience", "Highlight", "Improvement", "Would Recommend",
                "Email", "Created At",
            ]);
            for f in state.feedback.list_feedback().await? {
                csv.row([
                    f.id.to_string(),
                    f.survey_type.to_string(),
                    f.rating.to_string(),
                    f.experience,
                    f.highlight,
                    f.improvement,
                    f.would_recommend.to_string(),
                    f.email,
                    f.created_at.to_rfc3339(),
                ]);
            }
        }
        "activity" => {
            csv.row(["ID", "Customer ID", "Action", "Message", "Created At"]);
            for a in state.activity.list_activity(ACTIVITY_EXPORT_LIMIT).await? {
                csv.row([
                    a.id.to_string(),
                    a.customer_id.map(|id| id.to_string()).unwrap_or_default(),
                    a.action,
                    a.message,
                    a.created_at.to_rfc3339(),
                ]);
            }
        }
        "bookings" => {
            csv.row([
                "ID", "Slot ID", "Customer Name", "Customer Email", "Quantity", "Status", "Created At",
            ]);
            for b in state.slots.list_bookings().await? {
                csv.row([
                    b.id.to_string(),
                    b.slot_id.to_string(),
                    b.customer_name,
                    b.customer_email,
                    b.quantity.to_string(),
                    b.status.to_string(),
                    b.created_at.to_rfc3339(),
                ]);
            }
        }
        other => {
            return Err(AppError::NotFoundError(format!("No export named '{}'", other)));
        }
    }

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename={}.csv", dataset),
            ),
        ],
        csv.finish(),
    )
        .into_response())
}

#[derive(Default)]
struct CsvWriter {
    out: String,
}

impl CsvWriter {
    fn row<I, S>(&mut self, fields: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for (i, field) in fields.into_iter().enumerate() {
            if i > 0 {
                self.out.push(',');
            }
            push_field(&mut self.out, field.as_ref());
        }
        self.out.push_str("\r\n");
    }

    fn finish(self) -> String {
        self.out
    }
}

/// RFC 4180 quoting: only fields containing a delimiter, quote or line break are wrapped.
fn push_field(out: &mut String, field: &str) {
    if field.contains([',', '"', '\n', '\r']) {
        out.push('"');
        out.push_str(&field.replace('"', "\"\""));
        out.push('"');
    } else {
        out.push_str(field);
    }
}

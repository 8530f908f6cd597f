//! services/api/src/web/html.rs
//!
//! Server-rendered pages for the scan and tracking flows. Every interpolated
//! asset field goes through [`escape`]; item names, categories, and repair
//! details are user-controlled data.

use meams_core::domain::{Asset, Equipment, Supply};
use meams_core::units::pluralize_unit;
use uuid::Uuid;

/// Escapes a string for safe interpolation into HTML text or attributes.
pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

const STYLE: &str = r#"
    body { font-family: system-ui, sans-serif; margin: 0; background: #f1f5f9; color: #0f172a; }
    .card { max-width: 640px; margin: 2rem auto; background: #fff; border-radius: 8px;
            box-shadow: 0 1px 4px rgba(15, 23, 42, .15); padding: 1.5rem; }
    h1 { font-size: 1.25rem; margin-top: 0; }
    table { width: 100%; border-collapse: collapse; margin-top: 1rem; }
    th, td { text-align: left; padding: .4rem .5rem; border-bottom: 1px solid #e2e8f0; font-size: .9rem; }
    .meta { color: #475569; font-size: .9rem; }
    .qty { font-size: 1.5rem; font-weight: 600; }
    .error { color: #b91c1c; }
    img.asset { max-width: 100%; border-radius: 6px; margin-top: 1rem; }
    a { color: #1d4ed8; }
    label { display: block; margin-top: .75rem; font-size: .9rem; }
    input { width: 100%; padding: .5rem; margin-top: .25rem; box-sizing: border-box; }
    button { margin-top: 1rem; padding: .5rem 1.25rem; }
"#;

/// Wraps a body fragment in the shared page chrome. `refresh_seconds`
/// inserts a meta-refresh so printed-label views stay live.
fn page(title: &str, body: &str, refresh_seconds: Option<u32>) -> String {
    let refresh = refresh_seconds
        .map(|s| format!("<meta http-equiv=\"refresh\" content=\"{}\">", s))
        .unwrap_or_default();
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n{refresh}\n\
         <title>{title}</title>\n<style>{STYLE}</style>\n</head>\n<body>\n{body}\n</body>\n</html>",
        refresh = refresh,
        title = escape(title),
        body = body,
    )
}

/// The credential challenge for supply scans. Served with 200, never 401:
/// the challenge is the response body a scanning browser renders.
pub fn supply_challenge_page(supply_id: Uuid, error: Option<&str>) -> String {
    let error_html = error
        .map(|e| format!("<p class=\"error\">{}</p>", escape(e)))
        .unwrap_or_default();
    let body = format!(
        r#"<div class="card">
<h1>Authentication Required</h1>
<p class="meta">Sign in to view this supply's stock card.</p>
{error_html}
<form id="scan-login">
<label>Username or email<input name="identifier" autocomplete="username" required></label>
<label>Password<input name="password" type="password" autocomplete="current-password" required></label>
<button type="submit">Sign in</button>
</form>
<script>
document.getElementById('scan-login').addEventListener('submit', async function (ev) {{
  ev.preventDefault();
  const form = new FormData(ev.target);
  const resp = await fetch('/verify-scan-access', {{
    method: 'POST',
    headers: {{ 'Content-Type': 'application/json' }},
    body: JSON.stringify({{ identifier: form.get('identifier'), password: form.get('password') }})
  }});
  if (!resp.ok) {{
    window.location = '/scan/supply/{supply_id}?error=1';
    return;
  }}
  const data = await resp.json();
  window.location = '/scan/supply/{supply_id}?token=' + encodeURIComponent(data.access_token);
}});
</script>
</div>"#,
        error_html = error_html,
        supply_id = supply_id,
    );
    page("Authentication Required", &body, None)
}

/// The live stock-card view for an authenticated supply scan.
pub fn supply_page(supply: &Supply) -> String {
    let unit = pluralize_unit(supply.unit.as_deref(), supply.quantity);

    // Newest first, capped at five; the full history lives on its own page.
    let mut recent: Vec<_> = supply.transactions.iter().collect();
    recent.sort_by(|a, b| b.date.cmp(&a.date));
    let rows: String = recent
        .iter()
        .take(5)
        .map(|t| {
            format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                t.date, t.receipt_qty, t.issue_qty, t.balance
            )
        })
        .collect();
    let history_link = if supply.transactions.len() > 5 {
        format!(
            "<p><a href=\"/stock-card/{}\">View full transaction history ({} entries)</a></p>",
            supply.id,
            supply.transactions.len()
        )
    } else {
        String::new()
    };

    let body = format!(
        r#"<div class="card">
<h1>{name}</h1>
<p class="meta">{code} &middot; {category} &middot; {location} &middot; {status}</p>
<p>Current Quantity</p>
<p class="qty">{quantity} {unit}</p>
<table>
<tr><th>Date</th><th>Receipt</th><th>Issue</th><th>Balance</th></tr>
{rows}
</table>
{history_link}
</div>"#,
        name = escape(&supply.name),
        code = escape(&supply.item_code),
        category = escape(&supply.category),
        location = escape(&supply.location),
        status = escape(&supply.status),
        quantity = supply.quantity,
        unit = escape(&unit),
        rows = rows,
        history_link = history_link,
    );
    page(&supply.name, &body, None)
}

/// The open equipment care view rendered on an equipment scan.
pub fn equipment_page(equipment: &Equipment) -> String {
    let image_html = equipment
        .image
        .as_ref()
        .map(|img| {
            format!(
                "<img class=\"asset\" src=\"data:{};base64,{}\" alt=\"{}\">",
                escape(&img.content_type),
                escape(&img.data_base64),
                escape(&equipment.name),
            )
        })
        .unwrap_or_default();

    let mut repairs: Vec<_> = equipment.repairs.iter().collect();
    repairs.sort_by(|a, b| b.date.cmp(&a.date));
    let rows: String = repairs
        .iter()
        .take(5)
        .map(|r| {
            format!(
                "<tr><td>{}</td><td>{}</td><td>{:.2}</td></tr>",
                r.date,
                escape(&r.details),
                r.amount_used
            )
        })
        .collect();

    let report_html = equipment
        .open_report
        .as_ref()
        .map(|r| {
            format!(
                "<p class=\"error\">Open report ({}): {}</p>",
                r.date,
                escape(&r.details)
            )
        })
        .unwrap_or_default();

    let body = format!(
        r#"<div class="card">
<h1>{name}</h1>
<p class="meta">{code} &middot; {category} &middot; {location} &middot; {status}</p>
<p class="meta">Purchased {purchase_date} &middot; Useful life {useful_life} years</p>
{report_html}
{image_html}
<h2>Recent repairs</h2>
<table>
<tr><th>Date</th><th>Details</th><th>Amount</th></tr>
{rows}
</table>
</div>"#,
        name = escape(&equipment.name),
        code = escape(&equipment.item_code),
        category = escape(&equipment.category),
        location = escape(&equipment.location),
        status = escape(&equipment.status),
        purchase_date = equipment.purchase_date,
        useful_life = equipment.useful_life_years,
        report_html = report_html,
        image_html = image_html,
        rows = rows,
    );
    page(&equipment.name, &body, None)
}

/// The live tracking view a printed QR resolves to. Auto-refreshes so a
/// dashboard left open follows the asset's state; stock quantities stay
/// behind the credentialed scan page.
pub fn track_page(asset: &Asset) -> String {
    let (name, code, category, location, status, link) = match asset {
        Asset::Supply(s) => (
            &s.name,
            &s.item_code,
            &s.category,
            &s.location,
            &s.status,
            format!(
                "<p><a href=\"/scan/supply/{}\">View live stock card</a></p>",
                s.id
            ),
        ),
        Asset::Equipment(e) => (
            &e.name,
            &e.item_code,
            &e.category,
            &e.location,
            &e.status,
            format!(
                "<p><a href=\"/scan/equipment/{}\">View equipment details</a></p>",
                e.id
            ),
        ),
    };
    let body = format!(
        r#"<div class="card">
<h1>{name}</h1>
<p class="meta">{code} &middot; {category}</p>
<p>Location: {location}</p>
<p>Status: {status}</p>
{link}
</div>"#,
        name = escape(name),
        code = escape(code),
        category = escape(category),
        location = escape(location),
        status = escape(status),
        link = link,
    );
    page(name, &body, Some(30))
}

/// The complete transaction history for a supply, newest first.
pub fn stock_card_page(supply: &Supply) -> String {
    let mut entries: Vec<_> = supply.transactions.iter().collect();
    entries.sort_by(|a, b| b.date.cmp(&a.date));
    let rows: String = entries
        .iter()
        .map(|t| {
            format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                t.date, t.receipt_qty, t.issue_qty, t.balance
            )
        })
        .collect();
    let body = format!(
        r#"<div class="card">
<h1>{name} &mdash; Transaction History</h1>
<p class="meta">{code} &middot; {category}</p>
<table>
<tr><th>Date</th><th>Receipt</th><th>Issue</th><th>Balance</th></tr>
{rows}
</table>
</div>"#,
        name = escape(&supply.name),
        code = escape(&supply.item_code),
        category = escape(&supply.category),
        rows = rows,
    );
    page(&supply.name, &body, None)
}

/// Fixed 404 body for scan and tracking URLs.
pub fn not_found_page() -> String {
    let body = r#"<div class="card">
<h1>Not Found</h1>
<p class="meta">This code does not match any tracked item. It may have been retired.</p>
</div>"#;
    page("Not Found", body, None)
}

/// Fixed 400 body for malformed identifiers; reveals nothing about whether
/// an asset exists.
pub fn bad_request_page() -> String {
    let body = r#"<div class="card">
<h1>Invalid Request</h1>
<p class="meta">The identifier in this link is not valid.</p>
</div>"#;
    page("Invalid Request", body, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use meams_core::domain::TransactionEntry;

    fn supply_with_transactions(count: usize) -> Supply {
        let now = Utc::now();
        Supply {
            id: Uuid::new_v4(),
            item_code: "SUP-001".to_string(),
            name: "Surgical Gloves <XL>".to_string(),
            category: "Consumables".to_string(),
            location: "Storeroom A".to_string(),
            status: "Available".to_string(),
            quantity: 7,
            unit: Some("box".to_string()),
            image: None,
            documents: Vec::new(),
            transactions: (0..count)
                .map(|i| TransactionEntry {
                    date: NaiveDate::from_ymd_opt(2026, 1, 1 + i as u32).unwrap(),
                    receipt_qty: 10,
                    issue_qty: 3,
                    balance: 7,
                })
                .collect(),
            tracking_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn escape_neutralizes_markup() {
        assert_eq!(
            escape("<script>alert('x')</script>"),
            "&lt;script&gt;alert(&#x27;x&#x27;)&lt;/script&gt;"
        );
        assert_eq!(escape("a & b"), "a &amp; b");
    }

    #[test]
    fn supply_page_escapes_name_and_pluralizes() {
        let html = supply_page(&supply_with_transactions(2));
        assert!(html.contains("Surgical Gloves &lt;XL&gt;"));
        assert!(!html.contains("<XL>"));
        assert!(html.contains("Current Quantity"));
        assert!(html.contains("7 boxes"));
    }

    #[test]
    fn supply_page_links_history_only_when_long() {
        let short = supply_page(&supply_with_transactions(5));
        assert!(!short.contains("/stock-card/"));

        let long = supply_page(&supply_with_transactions(6));
        assert!(long.contains("/stock-card/"));
    }

    #[test]
    fn challenge_page_announces_itself() {
        let html = supply_challenge_page(Uuid::new_v4(), None);
        assert!(html.contains("Authentication Required"));
        assert!(html.contains("/verify-scan-access"));
    }

    #[test]
    fn track_page_refreshes() {
        let html = track_page(&Asset::Supply(supply_with_transactions(0)));
        assert!(html.contains("http-equiv=\"refresh\" content=\"30\""));
        // Tracking view stays quantity-free for supplies.
        assert!(!html.contains("Current Quantity"));
    }
}
